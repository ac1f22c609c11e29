use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::application::services::{IntentClassifier, PromptBuilder};
use crate::domain::{
    ports::{CompletionService, FragmentStream, SearchService},
    AnswerEvent, DomainError, Intent, Message, Question,
};
use crate::infrastructure::config::AppConfig;

/// Output of one turn: fragments followed by exactly one `AnswerEvent::Done`.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AnswerEvent> + Send>>;

/// Whether the completion is requested as a stream or as one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Streaming,
    Whole,
}

/// Runs a single chat turn: canned answer, or web search then completion.
///
/// Collaborator failures never escape a turn. A failed search means the prompt
/// carries the "no context" placeholder; a failed completion appends the
/// apology text as a final fragment.
#[derive(Clone)]
pub struct ChatTurnOrchestrator {
    classifier: Arc<IntentClassifier>,
    prompts: Arc<PromptBuilder>,
    search: Option<Arc<dyn SearchService>>,
    llm: Arc<dyn CompletionService>,
    apology: Arc<str>,
    search_timeout: Duration,
    completion_timeout: Duration,
    fixed_date: Option<NaiveDate>,
}

impl ChatTurnOrchestrator {
    pub fn new(
        config: &AppConfig,
        llm: Arc<dyn CompletionService>,
        search: Option<Arc<dyn SearchService>>,
    ) -> Self {
        Self {
            classifier: Arc::new(IntentClassifier::new(config.prompts.canned.clone())),
            prompts: Arc::new(PromptBuilder::new(&config.prompts)),
            search,
            llm,
            apology: Arc::from(config.prompts.apology.as_str()),
            search_timeout: config.config.search.timeout(),
            completion_timeout: config.config.llm.timeout(),
            fixed_date: None,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Pins the date rendered into the persona instead of reading the clock.
    pub fn with_fixed_date(mut self, date: NaiveDate) -> Self {
        self.fixed_date = Some(date);
        self
    }

    pub fn search_enabled(&self) -> bool {
        self.search.is_some()
    }

    /// Lazily runs the turn; nothing is called until the stream is polled.
    /// Dropping the stream abandons any in-flight completion.
    pub fn respond(&self, question: Question, delivery: Delivery) -> AnswerStream {
        let turn = self.clone();
        let span = info_span!("chat_turn", turn_id = %Uuid::new_v4(), ?delivery);

        let body = stream::once(turn.run(question, delivery).instrument(span)).flatten();
        Box::pin(body.chain(stream::once(async { AnswerEvent::Done })))
    }

    /// Non-streaming turn, aggregated into one string.
    pub async fn answer(&self, question: Question) -> String {
        self.respond(question, Delivery::Whole)
            .filter_map(|event| async move {
                match event {
                    AnswerEvent::Fragment(text) => Some(text),
                    AnswerEvent::Done => None,
                }
            })
            .collect::<Vec<_>>()
            .await
            .concat()
    }

    async fn run(
        self,
        question: Question,
        delivery: Delivery,
    ) -> BoxStream<'static, AnswerEvent> {
        if let Intent::Canned(answer) = self.classifier.classify(&question) {
            info!("Question matched a canned answer, skipping collaborators");
            return stream::iter([AnswerEvent::Fragment(answer)]).boxed();
        }

        let messages = self.prepare(&question).await;

        match delivery {
            Delivery::Whole => {
                let text = match self.complete(&messages).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Completion failed, answering with apology");
                        self.apology.to_string()
                    }
                };
                stream::iter([AnswerEvent::Fragment(text)]).boxed()
            }
            Delivery::Streaming => match self.open_stream(&messages).await {
                Ok(fragments) => with_apology_on_error(fragments, self.apology.clone()),
                Err(e) => {
                    warn!(error = %e, "Completion stream failed to start, answering with apology");
                    stream::iter([AnswerEvent::fragment(&*self.apology)]).boxed()
                }
            },
        }
    }

    async fn prepare(&self, question: &Question) -> Vec<Message> {
        let context = match &self.search {
            Some(search) => self.retrieve_context(search.as_ref(), question).await,
            None => {
                debug!("Web search disabled");
                None
            }
        };
        self.prompts.assemble(question, context.as_deref(), self.today())
    }

    async fn retrieve_context(
        &self,
        search: &dyn SearchService,
        question: &Question,
    ) -> Option<String> {
        let query = self.prompts.search_query(question);
        debug!(provider = search.provider(), %query, "Searching web");

        let result = tokio::time::timeout(self.search_timeout, search.search(&query))
            .await
            .map_err(|_| DomainError::timeout("web search timed out"))
            .and_then(|r| r);

        match result {
            Ok(snippets) => {
                info!(
                    provider = search.provider(),
                    results = snippets.len(),
                    "Web search completed"
                );
                self.prompts.context_text(&snippets)
            }
            Err(e) => {
                warn!(
                    provider = search.provider(),
                    error = %e,
                    "Web search failed, continuing without context"
                );
                None
            }
        }
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, DomainError> {
        tokio::time::timeout(self.completion_timeout, self.llm.complete(messages))
            .await
            .map_err(|_| DomainError::timeout("completion timed out"))?
    }

    async fn open_stream(&self, messages: &[Message]) -> Result<FragmentStream, DomainError> {
        tokio::time::timeout(self.completion_timeout, self.llm.stream(messages))
            .await
            .map_err(|_| DomainError::timeout("completion timed out"))?
    }

    fn today(&self) -> NaiveDate {
        self.fixed_date.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Forwards fragments until the first error, which is replaced by the apology.
fn with_apology_on_error(
    fragments: FragmentStream,
    apology: Arc<str>,
) -> BoxStream<'static, AnswerEvent> {
    stream::unfold(Some(fragments), move |state| {
        let apology = apology.clone();
        async move {
            let mut fragments = state?;
            match fragments.next().await {
                Some(Ok(text)) => Some((AnswerEvent::Fragment(text), Some(fragments))),
                Some(Err(e)) => {
                    warn!(error = %e, "Completion stream broke, appending apology");
                    Some((AnswerEvent::fragment(&*apology), None))
                }
                None => None,
            }
        }
    })
    .boxed()
}
