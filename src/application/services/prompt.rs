use chrono::NaiveDate;

use crate::domain::{Message, Question, SearchSnippet};
use crate::infrastructure::config::PromptsConfig;

const QUESTION_PLACEHOLDER: &str = "{question}";
const TODAY_PLACEHOLDER: &str = "{today}";

/// Renders the search query and the message list for one turn.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    query_template: String,
    context_header: String,
    snippet_prefix: String,
    no_context: String,
}

impl PromptBuilder {
    pub fn new(prompts: &PromptsConfig) -> Self {
        Self {
            persona: prompts.persona.clone(),
            query_template: prompts.query_template.clone(),
            context_header: prompts.context_header.clone(),
            snippet_prefix: prompts.snippet_prefix.clone(),
            no_context: prompts.no_context.clone(),
        }
    }

    pub fn search_query(&self, question: &Question) -> String {
        self.query_template
            .replace(QUESTION_PLACEHOLDER, question.as_str())
            .trim()
            .to_string()
    }

    /// Joins snippet contents one per line. `None` when nothing usable came back.
    pub fn context_text(&self, snippets: &[SearchSnippet]) -> Option<String> {
        let lines: Vec<String> = snippets
            .iter()
            .filter(|s| !s.is_blank())
            .map(|s| format!("{}{}", self.snippet_prefix, s.content.trim()))
            .collect();

        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    /// Persona first, web context second, question last.
    pub fn assemble(
        &self,
        question: &Question,
        context: Option<&str>,
        today: NaiveDate,
    ) -> Vec<Message> {
        let persona = self
            .persona
            .replace(TODAY_PLACEHOLDER, &today.format("%Y年%-m月%-d日").to_string());
        let context = format!("{}{}", self.context_header, context.unwrap_or(&self.no_context));

        vec![
            Message::system(persona),
            Message::system(context),
            Message::user(question.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageRole;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&PromptsConfig {
            persona: "你是信管小助手。今天是{today}。".into(),
            query_template: "华东理工大学 2026年1月 {question} 最新公告".into(),
            ..PromptsConfig::default()
        })
    }

    #[test]
    fn test_search_query_interpolates_question() {
        let q = Question::parse(" 图书馆开放时间 ").unwrap();
        assert_eq!(
            builder().search_query(&q),
            "华东理工大学 2026年1月 图书馆开放时间 最新公告"
        );
    }

    #[test]
    fn test_context_text_skips_blank_snippets() {
        let snippets = vec![
            SearchSnippet::new("第一条"),
            SearchSnippet::new("  "),
            SearchSnippet::new("第二条").with_source("https://example.cn"),
        ];
        assert_eq!(
            builder().context_text(&snippets).as_deref(),
            Some("内容: 第一条\n内容: 第二条")
        );
        assert!(builder().context_text(&[]).is_none());
    }

    #[test]
    fn test_assemble_orders_messages() {
        let q = Question::parse("食堂几点关门").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 21).unwrap();
        let messages = builder().assemble(&q, Some("内容: 二食堂19点关门"), today);

        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::System, MessageRole::User]
        );
        assert_eq!(messages[0].content, "你是信管小助手。今天是2026年1月21日。");
        assert_eq!(messages[1].content, "实时信息：内容: 二食堂19点关门");
        assert_eq!(messages[2].content, "食堂几点关门");
    }

    #[test]
    fn test_assemble_uses_placeholder_without_context() {
        let q = Question::parse("食堂几点关门").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 21).unwrap();
        let messages = builder().assemble(&q, None, today);

        assert_eq!(messages.len(), 3);
        assert!(messages[1].content.ends_with(&PromptsConfig::default().no_context));
    }
}
