use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, state::AppState};
use crate::application::Delivery;
use crate::domain::Question;
use crate::infrastructure::Transport;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// `GET /chat?q=...`, answered as an event stream or a single JSON body
/// depending on the configured transport.
pub async fn chat_handler(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<Response, ApiError> {
    let question = Question::parse(query.q.as_deref().unwrap_or_default())?;

    match state.transport() {
        Transport::Sse => {
            let events = state
                .orchestrator
                .respond(question, Delivery::Streaming)
                .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_sse_data())));
            Ok(Sse::new(events)
                .keep_alive(KeepAlive::default())
                .into_response())
        }
        Transport::Json => {
            let answer = state.orchestrator.answer(question).await;
            Ok(Json(ChatResponse { answer }).into_response())
        }
    }
}
