use std::time::Duration;

use reqwest::{Client, Response};

use crate::domain::DomainError;

const USER_AGENT: &str = concat!("campus-chat/", env!("CARGO_PKG_VERSION"));
const ERROR_EXCERPT_CHARS: usize = 512;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, DomainError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| DomainError::internal(format!("failed to build http client: {e}")))
}

/// Passes 2xx responses through; otherwise reads the body and turns it into
/// an error carrying the status and the provider's message when it has one.
pub(crate) async fn ensure_success(
    resp: Response,
    provider: &str,
) -> Result<Response, DomainError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(DomainError::external(format!(
        "{provider} http {status}: {}",
        error_message(&body)
    )))
}

fn error_message(body: &str) -> String {
    if let Ok(val) = serde_json::from_str::<serde_json::Value>(body) {
        let msg = val
            .pointer("/error/message")
            .or_else(|| val.get("error"))
            .or_else(|| val.get("message"))
            .and_then(|v| v.as_str());
        if let Some(msg) = msg {
            return msg.to_string();
        }
    }
    body.chars().take(ERROR_EXCERPT_CHARS).collect()
}

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::ExternalService(e.to_string())
        }
    }
}
