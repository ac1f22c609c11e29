use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::instrument;

use crate::domain::{ports::SearchService, DomainError, SearchSnippet};
use crate::infrastructure::config::SearchConfig;
use crate::infrastructure::http::{build_client, ensure_success};

const DEFAULT_ENDPOINT: &str = "https://api.bochaai.com/v1/web-search";
const COUNT_LIMIT: usize = 50;

pub struct BochaSearch {
    client: Client,
    endpoint: String,
    api_key: String,
    count: usize,
    freshness: String,
}

impl BochaSearch {
    pub fn new(api_key: impl Into<String>, config: &SearchConfig) -> Result<Self, DomainError> {
        Ok(Self {
            client: build_client(config.timeout())?,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key: api_key.into(),
            count: config.max_results.clamp(1, COUNT_LIMIT),
            freshness: config.freshness.clone(),
        })
    }

    fn body(&self, query: &str) -> Value {
        json!({
            "query": query,
            "count": self.count,
            "summary": true,
            "freshness": self.freshness,
        })
    }
}

fn parse_results(raw: &Value) -> Result<Vec<SearchSnippet>, DomainError> {
    let results = raw
        .pointer("/data/webPages/value")
        .or_else(|| raw.pointer("/webPages/value"))
        .and_then(Value::as_array)
        .ok_or_else(|| DomainError::malformed("bocha: missing webPages.value"))?;

    Ok(results
        .iter()
        .filter_map(|it| {
            let content = it
                .get("summary")
                .or_else(|| it.get("snippet"))
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())?;
            let source = it
                .get("url")
                .or_else(|| it.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(SearchSnippet::new(content).with_source(source))
        })
        .collect())
}

#[async_trait]
impl SearchService for BochaSearch {
    #[instrument(skip(self), fields(provider = "bocha"))]
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>, DomainError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.body(query))
            .send()
            .await?;
        let raw: Value = ensure_success(resp, "bocha").await?.json().await?;
        parse_results(&raw)
    }

    fn provider(&self) -> &'static str {
        "bocha"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::io::Write;

    fn config_for(server: &Server) -> SearchConfig {
        SearchConfig {
            provider: crate::infrastructure::config::SearchProvider::Bocha,
            endpoint: Some(format!("{}/v1/web-search", server.url())),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_body() {
        let search = BochaSearch::new("bocha-key", &SearchConfig::default()).unwrap();
        let body = search.body("华东理工大学 校车");

        assert_eq!(body["query"], "华东理工大学 校车");
        assert_eq!(body["count"], 4);
        assert_eq!(body["freshness"], "oneMonth");
        assert!(body.get("api_key").is_none());
    }

    #[test]
    fn test_parse_results_prefers_summary() {
        let raw = json!({
            "code": 200,
            "data": {"webPages": {"value": [
                {"name": "校车时刻表", "url": "https://x.cn/bus", "snippet": "短", "summary": "寒假校车每日两班"},
                {"name": "通知", "snippet": "食堂开放至1月23日"},
                {"name": "空", "snippet": "   "}
            ]}}
        });
        let snippets = parse_results(&raw).unwrap();

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].content, "寒假校车每日两班");
        assert_eq!(snippets[0].source.as_deref(), Some("https://x.cn/bus"));
        assert_eq!(snippets[1].source.as_deref(), Some("通知"));
    }

    #[test]
    fn test_parse_results_requires_pages() {
        assert!(parse_results(&json!({"code": 401, "msg": "invalid key"})).is_err());
    }

    #[tokio::test]
    async fn test_search_sends_bearer_key_and_parses_pages() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/web-search")
            .match_header("authorization", "Bearer bocha-key")
            .match_body(Matcher::PartialJson(json!({
                "query": "华东理工大学 校车",
                "summary": true,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":200,"data":{"webPages":{"value":[{"name":"校车","url":"https://x.cn/bus","snippet":"每日两班"}]}}}"#)
            .create_async()
            .await;

        let search = BochaSearch::new("bocha-key", &config_for(&server)).unwrap();
        let snippets = search.search("华东理工大学 校车").await.unwrap();

        mock.assert_async().await;
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].content, "每日两班");
        assert_eq!(snippets[0].source.as_deref(), Some("https://x.cn/bus"));
    }

    #[tokio::test]
    async fn test_search_server_error_is_external() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/web-search")
            .with_status(500)
            .with_body("gateway exploded")
            .create_async()
            .await;

        let search = BochaSearch::new("bocha-key", &config_for(&server)).unwrap();
        let err = search.search("q").await.unwrap_err();

        match err {
            DomainError::ExternalService(msg) => {
                assert!(msg.contains("bocha"), "{msg}");
                assert!(msg.contains("500"), "{msg}");
                assert!(msg.contains("gateway exploded"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_reads_chunked_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/web-search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_chunked_body(|w| {
                w.write_all(r#"{"webPages":{"value":[{"name":"食堂","sum"#.as_bytes())?;
                w.write_all(r#"mary":"二食堂寒假照常开放"}]}}"#.as_bytes())
            })
            .create_async()
            .await;

        let search = BochaSearch::new("bocha-key", &config_for(&server)).unwrap();
        let snippets = search.search("q").await.unwrap();

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].content, "二食堂寒假照常开放");
    }
}
