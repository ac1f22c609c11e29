use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::instrument;

use crate::domain::{ports::SearchService, DomainError, SearchSnippet};
use crate::infrastructure::config::SearchConfig;
use crate::infrastructure::http::{build_client, ensure_success};

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";
const MAX_RESULTS_LIMIT: usize = 20;

pub struct TavilySearch {
    client: Client,
    endpoint: String,
    api_key: String,
    max_results: usize,
    search_depth: String,
    topic: Option<String>,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, config: &SearchConfig) -> Result<Self, DomainError> {
        // "news" is a topic for Tavily, not a depth.
        let depth = config.search_depth.trim().to_ascii_lowercase();
        let (search_depth, topic) = match depth.as_str() {
            "advanced" => ("advanced", None),
            "news" => ("basic", Some("news".to_string())),
            _ => ("basic", None),
        };
        Ok(Self {
            client: build_client(config.timeout())?,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key: api_key.into(),
            max_results: config.max_results.clamp(1, MAX_RESULTS_LIMIT),
            search_depth: search_depth.to_string(),
            topic,
        })
    }

    fn body(&self, query: &str) -> Value {
        let mut body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": self.search_depth,
            "max_results": self.max_results,
        });
        if let Some(topic) = &self.topic {
            body["topic"] = json!(topic);
        }
        body
    }
}

fn parse_results(raw: &Value) -> Result<Vec<SearchSnippet>, DomainError> {
    let results = raw
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| DomainError::malformed("tavily: missing results array"))?;

    Ok(results
        .iter()
        .filter_map(|it| {
            let content = it.get("content").and_then(Value::as_str)?;
            let source = it
                .get("url")
                .or_else(|| it.get("title"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(SearchSnippet::new(content).with_source(source))
        })
        .collect())
}

#[async_trait]
impl SearchService for TavilySearch {
    #[instrument(skip(self), fields(provider = "tavily"))]
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>, DomainError> {
        let resp = self.client.post(&self.endpoint).json(&self.body(query)).send().await?;
        let raw: Value = ensure_success(resp, "tavily").await?.json().await?;
        parse_results(&raw)
    }

    fn provider(&self) -> &'static str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockito::{Matcher, Server};
    use std::io::Write;

    fn config_for(server: &Server) -> SearchConfig {
        SearchConfig {
            endpoint: Some(format!("{}/search", server.url())),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_body_caps_results_and_normalizes_depth() {
        let config = SearchConfig {
            max_results: 50,
            search_depth: "deep".into(),
            ..SearchConfig::default()
        };
        let search = TavilySearch::new("tvly-key", &config).unwrap();
        let body = search.body("华东理工大学 食堂");

        assert_eq!(body["api_key"], "tvly-key");
        assert_eq!(body["query"], "华东理工大学 食堂");
        assert_eq!(body["max_results"], 20);
        assert_eq!(body["search_depth"], "basic");
        assert!(body.get("topic").is_none());
    }

    #[test]
    fn test_news_depth_becomes_news_topic() {
        let config = SearchConfig {
            search_depth: "News".into(),
            ..SearchConfig::default()
        };
        let body = TavilySearch::new("tvly-key", &config).unwrap().body("q");

        assert_eq!(body["topic"], "news");
        assert_eq!(body["search_depth"], "basic");

        let config = SearchConfig {
            search_depth: "advanced".into(),
            ..SearchConfig::default()
        };
        let body = TavilySearch::new("tvly-key", &config).unwrap().body("q");
        assert_eq!(body["search_depth"], "advanced");
        assert!(body.get("topic").is_none());
    }

    #[tokio::test]
    async fn test_search_posts_query_and_parses_results() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_body(Matcher::PartialJson(json!({
                "api_key": "tvly-key",
                "query": "华东理工大学 寒假",
                "max_results": 4,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[{"title":"校历","url":"https://www.ecust.edu.cn/a","content":"1月17日起放假"}]}"#)
            .create_async()
            .await;

        let search = TavilySearch::new("tvly-key", &config_for(&server)).unwrap();
        let snippets = search.search("华东理工大学 寒假").await.unwrap();

        mock.assert_async().await;
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].content, "1月17日起放假");
        assert_eq!(snippets[0].source.as_deref(), Some("https://www.ecust.edu.cn/a"));
    }

    #[tokio::test]
    async fn test_search_server_error_carries_status_and_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(500)
            .with_body(r#"{"detail":"upstream down","message":"internal error"}"#)
            .create_async()
            .await;

        let search = TavilySearch::new("tvly-key", &config_for(&server)).unwrap();
        let err = search.search("q").await.unwrap_err();

        match err {
            DomainError::ExternalService(msg) => {
                assert!(msg.contains("tavily"), "{msg}");
                assert!(msg.contains("500"), "{msg}");
                assert!(msg.contains("internal error"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_reads_chunked_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_chunked_body(|w| {
                w.write_all(r#"{"results":[{"title":"图书馆","con"#.as_bytes())?;
                w.write_all(r#"tent":"寒假闭馆"}]}"#.as_bytes())
            })
            .create_async()
            .await;

        let search = TavilySearch::new("tvly-key", &config_for(&server)).unwrap();
        let snippets = search.search("q").await.unwrap();

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].content, "寒假闭馆");
        assert_eq!(snippets[0].source.as_deref(), Some("图书馆"));
    }

    #[test]
    fn test_parse_results() {
        let raw = json!({
            "query": "q",
            "results": [
                {"title": "校历", "url": "https://www.ecust.edu.cn/a", "content": "寒假安排"},
                {"title": "无正文"},
                {"title": "新闻", "content": "图书馆开放时间"}
            ]
        });
        let snippets = parse_results(&raw).unwrap();

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].source.as_deref(), Some("https://www.ecust.edu.cn/a"));
        assert_eq!(snippets[0].content, "寒假安排");
        assert_eq!(snippets[1].source.as_deref(), Some("新闻"));
    }

    #[test]
    fn test_parse_results_requires_array() {
        assert!(matches!(
            parse_results(&json!({"detail": "Unauthorized"})),
            Err(DomainError::Malformed(_))
        ));
    }
}
