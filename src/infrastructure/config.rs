use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::domain::DomainError;

const DEFAULT_APP_CONFIG: &str = "config/app.yaml";
const DEFAULT_PROMPTS_CONFIG: &str = "config/prompts.yaml";

/// Everything the service needs, loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
}

/// How `GET /chat` delivers the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Sse,
    Json,
}

impl std::str::FromStr for Transport {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sse" | "stream" => Ok(Self::Sse),
            "json" => Ok(Self::Json),
            other => Err(DomainError::config(format!("unknown transport '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    Tavily,
    Bocha,
    None,
}

impl std::str::FromStr for SearchProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tavily" => Ok(Self::Tavily),
            "bocha" => Ok(Self::Bocha),
            "none" | "off" | "" => Ok(Self::None),
            other => Err(DomainError::config(format!(
                "unknown search provider '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: SearchProvider,
    pub max_results: usize,
    pub search_depth: String,
    pub freshness: String,
    pub timeout_seconds: u64,
    /// Overrides the provider's default endpoint URL.
    pub endpoint: Option<String>,
    pub tavily_api_key: Option<String>,
    pub bocha_api_key: Option<String>,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Key for the selected provider, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        let key = match self.provider {
            SearchProvider::Tavily => self.tavily_api_key.as_deref(),
            SearchProvider::Bocha => self.bocha_api_key.as_deref(),
            SearchProvider::None => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

/// Operator-editable text: persona, templates and canned answers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Persona instructions; `{today}` is replaced with the current date.
    pub persona: String,
    /// Search query template; must contain `{question}`.
    pub query_template: String,
    pub context_header: String,
    pub snippet_prefix: String,
    pub no_context: String,
    pub apology: String,
    pub canned: Vec<CannedRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CannedRule {
    pub triggers: Vec<String>,
    pub answer: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            transport: Transport::Sse,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.moonshot.cn/v1".to_string(),
            model: "moonshot-v1-8k".to_string(),
            temperature: None,
            timeout_seconds: 60,
            api_key: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::Tavily,
            max_results: 4,
            search_depth: "basic".to_string(),
            freshness: "oneMonth".to_string(),
            timeout_seconds: 15,
            endpoint: None,
            tavily_api_key: None,
            bocha_api_key: None,
        }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            persona: "你是一名校园智能助手。今天是{today}。请简洁、准确地回答同学的问题。"
                .to_string(),
            query_template: "{question} 最新公告".to_string(),
            context_header: "实时信息：".to_string(),
            snippet_prefix: "内容: ".to_string(),
            no_context: "暂无可用的外部实时信息，请仅依据已知信息谨慎回答。".to_string(),
            apology: "抱歉，小助手暂时无法回答这个问题，请稍后再试。".to_string(),
            canned: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Reads the YAML files named by `APP_CONFIG` / `PROMPTS_CONFIG` (or the
    /// defaults under `config/`), then applies environment overrides.
    pub fn load() -> Result<Self, DomainError> {
        let app_path =
            std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_APP_CONFIG.to_string());
        let prompts_path =
            std::env::var("PROMPTS_CONFIG").unwrap_or_else(|_| DEFAULT_PROMPTS_CONFIG.to_string());

        let mut config = Self {
            config: read_yaml_or_default(&app_path)?,
            prompts: read_yaml_or_default(&prompts_path)?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml(app: &str, prompts: &str) -> Result<Self, DomainError> {
        Ok(Self {
            config: parse_yaml(app)?,
            prompts: parse_yaml(prompts)?,
        })
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = get(&["KIMI_KEY", "MOONSHOT_API_KEY"]) {
            self.config.llm.api_key = Some(key);
        }
        if let Some(key) = get(&["TAVILY_API_KEY"]) {
            self.config.search.tavily_api_key = Some(key);
        }
        if let Some(key) = get(&["BOCHA_API_KEY"]) {
            self.config.search.bocha_api_key = Some(key);
        }
        if let Some(provider) = get(&["SEARCH_PROVIDER"]) {
            self.config.search.provider = provider.parse()?;
        }
        if let Some(host) = get(&["SERVER_HOST"]) {
            self.config.server.host = host;
        }
        if let Some(port) = get(&["PORT", "SERVER_PORT"]) {
            self.config.server.port = port
                .parse()
                .map_err(|_| DomainError::config(format!("invalid port '{port}'")))?;
        }
        if let Some(transport) = get(&["CHAT_TRANSPORT"]) {
            self.config.server.transport = transport.parse()?;
        }
        Ok(())
    }

    /// Start-up checks. A missing completion key is fatal; a missing search
    /// key only disables search.
    pub fn validate(&self) -> Result<(), DomainError> {
        let llm = &self.config.llm;
        if llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(DomainError::config(
                "completion API key is missing (set KIMI_KEY)",
            ));
        }
        if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
            return Err(DomainError::config(format!(
                "invalid completion base url '{}'",
                llm.base_url
            )));
        }
        if llm.model.trim().is_empty() {
            return Err(DomainError::config("completion model must be set"));
        }
        if llm.timeout_seconds == 0 || self.config.search.timeout_seconds == 0 {
            return Err(DomainError::config("timeouts must be greater than zero"));
        }
        if self.config.search.max_results == 0 {
            return Err(DomainError::config("search.max_results must be at least 1"));
        }
        if !self.prompts.query_template.contains("{question}") {
            return Err(DomainError::config(
                "query_template must contain the {question} placeholder",
            ));
        }
        for rule in &self.prompts.canned {
            if rule.triggers.is_empty() || rule.triggers.iter().any(|t| t.trim().is_empty()) {
                return Err(DomainError::config("canned rules need non-empty triggers"));
            }
        }
        Ok(())
    }
}

fn read_yaml_or_default<T>(path: &str) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !Path::new(path).exists() {
        tracing::warn!(path, "Config file not found, using defaults");
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DomainError::config(format!("failed to read {path}: {e}")))?;
    parse_yaml(&raw)
}

fn parse_yaml<T>(raw: &str) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(raw).map_err(|e| DomainError::config(format!("invalid yaml: {e}")))
}
