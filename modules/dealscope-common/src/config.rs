use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::DealScopeError;

/// Which relationship-graph backend a run should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphBackendKind {
    /// Neo4j when credentials are present, otherwise disabled.
    Auto,
    Neo4j,
    Memory,
    None,
}

impl FromStr for GraphBackendKind {
    type Err = DealScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "neo4j" => Ok(Self::Neo4j),
            "memory" | "in-memory" => Ok(Self::Memory),
            "none" | "off" | "disabled" => Ok(Self::None),
            other => Err(DealScopeError::Config(format!(
                "GRAPH_BACKEND must be one of auto|neo4j|memory|none, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for GraphBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Neo4j => "neo4j",
            Self::Memory => "memory",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// Application configuration loaded from environment variables.
///
/// Nothing here is strictly required: a missing key disables the
/// feature that needs it and the pipeline degrades instead of refusing to start.
#[derive(Debug, Clone)]
pub struct Config {
    // AI
    pub openai_api_key: String,
    pub openai_model: String,

    // Search
    pub tavily_api_key: String,
    pub search_concurrency: usize,

    // Graph
    pub graph_backend: GraphBackendKind,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Run history
    pub database_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load `.env` (if present) and read configuration from the process environment.
    pub fn from_env() -> Result<Self, DealScopeError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DealScopeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let or = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let search_concurrency = or("SEARCH_CONCURRENCY", "6")
            .parse::<usize>()
            .map_err(|_| DealScopeError::Config("SEARCH_CONCURRENCY must be a number".into()))?
            .max(1);

        let web_port = lookup("PORT")
            .or_else(|| lookup("WEB_PORT"))
            .unwrap_or_else(|| "8000".to_string())
            .trim()
            .parse::<u16>()
            .map_err(|_| DealScopeError::Config("PORT must be a number".into()))?;

        Ok(Self {
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: or("OPENAI_MODEL", "gpt-4o"),
            tavily_api_key: var("TAVILY_API_KEY"),
            search_concurrency,
            graph_backend: or("GRAPH_BACKEND", "auto").parse()?,
            neo4j_uri: var("NEO4J_URI"),
            neo4j_user: or("NEO4J_USER", "neo4j"),
            neo4j_password: var("NEO4J_PASSWORD"),
            database_url: var("DATABASE_URL"),
            web_host: or("WEB_HOST", "0.0.0.0"),
            web_port,
        })
    }

    pub fn neo4j_configured(&self) -> bool {
        !self.neo4j_uri.is_empty() && !self.neo4j_password.is_empty()
    }

    /// The backend a run will actually attempt, after resolving `Auto`.
    pub fn effective_graph_backend(&self) -> GraphBackendKind {
        match self.graph_backend {
            GraphBackendKind::Auto if self.neo4j_configured() => GraphBackendKind::Neo4j,
            GraphBackendKind::Auto => GraphBackendKind::None,
            other => other,
        }
    }

    pub fn history_enabled(&self) -> bool {
        !self.database_url.is_empty()
    }

    /// Log which keys are set without leaking their values.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            if val.is_empty() {
                return "<not set>".to_string();
            }
            let n = val.char_indices().nth(4).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  OPENAI_MODEL: {}", self.openai_model);
        tracing::info!("  TAVILY_API_KEY: {}", preview(&self.tavily_api_key));
        tracing::info!("  SEARCH_CONCURRENCY: {}", self.search_concurrency);
        tracing::info!(
            "  GRAPH_BACKEND: {} (effective: {})",
            self.graph_backend,
            self.effective_graph_backend()
        );
        tracing::info!("  NEO4J_URI: {}", if self.neo4j_uri.is_empty() { "<not set>" } else { &self.neo4j_uri });
        tracing::info!("  NEO4J_PASSWORD: {}", preview(&self.neo4j_password));
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
    }
}
