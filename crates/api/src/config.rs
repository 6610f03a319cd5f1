use std::time::Duration;

use serde::{Deserialize, Serialize};

use graph::GraphConfig;
use query::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub graph: GraphConfig,
    pub engine: EngineSettings,
    pub cache: CacheConfig,
    /// Base URL of the NER tagging service; pattern-only extraction when
    /// unset.
    pub tagger_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub strategy_timeout_ms: u64,
    pub default_max_depth: usize,
    pub default_top_k: usize,
    pub fetch_limit: usize,
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            strategy_timeout: Duration::from_millis(self.strategy_timeout_ms),
            default_max_depth: self.default_max_depth,
            default_top_k: self.default_top_k,
            fetch_limit: self.fetch_limit,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            strategy_timeout_ms: defaults.strategy_timeout.as_millis() as u64,
            default_max_depth: defaults.default_max_depth,
            default_top_k: defaults.default_top_k,
            fetch_limit: defaults.fetch_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl_secs: 300,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            graph: GraphConfig::default(),
            engine: EngineSettings::default(),
            cache: CacheConfig::default(),
            tagger_url: None,
        }
    }
}

impl AppConfig {
    /// Defaults with environment overrides for the deployment-specific bits.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(uri) = std::env::var("GRAPH_URI") {
            config.graph.uri = uri;
        }
        if let Ok(user) = std::env::var("GRAPH_USER") {
            config.graph.user = user;
        }
        if let Ok(password) = std::env::var("GRAPH_PASSWORD") {
            config.graph.password = password;
        }
        if let Ok(url) = std::env::var("TAGGER_URL") {
            config.tagger_url = Some(url);
        }
        config
    }
}
