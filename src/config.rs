use serde::Deserialize;
use tokio::time::Duration;

use crate::models::{DEFAULT_RUN_LIMIT, RunFilter, Tag};
use crate::poller::{DEFAULT_FETCH_TIMEOUT, PollerConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// GraphQL endpoint, e.g. "http://localhost:3000/graphql".
    pub endpoint: String,
    pub pipeline_name: String,
    /// Run tags as "key=value" tokens; a run must carry all of them.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_limit() -> u32 {
    DEFAULT_RUN_LIMIT
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// How often the countdown is republished to subscribers.
    #[serde(default = "default_view_tick_ms")]
    pub view_tick_ms: u64,
    /// A fetch still running after this long is abandoned as a timeout.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    15_000
}

fn default_view_tick_ms() -> u64 {
    1_000
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_millis() as u64
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            view_tick_ms: default_view_tick_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    #[serde(default = "default_ws_ping_interval_secs")]
    pub ws_ping_interval_secs: u64,
    /// Max time to wait for a WebSocket send before dropping the client.
    #[serde(default = "default_ws_send_timeout_secs")]
    pub ws_send_timeout_secs: u64,
}

fn default_ws_ping_interval_secs() -> u64 {
    30
}

fn default_ws_send_timeout_secs() -> u64 {
    10
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            ws_ping_interval_secs: default_ws_ping_interval_secs(),
            ws_send_timeout_secs: default_ws_send_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.source.endpoint.starts_with("http://")
                || self.source.endpoint.starts_with("https://"),
            "source.endpoint must be an http(s) URL, got {:?}",
            self.source.endpoint
        );
        anyhow::ensure!(
            !self.source.pipeline_name.trim().is_empty(),
            "source.pipeline_name must be non-empty"
        );
        for token in &self.source.tags {
            anyhow::ensure!(
                Tag::parse(token).is_some(),
                "source.tags entries must look like key=value, got {:?}",
                token
            );
        }
        anyhow::ensure!(
            self.source.limit > 0,
            "source.limit must be > 0, got {}",
            self.source.limit
        );
        anyhow::ensure!(
            self.source.request_timeout_ms > 0,
            "source.request_timeout_ms must be > 0, got {}",
            self.source.request_timeout_ms
        );
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0, got {}",
            self.polling.interval_ms
        );
        anyhow::ensure!(
            self.polling.view_tick_ms > 0,
            "polling.view_tick_ms must be > 0, got {}",
            self.polling.view_tick_ms
        );
        anyhow::ensure!(
            self.polling.fetch_timeout_ms > 0,
            "polling.fetch_timeout_ms must be > 0, got {}",
            self.polling.fetch_timeout_ms
        );
        anyhow::ensure!(
            self.publishing.ws_ping_interval_secs > 0,
            "publishing.ws_ping_interval_secs must be > 0, got {}",
            self.publishing.ws_ping_interval_secs
        );
        anyhow::ensure!(
            self.publishing.ws_send_timeout_secs > 0,
            "publishing.ws_send_timeout_secs must be > 0, got {}",
            self.publishing.ws_send_timeout_secs
        );
        Ok(())
    }

    /// The run filter described by `[source]`. Tags were checked by `validate`.
    pub fn run_filter(&self) -> RunFilter {
        RunFilter {
            pipeline_name: self.source.pipeline_name.trim().to_string(),
            tags: self
                .source
                .tags
                .iter()
                .filter_map(|t| Tag::parse(t))
                .collect(),
            limit: self.source.limit,
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            filter: self.run_filter(),
            interval: Duration::from_millis(self.polling.interval_ms),
            view_tick: Duration::from_millis(self.polling.view_tick_ms),
            fetch_timeout: Duration::from_millis(self.polling.fetch_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.source.request_timeout_ms)
    }
}
