use serde::Deserialize;

/// Default bound of the job queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default size of the worker pool
pub const DEFAULT_WORKER_COUNT: usize = 100;

/// Default per-fetch timeout in milliseconds
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default selector for the article body container
pub const DEFAULT_CONTAINER_SELECTOR: &str = "div.detail__body-text";

/// Main configuration structure for Article Ingest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Worker pool and queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of the bounded job queue
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of workers draining the queue
    #[serde(rename = "worker-count", default = "default_worker_count")]
    pub worker_count: usize,

    /// Upper bound for a single fetch, connect through body (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Upper bound for establishing a connection (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Treat an empty extraction result as a failed job instead of persisting it
    #[serde(rename = "skip-empty-content", default)]
    pub skip_empty_content: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            skip_empty_content: false,
        }
    }
}

/// Content extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// CSS selector identifying the article body container
    #[serde(rename = "container-selector", default = "default_container_selector")]
    pub container_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the ingester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the ingester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the ingester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for contact about the ingester
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_container_selector() -> String {
    DEFAULT_CONTAINER_SELECTOR.to_string()
}
