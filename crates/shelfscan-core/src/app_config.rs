use std::path::PathBuf;

/// Process-wide configuration, loaded from the environment.
///
/// Timeouts follow the split in the concurrency model: structured HTTP calls
/// get `request_timeout_secs`, rendered navigations get the longer
/// `render_timeout_secs`, and challenge resolution (which waits on a human)
/// gets its own much longer `challenge_timeout_secs`.
#[derive(Clone)]
pub struct AppConfig {
    /// Origin of the catalog's structured API and product pages.
    pub catalog_base_url: String,
    /// Base URL of the page-rendering service.
    pub render_base_url: String,
    /// Optional auth token for the rendering service.
    pub render_token: Option<String>,
    pub log_level: String,
    pub session_path: PathBuf,
    pub checkpoint_path: PathBuf,
    /// Checkpoint snapshot cadence, in accepted items.
    pub checkpoint_interval: usize,
    /// Capacity of the bounded queue between the run loop and the
    /// checkpoint writer.
    pub checkpoint_queue: usize,
    pub request_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub user_agent: String,
    /// Total attempts per structured call, first try included.
    pub max_attempts: u32,
    pub retry_backoff_base_ms: u64,
    /// Randomised pacing window between rendered navigations.
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,
    /// Challenge resolutions attempted per item before degrading it.
    pub challenge_max_retries: u32,
    pub challenge_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("catalog_base_url", &self.catalog_base_url)
            .field("render_base_url", &self.render_base_url)
            .field(
                "render_token",
                &self.render_token.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("session_path", &self.session_path)
            .field("checkpoint_path", &self.checkpoint_path)
            .field("checkpoint_interval", &self.checkpoint_interval)
            .field("checkpoint_queue", &self.checkpoint_queue)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("pacing_min_ms", &self.pacing_min_ms)
            .field("pacing_max_ms", &self.pacing_max_ms)
            .field("challenge_max_retries", &self.challenge_max_retries)
            .field("challenge_timeout_secs", &self.challenge_timeout_secs)
            .finish()
    }
}
