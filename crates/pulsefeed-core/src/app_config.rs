use chrono_tz::Tz;

/// Runtime configuration for the feed-aggregation pipeline and its store.
///
/// Built from environment variables by [`crate::load_app_config`]; every
/// field except `database_url` has a documented default.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    /// Minutes between scheduled update cycles.
    pub update_interval_minutes: u64,
    /// Maximum simultaneous outbound feed fetches within one cycle.
    pub max_concurrent_fetches: usize,
    /// Per-request HTTP timeout for a single feed fetch.
    pub request_timeout_secs: u64,
    /// Zone that published-at instants are normalized into and that
    /// `last_updated` stamps are taken in.
    pub timezone: Tz,
    /// Hours after which an admitted article stops being "new".
    pub freshness_window_hours: i64,
    pub fetch_user_agent: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("update_interval_minutes", &self.update_interval_minutes)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("timezone", &self.timezone)
            .field("freshness_window_hours", &self.freshness_window_hours)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
