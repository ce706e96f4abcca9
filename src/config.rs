//! Process configuration loaded from environment variables.
//!
//! Every knob has a default so the server starts with no environment at all.
//! Unparseable values fall back to the default rather than aborting startup.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STORE_PATH: &str = "data/canvas.json";
const DEFAULT_RATE_LIMIT_MAX: usize = 5;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 3000;
pub(crate) const DEFAULT_PLACEMENT_MAX_ATTEMPTS: u32 = 5000;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// `STORE_PATH` value that selects the in-memory store.
pub const MEMORY_STORE: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    /// JSON snapshot document, or `:memory:`.
    pub store_path: PathBuf,
    /// Optional JSON array of captions served alongside the bulk read.
    pub jokes_path: Option<PathBuf>,
    pub rate_limit_max: usize,
    pub rate_limit_window: Duration,
    pub placement_max_attempts: u32,
    /// Per-connection outbound frame buffer. Frames beyond this are dropped.
    pub outbound_queue_capacity: usize,
    /// Prefer the first `X-Forwarded-For` hop over the socket peer address.
    pub trust_forwarded_for: bool,
    /// Denylist patterns added to the built-in set; `=word` matches whole words only.
    pub denylist_extra: Vec<String>,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            port: env_parse("PORT", DEFAULT_PORT),
            store_path: std::env::var("STORE_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from),
            jokes_path: std::env::var("JOKES_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            rate_limit_max: env_parse("RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX),
            rate_limit_window: Duration::from_millis(env_parse("RATE_LIMIT_WINDOW_MS", DEFAULT_RATE_LIMIT_WINDOW_MS)),
            placement_max_attempts: env_parse("PLACEMENT_MAX_ATTEMPTS", DEFAULT_PLACEMENT_MAX_ATTEMPTS),
            outbound_queue_capacity: env_parse("OUTBOUND_QUEUE_CAPACITY", DEFAULT_OUTBOUND_QUEUE_CAPACITY),
            trust_forwarded_for: env_parse("TRUST_FORWARDED_FOR", false),
            denylist_extra: std::env::var("DENYLIST_EXTRA")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn uses_memory_store(&self) -> bool {
        self.store_path.as_os_str() == MEMORY_STORE
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            port: DEFAULT_PORT,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            jokes_path: None,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            placement_max_attempts: DEFAULT_PLACEMENT_MAX_ATTEMPTS,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            trust_forwarded_for: false,
            denylist_extra: Vec::new(),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Split a comma-separated list, dropping blank entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
