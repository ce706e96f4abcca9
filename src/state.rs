//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It owns the process-scoped registries (live connections, rate limiter,
//! content filter, canvas store). Nothing here is a module-level global;
//! every handler reaches state through this struct.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use crate::config::Config;
use crate::filter::ContentFilter;
use crate::frame::Frame;
use crate::rate_limit::RateLimiter;
use crate::services::store::CanvasStore;

// =============================================================================
// CANVAS ITEM
// =============================================================================

/// A text snippet placed on the wall. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// Degrees, within `[-70, 70]`.
    pub rotation: f64,
    /// Within `[24, 64]`.
    pub font_size: u32,
    pub color: String,
    /// Milliseconds since Unix epoch.
    pub timestamp: i64,
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// Length of a generated connection id.
const CONNECTION_ID_LEN: usize = 8;

/// Opaque per-connection identifier. Not tied to any user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    #[must_use]
    pub fn generate() -> Self {
        let id = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(CONNECTION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// World-space rectangle a client reports as visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Zoom scale.
    pub scale: f64,
}

/// Live connection: outbound queue, the address it upgraded from, and its
/// last reported viewport.
pub struct Connection {
    pub tx: mpsc::Sender<Frame>,
    pub ip: IpAddr,
    pub viewport: Option<Viewport>,
}

impl Connection {
    #[must_use]
    pub fn new(tx: mpsc::Sender<Frame>, ip: IpAddr) -> Self {
        Self { tx, ip, viewport: None }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum; inner fields are
/// Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: CanvasStore,
    pub connections: Arc<RwLock<HashMap<ConnectionId, Connection>>>,
    pub rate_limiter: RateLimiter,
    pub filter: Arc<ContentFilter>,
    /// Caption dataset returned verbatim by the bulk read.
    pub jokes: Arc<Vec<serde_json::Value>>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns the regex error if `config.denylist_extra` cannot be compiled.
    pub fn new(config: Config, store: CanvasStore, jokes: Vec<serde_json::Value>) -> Result<Self, regex::Error> {
        let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);
        let filter = ContentFilter::new(&config.denylist_extra)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            connections: Arc::new(RwLock::new(HashMap::new())),
            rate_limiter,
            filter: Arc::new(filter),
            jokes: Arc::new(jokes),
        })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
