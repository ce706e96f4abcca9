//! Submission pipeline — admit, validate, place, persist, announce.
//!
//! DESIGN
//! ======
//! A submission is charged against the rate limiter first, so rejected text
//! still costs the sender a slot. The text is then validated, and placement
//! runs inside the store's append lock against the freshly loaded snapshot.
//! Only after the snapshot is written is the item announced to peers, so
//! no peer ever sees an item that was not persisted.
//!
//! The caller owns the reply to the submitter; this module only fans out
//! to everyone else.

use std::net::IpAddr;

use tracing::{error, info};

use crate::filter::FilterError;
use crate::frame::{ErrorCode, now_ms};
use crate::placement::{PlacementEngine, PlacementError};
use crate::rate_limit::RateLimitError;
use crate::services::registry;
use crate::services::store::StoreError;
use crate::state::{AppState, CanvasItem, ConnectionId};

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error(transparent)]
    Invalid(#[from] FilterError),
    #[error(transparent)]
    Congested(#[from] PlacementError),
    #[error("server error, try again later")]
    Storage(#[from] StoreError),
}

impl ErrorCode for SubmitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RateLimited(e) => e.error_code(),
            Self::Invalid(e) => e.error_code(),
            Self::Congested(e) => e.error_code(),
            Self::Storage(_) => "E_SERVER",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::RateLimited(e) => e.retryable(),
            Self::Invalid(e) => e.retryable(),
            Self::Congested(e) => e.retryable(),
            Self::Storage(_) => true,
        }
    }
}

/// Admit, validate, place and persist `text` for the client at `ip`.
///
/// # Errors
///
/// See `SubmitError`; every variant is terminal for this request.
pub async fn submit(state: &AppState, ip: IpAddr, text: &str) -> Result<CanvasItem, SubmitError> {
    state.rate_limiter.check_and_record(ip)?;
    let text = state.filter.check(text)?;

    let engine = PlacementEngine::new(state.config.placement_max_attempts);
    let result = state
        .store
        .append_with(|items| {
            let mut rng = rand::rng();
            engine
                .place(&mut rng, text, items, now_ms())
                .map_err(SubmitError::from)
        })
        .await;

    match &result {
        Ok(item) => info!(%ip, x = item.x, y = item.y, font_size = item.font_size, "item placed"),
        Err(SubmitError::Storage(e)) => error!(%ip, error = %e, "snapshot read/write failed"),
        Err(e) => info!(%ip, code = e.error_code(), "submission rejected"),
    }
    result
}

/// `submit`, then notify every connection except `submitter` of the new item.
///
/// # Errors
///
/// Same as `submit`. Nothing is broadcast on error.
pub async fn submit_and_announce(
    state: &AppState,
    ip: IpAddr,
    text: &str,
    submitter: Option<&ConnectionId>,
) -> Result<CanvasItem, SubmitError> {
    let item = submit(state, ip, text).await?;
    registry::broadcast_new_item(state, &item, submitter).await;
    Ok(item)
}

#[cfg(test)]
#[path = "submit_test.rs"]
mod tests;
