//! Connection registry and broadcast hub.
//!
//! DESIGN
//! ======
//! Every live websocket is registered under an opaque `ConnectionId` with
//! its bounded outbound sender and last reported viewport. Nothing outside
//! this map holds a reference to a connection; callers address peers by id.
//!
//! Three pushes fan out from here:
//! - `session:online` whenever membership changes
//! - `viewport:snapshot` with every known viewport, after any single report
//!   and after a disconnect
//! - `item:new` to everyone except the submitter
//!
//! Sends are `try_send`: a full or closed queue drops that one frame for
//! that one peer and never blocks the broadcaster. Viewport snapshots are
//! rebuilt and re-sent in full on every report, without batching.

use std::net::IpAddr;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::frame::{Data, Frame};
use crate::state::{AppState, CanvasItem, Connection, ConnectionId, Viewport};

pub const SYSCALL_INIT: &str = "session:init";
pub const SYSCALL_ONLINE: &str = "session:online";
pub const SYSCALL_VIEWPORTS: &str = "viewport:snapshot";
pub const SYSCALL_NEW_ITEM: &str = "item:new";

/// One row of a viewport snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportEntry {
    pub id: ConnectionId,
    #[serde(flatten)]
    pub viewport: Viewport,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Register a connection with no viewport. Returns the new online count.
pub async fn register(state: &AppState, id: ConnectionId, ip: IpAddr, tx: mpsc::Sender<Frame>) -> usize {
    let mut connections = state.connections.write().await;
    connections.insert(id.clone(), Connection::new(tx, ip));
    info!(client_id = %id, %ip, online = connections.len(), "connection registered");
    connections.len()
}

/// Remove a connection. Returns the remaining online count.
pub async fn unregister(state: &AppState, id: &ConnectionId) -> usize {
    let mut connections = state.connections.write().await;
    connections.remove(id);
    info!(client_id = %id, online = connections.len(), "connection removed");
    connections.len()
}

/// Record the latest viewport for `id`. Returns false for unknown ids.
pub async fn set_viewport(state: &AppState, id: &ConnectionId, viewport: Viewport) -> bool {
    let mut connections = state.connections.write().await;
    let Some(conn) = connections.get_mut(id) else {
        return false;
    };
    conn.viewport = Some(viewport);
    true
}

/// True if `id` is live and was registered from `ip`.
pub async fn is_owned_by(state: &AppState, id: &ConnectionId, ip: IpAddr) -> bool {
    state.connections.read().await.get(id).is_some_and(|conn| conn.ip == ip)
}

pub async fn online_count(state: &AppState) -> usize {
    state.connections.read().await.len()
}

/// Every connection that has reported a viewport, ordered by id.
pub async fn viewport_snapshot(state: &AppState) -> Vec<ViewportEntry> {
    let connections = state.connections.read().await;
    let mut entries: Vec<ViewportEntry> = connections
        .iter()
        .filter_map(|(id, conn)| conn.viewport.map(|viewport| ViewportEntry { id: id.clone(), viewport }))
        .collect();
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    entries
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Send `frame` to every connection, optionally skipping one.
pub async fn broadcast(state: &AppState, frame: &Frame, exclude: Option<&ConnectionId>) {
    let connections = state.connections.read().await;
    for (id, conn) in connections.iter() {
        if exclude == Some(id) {
            continue;
        }
        match conn.tx.try_send(frame.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(client_id = %id, syscall = %frame.syscall, "outbound queue full; frame dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client_id = %id, syscall = %frame.syscall, "outbound queue closed; frame dropped");
            }
        }
    }
}

/// Push the current online count to everyone.
pub async fn broadcast_online_count(state: &AppState) {
    let count = online_count(state).await;
    let frame = Frame::request(SYSCALL_ONLINE, Data::new()).with_data("count", count);
    broadcast(state, &frame, None).await;
}

/// Push the full viewport list to everyone.
pub async fn broadcast_viewports(state: &AppState) {
    let entries = viewport_snapshot(state).await;
    let frame = Frame::request(SYSCALL_VIEWPORTS, Data::new())
        .with_data("viewports", serde_json::to_value(&entries).unwrap_or_default());
    broadcast(state, &frame, None).await;
}

/// Notify every connection but the submitter of a newly placed item.
pub async fn broadcast_new_item(state: &AppState, item: &CanvasItem, submitter: Option<&ConnectionId>) {
    let frame = Frame::request(SYSCALL_NEW_ITEM, Data::new())
        .with_data("item", serde_json::to_value(item).unwrap_or_default());
    broadcast(state, &frame, submitter).await;
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Register and announce a new connection.
pub async fn connect(state: &AppState, id: ConnectionId, ip: IpAddr, tx: mpsc::Sender<Frame>) {
    register(state, id, ip, tx).await;
    broadcast_online_count(state).await;
}

/// Remove a connection and tell the remaining peers.
pub async fn disconnect(state: &AppState, id: &ConnectionId) {
    unregister(state, id).await;
    broadcast_online_count(state).await;
    broadcast_viewports(state).await;
}

/// Store a viewport report and re-broadcast the snapshot.
pub async fn report_viewport(state: &AppState, id: &ConnectionId, viewport: Viewport) {
    if set_viewport(state, id, viewport).await {
        broadcast_viewports(state).await;
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
