//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection id and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall
//! - Frames queued by peers' broadcasts → forward to client
//!
//! Dispatch returns the frames owed to the sender; everything peers should
//! see goes through the registry broadcast helpers, never through the socket
//! directly.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:init` with `client_id`, register, broadcast
//!    `session:online`
//! 2. Client sends `item:submit` / `viewport:report` → dispatch
//! 3. Close → unregister → broadcast `session:online` + `viewport:snapshot`

use std::net::{IpAddr, SocketAddr};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::frame::{Data, ErrorCode, Frame, Status, error_data};
use crate::routes::client_ip;
use crate::services::{registry, submit};
use crate::state::{AppState, ConnectionId, Viewport};

pub const SYSCALL_SUBMIT: &str = "item:submit";
pub const SYSCALL_VIEWPORT_REPORT: &str = "viewport:report";
/// Error push for frames that could not be parsed at all.
pub const SYSCALL_GATEWAY_ERROR: &str = "gateway:error";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
enum FrameError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl ErrorCode for FrameError {
    fn error_code(&self) -> &'static str {
        "E_BAD_FRAME"
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let ip = client_ip(&headers, peer, state.config.trust_forwarded_for);
    ws.on_upgrade(move |socket| run_ws(socket, state, ip))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, ip: IpAddr) {
    let client_id = ConnectionId::generate();

    // Per-connection queue for frames broadcast by other connections.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.outbound_queue_capacity.max(1));

    let init = Frame::request(registry::SYSCALL_INIT, Data::new()).with_data("client_id", client_id.as_str());
    if send_frame(&mut socket, &init).await.is_err() {
        return;
    }

    registry::connect(&state, client_id.clone(), ip, client_tx).await;
    info!(%client_id, %ip, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for frame in process_inbound_text(&state, &client_id, ip, &text).await {
                            let _ = send_frame(&mut socket, &frame).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    registry::disconnect(&state, &client_id).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
async fn process_inbound_text(state: &AppState, client_id: &ConnectionId, ip: IpAddr, text: &str) -> Vec<Frame> {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let mut err = Frame::request(SYSCALL_GATEWAY_ERROR, error_data(&FrameError::InvalidJson(e.to_string())));
            err.status = Status::Error;
            return vec![err];
        }
    };

    // Clients only originate requests.
    if req.status.is_terminal() {
        debug!(%client_id, syscall = %req.syscall, "ws: ignoring terminal frame from client");
        return Vec::new();
    }

    let req = req.with_from(client_id.as_str());

    match req.syscall.as_str() {
        SYSCALL_SUBMIT => vec![handle_submit(state, client_id, ip, &req).await],
        SYSCALL_VIEWPORT_REPORT => handle_viewport(state, client_id, &req).await.into_iter().collect(),
        other => {
            warn!(%client_id, syscall = other, "ws: unknown syscall");
            vec![req.error_from(&FrameError::UnknownSyscall(other.to_owned()))]
        }
    }
}

async fn handle_submit(state: &AppState, client_id: &ConnectionId, ip: IpAddr, req: &Frame) -> Frame {
    let Some(text) = req.data.get("text").and_then(serde_json::Value::as_str) else {
        return req.error_from(&FrameError::InvalidPayload("text must be a string".into()));
    };

    match submit::submit_and_announce(state, ip, text, Some(client_id)).await {
        Ok(item) => {
            let mut data = Data::new();
            data.insert("item".into(), serde_json::to_value(&item).unwrap_or_default());
            req.done_with(data)
        }
        Err(e) => req.error_from(&e),
    }
}

/// Viewport reports are fire-and-forget; only a malformed one gets a reply.
async fn handle_viewport(state: &AppState, client_id: &ConnectionId, req: &Frame) -> Option<Frame> {
    let payload = serde_json::Value::Object(req.data.clone().into_iter().collect());
    let viewport: Viewport = match serde_json::from_value(payload) {
        Ok(v) => v,
        Err(e) => return Some(req.error_from(&FrameError::InvalidPayload(e.to_string()))),
    };

    registry::report_viewport(state, client_id, viewport).await;
    None
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame
            .data
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let message = frame
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if frame.prefix() == "viewport" {
        debug!(id = %frame.id, syscall = %frame.syscall, "ws: send frame");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
