//! Canvas item routes: bulk read and HTTP submission.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::frame::error_data;
use crate::routes::client_ip;
use crate::services::registry;
use crate::services::submit::{self, SubmitError};
use crate::state::{AppState, CanvasItem, ConnectionId};

#[derive(Serialize)]
pub struct ItemsResponse {
    pub items: Vec<CanvasItem>,
    pub jokes: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct SubmitBody {
    pub text: String,
    /// Websocket connection of the submitter, if it holds one. It is left
    /// out of the new-item fan-out only when it was opened from the same
    /// address as this request.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// `GET /api/items` — every placed item plus the caption dataset.
pub async fn list_items(State(state): State<AppState>) -> Response {
    match state.store.items().await {
        Ok(items) => Json(ItemsResponse { items, jokes: state.jokes.as_ref().clone() }).into_response(),
        Err(e) => {
            error!(error = %e, "bulk read failed");
            submit_error_response(&SubmitError::from(e))
        }
    }
}

/// `POST /api/items` — place a snippet without a websocket.
pub async fn create_item(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<SubmitBody>,
) -> Response {
    let ip = client_ip(&headers, peer, state.config.trust_forwarded_for);
    let mut submitter = body.client_id.as_deref().map(ConnectionId::from);
    if let Some(id) = &submitter {
        if !registry::is_owned_by(&state, id, ip).await {
            warn!(client_id = %id, %ip, "client_id not registered from this address; ignoring");
            submitter = None;
        }
    }

    match submit::submit_and_announce(&state, ip, &body.text, submitter.as_ref()).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => submit_error_response(&e),
    }
}

pub(crate) fn submit_error_status(err: &SubmitError) -> StatusCode {
    match err {
        SubmitError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        SubmitError::Invalid(_) => StatusCode::BAD_REQUEST,
        SubmitError::Congested(_) => StatusCode::SERVICE_UNAVAILABLE,
        SubmitError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn submit_error_response(err: &SubmitError) -> Response {
    (submit_error_status(err), Json(error_data(err))).into_response()
}

#[cfg(test)]
#[path = "items_test.rs"]
mod tests;
