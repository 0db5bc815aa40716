use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bot::{self, InboundUpdate};

#[derive(Clone)]
struct AppState {
    updates: mpsc::UnboundedSender<InboundUpdate>,
}

/// Builds the HTTP surface: the webhook receiver plus two liveness probes.
pub fn router(updates: mpsc::UnboundedSender<InboundUpdate>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthcheck", get(healthcheck))
        .route("/telegram", post(telegram_webhook))
        .with_state(AppState { updates })
}

/// Receives a Telegram update, enqueues it and acknowledges immediately.
///
/// The acknowledgement never waits for command processing, and a body that
/// isn't a usable update is logged and dropped while still returning 200 —
/// a non-2xx here would only make Telegram redeliver the same payload.
async fn telegram_webhook(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    match bot::parse_update(body) {
        Ok(Some(update)) => {
            if state.updates.send(update).is_err() {
                warn!("update queue closed, dropping inbound update");
            }
        }
        Ok(None) => debug!("ignoring update without message text"),
        Err(e) => warn!("dropping malformed update: {e}"),
    }
    Json(json!({"status": "ok"}))
}

async fn healthcheck() -> Json<Value> {
    Json(json!({"status": "alive"}))
}

async fn root() -> Json<Value> {
    Json(json!({"status": "TiffyAI Webhook & Pulse Live"}))
}
