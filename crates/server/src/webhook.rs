use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::{extract::State, routing::post, Json, Router};
use tracing::warn;

use leadline_telegram::router::UpdateRouter;
use leadline_telegram::update::Update;

/// Header the transport echoes back when a webhook secret was registered.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct WebhookState {
    pub router: Arc<UpdateRouter>,
    pub secret: Option<String>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/telegram/webhook", post(receive_update)).with_state(state)
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<Update>, JsonRejection>,
) -> StatusCode {
    if let Some(secret) = &state.secret {
        let provided = headers.get(SECRET_HEADER).and_then(|value| value.to_str().ok());
        if provided != Some(secret.as_str()) {
            warn!(event_name = "ingress.webhook.unauthorized", "webhook secret mismatch");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let Ok(Json(update)) = payload else {
        return StatusCode::BAD_REQUEST;
    };

    let update_id = update.update_id;
    // The transport retries non-2xx responses indefinitely; internal faults
    // are logged and answered with 200 so one bad update cannot wedge the
    // delivery queue.
    if let Err(error) = state.router.handle_update(update).await {
        warn!(
            event_name = "ingress.webhook.dispatch_failed",
            update_id,
            error = %error,
            "update processing failed"
        );
    }

    StatusCode::OK
}
