use std::sync::atomic::Ordering;

use axum::{Json, extract::State};
use serde_json::json;
use tokio::time::{Duration, timeout};

use super::run_blocking;
use crate::SharedState;
use crate::error::ApiError;

const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn livez() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readyz(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.readiness.load(Ordering::SeqCst) {
        return Err(ApiError::ServiceUnavailable("shutting_down".into()));
    }

    let store = state.store.clone();
    let probe = run_blocking(move || {
        store
            .list_tutors()
            .map(|tutors| tutors.len())
            .map_err(|err| ApiError::ServiceUnavailable(format!("store check failed: {err}")))
    });

    let tutors = timeout(READINESS_TIMEOUT, probe)
        .await
        .map_err(|_| ApiError::ServiceUnavailable("store_probe_timeout".into()))??;

    Ok(Json(json!({
        "status": "ok",
        "store": "ok",
        "tutors": tutors,
        "application": env!("CARGO_PKG_NAME"),
    })))
}
