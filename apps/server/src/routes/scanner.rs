//! # Scanner Routes
//!
//! ```text
//! GET  /start_scanner   spawn the worker (no-op when running)
//! GET  /stop_scanner    ask the worker to stop
//! GET  /last_scanned    {"code": "..."} once, then {"code": null}
//! POST /push_scan       {"code": "..."} from the forwarder
//! POST /simulate_scan   same, for testing without hardware
//! ```
//!
//! The supervisor is synchronous; `start` only enumerates ports and spawns a
//! thread, so it is called inline.

use axum::extract::State;
use axum::Json;
use inventario_scanner::StartOutcome;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::ok_body;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub code: Option<String>,
}

/// `GET /start_scanner`
pub async fn start(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let msg = match state.scanner.start()? {
        StartOutcome::Started { port } => format!("Scanner iniciado en {}", port),
        StartOutcome::AlreadyRunning => "Scanner ya estaba corriendo.".to_string(),
    };
    Ok(ok_body(msg, json!({ "running": true })))
}

/// `GET /stop_scanner`
pub async fn stop(State(state): State<AppState>) -> Json<Value> {
    state.scanner.stop();
    ok_body("Scanner detenido.", json!({ "running": false }))
}

/// `GET /last_scanned`
pub async fn last_scanned(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "code": state.scanner.take_last_scanned() }))
}

/// `POST /push_scan`
pub async fn push_scan(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ScanRequest>,
) -> ApiResult<Json<Value>> {
    let code = state.scanner.push_scan(body.code.as_deref().unwrap_or_default())?;
    info!(code = %code, "Scan pushed over the network");
    Ok(ok_body("scan received", json!({ "code": code })))
}

/// `POST /simulate_scan`
pub async fn simulate_scan(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ScanRequest>,
) -> ApiResult<Json<Value>> {
    let code = state.scanner.push_scan(body.code.as_deref().unwrap_or_default())?;
    Ok(ok_body("simulated", json!({ "code": code })))
}
