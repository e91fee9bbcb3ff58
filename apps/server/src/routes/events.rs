//! # Sale-Event Routes
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ GET  /venta/evento/hoy       │ today's event or null + total sold       │
//! │ POST /venta/evento/abrir     │ create or reopen today's event           │
//! │ POST /venta/evento/cerrar    │ close {fecha} (default today)            │
//! │ POST /venta/evento/agregar   │ stage {rowid, precio?} into today        │
//! │ GET  /venta/evento/reporte   │ staged items of ?fecha=                  │
//! │ GET  /venta/evento           │ dashboard                                │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! The two page-style reads (`hoy` and the dashboard) never fail: a store
//! error is logged and an empty view is returned.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use inventario_core::validation::event_key;
use inventario_core::{ValidationError, NO_EVENT_STATE};
use inventario_db::{CloseOutcome, DbResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{date_or_today, event_json, major, ok_body, optional_price, parse_optional_body, PriceInput};
use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CloseRequest {
    pub fecha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StageRequest {
    pub rowid: Option<i64>,
    pub precio: Option<PriceInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub fecha: Option<String>,
}

/// `GET /venta/evento/hoy`
pub async fn today(State(state): State<AppState>, actor: Actor) -> Json<Value> {
    let summary = match state.db.events().read_today(actor.as_deref()).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "Could not read today's event");
            return Json(json!({ "ok": true, "evento": null, "total_vendido": 0.0 }));
        }
    };

    Json(json!({
        "ok": true,
        "evento": summary.event.as_ref().map(event_json),
        "total_vendido": major(summary.total_sold_cents),
    }))
}

/// `POST /venta/evento/abrir`
pub async fn open(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let event = state.db.events().reopen_today(actor.as_deref()).await?;
    Ok(ok_body("Evento abierto", json!({ "evento": event_json(&event) })))
}

/// `POST /venta/evento/cerrar`
pub async fn close(State(state): State<AppState>, actor: Actor, body: Bytes) -> ApiResult<Json<Value>> {
    let request: CloseRequest = parse_optional_body(&body)?;
    let date = date_or_today(request.fecha.as_deref())?;

    let msg = match state.db.events().close(&date, actor.as_deref()).await? {
        CloseOutcome::Closed => "Evento cerrado",
        CloseOutcome::AlreadyClosed => "Ya estaba cerrado",
    };
    Ok(ok_body(msg, json!({ "fecha": date })))
}

/// `POST /venta/evento/agregar`
pub async fn stage_item(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<StageRequest>,
) -> ApiResult<Json<Value>> {
    let row_id = body.rowid.ok_or_else(|| ValidationError::required("rowid"))?;
    let price = optional_price(body.precio.as_ref())?;

    let date = state.db.events().stage_item(row_id, price, actor.as_deref()).await?;
    Ok(ok_body("Producto agregado al evento", json!({ "fecha_evento": date })))
}

/// `GET /venta/evento/reporte?fecha=`
pub async fn staged_report(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Value>> {
    let date = date_or_today(query.fecha.as_deref())?;
    let report = state.db.events().staged_items(&date).await?;

    Ok(Json(json!({
        "ok": true,
        "fecha": date,
        "evento": event_json(&report.event),
        "items": report.items,
        "total_precio": major(report.total_price_cents),
    })))
}

/// `GET /venta/evento`
///
/// Today's event state, the items listed for sale, today's sales (newest
/// first) and the total sold. Reads only; the event is never created here.
pub async fn dashboard(State(state): State<AppState>, actor: Actor) -> Json<Value> {
    let date = event_key(inventario_db::today());
    match load_dashboard(&state, &date, actor.as_deref()).await {
        Ok(view) => Json(view),
        Err(e) => {
            warn!(error = %e, "Event dashboard unavailable");
            Json(empty_dashboard(&date, "ERROR"))
        }
    }
}

async fn load_dashboard(state: &AppState, date: &str, actor: Option<&str>) -> DbResult<Value> {
    let summary = state.db.events().read_today(actor).await?;
    let Some(event) = summary.event else {
        return Ok(empty_dashboard(date, NO_EVENT_STATE));
    };

    let listed = state.db.inventory().listed_for_sale().await?;
    let sales = state.db.reports().day_sales(date).await?;

    Ok(json!({
        "ok": true,
        "evento_fecha": date,
        "evento_estado": event.state.as_str(),
        "evento_propietario": actor,
        "productos_venta": listed,
        "ventas_hoy": sales,
        "total_vendido": major(summary.total_sold_cents),
    }))
}

fn empty_dashboard(date: &str, state: &str) -> Value {
    json!({
        "ok": true,
        "evento_fecha": date,
        "evento_estado": state,
        "productos_venta": [],
        "ventas_hoy": [],
        "total_vendido": 0.0,
    })
}
