//! Ticket and event report routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use inventario_core::{CoreError, EventReport};
use serde_json::{json, Value};
use tracing::warn;

use super::events::DateQuery;
use super::date_or_today;
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /venta/ticket/{venta_id}`
pub async fn ticket(State(state): State<AppState>, Path(venta_id): Path<i64>) -> ApiResult<Json<Value>> {
    let bundle = state
        .db
        .reports()
        .ticket_bundle(venta_id)
        .await?
        .ok_or(CoreError::SaleNotFound(vec![venta_id]))?;

    Ok(Json(json!({
        "ok": true,
        "ticket": bundle.ticket,
        "items": bundle.items,
    })))
}

/// `GET /venta/evento/reporte/tickets?fecha=`
///
/// Never fails on store errors: the empty report for the date is returned.
pub async fn event_tickets(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<EventReport>> {
    let date = date_or_today(query.fecha.as_deref())?;

    let report = match state.db.reports().event_report(&date).await {
        Ok(report) => report,
        Err(e) => {
            warn!(date = %date, error = %e, "Event report unavailable");
            EventReport::empty(&date)
        }
    };
    Ok(Json(report))
}
