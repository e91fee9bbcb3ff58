//! # Sale Routes
//!
//! Checkout and reversal.
//!
//! ## Bulk Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /salidas/registrar_ventas_bulk                                   │
//! │  {"fecha_evento": "2024-05-01", "comprador": "Ana",                    │
//! │   "items": [{"rowid": 1, "precio_venta": "100"}, {"rowid": 2, ...}]}   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse prices ── bad ──► 400 VALIDATION_ERROR                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutRepository::checkout_bulk  (one transaction)                  │
//! │       │                                                                 │
//! │       ├── event missing / closed ──► 404 / 400                         │
//! │       ├── item sold or out ─────────► 400, nothing written              │
//! │       ▼                                                                 │
//! │  {"ok": true, "ticket_id": 9, "venta_ids": [12, 13]}                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::State;
use axum::Json;
use inventario_core::validation::require_text;
use inventario_core::{CheckoutLine, CoreError, ValidationError};
use inventario_db::{BulkCheckout, SingleCheckout};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ok_body, required_price, PriceInput};
use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson};
use crate::state::AppState;

/// Body of `POST /salidas/registrar_venta`.
#[derive(Debug, Deserialize)]
pub struct SingleSaleRequest {
    pub rowid: Option<i64>,
    pub comprador: Option<String>,
    pub precio_venta: Option<PriceInput>,
    pub observaciones: Option<String>,
    pub fecha_evento: Option<String>,
}

/// One line of a bulk sale.
#[derive(Debug, Deserialize)]
pub struct BulkLine {
    pub rowid: Option<i64>,
    #[serde(alias = "precio")]
    pub precio_venta: Option<PriceInput>,
}

/// Body of `POST /salidas/registrar_ventas_bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkSaleRequest {
    #[serde(default)]
    pub items: Vec<BulkLine>,
    pub comprador: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_evento: Option<String>,
}

/// Body of `POST /ventas/revertir`.
#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    #[serde(default)]
    pub venta_ids: Vec<i64>,
}

/// `POST /salidas/registrar_venta`
pub async fn register_sale(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<SingleSaleRequest>,
) -> ApiResult<Json<Value>> {
    let row_id = body.rowid.ok_or_else(|| ValidationError::required("rowid"))?;
    let buyer = require_text("comprador", body.comprador.as_deref())?;
    let price = required_price("precio_venta", body.precio_venta.as_ref())?;

    let request = SingleCheckout {
        row_id,
        buyer,
        price,
        notes: body.observaciones,
        event_date: body.fecha_evento,
    };
    let receipt = state.db.checkout().checkout_single(&request, actor.as_deref()).await?;

    let venta_id = receipt.record_ids.first().copied();
    Ok(ok_body(
        format!("Venta registrada ({})", price),
        json!({ "ticket_id": receipt.ticket_id, "venta_id": venta_id }),
    ))
}

/// `POST /salidas/registrar_ventas_bulk`
pub async fn register_bulk_sale(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<BulkSaleRequest>,
) -> ApiResult<Json<Value>> {
    if body.items.is_empty() {
        return Err(CoreError::EmptyBatch.into());
    }
    let buyer = require_text("comprador", body.comprador.as_deref())?;
    let event_date = require_text("fecha_evento", body.fecha_evento.as_deref())?;

    let lines = body
        .items
        .iter()
        .map(|line| {
            let row_id = line.rowid.ok_or_else(|| ValidationError::required("rowid"))?;
            let price = required_price("precio_venta", line.precio_venta.as_ref())?;
            Ok(CheckoutLine { row_id, price })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let request = BulkCheckout {
        event_date,
        buyer,
        notes: body.observaciones,
        lines,
    };
    let receipt = state.db.checkout().checkout_bulk(&request, actor.as_deref()).await?;

    info!(ticket_id = receipt.ticket_id, items = receipt.record_ids.len(), "Bulk sale registered");
    Ok(ok_body(
        format!("{} ventas registradas", receipt.record_ids.len()),
        json!({ "ticket_id": receipt.ticket_id, "venta_ids": receipt.record_ids }),
    ))
}

/// `POST /ventas/revertir`
pub async fn reverse_sales(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<ReverseRequest>,
) -> ApiResult<Json<Value>> {
    let restored = state.db.checkout().reverse(&body.venta_ids, actor.as_deref()).await?;

    let restaurados: Vec<Value> = restored
        .iter()
        .map(|r| {
            json!({
                "venta_id": r.record_id,
                "rowid_producto": r.row_id,
                "sku": r.sku,
                "ticket_id": r.ticket_id,
            })
        })
        .collect();

    Ok(ok_body(
        format!("{} ventas revertidas", restored.len()),
        json!({ "restaurados": restaurados }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_line_reads_precio_venta() {
        let body: BulkSaleRequest = serde_json::from_value(json!({
            "fecha_evento": "2024-05-01",
            "comprador": "Ana",
            "items": [{ "rowid": 1, "precio_venta": "100" }, { "rowid": 2, "precio": 50 }],
        }))
        .unwrap();

        assert_eq!(body.items[0].precio_venta, Some(PriceInput::Text("100".into())));
        assert_eq!(body.items[1].precio_venta, Some(PriceInput::Number(50.0)));
    }
}
