//! # HTTP Routes
//!
//! ```text
//! ┌───────────────────────┬─────────────────────────────────────────────────┐
//! │ Module                │ Paths                                           │
//! ├───────────────────────┼─────────────────────────────────────────────────┤
//! │ sales                 │ /salidas/registrar_venta[s_bulk], /ventas/...   │
//! │ events                │ /venta/evento, /venta/evento/{hoy,abrir,...}    │
//! │ reports               │ /venta/ticket/{id}, /venta/evento/reporte/...   │
//! │ scanner               │ /start_scanner, /last_scanned, /push_scan, ...  │
//! │ inventory             │ /entradas/*, /productos, /venta, /historial ... │
//! │ catalog               │ /categorias                                     │
//! └───────────────────────┴─────────────────────────────────────────────────┘
//! ```
//!
//! Mutating endpoints reply `{"ok": true, "msg": ...}`; failures go through
//! [`ApiError`](crate::error::ApiError).

pub mod catalog;
pub mod events;
pub mod inventory;
pub mod reports;
pub mod sales;
pub mod scanner;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use inventario_core::validation::{event_key, parse_event_date};
use inventario_core::{Money, SaleEvent, ValidationError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A price as sent by the browser: a JSON number or the raw text of an input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    pub fn to_money(&self) -> Result<Money, ValidationError> {
        match self {
            PriceInput::Text(text) => Money::parse(text),
            PriceInput::Number(value) => Money::from_major(*value).ok_or_else(|| ValidationError::InvalidPrice {
                value: value.to_string(),
            }),
        }
    }

    /// `None` for a blank text field.
    pub fn to_optional_money(&self) -> Result<Option<Money>, ValidationError> {
        match self {
            PriceInput::Text(text) if text.trim().is_empty() => Ok(None),
            other => other.to_money().map(Some),
        }
    }
}

/// Parses a price that must be present.
pub fn required_price(field: &str, input: Option<&PriceInput>) -> Result<Money, ValidationError> {
    match input {
        None => Err(ValidationError::required(field)),
        Some(price) => price
            .to_optional_money()?
            .ok_or_else(|| ValidationError::required(field)),
    }
}

/// Parses a price that may be omitted or left blank.
pub fn optional_price(input: Option<&PriceInput>) -> Result<Option<Money>, ValidationError> {
    input.map(PriceInput::to_optional_money).transpose().map(Option::flatten)
}

/// Decodes an optional JSON body; an empty body yields `T::default()`.
pub fn parse_optional_body<T>(bytes: &Bytes) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::validation(format!("JSON inválido: {}", e)))
}

/// Normalizes a `fecha` parameter, defaulting to today.
pub fn date_or_today(raw: Option<&str>) -> Result<String, ValidationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Ok(event_key(parse_event_date(raw)?)),
        None => Ok(event_key(inventario_db::today())),
    }
}

/// Cents as the decimal amount the pages display.
pub fn major(cents: i64) -> f64 {
    Money::from_cents(cents).as_stored()
}

pub fn event_json(event: &SaleEvent) -> Value {
    json!({
        "fecha": event.date,
        "estado": event.state.as_str(),
        "creado_cuando": event.created_at,
        "cerrado_cuando": event.closed_at,
    })
}

/// Success body with extra fields merged in.
pub fn ok_body(msg: impl Into<String>, extra: Value) -> Json<Value> {
    let mut body = json!({ "ok": true, "msg": msg.into() });
    if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
        target.extend(fields);
    }
    Json(body)
}

/// `GET /health`
///
/// Also probed by the forwarder when scanning the LAN for the server.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "ok": true, "status": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "status": "database unavailable" })),
        )
    }
}
