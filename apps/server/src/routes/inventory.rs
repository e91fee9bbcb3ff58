//! # Inventory Routes
//!
//! Intake, lookup, search, listing, pricing, disposal and the movement
//! history.
//!
//! ## Listing Scopes
//! ```text
//! POST /venta/update_status {"scope": "single",   "rowid": 42, "precio": "99"}
//! POST /venta/update_status {"scope": "category", "rowid": 42}
//!      → every CPU-* item when item 42 is CPU-7
//! POST /venta/update_status {"scope": "selected", "rowids": "3,5,8"}
//! ```

use axum::extract::{Query, State};
use axum::Json;
use inventario_core::validation::{optional_text, parse_id_list, require_text};
use inventario_core::{
    CoreError, FieldOptions, InventoryItem, ListingScope, NewInventoryItem, OutAction, ValidationError,
    HISTORY_LIMIT,
};
use inventario_db::SearchField;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ok_body, optional_price, required_price, PriceInput};
use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson};
use crate::state::AppState;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PrefixQuery {
    pub prefijo: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SkuQuery {
    pub sku: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub search_field: Option<String>,
}

/// Body of `POST /entradas/register`.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub sku: Option<String>,
    pub id_original: Option<String>,
    pub tipo: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub no_serie: Option<String>,
    pub volts: Option<String>,
    pub precio: Option<PriceInput>,
    pub estado: Option<String>,
    pub ubicacion: Option<String>,
    pub fecha_registro: Option<String>,
    pub hoja_origen: Option<String>,
    pub observacion: Option<String>,
    pub extras: Option<String>,
}

/// Row ids as a JSON array or as the comma-separated text of a form field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RowIds {
    List(Vec<i64>),
    Csv(String),
}

impl RowIds {
    fn to_vec(&self) -> Result<Vec<i64>, ValidationError> {
        match self {
            RowIds::List(ids) => Ok(ids.clone()),
            RowIds::Csv(csv) => parse_id_list(csv),
        }
    }
}

/// Body of `POST /venta/update_status` and `POST /venta/update_price`.
#[derive(Debug, Default, Deserialize)]
pub struct ListingRequest {
    pub rowid: Option<i64>,
    pub precio: Option<PriceInput>,
    pub scope: Option<String>,
    pub rowids: Option<RowIds>,
}

impl ListingRequest {
    fn scope(&self) -> Result<ListingScope, ValidationError> {
        let scope = self.scope.as_deref().map(str::trim).unwrap_or("single");
        let row_id = || self.rowid.ok_or_else(|| ValidationError::required("rowid"));

        match scope.to_ascii_lowercase().as_str() {
            "single" => Ok(ListingScope::Single { row_id: row_id()? }),
            "category" => Ok(ListingScope::Category { row_id: row_id()? }),
            "selected" => {
                let row_ids = match &self.rowids {
                    Some(ids) => ids.to_vec()?,
                    None => Vec::new(),
                };
                if row_ids.is_empty() {
                    return Err(ValidationError::required("rowids"));
                }
                Ok(ListingScope::Selected { row_ids })
            }
            _ => Err(ValidationError::NotAllowed {
                field: "scope".to_string(),
                allowed: vec!["single".into(), "category".into(), "selected".into()],
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkOutRequest {
    pub rowid: Option<i64>,
    pub accion: Option<String>,
}

// =============================================================================
// Intake
// =============================================================================

/// `GET /entradas/next_sku?prefijo=`
pub async fn next_sku(State(state): State<AppState>, Query(query): Query<PrefixQuery>) -> ApiResult<Json<Value>> {
    let sku = state
        .db
        .inventory()
        .next_sku(query.prefijo.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "ok": true, "sku": sku })))
}

/// `GET /entradas/options?prefijo=`
pub async fn field_options(
    State(state): State<AppState>,
    Query(query): Query<PrefixQuery>,
) -> ApiResult<Json<FieldOptions>> {
    let options = state
        .db
        .inventory()
        .field_options(query.prefijo.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(options))
}

/// `GET /entradas/skus?prefijo=&q=`
pub async fn items_by_prefix(
    State(state): State<AppState>,
    Query(query): Query<PrefixQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let items = state
        .db
        .inventory()
        .list_by_prefix(query.prefijo.as_deref().unwrap_or_default(), query.q.as_deref())
        .await?;
    Ok(Json(items))
}

/// `POST /entradas/register`
pub async fn register(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<Json<Value>> {
    let sku = require_text("sku", body.sku.as_deref())?;
    let item = NewInventoryItem {
        sku: sku.clone(),
        original_id: body.id_original,
        kind: body.tipo,
        brand: body.marca,
        model: body.modelo,
        serial_number: body.no_serie,
        volts: body.volts,
        price: optional_price(body.precio.as_ref())?,
        status: body.estado,
        location: body.ubicacion,
        registered_at: optional_text(body.fecha_registro.as_deref()),
        source_sheet: body.hoja_origen,
        observation: body.observacion,
        extras: body.extras,
    };

    let row_id = state.db.inventory().register(&item, actor.as_deref()).await?;
    Ok(ok_body(format!("Producto {} registrado", sku), json!({ "rowid": row_id, "sku": sku })))
}

// =============================================================================
// Lookup and Search
// =============================================================================

/// `GET /product_by_sku?sku=`
pub async fn product_by_sku(
    State(state): State<AppState>,
    Query(query): Query<SkuQuery>,
) -> ApiResult<Json<Value>> {
    let sku = require_text("sku", query.sku.as_deref())?;
    let item = state
        .db
        .inventory()
        .get_by_sku(&sku)
        .await?
        .ok_or(CoreError::SkuNotFound(sku))?;
    Ok(Json(json!({ "ok": true, "producto": item })))
}

/// `GET /productos?q=&search_field=`
///
/// `search_field=no_serie` matches the serial number exactly; anything else
/// is a substring search.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let field = match query.search_field.as_deref().map(str::trim) {
        Some("no_serie") | Some("serie") => SearchField::Serial,
        _ => SearchField::Any,
    };
    let items = state
        .db
        .inventory()
        .search(query.q.as_deref().unwrap_or_default(), field)
        .await?;
    Ok(Json(items))
}

/// `GET /venta`
pub async fn listed_for_sale(State(state): State<AppState>) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.db.inventory().listed_for_sale().await?))
}

// =============================================================================
// Listing, Pricing, Disposal
// =============================================================================

/// `POST /venta/update_status`
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<ListingRequest>,
) -> ApiResult<Json<Value>> {
    let scope = body.scope()?;
    let price = optional_price(body.precio.as_ref())?;

    let updated = state
        .db
        .inventory()
        .list_for_sale(&scope, price, actor.as_deref())
        .await?;
    Ok(ok_body(
        format!("{} productos puestos en venta", updated),
        json!({ "actualizados": updated }),
    ))
}

/// `POST /venta/update_price`
pub async fn update_price(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<ListingRequest>,
) -> ApiResult<Json<Value>> {
    let scope = body.scope()?;
    let price = required_price("precio", body.precio.as_ref())?;

    let updated = state
        .db
        .inventory()
        .update_price(&scope, price, actor.as_deref())
        .await?;
    Ok(ok_body(
        format!("Precio actualizado a {}", price),
        json!({ "actualizados": updated }),
    ))
}

/// `POST /salidas/mark_out`
pub async fn mark_out(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<MarkOutRequest>,
) -> ApiResult<Json<Value>> {
    let row_id = body.rowid.ok_or_else(|| ValidationError::required("rowid"))?;
    let action: OutAction = require_text("accion", body.accion.as_deref())?.parse()?;

    state.db.inventory().mark_out(row_id, action, actor.as_deref()).await?;
    Ok(ok_body(
        format!("Producto marcado como {}", action.status()),
        json!({ "rowid": row_id, "estado": action.status().as_str() }),
    ))
}

// =============================================================================
// History
// =============================================================================

/// `GET /historial`
pub async fn history(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    let entries = state.db.audit().recent(HISTORY_LIMIT).await?;
    let rows = entries
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "usuario": entry.actor,
                "accion": entry.action,
                "rowid": entry.row_id,
                "sku": entry.sku,
                "detalles": entry.details_value(),
                "fecha": entry.at,
            })
        })
        .collect();
    Ok(Json(rows))
}
