//! Category display names.

use axum::extract::State;
use axum::Json;
use inventario_core::validation::require_text;
use inventario_core::Category;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ok_body;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub prefijo: Option<String>,
    pub nombre: Option<String>,
}

/// `GET /categorias`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.catalog().category_names().await?))
}

/// `POST /categorias/update`
pub async fn rename(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RenameRequest>,
) -> ApiResult<Json<Value>> {
    let prefix = require_text("prefijo", body.prefijo.as_deref())?;
    let name = require_text("nombre", body.nombre.as_deref())?;

    state.db.catalog().rename_category(&prefix, &name).await?;
    Ok(ok_body("Categoría actualizada", json!({ "prefijo": prefix, "nombre": name })))
}
