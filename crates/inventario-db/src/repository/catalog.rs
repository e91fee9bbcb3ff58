//! Category names for SKU prefixes.

use std::collections::HashMap;

use inventario_core::validation::require_text;
use inventario_core::{default_category_name, Category, CoreError};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Repository for category naming.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Lists every prefix present in inventory, ordered by prefix.
    ///
    /// A stored name wins, then the built-in table, then the prefix itself.
    pub async fn category_names(&self) -> DbResult<Vec<Category>> {
        let prefixes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT
                CASE WHEN instr(sku, '-') > 0 THEN substr(sku, 1, instr(sku, '-') - 1) ELSE sku END AS prefijo
            FROM inventory
            WHERE sku IS NOT NULL AND TRIM(sku) <> ''
            ORDER BY prefijo
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let overrides: HashMap<String, String> = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT prefijo, nombre FROM categorias_prefijos",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .filter_map(|(prefix, name)| name.filter(|n| !n.trim().is_empty()).map(|n| (prefix, n)))
        .collect();

        let categories = prefixes
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(|prefix| {
                let name = overrides
                    .get(&prefix)
                    .cloned()
                    .or_else(|| default_category_name(&prefix).map(str::to_string))
                    .unwrap_or_else(|| prefix.clone());
                Category { prefix, name }
            })
            .collect();

        Ok(categories)
    }

    /// Stores a display name for a prefix, replacing any previous one.
    pub async fn rename_category(&self, prefix: &str, name: &str) -> DbResult<()> {
        let prefix = require_text("prefijo", Some(prefix)).map_err(CoreError::from)?;
        let name = require_text("nombre", Some(name)).map_err(CoreError::from)?;

        sqlx::query(
            r#"
            INSERT INTO categorias_prefijos (prefijo, nombre) VALUES (?1, ?2)
            ON CONFLICT(prefijo) DO UPDATE SET nombre = excluded.nombre
            "#,
        )
        .bind(&prefix)
        .bind(&name)
        .execute(&self.pool)
        .await?;

        info!(prefix = %prefix, name = %name, "Category renamed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_names_resolve_override_then_builtin_then_prefix() {
        let db = database().await;
        for sku in ["CPU-1", "CPU-2", "MON-1", "ZZZ-4", "SINGUION"] {
            insert_item(db.pool(), sku, None, None).await;
        }
        db.catalog().rename_category("MON", "Pantallas").await.unwrap();

        let categories = db.catalog().category_names().await.unwrap();

        let pairs: Vec<(&str, &str)> = categories.iter().map(|c| (c.prefix.as_str(), c.name.as_str())).collect();
        assert_eq!(pairs[0].0, "CPU");
        assert_eq!(pairs[0].1, default_category_name("CPU").unwrap());
        assert_eq!(pairs[1], ("MON", "Pantallas"));
        assert_eq!(pairs[2], ("SINGUION", "SINGUION"));
        assert_eq!(pairs[3], ("ZZZ", "ZZZ"));
    }

    #[tokio::test]
    async fn test_rename_upserts() {
        let db = database().await;
        insert_item(db.pool(), "TEL-1", None, None).await;

        db.catalog().rename_category("TEL", "Fijos").await.unwrap();
        db.catalog().rename_category("TEL", "Teléfonos IP").await.unwrap();

        let categories = db.catalog().category_names().await.unwrap();
        assert_eq!(categories[0].name, "Teléfonos IP");
        assert_eq!(count(db.pool(), "categorias_prefijos").await, 1);

        let err = db.catalog().rename_category("TEL", " ").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
