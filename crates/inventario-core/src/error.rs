//! # Rule Violations
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  inventario-core errors (this file)                                    │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  inventario-db errors                                                  │
//! │  └── DbError          - Store failures (wraps CoreError as Domain)     │
//! │                                                                         │
//! │  inventario-server errors                                              │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
///
/// Raised by repositories before or during a write; a write that fails with
/// one of these is always rolled back.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Inventory item does not exist.
    #[error("Producto {0} no encontrado")]
    ItemNotFound(i64),

    /// No inventory item carries the given SKU.
    #[error("Producto con SKU {0} no encontrado")]
    SkuNotFound(String),

    /// One or more sale records do not exist.
    ///
    /// ## When This Occurs
    /// - Reversal called with ids that were already reversed
    /// - Ticket view requested for a deleted record
    #[error("Ventas no encontradas: {0:?}")]
    SaleNotFound(Vec<i64>),

    /// No sale event exists for the date.
    #[error("No existe evento para la fecha {0}")]
    EventNotFound(String),

    /// The event exists but is not accepting sales.
    ///
    /// ## User Workflow
    /// ```text
    /// Bulk checkout (fecha_evento = 2024-05-01)
    ///      │
    ///      ▼
    /// venta_eventos.estado = 'CERRADA'
    ///      │
    ///      ▼
    /// EventNotOpen { date: "2024-05-01" }  → nothing written
    /// ```
    #[error("El evento {date} no está abierto")]
    EventNotOpen { date: String },

    /// Today's event is closed, so items cannot be staged into it.
    #[error("Evento cerrado")]
    EventClosed { date: String },

    /// Item is sold, donated or scrapped.
    #[error("Producto {sku} ya no está disponible ({status})")]
    ItemUnavailable { sku: String, status: String },

    /// Bulk checkout called with no items.
    #[error("No hay artículos para vender")]
    EmptyBatch,

    /// Serial number already registered on another item.
    #[error("No. serie ya registrado: {0}")]
    DuplicateSerial(String),

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for errors that mean "the thing asked for is absent".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ItemNotFound(_)
                | CoreError::SkuNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::EventNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Checked before any write; never audited.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Price is not a finite, non-negative number.
    #[error("Precio inválido: {value}")]
    InvalidPrice { value: String },

    /// Invalid format (e.g., invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::ItemUnavailable {
            sku: "CPU-12".to_string(),
            status: "VENDIDO".to_string(),
        };
        assert_eq!(err.to_string(), "Producto CPU-12 ya no está disponible (VENDIDO)");

        let err = CoreError::EventNotOpen {
            date: "2024-05-01".to_string(),
        };
        assert_eq!(err.to_string(), "El evento 2024-05-01 no está abierto");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("comprador").to_string(), "comprador is required");

        let err = ValidationError::InvalidPrice {
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Precio inválido: abc");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("sku").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "sku is required");
    }

    #[test]
    fn test_not_found_classification() {
        assert!(CoreError::ItemNotFound(1).is_not_found());
        assert!(CoreError::EventNotFound("2024-05-01".into()).is_not_found());
        assert!(!CoreError::EmptyBatch.is_not_found());
    }
}
