//! # Validation Module
//!
//! Input validation utilities for Inventario.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (axum)                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: field rules before any repository call               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository (inside the transaction)                          │
//! │  ├── Event must exist and be OPEN                                      │
//! │  └── Item must exist and not be sold / donated / scrapped              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── UNIQUE (evento_fecha, rowid_producto), conditional status update  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Date format of event keys and `evento_fecha` columns.
pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use inventario_core::validation::require_text;
///
/// assert_eq!(require_text("comprador", Some("  Ana ")).unwrap(), "Ana");
/// assert!(require_text("comprador", Some("   ")).is_err());
/// assert!(require_text("comprador", None).is_err());
/// ```
pub fn require_text(field: &str, value: Option<&str>) -> ValidationResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::required(field)),
    }
}

/// Trims an optional text field, mapping blank input to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a category prefix used for SKU numbering.
///
/// ## Rules
/// - Must not be empty
/// - Letters and digits only (it becomes the part before `-`)
///
/// Returns the prefix upper-cased.
pub fn validate_prefix(prefix: &str) -> ValidationResult<String> {
    let prefix = prefix.trim();

    if prefix.is_empty() {
        return Err(ValidationError::required("prefijo"));
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "prefijo".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(prefix.to_ascii_uppercase())
}

/// Returns the category prefix of a SKU.
///
/// The substring before the first `-`, or the whole SKU without one.
///
/// ## Example
/// ```rust
/// use inventario_core::validation::category_prefix;
///
/// assert_eq!(category_prefix("CPU-12"), "CPU");
/// assert_eq!(category_prefix("LEGACY"), "LEGACY");
/// ```
pub fn category_prefix(sku: &str) -> &str {
    match sku.split_once('-') {
        Some((prefix, _)) => prefix,
        None => sku,
    }
}

/// Formats a SKU from its prefix and number.
pub fn format_sku(prefix: &str, number: i64) -> String {
    format!("{}-{}", prefix, number)
}

// =============================================================================
// Date Validators
// =============================================================================

/// Parses an event date (`YYYY-MM-DD`).
///
/// ## Example
/// ```rust
/// use inventario_core::validation::parse_event_date;
///
/// assert!(parse_event_date("2024-05-01").is_ok());
/// assert!(parse_event_date("01/05/2024").is_err());
/// ```
pub fn parse_event_date(value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required("fecha_evento"));
    }
    NaiveDate::parse_from_str(value, EVENT_DATE_FORMAT).map_err(|e| {
        ValidationError::InvalidFormat {
            field: "fecha_evento".to_string(),
            reason: e.to_string(),
        }
    })
}

/// Formats a date as an event key.
pub fn event_key(date: NaiveDate) -> String {
    date.format(EVENT_DATE_FORMAT).to_string()
}

// =============================================================================
// Id Lists
// =============================================================================

/// Parses a comma-separated list of row ids, skipping blanks.
///
/// ## Example
/// ```rust
/// use inventario_core::validation::parse_id_list;
///
/// assert_eq!(parse_id_list("3, 5,,8").unwrap(), vec![3, 5, 8]);
/// assert!(parse_id_list("3,x").is_err());
/// ```
pub fn parse_id_list(csv: &str) -> ValidationResult<Vec<i64>> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| ValidationError::InvalidFormat {
                field: "rowids".to_string(),
                reason: format!("'{}' is not an id", s),
            })
        })
        .collect()
}

/// Removes repeated ids, keeping first-seen order.
pub fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
