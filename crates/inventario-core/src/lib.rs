//! # inventario-core: Pure Domain Logic for Inventario
//!
//! Item lifecycle rules, prices, ticket grouping and scanner framing, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Inventario Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────┐          ┌──────────────────────────────┐    │
//! │  │  apps/server (axum)  │◄─────────│ apps/forwarder (POST scans)  │    │
//! │  └──────────┬───────────┘          └──────────────────────────────┘    │
//! │             │                                                           │
//! │  ┌──────────▼───────────┐   ┌────────────────────────────────────┐     │
//! │  │    inventario-db     │   │        inventario-scanner          │     │
//! │  │ events, checkout,    │   │ serial worker, single-slot mailbox │     │
//! │  │ reports, audit       │   └─────────────────┬──────────────────┘     │
//! │  └──────────┬───────────┘                     │                        │
//! │             │                                 │                        │
//! │  ┌──────────▼─────────────────────────────────▼──────────────────┐     │
//! │  │              ★ inventario-core (THIS CRATE) ★                  │     │
//! │  │   types · money · validation · report · framing                │     │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │     │
//! │  └────────────────────────────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryItem, SaleEvent, SaleTicket, ...)
//! - [`money`] - Money type in integer cents, parsed from user input
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//! - [`report`] - Ticket bundle and event report aggregation
//! - [`framing`] - Scanner byte stream to line framing
//!
//! ## Example Usage
//!
//! ```rust
//! use inventario_core::money::Money;
//!
//! let price = Money::parse("150.50").unwrap();
//! assert_eq!(price.cents(), 15050);
//! assert_eq!(price.to_string(), "$150.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod framing;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use report::{EventReport, TicketBundle};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Seller recorded on tickets when the request carries no user.
pub const SYSTEM_ACTOR: &str = "Sistema";

/// Event state reported for a date that has no event row.
pub const NO_EVENT_STATE: &str = "SIN EVENTO";

/// Maximum rows returned by inventory searches.
pub const MAX_SEARCH_RESULTS: i64 = 1000;

/// Maximum distinct values returned per intake field.
pub const MAX_FIELD_OPTIONS: i64 = 200;

/// Number of movement log entries shown in the history view.
pub const HISTORY_LIMIT: i64 = 200;

/// Built-in display names for category prefixes.
///
/// Stored overrides in `categorias_prefijos` take precedence.
pub const DEFAULT_CATEGORY_NAMES: &[(&str, &str)] = &[
    ("ANT", "Antenas"),
    ("UPS", "APC / Energía"),
    ("DIA", "Audífonos / Diademas"),
    ("BAJ", "Baja"),
    ("MON", "Bodega / Monitores"),
    ("BX", "Boombox"),
    ("CPU", "Computadoras / CPU"),
    ("ELI", "Eliminadores"),
    ("MAC", "Mac"),
    ("MZ", "Mezcladoras"),
    ("PR", "Pilas de Radio"),
    ("MOU", "Ratones"),
    ("TEC", "Teclados"),
    ("TEL", "Teléfonos"),
    ("WM", "Micrófonos inalámbricos"),
    ("MC", "Multicontactos / Hubs"),
    ("POLY", "Polycom"),
    ("PRO", "Proyectores"),
];

/// Looks up the built-in display name for a category prefix.
pub fn default_category_name(prefix: &str) -> Option<&'static str> {
    DEFAULT_CATEGORY_NAMES
        .iter()
        .find(|(code, _)| *code == prefix)
        .map(|(_, name)| *name)
}
