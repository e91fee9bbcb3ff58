//! # Domain Types
//!
//! Core domain types used throughout Inventario.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  InventoryItem  │   │   SaleTicket    │   │   SaleEvent     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  row_id (rowid) │◄──┤  id             │   │  date (PK)      │       │
//! │  │  sku PREF-N     │   │  total_cents    │   │  state          │       │
//! │  │  status         │   │  total_items    │   │  OPEN/CERRADA   │       │
//! │  └─────────────────┘   └────────▲────────┘   └────────▲────────┘       │
//! │          ▲                      │ 1..N                │ by date        │
//! │          │             ┌────────┴────────┐            │                │
//! │          └─────────────┤   SaleRecord    ├────────────┘                │
//! │                        │  snapshot of    │                             │
//! │                        │  item at sale   │                             │
//! │                        └─────────────────┘                             │
//! │                                                                         │
//! │  MovementEntry: append-only audit trail, never a source of truth       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Inventory items are keyed by the SQLite `rowid` of the legacy `inventory`
//! table. SKUs (`PREFIX-NUMBER`) are human-facing and unique by convention
//! only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Item Status
// =============================================================================

/// Lifecycle status of an inventory item.
///
/// The column is free text in legacy data; anything not listed here (or
/// NULL) means "in stock, not listed".
///
/// ```text
/// {none, VENTA} ──checkout──► VENDIDO ──reversal──► VENTA
/// {any}         ──mark out──► DONADO | OBSOLETO
/// {any}         ──listing───► VENTA
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    /// Listed for sale.
    Venta,
    /// Sold through checkout.
    Vendido,
    /// Given away.
    Donado,
    /// Scrapped.
    Obsoleto,
}

impl ItemStatus {
    /// Value stored in `inventory.estado`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Venta => "VENTA",
            ItemStatus::Vendido => "VENDIDO",
            ItemStatus::Donado => "DONADO",
            ItemStatus::Obsoleto => "OBSOLETO",
        }
    }

    /// Statuses that take an item out of circulation.
    pub const TERMINAL: [ItemStatus; 3] =
        [ItemStatus::Vendido, ItemStatus::Donado, ItemStatus::Obsoleto];

    /// Returns true if this status forbids checkout and event staging.
    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

impl FromStr for ItemStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VENTA" => Ok(ItemStatus::Venta),
            "VENDIDO" => Ok(ItemStatus::Vendido),
            "DONADO" => Ok(ItemStatus::Donado),
            "OBSOLETO" => Ok(ItemStatus::Obsoleto),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Event State
// =============================================================================

/// State of a day-scoped sale event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum EventState {
    /// Accepting checkouts.
    #[serde(rename = "OPEN")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "OPEN"))]
    Open,
    /// Closed manually or by the day rollover.
    #[serde(rename = "CERRADA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CERRADA"))]
    Closed,
}

impl EventState {
    /// Value stored in `venta_eventos.estado`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventState::Open => "OPEN",
            EventState::Closed => "CERRADA",
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Action Codes
// =============================================================================

/// Action codes written to the movement log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCode {
    Entrada,
    PonerVenta,
    PonerVentaCategoria,
    CambiarPrecio,
    CambiarPrecioCategoria,
    Donado,
    Obsoleto,
    VentaRegistrada,
    VentaRevertida,
    CrearEvento,
    CerrarEventoAuto,
    CerrarEventoManual,
    EventoAgregar,
}

impl ActionCode {
    /// Value stored in `movimientos.accion`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActionCode::Entrada => "ENTRADA",
            ActionCode::PonerVenta => "PONER_VENTA",
            ActionCode::PonerVentaCategoria => "PONER_VENTA_CATEGORIA",
            ActionCode::CambiarPrecio => "CAMBIAR_PRECIO",
            ActionCode::CambiarPrecioCategoria => "CAMBIAR_PRECIO_CATEGORIA",
            ActionCode::Donado => "DONADO",
            ActionCode::Obsoleto => "OBSOLETO",
            ActionCode::VentaRegistrada => "VENTA_REGISTRADA",
            ActionCode::VentaRevertida => "VENTA_REVERTIDA",
            ActionCode::CrearEvento => "CREAR_EVENTO",
            ActionCode::CerrarEventoAuto => "CERRAR_EVENTO_AUTO",
            ActionCode::CerrarEventoManual => "CERRAR_EVENTO_MANUAL",
            ActionCode::EventoAgregar => "EVENTO_AGREGAR",
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Disposal and Listing Scopes
// =============================================================================

/// Ways an item leaves inventory without being sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OutAction {
    Donado,
    Obsoleto,
}

impl OutAction {
    /// Resulting item status.
    pub const fn status(&self) -> ItemStatus {
        match self {
            OutAction::Donado => ItemStatus::Donado,
            OutAction::Obsoleto => ItemStatus::Obsoleto,
        }
    }

    /// Audit code recorded for the action.
    pub const fn action_code(&self) -> ActionCode {
        match self {
            OutAction::Donado => ActionCode::Donado,
            OutAction::Obsoleto => ActionCode::Obsoleto,
        }
    }
}

impl FromStr for OutAction {
    type Err = ValidationError;

    /// Case-insensitive; `BASURA` is an alias for `OBSOLETO`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DONADO" => Ok(OutAction::Donado),
            "OBSOLETO" | "BASURA" => Ok(OutAction::Obsoleto),
            _ => Err(ValidationError::NotAllowed {
                field: "accion".to_string(),
                allowed: vec!["DONADO".into(), "OBSOLETO".into(), "BASURA".into()],
            }),
        }
    }
}

/// Which items a listing operation touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ListingScope {
    /// One item.
    Single { row_id: i64 },
    /// Every item sharing the category prefix of `row_id`.
    Category { row_id: i64 },
    /// An explicit list of items.
    Selected { row_ids: Vec<i64> },
}

// =============================================================================
// Inventory
// =============================================================================

/// One physical unit in stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    /// SQLite rowid; stable for the life of the item.
    pub row_id: i64,
    pub sku: String,
    pub original_id: Option<String>,
    pub kind: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub volts: Option<String>,
    /// Current price in cents, if priced.
    pub price_cents: Option<i64>,
    /// Raw status text; see [`ItemStatus`].
    pub status: Option<String>,
    pub location: Option<String>,
    pub registered_at: Option<String>,
    pub source_sheet: Option<String>,
    pub observation: Option<String>,
    pub extras: Option<String>,
}

impl InventoryItem {
    /// Parsed status, if it is one of the known values.
    pub fn status(&self) -> Option<ItemStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    /// Returns the terminal status that blocks selling this item, if any.
    pub fn unavailable_status(&self) -> Option<ItemStatus> {
        self.status().filter(ItemStatus::is_terminal)
    }

    /// Current price, if priced.
    pub fn price(&self) -> Option<Money> {
        self.price_cents.map(Money::from_cents)
    }

    /// Category prefix of this item's SKU.
    pub fn category_prefix(&self) -> &str {
        crate::validation::category_prefix(&self.sku)
    }
}

/// Input for registering a new item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInventoryItem {
    pub sku: String,
    pub original_id: Option<String>,
    pub kind: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub volts: Option<String>,
    pub price: Option<Money>,
    pub status: Option<String>,
    pub location: Option<String>,
    /// Defaults to the current local time when absent.
    pub registered_at: Option<String>,
    pub source_sheet: Option<String>,
    pub observation: Option<String>,
    pub extras: Option<String>,
}

/// Distinct values already used for a category, offered as intake choices.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FieldOptions {
    pub kinds: Vec<String>,
    pub brands: Vec<String>,
    pub models: Vec<String>,
    pub statuses: Vec<String>,
    pub locations: Vec<String>,
    pub volts: Vec<String>,
}

/// A category prefix and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub prefix: String,
    pub name: String,
}

// =============================================================================
// Sale Events
// =============================================================================

/// A day-scoped sale session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleEvent {
    /// ISO date `YYYY-MM-DD`.
    pub date: String,
    pub state: EventState,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
}

impl SaleEvent {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == EventState::Open
    }
}

/// Today's event (if any) and what has been sold under it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TodaySummary {
    pub event: Option<SaleEvent>,
    pub total_sold_cents: i64,
}

/// An item pre-staged into an event, joined with its current inventory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StagedItem {
    pub row_id: i64,
    pub sku: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    /// Current inventory price.
    pub price_cents: Option<i64>,
    /// Price given when the item was staged.
    pub assigned_price_cents: Option<i64>,
    pub added_by: Option<String>,
    pub added_at: Option<String>,
}

// =============================================================================
// Tickets and Sale Records
// =============================================================================

/// One checkout transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleTicket {
    pub id: i64,
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub notes: Option<String>,
    pub sold_at: Option<String>,
    pub event_date: Option<String>,
    pub total_cents: Option<i64>,
    pub total_items: Option<i64>,
}

/// One sold unit, with a snapshot of the item taken at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleRecord {
    pub id: i64,
    pub row_id: Option<i64>,
    pub sku: Option<String>,
    pub kind: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub price_cents: Option<i64>,
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub notes: Option<String>,
    pub sold_at: Option<String>,
    pub event_date: Option<String>,
    /// NULL on records written before tickets existed.
    pub ticket_id: Option<i64>,
}

/// A sale record left-joined with its ticket.
///
/// Ticket columns are all `None` for legacy ticketless records or when the
/// ticket row is gone.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TicketedRecord {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub record: SaleRecord,
    pub ticket_buyer: Option<String>,
    pub ticket_seller: Option<String>,
    pub ticket_notes: Option<String>,
    pub ticket_sold_at: Option<String>,
    pub ticket_event_date: Option<String>,
    pub ticket_total_cents: Option<i64>,
    pub ticket_items: Option<i64>,
}

/// One line of a checkout request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutLine {
    pub row_id: i64,
    pub price: Money,
}

/// Ids written by a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutReceipt {
    pub ticket_id: i64,
    pub record_ids: Vec<i64>,
}

/// A sale record undone by reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReversedSale {
    pub record_id: i64,
    pub row_id: Option<i64>,
    pub sku: Option<String>,
    pub ticket_id: Option<i64>,
}

// =============================================================================
// Movement Log
// =============================================================================

/// One entry of the append-only movement log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MovementEntry {
    pub id: i64,
    pub actor: Option<String>,
    pub action: String,
    pub row_id: Option<i64>,
    pub sku: Option<String>,
    /// Raw JSON detail blob.
    pub details: Option<String>,
    pub at: Option<String>,
}

impl MovementEntry {
    /// Decodes the detail blob, keeping non-JSON text as a plain string.
    pub fn details_value(&self) -> serde_json::Value {
        match self.details.as_deref() {
            None => serde_json::Value::Null,
            Some(raw) => serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string())),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
