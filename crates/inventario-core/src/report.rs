//! # Ticket and Event Report Aggregation
//!
//! Pure grouping of sale records into receipts and day reports. The queries
//! live in `inventario-db`; this module only decides how rows combine.
//!
//! ## Grouping Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rows ordered by COALESCE(ticket_id, id), id                            │
//! │                                                                         │
//! │  id=3  ticket=NULL  ──► group 3   (legacy, singleton)                   │
//! │  id=4  ticket=9     ──┐                                                 │
//! │  id=5  ticket=9     ──┴► group 9   total = stored ticket total          │
//! │  id=11 ticket=NULL  ──► group 11                                        │
//! │                                                                         │
//! │  stored total NULL      → sum of item prices                            │
//! │  stored item count 0/NULL → number of items in the group                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{SaleEvent, SaleRecord, TicketedRecord};
use crate::NO_EVENT_STATE;

// =============================================================================
// Ticket Bundle
// =============================================================================

/// Header of a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketSummary {
    /// Ticket id, or the record id for a ticketless record.
    pub id: i64,
    /// Display code, `T-{id}`.
    pub code: String,
    /// The record the receipt was requested for.
    pub anchor_record_id: i64,
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub notes: Option<String>,
    pub sold_at: Option<String>,
    pub event_date: Option<String>,
    pub total_cents: i64,
    pub total_items: i64,
}

/// A receipt: header plus every record on the ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketBundle {
    pub ticket: TicketSummary,
    pub items: Vec<SaleRecord>,
}

/// Returns `primary` unless it is missing or blank.
fn prefer(primary: &Option<String>, fallback: &Option<String>) -> Option<String> {
    match primary {
        Some(v) if !v.is_empty() => Some(v.clone()),
        _ => fallback.clone(),
    }
}

/// Returns the receipt code for a ticket id.
pub fn ticket_code(id: i64) -> String {
    format!("T-{}", id)
}

/// Builds the receipt for `anchor`.
///
/// `ticket_items` are the records sharing the anchor's ticket, ordered by id.
/// They are ignored for a ticketless anchor, which forms a receipt on its own.
pub fn build_ticket_bundle(anchor: &TicketedRecord, ticket_items: Vec<SaleRecord>) -> TicketBundle {
    let record = &anchor.record;
    let items = match record.ticket_id {
        Some(_) => ticket_items,
        None => vec![record.clone()],
    };

    let computed = Money::sum_cents(items.iter().map(|i| i.price_cents));
    let id = record.ticket_id.unwrap_or(record.id);

    let ticket = TicketSummary {
        id,
        code: ticket_code(id),
        anchor_record_id: record.id,
        buyer: prefer(&anchor.ticket_buyer, &record.buyer),
        seller: prefer(&anchor.ticket_seller, &record.seller),
        notes: anchor.ticket_notes.clone().or_else(|| record.notes.clone()),
        sold_at: prefer(&anchor.ticket_sold_at, &record.sold_at),
        event_date: prefer(&anchor.ticket_event_date, &record.event_date),
        total_cents: anchor.ticket_total_cents.unwrap_or(computed.cents()),
        total_items: match anchor.ticket_items {
            Some(n) if n != 0 => n,
            _ => items.len() as i64,
        },
    };

    TicketBundle { ticket, items }
}

// =============================================================================
// Event Report
// =============================================================================

/// Event header of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportEvent {
    pub date: String,
    /// `OPEN`, `CERRADA`, or `SIN EVENTO` when the date has no event.
    pub state: String,
}

/// One ticket group in a day report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportTicket {
    pub id: i64,
    pub code: String,
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub notes: Option<String>,
    pub sold_at: Option<String>,
    pub total_cents: i64,
    pub total_items: i64,
    pub items: Vec<SaleRecord>,
    /// Event state at report time; `None` when the date has no event.
    pub event_state: Option<String>,
}

/// Sales of one event date, grouped by ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventReport {
    pub event: ReportEvent,
    pub tickets: Vec<ReportTicket>,
    pub total_sold_cents: i64,
    pub total_items: i64,
    pub total_tickets: i64,
}

impl EventReport {
    /// A report with no sales, for a date that has no event.
    pub fn empty(date: &str) -> Self {
        EventReport {
            event: ReportEvent {
                date: date.to_string(),
                state: NO_EVENT_STATE.to_string(),
            },
            tickets: Vec::new(),
            total_sold_cents: 0,
            total_items: 0,
            total_tickets: 0,
        }
    }
}

struct Group {
    ticket: ReportTicket,
    stored_total: Option<i64>,
    stored_items: Option<i64>,
}

/// Groups the records of `date` into tickets.
///
/// `rows` must be ordered by `COALESCE(ticket_id, id), id`; groups keep the
/// order in which their first row appears.
pub fn build_event_report(date: &str, event: Option<&SaleEvent>, rows: Vec<TicketedRecord>) -> EventReport {
    let event_state = event.map(|e| e.state.as_str().to_string());

    let mut groups: Vec<Group> = Vec::new();
    // Keyed on (has ticket, id) so a legacy record never merges into a
    // ticket that happens to share its number.
    let mut index: HashMap<(bool, i64), usize> = HashMap::new();
    let mut total_sold = Money::zero();
    let mut total_items = 0i64;

    for row in rows {
        let TicketedRecord {
            record,
            ticket_buyer,
            ticket_seller,
            ticket_notes,
            ticket_total_cents,
            ticket_items,
            ..
        } = row;

        let tid = record.ticket_id.unwrap_or(record.id);
        let slot = *index.entry((record.ticket_id.is_some(), tid)).or_insert_with(|| {
            groups.push(Group {
                ticket: ReportTicket {
                    id: tid,
                    code: ticket_code(tid),
                    buyer: prefer(&ticket_buyer, &record.buyer),
                    seller: prefer(&ticket_seller, &record.seller),
                    notes: ticket_notes.clone().or_else(|| record.notes.clone()),
                    sold_at: record.sold_at.clone(),
                    total_cents: 0,
                    total_items: 0,
                    items: Vec::new(),
                    event_state: event_state.clone(),
                },
                stored_total: ticket_total_cents,
                stored_items: ticket_items,
            });
            groups.len() - 1
        });

        total_sold += Money::from_cents(record.price_cents.unwrap_or(0));
        total_items += 1;
        groups[slot].ticket.items.push(record);
    }

    let tickets: Vec<ReportTicket> = groups
        .into_iter()
        .map(|g| {
            let mut ticket = g.ticket;
            ticket.total_cents = g
                .stored_total
                .unwrap_or_else(|| Money::sum_cents(ticket.items.iter().map(|i| i.price_cents)).cents());
            ticket.total_items = match g.stored_items {
                Some(n) if n != 0 => n,
                _ => ticket.items.len() as i64,
            };
            ticket
        })
        .collect();

    EventReport {
        event: match event {
            Some(e) => ReportEvent {
                date: e.date.clone(),
                state: e.state.as_str().to_string(),
            },
            None => ReportEvent {
                date: date.to_string(),
                state: NO_EVENT_STATE.to_string(),
            },
        },
        total_tickets: tickets.len() as i64,
        tickets,
        total_sold_cents: total_sold.cents(),
        total_items,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventState;

    fn record(id: i64, ticket_id: Option<i64>, price_cents: Option<i64>) -> SaleRecord {
        SaleRecord {
            id,
            row_id: Some(100 + id),
            sku: Some(format!("CPU-{}", id)),
            kind: None,
            brand: None,
            model: None,
            serial_number: None,
            price_cents,
            buyer: Some("Ana".into()),
            seller: Some("Sistema".into()),
            notes: None,
            sold_at: Some("2024-05-01T10:00:00".into()),
            event_date: Some("2024-05-01".into()),
            ticket_id,
        }
    }

    fn joined(rec: SaleRecord, total: Option<i64>, items: Option<i64>) -> TicketedRecord {
        let has_ticket = rec.ticket_id.is_some();
        TicketedRecord {
            record: rec,
            ticket_buyer: has_ticket.then(|| "Ana (ticket)".to_string()),
            ticket_seller: None,
            ticket_notes: None,
            ticket_sold_at: None,
            ticket_event_date: None,
            ticket_total_cents: total,
            ticket_items: items,
        }
    }

    #[test]
    fn test_bundle_for_ticketed_record() {
        let anchor = joined(record(4, Some(9), Some(10000)), Some(15050), Some(2));
        let items = vec![record(4, Some(9), Some(10000)), record(5, Some(9), Some(5050))];

        let bundle = build_ticket_bundle(&anchor, items);

        assert_eq!(bundle.ticket.id, 9);
        assert_eq!(bundle.ticket.code, "T-9");
        assert_eq!(bundle.ticket.anchor_record_id, 4);
        assert_eq!(bundle.ticket.total_cents, 15050);
        assert_eq!(bundle.ticket.total_items, 2);
        assert_eq!(bundle.ticket.buyer.as_deref(), Some("Ana (ticket)"));
        assert_eq!(bundle.ticket.seller.as_deref(), Some("Sistema"));
        assert_eq!(bundle.items.len(), 2);
    }

    #[test]
    fn test_bundle_for_legacy_record_is_singleton() {
        let anchor = joined(record(3, None, None), None, None);

        let bundle = build_ticket_bundle(&anchor, Vec::new());

        assert_eq!(bundle.ticket.id, 3);
        assert_eq!(bundle.ticket.code, "T-3");
        assert_eq!(bundle.ticket.total_cents, 0);
        assert_eq!(bundle.ticket.total_items, 1);
        assert_eq!(bundle.items[0].id, 3);
    }

    #[test]
    fn test_bundle_falls_back_to_computed_totals() {
        let anchor = joined(record(4, Some(9), Some(10000)), None, Some(0));
        let items = vec![record(4, Some(9), Some(10000)), record(5, Some(9), Some(2500))];

        let bundle = build_ticket_bundle(&anchor, items);

        assert_eq!(bundle.ticket.total_cents, 12500);
        assert_eq!(bundle.ticket.total_items, 2);
    }

    #[test]
    fn test_event_report_groups_mixed_rows() {
        let event = SaleEvent {
            date: "2024-05-01".into(),
            state: EventState::Open,
            created_at: None,
            closed_at: None,
        };
        let rows = vec![
            joined(record(3, None, Some(2000)), None, None),
            joined(record(4, Some(9), Some(10000)), None, None),
            joined(record(5, Some(9), None), None, None),
            joined(record(11, None, Some(500)), None, None),
        ];

        let report = build_event_report("2024-05-01", Some(&event), rows);

        assert_eq!(report.event.state, "OPEN");
        assert_eq!(report.total_tickets, 3);
        assert_eq!(report.total_items, 4);
        assert_eq!(report.total_sold_cents, 12500);
        let ids: Vec<i64> = report.tickets.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 9, 11]);
        assert_eq!(report.tickets[1].total_cents, 10000);
        assert_eq!(report.tickets[1].total_items, 2);
        assert_eq!(report.tickets[1].event_state.as_deref(), Some("OPEN"));
    }

    #[test]
    fn test_event_report_prefers_stored_ticket_totals() {
        let rows = vec![
            joined(record(4, Some(9), Some(10000)), Some(9999), Some(5)),
            joined(record(5, Some(9), Some(10000)), Some(9999), Some(5)),
        ];

        let report = build_event_report("2024-05-01", None, rows);

        assert_eq!(report.tickets[0].total_cents, 9999);
        assert_eq!(report.tickets[0].total_items, 5);
        assert_eq!(report.total_sold_cents, 20000);
    }

    #[test]
    fn test_event_report_totals_saturate() {
        let huge = 9_000_000_000_000_000_000;
        let rows = vec![
            joined(record(1, None, Some(huge)), None, None),
            joined(record(2, None, Some(huge)), None, None),
        ];

        let report = build_event_report("2024-05-01", None, rows);

        assert_eq!(report.total_sold_cents, i64::MAX);
        assert_eq!(report.total_items, 2);
    }

    #[test]
    fn test_zero_sale_report() {
        let report = build_event_report("2024-05-02", None, Vec::new());
        assert_eq!(report, EventReport::empty("2024-05-02"));
        assert_eq!(report.event.state, NO_EVENT_STATE);
        assert_eq!(
            (report.total_sold_cents, report.total_items, report.total_tickets),
            (0, 0, 0)
        );
    }
}
