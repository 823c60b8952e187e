//! Persisted layout of a raffle: the raffle record plus its 100 tickets keyed
//! by number.
//!
//! ```json
//! {
//!   "id": "…", "ownerId": "…", "title": "…", "slug": "…", "isActive": true, …,
//!   "tickets": {
//!     "1": { "number": 1, "status": "disponible" },
//!     "7": { "number": 7, "status": "reservado", "buyerName": "Ana",
//!            "buyerPhone": "1122334455", "reservedAt": "…" },
//!     …
//!   }
//! }
//! ```

use crate::error::{RaffleError, Result};
use crate::inventory::TicketInventory;
use crate::types::{Buyer, Raffle, Ticket, TicketNumber, TicketStatus, TICKETS_PER_RAFFLE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raffle with its full inventory, as stored or exchanged
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleDocument {
    /// Raffle metadata
    #[serde(flatten)]
    pub raffle: Raffle,
    /// Tickets keyed by the string form of their number
    pub tickets: BTreeMap<String, TicketRecord>,
}

/// One stored ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    /// Ticket number
    pub number: u32,
    /// Status label
    pub status: TicketStatus,
    /// Buyer name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    /// Buyer phone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_phone: Option<String>,
    /// Buyer email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    /// When reserved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
    /// When sold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
}

impl From<&Ticket> for TicketRecord {
    fn from(ticket: &Ticket) -> Self {
        let buyer = ticket.buyer();
        Self {
            number: ticket.number().get(),
            status: ticket.status(),
            buyer_name: buyer.map(|b| b.name.clone()),
            buyer_phone: buyer.map(|b| b.phone.clone()),
            buyer_email: buyer.and_then(|b| b.email.clone()),
            reserved_at: ticket.reserved_at(),
            sold_at: ticket.sold_at(),
        }
    }
}

impl TicketRecord {
    fn into_ticket(self, number: TicketNumber) -> Result<Ticket> {
        if self.number != number.get() {
            return Err(RaffleError::Validation(format!(
                "ticket keyed '{number}' carries number {}",
                self.number
            )));
        }
        let buyer = match (self.buyer_name, self.buyer_phone) {
            (Some(name), Some(phone)) => Some(Buyer {
                name,
                phone,
                email: self.buyer_email,
            }),
            (None, None) => None,
            _ => {
                return Err(RaffleError::Validation(format!(
                    "ticket {number} has incomplete buyer data"
                )));
            }
        };
        Ticket::restore(number, self.status, buyer, self.reserved_at, self.sold_at)
    }
}

impl RaffleDocument {
    /// Builds a document from a raffle and its tickets
    #[must_use]
    pub fn new(raffle: Raffle, tickets: &[Ticket]) -> Self {
        let tickets = tickets
            .iter()
            .map(|ticket| (ticket.number().to_string(), TicketRecord::from(ticket)))
            .collect();
        Self { raffle, tickets }
    }

    /// Splits the document into the raffle and a checked inventory.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] unless the document holds exactly the
    /// keys `"1"` to `"100"` with records consistent with their status.
    pub fn into_parts(self) -> Result<(Raffle, TicketInventory)> {
        let Self {
            raffle,
            mut tickets,
        } = self;
        if tickets.len() != TICKETS_PER_RAFFLE {
            return Err(RaffleError::Validation(format!(
                "raffle {} must have {TICKETS_PER_RAFFLE} tickets, found {}",
                raffle.id,
                tickets.len()
            )));
        }
        let restored = TicketNumber::all()
            .map(|number| {
                tickets
                    .remove(&number.to_string())
                    .ok_or_else(|| {
                        RaffleError::Validation(format!("ticket {number} is missing"))
                    })
                    .and_then(|record| record.into_ticket(number))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((raffle, TicketInventory::from_tickets(restored)?))
    }

    /// Serializes to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Export`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RaffleError::Export(e.to_string()))
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] if the JSON does not match the layout.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RaffleError::Validation(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::contact::ContactHandle;
    use crate::slug::Slug;
    use crate::types::{Money, OwnerId, RaffleId};
    use raffle_testing::epoch;

    fn raffle() -> Raffle {
        Raffle {
            id: RaffleId::new(),
            owner_id: OwnerId::new("owner-1"),
            owner_name: "Marta".to_string(),
            owner_contact: ContactHandle::normalize("1122334455", "54").unwrap(),
            title: "Canasta".to_string(),
            description: String::new(),
            prize_description: "Canasta navideña".to_string(),
            ticket_price: Money::from_cents(50_000),
            slug: Slug::parse("canasta", 50).unwrap(),
            is_active: true,
            created_at: epoch(),
        }
    }

    fn document_with_reservation() -> RaffleDocument {
        let mut tickets: Vec<Ticket> = TicketNumber::all().map(Ticket::available).collect();
        tickets[6].mark_reserved(Buyer::new("Ana", "123").with_email("ana@example.com"), epoch());
        RaffleDocument::new(raffle(), &tickets)
    }

    #[test]
    fn layout_uses_string_keys_and_status_labels() {
        let json = document_with_reservation().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tickets"].as_object().unwrap().len(), 100);
        assert_eq!(value["tickets"]["7"]["status"], "reservado");
        assert_eq!(value["tickets"]["7"]["buyerName"], "Ana");
        assert_eq!(value["tickets"]["1"]["status"], "disponible");
        assert!(value["tickets"]["1"].get("buyerName").is_none());
        assert_eq!(value["isActive"], true);
        assert_eq!(value["slug"], "canasta");
    }

    #[test]
    fn parts_restore_the_inventory() {
        let document = document_with_reservation();
        let json = document.to_json().unwrap();
        let (raffle, inventory) = RaffleDocument::from_json(&json).unwrap().into_parts().unwrap();
        assert_eq!(raffle, document.raffle);
        let ticket = inventory.get(TicketNumber::new(7).unwrap()).unwrap();
        assert_eq!(ticket.status(), TicketStatus::Reserved);
        assert_eq!(
            ticket.buyer().and_then(|b| b.email.as_deref()),
            Some("ana@example.com")
        );
        assert_eq!(inventory.stats().available, 99);
    }

    #[test]
    fn missing_tickets_are_rejected() {
        let mut document = document_with_reservation();
        document.tickets.remove("100");
        assert!(matches!(
            document.into_parts(),
            Err(RaffleError::Validation(_))
        ));
    }

    #[test]
    fn mislabelled_keys_are_rejected() {
        let mut document = document_with_reservation();
        let record = document.tickets.remove("100").unwrap();
        document.tickets.insert("101".to_string(), record);
        assert!(document.into_parts().is_err());
    }

    #[test]
    fn buyer_on_available_ticket_is_rejected() {
        let mut document = document_with_reservation();
        if let Some(record) = document.tickets.get_mut("3") {
            record.buyer_name = Some("Eve".to_string());
            record.buyer_phone = Some("999".to_string());
        }
        assert!(document.into_parts().is_err());
    }
}
