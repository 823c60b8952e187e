//! Visitor-side claim of a ticket.
//!
//! `reserve_ticket` never returns an `Err`: every failure, including the common
//! case of losing the race for a number, comes back as
//! [`ReservationOutcome::Rejected`] so callers (and load generators) can tell a
//! lost race apart from a fault without unwinding.

use crate::error::RaffleError;
use crate::inventory::TicketAction;
use crate::metrics::{ReservationLabel, ReservationMetrics};
use crate::service::RaffleService;
use crate::types::{Buyer, RaffleId, Ticket, TicketNumber};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Result of one reservation attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// The caller now holds the ticket
    Reserved(Ticket),
    /// The attempt failed; the ticket is unchanged
    Rejected(RaffleError),
}

impl ReservationOutcome {
    /// Whether the caller got the ticket
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Reserved(_))
    }

    /// The reserved ticket, if any
    #[must_use]
    pub const fn ticket(&self) -> Option<&Ticket> {
        match self {
            Self::Reserved(ticket) => Some(ticket),
            Self::Rejected(_) => None,
        }
    }

    /// The rejection reason, if any
    #[must_use]
    pub const fn error(&self) -> Option<&RaffleError> {
        match self {
            Self::Reserved(_) => None,
            Self::Rejected(error) => Some(error),
        }
    }

    /// Whether the attempt lost the race to another caller
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.error().is_some_and(RaffleError::is_conflict)
    }

    const fn label(&self) -> ReservationLabel {
        match self {
            Self::Reserved(_) => ReservationLabel::Won,
            Self::Rejected(RaffleError::Conflict { .. }) => ReservationLabel::Conflict,
            Self::Rejected(_) => ReservationLabel::Rejected,
        }
    }
}

impl From<Result<Ticket, RaffleError>> for ReservationOutcome {
    fn from(result: Result<Ticket, RaffleError>) -> Self {
        match result {
            Ok(ticket) => Self::Reserved(ticket),
            Err(error) => Self::Rejected(error),
        }
    }
}

/// `{"ok": true}` or `{"ok": false, "error": "<message>"}`
impl Serialize for ReservationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Reserved(_) => {
                let mut state = serializer.serialize_struct("ReservationOutcome", 1)?;
                state.serialize_field("ok", &true)?;
                state.end()
            }
            Self::Rejected(error) => {
                let mut state = serializer.serialize_struct("ReservationOutcome", 2)?;
                state.serialize_field("ok", &false)?;
                state.serialize_field("error", &error.to_string())?;
                state.end()
            }
        }
    }
}

impl RaffleService {
    /// Claims `number` of an active raffle for `buyer`.
    ///
    /// Of all attempts that find the ticket available, exactly one succeeds;
    /// the others are rejected with [`RaffleError::Conflict`]. Other rejections:
    /// not-found for an unknown raffle or a number outside `1..=100`,
    /// [`RaffleError::RaffleInactive`] for a deactivated raffle and
    /// [`RaffleError::Validation`] for a blank buyer name or phone.
    #[tracing::instrument(skip_all, fields(raffle_id = %raffle_id, number = number))]
    pub async fn reserve_ticket(
        &self,
        raffle_id: RaffleId,
        number: u32,
        buyer: Buyer,
    ) -> ReservationOutcome {
        let outcome = ReservationOutcome::from(self.try_reserve(raffle_id, number, buyer).await);
        ReservationMetrics::record(outcome.label());
        match outcome.error() {
            None => tracing::info!("Ticket reserved"),
            Some(error) if error.is_conflict() => {
                tracing::debug!(%error, "Reservation lost the race");
            }
            Some(error) => tracing::warn!(%error, "Reservation rejected"),
        }
        outcome
    }

    async fn try_reserve(
        &self,
        raffle_id: RaffleId,
        number: u32,
        buyer: Buyer,
    ) -> Result<Ticket, RaffleError> {
        let number = TicketNumber::new(number)?;
        let inventory = self.registry.active_inventory(raffle_id).await?;
        inventory
            .send(TicketAction::Reserve { number, buyer })
            .await?
            .ok_or(RaffleError::TicketNotFound {
                number: number.get(),
            })
    }
}
