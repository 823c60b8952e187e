//! Error types for the raffle engine.

use crate::types::{RaffleId, TicketNumber, TicketStatus};
use thiserror::Error;

/// Errors surfaced by registry, reservation and owner operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Neither an id nor a slug resolved, or the raffle was deleted
    #[error("raffle not found: {identifier}")]
    RaffleNotFound {
        /// Id or slug that failed to resolve
        identifier: String,
    },

    /// Ticket number outside `1..=100`
    #[error("ticket {number} not found")]
    TicketNotFound {
        /// Requested number
        number: u32,
    },

    /// The ticket is not in the status the transition requires
    ///
    /// The dominant failure in practice: someone else won the reservation race.
    #[error("ticket {number} is {actual}, expected {expected}")]
    Conflict {
        /// Ticket that was contended
        number: TicketNumber,
        /// Status the transition required
        expected: TicketStatus,
        /// Status found at the moment of application
        actual: TicketStatus,
    },

    /// Owner already has the maximum number of raffles
    #[error("raffle limit reached: an owner may have at most {limit} raffles")]
    QuotaExceeded {
        /// Configured per-owner maximum
        limit: usize,
    },

    /// Requested slug already belongs to another raffle
    #[error("slug '{slug}' is already taken")]
    DuplicateSlug {
        /// Requested slug
        slug: String,
    },

    /// Caller input failed validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Caller is not the raffle's owner
    #[error("raffle {raffle_id} is not owned by the caller")]
    NotOwner {
        /// Raffle the caller tried to manage
        raffle_id: RaffleId,
    },

    /// Raffle is closed to visitors
    #[error("raffle {raffle_id} is not accepting reservations")]
    RaffleInactive {
        /// Inactive raffle
        raffle_id: RaffleId,
    },

    /// CSV export could not be written
    #[error("export failed: {0}")]
    Export(String),
}

impl RaffleError {
    /// Whether the caller lost a race for the ticket
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the raffle or ticket does not resolve
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RaffleNotFound { .. } | Self::TicketNotFound { .. })
    }

    pub(crate) fn raffle_not_found(identifier: impl ToString) -> Self {
        Self::RaffleNotFound {
            identifier: identifier.to_string(),
        }
    }
}

/// Result type for raffle operations
pub type Result<T> = std::result::Result<T, RaffleError>;
