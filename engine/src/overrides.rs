//! Owner overrides: confirm a sale, release a number, open or close the raffle,
//! edit or delete it.
//!
//! Each call takes the acting owner and fails with
//! [`RaffleError::NotOwner`](crate::RaffleError::NotOwner) for anyone else.
//! Ticket overrides go through the same guarded transition as reservations.

use crate::error::{RaffleError, Result};
use crate::inventory::TicketAction;
use crate::metrics::ReservationMetrics;
use crate::service::RaffleService;
use crate::types::{OwnerId, Raffle, RaffleId, RafflePatch, Ticket, TicketNumber};

impl RaffleService {
    /// Confirms payment: reserved → sold.
    ///
    /// # Errors
    ///
    /// - not-found for an unknown raffle or number
    /// - [`RaffleError::NotOwner`](crate::RaffleError::NotOwner)
    /// - [`RaffleError::Conflict`](crate::RaffleError::Conflict) unless the ticket is reserved
    #[tracing::instrument(skip_all, fields(owner = %owner, raffle_id = %raffle_id, number = number))]
    pub async fn mark_as_sold(
        &self,
        owner: &OwnerId,
        raffle_id: RaffleId,
        number: u32,
    ) -> Result<Ticket> {
        let number = TicketNumber::new(number)?;
        let inventory = self.registry.owned_inventory(owner, raffle_id).await?;
        let ticket = inventory
            .send(TicketAction::MarkSold { number })
            .await
            .inspect_err(|error| tracing::warn!(%error, "Sale not confirmed"))?;
        ReservationMetrics::record_override("sold");
        ticket.ok_or(RaffleError::TicketNotFound {
            number: number.get(),
        })
    }

    /// Returns a reserved or sold ticket to the pool.
    ///
    /// Releasing an available ticket succeeds without changing anything.
    ///
    /// # Errors
    ///
    /// Not-found for an unknown raffle or number, or
    /// [`RaffleError::NotOwner`](crate::RaffleError::NotOwner).
    #[tracing::instrument(skip_all, fields(owner = %owner, raffle_id = %raffle_id, number = number))]
    pub async fn release_ticket(
        &self,
        owner: &OwnerId,
        raffle_id: RaffleId,
        number: u32,
    ) -> Result<Ticket> {
        let number = TicketNumber::new(number)?;
        let inventory = self.registry.owned_inventory(owner, raffle_id).await?;
        let applied = inventory
            .apply(TicketAction::Release { number })
            .await
            .inspect_err(|error| tracing::warn!(%error, "Release refused"))?;
        if applied.changed {
            ReservationMetrics::record_override("released");
        } else {
            tracing::debug!("Ticket already available");
        }
        applied.ticket.ok_or(RaffleError::TicketNotFound {
            number: number.get(),
        })
    }

    /// Sets the active flag to the opposite of `is_active`, the flag the caller
    /// last observed.
    ///
    /// # Errors
    ///
    /// Not-found or [`RaffleError::NotOwner`](crate::RaffleError::NotOwner).
    pub async fn toggle_raffle_status(
        &self,
        owner: &OwnerId,
        raffle_id: RaffleId,
        is_active: bool,
    ) -> Result<Raffle> {
        self.registry.set_active(owner, raffle_id, !is_active).await
    }

    /// Applies metadata changes; tickets are never touched.
    ///
    /// # Errors
    ///
    /// See [`RaffleRegistry::update`](crate::registry::RaffleRegistry::update).
    pub async fn update_raffle(
        &self,
        owner: &OwnerId,
        raffle_id: RaffleId,
        patch: RafflePatch,
    ) -> Result<Raffle> {
        self.registry.update(owner, raffle_id, patch).await
    }

    /// Deletes the raffle and its 100 tickets.
    ///
    /// # Errors
    ///
    /// Not-found or [`RaffleError::NotOwner`](crate::RaffleError::NotOwner).
    pub async fn delete_raffle(&self, owner: &OwnerId, raffle_id: RaffleId) -> Result<()> {
        self.registry.delete(owner, raffle_id).await
    }
}
