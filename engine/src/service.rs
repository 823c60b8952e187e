//! Caller-facing facade over the registry.
//!
//! [`RaffleService`] is what the owner dashboard and the public page talk to.
//! Read operations and raffle lifecycle calls live here; the visitor claim path
//! is in [`crate::reservation`] and the owner overrides in [`crate::overrides`].

use crate::config::RegistryConfig;
use crate::document::RaffleDocument;
use crate::error::Result;
use crate::export;
use crate::registry::RaffleRegistry;
use crate::store::SnapshotStream;
use crate::types::{OwnerId, Raffle, RaffleDraft, RaffleId, Ticket, TicketNumber, TicketStats};
use raffle_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Entry point for every raffle operation
#[derive(Clone)]
pub struct RaffleService {
    pub(crate) registry: Arc<RaffleRegistry>,
}

impl RaffleService {
    /// Creates a service over a fresh registry
    #[must_use]
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Arc::new(RaffleRegistry::new(config, clock)),
        }
    }

    /// Creates a service using the system clock
    #[must_use]
    pub fn with_system_clock(config: RegistryConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Underlying registry
    #[must_use]
    pub fn registry(&self) -> &RaffleRegistry {
        &self.registry
    }

    /// Creates a raffle and its 100 tickets.
    ///
    /// # Errors
    ///
    /// See [`RaffleRegistry::create`].
    pub async fn create_raffle(&self, owner: &OwnerId, draft: RaffleDraft) -> Result<Raffle> {
        self.registry.create(owner, draft).await
    }

    /// Resolves a raffle by id or slug.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`](crate::RaffleError::RaffleNotFound)
    /// if nothing matches.
    pub async fn get_raffle(&self, identifier: &str) -> Result<Raffle> {
        self.registry.get(identifier).await
    }

    /// Raffles of one owner, newest first
    pub async fn list_owned(&self, owner: &OwnerId) -> Vec<Raffle> {
        self.registry.list_owned(owner).await
    }

    /// All 100 tickets of a raffle, ascending by number.
    ///
    /// # Errors
    ///
    /// Returns not-found if the identifier does not resolve.
    pub async fn list_tickets(&self, identifier: &str) -> Result<Vec<Ticket>> {
        let raffle = self.registry.get(identifier).await?;
        self.registry.inventory(raffle.id).await?.list().await
    }

    /// One ticket of a raffle.
    ///
    /// # Errors
    ///
    /// Returns not-found if the raffle does not resolve or `number` is outside
    /// `1..=100`.
    pub async fn get_ticket(&self, identifier: &str, number: u32) -> Result<Ticket> {
        let number = TicketNumber::new(number)?;
        let raffle = self.registry.get(identifier).await?;
        self.registry.inventory(raffle.id).await?.get(number).await
    }

    /// Ticket counts by status.
    ///
    /// # Errors
    ///
    /// Returns not-found if the raffle does not resolve.
    pub async fn stats(&self, id: RaffleId) -> Result<TicketStats> {
        self.registry.inventory(id).await?.stats().await
    }

    /// Live snapshots of a raffle's tickets.
    ///
    /// # Errors
    ///
    /// Returns not-found if the raffle does not resolve.
    pub async fn subscribe(&self, id: RaffleId) -> Result<SnapshotStream> {
        Ok(self.registry.inventory(id).await?.subscribe())
    }

    /// CSV of reserved and sold tickets, for the raffle's owner.
    ///
    /// # Errors
    ///
    /// Returns not-found, [`RaffleError::NotOwner`](crate::RaffleError::NotOwner)
    /// or an export failure.
    pub async fn export_csv(&self, owner: &OwnerId, id: RaffleId) -> Result<String> {
        let tickets = self.registry.owned_inventory(owner, id).await?.list().await?;
        export::tickets_to_csv(&tickets)
    }

    /// Download name for a raffle's CSV export.
    ///
    /// # Errors
    ///
    /// Returns not-found if the raffle does not resolve.
    pub async fn csv_file_name(&self, id: RaffleId) -> Result<String> {
        let raffle = self.registry.get_by_id(id).await?;
        Ok(export::csv_file_name(&raffle))
    }

    /// Persisted document of a raffle.
    ///
    /// # Errors
    ///
    /// Returns not-found if the raffle does not resolve.
    pub async fn export_document(&self, id: RaffleId) -> Result<RaffleDocument> {
        self.registry.export(id).await
    }

    /// Adds a raffle from its persisted document.
    ///
    /// # Errors
    ///
    /// See [`RaffleRegistry::load`].
    pub async fn load_document(&self, document: RaffleDocument) -> Result<Raffle> {
        self.registry.load(document).await
    }
}
