//! Per-raffle store: the inventory, its reducer and the snapshot channel.
//!
//! The store owns one raffle's [`TicketInventory`] behind a `RwLock` and runs
//! every action through [`TicketReducer`] while holding the write lock. That
//! lock is what makes `compare_and_transition` linearizable per ticket.
//!
//! After each committed change the store publishes an owned snapshot on a
//! `watch` channel. Subscribers always see the latest value; intermediate
//! snapshots may be skipped, never reordered.

use crate::error::{RaffleError, Result};
use crate::inventory::{TicketAction, TicketEnvironment, TicketInventory, TicketReducer};
use crate::metrics::{InventoryMetrics, SubscriberGuard};
use crate::types::{RaffleId, Ticket, TicketNumber, TicketStats};
use futures::Stream;
use raffle_core::{environment::Clock, reducer::Reducer};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};

/// Live sequence of full ticket snapshots for one raffle
///
/// Yields the current snapshot first, then one after every committed change.
/// Ends when the raffle is deleted. Dropping the stream unsubscribes.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Arc<[Ticket]>> + Send>>;

/// Result of an accepted action
#[derive(Debug)]
pub(crate) struct Applied {
    /// Affected ticket after the action
    pub(crate) ticket: Option<Ticket>,
    /// Whether a change was committed and published
    pub(crate) changed: bool,
}

/// Owner of one raffle's ticket inventory
pub struct InventoryStore {
    raffle_id: RaffleId,
    state: RwLock<TicketInventory>,
    reducer: TicketReducer,
    environment: TicketEnvironment,
    snapshots: watch::Sender<Option<Arc<[Ticket]>>>,
}

impl InventoryStore {
    /// Creates a store around a complete inventory
    #[must_use]
    pub fn new(raffle_id: RaffleId, inventory: TicketInventory, clock: Arc<dyn Clock>) -> Self {
        let (snapshots, _) = watch::channel(Some(inventory.snapshot()));
        Self {
            raffle_id,
            state: RwLock::new(inventory),
            reducer: TicketReducer::new(),
            environment: TicketEnvironment::new(clock),
            snapshots,
        }
    }

    /// Raffle this inventory belongs to
    #[must_use]
    pub const fn raffle_id(&self) -> RaffleId {
        self.raffle_id
    }

    /// Reduces one action under the write lock.
    ///
    /// Returns the affected ticket after the change, or `None` for actions that
    /// do not concern a single ticket.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::RaffleNotFound`] if the raffle was deleted
    /// - any rejection the reducer recorded, e.g. [`RaffleError::Conflict`]
    pub async fn send(&self, action: TicketAction) -> Result<Option<Ticket>> {
        Ok(self.apply(action).await?.ticket)
    }

    /// Like [`send`](Self::send), also telling whether anything changed.
    ///
    /// An accepted no-op, such as releasing an available ticket, reports
    /// `changed == false`.
    #[tracing::instrument(
        skip(self, action),
        name = "inventory_send",
        fields(raffle_id = %self.raffle_id, number = ?action.ticket_number())
    )]
    pub(crate) async fn apply(&self, action: TicketAction) -> Result<Applied> {
        let number = action.ticket_number();
        let mut state = self.state.write().await;
        if state.is_closed() {
            return Err(RaffleError::raffle_not_found(self.raffle_id));
        }

        let start = Instant::now();
        let effects = self.reducer.reduce(&mut *state, action, &self.environment);
        InventoryMetrics::record_reduce(start.elapsed());

        if let Some(error) = state.take_error() {
            tracing::debug!(%error, "Action rejected");
            return Err(error);
        }

        let mut changed = false;
        for event in effects.iter().filter_map(|effect| effect.published()) {
            tracing::debug!(?event, "Inventory changed");
            changed = true;
        }
        if changed {
            let snapshot = (!state.is_closed()).then(|| state.snapshot());
            self.snapshots.send_replace(snapshot);
        }

        Ok(Applied {
            ticket: number.and_then(|number| state.get(number).ok().cloned()),
            changed,
        })
    }

    /// Current tickets, ascending by number.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] if the raffle was deleted.
    pub async fn list(&self) -> Result<Vec<Ticket>> {
        let state = self.state.read().await;
        if state.is_closed() {
            return Err(RaffleError::raffle_not_found(self.raffle_id));
        }
        Ok(state.list().to_vec())
    }

    /// One ticket.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] if the raffle was deleted.
    pub async fn get(&self, number: TicketNumber) -> Result<Ticket> {
        let state = self.state.read().await;
        if state.is_closed() {
            return Err(RaffleError::raffle_not_found(self.raffle_id));
        }
        state.get(number).cloned()
    }

    /// Counts by status.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] if the raffle was deleted.
    pub async fn stats(&self) -> Result<TicketStats> {
        let state = self.state.read().await;
        if state.is_closed() {
            return Err(RaffleError::raffle_not_found(self.raffle_id));
        }
        Ok(state.stats())
    }

    /// Closes the inventory; every later call fails and every stream ends.
    pub async fn close(&self) {
        // Closing twice is a no-op in the reducer
        if let Err(error) = self.send(TicketAction::Close).await {
            tracing::debug!(%error, "Inventory already closed");
        }
    }

    /// Opens a live snapshot subscription
    #[must_use]
    pub fn subscribe(&self) -> SnapshotStream {
        let mut rx = self.snapshots.subscribe();
        let raffle_id = self.raffle_id;
        let stream = async_stream::stream! {
            let _guard = SubscriberGuard::new();
            tracing::debug!(%raffle_id, "Snapshot subscriber attached");
            loop {
                let current = rx.borrow_and_update().clone();
                match current {
                    Some(snapshot) => yield snapshot,
                    None => break,
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!(%raffle_id, "Snapshot subscriber finished");
        };
        Box::pin(stream)
    }

    /// Number of open subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.snapshots.receiver_count()
    }
}
