//! Ticket inventory of one raffle and the reducer that moves tickets between states.
//!
//! **Concurrency Strategy**: every mutation goes through
//! [`TicketInventory::compare_and_transition`], which applies a change only if
//! the ticket is still in the status the caller observed. The owning
//! [`InventoryStore`](crate::store::InventoryStore) runs the reducer under an
//! exclusive lock, so for any ticket exactly one of several racing reservations
//! finds it available; the others get [`RaffleError::Conflict`].
//!
//! ```text
//! available --reserve(buyer)--> reserved --mark_sold()--> sold
//!    ^                              |                       |
//!    |------------release()---------|-----------------------|
//! ```

use crate::error::{RaffleError, Result};
use crate::types::{Buyer, Ticket, TicketNumber, TicketStats, TicketStatus, TICKETS_PER_RAFFLE};
use chrono::{DateTime, Utc};
use raffle_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// The 100 tickets of one raffle, ascending by number
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketInventory {
    tickets: Vec<Ticket>,
    closed: bool,
    last_error: Option<RaffleError>,
}

impl TicketInventory {
    /// Creates a full inventory with every number available
    #[must_use]
    pub fn new() -> Self {
        Self {
            tickets: TicketNumber::all().map(Ticket::available).collect(),
            closed: false,
            last_error: None,
        }
    }

    /// Rebuilds an inventory from stored tickets.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] unless the tickets are exactly the
    /// numbers `1..=100` in ascending order.
    pub fn from_tickets(tickets: Vec<Ticket>) -> Result<Self> {
        if tickets.len() != TICKETS_PER_RAFFLE {
            return Err(RaffleError::Validation(format!(
                "inventory must hold {TICKETS_PER_RAFFLE} tickets, found {}",
                tickets.len()
            )));
        }
        if !tickets
            .iter()
            .zip(TicketNumber::all())
            .all(|(ticket, number)| ticket.number() == number)
        {
            return Err(RaffleError::Validation(
                "inventory tickets must be numbered 1..=100 in order".to_string(),
            ));
        }
        Ok(Self {
            tickets,
            closed: false,
            last_error: None,
        })
    }

    /// All tickets ascending by number; empty once the raffle is deleted
    #[must_use]
    pub fn list(&self) -> &[Ticket] {
        if self.closed { &[] } else { &self.tickets[..] }
    }

    /// Looks up one ticket.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::TicketNotFound`] once the raffle is deleted.
    pub fn get(&self, number: TicketNumber) -> Result<&Ticket> {
        if self.closed {
            return Err(RaffleError::TicketNotFound {
                number: number.get(),
            });
        }
        Ok(&self.tickets[number.index()])
    }

    /// Counts by status
    #[must_use]
    pub fn stats(&self) -> TicketStats {
        TicketStats::from_tickets(self.list())
    }

    /// Whether the owning raffle was deleted
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Applies `mutation` only if the ticket is currently in `expected` status.
    ///
    /// This is the only way ticket state changes.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::TicketNotFound`] once the raffle is deleted
    /// - [`RaffleError::Conflict`] if the ticket is in any other status
    pub fn compare_and_transition<F>(
        &mut self,
        number: TicketNumber,
        expected: TicketStatus,
        mutation: F,
    ) -> Result<&Ticket>
    where
        F: FnOnce(&mut Ticket),
    {
        if self.closed {
            return Err(RaffleError::TicketNotFound {
                number: number.get(),
            });
        }
        let ticket = &mut self.tickets[number.index()];
        if ticket.status() != expected {
            return Err(RaffleError::Conflict {
                number,
                expected,
                actual: ticket.status(),
            });
        }
        mutation(ticket);
        Ok(ticket)
    }

    /// Takes the error left by the last reduced action, if any
    pub fn take_error(&mut self) -> Option<RaffleError> {
        self.last_error.take()
    }

    /// Owned copy of the current tickets for observers
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Ticket]> {
        Arc::from(self.list())
    }
}

impl Default for TicketInventory {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for a ticket inventory
///
/// Commands express intent; events record what happened and are only ever
/// produced by the reducer. Sending an event is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketAction {
    // Commands
    /// A visitor claims an available number
    Reserve {
        /// Number to claim
        number: TicketNumber,
        /// Buyer contact details
        buyer: Buyer,
    },

    /// The owner confirms payment for a reserved number
    MarkSold {
        /// Number to confirm
        number: TicketNumber,
    },

    /// The owner returns a reserved or sold number to the pool
    Release {
        /// Number to release
        number: TicketNumber,
    },

    /// The raffle is being deleted; no ticket resolves afterwards
    Close,

    // Events
    /// A number was reserved
    Reserved {
        /// Reserved number
        number: TicketNumber,
        /// Buyer contact details
        buyer: Buyer,
        /// When reserved
        reserved_at: DateTime<Utc>,
    },

    /// A reservation was confirmed as sold
    Sold {
        /// Sold number
        number: TicketNumber,
        /// When sold
        sold_at: DateTime<Utc>,
    },

    /// A number went back to available
    Released {
        /// Released number
        number: TicketNumber,
        /// Status before the release
        previous: TicketStatus,
        /// When released
        released_at: DateTime<Utc>,
    },

    /// The inventory was closed
    Closed {
        /// When closed
        closed_at: DateTime<Utc>,
    },
}

impl TicketAction {
    /// The ticket this action concerns, if it concerns one
    #[must_use]
    pub const fn ticket_number(&self) -> Option<TicketNumber> {
        match self {
            Self::Reserve { number, .. }
            | Self::MarkSold { number }
            | Self::Release { number }
            | Self::Reserved { number, .. }
            | Self::Sold { number, .. }
            | Self::Released { number, .. } => Some(*number),
            Self::Close | Self::Closed { .. } => None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the ticket reducer
#[derive(Clone)]
pub struct TicketEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl TicketEnvironment {
    /// Creates a new `TicketEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for a ticket inventory
///
/// Rejections are left in the state (see [`TicketInventory::take_error`]) and
/// produce no effects; committed changes produce one `Publish` effect carrying
/// the event.
#[derive(Clone, Debug, Default)]
pub struct TicketReducer;

impl TicketReducer {
    /// Creates a new `TicketReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event through the guarded transition
    fn apply_event(state: &mut TicketInventory, event: &TicketAction) -> Result<()> {
        match event {
            TicketAction::Reserved {
                number,
                buyer,
                reserved_at,
            } => state
                .compare_and_transition(*number, TicketStatus::Available, |ticket| {
                    ticket.mark_reserved(buyer.clone(), *reserved_at);
                })
                .map(drop),
            TicketAction::Sold { number, sold_at } => state
                .compare_and_transition(*number, TicketStatus::Reserved, |ticket| {
                    ticket.mark_sold(*sold_at);
                })
                .map(drop),
            TicketAction::Released {
                number, previous, ..
            } => state
                .compare_and_transition(*number, *previous, Ticket::mark_available)
                .map(drop),
            TicketAction::Closed { .. } => {
                state.closed = true;
                Ok(())
            }
            TicketAction::Reserve { .. }
            | TicketAction::MarkSold { .. }
            | TicketAction::Release { .. }
            | TicketAction::Close => Ok(()),
        }
    }

    /// Applies a freshly decided event and publishes it, or records the rejection
    fn commit(
        state: &mut TicketInventory,
        event: TicketAction,
    ) -> SmallVec<[Effect<TicketAction>; 4]> {
        match Self::apply_event(state, &event) {
            Ok(()) => smallvec![Effect::Publish(event)],
            Err(error) => Self::reject(state, error),
        }
    }

    fn reject(state: &mut TicketInventory, error: RaffleError) -> SmallVec<[Effect<TicketAction>; 4]> {
        state.last_error = Some(error);
        SmallVec::new()
    }
}

impl Reducer for TicketReducer {
    type State = TicketInventory;
    type Action = TicketAction;
    type Environment = TicketEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        state.last_error = None;

        match action {
            TicketAction::Reserve { number, buyer } => match buyer.validated() {
                Ok(buyer) => Self::commit(
                    state,
                    TicketAction::Reserved {
                        number,
                        buyer,
                        reserved_at: env.clock.now(),
                    },
                ),
                Err(error) => Self::reject(state, error),
            },

            TicketAction::MarkSold { number } => Self::commit(
                state,
                TicketAction::Sold {
                    number,
                    sold_at: env.clock.now(),
                },
            ),

            TicketAction::Release { number } => {
                let previous = match state.get(number) {
                    Ok(ticket) => ticket.status(),
                    Err(error) => return Self::reject(state, error),
                };
                if previous == TicketStatus::Available {
                    // Already released
                    return smallvec![Effect::None];
                }
                Self::commit(
                    state,
                    TicketAction::Released {
                        number,
                        previous,
                        released_at: env.clock.now(),
                    },
                )
            }

            TicketAction::Close => {
                if state.closed {
                    return smallvec![Effect::None];
                }
                Self::commit(
                    state,
                    TicketAction::Closed {
                        closed_at: env.clock.now(),
                    },
                )
            }

            TicketAction::Reserved { .. }
            | TicketAction::Sold { .. }
            | TicketAction::Released { .. }
            | TicketAction::Closed { .. } => Self::reject(
                state,
                RaffleError::Validation(
                    "ticket events are produced by the inventory, not sent to it".to_string(),
                ),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use raffle_testing::{assertions, test_clock, ReducerTest};

    fn env() -> TicketEnvironment {
        TicketEnvironment::new(Arc::new(test_clock()))
    }

    fn n(number: u32) -> TicketNumber {
        TicketNumber::new(number).unwrap()
    }

    fn reserve(number: u32, name: &str) -> TicketAction {
        TicketAction::Reserve {
            number: n(number),
            buyer: Buyer::new(name, "1122334455"),
        }
    }

    #[test]
    fn new_inventory_has_100_available_tickets() {
        let inventory = TicketInventory::new();
        assert_eq!(inventory.list().len(), TICKETS_PER_RAFFLE);
        assert!(inventory.list().iter().all(Ticket::is_available));
        let numbers: Vec<u32> = inventory.list().iter().map(|t| t.number().get()).collect();
        assert_eq!(numbers, (1..=100).collect::<Vec<_>>());
    }

    #[test]
    fn compare_and_transition_rejects_unexpected_status() {
        let mut inventory = TicketInventory::new();
        let result = inventory.compare_and_transition(n(5), TicketStatus::Reserved, |ticket| {
            ticket.mark_sold(Utc::now());
        });
        assert_eq!(
            result.unwrap_err(),
            RaffleError::Conflict {
                number: n(5),
                expected: TicketStatus::Reserved,
                actual: TicketStatus::Available,
            }
        );
        assert!(inventory.get(n(5)).unwrap().is_available());
    }

    #[test]
    fn reserve_available_ticket() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .when_action(reserve(7, "Ana"))
            .then_state(|inventory| {
                let ticket = inventory.get(n(7)).unwrap();
                assert_eq!(ticket.status(), TicketStatus::Reserved);
                assert_eq!(ticket.buyer().map(|b| b.name.as_str()), Some("Ana"));
                assert_eq!(ticket.reserved_at(), Some(test_clock().now()));
                assert_eq!(ticket.sold_at(), None);
                assert_eq!(inventory.last_error, None);
            })
            .then_effects(assertions::assert_publishes)
            .run();
    }

    #[test]
    fn second_reservation_conflicts() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .given_actions(vec![reserve(7, "Ana")])
            .when_action(reserve(7, "Beto"))
            .then_state(|inventory| {
                let ticket = inventory.get(n(7)).unwrap();
                assert_eq!(ticket.buyer().map(|b| b.name.as_str()), Some("Ana"));
                assert!(matches!(
                    inventory.last_error,
                    Some(RaffleError::Conflict {
                        actual: TicketStatus::Reserved,
                        ..
                    })
                ));
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 0))
            .run();
    }

    #[test]
    fn reservation_requires_buyer_name() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .when_action(reserve(3, "   "))
            .then_state(|inventory| {
                assert!(inventory.get(n(3)).unwrap().is_available());
                assert!(matches!(inventory.last_error, Some(RaffleError::Validation(_))));
            })
            .run();
    }

    #[test]
    fn mark_sold_requires_reservation() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .when_action(TicketAction::MarkSold { number: n(9) })
            .then_state(|inventory| {
                assert!(inventory.get(n(9)).unwrap().is_available());
                assert!(matches!(
                    inventory.last_error,
                    Some(RaffleError::Conflict {
                        expected: TicketStatus::Reserved,
                        actual: TicketStatus::Available,
                        ..
                    })
                ));
            })
            .run();
    }

    #[test]
    fn mark_sold_stamps_sale() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .given_actions(vec![reserve(9, "Ana")])
            .when_action(TicketAction::MarkSold { number: n(9) })
            .then_state(|inventory| {
                let ticket = inventory.get(n(9)).unwrap();
                assert_eq!(ticket.status(), TicketStatus::Sold);
                assert_eq!(ticket.sold_at(), Some(test_clock().now()));
                assert!(ticket.buyer().is_some());
            })
            .then_effects(assertions::assert_publishes)
            .run();
    }

    #[test]
    fn release_sold_ticket_clears_everything() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .given_actions(vec![reserve(7, "Ana"), TicketAction::MarkSold { number: n(7) }])
            .when_action(TicketAction::Release { number: n(7) })
            .then_state(|inventory| {
                assert_eq!(inventory.get(n(7)).unwrap(), &Ticket::available(n(7)));
            })
            .then_effects(|effects| {
                assert!(matches!(
                    effects[0].published(),
                    Some(TicketAction::Released {
                        previous: TicketStatus::Sold,
                        ..
                    })
                ));
            })
            .run();
    }

    #[test]
    fn release_available_ticket_is_a_no_op() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .when_action(TicketAction::Release { number: n(1) })
            .then_state(|inventory| {
                assert_eq!(inventory.last_error, None);
                assert_eq!(inventory, &TicketInventory::new());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn closed_inventory_resolves_nothing() {
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .given_actions(vec![TicketAction::Close])
            .when_action(reserve(1, "Ana"))
            .then_state(|inventory| {
                assert!(inventory.is_closed());
                assert!(inventory.list().is_empty());
                assert_eq!(
                    inventory.last_error,
                    Some(RaffleError::TicketNotFound { number: 1 })
                );
            })
            .run();
    }

    #[test]
    fn events_sent_as_commands_are_rejected() {
        let reserved_at = test_clock().now();
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .when_action(TicketAction::Reserved {
                number: n(5),
                buyer: Buyer::new("   ", ""),
                reserved_at,
            })
            .then_state(|inventory| {
                assert!(inventory.get(n(5)).unwrap().is_available());
                assert!(matches!(inventory.last_error, Some(RaffleError::Validation(_))));
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 0))
            .run();
    }

    #[test]
    fn sold_and_closed_events_cannot_bypass_commands() {
        let at = test_clock().now();
        ReducerTest::new(TicketReducer::new())
            .with_env(env())
            .given_state(TicketInventory::new())
            .given_actions(vec![
                reserve(9, "Ana"),
                TicketAction::Sold {
                    number: n(9),
                    sold_at: at,
                },
            ])
            .when_action(TicketAction::Closed { closed_at: at })
            .then_state(|inventory| {
                assert!(!inventory.is_closed());
                assert_eq!(inventory.get(n(9)).unwrap().status(), TicketStatus::Reserved);
                assert!(matches!(inventory.last_error, Some(RaffleError::Validation(_))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn from_tickets_requires_full_ordered_inventory() {
        let mut tickets: Vec<Ticket> = TicketNumber::all().map(Ticket::available).collect();
        assert!(TicketInventory::from_tickets(tickets.clone()).is_ok());
        tickets.swap(0, 1);
        assert!(TicketInventory::from_tickets(tickets.clone()).is_err());
        tickets.pop();
        assert!(TicketInventory::from_tickets(tickets).is_err());
    }
}
