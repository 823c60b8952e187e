//! # Raffle Engine
//!
//! Concurrent ticket reservation for 100-number raffles.
//!
//! An owner publishes a raffle with tickets `1..=100`; visitors claim numbers
//! concurrently and the engine guarantees at most one successful claim per
//! number. The owner then confirms sales, releases numbers, deactivates or
//! deletes the raffle. Every change is pushed to live subscribers as a full
//! snapshot.
//!
//! ## Architecture
//!
//! ```text
//! RaffleService ─┬─ reservation (visitor claims)
//!                ├─ overrides   (owner transitions)
//!                └─ RaffleRegistry ── RwLock{ raffles, slug index, owner quota }
//!                        │
//!                        └─ InventoryStore (per raffle)
//!                               ├─ RwLock<TicketInventory> + TicketReducer
//!                               └─ watch channel → SnapshotStream
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use raffle_engine::{Buyer, Money, OwnerId, RaffleDraft, RaffleService};
//! use raffle_engine::config::RegistryConfig;
//!
//! # async fn example() -> Result<(), raffle_engine::RaffleError> {
//! let service = RaffleService::with_system_clock(RegistryConfig::default());
//! let owner = OwnerId::new("owner-1");
//!
//! let raffle = service
//!     .create_raffle(
//!         &owner,
//!         RaffleDraft::new("Rifa Escolar", "Bicicleta", Money::from_cents(50_000), "1122334455"),
//!     )
//!     .await?;
//!
//! let outcome = service
//!     .reserve_ticket(raffle.id, 7, Buyer::new("Ana", "1155667788"))
//!     .await;
//! assert!(outcome.is_ok());
//!
//! service.mark_as_sold(&owner, raffle.id, 7).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod contact;
pub mod document;
pub mod error;
pub mod export;
pub mod inventory;
pub mod metrics;
pub mod overrides;
pub mod registry;
pub mod reservation;
pub mod service;
pub mod slug;
pub mod store;
pub mod types;

pub use contact::{buyer_contact_link, ContactHandle};
pub use document::{RaffleDocument, TicketRecord};
pub use error::{RaffleError, Result};
pub use reservation::ReservationOutcome;
pub use service::RaffleService;
pub use slug::Slug;
pub use store::SnapshotStream;
pub use types::{
    Buyer, Money, OwnerId, Raffle, RaffleDraft, RaffleId, RafflePatch, Ticket, TicketNumber,
    TicketStats, TicketStatus, TICKETS_PER_RAFFLE,
};
