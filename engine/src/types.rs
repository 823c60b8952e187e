//! Domain types for the raffle engine.
//!
//! Identifiers, money, ticket numbers and the two entities the engine tracks:
//! [`Raffle`] (metadata owned by the registry) and [`Ticket`] (one of the 100
//! numbered slots owned by a raffle's inventory).

use crate::contact::ContactHandle;
use crate::error::RaffleError;
use crate::slug::Slug;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of tickets every raffle owns.
pub const TICKETS_PER_RAFFLE: usize = 100;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaffleId(Uuid);

impl RaffleId {
    /// Creates a new random `RaffleId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RaffleId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses an identifier string, returning `None` when it is not a raffle id
    #[must_use]
    pub fn parse(identifier: &str) -> Option<Self> {
        Uuid::parse_str(identifier).ok().map(Self)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RaffleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RaffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of a raffle owner, supplied by the authentication layer
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wraps an identity issued by the authentication layer
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Money amount in cents (avoids floating point errors)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// A ticket number, always within `1..=100`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TicketNumber(u8);

impl TicketNumber {
    /// Lowest ticket number
    pub const MIN: u32 = 1;
    /// Highest ticket number
    pub const MAX: u32 = 100;

    /// Validates a raw number.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::TicketNotFound`] when `number` is outside `1..=100`.
    pub fn new(number: u32) -> Result<Self, RaffleError> {
        if (Self::MIN..=Self::MAX).contains(&number) {
            #[allow(clippy::cast_possible_truncation)] // bounded by MAX above
            Ok(Self(number as u8))
        } else {
            Err(RaffleError::TicketNotFound { number })
        }
    }

    /// Every ticket number in ascending order
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=100_u8).map(Self)
    }

    /// The raw number
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0 as u32
    }

    /// Zero-based position within an inventory
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl TryFrom<u32> for TicketNumber {
    type Error = RaffleError;

    fn try_from(number: u32) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<TicketNumber> for u32 {
    fn from(number: TicketNumber) -> Self {
        number.get()
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Ticket status
///
/// Serialized with the labels the persisted layout and CSV export use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Free to be claimed by a visitor
    #[serde(rename = "disponible")]
    Available,
    /// Claimed by a visitor, awaiting the owner's confirmation
    #[serde(rename = "reservado")]
    Reserved,
    /// Sale confirmed by the owner
    #[serde(rename = "vendido")]
    Sold,
}

impl TicketStatus {
    /// Label used by the persisted layout and the CSV export
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "disponible",
            Self::Reserved => "reservado",
            Self::Sold => "vendido",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Reserved => write!(f, "reserved"),
            Self::Sold => write!(f, "sold"),
        }
    }
}

/// Contact details a visitor leaves when claiming a number
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    /// Buyer name (required)
    pub name: String,
    /// Buyer phone (required)
    pub phone: String,
    /// Buyer email (optional)
    pub email: Option<String>,
}

impl Buyer {
    /// Creates a buyer without email
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: None,
        }
    }

    /// Attaches an email address
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Trims every field and checks the required ones.
    ///
    /// An empty email is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] when name or phone is blank.
    pub fn validated(self) -> Result<Self, RaffleError> {
        let name = self.name.trim().to_string();
        let phone = self.phone.trim().to_string();
        if name.is_empty() {
            return Err(RaffleError::Validation("buyer name is required".to_string()));
        }
        if phone.is_empty() {
            return Err(RaffleError::Validation("buyer phone is required".to_string()));
        }
        let email = self
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());
        Ok(Self { name, phone, email })
    }
}

/// One numbered slot of a raffle
///
/// Buyer data is present iff the ticket is not available; `reserved_at` is set
/// for reserved and sold tickets, `sold_at` only for sold ones. The mutators are
/// crate-private so every change goes through the inventory's guarded transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    number: TicketNumber,
    status: TicketStatus,
    buyer: Option<Buyer>,
    reserved_at: Option<DateTime<Utc>>,
    sold_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Creates an available ticket
    #[must_use]
    pub const fn available(number: TicketNumber) -> Self {
        Self {
            number,
            status: TicketStatus::Available,
            buyer: None,
            reserved_at: None,
            sold_at: None,
        }
    }

    /// Rebuilds a ticket from stored fields, checking the field/status invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] when the fields disagree with the status.
    pub(crate) fn restore(
        number: TicketNumber,
        status: TicketStatus,
        buyer: Option<Buyer>,
        reserved_at: Option<DateTime<Utc>>,
        sold_at: Option<DateTime<Utc>>,
    ) -> Result<Self, RaffleError> {
        let consistent = match status {
            TicketStatus::Available => buyer.is_none() && reserved_at.is_none() && sold_at.is_none(),
            TicketStatus::Reserved => buyer.is_some() && reserved_at.is_some() && sold_at.is_none(),
            TicketStatus::Sold => buyer.is_some() && reserved_at.is_some() && sold_at.is_some(),
        };
        if !consistent {
            return Err(RaffleError::Validation(format!(
                "ticket {number} has fields inconsistent with status {status}"
            )));
        }
        Ok(Self {
            number,
            status,
            buyer,
            reserved_at,
            sold_at,
        })
    }

    /// Ticket number
    #[must_use]
    pub const fn number(&self) -> TicketNumber {
        self.number
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> TicketStatus {
        self.status
    }

    /// Buyer details, present unless the ticket is available
    #[must_use]
    pub const fn buyer(&self) -> Option<&Buyer> {
        self.buyer.as_ref()
    }

    /// When the ticket was reserved
    #[must_use]
    pub const fn reserved_at(&self) -> Option<DateTime<Utc>> {
        self.reserved_at
    }

    /// When the sale was confirmed
    #[must_use]
    pub const fn sold_at(&self) -> Option<DateTime<Utc>> {
        self.sold_at
    }

    /// Whether the ticket can still be claimed
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == TicketStatus::Available
    }

    pub(crate) fn mark_reserved(&mut self, buyer: Buyer, at: DateTime<Utc>) {
        self.status = TicketStatus::Reserved;
        self.buyer = Some(buyer);
        self.reserved_at = Some(at);
        self.sold_at = None;
    }

    pub(crate) fn mark_sold(&mut self, at: DateTime<Utc>) {
        self.status = TicketStatus::Sold;
        self.sold_at = Some(at);
    }

    pub(crate) fn mark_available(&mut self) {
        *self = Self::available(self.number);
    }
}

/// Ticket counts by status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStats {
    /// Tickets still claimable
    pub available: usize,
    /// Tickets claimed and awaiting confirmation
    pub reserved: usize,
    /// Tickets with a confirmed sale
    pub sold: usize,
}

impl TicketStats {
    /// Counts the statuses of a ticket list
    #[must_use]
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        tickets.iter().fold(Self::default(), |mut stats, ticket| {
            match ticket.status() {
                TicketStatus::Available => stats.available += 1,
                TicketStatus::Reserved => stats.reserved += 1,
                TicketStatus::Sold => stats.sold += 1,
            }
            stats
        })
    }
}

// ============================================================================
// Raffles
// ============================================================================

/// Raffle metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raffle {
    /// Unique raffle identifier
    pub id: RaffleId,
    /// Owner identity
    pub owner_id: OwnerId,
    /// Owner display name
    pub owner_name: String,
    /// Normalized owner contact number
    pub owner_contact: ContactHandle,
    /// Raffle title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// What the winner gets
    pub prize_description: String,
    /// Price of one ticket
    pub ticket_price: Money,
    /// Unique URL-safe alias
    pub slug: Slug,
    /// Whether visitors may still claim numbers
    pub is_active: bool,
    /// When the raffle was created
    pub created_at: DateTime<Utc>,
}

impl Raffle {
    /// Path of the public raffle page
    #[must_use]
    pub fn public_path(&self) -> String {
        format!("/s/{}", self.slug)
    }
}

/// Owner input for a new raffle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleDraft {
    /// Owner display name
    pub owner_name: String,
    /// Raw contact number as typed by the owner
    pub owner_contact: String,
    /// Raffle title (required)
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Prize description (required)
    pub prize_description: String,
    /// Price of one ticket
    pub ticket_price: Money,
    /// Explicit slug; derived from the title when absent
    pub slug: Option<String>,
}

impl RaffleDraft {
    /// Creates a draft with the required fields
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        prize_description: impl Into<String>,
        ticket_price: Money,
        owner_contact: impl Into<String>,
    ) -> Self {
        Self {
            owner_name: String::new(),
            owner_contact: owner_contact.into(),
            title: title.into(),
            description: String::new(),
            prize_description: prize_description.into(),
            ticket_price,
            slug: None,
        }
    }

    /// Sets the owner display name
    #[must_use]
    pub fn with_owner_name(mut self, owner_name: impl Into<String>) -> Self {
        self.owner_name = owner_name.into();
        self
    }

    /// Sets the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Requests an explicit slug
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Metadata changes for an existing raffle; `None` leaves a field untouched
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RafflePatch {
    /// New owner display name
    pub owner_name: Option<String>,
    /// New raw contact number
    pub owner_contact: Option<String>,
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New prize description
    pub prize_description: Option<String>,
    /// New ticket price
    pub ticket_price: Option<Money>,
    /// New explicit slug
    pub slug: Option<String>,
}
