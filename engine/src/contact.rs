//! Contact numbers and the messaging deep links built from them.

use crate::error::RaffleError;
use crate::types::Ticket;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEEP_LINK_BASE: &str = "https://wa.me/";

/// Owner contact number, digits only, country code included
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactHandle(String);

impl ContactHandle {
    /// Normalizes a number typed by the owner.
    ///
    /// Input starting with `+` already carries its country code; anything else is
    /// prefixed with `default_country_code`. Every non-digit is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] if the input has no digits.
    pub fn normalize(raw: &str, default_country_code: &str) -> Result<Self, RaffleError> {
        let raw = raw.trim();
        let digits = only_digits(raw);
        if digits.is_empty() {
            return Err(RaffleError::Validation(
                "owner contact number is required".to_string(),
            ));
        }
        if raw.starts_with('+') {
            Ok(Self(digits))
        } else {
            Ok(Self(format!("{}{digits}", only_digits(default_country_code))))
        }
    }

    /// Borrow the digit string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Link that opens a chat with the owner
    #[must_use]
    pub fn deep_link(&self) -> String {
        format!("{DEEP_LINK_BASE}{}", self.0)
    }
}

impl fmt::Display for ContactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}

/// Link that opens a chat with a ticket's buyer, if the ticket has one
#[must_use]
pub fn buyer_contact_link(ticket: &Ticket) -> Option<String> {
    let digits = only_digits(&ticket.buyer()?.phone);
    (!digits.is_empty()).then(|| format!("{DEEP_LINK_BASE}{digits}"))
}

fn only_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
