//! Human-readable raffle aliases.
//!
//! Slugs are restricted to `[a-z0-9-]`. Owners may pick one explicitly, or one
//! is derived from the raffle title.

use crate::error::RaffleError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique URL-safe alias of a raffle
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Validates an owner-chosen slug.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] if the slug is empty, longer than
    /// `max_len`, or contains characters outside `[a-z0-9-]`.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, RaffleError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RaffleError::Validation("slug must not be empty".to_string()));
        }
        if raw.len() > max_len {
            return Err(RaffleError::Validation(format!(
                "slug must be at most {max_len} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(RaffleError::Validation(
                "slug may only contain lowercase letters, digits and '-'".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Derives a slug from a title.
    ///
    /// Lowercases, folds accented Latin letters, collapses every other run of
    /// characters into a single `-` and trims dashes at both ends.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] if the title has no letters or digits.
    pub fn derive(title: &str, max_len: usize) -> Result<Self, RaffleError> {
        let mut slug = String::with_capacity(title.len());
        let mut pending_dash = false;
        for c in title.chars().flat_map(char::to_lowercase).map(fold_accent) {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            } else {
                pending_dash = true;
            }
        }
        slug.truncate(max_len);
        let slug = slug.trim_end_matches('-');
        if slug.is_empty() {
            return Err(RaffleError::Validation(
                "title must contain at least one letter or digit".to_string(),
            ));
        }
        Ok(Self(slug.to_string()))
    }

    /// Numbered variant used when the derived slug is already taken.
    ///
    /// The base is shortened so the result still fits in `max_len`. Returns
    /// `None` once the suffix leaves no room for at least one base character.
    #[must_use]
    pub fn with_suffix(&self, n: usize, max_len: usize) -> Option<Self> {
        let suffix = format!("-{n}");
        let keep = max_len.checked_sub(suffix.len())?.min(self.0.len());
        let base = self.0[..keep].trim_end_matches('-');
        if base.is_empty() {
            return None;
        }
        Some(Self(format!("{base}{suffix}")))
    }

    /// Borrow the slug string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Slug {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derive_folds_accents_and_punctuation() {
        let slug = Slug::derive("¡Sorteo Navideño 2024!", 50).unwrap();
        assert_eq!(slug.as_str(), "sorteo-navideno-2024");
    }

    #[test]
    fn derive_truncates_without_trailing_dash() {
        let slug = Slug::derive("abcd efgh", 5).unwrap();
        assert_eq!(slug.as_str(), "abcd");
    }

    #[test]
    fn derive_rejects_symbol_only_titles() {
        assert!(Slug::derive("!!! ???", 50).is_err());
    }

    #[test]
    fn parse_rejects_uppercase_and_spaces() {
        assert!(Slug::parse("Mi Sorteo", 50).is_err());
        assert!(Slug::parse("mi-sorteo", 50).is_ok());
    }

    #[test]
    fn suffix_respects_max_len() {
        let slug = Slug::parse("abcdefghij", 10).unwrap();
        assert_eq!(slug.with_suffix(12, 10).unwrap().as_str(), "abcdefg-12");
        assert_eq!(slug.with_suffix(2, 50).unwrap().as_str(), "abcdefghij-2");
    }

    #[test]
    fn suffix_without_room_for_the_base_is_refused() {
        let slug = Slug::parse("abcd", 4).unwrap();
        assert_eq!(slug.with_suffix(99, 4).unwrap().as_str(), "a-99");
        assert!(slug.with_suffix(999, 4).is_none());
        assert!(slug.with_suffix(1001, 4).is_none());
    }

    proptest! {
        #[test]
        fn derived_slugs_always_parse(title in "\\PC{0,80}") {
            if let Ok(slug) = Slug::derive(&title, 50) {
                prop_assert!(Slug::parse(slug.as_str(), 50).is_ok());
                prop_assert!(!slug.as_str().starts_with('-'));
                prop_assert!(!slug.as_str().ends_with('-'));
            }
        }

        #[test]
        fn suffixed_slugs_always_parse(max_len in 4_usize..20, n in 2_usize..100_000) {
            let base = Slug::derive("rifa escolar del barrio", max_len).unwrap();
            if let Some(slug) = base.with_suffix(n, max_len) {
                prop_assert!(Slug::parse(slug.as_str(), max_len).is_ok());
                prop_assert!(!slug.as_str().starts_with('-'));
            }
        }
    }
}
