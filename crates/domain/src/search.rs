use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Minimum number of characters a non-empty search term must have.
pub const DEFAULT_MIN_SEARCH_LENGTH: usize = 3;

/// Search term that passed the gate. Empty means no filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Term that clears filtering.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the trimmed term.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether the term clears filtering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the term for transports that encode "no filter" as absence.
    #[must_use]
    pub fn as_filter(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.as_str())
        }
    }
}

impl Display for SearchTerm {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Reason a term was refused before any fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRejection {
    /// Trimmed term that was refused.
    pub term: String,
    /// Minimum length in effect.
    pub min_length: usize,
}

impl Display for SearchRejection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "search term '{}' is too short; enter at least {} characters",
            self.term, self.min_length
        )
    }
}

/// Validates search input before it may trigger a server-side scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchGate {
    min_length: usize,
}

impl SearchGate {
    /// Creates a gate with the given minimum length.
    #[must_use]
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Returns the minimum length in effect.
    #[must_use]
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Accepts empty terms and terms of at least `min_length` characters.
    pub fn accept(&self, term: &str) -> Result<SearchTerm, SearchRejection> {
        let trimmed = term.trim();
        let length = trimmed.chars().count();

        if length > 0 && length < self.min_length {
            return Err(SearchRejection {
                term: trimmed.to_owned(),
                min_length: self.min_length,
            });
        }

        Ok(SearchTerm(trimmed.to_owned()))
    }
}

impl Default for SearchGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SEARCH_LENGTH)
    }
}
