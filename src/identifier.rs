//! Book identifiers: kinds, ISBN normalization, and ISBN-list parsing.
//!
//! Only ISBNs anchor alternate-edition expansion; the other kinds are passed
//! through to catalogs unchanged.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Separator characters tolerated inside a printed ISBN.
#[allow(clippy::expect_used)]
static ISBN_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-\u{2013}\u{2014}\s]").expect("ISBN separator regex is valid") // Static pattern, safe to panic
});

/// Shape of a normalized ISBN-10 or ISBN-13.
#[allow(clippy::expect_used)]
static ISBN_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{9}[\dX]|97[89]\d{10})$").expect("ISBN shape regex is valid") // Static pattern, safe to panic
});

/// Kind of identifier a lookup is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// International Standard Book Number (10 or 13 digits).
    Isbn,
    /// Library of Congress Control Number.
    Lccn,
    /// International Standard Serial Number.
    Issn,
}

impl IdentifierKind {
    /// Returns the stable lowercase label used in URLs, columns and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isbn => "isbn",
            Self::Lccn => "lccn",
            Self::Issn => "issn",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdentifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isbn" => Ok(Self::Isbn),
            "lccn" => Ok(Self::Lccn),
            "issn" => Ok(Self::Issn),
            other => Err(format!("unsupported identifier kind: {other}")),
        }
    }
}

/// A typed identifier value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// What kind of identifier `value` is.
    pub kind: IdentifierKind,
    /// The identifier text as sent to catalogs.
    pub value: String,
}

impl Identifier {
    /// Creates an identifier without normalization.
    #[must_use]
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Creates an ISBN identifier, normalizing separators away.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] if the text is not a well-formed ISBN.
    pub fn isbn(raw: &str) -> Result<Self, IdentifierError> {
        let value = normalize_isbn(raw)?;
        Ok(Self::new(IdentifierKind::Isbn, value))
    }

    /// Returns true when this identifier can drive alternate-edition expansion.
    #[must_use]
    pub fn is_isbn(&self) -> bool {
        self.kind == IdentifierKind::Isbn
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Errors raised while reading identifiers from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Input does not have the shape of an ISBN-10 or ISBN-13
    #[error("invalid ISBN '{input}': {reason}\n  Suggestion: Use 10 or 13 digits, hyphens allowed")]
    InvalidIsbn {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },
}

impl IdentifierError {
    fn invalid_isbn(input: &str, reason: &str) -> Self {
        Self::InvalidIsbn {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Strips separators from an ISBN and checks its shape.
///
/// A trailing lowercase `x` check digit is uppercased. The check digit itself
/// is not verified here; see [`is_valid_isbn`].
///
/// # Errors
///
/// Returns [`IdentifierError::InvalidIsbn`] if the stripped text is not 10 or
/// 13 characters of the right shape.
///
/// # Examples
///
/// ```
/// use libcat_core::identifier::normalize_isbn;
///
/// assert_eq!(normalize_isbn("978-0-14-044913-6").unwrap(), "9780140449136");
/// ```
pub fn normalize_isbn(raw: &str) -> Result<String, IdentifierError> {
    let stripped = ISBN_SEPARATORS.replace_all(raw.trim(), "");
    let mut normalized = stripped.to_string();
    if normalized.ends_with('x') {
        normalized.pop();
        normalized.push('X');
    }

    if !ISBN_SHAPE.is_match(&normalized) {
        return Err(IdentifierError::invalid_isbn(
            raw,
            "expected 10 digits (last may be X) or 13 digits starting with 978/979",
        ));
    }
    trace!(raw, normalized = %normalized, "normalized ISBN");
    Ok(normalized)
}

/// Verifies the check digit of a normalized ISBN-10 or ISBN-13.
#[must_use]
pub fn is_valid_isbn(isbn: &str) -> bool {
    let chars: Vec<char> = isbn.chars().collect();
    match chars.len() {
        10 => {
            let mut sum = 0u32;
            for (index, ch) in chars.iter().enumerate() {
                let value = match (index, ch) {
                    (9, 'X') => 10,
                    (_, c) => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                sum += value * (10 - u32::try_from(index).unwrap_or(0));
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0u32;
            for (index, ch) in chars.iter().enumerate() {
                let Some(digit) = ch.to_digit(10) else {
                    return false;
                };
                sum += if index % 2 == 0 { digit } else { digit * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

/// Result of reading an ISBN list file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsbnList {
    /// Normalized ISBNs in file order.
    pub isbns: Vec<String>,
    /// Lines that could not be read as an ISBN, with their 1-based line number.
    pub rejected: Vec<(usize, String)>,
}

/// Parses one ISBN per line, skipping blank lines and `#` comments.
///
/// Lines that fail normalization are reported in [`IsbnList::rejected`].
/// Check digits are not enforced so that catalog typos can still be looked up.
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
#[must_use]
pub fn parse_isbn_list(text: &str) -> IsbnList {
    let mut list = IsbnList::default();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match normalize_isbn(trimmed) {
            Ok(isbn) => {
                if !is_valid_isbn(&isbn) {
                    debug!(line = index + 1, isbn = %isbn, "ISBN check digit mismatch");
                }
                list.isbns.push(isbn);
            }
            Err(_) => list.rejected.push((index + 1, trimmed.to_string())),
        }
    }
    list
}
