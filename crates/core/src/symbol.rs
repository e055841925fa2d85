//! Ticker symbol parsing and canonicalization.
//!
//! Symbols have the shape `$<letters>+<4 digits>`, e.g. `$ZRA+0000`. The
//! letters segment is upper-cased, the digits are kept as written. The token
//! `all` (any case) is a sentinel meaning "every symbol".

use compact_str::{CompactString, ToCompactString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sentinel stored in place of a concrete symbol for "every symbol".
pub const ALL_SYMBOLS: &str = "all";

/// Number of digits after the `+` separator.
const SUFFIX_DIGITS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("no symbols provided")]
    Empty,
    #[error("invalid symbol format: {0}")]
    InvalidFormat(String),
}

/// A parsed subscription target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SymbolToken {
    /// The `all` sentinel.
    All,
    /// A canonical ticker such as `$ZRA+0001`.
    Ticker(CompactString),
}

impl SymbolToken {
    pub fn is_all(&self) -> bool {
        matches!(self, SymbolToken::All)
    }

    /// Storage/display form.
    pub fn as_str(&self) -> &str {
        match self {
            SymbolToken::All => ALL_SYMBOLS,
            SymbolToken::Ticker(s) => s.as_str(),
        }
    }
}

impl fmt::Display for SymbolToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SymbolToken> for String {
    fn from(token: SymbolToken) -> Self {
        token.as_str().to_string()
    }
}

impl TryFrom<String> for SymbolToken {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize_token(&value)
    }
}

impl std::str::FromStr for SymbolToken {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_token(s)
    }
}

/// Parse a single trimmed token.
pub fn normalize_token(raw: &str) -> Result<SymbolToken, SymbolError> {
    let token = raw.trim();
    if token.eq_ignore_ascii_case(ALL_SYMBOLS) {
        return Ok(SymbolToken::All);
    }

    let invalid = || SymbolError::InvalidFormat(token.to_string());

    let body = token.strip_prefix('$').ok_or_else(invalid)?;
    let (letters, digits) = body.split_once('+').ok_or_else(invalid)?;

    if letters.is_empty() || !letters.chars().all(char::is_alphabetic) {
        return Err(invalid());
    }
    if digits.len() != SUFFIX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    // Some letters upper-case into a base letter plus combining marks
    let letters = letters.to_uppercase();
    if !letters.chars().all(char::is_alphabetic) {
        return Err(invalid());
    }

    let mut canonical = CompactString::with_capacity(token.len());
    canonical.push('$');
    canonical.push_str(&letters);
    canonical.push('+');
    canonical.push_str(digits);
    Ok(SymbolToken::Ticker(canonical))
}

/// Parse comma-separated user input into canonical tokens.
///
/// Empty tokens are dropped. Any invalid token fails the whole batch.
pub fn normalize(raw: &str) -> Result<Vec<SymbolToken>, SymbolError> {
    let tokens = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_token)
        .collect::<Result<Vec<_>, _>>()?;

    if tokens.is_empty() {
        return Err(SymbolError::Empty);
    }
    Ok(tokens)
}

/// Lenient form used for symbols arriving from the ledger: canonical when
/// well-formed, otherwise the trimmed input as-is.
pub fn canonical_or_raw(raw: &str) -> CompactString {
    match normalize_token(raw) {
        Ok(SymbolToken::Ticker(s)) => s,
        _ => raw.trim().to_compact_string(),
    }
}
