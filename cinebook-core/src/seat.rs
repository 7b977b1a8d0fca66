use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized identifier for one seat within a showtime's seating chart.
///
/// Clients round-trip seat tokens through URL encoding and local state, so
/// raw input arrives with stray whitespace and mixed case. Two identifiers
/// are equal iff their normalized forms (trimmed, uppercased) match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId(String);

impl SeatId {
    /// Parse a raw client token into a normalized seat id.
    ///
    /// The normalized form must be row letters followed by a seat number
    /// (`A1`, `K12`). Anything else is rejected before it can reach the
    /// seat map.
    pub fn parse(raw: &str) -> Result<Self, SeatIdError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(SeatIdError::Empty);
        }

        let letters = normalized
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        let digits_only_tail = normalized.chars().skip(letters).all(|c| c.is_ascii_digit());

        if letters == 0 || letters == normalized.len() || !digits_only_tail {
            return Err(SeatIdError::Malformed(normalized));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SeatId {
    type Error = SeatIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatIdError {
    #[error("seat identifier is empty")]
    Empty,

    #[error("malformed seat identifier: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let a = SeatId::parse(" a1 ").unwrap();
        let b = SeatId::parse("A1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "A1");
    }

    #[test]
    fn test_accepts_multi_letter_rows() {
        assert_eq!(SeatId::parse("aa12").unwrap().as_str(), "AA12");
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(SeatId::parse("   "), Err(SeatIdError::Empty));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(SeatId::parse("12A").is_err());
        assert!(SeatId::parse("A").is_err());
        assert!(SeatId::parse("7").is_err());
        assert!(SeatId::parse("A-1").is_err());
    }
}
