//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains something other than digits and separators.
    #[error("phone number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    Length {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number normalized to an optional leading `+` followed by digits.
///
/// Spaces, dashes, dots and parentheses are accepted as separators and
/// stripped. The digit count must fall within the E.164 range (7-15).
///
/// ```
/// use autoparts_core::Phone;
///
/// let phone = Phone::parse("0912 345-6789").unwrap();
/// assert_eq!(phone.as_str(), "09123456789");
/// assert!(Phone::parse("call me").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if the input is empty, has stray characters,
    /// or has a digit count outside 7-15.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let (prefix, rest) = trimmed
            .strip_prefix('+')
            .map_or(("", trimmed), |rest| ("+", rest));

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneError::Length {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(format!("{prefix}{digits}")))
    }

    /// Returns the normalized number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_mobile() {
        assert_eq!(Phone::parse("09123456789").unwrap().as_str(), "09123456789");
    }

    #[test]
    fn test_parse_international_with_separators() {
        let phone = Phone::parse("+98 (912) 345-6789").unwrap();
        assert_eq!(phone.as_str(), "+989123456789");
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(Phone::parse("0912abc"), Err(PhoneError::InvalidCharacter));
    }

    #[test]
    fn test_parse_rejects_plus_in_middle() {
        assert_eq!(Phone::parse("0912+3456"), Err(PhoneError::InvalidCharacter));
    }

    #[test]
    fn test_parse_length_bounds() {
        assert!(matches!(Phone::parse("12345"), Err(PhoneError::Length { .. })));
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::Length { .. })
        ));
        assert_eq!(Phone::parse("   "), Err(PhoneError::Empty));
    }
}
