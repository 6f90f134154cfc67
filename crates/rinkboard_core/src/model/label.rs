//! User-entered label rule for folder names and drawing titles.
//!
//! Labels are checked when they are written by a lifecycle operation. Stored
//! values are not re-validated on load.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum label length, counted in Unicode scalar values.
pub const MAX_LABEL_CHARS: usize = 30;

/// Rejection reasons for a folder name or drawing title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelValidationError {
    /// Label is the empty string.
    Empty,
    /// Label exceeds [`MAX_LABEL_CHARS`].
    TooLong { max: usize, actual: usize },
}

impl Display for LabelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::TooLong { max, actual } => {
                write!(f, "name must be at most {max} characters, got {actual}")
            }
        }
    }
}

impl Error for LabelValidationError {}

/// Checks one label against the 1..=30 character rule.
///
/// Whitespace is not trimmed: `" "` is a valid one-character label.
pub fn validate_label(value: &str) -> Result<(), LabelValidationError> {
    let actual = value.chars().count();
    if actual == 0 {
        return Err(LabelValidationError::Empty);
    }
    if actual > MAX_LABEL_CHARS {
        return Err(LabelValidationError::TooLong {
            max: MAX_LABEL_CHARS,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_label, LabelValidationError, MAX_LABEL_CHARS};

    #[test]
    fn accepts_boundary_lengths() {
        assert!(validate_label("a").is_ok());
        assert!(validate_label(&"x".repeat(MAX_LABEL_CHARS)).is_ok());
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert_eq!(validate_label(""), Err(LabelValidationError::Empty));
        assert_eq!(
            validate_label(&"x".repeat(31)),
            Err(LabelValidationError::TooLong {
                max: 30,
                actual: 31
            })
        );
    }

    #[test]
    fn counts_characters_not_bytes() {
        let name = "é".repeat(30);
        assert!(name.len() > MAX_LABEL_CHARS);
        assert!(validate_label(&name).is_ok());
    }

    #[test]
    fn does_not_trim_whitespace() {
        assert!(validate_label("   ").is_ok());
    }
}
