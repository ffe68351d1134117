//! Classification of raw backend results.
//!
//! The backend reports success, failure and "already rendered" output only
//! through the leading characters of the string it returns. All of that
//! sniffing lives in [`classify`].

use std::fmt;

/// Prefix marking a failed evaluation.
pub const ERROR_PREFIX: &str = "Error";

/// Prefix marking markup output that must not be shown as plain text.
pub const MARKUP_PREFIX: char = '<';

/// How a backend result is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Suppressed output: the line takes a slot in the transcript but shows nothing.
    Empty,
    Error,
    Success,
}

impl Classification {
    pub fn is_visible(self) -> bool {
        self != Classification::Empty
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::Empty => "empty",
            Classification::Error => "error",
            Classification::Success => "success",
        })
    }
}

/// Classify a backend result by its prefix.
///
/// `"Error…"` is an error, anything else starting with `'<'` is suppressed,
/// everything else is a success. Total and deterministic.
pub fn classify(result: &str) -> Classification {
    if result.starts_with(ERROR_PREFIX) {
        Classification::Error
    } else if result.starts_with(MARKUP_PREFIX) {
        Classification::Empty
    } else {
        Classification::Success
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn error_prefix() {
        assert_eq!(classify("Error: division by zero"), Classification::Error);
        assert_eq!(classify("Error"), Classification::Error);
        assert_eq!(classify("Errors everywhere"), Classification::Error);
    }

    #[test]
    fn markup_prefix() {
        assert_eq!(classify("<div>...</div>"), Classification::Empty);
        assert_eq!(classify("<"), Classification::Empty);
    }

    #[test]
    fn everything_else_is_success() {
        assert_eq!(classify("42"), Classification::Success);
        assert_eq!(classify(""), Classification::Success);
        assert_eq!(classify("error: lowercase"), Classification::Success);
        assert_eq!(classify(" Error"), Classification::Success);
        assert_eq!(classify("Err"), Classification::Success);
        assert_eq!(classify("1 < 2"), Classification::Success);
    }

    #[test]
    fn error_wins_over_markup() {
        assert_eq!(classify("Error<b>"), Classification::Error);
    }

    #[test]
    fn only_empty_is_invisible() {
        assert!(!Classification::Empty.is_visible());
        assert!(Classification::Error.is_visible());
        assert!(Classification::Success.is_visible());
    }

    proptest! {
        #[test]
        fn deterministic(s in ".*") {
            prop_assert_eq!(classify(&s), classify(&s));
        }

        #[test]
        fn prefixed_with_error(rest in ".*") {
            prop_assert_eq!(classify(&format!("Error{rest}")), Classification::Error);
        }

        #[test]
        fn prefixed_with_angle_bracket(rest in ".*") {
            prop_assert_eq!(classify(&format!("<{rest}")), Classification::Empty);
        }

        #[test]
        fn other_first_chars_succeed(s in "[^E<].*") {
            prop_assert_eq!(classify(&s), Classification::Success);
        }
    }
}
