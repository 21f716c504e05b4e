//! Setup-time errors.
//!
//! Polling never fails; everything that can go wrong happens while keys and
//! combos are being registered or configured. A failed call leaves the keypad
//! exactly as it was.

use crate::config::{MAX_COMBO_MEMBERS, MIN_COMBO_MEMBERS};

/// Errors returned by [`Keypad`](crate::Keypad) setup operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeypadError {
    /// The key registry is full.
    KeyCapacity,
    /// The combo registry is full.
    ComboCapacity,
    /// The key id does not belong to this keypad.
    UnknownKey,
    /// The combo id does not belong to this keypad.
    UnknownCombo,
    /// A combo needs between [`MIN_COMBO_MEMBERS`] and [`MAX_COMBO_MEMBERS`] keys.
    InvalidMemberCount {
        /// Number of members requested
        count: usize,
    },
    /// The same key was listed twice in one combo.
    DuplicateMember,
}

impl core::fmt::Display for KeypadError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            Self::KeyCapacity => write!(f, "Key registry is full"),
            Self::ComboCapacity => write!(f, "Combo registry is full"),
            Self::UnknownKey => write!(f, "Unknown key id"),
            Self::UnknownCombo => write!(f, "Unknown combo id"),
            Self::InvalidMemberCount { count } => write!(
                f,
                "Invalid combo member count {count} (expected {MIN_COMBO_MEMBERS}..={MAX_COMBO_MEMBERS})"
            ),
            Self::DuplicateMember => write!(f, "Key listed twice in one combo"),
        }
    }
}

impl core::error::Error for KeypadError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_member_count() {
        let text = format!("{}", KeypadError::InvalidMemberCount { count: 7 });
        assert_eq!(text, "Invalid combo member count 7 (expected 2..=4)");
    }

    #[test]
    fn test_display_capacity() {
        assert_eq!(format!("{}", KeypadError::KeyCapacity), "Key registry is full");
        assert_eq!(format!("{}", KeypadError::ComboCapacity), "Combo registry is full");
    }
}
