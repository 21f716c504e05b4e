//! Key states, semantic events and the handled-event bitmask.

/// State of one key's press classifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyState {
    /// Nothing sampled yet.
    #[default]
    Init,
    /// Idle, waiting for a debounced press.
    Released,
    /// Held, not yet long enough for a long press.
    Pressed,
    /// Held past the long-press threshold, waiting for the continuous threshold.
    LongPressed,
    /// Held past the continuous threshold; reports every poll until released.
    LongPressedContinuous,
    /// Released after a short press, waiting to see if another click follows.
    MultiPressed,
}

/// Semantic event produced by a key.
///
/// Discriminants index the per-key handler table and [`EventMask`] bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum KeyEvent {
    /// One short press, no follow-up within the multi-click gap.
    Click = 0,
    /// Released after being held past the long-press threshold.
    LongPress = 1,
    /// Still held past the continuous threshold. Repeats while held.
    ContinuousPress = 2,
    /// Two clicks in one sequence.
    DoubleClick = 3,
    /// Three clicks in one sequence.
    TripleClick = 4,
    /// Four or more clicks in one sequence.
    MultiClick = 5,
}

impl KeyEvent {
    /// Number of event kinds.
    pub const COUNT: usize = 6;

    /// Every event kind in discriminant order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Click,
        Self::LongPress,
        Self::ContinuousPress,
        Self::DoubleClick,
        Self::TripleClick,
        Self::MultiClick,
    ];

    /// Slot of this event in the handler table.
    #[inline]
    pub const fn index(self) -> usize { self as usize }

    /// Event reported when a click sequence of `count` clicks ends.
    ///
    /// Returns `None` for an empty sequence.
    pub const fn from_click_count(count: u8) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Self::Click),
            2 => Some(Self::DoubleClick),
            3 => Some(Self::TripleClick),
            _ => Some(Self::MultiClick),
        }
    }
}

/// Set of event kinds, one bit per [`KeyEvent`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventMask(u8);

impl EventMask {
    /// Empty set.
    pub const EMPTY: Self = Self(0);

    #[inline]
    const fn bit(event: KeyEvent) -> u8 { 1 << event as u8 }

    /// Add an event kind.
    #[inline]
    pub fn insert(
        &mut self,
        event: KeyEvent,
    ) {
        self.0 |= Self::bit(event);
    }

    /// Remove an event kind.
    #[inline]
    pub fn remove(
        &mut self,
        event: KeyEvent,
    ) {
        self.0 &= !Self::bit(event);
    }

    /// Whether the event kind is in the set.
    #[inline]
    pub const fn contains(
        self,
        event: KeyEvent,
    ) -> bool {
        self.0 & Self::bit(event) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool { self.0 == 0 }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 { self.0 }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        assert_eq!(KeyState::default(), KeyState::Init);
    }

    #[test]
    fn test_click_count_mapping() {
        assert_eq!(KeyEvent::from_click_count(0), None);
        assert_eq!(KeyEvent::from_click_count(1), Some(KeyEvent::Click));
        assert_eq!(KeyEvent::from_click_count(2), Some(KeyEvent::DoubleClick));
        assert_eq!(KeyEvent::from_click_count(3), Some(KeyEvent::TripleClick));
        assert_eq!(KeyEvent::from_click_count(4), Some(KeyEvent::MultiClick));
        assert_eq!(KeyEvent::from_click_count(15), Some(KeyEvent::MultiClick));
    }

    #[test]
    fn test_event_indices_are_distinct() {
        for (i, event) in KeyEvent::ALL.iter().enumerate() {
            assert_eq!(event.index(), i);
        }
    }

    #[test]
    fn test_mask_insert_remove() {
        let mut mask = EventMask::EMPTY;
        assert!(mask.is_empty());

        mask.insert(KeyEvent::Click);
        mask.insert(KeyEvent::MultiClick);
        assert!(mask.contains(KeyEvent::Click));
        assert!(mask.contains(KeyEvent::MultiClick));
        assert!(!mask.contains(KeyEvent::LongPress));
        assert_eq!(mask.bits(), 0b10_0001);

        mask.remove(KeyEvent::Click);
        assert!(!mask.contains(KeyEvent::Click));
        assert!(mask.contains(KeyEvent::MultiClick));
    }
}
