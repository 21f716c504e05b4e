//! Timing defaults and per-key threshold configuration.
//!
//! All defaults are compile-time constants with ordering assertions, so a bad
//! edit (e.g. a long-press threshold below the debounce time) fails the build
//! instead of producing a key that can never leave `Pressed`.
//!
//! Per-key thresholds live in [`KeyTiming`]. Runtime changes go through
//! [`TimingPatch`], where a zero field means "leave unchanged".
//!
//! # Usage
//!
//! ```ignore
//! use keyfsm::config::TimingPatch;
//!
//! // Only touch the long-press threshold and the click ceiling
//! keypad.set_timing(key, TimingPatch::new().long_press(800).max_multi_click(6))?;
//! ```

// =============================================================================
// Registry Capacities
// =============================================================================

/// Default number of keys a [`Keypad`](crate::Keypad) can hold.
pub const DEFAULT_KEY_CAPACITY: usize = 20;

/// Default number of combos a [`Keypad`](crate::Keypad) can hold.
pub const DEFAULT_COMBO_CAPACITY: usize = 20;

/// Maximum number of member keys in one combo.
pub const MAX_COMBO_MEMBERS: usize = 4;

/// Minimum number of member keys in one combo.
pub const MIN_COMBO_MEMBERS: usize = 2;

const _: () = assert!(MIN_COMBO_MEMBERS <= MAX_COMBO_MEMBERS);
// Member bits are packed into a u8 mask
const _: () = assert!(MAX_COMBO_MEMBERS <= 8);

// =============================================================================
// Key Timing Defaults (milliseconds)
// =============================================================================

/// Minimum stable time before a new press is accepted.
pub const DEBOUNCE_MS: u16 = 20;

/// Hold time after which a release reports a long press instead of a click.
pub const LONG_PRESS_MS: u16 = 500;

/// Hold time after which the key starts reporting continuous presses.
pub const CONTINUOUS_PRESS_MS: u16 = 1500;

/// Maximum gap between releases for clicks to count as one sequence.
pub const MULTI_CLICK_GAP_MS: u16 = 300;

const _: () = assert!(DEBOUNCE_MS < LONG_PRESS_MS);
const _: () = assert!(LONG_PRESS_MS < CONTINUOUS_PRESS_MS);
const _: () = assert!(DEBOUNCE_MS < MULTI_CLICK_GAP_MS);

// =============================================================================
// Multi-Click Limits
// =============================================================================

/// Default cap on counted clicks in one sequence.
pub const DEFAULT_MAX_MULTI_CLICK: u8 = 4;

/// Hard ceiling for the click cap; larger requests are clamped to this.
pub const MULTI_CLICK_CEILING: u8 = 15;

const _: () = assert!(DEFAULT_MAX_MULTI_CLICK <= MULTI_CLICK_CEILING);
// Anything below 4 could never report `MultiClick`
const _: () = assert!(DEFAULT_MAX_MULTI_CLICK >= 4);

// =============================================================================
// Keypad-Wide Timing
// =============================================================================

/// Minimum spacing between two continuous-press handler calls.
///
/// Shared by every key of one keypad: two keys held together take turns
/// rather than each firing at this rate.
pub const CONTINUOUS_REPEAT_MS: u32 = 50;

/// Default window in which all combo members must report a click.
pub const COMBO_WINDOW_MS: u16 = 300;

// =============================================================================
// Per-Key Timing
// =============================================================================

/// Thresholds driving one key's state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyTiming {
    /// Debounce time before a press is accepted.
    pub debounce_ms: u16,
    /// Hold time that turns a release into a long press.
    pub long_press_ms: u16,
    /// Hold time that starts continuous presses. `0` disables them.
    pub continuous_press_ms: u16,
    /// Gap after a release that closes a click sequence.
    pub multi_click_gap_ms: u16,
    /// Cap on counted clicks (1..=[`MULTI_CLICK_CEILING`]).
    pub max_multi_click: u8,
}

impl KeyTiming {
    /// Default thresholds.
    pub const fn new() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            long_press_ms: LONG_PRESS_MS,
            continuous_press_ms: CONTINUOUS_PRESS_MS,
            multi_click_gap_ms: MULTI_CLICK_GAP_MS,
            max_multi_click: DEFAULT_MAX_MULTI_CLICK,
        }
    }

    /// Whether the continuous-press state is reachable.
    #[inline]
    pub const fn continuous_enabled(&self) -> bool { self.continuous_press_ms > 0 }

    /// Apply a patch, skipping zero fields and clamping the click cap.
    pub fn apply(
        &mut self,
        patch: TimingPatch,
    ) {
        if patch.debounce_ms != 0 {
            self.debounce_ms = patch.debounce_ms;
        }
        if patch.long_press_ms != 0 {
            self.long_press_ms = patch.long_press_ms;
        }
        if patch.continuous_press_ms != 0 {
            self.continuous_press_ms = patch.continuous_press_ms;
        }
        if patch.multi_click_gap_ms != 0 {
            self.multi_click_gap_ms = patch.multi_click_gap_ms;
        }
        if patch.max_multi_click != 0 {
            self.max_multi_click = patch.max_multi_click.min(MULTI_CLICK_CEILING);
        }
    }
}

impl Default for KeyTiming {
    fn default() -> Self { Self::new() }
}

/// Partial update for [`KeyTiming`]. Zero fields are left unchanged.
///
/// Because zero means "unchanged", a patch cannot disable continuous presses
/// on a key that has them; register the key with a zeroed threshold through
/// [`KeyTiming`] directly if that is needed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingPatch {
    pub debounce_ms: u16,
    pub long_press_ms: u16,
    pub continuous_press_ms: u16,
    pub multi_click_gap_ms: u16,
    pub max_multi_click: u8,
}

impl TimingPatch {
    /// Empty patch (changes nothing).
    pub const fn new() -> Self {
        Self {
            debounce_ms: 0,
            long_press_ms: 0,
            continuous_press_ms: 0,
            multi_click_gap_ms: 0,
            max_multi_click: 0,
        }
    }

    pub const fn debounce(
        mut self,
        ms: u16,
    ) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub const fn long_press(
        mut self,
        ms: u16,
    ) -> Self {
        self.long_press_ms = ms;
        self
    }

    pub const fn continuous_press(
        mut self,
        ms: u16,
    ) -> Self {
        self.continuous_press_ms = ms;
        self
    }

    pub const fn multi_click_gap(
        mut self,
        ms: u16,
    ) -> Self {
        self.multi_click_gap_ms = ms;
        self
    }

    pub const fn max_multi_click(
        mut self,
        count: u8,
    ) -> Self {
        self.max_multi_click = count;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
