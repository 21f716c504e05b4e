//! Physical key reads.
//!
//! A [`KeyReader`] answers one question: is the key actuated right now?
//! Polarity is the reader's business. Any `FnMut() -> bool` closure is a reader,
//! and with the `embedded-hal` feature the [`ActiveLow`] / [`ActiveHigh`]
//! wrappers adapt a GPIO input pin.

/// Source of a key's current physical level.
pub trait KeyReader {
    /// Returns `true` while the key is actuated.
    fn is_pressed(&mut self) -> bool;
}

impl<F> KeyReader for F
where
    F: FnMut() -> bool,
{
    #[inline]
    fn is_pressed(&mut self) -> bool { self() }
}

// =============================================================================
// embedded-hal Pin Adapters
// =============================================================================

#[cfg(feature = "embedded-hal")]
pub use pins::{ActiveHigh, ActiveLow};

#[cfg(feature = "embedded-hal")]
mod pins {
    use embedded_hal::digital::InputPin;

    use super::KeyReader;

    /// Key wired to ground with a pull-up: pressed reads low.
    ///
    /// A pin read error counts as "not pressed".
    pub struct ActiveLow<P>(pub P);

    impl<P: InputPin> KeyReader for ActiveLow<P> {
        #[inline]
        fn is_pressed(&mut self) -> bool { self.0.is_low().unwrap_or(false) }
    }

    /// Key wired to the supply with a pull-down: pressed reads high.
    ///
    /// A pin read error counts as "not pressed".
    pub struct ActiveHigh<P>(pub P);

    impl<P: InputPin> KeyReader for ActiveHigh<P> {
        #[inline]
        fn is_pressed(&mut self) -> bool { self.0.is_high().unwrap_or(false) }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
