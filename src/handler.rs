//! Event handler capabilities.
//!
//! Handlers are stored by shared reference, so one handler can serve several
//! keys or event kinds. Whatever state a handler needs (the "user context")
//! lives inside it, typically behind a `Cell` or `RefCell`.

use crate::event::KeyEvent;

/// Handle to a key registered on a [`Keypad`](crate::Keypad).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyId(pub(crate) u8);

impl KeyId {
    /// Registration index of the key.
    #[inline]
    pub const fn index(self) -> usize { self.0 as usize }
}

/// Handle to a combo registered on a [`Keypad`](crate::Keypad).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComboId(pub(crate) u8);

impl ComboId {
    /// Registration index of the combo.
    #[inline]
    pub const fn index(self) -> usize { self.0 as usize }
}

/// Key that raised an event.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySource {
    pub id: KeyId,
    pub label: &'static str,
}

/// Combo that fired.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComboSource {
    pub id: ComboId,
    pub label: &'static str,
}

/// Receives semantic events from single keys.
pub trait KeyHandler {
    fn on_key_event(
        &self,
        source: KeySource,
        event: KeyEvent,
    );
}

impl<F> KeyHandler for F
where
    F: Fn(KeySource, KeyEvent),
{
    #[inline]
    fn on_key_event(
        &self,
        source: KeySource,
        event: KeyEvent,
    ) {
        self(source, event)
    }
}

/// Receives combo matches.
pub trait ComboHandler {
    fn on_combo(
        &self,
        source: ComboSource,
    );
}

impl<F> ComboHandler for F
where
    F: Fn(ComboSource),
{
    #[inline]
    fn on_combo(
        &self,
        source: ComboSource,
    ) {
        self(source)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn test_closure_key_handler() {
        let hits = Cell::new(0u32);
        let handler = |source: KeySource, event: KeyEvent| {
            assert_eq!(source.label, "OK");
            assert_eq!(event, KeyEvent::DoubleClick);
            hits.set(hits.get() + 1);
        };
        let handler: &dyn KeyHandler = &handler;
        handler.on_key_event(
            KeySource {
                id: KeyId(3),
                label: "OK",
            },
            KeyEvent::DoubleClick,
        );
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_closure_combo_handler() {
        let fired = Cell::new(false);
        let handler = |source: ComboSource| fired.set(source.id.index() == 1);
        let handler: &dyn ComboHandler = &handler;
        handler.on_combo(ComboSource {
            id: ComboId(1),
            label: "A+B",
        });
        assert!(fired.get());
    }
}
