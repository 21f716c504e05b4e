//! Combination key recognition.
//!
//! A combo watches the pending `Click` of each member key. The first member
//! click opens a window; every member that clicks inside the window sets its
//! bit. When all bits are set the combo fires once and swallows the members'
//! pending events.
//!
//! While an attempt is open every member is locked, which holds back *all* of
//! its pending events for that poll, not only the click. A member that clicked
//! without completing the combo gets its click delivered in the poll where the
//! window expires.

use heapless::Vec;

use crate::config::{COMBO_WINDOW_MS, MAX_COMBO_MEMBERS};
use crate::event::KeyEvent;
use crate::handler::{ComboHandler, ComboId, ComboSource, KeyId};
use crate::key::Key;

/// One registered key combination.
pub(crate) struct Combo<'a> {
    id: ComboId,
    label: &'static str,
    /// Member order defines the mask bit of each member.
    members: Vec<KeyId, MAX_COMBO_MEMBERS>,
    /// One bit per member, all set.
    expected: u8,
    /// Members seen clicking in the current attempt.
    accumulated: u8,
    /// Tick of the first member click of the current attempt.
    first_seen: Option<u32>,
    window_ms: u16,
    triggered: bool,
    handler: Option<&'a dyn ComboHandler>,
}

impl<'a> Combo<'a> {
    /// Build a combo over already validated members.
    pub(crate) fn new(
        id: ComboId,
        label: &'static str,
        members: Vec<KeyId, MAX_COMBO_MEMBERS>,
    ) -> Self {
        let expected = (0..members.len()).fold(0u8, |mask, bit| mask | (1 << bit));
        Self {
            id,
            label,
            members,
            expected,
            accumulated: 0,
            first_seen: None,
            window_ms: COMBO_WINDOW_MS,
            triggered: false,
            handler: None,
        }
    }

    #[inline]
    pub(crate) const fn label(&self) -> &'static str { self.label }

    #[inline]
    pub(crate) fn members(&self) -> &[KeyId] { &self.members }

    #[inline]
    pub(crate) const fn window_ms(&self) -> u16 { self.window_ms }

    #[inline]
    pub(crate) const fn in_progress(&self) -> bool { self.first_seen.is_some() }

    #[inline]
    pub(crate) const fn accumulated(&self) -> u8 { self.accumulated }

    #[inline]
    pub(crate) const fn expected(&self) -> u8 { self.expected }

    pub(crate) fn set_window(
        &mut self,
        window_ms: u16,
    ) {
        self.window_ms = window_ms;
    }

    pub(crate) fn set_handler(
        &mut self,
        handler: Option<&'a dyn ComboHandler>,
    ) {
        self.handler = handler;
    }

    /// Run one recognition pass over freshly stepped keys.
    ///
    /// Must run after every key has been polled and before any key dispatches.
    pub(crate) fn process(
        &mut self,
        tick: u32,
        keys: &mut [Key<'a>],
    ) {
        let window = u32::from(self.window_ms);
        let mut active = self.first_seen.is_some();

        for (bit, member) in self.members.iter().enumerate() {
            if keys[member.index()].pending() != Some(KeyEvent::Click) {
                continue;
            }
            match self.first_seen {
                None => {
                    debug!("combo {}: attempt started at {=u32}", self.label, tick);
                    self.first_seen = Some(tick);
                    self.accumulated = 1 << bit;
                    active = true;
                }
                Some(first) if tick.wrapping_sub(first) <= window => {
                    self.accumulated |= 1 << bit;
                }
                Some(_) => {}
            }
        }

        // Once per pass, so a later member's held click can't re-open a matched attempt
        if self.accumulated == self.expected {
            self.triggered = true;
            self.accumulated = 0;
            self.first_seen = None;
        }

        if active {
            self.set_members_locked(keys, true);
        }

        if self.triggered {
            self.triggered = false;
            debug!("combo {}: matched at {=u32}", self.label, tick);
            if let Some(handler) = self.handler {
                handler.on_combo(ComboSource {
                    id: self.id,
                    label: self.label,
                });
            }
            for member in &self.members {
                let key = &mut keys[member.index()];
                key.machine_mut().clear_pending();
                key.set_locked(false);
            }
        }

        if let Some(first) = self.first_seen
            && tick.wrapping_sub(first) > window
        {
            debug!("combo {}: window expired at {=u32}", self.label, tick);
            self.first_seen = None;
            self.accumulated = 0;
            self.set_members_locked(keys, false);
        }
    }

    fn set_members_locked(
        &self,
        keys: &mut [Key<'a>],
        locked: bool,
    ) {
        for member in &self.members {
            keys[member.index()].set_locked(locked);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
