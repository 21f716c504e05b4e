//! Key and combo registries plus the per-poll driver.
//!
//! A [`Keypad`] owns every registered key and combo and is advanced by the
//! caller with a millisecond tick. Each [`Keypad::advance`] runs, in order:
//!
//! 1. Clear last poll's locks on combo members
//! 2. Sample and step every key
//! 3. Run every combo over the fresh pending events (may lock members)
//! 4. Dispatch pending events of keys that are not locked
//!
//! Combos must see the pending clicks before dispatch consumes them, so the
//! order above is fixed.
//!
//! # Usage
//!
//! ```ignore
//! let mut read_ok = || ok_pin.is_low();
//! let mut read_back = || back_pin.is_low();
//! let on_key = |source: KeySource, event: KeyEvent| { /* ... */ };
//! let on_reset = |_: ComboSource| { /* ... */ };
//!
//! let mut keypad: Keypad = Keypad::new();
//! let ok = keypad.add_key("ok", &mut read_ok)?;
//! let back = keypad.add_key("back", &mut read_back)?;
//! keypad.on_click(ok, &on_key)?;
//! keypad.on_long_press(back, &on_key)?;
//!
//! let reset = keypad.add_combo("reset", &[ok, back])?;
//! keypad.set_combo_handler(reset, &on_reset)?;
//!
//! loop {
//!     keypad.advance(now_ms());
//!     delay_ms(10);
//! }
//! ```

use heapless::Vec;

use crate::combo::Combo;
use crate::config::{
    CONTINUOUS_REPEAT_MS,
    DEFAULT_COMBO_CAPACITY,
    DEFAULT_KEY_CAPACITY,
    KeyTiming,
    MAX_COMBO_MEMBERS,
    MIN_COMBO_MEMBERS,
    MULTI_CLICK_CEILING,
    TimingPatch,
};
use crate::error::KeypadError;
use crate::event::{EventMask, KeyEvent, KeyState};
use crate::handler::{ComboHandler, ComboId, KeyHandler, KeyId};
use crate::key::{Key, RepeatGate};
use crate::reader::KeyReader;

/// Progress of a combo's current attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComboProgress {
    /// Whether an attempt is open.
    pub in_progress: bool,
    /// Bits of members seen so far, in registration order.
    pub matched: u8,
    /// Bits required to fire.
    pub expected: u8,
}

/// Fixed-capacity registry of keys and combos, advanced by polling.
///
/// `KEYS` and `COMBOS` bound the registries; nothing is allocated after
/// construction. Readers and handlers are borrowed for `'a`.
pub struct Keypad<'a, const KEYS: usize = DEFAULT_KEY_CAPACITY, const COMBOS: usize = DEFAULT_COMBO_CAPACITY> {
    keys: Vec<Key<'a>, KEYS>,
    combos: Vec<Combo<'a>, COMBOS>,
    repeat: RepeatGate,
}

impl<'a, const KEYS: usize, const COMBOS: usize> Keypad<'a, KEYS, COMBOS> {
    /// Create an empty keypad.
    pub const fn new() -> Self {
        Self {
            keys: Vec::new(),
            combos: Vec::new(),
            repeat: RepeatGate::new(CONTINUOUS_REPEAT_MS),
        }
    }

    // =========================================================================
    // Key Registration
    // =========================================================================

    /// Register a key with default timing.
    pub fn add_key(
        &mut self,
        label: &'static str,
        reader: &'a mut dyn KeyReader,
    ) -> Result<KeyId, KeypadError> {
        self.add_key_with_timing(label, reader, KeyTiming::new())
    }

    /// Register a key with explicit timing.
    ///
    /// `timing.max_multi_click` is clamped to the ceiling like any patch.
    pub fn add_key_with_timing(
        &mut self,
        label: &'static str,
        reader: &'a mut dyn KeyReader,
        mut timing: KeyTiming,
    ) -> Result<KeyId, KeypadError> {
        let index = self.keys.len();
        let Ok(raw) = u8::try_from(index) else {
            warn!("keypad: key id space exhausted, {} rejected", label);
            return Err(KeypadError::KeyCapacity);
        };

        timing.max_multi_click = timing.max_multi_click.min(MULTI_CLICK_CEILING);
        let id = KeyId(raw);
        self.keys.push(Key::new(id, label, reader, timing)).map_err(|_| {
            warn!("keypad: key registry full, {} rejected", label);
            KeypadError::KeyCapacity
        })?;
        info!("keypad: key {} registered as #{=u8}", label, raw);
        Ok(id)
    }

    /// Change a key's thresholds. Zero fields are left unchanged.
    pub fn set_timing(
        &mut self,
        id: KeyId,
        patch: TimingPatch,
    ) -> Result<(), KeypadError> {
        self.key_mut(id)?.machine_mut().apply_timing(patch);
        Ok(())
    }

    pub fn set_debounce(
        &mut self,
        id: KeyId,
        ms: u16,
    ) -> Result<(), KeypadError> {
        self.set_timing(id, TimingPatch::new().debounce(ms))
    }

    pub fn set_long_press(
        &mut self,
        id: KeyId,
        ms: u16,
    ) -> Result<(), KeypadError> {
        self.set_timing(id, TimingPatch::new().long_press(ms))
    }

    pub fn set_continuous_press(
        &mut self,
        id: KeyId,
        ms: u16,
    ) -> Result<(), KeypadError> {
        self.set_timing(id, TimingPatch::new().continuous_press(ms))
    }

    pub fn set_multi_click_gap(
        &mut self,
        id: KeyId,
        ms: u16,
    ) -> Result<(), KeypadError> {
        self.set_timing(id, TimingPatch::new().multi_click_gap(ms))
    }

    /// Cap the clicks counted in one sequence (clamped to 15).
    pub fn set_max_multi_click(
        &mut self,
        id: KeyId,
        count: u8,
    ) -> Result<(), KeypadError> {
        self.set_timing(id, TimingPatch::new().max_multi_click(count))
    }

    /// Return a key's state machine to `Init`, dropping any pending event.
    pub fn reset_key(
        &mut self,
        id: KeyId,
    ) -> Result<(), KeypadError> {
        self.key_mut(id)?.machine_mut().reset();
        Ok(())
    }

    // =========================================================================
    // Key Handlers
    // =========================================================================

    /// Route one event kind of a key to `handler`, replacing any previous one.
    pub fn set_handler(
        &mut self,
        id: KeyId,
        event: KeyEvent,
        handler: &'a dyn KeyHandler,
    ) -> Result<(), KeypadError> {
        self.key_mut(id)?.set_handler(event, handler);
        Ok(())
    }

    /// Stop routing one event kind of a key. Such events are then dropped.
    pub fn clear_handler(
        &mut self,
        id: KeyId,
        event: KeyEvent,
    ) -> Result<(), KeypadError> {
        self.key_mut(id)?.clear_handler(event);
        Ok(())
    }

    pub fn on_click(
        &mut self,
        id: KeyId,
        handler: &'a dyn KeyHandler,
    ) -> Result<(), KeypadError> {
        self.set_handler(id, KeyEvent::Click, handler)
    }

    pub fn on_double_click(
        &mut self,
        id: KeyId,
        handler: &'a dyn KeyHandler,
    ) -> Result<(), KeypadError> {
        self.set_handler(id, KeyEvent::DoubleClick, handler)
    }

    pub fn on_triple_click(
        &mut self,
        id: KeyId,
        handler: &'a dyn KeyHandler,
    ) -> Result<(), KeypadError> {
        self.set_handler(id, KeyEvent::TripleClick, handler)
    }

    pub fn on_multi_click(
        &mut self,
        id: KeyId,
        handler: &'a dyn KeyHandler,
    ) -> Result<(), KeypadError> {
        self.set_handler(id, KeyEvent::MultiClick, handler)
    }

    pub fn on_long_press(
        &mut self,
        id: KeyId,
        handler: &'a dyn KeyHandler,
    ) -> Result<(), KeypadError> {
        self.set_handler(id, KeyEvent::LongPress, handler)
    }

    pub fn on_continuous_press(
        &mut self,
        id: KeyId,
        handler: &'a dyn KeyHandler,
    ) -> Result<(), KeypadError> {
        self.set_handler(id, KeyEvent::ContinuousPress, handler)
    }

    /// Minimum spacing between continuous-press handler calls across all keys.
    /// Zero leaves the interval unchanged.
    pub fn set_repeat_interval(
        &mut self,
        ms: u32,
    ) {
        if ms != 0 {
            self.repeat.set_interval(ms);
        }
    }

    #[inline]
    pub const fn repeat_interval(&self) -> u32 { self.repeat.interval_ms() }

    // =========================================================================
    // Combos
    // =========================================================================

    /// Register a combo over 2 to 4 distinct, already registered keys.
    ///
    /// Member order fixes each member's bit in [`ComboProgress`]. The window
    /// starts at 300 ms.
    pub fn add_combo(
        &mut self,
        label: &'static str,
        members: &[KeyId],
    ) -> Result<ComboId, KeypadError> {
        if !(MIN_COMBO_MEMBERS..=MAX_COMBO_MEMBERS).contains(&members.len()) {
            warn!("keypad: combo {} has {=usize} members", label, members.len());
            return Err(KeypadError::InvalidMemberCount {
                count: members.len(),
            });
        }
        for (i, member) in members.iter().enumerate() {
            if member.index() >= self.keys.len() {
                warn!("keypad: combo {} names an unknown key", label);
                return Err(KeypadError::UnknownKey);
            }
            if members[..i].contains(member) {
                warn!("keypad: combo {} lists a key twice", label);
                return Err(KeypadError::DuplicateMember);
            }
        }
        let index = self.combos.len();
        let Ok(raw) = u8::try_from(index) else {
            return Err(KeypadError::ComboCapacity);
        };

        let list: Vec<KeyId, MAX_COMBO_MEMBERS> = Vec::from_slice(members).map_err(|_| KeypadError::InvalidMemberCount {
            count: members.len(),
        })?;

        let id = ComboId(raw);
        self.combos.push(Combo::new(id, label, list)).map_err(|_| {
            warn!("keypad: combo registry full, {} rejected", label);
            KeypadError::ComboCapacity
        })?;
        for member in members {
            self.keys[member.index()].mark_combo_member();
        }
        info!("keypad: combo {} registered as #{=u8}", label, raw);
        Ok(id)
    }

    /// Set the handler called when the combo fires.
    pub fn set_combo_handler(
        &mut self,
        id: ComboId,
        handler: &'a dyn ComboHandler,
    ) -> Result<(), KeypadError> {
        self.combo_mut(id)?.set_handler(Some(handler));
        Ok(())
    }

    /// Remove the combo's handler. The combo still swallows member clicks.
    pub fn clear_combo_handler(
        &mut self,
        id: ComboId,
    ) -> Result<(), KeypadError> {
        self.combo_mut(id)?.set_handler(None);
        Ok(())
    }

    /// Set the time all members must click within.
    pub fn set_combo_window(
        &mut self,
        id: ComboId,
        window_ms: u16,
    ) -> Result<(), KeypadError> {
        self.combo_mut(id)?.set_window(window_ms);
        Ok(())
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Run one poll at `tick_ms`.
    ///
    /// Ticks must not go backwards. Poll more often than the shortest
    /// debounce time (every 10 ms or faster with the defaults). Returns `true`
    /// once every unlocked key has been dispatched.
    pub fn advance(
        &mut self,
        tick_ms: u32,
    ) -> bool {
        for key in self.keys.iter_mut().filter(|key| key.is_combo_member()) {
            key.set_locked(false);
        }

        for key in self.keys.iter_mut() {
            key.poll(tick_ms);
        }

        for combo in self.combos.iter_mut() {
            combo.process(tick_ms, &mut self.keys);
        }

        let mut all_dispatched = true;
        for key in self.keys.iter_mut().filter(|key| !key.is_locked()) {
            all_dispatched &= key.dispatch(tick_ms, &mut self.repeat);
        }
        all_dispatched
    }

    /// Run one poll at the current `embassy_time` instant.
    #[cfg(feature = "embassy-time")]
    pub fn poll(&mut self) -> bool { self.advance(embassy_time::Instant::now().as_millis() as u32) }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[inline]
    pub fn key_count(&self) -> usize { self.keys.len() }

    #[inline]
    pub fn combo_count(&self) -> usize { self.combos.len() }

    pub fn key_label(
        &self,
        id: KeyId,
    ) -> Option<&'static str> {
        self.key(id).map(Key::label)
    }

    pub fn key_state(
        &self,
        id: KeyId,
    ) -> Option<KeyState> {
        self.key(id).map(|key| key.machine().state())
    }

    /// Event waiting for dispatch, if any.
    pub fn pending_event(
        &self,
        id: KeyId,
    ) -> Option<KeyEvent> {
        self.key(id).and_then(Key::pending)
    }

    pub fn key_timing(
        &self,
        id: KeyId,
    ) -> Option<KeyTiming> {
        self.key(id).map(|key| *key.machine().timing())
    }

    /// Event kinds with a handler registered.
    pub fn handled_events(
        &self,
        id: KeyId,
    ) -> EventMask {
        self.key(id).map_or(EventMask::EMPTY, Key::handled)
    }

    /// Whether the key's dispatch was suppressed by a combo in the last poll.
    pub fn is_locked(
        &self,
        id: KeyId,
    ) -> bool {
        self.key(id).is_some_and(Key::is_locked)
    }

    pub fn is_combo_member(
        &self,
        id: KeyId,
    ) -> bool {
        self.key(id).is_some_and(Key::is_combo_member)
    }

    pub fn combo_label(
        &self,
        id: ComboId,
    ) -> Option<&'static str> {
        self.combo(id).map(Combo::label)
    }

    pub fn combo_members(
        &self,
        id: ComboId,
    ) -> Option<&[KeyId]> {
        self.combo(id).map(Combo::members)
    }

    pub fn combo_window(
        &self,
        id: ComboId,
    ) -> Option<u16> {
        self.combo(id).map(Combo::window_ms)
    }

    pub fn combo_progress(
        &self,
        id: ComboId,
    ) -> Option<ComboProgress> {
        self.combo(id).map(|combo| ComboProgress {
            in_progress: combo.in_progress(),
            matched: combo.accumulated(),
            expected: combo.expected(),
        })
    }

    fn key(
        &self,
        id: KeyId,
    ) -> Option<&Key<'a>> {
        self.keys.get(id.index())
    }

    fn key_mut(
        &mut self,
        id: KeyId,
    ) -> Result<&mut Key<'a>, KeypadError> {
        self.keys.get_mut(id.index()).ok_or(KeypadError::UnknownKey)
    }

    fn combo(
        &self,
        id: ComboId,
    ) -> Option<&Combo<'a>> {
        self.combos.get(id.index())
    }

    fn combo_mut(
        &mut self,
        id: ComboId,
    ) -> Result<&mut Combo<'a>, KeypadError> {
        self.combos.get_mut(id.index()).ok_or(KeypadError::UnknownCombo)
    }
}

impl<const KEYS: usize, const COMBOS: usize> Default for Keypad<'_, KEYS, COMBOS> {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Unit Tests
// =============================================================================
