//! Per-key press classification.
//!
//! [`KeyMachine`] turns a stream of `(tick, pressed)` samples into semantic
//! events: debounced presses become clicks, double/triple/multi clicks, long
//! presses, or a repeating continuous press while the key stays held.
//!
//! # Timing
//!
//! Every threshold is compared against the time since the machine last
//! recorded a transition. Ticks are milliseconds and wrap like `u32`; a single
//! timing window must never span a wrap.
//!
//! ```text
//! Released --(press, debounced)--> Pressed --(release < long)--> MultiPressed
//!    ^                               |                               |
//!    |                          (held >= long)              (gap expired: Click,
//!    |                               v                      Double, Triple, Multi)
//!    +--(release: LongPress)---- LongPressed                         |
//!    |                               | (held >= continuous)          |
//!    |                               v                               |
//!    +--(release: no event)--- LongPressedContinuous                 |
//!    +---------------------------------------------------------------+
//! ```

use crate::config::{KeyTiming, TimingPatch};
use crate::event::{EventMask, KeyEvent, KeyState};
use crate::handler::{KeyHandler, KeyId, KeySource};
use crate::reader::KeyReader;

// =============================================================================
// State Machine
// =============================================================================

/// Press classifier for a single key.
///
/// Holds at most one pending event. The pending event is replaced or cleared
/// by later transitions, or cleared by whoever consumes it.
#[derive(Clone, Debug)]
pub struct KeyMachine {
    timing: KeyTiming,
    state: KeyState,
    pending: Option<KeyEvent>,
    /// Tick of the last recorded transition.
    last_change: u32,
    /// Clicks counted in the current sequence.
    click_count: u8,
}

impl KeyMachine {
    pub const fn new(timing: KeyTiming) -> Self {
        Self {
            timing,
            state: KeyState::Init,
            pending: None,
            last_change: 0,
            click_count: 0,
        }
    }

    #[inline]
    pub const fn state(&self) -> KeyState { self.state }

    #[inline]
    pub const fn pending(&self) -> Option<KeyEvent> { self.pending }

    #[inline]
    pub const fn click_count(&self) -> u8 { self.click_count }

    #[inline]
    pub const fn timing(&self) -> &KeyTiming { &self.timing }

    /// Change thresholds. Zero fields of the patch are ignored.
    pub fn apply_timing(
        &mut self,
        patch: TimingPatch,
    ) {
        self.timing.apply(patch);
    }

    /// Drop the pending event, if any.
    #[inline]
    pub fn clear_pending(&mut self) { self.pending = None; }

    #[cfg(test)]
    pub(crate) fn set_pending(
        &mut self,
        event: Option<KeyEvent>,
    ) {
        self.pending = event;
    }

    /// Back to `Init` with no clicks counted and nothing pending.
    pub fn reset(&mut self) {
        self.state = KeyState::Init;
        self.pending = None;
        self.click_count = 0;
    }

    /// Advance by one sample.
    pub fn step(
        &mut self,
        tick: u32,
        pressed: bool,
    ) {
        let elapsed = tick.wrapping_sub(self.last_change);
        let debounce = u32::from(self.timing.debounce_ms);
        let long_press = u32::from(self.timing.long_press_ms);
        let continuous = u32::from(self.timing.continuous_press_ms);
        let continuous_enabled = self.timing.continuous_enabled();

        match self.state {
            KeyState::Init => {
                if pressed {
                    self.enter(KeyState::Pressed, tick);
                } else {
                    self.enter(KeyState::Released, tick);
                    self.pending = None;
                }
            }
            KeyState::Released => {
                if pressed && elapsed >= debounce {
                    self.enter(KeyState::Pressed, tick);
                    self.pending = None;
                }
            }
            KeyState::Pressed => {
                if !pressed {
                    if elapsed >= long_press {
                        self.finish_long_press(tick);
                    } else {
                        self.count_click();
                        self.enter(KeyState::MultiPressed, tick);
                    }
                } else if continuous_enabled && elapsed >= continuous {
                    self.start_continuous(tick);
                } else if continuous_enabled && elapsed >= long_press {
                    // Keep the press timestamp: continuous is measured from the press
                    self.state = KeyState::LongPressed;
                    trace!("key: long press held at {=u32}", tick);
                }
            }
            KeyState::LongPressed => {
                if !pressed {
                    self.finish_long_press(tick);
                } else if continuous_enabled && elapsed >= continuous {
                    self.start_continuous(tick);
                }
            }
            KeyState::LongPressedContinuous => {
                if pressed {
                    self.pending = Some(KeyEvent::ContinuousPress);
                } else {
                    self.enter(KeyState::Released, tick);
                    self.pending = None;
                    self.click_count = 0;
                }
            }
            KeyState::MultiPressed => {
                if pressed && elapsed >= debounce {
                    self.enter(KeyState::Pressed, tick);
                } else if !pressed && elapsed >= u32::from(self.timing.multi_click_gap_ms) {
                    if let Some(event) = KeyEvent::from_click_count(self.click_count) {
                        self.emit(event);
                    }
                    self.enter(KeyState::Released, tick);
                    self.click_count = 0;
                }
            }
        }
    }

    fn enter(
        &mut self,
        state: KeyState,
        tick: u32,
    ) {
        trace!("key: {} -> {} at {=u32}", self.state, state, tick);
        self.state = state;
        self.last_change = tick;
    }

    fn emit(
        &mut self,
        event: KeyEvent,
    ) {
        trace!("key: emit {}", event);
        self.pending = Some(event);
    }

    fn count_click(&mut self) {
        if self.click_count < self.timing.max_multi_click.max(1) {
            self.click_count += 1;
        }
    }

    fn finish_long_press(
        &mut self,
        tick: u32,
    ) {
        self.emit(KeyEvent::LongPress);
        self.enter(KeyState::Released, tick);
        self.click_count = 0;
    }

    fn start_continuous(
        &mut self,
        tick: u32,
    ) {
        self.enter(KeyState::LongPressedContinuous, tick);
        self.emit(KeyEvent::ContinuousPress);
    }
}

impl Default for KeyMachine {
    fn default() -> Self { Self::new(KeyTiming::new()) }
}

// =============================================================================
// Continuous Press Rate Limit
// =============================================================================

/// Spacing between continuous-press handler calls, shared by a whole keypad.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RepeatGate {
    interval_ms: u32,
    last_fire: Option<u32>,
}

impl RepeatGate {
    pub(crate) const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_fire: None,
        }
    }

    #[inline]
    pub(crate) const fn interval_ms(&self) -> u32 { self.interval_ms }

    pub(crate) fn set_interval(
        &mut self,
        interval_ms: u32,
    ) {
        self.interval_ms = interval_ms;
    }

    /// Whether a continuous press may fire at `tick`. Claims the slot if so.
    pub(crate) fn try_fire(
        &mut self,
        tick: u32,
    ) -> bool {
        let ready = match self.last_fire {
            Some(last) => tick.wrapping_sub(last) >= self.interval_ms,
            None => true,
        };
        if ready {
            self.last_fire = Some(tick);
        }
        ready
    }
}

// =============================================================================
// Registered Key
// =============================================================================

/// A key as held by the keypad: machine, reader, handlers and combo flags.
pub(crate) struct Key<'a> {
    id: KeyId,
    label: &'static str,
    reader: &'a mut dyn KeyReader,
    machine: KeyMachine,
    handlers: [Option<&'a dyn KeyHandler>; KeyEvent::COUNT],
    handled: EventMask,
    combo_member: bool,
    /// Suppresses dispatch for the current cycle only.
    locked: bool,
}

impl<'a> Key<'a> {
    pub(crate) fn new(
        id: KeyId,
        label: &'static str,
        reader: &'a mut dyn KeyReader,
        timing: KeyTiming,
    ) -> Self {
        Self {
            id,
            label,
            reader,
            machine: KeyMachine::new(timing),
            handlers: [None; KeyEvent::COUNT],
            handled: EventMask::EMPTY,
            combo_member: false,
            locked: false,
        }
    }

    #[inline]
    pub(crate) const fn label(&self) -> &'static str { self.label }

    #[inline]
    pub(crate) const fn machine(&self) -> &KeyMachine { &self.machine }

    #[inline]
    pub(crate) fn machine_mut(&mut self) -> &mut KeyMachine { &mut self.machine }

    #[inline]
    pub(crate) const fn pending(&self) -> Option<KeyEvent> { self.machine.pending }

    #[inline]
    pub(crate) const fn handled(&self) -> EventMask { self.handled }

    #[inline]
    pub(crate) const fn is_combo_member(&self) -> bool { self.combo_member }

    #[inline]
    pub(crate) fn mark_combo_member(&mut self) { self.combo_member = true; }

    #[inline]
    pub(crate) const fn is_locked(&self) -> bool { self.locked }

    #[inline]
    pub(crate) fn set_locked(
        &mut self,
        locked: bool,
    ) {
        self.locked = locked;
    }

    pub(crate) fn set_handler(
        &mut self,
        event: KeyEvent,
        handler: &'a dyn KeyHandler,
    ) {
        self.handlers[event.index()] = Some(handler);
        self.handled.insert(event);
    }

    pub(crate) fn clear_handler(
        &mut self,
        event: KeyEvent,
    ) {
        self.handlers[event.index()] = None;
        self.handled.remove(event);
    }

    /// Sample the reader and advance the machine.
    pub(crate) fn poll(
        &mut self,
        tick: u32,
    ) {
        let pressed = self.reader.is_pressed();
        self.machine.step(tick, pressed);
    }

    /// Hand the pending event to its handler.
    ///
    /// Events without a handler are dropped. A continuous press is never
    /// cleared here: it stays pending while the key is held and fires only
    /// when `repeat` allows. A key has no failure mode, so this always returns
    /// `true`.
    pub(crate) fn dispatch(
        &mut self,
        tick: u32,
        repeat: &mut RepeatGate,
    ) -> bool {
        let Some(event) = self.machine.pending else {
            return true;
        };

        let handler = if self.handled.contains(event) {
            self.handlers[event.index()]
        } else {
            None
        };
        let source = KeySource {
            id: self.id,
            label: self.label,
        };

        if event == KeyEvent::ContinuousPress {
            if let Some(handler) = handler
                && repeat.try_fire(tick)
            {
                handler.on_key_event(source, event);
            }
            return true;
        }

        if let Some(handler) = handler {
            handler.on_key_event(source, event);
        }
        self.machine.clear_pending();
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use super::*;

    const STEP: u32 = 10;

    /// Feed `pressed` every STEP ms over `[from, to)`, collecting pending events.
    fn drive(
        machine: &mut KeyMachine,
        pressed: bool,
        from: u32,
        to: u32,
        seen: &mut Vec<(u32, KeyEvent)>,
    ) {
        let mut tick = from;
        while tick < to {
            machine.step(tick, pressed);
            if let Some(event) = machine.pending() {
                seen.push((tick, event));
                if event != KeyEvent::ContinuousPress {
                    machine.clear_pending();
                }
            }
            tick += STEP;
        }
    }

    fn released_machine(timing: KeyTiming) -> KeyMachine {
        let mut machine = KeyMachine::new(timing);
        machine.step(0, false);
        assert_eq!(machine.state(), KeyState::Released);
        machine
    }

    #[test]
    fn test_init_released() {
        let mut machine = KeyMachine::default();
        assert_eq!(machine.state(), KeyState::Init);
        machine.step(0, false);
        assert_eq!(machine.state(), KeyState::Released);
        assert_eq!(machine.pending(), None);
    }

    #[test]
    fn test_init_pressed_goes_straight_to_pressed() {
        let mut machine = KeyMachine::default();
        machine.step(5, true);
        assert_eq!(machine.state(), KeyState::Pressed);
    }

    #[test]
    fn test_debounce_blocks_early_press() {
        let mut machine = released_machine(KeyTiming::new());

        // Less than 20 ms since entering Released
        machine.step(10, true);
        assert_eq!(machine.state(), KeyState::Released);
        machine.step(19, true);
        assert_eq!(machine.state(), KeyState::Released);

        machine.step(20, true);
        assert_eq!(machine.state(), KeyState::Pressed);
    }

    #[test]
    fn test_single_click() {
        let mut machine = released_machine(KeyTiming::new());
        let mut seen = Vec::new();
        drive(&mut machine, true, 100, 200, &mut seen);
        drive(&mut machine, false, 200, 1000, &mut seen);

        // Released at 200, gap of 300 ms closes the sequence at 500
        assert_eq!(seen, [(500, KeyEvent::Click)]);
        assert_eq!(machine.state(), KeyState::Released);
        assert_eq!(machine.click_count(), 0);
    }

    #[test]
    fn test_double_click() {
        let mut machine = released_machine(KeyTiming::new());
        let mut seen = Vec::new();
        drive(&mut machine, true, 100, 200, &mut seen);
        drive(&mut machine, false, 200, 300, &mut seen);
        drive(&mut machine, true, 300, 400, &mut seen);
        drive(&mut machine, false, 400, 1200, &mut seen);

        assert_eq!(seen, [(700, KeyEvent::DoubleClick)]);
        assert_eq!(machine.click_count(), 0);
    }

    #[test]
    fn test_triple_and_multi_click() {
        let mut machine = released_machine(KeyTiming::new());
        let mut seen = Vec::new();
        let mut tick = 100;
        for _ in 0..3 {
            drive(&mut machine, true, tick, tick + 60, &mut seen);
            drive(&mut machine, false, tick + 60, tick + 120, &mut seen);
            tick += 120;
        }
        drive(&mut machine, false, tick, tick + 400, &mut seen);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, KeyEvent::TripleClick);

        seen.clear();
        tick += 400;
        for _ in 0..6 {
            drive(&mut machine, true, tick, tick + 60, &mut seen);
            drive(&mut machine, false, tick + 60, tick + 120, &mut seen);
            tick += 120;
        }
        drive(&mut machine, false, tick, tick + 400, &mut seen);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, KeyEvent::MultiClick);
    }

    #[test]
    fn test_click_count_saturates_at_max() {
        let timing = KeyTiming {
            max_multi_click: 2,
            ..KeyTiming::new()
        };
        let mut machine = released_machine(timing);
        let mut seen = Vec::new();
        let mut tick = 100;
        for _ in 0..3 {
            drive(&mut machine, true, tick, tick + 60, &mut seen);
            drive(&mut machine, false, tick + 60, tick + 120, &mut seen);
            tick += 120;
        }
        drive(&mut machine, false, tick, tick + 400, &mut seen);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, KeyEvent::DoubleClick);
    }

    #[test]
    fn test_long_press() {
        let mut machine = released_machine(KeyTiming::new());
        let mut seen = Vec::new();
        drive(&mut machine, true, 100, 600, &mut seen);
        assert_eq!(machine.state(), KeyState::Pressed);

        drive(&mut machine, true, 600, 900, &mut seen);
        assert_eq!(machine.state(), KeyState::LongPressed);
        assert!(seen.is_empty());

        drive(&mut machine, false, 900, 1500, &mut seen);
        assert_eq!(seen, [(900, KeyEvent::LongPress)]);
        assert_eq!(machine.click_count(), 0);
        assert_eq!(machine.state(), KeyState::Released);
    }

    #[test]
    fn test_long_press_after_clicks_resets_count() {
        let mut machine = released_machine(KeyTiming::new());
        let mut seen = Vec::new();
        drive(&mut machine, true, 100, 150, &mut seen);
        drive(&mut machine, false, 150, 250, &mut seen);
        assert_eq!(machine.click_count(), 1);

        // Second press held long: the sequence becomes a long press
        drive(&mut machine, true, 250, 900, &mut seen);
        drive(&mut machine, false, 900, 1500, &mut seen);
        assert_eq!(seen, [(900, KeyEvent::LongPress)]);
        assert_eq!(machine.click_count(), 0);
    }

    #[test]
    fn test_continuous_press_repeats_until_release() {
        let mut machine = released_machine(KeyTiming::new());
        let mut seen = Vec::new();
        drive(&mut machine, true, 100, 2000, &mut seen);

        // Continuous starts 1500 ms after the press and stays pending every sample
        assert_eq!(seen.first(), Some(&(1600, KeyEvent::ContinuousPress)));
        assert_eq!(seen.len(), 40);
        assert!(seen.iter().all(|(_, event)| *event == KeyEvent::ContinuousPress));
        assert_eq!(machine.state(), KeyState::LongPressedContinuous);

        seen.clear();
        drive(&mut machine, false, 2000, 3000, &mut seen);
        assert!(seen.is_empty());
        assert_eq!(machine.state(), KeyState::Released);
        assert_eq!(machine.pending(), None);
    }

    #[test]
    fn test_continuous_disabled() {
        let timing = KeyTiming {
            continuous_press_ms: 0,
            ..KeyTiming::new()
        };
        let mut machine = released_machine(timing);
        let mut seen = Vec::new();
        drive(&mut machine, true, 100, 5000, &mut seen);
        assert_eq!(machine.state(), KeyState::Pressed);
        assert!(seen.is_empty());

        drive(&mut machine, false, 5000, 6000, &mut seen);
        assert_eq!(seen, [(5000, KeyEvent::LongPress)]);
    }

    #[test]
    fn test_multi_pressed_bounce_ignored() {
        let mut machine = released_machine(KeyTiming::new());
        machine.step(100, true);
        machine.step(150, false);
        assert_eq!(machine.state(), KeyState::MultiPressed);

        // Contact bounce right after release
        machine.step(160, true);
        assert_eq!(machine.state(), KeyState::MultiPressed);
        machine.step(170, true);
        assert_eq!(machine.state(), KeyState::Pressed);
    }

    #[test]
    fn test_tick_wraparound() {
        let mut machine = KeyMachine::default();
        let start = u32::MAX - 100;
        machine.step(start, false);
        machine.step(start.wrapping_add(50), true);
        assert_eq!(machine.state(), KeyState::Pressed);
        machine.step(start.wrapping_add(100), false);
        assert_eq!(machine.state(), KeyState::MultiPressed);
        machine.step(start.wrapping_add(400), false);
        assert_eq!(machine.pending(), Some(KeyEvent::Click));
    }

    #[test]
    fn test_reset() {
        let mut machine = released_machine(KeyTiming::new());
        machine.step(100, true);
        machine.step(150, false);
        assert_eq!(machine.click_count(), 1);

        machine.reset();
        assert_eq!(machine.state(), KeyState::Init);
        assert_eq!(machine.click_count(), 0);
        assert_eq!(machine.pending(), None);
    }

    #[test]
    fn test_repeat_gate() {
        let mut gate = RepeatGate::new(50);
        assert!(gate.try_fire(1000));
        assert!(!gate.try_fire(1010));
        assert!(!gate.try_fire(1049));
        assert!(gate.try_fire(1050));
        assert!(!gate.try_fire(1060));
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<KeyEvent>>,
    }

    impl KeyHandler for Recorder {
        fn on_key_event(
            &self,
            _source: KeySource,
            event: KeyEvent,
        ) {
            self.events.borrow_mut().push(event);
        }
    }

    #[test]
    fn test_dispatch_clears_pending() {
        let recorder = Recorder::default();
        let mut read = || false;
        let mut key = Key::new(KeyId(0), "K", &mut read, KeyTiming::new());
        key.set_handler(KeyEvent::Click, &recorder);
        key.machine_mut().pending = Some(KeyEvent::Click);

        let mut gate = RepeatGate::new(50);
        assert!(key.dispatch(0, &mut gate));
        assert_eq!(*recorder.events.borrow(), [KeyEvent::Click]);
        assert_eq!(key.pending(), None);
    }

    #[test]
    fn test_dispatch_without_handler_drops_event() {
        let mut read = || false;
        let mut key = Key::new(KeyId(0), "K", &mut read, KeyTiming::new());
        key.machine_mut().pending = Some(KeyEvent::LongPress);

        let mut gate = RepeatGate::new(50);
        assert!(key.dispatch(0, &mut gate));
        assert_eq!(key.pending(), None);
    }

    #[test]
    fn test_dispatch_keeps_continuous_pending() {
        let recorder = Recorder::default();
        let mut read = || true;
        let mut key = Key::new(KeyId(0), "K", &mut read, KeyTiming::new());
        key.set_handler(KeyEvent::ContinuousPress, &recorder);
        key.machine_mut().pending = Some(KeyEvent::ContinuousPress);

        let mut gate = RepeatGate::new(50);
        key.dispatch(2000, &mut gate);
        key.dispatch(2010, &mut gate);
        key.dispatch(2050, &mut gate);
        assert_eq!(recorder.events.borrow().len(), 2);
        assert_eq!(key.pending(), Some(KeyEvent::ContinuousPress));
    }

    #[test]
    fn test_cleared_handler_not_called() {
        let recorder = Recorder::default();
        let mut read = || false;
        let mut key = Key::new(KeyId(0), "K", &mut read, KeyTiming::new());
        key.set_handler(KeyEvent::Click, &recorder);
        key.clear_handler(KeyEvent::Click);
        assert!(!key.handled().contains(KeyEvent::Click));

        key.machine_mut().pending = Some(KeyEvent::Click);
        key.dispatch(0, &mut RepeatGate::new(50));
        assert!(recorder.events.borrow().is_empty());
        assert_eq!(key.pending(), None);
    }
}
