//! Polled key input for embedded targets.
//!
//! Turns raw, bouncing key levels into semantic events and recognizes
//! multi-key combinations:
//!
//! - [`key`]: per-key debounce and click/long-press state machine
//! - [`keypad`]: fixed-capacity key and combo registries, polling driver
//! - [`config`]: default thresholds and per-key timing
//! - [`event`]: key states, event kinds and handler masks
//! - [`handler`]: key/combo handles and event handler traits
//! - [`reader`]: physical level sources (closures, `embedded-hal` pins)
//! - [`error`]: setup errors
//!
//! Nothing allocates and nothing depends on a clock: the caller passes a
//! millisecond tick to [`Keypad::advance`] (or uses [`Keypad::poll`] with the
//! `embassy-time` feature).
//!
//! # Testing
//!
//! Run tests on host with:
//! ```bash
//! cargo test --lib
//! ```
//!
//! Tests run with `std` enabled (via `cfg_attr`), while embedded users get a
//! `no_std` library.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

// Configuration
pub mod config;
pub mod error;

// Events and capabilities
pub mod event;
pub mod handler;
pub mod reader;

// Recognition
mod combo;
pub mod key;
pub mod keypad;

// Re-export commonly used items
pub use config::{KeyTiming, TimingPatch};
pub use error::KeypadError;
pub use event::{EventMask, KeyEvent, KeyState};
pub use handler::{ComboHandler, ComboId, ComboSource, KeyHandler, KeyId, KeySource};
pub use key::KeyMachine;
pub use keypad::{ComboProgress, Keypad};
#[cfg(feature = "embedded-hal")]
pub use reader::{ActiveHigh, ActiveLow};
pub use reader::KeyReader;
