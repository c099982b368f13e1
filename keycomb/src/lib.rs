//! Debounced key gestures and PIN-style patterns from 1 to 8 momentary keys.
//!
//! Each key sits on its own input pin and owns one bit of the key code. A [Keyboard]
//! is polled from the host's control loop; it never blocks and never allocates.

pub mod classifier;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod input;
pub mod keyboard;
pub mod keymap;
pub mod pattern;

pub use classifier::PressEvent;
pub use clock::{ClockSource, ManualClock, MonotonicClock};
pub use config::KbdConfig;
pub use error::{KbdError, KbdResult};
pub use input::{GpioPinReader, LevelTable, PinReader};
pub use keyboard::{KbdEvent, Keyboard};
pub use keymap::{KeyMap, MAX_KEYS};
pub use pattern::{PatternEvent, PatternState, PATTERN_CAPACITY};
