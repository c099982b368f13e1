//! Pattern (PIN) capture layered on top of the key gestures.
//!
//! After the pattern key has been held within the configured band and released, every
//! following key code is written as hex digits into a bounded buffer, until the pattern
//! key is held again, the buffer is full or the keys stay idle for too long.

use std::fmt::Write;
use heapless::String;
use log::info;

/// Capacity of the pattern buffer, in hex characters.
pub const PATTERN_CAPACITY: usize = 32;

pub type PatternText = String<PATTERN_CAPACITY>;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PatternState {
    /// No pattern session.
    #[default] Idle,
    /// Waiting for the first key of the pattern.
    Started,
    /// Collecting key codes.
    Running,
    /// Finished; the pattern waits to be acknowledged.
    Ready,
}

/// Everything that can move the pattern state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PatternInput {
    /// The pattern key was released after a hold within the band.
    Trigger,
    /// The host asked for a pattern without the hold gesture.
    Start,
    /// Any key code was pressed.
    Press,
    /// A key code other than the trigger was released.
    Release { code: u8 },
    /// The inactivity timeout elapsed.
    Timeout,
}

/// A finished pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatternEvent {
    pub text: PatternText,
}

#[derive(Debug, Default)]
pub struct PatternEngine {
    state: PatternState,
    buffer: PatternText,
    last_activity_ms: u32,
}

impl PatternEngine {
    pub fn state(&self) -> PatternState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Advances the state machine by one input.
    ///
    /// `digits` is the number of hex digits per key code, `max_len` the buffer limit.
    /// Returns the pattern when the input completed the session.
    pub fn step(
        &mut self,
        input: PatternInput,
        now: u32,
        digits: usize,
        max_len: usize,
        report: bool,
    ) -> Option<PatternEvent> {
        use PatternInput::*;
        use PatternState::*;

        match (self.state, input) {
            (Idle, Trigger | Start) => {
                self.buffer.clear();
                self.state = Started;
                self.last_activity_ms = now;
                if report {
                    info!("Pattern mode started.");
                }
                None
            }
            (Started, Press) => {
                self.state = Running;
                self.last_activity_ms = now;
                if report {
                    info!("Pattern mode ready to enter.");
                }
                None
            }
            (Running, Press) => {
                self.last_activity_ms = now;
                None
            }
            (Running, Release { code }) if code != 0 => {
                self.last_activity_ms = now;
                self.append(code, digits, max_len, report);
                if self.buffer.len() + digits > max_len {
                    if report {
                        info!("Pattern full.");
                    }
                    self.complete()
                } else {
                    None
                }
            }
            (Running, Trigger) => {
                if report {
                    info!("Pattern mode ended.");
                }
                self.complete()
            }
            (Started | Running, Timeout) => {
                if report {
                    info!("Pattern timed out.");
                }
                self.complete()
            }
            _ => None,
        }
    }

    /// Checks whether the session has been idle for longer than `timeout_ms`.
    pub fn timed_out(&self, now: u32, timeout_ms: u32) -> bool {
        matches!(self.state, PatternState::Started | PatternState::Running)
            && now.wrapping_sub(self.last_activity_ms) > timeout_ms
    }

    pub fn reset(&mut self) {
        self.state = PatternState::Idle;
        self.buffer.clear();
    }

    fn append(&mut self, code: u8, digits: usize, max_len: usize, report: bool) {
        if self.buffer.len() + digits > max_len {
            return;
        }
        // Capacity is checked above, the writes cannot fail.
        if digits == 1 {
            write!(self.buffer, "{:x}", code & 0xf).ok();
        } else {
            write!(self.buffer, "{:02x}", code).ok();
        }
        if report {
            info!("Pattern key code {} added, pattern is now {:?}.", code, self.buffer.as_str());
        }
    }

    fn complete(&mut self) -> Option<PatternEvent> {
        self.state = PatternState::Ready;
        Some(PatternEvent {
            text: self.buffer.clone(),
        })
    }
}
