//! The module for the demo app state and logic.

use std::time::Duration;
use log::info;
use keycomb::{ClockSource, KbdEvent, KbdResult, Keyboard, PinReader};
use crate::config::Config;

/// The main app state struct.
pub struct App {
    /// The configuration for the app.
    config: Config,
    /// The current state of the app.
    state: AppState,
    /// Pattern timeout of the keyboard, kept aside while the password prompt uses its own.
    saved_pattern_timeout: Option<Duration>,
}

/// The states of the app.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AppState {
    /// The app has just started.
    Starting,
    /// Waiting for the password, `attempt` wrong entries so far.
    Password { attempt: u8 },
    /// Reporting key events; `advanced` adds hex and binary key codes.
    Running { advanced: bool },
}

impl App {
    /// Creates a new instance of the App.
    pub fn new(config: Config) -> App {
        App {
            config,
            state: AppState::Starting,
            saved_pattern_timeout: None,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Handles the keyboard event, if any. Call after every poll.
    pub fn update<R: PinReader, C: ClockSource>(&mut self, kbd: &mut Keyboard<R, C>) -> KbdResult<()> {
        match self.state {
            AppState::Starting => {
                if self.config.password.is_some() {
                    self.prompt(kbd, 0)?;
                } else {
                    info!("No password configured.");
                    self.state = AppState::Running { advanced: true };
                }
            }
            AppState::Password { attempt } => {
                let entered = match kbd.event() {
                    None => return Ok(()),
                    Some(KbdEvent::Pattern(pattern)) => Some(pattern.text.to_string()),
                    Some(KbdEvent::Press(_)) => None,
                };
                kbd.acknowledge();
                let Some(entered) = entered else {
                    // A key event from before the prompt; acknowledging it ended the prompt.
                    kbd.start_pattern()?;
                    return Ok(());
                };

                let matched = self.config.password.as_deref() == Some(entered.as_str());
                info!(
                    "Password '{}' entered is {}",
                    entered,
                    if matched { "correct!" } else { "wrong!" }
                );

                let attempt = attempt + 1;
                if matched || attempt >= self.config.password_tries {
                    self.finish_prompt(kbd, matched);
                } else {
                    self.prompt(kbd, attempt)?;
                }
            }
            AppState::Running { advanced } => {
                if let Some(event) = kbd.event() {
                    info!("-> {}", describe(event, advanced));
                    kbd.acknowledge();
                }
            }
        }
        Ok(())
    }

    fn prompt<R: PinReader, C: ClockSource>(&mut self, kbd: &mut Keyboard<R, C>, attempt: u8) -> KbdResult<()> {
        if self.saved_pattern_timeout.is_none() {
            self.saved_pattern_timeout = Some(kbd.config().pattern_timeout);
            kbd.config_mut().pattern_timeout = Duration::from_millis(self.config.password_timeout_ms);
        }

        let band = kbd.config().pattern_hold_band();
        info!(
            "Enter the password (hold the pattern key between {:.1} and {:.1} s or wait {:.1} s when done).",
            *band.start() as f32 / 1000.0,
            *band.end() as f32 / 1000.0,
            self.config.password_timeout_ms as f32 / 1000.0,
        );
        kbd.start_pattern()?;
        self.state = AppState::Password { attempt };
        Ok(())
    }

    fn finish_prompt<R: PinReader, C: ClockSource>(&mut self, kbd: &mut Keyboard<R, C>, matched: bool) {
        if let Some(timeout) = self.saved_pattern_timeout.take() {
            kbd.config_mut().pattern_timeout = timeout;
        }
        info!(
            "{} you entered the {} password!",
            if matched { "Thanks," } else { "Sorry," },
            if matched { "correct" } else { "wrong" }
        );
        self.state = AppState::Running { advanced: matched };
    }
}

/// Renders an event the way the app logs it.
pub fn describe(event: &KbdEvent, advanced: bool) -> String {
    match event {
        KbdEvent::Pattern(pattern) => format!("handle Kbd Pattern {}", pattern.text),
        KbdEvent::Press(press) => {
            let code = if advanced {
                format!("{} {:#x} {:#b}", press.key_code, press.key_code, press.key_code)
            } else {
                press.key_code.to_string()
            };
            if press.repeat_count > 0 {
                format!(
                    "handle Kbd KeyCode {} pressed {} times within {} ms",
                    code,
                    press.repeat_count as u32 + 1,
                    press.duration_ms
                )
            } else {
                format!("handle Kbd KeyCode {} duration {} ms", code, press.duration_ms)
            }
        }
    }
}
