use crate::debounce::StableSample;

/// A finished key gesture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PressEvent {
    pub key_code: u8,
    /// Time from the first press to the last release of the gesture.
    pub duration_ms: u32,
    /// Presses beyond the first one; 0 for a single press.
    pub repeat_count: u8,
}

/// A press or release of the stable key code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyEdge {
    Pressed { code: u8 },
    Released { code: u8, held_ms: u32 },
}

/// Tracks one key gesture: its code, how long it lasted and how often it was repeated.
#[derive(Debug, Default)]
pub struct Classifier {
    code: u8,
    held: bool,
    first_press_ms: Option<u32>,
    pressed_ms: u32,
    released_ms: Option<u32>,
    duration_ms: u32,
    repeat_count: u8,
    last_report_ms: u32,
}

impl Classifier {
    /// Feeds a stable sample and reports the edge it caused, if any.
    pub fn update(&mut self, sample: StableSample, now: u32) -> Option<KeyEdge> {
        if sample.code == 0 {
            if !self.held {
                return None;
            }
            self.held = false;
            self.released_ms = Some(sample.since_ms);
            let first_press = self.first_press_ms.unwrap_or(self.pressed_ms);
            self.duration_ms = sample.since_ms.wrapping_sub(first_press);
            return Some(KeyEdge::Released {
                code: self.code,
                held_ms: sample.since_ms.wrapping_sub(self.pressed_ms),
            });
        }

        let edge = if sample.code != self.code || self.first_press_ms.is_none() {
            self.start_gesture(sample);
            Some(KeyEdge::Pressed { code: sample.code })
        } else if !self.held {
            // Same code again before the gesture was closed.
            self.released_ms = None;
            self.pressed_ms = sample.since_ms;
            self.repeat_count = self.repeat_count.saturating_add(1);
            Some(KeyEdge::Pressed { code: sample.code })
        } else {
            None
        };

        self.held = true;
        if let Some(first_press) = self.first_press_ms {
            self.duration_ms = now.wrapping_sub(first_press);
        }
        edge
    }

    fn start_gesture(&mut self, sample: StableSample) {
        *self = Classifier {
            code: sample.code,
            first_press_ms: Some(sample.since_ms),
            pressed_ms: sample.since_ms,
            last_report_ms: self.last_report_ms,
            ..Default::default()
        };
    }

    /// Closes the gesture once the keys have stayed released for longer than `double_click_ms`.
    pub fn take_completed(&mut self, now: u32, double_click_ms: u32) -> Option<PressEvent> {
        let released = self.released_ms?;
        if self.held || now.wrapping_sub(released) <= double_click_ms {
            return None;
        }

        let event = PressEvent {
            key_code: self.code,
            duration_ms: self.duration_ms,
            repeat_count: self.repeat_count,
        };
        self.reset();
        Some(event)
    }

    /// Checks whether a long-press notice is due, at most once per `interval_ms`.
    pub fn long_press_due(&mut self, now: u32, interval_ms: u32) -> bool {
        if !self.held
            || self.repeat_count > 0
            || self.duration_ms <= interval_ms
            || now.wrapping_sub(self.last_report_ms) <= interval_ms
        {
            return false;
        }
        self.last_report_ms = now;
        true
    }

    /// Forgets the current gesture.
    pub fn reset(&mut self) {
        *self = Classifier {
            last_report_ms: self.last_report_ms,
            ..Default::default()
        };
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn repeat_count(&self) -> u8 {
        self.repeat_count
    }
}
