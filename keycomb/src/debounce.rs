use keycomb_gpio::{GpioActiveLevel, GpioResult};
use crate::input::PinReader;
use crate::keymap::KeyMap;

/// A key code that has not changed for longer than the bounce time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StableSample {
    /// The key code; 0 when no key is pressed.
    pub code: u8,
    /// When the raw key code took this value.
    pub since_ms: u32,
}

/// Reads all key pins into a key code and filters out contact bounce with a timer.
#[derive(Debug, Default)]
pub struct Sampler {
    active_level: GpioActiveLevel,
    last_raw: u8,
    changed_since: u32,
}

impl Sampler {
    pub fn new(active_level: GpioActiveLevel) -> Self {
        Sampler {
            active_level,
            ..Default::default()
        }
    }

    pub fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    /// Reads every pin of `keys` once and returns the key code, bit `i` set for asserted key `i`.
    pub fn read_raw(&self, reader: &impl PinReader, keys: &KeyMap) -> GpioResult<u8> {
        let mut code = 0u8;
        for (i, &pin) in keys.pins().iter().enumerate() {
            if self.active_level.get_state(reader.read_pin(pin)?) {
                code |= 1 << i;
            }
        }
        Ok(code)
    }

    /// Feeds one raw key code.
    ///
    /// Returns the code once it has stayed unchanged for more than `bounce_ms`,
    /// and keeps returning it on every call until the raw code changes again.
    pub fn update(&mut self, raw: u8, now: u32, bounce_ms: u32) -> Option<StableSample> {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.changed_since = now;
        }

        if now.wrapping_sub(self.changed_since) > bounce_ms {
            Some(StableSample {
                code: raw,
                since_ms: self.changed_since,
            })
        } else {
            None
        }
    }

    /// Reads the pins and debounces the result in one go.
    pub fn sample(
        &mut self,
        reader: &impl PinReader,
        keys: &KeyMap,
        now: u32,
        bounce_ms: u32,
    ) -> GpioResult<Option<StableSample>> {
        let raw = self.read_raw(reader, keys)?;
        Ok(self.update(raw, now, bounce_ms))
    }
}
