use heapless::Vec;
use crate::error::{KbdError, KbdResult};

/// Maximum number of keys a single keyboard can decode.
pub const MAX_KEYS: usize = 8;

/// Ordered list of key pins. The key at position `i` owns bit `1 << i` of the key code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyMap {
    pins: Vec<u8, MAX_KEYS>,
}

impl KeyMap {
    /// Creates a key map from 1 to 8 distinct pins, least significant bit first.
    ///
    /// # Errors
    /// - `KbdError::InvalidKeyCount` if `pins` is empty or longer than [MAX_KEYS].
    /// - `KbdError::DuplicatePin` if a pin is listed twice.
    pub fn new(pins: &[u8]) -> KbdResult<Self> {
        if pins.is_empty() || pins.len() > MAX_KEYS {
            return Err(KbdError::InvalidKeyCount(pins.len()));
        }

        let mut map = Vec::new();
        for &pin in pins {
            if map.contains(&pin) {
                return Err(KbdError::DuplicatePin(pin));
            }
            map.push(pin).map_err(|_| KbdError::InvalidKeyCount(pins.len()))?;
        }

        Ok(KeyMap { pins: map })
    }

    pub fn pins(&self) -> &[u8] {
        &self.pins
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Gets the key code reported while only `pin` is pressed, or 0 if `pin` is not mapped.
    pub fn code_for_pin(&self, pin: u8) -> u8 {
        self.pins
            .iter()
            .position(|&p| p == pin)
            .map_or(0, |i| 1 << i)
    }

    /// Gets the bits a key code may use with this map.
    pub fn mask(&self) -> u8 {
        u8::MAX >> (MAX_KEYS - self.len())
    }

    /// Gets how many hex digits one key code takes in a pattern: a nibble covers up to 4 keys.
    pub fn digits_per_code(&self) -> usize {
        if self.len() <= 4 { 1 } else { 2 }
    }
}
