mod gpio;

use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use keycomb_gpio::GpioResult;
pub use gpio::*;

/// The `PinReader` trait is the keyboard's view of its input lines.
pub trait PinReader {
    /// Reads the electrical level of `pin` (`true` is high).
    fn read_pin(&self, pin: u8) -> GpioResult<bool>;
}

impl<R: PinReader + ?Sized> PinReader for &R {
    fn read_pin(&self, pin: u8) -> GpioResult<bool> {
        (**self).read_pin(pin)
    }
}

/// An in-memory pin source holding one level per pin identifier.
///
/// Every pin starts at the idle level given to [LevelTable::new].
pub struct LevelTable {
    levels: [Cell<bool>; 256],
}

impl LevelTable {
    pub fn new(idle_level: bool) -> Self {
        Self {
            levels: std::array::from_fn(|_| Cell::new(idle_level)),
        }
    }

    pub fn set(&self, pin: u8, level: bool) {
        self.levels[pin as usize].set(level);
    }

    pub fn level(&self, pin: u8) -> bool {
        self.levels[pin as usize].get()
    }
}

impl Debug for LevelTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let high = self.levels.iter().filter(|level| level.get()).count();
        write!(f, "LevelTable({} high)", high)
    }
}

impl PinReader for LevelTable {
    fn read_pin(&self, pin: u8) -> GpioResult<bool> {
        Ok(self.level(pin))
    }
}
