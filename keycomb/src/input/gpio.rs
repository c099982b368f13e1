use std::fmt::{Debug, Formatter};
use keycomb_gpio::{GpioError, GpioInput, GpioResult};
use crate::input::PinReader;

/// The `GpioPinReader` struct serves pin levels from GPIO inputs, one per key pin.
pub struct GpioPinReader<'a> {
    inputs: Vec<(u8, Box<dyn GpioInput + 'a>)>,
}

impl Debug for GpioPinReader<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioPinReader(")?;
        for (i, (pin, input)) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", pin, input)?;
        }
        write!(f, ")")
    }
}

impl<'a> GpioPinReader<'a> {
    /// Creates a new `GpioPinReader` from `(pin, input)` pairs.
    ///
    /// The inputs should report the raw electrical level; the keyboard applies the active level itself.
    pub fn new(inputs: Vec<(u8, Box<dyn GpioInput + 'a>)>) -> Self {
        GpioPinReader { inputs }
    }
}

impl PinReader for GpioPinReader<'_> {
    fn read_pin(&self, pin: u8) -> GpioResult<bool> {
        self.inputs
            .iter()
            .find(|(p, _)| *p == pin)
            .ok_or(GpioError::InvalidArgument)?
            .1
            .read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct FakeInput(Cell<bool>);

    impl GpioInput for FakeInput {
        fn read(&self) -> GpioResult<bool> {
            Ok(self.0.get())
        }
    }

    #[test]
    fn reads_the_matching_input() {
        let high: Box<dyn GpioInput> = Box::new(FakeInput(Cell::new(true)));
        let low: Box<dyn GpioInput> = Box::new(FakeInput(Cell::new(false)));
        let reader = GpioPinReader::new(vec![(4, high), (36, low)]);
        assert_eq!(reader.read_pin(4), Ok(true));
        assert_eq!(reader.read_pin(36), Ok(false));
        assert_eq!(reader.read_pin(5), Err(GpioError::InvalidArgument));
    }
}
