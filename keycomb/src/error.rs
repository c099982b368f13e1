use keycomb_gpio::GpioError;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum KbdError {
    #[error("key map allows only 1..=8 keys, got {0}")]
    InvalidKeyCount(usize),
    #[error("duplicate use of key pin {0}")]
    DuplicatePin(u8),
    #[error("pin {0} is not part of the key map")]
    UnknownPin(u8),
    #[error("key code {0:#04x} does not match any configured key")]
    InvalidKeyCode(u8),
    #[error("keyboard is not initialized")]
    NotInitialized,
    #[error(transparent)]
    Gpio(#[from] GpioError),
}

pub type KbdResult<T> = Result<T, KbdError>;
