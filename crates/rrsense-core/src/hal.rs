//! Hardware seams: sensor lines and the millisecond clock

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, PinState};

use crate::sensor::SensorMode;

/// Access to the controller's lines by pin number.
pub trait SensorPins: ErrorType {
    /// Set the line up for `mode` (input, input with pull-up, output)
    fn configure(&mut self, pin: u8, mode: SensorMode) -> Result<(), Self::Error>;

    /// Sample the level of an input line
    fn read(&mut self, pin: u8) -> Result<PinState, Self::Error>;

    /// Drive an output line
    fn drive(&mut self, pin: u8, state: PinState) -> Result<(), Self::Error>;
}

/// Monotonic millisecond counter that wraps around at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<F> Clock for F
where
    F: Fn() -> u32,
{
    fn now_ms(&self) -> u32 {
        self()
    }
}

/// Errors of [`InputPinBank`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinBankError<E> {
    /// No line behind this pin number
    Missing(u8),
    /// The bank only holds inputs
    Unsupported(u8),
    /// The underlying pin failed
    Pin(E),
}

impl<E: digital::Error> digital::Error for PinBankError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Missing(_) | Self::Unsupported(_) => ErrorKind::Other,
            Self::Pin(e) => e.kind(),
        }
    }
}

/// Input-only bank over HAL pins, indexed by pin number.
///
/// Pull-ups are chosen when the HAL pins are created, so `configure` only
/// rejects output modes.
pub struct InputPinBank<P, const N: usize> {
    pins: [P; N],
}

impl<P: InputPin, const N: usize> InputPinBank<P, N> {
    pub const fn new(pins: [P; N]) -> Self {
        Self { pins }
    }

    fn pin(&mut self, pin: u8) -> Result<&mut P, PinBankError<P::Error>> {
        self.pins
            .get_mut(usize::from(pin))
            .ok_or(PinBankError::Missing(pin))
    }
}

impl<P: InputPin, const N: usize> ErrorType for InputPinBank<P, N> {
    type Error = PinBankError<P::Error>;
}

impl<P: InputPin, const N: usize> SensorPins for InputPinBank<P, N> {
    fn configure(&mut self, pin: u8, mode: SensorMode) -> Result<(), Self::Error> {
        self.pin(pin)?;
        if mode.is_input() {
            Ok(())
        } else {
            Err(PinBankError::Unsupported(pin))
        }
    }

    fn read(&mut self, pin: u8) -> Result<PinState, Self::Error> {
        let high = self.pin(pin)?.is_high().map_err(PinBankError::Pin)?;
        Ok(PinState::from(high))
    }

    fn drive(&mut self, pin: u8, _state: PinState) -> Result<(), Self::Error> {
        Err(PinBankError::Unsupported(pin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct FixedPin(bool);

    impl ErrorType for FixedPin {
        type Error = Infallible;
    }

    impl InputPin for FixedPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    #[test]
    fn test_input_pin_bank() {
        let mut bank = InputPinBank::new([FixedPin(false), FixedPin(true)]);
        assert_eq!(bank.read(0), Ok(PinState::Low));
        assert_eq!(bank.read(1), Ok(PinState::High));
        assert_eq!(bank.read(2), Err(PinBankError::Missing(2)));
        assert!(bank.configure(1, SensorMode::InputPullup).is_ok());
        assert_eq!(
            bank.configure(1, SensorMode::Output),
            Err(PinBankError::Unsupported(1))
        );
        assert!(bank.drive(0, PinState::High).is_err());
    }

    #[test]
    fn test_closure_clock() {
        let clock = || 1234u32;
        assert_eq!(clock.now_ms(), 1234);
    }
}
