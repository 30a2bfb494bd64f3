//! In-memory pins and clock for tests and the simulator

use core::cell::Cell;

use embedded_hal::digital::{self, ErrorKind, ErrorType, PinState};

use crate::hal::{Clock, SensorPins};
use crate::sensor::{MAX_PIN, SensorMode};

const PIN_COUNT: usize = MAX_PIN as usize + 1;

/// Failure injected into [`MockPins`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError(pub u8);

impl digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// 128 simulated lines.
///
/// Levels are set directly by the test; configured modes and driven levels
/// are recorded for inspection. Input pull-ups make an untouched line read high.
#[derive(Debug, Clone)]
pub struct MockPins {
    levels: [PinState; PIN_COUNT],
    modes: [Option<SensorMode>; PIN_COUNT],
    broken: Option<u8>,
}

impl Default for MockPins {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPins {
    pub const fn new() -> Self {
        Self {
            levels: [PinState::Low; PIN_COUNT],
            modes: [None; PIN_COUNT],
            broken: None,
        }
    }

    /// Set the level seen on a line
    pub fn set_level(&mut self, pin: u8, high: bool) {
        if let Some(level) = self.levels.get_mut(usize::from(pin)) {
            *level = PinState::from(high);
        }
    }

    pub fn level(&self, pin: u8) -> Option<PinState> {
        self.levels.get(usize::from(pin)).copied()
    }

    /// Mode the line was last configured for
    pub fn mode(&self, pin: u8) -> Option<SensorMode> {
        self.modes.get(usize::from(pin)).copied().flatten()
    }

    /// Make every access to `pin` fail
    pub fn break_pin(&mut self, pin: u8) {
        self.broken = Some(pin);
    }

    fn check(&self, pin: u8) -> Result<usize, MockPinError> {
        let index = usize::from(pin);
        if self.broken == Some(pin) || index >= PIN_COUNT {
            return Err(MockPinError(pin));
        }
        Ok(index)
    }
}

impl ErrorType for MockPins {
    type Error = MockPinError;
}

impl SensorPins for MockPins {
    fn configure(&mut self, pin: u8, mode: SensorMode) -> Result<(), Self::Error> {
        let index = self.check(pin)?;
        self.modes[index] = Some(mode);
        if mode == SensorMode::InputPullup {
            self.levels[index] = PinState::High;
        }
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<PinState, Self::Error> {
        let index = self.check(pin)?;
        Ok(self.levels[index])
    }

    fn drive(&mut self, pin: u8, state: PinState) -> Result<(), Self::Error> {
        let index = self.check(pin)?;
        self.levels[index] = state;
        Ok(())
    }
}

/// Manually advanced millisecond clock
#[derive(Debug, Default)]
pub struct MockClock {
    now: Cell<u32>,
}

impl MockClock {
    pub const fn new(start: u32) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move time forward, wrapping like a hardware counter
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set(&self, now: u32) {
        self.now.set(now);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

