//! In-memory sensor records

use core::fmt;
use core::str::FromStr;

/// Largest sub-address (6 bits)
pub const MAX_SUB_ADDRESS: u8 = 0x3F;

/// Largest pin number (7 bits)
pub const MAX_PIN: u8 = 0x7F;

/// Number of distinct sub-addresses, hence the registry capacity
pub const MAX_SENSORS: usize = MAX_SUB_ADDRESS as usize + 1;

/// How the line behind a sensor is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorMode {
    /// Polled input, floating
    Input,
    /// Polled input with the internal pull-up enabled
    InputPullup,
    /// Line driven as an actuator; never polled
    Output,
}

impl SensorMode {
    /// Every mode, in command-letter order `I`, `P`, `O`
    pub const ALL: [Self; 3] = [Self::Input, Self::InputPullup, Self::Output];

    /// Inputs are the lines the debounce engine samples
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Input | Self::InputPullup)
    }

    pub const fn pullup(self) -> bool {
        matches!(self, Self::InputPullup)
    }

    /// Mode letter used by the `<AS ...>` command
    pub const fn as_char(self) -> char {
        match self {
            Self::Input => 'I',
            Self::InputPullup => 'P',
            Self::Output => 'O',
        }
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Error returned when a mode letter is not one of `I`, `O`, `P`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMode;

impl FromStr for SensorMode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" | "i" => Ok(Self::Input),
            "P" | "p" => Ok(Self::InputPullup),
            "O" | "o" => Ok(Self::Output),
            _ => Err(InvalidMode),
        }
    }
}

/// Runtime flags of a sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorStatus {
    /// In-memory configuration matches the persisted slot
    pub synced: bool,
    /// Last sampled level
    pub raw_level: bool,
    /// Last validated (debounced) value
    pub stable_value: bool,
    /// A validated transition has not been consumed yet
    pub pending_change: bool,
}

/// One configured sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    pub sub_address: u8,
    pub pin: u8,
    pub mode: SensorMode,
    pub status: SensorStatus,
    /// Time of the last raw transition still awaiting validation
    pub last_change: Option<u32>,
}

impl SensorConfig {
    /// A fresh record, not yet persisted
    pub const fn new(sub_address: u8, pin: u8, mode: SensorMode) -> Self {
        Self {
            sub_address,
            pin,
            mode,
            status: SensorStatus {
                synced: false,
                raw_level: false,
                stable_value: false,
                pending_change: false,
            },
            last_change: None,
        }
    }

    /// Debounce state, derived from the status flags and timestamp
    pub fn state(&self) -> DebounceState {
        match (self.last_change, self.status.pending_change) {
            (Some(_), _) => DebounceState::Settling,
            (None, false) => DebounceState::StableClean,
            (None, true) => DebounceState::StablePending,
        }
    }
}

/// Debounce state of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// A raw transition is waiting for the debounce interval to elapse
    Settling,
    /// Validated, nothing waiting for the reporting layer
    StableClean,
    /// Validated change waiting for the reporting layer
    StablePending,
}

/// A validated change handed to the reporting layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorEvent {
    pub sub_address: u8,
    pub value: bool,
}
