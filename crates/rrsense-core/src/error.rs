//! Error types for sensor bank operations

use thiserror_no_std::Error;

use crate::store::Address;

/// Result type for sensor bank operations
pub type Result<T> = core::result::Result<T, SensorError>;

/// Errors surfaced by the sensor bank.
///
/// Lookups that simply find nothing are not errors; they return `Option`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Sub-address does not fit in 6 bits
    #[error("Invalid sub-address: {sub_address} (max: 63)")]
    InvalidSubAddress {
        /// The rejected sub-address
        sub_address: u8,
    },

    /// Pin number does not fit in 7 bits
    #[error("Invalid pin: {pin} (max: 127)")]
    InvalidPin {
        /// The rejected pin
        pin: u8,
    },

    /// The configuration would be persisted as an end marker
    #[error("Sub-address {sub_address} cannot be stored as an output")]
    ReservedEncoding {
        /// The rejected sub-address
        sub_address: u8,
    },

    /// No free slot and no room to grow towards the turnout region
    #[error("No room left for a sensor slot (region ends at {boundary})")]
    StoreExhausted {
        /// Current end-of-region boundary
        boundary: Address,
    },

    /// The store holds no end marker, so the sensor region cannot be delimited
    #[error("Persistent store is not formatted")]
    Unformatted,

    /// No sensor is registered under this sub-address
    #[error("Unknown sensor: {sub_address}")]
    UnknownSensor {
        /// The requested sub-address
        sub_address: u8,
    },

    /// The sensor is an input and cannot be driven
    #[error("Sensor {sub_address} is not an output")]
    NotAnOutput {
        /// The requested sub-address
        sub_address: u8,
    },

    /// The pin driver reported a failure
    #[error("Pin {pin} failed: {kind:?}")]
    Pin {
        /// The pin that failed
        pin: u8,
        /// Failure category reported by the driver
        kind: embedded_hal::digital::ErrorKind,
    },
}

impl SensorError {
    /// Wrap a driver failure on `pin`
    pub(crate) fn pin<E: embedded_hal::digital::Error>(pin: u8, error: E) -> Self {
        Self::Pin {
            pin,
            kind: error.kind(),
        }
    }
}
