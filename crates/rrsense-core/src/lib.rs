//! Hardware-independent core of rrsense
//!
//! Binary sensors of a model-railway accessory controller: their
//! configuration is kept in slots at the top of the EEPROM shared with the
//! turnout configuration, and their lines are polled and debounced into
//! change notifications for the command layer.
//!
//! It is `#![no_std]` so it compiles on the controller and on desktop hosts
//! (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod allocator;
pub mod bank;
pub mod codec;
pub mod debounce;
pub mod error;
pub mod hal;
pub mod region;
pub mod registry;
pub mod sensor;
pub mod settings;
pub mod store;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use bank::{SensorBank, SensorEvents};
pub use error::{Result, SensorError};
pub use hal::{Clock, SensorPins};
pub use region::{RegionGuard, TurnoutFloor, Unbounded};
pub use sensor::{SensorConfig, SensorEvent, SensorMode};
pub use settings::BankSettings;
pub use store::{Address, ByteStore, RamStore};
