//! Negotiation with the turnout allocator sharing the store
//!
//! The turnout region grows upward from address 0 while sensor slots grow
//! downward from the top. Before the sensor region extends past its current
//! floor, the allocator asks a [`RegionGuard`] whether there is room.

use crate::store::Address;

/// Capability answering whether the sensor region may grow downward.
pub trait RegionGuard {
    /// `sensor_floor` is the address of the current end marker. Growing by
    /// `size` bytes moves the end marker to `sensor_floor - size`.
    fn room_available(&self, sensor_floor: Address, size: usize) -> bool;
}

impl<F> RegionGuard for F
where
    F: Fn(Address, usize) -> bool,
{
    fn room_available(&self, sensor_floor: Address, size: usize) -> bool {
        self(sensor_floor, size)
    }
}

/// Turnout region of fixed extent: addresses `0..end` belong to turnouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnoutFloor {
    pub end: Address,
}

impl TurnoutFloor {
    pub const fn new(end: Address) -> Self {
        Self { end }
    }
}

impl RegionGuard for TurnoutFloor {
    fn room_available(&self, sensor_floor: Address, size: usize) -> bool {
        sensor_floor
            .checked_sub(size)
            .is_some_and(|new_floor| new_floor >= self.end)
    }
}

/// No turnout region; the sensor region may use the whole store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl RegionGuard for Unbounded {
    fn room_available(&self, sensor_floor: Address, size: usize) -> bool {
        sensor_floor >= size
    }
}
