//! Slot allocation in the sensor region of the persistent store
//!
//! Slots are stacked downward from the top of the store. The region is
//! terminated by an end marker slot whose address is the *boundary*; free
//! holes above the boundary are reused before the region grows.

use log::debug;

use crate::codec::{SUB_MATCH_MASK, SlotBytes};
use crate::error::{Result, SensorError};
use crate::region::RegionGuard;
use crate::store::{Address, ByteStore, END_MARKER, FREE_SLOT, SLOT_SIZE};

/// Allocator state: the cached end-of-region boundary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotAllocator {
    boundary: Option<Address>,
}

impl SlotAllocator {
    pub const fn new() -> Self {
        Self { boundary: None }
    }

    /// Address of the end marker, once known
    pub fn boundary(&self) -> Option<Address> {
        self.boundary
    }

    /// Forget the cached boundary, e.g. after the store was rewritten externally
    pub fn reset(&mut self) {
        self.boundary = None;
    }

    /// Write an empty sensor region: a single end marker in the top slot.
    pub fn format<S: ByteStore>(&mut self, store: &mut S) -> Result<Address> {
        let top = store
            .top_slot()
            .ok_or(SensorError::StoreExhausted { boundary: 0 })?;
        store.write(top, END_MARKER);
        self.boundary = Some(top);
        debug!(" Formatted sensor region, end marker at {}", top);
        Ok(top)
    }

    /// Find the slot holding `sub_address`.
    ///
    /// Returns `None` when the scan reaches the end marker (whose address is
    /// cached as the boundary if it was not known yet) or the bottom of an
    /// unformatted store.
    pub fn locate_slot<S: ByteStore>(&mut self, store: &S, sub_address: u8) -> Option<Address> {
        let mut address = store.top_slot()?;
        loop {
            let first = store.read(address);
            if first == END_MARKER {
                if self.boundary.is_none() {
                    self.boundary = Some(address);
                }
                return None;
            }
            if first & SUB_MATCH_MASK == sub_address & SUB_MATCH_MASK {
                return Some(address);
            }
            address = address.checked_sub(SLOT_SIZE)?;
        }
    }

    /// The boundary, scanning for the end marker if it is not cached.
    pub fn discover_boundary<S: ByteStore>(&mut self, store: &S) -> Result<Address> {
        if let Some(boundary) = self.boundary {
            return Ok(boundary);
        }
        let mut address = store.top_slot().ok_or(SensorError::Unformatted)?;
        while store.read(address) != END_MARKER {
            address = address
                .checked_sub(SLOT_SIZE)
                .ok_or(SensorError::Unformatted)?;
        }
        self.boundary = Some(address);
        Ok(address)
    }

    /// First reusable slot from the top, or the boundary slot if the region
    /// may grow by one slot without reaching the turnout region.
    pub fn locate_free_slot<S, G>(&mut self, store: &S, guard: &G) -> Result<Address>
    where
        S: ByteStore,
        G: RegionGuard + ?Sized,
    {
        let boundary = self.discover_boundary(store)?;
        let mut address = store.top_slot().ok_or(SensorError::Unformatted)?;

        while address > boundary {
            let first = store.read(address);
            if first == END_MARKER || first == FREE_SLOT {
                return Ok(address);
            }
            address -= SLOT_SIZE;
        }

        // Using the boundary slot pushes the end marker one slot down
        if boundary >= SLOT_SIZE && guard.room_available(boundary, SLOT_SIZE) {
            Ok(boundary)
        } else {
            Err(SensorError::StoreExhausted { boundary })
        }
    }

    /// Write a slot, moving the end marker down when the boundary slot is used.
    pub fn commit<S: ByteStore>(
        &mut self,
        store: &mut S,
        address: Address,
        bytes: SlotBytes,
    ) -> Result<()> {
        let boundary = self.discover_boundary(store)?;
        if address <= boundary {
            let new_boundary = address
                .checked_sub(SLOT_SIZE)
                .ok_or(SensorError::StoreExhausted { boundary })?;
            store.write(new_boundary, END_MARKER);
            self.boundary = Some(new_boundary);
        }

        // The slot becomes live when byte 0 is written, so it goes last
        store.write(address + 1, bytes[1]);
        store.write(address, bytes[0]);
        debug!(
            " Committed slot {} = [{:#04x}, {:#04x}], boundary {:?}",
            address, bytes[0], bytes[1], self.boundary
        );
        Ok(())
    }

    /// Give a slot back.
    ///
    /// The lowest occupied slot becomes the new end marker, together with any
    /// free holes directly above it; any other slot is marked free.
    pub fn release<S: ByteStore>(&mut self, store: &mut S, address: Address) -> Result<()> {
        let boundary = self.discover_boundary(store)?;
        if address != boundary + SLOT_SIZE {
            store.write(address, FREE_SLOT);
            debug!(" Released slot {} as free hole", address);
            return Ok(());
        }

        store.write(address, END_MARKER);
        let mut boundary = address;
        let top = store.top_slot().unwrap_or(boundary);
        while boundary < top && store.read(boundary + SLOT_SIZE) == FREE_SLOT {
            boundary += SLOT_SIZE;
            store.write(boundary, END_MARKER);
        }
        self.boundary = Some(boundary);
        debug!(" Released slot {}, region shrunk to {}", address, boundary);
        Ok(())
    }

    /// Occupied slots from the top down to the boundary.
    pub fn occupied<'a, S: ByteStore>(&mut self, store: &'a S) -> Result<OccupiedSlots<'a, S>> {
        let boundary = self.discover_boundary(store)?;
        Ok(OccupiedSlots {
            store,
            next: store.top_slot(),
            boundary,
        })
    }
}

/// Iterator over `(address, bytes)` of occupied slots, skipping free holes.
pub struct OccupiedSlots<'a, S> {
    store: &'a S,
    next: Option<Address>,
    boundary: Address,
}

impl<S: ByteStore> Iterator for OccupiedSlots<'_, S> {
    type Item = (Address, SlotBytes);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(address) = self.next.filter(|&a| a > self.boundary) {
            self.next = address.checked_sub(SLOT_SIZE);
            let first = self.store.read(address);
            if first != FREE_SLOT && first != END_MARKER {
                return Some((address, [first, self.store.read(address + 1)]));
            }
        }
        None
    }
}
