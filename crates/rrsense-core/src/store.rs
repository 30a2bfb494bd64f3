//! Byte-addressable persistent store
//!
//! The sensor region lives at the top of the store and is made of fixed-size
//! slots stacked downward. The turnout region grows up from address 0.

/// Byte address inside the persistent store
pub type Address = usize;

/// Size of one sensor slot in bytes
pub const SLOT_SIZE: usize = 2;

/// First byte of the slot just below the lowest occupied sensor slot
pub const END_MARKER: u8 = 0x00;

/// First byte of a released slot that may be reused.
///
/// Also the erased state of EEPROM cells. Never produced by slot encoding,
/// whose first byte is either `0b00xx_xxxx` or `0b10xx_xxxx`.
pub const FREE_SLOT: u8 = 0xFF;

/// Synchronous, byte-atomic persistent memory (EEPROM or an emulation of it).
pub trait ByteStore {
    /// Total number of bytes
    fn len(&self) -> usize;

    /// Returns true if the store holds no bytes at all
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the byte at `address`
    fn read(&self, address: Address) -> u8;

    /// Write the byte at `address`
    fn write(&mut self, address: Address, value: u8);

    /// Write the byte only if it differs, sparing a write cycle
    fn update(&mut self, address: Address, value: u8) {
        if self.read(address) != value {
            self.write(address, value);
        }
    }

    /// Address of the topmost sensor slot, if the store can hold one
    fn top_slot(&self) -> Option<Address> {
        self.len().checked_sub(SLOT_SIZE)
    }
}

/// Persistent store backed by a RAM buffer.
///
/// Works for `[u8; N]` on target and for `Vec<u8>` images on the host.
/// Out-of-range reads return [`FREE_SLOT`] and out-of-range writes are dropped.
#[derive(Debug, Clone)]
pub struct RamStore<B> {
    bytes: B,
    writes: usize,
}

impl<B> RamStore<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    pub const fn new(bytes: B) -> Self {
        Self { bytes, writes: 0 }
    }

    /// Raw contents, for saving an image
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    /// Number of byte writes issued so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn into_inner(self) -> B {
        self.bytes
    }
}

impl<const N: usize> RamStore<[u8; N]> {
    /// An erased store (every cell reads `0xFF`)
    pub const fn erased() -> Self {
        Self::new([FREE_SLOT; N])
    }
}

impl<B> ByteStore for RamStore<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    fn len(&self) -> usize {
        self.bytes.as_ref().len()
    }

    fn read(&self, address: Address) -> u8 {
        self.bytes
            .as_ref()
            .get(address)
            .copied()
            .unwrap_or(FREE_SLOT)
    }

    fn write(&mut self, address: Address, value: u8) {
        if let Some(cell) = self.bytes.as_mut().get_mut(address) {
            *cell = value;
            self.writes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erased_store_reads_free() {
        let store = RamStore::<[u8; 8]>::erased();
        assert_eq!(store.len(), 8);
        assert!((0..8).all(|a| store.read(a) == FREE_SLOT));
        assert_eq!(store.top_slot(), Some(6));
    }

    #[test]
    fn test_update_skips_identical_bytes() {
        let mut store = RamStore::new([0u8; 4]);
        store.update(1, 0);
        assert_eq!(store.write_count(), 0);
        store.update(1, 7);
        assert_eq!(store.read(1), 7);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut store = RamStore::new([0u8; 2]);
        store.write(5, 1);
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.read(5), FREE_SLOT);
        assert_eq!(RamStore::new([0u8; 1]).top_slot(), None);
    }
}
