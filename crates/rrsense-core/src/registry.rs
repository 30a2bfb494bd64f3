//! Ordered registry of live sensors

use heapless::Vec;

use crate::sensor::{MAX_SENSORS, SensorConfig};

/// Sensors kept in strictly ascending sub-address order.
///
/// Capacity covers every 6-bit sub-address, so an insert only fails on a
/// duplicate key.
#[derive(Debug, Default)]
pub struct SensorRegistry {
    sensors: Vec<SensorConfig, MAX_SENSORS>,
}

impl SensorRegistry {
    pub const fn new() -> Self {
        Self {
            sensors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Last sensor whose sub-address is strictly below `sub_address`
    pub fn find_before(&self, sub_address: u8) -> Option<&SensorConfig> {
        match self.insertion_index(sub_address) {
            0 => None,
            index => self.sensors.get(index - 1),
        }
    }

    pub fn find(&self, sub_address: u8) -> Option<&SensorConfig> {
        self.position(sub_address).map(|i| &self.sensors[i])
    }

    pub fn find_mut(&mut self, sub_address: u8) -> Option<&mut SensorConfig> {
        self.position(sub_address)
            .map(move |index| &mut self.sensors[index])
    }

    /// Insert a new sensor at its ordered position.
    ///
    /// Hands the record back if the sub-address is already registered.
    pub fn insert(&mut self, sensor: SensorConfig) -> Result<(), SensorConfig> {
        if self.position(sensor.sub_address).is_some() {
            return Err(sensor);
        }
        let index = self.insertion_index(sensor.sub_address);
        self.sensors.insert(index, sensor)
    }

    pub fn remove(&mut self, sub_address: u8) -> Option<SensorConfig> {
        self.position(sub_address)
            .map(|index| self.sensors.remove(index))
    }

    pub fn clear(&mut self) {
        self.sensors.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorConfig> {
        self.sensors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SensorConfig> {
        self.sensors.iter_mut()
    }

    fn insertion_index(&self, sub_address: u8) -> usize {
        self.sensors
            .partition_point(|sensor| sensor.sub_address < sub_address)
    }

    fn position(&self, sub_address: u8) -> Option<usize> {
        self.sensors
            .binary_search_by_key(&sub_address, |sensor| sensor.sub_address)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorMode;

    fn registry_with(subs: &[u8]) -> SensorRegistry {
        let mut registry = SensorRegistry::new();
        for &sub in subs {
            registry
                .insert(SensorConfig::new(sub, sub, SensorMode::Input))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_insert_keeps_ascending_order() {
        let registry = registry_with(&[40, 3, 17, 0, 63, 22]);
        let order: std::vec::Vec<u8> = registry.iter().map(|s| s.sub_address).collect();
        assert_eq!(order, [0, 3, 17, 22, 40, 63]);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = registry_with(&[5]);
        let duplicate = SensorConfig::new(5, 9, SensorMode::Output);
        assert_eq!(registry.insert(duplicate), Err(duplicate));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find(5).unwrap().pin, 5);
    }

    #[test]
    fn test_find_before() {
        let registry = registry_with(&[4, 10, 20]);
        assert!(registry.find_before(4).is_none());
        assert!(registry.find_before(0).is_none());
        assert_eq!(registry.find_before(5).unwrap().sub_address, 4);
        assert_eq!(registry.find_before(20).unwrap().sub_address, 10);
        assert_eq!(registry.find_before(63).unwrap().sub_address, 20);
        assert!(SensorRegistry::new().find_before(10).is_none());
    }

    #[test]
    fn test_find_exact() {
        let mut registry = registry_with(&[4, 10, 20]);
        assert!(registry.find(11).is_none());
        assert!(registry.find(3).is_none());
        registry.find_mut(10).unwrap().pin = 99;
        assert_eq!(registry.find(10).unwrap().pin, 99);
    }

    #[test]
    fn test_remove() {
        let mut registry = registry_with(&[1, 2, 3]);
        assert_eq!(registry.remove(2).map(|s| s.sub_address), Some(2));
        assert!(registry.remove(2).is_none());
        let order: std::vec::Vec<u8> = registry.iter().map(|s| s.sub_address).collect();
        assert_eq!(order, [1, 3]);
    }
}
