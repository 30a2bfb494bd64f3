//! The sensor bank: persistent configuration plus live debounced state
//!
//! A [`SensorBank`] owns the persistent store, the slot allocator, the
//! ordered registry and the pending-change counter. Every operation goes
//! through it, so several independent banks can live side by side (one per
//! store in tests, for instance).

use embedded_hal::digital::{Error as _, PinState};
use heapless::Vec;
use log::{error, info, warn};

use crate::allocator::SlotAllocator;
use crate::codec::{self, StatusLine};
use crate::debounce::Debouncer;
use crate::error::{Result, SensorError};
use crate::hal::{Clock, SensorPins};
use crate::region::RegionGuard;
use crate::registry::SensorRegistry;
use crate::sensor::{MAX_PIN, MAX_SENSORS, MAX_SUB_ADDRESS, SensorConfig, SensorEvent, SensorMode};
use crate::settings::BankSettings;
use crate::store::{Address, ByteStore};

/// Validated changes collected by [`SensorBank::drain_changes`]
pub type SensorEvents = Vec<SensorEvent, MAX_SENSORS>;

/// Sensors of one accessory controller.
///
/// `S` is the persistent store shared with the turnout configuration, `G`
/// tells whether the sensor region may grow towards the turnout region.
pub struct SensorBank<S, G> {
    store: S,
    guard: G,
    allocator: SlotAllocator,
    registry: SensorRegistry,
    debouncer: Debouncer,
    pending: usize,
}

impl<S, G> SensorBank<S, G>
where
    S: ByteStore,
    G: RegionGuard,
{
    pub fn new(store: S, guard: G, settings: BankSettings) -> Self {
        Self {
            store,
            guard,
            allocator: SlotAllocator::new(),
            registry: SensorRegistry::new(),
            debouncer: Debouncer::new(settings.debounce_ms),
            pending: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn settings(&self) -> BankSettings {
        BankSettings::default()
            .with_debounce_ms(self.debouncer.interval_ms())
    }

    /// End-of-region boundary, once it has been discovered
    pub fn boundary(&self) -> Option<Address> {
        self.allocator.boundary()
    }

    /// Wipe the sensor region and forget every sensor.
    pub fn format_store(&mut self) -> Result<()> {
        self.allocator.format(&mut self.store)?;
        self.registry.clear();
        self.pending = 0;
        info!("Sensor region formatted");
        Ok(())
    }

    /// Rebuild the registry from the persistent store.
    ///
    /// Every sensor comes back settling, so its stored value is checked
    /// against the live line by the next polls. A line that cannot be set up
    /// is logged and its sensor kept.
    pub fn load<P, C>(&mut self, pins: &mut P, clock: &C) -> Result<usize>
    where
        P: SensorPins,
        C: Clock + ?Sized,
    {
        self.registry.clear();
        self.pending = 0;
        self.allocator.reset();

        let now = clock.now_ms();
        for (address, bytes) in self.allocator.occupied(&self.store)? {
            let sensor = codec::decode(bytes, now);
            if let Err(e) = pins.configure(sensor.pin, sensor.mode) {
                error!(
                    "Failed to set up pin {} of sensor {}: {:?}",
                    sensor.pin,
                    sensor.sub_address,
                    e.kind()
                );
            }
            if let Err(duplicate) = self.registry.insert(sensor) {
                warn!(
                    "Ignoring duplicate sensor {} in slot {}",
                    duplicate.sub_address, address
                );
            }
        }

        info!(
            "Loaded {} sensors, region ends at {:?}",
            self.registry.len(),
            self.allocator.boundary()
        );
        Ok(self.registry.len())
    }

    /// Add a sensor, or change the pin and mode of an existing one.
    ///
    /// The line is set up first; the store is only touched once that worked.
    pub fn configure<P, C>(
        &mut self,
        pins: &mut P,
        clock: &C,
        sub_address: u8,
        pin: u8,
        mode: SensorMode,
    ) -> Result<()>
    where
        P: SensorPins,
        C: Clock + ?Sized,
    {
        if sub_address > MAX_SUB_ADDRESS {
            return Err(SensorError::InvalidSubAddress { sub_address });
        }
        if pin > MAX_PIN {
            return Err(SensorError::InvalidPin { pin });
        }
        // Would be persisted as 0x00, the end marker
        if sub_address == 0 && mode == SensorMode::Output {
            return Err(SensorError::ReservedEncoding { sub_address });
        }

        if let Err(e) = pins.configure(pin, mode) {
            return Err(SensorError::pin(pin, e));
        }
        let now = clock.now_ms();

        if self.registry.find(sub_address).is_some() {
            let address = self.allocator.locate_slot(&self.store, sub_address);
            self.patch(sub_address, pin, mode, address);
            if let Some(sensor) = self.registry.find_mut(sub_address) {
                if sensor.pin != pin || sensor.mode != mode {
                    sensor.status.raw_level = false;
                    sensor.last_change = mode.is_input().then_some(now);
                }
                sensor.pin = pin;
                sensor.mode = mode;
                sensor.status.synced = address.is_some();
                info!("Updated sensor {}", codec::format_status(sensor));
            }
            return Ok(());
        }

        let address = self.allocator.locate_free_slot(&self.store, &self.guard)?;
        let mut sensor = SensorConfig::new(sub_address, pin, mode);
        sensor.last_change = mode.is_input().then_some(now);
        self.store_config(address, &mut sensor)?;
        info!(
            "Added sensor {} in slot {}",
            codec::format_status(&sensor),
            address
        );
        if let Err(duplicate) = self.registry.insert(sensor) {
            // Absence was checked above
            warn!("Sensor {} registered twice", duplicate.sub_address);
        }
        Ok(())
    }

    /// Persist `sensor` at `address` and mark it synced.
    pub fn store_config(&mut self, address: Address, sensor: &mut SensorConfig) -> Result<()> {
        self.allocator
            .commit(&mut self.store, address, codec::encode(sensor))?;
        sensor.status.synced = true;
        Ok(())
    }

    /// Rewrite the slot of `sub_address` in place.
    ///
    /// When no address is given it is looked up; if the slot cannot be found
    /// nothing is written and the call only logs a warning.
    pub fn patch(&mut self, sub_address: u8, pin: u8, mode: SensorMode, address: Option<Address>) {
        let lookup = match address {
            Some(address) => Some(address),
            None => self.allocator.locate_slot(&self.store, sub_address),
        };
        let Some(address) = lookup else {
            warn!("No slot found for sensor {}, update dropped", sub_address);
            return;
        };

        let [sub, pin] = codec::encode_fields(sub_address, pin, mode);
        self.store.write(address, sub);
        self.store.update(address + 1, pin);
    }

    /// Forget a sensor and give its slot back.
    pub fn remove(&mut self, sub_address: u8) -> Result<SensorConfig> {
        if self.registry.find(sub_address).is_none() {
            return Err(SensorError::UnknownSensor { sub_address });
        }

        match self.allocator.locate_slot(&self.store, sub_address) {
            Some(address) => self.allocator.release(&mut self.store, address)?,
            None => warn!("Sensor {} had no slot in the store", sub_address),
        }

        let sensor = self
            .registry
            .remove(sub_address)
            .ok_or(SensorError::UnknownSensor { sub_address })?;
        if sensor.status.pending_change {
            self.pending = self.pending.saturating_sub(1);
        }
        info!("Removed sensor {}", sub_address);
        Ok(sensor)
    }

    /// One debounce cycle over every input sensor.
    ///
    /// Returns the number of new pending changes.
    pub fn poll<P, C>(&mut self, pins: &mut P, clock: &C) -> usize
    where
        P: SensorPins,
        C: Clock + ?Sized,
    {
        let raised = self.debouncer.poll(&mut self.registry, pins, clock);
        self.pending += raised;
        raised
    }

    /// Number of validated changes not consumed yet
    pub fn pending_changes(&self) -> usize {
        self.pending
    }

    /// Consume the pending change of one sensor, returning its value.
    pub fn acknowledge(&mut self, sub_address: u8) -> Option<bool> {
        let sensor = self
            .registry
            .find_mut(sub_address)
            .filter(|s| s.status.pending_change)?;
        sensor.status.pending_change = false;
        self.pending = self.pending.saturating_sub(1);
        Some(sensor.status.stable_value)
    }

    /// Consume every pending change, in sub-address order.
    pub fn drain_changes(&mut self) -> SensorEvents {
        let mut events = SensorEvents::new();
        for sensor in self.registry.iter_mut() {
            if !sensor.status.pending_change {
                continue;
            }
            sensor.status.pending_change = false;
            // One sensor per sub-address, so the capacity always suffices
            let _ = events.push(SensorEvent {
                sub_address: sensor.sub_address,
                value: sensor.status.stable_value,
            });
        }
        self.pending = 0;
        events
    }

    /// Drive the line of an output sensor.
    pub fn set_output<P: SensorPins>(
        &mut self,
        pins: &mut P,
        sub_address: u8,
        high: bool,
    ) -> Result<()> {
        let sensor = self
            .registry
            .find_mut(sub_address)
            .ok_or(SensorError::UnknownSensor { sub_address })?;
        if sensor.mode.is_input() {
            return Err(SensorError::NotAnOutput { sub_address });
        }
        let pin = sensor.pin;
        if let Err(e) = pins.drive(pin, PinState::from(high)) {
            return Err(SensorError::pin(pin, e));
        }
        sensor.status.raw_level = high;
        sensor.status.stable_value = high;
        Ok(())
    }

    pub fn get(&self, sub_address: u8) -> Option<&SensorConfig> {
        self.registry.find(sub_address)
    }

    /// Sensor registered just below `sub_address`
    pub fn find_before(&self, sub_address: u8) -> Option<&SensorConfig> {
        self.registry.find_before(sub_address)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorConfig> {
        self.registry.iter()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// `<AS sub pin M>` line of one sensor
    pub fn status(&self, sub_address: u8) -> Option<StatusLine> {
        self.registry.find(sub_address).map(codec::format_status)
    }

    /// `<AS sub pin M>` lines of every sensor, in sub-address order
    pub fn status_lines(&self) -> impl Iterator<Item = StatusLine> + '_ {
        self.registry.iter().map(codec::format_status)
    }
}
