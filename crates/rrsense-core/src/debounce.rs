//! Time-based debounce of input sensors
//!
//! A raw transition restarts the settling window. Once the line has held
//! still for the whole interval, the raw level is compared against the
//! validated value; a difference is committed and, if the previous change
//! was already consumed, raised as a new pending change.

use embedded_hal::digital::{Error as _, PinState};
use log::{debug, error};

use crate::hal::{Clock, SensorPins};
use crate::registry::SensorRegistry;
use crate::sensor::SensorConfig;

/// Debounce interval used when none is configured
pub const DEFAULT_DEBOUNCE_MS: u32 = 50;

/// Debounce filter shared by every sensor of a bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    interval_ms: u32,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl Debouncer {
    pub const fn new(interval_ms: u32) -> Self {
        Self { interval_ms }
    }

    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Feed one sample of `sensor` taken at `now`.
    ///
    /// Returns true exactly when a new pending change was raised.
    pub fn sample(&self, sensor: &mut SensorConfig, level: bool, now: u32) -> bool {
        if level != sensor.status.raw_level {
            sensor.status.raw_level = level;
            sensor.last_change = Some(now);
            return false;
        }

        let Some(since) = sensor.last_change else {
            return false;
        };
        if now.wrapping_sub(since) < self.interval_ms {
            return false;
        }

        sensor.last_change = None;
        if sensor.status.stable_value == level {
            return false;
        }

        debug!(
            " Sensor {} stabilized at {} after {} ms",
            sensor.sub_address,
            level,
            now.wrapping_sub(since)
        );
        sensor.status.stable_value = level;
        if sensor.status.pending_change {
            return false;
        }
        sensor.status.pending_change = true;
        true
    }

    /// Sample every input sensor once; returns the number of changes raised.
    ///
    /// A sensor whose line cannot be read is skipped for this cycle.
    pub fn poll<P, C>(&self, registry: &mut SensorRegistry, pins: &mut P, clock: &C) -> usize
    where
        P: SensorPins,
        C: Clock + ?Sized,
    {
        let mut raised = 0;
        for sensor in registry.iter_mut().filter(|s| s.mode.is_input()) {
            let level = match pins.read(sensor.pin) {
                Ok(state) => state == PinState::High,
                Err(e) => {
                    error!(
                        "Failed to read pin {} of sensor {}: {:?}",
                        sensor.pin,
                        sensor.sub_address,
                        e.kind()
                    );
                    continue;
                }
            };
            if self.sample(sensor, level, clock.now_ms()) {
                raised += 1;
            }
        }
        raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{DebounceState, SensorMode};

    const INTERVAL: u32 = 20;

    fn sensor() -> SensorConfig {
        SensorConfig::new(1, 2, SensorMode::Input)
    }

    #[test]
    fn test_single_edge_after_stable_interval() {
        let debouncer = Debouncer::new(INTERVAL);
        let mut s = sensor();
        let mut raised = 0;

        assert!(!debouncer.sample(&mut s, true, 100));
        assert_eq!(s.state(), DebounceState::Settling);
        for now in (101..400).step_by(5) {
            if debouncer.sample(&mut s, true, now) {
                raised += 1;
            }
        }

        assert_eq!(raised, 1);
        assert!(s.status.stable_value);
        assert!(s.status.pending_change);
        assert_eq!(s.state(), DebounceState::StablePending);
    }

    #[test]
    fn test_validation_waits_for_full_interval() {
        let debouncer = Debouncer::new(INTERVAL);
        let mut s = sensor();
        debouncer.sample(&mut s, true, 100);
        assert!(!debouncer.sample(&mut s, true, 100 + INTERVAL - 1));
        assert!(!s.status.stable_value);
        assert!(debouncer.sample(&mut s, true, 100 + INTERVAL));
    }

    #[test]
    fn test_noise_rejected() {
        let debouncer = Debouncer::new(INTERVAL);
        let mut s = sensor();
        debouncer.sample(&mut s, true, 100);
        debouncer.sample(&mut s, false, 105);
        debouncer.sample(&mut s, true, 110);
        debouncer.sample(&mut s, false, 115);
        for now in 116..200 {
            assert!(!debouncer.sample(&mut s, false, now));
        }
        assert!(!s.status.stable_value);
        assert!(!s.status.pending_change);
        assert_eq!(s.state(), DebounceState::StableClean);
    }

    #[test]
    fn test_bounce_restarts_window() {
        let debouncer = Debouncer::new(INTERVAL);
        let mut s = sensor();
        debouncer.sample(&mut s, true, 0);
        debouncer.sample(&mut s, false, 15);
        debouncer.sample(&mut s, true, 18);
        // 20 ms after the first edge but only 12 after the last one
        assert!(!debouncer.sample(&mut s, true, 30));
        assert!(debouncer.sample(&mut s, true, 38));
    }

    #[test]
    fn test_no_second_notification_while_pending() {
        let debouncer = Debouncer::new(INTERVAL);
        let mut s = sensor();
        debouncer.sample(&mut s, true, 0);
        assert!(debouncer.sample(&mut s, true, 25));

        // Goes back low before anyone consumed the first change
        debouncer.sample(&mut s, false, 30);
        assert!(!debouncer.sample(&mut s, false, 60));
        assert!(!s.status.stable_value);
        assert!(s.status.pending_change);

        // Consumed, then a new edge raises again
        s.status.pending_change = false;
        debouncer.sample(&mut s, true, 70);
        assert!(debouncer.sample(&mut s, true, 95));
    }

    #[test]
    fn test_interval_survives_clock_wraparound() {
        let debouncer = Debouncer::new(INTERVAL);
        let mut s = sensor();
        let start = u32::MAX - 5;
        debouncer.sample(&mut s, true, start);
        assert!(!debouncer.sample(&mut s, true, start.wrapping_add(10)));
        assert!(debouncer.sample(&mut s, true, start.wrapping_add(INTERVAL)));
    }

    #[test]
    fn test_loaded_value_confirmed_without_notification() {
        let debouncer = Debouncer::new(INTERVAL);
        let mut s = sensor();
        // As decoded from the store: settling since load, stored value low
        s.last_change = Some(0);
        assert!(!debouncer.sample(&mut s, false, 30));
        assert_eq!(s.state(), DebounceState::StableClean);
    }
}
