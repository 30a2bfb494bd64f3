//! Packed slot format for sensor configurations
//!
//! Slot layout (2 bytes):
//! - byte 0: bits 0-5 sub-address, bit 6 stored value, bit 7 input mode
//! - byte 1: bits 0-6 pin, bit 7 pull-up (only meaningful for inputs)

use core::fmt::Write;

use heapless::String;

use crate::sensor::{MAX_PIN, MAX_SUB_ADDRESS, SensorConfig, SensorMode, SensorStatus};
use crate::store::SLOT_SIZE;

/// Raw slot contents
pub type SlotBytes = [u8; SLOT_SIZE];

/// Input-mode flag in byte 0
pub const SUB_INPUT_BIT: u8 = 1 << 7;

/// Stored logical value in byte 0
pub const SUB_VALUE_BIT: u8 = 1 << 6;

/// Pull-up flag in byte 1
pub const PIN_PULLUP_BIT: u8 = 1 << 7;

/// Bits of byte 0 compared when searching a slot by sub-address.
///
/// The input-mode bit is ignored; the value bit is not.
pub const SUB_MATCH_MASK: u8 = 0x7F;

/// Capacity needed for a status line: 17 visible characters
pub const STATUS_LEN: usize = 17;

/// Status line as produced by [`format_status`]
pub type StatusLine = String<STATUS_LEN>;

/// Pack the persisted fields of a sensor.
///
/// Runtime flags are not stored, except that the value bit is left clear.
pub fn encode(sensor: &SensorConfig) -> SlotBytes {
    encode_fields(sensor.sub_address, sensor.pin, sensor.mode)
}

/// Pack raw fields; out-of-range bits are masked off.
pub fn encode_fields(sub_address: u8, pin: u8, mode: SensorMode) -> SlotBytes {
    let mut sub = sub_address & MAX_SUB_ADDRESS;
    let mut pin = pin & MAX_PIN;
    if mode.is_input() {
        sub |= SUB_INPUT_BIT;
        if mode.pullup() {
            pin |= PIN_PULLUP_BIT;
        }
    }
    [sub, pin]
}

/// Unpack a slot read from the store at time `now`.
///
/// The record comes back synced and settling, so the first polls validate the
/// stored value against the live line.
pub fn decode(bytes: SlotBytes, now: u32) -> SensorConfig {
    let [sub, pin] = bytes;
    let mode = match (sub & SUB_INPUT_BIT != 0, pin & PIN_PULLUP_BIT != 0) {
        (true, true) => SensorMode::InputPullup,
        (true, false) => SensorMode::Input,
        (false, _) => SensorMode::Output,
    };

    SensorConfig {
        sub_address: sub & MAX_SUB_ADDRESS,
        pin: pin & MAX_PIN,
        mode,
        status: SensorStatus {
            synced: true,
            raw_level: false,
            stable_value: sub & SUB_VALUE_BIT != 0,
            pending_change: false,
        },
        last_change: Some(now),
    }
}

/// Render `<AS sub pin M>` with `M` one of `I`, `P`, `O`.
pub fn format_status(sensor: &SensorConfig) -> StatusLine {
    let mut line = StatusLine::new();
    // u8 fields: at most 14 characters, always fits
    let _ = write!(
        line,
        "<AS {} {} {}>",
        sensor.sub_address,
        sensor.pin,
        sensor.mode.as_char()
    );
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sub_address: u8, pin: u8, mode: SensorMode) -> SensorConfig {
        SensorConfig::new(sub_address, pin, mode)
    }

    #[test]
    fn test_encode_layout() {
        assert_eq!(encode(&config(5, 12, SensorMode::Output)), [0x05, 0x0C]);
        assert_eq!(encode(&config(5, 12, SensorMode::Input)), [0x85, 0x0C]);
        assert_eq!(
            encode(&config(5, 12, SensorMode::InputPullup)),
            [0x85, 0x8C]
        );
    }

    #[test]
    fn test_decode_round_trip() {
        for sub in 0..=MAX_SUB_ADDRESS {
            for pin in 0..=MAX_PIN {
                for mode in SensorMode::ALL {
                    let decoded = decode(encode(&config(sub, pin, mode)), 7);
                    assert_eq!(
                        (decoded.sub_address, decoded.pin, decoded.mode),
                        (sub, pin, mode)
                    );
                    assert!(decoded.status.synced);
                    assert!(!decoded.status.stable_value);
                    assert_eq!(decoded.last_change, Some(7));
                }
            }
        }
    }

    #[test]
    fn test_pullup_ignored_for_outputs() {
        assert_eq!(decode([0x05, 0x8C], 0).mode, SensorMode::Output);
    }

    #[test]
    fn test_decode_seeds_stable_value() {
        let sensor = decode([0x80 | SUB_VALUE_BIT | 9, 3], 0);
        assert_eq!(sensor.sub_address, 9);
        assert!(sensor.status.stable_value);
        assert!(!decode([0x89, 3], 0).status.stable_value);
    }

    #[test]
    fn test_format_status() {
        assert_eq!(
            format_status(&config(5, 12, SensorMode::Output)).as_str(),
            "<AS 5 12 O>"
        );
        assert_eq!(
            format_status(&config(5, 12, SensorMode::InputPullup)).as_str(),
            "<AS 5 12 P>"
        );
        assert_eq!(
            format_status(&config(5, 12, SensorMode::Input)).as_str(),
            "<AS 5 12 I>"
        );
        assert_eq!(
            format_status(&config(63, 127, SensorMode::Input)).as_str(),
            "<AS 63 127 I>"
        );
    }
}
