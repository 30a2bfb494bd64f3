//! Desktop simulator for the rrsense sensor bank.
//!
//! Runs the sensor bank against an EEPROM image file and synthetic input
//! lines that bounce after every edge, so allocation, persistence and the
//! debounce engine can be exercised without a controller.
//!
//! ```text
//! rrsense-simulator --store eeprom.bin --sensor 5:12:P --sensor 6:13:O --cycles 400
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use thiserror_no_std::Error;

use rrsense_core::mock::{MockClock, MockPins};
use rrsense_core::{
    BankSettings, ByteStore, Clock, RamStore, RegionGuard, SensorBank, SensorError, SensorMode,
    TurnoutFloor,
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// `SUB:PIN:MODE` as given on the command line
#[derive(Debug, Clone, Copy)]
struct SensorArg {
    sub_address: u8,
    pin: u8,
    mode: SensorMode,
}

fn parse_sensor(arg: &str) -> Result<SensorArg, String> {
    let parts: Vec<&str> = arg.split(':').collect();
    let [sub, pin, mode] = parts.as_slice() else {
        return Err(format!("expected SUB:PIN:MODE, got `{arg}`"));
    };
    Ok(SensorArg {
        sub_address: sub
            .parse()
            .map_err(|e| format!("sub-address `{sub}`: {e}"))?,
        pin: pin.parse().map_err(|e| format!("pin `{pin}`: {e}"))?,
        mode: mode
            .parse()
            .map_err(|_| format!("mode `{mode}` is not one of I, O, P"))?,
    })
}

#[derive(Debug, Parser)]
#[command(version, about = "Simulate the rrsense sensor bank")]
struct Cli {
    /// EEPROM image to load and save back (a blank image is used if absent)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Size in bytes of a blank image
    #[arg(long, default_value_t = 1024)]
    size: usize,

    /// First address above the turnout region
    #[arg(long, default_value_t = 0)]
    turnout_floor: usize,

    /// Debounce interval
    #[arg(long, default_value_t = BankSettings::default().debounce_ms)]
    debounce_ms: u32,

    /// Wipe the sensor region before anything else
    #[arg(long)]
    format: bool,

    /// Sensor to add or update, as SUB:PIN:MODE with MODE one of I, O, P
    #[arg(long = "sensor", value_parser = parse_sensor)]
    sensors: Vec<SensorArg>,

    /// Sub-address of a sensor to delete
    #[arg(long = "remove")]
    removals: Vec<u8>,

    /// Number of poll cycles to run
    #[arg(long, default_value_t = 200)]
    cycles: u32,

    /// Simulated time between two polls
    #[arg(long, default_value_t = 5)]
    tick_ms: u32,
}

/// Failures that end a simulator run
#[derive(Debug, Error)]
enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sensor bank error: {0}")]
    Bank(#[from] SensorError),
}

// ---------------------------------------------------------------------------
// Synthetic input lines
// ---------------------------------------------------------------------------

/// How long a line chatters after each edge
const BOUNCE_MS: u32 = 8;

/// Toggle period of outputs driven by the simulator
const OUTPUT_PERIOD_MS: u32 = 1000;

/// Generates input levels: each line flips with its own period and chatters
/// for a few milliseconds after every flip.
struct BouncingLines;

impl BouncingLines {
    fn period_ms(pin: u8) -> u32 {
        300 + u32::from(pin) * 37
    }

    fn level(pin: u8, now: u32) -> bool {
        let period = Self::period_ms(pin);
        let settled = (now / period) % 2 == 1;
        let since_edge = now % period;
        if now >= period && since_edge < BOUNCE_MS {
            // Chatter between old and new level every other millisecond
            settled ^ (since_edge % 2 == 0)
        } else {
            settled
        }
    }

    fn apply<S, G>(pins: &mut MockPins, bank: &SensorBank<S, G>, now: u32)
    where
        S: ByteStore,
        G: RegionGuard,
    {
        for sensor in bank.sensors().filter(|s| s.mode.is_input()) {
            pins.set_level(sensor.pin, Self::level(sensor.pin, now));
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn load_image(cli: &Cli) -> Result<Vec<u8>, SimError> {
    match &cli.store {
        Some(path) if path.exists() => {
            let image = fs::read(path)?;
            info!("Loaded {} byte image from {}", image.len(), path.display());
            Ok(image)
        }
        _ => {
            info!("Using blank {} byte image", cli.size);
            Ok(vec![0xFF; cli.size])
        }
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    let settings = BankSettings::default().with_debounce_ms(cli.debounce_ms);
    let store = RamStore::new(load_image(cli)?);
    let mut bank = SensorBank::new(store, TurnoutFloor::new(cli.turnout_floor), settings);
    info!("Debounce interval: {} ms", bank.settings().debounce_ms);
    let mut pins = MockPins::new();
    let clock = MockClock::new(0);

    if cli.format {
        bank.format_store()?;
    }
    match bank.load(&mut pins, &clock) {
        Ok(count) => info!("{} sensors in store", count),
        Err(SensorError::Unformatted) => {
            warn!("Store is not formatted, formatting it");
            bank.format_store()?;
        }
        Err(e) => return Err(e.into()),
    }

    for &sub_address in &cli.removals {
        if let Err(e) = bank.remove(sub_address) {
            warn!("Cannot remove sensor {}: {}", sub_address, e);
        }
    }
    for arg in &cli.sensors {
        let (sub_address, pin, mode) = (arg.sub_address, arg.pin, arg.mode);
        if let Err(e) = bank.configure(&mut pins, &clock, sub_address, pin, mode) {
            error!("Cannot configure sensor {}: {}", sub_address, e);
        }
    }
    for line in bank.status_lines() {
        info!("{}", line);
    }

    let outputs: Vec<u8> = bank
        .sensors()
        .filter(|s| !s.mode.is_input())
        .map(|s| s.sub_address)
        .collect();

    for _ in 0..cli.cycles {
        let now = clock.now_ms();
        if now % OUTPUT_PERIOD_MS < cli.tick_ms {
            let high = (now / OUTPUT_PERIOD_MS) % 2 == 1;
            for &sub_address in &outputs {
                bank.set_output(&mut pins, sub_address, high)?;
            }
        }

        BouncingLines::apply(&mut pins, &bank, now);
        if bank.poll(&mut pins, &clock) > 0 {
            for event in bank.drain_changes() {
                info!(
                    "[{:>6} ms] sensor {} -> {}",
                    now,
                    event.sub_address,
                    if event.value { "on" } else { "off" }
                );
            }
        }
        clock.advance(cli.tick_ms);
    }

    if let Some(path) = &cli.store {
        fs::write(path, bank.into_store().into_inner())?;
        info!("Saved image to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    let cli = Cli::parse();
    info!("Starting rrsense simulator");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
