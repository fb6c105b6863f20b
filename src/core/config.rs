//! Compile-time configuration for the AVR port
//!
//! These constants select the tick source and describe the clocks it is
//! derived from.

use crate::port::wdt::{WdtMode, WdtTimeout};
use crate::types::TickType;

/// Watchdog timeout class used as the scheduler tick
pub const CFG_TICK_TIMEOUT: WdtTimeout = WdtTimeout::Ms15;

/// Watchdog mode used as the scheduler tick
pub const CFG_TICK_MODE: WdtMode = WdtMode::Interrupt;

/// Nominal watchdog oscillator frequency
pub const CFG_WDT_OSC_HZ: u32 = 128_000;

/// Datasheet figure at 5 V and 25 °C, closer to real parts than nominal
pub const CFG_WDT_OSC_HZ_CALIBRATED: u32 = 120_000;

/// Tick count at boot
pub const CFG_INITIAL_TICK_COUNT: TickType = 0;

/// Nominal tick rate (rounded down)
pub const CFG_TICK_RATE_HZ: u32 = CFG_TICK_TIMEOUT.tick_rate_hz();
