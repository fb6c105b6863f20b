//! Watchdog-ticked port layer for 8-bit AVR
//!
//! Supplies a preemptive tick-driven scheduler with the pieces that need
//! direct control of the processor:
//! - Critical sections that save and restore `SREG`, so they nest
//! - A scheduler tick from the watchdog timer instead of a timer/counter
//! - A yield entry point with no compiler-generated prologue
//! - Sleep mode reset for the idle task
//!
//! ## Features
//!
//! - `tick-16bit` - 16-bit tick counter (32-bit otherwise)
//! - `atmega2560` - Place task functions in `.lowtext`
//! - `defmt` - Log through `defmt`
//! - `panic-halt` - Halt on panic (default)

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch))]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod port;

// ============ Re-exports ============

pub use self::core::config;
pub use self::core::critical;
pub use self::core::critical::{critical_section, enter_critical, exit_critical, CriticalSection};
pub use self::core::cs_cell;
pub use self::core::error;
pub use self::core::error::{PortError, PortResult};
pub use self::core::time;
pub use self::core::time::{service_tick, TickCounter, TickHook};
pub use self::core::types;
pub use self::core::types::*;

pub use port::wdt::{
    configure_tick, configure_tick_interrupt_and_reset, configure_tick_interrupt_only, WdtMode,
    WdtTimeout,
};
pub use port::{reset_sleep_configuration, start_tick, yield_now, Cpu, Sreg};
