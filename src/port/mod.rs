//! Port layer - CPU-specific implementations
//!
//! Everything that touches processor state goes through the [`Cpu`] trait.
//! On AVR targets it is implemented with inline assembly; everywhere else a
//! register-level simulator stands in so the layer can be tested on the host.

pub mod wdt;

#[cfg(target_arch = "avr")]
pub mod avr;

#[cfg(target_arch = "avr")]
pub use avr::*;

// Simulated core for non-AVR targets (for testing)
#[cfg(not(target_arch = "avr"))]
pub mod sim;

#[cfg(not(target_arch = "avr"))]
pub use sim::*;

pub use crate::types::{BYTE_ALIGNMENT, STACK_GROWTH};

/// Global interrupt enable bit in the status register
pub const SREG_I: u8 = 1 << 7;

/// Snapshot of the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Sreg(pub u8);

impl Sreg {
    /// Were interrupts globally enabled when this snapshot was taken
    #[inline(always)]
    pub const fn interrupts_enabled(self) -> bool {
        self.0 & SREG_I != 0
    }
}

/// Processor operations the port layer needs
///
/// Implementations are single-core and are only ever used from one
/// execution context at a time, so methods take `&self`.
pub trait Cpu {
    /// Read the status register and clear the I-bit, with no interrupt
    /// serviceable in between.
    fn save_and_disable(&self) -> Sreg;

    /// Write back a snapshot taken by [`Cpu::save_and_disable`].
    fn restore(&self, sreg: Sreg);

    /// Set the I-bit unconditionally (`sei`)
    fn enable_interrupts(&self);

    /// Clear the I-bit unconditionally (`cli`)
    fn disable_interrupts(&self);

    /// Current state of the I-bit
    fn interrupts_enabled(&self) -> bool;

    /// Restart the watchdog count (`wdr`)
    fn watchdog_reset(&self);

    /// Clear `WDRF` so the hardware stops forcing `WDE` on
    fn clear_watchdog_reset_flag(&self);

    /// Change-enable write followed by `control`, inside the hardware's
    /// timed window. Must be called with interrupts disabled.
    fn watchdog_timed_write(&self, control: u8);

    /// Current watchdog control register
    fn watchdog_control(&self) -> u8;

    /// Set `WDIE` again from the watchdog vector. Hardware clears it on
    /// expiry in interrupt+reset mode; setting it disarms the pending reset.
    fn watchdog_rearm(&self);

    /// Current sleep mode control register
    fn sleep_control(&self) -> u8;

    /// Overwrite the sleep mode control register
    fn write_sleep_control(&self, value: u8);

    /// One cycle of nothing
    fn nop(&self);

    /// Hand control to the context-switch routine. Returns when this task
    /// is selected again.
    fn yield_now(&self);
}

/// Unconditionally enable interrupts
#[inline(always)]
pub fn enable_interrupts<C: Cpu + ?Sized>(cpu: &C) {
    cpu.enable_interrupts();
}

/// Unconditionally disable interrupts
#[inline(always)]
pub fn disable_interrupts<C: Cpu + ?Sized>(cpu: &C) {
    cpu.disable_interrupts();
}

/// Single `nop`
#[inline(always)]
pub fn nop<C: Cpu + ?Sized>(cpu: &C) {
    cpu.nop();
}

/// Voluntarily give up the processor
///
/// From the caller's side this is an ordinary call; it returns once the
/// scheduler picks this task again.
#[inline(always)]
pub fn yield_now<C: Cpu + ?Sized>(cpu: &C) {
    cpu.yield_now();
}

/// Clear every sleep mode selection bit (and sleep enable)
///
/// Used by the idle task so no deeper sleep mode latches across cycles.
#[inline(always)]
pub fn reset_sleep_configuration<C: Cpu + ?Sized>(cpu: &C) {
    cpu.write_sleep_control(0);
}

/// Arm the scheduler tick from the compile-time configuration
pub fn start_tick<C: Cpu + ?Sized>(cpu: &C) {
    use crate::config::{CFG_TICK_MODE, CFG_TICK_RATE_HZ, CFG_TICK_TIMEOUT};

    wdt::configure_tick(cpu, CFG_TICK_TIMEOUT, CFG_TICK_MODE);
    crate::debug!("tick rate ~{=u32} Hz", CFG_TICK_RATE_HZ);
}

/// Declare a task entry point
///
/// ```ignore
/// task_function!(fn blink(params) {
///     let _ = params;
///     loop {}
/// });
/// ```
///
/// On ATmega2560/2561 the function goes into `.lowtext` so its word address
/// fits in a 16-bit function pointer.
#[cfg(feature = "atmega2560")]
#[macro_export]
macro_rules! task_function {
    ($(#[$m:meta])* $vis:vis fn $name:ident($params:ident) $body:block) => {
        $(#[$m])*
        #[link_section = ".lowtext"]
        $vis extern "C" fn $name($params: *mut ::core::ffi::c_void) $body
    };
}

/// Declare a task entry point
#[cfg(not(feature = "atmega2560"))]
#[macro_export]
macro_rules! task_function {
    ($(#[$m:meta])* $vis:vis fn $name:ident($params:ident) $body:block) => {
        $(#[$m])*
        $vis extern "C" fn $name($params: *mut ::core::ffi::c_void) $body
    };
}
