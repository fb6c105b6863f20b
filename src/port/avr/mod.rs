//! megaAVR port implementation
//!
//! Covers the parts with `WDTCSR` at data address 0x60 and a watchdog
//! interrupt (ATmega48/88/168/328, ATmega640/1280/2560, ATmega644/1284).

use core::arch::{asm, naked_asm};
use core::ptr::{read_volatile, write_volatile};

use crate::port::wdt::{rearm_value, WDCE, WDE, WDRF};
use crate::port::{Cpu, Sreg};

/// Status register, I/O space
const SREG_IO: u8 = 0x3F;
/// Sleep mode control register, data space
const SMCR: *mut u8 = 0x53 as *mut u8;
/// MCU status register, data space
const MCUSR: *mut u8 = 0x54 as *mut u8;
/// Watchdog control register, data space
const WDTCSR: *mut u8 = 0x60 as *mut u8;
const WDTCSR_ADDR: u16 = 0x60;

extern "C" {
    /// Saves the full register context, selects the next task and restores
    /// it. Provided by the scheduler.
    fn port_switch_context();
}

/// The AVR core
#[derive(Debug, Clone, Copy, Default)]
pub struct Avr;

impl Cpu for Avr {
    #[inline(always)]
    fn save_and_disable(&self) -> Sreg {
        let sreg: u8;
        unsafe {
            asm!(
                "in {sreg}, {io}",
                "cli",
                sreg = out(reg) sreg,
                io = const SREG_IO,
                options(nostack),
            );
        }
        Sreg(sreg)
    }

    #[inline(always)]
    fn restore(&self, sreg: Sreg) {
        unsafe {
            asm!(
                "out {io}, {sreg}",
                sreg = in(reg) sreg.0,
                io = const SREG_IO,
                options(nostack),
            );
        }
    }

    #[inline(always)]
    fn enable_interrupts(&self) {
        unsafe { asm!("sei", options(nostack)) };
    }

    #[inline(always)]
    fn disable_interrupts(&self) {
        unsafe { asm!("cli", options(nostack)) };
    }

    #[inline(always)]
    fn interrupts_enabled(&self) -> bool {
        let sreg: u8;
        unsafe {
            asm!(
                "in {sreg}, {io}",
                sreg = out(reg) sreg,
                io = const SREG_IO,
                options(nomem, nostack, preserves_flags),
            );
        }
        Sreg(sreg).interrupts_enabled()
    }

    #[inline(always)]
    fn watchdog_reset(&self) {
        unsafe { asm!("wdr", options(nomem, nostack, preserves_flags)) };
    }

    #[inline(always)]
    fn clear_watchdog_reset_flag(&self) {
        unsafe { write_volatile(MCUSR, read_volatile(MCUSR) & !WDRF) };
    }

    /// Both stores are two cycles, so the configuration lands inside the
    /// four-cycle window opened by `WDCE`.
    #[inline(always)]
    fn watchdog_timed_write(&self, control: u8) {
        unsafe {
            asm!(
                "sts {addr}, {unlock}",
                "sts {addr}, {control}",
                addr = const WDTCSR_ADDR,
                unlock = in(reg) WDCE | WDE,
                control = in(reg) control,
                options(nostack),
            );
        }
    }

    #[inline(always)]
    fn watchdog_control(&self) -> u8 {
        unsafe { read_volatile(WDTCSR) }
    }

    #[inline(always)]
    fn watchdog_rearm(&self) {
        if let Some(control) = rearm_value(unsafe { read_volatile(WDTCSR) }) {
            unsafe { write_volatile(WDTCSR, control) };
        }
    }

    #[inline(always)]
    fn sleep_control(&self) -> u8 {
        unsafe { read_volatile(SMCR) }
    }

    #[inline(always)]
    fn write_sleep_control(&self, value: u8) {
        unsafe { write_volatile(SMCR, value) };
    }

    #[inline(always)]
    fn nop(&self) {
        unsafe { asm!("nop", options(nomem, nostack, preserves_flags)) };
    }

    #[inline(always)]
    fn yield_now(&self) {
        unsafe { port_yield() };
    }
}

/// Yield to the scheduler
///
/// No prologue, so the caller's registers and return address are exactly
/// what the context-switch routine saves. Its `ret` lands back in the
/// caller once this task is resumed.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn port_yield() {
    naked_asm!(
        "jmp {switch}",
        switch = sym port_switch_context,
    );
}
