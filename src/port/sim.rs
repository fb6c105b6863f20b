//! Simulated AVR core
//!
//! Register-level model of the parts of the core the port layer touches:
//! `SREG`, `WDTCSR`, `MCUSR`, `SMCR`, and the watchdog's expiry behaviour.
//! Time only advances when the test calls [`SimCpu::expire_watchdog`].

use core::cell::Cell;

use crate::port::wdt::{rearm_value, WDCE, WDE, WDIE, WDIF, WDP3, WDP_LOW, WDRF};
use crate::port::{Cpu, Sreg, SREG_I};

/// Outcome of one watchdog period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WdtEvent {
    /// Watchdog is off
    Stopped,
    /// Interrupt flag raised
    Interrupt,
    /// Processor was reset
    Reset,
}

/// Simulated single-core AVR
#[derive(Debug, Default)]
pub struct SimCpu {
    sreg: Cell<u8>,
    wdtcsr: Cell<u8>,
    mcusr: Cell<u8>,
    smcr: Cell<u8>,
    /// Cycles left in the change-enable window
    change_window: Cell<u8>,
    wdr_count: Cell<u32>,
    resets: Cell<u32>,
    yields: Cell<u32>,
    nops: Cell<u32>,
}

impl SimCpu {
    /// Core straight out of power-on reset: interrupts off, watchdog off
    pub const fn new() -> Self {
        Self {
            sreg: Cell::new(0),
            wdtcsr: Cell::new(0),
            mcusr: Cell::new(0),
            smcr: Cell::new(0),
            change_window: Cell::new(0),
            wdr_count: Cell::new(0),
            resets: Cell::new(0),
            yields: Cell::new(0),
            nops: Cell::new(0),
        }
    }

    /// Raw status register
    pub fn sreg(&self) -> u8 {
        self.sreg.get()
    }

    /// Raw MCU status register
    pub fn mcusr(&self) -> u8 {
        self.mcusr.get()
    }

    /// Number of `wdr` instructions executed
    pub fn wdr_count(&self) -> u32 {
        self.wdr_count.get()
    }

    /// Number of watchdog resets so far
    pub fn resets(&self) -> u32 {
        self.resets.get()
    }

    /// Number of context-switch requests
    pub fn yields(&self) -> u32 {
        self.yields.get()
    }

    /// Number of `nop` instructions executed
    pub fn nops(&self) -> u32 {
        self.nops.get()
    }

    /// Watchdog interrupt raised and not yet serviced
    pub fn watchdog_pending(&self) -> bool {
        self.wdtcsr.get() & WDIF != 0
    }

    /// Let one watchdog period elapse
    pub fn expire_watchdog(&self) -> WdtEvent {
        let control = self.wdtcsr.get();
        let interrupt = control & WDIE != 0;
        let reset = control & WDE != 0 || self.mcusr.get() & WDRF != 0;

        match (interrupt, reset) {
            (false, false) => WdtEvent::Stopped,
            (true, false) => {
                self.wdtcsr.set(control | WDIF);
                WdtEvent::Interrupt
            }
            // Interrupt+reset mode drops to reset mode until software
            // sets WDIE again.
            (true, true) => {
                self.wdtcsr.set((control | WDIF) & !WDIE);
                WdtEvent::Interrupt
            }
            (false, true) => {
                self.watchdog_system_reset();
                WdtEvent::Reset
            }
        }
    }

    /// Enter the watchdog vector if the interrupt is pending and the I-bit
    /// is set. The vector runs with interrupts disabled and `reti` sets the
    /// I-bit again.
    pub fn dispatch_watchdog<F: FnOnce(&Self)>(&self, isr: F) -> bool {
        if !self.watchdog_pending() || self.sreg.get() & SREG_I == 0 {
            return false;
        }

        self.sreg.set(self.sreg.get() & !SREG_I);
        self.wdtcsr.set(self.wdtcsr.get() & !WDIF);
        isr(self);
        self.sreg.set(self.sreg.get() | SREG_I);
        true
    }

    fn watchdog_system_reset(&self) {
        self.resets.set(self.resets.get() + 1);
        self.sreg.set(0);
        self.smcr.set(0);
        self.mcusr.set(self.mcusr.get() | WDRF);
        // WDRF keeps the watchdog in reset mode at the shortest period
        self.wdtcsr.set(WDE);
        self.change_window.set(0);
    }

    /// One instruction goes by
    fn tick_change_window(&self) {
        let cycles = self.change_window.get();
        self.change_window.set(cycles.saturating_sub(1));
    }

    /// Store to `WDTCSR` honouring the timed change rules
    fn store_wdtcsr(&self, value: u8) {
        let current = self.wdtcsr.get();
        let open = self.change_window.get() > 0;

        // Writing one clears the flag
        let flag = if value & WDIF != 0 { 0 } else { current & WDIF };

        let mut next = flag | (value & WDIE);
        if open {
            next |= value & (WDE | WDP3 | WDP_LOW);
            self.change_window.set(0);
        } else {
            // WDE can only be set, prescaler is locked
            next |= (current | value) & WDE;
            next |= current & (WDP3 | WDP_LOW);
            if value & (WDCE | WDE) == WDCE | WDE {
                next |= WDCE;
                self.change_window.set(4);
            }
        }
        if self.mcusr.get() & WDRF != 0 {
            next |= WDE;
        }
        self.wdtcsr.set(next);
    }
}

impl Cpu for SimCpu {
    fn save_and_disable(&self) -> Sreg {
        let sreg = self.sreg.get();
        self.sreg.set(sreg & !SREG_I);
        self.tick_change_window();
        Sreg(sreg)
    }

    fn restore(&self, sreg: Sreg) {
        self.sreg.set(sreg.0);
        self.tick_change_window();
    }

    fn enable_interrupts(&self) {
        self.sreg.set(self.sreg.get() | SREG_I);
        self.tick_change_window();
    }

    fn disable_interrupts(&self) {
        self.sreg.set(self.sreg.get() & !SREG_I);
        self.tick_change_window();
    }

    fn interrupts_enabled(&self) -> bool {
        Sreg(self.sreg.get()).interrupts_enabled()
    }

    fn watchdog_reset(&self) {
        self.wdr_count.set(self.wdr_count.get() + 1);
        self.tick_change_window();
    }

    fn clear_watchdog_reset_flag(&self) {
        self.mcusr.set(self.mcusr.get() & !WDRF);
        self.tick_change_window();
    }

    fn watchdog_timed_write(&self, control: u8) {
        debug_assert!(
            !self.interrupts_enabled(),
            "timed watchdog write with interrupts enabled"
        );
        self.store_wdtcsr(WDCE | WDE);
        self.store_wdtcsr(control);
    }

    fn watchdog_control(&self) -> u8 {
        self.wdtcsr.get()
    }

    fn watchdog_rearm(&self) {
        if let Some(control) = rearm_value(self.wdtcsr.get()) {
            self.store_wdtcsr(control);
        }
    }

    fn sleep_control(&self) -> u8 {
        self.smcr.get()
    }

    fn write_sleep_control(&self, value: u8) {
        self.smcr.set(value);
        self.tick_change_window();
    }

    fn nop(&self) {
        self.nops.set(self.nops.get() + 1);
        self.tick_change_window();
    }

    fn yield_now(&self) {
        self.yields.set(self.yields.get() + 1);
    }
}
