//! Watchdog tick source
//!
//! The scheduler tick comes from the watchdog timer running off its own
//! low-power oscillator instead of a timer/counter. Once enabled the
//! watchdog rolls over and raises a new interrupt every period.

use crate::config::{CFG_WDT_OSC_HZ, CFG_WDT_OSC_HZ_CALIBRATED};
use crate::critical::CriticalSection;
use crate::error::{PortError, PortResult};
use crate::port::Cpu;
use crate::{info, warn};

/// Watchdog interrupt flag. Writing one clears it.
pub const WDIF: u8 = 1 << 7;
/// Watchdog interrupt enable
pub const WDIE: u8 = 1 << 6;
/// Prescaler bit 3, split from the others in the control register
pub const WDP3: u8 = 1 << 5;
/// Change enable, opens the timed write window
pub const WDCE: u8 = 1 << 4;
/// System reset enable
pub const WDE: u8 = 1 << 3;
/// Prescaler bits 0..=2
pub const WDP_LOW: u8 = 0x07;

/// Watchdog reset flag in the MCU status register
pub const WDRF: u8 = 1 << 3;

/// Watchdog timeout class (oscillator cycles = 2048 << class)
///
/// The names are the nominal datasheet periods; the actual period depends
/// on supply voltage and temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WdtTimeout {
    Ms15 = 0,
    Ms30 = 1,
    Ms60 = 2,
    Ms120 = 3,
    Ms250 = 4,
    Ms500 = 5,
    S1 = 6,
    S2 = 7,
    S4 = 8,
    S8 = 9,
}

impl WdtTimeout {
    /// Every legal class, shortest first
    pub const ALL: [WdtTimeout; 10] = [
        WdtTimeout::Ms15,
        WdtTimeout::Ms30,
        WdtTimeout::Ms60,
        WdtTimeout::Ms120,
        WdtTimeout::Ms250,
        WdtTimeout::Ms500,
        WdtTimeout::S1,
        WdtTimeout::S2,
        WdtTimeout::S4,
        WdtTimeout::S8,
    ];

    /// Prescaler bits as laid out in the control register
    #[inline(always)]
    pub const fn prescaler_bits(self) -> u8 {
        let class = self as u8;
        let wdp3 = if class & 0x08 != 0 { WDP3 } else { 0 };
        wdp3 | (class & WDP_LOW)
    }

    /// Nominal period in milliseconds, assuming a 128 kHz oscillator.
    ///
    /// 2048 cycles at 128 kHz is 16 ms, so this is a power of two and
    /// slightly longer than the class name suggests.
    #[inline(always)]
    pub const fn period_ms(self) -> u16 {
        1 << (self as u8 + 4)
    }

    /// Period in microseconds for a given oscillator frequency, `None` for
    /// a zero frequency
    pub const fn period_us(self, osc_hz: u32) -> Option<u32> {
        if osc_hz == 0 {
            return None;
        }
        let cycles = 2048u64 << (self as u8);
        Some((cycles * 1_000_000 / osc_hz as u64) as u32)
    }

    /// Period in microseconds at [`CFG_WDT_OSC_HZ`]
    #[inline]
    pub const fn period_us_nominal(self) -> u32 {
        match self.period_us(CFG_WDT_OSC_HZ) {
            Some(us) => us,
            None => 0,
        }
    }

    /// Period in microseconds at [`CFG_WDT_OSC_HZ_CALIBRATED`]
    #[inline]
    pub const fn period_us_calibrated(self) -> u32 {
        match self.period_us(CFG_WDT_OSC_HZ_CALIBRATED) {
            Some(us) => us,
            None => 0,
        }
    }

    /// Nominal tick rate, rounded down. Zero for classes longer than 1 s.
    #[inline(always)]
    pub const fn tick_rate_hz(self) -> u32 {
        1000 / self.period_ms() as u32
    }
}

impl TryFrom<u8> for WdtTimeout {
    type Error = PortError;

    fn try_from(raw: u8) -> PortResult<Self> {
        WdtTimeout::ALL
            .get(raw as usize)
            .copied()
            .ok_or(PortError::InvalidTimeout)
    }
}

/// What an unserviced watchdog expiry does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WdtMode {
    /// Interrupt every period, never reset
    Interrupt,
    /// Interrupt every period; reset if the interrupt is still unserviced
    /// at the next expiry
    InterruptAndReset,
}

impl WdtMode {
    /// Mode bits for the control register
    #[inline(always)]
    pub const fn control_bits(self) -> u8 {
        match self {
            WdtMode::Interrupt => WDIE,
            WdtMode::InterruptAndReset => WDIE | WDE,
        }
    }
}

/// Full control register value for a tick configuration.
///
/// `WDIF` is included so the write also clears any stale interrupt.
#[inline(always)]
pub const fn control_value(timeout: WdtTimeout, mode: WdtMode) -> u8 {
    WDIF | mode.control_bits() | timeout.prescaler_bits()
}

/// Control register value that sets `WDIE` again after an expiry in
/// interrupt+reset mode, or `None` when no reset is armed.
///
/// `WDIF` is masked out: writing back a one would clear an expiry that
/// landed after the read and lose that tick.
#[inline(always)]
pub const fn rearm_value(control: u8) -> Option<u8> {
    if control & WDE != 0 {
        Some((control | WDIE) & !WDIF)
    } else {
        None
    }
}

/// Arm the watchdog as the scheduler tick
///
/// Interrupts are masked for the sequence and restored to their previous
/// state afterwards. A pending watchdog reset flag is cleared first,
/// otherwise the hardware keeps `WDE` forced on.
pub fn configure_tick<C: Cpu + ?Sized>(cpu: &C, timeout: WdtTimeout, mode: WdtMode) {
    let cs = CriticalSection::enter(cpu);
    cpu.watchdog_reset();
    cpu.clear_watchdog_reset_flag();
    cpu.watchdog_timed_write(control_value(timeout, mode));
    drop(cs);

    info!("wdt tick armed: {} {}", timeout, mode);
}

/// Arm the watchdog to interrupt every period without ever resetting
#[inline]
pub fn configure_tick_interrupt_only<C: Cpu + ?Sized>(cpu: &C, timeout: WdtTimeout) {
    configure_tick(cpu, timeout, WdtMode::Interrupt);
}

/// Arm the watchdog to interrupt every period and reset the part if an
/// interrupt goes unserviced until the following expiry
#[inline]
pub fn configure_tick_interrupt_and_reset<C: Cpu + ?Sized>(cpu: &C, timeout: WdtTimeout) {
    configure_tick(cpu, timeout, WdtMode::InterruptAndReset);
}

/// [`configure_tick`] for a raw class value, e.g. read from EEPROM
///
/// # Returns
/// * `Ok(timeout)` - The class that was armed
/// * `Err(PortError::InvalidTimeout)` - `raw` is not a hardware class; the
///   watchdog is left untouched
pub fn configure_tick_raw<C: Cpu + ?Sized>(cpu: &C, raw: u8, mode: WdtMode) -> PortResult<WdtTimeout> {
    let timeout = WdtTimeout::try_from(raw).inspect_err(|_| {
        warn!("wdt class {=u8} out of range", raw);
    })?;
    configure_tick(cpu, timeout, mode);
    Ok(timeout)
}
