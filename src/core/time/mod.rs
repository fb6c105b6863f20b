//! Time management module
//!
//! Tick counting and the body of the watchdog tick interrupt. The counter
//! is owned by the scheduler and passed in, never held in a global here.

use crate::config::{CFG_INITIAL_TICK_COUNT, CFG_TICK_TIMEOUT};
use crate::port::wdt::WdtTimeout;
use crate::port::Cpu;
use crate::types::{AtomicTick, TickType, MAX_DELAY};
use crate::trace;

use portable_atomic::Ordering;

/// Tick counter
///
/// Increments and reads are indivisible even though the 8-bit core moves
/// the value a byte at a time.
pub struct TickCounter {
    ticks: AtomicTick,
}

impl TickCounter {
    /// Counter at the configured boot value
    pub const fn new() -> Self {
        Self::with_initial(CFG_INITIAL_TICK_COUNT)
    }

    /// Counter starting at `initial`
    pub const fn with_initial(initial: TickType) -> Self {
        Self {
            ticks: AtomicTick::new(initial),
        }
    }

    /// Get current tick count
    #[inline(always)]
    pub fn get(&self) -> TickType {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Increment and return tick count. Wraps to zero after `MAX_DELAY`.
    #[inline(always)]
    pub fn increment(&self) -> TickType {
        self.ticks.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler entry point run once per tick
pub trait TickHook {
    /// Process the tick that brought the count to `now`.
    ///
    /// Returns `true` when a context switch is required.
    fn on_tick(&mut self, now: TickType) -> bool;
}

impl<F: FnMut(TickType) -> bool> TickHook for F {
    #[inline(always)]
    fn on_tick(&mut self, now: TickType) -> bool {
        self(now)
    }
}

/// Tick handler
///
/// Called from the watchdog vector. Re-arms the watchdog interrupt (which
/// disarms a pending reset in interrupt+reset mode), counts exactly one
/// tick, runs the scheduler hook and switches context if it asks for one.
///
/// # Returns
/// Whether a context switch was requested.
pub fn service_tick<C, H>(cpu: &C, counter: &TickCounter, hook: &mut H) -> bool
where
    C: Cpu + ?Sized,
    H: TickHook + ?Sized,
{
    cpu.watchdog_rearm();

    let now = counter.increment();
    let switch = hook.on_tick(now);
    if switch {
        trace!("tick {}: switch", now);
        cpu.yield_now();
    }
    switch
}

/// Milliseconds to ticks for a timeout class, rounded down.
///
/// Saturates one below `MAX_DELAY` so a computed delay is never mistaken
/// for "wait forever".
pub const fn ms_to_ticks_for(ms: u32, timeout: WdtTimeout) -> TickType {
    let ticks = ms / timeout.period_ms() as u32;
    if ticks >= MAX_DELAY as u32 {
        MAX_DELAY - 1
    } else {
        ticks as TickType
    }
}

/// Milliseconds to ticks at the configured tick period
#[inline(always)]
pub const fn ms_to_ticks(ms: u32) -> TickType {
    ms_to_ticks_for(ms, CFG_TICK_TIMEOUT)
}

/// Nominal milliseconds covered by `ticks` for a timeout class
#[inline(always)]
pub const fn ticks_to_ms_for(ticks: TickType, timeout: WdtTimeout) -> u64 {
    ticks as u64 * timeout.period_ms() as u64
}

/// Nominal milliseconds covered by `ticks` at the configured tick period
#[inline(always)]
pub const fn ticks_to_ms(ticks: TickType) -> u64 {
    ticks_to_ms_for(ticks, CFG_TICK_TIMEOUT)
}
