//! Critical section handling for the AVR port
//!
//! Entering saves the whole status register and clears the I-bit; leaving
//! writes the saved register back. Leaving therefore never enables
//! interrupts that were off on entry, which is what makes nesting safe.
//! Each nesting level's snapshot lives in its own guard, so guards dropped
//! in scope order restore in LIFO order without a depth counter.

use crate::port::{Cpu, Sreg};

/// RAII guard for critical sections
///
/// When this guard is created, interrupts are disabled.
/// When it is dropped, the status register is restored to its value at
/// entry. Guards must be released in the reverse order they were taken;
/// releasing out of order is not detected.
#[must_use = "dropping the guard immediately ends the critical section"]
pub struct CriticalSection<'a, C: Cpu + ?Sized> {
    cpu: &'a C,
    saved: Sreg,
}

impl<'a, C: Cpu + ?Sized> CriticalSection<'a, C> {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter(cpu: &'a C) -> Self {
        let saved = cpu.save_and_disable();
        CriticalSection { cpu, saved }
    }

    /// Status register captured on entry
    #[inline(always)]
    pub fn saved(&self) -> Sreg {
        self.saved
    }

    /// Leave the critical section explicitly
    #[inline(always)]
    pub fn exit(self) {}
}

impl<C: Cpu + ?Sized> Drop for CriticalSection<'_, C> {
    #[inline(always)]
    fn drop(&mut self) {
        self.cpu.restore(self.saved);
    }
}

/// Enter a critical section; see [`CriticalSection::enter`]
#[inline(always)]
pub fn enter_critical<C: Cpu + ?Sized>(cpu: &C) -> CriticalSection<'_, C> {
    CriticalSection::enter(cpu)
}

/// Leave a critical section, restoring the state saved by its
/// [`enter_critical`]
#[inline(always)]
pub fn exit_critical<C: Cpu + ?Sized>(cs: CriticalSection<'_, C>) {
    cs.exit();
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::cs_cell::CsCell)
/// protected data.
#[inline]
pub fn critical_section<C, F, R>(cpu: &C, f: F) -> R
where
    C: Cpu + ?Sized,
    F: FnOnce(&CriticalSection<'_, C>) -> R,
{
    let cs = CriticalSection::enter(cpu);
    f(&cs)
}
