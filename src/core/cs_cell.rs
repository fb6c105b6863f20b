//! Critical section protected cell
//!
//! Wrapper for state shared between tasks and interrupt handlers. The
//! borrow flag is only touched with a guard held, so it needs no atomics.

use core::cell::{Cell, UnsafeCell};

use crate::critical::CriticalSection;
use crate::port::Cpu;

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T> {
    value: UnsafeCell<T>,
    borrowed: Cell<bool>,
}

// Single core: holding a guard excludes every other accessor.
unsafe impl<T: Send> Sync for CsCell<T> {}

/// Clears the borrow flag when the access ends, including on unwind
struct BorrowRelease<'a>(&'a Cell<bool>);

impl Drop for BorrowRelease<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T> CsCell<T> {
    /// Create a new CsCell
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
            borrowed: Cell::new(false),
        }
    }

    /// Run `f` on the inner value, or return `None` if the cell is already
    /// borrowed further up the call stack
    #[inline]
    pub fn try_with<C, R>(
        &self,
        _cs: &CriticalSection<'_, C>,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R>
    where
        C: Cpu + ?Sized,
    {
        if self.borrowed.replace(true) {
            return None;
        }
        let _release = BorrowRelease(&self.borrowed);
        // SAFETY: the flag was clear, so this is the only live borrow, and
        // the guard keeps interrupt handlers out until it is released.
        Some(f(unsafe { &mut *self.value.get() }))
    }

    /// Run `f` on the inner value
    ///
    /// # Panics
    /// If `f` reaches `with` on the same cell again.
    #[inline]
    pub fn with<C, R>(&self, cs: &CriticalSection<'_, C>, f: impl FnOnce(&mut T) -> R) -> R
    where
        C: Cpu + ?Sized,
    {
        match self.try_with(cs, f) {
            Some(r) => r,
            None => panic!("CsCell already borrowed"),
        }
    }

    /// Consume the cell
    #[inline(always)]
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}
