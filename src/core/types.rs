//! Core type definitions for the AVR port
//!
//! Widths follow the native 8-bit register file; only the tick counter
//! is selectable at build time.

/// Tick counter type (`tick-16bit` feature)
#[cfg(feature = "tick-16bit")]
pub type TickType = u16;

/// Tick counter type
#[cfg(not(feature = "tick-16bit"))]
pub type TickType = u32;

/// Atomic cell matching [`TickType`]
#[cfg(feature = "tick-16bit")]
pub(crate) type AtomicTick = portable_atomic::AtomicU16;

#[cfg(not(feature = "tick-16bit"))]
pub(crate) type AtomicTick = portable_atomic::AtomicU32;

/// "Wait forever" sentinel. Never produced by tick conversions.
pub const MAX_DELAY: TickType = TickType::MAX;

/// Stack element type, one register wide
pub type StackType = u8;

/// Signed base type for boolean/status results
pub type BaseType = i8;

/// Unsigned base type for counts and indices
pub type UBaseType = u8;

/// Task entry point, C ABI so the context-switch code can jump to it
pub type TaskFunction = extern "C" fn(*mut core::ffi::c_void);

/// Stack grows toward lower addresses
pub const STACK_GROWTH: BaseType = -1;

/// No alignment requirement on an 8-bit core
pub const BYTE_ALIGNMENT: usize = 1;

/// Ticks elapsed from `since` to `now`, tolerating one wrap.
#[inline(always)]
pub const fn ticks_elapsed(now: TickType, since: TickType) -> TickType {
    now.wrapping_sub(since)
}

/// True once `now` has reached or passed `deadline`.
///
/// Valid while the two values are less than half the counter range apart.
#[inline(always)]
pub const fn tick_reached(now: TickType, deadline: TickType) -> bool {
    now.wrapping_sub(deadline) <= MAX_DELAY / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_across_wrap() {
        assert_eq!(ticks_elapsed(2, MAX_DELAY - 1), 4);
        assert_eq!(ticks_elapsed(10, 10), 0);
    }

    #[test]
    fn deadline_across_wrap() {
        let deadline = 3;
        assert!(!tick_reached(MAX_DELAY, deadline));
        assert!(tick_reached(3, deadline));
        assert!(tick_reached(4, deadline));
    }
}
