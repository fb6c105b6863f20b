//! Language items for AVR builds

// Halt on panic; an application that wants something else disables the
// `panic-halt` feature and provides its own handler.
#[cfg(all(feature = "panic-halt", target_arch = "avr"))]
use panic_halt as _;

#[cfg(target_arch = "avr")]
mod cs_impl {
    use critical_section::{set_impl, Impl, RawRestoreState};

    use crate::port::{Avr, Cpu};

    struct AvrCriticalSection;
    set_impl!(AvrCriticalSection);

    // Same masking as `CriticalSection`, so ecosystem crates (and
    // portable-atomic on this core) exclude the same interrupts.
    unsafe impl Impl for AvrCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            Avr.save_and_disable().interrupts_enabled()
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                Avr.enable_interrupts();
            }
        }
    }
}
