//! Error types for the AVR port
//!
//! The hardware paths cannot fail; errors only come from checked
//! conversions of raw values supplied by the caller.

/// Port error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum PortError {
    /// Raw watchdog timeout class outside 0..=9
    InvalidTimeout = 1,
}

/// Result type alias for port operations
pub type PortResult<T> = Result<T, PortError>;
