//! Logging macros for the port layer
//!
//! Forward to `defmt` when the `defmt` feature is on; the application
//! supplies the global logger. Without it the arguments are type-checked
//! but never evaluated, so nothing is formatted or linked.

#[cfg(feature = "defmt")]
#[doc(hidden)]
#[macro_export]
macro_rules! __port_log {
    ($level:ident, $($arg:tt)*) => { defmt::$level!($($arg)*) };
}

#[cfg(not(feature = "defmt"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __port_log {
    ($level:ident, $($arg:tt)*) => {{
        if false {
            let _ = ($($arg)*);
        }
    }};
}

/// Trace message
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__port_log!(trace, $($arg)*) };
}

/// Debug message
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__port_log!(debug, $($arg)*) };
}

/// Info message
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__port_log!(info, $($arg)*) };
}

/// Warning message
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__port_log!(warn, $($arg)*) };
}

/// Error message
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__port_log!(error, $($arg)*) };
}
