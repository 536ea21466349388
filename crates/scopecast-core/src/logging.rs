#![forbid(unsafe_code)]

//! Logging shim.
//!
//! With the `tracing` feature the macros below forward to `tracing`. Without
//! it they expand to nothing, but still type-check their arguments so that
//! builds with and without the feature see the same code.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __scopecast_trace {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __scopecast_debug {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

#[cfg(not(feature = "tracing"))]
pub(crate) use crate::__scopecast_debug as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use crate::__scopecast_trace as trace;
