//! # Error Taxonomy
//!
//! Every fallible kernel operation reports one of four local, recoverable
//! conditions. None of them is fatal to the kernel itself; the external
//! initializer is expected to treat `ResourceExhausted` during system
//! bring-up as a startup abort.

use core::fmt;

/// Outcome of a fallible kernel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A creation request hit a compile-time table or pool limit.
    ResourceExhausted,
    /// Malformed input: oversize message, empty event mask, re-entrant
    /// or non-holder mutex operations, or a call that requires a running
    /// task when none exists.
    InvalidArgument,
    /// A bounded wait expired (or a no-wait request was unsatisfiable).
    Timeout,
    /// A no-wait send found the queue at capacity.
    Full,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KernelError::ResourceExhausted => "resource exhausted",
            KernelError::InvalidArgument => "invalid argument",
            KernelError::Timeout => "timeout",
            KernelError::Full => "queue full",
        };
        f.write_str(s)
    }
}

/// Shorthand result type used throughout the kernel API.
pub type KernelResult<T> = Result<T, KernelError>;
