//! Convenience macros for handoff-specific tracing.
//!
//! These macros provide ergonomic wrappers around standard tracing macros
//! with the targets defined in [`crate::targets`].

/// Emit a capture trace.
///
/// # Example
/// ```ignore
/// trace_capture!(captured = len, "duplicating source detached");
/// ```
#[macro_export]
macro_rules! trace_capture {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: $crate::targets::CAPTURE, $($arg)*);
    };
}

/// Emit a replay trace.
///
/// # Example
/// ```ignore
/// trace_replay!(consumed = n, "replay prefix drained");
/// ```
#[macro_export]
macro_rules! trace_replay {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: $crate::targets::REPLAY, $($arg)*);
    };
}

/// Emit a replay warning.
///
/// Used when a replay source falls through to its live source, which signals
/// a transcript that does not cover the whole handshake.
///
/// # Example
/// ```ignore
/// warn_replay!(requested = buf.len(), "replay prefix exhausted");
/// ```
#[macro_export]
macro_rules! warn_replay {
    ($($arg:tt)*) => {
        ::tracing::warn!(target: $crate::targets::REPLAY, $($arg)*);
    };
}

/// Emit a session lifecycle trace.
///
/// # Example
/// ```ignore
/// trace_session!(role = %role, "handshake complete");
/// ```
#[macro_export]
macro_rules! trace_session {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: $crate::targets::SESSION, $($arg)*);
    };
}

/// Emit an engine trace.
///
/// # Example
/// ```ignore
/// trace_engine!(kind = frame.kind(), len = frame.len(), "handshake frame");
/// ```
#[macro_export]
macro_rules! trace_engine {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: $crate::targets::ENGINE, $($arg)*);
    };
}
