//! Tracing targets used by the workspace crates.

/// Duplicating sources recording a live handshake.
pub const CAPTURE: &str = "handoff::capture";

/// Replay sources feeding a recorded prefix back into a handshake.
pub const REPLAY: &str = "handoff::replay";

/// Session lifecycle: construction, handshake outcome, counter injection.
pub const SESSION: &str = "handoff::session";

/// Engine internals: handshake messages and record protection.
pub const ENGINE: &str = "handoff::engine";

/// Every target, in the order above.
pub const ALL: [&str; 4] = [CAPTURE, REPLAY, SESSION, ENGINE];
