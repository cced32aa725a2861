#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` fixes the tracing targets used across the handoff workspace and
//! installs a `tracing-subscriber` stack configured from [`LogConfig`].
//!
//! # Design
//!
//! Each subsystem logs under its own target so operators can raise the level
//! of a single concern, for example `handoff::replay=debug` to watch prefix
//! consumption during a resume. The `trace_*!` macros pin those targets so call
//! sites cannot drift.
//!
//! # Invariants
//!
//! - Handshake byte contents are never logged, only lengths and counts.
//! - [`init_tracing`] installs the global subscriber at most once; later calls
//!   report [`LogInitError::AlreadyInstalled`].
//!
//! # Examples
//!
//! ```
//! use logging::{LogConfig, targets};
//!
//! let config = LogConfig::default().with_filter("handoff::replay=debug");
//! assert_eq!(config.filter(), "handoff::replay=debug");
//! assert!(targets::ALL.contains(&targets::REPLAY));
//! ```

mod config;
mod init;
pub mod targets;
mod tracing_macros;

pub use config::{LOG_ENV_VAR, LogConfig};
pub use init::{LogInitError, build_filter, init_tracing};
