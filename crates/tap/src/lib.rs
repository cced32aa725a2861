#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `tap` houses the byte-stream wrappers that make a handshake reproducible.
//! A handshake has exactly two sources of nondeterminism: the bytes it reads
//! from the transport and the bytes it draws from the randomness source. The
//! wrappers here sit in front of both.
//!
//! # Design
//!
//! - [`TappedReader::duplicating`] passes reads through and appends every byte
//!   the caller actually received to a [`CaptureBuffer`].
//! - [`TappedReader::replaying`] serves reads from a recorded prefix held in a
//!   [`ReplayBuffer`] and only falls through to the live source once the prefix
//!   is exhausted. The [`FallbackPolicy`] decides whether that fall-through is
//!   allowed, logged, or refused.
//! - [`DiscardingSink`] swallows writes so a replayed handshake never
//!   re-transmits its messages.
//! - [`TappedStream`] combines a tapped read side with an optional discarding
//!   write side for bidirectional transports.
//!
//! Every wrapper is detachable: [`TappedReader::detach`] returns what the tap
//! observed and turns the wrapper into a pure pass-through, so application data
//! exchanged after the handshake is never captured or replayed.
//!
//! # Invariants
//!
//! - A duplicating tap records exactly the bytes returned to the caller, in
//!   order; bytes the inner source produced but the caller never saw cannot
//!   exist because reads go straight into the caller's buffer.
//! - A replay tap never reads the live source while prefix bytes remain.
//! - Captured and replayed buffers are zeroized when dropped.
//!
//! # Errors
//!
//! Taps sit behind [`std::io::Read`] and [`std::io::Write`] and therefore
//! surface [`std::io::Error`]. Under [`FallbackPolicy::Deny`] an exhausted
//! prefix yields [`std::io::ErrorKind::InvalidData`] carrying
//! [`PREFIX_EXHAUSTED_MSG`].
//!
//! # Examples
//!
//! Record a stream, then replay the recording without touching the live source.
//!
//! ```
//! use std::io::{Cursor, Read};
//! use tap::{FallbackPolicy, TapOutcome, TappedReader};
//!
//! let mut live = TappedReader::duplicating(Cursor::new(b"hello world".to_vec()));
//! let mut head = [0u8; 5];
//! live.read_exact(&mut head).unwrap();
//!
//! let TapOutcome::Captured(recorded) = live.detach() else { unreachable!() };
//! assert_eq!(&recorded[..], b"hello");
//!
//! let mut replay = TappedReader::replaying(
//!     Cursor::new(Vec::<u8>::new()),
//!     recorded.to_vec(),
//!     FallbackPolicy::Deny,
//! );
//! let mut again = [0u8; 5];
//! replay.read_exact(&mut again).unwrap();
//! assert_eq!(&again, b"hello");
//! ```

mod capture;
mod policy;
mod reader;
mod replay;
mod sink;
mod stream;

pub use capture::CaptureBuffer;
pub use policy::FallbackPolicy;
pub use reader::{TapOutcome, TappedReader};
pub use replay::{PREFIX_EXHAUSTED_MSG, ReplayBuffer, ReplaySummary};
pub use sink::DiscardingSink;
pub use stream::{StreamTapReport, TappedStream};
