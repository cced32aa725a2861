//! The sealed reference engine.
//!
//! A deliberately small protocol with the shape resumption needs:
//!
//! ```text
//! client                                  server
//!   ClientHello(version, random, share) ->
//!                                      <- ServerHello(version, random, share)
//!                                      <- Finished(server verify)
//!   Finished(client verify)             ->
//!   Data / Close records               <->
//! ```
//!
//! Every frame is `[type u8][length u16 BE][body]`. Keys come from X25519 over
//! the two shares, optionally mixed with a pre-shared key, expanded with
//! HKDF-SHA256 salted by the hash of both hellos. Records are sealed with
//! ChaCha20-Poly1305; the nonce is the direction IV XOR the 8-byte big-endian
//! record counter, and the frame header is authenticated as associated data.
//!
//! Each handshake draws [`ENTROPY_PER_HANDSHAKE`] bytes from the engine's
//! entropy source in one read: the 32-byte hello random, then the 32-byte
//! key-share secret.

use std::fmt;
use std::io::{Read, Write};

use zeroize::Zeroizing;

use crate::contract::{Capabilities, EngineFactory};
use crate::error::{EngineError, EngineResult};
use crate::role::Role;

mod engine;
mod frame;
mod messages;
mod record;
mod schedule;

#[cfg(all(test, unix))]
mod tests;

pub use engine::SealedEngine;

/// Identifier recorded in snapshots taken from sealed engines.
pub const SEALED_ENGINE_ID: &str = "sealed/1";

/// Protocol version carried in both hellos.
pub const PROTOCOL_VERSION: u8 = 1;

/// Default largest plaintext carried by one record.
pub const DEFAULT_MAX_RECORD: usize = 16 * 1024;

/// Largest plaintext a record can carry once the tag is added.
pub const MAX_RECORD_LIMIT: usize = frame::MAX_FRAME_BODY - record::TAG_LEN;

/// Bytes of entropy consumed by one handshake.
pub const ENTROPY_PER_HANDSHAKE: usize = 64;

/// Configuration and factory for [`SealedEngine`].
///
/// Both ends must agree on the pre-shared key and should agree on the record
/// limit; a record larger than the reader's limit is rejected.
#[derive(Clone)]
pub struct SealedConfig {
    psk: Option<Zeroizing<[u8; 32]>>,
    max_record: usize,
}

impl Default for SealedConfig {
    fn default() -> Self {
        Self {
            psk: None,
            max_record: DEFAULT_MAX_RECORD,
        }
    }
}

impl SealedConfig {
    /// Default configuration: no pre-shared key, 16 KiB records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mixes a pre-shared key into the key schedule.
    #[must_use]
    pub fn with_psk(mut self, psk: [u8; 32]) -> Self {
        self.psk = Some(Zeroizing::new(psk));
        self
    }

    /// Sets the largest plaintext per record.
    #[must_use]
    pub const fn with_max_record(mut self, max_record: usize) -> Self {
        self.max_record = max_record;
        self
    }

    /// The pre-shared key, if any.
    pub fn psk(&self) -> Option<&[u8; 32]> {
        self.psk.as_deref()
    }

    /// Largest plaintext per record.
    pub const fn max_record(&self) -> usize {
        self.max_record
    }

    /// Checks the record limit fits the frame format.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_record == 0 {
            return Err(EngineError::InvalidConfig("record limit must be non-zero"));
        }
        if self.max_record > MAX_RECORD_LIMIT {
            return Err(EngineError::InvalidConfig(
                "record limit exceeds the frame format",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SealedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedConfig")
            .field("psk", &self.psk.as_ref().map(|_| "<redacted>"))
            .field("max_record", &self.max_record)
            .finish()
    }
}

impl EngineFactory for SealedConfig {
    type Engine<S: Read + Write, E: Read> = SealedEngine<S, E>;

    fn engine_id(&self) -> &'static str {
        SEALED_ENGINE_ID
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }

    fn build<S: Read + Write, E: Read>(
        &self,
        role: Role,
        stream: S,
        entropy: E,
    ) -> EngineResult<SealedEngine<S, E>> {
        self.validate()?;
        Ok(SealedEngine::new(self.clone(), role, stream, entropy))
    }
}
