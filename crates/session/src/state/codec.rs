//! Binary layout of a persisted [`State`].
//!
//! All integers are big-endian.
//!
//! ```text
//! magic        4 bytes  "HOFS"
//! version      u8       FORMAT_VERSION
//! role         u8       0 client, 1 server
//! engine id    u8 length, then UTF-8 bytes
//! transcript   u32 length, then bytes
//! entropy      u32 length, then bytes
//! in_seq       8 bytes
//! out_seq      8 bytes
//! ```
//!
//! The engine id lets a resume detect a snapshot taken by a different engine
//! or protocol revision before any bytes are replayed.

use handshake::{Role, SequenceCounters};
use thiserror::Error;
use zeroize::Zeroizing;

use super::State;

/// Leading bytes of every encoded snapshot.
pub const MAGIC: [u8; 4] = *b"HOFS";

/// Layout revision written by [`State::encode`].
pub const FORMAT_VERSION: u8 = 1;

/// Largest transcript or entropy buffer accepted.
pub const MAX_FIELD_LEN: usize = 16 * 1024 * 1024;

/// Errors produced while decoding a snapshot.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum StateDecodeError {
    /// The input does not start with [`MAGIC`].
    #[error("not a handoff state: bad magic {0:02x?}")]
    BadMagic([u8; 4]),
    /// The layout revision is not one this build understands.
    #[error("unsupported state format version {0}")]
    UnsupportedVersion(u8),
    /// The role byte is neither client nor server.
    #[error("unknown role byte {0}")]
    UnknownRole(u8),
    /// The engine id is not UTF-8.
    #[error("engine id is not valid UTF-8")]
    EngineIdNotUtf8,
    /// The input ended inside a field.
    #[error("state truncated in {field}: need {needed} bytes, have {available}")]
    Truncated {
        /// Field being read.
        field: &'static str,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },
    /// A length prefix exceeds [`MAX_FIELD_LEN`].
    #[error("{field} length {len} exceeds limit of {max}", max = MAX_FIELD_LEN)]
    FieldTooLong {
        /// Field whose length is too large.
        field: &'static str,
        /// Declared length.
        len: usize,
    },
    /// Bytes remain after the last field.
    #[error("{0} trailing bytes after state")]
    TrailingBytes(usize),
}

/// Errors produced while encoding a snapshot.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum StateEncodeError {
    /// The engine id does not fit its one-byte length prefix.
    #[error("engine id of {0} bytes exceeds 255")]
    EngineIdTooLong(usize),
    /// A buffer exceeds [`MAX_FIELD_LEN`].
    #[error("{field} of {len} bytes exceeds limit of {max}", max = MAX_FIELD_LEN)]
    FieldTooLong {
        /// Field that is too large.
        field: &'static str,
        /// Actual length.
        len: usize,
    },
}

impl State {
    /// Serializes the snapshot. The output holds key material and is zeroized on drop.
    pub fn encode(&self) -> Result<Zeroizing<Vec<u8>>, StateEncodeError> {
        let id_len = u8::try_from(self.engine_id.len())
            .map_err(|_| StateEncodeError::EngineIdTooLong(self.engine_id.len()))?;
        let transcript_len = field_len("transcript", self.transcript.len())?;
        let entropy_len = field_len("entropy", self.entropy.len())?;

        let capacity = MAGIC.len()
            + 3
            + self.engine_id.len()
            + 8
            + self.transcript.len()
            + self.entropy.len()
            + 16;
        let mut out = Zeroizing::new(Vec::with_capacity(capacity));
        out.extend_from_slice(&MAGIC);
        out.push(FORMAT_VERSION);
        out.push(self.role.as_u8());
        out.push(id_len);
        out.extend_from_slice(self.engine_id.as_bytes());
        out.extend_from_slice(&transcript_len.to_be_bytes());
        out.extend_from_slice(&self.transcript);
        out.extend_from_slice(&entropy_len.to_be_bytes());
        out.extend_from_slice(&self.entropy);
        out.extend_from_slice(&self.counters.inbound);
        out.extend_from_slice(&self.counters.outbound);
        Ok(out)
    }

    /// Parses a snapshot produced by [`State::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, StateDecodeError> {
        let mut input = Input { bytes };

        let magic: [u8; 4] = input.array("magic")?;
        if magic != MAGIC {
            return Err(StateDecodeError::BadMagic(magic));
        }
        let [version] = input.array("version")?;
        if version != FORMAT_VERSION {
            return Err(StateDecodeError::UnsupportedVersion(version));
        }
        let [role] = input.array("role")?;
        let role = Role::from_u8(role).ok_or(StateDecodeError::UnknownRole(role))?;

        let [id_len] = input.array("engine id length")?;
        let engine_id = std::str::from_utf8(input.take("engine id", usize::from(id_len))?)
            .map_err(|_| StateDecodeError::EngineIdNotUtf8)?;

        let transcript = input.field("transcript")?;
        let entropy = input.field("entropy")?;
        let inbound = input.array("in_seq")?;
        let outbound = input.array("out_seq")?;

        if !input.bytes.is_empty() {
            return Err(StateDecodeError::TrailingBytes(input.bytes.len()));
        }

        Ok(Self::from_recorded(
            role,
            engine_id,
            transcript,
            entropy,
            SequenceCounters::new(inbound, outbound),
        ))
    }
}

fn field_len(field: &'static str, len: usize) -> Result<u32, StateEncodeError> {
    if len > MAX_FIELD_LEN {
        return Err(StateEncodeError::FieldTooLong { field, len });
    }
    u32::try_from(len).map_err(|_| StateEncodeError::FieldTooLong { field, len })
}

struct Input<'a> {
    bytes: &'a [u8],
}

impl<'a> Input<'a> {
    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], StateDecodeError> {
        if self.bytes.len() < len {
            return Err(StateDecodeError::Truncated {
                field,
                needed: len,
                available: self.bytes.len(),
            });
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], StateDecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    fn field(&mut self, field: &'static str) -> Result<Zeroizing<Vec<u8>>, StateDecodeError> {
        let len = u32::from_be_bytes(self.array(field)?) as usize;
        if len > MAX_FIELD_LEN {
            return Err(StateDecodeError::FieldTooLong { field, len });
        }
        Ok(Zeroizing::new(self.take(field, len)?.to_vec()))
    }
}
