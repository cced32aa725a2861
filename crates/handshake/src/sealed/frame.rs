use std::io::{self, Read, Write};

use logging::trace_engine;

use crate::error::{EngineError, EngineResult};

/// Bytes in a frame header: type, then big-endian body length.
pub(crate) const HEADER_LEN: usize = 3;

/// Largest body a frame can describe.
pub(crate) const MAX_FRAME_BODY: usize = u16::MAX as usize;

/// Handshake bodies are small; anything larger is malformed.
const MAX_HANDSHAKE_BODY: usize = 256;

/// Frame types. Handshake frames travel in the clear, the rest are sealed records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum FrameKind {
    ClientHello = 0x01,
    ServerHello = 0x02,
    Finished = 0x14,
    Close = 0x15,
    Data = 0x17,
}

impl FrameKind {
    pub(crate) const fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::ClientHello => "client hello",
            Self::ServerHello => "server hello",
            Self::Finished => "finished",
            Self::Close => "close notify",
            Self::Data => "application data",
        }
    }
}

/// A frame exactly as it was read, header included.
#[derive(Debug)]
pub(crate) struct Frame {
    header: [u8; HEADER_LEN],
    body: Vec<u8>,
}

impl Frame {
    pub(crate) const fn kind(&self) -> u8 {
        self.header[0]
    }

    pub(crate) const fn header(&self) -> &[u8; HEADER_LEN] {
        &self.header
    }

    pub(crate) fn body(&self) -> &[u8] {
        &self.body
    }

    /// Header and body concatenated, as hashed into the handshake transcript.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.body.len());
        bytes.extend_from_slice(&self.header);
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Fails unless the frame has type `kind`.
    pub(crate) fn expect_kind(self, kind: FrameKind) -> EngineResult<Self> {
        if self.kind() == kind.as_u8() {
            Ok(self)
        } else {
            Err(EngineError::UnexpectedMessage {
                expected: kind.name(),
                found: self.kind(),
            })
        }
    }
}

pub(crate) fn encode_header(kind: FrameKind, body_len: usize) -> EngineResult<[u8; HEADER_LEN]> {
    let len = u16::try_from(body_len).map_err(|_| EngineError::RecordTooLarge {
        len: body_len,
        max: MAX_FRAME_BODY,
    })?;
    let [high, low] = len.to_be_bytes();
    Ok([kind.as_u8(), high, low])
}

/// Writes one frame and returns its bytes for transcript hashing.
pub(crate) fn write_frame<W: Write>(
    stream: &mut W,
    kind: FrameKind,
    body: &[u8],
) -> EngineResult<Vec<u8>> {
    let header = encode_header(kind, body.len())?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(body);
    stream.write_all(&bytes)?;
    trace_engine!(kind = kind.name(), len = body.len(), "frame sent");
    Ok(bytes)
}

/// Reads one frame with exact-length reads.
///
/// Returns `None` when the stream ends cleanly before a header starts.
pub(crate) fn read_frame<R: Read>(stream: &mut R, max_body: usize) -> EngineResult<Option<Frame>> {
    let mut header = [0u8; HEADER_LEN];
    loop {
        match stream.read(&mut header[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    stream.read_exact(&mut header[1..])?;

    let len = usize::from(u16::from_be_bytes([header[1], header[2]]));
    if len > max_body {
        return Err(EngineError::RecordTooLarge { len, max: max_body });
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body)?;
    trace_engine!(kind = header[0], len, "frame received");
    Ok(Some(Frame { header, body }))
}

/// Reads a handshake frame of type `kind`; a closed stream is an error here.
pub(crate) fn read_handshake_frame<R: Read>(
    stream: &mut R,
    kind: FrameKind,
) -> EngineResult<Frame> {
    match read_frame(stream, MAX_HANDSHAKE_BODY)? {
        Some(frame) => frame.expect_kind(kind),
        None => Err(EngineError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed during handshake",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn frames_round_trip_through_a_stream() {
        let mut wire = Vec::new();
        let sent = write_frame(&mut wire, FrameKind::ServerHello, b"body").expect("write");
        assert_eq!(sent, wire);
        assert_eq!(&wire[..HEADER_LEN], &[0x02, 0x00, 0x04]);

        let frame = read_frame(&mut Cursor::new(wire), 16)
            .expect("read")
            .expect("frame present");
        assert_eq!(frame.body(), b"body");
        assert_eq!(frame.to_bytes(), sent);
    }

    #[test]
    fn clean_end_of_stream_yields_none() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut empty, 16).expect("clean eof").is_none());
    }

    #[test]
    fn truncated_body_is_an_io_error() {
        let mut short = Cursor::new(vec![0x17u8, 0x00, 0x08, 1, 2]);
        let err = read_frame(&mut short, 16).expect_err("body truncated");
        assert!(err.is_io());
    }

    #[test]
    fn oversized_frames_are_rejected_before_reading_the_body() {
        let mut wire = Cursor::new(vec![0x17u8, 0x01, 0x00]);
        let err = read_frame(&mut wire, 16).expect_err("too large");
        assert!(matches!(err, EngineError::RecordTooLarge { len: 256, max: 16 }));
        assert_eq!(wire.position(), 3);
    }

    #[test]
    fn wrong_handshake_frame_type_is_unexpected() {
        let mut wire = Vec::new();
        write_frame(&mut wire, FrameKind::Finished, &[0u8; 32]).expect("write");
        let err = read_handshake_frame(&mut Cursor::new(wire), FrameKind::ServerHello)
            .expect_err("finished is not a server hello");
        assert!(matches!(
            err,
            EngineError::UnexpectedMessage {
                expected: "server hello",
                found: 0x14
            }
        ));
    }

    proptest! {
        #[test]
        fn reads_stop_at_the_declared_body(
            body in proptest::collection::vec(any::<u8>(), 0..300),
            trailing in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let mut wire = Vec::new();
            write_frame(&mut wire, FrameKind::Data, &body).expect("write");
            let frame_len = wire.len();
            wire.extend_from_slice(&trailing);

            let mut cursor = Cursor::new(wire);
            let frame = read_frame(&mut cursor, MAX_FRAME_BODY)
                .expect("read")
                .expect("frame present");
            prop_assert_eq!(frame.body(), body.as_slice());
            prop_assert_eq!(cursor.position(), frame_len as u64);
        }
    }
}
