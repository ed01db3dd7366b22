//! L1 — synchronous length-prefixed frame I/O (spec.md §4.1).
//!
//! A frame on the wire is `[u32 little-endian length][u8 kind][payload]`
//! where `length = payload.len() + 1` (spec.md §3 "Frame").

use crate::constant::MAX_FRAME_LENGTH;
use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Implemented by the transport so [`FrameTransport::read_frame_with_deadline`]
/// can bound a single read (spec.md §4.1, §5 "deadline-bounded read ...
/// exclusively for the handshake and for heartbeat-style liveness checks").
pub trait ReadTimeout {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl ReadTimeout for crate::wire::stream::Stream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        crate::wire::stream::Stream::set_read_timeout(self, timeout)
    }
}

pub struct FrameTransport<S> {
    stream: S,
}

impl<S> FrameTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Write> FrameTransport<S> {
    /// Composes a 5-byte header `[u32 le length][u8 kind]` followed by
    /// `payload` and writes it in one call.
    pub fn write_frame(&mut self, kind: u8, payload: &[u8]) -> Result<()> {
        let length = payload
            .len()
            .checked_add(1)
            .and_then(|l| u32::try_from(l).ok())
            .ok_or_else(|| Error::Malformed("frame payload too large to encode".to_string()))?;
        if length > MAX_FRAME_LENGTH {
            return Err(Error::Malformed(format!(
                "frame payload of {length} bytes exceeds the {MAX_FRAME_LENGTH} byte safety cap"
            )));
        }

        let mut header = Vec::with_capacity(5 + payload.len());
        header.extend_from_slice(&length.to_le_bytes());
        header.push(kind);
        header.extend_from_slice(payload);
        self.stream.write_all(&header)?;
        self.stream.flush()?;
        Ok(())
    }
}

impl<S: Read> FrameTransport<S> {
    /// Reads a complete frame, looping (full-read semantics) until the
    /// 4+1+len bytes have been received.
    pub fn read_frame(&mut self) -> Result<(u8, Vec<u8>)> {
        let mut header = [0u8; 5];
        self.read_exact_classified(&mut header)?;

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if length == 0 || length > MAX_FRAME_LENGTH {
            return Err(Error::Malformed(format!(
                "declared frame length {length} is out of range (0, {MAX_FRAME_LENGTH}]"
            )));
        }
        let kind = header[4];

        let mut payload = vec![0u8; (length - 1) as usize];
        self.read_exact_classified(&mut payload)?;
        Ok((kind, payload))
    }

    fn read_exact_classified(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.stream.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(Error::TransportLost("peer closed mid-frame".to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                Err(Error::TransportLost(e.to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl<S: Read + ReadTimeout> FrameTransport<S> {
    /// Cancels the read after `timeout`, surfacing a distinguishable
    /// `Error::Timeout` (spec.md §4.1). Used only by the handshake and
    /// liveness checks (spec.md §5).
    pub fn read_frame_with_deadline(&mut self, timeout: Duration) -> Result<(u8, Vec<u8>)> {
        self.stream.set_read_timeout(Some(timeout))?;
        let result = self.read_frame();
        self.stream.set_read_timeout(None)?;
        match result {
            Err(Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Err(Error::Timeout(timeout.as_millis() as u64))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Default)]
    struct NoDeadline<S> {
        inner: S,
    }

    impl<S: Read> Read for NoDeadline<S> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }
    impl<S> ReadTimeout for NoDeadline<S> {
        fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn round_trips_a_frame() {
        let mut buf = Vec::new();
        {
            let mut out = FrameTransport::new(&mut buf);
            out.write_frame(0x80, b"hello").unwrap();
        }
        let mut reader = FrameTransport::new(Cursor::new(buf));
        let (kind, payload) = reader.read_frame().unwrap();
        assert_eq!(kind, 0x80);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn round_trips_an_empty_payload() {
        let mut buf = Vec::new();
        FrameTransport::new(&mut buf).write_frame(0x05, b"").unwrap();
        let (kind, payload) = FrameTransport::new(Cursor::new(buf)).read_frame().unwrap();
        assert_eq!(kind, 0x05);
        assert!(payload.is_empty());
    }

    #[test]
    fn rejects_zero_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_le_bytes());
        let err = FrameTransport::new(Cursor::new(buf)).read_frame().unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn rejects_length_over_safety_cap() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LENGTH + 1).to_le_bytes());
        buf.push(0x80);
        let err = FrameTransport::new(Cursor::new(buf)).read_frame().unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn peer_closed_mid_frame_is_transport_lost() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.push(0x80);
        // payload declared as 2 bytes but stream ends after 0 — incomplete frame.
        let err = FrameTransport::new(Cursor::new(buf)).read_frame().unwrap_err();
        assert!(matches!(err, Error::TransportLost(_)));
    }

    #[test]
    fn write_then_read_with_generic_deadline_wrapper_is_unaffected() {
        let mut buf = Vec::new();
        FrameTransport::new(&mut buf).write_frame(0x10, b"ping").unwrap();
        let mut reader = FrameTransport::new(NoDeadline {
            inner: Cursor::new(buf),
        });
        let (kind, payload) = reader.read_frame_with_deadline(Duration::from_millis(50)).unwrap();
        assert_eq!(kind, 0x10);
        assert_eq!(payload, b"ping");
    }
}
