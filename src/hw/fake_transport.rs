use std::collections::VecDeque;
use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use bon::Builder;

use super::transport::{Transport, TransportError};
use crate::error::FixtureError;
use crate::protocol::{EOT, ETX, PREAMBLE, SOH, STX};

/// Address field a sign echoes in its replies.
const REPLY_ADDRESS_FIELD: &[u8] = b"000";

/// Shared record of every frame written to a [`FakeTransport`].
#[derive(Debug, Clone, Default)]
pub struct WireLog {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl WireLog {
    /// Returns every written frame, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent written frame.
    #[must_use]
    pub fn last(&self) -> Option<Vec<u8>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn push(&self, frame: &[u8]) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.to_vec());
    }
}

/// Scripted incoming byte chunks parsed from comma-separated hex.
#[derive(Debug, Clone, Default, derive_more::Into)]
pub struct ResponseFixture {
    chunks: Vec<Vec<u8>>,
}

impl FromStr for ResponseFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let chunks = value
            .split(',')
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                hex::decode(chunk).map_err(|source| FixtureError::InvalidHex {
                    chunk: chunk.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if chunks.is_empty() {
            return Err(FixtureError::EmptyFixture);
        }
        Ok(Self { chunks })
    }
}

/// In-memory transport that records writes and replays scripted reads.
///
/// Each call to [`Transport::read_available`] yields the next scripted chunk,
/// then nothing once the script is exhausted.
#[derive(Debug, Builder)]
pub struct FakeTransport {
    #[builder(default, into)]
    incoming: VecDeque<Vec<u8>>,
    #[builder(default)]
    log: WireLog,
    /// Fail every write with a broken-pipe error.
    #[builder(default)]
    fail_writes: bool,
}

impl FakeTransport {
    /// Creates a fake transport that replays `fixture`.
    #[must_use]
    pub fn from_fixture(fixture: ResponseFixture) -> Self {
        Self::builder()
            .incoming(Vec::<Vec<u8>>::from(fixture))
            .build()
    }

    /// Returns a handle onto the frames written so far.
    #[must_use]
    pub fn wire_log(&self) -> WireLog {
        self.log.clone()
    }
}

impl Transport for FakeTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
        }
        self.log.push(bytes);
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        Ok(self.incoming.pop_front().unwrap_or_default())
    }
}

/// Builds a complete reply frame as a sign would send it, checksum included.
///
/// ```
/// let reply = ledsign::sign_reply(b"GB:3");
/// assert_eq!(b"\x00\x00\x00\x00\x00\x01000\x02GB:3\x03", &reply[..15]);
/// assert_eq!(Some(&0x04), reply.last());
/// ```
#[must_use]
pub fn sign_reply(body: &[u8]) -> Vec<u8> {
    let mut checked = vec![SOH];
    checked.extend_from_slice(REPLY_ADDRESS_FIELD);
    checked.push(STX);
    checked.extend_from_slice(body);
    checked.push(ETX);
    let checksum = checked
        .iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)));

    let mut frame = PREAMBLE.to_vec();
    frame.extend_from_slice(&checked);
    frame.extend_from_slice(format!("{checksum:04X}").as_bytes());
    frame.push(EOT);
    frame
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fake_transport_replays_chunks_then_goes_quiet() {
        let mut transport = FakeTransport::builder()
            .incoming(vec![b"ab".to_vec(), b"c".to_vec()])
            .build();
        assert_eq!(b"ab".to_vec(), transport.read_available().expect("read"));
        assert_eq!(b"c".to_vec(), transport.read_available().expect("read"));
        assert!(transport.read_available().expect("read").is_empty());
    }

    #[test]
    fn wire_log_is_shared_with_handles() {
        let mut transport = FakeTransport::builder().build();
        let log = transport.wire_log();
        transport.write_all(b"one").expect("write");
        transport.write_all(b"two").expect("write");
        assert_eq!(vec![b"one".to_vec(), b"two".to_vec()], log.frames());
        assert_eq!(Some(b"two".to_vec()), log.last());
    }

    #[test]
    fn failing_writes_are_not_logged() {
        let mut transport = FakeTransport::builder().fail_writes(true).build();
        let log = transport.wire_log();
        assert_matches!(transport.write_all(b"x"), Err(TransportError::Io(_)));
        assert!(log.frames().is_empty());
    }

    #[test]
    fn fixture_parses_comma_separated_hex() {
        let fixture: ResponseFixture = "0001, 0204,".parse().expect("fixture should parse");
        let chunks: Vec<Vec<u8>> = fixture.into();
        assert_eq!(vec![vec![0x00, 0x01], vec![0x02, 0x04]], chunks);
    }

    #[test]
    fn fixture_transport_replays_chunks_in_order() {
        let fixture: ResponseFixture = "01,02,03".parse().expect("fixture should parse");
        let mut transport = FakeTransport::from_fixture(fixture);
        let replayed = (0..4)
            .map(|_| transport.read_available().expect("read"))
            .collect::<Vec<_>>();
        assert_eq!(vec![vec![0x01], vec![0x02], vec![0x03], Vec::new()], replayed);
    }

    #[test]
    fn fixture_rejects_bad_hex() {
        assert_matches!(
            "0g".parse::<ResponseFixture>(),
            Err(FixtureError::InvalidHex { chunk, .. }) if chunk == "0g"
        );
        assert_matches!("".parse::<ResponseFixture>(), Err(FixtureError::EmptyFixture));
    }

    #[test]
    fn sign_reply_checksums_from_start_of_header_to_end_of_text() {
        let reply = sign_reply(b"E-V");
        // 01 + "000" + 02 + "E-V" + 03
        let sum: u16 = 0x01 + 3 * 0x30 + 0x02 + 0x45 + 0x2D + 0x56 + 0x03;
        let expected_trailer = format!("{sum:04X}");
        assert_eq!(expected_trailer.as_bytes(), &reply[reply.len() - 5..reply.len() - 1]);
    }
}
