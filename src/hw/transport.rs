use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;
use tracing::instrument;

/// Default line speed of the sign bus.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Longest a single read waits for bytes before reporting none.
pub const READ_POLL_TIMEOUT: Duration = Duration::from_millis(50);
const READ_CHUNK_LEN: usize = 256;

/// Errors raised by the byte transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial transport I/O failed")]
    Io(#[from] io::Error),
    #[error("failed to open serial device `{path}`")]
    Open {
        path: PathBuf,
        source: serialport::Error,
    },
}

/// Byte pipe to the sign bus.
///
/// Implementations own the underlying device for their whole lifetime.
pub trait Transport: Send {
    /// Writes every byte of `bytes`, blocking until the device accepts them.
    ///
    /// # Errors
    ///
    /// Returns an error when the device rejects the write.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Returns whatever bytes are currently buffered, possibly none.
    ///
    /// Must not block indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error when the device read fails.
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// Byte stream whose blocking reads can be bounded by a timeout.
pub trait PollableStream: Read + Write + Send {
    /// Caps how long one `read` call may wait for data.
    ///
    /// # Errors
    ///
    /// Returns an error when the stream rejects the timeout.
    fn set_poll_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl PollableStream for Box<dyn SerialPort> {
    fn set_poll_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout)?;
        Ok(())
    }
}

impl PollableStream for TcpStream {
    fn set_poll_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }
}

#[cfg(unix)]
impl PollableStream for UnixStream {
    fn set_poll_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }
}

/// Transport over a pollable byte stream.
///
/// Reads that report `WouldBlock`, `TimedOut` or `Interrupted` count as
/// "nothing available yet".
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S>
where
    S: PollableStream,
{
    /// Wraps an already-open stream, capping each read at [`READ_POLL_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns an error when the stream rejects the read timeout.
    pub fn new(mut stream: S) -> Result<Self, TransportError> {
        stream.set_poll_timeout(READ_POLL_TIMEOUT)?;
        Ok(Self { stream })
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl StreamTransport<Box<dyn SerialPort>> {
    /// Opens a serial device at `baud_rate`, 8 data bits, no parity, one stop
    /// bit and no flow control.
    ///
    /// # Errors
    ///
    /// Returns an error when the device cannot be opened or configured.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open_serial(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let port = serialport::new(path.to_string_lossy(), baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_POLL_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(baud_rate, "opened serial line");
        Self::new(port)
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: PollableStream,
{
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut buffer = [0u8; READ_CHUNK_LEN];
        match self.stream.read(&mut buffer) {
            Ok(read) => Ok(buffer[..read].to_vec()),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Instant;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    impl PollableStream for Cursor<Vec<u8>> {
        fn set_poll_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    /// Stream whose reads always report `WouldBlock`.
    struct IdleStream;

    impl Read for IdleStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    impl Write for IdleStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl PollableStream for IdleStream {
        fn set_poll_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    /// Stream that refuses any read timeout.
    #[derive(Debug)]
    struct UnboundedStream;

    impl Read for UnboundedStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for UnboundedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl PollableStream for UnboundedStream {
        fn set_poll_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Err(io::ErrorKind::Unsupported.into())
        }
    }

    /// Stream whose reads fail outright.
    struct BrokenStream;

    impl Read for BrokenStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    impl Write for BrokenStream {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl PollableStream for BrokenStream {
        fn set_poll_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_transport_reads_buffered_bytes() {
        let mut transport = StreamTransport::new(Cursor::new(b"\x01abc".to_vec()))
            .expect("cursor should accept a poll timeout");
        let read = transport
            .read_available()
            .expect("cursor read should succeed");
        assert_eq!(b"\x01abc".to_vec(), read);
        let drained = transport
            .read_available()
            .expect("exhausted cursor read should succeed");
        assert!(drained.is_empty());
    }

    #[test]
    fn stream_transport_writes_into_stream() {
        let mut transport = StreamTransport::new(Cursor::new(Vec::new()))
            .expect("cursor should accept a poll timeout");
        transport
            .write_all(b"frame")
            .expect("cursor write should succeed");
        assert_eq!(b"frame".to_vec(), transport.into_inner().into_inner());
    }

    #[test]
    fn would_block_reads_as_nothing_available() {
        let mut transport =
            StreamTransport::new(IdleStream).expect("idle stream should accept a poll timeout");
        let read = transport
            .read_available()
            .expect("would-block should not be an error");
        assert!(read.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn silent_socket_read_returns_within_the_poll_timeout() {
        let (ours, _peer) = UnixStream::pair().expect("socket pair should open");
        let mut transport =
            StreamTransport::new(ours).expect("socket should accept a poll timeout");

        let started = Instant::now();
        let read = transport
            .read_available()
            .expect("a silent socket should read as empty");

        assert!(read.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[cfg(unix)]
    #[test]
    fn socket_read_returns_bytes_sent_by_the_peer() {
        let (ours, mut peer) = UnixStream::pair().expect("socket pair should open");
        let mut transport =
            StreamTransport::new(ours).expect("socket should accept a poll timeout");

        peer.write_all(b"\x01reply")
            .expect("peer write should succeed");

        assert_eq!(
            b"\x01reply".to_vec(),
            transport
                .read_available()
                .expect("socket read should succeed")
        );
    }

    #[test]
    fn streams_without_a_read_timeout_are_rejected() {
        assert_matches!(
            StreamTransport::new(UnboundedStream),
            Err(TransportError::Io(error)) if error.kind() == io::ErrorKind::Unsupported
        );
    }

    #[test]
    fn hard_io_errors_propagate() {
        let mut transport =
            StreamTransport::new(BrokenStream).expect("broken stream should accept a poll timeout");
        assert_matches!(transport.read_available(), Err(TransportError::Io(_)));
        assert_matches!(transport.write_all(b"x"), Err(TransportError::Io(_)));
    }
}
