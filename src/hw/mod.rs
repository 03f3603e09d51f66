mod fake_transport;
mod session;
mod transport;

pub use self::fake_transport::{FakeTransport, ResponseFixture, WireLog, sign_reply};
pub use self::session::{DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT, SessionConfig, SignSession};
pub use self::transport::{
    DEFAULT_BAUD_RATE, PollableStream, READ_POLL_TIMEOUT, StreamTransport, Transport, TransportError,
};
