mod app;
mod cli;
mod error;
mod handlers;
mod hw;
mod protocol;
mod telemetry;
mod utils;

pub use app::{fake_transport, real_transport, run, run_with_log_level};
pub use cli::{
    Args, ChangeAddressArgs, Command, ConfigureArgs, FakeArgs, LogLevel, OutputFormat,
    ReadStringArgs, SerialArgs, TransportArgs, WritePictureArgs, WriteStringArgs, WriteTextArgs,
};
pub use error::{FixtureError, ProtocolError};
pub use handlers::{
    Address, CapabilityMask, ColorCode, ColorDepth, ConfigurationError, ConfigurationHandler,
    ConfigurationTransaction, FormatError, FormatNode, FormatRequest, FrameCodec, GroupKind,
    Label, LabelError, PageConfig, PageKind, PictureError, PictureGrid, PictureHandler,
    PixelColor, ResponseError, ResponseFrame, SignAdminHandler, SignSelector, SignType,
    StringPageHandler, TextWriteHandler, encode_hex, render_all,
};
pub use hw::{
    DEFAULT_BAUD_RATE, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT, FakeTransport,
    PollableStream, READ_POLL_TIMEOUT, ResponseFixture, SessionConfig, SignSession,
    StreamTransport, Transport, TransportError, WireLog, sign_reply,
};
pub use protocol::{AnimationMode, CommandCode};
