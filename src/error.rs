use derive_more::From;
use thiserror::Error;

use crate::handlers::{
    ConfigurationError, FormatError, LabelError, PictureError, ResponseError,
};
use crate::hw::TransportError;

/// Errors returned when parsing fake transport fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("the fake response fixture is empty")]
    EmptyFixture,
    #[error("fixture chunk `{chunk}` is not valid hexadecimal")]
    InvalidHex {
        chunk: String,
        source: hex::FromHexError,
    },
}

/// Errors returned when validating command-line options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("a serial port is required unless --fake is given")]
    MissingPort,
    #[error("invalid page definition `{value}`: {reason}")]
    InvalidPageDefinition { value: String, reason: String },
    #[error("picture file `{path}` could not be read")]
    PictureFile {
        path: String,
        source: std::io::Error,
    },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level protocol errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(LabelError, Box<LabelError>)]
    Label(Box<LabelError>),
    #[error(transparent)]
    #[from(FormatError, Box<FormatError>)]
    Format(Box<FormatError>),
    #[error(transparent)]
    #[from(ConfigurationError, Box<ConfigurationError>)]
    Configuration(Box<ConfigurationError>),
    #[error(transparent)]
    #[from(PictureError, Box<PictureError>)]
    Picture(Box<PictureError>),
    #[error(transparent)]
    #[from(TransportError, Box<TransportError>)]
    Transport(Box<TransportError>),
    #[error(transparent)]
    #[from(ResponseError, Box<ResponseError>)]
    Response(Box<ResponseError>),
}
