use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::error::{CliConfigError, FixtureError};
use crate::handlers::{Address, CapabilityMask, Label, LabelError, SignSelector};
use crate::hw::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT, ResponseFixture, SessionConfig};
use crate::protocol::AnimationMode;

/// Command-line options for the LED sign tool.
#[derive(Debug, Parser)]
#[command(name = "ledsign", about = "Drive LED signboards over a serial sign bus.")]
pub struct Args {
    /// Serial device node of the sign bus (e.g. `/dev/ttyUSB0`).
    #[arg(long, global = true)]
    port: Option<PathBuf>,
    /// Line speed of the serial device.
    #[arg(long, global = true, default_value_t = DEFAULT_BAUD_RATE)]
    baud_rate: u32,
    /// Bus address of the target sign (1-255); omit to broadcast.
    #[arg(long, global = true)]
    address: Option<Address>,
    /// The sign can flash text.
    #[arg(long, global = true)]
    supports_flash: bool,
    /// The sign can change text colour.
    #[arg(long, global = true)]
    supports_color: bool,
    /// How long read commands wait for a reply (e.g. `500ms`, `5s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    read_timeout: Option<Duration>,
    /// Log level override; takes precedence over `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output style; defaults to pretty on a terminal, JSON otherwise.
    #[arg(long, global = true, value_enum)]
    output_format: Option<OutputFormat>,
    /// Uses an in-memory fake transport instead of a serial device.
    #[arg(long, global = true)]
    fake: bool,
    /// Bytes the fake transport returns, as comma-separated hexadecimal chunks.
    #[arg(long, global = true, requires = "fake")]
    fake_response: Option<ResponseFixture>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use ledsign::{Args, Command};
    ///
    /// let args = Args::new(Command::ReadType);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            address: None,
            supports_flash: false,
            supports_color: false,
            read_timeout: None,
            log_level: None,
            output_format: None,
            fake: false,
            fake_response: None,
            command,
        }
    }

    /// Enables fake transport mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        self.fake = true;
        self.fake_response = fake.response;
        self
    }

    /// Binds the session to one sign address.
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Returns the requested log-level override.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the requested output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    /// Builds the session options selected on the command line.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::builder()
            .maybe_address(self.address)
            .capabilities(CapabilityMask::from_flags(
                self.supports_flash,
                self.supports_color,
            ))
            .read_timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
            .build()
    }

    /// Splits parsed CLI arguments into the command and the transport choice.
    ///
    /// # Errors
    ///
    /// Returns an error when neither `--port` nor `--fake` is given.
    pub fn into_command_and_transport_args(self) -> anyhow::Result<(Command, TransportArgs)> {
        let Args {
            port,
            baud_rate,
            fake,
            fake_response,
            command,
            ..
        } = self;

        let transport_args = if fake {
            TransportArgs::Fake(FakeArgs {
                response: fake_response,
            })
        } else {
            let Some(port) = port else {
                return Err(CliConfigError::MissingPort.into());
            };
            TransportArgs::Serial(SerialArgs {
                port,
                baud_rate,
            })
        };

        Ok((command, transport_args))
    }
}

/// Transport selected on the command line.
#[derive(Debug)]
pub enum TransportArgs {
    /// A serial device node.
    Serial(SerialArgs),
    /// The scripted in-memory transport.
    Fake(FakeArgs),
}

/// Serial device settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SerialArgs {
    port: PathBuf,
    baud_rate: u32,
}

impl SerialArgs {
    /// Returns the device node path.
    #[must_use]
    pub fn port(&self) -> &Path {
        &self.port
    }

    /// Returns the line speed.
    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

/// Fake transport arguments for programmatic runs.
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    response: Option<ResponseFixture>,
}

impl FakeArgs {
    pub(crate) fn into_response(self) -> Option<ResponseFixture> {
        self.response
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Erase every page definition on the sign.
    ClearConfig,
    /// Define text, string and picture pages in one transaction.
    Configure(ConfigureArgs),
    /// Write plain text to a text page.
    WriteText(WriteTextArgs),
    /// Write text to a string page.
    WriteString(WriteStringArgs),
    /// Write a picture read from a file of colour symbols (`-RGArga`).
    WritePicture(WritePictureArgs),
    /// Read the contents of a string page.
    ReadString(ReadStringArgs),
    /// Query the sign model.
    ReadType,
    /// Assign a new bus address and keep talking to it.
    ChangeAddress(ChangeAddressArgs),
    /// Configure and fill a text, string and picture page with sample content.
    Demo,
}

/// Arguments for `configure`.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigureArgs {
    /// Text page as `LABEL:SIZE` (e.g. `A:64`); repeatable.
    #[arg(long = "text", value_parser = parse_sized_page)]
    pub(crate) text_pages: Vec<SizedPage>,
    /// String page as `LABEL:SIZE` (e.g. `B:64`); repeatable.
    #[arg(long = "string", value_parser = parse_sized_page)]
    pub(crate) string_pages: Vec<SizedPage>,
    /// Picture page as `LABEL:WIDTHxHEIGHTxCOLORS` (e.g. `C:6x6x3`); repeatable.
    #[arg(long = "picture", value_parser = parse_picture_page)]
    pub(crate) picture_pages: Vec<PicturePage>,
}

/// Arguments for `write-text`.
#[derive(Debug, Clone, clap::Args)]
pub struct WriteTextArgs {
    /// Target text page label.
    pub(crate) label: Label,
    /// Text to display; `\n` starts a new display line.
    pub(crate) text: String,
    /// Animation mode by name (e.g. `scroll`, `slot-machine`) or wire code (e.g. `m`, `n9`).
    #[arg(long, value_parser = parse_mode, default_value_t = AnimationMode::default())]
    pub(crate) mode: AnimationMode,
    /// Drive the top and bottom line separately when the text has line breaks.
    #[arg(long)]
    pub(crate) split_lines: bool,
}

/// Arguments for `write-string`.
#[derive(Debug, Clone, clap::Args)]
pub struct WriteStringArgs {
    /// Target string page label.
    pub(crate) label: Label,
    /// Text to store.
    pub(crate) text: String,
}

/// Arguments for `write-picture`.
#[derive(Debug, Clone, clap::Args)]
pub struct WritePictureArgs {
    /// Target picture page label.
    pub(crate) label: Label,
    /// File with one row of colour symbols per line.
    pub(crate) file: PathBuf,
}

/// Arguments for `read-string`.
#[derive(Debug, Clone, clap::Args)]
pub struct ReadStringArgs {
    /// String page label to read.
    pub(crate) label: Label,
}

/// Arguments for `change-address`.
#[derive(Debug, Clone, clap::Args)]
pub struct ChangeAddressArgs {
    /// New bus address (1-255).
    pub(crate) new_address: Address,
    /// Only re-address signs of this model; defaults to every model.
    #[arg(long, value_parser = parse_selector)]
    pub(crate) model: Option<SignSelector>,
}

/// A text or string page definition given on the command line.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct SizedPage {
    pub(crate) label: Label,
    pub(crate) size: u16,
}

/// A picture page definition given on the command line.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct PicturePage {
    pub(crate) label: Label,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) colors: u8,
}

/// Logging verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Command output style.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON document per result.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

fn invalid_page_definition(value: &str, reason: impl ToString) -> String {
    CliConfigError::InvalidPageDefinition {
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .to_string()
}

fn split_label(value: &str) -> Result<(Label, &str), String> {
    let (label, rest) = value
        .split_once(':')
        .ok_or_else(|| invalid_page_definition(value, "expected `LABEL:...`"))?;
    let label = label
        .parse::<Label>()
        .map_err(|error: LabelError| invalid_page_definition(value, error))?;
    Ok((label, rest))
}

fn parse_sized_page(value: &str) -> Result<SizedPage, String> {
    let (label, size) = split_label(value)?;
    let size = size
        .parse::<u16>()
        .map_err(|error| invalid_page_definition(value, error))?;
    Ok(SizedPage { label, size })
}

fn parse_picture_page(value: &str) -> Result<PicturePage, String> {
    let (label, shape) = split_label(value)?;
    let parts = shape.split('x').collect::<Vec<_>>();
    let [width, height, colors] = parts.as_slice() else {
        return Err(invalid_page_definition(value, "expected `WIDTHxHEIGHTxCOLORS`"));
    };
    Ok(PicturePage {
        label,
        width: width
            .parse()
            .map_err(|error| invalid_page_definition(value, error))?,
        height: height
            .parse()
            .map_err(|error| invalid_page_definition(value, error))?,
        colors: colors
            .parse()
            .map_err(|error| invalid_page_definition(value, error))?,
    })
}

fn parse_mode(value: &str) -> Result<AnimationMode, String> {
    value
        .parse::<AnimationMode>()
        .or_else(|_error| AnimationMode::try_from(value.as_bytes()))
        .map_err(|error| error.to_string())
}

fn parse_selector(value: &str) -> Result<SignSelector, String> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(model), None) => SignSelector::model(model).map_err(|error| error.to_string()),
        _ => Err(format!("sign model `{value}` must be a single character")),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn label(value: char) -> Label {
        Label::new(value).expect("test label should be valid")
    }

    #[test]
    fn fake_response_requires_fake_mode() {
        let result = Args::try_parse_from(["ledsign", "--fake-response", "00", "read-type"]);

        let error = result.expect_err("--fake-response should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn serial_mode_requires_port() {
        let args = Args::try_parse_from(["ledsign", "clear-config"])
            .expect("arguments without a port should still parse");

        let error = args
            .into_command_and_transport_args()
            .expect_err("a missing port should be rejected");
        assert_eq!(
            "a serial port is required unless --fake is given",
            error.to_string()
        );
    }

    #[test]
    fn serial_mode_carries_port_and_speed() {
        let args = Args::try_parse_from([
            "ledsign",
            "--port",
            "/dev/ttyUSB0",
            "--baud-rate",
            "19200",
            "clear-config",
        ])
        .expect("serial arguments should parse");

        let (command, transport) = args
            .into_command_and_transport_args()
            .expect("serial arguments should resolve");
        assert_matches!(command, Command::ClearConfig);
        assert_matches!(
            transport,
            TransportArgs::Serial(serial)
                if serial.port() == Path::new("/dev/ttyUSB0") && serial.baud_rate() == 19200
        );
    }

    #[test]
    fn serial_mode_defaults_to_9600_baud() {
        let args = Args::try_parse_from(["ledsign", "--port", "/dev/ttyS0", "read-type"])
            .expect("serial arguments should parse");

        let (_command, transport) = args
            .into_command_and_transport_args()
            .expect("serial arguments should resolve");
        assert_matches!(transport, TransportArgs::Serial(serial) if serial.baud_rate() == 9600);
    }

    #[test]
    fn session_config_reflects_global_flags() {
        let args = Args::try_parse_from([
            "ledsign",
            "--fake",
            "--address",
            "2",
            "--supports-color",
            "--read-timeout",
            "250ms",
            "read-type",
        ])
        .expect("global flags should parse");

        let config = format!("{:?}", args.session_config());
        assert!(config.contains("address: Some(Address(2))"), "{config}");
        assert!(config.contains("read_timeout: 250ms"), "{config}");
    }

    #[rstest]
    #[case("0")]
    #[case("256")]
    #[case("two")]
    fn invalid_addresses_are_rejected(#[case] address: &str) {
        let result = Args::try_parse_from(["ledsign", "--fake", "--address", address, "read-type"]);
        assert_eq!(
            ErrorKind::ValueValidation,
            result.expect_err("address should be rejected").kind()
        );
    }

    #[test]
    fn configure_parses_page_definitions() {
        let args = Args::try_parse_from([
            "ledsign",
            "--fake",
            "configure",
            "--text",
            "A:64",
            "--string",
            "B:64",
            "--picture",
            "C:6x6x3",
        ])
        .expect("page definitions should parse");

        let (command, _transport) = args
            .into_command_and_transport_args()
            .expect("fake arguments should resolve");
        let Command::Configure(configure) = command else {
            panic!("expected configure command");
        };
        assert_eq!(
            vec![SizedPage {
                label: label('A'),
                size: 64
            }],
            configure.text_pages
        );
        assert_eq!(
            vec![SizedPage {
                label: label('B'),
                size: 64
            }],
            configure.string_pages
        );
        assert_eq!(
            vec![PicturePage {
                label: label('C'),
                width: 6,
                height: 6,
                colors: 3
            }],
            configure.picture_pages
        );
    }

    #[rstest]
    #[case("A64")]
    #[case("AB:64")]
    #[case("A:lots")]
    fn malformed_sized_pages_are_rejected(#[case] value: &str) {
        assert!(parse_sized_page(value).is_err());
    }

    #[rstest]
    #[case("C:6x6")]
    #[case("C:6x6x3x1")]
    #[case("C:wide")]
    fn malformed_picture_pages_are_rejected(#[case] value: &str) {
        assert!(parse_picture_page(value).is_err());
    }

    #[test]
    fn write_text_parses_animation_mode_names() {
        let args = Args::try_parse_from([
            "ledsign",
            "--fake",
            "write-text",
            "A",
            "Hello",
            "--mode",
            "slot-machine",
        ])
        .expect("write-text arguments should parse");

        let (command, _transport) = args
            .into_command_and_transport_args()
            .expect("fake arguments should resolve");
        assert_matches!(
            command,
            Command::WriteText(write) if write.mode == AnimationMode::SlotMachine
        );
    }

    #[rstest]
    #[case("hold", AnimationMode::Hold)]
    #[case("b", AnimationMode::Hold)]
    #[case("n9", AnimationMode::SlotMachine)]
    fn modes_parse_from_names_or_codes(#[case] value: &str, #[case] expected: AnimationMode) {
        assert_eq!(Ok(expected), parse_mode(value));
    }

    #[test]
    fn unknown_modes_name_the_rejected_code() {
        assert_eq!(
            Err("animation mode `x` is not a known mode".to_string()),
            parse_mode("x")
        );
    }

    #[test]
    fn change_address_accepts_model_selector() {
        assert_eq!(
            Ok(SignSelector::Model(b'V')),
            parse_selector("V")
        );
        assert!(parse_selector("VV").is_err());
    }

    #[test]
    fn log_level_maps_to_filter() {
        assert_eq!(LevelFilter::DEBUG, LogLevel::Debug.as_level_filter());
    }
}
