use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use tracing::instrument;

use crate::cli::painter::Painter;
use crate::cli::{Command, FakeArgs, LogLevel, OutputFormat, SerialArgs};
use crate::hw::{FakeTransport, SessionConfig, SignSession, StreamTransport, Transport};
use crate::telemetry;

/// Opens the serial device described by `serial`.
///
/// # Errors
///
/// Returns an error when the line cannot be configured or the device cannot
/// be opened.
pub fn real_transport(serial: &SerialArgs) -> Result<Box<dyn Transport>> {
    let transport = StreamTransport::open_serial(serial.port(), serial.baud_rate())
        .with_context(|| format!("opening sign bus at `{}`", serial.port().display()))?;
    Ok(Box::new(transport))
}

/// Creates an in-memory transport that replays the fake response fixture.
#[must_use]
pub fn fake_transport(fake_args: FakeArgs) -> Box<dyn Transport> {
    match fake_args.into_response() {
        Some(fixture) => Box::new(FakeTransport::from_fixture(fixture)),
        None => Box::new(FakeTransport::builder().build()),
    }
}

/// Runs the CLI command over `transport`.
///
/// ```
/// # fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = ledsign::Args::try_parse_from(["ledsign", "--fake", "write-string", "B", ":3"])?;
/// let session_config = args.session_config();
/// let (command, transport_args) = args.into_command_and_transport_args()?;
/// let transport = match transport_args {
///     ledsign::TransportArgs::Fake(fake_args) => ledsign::fake_transport(fake_args),
///     ledsign::TransportArgs::Serial(serial) => ledsign::real_transport(&serial)?,
/// };
/// let mut out = Vec::new();
/// ledsign::run(command, &mut out, transport, session_config)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the sign operation fails,
/// or output writing fails.
pub fn run<W>(
    command: Command,
    out: &mut W,
    transport: Box<dyn Transport>,
    session_config: SessionConfig,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, transport, session_config, None, None)
}

/// Runs the CLI command with explicit telemetry and output settings.
///
/// Without an `output_format`, results are printed as JSON.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the sign operation fails,
/// or output writing fails.
#[instrument(
    skip(command, out, transport, session_config),
    level = "info",
    fields(command = %command_name(&command), ?log_level)
)]
pub fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    transport: Box<dyn Transport>,
    session_config: SessionConfig,
    log_level: Option<LogLevel>,
    output_format: Option<OutputFormat>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        io::stderr().is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    let output_format = output_format.unwrap_or(OutputFormat::Json);
    let painter = Painter::new(output_format == OutputFormat::Pretty && io::stdout().is_terminal());
    let mut session = SignSession::open(transport, session_config);
    crate::cli::sign::run(&mut session, &command, out, output_format, painter)
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::ClearConfig => "clear-config",
        Command::Configure(_args) => "configure",
        Command::WriteText(_args) => "write-text",
        Command::WriteString(_args) => "write-string",
        Command::WritePicture(_args) => "write-picture",
        Command::ReadString(_args) => "read-string",
        Command::ReadType => "read-type",
        Command::ChangeAddress(_args) => "change-address",
        Command::Demo => "demo",
    }
}
