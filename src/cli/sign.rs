use std::fs;
use std::io;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::instrument;

use crate::cli::painter::Painter;
use crate::cli::{
    ChangeAddressArgs, Command, ConfigureArgs, OutputFormat, WritePictureArgs, WriteTextArgs,
};
use crate::error::{CliConfigError, ProtocolError};
use crate::handlers::{
    ConfigurationHandler, FormatNode, FormatRequest, Label, PictureGrid, PictureHandler,
    SignAdminHandler, StringPageHandler, TextWriteHandler,
};
use crate::hw::SignSession;

/// Rows of the picture shown by the `demo` command.
pub(crate) const DEMO_PICTURE: [&str; 6] = [
    "--RAGG", "--RAGG", "-RRAAG", "-RRAAG", "RRRAAA", "RRRAAA",
];

/// JSON result emitted by a command.
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum SignResult {
    ClearConfig,
    Configure {
        text_pages: usize,
        string_pages: usize,
        picture_pages: usize,
    },
    WriteText {
        label: String,
        mode: String,
        split_lines: bool,
    },
    WriteString {
        label: String,
        chars: usize,
    },
    WritePicture {
        label: String,
        width: usize,
        height: usize,
    },
    ReadString {
        label: String,
        text: String,
    },
    ReadType {
        sign_type: String,
    },
    ChangeAddress {
        address: u8,
    },
    Demo {
        text_label: String,
        string_label: String,
        picture_label: String,
    },
}

impl SignResult {
    fn pretty_line(&self, painter: Painter) -> String {
        let detail = match self {
            Self::ClearConfig => "Cleared sign configuration".to_string(),
            Self::Configure {
                text_pages,
                string_pages,
                picture_pages,
            } => format!(
                "Configured {text_pages} text, {string_pages} string and {picture_pages} picture page(s)"
            ),
            Self::WriteText {
                label,
                mode,
                split_lines,
            } => {
                let layout = if *split_lines { ", split lines" } else { "" };
                format!("Wrote text page {} ({mode}{layout})", painter.value(label))
            }
            Self::WriteString { label, chars } => {
                format!("Wrote {chars} char(s) to string page {}", painter.value(label))
            }
            Self::WritePicture {
                label,
                width,
                height,
            } => format!(
                "Wrote {width}x{height} picture to page {}",
                painter.value(label)
            ),
            Self::ReadString { label, text } => {
                format!("String page {}: {}", painter.value(label), painter.value(text))
            }
            Self::ReadType { sign_type } => format!("Sign type: {}", painter.value(sign_type)),
            Self::ChangeAddress { address } => {
                format!("Sign address changed to {}", painter.value(address.to_string()))
            }
            Self::Demo {
                text_label,
                string_label,
                picture_label,
            } => format!(
                "Demo written to text page {}, string page {} and picture page {}",
                painter.value(text_label),
                painter.value(string_label),
                painter.value(picture_label)
            ),
        };
        format!("{} {detail}", painter.tick())
    }
}

/// Executes one sign command against an open session.
#[instrument(skip(session, out, painter), level = "info")]
pub(crate) fn run<W>(
    session: &mut SignSession,
    command: &Command,
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
) -> Result<()>
where
    W: io::Write,
{
    let result = execute(session, command)?;
    match output_format {
        OutputFormat::Pretty => writeln!(out, "{}", result.pretty_line(painter))?,
        OutputFormat::Json => write_json_line(out, &result)?,
    }
    Ok(())
}

fn execute(session: &mut SignSession, command: &Command) -> Result<SignResult> {
    let result = match command {
        Command::ClearConfig => {
            ConfigurationHandler::clear_configuration(session)?;
            SignResult::ClearConfig
        }
        Command::Configure(args) => configure(session, args)?,
        Command::WriteText(args) => write_text(session, args)?,
        Command::WriteString(args) => {
            StringPageHandler::write_string(session, args.label, &args.text)?;
            SignResult::WriteString {
                label: args.label.to_string(),
                chars: args.text.len(),
            }
        }
        Command::WritePicture(args) => write_picture(session, args)?,
        Command::ReadString(args) => {
            let text = StringPageHandler::read_string(session, args.label)?;
            SignResult::ReadString {
                label: args.label.to_string(),
                text,
            }
        }
        Command::ReadType => {
            let sign_type = SignAdminHandler::read_sign_type(session)?;
            SignResult::ReadType {
                sign_type: sign_type.to_string(),
            }
        }
        Command::ChangeAddress(args) => change_address(session, args)?,
        Command::Demo => run_demo(session)?,
    };
    Ok(result)
}

fn configure(session: &mut SignSession, args: &ConfigureArgs) -> Result<SignResult> {
    ConfigurationHandler::configure(session, |config| -> Result<(), ProtocolError> {
        for page in &args.text_pages {
            config.set_text(page.label, page.size)?;
        }
        for page in &args.string_pages {
            config.set_string(page.label, page.size)?;
        }
        for page in &args.picture_pages {
            config.set_picture(page.label, page.width, page.height, page.colors)?;
        }
        Ok(())
    })?;

    Ok(SignResult::Configure {
        text_pages: args.text_pages.len(),
        string_pages: args.string_pages.len(),
        picture_pages: args.picture_pages.len(),
    })
}

fn write_text(session: &mut SignSession, args: &WriteTextArgs) -> Result<SignResult> {
    // The sign starts a new display line at CR.
    let text = args.text.replace("\r\n", "\r").replace('\n', "\r");
    if args.split_lines {
        let request = FormatRequest::new(args.label, vec![FormatNode::text(text)])
            .with_mode(args.mode)
            .with_line_split(true);
        TextWriteHandler::write_format(session, &request)?;
    } else {
        TextWriteHandler::write_text(session, args.label, &text, args.mode)?;
    }

    Ok(SignResult::WriteText {
        label: args.label.to_string(),
        mode: args.mode.to_string(),
        split_lines: args.split_lines,
    })
}

fn write_picture(session: &mut SignSession, args: &WritePictureArgs) -> Result<SignResult> {
    let grid = PictureGrid::from_rows(read_picture_rows(&args.file)?)?;
    PictureHandler::write_picture(session, args.label, &grid)?;
    Ok(SignResult::WritePicture {
        label: args.label.to_string(),
        width: grid.width(),
        height: grid.height(),
    })
}

fn read_picture_rows(path: &Path) -> Result<Vec<String>, CliConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| CliConfigError::PictureFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn change_address(session: &mut SignSession, args: &ChangeAddressArgs) -> Result<SignResult> {
    SignAdminHandler::change_address(
        session,
        args.new_address,
        args.model.unwrap_or_default(),
    )?;
    Ok(SignResult::ChangeAddress {
        address: args.new_address.value(),
    })
}

/// Configures pages `A`, `B` and `C` and fills them with sample content.
///
/// Text page `A` mixes every style the sign may support and embeds the
/// other two pages.
#[instrument(skip(session), level = "info", fields(address = ?session.address()))]
fn run_demo(session: &mut SignSession) -> Result<SignResult, ProtocolError> {
    let text_label = Label::new('A')?;
    let string_label = Label::new('B')?;
    let picture_label = Label::new('C')?;

    ConfigurationHandler::clear_configuration(session)?;
    ConfigurationHandler::configure(session, |config| -> Result<(), ProtocolError> {
        config.set_text(text_label, 64)?;
        config.set_string(string_label, 64)?;
        config.set_picture(picture_label, 6, 6, 3)?;
        Ok(())
    })?;

    StringPageHandler::write_string(session, string_label, ":3")?;
    let grid = PictureGrid::from_rows(DEMO_PICTURE)?;
    PictureHandler::write_picture(session, picture_label, &grid)?;

    let request = FormatRequest::new(
        text_label,
        vec![
            FormatNode::small(vec![
                FormatNode::flash(vec![
                    FormatNode::red(vec![FormatNode::text("A")]),
                    FormatNode::amber(vec![FormatNode::text("B")]),
                    FormatNode::green(vec![FormatNode::text("C")]),
                ]),
                FormatNode::mixed(vec![FormatNode::text("abc")]),
            ]),
            FormatNode::striped(vec![FormatNode::text("ABC")]),
            FormatNode::text("abc "),
            FormatNode::StringRef(string_label),
            FormatNode::PictureRef(picture_label),
        ],
    );
    TextWriteHandler::write_format(session, &request)?;

    Ok(SignResult::Demo {
        text_label: text_label.to_string(),
        string_label: string_label.to_string(),
        picture_label: picture_label.to_string(),
    })
}

fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
