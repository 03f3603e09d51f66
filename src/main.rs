use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use ledsign::{Args, OutputFormat, TransportArgs, fake_transport, real_transport, run_with_log_level};

fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let run_result = (|| {
        let log_level = args.log_level();
        let output_format = args.output_format().unwrap_or(if stdout.is_terminal() {
            OutputFormat::Pretty
        } else {
            OutputFormat::Json
        });
        let session_config = args.session_config();
        let (command, transport_args) = args.into_command_and_transport_args()?;
        let transport = match transport_args {
            TransportArgs::Fake(fake_args) => fake_transport(fake_args),
            TransportArgs::Serial(serial) => real_transport(&serial)?,
        };

        run_with_log_level(
            command,
            &mut stdout,
            transport,
            session_config,
            log_level,
            Some(output_format),
        )
    })();

    match run_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
