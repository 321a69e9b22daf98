mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{Command, StreamOptions};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "binstream", version, about = "Typed binary value stream CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Declaration file naming enums and records.
    #[arg(long, value_name = "FILE", env = "BINSTREAM_SCHEMA", global = true)]
    schema: Option<PathBuf>,

    /// Stream buffer capacity in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = binstream::buffer::DEFAULT_CAPACITY, global = true)]
    buffer_size: usize,

    /// Derive codecs for declared records without a registered codec.
    #[arg(
        long,
        value_name = "BOOL",
        default_value_t = true,
        action = clap::ArgAction::Set,
        global = true
    )]
    generic_records: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            schema: self.schema.clone(),
            buffer_size: self.buffer_size,
            generic_records: self.generic_records,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let options = cli.stream_options();
    let result = cmd::run(cli.command, &options, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
