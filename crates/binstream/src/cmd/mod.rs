use std::path::PathBuf;

use binstream::{StreamConfig, StreamFactory, Type};
use clap::{Args, Subcommand};
use tracing::debug;

use crate::exit::{codec_error, stream_error, CliResult};
use crate::output::OutputFormat;

pub mod dump;
pub mod inspect;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a stream and print its values.
    Dump(DumpArgs),
    /// Encode a JSON array of values into a stream.
    Write(WriteArgs),
    /// Count the values in a stream and report their sizes.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Global flags shared by every stream command.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub schema: Option<PathBuf>,
    pub buffer_size: usize,
    pub generic_records: bool,
}

pub fn run(command: Command, options: &StreamOptions, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Dump(args) => dump::run(args, options, format),
        Command::Write(args) => write::run(args, options, format),
        Command::Inspect(args) => inspect::run(args, options, format),
        Command::Version(args) => version::run(args),
    }
}

/// Build a factory from the global flags, loading declarations if given.
pub fn factory(options: &StreamOptions) -> CliResult<StreamFactory> {
    let factory = StreamFactory::with_config(StreamConfig {
        buffer_capacity: options.buffer_size,
    });
    factory.set_generic_records(options.generic_records);

    if let Some(schema) = &options.schema {
        let count = factory.load_declarations(schema).map_err(|err| {
            stream_error(&format!("failed loading {}", schema.display()), err)
        })?;
        debug!(path = %schema.display(), count, "loaded declarations");
    }
    Ok(factory)
}

pub fn parse_type(input: &str) -> CliResult<Type> {
    input
        .parse()
        .map_err(|err| codec_error("invalid --type", err))
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Stream file to read.
    pub path: PathBuf,
    /// Type expression of each value, e.g. `list<string>` or `Person`.
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub ty: String,
    /// Stop after N values.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Stream file to create or truncate.
    pub path: PathBuf,
    /// Type expression of each value.
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub ty: String,
    /// JSON array of values. Default: stdin.
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Stream file to read.
    pub path: PathBuf,
    /// Type expression of each value.
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub ty: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
