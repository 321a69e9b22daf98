use std::io::Read;

use binstream::codec::json::from_json;
use serde::Serialize;

use crate::cmd::{factory, parse_type, StreamOptions, WriteArgs};
use crate::exit::{codec_error, io_error, stream_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_report, OutputFormat};

#[derive(Serialize)]
struct WriteOutput {
    path: String,
    #[serde(rename = "type")]
    ty: String,
    values: u64,
    bytes: u64,
}

pub fn run(args: WriteArgs, options: &StreamOptions, format: OutputFormat) -> CliResult<i32> {
    let factory = factory(options)?;
    let ty = parse_type(&args.ty)?;

    let input = read_input(&args)?;
    let json: serde_json::Value = serde_json::from_str(&input)
        .map_err(|err| CliError::new(DATA_INVALID, format!("input is not valid JSON: {err}")))?;
    let serde_json::Value::Array(items) = json else {
        return Err(CliError::new(DATA_INVALID, "input must be a JSON array"));
    };

    // Convert everything before the target file is truncated.
    let values = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            from_json(&ty, item, factory.registry())
                .map_err(|err| codec_error(&format!("invalid value {index}"), err))
        })
        .collect::<CliResult<Vec<_>>>()?;

    let context = format!("failed writing {}", args.path.display());
    let mut writer = factory
        .open_write(&args.path, &ty)
        .map_err(|err| stream_error(&context, err))?;
    for value in &values {
        writer.write(value).map_err(|err| stream_error(&context, err))?;
    }
    let output = WriteOutput {
        path: args.path.display().to_string(),
        ty: ty.to_string(),
        values: writer.values_written(),
        bytes: writer.bytes_written(),
    };
    writer.finish().map_err(|err| stream_error(&context, err))?;

    print_report(&output, format);
    Ok(SUCCESS)
}

fn read_input(args: &WriteArgs) -> CliResult<String> {
    match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(input)
        }
    }
}
