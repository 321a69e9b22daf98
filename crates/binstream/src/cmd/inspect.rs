use serde::Serialize;

use crate::cmd::{factory, parse_type, InspectArgs, StreamOptions};
use crate::exit::{io_error, stream_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

#[derive(Serialize)]
struct InspectOutput {
    path: String,
    #[serde(rename = "type")]
    ty: String,
    file_bytes: u64,
    values: u64,
    value_bytes: u64,
    min_value_bytes: Option<u64>,
    max_value_bytes: Option<u64>,
    mean_value_bytes: Option<f64>,
}

pub fn run(args: InspectArgs, options: &StreamOptions, format: OutputFormat) -> CliResult<i32> {
    let factory = factory(options)?;
    let ty = parse_type(&args.ty)?;
    let file_bytes = std::fs::metadata(&args.path)
        .map_err(|err| io_error(&format!("failed reading {}", args.path.display()), err))?
        .len();

    let mut reader = factory
        .open_read(&args.path, &ty)
        .map_err(|err| stream_error(&format!("failed opening {}", args.path.display()), err))?;

    let mut min: Option<u64> = None;
    let mut max: Option<u64> = None;
    let mut previous = 0;
    while reader.has_next() {
        reader.next_value().map_err(|err| {
            stream_error(&format!("failed decoding value {}", reader.values_read()), err)
        })?;
        let size = reader.bytes_read() - previous;
        previous = reader.bytes_read();
        min = Some(min.map_or(size, |m| m.min(size)));
        max = Some(max.map_or(size, |m| m.max(size)));
    }

    let values = reader.values_read();
    let value_bytes = reader.bytes_read();
    let output = InspectOutput {
        path: args.path.display().to_string(),
        ty: ty.to_string(),
        file_bytes,
        values,
        value_bytes,
        min_value_bytes: min,
        max_value_bytes: max,
        mean_value_bytes: (values > 0).then(|| value_bytes as f64 / values as f64),
    };

    print_report(&output, format);
    Ok(SUCCESS)
}
