use crate::cmd::{factory, parse_type, DumpArgs, StreamOptions};
use crate::exit::{stream_error, CliResult, SUCCESS};
use crate::output::{print_values, OutputFormat};

pub fn run(args: DumpArgs, options: &StreamOptions, format: OutputFormat) -> CliResult<i32> {
    let factory = factory(options)?;
    let ty = parse_type(&args.ty)?;
    let reader = factory
        .open_read(&args.path, &ty)
        .map_err(|err| stream_error(&format!("failed opening {}", args.path.display()), err))?;

    let limit = args.limit.unwrap_or(usize::MAX);
    let mut values = Vec::new();
    for item in reader.take(limit) {
        let value = item.map_err(|err| {
            stream_error(&format!("failed decoding value {}", values.len()), err)
        })?;
        values.push(value);
    }

    print_values(&values, format);
    Ok(SUCCESS)
}
