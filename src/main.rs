extern crate ipp21;

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process;

fn open_source(path: Option<&str>) -> io::Result<Box<dyn BufRead>> {
    match path {
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut source_path = None;
    let mut input_path = None;

    let rest = &args[1..];
    let mut i = 0;
    while i < rest.len() {
        let arg = &rest[i];
        if let Some(value) = arg.strip_prefix("--source=") {
            source_path = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--input=") {
            input_path = Some(value.to_string());
        } else if arg == "--source" || arg == "--input" {
            let value = rest.get(i + 1).unwrap_or_else(|| {
                eprintln!("'{arg}' requires a path argument");
                eprintln!("usage: ipp21 [--source=FILE | --source FILE] [--input=FILE | --input FILE]");
                process::exit(1);
            });
            if arg == "--source" {
                source_path = Some(value.to_string());
            } else {
                input_path = Some(value.to_string());
            }
            i += 1;
        } else {
            eprintln!("unrecognized argument '{arg}'");
            eprintln!("usage: ipp21 [--source=FILE | --source FILE] [--input=FILE | --input FILE]");
            process::exit(1);
        }
        i += 1;
    }

    if source_path.is_none() && input_path.is_none() {
        eprintln!("at least one of --source or --input must be given");
        eprintln!("usage: ipp21 [--source=FILE | --source FILE] [--input=FILE | --input FILE]");
        process::exit(1);
    }

    let source = match open_source(source_path.as_deref()) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("cannot open source file: {err}");
            process::exit(1);
        }
    };

    let input = match open_source(input_path.as_deref()) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("cannot open input file: {err}");
            process::exit(1);
        }
    };

    let code = ipp21::run(source, input, io::stdout(), io::stderr());
    process::exit(code as i32);
}
