//! Compiles one JSX module and prints the result.
//!
//! ```text
//! cargo run --example compile_file -- src/App.jsx [--ssr] [--hydratable]
//! ```

use jsx_compiler_native::{compile_module, CompileOptions};
use std::env;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("usage: compile_file <file> [--ssr] [--hydratable]");
        return ExitCode::FAILURE;
    };

    let mut options = if args.iter().any(|a| a == "--ssr") {
        CompileOptions::ssr()
    } else {
        CompileOptions::default()
    };
    options.hydratable = args.iter().any(|a| a == "--hydratable");

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    match compile_module(&source, path, &options) {
        Ok(output) => {
            print!("{}", output.code);
            eprintln!(
                "{} template(s), helpers: {}",
                output.template_count,
                output.helpers.join(", ")
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
