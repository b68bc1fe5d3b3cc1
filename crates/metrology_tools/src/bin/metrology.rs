#![forbid(unsafe_code)]

use std::env;
use std::io::{self, Read};

use metrology_tools::report_cli::{execute_command, USAGE};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let subcommand = args.first().ok_or_else(|| USAGE.to_string())?;
    if args.len() > 1 {
        return Err(USAGE.to_string());
    }

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    log::debug!("metrology {subcommand}: {} bytes of input", input.len());

    let output = execute_command(subcommand, &input)?;
    println!("{output}");
    Ok(())
}
