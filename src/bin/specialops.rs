//! Compiles one of the bundled programs and optionally runs it.
//!
//! # Usage
//! ```text
//! specialops <program> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program`: One of `echo`, `keccak`, `hash-or-echo`
//!
//! # Options
//! - `-o, --output <file>`: Write the raw bytecode to a file
//! - `--jump-width <n>`: Force the byte width of label pushes
//! - `--run`: Execute the bytecode on the reference interpreter
//! - `--calldata <hex>`: Input for `--run` (defaults to empty)
//!
//! # Examples
//! ```text
//! specialops keccak
//! specialops hash-or-echo --run --calldata 002aff2a
//! ```

use specialops::evm::assembler::CompileOptions;
use specialops::evm::samples;
use specialops::evm::vm::execute;
use specialops::{debug, error, info, warn};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let name = &args[1];
    let mut output_path: Option<String> = None;
    let mut call_data: Option<Vec<u8>> = None;
    let mut run = false;
    let mut options = CompileOptions::default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                output_path = Some(value_of(&args, i, k).to_string());
                i += 2;
            }
            k @ "--jump-width" => {
                let raw = value_of(&args, i, k);
                let width = raw.parse::<usize>().unwrap_or_else(|_| {
                    error!("Invalid jump width: '{}' is not a valid number", raw);
                    process::exit(1);
                });
                options.jump_target_width = Some(width);
                i += 2;
            }
            k @ "--calldata" => {
                let raw = value_of(&args, i, k);
                let digits = raw.strip_prefix("0x").unwrap_or(raw);
                call_data = Some(hex::decode(digits).unwrap_or_else(|e| {
                    error!("Invalid calldata '{}': {}", raw, e);
                    process::exit(1);
                }));
                i += 2;
            }
            "--run" => {
                run = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let Some(code) = samples::by_name(name) else {
        error!(
            "Unknown program '{}', expected one of: {}",
            name,
            samples::NAMES.join(", ")
        );
        process::exit(1);
    };
    debug!("{} has {} directives", name, code.len());

    let bytecode = match code.compile_with(&options) {
        Ok(b) => b,
        Err(e) => {
            error!("Compilation failed: {}", e);
            process::exit(1);
        }
    };
    info!("Compiled {} ({} bytes)", name, bytecode.len());
    println!("{}", hex::encode(&bytecode));

    if let Some(path) = &output_path {
        if let Err(e) = fs::write(path, &bytecode) {
            error!("Failed to write output file: {}", e);
            process::exit(1);
        }
        info!("Wrote {}", path);
    }

    if !run {
        if call_data.is_some() {
            warn!("--calldata has no effect without --run");
        }
        return;
    }

    let input = call_data.unwrap_or_default();
    match execute(&bytecode, &input) {
        Ok(output) => {
            info!("Returned {} bytes", output.len());
            println!("{}", hex::encode(&output));
        }
        Err(e) => {
            error!("Execution failed: {}", e);
            process::exit(1);
        }
    }
}

/// The argument following the flag at `i`, or exit.
fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            error!("{flag} requires an argument");
            process::exit(1);
        }
    }
}

const USAGE: &str = "\
Stack-machine assembler

USAGE:
    {program} <program> [OPTIONS]

ARGS:
    <program>    Bundled program: echo, keccak, hash-or-echo

OPTIONS:
    -o, --output <file>     Write the raw bytecode to a file
        --jump-width <n>    Force the byte width of label pushes
        --run               Execute on the reference interpreter
        --calldata <hex>    Input for --run (defaults to empty)
    -h, --help              Print this help message

EXAMPLES:
    # Print the bytecode of the hashing program
    {program} keccak

    # Take the hashing branch of the selector program
    {program} hash-or-echo --run --calldata 012aff2a
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
