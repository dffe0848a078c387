//! # Picker Host Daemon
//!
//! Runs one file picker session over host directories and prints the chosen
//! path on stdout. Nothing is printed when the user cancels.

use pickerd::{HostRuntime, HostRuntimeConfig, PickerConfig, VolumeConfig};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pickerd");

    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    let mut runtime = HostRuntime::new(config).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });
    log::debug!(
        "mounted {} volume(s)",
        runtime.volumes().handles().len()
    );

    match runtime.run() {
        Ok(Some(selection)) => println!("{}", selection.path),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Result<HostRuntimeConfig, String> {
    let mut config = None;
    let mut volume_dirs = Vec::new();
    let mut filter = None;
    let mut start = None;
    let mut script = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = value(args, &mut i, "--config")?;
                config = Some(PickerConfig::load(Path::new(path)).map_err(|e| e.to_string())?);
            }
            "--volume-dir" | "-v" => {
                volume_dirs.push(VolumeConfig::new(value(args, &mut i, "--volume-dir")?));
            }
            "--filter" | "-f" => {
                filter = Some(value(args, &mut i, "--filter")?.to_string());
            }
            "--start" => {
                start = Some(value(args, &mut i, "--start")?.to_string());
            }
            "--script" | "-s" => {
                let script_path = value(args, &mut i, "--script")?;
                let script_text = fs::read_to_string(script_path)
                    .map_err(|e| format!("Failed to read script file: {}", e))?;
                script = Some(script_text);
            }
            "--help" | "-h" => {
                print_usage(args.first().map(String::as_str).unwrap_or("pickerd"));
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    let mut config = config.unwrap_or_default();
    if !volume_dirs.is_empty() {
        config.volumes = volume_dirs;
        config.volume = None;
    }
    if filter.is_some() {
        config.filter = filter;
    }
    if start.is_some() {
        config.start = start;
    }

    Ok(HostRuntimeConfig { config, script })
}

/// Takes the value following the flag at `i`
fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", flag))
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON configuration file");
    eprintln!("  -v, --volume-dir <DIR>   Mount a host directory as a volume (repeatable)");
    eprintln!("  -f, --filter <LIST>      |-separated file name suffixes, e.g. .efi|.EFI");
    eprintln!("      --start <PATH>       Starting directory, e.g. \\EFI");
    eprintln!("  -s, --script <FILE>      Answer menus from a script instead of the terminal");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Log output is controlled with RUST_LOG (default: warn).");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --volume-dir /boot/efi --filter .efi", program);
    eprintln!("  {} --config picker.json --script answers.txt", program);
}
