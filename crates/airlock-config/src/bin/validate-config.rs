//! Config validation CLI tool
//!
//! Validates an airlockd configuration file and reports any errors.

use airlock_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates an airlockd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match airlock_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", airlock_config::CURRENT_CONFIG_VERSION);
            println!("  Sessions root: {}", config.sessions.root.display());
            println!(
                "  Inactivity timeout: {}",
                format_duration(config.sessions.inactivity_timeout)
            );
            println!("  Wipe chunk size: {} bytes", config.wipe.chunk_size);
            println!("  Audit log: {}", config.audit.log_path.display());
            println!(
                "  Printer: {}",
                config.print.printer.as_deref().unwrap_or("(system default)")
            );
            println!(
                "  Scanner: {} ({})",
                config.scan.device.as_deref().unwrap_or("(first available)"),
                config.scan.format.as_arg()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                airlock_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                airlock_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                airlock_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                airlock_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        airlock_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
