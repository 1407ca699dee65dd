//! Developer probe for the interop runtime.
//!
//! # Responsibility
//! - Verify `winrt_interop_core` linkage (`ping`, `version`).
//! - Compute signatures and parameterized ids the way generated code does.
//! - Keep output deterministic so results can be diffed in scripts.

use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use winrt_interop_core::{parameterized_instance_guid_string, RuntimeConfig, TypeShape};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "winrt-interop")]
#[command(about = "Signature and id tooling for the interop runtime")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Health check; prints `pong`
    Ping,
    /// Prints the core crate version
    Version,
    /// Id of a generic interface instantiated with the given signatures
    Guid {
        /// Generic base id, e.g. 9de1c534-6ae1-11e0-84e1-18a905bcc53f
        base: String,
        /// Type argument signatures in order
        #[arg(required = true)]
        signatures: Vec<String>,
    },
    /// Signature and id of a JSON type shape
    Signature {
        /// Shape file produced by the metadata reader
        #[arg(value_name = "SHAPE_JSON")]
        path: PathBuf,
    },
}

fn run(command: &Command) -> Result<String, String> {
    match command {
        Command::Ping => Ok(format!("winrt_interop_core ping={}", winrt_interop_core::ping())),
        Command::Version => Ok(format!(
            "winrt_interop_core version={}",
            winrt_interop_core::core_version()
        )),
        Command::Guid { base, signatures } => {
            let args = signatures.iter().map(String::as_str).collect::<Vec<_>>();
            parameterized_instance_guid_string(base, &args).map_err(|err| err.to_string())
        }
        Command::Signature { path } => describe_shape(path),
    }
}

fn describe_shape(path: &Path) -> Result<String, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
    let shape: TypeShape = serde_json::from_str(&text)
        .map_err(|err| format!("invalid shape in `{}`: {err}", path.display()))?;
    let signature = shape.signature().map_err(|err| err.to_string())?;
    let mut output = format!("signature={signature}");
    if let Ok(id) = shape.identity() {
        output.push_str(&format!("\nguid={}", id.to_braced_upper()));
    }
    Ok(output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = RuntimeConfig::from_env().apply() {
        eprintln!("logging disabled: {err}");
    }
    info!("event=cli_run module=cli status=start command={:?}", cli.command);

    match run(&cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
