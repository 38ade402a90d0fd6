//! Command-line entry point for the PeopleKeep directory.
//!
//! # Responsibility
//! - Verify `peoplekeep_core` linkage with a deterministic smoke line.
//! - Open a store from a JSON config and print stats or the export bundle.

use clap::{Parser, Subcommand};
use log::error;
use peoplekeep_core::{init_logging, open_store, DirectoryConfig, LogSink, Viewer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "peoplekeep", version, about = "Personal contact directory")]
struct Args {
    /// Directory config file (JSON); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage and version.
    Ping,
    /// Print record counts for the configured backend.
    Stats,
    /// Write the export bundle to stdout or a file.
    Export {
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long, default_value = "light")]
        theme: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("peoplekeep: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    if let Command::Ping = args.command {
        println!("peoplekeep_core ping={}", peoplekeep_core::ping());
        println!("peoplekeep_core version={}", peoplekeep_core::core_version());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => DirectoryConfig::load(path).map_err(|err| err.to_string())?,
        None => DirectoryConfig::default(),
    };
    config.validate().map_err(|err| err.to_string())?;

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())?;
    }

    let store = open_store(&config, Arc::new(LogSink));

    match args.command {
        Command::Ping => Ok(()),
        Command::Stats => {
            let visible = store.people(&Viewer::anonymous()).len();
            println!("backend={}", store.backend().as_str());
            println!("people={} visible={}", store.person_count(), visible);
            println!("custom_fields={}", store.custom_fields().len());
            Ok(())
        }
        Command::Export {
            language,
            theme,
            output,
        } => {
            let document = store
                .export_bundle(&language, &theme)
                .to_json_pretty()
                .map_err(|err| err.to_string())?;
            match output {
                Some(path) => std::fs::write(&path, document).map_err(|err| {
                    error!("event=export_write module=cli status=error error={err}");
                    format!("cannot write `{}`: {err}", path.display())
                }),
                None => {
                    println!("{document}");
                    Ok(())
                }
            }
        }
    }
}
