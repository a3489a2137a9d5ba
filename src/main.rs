//! rtinyisp - AVR in-system programmer
//!
//! Programs the flash and EEPROM of AVR microcontrollers through
//! USBtinyISP-compatible dongles (SparkFun Pocket/Tiny AVR programmers,
//! Adafruit USBtinyISP, Trinket and Gemma).
//!
//! # Architecture
//!
//! The CLI is a thin layer over `rtinyisp_core::Session`:
//! - **Transports** (USBtinyISP over USB, or the in-memory dummy) are
//!   selected by name and boxed behind `IspTransport`
//! - **Chip profiles** come from the built-in RON database, optionally
//!   extended with `--chip-db`

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use rtinyisp_core::chip::ChipDatabase;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let db = match load_chip_database(cli.chip_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("Loaded {} chip definitions", db.len());

    let verbose = cli.verbose;
    let result = match cli.command {
        Commands::Signature { target } => {
            let mut session = programmers::open_session(&target, &db, verbose)?;
            let result = commands::run_signature(&mut session);
            session.close();
            result
        }
        Commands::Write {
            target,
            memory,
            input,
            erase,
            verify,
        } => {
            let mut session = programmers::open_session(&target, &db, verbose)?;
            let result = commands::run_write(
                &mut session,
                memory,
                &input,
                commands::WriteOptions { erase, verify },
            );
            session.close();
            result
        }
        Commands::Read {
            target,
            memory,
            length,
            address,
            output,
        } => {
            let mut session = programmers::open_session(&target, &db, verbose)?;
            let result = commands::run_read(&mut session, memory, length, address, &output);
            session.close();
            result
        }
        Commands::Verify {
            target,
            memory,
            input,
        } => {
            let mut session = programmers::open_session(&target, &db, verbose)?;
            let result = commands::run_verify(&mut session, memory, &input);
            session.close();
            result
        }
        Commands::Erase { target } => {
            let mut session = programmers::open_session(&target, &db, verbose)?;
            let result = commands::run_erase(&mut session);
            session.close();
            result
        }
        Commands::ListChips => {
            commands::list_chips(&db);
            Ok(())
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Built-in chips, overlaid with any user supplied definitions
fn load_chip_database(path: Option<&Path>) -> Result<ChipDatabase, Box<dyn std::error::Error>> {
    let mut db = ChipDatabase::builtin().clone();

    if let Some(path) = path {
        let count = if path.is_dir() {
            db.load_dir(path)?
        } else if path.is_file() {
            db.load_file(path)?
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        };
        log::debug!("Loaded {} chips from {}", count, path.display());
    }

    if db.is_empty() {
        return Err("No chip definitions loaded".into());
    }

    Ok(db)
}
