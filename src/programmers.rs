//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion, and opens a session on the selected one.

use rtinyisp_core::chip::ChipDatabase;
use rtinyisp_core::programmer::{IspTransport, ProgrammerProfile, Quirks, PROGRAMMERS};
use rtinyisp_core::{Session, SessionConfig, Verbosity};

use crate::cli::TargetArgs;

/// Name of the in-memory emulator
pub const DUMMY_PROGRAMMER: &str = "dummy";

/// Session over whichever transport was selected
pub type DynSession = Session<Box<dyn IspTransport + Send>>;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: String,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "usbtiny")]
    {
        for p in PROGRAMMERS {
            programmers.push(ProgrammerInfo {
                name: p.name,
                aliases: p.aliases,
                description: format!(
                    "{} (VID:{:04X} PID:{:04X})",
                    p.description, p.vid, p.pid
                ),
            });
        }
        programmers.push(ProgrammerInfo {
            name: rtinyisp_core::programmer::CUSTOM_PROGRAMMER,
            aliases: &[],
            description: "USBtinyISP-compatible dongle with explicit ids (--vid, --pid)".into(),
        });
    }

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: DUMMY_PROGRAMMER,
        aliases: &[],
        description: "In-memory AVR emulator for testing".into(),
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");

    for p in &programmers {
        let aliases = if p.aliases.is_empty() {
            String::new()
        } else {
            format!(" [aka {}]", p.aliases.join(", "))
        };
        help.push_str(&format!("  {:18} - {}{}\n", p.name, p.description, aliases));
    }

    help
}

/// Resolve the programmer profile named on the command line
pub fn resolve_profile(target: &TargetArgs) -> Result<ProgrammerProfile, Box<dyn std::error::Error>> {
    if target
        .programmer
        .eq_ignore_ascii_case(rtinyisp_core::programmer::CUSTOM_PROGRAMMER)
    {
        return Ok(ProgrammerProfile::custom(target.vid, target.pid)?);
    }

    if target.programmer.eq_ignore_ascii_case(DUMMY_PROGRAMMER) {
        return Ok(ProgrammerProfile {
            name: DUMMY_PROGRAMMER,
            aliases: &[],
            description: "In-memory AVR emulator",
            vid: 0,
            pid: 0,
            quirks: Quirks::empty(),
            erase_delay_ms: None,
        });
    }

    if target.vid.is_some() || target.pid.is_some() {
        log::warn!("--vid/--pid are only used with the custom programmer");
    }
    Ok(ProgrammerProfile::find(&target.programmer)?)
}

/// Build the session configuration for the selected target
pub fn session_config(
    target: &TargetArgs,
    db: &ChipDatabase,
    verbose: u8,
) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let chip = db.require(&target.chip)?;
    let programmer = resolve_profile(target)?;
    let verbosity = if verbose > 0 {
        Verbosity::Verbose
    } else {
        Verbosity::Quiet
    };

    Ok(SessionConfig::new(chip, programmer)
        .with_sck(target.sck)
        .with_verbosity(verbosity))
}

/// Open a session on the selected programmer
pub fn open_session(
    target: &TargetArgs,
    db: &ChipDatabase,
    verbose: u8,
) -> Result<DynSession, Box<dyn std::error::Error>> {
    let config = session_config(target, db, verbose)?;
    let transport = open_transport(&config)?;
    Ok(Session::open(transport, config)?)
}

#[allow(unused_variables)]
fn open_transport(
    config: &SessionConfig,
) -> Result<Box<dyn IspTransport + Send>, Box<dyn std::error::Error>> {
    #[cfg(feature = "dummy")]
    if config.programmer.name == DUMMY_PROGRAMMER {
        let dummy = rtinyisp_dummy::DummyAvr::new(rtinyisp_dummy::DummyConfig {
            signature: config.chip.signature.expected.clone(),
            ..Default::default()
        });
        return Ok(Box::new(dummy));
    }

    #[cfg(feature = "usbtiny")]
    if config.programmer.name != DUMMY_PROGRAMMER {
        return Ok(Box::new(rtinyisp_usbtiny::UsbTiny::from_profile(
            &config.programmer,
        )));
    }

    Err(format!(
        "Programmer '{}' is not available in this build",
        config.programmer.name
    )
    .into())
}
