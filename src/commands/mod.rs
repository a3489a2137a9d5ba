//! CLI command implementations
//!
//! Each command opens a session through [`crate::programmers::open_session`],
//! enters programming mode, does its work and powers the target down again.

mod erase;
mod list;
mod read;
mod signature;
mod verify;
mod write;

pub use erase::run_erase;
pub use list::{list_chips, list_programmers};
pub use read::run_read;
pub use signature::run_signature;
pub use verify::run_verify;
pub use write::{run_write, WriteOptions};

use std::fs;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rtinyisp_core::chip::MemoryKind;
use rtinyisp_core::protocol::WriteProgress;

use crate::cli::MemoryArg;
use crate::programmers::DynSession;

/// Map the CLI memory selector to the core memory kind
pub fn memory_kind(memory: MemoryArg) -> MemoryKind {
    match memory {
        MemoryArg::Flash => MemoryKind::Flash,
        MemoryArg::Eeprom => MemoryKind::Eeprom,
    }
}

/// Image read from an input file
///
/// `.bin` files are taken as raw bytes; everything else is decoded as
/// Intel HEX by the session.
pub enum InputImage<'a> {
    /// Raw bytes read from disk
    Raw(Vec<u8>),
    /// Path handed to the HEX decoder
    Hex(&'a Path),
}

impl<'a> InputImage<'a> {
    /// Classify an input path by extension
    pub fn open(path: &'a Path) -> std::io::Result<Self> {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"))
        {
            Ok(InputImage::Raw(fs::read(path)?))
        } else {
            Ok(InputImage::Hex(path))
        }
    }

    /// Source to hand to the session
    pub fn source(&self) -> rtinyisp_core::MemorySource<'_> {
        match self {
            InputImage::Raw(data) => rtinyisp_core::MemorySource::Buffer(data),
            InputImage::Hex(path) => rtinyisp_core::MemorySource::HexFile(path),
        }
    }
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
    phase: &'static str,
}

impl IndicatifProgress {
    /// Create a reporter labelling its bar with `phase`
    pub fn new(phase: &'static str) -> Self {
        Self { bar: None, phase }
    }
}

impl WriteProgress for IndicatifProgress {
    fn started(&mut self, kind: MemoryKind, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {} {}",
                    self.phase, kind
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.bar = Some(pb);
    }

    fn page_written(&mut self, address: usize, len: usize) {
        if let Some(pb) = &self.bar {
            pb.set_position((address + len) as u64);
        }
    }

    fn finished(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message(format!("{} complete", self.phase));
        }
    }
}

/// Spinner shown while a single long operation runs
pub fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run `f` in programming mode, always powering the target down afterwards
pub fn with_programming_mode<R>(
    session: &mut DynSession,
    f: impl FnOnce(&mut DynSession) -> Result<R, Box<dyn std::error::Error>>,
) -> Result<R, Box<dyn std::error::Error>> {
    session.enter_programming_mode()?;
    let result = f(session);
    let exit = session.exit_programming_mode();
    let value = result?;
    exit?;
    Ok(value)
}
