//! Verify command implementation

use std::path::Path;

use crate::cli::MemoryArg;
use crate::programmers::DynSession;

use super::{memory_kind, with_programming_mode, IndicatifProgress, InputImage};

/// Run the verify command
pub fn run_verify(
    session: &mut DynSession,
    memory: MemoryArg,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = memory_kind(memory);
    let image = InputImage::open(input)?;

    with_programming_mode(session, |s| {
        let mut progress = IndicatifProgress::new("Verifying");
        Ok(s.verify_memory(kind, image.source(), &mut progress)?)
    })?;

    println!("Verification passed!");
    Ok(())
}
