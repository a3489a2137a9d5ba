//! Write command implementation

use std::path::Path;

use crate::cli::MemoryArg;
use crate::programmers::DynSession;

use super::{memory_kind, spinner, with_programming_mode, IndicatifProgress, InputImage};

/// Options for the write command
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Erase the chip first
    pub erase: bool,
    /// Read back and compare afterwards
    pub verify: bool,
}

/// Run the write command
pub fn run_write(
    session: &mut DynSession,
    memory: MemoryArg,
    input: &Path,
    options: WriteOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = memory_kind(memory);
    let image = InputImage::open(input)?;

    with_programming_mode(session, |s| {
        if options.erase {
            let pb = spinner("Erasing chip...".to_string());
            let result = s.erase_chip();
            pb.finish_and_clear();
            result?;
        }

        let mut progress = IndicatifProgress::new("Writing");
        s.write_memory(kind, image.source(), &mut progress)?;

        if options.verify {
            let mut progress = IndicatifProgress::new("Verifying");
            s.verify_memory(kind, image.source(), &mut progress)?;
            println!("Verification passed!");
        }
        Ok(())
    })?;

    println!("{} written from {:?}", kind, input);
    Ok(())
}
