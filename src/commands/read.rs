//! Read command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::cli::MemoryArg;
use crate::programmers::DynSession;

use super::{memory_kind, spinner, with_programming_mode};

/// Run the read command
pub fn run_read(
    session: &mut DynSession,
    memory: MemoryArg,
    length: u32,
    address: u32,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = memory_kind(memory);

    let data = with_programming_mode(session, |s| {
        let pb = spinner(format!("Reading {} bytes of {}...", length, kind));
        let result = s.read_memory(kind, length as usize, address);
        pb.finish_and_clear();
        Ok(result?)
    })?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}
