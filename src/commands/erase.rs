//! Erase command implementation

use crate::programmers::DynSession;

use super::{spinner, with_programming_mode};

/// Run the erase command
pub fn run_erase(session: &mut DynSession) -> Result<(), Box<dyn std::error::Error>> {
    with_programming_mode(session, |s| {
        let pb = spinner(format!("Erasing {}...", s.chip().name));
        let result = s.erase_chip();
        pb.finish_and_clear();
        Ok(result?)
    })?;

    println!("Chip erased");
    Ok(())
}
