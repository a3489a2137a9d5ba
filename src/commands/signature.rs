//! Signature command implementation

use crate::programmers::DynSession;

use super::with_programming_mode;

/// Run the signature command
pub fn run_signature(session: &mut DynSession) -> Result<(), Box<dyn std::error::Error>> {
    let chip = session.chip().name.clone();
    let signature = with_programming_mode(session, |s| Ok(s.check_chip_signature()?))?;

    println!(
        "Signature: {} (matches {})",
        signature
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" "),
        chip
    );
    Ok(())
}
