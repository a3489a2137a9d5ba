//! List commands implementation

use rtinyisp_core::chip::ChipDatabase;

use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    print!("{}", programmers::programmer_help());
}

/// List all chips in the database
pub fn list_chips(db: &ChipDatabase) {
    println!("Supported chips:");
    println!();
    println!(
        "{:<14} {:<12} {:>10} {:>12}",
        "Name", "Signature", "Flash page", "EEPROM page"
    );
    println!("{}", "-".repeat(52));

    for chip in db.chips() {
        let signature = chip
            .signature
            .expected
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");

        println!(
            "{:<14} {:<12} {:>10} {:>12}",
            chip.name,
            signature,
            format_page(chip.flash.page_size),
            format_page(chip.eeprom.page_size)
        );
    }
}

fn format_page(page_size: Option<usize>) -> String {
    match page_size {
        Some(size) => format!("{} B", size),
        None => "-".to_string(),
    }
}
