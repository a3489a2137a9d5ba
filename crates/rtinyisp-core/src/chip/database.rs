//! Chip database for runtime loading and lookup
//!
//! Chip profiles are described in RON. A built-in set is compiled into the
//! crate and parsed once on first use; additional files can be loaded at
//! runtime.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;

use super::types::{ChipProfile, MemoryKind};
use crate::error::ConfigError;

/// Error type for chip database operations
#[derive(Debug)]
pub enum ChipDbError {
    /// I/O error reading files
    Io(io::Error),
    /// RON parsing error
    Parse(ron::error::SpannedError),
    /// Validation error
    Validation(String),
}

impl From<io::Error> for ChipDbError {
    fn from(e: io::Error) -> Self {
        ChipDbError::Io(e)
    }
}

impl From<ron::error::SpannedError> for ChipDbError {
    fn from(e: ron::error::SpannedError) -> Self {
        ChipDbError::Parse(e)
    }
}

impl std::fmt::Display for ChipDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChipDbError::Io(e) => write!(f, "I/O error: {}", e),
            ChipDbError::Parse(e) => write!(f, "Parse error: {}", e),
            ChipDbError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ChipDbError {}

impl From<ChipDbError> for ConfigError {
    fn from(e: ChipDbError) -> Self {
        ConfigError::ChipDatabase(e.to_string())
    }
}

/// Top level of a chip RON file
#[derive(Debug, Deserialize)]
struct ChipFile {
    chips: Vec<ChipProfile>,
}

const BUILTIN_RON: &str = include_str!("../../chips/avr.ron");

static BUILTIN: Lazy<ChipDatabase> = Lazy::new(|| {
    let mut db = ChipDatabase::new();
    if let Err(e) = db.load_ron(BUILTIN_RON) {
        log::error!("Built-in chip database is invalid: {}", e);
    }
    db
});

/// Runtime chip database
///
/// Profiles are immutable once loaded and handed out behind an [`Arc`].
#[derive(Debug, Clone, Default)]
pub struct ChipDatabase {
    chips: Vec<Arc<ChipProfile>>,
}

impl ChipDatabase {
    /// Create an empty chip database
    pub fn new() -> Self {
        Self { chips: Vec::new() }
    }

    /// The database compiled into this crate
    pub fn builtin() -> &'static ChipDatabase {
        &BUILTIN
    }

    /// Load chip definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ChipDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load chip definitions from a RON string
    ///
    /// A chip with the same name as an existing entry replaces it.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ChipDbError> {
        let file: ChipFile = ron::from_str(content)?;
        let count = file.chips.len();

        // Nothing from the file is applied unless every chip is valid
        for chip in &file.chips {
            validate(chip)?;
        }

        for chip in file.chips {
            self.chips.retain(|c| !c.name.eq_ignore_ascii_case(&chip.name));
            self.chips.push(Arc::new(chip));
        }

        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ChipDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Get all chips in the database
    pub fn chips(&self) -> &[Arc<ChipProfile>] {
        &self.chips
    }

    /// Get the number of chips in the database
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Find a chip by exact name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<Arc<ChipProfile>> {
        self.chips
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Find a chip by name or fail with a config error
    pub fn require(&self, name: &str) -> Result<Arc<ChipProfile>, ConfigError> {
        self.find(name)
            .ok_or_else(|| ConfigError::UnknownChip(name.to_string()))
    }
}

fn validate(chip: &ChipProfile) -> Result<(), ChipDbError> {
    let sig = &chip.signature;
    if !sig.expected.is_empty() && sig.expected.len() != sig.size {
        return Err(ChipDbError::Validation(format!(
            "{}: expected signature has {} bytes but size is {}",
            chip.name,
            sig.expected.len(),
            sig.size
        )));
    }
    if sig.size > u8::MAX as usize + 1 {
        return Err(ChipDbError::Validation(format!(
            "{}: signature size {} does not fit the index byte",
            chip.name, sig.size
        )));
    }
    for kind in [MemoryKind::Flash, MemoryKind::Eeprom] {
        let offset = chip.memory(kind).address_offset;
        if u32::from(offset) >= usize::BITS {
            return Err(ChipDbError::Validation(format!(
                "{}: {} address_offset {} is wider than an address",
                chip.name, kind, offset
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_loads() {
        let db = ChipDatabase::builtin();
        assert!(db.len() >= 9);

        let tiny = db.find("attiny85").unwrap();
        assert_eq!(tiny.signature.expected, vec![0x1E, 0x93, 0x0B]);
        assert_eq!(tiny.pgm_enable, [0xAC, 0x53, 0x00, 0x00]);
        assert_eq!(tiny.flash.page_size, Some(64));
        assert_eq!(tiny.flash.address_offset, 1);
        assert_eq!(tiny.eeprom.address_offset, 0);
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let db = ChipDatabase::builtin();
        assert!(db.find("ATmega328P").is_some());
        assert_eq!(
            db.require("atmega9999").unwrap_err(),
            ConfigError::UnknownChip("atmega9999".into())
        );
    }

    #[test]
    fn test_missing_eeprom_page_size() {
        let db = ChipDatabase::builtin();
        let mega8 = db.find("atmega8").unwrap();
        assert_eq!(mega8.eeprom.page_size, None);
        assert!(mega8.memory(MemoryKind::Eeprom).require_page_size(MemoryKind::Eeprom).is_err());
    }

    #[test]
    fn test_load_overrides_by_name() {
        let mut db = ChipDatabase::new();
        db.load_ron(BUILTIN_RON).unwrap();
        let before = db.len();

        let custom = r#"(
            chips: [
                (
                    name: "ATtiny85",
                    signature: (read: [0x30, 0x00, 0x00, 0x00], size: 3, expected: [0x1E, 0x93, 0x0B]),
                    pgm_enable: [0xAC, 0x53, 0x00, 0x00],
                    erase: (cmd: [0xAC, 0x80, 0x00, 0x00], delay_ms: 20),
                    flash: (page_size: Some(64), address_offset: 1, write_opcode: 0x4C),
                    eeprom: (page_size: Some(4), write_opcode: 0xC2),
                ),
            ],
        )"#;
        assert_eq!(db.load_ron(custom).unwrap(), 1);
        assert_eq!(db.len(), before);
        assert_eq!(db.find("attiny85").unwrap().erase.delay_ms, 20);
    }

    #[test]
    fn test_rejects_inconsistent_signature() {
        let bad = r#"(
            chips: [
                (
                    name: "broken",
                    signature: (read: [0x30, 0x00, 0x00, 0x00], size: 3, expected: [0x1E, 0x93]),
                    pgm_enable: [0xAC, 0x53, 0x00, 0x00],
                    erase: (cmd: [0xAC, 0x80, 0x00, 0x00], delay_ms: 10),
                    flash: (page_size: Some(64), address_offset: 1, write_opcode: 0x4C),
                    eeprom: (write_opcode: 0xC2),
                ),
            ],
        )"#;
        let mut db = ChipDatabase::new();
        assert!(matches!(db.load_ron(bad), Err(ChipDbError::Validation(_))));
    }

    fn chip_ron(name: &str, flash_offset: u8) -> String {
        format!(
            r#"(
                name: "{name}",
                signature: (read: [0x30, 0x00, 0x00, 0x00], size: 3, expected: [0x1E, 0x93, 0x0B]),
                pgm_enable: [0xAC, 0x53, 0x00, 0x00],
                erase: (cmd: [0xAC, 0x80, 0x00, 0x00], delay_ms: 20),
                flash: (page_size: Some(64), address_offset: {flash_offset}, write_opcode: 0x4C),
                eeprom: (page_size: Some(4), write_opcode: 0xC2),
            )"#
        )
    }

    #[test]
    fn test_rejects_oversized_address_offset() {
        let bad = format!("(chips: [{}])", chip_ron("wide", 64));
        let mut db = ChipDatabase::new();
        assert!(matches!(db.load_ron(&bad), Err(ChipDbError::Validation(_))));
        assert!(db.is_empty());

        let bad = format!("(chips: [{}])", chip_ron("wide", 255));
        assert!(matches!(db.load_ron(&bad), Err(ChipDbError::Validation(_))));
    }

    #[test]
    fn test_invalid_file_is_not_partially_applied() {
        let mut db = ChipDatabase::new();
        db.load_ron(BUILTIN_RON).unwrap();
        let before: Vec<ChipProfile> = db.chips().iter().map(|c| (**c).clone()).collect();

        // The first chip is valid and would replace attiny85, the second is not
        let file = format!(
            "(chips: [{}, {}])",
            chip_ron("attiny85", 1),
            chip_ron("broken", 200)
        );
        assert!(matches!(db.load_ron(&file), Err(ChipDbError::Validation(_))));

        let after: Vec<ChipProfile> = db.chips().iter().map(|c| (**c).clone()).collect();
        assert_eq!(after, before);
        assert_eq!(db.find("attiny85").unwrap().erase.delay_ms, 10);
        assert!(db.find("broken").is_none());
    }
}
