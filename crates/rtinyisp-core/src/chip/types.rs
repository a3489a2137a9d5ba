//! AVR chip profile definitions

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// A raw 4-byte serial programming instruction
pub type IspCommand = [u8; 4];

/// Memory type targeted by a read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Program memory
    Flash,
    /// Data EEPROM
    Eeprom,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flash => write!(f, "flash"),
            Self::Eeprom => write!(f, "eeprom"),
        }
    }
}

/// Per-memory paging parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryProfile {
    /// Page size in bytes; `None` when the memory cannot be page written
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Right shift applied to a byte offset before it is latched
    #[serde(default)]
    pub address_offset: u8,
    /// Opcode that latches the page address (the page commit instruction)
    pub write_opcode: u8,
    /// Delay parameter handed to the transport's paged read primitive
    #[serde(default)]
    pub delay_ms: u16,
}

impl MemoryProfile {
    /// Page size for this memory, or a config fault naming `kind`
    pub fn require_page_size(&self, kind: MemoryKind) -> Result<usize, ConfigError> {
        self.page_size
            .filter(|&size| size > 0)
            .ok_or(ConfigError::PageSizeMissing(kind))
    }

    /// Device address for a raw byte offset
    ///
    /// `None` when `address_offset` is wider than `usize`.
    pub fn device_address(&self, byte_address: usize) -> Option<usize> {
        byte_address.checked_shr(u32::from(self.address_offset))
    }
}

/// Chip erase instruction and its settle time
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EraseProfile {
    /// Erase instruction
    #[serde(deserialize_with = "isp_command")]
    pub cmd: IspCommand,
    /// Time the chip needs after the erase instruction
    pub delay_ms: u32,
}

/// Signature read instruction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignatureProfile {
    /// Read instruction; byte 2 carries the signature byte index
    #[serde(deserialize_with = "isp_command")]
    pub read: IspCommand,
    /// Number of signature bytes
    pub size: usize,
    /// Signature this chip model should report
    #[serde(default)]
    pub expected: Vec<u8>,
}

/// Static description of an AVR chip
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChipProfile {
    /// Chip name (lowercase, e.g. "attiny85")
    pub name: String,
    /// Signature read parameters
    pub signature: SignatureProfile,
    /// Programming enable instruction
    #[serde(deserialize_with = "isp_command")]
    pub pgm_enable: IspCommand,
    /// Chip erase parameters
    pub erase: EraseProfile,
    /// Program memory parameters
    pub flash: MemoryProfile,
    /// EEPROM parameters
    pub eeprom: MemoryProfile,
}

impl ChipProfile {
    /// Parameters for the given memory
    pub fn memory(&self, kind: MemoryKind) -> &MemoryProfile {
        match kind {
            MemoryKind::Flash => &self.flash,
            MemoryKind::Eeprom => &self.eeprom,
        }
    }
}

fn isp_command<'de, D>(deserializer: D) -> Result<IspCommand, D::Error>
where
    D: Deserializer<'de>,
{
    let bytes = Vec::<u8>::deserialize(deserializer)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| serde::de::Error::invalid_length(len, &"a 4-byte instruction"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flash() -> MemoryProfile {
        MemoryProfile {
            page_size: Some(64),
            address_offset: 1,
            write_opcode: 0x4C,
            delay_ms: 6,
        }
    }

    #[test]
    fn test_device_address_shift() {
        let mem = flash();
        assert_eq!(mem.device_address(0), Some(0));
        assert_eq!(mem.device_address(64), Some(32));
        assert_eq!(mem.device_address(128), Some(64));
    }

    #[test]
    fn test_device_address_oversized_shift() {
        let mut mem = flash();
        mem.address_offset = u8::MAX;
        assert_eq!(mem.device_address(64), None);
    }

    #[test]
    fn test_require_page_size() {
        let mut mem = flash();
        assert_eq!(mem.require_page_size(MemoryKind::Flash), Ok(64));

        mem.page_size = None;
        assert_eq!(
            mem.require_page_size(MemoryKind::Flash),
            Err(ConfigError::PageSizeMissing(MemoryKind::Flash))
        );

        mem.page_size = Some(0);
        assert_eq!(
            mem.require_page_size(MemoryKind::Eeprom),
            Err(ConfigError::PageSizeMissing(MemoryKind::Eeprom))
        );
    }

    #[test]
    fn test_rejects_short_instruction() {
        let text = "(cmd: [0xAC, 0x80, 0x00], delay_ms: 10)";
        assert!(ron::from_str::<EraseProfile>(text).is_err());
    }
}
