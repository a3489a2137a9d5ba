//! USBtinyISP protocol constants
//!
//! Request codes and limits of the USBtinyISP firmware. Every request is a
//! vendor control transfer addressed to the device.

#![allow(dead_code)]

use rtinyisp_core::chip::IspCommand;

// Vendor request codes
pub const REQ_ECHO: u8 = 0;
pub const REQ_READ: u8 = 1;
pub const REQ_WRITE: u8 = 2;
pub const REQ_CLR: u8 = 3;
pub const REQ_SET: u8 = 4;
pub const REQ_POWERUP: u8 = 5;
pub const REQ_POWERDOWN: u8 = 6;
pub const REQ_SPI: u8 = 7;
pub const REQ_POLL_BYTES: u8 = 8;
pub const REQ_FLASH_READ: u8 = 9;
pub const REQ_FLASH_WRITE: u8 = 10;
pub const REQ_EEPROM_READ: u8 = 11;
pub const REQ_EEPROM_WRITE: u8 = 12;

// Reset line level passed with POWERUP
pub const RESET_LOW: u16 = 0;
pub const RESET_HIGH: u16 = 1;

/// Largest payload of one paged read or write transfer
pub const CHUNK_SIZE: usize = 128;

/// Timeout of every control transfer
pub const USB_TIMEOUT_MS: u64 = 500;

/// Length of an SPI reply
pub const SPI_REPLY_LEN: u16 = 4;

/// Pack a 4-byte instruction into the setup packet's (value, index) pair
///
/// The firmware reads the instruction bytes little-endian from wValue and
/// wIndex.
pub fn spi_setup(cmd: IspCommand) -> (u16, u16) {
    (
        u16::from_le_bytes([cmd[0], cmd[1]]),
        u16::from_le_bytes([cmd[2], cmd[3]]),
    )
}

/// Split a paged access into (address, length) transfers of at most
/// [`CHUNK_SIZE`] bytes
pub fn chunks(address: u32, len: usize) -> impl Iterator<Item = (u32, usize)> {
    (0..len)
        .step_by(CHUNK_SIZE)
        .map(move |offset| (address + offset as u32, (len - offset).min(CHUNK_SIZE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spi_setup_packing() {
        assert_eq!(spi_setup([0xAC, 0x53, 0x00, 0x00]), (0x53AC, 0x0000));
        assert_eq!(spi_setup([0x4C, 0x12, 0x34, 0x00]), (0x124C, 0x0034));
        assert_eq!(spi_setup([0x30, 0x00, 0x02, 0x00]), (0x0030, 0x0002));
    }

    #[test]
    fn test_chunks() {
        let c: Vec<_> = chunks(0, 300).collect();
        assert_eq!(c, vec![(0, 128), (128, 128), (256, 44)]);

        let c: Vec<_> = chunks(64, 64).collect();
        assert_eq!(c, vec![(64, 64)]);

        assert_eq!(chunks(0, 0).count(), 0);
    }
}
