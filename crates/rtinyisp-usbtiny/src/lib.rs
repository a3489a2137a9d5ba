//! rtinyisp-usbtiny - USBtinyISP programmer support
//!
//! This crate drives USBtinyISP-compatible dongles (SparkFun Pocket AVR
//! Programmer, SparkFun Tiny AVR Programmer, Adafruit USBtinyISP, and the
//! Trinket/Gemma boards) over USB vendor control transfers.
//!
//! # Protocol Overview
//!
//! The dongle firmware exposes every operation as a single control request:
//! - `SPI`: one 4-byte serial programming instruction, packed into the
//!   setup packet's value and index fields, with a 4-byte reply
//! - `POWERUP` / `POWERDOWN`: target power, reset and SCK period
//! - `FLASH_*` / `EEPROM_*`: paged memory access, at most 128 bytes per
//!   transfer
//!
//! # Example
//!
//! ```no_run
//! use rtinyisp_core::programmer::{IspTransport, ProgrammerProfile};
//! use rtinyisp_usbtiny::UsbTiny;
//!
//! let mut usbtiny = UsbTiny::from_profile(&ProgrammerProfile::default());
//! usbtiny.open()?;
//! usbtiny.set_sck(10)?;
//! let reply = usbtiny.spi([0xAC, 0x53, 0x00, 0x00])?;
//! println!("Program enable reply: {:02X?}", reply);
//! usbtiny.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;
pub mod protocol;

pub use device::UsbTiny;
pub use error::{Result, UsbTinyError};
