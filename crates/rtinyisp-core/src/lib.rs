//! rtinyisp-core - Core library for AVR in-system programming
//!
//! This crate drives the AVR serial programming protocol through a dongle
//! that only exposes a raw 4-byte SPI transaction plus paged memory
//! primitives (USBtinyISP and compatibles). It sequences program enable,
//! chip erase, signature reads and page-by-page writes, and copes with the
//! chip rejecting address latches while it is still committing a page.
//!
//! The transport itself lives behind [`programmer::IspTransport`]; concrete
//! dongles are implemented in separate crates.
//!
//! # Features
//!
//! - `is_sync` (default) - Compile the transport trait and the session as
//!   blocking code. Without it everything is `async`.
//!
//! # Example
//!
//! ```ignore
//! use rtinyisp_core::chip::ChipDatabase;
//! use rtinyisp_core::programmer::ProgrammerProfile;
//! use rtinyisp_core::{MemorySource, Session, SessionConfig};
//!
//! let chip = ChipDatabase::builtin().require("attiny85")?;
//! let programmer = ProgrammerProfile::find("sf-pocket-avr")?;
//! let config = SessionConfig::new(chip, programmer);
//!
//! let mut session = Session::open(transport, config)?;
//! session.enter_programming_mode()?;
//! session.write_flash(MemorySource::HexFile("blink.hex".as_ref()))?;
//! session.exit_programming_mode()?;
//! session.close();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

pub mod chip;
pub mod config;
pub mod error;
pub mod programmer;
pub mod protocol;
pub mod session;
pub mod source;

#[cfg(all(test, feature = "is_sync"))]
mod testing;

pub use config::{SessionConfig, Verbosity};
pub use error::{Error, Result};
pub use session::{Session, SessionState};
pub use source::MemorySource;
