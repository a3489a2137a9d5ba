//! Programmer traits and profiles
//!
//! This module defines the capability trait every ISP dongle implements and
//! the static table of known dongles.

mod profile;
mod traits;

pub use profile::*;
pub use traits::*;
