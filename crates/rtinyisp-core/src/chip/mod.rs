//! AVR chip types and database
//!
//! This module provides the per-chip opcode and timing tables the session
//! programs against, and a database of known chips.

mod database;
mod types;

pub use database::*;
pub use types::*;
