//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a USB id as hex (with or without 0x) or decimal
fn parse_usb_id(s: &str) -> Result<u16, String> {
    let value = parse_hex_u32(s)?;
    u16::try_from(value).map_err(|_| format!("USB id out of range: {}", s))
}

#[derive(Parser)]
#[command(name = "rtinyisp")]
#[command(author, version, about = "AVR in-system programmer for USBtinyISP dongles", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Extra chip database file or directory (contains .ron files)
    /// Entries override the built-in chips of the same name
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Memory to operate on
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryArg {
    /// Program memory
    #[default]
    Flash,
    /// Data EEPROM
    Eeprom,
}

/// Programmer and target selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Programmer to use (see list-programmers, or "custom" with --vid/--pid)
    #[arg(short, long, default_value = "sf-pocket-avr")]
    pub programmer: String,

    /// USB vendor id for a custom programmer
    #[arg(long, value_parser = parse_usb_id)]
    pub vid: Option<u16>,

    /// USB product id for a custom programmer
    #[arg(long, value_parser = parse_usb_id)]
    pub pid: Option<u16>,

    /// Target chip (see list-chips)
    #[arg(short, long)]
    pub chip: String,

    /// SCK period setting (1-250, larger is slower)
    #[arg(long, default_value_t = 10)]
    pub sck: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read the chip signature and check it against the chip profile
    Signature {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Write an Intel HEX (or raw .bin) image
    Write {
        #[command(flatten)]
        target: TargetArgs,

        /// Memory to write
        #[arg(short, long, value_enum, default_value_t = MemoryArg::Flash)]
        memory: MemoryArg,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Erase the chip before writing
        #[arg(long)]
        erase: bool,

        /// Verify after writing
        #[arg(long)]
        verify: bool,
    },

    /// Read memory contents to a raw binary file
    Read {
        #[command(flatten)]
        target: TargetArgs,

        /// Memory to read
        #[arg(short, long, value_enum, default_value_t = MemoryArg::Flash)]
        memory: MemoryArg,

        /// Number of bytes to read (hex with 0x prefix, or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: u32,

        /// Start address (hex with 0x prefix, or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Compare memory contents with an image
    Verify {
        #[command(flatten)]
        target: TargetArgs,

        /// Memory to verify
        #[arg(short, long, value_enum, default_value_t = MemoryArg::Flash)]
        memory: MemoryArg,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Erase flash and EEPROM
    Erase {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List supported chips
    ListChips,

    /// List supported programmers
    ListProgrammers,
}
