//! Error types for rtinyisp-core
//!
//! Every failure falls into one of four families: bad static configuration,
//! bad caller input, an opaque transport failure, or a verification
//! mismatch. Only the address latch loop ever swallows an error, and only
//! until its retry bound runs out.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::chip::MemoryKind;

/// Invalid or missing static configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// SCK rate outside the range the programmer accepts
    #[error("could not set SCK: rate {rate} should be a number between {min} and {max}")]
    SckOutOfRange {
        /// Requested rate
        rate: u32,
        /// Lowest accepted rate
        min: u32,
        /// Highest accepted rate
        max: u32,
    },

    /// The chip profile has no page size for the memory being written
    #[error("could not write {0}: pageSize is not set for your chip")]
    PageSizeMissing(MemoryKind),

    /// A custom programmer was requested without both USB ids
    #[error("custom programmer requires both vid and pid")]
    CustomProgrammerIds,

    /// No chip profile with this name
    #[error("unknown chip: {0}")]
    UnknownChip(String),

    /// No programmer profile with this name
    #[error("unknown programmer: {0}")]
    UnknownProgrammer(String),

    /// The chip database could not be loaded
    #[error("chip database: {0}")]
    ChipDatabase(String),
}

/// Caller supplied data that is absent or malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The source file does not exist
    #[error("please supply a valid path to a hex file: {} not found", .0.display())]
    SourceNotFound(PathBuf),

    /// The source file exists but could not be decoded
    #[error("malformed hex file {}: {reason}", .path.display())]
    MalformedSource {
        /// Offending file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Neither a buffer nor a file was supplied
    #[error("please supply either a hex buffer or a valid path to a hex file")]
    NoSource,

    /// Reading the source failed for a reason other than a missing file
    #[error("could not read source: {0}")]
    Io(String),

    /// Latched address does not fit the 16-bit address field
    #[error("address 0x{0:X} does not fit the 16-bit device address")]
    AddressOutOfRange(u32),
}

/// Broad classification of a transport failure
///
/// The session never branches on this; it is carried for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established
    Open,
    /// A USB/SPI transfer failed
    Transfer,
    /// A transfer timed out
    Timeout,
    /// An operation was issued on a closed connection
    NotOpen,
    /// The device replied with an unexpected payload
    InvalidResponse,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open failed"),
            Self::Transfer => write!(f, "transfer failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::NotOpen => write!(f, "connection not open"),
            Self::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Opaque failure reported by the underlying connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Failure class
    pub kind: TransportErrorKind,
    /// Human readable detail from the transport
    pub message: String,
}

impl TransportError {
    /// Create a transport error of the given kind
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a failed transfer
    pub fn transfer(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Transfer, message)
    }

    /// Shorthand for an operation on a closed connection
    pub fn not_open() -> Self {
        Self::new(TransportErrorKind::NotOpen, "programmer is not open")
    }
}

/// Expected negative outcome of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Chip signature differs from the expected one
    #[error("signature does not match: expected {expected:02X?}, got {actual:02X?}")]
    SignatureMismatch {
        /// Expected signature bytes
        expected: Vec<u8>,
        /// Signature bytes that were compared against
        actual: Vec<u8>,
    },

    /// Read-back memory differs from the image
    #[error("{kind} verify failed at 0x{address:04X}: expected 0x{expected:02X}, found 0x{found:02X}")]
    DataMismatch {
        /// Memory that was read back
        kind: MemoryKind,
        /// Byte address of the first differing byte
        address: usize,
        /// Byte from the image
        expected: u8,
        /// Byte read from the chip
        found: u8,
    },
}

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Static configuration fault
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Caller input fault
    #[error(transparent)]
    Input(#[from] InputError),
    /// Transport fault
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Comparison failed
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Result type for transport capability calls
pub type TransportResult<T> = core::result::Result<T, TransportError>;
