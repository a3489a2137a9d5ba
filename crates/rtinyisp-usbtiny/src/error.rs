//! Error types for the USBtinyISP programmer

use std::fmt;

use rtinyisp_core::error::{TransportError, TransportErrorKind};

/// Result type for USBtinyISP operations
pub type Result<T> = std::result::Result<T, UsbTinyError>;

/// Errors that can occur when using a USBtinyISP programmer
#[derive(Debug)]
pub enum UsbTinyError {
    /// No device with the requested ids is connected
    DeviceNotFound {
        /// Vendor id searched for
        vid: u16,
        /// Product id searched for
        pid: u16,
    },
    /// Failed to open device
    OpenFailed(String),
    /// Failed to claim interface
    ClaimFailed(String),
    /// USB transfer failed
    TransferFailed(String),
    /// Device replied with fewer bytes than requested
    ShortReply {
        /// Bytes requested
        expected: usize,
        /// Bytes received
        actual: usize,
    },
    /// Byte address does not fit the setup packet's index field
    AddressOutOfRange(u32),
    /// Operation issued before `open` or after `close`
    NotOpen,
}

impl fmt::Display for UsbTinyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbTinyError::DeviceNotFound { vid, pid } => {
                write!(f, "USBtinyISP not found (VID:{:04X} PID:{:04X})", vid, pid)
            }
            UsbTinyError::OpenFailed(msg) => write!(f, "Failed to open USBtinyISP: {}", msg),
            UsbTinyError::ClaimFailed(msg) => write!(f, "Failed to claim interface: {}", msg),
            UsbTinyError::TransferFailed(msg) => write!(f, "USB transfer failed: {}", msg),
            UsbTinyError::ShortReply { expected, actual } => {
                write!(f, "Short reply: expected {} bytes, got {}", expected, actual)
            }
            UsbTinyError::AddressOutOfRange(addr) => {
                write!(f, "Address 0x{:X} out of range for USBtinyISP", addr)
            }
            UsbTinyError::NotOpen => write!(f, "USBtinyISP is not open"),
        }
    }
}

impl std::error::Error for UsbTinyError {}

impl From<nusb::Error> for UsbTinyError {
    fn from(e: nusb::Error) -> Self {
        UsbTinyError::OpenFailed(e.to_string())
    }
}

impl From<nusb::transfer::TransferError> for UsbTinyError {
    fn from(e: nusb::transfer::TransferError) -> Self {
        UsbTinyError::TransferFailed(e.to_string())
    }
}

impl From<UsbTinyError> for TransportError {
    fn from(e: UsbTinyError) -> Self {
        let kind = match &e {
            UsbTinyError::DeviceNotFound { .. }
            | UsbTinyError::OpenFailed(_)
            | UsbTinyError::ClaimFailed(_) => TransportErrorKind::Open,
            UsbTinyError::TransferFailed(_) | UsbTinyError::AddressOutOfRange(_) => {
                TransportErrorKind::Transfer
            }
            UsbTinyError::ShortReply { .. } => TransportErrorKind::InvalidResponse,
            UsbTinyError::NotOpen => TransportErrorKind::NotOpen,
        };
        TransportError::new(kind, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_transport_error() {
        let err: TransportError = UsbTinyError::NotOpen.into();
        assert_eq!(err.kind, TransportErrorKind::NotOpen);

        let err: TransportError = UsbTinyError::DeviceNotFound {
            vid: 0x1781,
            pid: 0x0C9F,
        }
        .into();
        assert_eq!(err.kind, TransportErrorKind::Open);
        assert!(err.message.contains("1781"));

        let err: TransportError = UsbTinyError::ShortReply {
            expected: 4,
            actual: 2,
        }
        .into();
        assert_eq!(err.kind, TransportErrorKind::InvalidResponse);
    }
}
