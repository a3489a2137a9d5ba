//! Signature reads

use maybe_async::maybe_async;

use crate::chip::SignatureProfile;
use crate::error::{TransportResult, VerificationError};
use crate::programmer::IspTransport;

/// Reply byte that carries the signature byte
pub const SIGNATURE_REPLY_OFFSET: usize = 3;

/// Index byte within the read instruction
const SIGNATURE_INDEX_BYTE: usize = 2;

/// Read the chip signature, one byte per SPI transaction
///
/// The first transaction sends the profile's read instruction as is; every
/// later transaction `i` carries `i` in its index byte. The first transport
/// failure aborts the read.
#[maybe_async]
pub async fn read_signature<T: IspTransport + ?Sized>(
    transport: &mut T,
    profile: &SignatureProfile,
) -> TransportResult<Vec<u8>> {
    let mut signature = Vec::with_capacity(profile.size);
    let mut cmd = profile.read;

    for index in 0..profile.size {
        if index > 0 {
            // Index fits: database validation caps size at 256
            cmd[SIGNATURE_INDEX_BYTE] = index as u8;
        }
        let reply = transport.spi(cmd).await?;
        signature.push(reply[SIGNATURE_REPLY_OFFSET]);
    }

    log::trace!("Read signature {:02X?}", signature);
    Ok(signature)
}

/// Compare two signatures byte for byte
pub fn verify_signature(expected: &[u8], actual: &[u8]) -> Result<(), VerificationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(VerificationError::SignatureMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        })
    }
}
