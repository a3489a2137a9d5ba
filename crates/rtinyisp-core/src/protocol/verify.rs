//! Read-back verification

use maybe_async::maybe_async;

use super::page::WriteProgress;
use super::read_block;
use crate::chip::MemoryKind;
use crate::error::{InputError, Result, VerificationError};
use crate::programmer::IspTransport;

/// Largest block requested from the dongle in one paged read
pub const READ_CHUNK: usize = 128;

/// Find the first byte where `found` differs from `expected`
///
/// A short read-back counts as a mismatch at the first missing byte, which
/// is reported as read back erased.
pub fn compare(
    kind: MemoryKind,
    expected: &[u8],
    found: &[u8],
) -> core::result::Result<(), VerificationError> {
    for (address, &want) in expected.iter().enumerate() {
        let got = found.get(address).copied();
        if got != Some(want) {
            return Err(VerificationError::DataMismatch {
                kind,
                address,
                expected: want,
                found: got.unwrap_or(crate::source::ERASED),
            });
        }
    }
    Ok(())
}

/// Read back `expected.len()` bytes and compare them against `expected`
#[maybe_async]
pub async fn verify_memory<T: IspTransport + ?Sized>(
    transport: &mut T,
    kind: MemoryKind,
    delay: u16,
    expected: &[u8],
    progress: &mut dyn WriteProgress,
) -> Result<()> {
    progress.started(kind, expected.len());
    let mut address = 0;
    while address < expected.len() {
        let chunk = (expected.len() - address).min(READ_CHUNK);
        let addr = u32::try_from(address).map_err(|_| InputError::AddressOutOfRange(u32::MAX))?;
        let block = read_block(transport, kind, delay, addr, chunk).await?;
        let want = &expected[address..address + chunk];
        compare(kind, want, &block).map_err(|e| offset_mismatch(e, address))?;
        progress.page_written(address, chunk);
        address += chunk;
    }
    progress.finished();
    Ok(())
}

fn offset_mismatch(err: VerificationError, base: usize) -> VerificationError {
    match err {
        VerificationError::DataMismatch {
            kind,
            address,
            expected,
            found,
        } => VerificationError::DataMismatch {
            kind,
            address: base + address,
            expected,
            found,
        },
        other => other,
    }
}
