//! AVR serial programming sequences
//!
//! Free functions over any [`IspTransport`]: address latching with busy
//! polling, the page writer, signature reads and read-back verification.
//! The [`Session`](crate::Session) composes them.
//!
//! Uses `maybe_async` to support both sync and async modes:
//! - With `is_sync` feature: blocking/synchronous
//! - Without `is_sync` feature: async

mod latch;
mod page;
mod signature;
mod verify;

pub use latch::*;
pub use page::*;
pub use signature::*;
pub use verify::*;

use maybe_async::maybe_async;

use crate::chip::MemoryKind;
use crate::error::TransportResult;
use crate::programmer::IspTransport;

/// Write one block through the transport primitive for `kind`
#[maybe_async]
pub async fn write_block<T: IspTransport + ?Sized>(
    transport: &mut T,
    kind: MemoryKind,
    delay: u16,
    address: u32,
    data: &[u8],
) -> TransportResult<()> {
    match kind {
        MemoryKind::Flash => transport.write_flash(delay, address, data).await,
        MemoryKind::Eeprom => transport.write_eeprom(delay, address, data).await,
    }
}

/// Read one block through the transport primitive for `kind`
#[maybe_async]
pub async fn read_block<T: IspTransport + ?Sized>(
    transport: &mut T,
    kind: MemoryKind,
    delay: u16,
    address: u32,
    len: usize,
) -> TransportResult<Vec<u8>> {
    match kind {
        MemoryKind::Flash => transport.read_flash(delay, address, len).await,
        MemoryKind::Eeprom => transport.read_eeprom(delay, address, len).await,
    }
}
