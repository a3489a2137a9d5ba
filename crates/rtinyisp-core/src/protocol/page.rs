//! Page writer
//!
//! An image is written one page at a time: the page's bytes go to the
//! dongle's paged write primitive, then the page address is latched to
//! commit it. The latch is the busy poll, so the next page is only sent
//! once the previous one has been accepted.

use maybe_async::maybe_async;

use super::latch::{poll_for_address, LatchPolicy};
use super::write_block;
use crate::chip::{MemoryKind, MemoryProfile};
use crate::error::{InputError, Result};
use crate::programmer::IspTransport;

/// Progress callbacks for page writes and read-back
///
/// All methods default to doing nothing.
pub trait WriteProgress {
    /// Called once before the first page with the total byte count
    fn started(&mut self, _kind: MemoryKind, _total: usize) {}

    /// Called after each page has been written and latched
    fn page_written(&mut self, _address: usize, _len: usize) {}

    /// Called once after the last page
    fn finished(&mut self) {}
}

/// Progress sink that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl WriteProgress for NoProgress {}

/// Pages an image of `len` bytes splits into, `None` for a zero page size
pub fn page_count(len: usize, page_size: usize) -> Option<usize> {
    (page_size > 0).then(|| len.div_ceil(page_size))
}

/// Write `data` page by page, latching each page after it is sent
///
/// The page size comes from `memory` and must be set and non-zero. The last
/// page may be short. Stops at the first failure, whether it comes from the
/// block write or from an exhausted latch.
#[maybe_async]
pub async fn write_pages<T: IspTransport + ?Sized>(
    transport: &mut T,
    kind: MemoryKind,
    memory: &MemoryProfile,
    data: &[u8],
    policy: LatchPolicy,
    progress: &mut dyn WriteProgress,
) -> Result<()> {
    let page_size = memory.require_page_size(kind)?;
    progress.started(kind, data.len());

    let mut cursor = 0;
    while cursor < data.len() {
        let end = (cursor + page_size).min(data.len());
        let page = &data[cursor..end];
        let address =
            u32::try_from(cursor).map_err(|_| InputError::AddressOutOfRange(u32::MAX))?;

        log::trace!(
            "{}: writing {} bytes at 0x{:04X}",
            kind,
            page.len(),
            cursor
        );
        write_block(transport, kind, 0, address, page).await?;
        poll_for_address(transport, kind, memory, cursor, policy).await?;

        progress.page_written(cursor, page.len());
        cursor += page_size;
    }

    progress.finished();
    Ok(())
}
