//! Address latch with busy polling
//!
//! While the chip is still committing the previous page it rejects the
//! address load instruction, and the dongle reports that as a plain
//! transfer failure. There is no separate busy status, so every failure of
//! the latch is treated as "busy" and retried until the policy runs out.

use maybe_async::maybe_async;

use crate::chip::{IspCommand, MemoryKind, MemoryProfile};
use crate::error::{InputError, Result, TransportResult};
use crate::programmer::IspTransport;

/// Retry bound and spacing for address latching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchPolicy {
    /// Total latch attempts, including the first
    pub attempts: u32,
    /// Delay between attempts
    pub interval_ms: u32,
}

impl LatchPolicy {
    /// Policy for discrete external programmers
    pub const STANDARD: LatchPolicy = LatchPolicy {
        attempts: 15,
        interval_ms: 50,
    };

    /// Policy for programmers integrated into the target board
    pub const EXTENDED: LatchPolicy = LatchPolicy {
        attempts: 35,
        interval_ms: 100,
    };

    /// Create a custom policy
    pub const fn new(attempts: u32, interval_ms: u32) -> Self {
        Self {
            attempts,
            interval_ms,
        }
    }
}

impl Default for LatchPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Build the 4-byte address load instruction
pub fn latch_command(opcode: u8, device_address: u16) -> IspCommand {
    [
        opcode,
        (device_address >> 8) as u8,
        (device_address & 0xFF) as u8,
        0x00,
    ]
}

/// Issue a single address load instruction
#[maybe_async]
pub async fn load_address<T: IspTransport + ?Sized>(
    transport: &mut T,
    opcode: u8,
    device_address: u16,
) -> TransportResult<()> {
    transport
        .spi(latch_command(opcode, device_address))
        .await
        .map(|_| ())
}

/// Latch the page at `byte_address`, retrying while the chip is busy
///
/// The byte address is shifted by the memory's `address_offset` first.
/// Returns the number of attempts it took. When the policy is exhausted the
/// last transport error is returned.
#[maybe_async]
pub async fn poll_for_address<T: IspTransport + ?Sized>(
    transport: &mut T,
    kind: MemoryKind,
    memory: &MemoryProfile,
    byte_address: usize,
    policy: LatchPolicy,
) -> Result<u32> {
    let out_of_range =
        || InputError::AddressOutOfRange(u32::try_from(byte_address).unwrap_or(u32::MAX));
    let device_address = memory
        .device_address(byte_address)
        .ok_or_else(out_of_range)?;
    let device_address = u16::try_from(device_address).map_err(|_| out_of_range())?;
    let attempts = policy.attempts.max(1);
    let mut tries = 0;

    loop {
        tries += 1;
        match load_address(transport, memory.write_opcode, device_address).await {
            Ok(()) => {
                log::trace!(
                    "{} address 0x{:04X} latched after {} attempt(s)",
                    kind,
                    device_address,
                    tries
                );
                return Ok(tries);
            }
            Err(e) if tries < attempts => {
                log::trace!("{} address latch busy, retrying {}: {}", kind, tries, e);
                transport.delay_ms(policy.interval_ms).await;
            }
            Err(e) => {
                log::debug!(
                    "{} address 0x{:04X}: ran out of attempts after {}",
                    kind,
                    device_address,
                    tries
                );
                return Err(e.into());
            }
        }
    }
}
