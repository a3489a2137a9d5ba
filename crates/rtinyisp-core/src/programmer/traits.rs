//! Transport capability trait
//!
//! The trait uses `maybe_async` to support both sync and async modes.
//! - By default (`is_sync`), the trait is blocking
//! - Without `is_sync`, every I/O method is `async`

use maybe_async::maybe_async;

use crate::chip::IspCommand;
use crate::error::TransportResult;

/// SPI-over-USB ISP dongle (sync or async depending on `is_sync` feature)
///
/// This is everything the session needs from the hardware: one raw 4-byte
/// SPI transaction, clock/power control, and the dongle's paged memory
/// primitives. Implementations report failures as opaque
/// [`TransportError`](crate::error::TransportError)s; the session treats any
/// failure of an address latch as "chip busy".
///
/// ## Example
///
/// ```ignore
/// impl IspTransport for MyDongle {
///     fn open(&mut self) -> TransportResult<()> {
///         self.handle = Some(usb_open(self.vid, self.pid)?);
///         Ok(())
///     }
///
///     fn spi(&mut self, cmd: IspCommand) -> TransportResult<[u8; 4]> {
///         self.control_in(REQ_SPI, cmd)
///     }
///     // ...
/// }
/// ```
#[maybe_async(AFIT)]
pub trait IspTransport {
    /// Establish the connection to the dongle
    async fn open(&mut self) -> TransportResult<()>;

    /// Issue one SPI transaction and return the 4 reply bytes
    async fn spi(&mut self, cmd: IspCommand) -> TransportResult<[u8; 4]>;

    /// Power the target and set the SCK period
    async fn set_sck(&mut self, period: u8) -> TransportResult<()>;

    /// Remove power from the target, releasing it from programming mode
    async fn power_down(&mut self) -> TransportResult<()>;

    /// Write a block of flash starting at byte `address`
    async fn write_flash(&mut self, delay: u16, address: u32, data: &[u8]) -> TransportResult<()>;

    /// Write a block of EEPROM starting at byte `address`
    async fn write_eeprom(&mut self, delay: u16, address: u32, data: &[u8])
        -> TransportResult<()>;

    /// Read `len` bytes of flash starting at byte `address`
    async fn read_flash(&mut self, delay: u16, address: u32, len: usize)
        -> TransportResult<Vec<u8>>;

    /// Read `len` bytes of EEPROM starting at byte `address`
    async fn read_eeprom(&mut self, delay: u16, address: u32, len: usize)
        -> TransportResult<Vec<u8>>;

    /// Release the connection
    ///
    /// Fire-and-forget; implementations log rather than report failures.
    fn close(&mut self);

    /// Delay for the specified number of milliseconds
    async fn delay_ms(&mut self, ms: u32);
}

// Blanket impl for boxed transports to allow trait objects (sync mode only)
// In async mode, traits with async fn are not object-safe
#[cfg(feature = "is_sync")]
impl IspTransport for Box<dyn IspTransport + Send> {
    fn open(&mut self) -> TransportResult<()> {
        (**self).open()
    }

    fn spi(&mut self, cmd: IspCommand) -> TransportResult<[u8; 4]> {
        (**self).spi(cmd)
    }

    fn set_sck(&mut self, period: u8) -> TransportResult<()> {
        (**self).set_sck(period)
    }

    fn power_down(&mut self) -> TransportResult<()> {
        (**self).power_down()
    }

    fn write_flash(&mut self, delay: u16, address: u32, data: &[u8]) -> TransportResult<()> {
        (**self).write_flash(delay, address, data)
    }

    fn write_eeprom(&mut self, delay: u16, address: u32, data: &[u8]) -> TransportResult<()> {
        (**self).write_eeprom(delay, address, data)
    }

    fn read_flash(&mut self, delay: u16, address: u32, len: usize) -> TransportResult<Vec<u8>> {
        (**self).read_flash(delay, address, len)
    }

    fn read_eeprom(&mut self, delay: u16, address: u32, len: usize) -> TransportResult<Vec<u8>> {
        (**self).read_eeprom(delay, address, len)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
