//! USBtinyISP device implementation
//!
//! This module provides the `UsbTiny` struct that talks to the dongle over
//! USB vendor control transfers.

use std::thread;
use std::time::Duration;

use maybe_async::maybe_async;
use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient};
use nusb::{Interface, MaybeFuture};
use rtinyisp_core::chip::IspCommand;
use rtinyisp_core::error::TransportResult;
use rtinyisp_core::programmer::{IspTransport, ProgrammerProfile};

use crate::error::{Result, UsbTinyError};
use crate::protocol::*;

/// USBtinyISP programmer
///
/// Created closed; [`IspTransport::open`] looks the device up by USB ids and
/// claims its interface.
pub struct UsbTiny {
    vid: u16,
    pid: u16,
    interface: Option<Interface>,
}

impl UsbTiny {
    /// Create a handle for the device with these USB ids
    pub fn new(vid: u16, pid: u16) -> Self {
        Self {
            vid,
            pid,
            interface: None,
        }
    }

    /// Create a handle for the device described by a programmer profile
    pub fn from_profile(profile: &ProgrammerProfile) -> Self {
        Self::new(profile.vid, profile.pid)
    }

    /// USB ids this handle opens
    pub fn ids(&self) -> (u16, u16) {
        (self.vid, self.pid)
    }

    /// Whether the interface is currently claimed
    pub fn is_open(&self) -> bool {
        self.interface.is_some()
    }

    fn open_device(&mut self) -> Result<()> {
        let device_info = nusb::list_devices()
            .wait()
            .map_err(|e| UsbTinyError::OpenFailed(e.to_string()))?
            .find(|d| d.vendor_id() == self.vid && d.product_id() == self.pid)
            .ok_or(UsbTinyError::DeviceNotFound {
                vid: self.vid,
                pid: self.pid,
            })?;

        log::info!(
            "Opening USBtinyISP at bus {} address {}",
            device_info.busnum(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbTinyError::OpenFailed(e.to_string()))?;

        let interface = device
            .claim_interface(0)
            .wait()
            .map_err(|e| UsbTinyError::ClaimFailed(e.to_string()))?;

        self.interface = Some(interface);
        Ok(())
    }

    fn interface(&self) -> Result<&Interface> {
        self.interface.as_ref().ok_or(UsbTinyError::NotOpen)
    }

    /// USB control read
    fn control_read(&self, request: u8, value: u16, index: u16, length: u16) -> Result<Vec<u8>> {
        let data = self
            .interface()?
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    length,
                },
                Duration::from_millis(USB_TIMEOUT_MS),
            )
            .wait()?;

        if data.len() < length as usize {
            return Err(UsbTinyError::ShortReply {
                expected: length as usize,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    /// USB control write
    fn control_write(&self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<()> {
        self.interface()?
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data,
                },
                Duration::from_millis(USB_TIMEOUT_MS),
            )
            .wait()?;
        Ok(())
    }

    fn spi_transfer(&self, cmd: IspCommand) -> Result<[u8; 4]> {
        let (value, index) = spi_setup(cmd);
        let data = self.control_read(REQ_SPI, value, index, SPI_REPLY_LEN)?;
        let mut reply = [0u8; 4];
        reply.copy_from_slice(&data[..4]);
        log::trace!("SPI {:02X?} -> {:02X?}", cmd, reply);
        Ok(reply)
    }

    fn paged_write(&self, request: u8, delay: u16, address: u32, data: &[u8]) -> Result<()> {
        for (chunk_address, len) in chunks(address, data.len()) {
            let offset = (chunk_address - address) as usize;
            let index = usb_index(chunk_address)?;
            self.control_write(request, delay, index, &data[offset..offset + len])?;
        }
        Ok(())
    }

    fn paged_read(&self, request: u8, address: u32, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        for (chunk_address, chunk_len) in chunks(address, len) {
            let index = usb_index(chunk_address)?;
            // chunk_len is at most CHUNK_SIZE
            let data = self.control_read(request, 0, index, chunk_len as u16)?;
            out.extend_from_slice(&data[..chunk_len]);
        }
        Ok(out)
    }
}

fn usb_index(address: u32) -> Result<u16> {
    u16::try_from(address).map_err(|_| UsbTinyError::AddressOutOfRange(address))
}

impl Drop for UsbTiny {
    fn drop(&mut self) {
        if self.interface.is_some() {
            // Leave the target unpowered
            let _ = self.control_read(REQ_POWERDOWN, 0, 0, 0);
        }
    }
}

#[maybe_async(AFIT)]
impl IspTransport for UsbTiny {
    async fn open(&mut self) -> TransportResult<()> {
        if self.interface.is_none() {
            self.open_device()?;
        }
        Ok(())
    }

    async fn spi(&mut self, cmd: IspCommand) -> TransportResult<[u8; 4]> {
        Ok(self.spi_transfer(cmd)?)
    }

    async fn set_sck(&mut self, period: u8) -> TransportResult<()> {
        log::debug!("USBtinyISP power up, SCK period {}", period);
        self.control_read(REQ_POWERUP, period as u16, RESET_LOW, 0)?;
        Ok(())
    }

    async fn power_down(&mut self) -> TransportResult<()> {
        log::debug!("USBtinyISP power down");
        self.control_read(REQ_POWERDOWN, 0, 0, 0)?;
        Ok(())
    }

    async fn write_flash(&mut self, delay: u16, address: u32, data: &[u8]) -> TransportResult<()> {
        Ok(self.paged_write(REQ_FLASH_WRITE, delay, address, data)?)
    }

    async fn write_eeprom(
        &mut self,
        delay: u16,
        address: u32,
        data: &[u8],
    ) -> TransportResult<()> {
        Ok(self.paged_write(REQ_EEPROM_WRITE, delay, address, data)?)
    }

    async fn read_flash(
        &mut self,
        _delay: u16,
        address: u32,
        len: usize,
    ) -> TransportResult<Vec<u8>> {
        Ok(self.paged_read(REQ_FLASH_READ, address, len)?)
    }

    async fn read_eeprom(
        &mut self,
        _delay: u16,
        address: u32,
        len: usize,
    ) -> TransportResult<Vec<u8>> {
        Ok(self.paged_read(REQ_EEPROM_READ, address, len)?)
    }

    fn close(&mut self) {
        if self.interface.take().is_some() {
            log::debug!("USBtinyISP released");
        }
    }

    async fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtinyisp_core::error::TransportErrorKind;

    #[test]
    fn test_from_profile() {
        let usbtiny = UsbTiny::from_profile(&ProgrammerProfile::default());
        assert_eq!(usbtiny.ids(), (0x1781, 0x0C9F));
        assert!(!usbtiny.is_open());
    }

    #[test]
    fn test_usb_index_bounds() {
        assert_eq!(usb_index(0xFFFF).unwrap(), 0xFFFF);
        assert!(matches!(
            usb_index(0x1_0000),
            Err(UsbTinyError::AddressOutOfRange(0x1_0000))
        ));
    }

    #[cfg(feature = "is_sync")]
    #[test]
    fn test_closed_handle_reports_not_open() {
        let mut usbtiny = UsbTiny::new(0x1781, 0x0C9F);
        let err = usbtiny.spi([0x30, 0, 0, 0]).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::NotOpen);
        // Closing an unopened handle is a no-op
        usbtiny.close();
    }
}
