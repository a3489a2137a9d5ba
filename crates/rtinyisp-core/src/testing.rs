//! Recording transport for unit tests

use crate::chip::{IspCommand, MemoryProfile};
use crate::error::{TransportError, TransportResult};
use crate::programmer::IspTransport;

/// Every transport call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    Spi(IspCommand),
    SetSck(u8),
    PowerDown,
    WriteFlash { delay: u16, address: u32, data: Vec<u8> },
    WriteEeprom { delay: u16, address: u32, data: Vec<u8> },
    ReadFlash { delay: u16, address: u32, len: usize },
    ReadEeprom { delay: u16, address: u32, len: usize },
    Close,
    Delay(u32),
}

/// Latch opcodes the mock recognises
const LATCH_OPCODES: [u8; 3] = [0x4C, 0xC2, 0xC0];
const SIGNATURE_OPCODE: u8 = 0x30;

#[derive(Debug, Default)]
pub struct MockTransport {
    pub calls: Vec<Call>,
    /// Fail this many latches before accepting one
    pub latch_failures: u32,
    /// Reject every latch
    pub latch_always_fails: bool,
    /// Fail every SPI transaction after this many succeeded
    pub fail_spi_after: Option<usize>,
    /// Fail the block write at this byte address
    pub fail_block_write_at: Option<u32>,
    pub fail_open: bool,
    pub fail_set_sck: bool,
    pub fail_power_down: bool,
    /// Bytes returned for signature reads, by index
    pub signature: Vec<u8>,
    /// Reply to any other SPI transaction
    pub spi_reply: [u8; 4],
    /// Backing store for paged reads; unset bytes read as 0xFF
    pub flash: Vec<u8>,
    pub eeprom: Vec<u8>,
    spi_count: usize,
    latch_count: u32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses of every latch attempt, successful or not
    pub fn latches(&self) -> Vec<u16> {
        self.spi_commands()
            .into_iter()
            .filter(|cmd| LATCH_OPCODES.contains(&cmd[0]))
            .map(|cmd| u16::from_be_bytes([cmd[1], cmd[2]]))
            .collect()
    }

    pub fn spi_commands(&self) -> Vec<IspCommand> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Spi(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub fn flash_writes(&self) -> Vec<(u32, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::WriteFlash { address, data, .. } => Some((*address, data.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn eeprom_writes(&self) -> Vec<(u32, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::WriteEeprom { address, data, .. } => Some((*address, data.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn flash_reads(&self) -> Vec<(u32, usize)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::ReadFlash { address, len, .. } => Some((*address, *len)),
                _ => None,
            })
            .collect()
    }

    fn read_from(store: &[u8], address: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| store.get(address as usize + i).copied().unwrap_or(0xFF))
            .collect()
    }
}

impl IspTransport for MockTransport {
    fn open(&mut self) -> TransportResult<()> {
        self.calls.push(Call::Open);
        if self.fail_open {
            return Err(TransportError::new(
                crate::error::TransportErrorKind::Open,
                "no such device",
            ));
        }
        Ok(())
    }

    fn spi(&mut self, cmd: IspCommand) -> TransportResult<[u8; 4]> {
        self.calls.push(Call::Spi(cmd));

        if let Some(limit) = self.fail_spi_after {
            if self.spi_count >= limit {
                return Err(TransportError::transfer("spi failed"));
            }
        }
        self.spi_count += 1;

        if LATCH_OPCODES.contains(&cmd[0]) {
            self.latch_count += 1;
            let busy = TransportError::transfer(format!("busy (latch {})", self.latch_count));
            if self.latch_always_fails {
                return Err(busy);
            }
            if self.latch_failures > 0 {
                self.latch_failures -= 1;
                return Err(busy);
            }
            return Ok([0; 4]);
        }

        if cmd[0] == SIGNATURE_OPCODE {
            let byte = self.signature.get(cmd[2] as usize).copied().unwrap_or(0);
            return Ok([0, SIGNATURE_OPCODE, cmd[1], byte]);
        }

        Ok(self.spi_reply)
    }

    fn set_sck(&mut self, period: u8) -> TransportResult<()> {
        self.calls.push(Call::SetSck(period));
        if self.fail_set_sck {
            return Err(TransportError::transfer("set sck failed"));
        }
        Ok(())
    }

    fn power_down(&mut self) -> TransportResult<()> {
        self.calls.push(Call::PowerDown);
        if self.fail_power_down {
            return Err(TransportError::transfer("power down failed"));
        }
        Ok(())
    }

    fn write_flash(&mut self, delay: u16, address: u32, data: &[u8]) -> TransportResult<()> {
        self.calls.push(Call::WriteFlash {
            delay,
            address,
            data: data.to_vec(),
        });
        if self.fail_block_write_at == Some(address) {
            return Err(TransportError::transfer("write failed"));
        }
        Ok(())
    }

    fn write_eeprom(&mut self, delay: u16, address: u32, data: &[u8]) -> TransportResult<()> {
        self.calls.push(Call::WriteEeprom {
            delay,
            address,
            data: data.to_vec(),
        });
        if self.fail_block_write_at == Some(address) {
            return Err(TransportError::transfer("write failed"));
        }
        Ok(())
    }

    fn read_flash(&mut self, delay: u16, address: u32, len: usize) -> TransportResult<Vec<u8>> {
        self.calls.push(Call::ReadFlash {
            delay,
            address,
            len,
        });
        Ok(Self::read_from(&self.flash, address, len))
    }

    fn read_eeprom(&mut self, delay: u16, address: u32, len: usize) -> TransportResult<Vec<u8>> {
        self.calls.push(Call::ReadEeprom {
            delay,
            address,
            len,
        });
        Ok(Self::read_from(&self.eeprom, address, len))
    }

    fn close(&mut self) {
        self.calls.push(Call::Close);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(Call::Delay(ms));
    }
}

/// Flash profile with word addressing and the usual commit opcode
pub fn flash_profile(page_size: usize) -> MemoryProfile {
    MemoryProfile {
        page_size: Some(page_size),
        address_offset: 1,
        write_opcode: 0x4C,
        delay_ms: 6,
    }
}
