//! rtinyisp-dummy - In-memory AVR target for testing
//!
//! This crate provides a dummy ISP transport that emulates a USBtinyISP
//! dongle with an AVR attached. It's useful for testing and development
//! without real hardware.

use rtinyisp_core::chip::{IspCommand, MemoryKind};
use rtinyisp_core::error::{TransportError, TransportErrorKind, TransportResult};
use rtinyisp_core::programmer::IspTransport;

const PGM_ENABLE: [u8; 2] = [0xAC, 0x53];
const CHIP_ERASE: [u8; 2] = [0xAC, 0x80];
const READ_SIGNATURE: u8 = 0x30;
const FLASH_COMMIT: u8 = 0x4C;
const EEPROM_COMMITS: [u8; 2] = [0xC2, 0xC0];

/// Configuration for the dummy target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Signature bytes reported by the chip
    pub signature: Vec<u8>,
    /// Flash size in bytes
    pub flash_size: usize,
    /// EEPROM size in bytes
    pub eeprom_size: usize,
    /// Address latches rejected as busy after every page load
    pub busy_latches: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            signature: vec![0x1E, 0x93, 0x0B], // ATtiny85
            flash_size: 8 * 1024,
            eeprom_size: 512,
            busy_latches: 0,
        }
    }
}

/// Dummy AVR target
///
/// Page writes are buffered until the page address is latched, like the
/// chip's own page buffer. Program memory behaves like flash: writes can only
/// clear bits and chip erase sets everything back to 0xFF.
pub struct DummyAvr {
    config: DummyConfig,
    flash: Vec<u8>,
    eeprom: Vec<u8>,
    open: bool,
    powered: bool,
    programming: bool,
    sck: Option<u8>,
    busy: u32,
    page_buffer: Vec<(MemoryKind, usize, u8)>,
    latched: Vec<(MemoryKind, u16)>,
    elapsed_ms: u64,
}

impl DummyAvr {
    /// Create a new dummy target with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        let eeprom = vec![0xFF; config.eeprom_size];
        Self {
            config,
            flash,
            eeprom,
            open: false,
            powered: false,
            programming: false,
            sck: None,
            busy: 0,
            page_buffer: Vec::new(),
            latched: Vec::new(),
            elapsed_ms: 0,
        }
    }

    /// Create a new dummy target with default configuration (ATtiny85)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy target with pre-filled flash
    pub fn with_flash(config: DummyConfig, initial: &[u8]) -> Self {
        let mut avr = Self::new(config);
        let len = initial.len().min(avr.flash.len());
        avr.flash[..len].copy_from_slice(&initial[..len]);
        avr
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Get a reference to the flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Get a reference to the EEPROM contents
    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    /// Whether program enable has been accepted since the last power up
    pub fn in_programming_mode(&self) -> bool {
        self.programming
    }

    /// Last SCK period the target was powered up with
    pub fn sck(&self) -> Option<u8> {
        self.sck
    }

    /// Every accepted address latch, in order
    pub fn latched(&self) -> &[(MemoryKind, u16)] {
        &self.latched
    }

    /// Sum of all requested delays
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    fn memory_mut(&mut self, kind: MemoryKind) -> &mut Vec<u8> {
        match kind {
            MemoryKind::Flash => &mut self.flash,
            MemoryKind::Eeprom => &mut self.eeprom,
        }
    }

    fn memory(&self, kind: MemoryKind) -> &[u8] {
        match kind {
            MemoryKind::Flash => &self.flash,
            MemoryKind::Eeprom => &self.eeprom,
        }
    }

    fn check_ready(&self) -> TransportResult<()> {
        if !self.open {
            return Err(TransportError::not_open());
        }
        if !self.powered {
            return Err(TransportError::transfer("target not powered"));
        }
        Ok(())
    }

    fn check_programming(&self) -> TransportResult<()> {
        self.check_ready()?;
        if !self.programming {
            return Err(TransportError::transfer("target not in programming mode"));
        }
        Ok(())
    }

    fn check_range(&self, kind: MemoryKind, address: u32, len: usize) -> TransportResult<usize> {
        let start = address as usize;
        if start + len > self.memory(kind).len() {
            return Err(TransportError::new(
                TransportErrorKind::InvalidResponse,
                format!("{} access 0x{:X}+{} out of range", kind, start, len),
            ));
        }
        Ok(start)
    }

    fn load_page(&mut self, kind: MemoryKind, address: u32, data: &[u8]) -> TransportResult<()> {
        self.check_programming()?;
        let start = self.check_range(kind, address, data.len())?;
        self.page_buffer
            .extend(data.iter().enumerate().map(|(i, &b)| (kind, start + i, b)));
        self.busy = self.config.busy_latches;
        Ok(())
    }

    fn commit_page(&mut self, kind: MemoryKind, device_address: u16) -> TransportResult<[u8; 4]> {
        if self.busy > 0 {
            self.busy -= 1;
            return Err(TransportError::transfer("busy"));
        }

        let pending = std::mem::take(&mut self.page_buffer);
        let (commit, keep): (Vec<_>, Vec<_>) = pending.into_iter().partition(|(k, _, _)| *k == kind);
        self.page_buffer = keep;
        let memory = self.memory_mut(kind);
        for (_, address, byte) in commit {
            // Programming can only change 1 -> 0
            memory[address] &= byte;
        }

        self.latched.push((kind, device_address));
        log::trace!("dummy: {} page latched at 0x{:04X}", kind, device_address);
        Ok([0; 4])
    }

    fn chip_erase(&mut self) {
        self.flash.fill(0xFF);
        self.eeprom.fill(0xFF);
        self.page_buffer.clear();
        log::debug!("dummy: chip erased");
    }
}

impl IspTransport for DummyAvr {
    fn open(&mut self) -> TransportResult<()> {
        self.open = true;
        Ok(())
    }

    fn spi(&mut self, cmd: IspCommand) -> TransportResult<[u8; 4]> {
        self.check_ready()?;

        if cmd[..2] == PGM_ENABLE {
            self.programming = true;
            // Second instruction byte is echoed while the third is shifted in
            return Ok([0x00, cmd[0], cmd[1], 0x00]);
        }

        self.check_programming()?;
        let device_address = u16::from_be_bytes([cmd[1], cmd[2]]);

        match cmd[0] {
            _ if cmd[..2] == CHIP_ERASE => {
                self.chip_erase();
                Ok([0x00, cmd[0], cmd[1], 0x00])
            }
            READ_SIGNATURE => {
                let byte = self
                    .config
                    .signature
                    .get(cmd[2] as usize)
                    .copied()
                    .unwrap_or(0xFF);
                Ok([0x00, cmd[0], cmd[1], byte])
            }
            FLASH_COMMIT => self.commit_page(MemoryKind::Flash, device_address),
            op if EEPROM_COMMITS.contains(&op) => {
                self.commit_page(MemoryKind::Eeprom, device_address)
            }
            _ => {
                log::debug!("dummy: ignoring instruction {:02X?}", cmd);
                Ok([0x00, cmd[0], cmd[1], 0x00])
            }
        }
    }

    fn set_sck(&mut self, period: u8) -> TransportResult<()> {
        if !self.open {
            return Err(TransportError::not_open());
        }
        self.powered = true;
        self.programming = false;
        self.sck = Some(period);
        Ok(())
    }

    fn power_down(&mut self) -> TransportResult<()> {
        if !self.open {
            return Err(TransportError::not_open());
        }
        self.powered = false;
        self.programming = false;
        self.page_buffer.clear();
        Ok(())
    }

    fn write_flash(&mut self, _delay: u16, address: u32, data: &[u8]) -> TransportResult<()> {
        self.load_page(MemoryKind::Flash, address, data)
    }

    fn write_eeprom(&mut self, _delay: u16, address: u32, data: &[u8]) -> TransportResult<()> {
        self.load_page(MemoryKind::Eeprom, address, data)
    }

    fn read_flash(&mut self, _delay: u16, address: u32, len: usize) -> TransportResult<Vec<u8>> {
        self.check_programming()?;
        let start = self.check_range(MemoryKind::Flash, address, len)?;
        Ok(self.flash[start..start + len].to_vec())
    }

    fn read_eeprom(&mut self, _delay: u16, address: u32, len: usize) -> TransportResult<Vec<u8>> {
        self.check_programming()?;
        let start = self.check_range(MemoryKind::Eeprom, address, len)?;
        Ok(self.eeprom[start..start + len].to_vec())
    }

    fn close(&mut self) {
        self.open = false;
        self.powered = false;
        self.programming = false;
    }

    fn delay_ms(&mut self, ms: u32) {
        // No delay needed for in-memory operations
        self.elapsed_ms += ms as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtinyisp_core::chip::ChipDatabase;
    use rtinyisp_core::error::{Error, VerificationError};
    use rtinyisp_core::programmer::ProgrammerProfile;
    use rtinyisp_core::protocol::LatchPolicy;
    use rtinyisp_core::{MemorySource, Session, SessionConfig, SessionState};

    fn config(programmer: &str) -> SessionConfig {
        let chip = ChipDatabase::builtin().require("attiny85").unwrap();
        SessionConfig::new(chip, ProgrammerProfile::find(programmer).unwrap())
    }

    fn ready(avr: DummyAvr, programmer: &str) -> Session<DummyAvr> {
        let mut session = Session::open(avr, config(programmer)).unwrap();
        session.enter_programming_mode().unwrap();
        session
    }

    #[test]
    fn test_program_enable() {
        let mut avr = DummyAvr::new_default();
        avr.open().unwrap();
        avr.set_sck(10).unwrap();
        assert!(avr.spi([0x30, 0, 0, 0]).is_err());

        let reply = avr.spi([0xAC, 0x53, 0x00, 0x00]).unwrap();
        assert_eq!(reply[2], 0x53);
        assert!(avr.in_programming_mode());
        assert_eq!(avr.sck(), Some(10));
    }

    #[test]
    fn test_requires_power() {
        let mut avr = DummyAvr::new_default();
        assert_eq!(
            avr.spi([0xAC, 0x53, 0, 0]).unwrap_err().kind,
            TransportErrorKind::NotOpen
        );
        avr.open().unwrap();
        assert!(avr.spi([0xAC, 0x53, 0, 0]).is_err());
    }

    #[test]
    fn test_session_signature() {
        let mut session = ready(DummyAvr::new_default(), "sf-pocket-avr");
        assert_eq!(session.get_chip_signature().unwrap(), vec![0x1E, 0x93, 0x0B]);
        session.check_chip_signature().unwrap();
    }

    #[test]
    fn test_session_wrong_chip() {
        let avr = DummyAvr::new(DummyConfig {
            signature: vec![0x1E, 0x95, 0x0F],
            ..Default::default()
        });
        let mut session = ready(avr, "sf-pocket-avr");
        assert!(matches!(
            session.check_chip_signature(),
            Err(Error::Verification(VerificationError::SignatureMismatch { .. }))
        ));
    }

    #[test]
    fn test_session_write_verify_read() {
        let mut session = ready(DummyAvr::new_default(), "sf-pocket-avr");
        let image: Vec<u8> = (0..130u32).map(|i| (i * 7) as u8).collect();

        session.erase_chip().unwrap();
        session.write_flash(MemorySource::Buffer(&image)).unwrap();
        session.verify_flash(MemorySource::Buffer(&image)).unwrap();
        assert_eq!(session.read_flash(130, 0).unwrap(), image);

        session.exit_programming_mode().unwrap();
        assert_eq!(session.state(), SessionState::Open);

        let avr = session.close();
        assert_eq!(&avr.flash()[..130], &image[..]);
        assert!(avr.flash()[130..].iter().all(|&b| b == 0xFF));
        assert_eq!(
            avr.latched(),
            &[
                (MemoryKind::Flash, 0),
                (MemoryKind::Flash, 32),
                (MemoryKind::Flash, 64)
            ]
        );
    }

    #[test]
    fn test_session_busy_chip() {
        let avr = DummyAvr::new(DummyConfig {
            busy_latches: 20,
            ..Default::default()
        });

        // 15 attempts are not enough for a board that stays busy this long
        let mut session = ready(avr, "sf-pocket-avr");
        assert!(matches!(
            session.write_flash(MemorySource::Buffer(&[0u8; 64])),
            Err(Error::Transport(_))
        ));

        // The extended policy of board-integrated programmers copes
        let avr = DummyAvr::new(DummyConfig {
            busy_latches: 20,
            ..Default::default()
        });
        let mut session = ready(avr, "adafruit-trinket");
        assert_eq!(session.config().latch, LatchPolicy::EXTENDED);
        session
            .write_flash(MemorySource::Buffer(&[0u8; 128]))
            .unwrap();
        assert_eq!(session.transport().latched().len(), 2);
    }

    #[test]
    fn test_session_eeprom() {
        let mut session = ready(DummyAvr::new_default(), "sf-pocket-avr");
        session
            .write_eeprom(MemorySource::Buffer(&[1, 2, 3, 4, 5]))
            .unwrap();
        assert_eq!(session.read_eeprom(5, 0).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            session.transport().latched(),
            &[(MemoryKind::Eeprom, 0), (MemoryKind::Eeprom, 4)]
        );
    }

    #[test]
    fn test_write_without_erase_only_clears_bits() {
        let avr = DummyAvr::with_flash(DummyConfig::default(), &[0x0F; 4]);
        let mut session = ready(avr, "sf-pocket-avr");

        session
            .write_flash(MemorySource::Buffer(&[0xF0; 4]))
            .unwrap();

        assert!(matches!(
            session.verify_flash(MemorySource::Buffer(&[0xF0; 4])),
            Err(Error::Verification(VerificationError::DataMismatch {
                address: 0,
                found: 0x00,
                ..
            }))
        ));
    }

    #[test]
    fn test_trinket_erase_settle() {
        let mut session = ready(DummyAvr::new_default(), "trinket");
        let before = session.transport().elapsed_ms();
        session.erase_chip().unwrap();
        assert_eq!(session.transport().elapsed_ms() - before, 500);
    }

    #[test]
    fn test_operations_after_exit_fail() {
        let mut session = ready(DummyAvr::new_default(), "sf-pocket-avr");
        session.exit_programming_mode().unwrap();
        assert!(matches!(
            session.get_chip_signature(),
            Err(Error::Transport(_))
        ));
    }
}
