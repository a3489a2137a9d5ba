//! Programming session
//!
//! A [`Session`] owns one open transport and one [`SessionConfig`]. It walks
//! the chip through program enable, erase, signature reads and paged
//! writes, always one transport command at a time.
//!
//! ```text
//! Closed --open--> Open --enter_programming_mode--> ProgrammingMode
//!                   ^                                     |
//!                   +------ exit_programming_mode --------+
//! ```
//!
//! [`Session::close`] consumes the session, so a closed session cannot be
//! used or closed again. Operations are not guarded by state: calling them
//! outside programming mode is forwarded to the transport as is.

use maybe_async::maybe_async;

use crate::chip::{ChipProfile, MemoryKind};
use crate::config::{check_sck, SessionConfig};
use crate::error::Result;
use crate::programmer::IspTransport;
use crate::protocol::{self, NoProgress, WriteProgress};
use crate::source::{load_source, MemorySource};

/// Time the chip needs after power-up before it answers program enable
pub const PROGRAM_ENABLE_SETTLE_MS: u32 = 50;

/// Index of the program enable echo byte in the reply
const PGM_ENABLE_ECHO_BYTE: usize = 2;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport released
    Closed,
    /// Transport open, target not in programming mode
    Open,
    /// Program enable accepted
    ProgrammingMode,
}

/// An ISP session over one transport
pub struct Session<T: IspTransport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
}

impl<T: IspTransport> Session<T> {
    /// Open the transport and return a ready session
    ///
    /// The session only exists once the transport reported success, so a
    /// returned session is always in [`SessionState::Open`].
    #[maybe_async]
    pub async fn open(mut transport: T, config: SessionConfig) -> Result<Self> {
        transport.open().await?;
        log::log!(
            config.verbosity.progress_level(),
            "Programmer {} ready ({:04X}:{:04X}), target {}",
            config.programmer.name,
            config.programmer.vid,
            config.programmer.pid,
            config.chip.name
        );
        Ok(Self {
            transport,
            config,
            state: SessionState::Open,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Target chip profile
    pub fn chip(&self) -> &ChipProfile {
        &self.config.chip
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport (mutable)
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Power the target, wait for it to settle and send program enable
    #[maybe_async]
    pub async fn enter_programming_mode(&mut self) -> Result<()> {
        self.set_sck(self.config.sck).await?;
        self.transport.delay_ms(PROGRAM_ENABLE_SETTLE_MS).await;

        let cmd = self.config.chip.pgm_enable;
        let reply = self.transport.spi(cmd).await?;
        if reply[PGM_ENABLE_ECHO_BYTE] != cmd[1] {
            // The chip may still answer correctly on later commands
            log::warn!(
                "Program enable not echoed (got {:02X?}), check wiring and SCK",
                reply
            );
        }

        self.state = SessionState::ProgrammingMode;
        log::log!(
            self.config.verbosity.progress_level(),
            "Entered programming mode"
        );
        Ok(())
    }

    /// Power the target down, releasing it from programming mode
    #[maybe_async]
    pub async fn exit_programming_mode(&mut self) -> Result<()> {
        self.transport.power_down().await?;
        self.state = SessionState::Open;
        log::log!(
            self.config.verbosity.progress_level(),
            "Left programming mode"
        );
        Ok(())
    }

    /// Set the SCK period
    ///
    /// Rates outside 1..=250 are rejected before the transport is touched.
    #[maybe_async]
    pub async fn set_sck(&mut self, rate: u32) -> Result<()> {
        let period = check_sck(rate)?;
        log::debug!("Setting SCK period to {}", period);
        self.transport.set_sck(period).await?;
        Ok(())
    }

    /// Read the chip signature
    #[maybe_async]
    pub async fn get_chip_signature(&mut self) -> Result<Vec<u8>> {
        let signature =
            protocol::read_signature(&mut self.transport, &self.config.chip.signature).await?;
        log::debug!("Chip signature: {:02X?}", signature);
        Ok(signature)
    }

    /// Read the chip signature and compare it with the chip profile
    #[maybe_async]
    pub async fn check_chip_signature(&mut self) -> Result<Vec<u8>> {
        let actual = self.get_chip_signature().await?;
        self.verify_signature(&self.config.chip.signature.expected, &actual)?;
        log::log!(
            self.config.verbosity.progress_level(),
            "Signature {:02X?} matches {}",
            actual,
            self.config.chip.name
        );
        Ok(actual)
    }

    /// Compare two signatures byte for byte; no I/O
    pub fn verify_signature(&self, expected: &[u8], actual: &[u8]) -> Result<()> {
        protocol::verify_signature(expected, actual).map_err(Into::into)
    }

    /// Write an image to flash
    #[maybe_async]
    pub async fn write_flash<'a>(
        &mut self,
        source: impl Into<Option<MemorySource<'a>>>,
    ) -> Result<()> {
        self.write_memory(MemoryKind::Flash, source, &mut NoProgress)
            .await
    }

    /// Write an image to EEPROM
    #[maybe_async]
    pub async fn write_eeprom<'a>(
        &mut self,
        source: impl Into<Option<MemorySource<'a>>>,
    ) -> Result<()> {
        self.write_memory(MemoryKind::Eeprom, source, &mut NoProgress)
            .await
    }

    /// Write an image to `kind`, reporting each page to `progress`
    ///
    /// The page size is checked before the source is decoded and before any
    /// transport call. A failure part way through leaves the pages already
    /// committed on the chip.
    #[maybe_async]
    pub async fn write_memory<'a>(
        &mut self,
        kind: MemoryKind,
        source: impl Into<Option<MemorySource<'a>>>,
        progress: &mut dyn WriteProgress,
    ) -> Result<()> {
        let chip = self.config.chip.clone();
        let memory = chip.memory(kind);
        let page_size = memory.require_page_size(kind)?;
        let data = load_source(source.into())?;

        log::log!(
            self.config.verbosity.progress_level(),
            "Writing {} bytes of {} in {} pages of {}",
            data.len(),
            kind,
            protocol::page_count(data.len(), page_size).unwrap_or_default(),
            page_size
        );

        protocol::write_pages(
            &mut self.transport,
            kind,
            memory,
            &data,
            self.config.latch,
            progress,
        )
        .await?;

        log::log!(
            self.config.verbosity.progress_level(),
            "{} write complete",
            kind
        );
        Ok(())
    }

    /// Compare flash with an image
    #[maybe_async]
    pub async fn verify_flash<'a>(
        &mut self,
        source: impl Into<Option<MemorySource<'a>>>,
    ) -> Result<()> {
        self.verify_memory(MemoryKind::Flash, source, &mut NoProgress)
            .await
    }

    /// Compare EEPROM with an image
    #[maybe_async]
    pub async fn verify_eeprom<'a>(
        &mut self,
        source: impl Into<Option<MemorySource<'a>>>,
    ) -> Result<()> {
        self.verify_memory(MemoryKind::Eeprom, source, &mut NoProgress)
            .await
    }

    /// Read `kind` back and compare it with an image
    #[maybe_async]
    pub async fn verify_memory<'a>(
        &mut self,
        kind: MemoryKind,
        source: impl Into<Option<MemorySource<'a>>>,
        progress: &mut dyn WriteProgress,
    ) -> Result<()> {
        let data = load_source(source.into())?;
        let delay = self.config.chip.memory(kind).delay_ms;

        protocol::verify_memory(&mut self.transport, kind, delay, &data, progress).await?;

        log::log!(
            self.config.verbosity.progress_level(),
            "Verified {} bytes of {}",
            data.len(),
            kind
        );
        Ok(())
    }

    /// Read `length` bytes of flash starting at byte `address`
    #[maybe_async]
    pub async fn read_flash(&mut self, length: usize, address: u32) -> Result<Vec<u8>> {
        self.read_memory(MemoryKind::Flash, length, address).await
    }

    /// Read `length` bytes of EEPROM starting at byte `address`
    #[maybe_async]
    pub async fn read_eeprom(&mut self, length: usize, address: u32) -> Result<Vec<u8>> {
        self.read_memory(MemoryKind::Eeprom, length, address).await
    }

    /// Read `length` bytes of `kind` starting at byte `address`
    #[maybe_async]
    pub async fn read_memory(
        &mut self,
        kind: MemoryKind,
        length: usize,
        address: u32,
    ) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let delay = self.config.chip.memory(kind).delay_ms;
        let data = protocol::read_block(&mut self.transport, kind, delay, address, length).await?;
        Ok(data)
    }

    /// Erase flash and EEPROM
    ///
    /// Waits out the erase settle time whether or not the erase instruction
    /// was accepted, then reports the instruction's outcome. The programmer's
    /// erase delay takes precedence over the chip's.
    #[maybe_async]
    pub async fn erase_chip(&mut self) -> Result<()> {
        let delay = self
            .config
            .programmer
            .erase_delay_ms
            .unwrap_or(self.config.chip.erase.delay_ms);

        log::log!(
            self.config.verbosity.progress_level(),
            "Erasing chip (settle {} ms)",
            delay
        );
        let result = self.transport.spi(self.config.chip.erase.cmd).await;
        self.transport.delay_ms(delay).await;
        result?;
        Ok(())
    }

    /// Release the transport
    ///
    /// Returns the transport so that callers can inspect or reuse it.
    pub fn close(mut self) -> T {
        self.transport.close();
        self.state = SessionState::Closed;
        log::debug!("Session closed");
        self.transport
    }
}

impl<T: IspTransport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("chip", &self.config.chip.name)
            .field("programmer", &self.config.programmer.name)
            .field("state", &self.state)
            .finish()
    }
}
