//! Session configuration

use std::sync::Arc;

use crate::chip::ChipProfile;
use crate::error::ConfigError;
use crate::programmer::ProgrammerProfile;
use crate::protocol::LatchPolicy;

/// Lowest SCK setting the dongle accepts
pub const SCK_MIN: u32 = 1;
/// Highest SCK setting the dongle accepts
pub const SCK_MAX: u32 = 250;
/// SCK setting used when the caller does not pick one
pub const SCK_DEFAULT: u32 = 10;

/// Check an SCK setting against the accepted range
pub fn check_sck(rate: u32) -> Result<u8, ConfigError> {
    if (SCK_MIN..=SCK_MAX).contains(&rate) {
        // SCK_MAX fits in a byte
        Ok(rate as u8)
    } else {
        Err(ConfigError::SckOutOfRange {
            rate,
            min: SCK_MIN,
            max: SCK_MAX,
        })
    }
}

/// How loudly the session reports progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Progress messages are logged at debug level
    #[default]
    Quiet,
    /// Progress messages are logged at info level
    Verbose,
}

impl Verbosity {
    /// Log level used for user-facing progress messages
    pub fn progress_level(self) -> log::Level {
        match self {
            Verbosity::Quiet => log::Level::Debug,
            Verbosity::Verbose => log::Level::Info,
        }
    }
}

/// Everything a session needs to know up front
///
/// Built once and read-only for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// SCK setting applied when entering programming mode
    pub sck: u32,
    /// Target chip
    pub chip: Arc<ChipProfile>,
    /// Dongle in use
    pub programmer: ProgrammerProfile,
    /// Address latch retry policy
    pub latch: LatchPolicy,
    /// Progress verbosity
    pub verbosity: Verbosity,
}

impl SessionConfig {
    /// Create a config with the default SCK and the programmer's latch policy
    pub fn new(chip: impl Into<Arc<ChipProfile>>, programmer: ProgrammerProfile) -> Self {
        let latch = programmer.latch_policy();
        Self {
            sck: SCK_DEFAULT,
            chip: chip.into(),
            programmer,
            latch,
            verbosity: Verbosity::default(),
        }
    }

    /// Set the SCK setting (checked when programming mode is entered)
    pub fn with_sck(mut self, sck: u32) -> Self {
        self.sck = sck;
        self
    }

    /// Override the address latch policy
    pub fn with_latch(mut self, latch: LatchPolicy) -> Self {
        self.latch = latch;
        self
    }

    /// Set the progress verbosity
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ChipDatabase;

    #[test]
    fn test_check_sck_bounds() {
        assert_eq!(check_sck(1), Ok(1));
        assert_eq!(check_sck(250), Ok(250));
        for rate in [0, 251, 1000, u32::MAX] {
            assert_eq!(
                check_sck(rate),
                Err(ConfigError::SckOutOfRange {
                    rate,
                    min: SCK_MIN,
                    max: SCK_MAX
                })
            );
        }
    }

    #[test]
    fn test_new_picks_programmer_latch_policy() {
        let chip = ChipDatabase::builtin().require("attiny85").unwrap();
        let trinket = ProgrammerProfile::find("trinket").unwrap();
        let config = SessionConfig::new(chip, trinket);
        assert_eq!(config.sck, SCK_DEFAULT);
        assert_eq!(config.latch, LatchPolicy::EXTENDED);
        assert_eq!(config.verbosity.progress_level(), log::Level::Debug);
    }
}
