//! Programmer profiles
//!
//! USBtinyISP-compatible dongles all speak the same protocol; they differ in
//! USB ids and in timing quirks. Boards that carry the programmer and the
//! target on the same PCB (Trinket, Gemma) answer address latches late and
//! need a longer erase settle.

use bitflags::bitflags;

use crate::error::ConfigError;
use crate::protocol::LatchPolicy;

bitflags! {
    /// Programmer quirk flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Quirks: u32 {
        /// Programmer and target share a board; page commits take longer
        /// to clear and need the extended latch policy
        const BOARD_INTEGRATED = 1 << 0;
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks::empty()
    }
}

/// Name of the profile built from caller-supplied ids
pub const CUSTOM_PROGRAMMER: &str = "custom";

/// Static description of an ISP dongle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerProfile {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
    /// USB vendor id
    pub vid: u16,
    /// USB product id
    pub pid: u16,
    /// Timing quirks
    pub quirks: Quirks,
    /// Erase settle time that replaces the chip's own erase delay
    pub erase_delay_ms: Option<u32>,
}

/// SparkFun / Adafruit USBtinyISP vendor id (0x1781)
pub const USBTINY_VID: u16 = 6017;
/// SparkFun / Adafruit USBtinyISP product id (0x0C9F)
pub const USBTINY_PID: u16 = 3231;

/// Known programmers
pub static PROGRAMMERS: &[ProgrammerProfile] = &[
    ProgrammerProfile {
        name: "sf-pocket-avr",
        aliases: &["sparkfun-pocket-avr"],
        description: "SparkFun Pocket AVR Programmer",
        vid: USBTINY_VID,
        pid: USBTINY_PID,
        quirks: Quirks::empty(),
        erase_delay_ms: None,
    },
    ProgrammerProfile {
        name: "sf-tiny-avr",
        aliases: &["sparkfun-tiny-avr"],
        description: "SparkFun Tiny AVR Programmer",
        vid: USBTINY_VID,
        pid: USBTINY_PID,
        quirks: Quirks::empty(),
        erase_delay_ms: None,
    },
    ProgrammerProfile {
        name: "usbtinyisp",
        aliases: &["usbtiny", "adafruit-usbtinyisp"],
        description: "Adafruit USBtinyISP kit",
        vid: USBTINY_VID,
        pid: USBTINY_PID,
        quirks: Quirks::empty(),
        erase_delay_ms: None,
    },
    ProgrammerProfile {
        name: "adafruit-trinket",
        aliases: &["trinket"],
        description: "Adafruit Trinket (on-board USBtiny bootloader)",
        vid: USBTINY_VID,
        pid: USBTINY_PID,
        quirks: Quirks::BOARD_INTEGRATED,
        erase_delay_ms: Some(500),
    },
    ProgrammerProfile {
        name: "adafruit-gemma",
        aliases: &["gemma"],
        description: "Adafruit Gemma (on-board USBtiny bootloader)",
        vid: USBTINY_VID,
        pid: USBTINY_PID,
        quirks: Quirks::BOARD_INTEGRATED,
        erase_delay_ms: Some(500),
    },
];

impl ProgrammerProfile {
    /// Look up a programmer by name or alias
    pub fn find(name: &str) -> Result<Self, ConfigError> {
        PROGRAMMERS
            .iter()
            .find(|p| p.matches(name))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProgrammer(name.to_string()))
    }

    /// Build a profile for a dongle not in the table
    ///
    /// Both ids are mandatory; a missing or zero id is a config fault.
    pub fn custom(vid: Option<u16>, pid: Option<u16>) -> Result<Self, ConfigError> {
        match (vid, pid) {
            (Some(vid), Some(pid)) if vid != 0 && pid != 0 => Ok(Self {
                name: CUSTOM_PROGRAMMER,
                aliases: &[],
                description: "Custom USBtinyISP-compatible programmer",
                vid,
                pid,
                quirks: Quirks::empty(),
                erase_delay_ms: None,
            }),
            _ => Err(ConfigError::CustomProgrammerIds),
        }
    }

    /// Check whether `name` refers to this profile
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Address latch policy suited to this programmer
    pub fn latch_policy(&self) -> LatchPolicy {
        if self.quirks.contains(Quirks::BOARD_INTEGRATED) {
            LatchPolicy::EXTENDED
        } else {
            LatchPolicy::default()
        }
    }
}

impl Default for ProgrammerProfile {
    fn default() -> Self {
        PROGRAMMERS[0].clone()
    }
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let names: Vec<&str> = PROGRAMMERS.iter().map(|p| p.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_alias() {
        let p = ProgrammerProfile::find("sparkfun-pocket-avr").unwrap();
        assert_eq!(p.name, "sf-pocket-avr");
        assert_eq!((p.vid, p.pid), (6017, 3231));
        assert!(ProgrammerProfile::find("TRINKET").is_ok());
    }

    #[test]
    fn test_unknown_programmer() {
        assert_eq!(
            ProgrammerProfile::find("stk500"),
            Err(ConfigError::UnknownProgrammer("stk500".into()))
        );
    }

    #[test]
    fn test_custom_requires_both_ids() {
        assert_eq!(
            ProgrammerProfile::custom(Some(0x1781), None),
            Err(ConfigError::CustomProgrammerIds)
        );
        assert_eq!(
            ProgrammerProfile::custom(None, Some(0x0C9F)),
            Err(ConfigError::CustomProgrammerIds)
        );
        assert_eq!(
            ProgrammerProfile::custom(Some(0), Some(0x0C9F)),
            Err(ConfigError::CustomProgrammerIds)
        );

        let p = ProgrammerProfile::custom(Some(0x1781), Some(0x0C9F)).unwrap();
        assert_eq!(p.name, CUSTOM_PROGRAMMER);
        assert_eq!(p.erase_delay_ms, None);
    }

    #[test]
    fn test_board_integrated_uses_extended_latch() {
        let trinket = ProgrammerProfile::find("adafruit-trinket").unwrap();
        assert_eq!(trinket.latch_policy(), LatchPolicy::EXTENDED);
        assert_eq!(trinket.erase_delay_ms, Some(500));

        let pocket = ProgrammerProfile::default();
        assert_eq!(pocket.latch_policy(), LatchPolicy::default());
    }
}
