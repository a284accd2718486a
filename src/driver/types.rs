//! Typed constants for the ThinkGear driver entry points.
//!
//! The vendor library speaks in bare integers. These types pin every value
//! it accepts to a named variant so nothing else in the crate has to know
//! the numeric codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::raw::c_int;
use std::str::FromStr;

/// Opaque connection handle issued by `TG_GetNewConnectionId`.
///
/// Negative values are error codes, never usable handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(c_int);

impl ConnectionId {
    /// Handle value meaning "no connection".
    pub const SENTINEL: ConnectionId = ConnectionId(-1);

    pub fn new(raw: c_int) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> c_int {
        self.0
    }

    /// Whether the driver actually issued this handle.
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serial baud rates accepted by `TG_Connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    #[default]
    B9600,
    B57600,
    B115200,
}

impl BaudRate {
    pub const ALL: [BaudRate; 6] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    pub(crate) fn as_raw(self) -> c_int {
        self.bits_per_second() as c_int
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|b| b.bits_per_second() == value)
            .ok_or_else(|| {
                let supported: Vec<String> = BaudRate::ALL
                    .iter()
                    .map(|b| b.bits_per_second().to_string())
                    .collect();
                format!(
                    "unsupported baud rate {value} (expected one of {})",
                    supported.join(", ")
                )
            })
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> Self {
        baud.bits_per_second()
    }
}

impl FromStr for BaudRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid baud rate '{}'", s.trim()))?;
        BaudRate::try_from(value)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

/// Data encoding requested from the headset for the session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StreamFormat {
    /// Normal ThinkGear packets
    #[default]
    Packets,
    /// 5V raw stream
    #[value(name = "5v-raw")]
    #[serde(rename = "5v-raw")]
    FiveVoltRaw,
    /// Packets replayed from a file
    FilePackets,
}

impl StreamFormat {
    pub(crate) fn as_raw(self) -> c_int {
        match self {
            StreamFormat::Packets => 0,
            StreamFormat::FiveVoltRaw => 1,
            StreamFormat::FilePackets => 2,
        }
    }
}

/// Values that can be requested from `TG_GetValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Battery,
    PoorSignal,
    Attention,
    Meditation,
    Raw,
    Delta,
    Theta,
    Alpha1,
    Alpha2,
    Beta1,
    Beta2,
    Gamma1,
    Gamma2,
}

impl DataType {
    pub const ALL: [DataType; 13] = [
        DataType::Battery,
        DataType::PoorSignal,
        DataType::Attention,
        DataType::Meditation,
        DataType::Raw,
        DataType::Delta,
        DataType::Theta,
        DataType::Alpha1,
        DataType::Alpha2,
        DataType::Beta1,
        DataType::Beta2,
        DataType::Gamma1,
        DataType::Gamma2,
    ];

    /// Channels printed when nothing else is configured.
    pub const DEFAULT_CHANNELS: [DataType; 3] =
        [DataType::PoorSignal, DataType::Attention, DataType::Meditation];

    pub(crate) fn as_raw(self) -> c_int {
        match self {
            DataType::Battery => 0,
            DataType::PoorSignal => 1,
            DataType::Attention => 2,
            DataType::Meditation => 3,
            DataType::Raw => 4,
            DataType::Delta => 5,
            DataType::Theta => 6,
            DataType::Alpha1 => 7,
            DataType::Alpha2 => 8,
            DataType::Beta1 => 9,
            DataType::Beta2 => 10,
            DataType::Gamma1 => 11,
            DataType::Gamma2 => 12,
        }
    }

    /// Name used in configuration and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Battery => "battery",
            DataType::PoorSignal => "poor_signal",
            DataType::Attention => "attention",
            DataType::Meditation => "meditation",
            DataType::Raw => "raw",
            DataType::Delta => "delta",
            DataType::Theta => "theta",
            DataType::Alpha1 => "alpha1",
            DataType::Alpha2 => "alpha2",
            DataType::Beta1 => "beta1",
            DataType::Beta2 => "beta2",
            DataType::Gamma1 => "gamma1",
            DataType::Gamma2 => "gamma2",
        }
    }

    /// Short label used on the output line.
    pub fn label(self) -> &'static str {
        match self {
            DataType::Battery => "Bat",
            DataType::PoorSignal => "PoorSig",
            DataType::Attention => "Att",
            DataType::Meditation => "Med",
            DataType::Raw => "Raw",
            DataType::Delta => "Delta",
            DataType::Theta => "Theta",
            DataType::Alpha1 => "Alpha1",
            DataType::Alpha2 => "Alpha2",
            DataType::Beta1 => "Beta1",
            DataType::Beta2 => "Beta2",
            DataType::Gamma1 => "Gamma1",
            DataType::Gamma2 => "Gamma2",
        }
    }

    /// Parse a comma-separated channel list, e.g. `"attention, meditation"`.
    ///
    /// Empty entries are skipped and duplicates keep their first position.
    pub fn parse_list(s: &str) -> Result<Vec<DataType>, String> {
        let mut channels = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let channel: DataType = part.parse()?;
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        if channels.is_empty() {
            return Err("at least one channel must be given".to_string());
        }
        Ok(channels)
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        DataType::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| format!("unknown channel '{}'", s.trim()))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_validity() {
        assert!(!ConnectionId::SENTINEL.is_valid());
        assert!(!ConnectionId::new(-7).is_valid());
        assert!(ConnectionId::new(0).is_valid());
        assert_eq!(ConnectionId::new(4).raw(), 4);
    }

    #[test]
    fn test_baud_rate_parsing() {
        assert_eq!("9600".parse::<BaudRate>(), Ok(BaudRate::B9600));
        assert_eq!(" 115200 ".parse::<BaudRate>(), Ok(BaudRate::B115200));
        assert!("9601".parse::<BaudRate>().is_err());
        assert!("fast".parse::<BaudRate>().is_err());
        assert_eq!(BaudRate::default().as_raw(), 9600);
    }

    #[test]
    fn test_vendor_codes() {
        assert_eq!(StreamFormat::Packets.as_raw(), 0);
        assert_eq!(StreamFormat::FiveVoltRaw.as_raw(), 1);
        assert_eq!(StreamFormat::FilePackets.as_raw(), 2);

        for (code, channel) in DataType::ALL.iter().enumerate() {
            assert_eq!(channel.as_raw(), code as c_int);
        }
    }

    #[test]
    fn test_channel_list_parsing() {
        let channels = DataType::parse_list("poor_signal, Attention,meditation").unwrap();
        assert_eq!(channels, DataType::DEFAULT_CHANNELS.to_vec());

        let channels = DataType::parse_list("alpha1,alpha1,poor-signal").unwrap();
        assert_eq!(channels, vec![DataType::Alpha1, DataType::PoorSignal]);

        assert!(DataType::parse_list(" , ").is_err());
        assert!(DataType::parse_list("attention,focus").is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DataType::PoorSignal).unwrap();
        assert_eq!(json, "\"poor_signal\"");

        let json = serde_json::to_string(&StreamFormat::FiveVoltRaw).unwrap();
        assert_eq!(json, "\"5v-raw\"");

        let baud: BaudRate = serde_json::from_str("57600").unwrap();
        assert_eq!(baud, BaudRate::B57600);
        assert!(serde_json::from_str::<BaudRate>("1000").is_err());
    }
}
