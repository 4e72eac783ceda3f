use core::{fmt, ops::RangeInclusive, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ParseParamError;

/// 433 MHz band accepted by the RN2483, in Hz.
pub const BAND_433: RangeInclusive<u32> = 433_050_000..=434_790_000;
/// 868 MHz band accepted by the RN2483, in Hz.
pub const BAND_868: RangeInclusive<u32> = 863_000_000..=870_000_000;

pub const DEFAULT_FREQUENCY: u32 = 868_100_000;
pub const DEFAULT_PREAMBLE_LENGTH: u16 = 8;
pub const DEFAULT_SYNC_WORD: u8 = 0x34;

pub fn is_valid_frequency(frequency: u32) -> bool {
    BAND_433.contains(&frequency) || BAND_868.contains(&frequency)
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadingFactor {
    #[serde(rename = "sf7")]
    Sf7,
    #[serde(rename = "sf8")]
    Sf8,
    #[serde(rename = "sf9")]
    Sf9,
    #[serde(rename = "sf10")]
    Sf10,
    #[serde(rename = "sf11")]
    Sf11,
    #[serde(rename = "sf12")]
    Sf12,
}

impl SpreadingFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpreadingFactor::Sf7 => "sf7",
            SpreadingFactor::Sf8 => "sf8",
            SpreadingFactor::Sf9 => "sf9",
            SpreadingFactor::Sf10 => "sf10",
            SpreadingFactor::Sf11 => "sf11",
            SpreadingFactor::Sf12 => "sf12",
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            SpreadingFactor::Sf7 => 7,
            SpreadingFactor::Sf8 => 8,
            SpreadingFactor::Sf9 => 9,
            SpreadingFactor::Sf10 => 10,
            SpreadingFactor::Sf11 => 11,
            SpreadingFactor::Sf12 => 12,
        }
    }
}

impl FromStr for SpreadingFactor {
    type Err = ParseParamError;

    /// Accepts both the wire form (`sf9`) and the bare number (`9`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let number = s.strip_prefix("sf").unwrap_or(s);
        match number {
            "7" => Ok(SpreadingFactor::Sf7),
            "8" => Ok(SpreadingFactor::Sf8),
            "9" => Ok(SpreadingFactor::Sf9),
            "10" => Ok(SpreadingFactor::Sf10),
            "11" => Ok(SpreadingFactor::Sf11),
            "12" => Ok(SpreadingFactor::Sf12),
            _ => Err(ParseParamError),
        }
    }
}

/// Radio bandwidth in kHz.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bandwidth {
    #[serde(rename = "125")]
    Khz125,
    #[serde(rename = "250")]
    Khz250,
    #[serde(rename = "500")]
    Khz500,
}

impl Bandwidth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bandwidth::Khz125 => "125",
            Bandwidth::Khz250 => "250",
            Bandwidth::Khz500 => "500",
        }
    }

    /// Constant name used by the Pycom `network.LoRa` API.
    pub fn lopy_name(&self) -> &'static str {
        match self {
            Bandwidth::Khz125 => "BW_125KHZ",
            Bandwidth::Khz250 => "BW_250KHZ",
            Bandwidth::Khz500 => "BW_500KHZ",
        }
    }
}

impl FromStr for Bandwidth {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "125" => Ok(Bandwidth::Khz125),
            "250" => Ok(Bandwidth::Khz250),
            "500" => Ok(Bandwidth::Khz500),
            _ => Err(ParseParamError),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodingRate {
    #[serde(rename = "4/5")]
    Cr4_5,
    #[serde(rename = "4/6")]
    Cr4_6,
    #[serde(rename = "4/7")]
    Cr4_7,
    #[serde(rename = "4/8")]
    Cr4_8,
}

impl CodingRate {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodingRate::Cr4_5 => "4/5",
            CodingRate::Cr4_6 => "4/6",
            CodingRate::Cr4_7 => "4/7",
            CodingRate::Cr4_8 => "4/8",
        }
    }

    /// Constant name used by the Pycom `network.LoRa` API.
    pub fn lopy_name(&self) -> &'static str {
        match self {
            CodingRate::Cr4_5 => "CODING_4_5",
            CodingRate::Cr4_6 => "CODING_4_6",
            CodingRate::Cr4_7 => "CODING_4_7",
            CodingRate::Cr4_8 => "CODING_4_8",
        }
    }
}

impl FromStr for CodingRate {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4/5" => Ok(CodingRate::Cr4_5),
            "4/6" => Ok(CodingRate::Cr4_6),
            "4/7" => Ok(CodingRate::Cr4_7),
            "4/8" => Ok(CodingRate::Cr4_8),
            _ => Err(ParseParamError),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crc {
    On,
    Off,
}

impl Crc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Crc::On => "on",
            Crc::Off => "off",
        }
    }
}

impl From<bool> for Crc {
    fn from(enabled: bool) -> Self {
        if enabled { Crc::On } else { Crc::Off }
    }
}

impl FromStr for Crc {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on" => Ok(Crc::On),
            "off" => Ok(Crc::Off),
            _ => Err(ParseParamError),
        }
    }
}

macro_rules! impl_display_as_str {
    ($($t:ty),*) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_display_as_str!(SpreadingFactor, Bandwidth, CodingRate, Crc);

/// Full set of radio settings applied by
/// [`LoraController::configure`](crate::controller::LoraController::configure).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoraConfig {
    /// in Hz
    pub frequency: u32,
    pub sf: SpreadingFactor,
    pub bw: Bandwidth,
    pub cr: CodingRate,
    pub crc: Crc,
    pub preamble_length: u16,
    /// in dBm
    pub power: i8,
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            sf: SpreadingFactor::Sf7,
            bw: Bandwidth::Khz125,
            cr: CodingRate::Cr4_8,
            crc: Crc::On,
            preamble_length: DEFAULT_PREAMBLE_LENGTH,
            power: 2,
        }
    }
}
