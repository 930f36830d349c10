//! Rate, volume and pitch adjustments applied uniformly to every call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProsodyError;

/// Speaking rate as a signed percentage, `-100..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rate(i8);

impl Rate {
    pub fn new(percent: i32) -> Result<Self, ProsodyError> {
        if !(-100..=100).contains(&percent) {
            return Err(ProsodyError::RateRange(percent));
        }
        Ok(Self(percent as i8))
    }

    pub fn percent(self) -> i32 {
        self.0 as i32
    }
}

impl FromStr for Rate {
    type Err = ProsodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let value = parse_percent(s).ok_or_else(|| ProsodyError::RateFormat(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}%", self.0)
    }
}

impl TryFrom<String> for Rate {
    type Error = ProsodyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rate> for String {
    fn from(value: Rate) -> Self {
        value.to_string()
    }
}

/// Output volume as an unsigned percentage, `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Volume(u8);

impl Volume {
    pub fn new(percent: i32) -> Result<Self, ProsodyError> {
        if !(0..=100).contains(&percent) {
            return Err(ProsodyError::VolumeRange(percent));
        }
        Ok(Self(percent as u8))
    }

    pub fn percent(self) -> u32 {
        self.0 as u32
    }
}

impl FromStr for Volume {
    type Err = ProsodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let value = parse_percent(s).ok_or_else(|| ProsodyError::VolumeFormat(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}%", self.0)
    }
}

impl TryFrom<String> for Volume {
    type Error = ProsodyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Volume> for String {
    fn from(value: Volume) -> Self {
        value.to_string()
    }
}

/// Qualitative pitch level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pitch {
    XLow,
    Low,
    Medium,
    High,
    XHigh,
}

impl Pitch {
    pub fn as_str(self) -> &'static str {
        match self {
            Pitch::XLow => "x-low",
            Pitch::Low => "low",
            Pitch::Medium => "medium",
            Pitch::High => "high",
            Pitch::XHigh => "x-high",
        }
    }

    /// Pitch shift in Hz relative to the voice's natural pitch.
    pub fn hz_offset(self) -> i32 {
        match self {
            Pitch::XLow => -50,
            Pitch::Low => -25,
            Pitch::Medium => 0,
            Pitch::High => 25,
            Pitch::XHigh => 50,
        }
    }

    /// Parse a pitch level. `"default"` and the empty string mean no adjustment.
    pub fn parse_optional(s: &str) -> Result<Option<Self>, ProsodyError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Ok(None),
            "x-low" => Ok(Some(Pitch::XLow)),
            "low" => Ok(Some(Pitch::Low)),
            "medium" => Ok(Some(Pitch::Medium)),
            "high" => Ok(Some(Pitch::High)),
            "x-high" => Ok(Some(Pitch::XHigh)),
            _ => Err(ProsodyError::UnknownPitch(s.to_string())),
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde adapter storing an optional [`Pitch`] as text, `"default"` for none.
///
/// Use with `#[serde(with = "crate::prosody::pitch_setting")]`.
pub mod pitch_setting {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Pitch;

    pub fn serialize<S: Serializer>(
        pitch: &Option<Pitch>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(pitch.map_or("default", Pitch::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Pitch>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pitch::parse_optional(&raw).map_err(D::Error::custom)
    }
}

/// Prosody shared by every task of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProsodyParameters {
    pub rate: Rate,
    pub volume: Volume,
    pub pitch: Option<Pitch>,
}

impl ProsodyParameters {
    /// Build parameters from the textual form used in settings files,
    /// e.g. `("-22%", "+50%", "default")`.
    pub fn parse(rate: &str, volume: &str, pitch: &str) -> Result<Self, ProsodyError> {
        Ok(Self {
            rate: rate.parse()?,
            volume: volume.parse()?,
            pitch: Pitch::parse_optional(pitch)?,
        })
    }
}

fn parse_percent(s: &str) -> Option<i32> {
    s.strip_suffix('%')?.trim().parse().ok()
}
