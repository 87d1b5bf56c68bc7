//! Integer percent volumes and the effective-volume rule.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MixerError, Result};

/// A volume in whole percent, always within `[0, 100]`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "i64", into = "u8")]
pub struct Volume(u8);

impl Volume {
    pub const SILENT: Volume = Volume(0);
    pub const FULL: Volume = Volume(100);

    /// Build a volume, clamping out-of-range input.
    pub fn new(percent: i64) -> Self {
        Self(percent.clamp(0, 100) as u8)
    }

    /// Convert a floating point input, truncating the fraction.
    ///
    /// NaN and infinities are rejected.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(MixerError::InvalidVolume {
                input: value.to_string(),
            });
        }
        Ok(Self::new(value.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn is_silent(self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for Volume {
    fn from(percent: i64) -> Self {
        Self::new(percent)
    }
}

impl From<Volume> for u8 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

impl FromStr for Volume {
    type Err = MixerError;

    /// Accepts `60`, `60%`, `-5` (clamped) and `60.7` (truncated).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();

        if let Ok(percent) = digits.parse::<i64>() {
            return Ok(Self::new(percent));
        }
        match digits.parse::<f64>() {
            Ok(value) => Self::from_f64(value).map_err(|_| MixerError::InvalidVolume {
                input: s.to_string(),
            }),
            Err(_) => Err(MixerError::InvalidVolume {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Loudness fraction actually applied to a track: `track * master / 10000`.
pub fn effective_fraction(track: Volume, master: Volume) -> f32 {
    (track.0 as f32 * master.0 as f32) / 10_000.0
}
