//! Sensor sample and its radio frame
//!
//! A [`Sample`] travels over the air as exactly [`FRAME_LEN`] bytes: the scaled
//! temperature followed by the scaled humidity, each a little-endian `i16`. There is
//! no header, tag or checksum; the radio's payload length register is the only
//! framing.

use core::fmt;

/// Size of an encoded [`Sample`] in bytes.
pub const FRAME_LEN: usize = 4;

/// One temperature/humidity reading in hundredths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Temperature in hundredths of a degree Celsius
    pub temperature: i16,
    /// Relative humidity in hundredths of a percent
    pub humidity: i16,
}

impl Sample {
    /// Packs the sample into its wire representation.
    pub fn to_bytes(self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0..2].copy_from_slice(&self.temperature.to_le_bytes());
        frame[2..4].copy_from_slice(&self.humidity.to_le_bytes());
        frame
    }

    /// Unpacks a sample from exactly [`FRAME_LEN`] bytes.
    pub fn from_bytes(frame: [u8; FRAME_LEN]) -> Self {
        Self {
            temperature: i16::from_le_bytes([frame[0], frame[1]]),
            humidity: i16::from_le_bytes([frame[2], frame[3]]),
        }
    }
}

/// Error returned when a received frame is not a sample frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidFrameLength(pub usize);

impl TryFrom<&[u8]> for Sample {
    type Error = InvalidFrameLength;

    fn try_from(frame: &[u8]) -> Result<Self, Self::Error> {
        <[u8; FRAME_LEN]>::try_from(frame)
            .map(Self::from_bytes)
            .map_err(|_| InvalidFrameLength(frame.len()))
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T={}C H={}%",
            Centi(self.temperature),
            Centi(self.humidity)
        )
    }
}

/// Displays a value scaled by 100 with two decimals, e.g. `-0.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Centi(pub i16);

impl fmt::Display for Centi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
    }
}
