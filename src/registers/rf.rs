//! RF-related registers
//!
//! This module contains registers related to the RF front end including:
//! - Carrier frequency synthesis
//! - Power amplifier selection and output power
//! - High power DAC
//! - Over-current protection
//! - Low noise amplifier gain

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Carrier frequency registers (addresses: 0x06..=0x08)
///
/// 24-bit synthesizer word, most significant byte at 0x06. The carrier frequency
/// is `frf × F(XOSC) / 2^19`.
///
/// # Important Notes
/// - Written as one 3-byte burst; the chip latches the new frequency when the
///   least significant byte is written
/// - Can only be changed in Sleep or Standby
#[register(0x06u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct CarrierFrequency {
    /// Synthesizer word, 24 bits
    pub frf: u32,
}

impl CarrierFrequency {
    /// Rounds `frequency_hz × 2^19 / crystal_hz` to the nearest synthesizer step.
    pub fn from_hz(frequency_hz: u32, crystal_hz: u32) -> Self {
        let crystal = u64::from(crystal_hz);
        let scaled = u64::from(frequency_hz) << 19;
        Self {
            frf: ((scaled + crystal / 2) / crystal) as u32 & 0x00FF_FFFF,
        }
    }

    /// Carrier frequency this word selects for a given crystal.
    pub fn to_hz(self, crystal_hz: u32) -> u32 {
        ((u64::from(self.frf) * u64::from(crystal_hz)) >> 19) as u32
    }
}

/// Power amplifier configuration register (address: 0x09)
///
/// # Important Notes
/// - RFM95/96 modules only route the PA_BOOST pin to the antenna, so
///   `pa_boost` must be set on them
/// - With PA_BOOST, output power is `17 - (15 - output_power)` dBm, or up to
///   +20 dBm when [`PaDac::high_power`] is set
#[register(0x09u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaConfig {
    /// Output on PA_BOOST instead of RFO
    pub pa_boost: bool,
    /// Maximum power selection, 3 bits
    pub max_power: u8,
    /// Output power selection, 4 bits
    pub output_power: u8,
}

impl Default for PaConfig {
    fn default() -> Self {
        Self {
            pa_boost: true,
            max_power: 0x7,
            output_power: 0xF,
        }
    }
}

/// Over-current protection register (address: 0x0B)
///
/// Trim `t` limits the PA current to `45 + 5t` mA for `t <= 15`,
/// `-30 + 10t` mA for `t <= 27` and 240 mA above.
#[register(0x0Bu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct Ocp {
    /// Protection enabled
    pub enabled: bool,
    /// Current limit trim, 5 bits
    pub trim: u8,
}

impl Default for Ocp {
    fn default() -> Self {
        Self {
            enabled: true,
            trim: 0x17,
        }
    }
}

/// LNA settings register (address: 0x0C)
#[register(0x0Cu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct Lna {
    /// Gain setting, 1 = maximum gain, 6 = minimum gain
    pub gain: u8,
    /// Low frequency port boost, 2 bits, must stay 0
    pub boost_lf: u8,
    /// High frequency port boost, 2 bits, 0b11 = +150% LNA current
    pub boost_hf: u8,
}

impl Default for Lna {
    fn default() -> Self {
        Self {
            gain: 0x1,
            boost_lf: 0x0,
            boost_hf: 0x3,
        }
    }
}

/// High power PA DAC register (address: 0x4D)
///
/// # Important Notes
/// - Only effective on PA_BOOST
/// - The +20 dBm setting limits the duty cycle to 1% and needs OCP raised
#[register(0x4Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaDac {
    /// +20 dBm operation enabled
    pub high_power: bool,
}

impl PaDac {
    const RESERVED: u8 = 0x80;
    const DEFAULT_POWER: u8 = 0x04;
    const HIGH_POWER: u8 = 0x07;
}

impl Default for PaDac {
    fn default() -> Self {
        Self { high_power: true }
    }
}

impl FromByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            frf: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
        })
    }
}

impl ToByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [_, msb, mid, lsb] = self.frf.to_be_bytes();
        Ok([msb, mid, lsb])
    }
}

impl FromByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pa_boost: bytes[0] & 0x80 != 0,
            max_power: (bytes[0] >> 4) & 0x07,
            output_power: bytes[0] & 0x0F,
        })
    }
}

impl ToByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.pa_boost as u8) << 7)
            | ((self.max_power & 0x07) << 4)
            | (self.output_power & 0x0F)])
    }
}

impl FromByteArray for Ocp {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: bytes[0] & 0x20 != 0,
            trim: bytes[0] & 0x1F,
        })
    }
}

impl ToByteArray for Ocp {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.enabled as u8) << 5) | (self.trim & 0x1F)])
    }
}

impl FromByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            gain: bytes[0] >> 5,
            boost_lf: (bytes[0] >> 3) & 0x03,
            boost_hf: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.gain & 0x07) << 5) | ((self.boost_lf & 0x03) << 3) | (self.boost_hf & 0x03)])
    }
}

impl FromByteArray for PaDac {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            high_power: bytes[0] & 0x07 == Self::HIGH_POWER,
        })
    }
}

impl ToByteArray for PaDac {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let power = if self.high_power {
            Self::HIGH_POWER
        } else {
            Self::DEFAULT_POWER
        };
        Ok([Self::RESERVED | power])
    }
}
