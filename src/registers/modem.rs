//! LoRa modem configuration registers
//!
//! This module contains the registers that shape the LoRa waveform:
//! - Signal bandwidth and coding rate
//! - Spreading factor and payload CRC
//! - Low data rate optimization and AGC
//! - Preamble length and sync word
//!
//! Both ends of a link must agree on every setting in this module except the AGC.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Error type for modem setting conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidModemSetting(pub u8);

/// Signal bandwidth, `RegModemConfig1[7:4]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    /// 7.8 kHz
    Khz7_8 = 0x0,
    /// 10.4 kHz
    Khz10_4 = 0x1,
    /// 15.6 kHz
    Khz15_6 = 0x2,
    /// 20.8 kHz
    Khz20_8 = 0x3,
    /// 31.25 kHz
    Khz31_25 = 0x4,
    /// 41.7 kHz
    Khz41_7 = 0x5,
    /// 62.5 kHz
    Khz62_5 = 0x6,
    /// 125 kHz
    Khz125 = 0x7,
    /// 250 kHz
    Khz250 = 0x8,
    /// 500 kHz
    Khz500 = 0x9,
}

impl TryFrom<u8> for Bandwidth {
    type Error = InvalidModemSetting;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Khz7_8),
            0x1 => Ok(Self::Khz10_4),
            0x2 => Ok(Self::Khz15_6),
            0x3 => Ok(Self::Khz20_8),
            0x4 => Ok(Self::Khz31_25),
            0x5 => Ok(Self::Khz41_7),
            0x6 => Ok(Self::Khz62_5),
            0x7 => Ok(Self::Khz125),
            0x8 => Ok(Self::Khz250),
            0x9 => Ok(Self::Khz500),
            invalid => Err(InvalidModemSetting(invalid)),
        }
    }
}

/// Forward error correction coding rate, `RegModemConfig1[3:1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodingRate {
    /// 4/5
    Cr4_5 = 0x1,
    /// 4/6
    Cr4_6 = 0x2,
    /// 4/7
    Cr4_7 = 0x3,
    /// 4/8
    Cr4_8 = 0x4,
}

impl TryFrom<u8> for CodingRate {
    type Error = InvalidModemSetting;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(Self::Cr4_5),
            0x2 => Ok(Self::Cr4_6),
            0x3 => Ok(Self::Cr4_7),
            0x4 => Ok(Self::Cr4_8),
            invalid => Err(InvalidModemSetting(invalid)),
        }
    }
}

/// Spreading factor in chips per symbol (log2), `RegModemConfig2[7:4]`
///
/// SF6 additionally requires implicit header mode and the SF6 detection
/// settings, which this driver does not write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpreadingFactor {
    /// 64 chips per symbol
    Sf6 = 6,
    /// 128 chips per symbol
    Sf7 = 7,
    /// 256 chips per symbol
    Sf8 = 8,
    /// 512 chips per symbol
    Sf9 = 9,
    /// 1024 chips per symbol
    Sf10 = 10,
    /// 2048 chips per symbol
    Sf11 = 11,
    /// 4096 chips per symbol
    Sf12 = 12,
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = InvalidModemSetting;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            6 => Ok(Self::Sf6),
            7 => Ok(Self::Sf7),
            8 => Ok(Self::Sf8),
            9 => Ok(Self::Sf9),
            10 => Ok(Self::Sf10),
            11 => Ok(Self::Sf11),
            12 => Ok(Self::Sf12),
            invalid => Err(InvalidModemSetting(invalid)),
        }
    }
}

/// Modem configuration register 1 (address: 0x1D)
#[register(0x1Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig1 {
    /// Signal bandwidth
    pub bandwidth: Bandwidth,
    /// Coding rate
    pub coding_rate: CodingRate,
    /// Implicit header mode (no length/CR/CRC header on air)
    pub implicit_header: bool,
}

impl Default for ModemConfig1 {
    fn default() -> Self {
        Self {
            bandwidth: Bandwidth::Khz125,
            coding_rate: CodingRate::Cr4_8,
            implicit_header: false,
        }
    }
}

/// Modem configuration register 2 (address: 0x1E)
///
/// # Important Notes
/// - The transmitter appends a CRC when `rx_payload_crc_on` is set; in explicit
///   header mode the receiver learns this from the header and checks it
/// - `symbol_timeout_msb` holds bits 9:8 of the single-receive timeout
#[register(0x1Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig2 {
    /// Spreading factor
    pub spreading_factor: SpreadingFactor,
    /// Send the FIFO content repeatedly (test mode)
    pub tx_continuous: bool,
    /// Generate and check a payload CRC
    pub rx_payload_crc_on: bool,
    /// RX timeout, two most significant bits
    pub symbol_timeout_msb: u8,
}

impl Default for ModemConfig2 {
    fn default() -> Self {
        Self {
            spreading_factor: SpreadingFactor::Sf12,
            tx_continuous: false,
            rx_payload_crc_on: true,
            symbol_timeout_msb: 0,
        }
    }
}

/// Modem configuration register 3 (address: 0x26)
///
/// # Important Notes
/// - Low data rate optimization is mandated once a symbol lasts longer than
///   16 ms (SF11 and SF12 at 125 kHz)
#[register(0x26u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig3 {
    /// Low data rate optimization
    pub low_data_rate_optimize: bool,
    /// LNA gain set by the AGC loop instead of the [`Lna`](crate::Lna) register
    pub agc_auto_on: bool,
}

impl Default for ModemConfig3 {
    fn default() -> Self {
        Self {
            low_data_rate_optimize: true,
            agc_auto_on: true,
        }
    }
}

/// Preamble length registers (addresses: 0x20..=0x21)
///
/// Number of programmed preamble symbols; the modem adds 4.25 symbols on air.
#[register(0x20u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PreambleLength {
    /// Preamble length in symbols
    pub symbols: u16,
}

impl Default for PreambleLength {
    fn default() -> Self {
        Self { symbols: 12 }
    }
}

/// Sync word register (address: 0x39)
///
/// 0x34 is reserved for LoRaWAN networks; 0x12 is the private network default.
#[register(0x39u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct SyncWord {
    /// Sync word value
    pub value: u8,
}

impl Default for SyncWord {
    fn default() -> Self {
        Self { value: 0x12 }
    }
}

impl FromByteArray for ModemConfig1 {
    type Error = InvalidModemSetting;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            bandwidth: Bandwidth::try_from(bytes[0] >> 4)?,
            coding_rate: CodingRate::try_from((bytes[0] >> 1) & 0x07)?,
            implicit_header: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.bandwidth as u8) << 4)
            | ((self.coding_rate as u8) << 1)
            | self.implicit_header as u8])
    }
}

impl FromByteArray for ModemConfig2 {
    type Error = InvalidModemSetting;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            spreading_factor: SpreadingFactor::try_from(bytes[0] >> 4)?,
            tx_continuous: bytes[0] & 0x08 != 0,
            rx_payload_crc_on: bytes[0] & 0x04 != 0,
            symbol_timeout_msb: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.spreading_factor as u8) << 4)
            | ((self.tx_continuous as u8) << 3)
            | ((self.rx_payload_crc_on as u8) << 2)
            | (self.symbol_timeout_msb & 0x03)])
    }
}

impl FromByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            low_data_rate_optimize: bytes[0] & 0x08 != 0,
            agc_auto_on: bytes[0] & 0x04 != 0,
        })
    }
}

impl ToByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.low_data_rate_optimize as u8) << 3) | ((self.agc_auto_on as u8) << 2)])
    }
}

impl FromByteArray for PreambleLength {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            symbols: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for PreambleLength {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.symbols.to_be_bytes())
    }
}

impl FromByteArray for SyncWord {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl ToByteArray for SyncWord {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.value])
    }
}
