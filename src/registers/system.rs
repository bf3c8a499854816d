//! System registers
//!
//! This module contains the registers that select the modem family and operating
//! mode, and the silicon revision used to identify the chip.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Operating mode of the transceiver, `RegOpMode[2:0]`
///
/// The driver only ever requests [`Mode::Sleep`], [`Mode::Standby`],
/// [`Mode::Transmit`] and [`Mode::ContinuousReceive`]; the other modes are decoded
/// so that any state the chip reports can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Lowest power; the only mode in which the modem family can be changed
    Sleep = 0x0,
    /// Crystal oscillator running, FIFO accessible
    Standby = 0x1,
    /// Frequency synthesizer locked at the TX frequency
    FsTx = 0x2,
    /// Transmitting the FIFO contents
    Transmit = 0x3,
    /// Frequency synthesizer locked at the RX frequency
    FsRx = 0x4,
    /// Receiving until told otherwise
    ContinuousReceive = 0x5,
    /// Receiving a single packet, then back to standby
    SingleReceive = 0x6,
    /// Channel activity detection
    Cad = 0x7,
}

impl Mode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0x0 => Self::Sleep,
            0x1 => Self::Standby,
            0x2 => Self::FsTx,
            0x3 => Self::Transmit,
            0x4 => Self::FsRx,
            0x5 => Self::ContinuousReceive,
            0x6 => Self::SingleReceive,
            _ => Self::Cad,
        }
    }
}

/// Operating mode register (address: 0x01)
///
/// # Important Notes
/// - `long_range_mode` selects LoRa (set) or FSK/OOK (clear) and can only be
///   changed in [`Mode::Sleep`]
/// - This driver writes the register with `long_range_mode` always set
/// - `low_frequency_mode_on` selects the LF register bank (access to the
///   169/433 MHz band settings); the driver leaves it clear
#[register(0x01u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct OpMode {
    /// LoRa modem selected
    pub long_range_mode: bool,
    /// Low frequency register bank selected
    pub low_frequency_mode_on: bool,
    /// Transceiver mode
    pub mode: Mode,
}

impl OpMode {
    /// LoRa operating mode with the high-frequency register bank.
    pub fn lora(mode: Mode) -> Self {
        Self {
            long_range_mode: true,
            low_frequency_mode_on: false,
            mode,
        }
    }
}

/// Silicon version register (address: 0x42)
///
/// Holds the chip revision; every production SX1276/77/78/79 (and the RFM95/96
/// modules built on them) reports [`Version::SX1276`].
#[register(0x42u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct Version {
    /// Full revision number in the high nibble, metal mask revision in the low one
    pub value: u8,
}

impl Version {
    /// Signature reported by the SX1276 family
    pub const SX1276: u8 = 0x12;
}

impl FromByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            long_range_mode: bytes[0] & 0x80 != 0,
            low_frequency_mode_on: bytes[0] & 0x08 != 0,
            mode: Mode::from_bits(bytes[0]),
        })
    }
}

impl ToByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.long_range_mode as u8) << 7)
            | ((self.low_frequency_mode_on as u8) << 3)
            | self.mode as u8])
    }
}

impl FromByteArray for Version {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}
