//! Interrupt and DIO mapping registers
//!
//! The modem raises its events in [`IrqFlags`]; each event can additionally be
//! routed to a DIO pin through [`DioMapping1`]. This driver never waits on a DIO
//! line: it polls the flags register, and only maps DIO0 so that boards watching
//! that pin still see TxDone/RxDone.
//!
//! # Important Notes
//! - A flag stays set until it is cleared by writing a 1 to its bit
//! - A masked flag ([`IrqFlagsMask`]) never sets in [`IrqFlags`]

use core::convert::Infallible;

use bitflags::bitflags;
use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

bitflags! {
    /// LoRa modem interrupt sources
    ///
    /// Same bit layout in [`IrqFlags`] and [`IrqFlagsMask`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Irq: u8 {
        /// Single receive timed out
        const RX_TIMEOUT = 1 << 7;
        /// A packet has been received
        const RX_DONE = 1 << 6;
        /// The received payload failed its CRC
        const PAYLOAD_CRC_ERROR = 1 << 5;
        /// A valid header has been received
        const VALID_HEADER = 1 << 4;
        /// The FIFO payload has been sent
        const TX_DONE = 1 << 3;
        /// Channel activity detection finished
        const CAD_DONE = 1 << 2;
        /// Frequency hopping channel change requested
        const FHSS_CHANGE_CHANNEL = 1 << 1;
        /// Channel activity detected
        const CAD_DETECTED = 1;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Irq {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Irq({=u8:#x})", self.bits())
    }
}

/// Interrupt flags register (address: 0x12)
///
/// # Important Notes
/// - Writing a set bit clears the corresponding flag; zero bits are ignored
/// - `IrqFlags { irqs: Irq::all() }` clears every pending flag
#[register(0x12u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqFlags {
    /// Pending (read) or to-be-cleared (write) interrupts
    pub irqs: Irq,
}

/// Interrupt mask register (address: 0x11)
#[register(0x11u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqFlagsMask {
    /// Interrupts that are masked off
    pub masked: Irq,
}

impl Default for IrqFlagsMask {
    fn default() -> Self {
        Self {
            masked: Irq::empty(),
        }
    }
}

/// Event signalled on DIO0 in LoRa mode, `RegDioMapping1[7:6]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dio0Mapping {
    /// RxDone
    RxDone = 0b00,
    /// TxDone
    TxDone = 0b01,
    /// CadDone
    CadDone = 0b10,
}

/// DIO mapping register 1 (address: 0x40)
///
/// # Important Notes
/// - Only DIO0 is given a meaning here; DIO1..DIO3 are written as 0
///   (RxTimeout, FhssChangeChannel, CadDone)
#[register(0x40u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct DioMapping1 {
    /// Event routed to DIO0
    pub dio0: Dio0Mapping,
}

impl FromByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            irqs: Irq::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.irqs.bits()])
    }
}

impl FromByteArray for IrqFlagsMask {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            masked: Irq::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlagsMask {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.masked.bits()])
    }
}

impl FromByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let dio0 = match bytes[0] >> 6 {
            0b00 => Dio0Mapping::RxDone,
            0b01 => Dio0Mapping::TxDone,
            // reserved 0b11 decodes as CadDone
            _ => Dio0Mapping::CadDone,
        };
        Ok(Self { dio0 })
    }
}

impl ToByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([(self.dio0 as u8) << 6])
    }
}
