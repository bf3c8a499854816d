//! Packet and FIFO registers
//!
//! The SX1276 has a single 256-byte FIFO shared by transmit and receive. Data is
//! accessed through the FIFO data register at the position held in
//! [`FifoAddrPtr`], which advances by one on every access.
//!
//! # Important Notes
//! - The FIFO cannot be accessed in Sleep
//! - The FIFO is cleared when entering Sleep
//! - TX data is sent from [`FifoTxBaseAddr`]; received packets are stored from
//!   [`FifoRxBaseAddr`] onwards and the start of the last one is reported in
//!   [`FifoRxCurrentAddr`]

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// FIFO SPI pointer register (address: 0x0D)
#[register(0x0Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct FifoAddrPtr {
    /// Next FIFO position accessed over SPI
    pub address: u8,
}

/// FIFO TX base address register (address: 0x0E)
#[register(0x0Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct FifoTxBaseAddr {
    /// Start of the transmit payload in the FIFO
    pub address: u8,
}

/// FIFO RX base address register (address: 0x0F)
#[register(0x0Fu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct FifoRxBaseAddr {
    /// Start of the receive area in the FIFO
    pub address: u8,
}

/// Start address of the last received packet (address: 0x10, read only)
#[register(0x10u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct FifoRxCurrentAddr {
    /// FIFO position of the first byte of the last packet
    pub address: u8,
}

/// Number of payload bytes of the last packet (address: 0x13, read only)
#[register(0x13u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct RxNbBytes {
    /// Payload length in bytes
    pub count: u8,
}

/// RSSI of the last packet (address: 0x1A, read only)
///
/// The value is relative: `RSSI[dBm] = value - 157` on the high frequency port,
/// `value - 164` on the low frequency port.
#[register(0x1Au8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct PktRssiValue {
    /// Raw RSSI reading
    pub value: u8,
}

/// Payload length register (address: 0x22)
///
/// Number of bytes to transmit. In implicit header mode it is also the expected
/// receive length. Must not be 0.
#[register(0x22u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PayloadLength {
    /// Payload length in bytes
    pub length: u8,
}

impl Default for PayloadLength {
    fn default() -> Self {
        Self { length: 1 }
    }
}

impl FromByteArray for FifoAddrPtr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { address: bytes[0] })
    }
}

impl ToByteArray for FifoAddrPtr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.address])
    }
}

impl FromByteArray for FifoTxBaseAddr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { address: bytes[0] })
    }
}

impl ToByteArray for FifoTxBaseAddr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.address])
    }
}

impl FromByteArray for FifoRxBaseAddr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { address: bytes[0] })
    }
}

impl ToByteArray for FifoRxBaseAddr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.address])
    }
}

impl FromByteArray for FifoRxCurrentAddr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { address: bytes[0] })
    }
}

impl FromByteArray for RxNbBytes {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { count: bytes[0] })
    }
}

impl FromByteArray for PktRssiValue {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

impl FromByteArray for PayloadLength {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { length: bytes[0] })
    }
}

impl ToByteArray for PayloadLength {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.length])
    }
}
