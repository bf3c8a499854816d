//! SX1276 Register Interface
//!
//! This module provides register-level access to SX1276 series radio devices
//! through SPI communication. It supports both synchronous and asynchronous
//! operations.
//!
//! Every access is one SPI transaction, framed by chip select: an address byte
//! whose bit 7 selects write (1) or read (0), followed by the data. For ordinary
//! registers the chip auto-increments the address after each data byte, which is
//! what makes multi-byte registers such as
//! [`CarrierFrequency`](crate::CarrierFrequency) a single burst. The FIFO register
//! instead streams through the FIFO at [`FifoAddrPtr`](crate::FifoAddrPtr).
//!
//! There is no acknowledgement at this level: a transfer that completes on the bus
//! is assumed to have reached the chip. Callers that need certainty read a value
//! back, as the link controller does with the [`Version`](crate::Version) register.
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use rfm95_sensor_link::{Device, Error, Version};
//!
//! fn chip_version<SPI: SpiDevice>(spi: SPI) -> Result<u8, Error> {
//!     let mut device = Device::new(spi);
//!     let version: Version = device.read_register()?;
//!     Ok(version.value)
//! }
//! ```

use core::convert::Infallible;

use regiface::{
    errors::Error as RegifaceError, ByteArray, FromByteArray, ReadableRegister, ToByteArray,
    WritableRegister,
};

use crate::registers::REG_FIFO;

const WRITE_FLAG: u8 = 0x80;

fn read_header(address: u8) -> [u8; 1] {
    [address & !WRITE_FLAG]
}

fn write_header(address: u8) -> [u8; 1] {
    [address | WRITE_FLAG]
}

fn register_bytes<R>(register: R) -> R::Array
where
    R: ToByteArray<Error = Infallible>,
{
    match register.to_bytes() {
        Ok(bytes) => bytes,
        Err(never) => match never {},
    }
}

/// Register access interface for the SX1276 radio.
///
/// This struct wraps an SPI device and provides methods to read and write the
/// radio's registers and FIFO. It supports both synchronous operations through the
/// embedded-hal traits and asynchronous operations through embedded-hal-async.
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI device.
    ///
    /// # Arguments
    /// * `spi` - An SPI device (bus plus chip select) implementing the embedded-hal traits
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Reads one register by address.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn read_raw(&mut self, address: u8) -> Result<u8, RegifaceError> {
        let mut value = [0u8];

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&read_header(address)),
                embedded_hal::spi::Operation::Read(&mut value),
            ])
            .map_err(|_| RegifaceError::BusError)?;

        Ok(value[0])
    }

    /// Writes one register by address.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_raw(&mut self, address: u8, value: u8) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&write_header(address)),
                embedded_hal::spi::Operation::Write(&[value]),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Reads a register value from the device.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing ReadableRegister with u8 ID
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    /// * `RegifaceError::DeserializationError` - Failed to parse register value
    pub fn read_register<R>(&mut self) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&read_header(R::id())),
                embedded_hal::spi::Operation::Read(raw_value.as_mut()),
            ])
            .map_err(|_| RegifaceError::BusError)?;

        R::from_bytes(raw_value).map_err(|_| RegifaceError::DeserializationError)
    }

    /// Writes a value to a device register.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing WritableRegister with u8 ID
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_register<R>(&mut self, register: R) -> Result<(), RegifaceError>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = register_bytes(register);

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&write_header(R::id())),
                embedded_hal::spi::Operation::Write(raw_value.as_ref()),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Writes bytes into the FIFO at the current FIFO pointer.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_fifo(&mut self, bytes: &[u8]) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&write_header(REG_FIFO)),
                embedded_hal::spi::Operation::Write(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Reads bytes out of the FIFO starting at the current FIFO pointer.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn read_fifo(&mut self, bytes: &mut [u8]) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&read_header(REG_FIFO)),
                embedded_hal::spi::Operation::Read(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal_async::spi::SpiDevice,
{
    /// Asynchronously reads one register by address.
    ///
    /// This is the async version of [`read_raw`](Device::read_raw).
    pub async fn read_raw_async(&mut self, address: u8) -> Result<u8, RegifaceError> {
        let mut value = [0u8];

        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&read_header(address)),
                embedded_hal_async::spi::Operation::Read(&mut value),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)?;

        Ok(value[0])
    }

    /// Asynchronously writes one register by address.
    ///
    /// This is the async version of [`write_raw`](Device::write_raw).
    pub async fn write_raw_async(&mut self, address: u8, value: u8) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&write_header(address)),
                embedded_hal_async::spi::Operation::Write(&[value]),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)
    }

    /// Asynchronously reads a register value from the device.
    ///
    /// This is the async version of [`read_register`](Device::read_register).
    pub async fn read_register_async<R>(&mut self) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&read_header(R::id())),
                embedded_hal_async::spi::Operation::Read(raw_value.as_mut()),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)?;

        R::from_bytes(raw_value).map_err(|_| RegifaceError::DeserializationError)
    }

    /// Asynchronously writes a value to a device register.
    ///
    /// This is the async version of [`write_register`](Device::write_register).
    pub async fn write_register_async<R>(&mut self, register: R) -> Result<(), RegifaceError>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = register_bytes(register);

        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&write_header(R::id())),
                embedded_hal_async::spi::Operation::Write(raw_value.as_ref()),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)
    }

    /// Asynchronously writes bytes into the FIFO.
    ///
    /// This is the async version of [`write_fifo`](Device::write_fifo).
    pub async fn write_fifo_async(&mut self, bytes: &[u8]) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&write_header(REG_FIFO)),
                embedded_hal_async::spi::Operation::Write(bytes),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)
    }

    /// Asynchronously reads bytes out of the FIFO.
    ///
    /// This is the async version of [`read_fifo`](Device::read_fifo).
    pub async fn read_fifo_async(&mut self, bytes: &mut [u8]) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&read_header(REG_FIFO)),
                embedded_hal_async::spi::Operation::Read(bytes),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)
    }
}
