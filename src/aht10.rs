//! AHT10 humidity and temperature sensor
//!
//! The AHT10 answers at a fixed I2C address and has no registers: it is driven by
//! three-byte commands. A measurement is triggered, left to convert, then read back
//! as six bytes: one status byte followed by two 20-bit fractions (humidity, then
//! temperature) packed across the remaining five bytes.
//!
//! Any byte the sensor fails to acknowledge aborts the operation with
//! [`SensorError::BusNack`]; a reply whose status byte still carries the busy flag is
//! rejected with [`SensorError::Busy`]. Neither is retried here.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, I2c, SevenBitAddress};

use crate::pipeline::SampleSource;
use crate::sample::Sample;

/// Fixed I2C address of the sensor
pub const ADDRESS: SevenBitAddress = 0x38;

/// Calibration/initialization command
pub const CMD_INITIALIZE: [u8; 3] = [0xE1, 0x08, 0x00];

/// Trigger-measurement command
pub const CMD_TRIGGER_MEASUREMENT: [u8; 3] = [0xAC, 0x33, 0x00];

/// Time the sensor needs after the initialization command
pub const INIT_SETTLE_MS: u32 = 100;

/// Wait between triggering a measurement and reading it back. The datasheet
/// gives 75 ms as the longest conversion.
pub const CONVERSION_MS: u32 = 80;

/// Length of a measurement reply
pub const REPLY_LEN: usize = 6;

const STATUS_BUSY: u8 = 0x80;
const FRACTION_SCALE: u64 = 1 << 20;

/// Errors reported by the sensor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError<E> {
    /// A byte of the transaction was not acknowledged
    BusNack,
    /// The status byte reported a conversion still in progress
    Busy,
    /// Any other bus fault
    Bus(E),
}

impl<E> SensorError<E>
where
    E: embedded_hal::i2c::Error,
{
    fn from_bus(error: E) -> Self {
        match error.kind() {
            ErrorKind::NoAcknowledge(_) => Self::BusNack,
            _ => Self::Bus(error),
        }
    }
}

/// AHT10 driver over any I2C bus.
pub struct Aht10<I2C, D> {
    i2c: I2C,
    delay: D,
}

impl<I2C, D> Aht10<I2C, D> {
    /// Creates a driver for the sensor on `i2c`.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self { i2c, delay }
    }

    /// Releases the bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C, D> Aht10<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Sends the calibration command and waits for the sensor to settle.
    pub fn init(&mut self) -> Result<(), SensorError<I2C::Error>> {
        self.i2c
            .write(ADDRESS, &CMD_INITIALIZE)
            .map_err(SensorError::from_bus)?;
        self.delay.delay_ms(INIT_SETTLE_MS);
        Ok(())
    }

    /// Triggers a conversion and returns the decoded sample.
    pub fn read_sample(&mut self) -> Result<Sample, SensorError<I2C::Error>> {
        self.i2c
            .write(ADDRESS, &CMD_TRIGGER_MEASUREMENT)
            .map_err(SensorError::from_bus)?;

        self.delay.delay_ms(CONVERSION_MS);

        let mut reply = [0u8; REPLY_LEN];
        self.i2c
            .read(ADDRESS, &mut reply)
            .map_err(SensorError::from_bus)?;

        decode(&reply).ok_or(SensorError::Busy)
    }
}

impl<I2C, D> SampleSource for Aht10<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = SensorError<I2C::Error>;

    fn read_sample(&mut self) -> Result<Sample, Self::Error> {
        Aht10::read_sample(self)
    }
}

/// Decodes a measurement reply, or `None` if the sensor was still busy.
pub fn decode(reply: &[u8; REPLY_LEN]) -> Option<Sample> {
    if reply[0] & STATUS_BUSY != 0 {
        return None;
    }

    let humidity =
        (u32::from(reply[1]) << 12) | (u32::from(reply[2]) << 4) | u32::from(reply[3] >> 4);
    let temperature =
        (u32::from(reply[3] & 0x0F) << 16) | (u32::from(reply[4]) << 8) | u32::from(reply[5]);

    Some(Sample {
        temperature: temperature_centi(temperature),
        humidity: humidity_centi(humidity),
    })
}

/// Relative humidity ×100 from a raw 20-bit fraction, truncating.
pub fn humidity_centi(fraction: u32) -> i16 {
    // 0..=9999 for any 20-bit input
    ((u64::from(fraction) * 10_000) / FRACTION_SCALE) as i16
}

/// Temperature in °C ×100 from a raw 20-bit fraction, truncating.
pub fn temperature_centi(fraction: u32) -> i16 {
    // -5000..=14999 for any 20-bit input
    (((u64::from(fraction) * 20_000) / FRACTION_SCALE) as i64 - 5_000) as i16
}
