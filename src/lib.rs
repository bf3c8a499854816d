#![no_std]
#![warn(missing_docs)]
//! AHT10-to-LoRa Sensor Link
//!
//! This crate moves periodic temperature and humidity readings from an AHT10 sensor
//! over a Semtech SX1276/77/78/79 (HopeRF RFM95/96) LoRa link. It contains the whole
//! path from GPIO pins to the far end's display, built on `embedded-hal` 1.0 traits so
//! it runs on any platform that can provide pins, an SPI device and a delay.
//!
//! # Features
//! - Software-timed (bit-banged) I2C master on two GPIO pins, usable as an
//!   `embedded_hal::i2c::I2c` bus
//! - AHT10 calibration, measurement and fixed-point decoding
//! - Typed SX1276 LoRa register map with raw, typed and FIFO burst access, blocking
//!   and async
//! - Link controller: identity check, configuration, transmit with timeout,
//!   continuous receive polling and RSSI readout
//! - 4-byte sample frame and the transmit/receive loops built on it
//!
//! # Architecture
//! The crate is organized into several modules, leaves first:
//!
//! - [`bitbang`]: open-drain I2C master over an SCL `OutputPin` and an SDA
//!   `OutputPin + InputPin`
//! - [`aht10`]: sensor protocol driver over any `I2c`
//! - [`device`]: register-level SPI access to the radio
//! - [`registers`]: register definitions for direct hardware access
//!   - RF front end (frequency, power amplifier, LNA, over-current protection)
//!   - modem (bandwidth, coding rate, spreading factor, preamble, sync word)
//!   - packet and FIFO pointers
//!   - interrupt flags and DIO mapping
//!   - operating mode and version
//! - [`radio`]: operating-mode state machine on top of [`Device`]
//! - [`sample`]: the sample type and its wire frame
//! - [`pipeline`]: transmitter and receiver loops, written against the
//!   [`SampleSource`], [`Transceiver`] and [`TextDisplay`] seams
//!
//! # Usage
//! The radio side uses the `regiface` crate for type-safe register access. Most
//! applications only need [`Radio`]; [`Device`] stays available for direct register
//! work.
//!
//! Bring-up follows a fixed sequence:
//!
//! 1. Create a [`BitBangI2c`] on the sensor pins and call [`BitBangI2c::init`]
//! 2. Wrap it in an [`Aht10`] and call [`Aht10::init`]
//! 3. Create a [`Radio`] on the SPI device and call [`Radio::init`]
//! 4. Hand both to a [`SampleTransmitter`], or hand the radio and a display to a
//!    [`SampleReceiver`]
//!
//! # Important Notes
//! - Everything is blocking and polled; no interrupts are used
//! - Transmit waits at most [`RadioConfig::tx_timeout_ms`] for TxDone and always
//!   leaves the chip in Standby
//! - The TX and RX FIFO areas overlap; a transmit discards any unread packet
//! - The I2C master does not support clock stretching or multi-master arbitration
//! - Enable the `defmt` feature to get status lines through `defmt`
//!
//! # Example
//! ```no_run
//! use embedded_hal::{delay::DelayNs, spi::SpiDevice};
//! use rfm95_sensor_link::{Radio, RadioConfig, RadioError, Sample};
//!
//! fn send_reading<SPI: SpiDevice, D: DelayNs>(spi: SPI, delay: D) -> Result<(), RadioError> {
//!     let mut radio = Radio::new(spi, delay);
//!     radio.init(RadioConfig::default())?;
//!
//!     let sample = Sample { temperature: 2500, humidity: 6000 };
//!     radio.transmit(&sample.to_bytes())
//! }
//! ```

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

#[cfg(test)]
mod sim;

pub use regiface::errors::Error;

pub mod aht10;
pub mod bitbang;
pub mod device;
pub mod pipeline;
pub mod radio;
pub mod registers;
pub mod sample;

pub use aht10::{Aht10, SensorError};
pub use bitbang::{BitBangI2c, BusError};
pub use device::Device;
pub use pipeline::{
    CycleError, ReceiveError, Reception, SampleReceiver, SampleSource, SampleTransmitter,
    TextDisplay, Transceiver,
};
pub use radio::{NoPin, Radio, RadioConfig, RadioError};
pub use registers::*;
pub use sample::{InvalidFrameLength, Sample, FRAME_LEN};
