//! Software-timed I2C master
//!
//! Drives SCL and SDA directly through GPIO with a fixed 5 µs delay between edges,
//! giving a bus clock of roughly 100 kHz. SDA must be configured open-drain: driving
//! it high releases the line so the addressed peripheral can pull it low for an
//! acknowledge or a data bit. SCL is only ever driven by the master; clock
//! stretching is not supported.
//!
//! The byte-level primitives ([`BitBangI2c::start`], [`BitBangI2c::write_byte`], ...)
//! are public for callers that need exact control over framing. Everything else
//! should go through the [`embedded_hal::i2c::I2c`] implementation, which takes care
//! of repeated starts, the final NACK of a read and the closing stop condition.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation, SevenBitAddress};

/// Delay between two consecutive edges on the bus
pub const EDGE_DELAY_US: u32 = 5;

/// Time the bus is held idle by [`BitBangI2c::init`]
pub const IDLE_SETTLE_MS: u32 = 1;

/// Gap between two addresses tried by [`BitBangI2c::scan`]
pub const SCAN_GAP_US: u32 = 100;

/// Errors raised by the bit-banged bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Setting or sampling one of the GPIO lines failed
    Pin,
    /// A byte was not acknowledged by the peripheral
    NoAcknowledge(NoAcknowledgeSource),
}

impl i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Pin => ErrorKind::Bus,
            Self::NoAcknowledge(source) => ErrorKind::NoAcknowledge(*source),
        }
    }
}

/// Bit-banged I2C master over two GPIO lines.
pub struct BitBangI2c<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
}

impl<SCL, SDA, D> BitBangI2c<SCL, SDA, D> {
    /// Creates a new bus master from the clock line, the open-drain data line and a
    /// delay provider.
    pub fn new(scl: SCL, sda: SDA, delay: D) -> Self {
        Self { scl, sda, delay }
    }

    /// Releases the pins and the delay provider.
    pub fn release(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }
}

impl<SCL, SDA, D> BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin,
    SDA: OutputPin + InputPin,
    D: DelayNs,
{
    /// Puts the bus into its idle state (both lines high) and lets it settle.
    pub fn init(&mut self) -> Result<(), BusError> {
        self.set_data(true)?;
        self.set_clock(true)?;
        self.delay.delay_ms(IDLE_SETTLE_MS);
        Ok(())
    }

    /// Drives the clock line.
    pub fn set_clock(&mut self, level: bool) -> Result<(), BusError> {
        if level {
            self.scl.set_high()
        } else {
            self.scl.set_low()
        }
        .map_err(|_| BusError::Pin)
    }

    /// Drives the data line low, or releases it when `level` is high.
    pub fn set_data(&mut self, level: bool) -> Result<(), BusError> {
        if level {
            self.sda.set_high()
        } else {
            self.sda.set_low()
        }
        .map_err(|_| BusError::Pin)
    }

    /// Samples the data line.
    pub fn read_data(&mut self) -> Result<bool, BusError> {
        self.sda.is_high().map_err(|_| BusError::Pin)
    }

    fn edge_delay(&mut self) {
        self.delay.delay_us(EDGE_DELAY_US);
    }

    /// Issues a start condition: SDA falls while SCL is high.
    pub fn start(&mut self) -> Result<(), BusError> {
        self.set_data(true)?;
        self.set_clock(true)?;
        self.edge_delay();
        self.set_data(false)?;
        self.edge_delay();
        self.set_clock(false)?;
        self.edge_delay();
        Ok(())
    }

    /// Issues a stop condition: SDA rises while SCL is high.
    pub fn stop(&mut self) -> Result<(), BusError> {
        self.set_data(false)?;
        self.set_clock(false)?;
        self.edge_delay();
        self.set_clock(true)?;
        self.edge_delay();
        self.set_data(true)?;
        self.edge_delay();
        Ok(())
    }

    /// Clocks out one byte, most significant bit first.
    ///
    /// Returns whether the peripheral acknowledged it. A `false` leaves the
    /// transaction open; the caller must end it with [`stop`](Self::stop).
    pub fn write_byte(&mut self, byte: u8) -> Result<bool, BusError> {
        let mut byte = byte;
        for _ in 0..8 {
            self.set_data(byte & 0x80 != 0)?;
            self.edge_delay();
            self.set_clock(true)?;
            self.edge_delay();
            self.set_clock(false)?;
            self.edge_delay();
            byte <<= 1;
        }

        self.set_data(true)?;
        self.edge_delay();
        self.set_clock(true)?;
        self.edge_delay();
        let ack = !self.read_data()?;
        self.set_clock(false)?;
        self.edge_delay();
        Ok(ack)
    }

    /// Clocks in one byte, most significant bit first, then acknowledges it when
    /// `ack` is set or leaves SDA released (NACK) otherwise.
    pub fn read_byte(&mut self, ack: bool) -> Result<u8, BusError> {
        let mut byte = 0u8;
        self.set_data(true)?;
        self.edge_delay();
        for _ in 0..8 {
            byte <<= 1;
            self.set_clock(true)?;
            self.edge_delay();
            if self.read_data()? {
                byte |= 1;
            }
            self.set_clock(false)?;
            self.edge_delay();
        }

        self.set_data(!ack)?;
        self.edge_delay();
        self.set_clock(true)?;
        self.edge_delay();
        self.set_clock(false)?;
        self.edge_delay();
        Ok(byte)
    }

    fn write_address(&mut self, address: SevenBitAddress, read: bool) -> Result<(), BusError> {
        if self.write_byte((address << 1) | u8::from(read))? {
            Ok(())
        } else {
            Err(BusError::NoAcknowledge(NoAcknowledgeSource::Address))
        }
    }

    /// Addresses every 7-bit address and collects the ones that acknowledge.
    pub fn scan(&mut self) -> Result<heapless::Vec<SevenBitAddress, 128>, BusError> {
        let mut found = heapless::Vec::new();
        for address in 1..=0x7Fu8 {
            self.start()?;
            let present = self.write_byte(address << 1)?;
            self.stop()?;
            if present {
                debug!("i2c: device at {=u8:#x}", address);
                // 127 addresses never exceed the 128 slots
                let _ = found.push(address);
            }
            self.delay.delay_us(SCAN_GAP_US);
        }
        Ok(found)
    }

    fn run_operations(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusError> {
        let mut previous_read: Option<bool> = None;
        for index in 0..operations.len() {
            if is_empty(&operations[index]) {
                continue;
            }
            let read = matches!(operations[index], Operation::Read(_));
            let next_is_read = matches!(
                operations[index + 1..].iter().find(|op| !is_empty(op)),
                Some(Operation::Read(_))
            );

            if previous_read != Some(read) {
                self.start()?;
                self.write_address(address, read)?;
            }
            previous_read = Some(read);

            match &mut operations[index] {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte)? {
                            return Err(BusError::NoAcknowledge(NoAcknowledgeSource::Data));
                        }
                    }
                }
                Operation::Read(buffer) => {
                    let last = buffer.len();
                    for (position, slot) in buffer.iter_mut().enumerate() {
                        let final_byte = !next_is_read && position + 1 == last;
                        *slot = self.read_byte(!final_byte)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// An operation that moves no bytes puts nothing on the wire.
fn is_empty(operation: &Operation<'_>) -> bool {
    match operation {
        Operation::Write(bytes) => bytes.is_empty(),
        Operation::Read(buffer) => buffer.is_empty(),
    }
}

impl<SCL, SDA, D> i2c::ErrorType for BitBangI2c<SCL, SDA, D> {
    type Error = BusError;
}

impl<SCL, SDA, D> i2c::I2c for BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin,
    SDA: OutputPin + InputPin,
    D: DelayNs,
{
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.iter().all(is_empty) {
            return Ok(());
        }
        let outcome = self.run_operations(address, operations);
        if let Err(error) = &outcome {
            trace!("i2c: transaction to {=u8:#x} aborted: {}", address, error);
        }
        let stopped = self.stop();
        outcome.and(stopped)
    }
}
