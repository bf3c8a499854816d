//! SX1276 link controller
//!
//! [`Radio`] drives the chip's operating-mode state machine on top of the register
//! [`Device`]: identity check and configuration at init, blocking transmit with a
//! bounded wait for TxDone, and non-blocking reception out of continuous receive.
//!
//! # Important Notes
//! - The operating mode is never cached; [`Radio::mode`] always reads the chip
//! - The TX and RX FIFO base addresses are both 0, so a transmit overwrites any
//!   packet still waiting in the FIFO. Transmit always leaves continuous receive
//!   for Standby first; call [`Radio::start_continuous_receive`] again afterwards
//! - No interrupts are used. DIO0 is mapped for the benefit of boards that wire
//!   it, but completion is detected by polling [`IrqFlags`]

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::SpiDevice;
use regiface::errors::Error as RegifaceError;

use crate::device::Device;
use crate::pipeline::Transceiver;
use crate::registers::{
    CarrierFrequency, Dio0Mapping, DioMapping1, FifoAddrPtr, FifoRxBaseAddr,
    FifoRxCurrentAddr, FifoTxBaseAddr, Irq, IrqFlags, IrqFlagsMask, Lna, Mode, ModemConfig1,
    ModemConfig2, ModemConfig3, Ocp, OpMode, PaConfig, PaDac, PayloadLength, PktRssiValue,
    PreambleLength, RxNbBytes, SyncWord, Version,
};

/// Largest payload the FIFO can hold in one packet
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Time the reset line is held low
pub const RESET_LOW_MS: u32 = 5;

/// Time the chip needs after reset is released
pub const RESET_SETTLE_MS: u32 = 10;

/// Settle time after the final switch to Standby at init
pub const INIT_SETTLE_MS: u32 = 10;

/// Interval between TxDone polls
pub const TX_POLL_MS: u32 = 1;

/// Frequencies from here up use the high frequency RF port
const HF_PORT_MIN_HZ: u32 = 525_000_000;
const RSSI_OFFSET_HF: i16 = 157;
const RSSI_OFFSET_LF: i16 = 164;

/// Errors reported by the link controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// The SPI transfer failed
    Spi,
    /// A register value could not be decoded
    Register,
    /// Driving the reset line failed
    Reset,
    /// The version register did not hold [`Version::SX1276`]
    IdentityMismatch {
        /// Value actually read
        found: u8,
    },
    /// Payloads must be 1..=255 bytes
    InvalidPayloadSize(usize),
    /// TxDone was not raised within the configured timeout
    TransmitTimeout,
    /// The received packet does not fit the caller's buffer
    BufferTooSmall {
        /// Length of the packet waiting in the FIFO
        needed: usize,
    },
}

impl From<RegifaceError> for RadioError {
    fn from(error: RegifaceError) -> Self {
        match error {
            RegifaceError::BusError => Self::Spi,
            _ => Self::Register,
        }
    }
}

/// Stand-in for boards without a reset line
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl PinErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Link configuration applied by [`Radio::init`]
///
/// The default is a long-range, low-rate 915 MHz link for an RFM95 module:
/// PA_BOOST at +20 dBm, 125 kHz bandwidth, SF12, coding rate 4/8, explicit
/// header with payload CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    /// Carrier frequency in Hz
    pub frequency_hz: u32,
    /// Crystal oscillator frequency in Hz
    pub crystal_hz: u32,
    /// Output pin and power level
    pub pa_config: PaConfig,
    /// High-power (+20 dBm) PA_BOOST mode
    pub pa_dac: PaDac,
    /// Bandwidth, coding rate and header mode
    pub modem_config1: ModemConfig1,
    /// Spreading factor and payload CRC
    pub modem_config2: ModemConfig2,
    /// Low data rate optimization and AGC
    pub modem_config3: ModemConfig3,
    /// Preamble length in symbols
    pub preamble: PreambleLength,
    /// Network sync word
    pub sync_word: SyncWord,
    /// Over-current protection trim
    pub ocp: Ocp,
    /// Receiver gain and boost
    pub lna: Lna,
    /// Longest wait for TxDone, in milliseconds
    pub tx_timeout_ms: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 915_000_000,
            crystal_hz: 32_000_000,
            pa_config: PaConfig::default(),
            pa_dac: PaDac::default(),
            modem_config1: ModemConfig1::default(),
            modem_config2: ModemConfig2::default(),
            modem_config3: ModemConfig3::default(),
            preamble: PreambleLength::default(),
            sync_word: SyncWord::default(),
            ocp: Ocp::default(),
            lna: Lna::default(),
            tx_timeout_ms: 5_000,
        }
    }
}

impl RadioConfig {
    /// Whether the carrier is on the high frequency RF port
    pub fn is_high_frequency(&self) -> bool {
        self.frequency_hz >= HF_PORT_MIN_HZ
    }
}

/// SX1276 link controller
///
/// Owns the register device, a delay provider and optionally the chip's reset
/// line.
pub struct Radio<SPI, D, RST = NoPin> {
    device: Device<SPI>,
    delay: D,
    reset: Option<RST>,
    config: RadioConfig,
}

impl<SPI, D> Radio<SPI, D, NoPin> {
    /// Creates a controller for a chip whose reset line is not wired.
    pub fn new(spi: SPI, delay: D) -> Self {
        Self {
            device: Device::new(spi),
            delay,
            reset: None,
            config: RadioConfig::default(),
        }
    }
}

impl<SPI, D, RST> Radio<SPI, D, RST> {
    /// Creates a controller that pulses `reset` during [`Radio::init`].
    pub fn with_reset(spi: SPI, reset: RST, delay: D) -> Self {
        Self {
            device: Device::new(spi),
            delay,
            reset: Some(reset),
            config: RadioConfig::default(),
        }
    }

    /// Configuration in effect (the default until `init` succeeds)
    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Releases the SPI device, the delay provider and the reset pin.
    pub fn release(self) -> (SPI, D, Option<RST>) {
        (self.device.release(), self.delay, self.reset)
    }
}

impl<SPI, D, RST> Radio<SPI, D, RST>
where
    SPI: SpiDevice,
    D: DelayNs,
    RST: OutputPin,
{
    /// Resets, identifies and configures the chip, leaving it in Standby.
    ///
    /// # Errors
    /// * `RadioError::IdentityMismatch` - no SX1276 answered; nothing was configured
    /// * `RadioError::Reset` - the reset line could not be driven
    /// * `RadioError::Spi` - SPI communication failed
    pub fn init(&mut self, config: RadioConfig) -> Result<(), RadioError> {
        self.set_mode(Mode::Sleep)?;

        if let Some(reset) = self.reset.as_mut() {
            reset.set_low().map_err(|_| RadioError::Reset)?;
            self.delay.delay_ms(RESET_LOW_MS);
            reset.set_high().map_err(|_| RadioError::Reset)?;
            self.delay.delay_ms(RESET_SETTLE_MS);
        }

        let found = self.version()?;
        if found != Version::SX1276 {
            error!("radio: unexpected version {=u8:#x}", found);
            return Err(RadioError::IdentityMismatch { found });
        }

        // reset leaves the chip in FSK standby; LoRa can only be selected in Sleep
        self.set_mode(Mode::Sleep)?;

        self.device
            .write_register(CarrierFrequency::from_hz(config.frequency_hz, config.crystal_hz))?;
        self.device.write_register(config.pa_config)?;
        self.device.write_register(config.pa_dac)?;
        self.device.write_register(config.modem_config1)?;
        self.device.write_register(config.modem_config2)?;
        self.device.write_register(config.modem_config3)?;
        self.device.write_register(config.preamble)?;
        self.device.write_register(config.sync_word)?;
        self.device.write_register(config.ocp)?;
        self.device.write_register(FifoTxBaseAddr { address: 0 })?;
        self.device.write_register(FifoRxBaseAddr { address: 0 })?;
        self.device.write_register(config.lna)?;
        self.device.write_register(IrqFlagsMask::default())?;
        self.device.write_register(IrqFlags { irqs: Irq::all() })?;

        self.set_mode(Mode::Standby)?;
        self.delay.delay_ms(INIT_SETTLE_MS);

        self.config = config;
        info!("radio: ready at {=u32} Hz", config.frequency_hz);
        Ok(())
    }

    /// Reads the silicon version register.
    pub fn version(&mut self) -> Result<u8, RadioError> {
        let version: Version = self.device.read_register()?;
        Ok(version.value)
    }

    /// Reads the current operating mode from the chip.
    pub fn mode(&mut self) -> Result<Mode, RadioError> {
        let op_mode: OpMode = self.device.read_register()?;
        Ok(op_mode.mode)
    }

    /// Switches the operating mode, keeping the LoRa modem selected.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), RadioError> {
        trace!("radio: mode {}", mode);
        self.device.write_register(OpMode::lora(mode))?;
        Ok(())
    }

    /// Sends one packet and waits for TxDone.
    ///
    /// The chip is back in Standby when this returns, on success and on timeout.
    ///
    /// # Errors
    /// * `RadioError::InvalidPayloadSize` - empty or longer than 255 bytes; nothing
    ///   was sent to the chip
    /// * `RadioError::TransmitTimeout` - TxDone did not arrive in time
    /// * `RadioError::Spi` - SPI communication failed
    pub fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.is_empty() || payload.len() > MAX_PAYLOAD_LEN {
            return Err(RadioError::InvalidPayloadSize(payload.len()));
        }

        self.set_mode(Mode::Standby)?;
        self.device.write_register(FifoAddrPtr { address: 0 })?;
        self.device.write_fifo(payload)?;
        self.device.write_register(PayloadLength {
            length: payload.len() as u8,
        })?;
        self.device.write_register(IrqFlags { irqs: Irq::all() })?;
        self.device.write_register(DioMapping1 {
            dio0: Dio0Mapping::TxDone,
        })?;
        self.set_mode(Mode::Transmit)?;

        let mut waited_ms = 0;
        loop {
            let flags: IrqFlags = self.device.read_register()?;
            if flags.irqs.contains(Irq::TX_DONE) {
                self.device.write_register(IrqFlags { irqs: Irq::TX_DONE })?;
                self.set_mode(Mode::Standby)?;
                debug!("radio: sent {=usize} bytes", payload.len());
                return Ok(());
            }
            if waited_ms >= self.config.tx_timeout_ms {
                break;
            }
            self.delay.delay_ms(TX_POLL_MS);
            waited_ms += TX_POLL_MS;
        }

        self.set_mode(Mode::Standby)?;
        warn!("radio: no TxDone after {=u32} ms", waited_ms);
        Err(RadioError::TransmitTimeout)
    }

    /// Routes RxDone to DIO0 and enters continuous receive.
    pub fn start_continuous_receive(&mut self) -> Result<(), RadioError> {
        self.device.write_register(DioMapping1 {
            dio0: Dio0Mapping::RxDone,
        })?;
        self.set_mode(Mode::ContinuousReceive)
    }

    /// Copies a waiting packet into `buffer`, returning its length.
    ///
    /// Returns 0 when no packet is waiting or when the waiting packet failed its
    /// payload CRC (the packet is then dropped).
    ///
    /// # Errors
    /// * `RadioError::BufferTooSmall` - the packet is longer than `buffer`; it stays
    ///   in the FIFO but its flags are already cleared
    /// * `RadioError::Spi` - SPI communication failed
    pub fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, RadioError> {
        let flags: IrqFlags = self.device.read_register()?;
        if !flags.irqs.contains(Irq::RX_DONE) {
            return Ok(0);
        }

        self.device.write_register(flags)?;

        if flags.irqs.contains(Irq::PAYLOAD_CRC_ERROR) {
            warn!("radio: dropped packet with bad CRC");
            return Ok(0);
        }

        let len = usize::from(self.device.read_register::<RxNbBytes>()?.count);
        let Some(payload) = buffer.get_mut(..len) else {
            return Err(RadioError::BufferTooSmall { needed: len });
        };

        let current: FifoRxCurrentAddr = self.device.read_register()?;
        self.device.write_register(FifoAddrPtr {
            address: current.address,
        })?;
        self.device.read_fifo(payload)?;

        Ok(len)
    }

    /// RSSI of the last received packet in dBm.
    pub fn packet_rssi(&mut self) -> Result<i16, RadioError> {
        let raw: PktRssiValue = self.device.read_register()?;
        let offset = if self.config.is_high_frequency() {
            RSSI_OFFSET_HF
        } else {
            RSSI_OFFSET_LF
        };
        Ok(i16::from(raw.value) - offset)
    }
}

impl<SPI, D, RST> Transceiver for Radio<SPI, D, RST>
where
    SPI: SpiDevice,
    D: DelayNs,
    RST: OutputPin,
{
    type Error = RadioError;

    fn start_receive(&mut self) -> Result<(), Self::Error> {
        self.start_continuous_receive()
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), Self::Error> {
        Radio::transmit(self, payload)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        Radio::receive(self, buffer)
    }

    fn packet_rssi(&mut self) -> Result<i16, Self::Error> {
        Radio::packet_rssi(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{FakeSx1276, RecordingPin, VirtualClock};

    extern crate std;
    use std::vec;

    const FRAME: [u8; 4] = [0xC4, 0x09, 0x70, 0x17];

    fn ready_radio() -> (FakeSx1276, VirtualClock, Radio<FakeSx1276, VirtualClock>) {
        let fake = FakeSx1276::new();
        let clock = VirtualClock::new();
        let mut radio = Radio::new(fake.clone(), clock.clone());
        radio.init(RadioConfig::default()).unwrap();
        fake.clear_log();
        (fake, clock, radio)
    }

    #[test]
    fn init_writes_the_default_link_configuration() {
        let fake = FakeSx1276::new();
        let clock = VirtualClock::new();
        let mut radio = Radio::new(fake.clone(), clock.clone());

        radio.init(RadioConfig::default()).unwrap();

        let state = fake.state();
        let expected = [
            (0x06, 0xE4),
            (0x07, 0xC0),
            (0x08, 0x00),
            (0x09, 0xFF),
            (0x0B, 0x37),
            (0x0C, 0x23),
            (0x0E, 0x00),
            (0x0F, 0x00),
            (0x11, 0x00),
            (0x1D, 0x78),
            (0x1E, 0xC4),
            (0x20, 0x00),
            (0x21, 0x0C),
            (0x26, 0x0C),
            (0x39, 0x12),
            (0x4D, 0x87),
        ];
        for (address, value) in expected {
            assert_eq!(state.register(address), value, "register {address:#04x}");
        }
        assert_eq!(state.writes_to(0x12), vec![vec![0xFF]]);
        assert_eq!(state.writes_to(0x01), vec![vec![0x80], vec![0x80], vec![0x81]]);
        assert_eq!(state.register(0x01), 0x81);
        assert_eq!(clock.elapsed_ms(), u64::from(INIT_SETTLE_MS));
    }

    #[test]
    fn frequency_is_rounded_to_the_nearest_step() {
        let fake = FakeSx1276::new();
        let mut radio = Radio::new(fake.clone(), VirtualClock::new());
        let config = RadioConfig {
            frequency_hz: 868_100_000,
            ..RadioConfig::default()
        };

        radio.init(config).unwrap();

        // 868.1 MHz * 2^19 / 32 MHz = 14_222_950.4
        assert_eq!(fake.state().writes_to(0x06), vec![vec![0xD9, 0x06, 0x66]]);
    }

    #[test]
    fn reset_line_is_pulsed_before_identification() {
        let fake = FakeSx1276::new();
        let clock = VirtualClock::new();
        let pin = RecordingPin::default();
        let mut radio = Radio::with_reset(fake, pin.clone(), clock.clone());

        radio.init(RadioConfig::default()).unwrap();

        assert_eq!(*pin.levels.borrow(), vec![false, true]);
        assert_eq!(
            clock.elapsed_ms(),
            u64::from(RESET_LOW_MS + RESET_SETTLE_MS + INIT_SETTLE_MS)
        );
    }

    #[test]
    fn wrong_chip_is_rejected_before_any_configuration() {
        let fake = FakeSx1276::with_version(0x22);
        let mut radio = Radio::new(fake.clone(), VirtualClock::new());

        assert_eq!(
            radio.init(RadioConfig::default()),
            Err(RadioError::IdentityMismatch { found: 0x22 })
        );

        let state = fake.state();
        assert!(state.writes.iter().all(|(address, _)| *address == 0x01));
        assert_eq!(state.mode_bits(), 0x00);
    }

    #[test]
    fn payload_size_is_checked_before_touching_the_bus() {
        let (fake, _, mut radio) = ready_radio();

        assert_eq!(
            radio.transmit(&[]),
            Err(RadioError::InvalidPayloadSize(0))
        );
        assert_eq!(
            radio.transmit(&[0u8; 256]),
            Err(RadioError::InvalidPayloadSize(256))
        );
        assert_eq!(fake.state().frames, 0);
    }

    #[test]
    fn transmit_loads_the_fifo_and_returns_to_standby() {
        let (fake, clock, mut radio) = ready_radio();

        radio.transmit(&FRAME).unwrap();

        let state = fake.state();
        assert_eq!(&state.fifo[..4], &FRAME);
        assert_eq!(state.writes_to(0x00), vec![FRAME.to_vec()]);
        assert_eq!(state.register(0x22), 4);
        assert_eq!(state.writes_to(0x40), vec![vec![0x40]]);
        assert_eq!(
            state.writes_to(0x01),
            vec![vec![0x81], vec![0x83], vec![0x81]]
        );
        assert_eq!(state.register(0x12) & 0x08, 0);
        assert_eq!(clock.elapsed_ms(), u64::from(INIT_SETTLE_MS));
    }

    #[test]
    fn largest_payload_is_accepted() {
        let (fake, _, mut radio) = ready_radio();

        radio.transmit(&[0xA5; MAX_PAYLOAD_LEN]).unwrap();

        assert_eq!(fake.state().register(0x22), 255);
    }

    #[test]
    fn missing_tx_done_times_out_in_standby() {
        let fake = FakeSx1276::new().never_completes_tx();
        let clock = VirtualClock::new();
        let mut radio = Radio::new(fake.clone(), clock.clone());
        radio.init(RadioConfig::default()).unwrap();
        let started = clock.elapsed_ms();

        assert_eq!(radio.transmit(&FRAME), Err(RadioError::TransmitTimeout));

        assert_eq!(clock.elapsed_ms() - started, 5_000);
        assert_eq!(radio.mode(), Ok(Mode::Standby));
    }

    #[test]
    fn receive_without_a_packet_returns_zero() {
        let (_, _, mut radio) = ready_radio();
        radio.start_continuous_receive().unwrap();

        let mut buffer = [0u8; 64];
        assert_eq!(radio.receive(&mut buffer), Ok(0));
        assert_eq!(radio.mode(), Ok(Mode::ContinuousReceive));
    }

    #[test]
    fn received_packet_is_copied_out_and_flags_cleared() {
        let (fake, _, mut radio) = ready_radio();
        radio.start_continuous_receive().unwrap();
        assert_eq!(fake.state().register(0x40), 0x00);

        fake.deliver(&FRAME, 100, false);
        let mut buffer = [0u8; 64];

        assert_eq!(radio.receive(&mut buffer), Ok(4));
        assert_eq!(&buffer[..4], &FRAME);
        assert_eq!(fake.state().register(0x12), 0);
        assert_eq!(radio.packet_rssi(), Ok(-57));
        assert_eq!(radio.receive(&mut buffer), Ok(0));
    }

    #[test]
    fn crc_failure_drops_the_packet() {
        let (fake, _, mut radio) = ready_radio();
        radio.start_continuous_receive().unwrap();
        fake.deliver(&FRAME, 100, true);

        let mut buffer = [0u8; 64];
        assert_eq!(radio.receive(&mut buffer), Ok(0));
        assert_eq!(fake.state().register(0x12), 0);
        assert_eq!(buffer, [0u8; 64]);
    }

    #[test]
    fn oversized_packet_reports_its_length() {
        let (fake, _, mut radio) = ready_radio();
        radio.start_continuous_receive().unwrap();
        fake.deliver(&[1, 2, 3, 4, 5, 6, 7, 8], 90, false);

        let mut buffer = [0u8; 4];
        assert_eq!(
            radio.receive(&mut buffer),
            Err(RadioError::BufferTooSmall { needed: 8 })
        );
    }

    #[test]
    fn rssi_offset_follows_the_rf_port() {
        let fake = FakeSx1276::new();
        let mut radio = Radio::new(fake.clone(), VirtualClock::new());
        radio
            .init(RadioConfig {
                frequency_hz: 433_000_000,
                ..RadioConfig::default()
            })
            .unwrap();

        fake.deliver(&FRAME, 100, false);
        assert_eq!(radio.packet_rssi(), Ok(-64));
    }

    #[test]
    fn version_and_mode_are_read_from_the_chip() {
        let fake = FakeSx1276::new();
        let mut radio = Radio::new(fake, VirtualClock::new());

        assert_eq!(radio.version(), Ok(0x12));
        assert_eq!(radio.mode(), Ok(Mode::Standby));
        radio.set_mode(Mode::Sleep).unwrap();
        assert_eq!(radio.mode(), Ok(Mode::Sleep));
    }

    #[test]
    fn bus_errors_map_to_radio_errors() {
        assert_eq!(RadioError::from(RegifaceError::BusError), RadioError::Spi);
        assert_eq!(
            RadioError::from(RegifaceError::DeserializationError),
            RadioError::Register
        );
    }
}
