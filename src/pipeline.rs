//! Sensor-to-radio pipeline
//!
//! The two ends of the link, written against three small seams so they can run on
//! any sensor, radio and display:
//!
//! - [`SampleSource`]: produces one [`Sample`] per call ([`Aht10`](crate::Aht10))
//! - [`Transceiver`]: moves raw frames ([`Radio`](crate::Radio))
//! - [`TextDisplay`]: draws text on a small monochrome screen
//!
//! [`SampleTransmitter`] reads, frames and sends. [`SampleReceiver`] polls the radio,
//! decodes sample frames and shows them. Neither queues or retries: a failed
//! cycle is reported and the next one starts from scratch.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::sample::{Centi, Sample};

/// Produces sensor samples
pub trait SampleSource {
    /// Error raised by the sensor
    type Error;

    /// Takes one measurement.
    fn read_sample(&mut self) -> Result<Sample, Self::Error>;
}

/// Sends and receives raw frames
pub trait Transceiver {
    /// Error raised by the radio
    type Error;

    /// Enters continuous receive.
    fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Sends one frame, blocking until it is out.
    fn transmit(&mut self, payload: &[u8]) -> Result<(), Self::Error>;

    /// Copies a waiting frame into `buffer` and returns its length, or 0 if none.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error>;

    /// Signal strength of the last received frame in dBm.
    fn packet_rssi(&mut self) -> Result<i16, Self::Error>;
}

/// Text output on a small screen
///
/// Drawing goes to a frame buffer; nothing is visible until [`present`](Self::present).
pub trait TextDisplay {
    /// Error raised by the display
    type Error;

    /// Blanks the frame buffer.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Draws `text` with its top-left corner at (`x`, `y`), glyphs scaled by `scale`.
    fn draw_text(&mut self, x: u8, y: u8, scale: u8, text: &str) -> Result<(), Self::Error>;

    /// Pushes the frame buffer to the screen.
    fn present(&mut self) -> Result<(), Self::Error>;
}

/// Display width in pixels
pub const DISPLAY_WIDTH: usize = 128;

/// Display height in pixels
pub const DISPLAY_HEIGHT: usize = 64;

/// Advance of one glyph at scale 1, spacing included
pub const GLYPH_WIDTH: usize = 6;

/// Height of one glyph at scale 1
pub const GLYPH_HEIGHT: usize = 8;

/// Receive buffer size, large enough for any packet the radio accepts
pub const RX_BUFFER_LEN: usize = crate::radio::MAX_PAYLOAD_LEN;

/// Interval between receive polls
pub const RX_POLL_MS: u32 = 100;

/// Idle polls between two frames of the waiting animation
pub const WAITING_ANIMATION_POLLS: u32 = 3;

const SAMPLE_SCALE: u8 = 2;
const SAMPLE_LINE_GAP: usize = 20;
const WAITING_TEXT: &str = "Waiting for data";
const MAX_DOTS: u8 = 3;

/// Horizontal position that centres `text` at `scale`, or 0 if it does not fit.
pub fn centered_x(text: &str, scale: u8) -> u8 {
    let width = text.len() * GLYPH_WIDTH * usize::from(scale.max(1));
    (DISPLAY_WIDTH.saturating_sub(width) / 2) as u8
}

fn sample_top() -> u8 {
    ((DISPLAY_HEIGHT - 2 * GLYPH_HEIGHT * usize::from(SAMPLE_SCALE)) / 2) as u8
}

fn waiting_top() -> u8 {
    ((DISPLAY_HEIGHT - GLYPH_HEIGHT) / 2) as u8
}

/// Where a transmit cycle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleError<S, T> {
    /// The sensor could not be read; nothing was sent
    Sensor(S),
    /// The sample was read but not sent
    Radio(T),
}

/// Where a receive poll failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError<T, D> {
    /// The radio could not be polled or restarted
    Radio(T),
    /// The screen could not be updated
    Display(D),
}

/// Outcome of one receive poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reception {
    /// Nothing was waiting
    Idle,
    /// A sample frame arrived
    Sample {
        /// The decoded reading
        sample: Sample,
        /// Signal strength in dBm
        rssi: i16,
    },
    /// A frame of the wrong length arrived; see [`SampleReceiver::last_frame`]
    Unrecognized {
        /// Frame length in bytes
        len: usize,
    },
}

/// Transmitting end: sensor in, frames out
pub struct SampleTransmitter<S, T> {
    source: S,
    radio: T,
}

impl<S, T> SampleTransmitter<S, T>
where
    S: SampleSource,
    T: Transceiver,
{
    /// Pairs a sensor with a radio.
    pub fn new(source: S, radio: T) -> Self {
        Self { source, radio }
    }

    /// Gives back the sensor and the radio.
    pub fn release(self) -> (S, T) {
        (self.source, self.radio)
    }

    /// Reads one sample and sends it, returning what was sent.
    pub fn send_once(&mut self) -> Result<Sample, CycleError<S::Error, T::Error>> {
        let sample = self.source.read_sample().map_err(|e| {
            warn!("transmitter: sensor read failed, nothing sent");
            CycleError::Sensor(e)
        })?;

        self.radio.transmit(&sample.to_bytes()).map_err(|e| {
            warn!("transmitter: send failed for {}", sample);
            CycleError::Radio(e)
        })?;

        info!("transmitter: sent {}", sample);
        Ok(sample)
    }

    /// Sends a sample every `period_ms`, forever.
    pub fn run<D: DelayNs>(&mut self, delay: &mut D, period_ms: u32) -> ! {
        loop {
            // failures are logged by send_once; the next period tries again
            let _ = self.send_once();
            delay.delay_ms(period_ms);
        }
    }
}

/// Receiving end: frames in, text on screen
pub struct SampleReceiver<T, DISP> {
    radio: T,
    display: DISP,
    buffer: [u8; RX_BUFFER_LEN],
    last_len: usize,
    has_sample: bool,
    idle_polls: u32,
    dots: u8,
}

impl<T, DISP> SampleReceiver<T, DISP>
where
    T: Transceiver,
    DISP: TextDisplay,
{
    /// Pairs a radio with a display; call [`start`](Self::start) before polling.
    pub fn new(radio: T, display: DISP) -> Self {
        Self {
            radio,
            display,
            buffer: [0u8; RX_BUFFER_LEN],
            last_len: 0,
            has_sample: false,
            idle_polls: 0,
            dots: 1,
        }
    }

    /// Gives back the radio and the display.
    pub fn release(self) -> (T, DISP) {
        (self.radio, self.display)
    }

    /// Shows the waiting screen and enters continuous receive.
    pub fn start(&mut self) -> Result<(), ReceiveError<T::Error, DISP::Error>> {
        self.show_waiting(MAX_DOTS)?;
        self.radio.start_receive().map_err(ReceiveError::Radio)?;
        info!("receiver: listening");
        Ok(())
    }

    /// Bytes of the frame seen by the last poll (empty after an idle poll)
    pub fn last_frame(&self) -> &[u8] {
        &self.buffer[..self.last_len]
    }

    /// Checks the radio once.
    ///
    /// A sample frame is drawn on the display before its RSSI is read. Until the
    /// first sample arrives, every third idle poll advances the waiting animation.
    pub fn poll(&mut self) -> Result<Reception, ReceiveError<T::Error, DISP::Error>> {
        self.last_len = 0;
        let len = self
            .radio
            .receive(&mut self.buffer)
            .map_err(ReceiveError::Radio)?;
        self.last_len = len;

        if len == 0 {
            self.on_idle()?;
            return Ok(Reception::Idle);
        }

        let Ok(sample) = Sample::try_from(&self.buffer[..len]) else {
            info!(
                "receiver: {=usize} bytes (raw): {=[u8]:x}",
                len,
                &self.buffer[..len]
            );
            return Ok(Reception::Unrecognized { len });
        };

        self.show_sample(&sample)?;
        self.has_sample = true;

        let rssi = self.radio.packet_rssi().map_err(ReceiveError::Radio)?;
        info!("receiver: {} RSSI={=i16} dBm", sample, rssi);

        Ok(Reception::Sample { sample, rssi })
    }

    /// Polls every [`RX_POLL_MS`], forever.
    pub fn run<D: DelayNs>(&mut self, delay: &mut D) -> ! {
        loop {
            if self.poll().is_err() {
                warn!("receiver: poll failed");
            }
            delay.delay_ms(RX_POLL_MS);
        }
    }

    fn on_idle(&mut self) -> Result<(), ReceiveError<T::Error, DISP::Error>> {
        if self.has_sample {
            return Ok(());
        }

        self.idle_polls = self.idle_polls.wrapping_add(1);
        if self.idle_polls % WAITING_ANIMATION_POLLS == 0 {
            self.show_waiting(self.dots)?;
            self.dots = self.dots % MAX_DOTS + 1;
        }
        Ok(())
    }

    fn show_waiting(&mut self, dots: u8) -> Result<(), ReceiveError<T::Error, DISP::Error>> {
        let mut text: String<24> = String::new();
        // 16 + 3 characters always fit
        let _ = text.push_str(WAITING_TEXT);
        for _ in 0..dots {
            let _ = text.push('.');
        }

        self.display.clear().map_err(ReceiveError::Display)?;
        self.display
            .draw_text(centered_x(&text, 1), waiting_top(), 1, &text)
            .map_err(ReceiveError::Display)?;
        self.display.present().map_err(ReceiveError::Display)
    }

    fn show_sample(&mut self, sample: &Sample) -> Result<(), ReceiveError<T::Error, DISP::Error>> {
        // "T -327.68C" is the longest line
        let mut temperature: String<16> = String::new();
        let _ = write!(temperature, "T {}C", Centi(sample.temperature));
        let mut humidity: String<16> = String::new();
        let _ = write!(humidity, "U {}%", Centi(sample.humidity));

        let top = sample_top();
        self.display.clear().map_err(ReceiveError::Display)?;
        self.display
            .draw_text(
                centered_x(&temperature, SAMPLE_SCALE),
                top,
                SAMPLE_SCALE,
                &temperature,
            )
            .map_err(ReceiveError::Display)?;
        self.display
            .draw_text(
                centered_x(&humidity, SAMPLE_SCALE),
                top + SAMPLE_LINE_GAP as u8,
                SAMPLE_SCALE,
                &humidity,
            )
            .map_err(ReceiveError::Display)?;
        self.display.present().map_err(ReceiveError::Display)
    }
}
