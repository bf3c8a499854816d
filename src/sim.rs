//! Hardware simulators shared by the unit tests
//!
//! - [`VirtualClock`]: a `DelayNs` that only counts elapsed time
//! - [`OpenDrainBus`]: SCL/SDA pins wired to a simulated I2C peripheral
//! - [`FakeSx1276`]: an SX1276 register file and FIFO behind `SpiDevice`

extern crate std;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, Operation, SpiDevice};

/// Delay provider that advances a shared counter instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    elapsed_ns: Rc<Cell<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.get() / 1_000_000
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns.get() / 1_000
    }
}

impl DelayNs for VirtualClock {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + u64::from(ns));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeripheralState {
    Idle,
    Receiving,
    AckSlot { then_send: bool },
    Sending { byte: u8 },
    AwaitMasterAck,
}

/// A minimal I2C target reacting to SCL/SDA edges.
///
/// With an address it behaves like a register-less device: it acknowledges its
/// address, records written bytes and answers reads from `replies`. Without an
/// address it is a loopback: every byte it receives is acknowledged and then
/// clocked straight back out.
#[derive(Debug)]
pub struct Peripheral {
    address: Option<u8>,
    state: PeripheralState,
    shift: u8,
    bits: u8,
    expecting_address: bool,
    master_acked: bool,
    pulling_low: bool,
    pub replies: VecDeque<u8>,
    pub received: Vec<u8>,
    pub starts: usize,
    pub stops: usize,
    pub nack_data_after: Option<usize>,
}

impl Peripheral {
    fn new(address: Option<u8>) -> Self {
        Self {
            address,
            state: if address.is_some() {
                PeripheralState::Idle
            } else {
                PeripheralState::Receiving
            },
            shift: 0,
            bits: 0,
            expecting_address: false,
            master_acked: false,
            pulling_low: false,
            replies: VecDeque::new(),
            received: Vec::new(),
            starts: 0,
            stops: 0,
            nack_data_after: None,
        }
    }

    fn on_start(&mut self) {
        self.starts += 1;
        if self.address.is_some() {
            self.state = PeripheralState::Receiving;
            self.expecting_address = true;
            self.shift = 0;
            self.bits = 0;
            self.pulling_low = false;
        }
    }

    fn on_stop(&mut self) {
        self.stops += 1;
        if self.address.is_some() {
            self.state = PeripheralState::Idle;
            self.pulling_low = false;
        }
    }

    fn on_rise(&mut self, line: bool) {
        match self.state {
            PeripheralState::Receiving => {
                self.shift = (self.shift << 1) | u8::from(line);
                self.bits += 1;
            }
            PeripheralState::AwaitMasterAck => self.master_acked = !line,
            _ => {}
        }
    }

    fn on_fall(&mut self) {
        match self.state {
            PeripheralState::Receiving if self.bits == 8 => {
                let byte = self.shift;
                self.shift = 0;
                self.bits = 0;
                if self.expecting_address {
                    self.expecting_address = false;
                    if Some(byte >> 1) == self.address {
                        self.pulling_low = true;
                        self.state = PeripheralState::AckSlot {
                            then_send: byte & 1 == 1,
                        };
                    } else {
                        self.state = PeripheralState::Idle;
                    }
                    return;
                }
                self.received.push(byte);
                let ack = self
                    .nack_data_after
                    .map_or(true, |limit| self.received.len() <= limit);
                if self.address.is_none() {
                    self.replies.push_back(byte);
                }
                self.pulling_low = ack;
                self.state = PeripheralState::AckSlot {
                    then_send: self.address.is_none(),
                };
            }
            PeripheralState::AckSlot { then_send } => {
                self.pulling_low = false;
                if then_send {
                    self.load_next_byte();
                } else {
                    self.state = PeripheralState::Receiving;
                }
            }
            PeripheralState::Sending { byte } => {
                self.bits += 1;
                if self.bits == 8 {
                    self.pulling_low = false;
                    self.state = PeripheralState::AwaitMasterAck;
                } else {
                    self.pulling_low = byte & (0x80 >> self.bits) == 0;
                }
            }
            PeripheralState::AwaitMasterAck => {
                self.pulling_low = false;
                if self.master_acked {
                    self.load_next_byte();
                } else if self.address.is_none() {
                    self.shift = 0;
                    self.bits = 0;
                    self.state = PeripheralState::Receiving;
                } else {
                    self.state = PeripheralState::Idle;
                }
            }
            _ => {}
        }
    }

    fn load_next_byte(&mut self) {
        let byte = self.replies.pop_front().unwrap_or(0xFF);
        self.bits = 0;
        self.pulling_low = byte & 0x80 == 0;
        self.state = PeripheralState::Sending { byte };
    }
}

#[derive(Debug)]
struct Wires {
    scl: bool,
    sda_released: bool,
    peripheral: Peripheral,
}

impl Wires {
    fn sda(&self) -> bool {
        self.sda_released && !self.peripheral.pulling_low
    }

    fn set_scl(&mut self, level: bool) {
        if level == self.scl {
            return;
        }
        self.scl = level;
        if level {
            let line = self.sda();
            self.peripheral.on_rise(line);
        } else {
            self.peripheral.on_fall();
        }
    }

    fn set_sda(&mut self, released: bool) {
        let before = self.sda();
        self.sda_released = released;
        let after = self.sda();
        if self.scl && before != after {
            if after {
                self.peripheral.on_stop();
            } else {
                self.peripheral.on_start();
            }
        }
    }
}

/// Two open-drain lines plus one simulated peripheral.
#[derive(Debug, Clone)]
pub struct OpenDrainBus {
    wires: Rc<RefCell<Wires>>,
}

impl OpenDrainBus {
    /// A bus with an addressed peripheral answering at `address`.
    pub fn with_device(address: u8) -> Self {
        Self::build(Peripheral::new(Some(address)))
    }

    /// A bus whose peripheral echoes every received byte back.
    pub fn loopback() -> Self {
        Self::build(Peripheral::new(None))
    }

    fn build(peripheral: Peripheral) -> Self {
        Self {
            wires: Rc::new(RefCell::new(Wires {
                scl: true,
                sda_released: true,
                peripheral,
            })),
        }
    }

    pub fn scl(&self) -> SimScl {
        SimScl {
            wires: self.wires.clone(),
        }
    }

    pub fn sda(&self) -> SimSda {
        SimSda {
            wires: self.wires.clone(),
        }
    }

    pub fn queue_reply(&self, bytes: &[u8]) {
        self.wires
            .borrow_mut()
            .peripheral
            .replies
            .extend(bytes.iter().copied());
    }

    pub fn nack_data_after(&self, count: usize) {
        self.wires.borrow_mut().peripheral.nack_data_after = Some(count);
    }

    pub fn received(&self) -> Vec<u8> {
        self.wires.borrow().peripheral.received.clone()
    }

    pub fn starts(&self) -> usize {
        self.wires.borrow().peripheral.starts
    }

    pub fn stops(&self) -> usize {
        self.wires.borrow().peripheral.stops
    }

    pub fn is_idle(&self) -> bool {
        let wires = self.wires.borrow();
        wires.scl && wires.sda()
    }
}

#[derive(Debug)]
pub struct SimScl {
    wires: Rc<RefCell<Wires>>,
}

impl PinErrorType for SimScl {
    type Error = Infallible;
}

impl OutputPin for SimScl {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.wires.borrow_mut().set_scl(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.wires.borrow_mut().set_scl(true);
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimSda {
    wires: Rc<RefCell<Wires>>,
}

impl PinErrorType for SimSda {
    type Error = Infallible;
}

impl OutputPin for SimSda {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.wires.borrow_mut().set_sda(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.wires.borrow_mut().set_sda(true);
        Ok(())
    }
}

impl InputPin for SimSda {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.wires.borrow().sda())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.wires.borrow().sda())
    }
}

const REG_FIFO: u8 = 0x00;
const REG_OP_MODE: u8 = 0x01;
const REG_FIFO_ADDR_PTR: u8 = 0x0D;
const REG_FIFO_RX_BASE_ADDR: u8 = 0x0F;
const REG_FIFO_RX_CURRENT_ADDR: u8 = 0x10;
const REG_IRQ_FLAGS: u8 = 0x12;
const REG_RX_NB_BYTES: u8 = 0x13;
const REG_PKT_RSSI_VALUE: u8 = 0x1A;
const REG_VERSION: u8 = 0x42;

/// Observable state of the simulated transceiver.
#[derive(Debug)]
pub struct RadioState {
    pub registers: [u8; 128],
    pub fifo: [u8; 256],
    /// Every write frame as `(address, data)`, FIFO bursts included
    pub writes: Vec<(u8, Vec<u8>)>,
    /// Number of chip-select frames seen
    pub frames: usize,
    /// Whether entering TX sets TxDone straight away
    pub completes_tx: bool,
}

impl RadioState {
    pub fn mode_bits(&self) -> u8 {
        self.registers[REG_OP_MODE as usize] & 0x07
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers[address as usize]
    }

    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, data)| data.clone())
            .collect()
    }

    fn write(&mut self, address: u8, data: &[u8]) {
        self.writes.push((address, data.to_vec()));
        let mut address = address;
        for &value in data {
            match address {
                REG_FIFO => {
                    let ptr = self.registers[REG_FIFO_ADDR_PTR as usize];
                    self.fifo[ptr as usize] = value;
                    self.registers[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
                }
                REG_IRQ_FLAGS => self.registers[REG_IRQ_FLAGS as usize] &= !value,
                REG_VERSION => {}
                REG_OP_MODE => {
                    self.registers[REG_OP_MODE as usize] = value;
                    if value & 0x07 == 0x03 && self.completes_tx {
                        self.registers[REG_IRQ_FLAGS as usize] |= 0x08;
                    }
                }
                other => self.registers[other as usize] = value,
            }
            if address != REG_FIFO {
                address = (address + 1) & 0x7F;
            }
        }
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) {
        let mut address = address;
        for slot in buffer.iter_mut() {
            if address == REG_FIFO {
                let ptr = self.registers[REG_FIFO_ADDR_PTR as usize];
                *slot = self.fifo[ptr as usize];
                self.registers[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
            } else {
                *slot = self.registers[address as usize];
                address = (address + 1) & 0x7F;
            }
        }
    }
}

/// Register-accurate enough SX1276 model answering on an `SpiDevice`.
#[derive(Debug, Clone)]
pub struct FakeSx1276 {
    state: Rc<RefCell<RadioState>>,
}

impl FakeSx1276 {
    pub fn new() -> Self {
        let mut registers = [0u8; 128];
        registers[REG_OP_MODE as usize] = 0x09;
        registers[REG_VERSION as usize] = 0x12;
        Self {
            state: Rc::new(RefCell::new(RadioState {
                registers,
                fifo: [0u8; 256],
                writes: Vec::new(),
                frames: 0,
                completes_tx: true,
            })),
        }
    }

    pub fn with_version(version: u8) -> Self {
        let fake = Self::new();
        fake.state.borrow_mut().registers[REG_VERSION as usize] = version;
        fake
    }

    pub fn never_completes_tx(self) -> Self {
        self.state.borrow_mut().completes_tx = false;
        self
    }

    pub fn state(&self) -> std::cell::Ref<'_, RadioState> {
        self.state.borrow()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.writes.clear();
        state.frames = 0;
    }

    /// Places a packet in the FIFO the way the modem does on RxDone.
    pub fn deliver(&self, payload: &[u8], raw_rssi: u8, crc_error: bool) {
        let mut state = self.state.borrow_mut();
        let base = state.registers[REG_FIFO_RX_BASE_ADDR as usize];
        for (i, &byte) in payload.iter().enumerate() {
            state.fifo[base.wrapping_add(i as u8) as usize] = byte;
        }
        state.registers[REG_FIFO_RX_CURRENT_ADDR as usize] = base;
        state.registers[REG_RX_NB_BYTES as usize] = payload.len() as u8;
        state.registers[REG_PKT_RSSI_VALUE as usize] = raw_rssi;
        let mut flags = 0x40 | 0x10;
        if crc_error {
            flags |= 0x20;
        }
        state.registers[REG_IRQ_FLAGS as usize] |= flags;
    }

    fn run(&mut self, operations: &mut [Operation<'_, u8>]) {
        let mut state = self.state.borrow_mut();
        state.frames += 1;

        let mut header: Option<u8> = None;
        let mut written: Vec<u8> = Vec::new();
        let mut cursor: u8 = 0;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    let data: &[u8] = bytes;
                    match (header, data.split_first()) {
                        (None, Some((&first, rest))) => {
                            header = Some(first);
                            cursor = first & 0x7F;
                            written.extend_from_slice(rest);
                        }
                        _ => written.extend_from_slice(data),
                    }
                }
                Operation::Read(buffer) => {
                    let address = cursor;
                    let len = buffer.len();
                    state.read(address, buffer);
                    if address != REG_FIFO {
                        cursor = (cursor + len as u8) & 0x7F;
                    }
                }
                Operation::DelayNs(_) => {}
                Operation::Transfer(..) | Operation::TransferInPlace(..) => {
                    panic!("driver uses write/read operations only")
                }
            }
        }

        if let Some(header) = header {
            if header & 0x80 != 0 {
                state.write(header & 0x7F, &written);
            }
        }
    }
}

impl SpiErrorType for FakeSx1276 {
    type Error = Infallible;
}

impl SpiDevice for FakeSx1276 {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.run(operations);
        Ok(())
    }
}

impl embedded_hal_async::spi::SpiDevice for FakeSx1276 {
    async fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Self::Error> {
        self.run(operations);
        Ok(())
    }
}

/// Output pin that records every level it was driven to.
#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl PinErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}
