//! Register definitions for the SX1276/77/78/79 in LoRa mode
//! Addresses from the SX1276/77/78/79 datasheet, rev. 7, table 41

mod dio;
mod modem;
mod packet;
mod rf;
mod system;

pub use dio::*;
pub use modem::*;
pub use packet::*;
pub use rf::*;
pub use system::*;

/// FIFO data register address.
///
/// Not modelled as a typed register: reads and writes stream through the FIFO
/// starting at [`FifoAddrPtr`] instead of auto-incrementing the address.
pub const REG_FIFO: u8 = 0x00;
