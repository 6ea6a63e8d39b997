//! Model of the memory-mapped I/O backplane of a late-80s MIPS
//! single-board computer.
//!
//! The [`board::Board`] owns main memory, the machine registers and the
//! fixed address decoder; the chips wired to it are injected through the
//! traits in [`devices`]. All accesses are synchronous 32-bit transactions
//! qualified by big-endian byte lane selects.

pub mod board;
pub mod bus;
pub mod constants;
pub mod devices;

pub use board::{Board, BoardError, Devices};
pub use bus::Lanes;
pub use constants::Paddr;
