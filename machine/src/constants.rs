//! Fixed geometry of the board: type aliases and the memory map windows.
//!
//! All windows are hard-wired by the address decoder; nothing here is
//! negotiated at runtime.

/// A physical address on the 32-bit memory bus.
pub type Paddr = u32;

/// Size of main memory. The board is modelled with a fixed 8 MiB of RAM.
pub const RAM_SIZE: usize = 8 << 20;

/// Address window covered by the parity shadow bitmap.
///
/// The diagnostic hardware covers the first 8 MiB regardless of how much RAM
/// is actually fitted, which on this board is all of it.
pub const PARITY_WINDOW: Paddr = 8 << 20;

/// Size of the battery-backed RAM.
pub const NVRAM_SIZE: usize = 0x800;

/// Largest boot ROM image the decoder can address.
pub const BOOT_ROM_SIZE: usize = 0x4_0000;

/// Size of the identification PROM.
pub const ID_PROM_SIZE: usize = 0x20;

/// Main memory, at the base of the address space.
pub const RAM_BASE: Paddr = 0x0000_0000;

/// Audio synthesizer data port (write-only, lane 0).
pub const AUDIO_DATA: Paddr = 0x1f60_0000;

/// Audio synthesizer control port (write-only, lane 0).
pub const AUDIO_CONTROL: Paddr = 0x1f60_0010;

/// System id PROM / coprocessor-present probe (reads zero).
pub const SYSTEM_ID: Paddr = 0x1f80_0000;

/// CPU configuration register (16-bit, low lanes).
pub const CPUCFG: Paddr = 0x1f88_0000;

/// DMA low pointer register (16-bit, write-only).
pub const DMA_LOW: Paddr = 0x1f90_0000;

/// DMA high pointer register (16-bit, write-only).
pub const DMA_HIGH: Paddr = 0x1f92_0000;

/// DMA flush strobe (writes ignored).
pub const DMA_FLUSH: Paddr = 0x1f94_0000;

/// Local I/O interrupt status register (read-only, lane 3).
pub const LIO_STATUS: Paddr = 0x1f98_0000;

/// Configuration switches (reads ignored).
pub const SWITCHES: Paddr = 0x1f9a_0000;

/// Timer interrupt acknowledge: a read deasserts CPU IRQ4.
pub const TIMER_ACK_IRQ4: Paddr = 0x1fa0_0000;

/// Timer interrupt acknowledge: a read deasserts CPU IRQ2.
pub const TIMER_ACK_IRQ2: Paddr = 0x1fa2_0000;

/// Last physical address that raised a parity fault (read-only, full word).
pub const ERROR_ADDRESS: Paddr = 0x1fa4_0000;

/// Disk controller reset strobes: a read at +0 asserts the reset line, a
/// read at +4 releases it.
pub const SCSI_RESET: Paddr = 0x1fa8_0000;

/// Parity error acknowledge window (byte-indexed).
pub const PARITY_ACK: Paddr = 0x1faa_0000;

/// Parity error status register, inverted (read-only, lane 1).
pub const PARITY_STATUS: Paddr = 0x1faa_0004;

/// Identification PROM (read-only).
pub const ID_PROM: Paddr = 0x1fae_0000;

/// Disk controller indirect address port (lane 1).
pub const SCSI_ADDRESS: Paddr = 0x1fb0_0000;

/// Disk controller indirect register port (lane 1).
pub const SCSI_REGISTER: Paddr = 0x1fb0_0100;

/// Programmable interval timer registers (lane 0).
pub const TIMER: Paddr = 0x1fb4_0000;

/// Dual-UART register windows, one register per word slot (lane 0).
pub const DUART: Paddr = 0x1fb8_0000;

/// Battery-backed RAM window, one byte per word slot (lane 0).
pub const NVRAM: Paddr = 0x1fbc_0000;

/// Last word slot of the NVRAM window, where the real-time clock protocol
/// rides on top of ordinary accesses.
pub const RTC_TAP: Paddr = 0x1fbc_1ffc;

/// Boot ROM (read-only).
pub const BOOT_ROM: Paddr = 0x1fc0_0000;
