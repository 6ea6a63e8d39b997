//! Interfaces of the devices wired to the backplane.
//!
//! The chips themselves (CPU execution, UART and disk controller state
//! machines, the audio synthesizer, the clock's internal bit protocol) are
//! not modelled here; the board only needs these seams. Each trait matches
//! the signal set the decoder and the machine registers actually drive.

use parse_display::Display;

use crate::constants::Paddr;

/// CPU interrupt inputs driven by the backplane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum IrqLine {
    /// Shared local I/O interrupt.
    Irq1,

    /// Timer channel 0 output.
    Irq2,

    /// Timer channel 1 output.
    Irq4,
}

/// The CPU, seen from the backplane: interrupt inputs and the bus error
/// signal raised for the access in flight.
pub trait CpuBackplane {
    fn set_input_line(&mut self, line: IrqLine, state: bool);

    /// Signal a synchronous bus error for an access at `address`.
    fn bus_error(&mut self, address: Paddr);
}

/// The disk controller: byte-wide DMA port, the two indirect register ports
/// and the reset line.
pub trait ScsiController {
    fn dma_r(&mut self) -> u8;
    fn dma_w(&mut self, data: u8);

    fn addr_r(&mut self) -> u8;
    fn addr_w(&mut self, data: u8);
    fn reg_r(&mut self) -> u8;
    fn reg_w(&mut self, data: u8);

    /// Drive the reset line; `false` holds the controller in reset.
    fn reset_w(&mut self, state: bool);
}

/// One dual-channel async serial controller.
pub trait Duart {
    fn read(&mut self, reg: u8) -> u8;
    fn write(&mut self, reg: u8, data: u8);
}

/// The programmable interval timer.
pub trait IntervalTimer {
    fn read(&mut self, reg: u8) -> u8;
    fn write(&mut self, reg: u8, data: u8);
}

/// The audio synthesizer's two write-only ports.
pub trait AudioPort {
    fn data_w(&mut self, data: u8);
    fn control_w(&mut self, data: u8);
}

/// The phantom real-time clock.
///
/// The chip sits behind the NVRAM window and speaks a bit-serial protocol:
/// while its chip enable is inactive, memory writes feed it pattern bits
/// (`read_0`/`read_1`); once enabled, reads and writes move single data
/// bits.
pub trait RealTimeClock {
    fn chip_enable(&self) -> bool;
    fn read_data(&mut self) -> u8;
    fn write_data(&mut self, data: u8);
    fn read_0(&mut self);
    fn read_1(&mut self);
}

/// A CPU socket with nothing plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCpu;

impl CpuBackplane for NullCpu {
    fn set_input_line(&mut self, _line: IrqLine, _state: bool) {}
    fn bus_error(&mut self, _address: Paddr) {}
}

/// A disk controller that sources zeros and sinks everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScsi;

impl ScsiController for NullScsi {
    fn dma_r(&mut self) -> u8 {
        0
    }
    fn dma_w(&mut self, _data: u8) {}
    fn addr_r(&mut self) -> u8 {
        0
    }
    fn addr_w(&mut self, _data: u8) {}
    fn reg_r(&mut self) -> u8 {
        0
    }
    fn reg_w(&mut self, _data: u8) {}
    fn reset_w(&mut self, _state: bool) {}
}

/// A serial controller with no channels behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDuart;

impl Duart for NullDuart {
    fn read(&mut self, _reg: u8) -> u8 {
        0
    }
    fn write(&mut self, _reg: u8, _data: u8) {}
}

/// A timer that never counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTimer;

impl IntervalTimer for NullTimer {
    fn read(&mut self, _reg: u8) -> u8 {
        0
    }
    fn write(&mut self, _reg: u8, _data: u8) {}
}

/// An audio device that swallows both ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPort for NullAudio {
    fn data_w(&mut self, _data: u8) {}
    fn control_w(&mut self, _data: u8) {}
}

/// A clock that is never selected.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRtc;

impl RealTimeClock for NullRtc {
    fn chip_enable(&self) -> bool {
        false
    }
    fn read_data(&mut self) -> u8 {
        0
    }
    fn write_data(&mut self, _data: u8) {}
    fn read_0(&mut self) {}
    fn read_1(&mut self) {}
}
