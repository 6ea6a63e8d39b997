//! The board model: address routing, machine registers, interrupt
//! aggregation and the disk DMA pump.
//!
//! Every bus access is a synchronous call that completes before returning;
//! there is no queuing and no preemption. Devices are injected once at
//! construction and the decoder table is fixed for the life of the board.

use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, trace};

use crate::bus::{self, Lanes, MapError, MemoryMap, Slot};
use crate::constants::{self as C, Paddr};
use crate::devices::{
    AudioPort, CpuBackplane, Duart, IntervalTimer, IrqLine, NullAudio, NullCpu, NullDuart,
    NullRtc, NullScsi, NullTimer, RealTimeClock, ScsiController,
};

mod dma;
mod lio;
mod parity;

pub use self::dma::DmaPointers;
pub use self::lio::{LioAggregator, LioSource};
pub use self::parity::{ParityLayer, ParityStatus};

bitflags! {
    /// CPU configuration register.
    ///
    /// Reads return the last written value verbatim; the individual bits
    /// drive the LEDs, schedule a soft reset and arm the parity layer. The
    /// VME-related bits are stored but have no effect on this board model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CpuConfig: u16 {
        /// Front panel LEDs (level driven).
        const LEDS = 0x001f;

        /// Enable serial ports 0 and 1.
        const SERIAL_01 = 0x0040;

        /// Enable serial ports 2 and 3.
        const SERIAL_23 = 0x0080;

        /// Enable mailbox interrupts.
        const MAILBOX = 0x0100;

        /// Schedule a system soft reset.
        const RESET = 0x0200;

        /// Enable parity checking on RAM reads.
        const CHECK_PARITY = 0x0400;

        /// Enable slave accesses.
        const SLAVE = 0x0800;

        /// Enable the bus arbiter.
        const ARBITER = 0x1000;

        /// Write bad parity: arm fault injection on RAM writes.
        const BAD_PARITY = 0x2000;

        /// Enable the watchdog timeout.
        const WATCHDOG = 0x4000;

        /// Unused.
        const AUX2 = 0x8000;
    }
}

/// Errors raised while assembling a board.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("boot rom image of {0} bytes exceeds the {max} byte window", max = C::BOOT_ROM_SIZE)]
    BootRomTooLarge(usize),

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Collaborator devices wired to the backplane, injected at construction.
pub struct Devices {
    pub cpu: Box<dyn CpuBackplane>,
    pub scsi: Box<dyn ScsiController>,
    pub duarts: [Box<dyn Duart>; 3],
    pub timer: Box<dyn IntervalTimer>,
    pub audio: Box<dyn AudioPort>,
    pub rtc: Box<dyn RealTimeClock>,
}

impl Default for Devices {
    fn default() -> Self {
        Self {
            cpu: Box::new(NullCpu),
            scsi: Box::new(NullScsi),
            duarts: [
                Box::new(NullDuart),
                Box::new(NullDuart),
                Box::new(NullDuart),
            ],
            timer: Box::new(NullTimer),
            audio: Box::new(NullAudio),
            rtc: Box::new(NullRtc),
        }
    }
}

/// The board: memory, machine registers and the fixed address decoder.
pub struct Board {
    map: MemoryMap,
    devices: Devices,

    ram: Box<[u8]>,
    nvram: [u8; C::NVRAM_SIZE],
    boot_rom: Box<[u8]>,
    id_prom: [u8; C::ID_PROM_SIZE],

    cpucfg: CpuConfig,
    leds: [bool; 5],
    parity: ParityLayer,
    lio: LioAggregator,
    dma: DmaPointers,
    reset_pending: bool,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Board {{ cpucfg: {:?}, lio: {:?}, dma: {:?}, memory: [...] }}",
            self.cpucfg, self.lio, self.dma
        )
    }
}

impl Board {
    /// Assemble a board around the given devices and ROM images.
    ///
    /// # Errors
    ///
    /// Fails if the boot ROM image does not fit its window. A short image
    /// is allowed; the remainder of the window reads as zero.
    pub fn new(
        devices: Devices,
        boot_rom: Vec<u8>,
        id_prom: [u8; C::ID_PROM_SIZE],
    ) -> Result<Self, BoardError> {
        if boot_rom.len() > C::BOOT_ROM_SIZE {
            return Err(BoardError::BootRomTooLarge(boot_rom.len()));
        }

        Ok(Self {
            map: Self::fixed_map()?,
            devices,
            ram: vec![0; C::RAM_SIZE].into_boxed_slice(),
            nvram: [0; C::NVRAM_SIZE],
            boot_rom: boot_rom.into_boxed_slice(),
            id_prom,
            cpucfg: CpuConfig::empty(),
            leds: [false; 5],
            parity: ParityLayer::default(),
            lio: LioAggregator::default(),
            dma: DmaPointers::default(),
            reset_pending: false,
        })
    }

    /// The fixed decoder table of this board variant.
    #[allow(clippy::cast_possible_truncation)]
    fn fixed_map() -> Result<MemoryMap, MapError> {
        let mut map = MemoryMap::default();

        map.bind(
            C::RAM_BASE,
            C::RAM_BASE + C::RAM_SIZE as Paddr - 1,
            Lanes::WORD,
            Slot::Ram,
        )?;

        map.bind(C::AUDIO_DATA, C::AUDIO_DATA + 3, Lanes::B0, Slot::AudioData)?;
        map.bind(
            C::AUDIO_CONTROL,
            C::AUDIO_CONTROL + 3,
            Lanes::B0,
            Slot::AudioControl,
        )?;

        map.bind(C::SYSTEM_ID, C::SYSTEM_ID + 3, Lanes::B1, Slot::SystemId)?;
        map.bind(C::CPUCFG, C::CPUCFG + 3, Lanes::LO16, Slot::CpuConfig)?;

        map.bind(C::DMA_LOW, C::DMA_LOW + 3, Lanes::LO16, Slot::DmaLow)?;
        map.bind(C::DMA_HIGH, C::DMA_HIGH + 3, Lanes::LO16, Slot::DmaHigh)?;
        map.bind(C::DMA_FLUSH, C::DMA_FLUSH + 3, Lanes::WORD, Slot::DmaFlush)?;

        map.bind(C::LIO_STATUS, C::LIO_STATUS + 3, Lanes::B3, Slot::LioStatus)?;
        map.bind(C::SWITCHES, C::SWITCHES + 3, Lanes::WORD, Slot::Switches)?;

        map.bind(
            C::TIMER_ACK_IRQ4,
            C::TIMER_ACK_IRQ4 + 3,
            Lanes::B0,
            Slot::TimerAck4,
        )?;
        map.bind(
            C::TIMER_ACK_IRQ2,
            C::TIMER_ACK_IRQ2 + 3,
            Lanes::B0,
            Slot::TimerAck2,
        )?;

        map.bind(
            C::ERROR_ADDRESS,
            C::ERROR_ADDRESS + 3,
            Lanes::WORD,
            Slot::ErrorAddress,
        )?;

        map.bind(C::SCSI_RESET, C::SCSI_RESET + 7, Lanes::B0, Slot::ScsiReset)?;

        map.bind(C::PARITY_ACK, C::PARITY_ACK + 3, Lanes::WORD, Slot::ParityAck)?;
        map.bind(
            C::PARITY_STATUS,
            C::PARITY_STATUS + 3,
            Lanes::B1,
            Slot::ParityStatus,
        )?;

        map.bind(
            C::ID_PROM,
            C::ID_PROM + C::ID_PROM_SIZE as Paddr - 1,
            Lanes::WORD,
            Slot::IdProm,
        )?;

        map.bind(
            C::SCSI_ADDRESS,
            C::SCSI_ADDRESS + 3,
            Lanes::B1,
            Slot::ScsiAddress,
        )?;
        map.bind(
            C::SCSI_REGISTER,
            C::SCSI_REGISTER + 3,
            Lanes::B1,
            Slot::ScsiRegister,
        )?;

        map.bind(C::TIMER, C::TIMER + 0xf, Lanes::B0, Slot::Timer)?;
        map.bind(C::DUART, C::DUART + 0xff, Lanes::B0, Slot::Duart)?;
        map.bind(C::NVRAM, C::NVRAM + 0x1fff, Lanes::B0, Slot::Nvram)?;

        map.bind(
            C::BOOT_ROM,
            C::BOOT_ROM + C::BOOT_ROM_SIZE as Paddr - 1,
            Lanes::WORD,
            Slot::BootRom,
        )?;

        Ok(map)
    }

    /// Read through the backplane.
    ///
    /// Only the selected lanes of `data` are modified; unselected lanes are
    /// left exactly as the caller supplied them. Unmapped addresses and
    /// lanes outside a device's placement read as zero.
    pub fn read(&mut self, address: Paddr, data: &mut u32, lanes: Lanes) {
        let aligned = address & !3;

        let Some(binding) = self.map.lookup(aligned) else {
            trace!(address, "unmapped read");
            merge(data, 0, lanes);
            return;
        };

        // Lanes the device does not occupy read as open bus.
        merge(data, 0, lanes.difference(binding.lanes));

        let lanes = lanes.intersection(binding.lanes);
        if lanes.is_empty() {
            return;
        }

        let offset = aligned - binding.start;
        let value = match binding.slot {
            Slot::Ram => {
                let value = self.ram_word(aligned);
                if self.parity.check_read(aligned, lanes) {
                    self.devices.cpu.bus_error(aligned);
                }
                value
            }

            // Write-only and void windows.
            Slot::AudioData
            | Slot::AudioControl
            | Slot::SystemId
            | Slot::DmaLow
            | Slot::DmaHigh
            | Slot::DmaFlush
            | Slot::Switches => 0,

            Slot::CpuConfig => u32::from(self.cpucfg.bits()),
            Slot::LioStatus => u32::from(self.lio.status()),

            Slot::TimerAck4 => {
                self.devices.cpu.set_input_line(IrqLine::Irq4, false);
                0
            }
            Slot::TimerAck2 => {
                self.devices.cpu.set_input_line(IrqLine::Irq2, false);
                0
            }

            Slot::ErrorAddress => self.parity.error_address(),

            Slot::ScsiReset => {
                self.devices.scsi.reset_w(offset >= 4);
                0
            }

            Slot::ParityAck => {
                self.parity_ack(lanes);
                0
            }
            Slot::ParityStatus => u32::from(self.parity.inverted_status()) << 16,

            Slot::IdProm => rom_word(&self.id_prom, offset as usize),
            Slot::BootRom => rom_word(&self.boot_rom, offset as usize),

            Slot::ScsiAddress => u32::from(self.devices.scsi.addr_r()) << 16,
            Slot::ScsiRegister => u32::from(self.devices.scsi.reg_r()) << 16,

            Slot::Timer => u32::from(self.devices.timer.read(timer_reg(offset))) << 24,
            Slot::Duart => self.duart_read(offset),
            Slot::Nvram => self.nvram_read(offset),
        };

        merge(data, value, lanes);
    }

    /// Write through the backplane.
    ///
    /// Only the selected lanes of `data` are consumed. Writes to unmapped
    /// addresses, read-only windows and unoccupied lanes are silently
    /// discarded.
    pub fn write(&mut self, address: Paddr, data: u32, lanes: Lanes) {
        let aligned = address & !3;

        let Some(binding) = self.map.lookup(aligned) else {
            trace!(address, data, "unmapped write");
            return;
        };

        let lanes = lanes.intersection(binding.lanes);
        if lanes.is_empty() {
            return;
        }

        let offset = aligned - binding.start;
        match binding.slot {
            Slot::Ram => {
                let base = aligned as usize;
                for byte in 0..4 {
                    if lanes.selected(byte) {
                        self.ram[base + byte] = bus::get_byte(data, byte);
                    }
                }
                self.parity.observe_write(aligned, lanes);
            }

            Slot::AudioData => self.devices.audio.data_w(bus::get_byte(data, 0)),
            Slot::AudioControl => self.devices.audio.control_w(bus::get_byte(data, 0)),

            Slot::CpuConfig => {
                let value = merge16(self.cpucfg.bits(), data, lanes);
                self.cpucfg_w(value);
            }

            Slot::DmaLow => {
                let value = merge16(self.dma.low(), data, lanes);
                self.dma.set_low(value);
            }
            Slot::DmaHigh => {
                let value = merge16(self.dma.high(), data, lanes);
                self.dma.set_high(value);
            }

            // A flush strobe; the pump transfers synchronously, so there is
            // never anything buffered to drain.
            Slot::DmaFlush => {}

            Slot::ParityAck => self.parity_ack(lanes),

            Slot::ScsiAddress => self.devices.scsi.addr_w(bus::get_byte(data, 1)),
            Slot::ScsiRegister => self.devices.scsi.reg_w(bus::get_byte(data, 1)),

            Slot::Timer => self
                .devices
                .timer
                .write(timer_reg(offset), bus::get_byte(data, 0)),
            Slot::Duart => self.duart_write(offset, bus::get_byte(data, 0)),
            Slot::Nvram => self.nvram_write(offset, bus::get_byte(data, 0)),

            Slot::SystemId
            | Slot::LioStatus
            | Slot::Switches
            | Slot::TimerAck4
            | Slot::TimerAck2
            | Slot::ErrorAddress
            | Slot::ScsiReset
            | Slot::ParityStatus
            | Slot::IdProm
            | Slot::BootRom => {
                trace!(address, data, "write to read-only window discarded");
            }
        }
    }

    /// Read a single byte, honoring the lane placement of its slot.
    #[must_use]
    pub fn read_byte(&mut self, address: Paddr) -> u8 {
        let mut data = 0;
        self.read(address, &mut data, Lanes::lane(address));
        bus::get_byte(data, (address & 3) as usize)
    }

    /// Write a single byte, touching only its lane.
    pub fn write_byte(&mut self, address: Paddr, value: u8) {
        let mut data = 0;
        bus::set_byte(&mut data, (address & 3) as usize, value);
        self.write(address, data, Lanes::lane(address));
    }

    /// Read a full 32-bit word.
    #[must_use]
    pub fn read_word(&mut self, address: Paddr) -> u32 {
        let mut data = 0;
        self.read(address, &mut data, Lanes::WORD);
        data
    }

    /// Write a full 32-bit word.
    pub fn write_word(&mut self, address: Paddr, value: u32) {
        self.write(address, value, Lanes::WORD);
    }

    /// Report the wire state of a local I/O interrupt source.
    ///
    /// Sources are wired active-low: a device asserting its interrupt
    /// reports `false`. The shared CPU input is toggled exactly once per
    /// net transition of the combined line.
    pub fn lio_interrupt(&mut self, source: LioSource, state: bool) {
        if let Some(line) = self.lio.report(source as u8, state) {
            self.devices.cpu.set_input_line(IrqLine::Irq1, line);
        }
    }

    /// One disk controller DMA request pulse: transfers a single byte
    /// between the controller and memory, then advances the pointer pair.
    ///
    /// The memory side goes through the ordinary RAM path, so fault
    /// injection applies to DMA traffic exactly as it does to CPU writes. A
    /// request line that is low does nothing.
    #[tracing::instrument(skip(self))]
    pub fn scsi_drq(&mut self, state: bool) {
        if !state {
            return;
        }

        let address = self.dma.address();
        if self.dma.to_memory() {
            let data = self.devices.scsi.dma_r();
            self.write_byte(address, data);
        } else {
            let data = self.read_byte(address);
            self.devices.scsi.dma_w(data);
        }

        self.dma.advance();
    }

    /// Edge on one of the interval timer's out lines; raises the matching
    /// CPU interrupt. The acknowledge windows deassert it again.
    pub fn timer_out(&mut self, channel: u8, state: bool) {
        if !state {
            return;
        }

        match channel {
            0 => self.devices.cpu.set_input_line(IrqLine::Irq2, true),
            1 => self.devices.cpu.set_input_line(IrqLine::Irq4, true),
            _ => {}
        }
    }

    #[tracing::instrument(skip(self))]
    fn cpucfg_w(&mut self, data: u16) {
        debug!(value = data, "cpucfg write");

        let new = CpuConfig::from_bits_retain(data);
        let changed = self.cpucfg ^ new;

        for (i, led) in self.leds.iter_mut().enumerate() {
            *led = data & (1 << i) != 0;
        }

        if changed.contains(CpuConfig::RESET) && new.contains(CpuConfig::RESET) {
            debug!("soft reset scheduled");
            self.reset_pending = true;
        }

        if changed.contains(CpuConfig::CHECK_PARITY) {
            self.parity.set_check(new.contains(CpuConfig::CHECK_PARITY));
        }

        if changed.contains(CpuConfig::BAD_PARITY) {
            self.parity.set_inject(new.contains(CpuConfig::BAD_PARITY));
        }

        self.cpucfg = new;
    }

    fn parity_ack(&mut self, lanes: Lanes) {
        for byte in 0..4 {
            if lanes.selected(byte) {
                self.parity.acknowledge(byte);
            }
        }
    }

    fn ram_word(&self, aligned: Paddr) -> u32 {
        let base = aligned as usize;
        let mut value = 0;
        for byte in 0..4 {
            bus::set_byte(&mut value, byte, self.ram[base + byte]);
        }
        value
    }

    #[allow(clippy::cast_possible_truncation)]
    fn duart_read(&mut self, offset: Paddr) -> u32 {
        let slot = offset >> 2;
        let (index, reg) = ((slot & 3) as usize, (slot >> 2) as u8);

        match self.devices.duarts.get_mut(index) {
            Some(duart) => u32::from(duart.read(reg)) << 24,
            None => 0,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn duart_write(&mut self, offset: Paddr, data: u8) {
        let slot = offset >> 2;
        let (index, reg) = ((slot & 3) as usize, (slot >> 2) as u8);

        if let Some(duart) = self.devices.duarts.get_mut(index) {
            duart.write(reg, data);
        }
    }

    fn nvram_read(&mut self, offset: Paddr) -> u32 {
        // The phantom clock rides on the last slot of the window; while it
        // is selected it supplies the data bit instead of the RAM beneath.
        if C::NVRAM + offset == C::RTC_TAP && self.devices.rtc.chip_enable() {
            return u32::from(self.devices.rtc.read_data()) << 24;
        }

        u32::from(self.nvram[(offset >> 2) as usize]) << 24
    }

    fn nvram_write(&mut self, offset: Paddr, data: u8) {
        if C::NVRAM + offset == C::RTC_TAP {
            if self.devices.rtc.chip_enable() {
                self.devices.rtc.write_data(data);
            } else if data != 0 {
                self.devices.rtc.read_1();
            } else {
                self.devices.rtc.read_0();
            }
        }

        // The tap never owns the slot; the byte lands in RAM regardless.
        self.nvram[(offset >> 2) as usize] = data;
    }

    /// Machine reset.
    ///
    /// Interrupt sources return to idle with the line released, the config
    /// register, error address, parity status and DMA pointers clear. The
    /// parity layer's armament and shadow bitmap deliberately survive: the
    /// bitmap only drains through the normal write path.
    pub fn reset(&mut self) {
        debug!("machine reset");

        self.reset_pending = false;
        self.cpucfg = CpuConfig::empty();
        self.leds = [false; 5];
        self.dma.reset();
        self.parity.reset();

        if let Some(line) = self.lio.reset() {
            self.devices.cpu.set_input_line(IrqLine::Irq1, line);
        }
    }

    /// Whether a soft reset was scheduled by the config register. The
    /// embedder consumes it by calling [`Board::reset`] at the next
    /// instruction boundary.
    #[must_use]
    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    #[must_use]
    pub fn cpucfg(&self) -> CpuConfig {
        self.cpucfg
    }

    /// State of the five front panel LEDs.
    #[must_use]
    pub fn leds(&self) -> [bool; 5] {
        self.leds
    }

    #[must_use]
    pub fn parity(&self) -> &ParityLayer {
        &self.parity
    }

    #[must_use]
    pub fn lio(&self) -> &LioAggregator {
        &self.lio
    }

    #[must_use]
    pub fn dma(&self) -> &DmaPointers {
        &self.dma
    }

    #[must_use]
    pub fn memory_map(&self) -> &MemoryMap {
        &self.map
    }
}

/// Copy the selected lanes of `value` into `data`.
fn merge(data: &mut u32, value: u32, lanes: Lanes) {
    for byte in 0..4 {
        if lanes.selected(byte) {
            bus::set_byte(data, byte, bus::get_byte(value, byte));
        }
    }
}

/// Merge a partial write into a 16-bit register sitting in the low lanes.
#[allow(clippy::cast_possible_truncation)]
fn merge16(current: u16, data: u32, lanes: Lanes) -> u16 {
    let mut value = u32::from(current);
    for byte in 2..4 {
        if lanes.selected(byte) {
            bus::set_byte(&mut value, byte, bus::get_byte(data, byte));
        }
    }
    value as u16
}

/// Assemble the word at `offset` of a ROM image, padding past its end with
/// zeros.
fn rom_word(rom: &[u8], offset: usize) -> u32 {
    let mut value = 0;
    for byte in 0..4 {
        bus::set_byte(&mut value, byte, rom.get(offset + byte).copied().unwrap_or(0));
    }
    value
}

/// The timer register selected by a window offset.
#[allow(clippy::cast_possible_truncation)]
fn timer_reg(offset: Paddr) -> u8 {
    (offset >> 2) as u8
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default, Clone)]
    struct TestCpu {
        lines: Rc<RefCell<Vec<(IrqLine, bool)>>>,
        bus_errors: Rc<RefCell<Vec<Paddr>>>,
    }

    impl CpuBackplane for TestCpu {
        fn set_input_line(&mut self, line: IrqLine, state: bool) {
            self.lines.borrow_mut().push((line, state));
        }

        fn bus_error(&mut self, address: Paddr) {
            self.bus_errors.borrow_mut().push(address);
        }
    }

    #[derive(Default, Clone)]
    struct ScriptedScsi {
        input: Rc<RefCell<VecDeque<u8>>>,
        output: Rc<RefCell<Vec<u8>>>,
        resets: Rc<RefCell<Vec<bool>>>,
    }

    impl ScsiController for ScriptedScsi {
        fn dma_r(&mut self) -> u8 {
            self.input.borrow_mut().pop_front().unwrap_or(0)
        }

        fn dma_w(&mut self, data: u8) {
            self.output.borrow_mut().push(data);
        }

        fn addr_r(&mut self) -> u8 {
            0x5a
        }

        fn addr_w(&mut self, _data: u8) {}

        fn reg_r(&mut self) -> u8 {
            0xa5
        }

        fn reg_w(&mut self, _data: u8) {}

        fn reset_w(&mut self, state: bool) {
            self.resets.borrow_mut().push(state);
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum RtcOp {
        Read0,
        Read1,
        Write(u8),
    }

    #[derive(Default, Clone)]
    struct TestRtc {
        enabled: Rc<Cell<bool>>,
        data: Rc<Cell<u8>>,
        ops: Rc<RefCell<Vec<RtcOp>>>,
    }

    impl RealTimeClock for TestRtc {
        fn chip_enable(&self) -> bool {
            self.enabled.get()
        }

        fn read_data(&mut self) -> u8 {
            self.data.get()
        }

        fn write_data(&mut self, data: u8) {
            self.ops.borrow_mut().push(RtcOp::Write(data));
        }

        fn read_0(&mut self) {
            self.ops.borrow_mut().push(RtcOp::Read0);
        }

        fn read_1(&mut self) {
            self.ops.borrow_mut().push(RtcOp::Read1);
        }
    }

    fn board() -> Board {
        board_with(Devices::default())
    }

    fn board_with(devices: Devices) -> Board {
        Board::new(devices, Vec::new(), [0; C::ID_PROM_SIZE]).unwrap()
    }

    #[test]
    fn ram_words_and_bytes_round_trip() {
        let mut board = board();
        board.write_word(0x100, 0x0123_4567);

        assert_eq!(board.read_word(0x100), 0x0123_4567);
        assert_eq!(board.read_byte(0x100), 0x01);
        assert_eq!(board.read_byte(0x103), 0x67);

        board.write_byte(0x102, 0xee);
        assert_eq!(board.read_word(0x100), 0x0123_ee67);
    }

    #[test]
    fn partial_read_leaves_unselected_lanes_alone() {
        let mut board = board();
        board.write_word(0x100, 0x0123_4567);

        let mut data = 0xdead_beef;
        board.read(0x100, &mut data, Lanes::B1);
        assert_eq!(data, 0xde23_beef);
    }

    #[test]
    fn partial_write_touches_only_selected_lanes() {
        let mut board = board();
        board.write_word(0x100, 0x1111_1111);
        board.write(0x100, 0xaabb_ccdd, Lanes::HI16);

        assert_eq!(board.read_word(0x100), 0xaabb_1111);
    }

    #[test]
    fn unmapped_reads_zero_and_writes_are_discarded() {
        let mut board = board();

        let mut data = 0xffff_ffff;
        board.read(0x1000_0000, &mut data, Lanes::WORD);
        assert_eq!(data, 0);

        board.write(0x1000_0000, 0x1234_5678, Lanes::WORD);
    }

    #[test]
    fn lanes_outside_a_placement_read_as_zero() {
        let mut board = board();

        // The config register only occupies the low half of its word.
        board.write_word(C::CPUCFG, 0xffff_001f);
        let mut data = 0xffff_ffff;
        board.read(C::CPUCFG, &mut data, Lanes::WORD);
        assert_eq!(data, 0x0000_001f);
    }

    #[test]
    fn config_register_reads_back_verbatim() {
        let mut board = board();
        board.write_word(C::CPUCFG, 0x0000_241f);

        assert_eq!(board.read_word(C::CPUCFG), 0x0000_241f);
        assert_eq!(
            board.cpucfg(),
            CpuConfig::LEDS | CpuConfig::CHECK_PARITY | CpuConfig::BAD_PARITY
        );
        assert_eq!(board.leds(), [true; 5]);
        assert!(board.parity().shadow_allocated());
        assert!(!board.reset_pending());
    }

    #[test]
    fn soft_reset_is_scheduled_on_a_rising_edge() {
        let mut board = board();
        board.write_word(C::CPUCFG, 0x0000_0200);

        // The bit reads back while the reset is pending.
        assert!(board.reset_pending());
        assert_eq!(board.read_word(C::CPUCFG), 0x0000_0200);

        board.reset();
        assert!(!board.reset_pending());
        assert_eq!(board.read_word(C::CPUCFG), 0);

        board.write_word(C::CPUCFG, 0x0000_0200);
        assert!(board.reset_pending());
    }

    #[test]
    fn timer_outputs_raise_and_acks_release() {
        let cpu = TestCpu::default();
        let mut board = board_with(Devices {
            cpu: Box::new(cpu.clone()),
            ..Devices::default()
        });

        board.timer_out(0, true);
        board.timer_out(1, true);
        let _ = board.read_byte(C::TIMER_ACK_IRQ2);
        let _ = board.read_byte(C::TIMER_ACK_IRQ4);

        assert_eq!(
            *cpu.lines.borrow(),
            vec![
                (IrqLine::Irq2, true),
                (IrqLine::Irq4, true),
                (IrqLine::Irq2, false),
                (IrqLine::Irq4, false),
            ]
        );

        // Falling edges are ignored.
        board.timer_out(0, false);
        assert_eq!(cpu.lines.borrow().len(), 4);
    }

    #[test]
    fn lio_sources_show_in_the_status_window() {
        let cpu = TestCpu::default();
        let mut board = board_with(Devices {
            cpu: Box::new(cpu.clone()),
            ..Devices::default()
        });

        assert_eq!(board.read_byte(C::LIO_STATUS + 3), 0xff);

        board.lio_interrupt(LioSource::Scsi, false);
        assert_eq!(board.read_byte(C::LIO_STATUS + 3), 0xef);

        board.lio_interrupt(LioSource::Scsi, true);
        assert_eq!(board.read_byte(C::LIO_STATUS + 3), 0xff);

        // Slots 3 and 5 are never driven, so the combined line stays off.
        assert!(cpu.lines.borrow().is_empty());
    }

    #[test]
    fn parity_fault_reaches_the_cpu_and_the_registers() {
        let cpu = TestCpu::default();
        let mut board = board_with(Devices {
            cpu: Box::new(cpu.clone()),
            ..Devices::default()
        });

        // Arm injection, plant a bad word, disarm, then arm checking.
        board.write_word(C::CPUCFG, 0x0000_2000);
        board.write_word(0x4000, 0x5555_5555);
        board.write_word(C::CPUCFG, 0x0000_0400);

        assert_eq!(board.read_word(0x4000), 0x5555_5555);
        assert_eq!(*cpu.bus_errors.borrow(), vec![0x4000]);

        assert_eq!(board.read_word(C::ERROR_ADDRESS), 0x4000);
        // Lane bits invert on read: all four bad, so they read as zero.
        assert_eq!(board.read_byte(C::PARITY_STATUS + 1), 0x04);

        // Acknowledging the CPU source clears everything.
        let _ = board.read_byte(C::PARITY_ACK + 2);
        assert_eq!(board.read_byte(C::PARITY_STATUS + 1), 0xf0);

        // Rewriting the word heals it; the next read is clean.
        board.write_word(0x4000, 0x5555_5555);
        assert_eq!(board.read_word(0x4000), 0x5555_5555);
        assert_eq!(cpu.bus_errors.borrow().len(), 1);
        assert!(!board.parity().shadow_allocated());
    }

    #[test]
    fn dma_pump_moves_bytes_into_memory() {
        let scsi = ScriptedScsi::default();
        scsi.input.borrow_mut().extend([0xca, 0xfe, 0xba]);
        let mut board = board_with(Devices {
            scsi: Box::new(scsi.clone()),
            ..Devices::default()
        });

        // Device-to-memory, starting one byte before a page boundary.
        board.write_word(C::DMA_LOW, 0x0000_8fff);
        board.write_word(C::DMA_HIGH, 0x0000_0001);

        for _ in 0..3 {
            board.scsi_drq(true);
        }

        assert_eq!(board.read_byte(0x1fff), 0xca);
        assert_eq!(board.read_byte(0x2000), 0xfe);
        assert_eq!(board.read_byte(0x2001), 0xba);
        assert_eq!(board.dma().address(), 0x2002);
        assert!(board.dma().to_memory());

        // A low request line transfers nothing.
        board.scsi_drq(false);
        assert_eq!(board.dma().address(), 0x2002);
    }

    #[test]
    fn dma_pump_drains_memory_to_the_device() {
        let scsi = ScriptedScsi::default();
        let mut board = board_with(Devices {
            scsi: Box::new(scsi.clone()),
            ..Devices::default()
        });

        board.write_word(0x3000, 0x0102_0304);
        board.write_word(C::DMA_LOW, 0x0000_0000);
        board.write_word(C::DMA_HIGH, 0x0000_0003);

        for _ in 0..4 {
            board.scsi_drq(true);
        }

        assert_eq!(*scsi.output.borrow(), vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn dma_writes_inject_parity_like_cpu_writes() {
        let cpu = TestCpu::default();
        let scsi = ScriptedScsi::default();
        scsi.input.borrow_mut().push_back(0x42);
        let mut board = board_with(Devices {
            cpu: Box::new(cpu.clone()),
            scsi: Box::new(scsi.clone()),
            ..Devices::default()
        });

        board.write_word(C::CPUCFG, 0x0000_2000);
        board.write_word(C::DMA_LOW, 0x0000_8123);
        board.scsi_drq(true);

        board.write_word(C::CPUCFG, 0x0000_0400);
        assert_eq!(board.read_byte(0x123), 0x42);
        assert_eq!(*cpu.bus_errors.borrow(), vec![0x120]);
        assert_eq!(board.read_word(C::ERROR_ADDRESS), 0x120);
    }

    #[test]
    fn scsi_reset_windows_strobe_the_reset_line() {
        let scsi = ScriptedScsi::default();
        let mut board = board_with(Devices {
            scsi: Box::new(scsi.clone()),
            ..Devices::default()
        });

        let _ = board.read_byte(C::SCSI_RESET);
        let _ = board.read_byte(C::SCSI_RESET + 4);
        assert_eq!(*scsi.resets.borrow(), vec![false, true]);
    }

    #[test]
    fn scsi_register_ports_use_the_second_lane() {
        let scsi = ScriptedScsi::default();
        let mut board = board_with(Devices {
            scsi: Box::new(scsi.clone()),
            ..Devices::default()
        });

        assert_eq!(board.read_word(C::SCSI_ADDRESS), 0x005a_0000);
        assert_eq!(board.read_word(C::SCSI_REGISTER), 0x00a5_0000);
    }

    #[test]
    fn nvram_stores_one_byte_per_word() {
        let mut board = board();

        board.write_byte(C::NVRAM, 0x12);
        board.write_byte(C::NVRAM + 4, 0x34);

        assert_eq!(board.read_byte(C::NVRAM), 0x12);
        assert_eq!(board.read_byte(C::NVRAM + 4), 0x34);
        assert_eq!(board.read_word(C::NVRAM), 0x1200_0000);
    }

    #[test]
    fn clock_tap_feeds_pattern_bits_while_deselected() {
        let rtc = TestRtc::default();
        let mut board = board_with(Devices {
            rtc: Box::new(rtc.clone()),
            ..Devices::default()
        });

        board.write_byte(C::RTC_TAP, 0x00);
        board.write_byte(C::RTC_TAP, 0xc5);
        assert_eq!(*rtc.ops.borrow(), vec![RtcOp::Read0, RtcOp::Read1]);

        // The byte still lands in the RAM beneath and reads back while the
        // chip stays deselected.
        assert_eq!(board.read_byte(C::RTC_TAP), 0xc5);
    }

    #[test]
    fn clock_tap_moves_data_bits_while_selected() {
        let rtc = TestRtc::default();
        rtc.enabled.set(true);
        rtc.data.set(0x01);
        let mut board = board_with(Devices {
            rtc: Box::new(rtc.clone()),
            ..Devices::default()
        });

        assert_eq!(board.read_byte(C::RTC_TAP), 0x01);
        assert_eq!(board.read_word(C::RTC_TAP & !3), 0x0100_0000);

        board.write_byte(C::RTC_TAP, 0x01);
        assert_eq!(*rtc.ops.borrow(), vec![RtcOp::Write(0x01)]);

        // Other slots of the window are plain memory either way.
        board.write_byte(C::NVRAM, 0x77);
        assert_eq!(board.read_byte(C::NVRAM), 0x77);
        assert_eq!(rtc.ops.borrow().len(), 1);
    }

    #[test]
    fn boot_rom_reads_and_ignores_writes() {
        let mut rom = vec![0; 16];
        rom[0..4].copy_from_slice(&[0x0b, 0xf0, 0x0d, 0x25]);
        let mut board =
            Board::new(Devices::default(), rom, [0; C::ID_PROM_SIZE]).unwrap();

        assert_eq!(board.read_word(C::BOOT_ROM), 0x0bf0_0d25);
        board.write_word(C::BOOT_ROM, 0xffff_ffff);
        assert_eq!(board.read_word(C::BOOT_ROM), 0x0bf0_0d25);

        // Past the image but inside the window: zeros.
        assert_eq!(board.read_word(C::BOOT_ROM + 0x20), 0);
    }

    #[test]
    fn oversized_boot_rom_is_rejected() {
        let rom = vec![0; C::BOOT_ROM_SIZE + 1];
        assert!(matches!(
            Board::new(Devices::default(), rom, [0; C::ID_PROM_SIZE]),
            Err(BoardError::BootRomTooLarge(_))
        ));
    }

    #[test]
    fn id_prom_is_word_readable() {
        let mut prom = [0; C::ID_PROM_SIZE];
        prom[4] = 0xab;
        let mut board = Board::new(Devices::default(), Vec::new(), prom).unwrap();

        assert_eq!(board.read_word(C::ID_PROM + 4), 0xab00_0000);
        assert_eq!(board.read_byte(C::ID_PROM + 4), 0xab);
    }

    #[test]
    fn reset_clears_registers_but_not_the_shadow() {
        let mut board = board();

        board.write_word(C::CPUCFG, 0x0000_241f);
        board.write_word(0x4000, 0);
        board.write_word(C::DMA_LOW, 0x0000_8fff);
        board.write_word(C::DMA_HIGH, 0x0000_0002);
        assert_eq!(board.read_word(0x4000), 0);

        board.reset();

        assert_eq!(board.read_word(C::CPUCFG), 0);
        assert_eq!(board.leds(), [false; 5]);
        assert_eq!(board.dma().address(), 0);
        assert_eq!(board.read_word(C::ERROR_ADDRESS), 0);
        assert_eq!(board.read_byte(C::PARITY_STATUS + 1), 0xf0);

        // The planted fault survives and trips again once checking rearms.
        assert!(board.parity().shadow_allocated());
        board.write_word(C::CPUCFG, 0x0000_0400);
        assert_eq!(board.read_word(0x4000), 0);
        assert_eq!(board.read_word(C::ERROR_ADDRESS), 0x4000);
    }

    #[test]
    fn decoder_listing_is_stable() {
        let board = board();
        let listing: String = board
            .memory_map()
            .bindings()
            .take(3)
            .map(|binding| format!("{binding}\n"))
            .collect();

        assert_eq!(
            listing,
            indoc::indoc! {"
                0x00000000..=0x007fffff  1111  ram
                0x1f600000..=0x1f600003  1000  audio-data
                0x1f600010..=0x1f600013  1000  audio-control
            "}
        );
    }

    #[test]
    fn write_only_windows_read_as_zero() {
        let mut board = board();

        board.write_byte(C::AUDIO_DATA, 0x55);
        assert_eq!(board.read_byte(C::AUDIO_DATA), 0);
        assert_eq!(board.read_word(C::DMA_LOW), 0);
        assert_eq!(board.read_word(C::SWITCHES), 0);
    }
}
