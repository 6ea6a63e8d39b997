//! Physical address decoding.
//!
//! The decoder is a fixed, ordered table of non-overlapping region bindings
//! over the 32-bit address domain. Every bound region also carries a byte
//! lane placement: the lanes of a 32-bit slot the device actually occupies.
//! Accesses outside any binding are open bus: reads return zero, writes are
//! discarded.

use bitflags::bitflags;
use parse_display::Display;
use thiserror::Error;

use crate::constants::Paddr;

bitflags! {
    /// Byte lanes of a 32-bit bus transfer.
    ///
    /// The bus is big-endian: lane 0 is bits 31..24 of the word and the
    /// lowest byte address of the slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lanes: u8 {
        const B0 = 0b1000;
        const B1 = 0b0100;
        const B2 = 0b0010;
        const B3 = 0b0001;

        /// All four lanes of the word.
        const WORD = 0b1111;

        /// The upper 16 bits.
        const HI16 = 0b1100;

        /// The lower 16 bits.
        const LO16 = 0b0011;
    }
}

impl Lanes {
    /// Selector for the single lane holding the byte at `offset` within its
    /// word slot.
    #[must_use]
    pub fn lane(offset: Paddr) -> Self {
        Self::from_bits_truncate(0b1000 >> (offset & 3))
    }

    /// Whether lane `byte` (0 = most significant) is selected.
    #[must_use]
    pub fn selected(self, byte: usize) -> bool {
        self.bits() & (0b1000 >> byte) != 0
    }
}

impl std::fmt::Display for Lanes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04b}", self.bits())
    }
}

/// Bit position of lane `byte` within a 32-bit bus word.
#[allow(clippy::cast_possible_truncation)]
const fn shift(byte: usize) -> u32 {
    8 * (3 - byte as u32)
}

/// Extract byte lane `byte` of a bus word.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn get_byte(data: u32, byte: usize) -> u8 {
    (data >> shift(byte)) as u8
}

/// Replace byte lane `byte` of a bus word, leaving the other lanes intact.
pub fn set_byte(data: &mut u32, byte: usize, value: u8) {
    let shift = shift(byte);
    *data = (*data & !(0xff << shift)) | (u32::from(value) << shift);
}

/// The region handlers the decoder can dispatch to.
///
/// The set is fixed per board; the decoder only selects, the board performs
/// the access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "kebab-case")]
pub enum Slot {
    Ram,
    AudioData,
    AudioControl,
    SystemId,
    CpuConfig,
    DmaLow,
    DmaHigh,
    DmaFlush,
    LioStatus,
    Switches,
    TimerAck4,
    TimerAck2,
    ErrorAddress,
    ScsiReset,
    ParityAck,
    ParityStatus,
    IdProm,
    ScsiAddress,
    ScsiRegister,
    Timer,
    Duart,
    Nvram,
    BootRom,
}

/// One region binding of the decoder table.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub start: Paddr,
    pub end: Paddr,
    pub lanes: Lanes,
    pub slot: Slot,
}

impl Binding {
    fn overlaps(&self, start: Paddr, end: Paddr) -> bool {
        self.start <= end && start <= self.end
    }
}

impl std::fmt::Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#010x}..={:#010x}  {}  {}",
            self.start, self.end, self.lanes, self.slot
        )
    }
}

/// Errors raised while building the decoder table.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("region {slot} has reversed bounds {start:#010x}..={end:#010x}")]
    ReversedBounds {
        slot: Slot,
        start: Paddr,
        end: Paddr,
    },

    #[error("region {slot} [{start:#010x}..={end:#010x}] overlaps {other}")]
    Overlap {
        slot: Slot,
        start: Paddr,
        end: Paddr,
        other: Binding,
    },
}

/// Ordered set of region bindings over the physical address space.
#[derive(Debug, Default)]
pub struct MemoryMap {
    bindings: Vec<Binding>,
}

impl MemoryMap {
    /// Bind a region handler over an inclusive address range.
    ///
    /// # Errors
    ///
    /// Fails if the bounds are reversed or the range overlaps an existing
    /// binding.
    pub fn bind(
        &mut self,
        start: Paddr,
        end: Paddr,
        lanes: Lanes,
        slot: Slot,
    ) -> Result<(), MapError> {
        if start > end {
            return Err(MapError::ReversedBounds { slot, start, end });
        }

        if let Some(other) = self.bindings.iter().find(|b| b.overlaps(start, end)) {
            return Err(MapError::Overlap {
                slot,
                start,
                end,
                other: *other,
            });
        }

        let binding = Binding {
            start,
            end,
            lanes,
            slot,
        };
        let index = self
            .bindings
            .partition_point(|b| b.start < binding.start);
        self.bindings.insert(index, binding);
        Ok(())
    }

    /// Find the binding covering an address, if any.
    #[must_use]
    pub fn lookup(&self, address: Paddr) -> Option<Binding> {
        let index = self.bindings.partition_point(|b| b.end < address);
        self.bindings
            .get(index)
            .filter(|b| b.start <= address && address <= b.end)
            .copied()
    }

    /// Iterate over the bindings in address order.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_selection() {
        assert_eq!(Lanes::lane(0x1000), Lanes::B0);
        assert_eq!(Lanes::lane(0x1001), Lanes::B1);
        assert_eq!(Lanes::lane(0x1002), Lanes::B2);
        assert_eq!(Lanes::lane(0x1003), Lanes::B3);

        assert!(Lanes::HI16.selected(0));
        assert!(Lanes::HI16.selected(1));
        assert!(!Lanes::HI16.selected(2));
        assert!(!Lanes::HI16.selected(3));
    }

    #[test]
    fn byte_lanes_are_big_endian() {
        let mut data = 0x1122_3344;
        assert_eq!(get_byte(data, 0), 0x11);
        assert_eq!(get_byte(data, 3), 0x44);

        set_byte(&mut data, 1, 0xff);
        assert_eq!(data, 0x11ff_3344);
    }

    #[test]
    fn bind_and_lookup() {
        let mut map = MemoryMap::default();
        map.bind(0x0000_0000, 0x007f_ffff, Lanes::WORD, Slot::Ram)
            .unwrap();
        map.bind(0x1f88_0000, 0x1f88_0003, Lanes::LO16, Slot::CpuConfig)
            .unwrap();

        assert_eq!(map.lookup(0x0000_0000).unwrap().slot, Slot::Ram);
        assert_eq!(map.lookup(0x007f_ffff).unwrap().slot, Slot::Ram);
        assert!(map.lookup(0x0080_0000).is_none());
        assert_eq!(map.lookup(0x1f88_0002).unwrap().slot, Slot::CpuConfig);
        assert!(map.lookup(0x1f88_0004).is_none());
    }

    #[test]
    fn bind_rejects_overlap() {
        let mut map = MemoryMap::default();
        map.bind(0x1000, 0x1fff, Lanes::WORD, Slot::Ram).unwrap();

        let err = map
            .bind(0x1fff, 0x2fff, Lanes::WORD, Slot::BootRom)
            .unwrap_err();
        assert!(matches!(err, MapError::Overlap { .. }));
    }

    #[test]
    fn bind_rejects_reversed_bounds() {
        let mut map = MemoryMap::default();
        let err = map
            .bind(0x2000, 0x1000, Lanes::WORD, Slot::Ram)
            .unwrap_err();
        assert!(matches!(err, MapError::ReversedBounds { .. }));
    }
}
