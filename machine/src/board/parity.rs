//! Transparent memory parity fault injection and detection.
//!
//! The layer sits in front of main memory. A shadow bitmap, one bit per RAM
//! byte, tracks which bytes currently carry wrong parity. The bitmap only
//! exists while the diagnostic is in use: it is allocated when fault
//! injection is first armed and freed once every bad byte has been
//! rewritten, so the normal RAM path stays a no-op.

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::bus::Lanes;
use crate::constants::{Paddr, PARITY_WINDOW};

bitflags! {
    /// Parity error status register.
    ///
    /// The low nibble identifies the bus master that hit the fault, the
    /// high nibble the offending byte lanes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParityStatus: u8 {
        const LAN  = 0x01;
        const DMA  = 0x02;
        const CPU  = 0x04;
        const VME  = 0x08;
        const B3   = 0x10;
        const B2   = 0x20;
        const B1   = 0x40;
        const B0   = 0x80;

        /// All four byte lane bits.
        const BYTES = 0xf0;
    }
}

/// The parity fault layer in front of main memory.
#[derive(Debug, Default)]
pub struct ParityLayer {
    /// One bit per RAM byte, set while that byte's stored parity is wrong.
    shadow: Option<Box<[u8]>>,

    /// Number of bits currently set in the shadow bitmap.
    bad: u32,

    /// Check mode: reads of bad bytes raise a bus error.
    check: bool,

    /// Inject mode: writes mark the written bytes bad.
    inject: bool,

    status: ParityStatus,
    error_address: Paddr,
}

impl ParityLayer {
    /// Arm or disarm check mode (reads of bad bytes fault).
    pub(crate) fn set_check(&mut self, enable: bool) {
        debug!(enable, "parity checking");
        self.check = enable;
    }

    /// Arm or disarm inject mode (writes mark bytes bad).
    ///
    /// Arming allocates the shadow bitmap if none exists. Disarming does
    /// not free it; the bitmap drains through the normal write path.
    pub(crate) fn set_inject(&mut self, enable: bool) {
        debug!(enable, "write bad parity");
        self.inject = enable;

        if enable && self.shadow.is_none() {
            debug!(window = PARITY_WINDOW, "bad parity activated");
            self.shadow = Some(vec![0; (PARITY_WINDOW >> 3) as usize].into_boxed_slice());
        }
    }

    /// Check a RAM read at a word-aligned address.
    ///
    /// Returns `true` when any selected lane holds a byte with wrong
    /// parity; the faulting address and the offending lanes are latched in
    /// the status register.
    pub(crate) fn check_read(&mut self, address: Paddr, lanes: Lanes) -> bool {
        if !self.check {
            return false;
        }

        let Some(shadow) = self.shadow.as_deref() else {
            return false;
        };

        let mut hit = ParityStatus::empty();
        for byte in 0..4 {
            let p = address as usize + byte;
            if lanes.selected(byte) && shadow[p >> 3] & (1 << (p & 7)) != 0 {
                hit |= ParityStatus::from_bits_truncate(ParityStatus::B0.bits() >> byte);
                trace!(address = p, "bad parity hit");
            }
        }

        if hit.is_empty() {
            return false;
        }

        self.status |= hit | ParityStatus::CPU;
        self.error_address = address;
        true
    }

    /// Observe a RAM write at a word-aligned address.
    ///
    /// With inject mode armed, every selected byte is marked bad; otherwise
    /// every selected bad byte heals. The shadow bitmap is freed the moment
    /// the bad-byte count drains to zero.
    pub(crate) fn observe_write(&mut self, address: Paddr, lanes: Lanes) {
        let Some(shadow) = self.shadow.as_deref_mut() else {
            return;
        };

        if self.inject {
            for byte in 0..4 {
                let p = address as usize + byte;
                if lanes.selected(byte) && shadow[p >> 3] & (1 << (p & 7)) == 0 {
                    shadow[p >> 3] |= 1 << (p & 7);
                    self.bad += 1;
                    trace!(address = p, count = self.bad, "bad parity set");
                }
            }
        } else {
            for byte in 0..4 {
                let p = address as usize + byte;
                if lanes.selected(byte) && shadow[p >> 3] & (1 << (p & 7)) != 0 {
                    shadow[p >> 3] &= !(1 << (p & 7));
                    self.bad -= 1;
                    trace!(address = p, count = self.bad, "bad parity cleared");
                }
            }

            if self.bad == 0 {
                debug!("bad parity deactivated");
                self.shadow = None;
            }
        }
    }

    /// Acknowledge one error source: clears all four lane bits plus the
    /// indexed source bit.
    pub(crate) fn acknowledge(&mut self, source: usize) {
        self.status &=
            !(ParityStatus::BYTES | ParityStatus::from_bits_truncate(1 << (source & 7)));
    }

    /// The status register as read from the bus, with the lane bits
    /// inverted.
    #[must_use]
    pub fn inverted_status(&self) -> u8 {
        (self.status ^ ParityStatus::BYTES).bits()
    }

    #[must_use]
    pub fn status(&self) -> ParityStatus {
        self.status
    }

    /// Last physical address that raised a parity fault.
    #[must_use]
    pub fn error_address(&self) -> Paddr {
        self.error_address
    }

    /// Number of bytes currently marked bad.
    #[must_use]
    pub fn bad_bytes(&self) -> u32 {
        self.bad
    }

    /// Whether the shadow bitmap is currently allocated.
    #[must_use]
    pub fn shadow_allocated(&self) -> bool {
        self.shadow.is_some()
    }

    /// Machine reset: clears the latched fault state. Mode armament and the
    /// shadow bitmap deliberately survive; the bitmap only drains through
    /// the write path.
    pub(crate) fn reset(&mut self) {
        self.status = ParityStatus::empty();
        self.error_address = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_shadow_is_a_no_op() {
        let mut parity = ParityLayer::default();
        parity.set_check(true);

        assert!(!parity.check_read(0x100, Lanes::WORD));
        parity.observe_write(0x100, Lanes::WORD);
        assert!(!parity.shadow_allocated());
        assert_eq!(parity.bad_bytes(), 0);
    }

    #[test]
    fn inject_then_check_faults_on_written_lanes() {
        let mut parity = ParityLayer::default();
        parity.set_inject(true);
        parity.set_check(true);

        parity.observe_write(0x2000, Lanes::B1);
        assert_eq!(parity.bad_bytes(), 1);

        // Only the written lane faults.
        assert!(!parity.check_read(0x2000, Lanes::B0 | Lanes::B2 | Lanes::B3));
        assert!(parity.check_read(0x2000, Lanes::WORD));

        assert_eq!(parity.error_address(), 0x2000);
        assert_eq!(parity.status(), ParityStatus::B1 | ParityStatus::CPU);
    }

    #[test]
    fn injection_is_idempotent() {
        let mut parity = ParityLayer::default();
        parity.set_inject(true);

        for _ in 0..5 {
            parity.observe_write(0x40, Lanes::WORD);
        }

        assert_eq!(parity.bad_bytes(), 4);
    }

    #[test]
    fn check_without_arming_never_faults() {
        let mut parity = ParityLayer::default();
        parity.set_inject(true);
        parity.observe_write(0x40, Lanes::WORD);

        assert!(!parity.check_read(0x40, Lanes::WORD));
        assert_eq!(parity.status(), ParityStatus::empty());
    }

    #[test]
    fn healing_every_byte_frees_the_shadow() {
        let mut parity = ParityLayer::default();
        parity.set_inject(true);
        parity.set_check(true);

        parity.observe_write(0x1000, Lanes::WORD);
        parity.observe_write(0x2000, Lanes::B3);
        assert_eq!(parity.bad_bytes(), 5);

        parity.set_inject(false);
        assert!(parity.shadow_allocated());

        parity.observe_write(0x1000, Lanes::WORD);
        assert_eq!(parity.bad_bytes(), 1);
        assert!(parity.shadow_allocated());

        parity.observe_write(0x2000, Lanes::B3);
        assert_eq!(parity.bad_bytes(), 0);
        assert!(!parity.shadow_allocated());

        // Back on the fast path: no residual faults.
        assert!(!parity.check_read(0x1000, Lanes::WORD));
    }

    #[test]
    fn rearming_keeps_the_existing_shadow() {
        let mut parity = ParityLayer::default();
        parity.set_inject(true);
        parity.observe_write(0x0, Lanes::B0);
        assert_eq!(parity.bad_bytes(), 1);

        parity.set_inject(false);
        parity.set_inject(true);
        assert!(parity.shadow_allocated());
        assert_eq!(parity.bad_bytes(), 1);
    }

    #[test]
    fn acknowledge_clears_lane_bits_and_one_source() {
        let mut parity = ParityLayer::default();
        parity.set_inject(true);
        parity.set_check(true);
        parity.observe_write(0x10, Lanes::WORD);
        assert!(parity.check_read(0x10, Lanes::WORD));

        parity.acknowledge(2);
        assert_eq!(parity.status(), ParityStatus::empty());

        // The inverted read shows the lane bits set when idle.
        assert_eq!(parity.inverted_status(), 0xf0);
    }

    #[test]
    fn reset_clears_faults_but_keeps_the_shadow() {
        let mut parity = ParityLayer::default();
        parity.set_inject(true);
        parity.set_check(true);
        parity.observe_write(0x10, Lanes::B0);
        assert!(parity.check_read(0x10, Lanes::B0));

        parity.reset();

        assert_eq!(parity.status(), ParityStatus::empty());
        assert_eq!(parity.error_address(), 0);
        assert!(parity.shadow_allocated());
        assert_eq!(parity.bad_bytes(), 1);

        // Still armed: the fault is detected again on the next read.
        assert!(parity.check_read(0x10, Lanes::B0));
    }
}
