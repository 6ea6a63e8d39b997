//! Local I/O interrupt aggregation.
//!
//! Eight source slots share one CPU interrupt input. The sources are wired
//! active-low: each bit of the status register holds the last reported wire
//! state of its slot, and the combined line asserts only when the register
//! reads zero. Slots 3 and 5 are unused and stay permanently high.

use parse_display::Display;
use tracing::debug;

/// Named local I/O interrupt sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum LioSource {
    Duart0 = 0,
    Duart1 = 1,
    Duart2 = 2,
    Scsi = 4,
    Mailbox = 6,
    AcFail = 7,
}

/// Aggregates the local I/O interrupt sources into the shared CPU line.
#[derive(Debug)]
pub struct LioAggregator {
    /// One bit per source slot; bit set means the source is inactive.
    isr: u8,

    /// Latched combined line state.
    line: bool,
}

impl Default for LioAggregator {
    fn default() -> Self {
        // All sources idle high at power-on.
        Self {
            isr: 0xff,
            line: false,
        }
    }
}

impl LioAggregator {
    /// Record the wire state of one source slot.
    ///
    /// A device asserting its (active-low) interrupt output reports
    /// `false`. Returns the new combined line state when it changed, so the
    /// CPU input is toggled exactly once per net transition.
    pub(crate) fn report(&mut self, slot: u8, state: bool) -> Option<bool> {
        if state {
            self.isr |= 1 << slot;
        } else {
            self.isr &= !(1 << slot);
        }

        let line = self.isr == 0;
        if line == self.line {
            return None;
        }

        self.line = line;
        debug!(line, "local i/o interrupt");
        Some(line)
    }

    /// The raw status register, as read from the bus.
    #[must_use]
    pub fn status(&self) -> u8 {
        self.isr
    }

    /// Latched combined line state.
    #[must_use]
    pub fn line(&self) -> bool {
        self.line
    }

    /// Machine reset: all sources idle, line released. Returns `Some(false)`
    /// when the line was asserted and must be dropped on the CPU input.
    pub(crate) fn reset(&mut self) -> Option<bool> {
        self.isr = 0xff;
        if self.line {
            self.line = false;
            Some(false)
        } else {
            None
        }
    }
}
