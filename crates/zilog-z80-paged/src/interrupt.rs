//! NMI edge latch.
//!
//! The NMI input is edge triggered. A rising edge owes exactly one service,
//! even if the line drops again before the CPU reaches an instruction
//! boundary, and holding the line high never owes a second one.

/// Line currently asserted.
const SET: u8 = 0b01;
/// Edge latched, service not yet delivered.
const OWED: u8 = 0b10;

/// Observable NMI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NmiState {
    /// No request since the line was last released and serviced.
    Idle,
    /// An edge is latched; the next instruction boundary services it.
    Pending,
    /// Serviced, but the line is still asserted.
    Held,
}

/// NMI flip-flop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nmi {
    bits: u8,
}

impl Nmi {
    /// Assert the line. Returns true if this was a new edge.
    pub fn set(&mut self) -> bool {
        let edge = self.bits == 0;
        if edge {
            self.bits = SET | OWED;
        }
        self.bits |= SET;
        edge
    }

    /// Release the line. A latched edge stays owed.
    pub fn clear(&mut self) {
        self.bits &= !SET;
    }

    /// Consume the owed service, if any.
    pub fn take_pending(&mut self) -> bool {
        let owed = self.bits & OWED != 0;
        self.bits &= !OWED;
        owed
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.bits & OWED != 0
    }

    #[must_use]
    pub const fn state(&self) -> NmiState {
        if self.bits & OWED != 0 {
            NmiState::Pending
        } else if self.bits & SET != 0 {
            NmiState::Held
        } else {
            NmiState::Idle
        }
    }

    /// Raw encoding: bit 0 line set, bit 1 service owed.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    pub fn reset(&mut self) {
        self.bits = 0;
    }
}
