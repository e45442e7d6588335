//! `run()` options and exit reasons.

use std::ops::{BitOr, BitOrAssign};

/// Flags altering when `run()` hands control back to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunOptions(u32);

impl RunOptions {
    /// Free run until the horizon.
    pub const NONE: Self = Self(0);
    /// Return after one instruction or interrupt acknowledge.
    pub const SINGLE_STEP: Self = Self(1 << 0);
    /// Stop before an opcode whose cell carries `TAG_BREAK_EXECUTE`.
    pub const BREAK_EXECUTE: Self = Self(1 << 1);
    /// Stop after an instruction that read a cell tagged `TAG_BREAK_READ`.
    pub const BREAK_READ: Self = Self(1 << 2);
    /// Stop after an instruction that wrote a cell tagged `TAG_BREAK_WRITE`.
    pub const BREAK_WRITE: Self = Self(1 << 3);
    /// Return as soon as a HALT instruction executes.
    pub const EXIT_ON_HALT: Self = Self(1 << 4);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for RunOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RunOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Which kind of breakpoint fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Execute,
    Read,
    Write,
}

/// A breakpoint hit reported by `run()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub kind: BreakKind,
    pub address: u16,
}

/// Why `run()` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The clock reached the exit horizon.
    Horizon,
    /// One step completed under `SINGLE_STEP`.
    Step,
    /// HALT executed under `EXIT_ON_HALT`.
    Halted,
    /// A tagged cell was hit.
    Breakpoint(Breakpoint),
}
