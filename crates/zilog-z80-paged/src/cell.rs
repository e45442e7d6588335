//! Memory cells.
//!
//! A cell backs one address. The CPU only ever sees the low byte; any wider
//! bits belong to the host, which typically uses them to tag addresses with
//! breakpoints.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use std::fmt::Debug;

/// Tag bit: stop before executing an opcode fetched from this cell.
pub const TAG_BREAK_EXECUTE: u32 = 0x0100;

/// Tag bit: stop after an instruction that read this cell as data.
pub const TAG_BREAK_READ: u32 = 0x0200;

/// Tag bit: stop after an instruction that wrote this cell.
pub const TAG_BREAK_WRITE: u32 = 0x0400;

/// Storage unit for one address.
///
/// Implemented for `u8` (no tags), `u16` and `u32` (tags in the upper bits).
pub trait CoreByte: Copy + Default + Debug + 'static {
    /// A cell holding `value` and no tags.
    fn from_byte(value: u8) -> Self;

    /// The CPU-visible byte.
    fn byte(self) -> u8;

    /// Replace the CPU-visible byte, keeping the tag bits.
    fn set_byte(&mut self, value: u8);

    /// Host tag bits, with the visible byte masked out.
    fn tags(self) -> u32;
}

impl CoreByte for u8 {
    fn from_byte(value: u8) -> Self {
        value
    }

    fn byte(self) -> u8 {
        self
    }

    fn set_byte(&mut self, value: u8) {
        *self = value;
    }

    fn tags(self) -> u32 {
        0
    }
}

impl CoreByte for u16 {
    fn from_byte(value: u8) -> Self {
        u16::from(value)
    }

    fn byte(self) -> u8 {
        self as u8
    }

    fn set_byte(&mut self, value: u8) {
        *self = (*self & 0xFF00) | u16::from(value);
    }

    fn tags(self) -> u32 {
        u32::from(self & 0xFF00)
    }
}

impl CoreByte for u32 {
    fn from_byte(value: u8) -> Self {
        u32::from(value)
    }

    fn byte(self) -> u8 {
        self as u8
    }

    fn set_byte(&mut self, value: u8) {
        *self = (*self & !0xFF) | u32::from(value);
    }

    fn tags(self) -> u32 {
        self & !0xFF
    }
}
