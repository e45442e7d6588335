//! ALU operations for the Z80.
//!
//! Functions are pure: they take operands plus whatever flags they depend on
//! and return the result with the complete new flag byte (or, for the 16-bit
//! adds that leave S/Z/P alone, only the bits they define).

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

/// The eight accumulator operations, in opcode order (bits 3-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    /// Decode from the `yyy` field of `10yyyzzz` / `11yyy110`.
    #[must_use]
    pub const fn from_bits(y: u8) -> Self {
        match y & 7 {
            0 => Self::Add,
            1 => Self::Adc,
            2 => Self::Sub,
            3 => Self::Sbc,
            4 => Self::And,
            5 => Self::Xor,
            6 => Self::Or,
            _ => Self::Cp,
        }
    }
}

/// Apply `op` to A and `value`. Returns the new A and F.
///
/// `Cp` leaves A unchanged.
#[must_use]
pub fn accumulate(op: AluOp, a: u8, value: u8, f: u8) -> (u8, u8) {
    let carry = f & CF != 0;
    match op {
        AluOp::Add => add8(a, value, false),
        AluOp::Adc => add8(a, value, carry),
        AluOp::Sub => sub8(a, value, false),
        AluOp::Sbc => sub8(a, value, carry),
        AluOp::And => {
            let result = a & value;
            (result, sz53p(result) | HF)
        }
        AluOp::Xor => {
            let result = a ^ value;
            (result, sz53p(result))
        }
        AluOp::Or => {
            let result = a | value;
            (result, sz53p(result))
        }
        AluOp::Cp => {
            let (_, flags) = sub8(a, value, false);
            // X and Y come from the operand, not the difference.
            (a, (flags & !(YF | XF)) | (value & (YF | XF)))
        }
    }
}

/// 8-bit add with optional carry in.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> (u8, u8) {
    let wide = u16::from(a) + u16::from(b) + u16::from(carry);
    let result = wide as u8;
    let mut flags = sz53(result) | ((a ^ b ^ result) & HF);
    if (a ^ !b) & (a ^ result) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }
    (result, flags)
}

/// 8-bit subtract with optional borrow in.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> (u8, u8) {
    let wide = u16::from(a)
        .wrapping_sub(u16::from(b))
        .wrapping_sub(u16::from(carry));
    let result = wide as u8;
    let mut flags = NF | sz53(result) | ((a ^ b ^ result) & HF);
    if (a ^ b) & (a ^ result) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }
    (result, flags)
}

/// INC r. Carry is not produced; the caller keeps the old one.
#[must_use]
pub fn inc8(value: u8) -> (u8, u8) {
    let result = value.wrapping_add(1);
    let mut flags = sz53(result);
    if value & 0x0F == 0x0F {
        flags |= HF;
    }
    if value == 0x7F {
        flags |= PF;
    }
    (result, flags)
}

/// DEC r. Carry is not produced; the caller keeps the old one.
#[must_use]
pub fn dec8(value: u8) -> (u8, u8) {
    let result = value.wrapping_sub(1);
    let mut flags = NF | sz53(result);
    if value & 0x0F == 0 {
        flags |= HF;
    }
    if value == 0x80 {
        flags |= PF;
    }
    (result, flags)
}

/// CB-prefix rotate/shift selected by `op` (RLC RRC RL RR SLA SRA SLL SRL).
#[must_use]
pub fn shift(op: u8, value: u8, carry_in: bool) -> (u8, u8) {
    let (result, carry_out) = match op & 7 {
        0 => (value.rotate_left(1), value & 0x80 != 0),
        1 => (value.rotate_right(1), value & 0x01 != 0),
        2 => ((value << 1) | u8::from(carry_in), value & 0x80 != 0),
        3 => ((value >> 1) | (u8::from(carry_in) << 7), value & 0x01 != 0),
        4 => (value << 1, value & 0x80 != 0),
        5 => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
        6 => ((value << 1) | 1, value & 0x80 != 0),
        _ => (value >> 1, value & 0x01 != 0),
    };
    (result, sz53p(result) | if carry_out { CF } else { 0 })
}

/// Flags for `BIT n,value`. X/Y come from `xy_source`, which is the operand
/// for registers and the high byte of WZ for memory forms.
#[must_use]
pub const fn bit(n: u8, value: u8, xy_source: u8, f: u8) -> u8 {
    let tested = value & (1 << (n & 7));
    let mut flags = (f & CF) | HF | (xy_source & (YF | XF));
    if tested == 0 {
        flags |= ZF | PF;
    }
    if tested & 0x80 != 0 {
        flags |= SF;
    }
    flags
}

/// ADD HL,rr (also IX/IY). Returns the sum and the H, C, X and Y bits only.
#[must_use]
pub fn add16(a: u16, b: u16) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let result = wide as u16;
    let mut flags = ((result >> 8) as u8) & (YF | XF);
    if (a ^ b ^ result) & 0x1000 != 0 {
        flags |= HF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    (result, flags)
}

/// ADC HL,rr with full flags.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b) + u32::from(carry);
    let result = wide as u16;
    let mut flags = wide16_flags(result) | (((a ^ b ^ result) >> 8) as u8 & HF);
    if (a ^ !b) & (a ^ result) & 0x8000 != 0 {
        flags |= PF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    (result, flags)
}

/// SBC HL,rr with full flags.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let wide = u32::from(a)
        .wrapping_sub(u32::from(b))
        .wrapping_sub(u32::from(carry));
    let result = wide as u16;
    let mut flags = NF | wide16_flags(result) | (((a ^ b ^ result) >> 8) as u8 & HF);
    if (a ^ b) & (a ^ result) & 0x8000 != 0 {
        flags |= PF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    (result, flags)
}

fn wide16_flags(result: u16) -> u8 {
    let high = (result >> 8) as u8;
    let mut flags = high & (SF | YF | XF);
    if result == 0 {
        flags |= ZF;
    }
    flags
}

/// Decimal adjust A after BCD add or subtract.
#[must_use]
pub fn daa(a: u8, f: u8) -> (u8, u8) {
    let low_nibble = a & 0x0F;
    let mut correction = 0;
    let mut carry = f & CF != 0;

    if f & HF != 0 || low_nibble > 9 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry = true;
    }

    let subtract = f & NF != 0;
    let result = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    let half = if subtract {
        f & HF != 0 && low_nibble < 6
    } else {
        low_nibble > 9
    };

    let mut flags = sz53p(result) | (f & NF);
    if half {
        flags |= HF;
    }
    if carry {
        flags |= CF;
    }
    (result, flags)
}
