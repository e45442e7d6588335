//! Z80 flag register bits.

/// Sign flag (bit 7) - set if result is negative.
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6) - set if result is zero.
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5) - copy of bit 5 of result.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4) - carry from bit 3 to bit 4.
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3) - copy of bit 3 of result.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2) - parity or overflow depending on instruction.
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1) - set if last operation was subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7.
pub const CF: u8 = 0b0000_0001;

/// S, Z and the two undocumented bits of a result.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let zero = if value == 0 { ZF } else { 0 };
    (value & (SF | YF | XF)) | zero
}

/// `sz53` plus even parity in P/V.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    let parity = if value.count_ones() % 2 == 0 { PF } else { 0 };
    sz53(value) | parity
}

/// Evaluate condition code `cc` (NZ, Z, NC, C, PO, PE, P, M) against `f`.
#[must_use]
pub const fn condition(f: u8, cc: u8) -> bool {
    match cc & 7 {
        0 => f & ZF == 0,
        1 => f & ZF != 0,
        2 => f & CF == 0,
        3 => f & CF != 0,
        4 => f & PF == 0,
        5 => f & PF != 0,
        6 => f & SF == 0,
        _ => f & SF != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sz53p_of_zero() {
        assert_eq!(sz53p(0), ZF | PF);
    }

    #[test]
    fn sz53_copies_undocumented_bits() {
        assert_eq!(sz53(0xA8), SF | YF | XF);
        assert_eq!(sz53p(0x01), 0);
    }

    #[test]
    fn conditions() {
        assert!(condition(ZF, 1));
        assert!(!condition(ZF, 0));
        assert!(condition(0, 2));
        assert!(condition(SF, 7));
        assert!(condition(PF, 5));
    }
}
