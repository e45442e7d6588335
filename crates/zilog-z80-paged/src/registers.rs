//! Z80 register file.
//!
//! Every pair is stored once as a `u16`. The 8-bit halves are computed with
//! shifts and masks, so a half written through one view is always visible
//! through the other, whatever the host byte order.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

/// High byte of a pair.
#[must_use]
pub const fn high(pair: u16) -> u8 {
    (pair >> 8) as u8
}

/// Low byte of a pair.
#[must_use]
pub const fn low(pair: u16) -> u8 {
    pair as u8
}

/// `pair` with its high byte replaced.
#[must_use]
pub const fn with_high(pair: u16, value: u8) -> u16 {
    (pair & 0x00FF) | ((value as u16) << 8)
}

/// `pair` with its low byte replaced.
#[must_use]
pub const fn with_low(pair: u16, value: u8) -> u16 {
    (pair & 0xFF00) | value as u16
}

macro_rules! halves {
    ($pair:ident: $hi:ident / $set_hi:ident, $lo:ident / $set_lo:ident) => {
        #[must_use]
        pub const fn $hi(&self) -> u8 {
            high(self.$pair)
        }

        pub fn $set_hi(&mut self, value: u8) {
            self.$pair = with_high(self.$pair, value);
        }

        #[must_use]
        pub const fn $lo(&self) -> u8 {
            low(self.$pair)
        }

        pub fn $set_lo(&mut self, value: u8) {
            self.$pair = with_low(self.$pair, value);
        }
    };
}

// Packed interrupt word: IFF1 in bit 0, IFF2 in bit 1, IM in bits 8-9.
const IFF1_BIT: u16 = 0x0001;
const IFF2_BIT: u16 = 0x0002;
const IM_SHIFT: u16 = 8;
const IM_MASK: u16 = 0x0300;

/// Z80 registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Registers {
    // Main set
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,

    // Alternate set
    pub af2: u16,
    pub bc2: u16,
    pub de2: u16,
    pub hl2: u16,

    // Index registers
    pub ix: u16,
    pub iy: u16,

    pub pc: u16,
    pub sp: u16,

    /// IFF1, IFF2 and interrupt mode.
    pub iff: u16,
    /// Interrupt vector (high) and refresh (low).
    pub ir: u16,

    /// WZ/MEMPTR - internal temporary register.
    /// Leaks into the undocumented X/Y flags of `BIT n,(HL)`.
    pub wz: u16,
}

impl Registers {
    /// Register values after a hardware reset.
    ///
    /// PC, I, R and the interrupt word are cleared; AF and SP read back as
    /// 0xFFFF on real silicon and everything else is left at the same value.
    #[must_use]
    pub const fn after_reset() -> Self {
        Self {
            af: 0xFFFF,
            bc: 0xFFFF,
            de: 0xFFFF,
            hl: 0xFFFF,
            af2: 0xFFFF,
            bc2: 0xFFFF,
            de2: 0xFFFF,
            hl2: 0xFFFF,
            ix: 0xFFFF,
            iy: 0xFFFF,
            pc: 0,
            sp: 0xFFFF,
            iff: 0,
            ir: 0,
            wz: 0,
        }
    }

    halves!(af: a / set_a, f / set_f);
    halves!(bc: b / set_b, c / set_c);
    halves!(de: d / set_d, e / set_e);
    halves!(hl: h / set_h, l / set_l);
    halves!(ix: ixh / set_ixh, ixl / set_ixl);
    halves!(iy: iyh / set_iyh, iyl / set_iyl);
    halves!(ir: i / set_i, r / set_r);

    /// Advance the refresh counter by one opcode fetch.
    ///
    /// Only the lower 7 bits count; bit 7 keeps whatever `LD R,A` put there.
    pub fn inc_r(&mut self) {
        let r = self.r();
        self.set_r((r & 0x80) | (r.wrapping_add(1) & 0x7F));
    }

    /// Advance the refresh counter by `n` opcode fetches.
    pub fn add_r(&mut self, n: u32) {
        let r = self.r();
        let counter = (u32::from(r) + n) as u8 & 0x7F;
        self.set_r((r & 0x80) | counter);
    }

    #[must_use]
    pub const fn iff1(&self) -> bool {
        self.iff & IFF1_BIT != 0
    }

    #[must_use]
    pub const fn iff2(&self) -> bool {
        self.iff & IFF2_BIT != 0
    }

    pub fn set_iff1(&mut self, on: bool) {
        if on {
            self.iff |= IFF1_BIT;
        } else {
            self.iff &= !IFF1_BIT;
        }
    }

    pub fn set_iff2(&mut self, on: bool) {
        if on {
            self.iff |= IFF2_BIT;
        } else {
            self.iff &= !IFF2_BIT;
        }
    }

    /// Set both interrupt flip-flops, as `EI` and `DI` do.
    pub fn set_iffs(&mut self, on: bool) {
        self.set_iff1(on);
        self.set_iff2(on);
    }

    /// Interrupt mode (0, 1 or 2).
    #[must_use]
    pub const fn im(&self) -> u8 {
        ((self.iff & IM_MASK) >> IM_SHIFT) as u8
    }

    pub fn set_im(&mut self, mode: u8) {
        debug_assert!(mode <= 2, "interrupt mode {mode} out of range");
        self.iff = (self.iff & !IM_MASK) | ((u16::from(mode) << IM_SHIFT) & IM_MASK);
    }

    /// Swap AF with AF'.
    pub fn ex_af(&mut self) {
        std::mem::swap(&mut self.af, &mut self.af2);
    }

    /// Swap BC, DE and HL with their alternates.
    pub fn exx(&mut self) {
        std::mem::swap(&mut self.bc, &mut self.bc2);
        std::mem::swap(&mut self.de, &mut self.de2);
        std::mem::swap(&mut self.hl, &mut self.hl2);
    }

    /// HL, IX or IY, depending on the active prefix.
    #[must_use]
    pub const fn index(&self, index: Index) -> u16 {
        match index {
            Index::Hl => self.hl,
            Index::Ix => self.ix,
            Index::Iy => self.iy,
        }
    }

    pub fn set_index(&mut self, index: Index, value: u16) {
        match index {
            Index::Hl => self.hl = value,
            Index::Ix => self.ix = value,
            Index::Iy => self.iy = value,
        }
    }
}

/// Which register stands in for HL in the current instruction.
///
/// `DD` selects IX and `FD` selects IY; H and L are then replaced by the
/// index halves and `(HL)` by `(IX+d)` / `(IY+d)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Hl,
    Ix,
    Iy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_compose_pair() {
        let mut regs = Registers::default();
        regs.set_c(0x34);
        regs.set_b(0x12);
        assert_eq!(regs.bc, 0x1234);

        regs.hl = 0xBEEF;
        assert_eq!(regs.h(), 0xBE);
        assert_eq!(regs.l(), 0xEF);
    }

    #[test]
    fn index_halves() {
        let mut regs = Registers::default();
        regs.ix = 0x8000;
        regs.set_ixl(0x7F);
        assert_eq!(regs.ix, 0x807F);
        regs.set_iyh(0xC0);
        assert_eq!(regs.iy, 0xC000);
    }

    #[test]
    fn refresh_keeps_bit_7() {
        let mut regs = Registers::default();
        regs.set_r(0xFF);
        regs.inc_r();
        assert_eq!(regs.r(), 0x80);

        regs.set_r(0x7E);
        regs.add_r(3);
        assert_eq!(regs.r(), 0x01);
    }

    #[test]
    fn interrupt_word_packs_flags_and_mode() {
        let mut regs = Registers::default();
        regs.set_iff1(true);
        regs.set_im(2);
        assert!(regs.iff1());
        assert!(!regs.iff2());
        assert_eq!(regs.im(), 2);

        regs.set_iffs(false);
        assert_eq!(regs.im(), 2);
        assert_eq!(regs.iff & 0x03, 0);
    }

    #[test]
    fn exchange_swaps_sets() {
        let mut regs = Registers::default();
        regs.af = 0x1111;
        regs.af2 = 0x2222;
        regs.hl = 0x3333;
        regs.ex_af();
        regs.exx();
        assert_eq!(regs.af, 0x2222);
        assert_eq!(regs.hl2, 0x3333);
        assert_eq!(regs.hl, 0);
    }
}
