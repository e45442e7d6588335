//! Unprefixed opcodes, with DD/FD substitution of HL.

#![allow(clippy::cast_possible_wrap)] // Displacements are signed bytes.
#![allow(clippy::cast_sign_loss)]

use super::Z80;
use crate::alu::{self, AluOp};
use crate::cell::CoreByte;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, condition};
use crate::host::Host;
use crate::registers::{Index, high, low};

impl<C: CoreByte> Z80<C> {
    /// Fetch and execute one complete instruction, prefixes included.
    pub(super) fn execute<H: Host<C>>(&mut self, host: &mut H) {
        let op = self.fetch_opcode();
        match op {
            0xCB => self.execute_cb(),
            0xED => self.execute_ed(host),
            0xDD => self.execute_indexed(host, Index::Ix),
            0xFD => self.execute_indexed(host, Index::Iy),
            _ => self.execute_main(host, op, Index::Hl),
        }
    }

    /// 8-bit register by its 3-bit code. H and L follow `idx`.
    pub(super) fn reg8(&self, r: u8, idx: Index) -> u8 {
        let regs = &self.regs;
        match (r & 7, idx) {
            (0, _) => regs.b(),
            (1, _) => regs.c(),
            (2, _) => regs.d(),
            (3, _) => regs.e(),
            (4, Index::Hl) => regs.h(),
            (4, Index::Ix) => regs.ixh(),
            (4, Index::Iy) => regs.iyh(),
            (5, Index::Hl) => regs.l(),
            (5, Index::Ix) => regs.ixl(),
            (5, Index::Iy) => regs.iyl(),
            (7, _) => regs.a(),
            _ => unreachable!("(HL) is not a register"),
        }
    }

    pub(super) fn set_reg8(&mut self, r: u8, idx: Index, value: u8) {
        let regs = &mut self.regs;
        match (r & 7, idx) {
            (0, _) => regs.set_b(value),
            (1, _) => regs.set_c(value),
            (2, _) => regs.set_d(value),
            (3, _) => regs.set_e(value),
            (4, Index::Hl) => regs.set_h(value),
            (4, Index::Ix) => regs.set_ixh(value),
            (4, Index::Iy) => regs.set_iyh(value),
            (5, Index::Hl) => regs.set_l(value),
            (5, Index::Ix) => regs.set_ixl(value),
            (5, Index::Iy) => regs.set_iyl(value),
            (7, _) => regs.set_a(value),
            _ => unreachable!("(HL) is not a register"),
        }
    }

    /// Register pair by its 2-bit code: BC, DE, HL/IX/IY, SP.
    pub(super) fn reg16(&self, p: u8, idx: Index) -> u16 {
        match p & 3 {
            0 => self.regs.bc,
            1 => self.regs.de,
            2 => self.regs.index(idx),
            _ => self.regs.sp,
        }
    }

    pub(super) fn set_reg16(&mut self, p: u8, idx: Index, value: u16) {
        match p & 3 {
            0 => self.regs.bc = value,
            1 => self.regs.de = value,
            2 => self.regs.set_index(idx, value),
            _ => self.regs.sp = value,
        }
    }

    /// Address of the `(HL)` operand. Under DD/FD this reads the
    /// displacement and spends the 5 T-states of the address add.
    fn operand_address(&mut self, idx: Index) -> u16 {
        match idx {
            Index::Hl => self.regs.hl,
            _ => {
                let d = self.imm8() as i8;
                self.internal(5);
                let address = self.regs.index(idx).wrapping_add_signed(i16::from(d));
                self.regs.wz = address;
                address
            }
        }
    }

    fn alu_a(&mut self, y: u8, value: u8) {
        let (a, f) = alu::accumulate(AluOp::from_bits(y), self.regs.a(), value, self.regs.f());
        self.regs.set_a(a);
        self.regs.set_f(f);
    }

    fn carry(&self) -> bool {
        self.regs.f() & CF != 0
    }

    /// Relative jump by the displacement byte just fetched.
    fn jump_relative(&mut self, d: u8) {
        self.internal(5);
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(d as i8));
        self.regs.wz = self.regs.pc;
    }

    pub(super) fn execute_main<H: Host<C>>(&mut self, host: &mut H, op: u8, idx: Index) {
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;

        match op {
            // NOP
            0x00 => {}

            // EX AF, AF'
            0x08 => self.regs.ex_af(),

            // DJNZ e
            0x10 => {
                self.internal(1);
                let d = self.imm8();
                let b = self.regs.b().wrapping_sub(1);
                self.regs.set_b(b);
                if b != 0 {
                    self.jump_relative(d);
                }
            }

            // JR e
            0x18 => {
                let d = self.imm8();
                self.jump_relative(d);
            }

            // JR cc, e (NZ, Z, NC, C)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let d = self.imm8();
                if condition(self.regs.f(), y - 4) {
                    self.jump_relative(d);
                }
            }

            // LD rr, nn (01=BC, 11=DE, 21=HL, 31=SP)
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.imm16();
                self.set_reg16(p, idx, value);
            }

            // ADD HL, rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.internal(7);
                let hl = self.regs.index(idx);
                let (result, flags) = alu::add16(hl, self.reg16(p, idx));
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_index(idx, result);
                let f = (self.regs.f() & (SF | ZF | PF)) | flags;
                self.regs.set_f(f);
            }

            // LD (BC), A / LD (DE), A
            0x02 | 0x12 => {
                let address = if op == 0x02 { self.regs.bc } else { self.regs.de };
                let a = self.regs.a();
                self.write(address, a);
                self.regs.wz = (u16::from(a) << 8) | (address.wrapping_add(1) & 0xFF);
            }

            // LD A, (BC) / LD A, (DE)
            0x0A | 0x1A => {
                let address = if op == 0x0A { self.regs.bc } else { self.regs.de };
                let value = self.read(address);
                self.regs.set_a(value);
                self.regs.wz = address.wrapping_add(1);
            }

            // LD (nn), HL
            0x22 => {
                let address = self.imm16();
                self.write16(address, self.regs.index(idx));
                self.regs.wz = address.wrapping_add(1);
            }

            // LD HL, (nn)
            0x2A => {
                let address = self.imm16();
                let value = self.read16(address);
                self.regs.set_index(idx, value);
                self.regs.wz = address.wrapping_add(1);
            }

            // LD (nn), A
            0x32 => {
                let address = self.imm16();
                let a = self.regs.a();
                self.write(address, a);
                self.regs.wz = (u16::from(a) << 8) | (address.wrapping_add(1) & 0xFF);
            }

            // LD A, (nn)
            0x3A => {
                let address = self.imm16();
                let value = self.read(address);
                self.regs.set_a(value);
                self.regs.wz = address.wrapping_add(1);
            }

            // INC rr
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.internal(2);
                let value = self.reg16(p, idx).wrapping_add(1);
                self.set_reg16(p, idx, value);
            }

            // DEC rr
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.internal(2);
                let value = self.reg16(p, idx).wrapping_sub(1);
                self.set_reg16(p, idx, value);
            }

            // INC (HL) / DEC (HL)
            0x34 | 0x35 => {
                let address = self.operand_address(idx);
                let value = self.read(address);
                self.internal(1);
                let (result, flags) = if op == 0x34 {
                    alu::inc8(value)
                } else {
                    alu::dec8(value)
                };
                self.write(address, result);
                let f = (self.regs.f() & CF) | flags;
                self.regs.set_f(f);
            }

            // INC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let (result, flags) = alu::inc8(self.reg8(y, idx));
                self.set_reg8(y, idx, result);
                let f = (self.regs.f() & CF) | flags;
                self.regs.set_f(f);
            }

            // DEC r
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let (result, flags) = alu::dec8(self.reg8(y, idx));
                self.set_reg8(y, idx, result);
                let f = (self.regs.f() & CF) | flags;
                self.regs.set_f(f);
            }

            // LD (HL), n
            0x36 => {
                let address = match idx {
                    Index::Hl => self.regs.hl,
                    _ => {
                        // The displacement comes before n; the add overlaps
                        // the operand read.
                        let d = self.imm8() as i8;
                        let address = self.regs.index(idx).wrapping_add_signed(i16::from(d));
                        self.regs.wz = address;
                        address
                    }
                };
                let n = self.imm8();
                if idx != Index::Hl {
                    self.internal(2);
                }
                self.write(address, n);
            }

            // LD r, n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let n = self.imm8();
                self.set_reg8(y, idx, n);
            }

            // RLCA / RRCA / RLA / RRA
            0x07 | 0x0F | 0x17 | 0x1F => {
                let (result, flags) = alu::shift(y, self.regs.a(), self.carry());
                self.regs.set_a(result);
                let f = (self.regs.f() & (SF | ZF | PF)) | (result & (YF | XF)) | (flags & CF);
                self.regs.set_f(f);
            }

            // DAA
            0x27 => {
                let (a, f) = alu::daa(self.regs.a(), self.regs.f());
                self.regs.set_a(a);
                self.regs.set_f(f);
            }

            // CPL
            0x2F => {
                let a = !self.regs.a();
                self.regs.set_a(a);
                let f = (self.regs.f() & (SF | ZF | PF | CF)) | HF | NF | (a & (YF | XF));
                self.regs.set_f(f);
            }

            // SCF
            0x37 => {
                let a = self.regs.a();
                let f = (self.regs.f() & (SF | ZF | PF)) | CF | (a & (YF | XF));
                self.regs.set_f(f);
            }

            // CCF: H takes the old carry.
            0x3F => {
                let old = self.regs.f();
                let mut f = (old & (SF | ZF | PF)) | (self.regs.a() & (YF | XF));
                if old & CF != 0 {
                    f |= HF;
                } else {
                    f |= CF;
                }
                self.regs.set_f(f);
            }

            // HALT
            0x76 => self.halted = true,

            // LD r, r'
            0x40..=0x7F => {
                if y == 6 {
                    let address = self.operand_address(idx);
                    let value = self.reg8(z, Index::Hl);
                    self.write(address, value);
                } else if z == 6 {
                    let address = self.operand_address(idx);
                    let value = self.read(address);
                    self.set_reg8(y, Index::Hl, value);
                } else {
                    let value = self.reg8(z, idx);
                    self.set_reg8(y, idx, value);
                }
            }

            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP A, r
            0x80..=0xBF => {
                let value = if z == 6 {
                    let address = self.operand_address(idx);
                    self.read(address)
                } else {
                    self.reg8(z, idx)
                };
                self.alu_a(y, value);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                self.internal(1);
                if condition(self.regs.f(), y) {
                    self.regs.pc = self.pop();
                    self.regs.wz = self.regs.pc;
                }
            }

            // POP rr (C1=BC, D1=DE, E1=HL, F1=AF)
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop();
                if p == 3 {
                    self.regs.af = value;
                } else {
                    self.set_reg16(p, idx, value);
                }
            }

            // RET
            0xC9 => {
                self.regs.pc = self.pop();
                self.regs.wz = self.regs.pc;
            }

            // EXX
            0xD9 => self.regs.exx(),

            // JP (HL)
            0xE9 => self.regs.pc = self.regs.index(idx),

            // LD SP, HL
            0xF9 => {
                self.internal(2);
                self.regs.sp = self.regs.index(idx);
            }

            // JP cc, nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let address = self.imm16();
                self.regs.wz = address;
                if condition(self.regs.f(), y) {
                    self.regs.pc = address;
                }
            }

            // JP nn
            0xC3 => {
                self.regs.pc = self.imm16();
                self.regs.wz = self.regs.pc;
            }

            // OUT (n), A
            0xD3 => {
                let n = self.imm8();
                let a = self.regs.a();
                let port = (u16::from(a) << 8) | u16::from(n);
                self.port_out(host, port, a);
                self.regs.wz = (u16::from(a) << 8) | u16::from(n.wrapping_add(1));
            }

            // IN A, (n)
            0xDB => {
                let n = self.imm8();
                let port = (u16::from(self.regs.a()) << 8) | u16::from(n);
                let value = self.port_in(host, port);
                self.regs.set_a(value);
                self.regs.wz = port.wrapping_add(1);
            }

            // EX (SP), HL
            0xE3 => {
                let sp = self.regs.sp;
                let lo = self.read(sp);
                let hi = self.read(sp.wrapping_add(1));
                self.internal(1);
                let old = self.regs.index(idx);
                self.write(sp.wrapping_add(1), high(old));
                self.write(sp, low(old));
                self.internal(2);
                let value = u16::from(lo) | (u16::from(hi) << 8);
                self.regs.set_index(idx, value);
                self.regs.wz = value;
            }

            // EX DE, HL (never affected by DD/FD)
            0xEB => std::mem::swap(&mut self.regs.de, &mut self.regs.hl),

            // DI
            0xF3 => self.regs.set_iffs(false),

            // EI
            0xFB => {
                self.regs.set_iffs(true);
                self.ei_delay = true;
            }

            // CALL cc, nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let address = self.imm16();
                self.regs.wz = address;
                if condition(self.regs.f(), y) {
                    self.internal(1);
                    self.push(self.regs.pc);
                    self.regs.pc = address;
                }
            }

            // CALL nn
            0xCD => {
                let address = self.imm16();
                self.internal(1);
                self.push(self.regs.pc);
                self.regs.pc = address;
                self.regs.wz = address;
            }

            // PUSH rr (C5=BC, D5=DE, E5=HL, F5=AF)
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                self.internal(1);
                let value = if p == 3 {
                    self.regs.af
                } else {
                    self.reg16(p, idx)
                };
                self.push(value);
            }

            // ALU A, n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let n = self.imm8();
                self.alu_a(y, n);
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.internal(1);
                self.push(self.regs.pc);
                self.regs.pc = u16::from(y) * 8;
                self.regs.wz = self.regs.pc;
            }

            0xCB | 0xDD | 0xED | 0xFD => unreachable!("prefix {op:#04X} reached the main table"),
        }
    }
}
