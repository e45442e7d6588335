//! ED-prefixed opcodes.
//!
//! Unassigned ED opcodes execute as 8 T-state NOPs.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use super::Z80;
use crate::alu;
use crate::cell::CoreByte;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};
use crate::host::Host;
use crate::registers::Index;

impl<C: CoreByte> Z80<C> {
    pub(super) fn execute_ed<H: Host<C>>(&mut self, host: &mut H) {
        let op = self.fetch_opcode();
        let y = (op >> 3) & 7;
        let p = y >> 1;

        match op {
            // IN r, (C); ED 70 sets flags only
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let port = self.regs.bc;
                let value = self.port_in(host, port);
                if y != 6 {
                    self.set_reg8(y, Index::Hl, value);
                }
                let f = (self.regs.f() & CF) | sz53p(value);
                self.regs.set_f(f);
                self.regs.wz = port.wrapping_add(1);
            }

            // OUT (C), r; ED 71 outputs 0
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let port = self.regs.bc;
                let value = if y == 6 { 0 } else { self.reg8(y, Index::Hl) };
                self.port_out(host, port, value);
                self.regs.wz = port.wrapping_add(1);
            }

            // SBC HL, rr
            0x42 | 0x52 | 0x62 | 0x72 => {
                self.internal(7);
                let hl = self.regs.hl;
                let carry = self.regs.f() & CF != 0;
                let (result, f) = alu::sbc16(hl, self.reg16(p, Index::Hl), carry);
                self.regs.wz = hl.wrapping_add(1);
                self.regs.hl = result;
                self.regs.set_f(f);
            }

            // ADC HL, rr
            0x4A | 0x5A | 0x6A | 0x7A => {
                self.internal(7);
                let hl = self.regs.hl;
                let carry = self.regs.f() & CF != 0;
                let (result, f) = alu::adc16(hl, self.reg16(p, Index::Hl), carry);
                self.regs.wz = hl.wrapping_add(1);
                self.regs.hl = result;
                self.regs.set_f(f);
            }

            // LD (nn), rr
            0x43 | 0x53 | 0x63 | 0x73 => {
                let address = self.imm16();
                self.write16(address, self.reg16(p, Index::Hl));
                self.regs.wz = address.wrapping_add(1);
            }

            // LD rr, (nn)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let address = self.imm16();
                let value = self.read16(address);
                self.set_reg16(p, Index::Hl, value);
                self.regs.wz = address.wrapping_add(1);
            }

            // NEG (and mirrors)
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let (a, f) = alu::sub8(0, self.regs.a(), false);
                self.regs.set_a(a);
                self.regs.set_f(f);
            }

            // RETN / RETI (and mirrors): both restore IFF1 from IFF2
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                let iff2 = self.regs.iff2();
                self.regs.set_iff1(iff2);
                self.regs.pc = self.pop();
                self.regs.wz = self.regs.pc;
            }

            // IM 0 / IM 1 / IM 2
            0x46 | 0x4E | 0x66 | 0x6E => self.regs.set_im(0),
            0x56 | 0x76 => self.regs.set_im(1),
            0x5E | 0x7E => self.regs.set_im(2),

            // LD I, A
            0x47 => {
                self.internal(1);
                let a = self.regs.a();
                self.regs.set_i(a);
            }

            // LD R, A
            0x4F => {
                self.internal(1);
                let a = self.regs.a();
                self.regs.set_r(a);
            }

            // LD A, I / LD A, R: P/V reflects IFF2
            0x57 | 0x5F => {
                self.internal(1);
                let value = if op == 0x57 { self.regs.i() } else { self.regs.r() };
                self.regs.set_a(value);
                let mut f = (self.regs.f() & CF) | sz53(value);
                if self.regs.iff2() {
                    f |= PF;
                }
                self.regs.set_f(f);
            }

            // RRD / RLD
            0x67 | 0x6F => {
                let hl = self.regs.hl;
                let value = self.read(hl);
                self.internal(4);
                let a = self.regs.a();
                let (memory, result) = if op == 0x67 {
                    ((a << 4) | (value >> 4), (a & 0xF0) | (value & 0x0F))
                } else {
                    ((value << 4) | (a & 0x0F), (a & 0xF0) | (value >> 4))
                };
                self.write(hl, memory);
                self.regs.set_a(result);
                let f = (self.regs.f() & CF) | sz53p(result);
                self.regs.set_f(f);
                self.regs.wz = hl.wrapping_add(1);
            }

            // LDI / LDD / LDIR / LDDR
            0xA0 | 0xA8 | 0xB0 | 0xB8 => self.block_load(y),
            // CPI / CPD / CPIR / CPDR
            0xA1 | 0xA9 | 0xB1 | 0xB9 => self.block_compare(y),
            // INI / IND / INIR / INDR
            0xA2 | 0xAA | 0xB2 | 0xBA => self.block_in(host, y),
            // OUTI / OUTD / OTIR / OTDR
            0xA3 | 0xAB | 0xB3 | 0xBB => self.block_out(host, y),

            _ => {}
        }
    }

    /// Rewind PC over the two opcode bytes so the block instruction runs
    /// again: 5 extra T-states.
    fn repeat_block(&mut self) {
        self.internal(5);
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
    }

    fn block_load(&mut self, y: u8) {
        let step = block_step(y);
        let value = self.read(self.regs.hl);
        self.write(self.regs.de, value);
        self.internal(2);
        self.regs.hl = self.regs.hl.wrapping_add(step);
        self.regs.de = self.regs.de.wrapping_add(step);
        self.regs.bc = self.regs.bc.wrapping_sub(1);

        let n = value.wrapping_add(self.regs.a());
        let mut f = (self.regs.f() & (SF | ZF | CF)) | (n & XF) | ((n << 4) & YF);
        if self.regs.bc != 0 {
            f |= PF;
        }
        self.regs.set_f(f);

        if y >= 6 && self.regs.bc != 0 {
            self.repeat_block();
        }
    }

    fn block_compare(&mut self, y: u8) {
        let step = block_step(y);
        let value = self.read(self.regs.hl);
        self.internal(5);
        self.regs.hl = self.regs.hl.wrapping_add(step);
        self.regs.bc = self.regs.bc.wrapping_sub(1);
        self.regs.wz = self.regs.wz.wrapping_add(step);

        let a = self.regs.a();
        let result = a.wrapping_sub(value);
        let half = (a ^ value ^ result) & HF;
        let n = result.wrapping_sub(u8::from(half != 0));
        let mut f = (self.regs.f() & CF)
            | NF
            | half
            | (sz53(result) & (SF | ZF))
            | (n & XF)
            | ((n << 4) & YF);
        if self.regs.bc != 0 {
            f |= PF;
        }
        self.regs.set_f(f);

        if y >= 6 && self.regs.bc != 0 && result != 0 {
            self.repeat_block();
        }
    }

    fn block_in<H: Host<C>>(&mut self, host: &mut H, y: u8) {
        let step = block_step(y);
        self.internal(1);
        let port = self.regs.bc;
        let value = self.port_in(host, port);
        self.write(self.regs.hl, value);
        self.regs.wz = port.wrapping_add(step);
        self.regs.hl = self.regs.hl.wrapping_add(step);
        let b = self.regs.b().wrapping_sub(1);
        self.regs.set_b(b);

        let k = u16::from(value) + u16::from(self.regs.c().wrapping_add(step as u8));
        self.regs.set_f(block_io_flags(value, b, k));

        if y >= 6 && b != 0 {
            self.repeat_block();
        }
    }

    fn block_out<H: Host<C>>(&mut self, host: &mut H, y: u8) {
        let step = block_step(y);
        self.internal(1);
        let value = self.read(self.regs.hl);
        let b = self.regs.b().wrapping_sub(1);
        self.regs.set_b(b);
        let port = self.regs.bc;
        self.port_out(host, port, value);
        self.regs.wz = port.wrapping_add(step);
        self.regs.hl = self.regs.hl.wrapping_add(step);

        let k = u16::from(value) + u16::from(self.regs.l());
        self.regs.set_f(block_io_flags(value, b, k));

        if y >= 6 && b != 0 {
            self.repeat_block();
        }
    }
}

/// +1 for the incrementing forms (y even), -1 for the decrementing ones.
const fn block_step(y: u8) -> u16 {
    if y & 1 == 0 { 1 } else { 0xFFFF }
}

/// Flags after INI/OUTI and friends. `k` is the transferred byte plus the
/// adjusted C (input) or L (output).
fn block_io_flags(value: u8, b: u8, k: u16) -> u8 {
    let mut f = sz53(b);
    if value & 0x80 != 0 {
        f |= NF;
    }
    if k > 0xFF {
        f |= HF | CF;
    }
    f | (sz53p((k as u8 & 7) ^ b) & PF)
}
