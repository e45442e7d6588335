//! CB-prefixed opcodes: rotates, shifts and bit operations.

use super::Z80;
use crate::alu;
use crate::cell::CoreByte;
use crate::flags::CF;
use crate::registers::{Index, high};

/// Result of a CB operation that writes back (everything except BIT).
pub(super) fn cb_result(op: u8, value: u8, carry: bool) -> (u8, Option<u8>) {
    let y = (op >> 3) & 7;
    match op >> 6 {
        0 => {
            let (result, flags) = alu::shift(y, value, carry);
            (result, Some(flags))
        }
        2 => (value & !(1 << y), None),
        _ => (value | (1 << y), None),
    }
}

impl<C: CoreByte> Z80<C> {
    pub(super) fn execute_cb(&mut self) {
        let op = self.fetch_opcode();
        let y = (op >> 3) & 7;
        let z = op & 7;
        let carry = self.regs.f() & CF != 0;

        // BIT n, r / BIT n, (HL)
        if op >> 6 == 1 {
            let f = if z == 6 {
                let value = self.read(self.regs.hl);
                self.internal(1);
                alu::bit(y, value, high(self.regs.wz), self.regs.f())
            } else {
                let value = self.reg8(z, Index::Hl);
                alu::bit(y, value, value, self.regs.f())
            };
            self.regs.set_f(f);
            return;
        }

        // Rotate/shift, RES, SET
        let (result, flags) = if z == 6 {
            let address = self.regs.hl;
            let value = self.read(address);
            self.internal(1);
            let out = cb_result(op, value, carry);
            self.write(address, out.0);
            out
        } else {
            let out = cb_result(op, self.reg8(z, Index::Hl), carry);
            self.set_reg8(z, Index::Hl, out.0);
            out
        };
        if let Some(f) = flags {
            self.regs.set_f(f);
        }
    }
}
