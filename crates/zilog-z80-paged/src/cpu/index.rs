//! DD/FD prefixes and the DDCB/FDCB forms.

#![allow(clippy::cast_possible_wrap)] // Displacements are signed bytes.

use super::Z80;
use super::cb::cb_result;
use crate::alu;
use crate::cell::CoreByte;
use crate::flags::CF;
use crate::host::Host;
use crate::registers::{Index, high};

impl<C: CoreByte> Z80<C> {
    /// After a DD or FD prefix byte.
    ///
    /// A following DD or FD ends the instruction here, so the first prefix
    /// costs a plain 4 T-state fetch and the next one starts afresh. INT is
    /// not sampled at that boundary. ED ignores the prefix.
    pub(super) fn execute_indexed<H: Host<C>>(&mut self, host: &mut H, idx: Index) {
        if matches!(self.memory.peek(self.regs.pc), 0xDD | 0xFD) {
            self.ei_delay = true;
            return;
        }
        let op = self.fetch_opcode();
        match op {
            0xCB => self.execute_indexed_cb(idx),
            0xED => self.execute_ed(host),
            _ => self.execute_main(host, op, idx),
        }
    }

    /// DD CB d op / FD CB d op.
    ///
    /// Neither the displacement nor the final opcode byte is an M1 cycle.
    /// The memory operand is always used; for register codes other than 6
    /// the result is copied into that register as well.
    fn execute_indexed_cb(&mut self, idx: Index) {
        let d = self.imm8() as i8;
        let op = self.imm8();
        self.internal(2);

        let address = self.regs.index(idx).wrapping_add_signed(i16::from(d));
        self.regs.wz = address;
        let value = self.read(address);
        self.internal(1);

        let y = (op >> 3) & 7;
        let z = op & 7;

        // BIT n, (IX+d)
        if op >> 6 == 1 {
            let f = alu::bit(y, value, high(address), self.regs.f());
            self.regs.set_f(f);
            return;
        }

        let carry = self.regs.f() & CF != 0;
        let (result, flags) = cb_result(op, value, carry);
        self.write(address, result);
        if z != 6 {
            self.set_reg8(z, Index::Hl, result);
        }
        if let Some(f) = flags {
            self.regs.set_f(f);
        }
    }
}
