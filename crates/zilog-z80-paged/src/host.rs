//! The machine around the CPU.
//!
//! Everything outside the core (peripherals, the interrupt line, the clock
//! scheduler) is reached through [`Host`]. The host is passed to each
//! `run()` call rather than owned, so it can also be driven directly between
//! runs.

use crate::cell::CoreByte;
use crate::interrupt::Nmi;
use crate::memory::{MemoryMap, OPEN_BUS};

/// The part of the CPU a host callback may touch mid-run: the page table, for
/// bank switching, and the NMI line.
pub struct CpuAccess<'a, C: CoreByte> {
    memory: &'a mut MemoryMap<C>,
    nmi: &'a mut Nmi,
    /// Where a new NMI edge moves the scheduled update.
    cc: i32,
    cc_next_update: &'a mut i32,
}

impl<'a, C: CoreByte> CpuAccess<'a, C> {
    pub(crate) fn new(
        memory: &'a mut MemoryMap<C>,
        nmi: &'a mut Nmi,
        cc: i32,
        cc_next_update: &'a mut i32,
    ) -> Self {
        Self {
            memory,
            nmi,
            cc,
            cc_next_update,
        }
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryMap<C> {
        &*self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryMap<C> {
        &mut *self.memory
    }

    /// Assert NMI. Serviced at the next instruction boundary.
    ///
    /// A new edge pulls the scheduled host update forward to the end of the
    /// current bus cycle, as `Z80::set_nmi` does. Inside `update()` the
    /// returned value still replaces the schedule; the NMI is serviced
    /// straight after.
    pub fn set_nmi(&mut self) {
        if self.nmi.set() {
            *self.cc_next_update = self.cc;
        }
    }

    /// Release NMI. An edge already latched is still serviced.
    pub fn clear_nmi(&mut self) {
        self.nmi.clear();
    }
}

/// Services the CPU needs from the machine it is plugged into.
///
/// All cycle arguments are CPU cycles on the same scale as `Z80::cc()`.
pub trait Host<C: CoreByte = u8> {
    /// IN instruction: return the byte on the data bus for `port`.
    ///
    /// The full 16-bit port address is passed; the upper byte is A or B
    /// depending on the instruction.
    fn input(&mut self, _cc: i32, _port: u16) -> u8 {
        OPEN_BUS
    }

    /// OUT instruction.
    fn output(&mut self, _cpu: &mut CpuAccess<'_, C>, _cc: i32, _port: u16, _value: u8) {}

    /// Called when the clock reaches the scheduled update point `cc_next`.
    /// Returns the next update point.
    ///
    /// The default never asks for another update.
    fn update(&mut self, _cpu: &mut CpuAccess<'_, C>, _cc: i32, _cc_next: i32) -> i32 {
        i32::MAX
    }

    /// State of the maskable interrupt line, polled at instruction boundaries
    /// while interrupts are enabled.
    fn interrupt_asserted(&self) -> bool {
        false
    }

    /// Byte the interrupting device puts on the bus during the acknowledge
    /// cycle. Used as an opcode in IM 0 and as the vector low byte in IM 2.
    fn int_ack_byte(&mut self, _cc: i32) -> u8 {
        OPEN_BUS
    }

    /// Target of a CALL placed on the bus in IM 0 (ack byte 0xCD).
    fn int0_call_address(&self) -> u16 {
        0x0038
    }
}

/// A host with nothing attached: open bus on every port, no interrupts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl<C: CoreByte> Host<C> for NullHost {}
