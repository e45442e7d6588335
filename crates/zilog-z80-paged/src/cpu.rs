//! Z80 CPU core with instruction-level execution.
//!
//! `run()` executes whole instructions and adds each one's exact T-state
//! cost to the cycle counter as its machine cycles happen, so I/O callbacks
//! see the cycle of the actual port access. Interrupts are only taken between
//! instructions.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.
#![allow(clippy::cast_sign_loss)] // Idle step counts are positive.

mod cb;
mod ed;
mod execute;
mod index;

use emu_core::{Observable, Value};

use crate::cell::{CoreByte, TAG_BREAK_EXECUTE, TAG_BREAK_READ, TAG_BREAK_WRITE};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::host::{CpuAccess, Host};
use crate::interrupt::{Nmi, NmiState};
use crate::memory::MemoryMap;
use crate::options::{BreakKind, Breakpoint, RunExit, RunOptions};
use crate::registers::{Registers, high, low};

/// Address jumped to when servicing NMI.
pub const NMI_VECTOR: u16 = 0x0066;

/// Address jumped to by IM 1 interrupts.
pub const IM1_VECTOR: u16 = 0x0038;

/// Z80 CPU.
///
/// The CPU owns its register file, its page table and its clock. The host
/// machine is borrowed for the duration of each `run()` call.
pub struct Z80<C: CoreByte = u8> {
    pub(crate) regs: Registers,
    pub(crate) memory: MemoryMap<C>,

    // === Clock ===
    /// Current cycle.
    pub(crate) cc: i32,
    /// Cycle at which the host wants its next `update()`.
    cc_next_update: i32,

    // === Interrupt state ===
    nmi: Nmi,
    /// Executing HALT: burning NOP cycles until an interrupt.
    pub(crate) halted: bool,
    /// EI or a DD/FD prefix was the last fetch; maskable interrupts wait
    /// one more instruction.
    pub(crate) ei_delay: bool,

    // === Breakpoints ===
    /// Tag bits that stop the current run on data access.
    watch: u32,
    /// First data breakpoint hit during the current instruction.
    hit: Option<Breakpoint>,
}

impl<C: CoreByte> Z80<C> {
    /// Create a CPU with all memory unmapped, in the reset state at cycle 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::after_reset(),
            memory: MemoryMap::new(),
            cc: 0,
            cc_next_update: 0,
            nmi: Nmi::default(),
            halted: false,
            ei_delay: false,
            watch: 0,
            hit: None,
        }
    }

    /// Power-on: unmap all memory, restore the sentinels and reset at
    /// cycle 0.
    pub fn init(&mut self) {
        self.memory.unmap_all_memory();
        self.memory.reset_sentinels();
        self.reset(0);
    }

    /// Hardware reset at cycle `cc`.
    ///
    /// Registers return to their reset values, HALT and any NMI request are
    /// dropped, and the host gets an `update()` before the first instruction.
    pub fn reset(&mut self, cc: i32) {
        self.regs = Registers::after_reset();
        self.halted = false;
        self.ei_delay = false;
        self.nmi.reset();
        self.cc = cc;
        self.cc_next_update = cc;
    }

    /// Move the time origin: subtract `offset` from the clock and from the
    /// scheduled update.
    pub fn shift_cc(&mut self, offset: i32) {
        self.cc = self.cc.wrapping_sub(offset);
        self.cc_next_update = self.cc_next_update.wrapping_sub(offset);
    }

    /// Current cycle.
    #[must_use]
    pub const fn cc(&self) -> i32 {
        self.cc
    }

    /// Cycle of the next scheduled host update.
    #[must_use]
    pub const fn cc_next_update(&self) -> i32 {
        self.cc_next_update
    }

    pub fn set_cc_next_update(&mut self, cc: i32) {
        self.cc_next_update = cc;
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc
    }

    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub const fn memory(&self) -> &MemoryMap<C> {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryMap<C> {
        &mut self.memory
    }

    // =========================================================================
    // Interrupts
    // =========================================================================

    /// Assert NMI.
    ///
    /// A new edge also pulls the host update forward to the current cycle,
    /// so the next `run()` reconsiders interrupts before executing anything.
    pub fn set_nmi(&mut self) {
        if self.nmi.set() {
            self.cc_next_update = self.cc;
        }
    }

    /// Release NMI. A latched edge is still serviced once.
    pub fn clear_nmi(&mut self) {
        self.nmi.clear();
    }

    #[must_use]
    pub const fn nmi_state(&self) -> NmiState {
        self.nmi.state()
    }

    /// Accept NMI: 11 T-states, PC pushed, jump to 0x0066.
    fn service_nmi(&mut self) {
        self.halted = false;
        let iff1 = self.regs.iff1();
        self.regs.set_iff2(iff1);
        self.regs.set_iff1(false);
        self.regs.inc_r();
        self.advance(5);
        self.push(self.regs.pc);
        self.regs.pc = NMI_VECTOR;
        self.regs.wz = NMI_VECTOR;
    }

    /// Acknowledge a maskable interrupt and dispatch on the interrupt mode.
    fn service_interrupt<H: Host<C>>(&mut self, host: &mut H) {
        self.halted = false;
        self.regs.set_iffs(false);
        self.regs.inc_r();
        let ack = host.int_ack_byte(self.cc);

        match self.regs.im() {
            0 => {
                // The acknowledge cycle is an M1 with two wait states.
                self.advance(6);
                if ack & 0xC7 == 0xC7 {
                    // RST p
                    self.internal(1);
                    self.push(self.regs.pc);
                    self.regs.pc = u16::from(ack & 0x38);
                } else if ack == 0xCD {
                    // CALL nn: the device supplies the operand bytes.
                    self.advance(6);
                    self.internal(1);
                    self.push(self.regs.pc);
                    self.regs.pc = host.int0_call_address();
                }
            }
            1 => {
                self.advance(7);
                self.push(self.regs.pc);
                self.regs.pc = IM1_VECTOR;
            }
            _ => {
                self.advance(7);
                self.push(self.regs.pc);
                let table = (u16::from(self.regs.i()) << 8) | u16::from(ack);
                self.regs.pc = self.read16(table);
            }
        }
        self.regs.wz = self.regs.pc;
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute until the clock reaches `cc_exit` or an exit requested by
    /// `options` occurs.
    ///
    /// The host's `update()` is called whenever the clock reaches the
    /// scheduled update point; its return value is the next one. The clock
    /// never passes `cc_exit` by more than one instruction or interrupt
    /// acknowledge.
    pub fn run<H: Host<C>>(&mut self, host: &mut H, cc_exit: i32, options: RunOptions) -> RunExit {
        let single_step = options.contains(RunOptions::SINGLE_STEP);
        let break_execute = options.contains(RunOptions::BREAK_EXECUTE);
        let exit_on_halt = options.contains(RunOptions::EXIT_ON_HALT);

        self.watch = 0;
        if options.contains(RunOptions::BREAK_READ) {
            self.watch |= TAG_BREAK_READ;
        }
        if options.contains(RunOptions::BREAK_WRITE) {
            self.watch |= TAG_BREAK_WRITE;
        }
        self.hit = None;

        // The instruction the host resumes at is not checked for an
        // execute breakpoint, otherwise it could never get past one.
        let mut resumed = true;

        loop {
            if self.cc >= cc_exit {
                return RunExit::Horizon;
            }

            if self.cc >= self.cc_next_update {
                let scheduled = self.cc_next_update;
                let mut cpu = CpuAccess::new(
                    &mut self.memory,
                    &mut self.nmi,
                    self.cc,
                    &mut self.cc_next_update,
                );
                let next = host.update(&mut cpu, self.cc, scheduled);
                self.cc_next_update = next;
            }

            if self.nmi.take_pending() {
                self.service_nmi();
                if let Some(hit) = self.hit.take() {
                    return RunExit::Breakpoint(hit);
                }
                if single_step {
                    return RunExit::Step;
                }
                continue;
            }

            if self.regs.iff1() && !self.ei_delay && host.interrupt_asserted() {
                self.service_interrupt(host);
                if let Some(hit) = self.hit.take() {
                    return RunExit::Breakpoint(hit);
                }
                if single_step {
                    return RunExit::Step;
                }
                continue;
            }
            self.ei_delay = false;

            if self.halted {
                let until = if single_step {
                    self.cc
                } else {
                    cc_exit.min(self.cc_next_update)
                };
                self.idle(until);
                if single_step {
                    return RunExit::Step;
                }
                continue;
            }

            if break_execute && !resumed {
                let pc = self.regs.pc;
                if self.memory.read_cell(pc).tags() & TAG_BREAK_EXECUTE != 0 {
                    return RunExit::Breakpoint(Breakpoint {
                        kind: BreakKind::Execute,
                        address: pc,
                    });
                }
            }
            resumed = false;

            self.execute(host);

            if let Some(hit) = self.hit.take() {
                return RunExit::Breakpoint(hit);
            }
            if self.halted && exit_on_halt {
                return RunExit::Halted;
            }
            if single_step {
                return RunExit::Step;
            }
        }
    }

    /// While halted the CPU keeps fetching NOPs: 4 T-states and one refresh
    /// each. Burn whole NOPs up to `until`, at least one.
    fn idle(&mut self, until: i32) {
        let gap = (i64::from(until) - i64::from(self.cc)).max(1);
        let steps = (gap + 3) / 4;
        let end = i64::from(self.cc) + steps * 4;
        self.cc = i32::try_from(end).unwrap_or(i32::MAX);
        self.regs.add_r(steps as u32);
    }

    // =========================================================================
    // Machine cycles
    // =========================================================================

    /// Opcode fetch (M1): 4 T-states, bumps R.
    pub(crate) fn fetch_opcode(&mut self) -> u8 {
        let op = self.memory.read_cell(self.regs.pc).byte();
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.regs.inc_r();
        self.advance(4);
        op
    }

    /// Operand byte at PC: 3 T-states.
    pub(crate) fn imm8(&mut self) -> u8 {
        let value = self.memory.read_cell(self.regs.pc).byte();
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.advance(3);
        value
    }

    /// Little-endian operand word at PC: 6 T-states.
    pub(crate) fn imm16(&mut self) -> u16 {
        let lo = self.imm8();
        let hi = self.imm8();
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Memory read: 3 T-states.
    pub(crate) fn read(&mut self, address: u16) -> u8 {
        let cell = self.memory.read_cell(address);
        if cell.tags() & self.watch & TAG_BREAK_READ != 0 {
            self.note_hit(BreakKind::Read, address);
        }
        self.advance(3);
        cell.byte()
    }

    /// Memory write: 3 T-states.
    pub(crate) fn write(&mut self, address: u16, value: u8) {
        let tags = self.memory.store(address, value);
        if tags & self.watch & TAG_BREAK_WRITE != 0 {
            self.note_hit(BreakKind::Write, address);
        }
        self.advance(3);
    }

    pub(crate) fn read16(&mut self, address: u16) -> u16 {
        let lo = self.read(address);
        let hi = self.read(address.wrapping_add(1));
        u16::from(lo) | (u16::from(hi) << 8)
    }

    pub(crate) fn write16(&mut self, address: u16, value: u16) {
        self.write(address, low(value));
        self.write(address.wrapping_add(1), high(value));
    }

    /// Internal operation with no bus access.
    pub(crate) fn internal(&mut self, t_states: i32) {
        self.advance(t_states);
    }

    /// The clock stops at `i32::MAX` rather than wrapping past a horizon.
    fn advance(&mut self, t_states: i32) {
        self.cc = self.cc.saturating_add(t_states);
    }

    /// Push high byte then low byte: 6 T-states.
    pub(crate) fn push(&mut self, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(self.regs.sp, high(value));
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(self.regs.sp, low(value));
    }

    /// Pop low byte then high byte: 6 T-states.
    pub(crate) fn pop(&mut self) -> u16 {
        let lo = self.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// I/O read cycle: 4 T-states. The host sees the cycle the access starts.
    pub(crate) fn port_in<H: Host<C>>(&mut self, host: &mut H, port: u16) -> u8 {
        let value = host.input(self.cc, port);
        self.advance(4);
        value
    }

    /// I/O write cycle: 4 T-states.
    pub(crate) fn port_out<H: Host<C>>(&mut self, host: &mut H, port: u16, value: u8) {
        let end = self.cc.saturating_add(4);
        let mut cpu = CpuAccess::new(
            &mut self.memory,
            &mut self.nmi,
            end,
            &mut self.cc_next_update,
        );
        host.output(&mut cpu, self.cc, port, value);
        self.advance(4);
    }

    fn note_hit(&mut self, kind: BreakKind, address: u16) {
        self.hit.get_or_insert(Breakpoint { kind, address });
    }

    // =========================================================================
    // Memory helpers (no cycle accounting)
    // =========================================================================

    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory.peek(address)
    }

    pub fn poke(&self, address: u16, value: u8) {
        self.memory.poke(address, value);
    }

    #[must_use]
    pub fn peek2(&self, address: u16) -> u16 {
        self.memory.peek2(address)
    }

    pub fn poke2(&self, address: u16, value: u16) {
        self.memory.poke2(address, value);
    }

    /// SP -= 2, then store `value` at SP.
    pub fn push2(&mut self, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        self.memory.poke2(self.regs.sp, value);
    }

    /// Load the word at SP, then SP += 2.
    pub fn pop2(&mut self) -> u16 {
        let value = self.memory.peek2(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }
}

impl<C: CoreByte> Default for Z80<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// All query paths supported by the Z80.
const Z80_QUERY_PATHS: &[&str] = &[
    // Main registers
    "a", "f", "b", "c", "d", "e", "h", "l",
    // Register pairs
    "af", "bc", "de", "hl",
    // Alternate pairs
    "af'", "bc'", "de'", "hl'",
    // Index registers
    "ix", "iy", "ixh", "ixl", "iyh", "iyl",
    // Other registers
    "sp", "pc", "i", "r", "wz",
    // Flags (individual)
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    // Interrupt state
    "iff1", "iff2", "im", "nmi",
    // CPU state
    "halted", "cc", "cc_next_update",
];

impl<C: CoreByte> Observable for Z80<C> {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |bit: u8| Some(Value::Bool(r.f() & bit != 0));
        match path {
            "a" => Some(r.a().into()),
            "f" => Some(r.f().into()),
            "b" => Some(r.b().into()),
            "c" => Some(r.c().into()),
            "d" => Some(r.d().into()),
            "e" => Some(r.e().into()),
            "h" => Some(r.h().into()),
            "l" => Some(r.l().into()),

            "af" => Some(r.af.into()),
            "bc" => Some(r.bc.into()),
            "de" => Some(r.de.into()),
            "hl" => Some(r.hl.into()),

            "af'" => Some(r.af2.into()),
            "bc'" => Some(r.bc2.into()),
            "de'" => Some(r.de2.into()),
            "hl'" => Some(r.hl2.into()),

            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "ixh" => Some(r.ixh().into()),
            "ixl" => Some(r.ixl().into()),
            "iyh" => Some(r.iyh().into()),
            "iyl" => Some(r.iyl().into()),

            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "i" => Some(r.i().into()),
            "r" => Some(r.r().into()),
            "wz" => Some(r.wz.into()),

            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.y" => flag(YF),
            "flags.h" => flag(HF),
            "flags.x" => flag(XF),
            "flags.p" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),

            "iff1" => Some(r.iff1().into()),
            "iff2" => Some(r.iff2().into()),
            "im" => Some(r.im().into()),
            "nmi" => Some(
                match self.nmi.state() {
                    NmiState::Idle => "idle",
                    NmiState::Pending => "pending",
                    NmiState::Held => "held",
                }
                .into(),
            ),

            "halted" => Some(self.halted.into()),
            "cc" => Some(self.cc.into()),
            "cc_next_update" => Some(self.cc_next_update.into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;
    use crate::memory::Buffer;

    fn cpu_with_ram(program: &[u8]) -> (Z80, Buffer) {
        let mut cpu: Z80 = Z80::new();
        let ram = Buffer::new(0x10000);
        cpu.memory_mut().map_ram(0x0000, 0x10000, &ram);
        cpu.memory().copy_buffer_to_ram(program, 0x0000);
        (cpu, ram)
    }

    #[test]
    fn reset_state() {
        let mut cpu: Z80 = Z80::new();
        cpu.registers_mut().pc = 0x1234;
        cpu.reset(500);
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.cc(), 500);
        assert_eq!(cpu.cc_next_update(), 500);
        assert_eq!(cpu.registers().sp, 0xFFFF);
        assert!(!cpu.registers().iff1());
        assert_eq!(cpu.registers().im(), 0);
    }

    #[test]
    fn shift_cc_rebases_both_horizons() {
        let mut cpu: Z80 = Z80::new();
        cpu.reset(70_000);
        cpu.set_cc_next_update(70_100);
        cpu.shift_cc(69_888);
        assert_eq!(cpu.cc(), 112);
        assert_eq!(cpu.cc_next_update(), 212);
    }

    #[test]
    fn clock_stops_at_i32_max() {
        let (mut cpu, _) = cpu_with_ram(&[0x00, 0x00]);
        cpu.reset(i32::MAX - 2);
        let exit = cpu.run(&mut NullHost, i32::MAX, RunOptions::NONE);
        assert_eq!(exit, RunExit::Horizon);
        assert_eq!(cpu.cc(), i32::MAX);
        assert_eq!(cpu.pc(), 1);

        // Nothing left to run.
        assert_eq!(cpu.run(&mut NullHost, i32::MAX, RunOptions::NONE), RunExit::Horizon);
        assert_eq!(cpu.pc(), 1);
    }

    #[test]
    fn opcode_fetch_counts_refresh() {
        // NOP; NOP; DD prefix + NOP
        let (mut cpu, _) = cpu_with_ram(&[0x00, 0x00, 0xDD, 0x00]);
        cpu.run(&mut NullHost, 16, RunOptions::NONE);
        assert_eq!(cpu.cc(), 16);
        assert_eq!(cpu.registers().r(), 4);
    }

    #[test]
    fn halt_burns_nops_until_horizon() {
        let (mut cpu, _) = cpu_with_ram(&[0x76]);
        let exit = cpu.run(&mut NullHost, 101, RunOptions::NONE);
        assert_eq!(exit, RunExit::Horizon);
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc(), 1);
        assert_eq!(cpu.cc(), 104);
        assert_eq!(cpu.registers().r(), 26);
    }

    #[test]
    fn exit_on_halt() {
        let (mut cpu, _) = cpu_with_ram(&[0x00, 0x76]);
        let exit = cpu.run(&mut NullHost, 1000, RunOptions::EXIT_ON_HALT);
        assert_eq!(exit, RunExit::Halted);
        assert_eq!(cpu.cc(), 8);
    }

    #[test]
    fn single_step_executes_one_instruction() {
        let (mut cpu, _) = cpu_with_ram(&[0x01, 0x34, 0x12, 0x00]);
        let exit = cpu.run(&mut NullHost, 1000, RunOptions::SINGLE_STEP);
        assert_eq!(exit, RunExit::Step);
        assert_eq!(cpu.pc(), 3);
        assert_eq!(cpu.cc(), 10);
        assert_eq!(cpu.registers().bc, 0x1234);
    }

    #[test]
    fn push2_pop2_wrap() {
        let mut cpu: Z80 = Z80::new();
        let ram = Buffer::new(0x10000);
        cpu.memory_mut().map_ram(0x0000, 0x10000, &ram);
        cpu.registers_mut().sp = 0x0001;
        cpu.push2(0xCAFE);
        assert_eq!(cpu.registers().sp, 0xFFFF);
        assert_eq!(cpu.peek(0xFFFF), 0xFE);
        assert_eq!(cpu.peek(0x0000), 0xCA);
        assert_eq!(cpu.pop2(), 0xCAFE);
        assert_eq!(cpu.registers().sp, 0x0001);
    }

    #[test]
    fn query_registers() {
        let (mut cpu, _) = cpu_with_ram(&[0x3E, 0x80, 0xB7]); // LD A,0x80; OR A
        cpu.run(&mut NullHost, 11, RunOptions::NONE);
        assert_eq!(cpu.query("a"), Some(Value::U8(0x80)));
        assert_eq!(cpu.query("flags.s"), Some(Value::Bool(true)));
        assert_eq!(cpu.query("pc"), Some(Value::U16(3)));
        assert_eq!(cpu.query("nmi"), Some(Value::String("idle".into())));
        assert_eq!(cpu.query("bogus"), None);
        assert!(cpu.query_paths().iter().all(|p| cpu.query(p).is_some()));
    }
}
