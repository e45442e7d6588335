//! Instruction-level Z80 CPU with a paged memory map.
//!
//! `run()` executes whole instructions and keeps an exact T-state count. The
//! 64K address space is split into 1K pages; each page reads from and writes
//! to host-owned buffers, or to the open-bus and discard sentinels when
//! nothing is mapped. Port I/O, the maskable interrupt line and periodic
//! host work go through [`Host`].

mod alu;
mod cell;
mod cpu;
mod error;
mod flags;
mod host;
mod interrupt;
mod memory;
mod options;
mod registers;

pub use cell::{CoreByte, TAG_BREAK_EXECUTE, TAG_BREAK_READ, TAG_BREAK_WRITE};
pub use cpu::{IM1_VECTOR, NMI_VECTOR, Z80};
pub use error::TransferError;
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use host::{CpuAccess, Host, NullHost};
pub use interrupt::{Nmi, NmiState};
pub use memory::{
    Buffer, MemoryMap, OPEN_BUS, PAGE_BITS, PAGE_COUNT, PAGE_MASK, PAGE_SIZE, Page, Region, Slot,
};
pub use options::{BreakKind, Breakpoint, RunExit, RunOptions};
pub use registers::{Index, Registers};
