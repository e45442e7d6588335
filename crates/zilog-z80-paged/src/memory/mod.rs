//! Memory subsystem.
//!
//! This module provides:
//! - `Buffer` - host-owned backing cells, shared by handle
//! - `MemoryMap` - the page table with its open-bus and discard sentinels
//! - streaming transfers between mapped memory and `Read`/`Write` objects

mod buffer;
mod map;
mod transfer;

pub use buffer::{Buffer, Region};
pub use map::{MemoryMap, OPEN_BUS, PAGE_BITS, PAGE_COUNT, PAGE_MASK, PAGE_SIZE, Page, Slot};
