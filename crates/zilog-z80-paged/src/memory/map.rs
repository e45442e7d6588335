//! Paged memory map.
//!
//! The 64K address space is split into `PAGE_COUNT` pages of `PAGE_SIZE`
//! bytes. Each page resolves reads and writes independently, so a page can be
//! ROM (read from a buffer, writes discarded), write-only, RAM, RAM with
//! separate read and write banks, or unmapped (reads return open bus).

#![allow(clippy::cast_possible_truncation)] // Page indices always fit in u16.

use std::ops::Range;

use super::buffer::{Buffer, Region};
use crate::cell::CoreByte;

/// log2 of the page size.
pub const PAGE_BITS: u32 = 10;

/// Mapping granularity in bytes.
pub const PAGE_SIZE: usize = 1 << PAGE_BITS;

/// Offset of an address within its page.
pub const PAGE_MASK: u16 = (PAGE_SIZE - 1) as u16;

/// Number of pages covering the address space.
pub const PAGE_COUNT: usize = 0x10000 >> PAGE_BITS;

/// Value read from unmapped addresses.
pub const OPEN_BUS: u8 = 0xFF;

/// One side (read or write) of a page: a buffer and the index of the cell
/// backing the first address of the page.
#[derive(Debug, Clone)]
pub struct Slot<C: CoreByte> {
    buffer: Buffer<C>,
    base: usize,
}

impl<C: CoreByte> Slot<C> {
    #[must_use]
    pub fn buffer(&self) -> &Buffer<C> {
        &self.buffer
    }

    /// Index in `buffer()` of the cell for the page's first address.
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    fn index(&self, address: u16) -> usize {
        self.base + usize::from(address & PAGE_MASK)
    }
}

/// Page table entry.
#[derive(Debug, Clone)]
pub struct Page<C: CoreByte> {
    read: Slot<C>,
    write: Slot<C>,
}

impl<C: CoreByte> Page<C> {
    /// Where reads of this page come from.
    #[must_use]
    pub const fn read(&self) -> &Slot<C> {
        &self.read
    }

    /// Where writes to this page go.
    #[must_use]
    pub const fn write(&self) -> &Slot<C> {
        &self.write
    }
}

/// The CPU's view of memory.
pub struct MemoryMap<C: CoreByte = u8> {
    no_read: Buffer<C>,
    no_write: Buffer<C>,
    pages: Vec<Page<C>>,
}

impl<C: CoreByte> MemoryMap<C> {
    /// A map with every page unmapped.
    #[must_use]
    pub fn new() -> Self {
        let no_read = Buffer::filled(PAGE_SIZE, OPEN_BUS);
        let no_write = Buffer::new(PAGE_SIZE);
        let page = Page {
            read: Slot {
                buffer: no_read.clone(),
                base: 0,
            },
            write: Slot {
                buffer: no_write.clone(),
                base: 0,
            },
        };
        Self {
            pages: vec![page; PAGE_COUNT],
            no_read,
            no_write,
        }
    }

    /// Refill the default read sentinel with open bus, in case a host wrote
    /// into it through `page()`.
    pub fn reset_sentinels(&mut self) {
        for cell in self.no_read.cells_mut().iter_mut() {
            *cell = C::from_byte(OPEN_BUS);
        }
    }

    /// Page table entry covering `address`.
    #[must_use]
    pub fn page(&self, address: u16) -> &Page<C> {
        &self.pages[usize::from(address >> PAGE_BITS)]
    }

    /// True if reads of `address` hit the default open-bus page.
    #[must_use]
    pub fn is_unmapped_read(&self, address: u16) -> bool {
        self.page(address).read.buffer.same_storage(&self.no_read)
    }

    /// True if writes to `address` are discarded by the default sink.
    #[must_use]
    pub fn is_unmapped_write(&self, address: u16) -> bool {
        self.page(address).write.buffer.same_storage(&self.no_write)
    }

    // ---------------------------------------------------------------------
    // Mapping
    // ---------------------------------------------------------------------

    /// Map `data` as read-only memory at `[address, address + size)`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty, not page aligned, runs past 0xFFFF, or
    /// if `data` is shorter than `size` cells.
    pub fn map_rom<'a>(&mut self, address: u16, size: u32, data: impl Into<Region<'a, C>>) {
        let data = data.into();
        for page in self.span(address, size, &data) {
            let read = Self::linear(&data, address, page);
            self.pages[page].read = read;
            self.pages[page].write = self.sink();
        }
    }

    /// Map `data` as write-only memory. Reads return open bus.
    ///
    /// # Panics
    ///
    /// Same preconditions as [`map_rom`](Self::map_rom).
    pub fn map_wom<'a>(&mut self, address: u16, size: u32, data: impl Into<Region<'a, C>>) {
        let data = data.into();
        for page in self.span(address, size, &data) {
            let write = Self::linear(&data, address, page);
            self.pages[page].read = self.open_bus();
            self.pages[page].write = write;
        }
    }

    /// Map `data` as RAM: reads and writes hit the same cells.
    ///
    /// # Panics
    ///
    /// Same preconditions as [`map_rom`](Self::map_rom).
    pub fn map_ram<'a>(&mut self, address: u16, size: u32, data: impl Into<Region<'a, C>>) {
        let data = data.into();
        for page in self.span(address, size, &data) {
            let slot = Self::linear(&data, address, page);
            self.pages[page].read = slot.clone();
            self.pages[page].write = slot;
        }
    }

    /// Map RAM with separate read and write storage at the same addresses.
    ///
    /// # Panics
    ///
    /// Same preconditions as [`map_rom`](Self::map_rom), for both buffers.
    pub fn map_ram_split<'a, 'b>(
        &mut self,
        address: u16,
        size: u32,
        read: impl Into<Region<'a, C>>,
        write: impl Into<Region<'b, C>>,
    ) where
        C: 'a + 'b,
    {
        let read = read.into();
        let write = write.into();
        let pages = self.span(address, size, &read);
        self.span(address, size, &write);
        for page in pages {
            self.pages[page].read = Self::linear(&read, address, page);
            self.pages[page].write = Self::linear(&write, address, page);
        }
    }

    /// Make every page in the range read from the single page `fill`, so a
    /// region can return its own open-bus pattern.
    ///
    /// # Panics
    ///
    /// Panics on a bad range or if `fill` is shorter than one page.
    pub fn map_no_rom(&mut self, address: u16, size: u32, fill: &Buffer<C>) {
        for page in self.span_repeated(address, size, fill) {
            self.pages[page].read = Slot {
                buffer: fill.clone(),
                base: 0,
            };
        }
    }

    /// Make every page in the range write into the single page `sink`.
    ///
    /// # Panics
    ///
    /// Panics on a bad range or if `sink` is shorter than one page.
    pub fn map_no_wom(&mut self, address: u16, size: u32, sink: &Buffer<C>) {
        for page in self.span_repeated(address, size, sink) {
            self.pages[page].write = Slot {
                buffer: sink.clone(),
                base: 0,
            };
        }
    }

    /// Restore open-bus reads for the range. Writes are left alone.
    ///
    /// # Panics
    ///
    /// Panics on a bad range.
    pub fn unmap_rom(&mut self, address: u16, size: u32) {
        for page in Self::page_range(address, size) {
            self.pages[page].read = self.open_bus();
        }
    }

    /// Restore discarded writes for the range. Reads are left alone.
    ///
    /// # Panics
    ///
    /// Panics on a bad range.
    pub fn unmap_wom(&mut self, address: u16, size: u32) {
        for page in Self::page_range(address, size) {
            self.pages[page].write = self.sink();
        }
    }

    /// Unmap both sides of the range.
    ///
    /// # Panics
    ///
    /// Panics on a bad range.
    pub fn unmap_ram(&mut self, address: u16, size: u32) {
        self.unmap_rom(address, size);
        self.unmap_wom(address, size);
    }

    /// Unmap the whole address space.
    pub fn unmap_all_memory(&mut self) {
        self.unmap_ram(0, 0x10000);
    }

    /// Drop every page side that points into `buffer[offset..offset + size]`.
    ///
    /// A host calls this before releasing or repurposing a buffer, so no page
    /// is left backed by storage it no longer owns.
    pub fn unmap_memory(&mut self, buffer: &Buffer<C>, offset: usize, size: usize) {
        let inside = |slot: &Slot<C>| {
            slot.buffer.same_storage(buffer) && slot.base >= offset && slot.base < offset + size
        };
        let open_bus = self.open_bus();
        let sink = self.sink();
        for page in &mut self.pages {
            if inside(&page.read) {
                page.read = open_bus.clone();
            }
            if inside(&page.write) {
                page.write = sink.clone();
            }
        }
    }

    fn open_bus(&self) -> Slot<C> {
        Slot {
            buffer: self.no_read.clone(),
            base: 0,
        }
    }

    fn sink(&self) -> Slot<C> {
        Slot {
            buffer: self.no_write.clone(),
            base: 0,
        }
    }

    /// Slot for `page` when `data` is laid out linearly from `address`.
    fn linear(data: &Region<'_, C>, address: u16, page: usize) -> Slot<C> {
        Slot {
            buffer: data.buffer.clone(),
            base: data.offset + (page << PAGE_BITS) - usize::from(address),
        }
    }

    fn span(&self, address: u16, size: u32, data: &Region<'_, C>) -> Range<usize> {
        let len = data.buffer.len();
        assert!(
            data.offset + size as usize <= len,
            "buffer of {len} cells cannot back {size} bytes from offset {}",
            data.offset
        );
        Self::page_range(address, size)
    }

    fn span_repeated(&self, address: u16, size: u32, page: &Buffer<C>) -> Range<usize> {
        assert!(
            page.len() >= PAGE_SIZE,
            "sentinel page has {} cells, need {PAGE_SIZE}",
            page.len()
        );
        Self::page_range(address, size)
    }

    fn page_range(address: u16, size: u32) -> Range<usize> {
        assert!(size > 0, "empty mapping at {address:#06X}");
        assert!(
            usize::from(address) % PAGE_SIZE == 0,
            "address {address:#06X} is not page aligned"
        );
        assert!(
            size as usize % PAGE_SIZE == 0,
            "size {size:#X} is not a multiple of the page size"
        );
        let end = u32::from(address) + size;
        assert!(end <= 0x10000, "mapping {address:#06X}+{size:#X} runs past 0xFFFF");
        (usize::from(address) >> PAGE_BITS)..(end as usize >> PAGE_BITS)
    }

    // ---------------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------------

    /// Cell that reads of `address` resolve to, tags included.
    #[must_use]
    pub fn read_cell(&self, address: u16) -> C {
        let slot = &self.page(address).read;
        slot.buffer.cells()[slot.index(address)]
    }

    /// Store `value` at `address` and return the tags of the cell written.
    ///
    /// Writes that land in the default sink report no tags.
    pub fn store(&self, address: u16, value: u8) -> u32 {
        let slot = &self.page(address).write;
        let mut cells = slot.buffer.cells_mut();
        let cell = &mut cells[slot.index(address)];
        cell.set_byte(value);
        cell.tags()
    }

    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.read_cell(address).byte()
    }

    pub fn poke(&self, address: u16, value: u8) {
        self.store(address, value);
    }

    /// Little-endian word; the high byte comes from `address + 1` mod 64K.
    #[must_use]
    pub fn peek2(&self, address: u16) -> u16 {
        u16::from(self.peek(address)) | (u16::from(self.peek(address.wrapping_add(1))) << 8)
    }

    pub fn poke2(&self, address: u16, value: u16) {
        self.poke(address, value as u8);
        self.poke(address.wrapping_add(1), (value >> 8) as u8);
    }

    /// Write `bytes` through the map starting at `address`, wrapping at 64K.
    /// ROM and unmapped pages swallow their share.
    pub fn copy_buffer_to_ram(&self, bytes: &[u8], address: u16) {
        let mut addr = address;
        for &byte in bytes {
            self.poke(addr, byte);
            addr = addr.wrapping_add(1);
        }
    }

    /// Read `bytes.len()` bytes through the map starting at `address`.
    pub fn copy_ram_to_buffer(&self, address: u16, bytes: &mut [u8]) {
        let mut addr = address;
        for byte in bytes {
            *byte = self.peek(addr);
            addr = addr.wrapping_add(1);
        }
    }

    /// Like [`copy_buffer_to_ram`](Self::copy_buffer_to_ram), taking the
    /// visible byte of each source cell.
    pub fn copy_cells_to_ram(&self, cells: &[C], address: u16) {
        let mut addr = address;
        for cell in cells {
            self.poke(addr, cell.byte());
            addr = addr.wrapping_add(1);
        }
    }

    /// Like [`copy_ram_to_buffer`](Self::copy_ram_to_buffer), setting only the
    /// visible byte of each destination cell.
    pub fn copy_ram_to_cells(&self, address: u16, cells: &mut [C]) {
        let mut addr = address;
        for cell in cells {
            cell.set_byte(self.peek(addr));
            addr = addr.wrapping_add(1);
        }
    }
}

impl<C: CoreByte> Default for MemoryMap<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_reads_open_bus() {
        let mem: MemoryMap = MemoryMap::new();
        mem.poke(0x1234, 0x00);
        assert_eq!(mem.peek(0x1234), OPEN_BUS);
        assert_eq!(mem.peek(0xFFFF), OPEN_BUS);
        assert!(mem.is_unmapped_read(0x0000));
    }

    #[test]
    fn rom_ignores_writes() {
        let mut mem: MemoryMap = MemoryMap::new();
        let rom = Buffer::from_bytes(&[0xAA; 0x4000]);
        mem.map_rom(0x0000, 0x4000, &rom);
        mem.poke(0x0010, 0x55);
        assert_eq!(mem.peek(0x0010), 0xAA);
        assert_eq!(rom.byte(0x10), 0xAA);
        assert!(mem.is_unmapped_write(0x0010));
    }

    #[test]
    fn ram_resolves_by_full_address() {
        let mut mem: MemoryMap = MemoryMap::new();
        let ram = Buffer::new(0x4000);
        mem.map_ram(0x8000, 0x4000, &ram);
        mem.poke(0x8001, 0x42);
        mem.poke(0xBFFF, 0x43);
        assert_eq!(ram.byte(0x0001), 0x42);
        assert_eq!(ram.byte(0x3FFF), 0x43);
        assert_eq!(mem.page(0x8400).read().base(), 0x0400);
    }

    #[test]
    fn banked_rom_from_offset() {
        let mut mem: MemoryMap = MemoryMap::new();
        let mut image = vec![0u8; 0x8000];
        image[0x4000] = 0x77;
        let rom = Buffer::from_bytes(&image);
        mem.map_rom(0x0000, 0x4000, rom.at(0x4000));
        assert_eq!(mem.peek(0x0000), 0x77);
    }

    #[test]
    fn split_ram_reads_and_writes_different_cells() {
        let mut mem: MemoryMap = MemoryMap::new();
        let shown = Buffer::filled(PAGE_SIZE, 0x11);
        let latched = Buffer::new(PAGE_SIZE);
        mem.map_ram_split(0x4000, PAGE_SIZE as u32, &shown, &latched);
        mem.poke(0x4003, 0x99);
        assert_eq!(mem.peek(0x4003), 0x11);
        assert_eq!(latched.byte(3), 0x99);
    }

    #[test]
    fn write_only_memory() {
        let mut mem: MemoryMap = MemoryMap::new();
        let wom = Buffer::new(PAGE_SIZE);
        mem.map_wom(0xC000, PAGE_SIZE as u32, &wom);
        mem.poke(0xC000, 0x12);
        assert_eq!(wom.byte(0), 0x12);
        assert_eq!(mem.peek(0xC000), OPEN_BUS);
    }

    #[test]
    fn custom_open_bus_page() {
        let mut mem: MemoryMap = MemoryMap::new();
        let fill = Buffer::filled(PAGE_SIZE, 0x38);
        mem.map_no_rom(0x0000, 0x2000, &fill);
        assert_eq!(mem.peek(0x0000), 0x38);
        assert_eq!(mem.peek(0x1FFF), 0x38);
        assert_eq!(mem.peek(0x2000), OPEN_BUS);

        let sink = Buffer::new(PAGE_SIZE);
        mem.map_no_wom(0x0000, 0x0800, &sink);
        mem.poke(0x0401, 0x5A);
        assert_eq!(sink.byte(1), 0x5A);
    }

    #[test]
    fn unmap_restores_sentinels() {
        let mut mem: MemoryMap = MemoryMap::new();
        let ram = Buffer::new(0x10000);
        mem.map_ram(0x0000, 0x10000, &ram);
        mem.unmap_rom(0x0000, 0x0400);
        mem.poke(0x0000, 0x01);
        assert_eq!(mem.peek(0x0000), OPEN_BUS);
        assert_eq!(ram.byte(0), 0x01);

        mem.unmap_wom(0x0400, 0x0400);
        mem.poke(0x0400, 0x02);
        assert_eq!(ram.byte(0x0400), 0x00);

        mem.unmap_all_memory();
        assert!(mem.is_unmapped_read(0x8000));
    }

    #[test]
    fn unmap_memory_drops_only_pages_in_released_range() {
        let mut mem: MemoryMap = MemoryMap::new();
        let ram = Buffer::filled(0x8000, 0x00);
        let other = Buffer::new(0x4000);
        mem.map_ram(0x0000, 0x8000, &ram);
        mem.map_ram(0x8000, 0x4000, &other);

        mem.unmap_memory(&ram, 0x4000, 0x4000);

        assert!(!mem.is_unmapped_read(0x3FFF));
        assert!(mem.is_unmapped_read(0x4000));
        assert!(mem.is_unmapped_write(0x7FFF));
        assert!(!mem.is_unmapped_read(0x8000));
    }

    #[test]
    fn word_access_wraps() {
        let mut mem: MemoryMap = MemoryMap::new();
        let ram = Buffer::new(0x10000);
        mem.map_ram(0x0000, 0x10000, &ram);
        mem.poke2(0xFFFF, 0xBEEF);
        assert_eq!(mem.peek(0xFFFF), 0xEF);
        assert_eq!(mem.peek(0x0000), 0xBE);
        assert_eq!(mem.peek2(0xFFFF), 0xBEEF);
    }

    #[test]
    fn block_copies_respect_rom() {
        let mut mem: MemoryMap = MemoryMap::new();
        let rom = Buffer::filled(PAGE_SIZE, 0xEE);
        let ram = Buffer::new(PAGE_SIZE);
        mem.map_rom(0x0000, PAGE_SIZE as u32, &rom);
        mem.map_ram(0x0400, PAGE_SIZE as u32, &ram);

        mem.copy_buffer_to_ram(&[1, 2, 3, 4], 0x03FE);
        let mut out = [0u8; 4];
        mem.copy_ram_to_buffer(0x03FE, &mut out);
        assert_eq!(out, [0xEE, 0xEE, 3, 4]);
    }

    #[test]
    fn tagged_cells_keep_tags_through_copies() {
        let mut mem: MemoryMap<u16> = MemoryMap::new();
        let ram: Buffer<u16> = Buffer::new(PAGE_SIZE);
        ram.cells_mut()[0] = 0x0400;
        mem.map_ram(0x0000, PAGE_SIZE as u32, &ram);

        mem.copy_cells_to_ram(&[0x0155u16], 0x0000);
        assert_eq!(ram.cells()[0], 0x0455);

        let mut out = [0xFF00u16; 1];
        mem.copy_ram_to_cells(0x0000, &mut out);
        assert_eq!(out[0], 0xFF55);
        assert_eq!(mem.store(0x0000, 0x01), crate::cell::TAG_BREAK_WRITE);
    }

    #[test]
    #[should_panic(expected = "not page aligned")]
    fn misaligned_mapping_panics() {
        let mut mem: MemoryMap = MemoryMap::new();
        let ram = Buffer::new(0x10000);
        mem.map_ram(0x0001, PAGE_SIZE as u32, &ram);
    }

    #[test]
    #[should_panic(expected = "empty mapping")]
    fn empty_mapping_panics() {
        let mut mem: MemoryMap = MemoryMap::new();
        mem.unmap_ram(0x0000, 0);
    }

    #[test]
    #[should_panic(expected = "cannot back")]
    fn short_buffer_panics() {
        let mut mem: MemoryMap = MemoryMap::new();
        let ram = Buffer::new(0x100);
        mem.map_ram(0x0000, PAGE_SIZE as u32, &ram);
    }
}
