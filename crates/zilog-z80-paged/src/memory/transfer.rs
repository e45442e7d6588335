//! Streaming memory to and from external storage.
//!
//! Bytes go through the page table exactly as with
//! [`MemoryMap::copy_buffer_to_ram`] and [`MemoryMap::copy_ram_to_buffer`];
//! only the source or sink differs.

#![allow(clippy::cast_possible_truncation)] // Offsets wrap at 64K.

use std::io::{ErrorKind, Read, Write};

use super::map::{MemoryMap, PAGE_SIZE};
use crate::cell::CoreByte;
use crate::error::TransferError;

impl<C: CoreByte> MemoryMap<C> {
    /// Read `count` bytes from `reader` into memory at `address`.
    ///
    /// Bytes that arrived before a failure are already stored.
    pub fn read_ram_from_file<R: Read>(
        &self,
        reader: &mut R,
        address: u16,
        count: usize,
    ) -> Result<(), TransferError> {
        let mut chunk = [0u8; PAGE_SIZE];
        let mut done = 0;
        while done < count {
            let want = (count - done).min(chunk.len());
            let got = match reader.read(&mut chunk[..want]) {
                Ok(0) => {
                    return Err(TransferError::Truncated {
                        transferred: done,
                        requested: count,
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(TransferError::Io {
                        transferred: done,
                        requested: count,
                        source,
                    });
                }
            };
            self.copy_buffer_to_ram(&chunk[..got], address.wrapping_add(done as u16));
            done += got;
        }
        Ok(())
    }

    /// Write `count` bytes of memory starting at `address` to `writer`.
    pub fn write_ram_to_file<W: Write>(
        &self,
        writer: &mut W,
        address: u16,
        count: usize,
    ) -> Result<(), TransferError> {
        let mut chunk = [0u8; PAGE_SIZE];
        let mut done = 0;
        while done < count {
            let len = (count - done).min(chunk.len());
            self.copy_ram_to_buffer(address.wrapping_add(done as u16), &mut chunk[..len]);
            let mut sent = 0;
            while sent < len {
                match writer.write(&chunk[sent..len]) {
                    Ok(0) => {
                        return Err(TransferError::Io {
                            transferred: done + sent,
                            requested: count,
                            source: ErrorKind::WriteZero.into(),
                        });
                    }
                    Ok(n) => sent += n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(source) => {
                        return Err(TransferError::Io {
                            transferred: done + sent,
                            requested: count,
                            source,
                        });
                    }
                }
            }
            done += len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;
    use crate::memory::Buffer;

    fn ram_map() -> (MemoryMap, Buffer) {
        let mut mem = MemoryMap::new();
        let ram = Buffer::new(0x10000);
        mem.map_ram(0x0000, 0x10000, &ram);
        (mem, ram)
    }

    #[test]
    fn reads_stream_into_memory() {
        let (mem, ram) = ram_map();
        let data: Vec<u8> = (0..3000u32).map(|i| i as u8).collect();
        mem.read_ram_from_file(&mut Cursor::new(&data), 0x8000, data.len())
            .expect("read");
        assert_eq!(ram.byte(0x8000), 0);
        assert_eq!(ram.byte(0x8000 + 2999), (2999u32 & 0xFF) as u8);
    }

    #[test]
    fn short_input_reports_count() {
        let (mem, _) = ram_map();
        let err = mem
            .read_ram_from_file(&mut Cursor::new(vec![1u8; 10]), 0, 20)
            .expect_err("should be truncated");
        assert_eq!(err.transferred(), 10);
        assert!(matches!(err, TransferError::Truncated { requested: 20, .. }));
    }

    #[test]
    fn writes_memory_to_stream() {
        let (mem, _) = ram_map();
        mem.copy_buffer_to_ram(&[9, 8, 7], 0xFFFF);
        let mut out = Vec::new();
        mem.write_ram_to_file(&mut out, 0xFFFF, 3).expect("write");
        assert_eq!(out, vec![9, 8, 7]);
    }

    struct FailAfter(usize);

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.0 == 0 {
                return Err(io::Error::other("disk full"));
            }
            let n = buf.len().min(self.0);
            self.0 -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_failure_reports_count() {
        let (mem, _) = ram_map();
        let err = mem
            .write_ram_to_file(&mut FailAfter(1500), 0, 4096)
            .expect_err("writer fails");
        assert_eq!(err.transferred(), 1500);
        assert!(matches!(err, TransferError::Io { .. }));
    }
}
