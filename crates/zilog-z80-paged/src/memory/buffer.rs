//! Host-owned backing storage.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::cell::CoreByte;

/// A shared handle to a run of memory cells.
///
/// The host creates buffers for its ROMs and RAM banks and hands clones of the
/// handle to the page table. Cloning is cheap and every clone refers to the
/// same cells, so a host can keep editing a buffer (for example to load a
/// cartridge) while it is mapped.
pub struct Buffer<C: CoreByte = u8> {
    cells: Rc<RefCell<Vec<C>>>,
}

impl<C: CoreByte> Buffer<C> {
    /// A buffer of `len` zeroed cells.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self::from_cells(vec![C::default(); len])
    }

    /// A buffer of `len` cells all holding `value`.
    #[must_use]
    pub fn filled(len: usize, value: u8) -> Self {
        Self::from_cells(vec![C::from_byte(value); len])
    }

    /// A buffer initialised from raw bytes, without tags.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_cells(bytes.iter().map(|&b| C::from_byte(b)).collect())
    }

    #[must_use]
    pub fn from_cells(cells: Vec<C>) -> Self {
        Self {
            cells: Rc::new(RefCell::new(cells)),
        }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if both handles refer to the same storage.
    #[must_use]
    pub fn same_storage(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }

    /// Visible byte at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn byte(&self, index: usize) -> u8 {
        self.cells.borrow()[index].byte()
    }

    /// Set the visible byte at `index`, keeping its tags.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set_byte(&self, index: usize, value: u8) {
        self.cells.borrow_mut()[index].set_byte(value);
    }

    /// Copy of the visible bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.borrow().iter().map(|c| c.byte()).collect()
    }

    /// Borrow the cells, tags included.
    #[must_use]
    pub fn cells(&self) -> Ref<'_, Vec<C>> {
        self.cells.borrow()
    }

    /// Mutably borrow the cells, tags included.
    #[must_use]
    pub fn cells_mut(&self) -> RefMut<'_, Vec<C>> {
        self.cells.borrow_mut()
    }

    /// A region of this buffer starting at `offset`.
    #[must_use]
    pub fn at(&self, offset: usize) -> Region<'_, C> {
        Region {
            buffer: self,
            offset,
        }
    }
}

impl<C: CoreByte> Clone for Buffer<C> {
    fn clone(&self) -> Self {
        Self {
            cells: Rc::clone(&self.cells),
        }
    }
}

impl<C: CoreByte> fmt::Debug for Buffer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("handles", &Rc::strong_count(&self.cells))
            .finish()
    }
}

/// A buffer plus the index of the cell that lands on the first mapped
/// address.
///
/// Mapping calls accept either a `&Buffer` (offset 0) or `buffer.at(offset)`,
/// which is how a host maps one bank out of a larger ROM image.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a, C: CoreByte> {
    pub(crate) buffer: &'a Buffer<C>,
    pub(crate) offset: usize,
}

impl<'a, C: CoreByte> From<&'a Buffer<C>> for Region<'a, C> {
    fn from(buffer: &'a Buffer<C>) -> Self {
        Self { buffer, offset: 0 }
    }
}
