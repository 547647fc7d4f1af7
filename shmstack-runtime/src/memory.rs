//! Memory subsystem
//!
//! Two region kinds share the [`Memory`] contract:
//! - [`LocalMemory`]: an array of Words owned by the machine. The encoding only
//!   masks stored values.
//! - [`RealMemory`]: raw bytes split into cells of 1, 2, 4 or 8 bytes. Loads and
//!   stores go through the cell codec in [`shmstack_spec::encoding`].

use crate::error::{Result, RuntimeError};
use crate::shm::ByteBacking;
use shmstack_spec::encoding;
use shmstack_spec::{Encoding, Word};

/// Region kind, as declared in `__MEM`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Local,
    Real { cell_size: usize },
}

pub trait Memory: Send {
    fn kind(&self) -> MemoryKind;

    /// Number of addressable cells
    fn cells(&self) -> usize;

    fn load(&self, cell: usize, encoding: Encoding, sub_index: Option<usize>) -> Result<Word>;

    fn store(&mut self, value: Word, cell: usize, encoding: Encoding, sub_index: Option<usize>) -> Result<()>;

    fn check_cell(&self, cell: usize) -> Result<()> {
        let cells = self.cells();
        if cell < cells {
            Ok(())
        } else {
            Err(RuntimeError::CellOutOfRange { cell, cells })
        }
    }
}

// =============================================================================
// Local
// =============================================================================

#[derive(Debug, Clone)]
pub struct LocalMemory {
    data: Vec<Word>,
}

impl LocalMemory {
    /// Zero-initialized region of `cells` Words
    pub fn new(cells: usize) -> Self {
        Self {
            data: vec![0; cells],
        }
    }
}

impl Memory for LocalMemory {
    fn kind(&self) -> MemoryKind {
        MemoryKind::Local
    }

    fn cells(&self) -> usize {
        self.data.len()
    }

    fn load(&self, cell: usize, _encoding: Encoding, sub_index: Option<usize>) -> Result<Word> {
        if sub_index.is_some() {
            return Err(RuntimeError::LocalSubIndex);
        }
        self.check_cell(cell)?;
        Ok(self.data[cell])
    }

    fn store(&mut self, value: Word, cell: usize, encoding: Encoding, sub_index: Option<usize>) -> Result<()> {
        if sub_index.is_some() {
            return Err(RuntimeError::LocalSubIndex);
        }
        self.check_cell(cell)?;
        self.data[cell] = encoding::truncate(value, encoding);
        Ok(())
    }
}

// =============================================================================
// Real
// =============================================================================

/// Byte-addressed region over any [`ByteBacking`]
pub struct RealMemory<B: ByteBacking> {
    backing: B,
    cell_size: usize,
}

impl<B: ByteBacking> RealMemory<B> {
    /// Wrap `backing`, split into cells of `cell_size` bytes.
    ///
    /// Trailing bytes that do not fill a whole cell are not addressable.
    pub fn new(backing: B, cell_size: usize) -> Result<Self> {
        encoding::check_cell_size(cell_size)?;
        Ok(Self { backing, cell_size })
    }

    pub fn cell_size(&self) -> usize {
        self.cell_size
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    fn read_cell(&self, cell: usize) -> Result<[u8; 8]> {
        self.check_cell(cell)?;
        let mut buf = [0u8; 8];
        self.backing.read(cell * self.cell_size, &mut buf[..self.cell_size]);
        Ok(buf)
    }
}

impl<B: ByteBacking> Memory for RealMemory<B> {
    fn kind(&self) -> MemoryKind {
        MemoryKind::Real {
            cell_size: self.cell_size,
        }
    }

    fn cells(&self) -> usize {
        self.backing.len() / self.cell_size
    }

    fn load(&self, cell: usize, encoding: Encoding, sub_index: Option<usize>) -> Result<Word> {
        let buf = self.read_cell(cell)?;
        let value = encoding::decode(&buf[..self.cell_size], encoding, sub_index.unwrap_or(0))?;
        Ok(value)
    }

    fn store(&mut self, value: Word, cell: usize, encoding: Encoding, sub_index: Option<usize>) -> Result<()> {
        let mut buf = self.read_cell(cell)?;
        let bytes = &mut buf[..self.cell_size];
        encoding::encode(value, bytes, encoding, sub_index.unwrap_or(0))?;
        self.backing.write(cell * self.cell_size, bytes);
        Ok(())
    }
}

impl<B: ByteBacking> std::fmt::Debug for RealMemory<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealMemory")
            .field("bytes", &self.backing.len())
            .field("cell_size", &self.cell_size)
            .finish()
    }
}
