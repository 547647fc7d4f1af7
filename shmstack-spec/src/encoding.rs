//! # Cell Encodings
//!
//! An [`Encoding`] selects how a [`Word`] is translated to and from the raw
//! bytes of one memory cell: the field width, the byte order of the cell, and
//! whether multi-register values are stored register-reversed.
//!
//! ## Cell model
//!
//! A real memory cell of `n` bytes (1, 2, 4 or 8) is read as an unsigned
//! `n`-byte integer in the encoding's byte order. The encoding then picks a
//! field out of that integer:
//!
//! ```text
//! le1/be1   one bit, selected by the sub-index (0 = least significant)
//! byte      one raw byte, selected by the sub-index (byte offset in the cell)
//! *16..*64  the low `width` bits; the width may not exceed the cell size
//! ```
//!
//! Register-reversed variants model field devices whose 16-bit registers are
//! byte-correct but stored in reverse order across a wider value:
//!
//! ```text
//! le32r / be32r    [r1 r0]       -> [r0 r1]        (16-bit halves swapped)
//! le64r / be64r    [r3 r2 r1 r0] -> [r0 r1 r2 r3]  (16-bit registers reversed)
//! le64r4 / be64r4  [h1 h0]       -> [h0 h1]        (32-bit halves swapped)
//! ```
//!
//! Every reordering is its own inverse, so loads and stores apply the same
//! function.

use crate::error::SpecError;
use crate::word::Word;
use crate::VALID_CELL_SIZES;
use std::fmt;
use std::str::FromStr;

/// Byte order of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Sub-word ordering applied after byte order correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterOrder {
    /// Registers in natural order
    Natural,
    /// 16-bit registers reversed
    Reversed16,
    /// 32-bit halves swapped
    Reversed32,
}

/// Load/store encoding of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Single bit, little endian cell
    Le1,
    /// Single bit, big endian cell
    Be1,
    /// Single byte
    Byte,
    /// 16 bit little endian
    Le16,
    /// 16 bit big endian
    Be16,
    /// 32 bit little endian
    Le32,
    /// 32 bit big endian
    Be32,
    /// 32 bit little endian, 16-bit registers reversed
    Le32r,
    /// 32 bit big endian, 16-bit registers reversed
    Be32r,
    /// 64 bit little endian
    Le64,
    /// 64 bit big endian
    Be64,
    /// 64 bit little endian, 16-bit registers reversed
    Le64r,
    /// 64 bit big endian, 16-bit registers reversed
    Be64r,
    /// 64 bit little endian, 32-bit registers reversed
    Le64r4,
    /// 64 bit big endian, 32-bit registers reversed
    Be64r4,
}

impl Encoding {
    /// All encodings in declaration order
    pub const ALL: [Encoding; 15] = [
        Encoding::Le1,
        Encoding::Be1,
        Encoding::Byte,
        Encoding::Le16,
        Encoding::Be16,
        Encoding::Le32,
        Encoding::Be32,
        Encoding::Le32r,
        Encoding::Be32r,
        Encoding::Le64,
        Encoding::Be64,
        Encoding::Le64r,
        Encoding::Be64r,
        Encoding::Le64r4,
        Encoding::Be64r4,
    ];

    /// Tag as written in program text
    pub const fn tag(self) -> &'static str {
        match self {
            Encoding::Le1 => "le1",
            Encoding::Be1 => "be1",
            Encoding::Byte => "byte",
            Encoding::Le16 => "le16",
            Encoding::Be16 => "be16",
            Encoding::Le32 => "le32",
            Encoding::Be32 => "be32",
            Encoding::Le32r => "le32r",
            Encoding::Be32r => "be32r",
            Encoding::Le64 => "le64",
            Encoding::Be64 => "be64",
            Encoding::Le64r => "le64r",
            Encoding::Be64r => "be64r",
            Encoding::Le64r4 => "le64r4",
            Encoding::Be64r4 => "be64r4",
        }
    }

    /// Look up an encoding by its tag (case-sensitive)
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.tag() == tag)
    }

    /// Field width in bits
    pub const fn width_bits(self) -> u32 {
        match self {
            Encoding::Le1 | Encoding::Be1 => 1,
            Encoding::Byte => 8,
            Encoding::Le16 | Encoding::Be16 => 16,
            Encoding::Le32 | Encoding::Be32 | Encoding::Le32r | Encoding::Be32r => 32,
            Encoding::Le64
            | Encoding::Be64
            | Encoding::Le64r
            | Encoding::Be64r
            | Encoding::Le64r4
            | Encoding::Be64r4 => 64,
        }
    }

    /// True for the single-bit encodings
    pub const fn is_bit(self) -> bool {
        matches!(self, Encoding::Le1 | Encoding::Be1)
    }

    /// True if the encoding addresses part of a cell through a sub-index
    pub const fn uses_sub_index(self) -> bool {
        matches!(self, Encoding::Le1 | Encoding::Be1 | Encoding::Byte)
    }

    pub const fn byte_order(self) -> ByteOrder {
        match self {
            Encoding::Be1
            | Encoding::Be16
            | Encoding::Be32
            | Encoding::Be32r
            | Encoding::Be64
            | Encoding::Be64r
            | Encoding::Be64r4 => ByteOrder::Big,
            _ => ByteOrder::Little,
        }
    }

    pub const fn register_order(self) -> RegisterOrder {
        match self {
            Encoding::Le32r | Encoding::Be32r | Encoding::Le64r | Encoding::Be64r => {
                RegisterOrder::Reversed16
            }
            Encoding::Le64r4 | Encoding::Be64r4 => RegisterOrder::Reversed32,
            _ => RegisterOrder::Natural,
        }
    }

    /// Mask of the low `width_bits` bits
    pub const fn mask(self) -> Word {
        match self.width_bits() {
            64 => Word::MAX,
            bits => (1 << bits) - 1,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Encoding {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| SpecError::UnknownEncoding(s.to_string()))
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Reject cell sizes other than 1, 2, 4 and 8 bytes
pub fn check_cell_size(cell_size: usize) -> Result<(), SpecError> {
    if VALID_CELL_SIZES.contains(&cell_size) {
        Ok(())
    } else {
        Err(SpecError::InvalidCellSize(cell_size))
    }
}

/// Validate that `encoding` can address `sub_index` inside a cell of `cell_size` bytes
pub fn check_access(cell_size: usize, encoding: Encoding, sub_index: usize) -> Result<(), SpecError> {
    check_cell_size(cell_size)?;

    let limit = match encoding {
        Encoding::Le1 | Encoding::Be1 => cell_size * 8,
        Encoding::Byte => cell_size,
        _ => {
            let bits = encoding.width_bits();
            if bits as usize > cell_size * 8 {
                return Err(SpecError::UnsupportedWidth { bits, cell_size });
            }
            1
        }
    };

    if sub_index >= limit {
        return Err(SpecError::SubIndexOutOfRange {
            index: sub_index,
            limit,
        });
    }
    Ok(())
}

/// Masks a Word to the encoding's width. This is all a word-sized cell needs.
#[inline]
pub fn truncate(value: Word, encoding: Encoding) -> Word {
    value & encoding.mask()
}

/// Read raw cell bytes as an unsigned integer
pub fn cell_to_int(cell: &[u8], order: ByteOrder) -> Word {
    let n = cell.len();
    debug_assert!(n <= 8);
    let mut buf = [0u8; 8];
    match order {
        ByteOrder::Little => {
            buf[..n].copy_from_slice(cell);
            Word::from_le_bytes(buf)
        }
        ByteOrder::Big => {
            buf[8 - n..].copy_from_slice(cell);
            Word::from_be_bytes(buf)
        }
    }
}

/// Write the low `cell.len()` bytes of `value` into the cell
pub fn int_to_cell(value: Word, order: ByteOrder, cell: &mut [u8]) {
    let n = cell.len();
    debug_assert!(n <= 8);
    match order {
        ByteOrder::Little => cell.copy_from_slice(&value.to_le_bytes()[..n]),
        ByteOrder::Big => cell.copy_from_slice(&value.to_be_bytes()[8 - n..]),
    }
}

/// Apply the encoding's register reordering to a width-sized value
pub fn reorder_registers(value: Word, encoding: Encoding) -> Word {
    match (encoding.register_order(), encoding.width_bits()) {
        (RegisterOrder::Reversed16, 32) => (value as u32).rotate_left(16) as Word,
        (RegisterOrder::Reversed16, 64) => {
            let r0 = value & 0xFFFF;
            let r1 = (value >> 16) & 0xFFFF;
            let r2 = (value >> 32) & 0xFFFF;
            let r3 = value >> 48;
            (r0 << 48) | (r1 << 32) | (r2 << 16) | r3
        }
        (RegisterOrder::Reversed32, 64) => value.rotate_left(32),
        _ => value,
    }
}

/// Decode the field selected by `encoding` and `sub_index` from one raw cell
pub fn decode(cell: &[u8], encoding: Encoding, sub_index: usize) -> Result<Word, SpecError> {
    check_access(cell.len(), encoding, sub_index)?;

    let value = match encoding {
        Encoding::Byte => cell[sub_index] as Word,
        Encoding::Le1 | Encoding::Be1 => {
            (cell_to_int(cell, encoding.byte_order()) >> sub_index) & 1
        }
        _ => {
            let raw = cell_to_int(cell, encoding.byte_order());
            reorder_registers(truncate(raw, encoding), encoding)
        }
    };
    Ok(value)
}

/// Encode `value` into the field selected by `encoding` and `sub_index`.
///
/// Bits outside the field keep their previous contents.
pub fn encode(value: Word, cell: &mut [u8], encoding: Encoding, sub_index: usize) -> Result<(), SpecError> {
    check_access(cell.len(), encoding, sub_index)?;

    match encoding {
        Encoding::Byte => cell[sub_index] = value as u8,
        Encoding::Le1 | Encoding::Be1 => {
            let order = encoding.byte_order();
            let bit = 1 << sub_index;
            let mut raw = cell_to_int(cell, order);
            if value != 0 {
                raw |= bit;
            } else {
                raw &= !bit;
            }
            int_to_cell(raw, order, cell);
        }
        _ => {
            let order = encoding.byte_order();
            let mask = encoding.mask();
            let field = reorder_registers(truncate(value, encoding), encoding);
            let raw = if encoding.width_bits() as usize == cell.len() * 8 {
                field
            } else {
                (cell_to_int(cell, order) & !mask) | field
            };
            int_to_cell(raw, order, cell);
        }
    }
    Ok(())
}
