//! Word representation and bit reinterpretation.
//!
//! A [`Word`] has no type of its own. Each instruction decides whether it
//! reads the pattern as unsigned, signed, single or double precision. The
//! helpers here are the only place that reinterpretation happens, so every
//! operator agrees on where an `f32` lives inside a Word (the low 32 bits,
//! upper half zero).

/// Untyped 64-bit stack and memory slot
pub type Word = u64;

/// Two's complement view of a [`Word`]
pub type SignedWord = i64;

/// Width of a Word in bits
pub const WORD_BITS: u32 = Word::BITS;

/// Canonical true value pushed by relational and logical operators
pub const TRUE: Word = 1;

/// Canonical false value
pub const FALSE: Word = 0;

#[inline]
pub fn from_bool(value: bool) -> Word {
    if value {
        TRUE
    } else {
        FALSE
    }
}

/// Any nonzero pattern is true
#[inline]
pub fn to_bool(word: Word) -> bool {
    word != 0
}

#[inline]
pub fn from_i64(value: SignedWord) -> Word {
    value as Word
}

#[inline]
pub fn to_i64(word: Word) -> SignedWord {
    word as SignedWord
}

/// Stores the single-precision bit pattern zero-extended into a Word
#[inline]
pub fn from_f32(value: f32) -> Word {
    value.to_bits() as Word
}

/// Reads the low 32 bits as single precision; the upper half is ignored
#[inline]
pub fn to_f32(word: Word) -> f32 {
    f32::from_bits(word as u32)
}

#[inline]
pub fn from_f64(value: f64) -> Word {
    value.to_bits()
}

#[inline]
pub fn to_f64(word: Word) -> f64 {
    f64::from_bits(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_is_zero_extended() {
        let word = from_f32(-1.5);
        assert_eq!(word >> 32, 0);
        assert_eq!(to_f32(word), -1.5);
    }

    #[test]
    fn test_f32_ignores_upper_half() {
        let word = from_f32(2.25) | 0xDEAD_BEEF_0000_0000;
        assert_eq!(to_f32(word), 2.25);
    }

    #[test]
    fn test_f64_bit_pattern() {
        assert_eq!(from_f64(1.0), 0x3FF0_0000_0000_0000);
        assert_eq!(to_f64(0x4000_0000_0000_0000), 2.0);
    }

    #[test]
    fn test_signed_reinterpretation() {
        assert_eq!(from_i64(-1), Word::MAX);
        assert_eq!(to_i64(Word::MAX), -1);
        assert_eq!(to_i64(from_i64(i64::MIN)), i64::MIN);
    }

    #[test]
    fn test_bool_words() {
        assert_eq!(from_bool(true), 1);
        assert_eq!(from_bool(false), 0);
        assert!(to_bool(0x8000_0000_0000_0000));
        assert!(!to_bool(0));
    }
}
