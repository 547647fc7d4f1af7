//! Bounded Word stack and the stack operators.
//!
//! Every operator checks its operand count before touching the stack, so a
//! failing operator leaves the stack exactly as it was.

use crate::error::{Result, RuntimeError};
use shmstack_spec::word::{self, from_bool, from_f32, from_f64, to_f32, to_f64, to_i64};
use shmstack_spec::{Opcode, SignedWord, Word, MIN_STACK_SIZE};

#[derive(Debug, Clone)]
pub struct StackMachine {
    stack: Vec<Word>,
    capacity: usize,
}

impl StackMachine {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < MIN_STACK_SIZE {
            return Err(RuntimeError::StackTooSmall {
                requested: capacity,
                minimum: MIN_STACK_SIZE,
            });
        }
        Ok(Self {
            stack: Vec::with_capacity(capacity),
            capacity,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Contents, bottom first
    pub fn as_slice(&self) -> &[Word] {
        &self.stack
    }

    pub fn push(&mut self, value: Word) -> Result<()> {
        if self.stack.len() >= self.capacity {
            return Err(RuntimeError::StackFull {
                capacity: self.capacity,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Word> {
        self.stack.pop().ok_or(RuntimeError::StackEmpty)
    }

    pub fn peek(&self) -> Result<Word> {
        self.stack.last().copied().ok_or(RuntimeError::StackEmpty)
    }

    pub fn duplicate(&mut self) -> Result<()> {
        self.require(1)?;
        let top = self.peek()?;
        self.push(top)
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    fn require(&self, required: usize) -> Result<()> {
        let available = self.stack.len();
        if available < required {
            return Err(RuntimeError::TooFewOperands {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Replace the top Word with `f(top)`
    fn unary(&mut self, f: impl FnOnce(Word) -> Word) -> Result<()> {
        self.require(1)?;
        let top = self.stack.len() - 1;
        self.stack[top] = f(self.stack[top]);
        Ok(())
    }

    /// Replace the top two Words with `f(left, right)`, right being the top
    fn binary(&mut self, f: impl FnOnce(Word, Word) -> Result<Word>) -> Result<()> {
        self.require(2)?;
        let len = self.stack.len();
        let result = f(self.stack[len - 2], self.stack[len - 1])?;
        self.stack.truncate(len - 2);
        self.stack.push(result);
        Ok(())
    }

    fn binary_f32(&mut self, f: impl FnOnce(f32, f32) -> f32) -> Result<()> {
        self.binary(|l, r| Ok(from_f32(f(to_f32(l), to_f32(r)))))
    }

    fn binary_f64(&mut self, f: impl FnOnce(f64, f64) -> f64) -> Result<()> {
        self.binary(|l, r| Ok(from_f64(f(to_f64(l), to_f64(r)))))
    }

    fn unary_f64(&mut self, f: impl FnOnce(f64) -> f64) -> Result<()> {
        self.unary(|v| from_f64(f(to_f64(v))))
    }

    fn compare(&mut self, f: impl FnOnce(Word, Word) -> bool) -> Result<()> {
        self.binary(|l, r| Ok(from_bool(f(l, r))))
    }

    fn compare_signed(&mut self, f: impl FnOnce(SignedWord, SignedWord) -> bool) -> Result<()> {
        self.binary(|l, r| Ok(from_bool(f(to_i64(l), to_i64(r)))))
    }

    fn compare_f64(&mut self, f: impl FnOnce(f64, f64) -> bool) -> Result<()> {
        self.binary(|l, r| Ok(from_bool(f(to_f64(l), to_f64(r)))))
    }

    /// Apply one zero-operand operator
    pub fn apply(&mut self, op: Opcode) -> Result<()> {
        match op {
            // ========== Integer ==========
            Opcode::Add => self.binary(|l, r| Ok(l.wrapping_add(r))),
            Opcode::Sub => self.binary(|l, r| Ok(l.wrapping_sub(r))),
            Opcode::Mul => self.binary(|l, r| Ok(l.wrapping_mul(r))),
            Opcode::Muls => self.binary(|l, r| Ok(to_i64(l).wrapping_mul(to_i64(r)) as Word)),
            Opcode::Div => self.binary(|l, r| {
                l.checked_div(r).ok_or(RuntimeError::DivisionByZero)
            }),
            Opcode::Divs => self.binary(|l, r| {
                if r == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(to_i64(l).wrapping_div(to_i64(r)) as Word)
            }),
            Opcode::Mod => self.binary(|l, r| {
                l.checked_rem(r).ok_or(RuntimeError::DivisionByZero)
            }),
            Opcode::Mods => self.binary(|l, r| {
                if r == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(to_i64(l).wrapping_rem(to_i64(r)) as Word)
            }),
            Opcode::Pow => self.binary(|l, r| Ok(ipow(l, r))),
            Opcode::Pows => self.binary(|l, r| Ok(ipow_signed(to_i64(l), to_i64(r)))),

            // ========== Single precision ==========
            Opcode::Addf => self.binary_f32(|l, r| l + r),
            Opcode::Subf => self.binary_f32(|l, r| l - r),
            Opcode::Mulf => self.binary_f32(|l, r| l * r),
            Opcode::Divf => self.binary_f32(|l, r| l / r),
            Opcode::Powf => self.binary_f32(f32::powf),

            // ========== Double precision ==========
            Opcode::Addd => self.binary_f64(|l, r| l + r),
            Opcode::Subd => self.binary_f64(|l, r| l - r),
            Opcode::Muld => self.binary_f64(|l, r| l * r),
            Opcode::Divd => self.binary_f64(|l, r| l / r),
            Opcode::Powd => self.binary_f64(f64::powf),

            // ========== Logical ==========
            Opcode::Not => self.unary(|v| from_bool(!word::to_bool(v))),
            Opcode::And => self.compare(|l, r| l != 0 && r != 0),
            Opcode::Or => self.compare(|l, r| l != 0 || r != 0),
            Opcode::Xor => self.compare(|l, r| (l != 0) != (r != 0)),

            // ========== Bitwise ==========
            Opcode::Inv => self.unary(|v| !v),
            Opcode::Band => self.binary(|l, r| Ok(l & r)),
            Opcode::Bor => self.binary(|l, r| Ok(l | r)),
            Opcode::Bxor => self.binary(|l, r| Ok(l ^ r)),

            // ========== Conversion ==========
            Opcode::Itof => self.unary(|v| from_f32(v as f32)),
            Opcode::Itod => self.unary(|v| from_f64(v as f64)),
            // `as` saturates and maps NaN to 0
            Opcode::Ftoi => self.unary(|v| to_f32(v) as Word),
            Opcode::Dtoi => self.unary(|v| to_f64(v) as Word),
            Opcode::Ftod => self.unary(|v| from_f64(to_f32(v) as f64)),
            Opcode::Dtof => self.unary(|v| from_f32(to_f64(v) as f32)),

            // ========== Relational ==========
            Opcode::Eq => self.compare(|l, r| l == r),
            Opcode::Ne => self.compare(|l, r| l != r),
            Opcode::Lt => self.compare(|l, r| l < r),
            Opcode::Gt => self.compare(|l, r| l > r),
            Opcode::Le => self.compare(|l, r| l <= r),
            Opcode::Ge => self.compare(|l, r| l >= r),
            Opcode::Lts => self.compare_signed(|l, r| l < r),
            Opcode::Gts => self.compare_signed(|l, r| l > r),
            Opcode::Les => self.compare_signed(|l, r| l <= r),
            Opcode::Ges => self.compare_signed(|l, r| l >= r),
            Opcode::Ltd => self.compare_f64(|l, r| l < r),
            Opcode::Gtd => self.compare_f64(|l, r| l > r),
            Opcode::Led => self.compare_f64(|l, r| l <= r),
            Opcode::Ged => self.compare_f64(|l, r| l >= r),

            // ========== Stack ==========
            Opcode::Dup => self.duplicate(),

            // ========== Math ==========
            Opcode::Abs => self.unary_f64(f64::abs),
            Opcode::Sqrt => self.unary_f64(f64::sqrt),
            Opcode::Cbrt => self.unary_f64(f64::cbrt),
            Opcode::Ln => self.unary_f64(f64::ln),
            Opcode::Log => self.unary_f64(f64::log10),
            Opcode::Lg => self.unary_f64(f64::log2),
            Opcode::Sin => self.unary_f64(f64::sin),
            Opcode::Cos => self.unary_f64(f64::cos),
            Opcode::Tan => self.unary_f64(f64::tan),
            Opcode::Asin => self.unary_f64(f64::asin),
            Opcode::Acos => self.unary_f64(f64::acos),
            Opcode::Atan => self.unary_f64(f64::atan),
            Opcode::Atanxy => self.binary_f64(|x, y| y.atan2(x)),
        }
    }
}

/// Integer power by repeated squaring, wrapping on overflow
pub fn ipow(base: Word, exp: Word) -> Word {
    match exp {
        0 => 1,
        1 => base,
        _ => {
            let half = ipow(base, exp / 2);
            let square = half.wrapping_mul(half);
            if exp % 2 == 0 {
                square
            } else {
                base.wrapping_mul(square)
            }
        }
    }
}

/// Signed integer power.
///
/// A negative base yields 0 for every exponent. The recurrence halves the
/// exponent with truncation toward zero, so a negative exponent behaves like
/// its magnitude.
pub fn ipow_signed(base: SignedWord, exp: SignedWord) -> Word {
    if base < 0 {
        return 0;
    }
    ipow(base as Word, exp.unsigned_abs())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_lifo(values in proptest::collection::vec(any::<u64>(), 0..32)) {
            let mut sm = StackMachine::new(32).unwrap();
            for &v in &values {
                sm.push(v).unwrap();
            }
            for &v in values.iter().rev() {
                prop_assert_eq!(sm.pop().unwrap(), v);
            }
            prop_assert!(sm.is_empty());
        }

        #[test]
        fn test_binary_ops_consume_two(l in any::<u64>(), r in 1u64..=u64::MAX) {
            for op in [Opcode::Add, Opcode::Mul, Opcode::Div, Opcode::Mods, Opcode::Band, Opcode::Ltd] {
                let mut sm = StackMachine::new(4).unwrap();
                sm.push(l).unwrap();
                sm.push(r).unwrap();
                sm.apply(op).unwrap();
                prop_assert_eq!(sm.size(), 1);
            }
        }

        #[test]
        fn test_pow_square_law(base in any::<u64>(), exp in 0u64..200) {
            let half = ipow(base, exp);
            prop_assert_eq!(ipow(base, exp * 2), half.wrapping_mul(half));
        }
    }
}
