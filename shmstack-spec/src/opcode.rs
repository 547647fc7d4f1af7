//! # Stack Operators
//!
//! Zero-operand instructions. Each one takes its inputs from the top of the
//! stack and pushes exactly one result.
//!
//! ## Operator Families
//!
//! - Unsigned integer: ADD, SUB, MUL, DIV, MOD, POW (plus signed MULS, DIVS, MODS, POWS)
//! - Single precision: ADDF, SUBF, MULF, DIVF, POWF
//! - Double precision: ADDD, SUBD, MULD, DIVD, POWD
//! - Logical: NOT, AND, OR, XOR
//! - Bitwise: INV, BAND, BOR, BXOR
//! - Conversion: ITOF, ITOD, FTOI, DTOI, FTOD, DTOF
//! - Relational: EQ, NE, LT, GT, LE, GE and the signed/double variants
//! - Stack: DUP
//! - Math (double): ABS, SQRT, CBRT, LN, LOG, LG, SIN, COS, TAN, ASIN, ACOS, ATAN, ATANXY
//!
//! For binary operators the right operand is on top of the stack and the left
//! operand directly below it.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ========== Unsigned / signed integer ==========
    /// ADD: l + r (wrapping)
    Add,
    /// SUB: l - r (wrapping)
    Sub,
    /// MUL: l * r (wrapping)
    Mul,
    /// MULS: l * r as i64 (wrapping)
    Muls,
    /// DIV: l / r
    Div,
    /// DIVS: l / r as i64
    Divs,
    /// MOD: l % r
    Mod,
    /// MODS: l % r as i64
    Mods,
    /// POW: l ** r (wrapping)
    Pow,
    /// POWS: l ** r as i64
    Pows,

    // ========== Single precision ==========
    Addf,
    Subf,
    Mulf,
    Divf,
    Powf,

    // ========== Double precision ==========
    Addd,
    Subd,
    Muld,
    Divd,
    Powd,

    // ========== Logical ==========
    /// NOT: 1 if zero, else 0
    Not,
    And,
    Or,
    Xor,

    // ========== Bitwise ==========
    /// INV: bitwise complement
    Inv,
    Band,
    Bor,
    Bxor,

    // ========== Conversion ==========
    /// ITOF: unsigned integer to f32
    Itof,
    /// ITOD: unsigned integer to f64
    Itod,
    /// FTOI: f32 to unsigned integer (saturating)
    Ftoi,
    /// DTOI: f64 to unsigned integer (saturating)
    Dtoi,
    Ftod,
    Dtof,

    // ========== Relational ==========
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Lts,
    Gts,
    Les,
    Ges,
    Ltd,
    Gtd,
    Led,
    Ged,

    // ========== Stack ==========
    /// DUP: push a copy of the top
    Dup,

    // ========== Math (double) ==========
    Abs,
    Sqrt,
    Cbrt,
    /// LN: natural logarithm
    Ln,
    /// LOG: base 10 logarithm
    Log,
    /// LG: base 2 logarithm
    Lg,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    /// ATANXY: atan2(y, x) with x below and y on top
    Atanxy,
}

impl Opcode {
    /// Every opcode, in mnemonic table order
    pub const ALL: [Opcode; 62] = [
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Muls,
        Opcode::Div,
        Opcode::Divs,
        Opcode::Mod,
        Opcode::Mods,
        Opcode::Pow,
        Opcode::Pows,
        Opcode::Addf,
        Opcode::Subf,
        Opcode::Mulf,
        Opcode::Divf,
        Opcode::Powf,
        Opcode::Addd,
        Opcode::Subd,
        Opcode::Muld,
        Opcode::Divd,
        Opcode::Powd,
        Opcode::Not,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Inv,
        Opcode::Band,
        Opcode::Bor,
        Opcode::Bxor,
        Opcode::Itof,
        Opcode::Itod,
        Opcode::Ftoi,
        Opcode::Dtoi,
        Opcode::Ftod,
        Opcode::Dtof,
        Opcode::Eq,
        Opcode::Ne,
        Opcode::Lt,
        Opcode::Gt,
        Opcode::Le,
        Opcode::Ge,
        Opcode::Lts,
        Opcode::Gts,
        Opcode::Les,
        Opcode::Ges,
        Opcode::Ltd,
        Opcode::Gtd,
        Opcode::Led,
        Opcode::Ged,
        Opcode::Dup,
        Opcode::Abs,
        Opcode::Sqrt,
        Opcode::Cbrt,
        Opcode::Ln,
        Opcode::Log,
        Opcode::Lg,
        Opcode::Sin,
        Opcode::Cos,
        Opcode::Tan,
        Opcode::Asin,
        Opcode::Acos,
        Opcode::Atan,
        Opcode::Atanxy,
    ];

    /// Mnemonic as written in program text
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Muls => "MULS",
            Opcode::Div => "DIV",
            Opcode::Divs => "DIVS",
            Opcode::Mod => "MOD",
            Opcode::Mods => "MODS",
            Opcode::Pow => "POW",
            Opcode::Pows => "POWS",
            Opcode::Addf => "ADDF",
            Opcode::Subf => "SUBF",
            Opcode::Mulf => "MULF",
            Opcode::Divf => "DIVF",
            Opcode::Powf => "POWF",
            Opcode::Addd => "ADDD",
            Opcode::Subd => "SUBD",
            Opcode::Muld => "MULD",
            Opcode::Divd => "DIVD",
            Opcode::Powd => "POWD",
            Opcode::Not => "NOT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Inv => "INV",
            Opcode::Band => "BAND",
            Opcode::Bor => "BOR",
            Opcode::Bxor => "BXOR",
            Opcode::Itof => "ITOF",
            Opcode::Itod => "ITOD",
            Opcode::Ftoi => "FTOI",
            Opcode::Dtoi => "DTOI",
            Opcode::Ftod => "FTOD",
            Opcode::Dtof => "DTOF",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Le => "LE",
            Opcode::Ge => "GE",
            Opcode::Lts => "LTS",
            Opcode::Gts => "GTS",
            Opcode::Les => "LES",
            Opcode::Ges => "GES",
            Opcode::Ltd => "LTD",
            Opcode::Gtd => "GTD",
            Opcode::Led => "LED",
            Opcode::Ged => "GED",
            Opcode::Dup => "DUP",
            Opcode::Abs => "ABS",
            Opcode::Sqrt => "SQRT",
            Opcode::Cbrt => "CBRT",
            Opcode::Ln => "LN",
            Opcode::Log => "LOG",
            Opcode::Lg => "LG",
            Opcode::Sin => "SIN",
            Opcode::Cos => "COS",
            Opcode::Tan => "TAN",
            Opcode::Asin => "ASIN",
            Opcode::Acos => "ACOS",
            Opcode::Atan => "ATAN",
            Opcode::Atanxy => "ATANXY",
        }
    }

    /// Look up an opcode by mnemonic. `ATAN2` is accepted as an alias of `ATANXY`.
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        if s == "ATAN2" {
            return Some(Opcode::Atanxy);
        }
        Self::ALL.iter().copied().find(|op| op.mnemonic() == s)
    }

    /// Number of stack words consumed
    pub const fn operands(self) -> usize {
        match self {
            Opcode::Not
            | Opcode::Inv
            | Opcode::Itof
            | Opcode::Itod
            | Opcode::Ftoi
            | Opcode::Dtoi
            | Opcode::Ftod
            | Opcode::Dtof
            | Opcode::Dup
            | Opcode::Abs
            | Opcode::Sqrt
            | Opcode::Cbrt
            | Opcode::Ln
            | Opcode::Log
            | Opcode::Lg
            | Opcode::Sin
            | Opcode::Cos
            | Opcode::Tan
            | Opcode::Asin
            | Opcode::Acos
            | Opcode::Atan => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mnemonic_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
    }

    #[test]
    fn test_mnemonics_unique() {
        let names: HashSet<_> = Opcode::ALL.iter().map(|op| op.mnemonic()).collect();
        assert_eq!(names.len(), Opcode::ALL.len());
    }

    #[test]
    fn test_atan2_alias() {
        assert_eq!(Opcode::from_mnemonic("ATAN2"), Some(Opcode::Atanxy));
        assert_eq!(Opcode::Atanxy.to_string(), "ATANXY");
    }

    #[test]
    fn test_unknown_and_case_sensitive() {
        assert_eq!(Opcode::from_mnemonic("add"), None);
        assert_eq!(Opcode::from_mnemonic("PUSH"), None);
        assert_eq!(Opcode::from_mnemonic("JZ"), None);
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Opcode::Add.operands(), 2);
        assert_eq!(Opcode::Atanxy.operands(), 2);
        assert_eq!(Opcode::Not.operands(), 1);
        assert_eq!(Opcode::Dup.operands(), 1);
        assert_eq!(Opcode::Dtof.operands(), 1);
    }
}
