//! Numeric literal and address grammars
//!
//! Integers follow C `strtoull` base detection: `0x`/`0X` selects hex, a
//! leading `0` selects octal, anything else is decimal. The whole literal must
//! be consumed and out-of-range values are rejected.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till1},
    character::complete::{char, digit0, hex_digit1, oct_digit1, one_of},
    combinator::{all_consuming, map_res, opt, recognize, rest, value},
    number::complete::recognize_float,
    sequence::{pair, preceded, tuple},
    IResult,
};
use shmstack_spec::{word, Word};

fn hex(input: &str) -> IResult<&str, u64> {
    preceded(tag_no_case("0x"), map_res(hex_digit1, |d| u64::from_str_radix(d, 16)))(input)
}

fn octal(input: &str) -> IResult<&str, u64> {
    preceded(char('0'), map_res(oct_digit1, |d| u64::from_str_radix(d, 8)))(input)
}

fn decimal(input: &str) -> IResult<&str, u64> {
    alt((
        map_res(recognize(pair(one_of("123456789"), digit0)), str::parse::<u64>),
        value(0, tag("0")),
    ))(input)
}

fn magnitude(input: &str) -> IResult<&str, u64> {
    alt((hex, octal, decimal))(input)
}

fn unsigned(input: &str) -> IResult<&str, u64> {
    preceded(opt(char('+')), magnitude)(input)
}

fn signed(input: &str) -> IResult<&str, i64> {
    let (rest, sign) = opt(one_of("+-"))(input)?;
    map_res(magnitude, move |m| {
        let m = i128::from(m);
        i64::try_from(if sign == Some('-') { -m } else { m })
    })(rest)
}

fn special_float(input: &str) -> IResult<&str, f64> {
    let (rest, sign) = opt(one_of("+-"))(input)?;
    let (rest, v) = alt((
        value(f64::INFINITY, tag_no_case("infinity")),
        value(f64::INFINITY, tag_no_case("inf")),
        value(f64::NAN, tag_no_case("nan")),
    ))(rest)?;
    Ok((rest, if sign == Some('-') { -v } else { v }))
}

fn double(input: &str) -> IResult<&str, f64> {
    alt((special_float, map_res(recognize_float, str::parse::<f64>)))(input)
}

// ========== Public parsers ==========

pub fn parse_unsigned(s: &str) -> Option<u64> {
    all_consuming(unsigned)(s).ok().map(|(_, v)| v)
}

pub fn parse_signed(s: &str) -> Option<i64> {
    all_consuming(signed)(s).ok().map(|(_, v)| v)
}

pub fn parse_double(s: &str) -> Option<f64> {
    all_consuming(double)(s).ok().map(|(_, v)| v)
}

/// Value of a variable initializer.
///
/// A leading `-` tries signed then double, anything else tries unsigned then
/// double. Literals that fail both integer grammars (`08`, `1.5`, overflowing
/// values) therefore become double bit patterns.
pub fn parse_variable_value(s: &str) -> Option<Word> {
    let integer = if s.starts_with('-') {
        parse_signed(s).map(word::from_i64)
    } else {
        parse_unsigned(s)
    };
    integer.or_else(|| parse_double(s).map(word::from_f64))
}

// ========== Addresses ==========

/// `<memory>@<cell>[.<sub-index>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address<'a> {
    pub memory: &'a str,
    pub cell: &'a str,
    pub sub_index: Option<&'a str>,
}

fn address(input: &str) -> IResult<&str, Address<'_>> {
    let (input, (memory, cell, sub_index)) = tuple((
        take_till1(|c: char| c == '@'),
        preceded(char('@'), take_till1(|c: char| c == '.')),
        opt(preceded(char('.'), rest)),
    ))(input)?;
    Ok((input, Address { memory, cell, sub_index }))
}

pub fn parse_address(s: &str) -> Option<Address<'_>> {
    all_consuming(address)(s).ok().map(|(_, a)| a)
}
