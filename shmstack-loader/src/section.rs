//! Section splitting
//!
//! Program text is divided by header lines (`__SETTINGS`, `__MEM`, `__VAR`,
//! `__INIT`, `__PROGRAM`). Each header may appear at most once, in any order.
//! Blank and comment-only lines are dropped here.

use crate::error::{LoadError, Result};
use crate::lexer::{tokenize, Token};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Settings,
    Mem,
    Var,
    Init,
    Program,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Settings,
        SectionKind::Mem,
        SectionKind::Var,
        SectionKind::Init,
        SectionKind::Program,
    ];

    pub const fn header(self) -> &'static str {
        match self {
            SectionKind::Settings => "__SETTINGS",
            SectionKind::Mem => "__MEM",
            SectionKind::Var => "__VAR",
            SectionKind::Init => "__INIT",
            SectionKind::Program => "__PROGRAM",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One non-empty line with its 1-based line number
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    pub number: usize,
    pub tokens: Vec<Token>,
}

impl SourceLine {
    /// Normalized text: tokens joined by single spaces, comment removed
    pub fn text(&self) -> String {
        self.words().join(" ")
    }

    pub fn words(&self) -> Vec<String> {
        self.tokens.iter().map(Token::text).collect()
    }

    /// Attach this line's position to an error
    pub fn context(&self, err: LoadError) -> LoadError {
        err.at(self.number, self.text())
    }
}

#[derive(Debug, Default)]
pub struct Sections {
    lines: [Vec<SourceLine>; 5],
}

impl Sections {
    pub fn get(&self, kind: SectionKind) -> &[SourceLine] {
        &self.lines[kind.index()]
    }
}

pub fn split_sections(text: &str) -> Result<Sections> {
    let mut sections = Sections::default();
    let mut seen = [false; 5];
    let mut current: Option<SectionKind> = None;

    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;
        let tokens = tokenize(raw).map_err(|e| e.at(number, raw.trim()))?;
        if tokens.is_empty() {
            continue;
        }
        if let [Token::Header(kind)] = tokens.as_slice() {
            let kind = *kind;
            if seen[kind.index()] {
                return Err(LoadError::DuplicateSection(kind.to_string()).at(number, kind.header()));
            }
            seen[kind.index()] = true;
            current = Some(kind);
            continue;
        }
        let line = SourceLine { number, tokens };
        match current {
            Some(kind) => sections.lines[kind.index()].push(line),
            None => return Err(line.context(LoadError::OutsideSection)),
        }
    }

    Ok(sections)
}
