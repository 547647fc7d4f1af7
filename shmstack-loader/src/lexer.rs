//! # Lexer for shmstack program text
//!
//! Splits one line into tokens. Whitespace runs separate tokens and `#`
//! starts a comment that runs to the end of the line.

use crate::error::{LoadError, Result};
use crate::section::SectionKind;
use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f\x0B]+")] // Skip whitespace
#[logos(skip r"#[^\n]*")] // Skip comments
pub enum Token {
    /// Section header
    #[token("__MEM", |_| SectionKind::Mem)]
    #[token("__SETTINGS", |_| SectionKind::Settings)]
    #[token("__VAR", |_| SectionKind::Var)]
    #[token("__INIT", |_| SectionKind::Init)]
    #[token("__PROGRAM", |_| SectionKind::Program)]
    Header(SectionKind),

    /// Label marker, without the leading `$`
    #[regex(r"\$[^\s#]*", |lex| lex.slice()[1..].to_string())]
    Label(String),

    /// Anything else: mnemonics, names, numbers, addresses
    #[regex(r"[^\s#$][^\s#]*", |lex| lex.slice().to_string())]
    Word(String),
}

impl Token {
    /// Source text of the token
    pub fn text(&self) -> String {
        match self {
            Token::Header(kind) => kind.header().to_string(),
            Token::Label(name) => format!("${}", name),
            Token::Word(word) => word.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Tokenize one line
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => return Err(LoadError::Lex(lexer.slice().to_string())),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_lexer_words_and_whitespace() {
        let tokens = tokenize("  local\t mem   16 ").unwrap();
        assert_eq!(tokens, vec![word("local"), word("mem"), word("16")]);
    }

    #[test]
    fn test_lexer_comments() {
        assert!(tokenize("# whole line").unwrap().is_empty());
        let tokens = tokenize("PUSH x # trailing").unwrap();
        assert_eq!(tokens, vec![word("PUSH"), word("x")]);
        let tokens = tokenize("ADD#glued").unwrap();
        assert_eq!(tokens, vec![word("ADD")]);
    }

    #[test]
    fn test_lexer_headers() {
        assert_eq!(tokenize("__MEM").unwrap(), vec![Token::Header(SectionKind::Mem)]);
        assert_eq!(
            tokenize("__PROGRAM # code").unwrap(),
            vec![Token::Header(SectionKind::Program)]
        );
        // longer words are not headers
        assert_eq!(tokenize("__MEMORY").unwrap(), vec![word("__MEMORY")]);
        assert_eq!(tokenize("__mem").unwrap(), vec![word("__mem")]);
    }

    #[test]
    fn test_lexer_labels() {
        assert_eq!(tokenize("$loop").unwrap(), vec![Token::Label("loop".into())]);
        assert_eq!(tokenize("$").unwrap(), vec![Token::Label(String::new())]);
        assert_eq!(tokenize("a$b").unwrap(), vec![word("a$b")]);
    }

    #[test]
    fn test_lexer_addresses() {
        let tokens = tokenize("io@3.7 le1 flag").unwrap();
        assert_eq!(tokens, vec![word("io@3.7"), word("le1"), word("flag")]);
    }

    #[test]
    fn test_token_text() {
        assert_eq!(Token::Header(SectionKind::Init).text(), "__INIT");
        assert_eq!(Token::Label("x".into()).to_string(), "$x");
    }
}
