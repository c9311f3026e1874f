//! Tokens emitted by the matcher
//!
//! Keyword tokens carry the id their lexeme was registered with. Values picked up by
//! placeholders use the two reserved ids below and carry their payload.

use serde::Serialize;
use std::fmt;

/// Integer identifier of a token kind.
pub type TokenId = u32;

/// First id reserved for system tokens. Lexemes must be registered below it.
pub const RESERVED_TOKEN_BASE: TokenId = 1000;

/// Token id of numeric placeholder values (`<#name>`).
pub const VALUE_TOKEN: TokenId = RESERVED_TOKEN_BASE;

/// Token id of label values (`<@name>` and character classes).
pub const LABEL_TOKEN: TokenId = RESERVED_TOKEN_BASE + 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenValue {
    None,
    Number(f64),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub id: TokenId,
    /// Byte offset of the first character of the token.
    pub offset: usize,
    pub line: usize,
    pub value: TokenValue,
}

impl Token {
    pub fn keyword(id: TokenId, offset: usize, line: usize) -> Self {
        Self {
            id,
            offset,
            line,
            value: TokenValue::None,
        }
    }

    pub fn number(value: f64, offset: usize, line: usize) -> Self {
        Self {
            id: VALUE_TOKEN,
            offset,
            line,
            value: TokenValue::Number(value),
        }
    }

    pub fn label(value: impl Into<String>, offset: usize, line: usize) -> Self {
        Self {
            id: LABEL_TOKEN,
            offset,
            line,
            value: TokenValue::Label(value.into()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::None => write!(f, "#{}", self.id),
            TokenValue::Number(n) => write!(f, "{}", n),
            TokenValue::Label(s) => write!(f, "\"{}\"", s),
        }
    }
}
