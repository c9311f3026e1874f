//! Error types for the script compiler
//!
//! Only two kinds of failure ever escape a compile call: a grammar that cannot be
//! built ([GrammarError]) and a broken invariant between the grammar, the action
//! table and the parse context ([CompileError::ContextInvariant]). Everything a script
//! author can get wrong is reported as a [Diagnostic](super::diagnostics::Diagnostic)
//! instead, and compilation carries on.

use super::token::TokenId;
use thiserror::Error;

/// Failure to build a grammar from its BNF text. Always a programming error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrammarError {
    #[error("unrecognised BNF input '{text}' at line {line}")]
    Lex { text: String, line: usize },

    #[error("malformed rule <{rule}> at line {line}: {message}")]
    Syntax {
        rule: String,
        line: usize,
        message: String,
    },

    #[error("rule <{0}> is defined more than once")]
    DuplicateRule(String),

    #[error("rule <{rule}> references undefined rule <{reference}>")]
    UndefinedRule { rule: String, reference: String },

    #[error("start rule <{0}> is not defined")]
    MissingStartRule(String),

    #[error("terminal '{text}' in rule <{rule}> has no registered lexeme")]
    UnknownTerminal { rule: String, text: String },

    #[error(transparent)]
    Lexeme(#[from] LexemeError),
}

/// Failure to register a lexeme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexemeError {
    #[error("lexeme '{0}' is already registered")]
    DuplicateLexeme(String),

    #[error("token id {id} is already used by lexeme '{existing}'")]
    DuplicateTokenId { id: TokenId, existing: String },

    #[error("token id {0} is reserved for system tokens")]
    ReservedTokenId(TokenId),

    #[error("empty lexeme")]
    EmptyLexeme,
}

/// Failure to read the expected token from an action's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("expected {expected} but the statement ended")]
    Exhausted { expected: &'static str },

    #[error("expected {expected} but found token {found}")]
    UnexpectedTokenKind {
        expected: &'static str,
        found: TokenId,
    },
}

/// A value or structure rejected by the builder collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("unknown object handle {0}")]
    UnknownHandle(usize),

    #[error("a {parent} cannot own a {child}")]
    InvalidChild {
        parent: &'static str,
        child: &'static str,
    },

    #[error("attribute {attribute} does not apply to a {object}")]
    InvalidAttribute {
        attribute: &'static str,
        object: &'static str,
    },
}

/// Hard failure of a compile call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("internal consistency error at line {line}: {message}")]
    ContextInvariant { line: usize, message: String },
}

impl CompileError {
    pub fn invariant(line: usize, message: impl Into<String>) -> Self {
        CompileError::ContextInvariant {
            line,
            message: message.into(),
        }
    }
}
