//! Token stream cursor
//!
//! Sequential reader over the arguments of one action: the tokens between the
//! action's own token and the next action token in the statement.

use super::error::CursorError;
use super::token::{Token, TokenId, TokenValue};

#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    position: usize,
    line: usize,
}

impl<'t> TokenCursor<'t> {
    /// `line` is the line of the action token, used when the arguments run out.
    pub fn new(tokens: &'t [Token], line: usize) -> Self {
        Self {
            tokens,
            position: 0,
            line,
        }
    }

    /// Line of the next token, or of the action itself once exhausted.
    pub fn line(&self) -> usize {
        self.tokens
            .get(self.position)
            .map(|t| t.line)
            .unwrap_or(self.line)
    }

    pub fn peek_token_id(&self) -> Option<TokenId> {
        self.tokens.get(self.position).map(|t| t.id)
    }

    pub fn next_token_id(&mut self) -> Result<TokenId, CursorError> {
        let token = self.advance("a keyword")?;
        Ok(token.id)
    }

    /// Consume the next token only if it has the expected id.
    pub fn next_token_is(&mut self, expected: TokenId) -> bool {
        if self.peek_token_id() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    pub fn next_numeric(&mut self) -> Result<f64, CursorError> {
        const EXPECTED: &str = "a number";
        let token = self.peek(EXPECTED)?;
        match token.value {
            TokenValue::Number(value) => {
                self.position += 1;
                Ok(value)
            }
            _ => Err(CursorError::UnexpectedTokenKind {
                expected: EXPECTED,
                found: token.id,
            }),
        }
    }

    pub fn next_label(&mut self) -> Result<&'t str, CursorError> {
        const EXPECTED: &str = "a label";
        let token = self.peek(EXPECTED)?;
        match &token.value {
            TokenValue::Label(value) => {
                self.position += 1;
                Ok(value.as_str())
            }
            _ => Err(CursorError::UnexpectedTokenKind {
                expected: EXPECTED,
                found: token.id,
            }),
        }
    }

    /// Tokens still unread for this action.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.position
    }

    fn peek(&self, expected: &'static str) -> Result<&'t Token, CursorError> {
        self.tokens
            .get(self.position)
            .ok_or(CursorError::Exhausted { expected })
    }

    fn advance(&mut self, expected: &'static str) -> Result<&'t Token, CursorError> {
        let token = self.peek(expected)?;
        self.position += 1;
        Ok(token)
    }
}
