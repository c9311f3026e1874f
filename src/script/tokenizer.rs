//! Statement tokenizer (pass 1)
//!
//! Repeatedly matches the grammar's statement unit from the current offset and yields
//! either the statement's tokens or a syntax mismatch. A mismatch never stops the
//! iteration: the tokenizer skips the offending statement and carries on with the
//! next one.
//!
//! Resynchronisation
//!
//!     Skipping restarts from the first character of the failed statement. Quoted
//!     strings and comments are stepped over, braces are counted, and the skip ends
//!     after a newline at nesting depth 0 (unless the next line opens a block) or just
//!     before a `}` that closes an outer block. A failed block opener such as `pass bogus {` therefore takes its whole
//!     block with it instead of leaving orphaned statements and a stray `}` behind.

use super::grammar::{Grammar, RuleElement};
use super::lexeme::LexemeRegistry;
use super::matching::{Matcher, SourceCursor};
use super::token::Token;
use std::fmt;

const NEARBY_LIMIT: usize = 32;
const END_OF_SCRIPT: &str = "end of script";

/// Tokens of one matched statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub tokens: Vec<Token>,
    pub offset: usize,
    pub line: usize,
}

/// Input that no statement alternative accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxMismatch {
    pub offset: usize,
    pub line: usize,
    /// The word at the failure point, or "end of script".
    pub nearby: String,
}

impl SyntaxMismatch {
    pub fn at_end(&self) -> bool {
        self.nearby == END_OF_SCRIPT
    }
}

impl fmt::Display for SyntaxMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.at_end() {
            write!(f, "unexpected end of script")
        } else {
            write!(f, "unexpected '{}'", self.nearby)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pass1Event {
    Statement(Statement),
    Mismatch(SyntaxMismatch),
}

pub struct Tokenizer<'a, A> {
    matcher: Matcher<'a, A>,
    statement: &'a RuleElement,
    offset: usize,
    line: usize,
}

impl<'a, A> Tokenizer<'a, A> {
    pub fn new(
        grammar: &'a Grammar,
        lexemes: &'a LexemeRegistry<A>,
        statement: &'a RuleElement,
        text: &'a str,
    ) -> Self {
        Self {
            matcher: Matcher::new(grammar, lexemes, text),
            statement,
            offset: 0,
            line: 1,
        }
    }
}

impl<'a, A> Iterator for Tokenizer<'a, A> {
    type Item = Pass1Event;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.matcher.text();
        let mut cursor = SourceCursor::new(text);
        cursor.seek(self.offset, self.line);
        cursor.skip_trivia();
        if cursor.at_end() {
            self.offset = cursor.offset();
            self.line = cursor.line();
            return None;
        }

        let (start, line) = (cursor.offset(), cursor.line());
        let outcome = self.matcher.match_element_at(self.statement, start, line);
        if outcome.matched && outcome.offset > start {
            self.offset = outcome.offset;
            self.line = outcome.line;
            return Some(Pass1Event::Statement(Statement {
                tokens: outcome.tokens,
                offset: start,
                line,
            }));
        }

        let at = outcome.furthest.max(start);
        let mismatch = SyntaxMismatch {
            offset: at,
            line: cursor.line_at(at),
            nearby: nearby_text(&text[at..]),
        };

        cursor.advance(resync_len(&text[start..]));
        self.offset = cursor.offset();
        self.line = cursor.line();
        Some(Pass1Event::Mismatch(mismatch))
    }
}

fn nearby_text(rest: &str) -> String {
    match rest.split_whitespace().next() {
        Some(word) => word.chars().take(NEARBY_LIMIT).collect(),
        None => END_OF_SCRIPT.to_string(),
    }
}

/// Bytes to skip after a failed statement starting at the front of `rest`.
/// Always at least one character when `rest` is not empty.
pub fn resync_len(rest: &str) -> usize {
    let mut depth = 0usize;
    let mut end = 0;
    let mut chars = rest.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        end = i + c.len_utf8();
        match c {
            '"' => {
                while let Some(&(j, d)) = chars.peek() {
                    if d == '\n' {
                        break;
                    }
                    chars.next();
                    end = j + d.len_utf8();
                    if d == '"' {
                        break;
                    }
                }
            }
            '/' if rest[i..].starts_with("//") => {
                while let Some(&(j, d)) = chars.peek() {
                    if d == '\n' {
                        break;
                    }
                    chars.next();
                    end = j + d.len_utf8();
                }
            }
            '{' => depth += 1,
            '}' if depth == 0 => return if i == 0 { end } else { i },
            '}' => depth -= 1,
            // an opener's brace may sit on the next line
            '\n' if depth == 0 && !rest[end..].trim_start().starts_with('{') => return end,
            _ => {}
        }
    }
    end
}
