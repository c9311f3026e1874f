//! Lexeme/token registry
//!
//! Maps keyword text to token ids and, for keywords that start a statement action,
//! to the action they trigger. The registry is filled once while a language is set up
//! and only read afterwards.
//!
//! Matching is a plain prefix test at the current offset. The grammar decides which
//! lexemes are tried where, so there is no longest-match rule here: `less` will match
//! the front of `less_equal` if the grammar asks for it first.

use super::error::LexemeError;
use super::token::{TokenId, RESERVED_TOKEN_BASE};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LexemeEntry<A> {
    pub text: String,
    pub token: TokenId,
    pub action: Option<A>,
    /// Words separated by whitespace; any whitespace run matches between them.
    pub multi_word: bool,
}

#[derive(Debug, Clone)]
pub struct LexemeRegistry<A> {
    entries: Vec<LexemeEntry<A>>,
    by_text: HashMap<String, usize>,
    by_token: HashMap<TokenId, usize>,
    case_sensitive: bool,
}

impl<A> LexemeRegistry<A> {
    /// An empty registry that matches lexemes case-insensitively.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_text: HashMap::new(),
            by_token: HashMap::new(),
            case_sensitive: false,
        }
    }

    /// An empty registry with explicit case handling.
    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            ..Self::new()
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn register(
        &mut self,
        text: &str,
        token: TokenId,
        action: Option<A>,
    ) -> Result<(), LexemeError> {
        if text.trim().is_empty() {
            return Err(LexemeError::EmptyLexeme);
        }
        if token >= RESERVED_TOKEN_BASE {
            return Err(LexemeError::ReservedTokenId(token));
        }
        let key = self.key(text);
        if self.by_text.contains_key(&key) {
            return Err(LexemeError::DuplicateLexeme(text.to_string()));
        }
        if let Some(&index) = self.by_token.get(&token) {
            return Err(LexemeError::DuplicateTokenId {
                id: token,
                existing: self.entries[index].text.clone(),
            });
        }

        let index = self.entries.len();
        self.entries.push(LexemeEntry {
            text: text.to_string(),
            token,
            action,
            multi_word: text.split_whitespace().nth(1).is_some(),
        });
        self.by_text.insert(key, index);
        self.by_token.insert(token, index);
        Ok(())
    }

    pub fn lookup(&self, text: &str) -> Option<&LexemeEntry<A>> {
        self.by_text.get(&self.key(text)).map(|&i| &self.entries[i])
    }

    pub fn entry_for_token(&self, token: TokenId) -> Option<&LexemeEntry<A>> {
        self.by_token.get(&token).map(|&i| &self.entries[i])
    }

    pub fn action_for(&self, token: TokenId) -> Option<&A> {
        self.entry_for_token(token).and_then(|e| e.action.as_ref())
    }

    /// Keyword text for a token id, for messages.
    pub fn text_for(&self, token: TokenId) -> Option<&str> {
        self.entry_for_token(token).map(|e| e.text.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = &LexemeEntry<A>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_ascii_lowercase()
        }
    }
}

impl<A> Default for LexemeRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Match `literal` at the start of `input`, returning the number of bytes consumed.
///
/// Words of a multi-word literal may be separated by any run of whitespace in the
/// input. Case folding is ASCII only.
pub fn match_literal(input: &str, literal: &str, case_sensitive: bool) -> Option<usize> {
    let mut consumed = 0;
    let mut words = literal.split_whitespace().peekable();
    if words.peek().is_none() {
        return match input.starts_with(literal) {
            true if !literal.is_empty() => Some(literal.len()),
            _ => None,
        };
    }

    let mut first = true;
    for word in words {
        if !first {
            let gap = input[consumed..]
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum::<usize>();
            if gap == 0 {
                return None;
            }
            consumed += gap;
        }
        first = false;

        let candidate = input.get(consumed..consumed + word.len())?;
        let equal = if case_sensitive {
            candidate == word
        } else {
            candidate.eq_ignore_ascii_case(word)
        };
        if !equal {
            return None;
        }
        consumed += word.len();
    }
    Some(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LexemeRegistry<&'static str> {
        let mut reg = LexemeRegistry::new();
        reg.register("pass", 1, Some("pass")).unwrap();
        reg.register("clear", 2, None).unwrap();
        reg.register("render target", 3, None).unwrap();
        reg
    }

    #[test]
    fn rejects_duplicate_lexeme_regardless_of_case() {
        let mut reg = registry();
        assert_eq!(
            reg.register("PASS", 9, None),
            Err(LexemeError::DuplicateLexeme("PASS".into()))
        );
    }

    #[test]
    fn case_sensitive_registry_keeps_case_variants_apart() {
        let mut reg: LexemeRegistry<()> = LexemeRegistry::with_case_sensitivity(true);
        reg.register("pass", 1, None).unwrap();
        assert!(reg.register("PASS", 2, None).is_ok());
    }

    #[test]
    fn rejects_duplicate_and_reserved_ids() {
        let mut reg = registry();
        assert_eq!(
            reg.register("other", 2, None),
            Err(LexemeError::DuplicateTokenId {
                id: 2,
                existing: "clear".into()
            })
        );
        assert_eq!(
            reg.register("value", RESERVED_TOKEN_BASE, None),
            Err(LexemeError::ReservedTokenId(RESERVED_TOKEN_BASE))
        );
        assert_eq!(reg.register("  ", 50, None), Err(LexemeError::EmptyLexeme));
    }

    #[test]
    fn lookups_by_text_and_token() {
        let reg = registry();
        assert_eq!(reg.lookup("Clear").map(|e| e.token), Some(2));
        assert_eq!(reg.action_for(1), Some(&"pass"));
        assert_eq!(reg.action_for(2), None);
        assert!(reg.entry_for_token(3).unwrap().multi_word);
        assert_eq!(reg.text_for(1), Some("pass"));
    }

    #[test]
    fn literal_matching_is_a_prefix_test() {
        assert_eq!(match_literal("less_equal", "less", false), Some(4));
        assert_eq!(match_literal("LESS", "less", false), Some(4));
        assert_eq!(match_literal("LESS", "less", true), None);
        assert_eq!(match_literal("le", "less", false), None);
    }

    #[test]
    fn multi_word_lexemes_accept_any_whitespace_run() {
        assert_eq!(match_literal("render \t target x", "render target", false), Some(15));
        assert_eq!(match_literal("rendertarget", "render target", false), None);
    }

    #[test]
    fn punctuation_literals_match_verbatim() {
        assert_eq!(match_literal("} x", "}", false), Some(1));
        assert_eq!(match_literal("{", "}", false), None);
    }
}
