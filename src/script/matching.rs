//! Rule matcher
//!
//! Walks grammar rules over the script text and collects the tokens they emit. The
//! matcher is greedy and deterministic:
//!
//!     - alternatives are tried in declaration order and the first success wins;
//!     - a repeat takes as many matches as it can and always succeeds;
//!     - an optional element is tried once and always succeeds;
//!     - a lookahead matches its body, rewinds, and succeeds only if the body failed.
//!
//! A failed element rewinds the cursor and drops any tokens it emitted, so a caller
//! only ever sees the tokens of a complete match. The furthest offset any failing
//! attempt started at is kept, which is where a syntax error is best reported.

pub mod source_cursor;

pub use self::source_cursor::{Mark, SourceCursor};

use super::grammar::{Grammar, RuleElement, RuleId};
use super::lexeme::{match_literal, LexemeRegistry};
use super::token::{Token, TokenId};

/// Rule nesting limit. Deeper matches fail, which also stops left recursion.
pub const MAX_RULE_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Offset after the match, or the start offset when nothing matched.
    pub offset: usize,
    pub line: usize,
    pub tokens: Vec<Token>,
    /// Furthest offset at which a failing attempt started.
    pub furthest: usize,
}

pub struct Matcher<'a, A> {
    grammar: &'a Grammar,
    lexemes: &'a LexemeRegistry<A>,
    cursor: SourceCursor<'a>,
    tokens: Vec<Token>,
    furthest: usize,
    lookahead: usize,
    depth: usize,
}

impl<'a, A> Matcher<'a, A> {
    pub fn new(grammar: &'a Grammar, lexemes: &'a LexemeRegistry<A>, text: &'a str) -> Self {
        Self {
            grammar,
            lexemes,
            cursor: SourceCursor::new(text),
            tokens: Vec::new(),
            furthest: 0,
            lookahead: 0,
            depth: 0,
        }
    }

    pub fn text(&self) -> &'a str {
        self.cursor.text()
    }

    /// Match a grammar rule starting at `offset`.
    pub fn match_rule_at(&mut self, rule: RuleId, offset: usize) -> MatchOutcome {
        let text = self.cursor.text();
        let offset = offset.min(text.len());
        let line = text[..offset].matches('\n').count() + 1;
        self.run(offset, line, |m| m.match_rule(rule))
    }

    /// Match an arbitrary element starting at a known position.
    pub fn match_element_at(
        &mut self,
        element: &RuleElement,
        offset: usize,
        line: usize,
    ) -> MatchOutcome {
        self.run(offset, line, |m| m.match_element(element))
    }

    fn run(
        &mut self,
        offset: usize,
        line: usize,
        attempt: impl FnOnce(&mut Self) -> bool,
    ) -> MatchOutcome {
        self.cursor.seek(offset, line);
        self.tokens.clear();
        self.furthest = offset;
        self.lookahead = 0;
        self.depth = 0;

        let matched = attempt(self);
        if !matched {
            self.cursor.seek(offset, line);
            self.tokens.clear();
        }

        MatchOutcome {
            matched,
            offset: self.cursor.offset(),
            line: self.cursor.line(),
            tokens: std::mem::take(&mut self.tokens),
            furthest: self.furthest,
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            offset: self.cursor.offset(),
            line: self.cursor.line(),
            tokens: self.tokens.len(),
        }
    }

    fn reset(&mut self, mark: Mark) {
        self.cursor.seek(mark.offset, mark.line);
        self.tokens.truncate(mark.tokens);
    }

    fn note_failure(&mut self, offset: usize) {
        if self.lookahead == 0 && offset > self.furthest {
            self.furthest = offset;
        }
    }

    fn emitting(&self) -> bool {
        self.lookahead == 0
    }

    fn match_element(&mut self, element: &RuleElement) -> bool {
        let mark = self.mark();
        let matched = match element {
            RuleElement::Terminal { text, emit, token } => {
                self.match_terminal(text, *emit, *token)
            }
            RuleElement::NonTerminal { id, .. } => self.match_rule(*id),
            RuleElement::Repeat(inner) => {
                self.match_repeat(inner);
                true
            }
            RuleElement::Optional(inner) => {
                self.match_element(inner);
                true
            }
            RuleElement::Alternatives(alternatives) => self.match_alternatives(alternatives),
            RuleElement::NotFollowedBy(inner) => self.match_not_followed_by(inner),
            RuleElement::Numeric(_) => self.match_numeric(),
            RuleElement::Label(_) => self.match_label(),
            RuleElement::CharClass { chars, negated } => self.match_class(chars, *negated),
        };
        if !matched {
            self.reset(mark);
        }
        matched
    }

    fn match_rule(&mut self, id: RuleId) -> bool {
        if self.depth >= MAX_RULE_DEPTH {
            log::warn!(
                "rule nesting deeper than {} at offset {}",
                MAX_RULE_DEPTH,
                self.cursor.offset()
            );
            return false;
        }
        let grammar = self.grammar;
        self.depth += 1;
        let matched = self.match_alternatives(&grammar.rule(id).alternatives);
        self.depth -= 1;
        matched
    }

    fn match_alternatives(&mut self, alternatives: &[Vec<RuleElement>]) -> bool {
        alternatives.iter().any(|seq| self.match_sequence(seq))
    }

    fn match_sequence(&mut self, sequence: &[RuleElement]) -> bool {
        let mark = self.mark();
        for element in sequence {
            if !self.match_element(element) {
                self.reset(mark);
                return false;
            }
        }
        true
    }

    fn match_repeat(&mut self, inner: &RuleElement) {
        loop {
            let before = self.cursor.offset();
            if !self.match_element(inner) || self.cursor.offset() == before {
                break;
            }
        }
    }

    fn match_not_followed_by(&mut self, inner: &RuleElement) -> bool {
        let mark = self.mark();
        self.lookahead += 1;
        let hit = self.match_element(inner);
        self.lookahead -= 1;
        self.reset(mark);
        !hit
    }

    fn match_terminal(&mut self, text: &str, emit: bool, token: Option<TokenId>) -> bool {
        self.cursor.skip_trivia();
        let (start, line) = (self.cursor.offset(), self.cursor.line());
        let case_sensitive = self.lexemes.is_case_sensitive();

        match match_literal(self.cursor.rest(), text, case_sensitive) {
            Some(len) => {
                self.cursor.advance(len);
                if let (true, true, Some(id)) = (emit, self.emitting(), token) {
                    self.tokens.push(Token::keyword(id, start, line));
                }
                true
            }
            None => {
                self.note_failure(start);
                false
            }
        }
    }

    fn match_numeric(&mut self) -> bool {
        self.cursor.skip_trivia();
        let (start, line) = (self.cursor.offset(), self.cursor.line());
        let rest = self.cursor.rest();

        let value = scan_number(rest)
            .and_then(|len| rest[..len].parse::<f64>().ok().map(|value| (len, value)));
        match value {
            Some((len, value)) => {
                self.cursor.advance(len);
                if self.emitting() {
                    self.tokens.push(Token::number(value, start, line));
                }
                true
            }
            None => {
                self.note_failure(start);
                false
            }
        }
    }

    fn match_label(&mut self) -> bool {
        self.cursor.skip_trivia();
        let (start, line) = (self.cursor.offset(), self.cursor.line());
        let rest = self.cursor.rest();

        let scanned = if let Some(body) = rest.strip_prefix('"') {
            match body.find(|c| c == '"' || c == '\n') {
                Some(end) if end > 0 && body[end..].starts_with('"') => {
                    Some((&body[..end], end + 2))
                }
                _ => None,
            }
        } else {
            let len: usize = rest
                .chars()
                .take_while(|c| !c.is_whitespace() && !matches!(c, '{' | '}' | '"'))
                .map(char::len_utf8)
                .sum();
            (len > 0).then(|| (&rest[..len], len))
        };

        match scanned {
            Some((value, len)) => {
                if self.emitting() {
                    self.tokens.push(Token::label(value, start, line));
                }
                self.cursor.advance(len);
                true
            }
            None => {
                self.note_failure(start);
                false
            }
        }
    }

    fn match_class(&mut self, chars: &str, negated: bool) -> bool {
        self.cursor.skip_trivia();
        let (start, line) = (self.cursor.offset(), self.cursor.line());
        let rest = self.cursor.rest();

        let mut len = 0;
        for (i, c) in rest.char_indices() {
            if chars.contains(c) == negated || rest[i..].starts_with("//") {
                break;
            }
            len = i + c.len_utf8();
        }

        let value = rest[..len].trim_end();
        if value.is_empty() {
            self.note_failure(start);
            return false;
        }
        if self.emitting() {
            self.tokens.push(Token::label(value, start, line));
        }
        self.cursor.advance(len);
        true
    }
}

/// Length of a number at the start of `input`: optional sign, digits, optional
/// fraction and exponent. A number running straight into a word is not a number.
pub fn scan_number(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let digits_from = |from: usize| {
        bytes[from.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let whole = digits_from(i);
    i += whole;

    let mut fraction = 0;
    if bytes.get(i) == Some(&b'.') {
        fraction = digits_from(i + 1);
        if whole > 0 || fraction > 0 {
            i += 1 + fraction;
        }
    }
    if whole + fraction == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exponent = digits_from(j);
        if exponent > 0 {
            i = j + exponent;
        }
    }

    match bytes.get(i) {
        Some(b) if b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.' => None,
        _ => Some(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::token::{TokenValue, LABEL_TOKEN, VALUE_TOKEN};

    const BNF: &str = r#"
        <Script> ::= {<Line>}
        <Line> ::= <Set> | <Name> | <Flags> | <Group>
        <Set> ::= 'set' <@key> <#value>
        <Name> ::= 'name' <Flex> -';'
        <Flex> ::= -'"' <Spaced> -'"' | <Spaced>
        <Spaced> ::= (!;\n")
        <Flags> ::= 'flags' {<Flag>}
        <Flag> ::= 'colour' (?!'_') | 'colour_value'
        <Group> ::= 'group' -'{' [<Set>] -'}'
        <Loop> ::= <Loop> 'x'
    "#;

    fn fixture() -> (Grammar, LexemeRegistry<()>) {
        let mut lexemes = LexemeRegistry::new();
        for (i, text) in ["set", "name", "flags", "colour", "colour_value", "group", "x"]
            .iter()
            .enumerate()
        {
            lexemes.register(text, i as TokenId + 1, None).unwrap();
        }
        let grammar = Grammar::compile_linked(BNF, "Script", &lexemes).unwrap();
        (grammar, lexemes)
    }

    fn ids(outcome: &MatchOutcome) -> Vec<TokenId> {
        outcome.tokens.iter().map(|t| t.id).collect()
    }

    #[test]
    fn matches_keyword_label_and_number() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "set width -1.5e2\nset");
        let outcome = matcher.match_rule_at(grammar.rule_id("Set").unwrap(), 0);
        assert!(outcome.matched);
        assert_eq!(outcome.offset, 16);
        assert_eq!(ids(&outcome), vec![1, LABEL_TOKEN, VALUE_TOKEN]);
        assert_eq!(outcome.tokens[1].value, TokenValue::Label("width".into()));
        assert_eq!(outcome.tokens[2].value, TokenValue::Number(-150.0));
    }

    #[test]
    fn failed_match_reports_furthest_offset() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "set width abc");
        let outcome = matcher.match_rule_at(grammar.rule_id("Set").unwrap(), 0);
        assert!(!outcome.matched);
        assert_eq!(outcome.offset, 0);
        assert!(outcome.tokens.is_empty());
        assert_eq!(outcome.furthest, 10);
    }

    #[test]
    fn lookahead_separates_prefix_keywords() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "flags colour colour_value colour");
        let outcome = matcher.match_rule_at(grammar.rule_id("Flags").unwrap(), 0);
        assert!(outcome.matched);
        assert_eq!(ids(&outcome), vec![3, 4, 5, 4]);
    }

    #[test]
    fn class_and_quoted_labels() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "name Old TV ;name \"B W\";");
        let name = grammar.rule_id("Name").unwrap();

        let first = matcher.match_rule_at(name, 0);
        assert!(first.matched);
        assert_eq!(first.tokens[1].value, TokenValue::Label("Old TV".into()));

        let second = matcher.match_rule_at(name, first.offset);
        assert!(second.matched);
        assert_eq!(second.tokens[1].value, TokenValue::Label("B W".into()));
        assert_eq!(second.offset, 24);
    }

    #[test]
    fn silent_terminals_emit_nothing() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "group { }");
        let outcome = matcher.match_rule_at(grammar.rule_id("Group").unwrap(), 0);
        assert!(outcome.matched);
        assert_eq!(ids(&outcome), vec![6]);
        assert_eq!(outcome.offset, 9);
    }

    #[test]
    fn keywords_are_case_insensitive_by_default() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "SET k 1");
        assert!(matcher.match_rule_at(grammar.rule_id("Set").unwrap(), 0).matched);
    }

    #[test]
    fn left_recursion_fails_instead_of_overflowing() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "x x");
        assert!(!matcher.match_rule_at(grammar.rule_id("Loop").unwrap(), 0).matched);
    }

    #[test]
    fn tokens_record_lines() {
        let (grammar, lexemes) = fixture();
        let mut matcher = Matcher::new(&grammar, &lexemes, "// c\nset\n  k\n 2");
        let outcome = matcher.match_rule_at(grammar.rule_id("Set").unwrap(), 0);
        let lines: Vec<usize> = outcome.tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert_eq!(outcome.line, 4);
    }

    #[test]
    fn scan_number_edges() {
        assert_eq!(scan_number("12 "), Some(2));
        assert_eq!(scan_number("0.5}"), Some(3));
        assert_eq!(scan_number(".5"), Some(2));
        assert_eq!(scan_number("+3e-2"), Some(5));
        assert_eq!(scan_number("1abc"), None);
        assert_eq!(scan_number("1.2.3"), None);
        assert_eq!(scan_number("abc"), None);
        assert_eq!(scan_number("-"), None);
        assert_eq!(scan_number("."), None);
    }
}
