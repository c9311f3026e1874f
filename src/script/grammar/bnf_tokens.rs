//! Token definitions for the BNF dialect
//!
//! Grammar text is tokenized with logos before the rule parser runs. Literal and
//! class payloads are unescaped here, so the parser only ever sees final text.

use crate::script::error::GrammarError;
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum BnfToken {
    #[token("::=")]
    Define,
    #[token("|")]
    Or,

    // Grouping
    #[token("{")]
    RepeatOpen,
    #[token("}")]
    RepeatClose,
    #[token("[")]
    OptionalOpen,
    #[token("]")]
    OptionalClose,
    #[token("(?!")]
    LookaheadOpen,
    #[token(")")]
    GroupClose,

    // Rule references and placeholders
    #[regex(r"<[A-Za-z_][A-Za-z0-9_]*>", |lex| inner(lex.slice(), 1))]
    NonTerminal(String),
    #[regex(r"<#[A-Za-z_][A-Za-z0-9_]*>", |lex| inner(lex.slice(), 2))]
    Numeric(String),
    #[regex(r"<@[A-Za-z_][A-Za-z0-9_]*>", |lex| inner(lex.slice(), 2))]
    Label(String),

    // Literals
    #[regex(r"'([^'\\]|\\.)*'", |lex| unescape(&inner(lex.slice(), 1)))]
    Terminal(String),
    #[regex(r"-'([^'\\]|\\.)*'", |lex| unescape(&inner(lex.slice(), 2)))]
    SilentTerminal(String),

    // Character classes
    #[regex(r"\(!([^)\\]|\\.)*\)", |lex| unescape(&inner(lex.slice(), 2)))]
    ExcludeClass(String),
    #[regex(r"\(([^!?)\\]|\\.)([^)\\]|\\.)*\)", |lex| unescape(&inner(lex.slice(), 1)))]
    IncludeClass(String),
}

/// Strip `prefix` leading bytes and the closing delimiter.
fn inner(slice: &str, prefix: usize) -> String {
    slice[prefix..slice.len() - 1].to_string()
}

/// Resolve backslash escapes inside literals and classes.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// 1-based line of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())].matches('\n').count() + 1
}

/// Tokenize grammar text, keeping byte spans for error reporting.
pub fn tokenize_bnf(source: &str) -> Result<Vec<(BnfToken, logos::Span)>, GrammarError> {
    let mut lexer = BnfToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(GrammarError::Lex {
                    text: lexer.slice().to_string(),
                    line: line_of(source, lexer.span().start),
                })
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<BnfToken> {
        tokenize_bnf(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_rule_header() {
        assert_eq!(
            kinds("<Script> ::= {<Statement>}"),
            vec![
                BnfToken::NonTerminal("Script".into()),
                BnfToken::Define,
                BnfToken::RepeatOpen,
                BnfToken::NonTerminal("Statement".into()),
                BnfToken::RepeatClose,
            ]
        );
    }

    #[test]
    fn test_placeholders_and_terminals() {
        assert_eq!(
            kinds("'pass' -'{' <#queue> <@name>"),
            vec![
                BnfToken::Terminal("pass".into()),
                BnfToken::SilentTerminal("{".into()),
                BnfToken::Numeric("queue".into()),
                BnfToken::Label("name".into()),
            ]
        );
    }

    #[test]
    fn test_classes_and_lookahead() {
        assert_eq!(
            kinds(r#"(!\n\t{}") (abc) (?!'_')"#),
            vec![
                BnfToken::ExcludeClass("\n\t{}\"".into()),
                BnfToken::IncludeClass("abc".into()),
                BnfToken::LookaheadOpen,
                BnfToken::Terminal("_".into()),
                BnfToken::GroupClose,
            ]
        );
    }

    #[test]
    fn test_escaped_quote_in_terminal() {
        assert_eq!(kinds(r"'it\'s'"), vec![BnfToken::Terminal("it's".into())]);
    }

    #[test]
    fn test_unrecognised_input_reports_line() {
        let err = tokenize_bnf("<A> ::= 'a'\n<B> ::= %").unwrap_err();
        assert_eq!(
            err,
            GrammarError::Lex {
                text: "%".into(),
                line: 2
            }
        );
    }
}
