//! Rule parser for the BNF dialect
//!
//! Splits the token stream into rules (a rule starts wherever `<Name>` is followed by
//! `::=`) and parses each body with chumsky into an unresolved intermediate form.
//! Names are resolved to rule ids later, once every rule is known.

use super::bnf_tokens::{line_of, tokenize_bnf, BnfToken};
use crate::script::error::GrammarError;
use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use std::ops::Range;

/// Type alias for token with span
type TokenSpan = (BnfToken, Range<usize>);

/// Type alias for parser error
type ParserError = Simple<TokenSpan>;

/// A rule body element before name resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementIr {
    Terminal { text: String, emit: bool },
    Rule(String),
    Repeat(Vec<Vec<ElementIr>>),
    Optional(Vec<Vec<ElementIr>>),
    NotFollowedBy(Vec<Vec<ElementIr>>),
    Numeric(String),
    Label(String),
    CharClass { chars: String, negated: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleIr {
    pub name: String,
    pub line: usize,
    pub alternatives: Vec<Vec<ElementIr>>,
}

fn token(t: BnfToken) -> impl Parser<TokenSpan, (), Error = ParserError> + Clone {
    filter(move |(tok, _): &TokenSpan| tok == &t).ignored()
}

/// Leaf elements: references, placeholders, literals and classes.
fn atom() -> impl Parser<TokenSpan, ElementIr, Error = ParserError> + Clone {
    filter_map(|span, (tok, _): TokenSpan| match tok {
        BnfToken::NonTerminal(name) => Ok(ElementIr::Rule(name)),
        BnfToken::Numeric(name) => Ok(ElementIr::Numeric(name)),
        BnfToken::Label(name) => Ok(ElementIr::Label(name)),
        BnfToken::Terminal(text) => Ok(ElementIr::Terminal { text, emit: true }),
        BnfToken::SilentTerminal(text) => Ok(ElementIr::Terminal { text, emit: false }),
        BnfToken::ExcludeClass(chars) => Ok(ElementIr::CharClass {
            chars,
            negated: true,
        }),
        BnfToken::IncludeClass(chars) => Ok(ElementIr::CharClass {
            chars,
            negated: false,
        }),
        other => Err(Simple::custom(span, format!("unexpected {}", describe(&other)))),
    })
}

/// `alt ('|' alt)*` where each alternative is a non-empty element sequence.
fn alternatives() -> impl Parser<TokenSpan, Vec<Vec<ElementIr>>, Error = ParserError> + Clone {
    recursive(|alternatives| {
        let repeat = alternatives
            .clone()
            .delimited_by(token(BnfToken::RepeatOpen), token(BnfToken::RepeatClose))
            .map(ElementIr::Repeat);

        let optional = alternatives
            .clone()
            .delimited_by(token(BnfToken::OptionalOpen), token(BnfToken::OptionalClose))
            .map(ElementIr::Optional);

        let lookahead = alternatives
            .delimited_by(token(BnfToken::LookaheadOpen), token(BnfToken::GroupClose))
            .map(ElementIr::NotFollowedBy);

        let element = choice((repeat, optional, lookahead, atom()));

        element
            .repeated()
            .at_least(1)
            .separated_by(token(BnfToken::Or))
            .at_least(1)
    })
}

/// Parse grammar text into unresolved rules, in declaration order.
pub fn parse_rules(source: &str) -> Result<Vec<RuleIr>, GrammarError> {
    let tokens = tokenize_bnf(source)?;

    let starts: Vec<usize> = (0..tokens.len())
        .filter(|&i| {
            matches!(tokens[i].0, BnfToken::NonTerminal(_))
                && matches!(tokens.get(i + 1), Some((BnfToken::Define, _)))
        })
        .collect();

    if let Some((first, span)) = tokens.first() {
        if starts.first() != Some(&0) {
            return Err(GrammarError::Syntax {
                rule: String::new(),
                line: line_of(source, span.start),
                message: format!("expected a rule definition, found {}", describe(first)),
            });
        }
    }

    let mut rules = Vec::with_capacity(starts.len());
    for (n, &start) in starts.iter().enumerate() {
        let stop = starts.get(n + 1).copied().unwrap_or(tokens.len());
        let name = match &tokens[start].0 {
            BnfToken::NonTerminal(name) => name.clone(),
            _ => continue,
        };
        let line = line_of(source, tokens[start].1.start);
        let body: Vec<TokenSpan> = tokens[start + 2..stop].to_vec();

        if body.is_empty() {
            return Err(GrammarError::Syntax {
                rule: name,
                line,
                message: "empty rule body".to_string(),
            });
        }

        let alternatives = alternatives()
            .then_ignore(end())
            .parse(body.clone())
            .map_err(|errors| syntax_error(source, &name, line, &body, &errors))?;

        rules.push(RuleIr {
            name,
            line,
            alternatives,
        });
    }

    Ok(rules)
}

fn syntax_error(
    source: &str,
    rule: &str,
    rule_line: usize,
    body: &[TokenSpan],
    errors: &[ParserError],
) -> GrammarError {
    let Some(error) = errors.first() else {
        return GrammarError::Syntax {
            rule: rule.to_string(),
            line: rule_line,
            message: "unparseable rule body".to_string(),
        };
    };

    let line = body
        .get(error.span().start)
        .map(|(_, range)| line_of(source, range.start))
        .unwrap_or(rule_line);

    let message = match error.reason() {
        SimpleReason::Custom(message) => message.clone(),
        _ => match error.found() {
            Some((tok, _)) => format!("unexpected {}", describe(tok)),
            None => "unexpected end of rule".to_string(),
        },
    };

    GrammarError::Syntax {
        rule: rule.to_string(),
        line,
        message,
    }
}

fn describe(token: &BnfToken) -> String {
    match token {
        BnfToken::Define => "'::='".to_string(),
        BnfToken::Or => "'|'".to_string(),
        BnfToken::RepeatOpen => "'{'".to_string(),
        BnfToken::RepeatClose => "'}'".to_string(),
        BnfToken::OptionalOpen => "'['".to_string(),
        BnfToken::OptionalClose => "']'".to_string(),
        BnfToken::LookaheadOpen => "'(?!'".to_string(),
        BnfToken::GroupClose => "')'".to_string(),
        BnfToken::NonTerminal(name) => format!("<{}>", name),
        BnfToken::Numeric(name) => format!("<#{}>", name),
        BnfToken::Label(name) => format!("<@{}>", name),
        BnfToken::Terminal(text) => format!("terminal '{}'", text),
        BnfToken::SilentTerminal(text) => format!("terminal -'{}'", text),
        BnfToken::ExcludeClass(_) | BnfToken::IncludeClass(_) => "character class".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(text: &str) -> ElementIr {
        ElementIr::Terminal {
            text: text.into(),
            emit: true,
        }
    }

    #[test]
    fn parses_sequence_with_repeat_and_optional() {
        let rules = parse_rules("<Target> ::= 'target' <@name> [<Opts>] {<Pass>}").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Target");
        assert_eq!(
            rules[0].alternatives,
            vec![vec![
                terminal("target"),
                ElementIr::Label("name".into()),
                ElementIr::Optional(vec![vec![ElementIr::Rule("Opts".into())]]),
                ElementIr::Repeat(vec![vec![ElementIr::Rule("Pass".into())]]),
            ]]
        );
    }

    #[test]
    fn rules_may_span_lines() {
        let rules = parse_rules("<A> ::= 'a' |\n  'b'\n<B> ::= <#n>").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].alternatives.len(), 2);
        assert_eq!(rules[1].line, 3);
    }

    #[test]
    fn alternatives_nest_inside_groups() {
        let rules = parse_rules("<A> ::= {'x' | 'y' <B>} (?!'_')").unwrap();
        assert_eq!(
            rules[0].alternatives[0],
            vec![
                ElementIr::Repeat(vec![
                    vec![terminal("x")],
                    vec![terminal("y"), ElementIr::Rule("B".into())],
                ]),
                ElementIr::NotFollowedBy(vec![vec![terminal("_")]]),
            ]
        );
    }

    #[test]
    fn rejects_text_before_first_rule() {
        let err = parse_rules("'stray' <A> ::= 'a'").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));
    }

    #[test]
    fn rejects_unclosed_group() {
        let err = parse_rules("<A> ::= 'a'\n<B> ::= {'b'").unwrap_err();
        match err {
            GrammarError::Syntax { rule, .. } => assert_eq!(rule, "B"),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_alternative() {
        assert!(parse_rules("<A> ::= 'a' |").is_err());
        assert!(parse_rules("<A> ::=").is_err());
    }
}
