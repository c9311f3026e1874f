//! Grammar table
//!
//! A grammar is compiled once from BNF text and is immutable afterwards. Compiling
//! is eager: every rule reference is resolved to a [RuleId] and every emitting
//! terminal is linked to its lexeme's token id, so a malformed grammar fails at
//! construction instead of in the middle of a script.
//!
//! The dialect:
//!
//!     <Rule>      ::= alternative | alternative ...
//!     'text'      terminal, emits the lexeme's token
//!     -'text'     terminal, matched but silent
//!     <Other>     reference to another rule
//!     {...}       zero or more
//!     [...]       zero or one
//!     (?!...)     negative lookahead, consumes nothing
//!     <#name>     numeric value
//!     <@name>     label, quoted or bare
//!     (!chars)    run of characters not in the set, emitted as a label
//!     (chars)     run of characters in the set, emitted as a label
//!
//! Matching is greedy and never backtracks across a success, so alternatives have to
//! be locally unambiguous: list `less_equal` before `less`, or guard a keyword that
//! prefixes another with a lookahead.

pub mod bnf_parser;
pub mod bnf_tokens;

use self::bnf_parser::{parse_rules, ElementIr, RuleIr};
use super::error::GrammarError;
use super::lexeme::LexemeRegistry;
use super::token::TokenId;
use std::collections::HashMap;
use std::fmt;

/// Index of a rule in its grammar.
pub type RuleId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleElement {
    Terminal {
        text: String,
        emit: bool,
        /// Filled in by [Grammar::link] for emitting terminals.
        token: Option<TokenId>,
    },
    NonTerminal {
        name: String,
        id: RuleId,
    },
    Repeat(Box<RuleElement>),
    Optional(Box<RuleElement>),
    Alternatives(Vec<Vec<RuleElement>>),
    NotFollowedBy(Box<RuleElement>),
    Numeric(String),
    Label(String),
    CharClass {
        chars: String,
        negated: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrammarRule {
    pub name: String,
    pub alternatives: Vec<Vec<RuleElement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    rules: Vec<GrammarRule>,
    by_name: HashMap<String, RuleId>,
    start: RuleId,
}

impl Grammar {
    /// Compile BNF text. `start` names the rule a whole script must match.
    pub fn compile(bnf: &str, start: &str) -> Result<Self, GrammarError> {
        let parsed = parse_rules(bnf)?;

        let mut by_name = HashMap::with_capacity(parsed.len());
        for (id, rule) in parsed.iter().enumerate() {
            if by_name.insert(rule.name.clone(), id).is_some() {
                return Err(GrammarError::DuplicateRule(rule.name.clone()));
            }
        }

        let start_id = *by_name
            .get(start)
            .ok_or_else(|| GrammarError::MissingStartRule(start.to_string()))?;

        let rules = parsed
            .iter()
            .map(|rule| resolve_rule(rule, &by_name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            by_name,
            start: start_id,
        })
    }

    /// Compile and link against a lexeme registry in one step.
    pub fn compile_linked<A>(
        bnf: &str,
        start: &str,
        lexemes: &LexemeRegistry<A>,
    ) -> Result<Self, GrammarError> {
        let mut grammar = Self::compile(bnf, start)?;
        grammar.link(lexemes)?;
        Ok(grammar)
    }

    /// Attach token ids to emitting terminals.
    pub fn link<A>(&mut self, lexemes: &LexemeRegistry<A>) -> Result<(), GrammarError> {
        for rule in &mut self.rules {
            for alternative in &mut rule.alternatives {
                for element in alternative {
                    link_element(element, &rule.name, lexemes)?;
                }
            }
        }
        Ok(())
    }

    pub fn rule(&self, id: RuleId) -> &GrammarRule {
        &self.rules[id]
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    pub fn start(&self) -> RuleId {
        self.start
    }

    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    /// The unit pass 1 matches at a time.
    ///
    /// A start rule of the form `{<X>}` means a script is a run of `<X>`, and each
    /// `<X>` is matched and dispatched on its own. Any other start rule is matched as
    /// a whole.
    pub fn statement_element(&self) -> RuleElement {
        let start = &self.rules[self.start];
        if let [alternative] = start.alternatives.as_slice() {
            if let [RuleElement::Repeat(inner)] = alternative.as_slice() {
                return (**inner).clone();
            }
        }
        RuleElement::NonTerminal {
            name: start.name.clone(),
            id: self.start,
        }
    }
}

fn resolve_rule(
    rule: &RuleIr,
    names: &HashMap<String, RuleId>,
) -> Result<GrammarRule, GrammarError> {
    Ok(GrammarRule {
        name: rule.name.clone(),
        alternatives: resolve_alternatives(&rule.alternatives, &rule.name, names)?,
    })
}

fn resolve_alternatives(
    alternatives: &[Vec<ElementIr>],
    rule: &str,
    names: &HashMap<String, RuleId>,
) -> Result<Vec<Vec<RuleElement>>, GrammarError> {
    alternatives
        .iter()
        .map(|seq| {
            seq.iter()
                .map(|e| resolve_element(e, rule, names))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

/// A group body collapses to its only element when it has exactly one.
fn resolve_group(
    alternatives: &[Vec<ElementIr>],
    rule: &str,
    names: &HashMap<String, RuleId>,
) -> Result<Box<RuleElement>, GrammarError> {
    let mut resolved = resolve_alternatives(alternatives, rule, names)?;
    if resolved.len() == 1 && resolved[0].len() == 1 {
        if let Some(only) = resolved[0].pop() {
            return Ok(Box::new(only));
        }
    }
    Ok(Box::new(RuleElement::Alternatives(resolved)))
}

fn resolve_element(
    element: &ElementIr,
    rule: &str,
    names: &HashMap<String, RuleId>,
) -> Result<RuleElement, GrammarError> {
    Ok(match element {
        ElementIr::Terminal { text, emit } => RuleElement::Terminal {
            text: text.clone(),
            emit: *emit,
            token: None,
        },
        ElementIr::Rule(name) => {
            let id = names
                .get(name)
                .copied()
                .ok_or_else(|| GrammarError::UndefinedRule {
                    rule: rule.to_string(),
                    reference: name.clone(),
                })?;
            RuleElement::NonTerminal {
                name: name.clone(),
                id,
            }
        }
        ElementIr::Repeat(body) => RuleElement::Repeat(resolve_group(body, rule, names)?),
        ElementIr::Optional(body) => RuleElement::Optional(resolve_group(body, rule, names)?),
        ElementIr::NotFollowedBy(body) => {
            RuleElement::NotFollowedBy(resolve_group(body, rule, names)?)
        }
        ElementIr::Numeric(name) => RuleElement::Numeric(name.clone()),
        ElementIr::Label(name) => RuleElement::Label(name.clone()),
        ElementIr::CharClass { chars, negated } => RuleElement::CharClass {
            chars: chars.clone(),
            negated: *negated,
        },
    })
}

fn link_element<A>(
    element: &mut RuleElement,
    rule: &str,
    lexemes: &LexemeRegistry<A>,
) -> Result<(), GrammarError> {
    match element {
        RuleElement::Terminal {
            text,
            emit: true,
            token,
        } => {
            let entry = lexemes
                .lookup(text)
                .ok_or_else(|| GrammarError::UnknownTerminal {
                    rule: rule.to_string(),
                    text: text.clone(),
                })?;
            *token = Some(entry.token);
        }
        RuleElement::Repeat(inner) | RuleElement::Optional(inner) => {
            link_element(inner, rule, lexemes)?
        }
        RuleElement::Alternatives(alternatives) => {
            for element in alternatives.iter_mut().flatten() {
                link_element(element, rule, lexemes)?;
            }
        }
        // Nothing matched inside a lookahead is ever emitted.
        _ => {}
    }
    Ok(())
}

fn escape(text: &str, extra: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            c if c == extra => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn write_alternatives(f: &mut fmt::Formatter<'_>, alternatives: &[Vec<RuleElement>]) -> fmt::Result {
    for (i, sequence) in alternatives.iter().enumerate() {
        if i > 0 {
            write!(f, " | ")?;
        }
        for (j, element) in sequence.iter().enumerate() {
            if j > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", element)?;
        }
    }
    Ok(())
}

impl fmt::Display for RuleElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleElement::Terminal { text, emit, .. } => {
                let prefix = if *emit { "" } else { "-" };
                write!(f, "{}'{}'", prefix, escape(text, '\''))
            }
            RuleElement::NonTerminal { name, .. } => write!(f, "<{}>", name),
            RuleElement::Repeat(inner) => write!(f, "{{{}}}", inner),
            RuleElement::Optional(inner) => write!(f, "[{}]", inner),
            RuleElement::Alternatives(alternatives) => write_alternatives(f, alternatives),
            RuleElement::NotFollowedBy(inner) => write!(f, "(?!{})", inner),
            RuleElement::Numeric(name) => write!(f, "<#{}>", name),
            RuleElement::Label(name) => write!(f, "<@{}>", name),
            RuleElement::CharClass { chars, negated } => {
                let bang = if *negated { "!" } else { "" };
                write!(f, "({}{})", bang, escape(chars, ')'))
            }
        }
    }
}

impl fmt::Display for GrammarRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> ::= ", self.name)?;
        write_alternatives(f, &self.alternatives)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "
        <Script> ::= {<Line>}
        <Line> ::= 'set' <@name> <Value> | 'clear' -';'
        <Value> ::= <#number> | 'on' (?!'_') | 'off'
    ";

    fn lexemes() -> LexemeRegistry<()> {
        let mut reg = LexemeRegistry::new();
        for (i, text) in ["set", "clear", "on", "off"].iter().enumerate() {
            reg.register(text, i as TokenId + 1, None).unwrap();
        }
        reg
    }

    #[test]
    fn resolves_references_and_start_rule() {
        let grammar = Grammar::compile(SMALL, "Script").unwrap();
        assert_eq!(grammar.rules().len(), 3);
        assert_eq!(grammar.start(), 0);
        assert_eq!(grammar.rule_id("Value"), Some(2));
        assert_eq!(
            grammar.statement_element(),
            RuleElement::NonTerminal {
                name: "Line".into(),
                id: 1
            }
        );
    }

    #[test]
    fn links_emitting_terminals_only() {
        let grammar = Grammar::compile_linked(SMALL, "Script", &lexemes()).unwrap();
        let line = grammar.rule(1);
        assert_eq!(
            line.alternatives[1],
            vec![
                RuleElement::Terminal {
                    text: "clear".into(),
                    emit: true,
                    token: Some(2)
                },
                RuleElement::Terminal {
                    text: ";".into(),
                    emit: false,
                    token: None
                },
            ]
        );
    }

    #[test]
    fn lookahead_terminals_need_no_lexeme() {
        // '_' is never registered, yet linking succeeds.
        let grammar = Grammar::compile_linked(SMALL, "Script", &lexemes()).unwrap();
        let value = grammar.rule(2);
        assert_eq!(
            value.alternatives[1][1],
            RuleElement::NotFollowedBy(Box::new(RuleElement::Terminal {
                text: "_".into(),
                emit: true,
                token: None
            }))
        );
    }

    #[test]
    fn reports_unknown_terminal() {
        let mut reg: LexemeRegistry<()> = LexemeRegistry::new();
        for (i, text) in ["set", "clear", "on"].iter().enumerate() {
            reg.register(text, i as TokenId + 1, None).unwrap();
        }
        assert_eq!(
            Grammar::compile_linked(SMALL, "Script", &reg),
            Err(GrammarError::UnknownTerminal {
                rule: "Value".into(),
                text: "off".into()
            })
        );
    }

    #[test]
    fn reports_resolution_errors() {
        assert_eq!(
            Grammar::compile("<A> ::= <B>", "A"),
            Err(GrammarError::UndefinedRule {
                rule: "A".into(),
                reference: "B".into()
            })
        );
        assert_eq!(
            Grammar::compile("<A> ::= 'a'\n<A> ::= 'b'", "A"),
            Err(GrammarError::DuplicateRule("A".into()))
        );
        assert_eq!(
            Grammar::compile("<A> ::= 'a'", "Script"),
            Err(GrammarError::MissingStartRule("Script".into()))
        );
    }

    #[test]
    fn non_repeat_start_rule_is_its_own_statement() {
        let grammar = Grammar::compile("<Doc> ::= 'a' {<#n>}", "Doc").unwrap();
        assert_eq!(
            grammar.statement_element(),
            RuleElement::NonTerminal {
                name: "Doc".into(),
                id: 0
            }
        );
    }

    #[test]
    fn displays_in_the_source_dialect() {
        let grammar = Grammar::compile(SMALL, "Script").unwrap();
        assert_eq!(
            grammar.rule(2).to_string(),
            "<Value> ::= <#number> | 'on' (?!'_') | 'off'"
        );
    }
}
