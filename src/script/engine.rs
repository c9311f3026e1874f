//! Action dispatch (pass 2)
//!
//! A [Language] bundles a compiled grammar with the lexeme table it was linked
//! against. [run_passes] drives pass 1 over a document and, for every statement that
//! matched, splits the statement's tokens into action units: an action token followed
//! by its arguments up to the next action token. Each unit is handed to an
//! [ActionHandler] through a [TokenCursor] that only sees that unit's arguments.

use super::cursor::TokenCursor;
use super::error::{CompileError, GrammarError};
use super::grammar::{Grammar, RuleElement};
use super::lexeme::LexemeRegistry;
use super::source::ScriptSource;
use super::token::Token;
use super::tokenizer::{Pass1Event, Statement, SyntaxMismatch, Tokenizer};
use serde::Serialize;

/// A grammar linked to its lexemes, ready to compile documents.
#[derive(Debug, Clone)]
pub struct Language<A> {
    name: String,
    grammar: Grammar,
    lexemes: LexemeRegistry<A>,
    statement: RuleElement,
}

impl<A> Language<A> {
    pub fn new(
        name: &str,
        bnf: &str,
        start: &str,
        lexemes: LexemeRegistry<A>,
    ) -> Result<Self, GrammarError> {
        let grammar = Grammar::compile_linked(bnf, start, &lexemes)?;
        let statement = grammar.statement_element();
        log::debug!(
            "built {} language: {} rules, {} lexemes",
            name,
            grammar.rules().len(),
            lexemes.len()
        );
        Ok(Self {
            name: name.to_string(),
            grammar,
            lexemes,
            statement,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn lexemes(&self) -> &LexemeRegistry<A> {
        &self.lexemes
    }

    /// Pass 1 over `text`.
    pub fn tokenize<'a>(&'a self, text: &'a str) -> Tokenizer<'a, A> {
        Tokenizer::new(&self.grammar, &self.lexemes, &self.statement, text)
    }
}

/// What to do with the rest of a statement after one of its actions ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFlow {
    Continue,
    /// Drop the statement's remaining action units.
    SkipStatement,
}

/// Receiver of action units and pass 1 failures.
pub trait ActionHandler<A> {
    /// Called once before the first statement of a document.
    fn begin_document(&mut self, _source: &ScriptSource) {}

    /// Run the action triggered by `token`. Recoverable problems should be reported
    /// by the handler itself; an `Err` aborts the compile.
    fn dispatch(
        &mut self,
        action: &A,
        token: &Token,
        args: &mut TokenCursor<'_>,
    ) -> Result<ActionFlow, CompileError>;

    fn on_mismatch(&mut self, mismatch: &SyntaxMismatch);

    /// Called once after the last statement of a document.
    fn end_document(&mut self) {}
}

/// Counts for one compiled document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompileSummary {
    pub statements: usize,
    pub actions: usize,
    pub mismatches: usize,
    /// Diagnostics reported while compiling, mismatches included.
    pub errors: usize,
}

pub fn run_passes<A, H>(
    language: &Language<A>,
    source: &ScriptSource,
    handler: &mut H,
) -> Result<CompileSummary, CompileError>
where
    H: ActionHandler<A>,
{
    log::debug!("compiling {} ({} bytes)", source.name(), source.text().len());
    handler.begin_document(source);

    let mut summary = CompileSummary::default();
    for event in language.tokenize(source.text()) {
        match event {
            Pass1Event::Statement(statement) => {
                summary.statements += 1;
                summary.actions += dispatch_statement(language, &statement, handler)?;
            }
            Pass1Event::Mismatch(mismatch) => {
                log::debug!("syntax mismatch at line {}: {}", mismatch.line, mismatch);
                summary.mismatches += 1;
                handler.on_mismatch(&mismatch);
            }
        }
    }

    handler.end_document();
    log::debug!(
        "compiled {}: {} statements, {} actions, {} mismatches",
        source.name(),
        summary.statements,
        summary.actions,
        summary.mismatches
    );
    Ok(summary)
}

/// Dispatch every action unit of a statement and return how many ran.
fn dispatch_statement<A, H>(
    language: &Language<A>,
    statement: &Statement,
    handler: &mut H,
) -> Result<usize, CompileError>
where
    H: ActionHandler<A>,
{
    let lexemes = &language.lexemes;
    let tokens = &statement.tokens;
    log::trace!(
        "statement at line {} with {} tokens",
        statement.line,
        tokens.len()
    );

    let mut dispatched = 0;
    let mut start = 0;
    while let Some(token) = tokens.get(start) {
        let action = lexemes.action_for(token.id).ok_or_else(|| {
            CompileError::invariant(
                token.line,
                format!("statement starts with {} which triggers no action", token),
            )
        })?;
        let end = tokens[start + 1..]
            .iter()
            .position(|t| lexemes.action_for(t.id).is_some())
            .map_or(tokens.len(), |p| start + 1 + p);

        let mut args = TokenCursor::new(&tokens[start + 1..end], token.line);
        let flow = handler.dispatch(action, token, &mut args)?;
        dispatched += 1;
        if flow == ActionFlow::SkipStatement {
            log::trace!(
                "dropped {} token(s) of the statement at line {}",
                tokens.len() - end,
                statement.line
            );
            break;
        }
        if args.remaining() > 0 {
            log::trace!(
                "{} unread argument(s) after token {} at line {}",
                args.remaining(),
                token.id,
                token.line
            );
        }
        start = end;
    }
    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::token::TokenId;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Act {
        Open,
        Set,
        Close,
    }

    const BNF: &str = "
        <Script> ::= {<Statement>}
        <Statement> ::= <Open> | <Pair> | <Close> | <Orphan>
        <Open> ::= 'block' <@name> -'{'
        <Pair> ::= 'set' <#a> 'set' <#b> <#c>
        <Close> ::= '}'
        <Orphan> ::= 'stray'
    ";

    fn language() -> Language<Act> {
        let mut lexemes = LexemeRegistry::new();
        let words: [(&str, TokenId, Option<Act>); 4] = [
            ("block", 1, Some(Act::Open)),
            ("set", 2, Some(Act::Set)),
            ("}", 3, Some(Act::Close)),
            ("stray", 4, None),
        ];
        for (text, id, action) in words {
            lexemes.register(text, id, action).unwrap();
        }
        Language::new("test", BNF, "Script", lexemes).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Act, usize, usize)>,
        mismatches: Vec<String>,
        documents: usize,
        stop_at: Option<Act>,
    }

    impl ActionHandler<Act> for Recorder {
        fn begin_document(&mut self, _source: &ScriptSource) {
            self.documents += 1;
        }

        fn dispatch(
            &mut self,
            action: &Act,
            token: &Token,
            args: &mut TokenCursor<'_>,
        ) -> Result<ActionFlow, CompileError> {
            self.calls.push((*action, token.line, args.remaining()));
            if self.stop_at == Some(*action) {
                Ok(ActionFlow::SkipStatement)
            } else {
                Ok(ActionFlow::Continue)
            }
        }

        fn on_mismatch(&mut self, mismatch: &SyntaxMismatch) {
            self.mismatches.push(mismatch.to_string());
        }
    }

    #[test]
    fn statement_is_split_at_action_tokens() {
        let language = language();
        let mut recorder = Recorder::default();
        let source = ScriptSource::from_string("set 1 set 2 3");
        let summary = run_passes(&language, &source, &mut recorder).unwrap();
        assert_eq!(recorder.calls, vec![(Act::Set, 1, 1), (Act::Set, 1, 2)]);
        assert_eq!(summary.statements, 1);
        assert_eq!(summary.actions, 2);
        assert_eq!(recorder.documents, 1);
    }

    #[test]
    fn skipping_drops_the_rest_of_the_statement() {
        let language = language();
        let mut recorder = Recorder {
            stop_at: Some(Act::Set),
            ..Recorder::default()
        };
        let source = ScriptSource::from_string("set 1 set 2 3
set 4 set 5 6");
        let summary = run_passes(&language, &source, &mut recorder).unwrap();
        assert_eq!(recorder.calls, vec![(Act::Set, 1, 1), (Act::Set, 2, 1)]);
        assert_eq!(summary.statements, 2);
        assert_eq!(summary.actions, 2);
    }

    #[test]
    fn mismatches_reach_the_handler_and_compiling_continues() {
        let language = language();
        let mut recorder = Recorder::default();
        let source = ScriptSource::from_string("block a {\nnope\n}");
        let summary = run_passes(&language, &source, &mut recorder).unwrap();
        assert_eq!(recorder.mismatches, vec!["unexpected 'nope'"]);
        assert_eq!(recorder.calls, vec![(Act::Open, 1, 1), (Act::Close, 3, 0)]);
        assert_eq!(summary.mismatches, 1);
    }

    #[test]
    fn statement_without_leading_action_is_an_invariant_error() {
        let language = language();
        let mut recorder = Recorder::default();
        let source = ScriptSource::from_string("stray");
        let err = run_passes(&language, &source, &mut recorder).unwrap_err();
        assert!(matches!(err, CompileError::ContextInvariant { line: 1, .. }));
    }
}
