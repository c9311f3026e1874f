//! Main module for the script compiler
//!
//! The pipeline runs in two passes per statement:
//!
//!     1. The [matching] engine walks the [grammar] from the current offset and emits a
//!        flat token list for the statement (pass 1). Failures are reported and the
//!        [tokenizer] resynchronises at the next boundary.
//!     2. The [engine] splits the tokens into actions and hands each one, through a
//!        [cursor::TokenCursor], to an [engine::ActionHandler] (pass 2).
//!
//! The [compositor] module is the concrete language: its BNF, keyword table, parse
//! context and action handlers. Everything else is language independent.

pub mod builder;
pub mod compositor;
pub mod config;
pub mod cursor;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod lexeme;
pub mod matching;
pub mod registry;
pub mod source;
pub mod testing;
pub mod token;
pub mod tokenizer;

pub use compositor::CompositorScriptCompiler;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, LogSink};
pub use engine::CompileSummary;
pub use error::CompileError;
pub use registry::CompositorRegistry;
pub use source::ScriptSource;
