//! Compositor script language
//!
//! A compositor script describes a chain of full-screen effects:
//!
//!     compositor Bloom {
//!         technique {
//!             texture rt0 target_width target_height PF_A8R8G8B8
//!             target rt0 {
//!                 input previous
//!             }
//!             target_output {
//!                 input none
//!                 pass render_quad {
//!                     material Ogre/Compositor/Bloom
//!                     input 0 rt0
//!                 }
//!             }
//!         }
//!     }
//!
//! [CompositorScriptCompiler] compiles such documents into calls on a
//! [ScriptBuilder]. The compiler is immutable and can be shared between threads;
//! each compile gets a fresh parse context.

pub mod actions;
pub mod context;
pub mod grammar;

use self::actions::CompositorActions;
use self::grammar::Action;
use super::builder::ScriptBuilder;
use super::config::CompilerConfig;
use super::diagnostics::DiagnosticSink;
use super::engine::{run_passes, CompileSummary, Language};
use super::error::CompileError;
use super::source::ScriptSource;

#[derive(Debug, Clone)]
pub struct CompositorScriptCompiler {
    language: &'static Language<Action>,
    group: String,
}

impl CompositorScriptCompiler {
    /// A compiler using the built-in defaults.
    pub fn new() -> Result<Self, CompileError> {
        Self::with_config(&CompilerConfig::default())
    }

    pub fn with_config(config: &CompilerConfig) -> Result<Self, CompileError> {
        let language = grammar::language(config.compiler.case_sensitive)?;
        Ok(Self {
            language,
            group: config.compiler.resource_group.clone(),
        })
    }

    pub fn language(&self) -> &Language<Action> {
        self.language
    }

    /// Resource group recorded on created compositors.
    pub fn resource_group(&self) -> &str {
        &self.group
    }

    /// Compile one document. Script errors go to `sink`; `Err` is returned only
    /// when the compiler itself is inconsistent.
    pub fn compile<B, S>(
        &self,
        source: &ScriptSource,
        builder: &mut B,
        sink: &mut S,
    ) -> Result<CompileSummary, CompileError>
    where
        B: ScriptBuilder,
        S: DiagnosticSink,
    {
        let mut actions = CompositorActions::new(builder, sink, &self.group);
        let mut summary = run_passes(self.language, source, &mut actions)?;
        summary.errors = actions.errors();
        Ok(summary)
    }

    pub fn compile_str<B, S>(
        &self,
        name: &str,
        text: &str,
        builder: &mut B,
        sink: &mut S,
    ) -> Result<CompileSummary, CompileError>
    where
        B: ScriptBuilder,
        S: DiagnosticSink,
    {
        self.compile(&ScriptSource::new(name, text), builder, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::config::Loader;
    use crate::script::registry::CompositorRegistry;

    #[test]
    fn compiler_is_shareable() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<CompositorScriptCompiler>();
    }

    #[test]
    fn resource_group_comes_from_config() {
        let config = Loader::new()
            .set_override("compiler.resource_group", "Effects")
            .unwrap()
            .build()
            .unwrap();
        let compiler = CompositorScriptCompiler::with_config(&config).unwrap();
        let mut registry = CompositorRegistry::new();
        let mut diagnostics = Vec::new();
        compiler
            .compile_str("", "compositor X {\n}\n", &mut registry, &mut diagnostics)
            .unwrap();
        assert_eq!(registry.get("X").map(|c| c.group.as_str()), Some("Effects"));
    }

    #[test]
    fn case_sensitive_compiler_rejects_upper_case_keywords() {
        let config = Loader::new()
            .set_override("compiler.case_sensitive", true)
            .unwrap()
            .build()
            .unwrap();
        let compiler = CompositorScriptCompiler::with_config(&config).unwrap();
        let mut registry = CompositorRegistry::new();
        let mut diagnostics = Vec::new();
        let summary = compiler
            .compile_str("", "COMPOSITOR X {\n}\n", &mut registry, &mut diagnostics)
            .unwrap();
        assert!(registry.is_empty());
        assert_eq!(summary.errors, 1);
    }
}
