//! Testing utilities for compiled compositors
//!
//! Two tools are meant to be used together:
//!
//! 1. [ScriptSources] loads the curated scripts under `tests/fixtures/`. Prefer them
//!    over inline script text so that a language change only touches one place.
//! 2. [assert_registry] checks the compiled tree with a fluent API, one closure per
//!    nesting level:
//!
//! ```rust-example
//! let compiled = compile_fixture("bloom.compositor");
//! assert_registry(&compiled.registry)
//!     .compositor_count(1)
//!     .compositor("Bloom", |c| {
//!         c.technique_count(1).technique(0, |t| {
//!             t.texture_count(1)
//!                 .output(|o| o.pass_count(1).pass(0, |p| p.material("Ogre/Bloom")));
//!         });
//!     });
//! ```

use super::builder::{
    Colour, CompareFunction, FrameBufferFlags, InputMode, PassType, PixelFormat,
    StencilOperation,
};
use super::compositor::CompositorScriptCompiler;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::engine::CompileSummary;
use super::registry::{CompositorDef, CompositorRegistry, PassDef, TargetPassDef, TechniqueDef};
use super::source::ScriptSource;
use std::path::PathBuf;

/// Access to the fixture scripts shipped with the crate.
pub struct ScriptSources;

impl ScriptSources {
    pub fn dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
    }

    pub fn get(name: &str) -> std::io::Result<ScriptSource> {
        let source = ScriptSource::from_path(Self::dir().join(name))?;
        // Diagnostics name fixtures by file name, not by absolute path.
        Ok(ScriptSource::new(name, source.text()))
    }

    pub fn must_get(name: &str) -> ScriptSource {
        match Self::get(name) {
            Ok(source) => source,
            Err(err) => panic!("fixture {} could not be read: {}", name, err),
        }
    }

    /// File names of every fixture, sorted.
    pub fn list() -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(Self::dir())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| entry.file_name().into_string().ok())
                    .filter(|name| name.ends_with(".compositor"))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Everything one compile produced.
#[derive(Debug)]
pub struct Compiled {
    pub registry: CompositorRegistry,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: CompileSummary,
}

pub fn compile_source(source: &ScriptSource) -> Compiled {
    let compiler = match CompositorScriptCompiler::new() {
        Ok(compiler) => compiler,
        Err(err) => panic!("compositor language failed to build: {}", err),
    };
    let mut registry = CompositorRegistry::new();
    let mut diagnostics = Vec::new();
    let summary = match compiler.compile(source, &mut registry, &mut diagnostics) {
        Ok(summary) => summary,
        Err(err) => panic!("compile of {} failed hard: {}", source.name(), err),
    };
    Compiled {
        registry,
        diagnostics,
        summary,
    }
}

pub fn compile_fixture(name: &str) -> Compiled {
    compile_source(&ScriptSources::must_get(name))
}

// ============================================================================
// Entry Points
// ============================================================================

pub fn assert_registry(registry: &CompositorRegistry) -> RegistryAssertion<'_> {
    RegistryAssertion { registry }
}

pub fn assert_diagnostics(diagnostics: &[Diagnostic]) -> DiagnosticsAssertion<'_> {
    DiagnosticsAssertion { diagnostics }
}

// ============================================================================
// Registry Assertions
// ============================================================================

pub struct RegistryAssertion<'a> {
    registry: &'a CompositorRegistry,
}

impl<'a> RegistryAssertion<'a> {
    pub fn compositor_count(self, expected: usize) -> Self {
        let names: Vec<&str> = self
            .registry
            .compositors()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names.len(),
            expected,
            "Expected {} compositors, found {}: {:?}",
            expected,
            names.len(),
            names
        );
        self
    }

    pub fn compositor<F, R>(self, name: &str, assertion: F) -> Self
    where
        F: FnOnce(CompositorAssertion<'a>) -> R,
    {
        let compositor = match self.registry.get(name) {
            Some(compositor) => compositor,
            None => panic!("No compositor named '{}'", name),
        };
        assertion(CompositorAssertion { compositor });
        self
    }
}

// ============================================================================
// Compositor Assertions
// ============================================================================

pub struct CompositorAssertion<'a> {
    compositor: &'a CompositorDef,
}

impl<'a> CompositorAssertion<'a> {
    pub fn group(self, expected: &str) -> Self {
        assert_eq!(
            self.compositor.group, expected,
            "compositor {}: resource group",
            self.compositor.name
        );
        self
    }

    pub fn technique_count(self, expected: usize) -> Self {
        assert_eq!(
            self.compositor.techniques.len(),
            expected,
            "compositor {}: technique count",
            self.compositor.name
        );
        self
    }

    pub fn technique<F, R>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(TechniqueAssertion<'a>) -> R,
    {
        let technique = match self.compositor.techniques.get(index) {
            Some(technique) => technique,
            None => panic!(
                "compositor {}: technique index {} out of bounds ({} techniques)",
                self.compositor.name,
                index,
                self.compositor.techniques.len()
            ),
        };
        assertion(TechniqueAssertion {
            technique,
            context: format!("{}.techniques[{}]", self.compositor.name, index),
        });
        self
    }
}

// ============================================================================
// Technique Assertions
// ============================================================================

pub struct TechniqueAssertion<'a> {
    technique: &'a TechniqueDef,
    context: String,
}

impl<'a> TechniqueAssertion<'a> {
    pub fn texture_count(self, expected: usize) -> Self {
        assert_eq!(
            self.technique.textures.len(),
            expected,
            "{}: texture count",
            self.context
        );
        self
    }

    /// Sizes of 0 stand for the render target size.
    pub fn texture(self, name: &str, width: u32, height: u32, format: PixelFormat) -> Self {
        let texture = self
            .technique
            .textures
            .iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("{}: no texture named '{}'", self.context, name));
        assert_eq!(
            (texture.width, texture.height, texture.format),
            (width, height, format),
            "{}: texture {}",
            self.context,
            name
        );
        self
    }

    pub fn target_count(self, expected: usize) -> Self {
        assert_eq!(
            self.technique.targets.len(),
            expected,
            "{}: target count",
            self.context
        );
        self
    }

    pub fn target<F, R>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(TargetAssertion<'a>) -> R,
    {
        let target = self.technique.targets.get(index).unwrap_or_else(|| {
            panic!(
                "{}: target index {} out of bounds ({} targets)",
                self.context,
                index,
                self.technique.targets.len()
            )
        });
        assertion(TargetAssertion {
            target,
            context: format!("{}.targets[{}]", self.context, index),
        });
        self
    }

    pub fn output<F, R>(self, assertion: F) -> Self
    where
        F: FnOnce(TargetAssertion<'a>) -> R,
    {
        assertion(TargetAssertion {
            target: &self.technique.output,
            context: format!("{}.output", self.context),
        });
        self
    }
}

// ============================================================================
// Target Assertions
// ============================================================================

pub struct TargetAssertion<'a> {
    target: &'a TargetPassDef,
    context: String,
}

impl<'a> TargetAssertion<'a> {
    pub fn output_name(self, expected: &str) -> Self {
        assert_eq!(
            self.target.output_name.as_deref(),
            Some(expected),
            "{}: output name",
            self.context
        );
        self
    }

    pub fn input_mode(self, expected: InputMode) -> Self {
        assert_eq!(self.target.input_mode, expected, "{}: input", self.context);
        self
    }

    pub fn only_initial(self, expected: bool) -> Self {
        assert_eq!(
            self.target.only_initial, expected,
            "{}: only_initial",
            self.context
        );
        self
    }

    pub fn visibility_mask(self, expected: u32) -> Self {
        assert_eq!(
            self.target.visibility_mask, expected,
            "{}: visibility_mask",
            self.context
        );
        self
    }

    pub fn lod_bias(self, expected: f32) -> Self {
        assert_eq!(self.target.lod_bias, expected, "{}: lod_bias", self.context);
        self
    }

    pub fn material_scheme(self, expected: &str) -> Self {
        assert_eq!(
            self.target.material_scheme, expected,
            "{}: material_scheme",
            self.context
        );
        self
    }

    pub fn pass_count(self, expected: usize) -> Self {
        assert_eq!(
            self.target.passes.len(),
            expected,
            "{}: pass count",
            self.context
        );
        self
    }

    pub fn pass<F, R>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(PassAssertion<'a>) -> R,
    {
        let pass = self.target.passes.get(index).unwrap_or_else(|| {
            panic!(
                "{}: pass index {} out of bounds ({} passes)",
                self.context,
                index,
                self.target.passes.len()
            )
        });
        assertion(PassAssertion {
            pass,
            context: format!("{}.passes[{}]", self.context, index),
        });
        self
    }
}

// ============================================================================
// Pass Assertions
// ============================================================================

pub struct PassAssertion<'a> {
    pass: &'a PassDef,
    context: String,
}

impl<'a> PassAssertion<'a> {
    pub fn pass_type(self, expected: PassType) -> Self {
        assert_eq!(self.pass.pass_type, expected, "{}: type", self.context);
        self
    }

    pub fn material(self, expected: &str) -> Self {
        assert_eq!(
            self.pass.material.as_deref(),
            Some(expected),
            "{}: material",
            self.context
        );
        self
    }

    pub fn identifier(self, expected: u32) -> Self {
        assert_eq!(self.pass.identifier, expected, "{}: identifier", self.context);
        self
    }

    pub fn input(self, id: u32, texture: &str) -> Self {
        assert_eq!(
            self.pass.inputs.get(&id).map(String::as_str),
            Some(texture),
            "{}: input {}",
            self.context,
            id
        );
        self
    }

    pub fn render_queues(self, first: u8, last: u8) -> Self {
        assert_eq!(
            (self.pass.first_render_queue, self.pass.last_render_queue),
            (first, last),
            "{}: render queues",
            self.context
        );
        self
    }

    pub fn clear_buffers(self, expected: FrameBufferFlags) -> Self {
        assert_eq!(
            self.pass.clear_buffers, expected,
            "{}: clear buffers",
            self.context
        );
        self
    }

    pub fn clear_colour(self, expected: Colour) -> Self {
        assert_eq!(
            self.pass.clear_colour, expected,
            "{}: clear colour",
            self.context
        );
        self
    }

    pub fn clear_depth(self, expected: f32) -> Self {
        assert_eq!(self.pass.clear_depth, expected, "{}: clear depth", self.context);
        self
    }

    pub fn clear_stencil(self, expected: u32) -> Self {
        assert_eq!(
            self.pass.clear_stencil, expected,
            "{}: clear stencil",
            self.context
        );
        self
    }

    pub fn stencil_check(self, expected: bool) -> Self {
        assert_eq!(self.pass.stencil_check, expected, "{}: check", self.context);
        self
    }

    pub fn stencil_func(self, expected: CompareFunction) -> Self {
        assert_eq!(self.pass.stencil_func, expected, "{}: comp_func", self.context);
        self
    }

    pub fn stencil_ref_value(self, expected: u32) -> Self {
        assert_eq!(
            self.pass.stencil_ref_value, expected,
            "{}: ref_value",
            self.context
        );
        self
    }

    pub fn stencil_mask(self, expected: u32) -> Self {
        assert_eq!(self.pass.stencil_mask, expected, "{}: mask", self.context);
        self
    }

    /// Fail, depth-fail and pass operations, in that order.
    pub fn stencil_ops(
        self,
        fail: StencilOperation,
        depth_fail: StencilOperation,
        pass: StencilOperation,
    ) -> Self {
        assert_eq!(
            (
                self.pass.stencil_fail_op,
                self.pass.stencil_depth_fail_op,
                self.pass.stencil_pass_op
            ),
            (fail, depth_fail, pass),
            "{}: stencil operations",
            self.context
        );
        self
    }

    pub fn two_sided(self, expected: bool) -> Self {
        assert_eq!(
            self.pass.stencil_two_sided, expected,
            "{}: two_sided",
            self.context
        );
        self
    }
}

// ============================================================================
// Diagnostic Assertions
// ============================================================================

pub struct DiagnosticsAssertion<'a> {
    diagnostics: &'a [Diagnostic],
}

impl<'a> DiagnosticsAssertion<'a> {
    pub fn count(self, expected: usize) -> Self {
        let rendered: Vec<String> = self.diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            rendered.len(),
            expected,
            "Expected {} diagnostics, found {}: {:#?}",
            expected,
            rendered.len(),
            rendered
        );
        self
    }

    pub fn none(self) -> Self {
        self.count(0)
    }

    /// Kind, line and rendered text of one diagnostic.
    pub fn at(self, index: usize, kind: DiagnosticKind, line: usize, text: &str) -> Self {
        let diagnostic = self.diagnostics.get(index).unwrap_or_else(|| {
            panic!(
                "diagnostic index {} out of bounds ({} diagnostics)",
                index,
                self.diagnostics.len()
            )
        });
        assert_eq!(
            (diagnostic.kind, diagnostic.line, diagnostic.to_string().as_str()),
            (kind, line, text),
            "diagnostics[{}]",
            index
        );
        self
    }
}
