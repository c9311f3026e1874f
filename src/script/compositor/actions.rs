//! Compositor action handlers
//!
//! Every handler first checks that its statement belongs in the current section,
//! then reads its arguments and drives the builder. Problems a script author can
//! cause are logged and the compile carries on; only a disagreement between the
//! grammar, the keyword table and the context stops it.

use super::context::{ScriptContext, Section};
use super::grammar::{Action, Keyword};
use crate::script::builder::{
    Attribute, ChildKind, Colour, CompareFunction, FrameBufferFlags, InputMode, PassType,
    PixelFormat, ScriptBuilder, StencilOperation, TextureDefinition,
};
use crate::script::cursor::TokenCursor;
use crate::script::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::script::engine::{ActionFlow, ActionHandler};
use crate::script::error::{BuilderError, CompileError, CursorError};
use crate::script::source::ScriptSource;
use crate::script::token::Token;
use crate::script::tokenizer::SyntaxMismatch;

/// Why an action did not complete.
#[derive(Debug)]
enum Refusal {
    Misplaced(String),
    Value(String),
    Fatal(CompileError),
}

impl From<BuilderError> for Refusal {
    fn from(err: BuilderError) -> Self {
        Refusal::Value(err.to_string())
    }
}

impl From<CursorError> for Refusal {
    fn from(err: CursorError) -> Self {
        Refusal::Value(err.to_string())
    }
}

impl From<CompileError> for Refusal {
    fn from(err: CompileError) -> Self {
        Refusal::Fatal(err)
    }
}

type ActionResult = Result<(), Refusal>;

pub struct CompositorActions<'r, B, S> {
    builder: &'r mut B,
    sink: &'r mut S,
    context: ScriptContext,
    group: String,
    document: String,
    last_line: usize,
    errors: usize,
}

impl<'r, B, S> CompositorActions<'r, B, S>
where
    B: ScriptBuilder,
    S: DiagnosticSink,
{
    pub fn new(builder: &'r mut B, sink: &'r mut S, group: &str) -> Self {
        Self {
            builder,
            sink,
            context: ScriptContext::new(group),
            group: group.to_string(),
            document: String::new(),
            last_line: 1,
            errors: 0,
        }
    }

    /// Diagnostics logged so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn context(&self) -> &ScriptContext {
        &self.context
    }

    fn report(&mut self, kind: DiagnosticKind, line: usize, message: String) {
        let diagnostic = Diagnostic::new(kind, line, message)
            .with_document(self.document.as_str())
            .in_compositor(self.context.compositor_name());
        self.errors += 1;
        self.sink.log_message(diagnostic);
    }

    fn require(&self, section: Section, token: &Token) -> ActionResult {
        if self.context.section == section {
            Ok(())
        } else {
            Err(misplaced(token, &self.context))
        }
    }

    /// Statements inside a refused block only track nesting.
    fn skip(&mut self, action: &Action, token: &Token) {
        if action.opens_block() {
            self.context.skip_depth += 1;
        } else if *action == Action::CloseBrace {
            self.context.skip_depth -= 1;
        }
        log::trace!(
            "skipped '{}' at line {} (depth {})",
            keyword_text(token),
            token.line,
            self.context.skip_depth
        );
    }

    fn run(&mut self, action: &Action, token: &Token, args: &mut TokenCursor<'_>) -> ActionResult {
        let line = token.line;
        match action {
            Action::CloseBrace => self.close_brace(),
            Action::Compositor => self.compositor(token, args),
            Action::Technique => self.technique(token),
            Action::Texture => self.texture(token, args),
            Action::Target => self.target(token, args),
            Action::TargetOutput => self.target_output(token),
            Action::Input => self.input(token, args),
            Action::OnlyInitial => {
                let on = on_off(args, line)?;
                self.set_on_target(token, Attribute::OnlyInitial(on))
            }
            Action::VisibilityMask => {
                let mask = args.next_numeric()? as u32;
                self.set_on_target(token, Attribute::VisibilityMask(mask))
            }
            Action::LodBias => {
                let bias = args.next_numeric()? as f32;
                self.set_on_target(token, Attribute::LodBias(bias))
            }
            Action::MaterialScheme => {
                let scheme = args.next_label()?.to_string();
                self.set_on_target(token, Attribute::MaterialScheme(scheme))
            }
            Action::Pass => self.pass(token, args),
            Action::Material => {
                let name = args.next_label()?.to_string();
                self.set_on_pass(token, Attribute::Material(name))
            }
            Action::FirstRenderQueue => {
                let queue = args.next_numeric()? as u8;
                self.set_on_pass(token, Attribute::FirstRenderQueue(queue))
            }
            Action::LastRenderQueue => {
                let queue = args.next_numeric()? as u8;
                self.set_on_pass(token, Attribute::LastRenderQueue(queue))
            }
            Action::Identifier => {
                let id = args.next_numeric()? as u32;
                self.set_on_pass(token, Attribute::Identifier(id))
            }
            Action::Buffers => {
                let mut flags = FrameBufferFlags::empty();
                while args.remaining() > 0 {
                    flags |= buffer_flag(args, line)?;
                }
                self.set_on_pass(token, Attribute::ClearBuffers(flags))
            }
            Action::ColourValue => {
                let mut channels = [0.0f32; 4];
                for channel in &mut channels {
                    *channel = args.next_numeric()? as f32;
                }
                let [r, g, b, a] = channels;
                self.set_on_pass(token, Attribute::ClearColour(Colour::new(r, g, b, a)))
            }
            Action::DepthValue => {
                let depth = args.next_numeric()? as f32;
                self.set_on_pass(token, Attribute::ClearDepth(depth))
            }
            Action::StencilValue => {
                let value = args.next_numeric()? as u32;
                self.set_on_pass(token, Attribute::ClearStencil(value))
            }
            Action::Check => {
                let on = on_off(args, line)?;
                self.set_on_pass(token, Attribute::StencilCheck(on))
            }
            Action::CompFunc => {
                let func = compare_function(args, line)?;
                self.set_on_pass(token, Attribute::StencilFunc(func))
            }
            Action::RefValue => {
                let value = args.next_numeric()? as u32;
                self.set_on_pass(token, Attribute::StencilRefValue(value))
            }
            Action::Mask => {
                let mask = args.next_numeric()? as u32;
                self.set_on_pass(token, Attribute::StencilMask(mask))
            }
            Action::FailOp => {
                let op = stencil_operation(args, line)?;
                self.set_on_pass(token, Attribute::StencilFailOp(op))
            }
            Action::DepthFailOp => {
                let op = stencil_operation(args, line)?;
                self.set_on_pass(token, Attribute::StencilDepthFailOp(op))
            }
            Action::PassOp => {
                let op = stencil_operation(args, line)?;
                self.set_on_pass(token, Attribute::StencilPassOp(op))
            }
            Action::TwoSided => {
                let on = on_off(args, line)?;
                self.set_on_pass(token, Attribute::StencilTwoSided(on))
            }
        }
    }

    fn close_brace(&mut self) -> ActionResult {
        if self.context.section == Section::None {
            return Err(Refusal::Misplaced("Unexpected terminating brace.".to_string()));
        }
        self.context.close_section();
        Ok(())
    }

    fn compositor(&mut self, token: &Token, args: &mut TokenCursor<'_>) -> ActionResult {
        self.require(Section::None, token)?;
        let name = args.next_label()?;
        let handle = self.builder.create_compositor(name, &self.context.group)?;
        self.context.compositor = Some((handle, name.to_string()));
        self.context.section = Section::Compositor;
        Ok(())
    }

    fn technique(&mut self, token: &Token) -> ActionResult {
        self.require(Section::Compositor, token)?;
        let parent = self.context.compositor_handle(token.line)?;
        let handle = self.builder.create_child(parent, ChildKind::Technique)?;
        self.context.technique = Some(handle);
        self.context.section = Section::Technique;
        Ok(())
    }

    fn texture(&mut self, token: &Token, args: &mut TokenCursor<'_>) -> ActionResult {
        self.require(Section::Technique, token)?;
        let technique = self.context.technique_handle(token.line)?;
        let name = args.next_label()?.to_string();
        // 0 means the size of the render target
        let width = if args.next_token_is(Keyword::TargetWidth.id()) {
            0
        } else {
            args.next_numeric()? as u32
        };
        let height = if args.next_token_is(Keyword::TargetHeight.id()) {
            0
        } else {
            args.next_numeric()? as u32
        };
        let format = pixel_format(args, token.line)?;
        let definition = TextureDefinition {
            name,
            width,
            height,
            format,
        };
        self.builder
            .set_attribute(technique, Attribute::Texture(definition))?;
        Ok(())
    }

    fn target(&mut self, token: &Token, args: &mut TokenCursor<'_>) -> ActionResult {
        self.require(Section::Technique, token)?;
        let technique = self.context.technique_handle(token.line)?;
        let output = args.next_label()?.to_string();
        let handle = self
            .builder
            .create_child(technique, ChildKind::TargetPass)?;
        self.builder
            .set_attribute(handle, Attribute::OutputName(output))?;
        self.context.target = Some(handle);
        self.context.output_target = false;
        self.context.section = Section::Target;
        Ok(())
    }

    fn target_output(&mut self, token: &Token) -> ActionResult {
        self.require(Section::Technique, token)?;
        let technique = self.context.technique_handle(token.line)?;
        let handle = self
            .builder
            .create_child(technique, ChildKind::OutputTarget)?;
        self.context.target = Some(handle);
        self.context.output_target = true;
        self.context.section = Section::Target;
        Ok(())
    }

    /// `input` reads a mode inside a target and a texture binding inside a pass.
    fn input(&mut self, token: &Token, args: &mut TokenCursor<'_>) -> ActionResult {
        match self.context.section {
            Section::Target => {
                let mode = match next_keyword(args, token.line)? {
                    Keyword::None => InputMode::None,
                    Keyword::Previous => InputMode::Previous,
                    other => return Err(unmapped(other, "input mode", token.line)),
                };
                self.set_on_target(token, Attribute::InputMode(mode))
            }
            Section::Pass => {
                let id = args.next_numeric()? as u32;
                let texture = args.next_label()?.to_string();
                self.set_on_pass(token, Attribute::Input { id, texture })
            }
            _ => Err(misplaced(token, &self.context)),
        }
    }

    fn pass(&mut self, token: &Token, args: &mut TokenCursor<'_>) -> ActionResult {
        self.require(Section::Target, token)?;
        let target = self.context.target_handle(token.line)?;
        let kind = match next_keyword(args, token.line)? {
            Keyword::RenderQuad => PassType::RenderQuad,
            Keyword::Clear => PassType::Clear,
            Keyword::Stencil => PassType::Stencil,
            Keyword::RenderScene => PassType::RenderScene,
            other => return Err(unmapped(other, "pass type", token.line)),
        };
        let handle = self.builder.create_child(target, ChildKind::Pass)?;
        self.builder.set_attribute(handle, Attribute::PassType(kind))?;
        self.context.pass = Some(handle);
        self.context.section = Section::Pass;
        Ok(())
    }

    fn set_on_target(&mut self, token: &Token, attribute: Attribute) -> ActionResult {
        self.require(Section::Target, token)?;
        // the output target only takes an input mode
        if self.context.output_target && !matches!(attribute, Attribute::InputMode(_)) {
            return Err(misplaced(token, &self.context));
        }
        let target = self.context.target_handle(token.line)?;
        self.builder.set_attribute(target, attribute)?;
        Ok(())
    }

    fn set_on_pass(&mut self, token: &Token, attribute: Attribute) -> ActionResult {
        self.require(Section::Pass, token)?;
        let pass = self.context.pass_handle(token.line)?;
        self.builder.set_attribute(pass, attribute)?;
        Ok(())
    }
}

impl<'r, B, S> ActionHandler<Action> for CompositorActions<'r, B, S>
where
    B: ScriptBuilder,
    S: DiagnosticSink,
{
    fn begin_document(&mut self, source: &ScriptSource) {
        self.context = ScriptContext::new(self.group.as_str());
        self.document = source.name().to_string();
        self.last_line = source.text().lines().count().max(1);
    }

    fn dispatch(
        &mut self,
        action: &Action,
        token: &Token,
        args: &mut TokenCursor<'_>,
    ) -> Result<ActionFlow, CompileError> {
        if self.context.skip_depth > 0 {
            self.skip(action, token);
            return Ok(ActionFlow::Continue);
        }
        let (kind, message, flow) = match self.run(action, token, args) {
            Ok(()) => return Ok(ActionFlow::Continue),
            Err(Refusal::Fatal(err)) => return Err(err),
            // the rest of a misplaced statement is misplaced too
            Err(Refusal::Misplaced(message)) => {
                (DiagnosticKind::Misplaced, message, ActionFlow::SkipStatement)
            }
            Err(Refusal::Value(message)) => {
                (DiagnosticKind::DomainValue, message, ActionFlow::Continue)
            }
        };
        if action.opens_block() {
            self.context.skip_depth = 1;
        }
        self.report(kind, token.line, message);
        Ok(flow)
    }

    fn on_mismatch(&mut self, mismatch: &SyntaxMismatch) {
        self.report(
            DiagnosticKind::SyntaxMismatch,
            mismatch.line,
            mismatch.to_string(),
        );
    }

    fn end_document(&mut self) {
        let open = self.context.open_blocks();
        if open > 0 {
            let message = format!("Unexpected end of script: {} block(s) still open.", open);
            self.report(DiagnosticKind::SyntaxMismatch, self.last_line, message);
        }
    }
}

fn keyword_text(token: &Token) -> &'static str {
    Keyword::from_id(token.id).map_or("?", Keyword::text)
}

fn misplaced(token: &Token, context: &ScriptContext) -> Refusal {
    Refusal::Misplaced(format!(
        "'{}' is not allowed {}",
        keyword_text(token),
        context.location()
    ))
}

fn unmapped(keyword: Keyword, what: &str, line: usize) -> Refusal {
    Refusal::Fatal(CompileError::invariant(
        line,
        format!("'{}' is not a {}", keyword.text(), what),
    ))
}

fn next_keyword(args: &mut TokenCursor<'_>, line: usize) -> Result<Keyword, Refusal> {
    let id = args.next_token_id()?;
    Keyword::from_id(id).ok_or_else(|| {
        Refusal::Fatal(CompileError::invariant(
            line,
            format!("token {} is not a compositor keyword", id),
        ))
    })
}

fn on_off(args: &mut TokenCursor<'_>, line: usize) -> Result<bool, Refusal> {
    match next_keyword(args, line)? {
        Keyword::On => Ok(true),
        Keyword::Off => Ok(false),
        other => Err(unmapped(other, "switch value", line)),
    }
}

fn buffer_flag(args: &mut TokenCursor<'_>, line: usize) -> Result<FrameBufferFlags, Refusal> {
    match next_keyword(args, line)? {
        Keyword::Colour => Ok(FrameBufferFlags::COLOUR),
        Keyword::Depth => Ok(FrameBufferFlags::DEPTH),
        Keyword::Stencil => Ok(FrameBufferFlags::STENCIL),
        other => Err(unmapped(other, "frame buffer", line)),
    }
}

fn pixel_format(args: &mut TokenCursor<'_>, line: usize) -> Result<PixelFormat, Refusal> {
    Ok(match next_keyword(args, line)? {
        Keyword::PfA8R8G8B8 => PixelFormat::A8R8G8B8,
        Keyword::PfR8G8B8A8 => PixelFormat::R8G8B8A8,
        Keyword::PfR8G8B8 => PixelFormat::R8G8B8,
        Keyword::PfFloat16R => PixelFormat::Float16R,
        Keyword::PfFloat16Rgb => PixelFormat::Float16Rgb,
        Keyword::PfFloat16Rgba => PixelFormat::Float16Rgba,
        Keyword::PfFloat32R => PixelFormat::Float32R,
        Keyword::PfFloat32Rgb => PixelFormat::Float32Rgb,
        Keyword::PfFloat32Rgba => PixelFormat::Float32Rgba,
        other => return Err(unmapped(other, "pixel format", line)),
    })
}

fn compare_function(args: &mut TokenCursor<'_>, line: usize) -> Result<CompareFunction, Refusal> {
    Ok(match next_keyword(args, line)? {
        Keyword::AlwaysFail => CompareFunction::AlwaysFail,
        Keyword::AlwaysPass => CompareFunction::AlwaysPass,
        Keyword::Less => CompareFunction::Less,
        Keyword::LessEqual => CompareFunction::LessEqual,
        Keyword::Equal => CompareFunction::Equal,
        Keyword::NotEqual => CompareFunction::NotEqual,
        Keyword::GreaterEqual => CompareFunction::GreaterEqual,
        Keyword::Greater => CompareFunction::Greater,
        other => return Err(unmapped(other, "compare function", line)),
    })
}

fn stencil_operation(
    args: &mut TokenCursor<'_>,
    line: usize,
) -> Result<StencilOperation, Refusal> {
    Ok(match next_keyword(args, line)? {
        Keyword::Keep => StencilOperation::Keep,
        Keyword::Zero => StencilOperation::Zero,
        Keyword::Replace => StencilOperation::Replace,
        Keyword::Increment => StencilOperation::Increment,
        Keyword::Decrement => StencilOperation::Decrement,
        Keyword::IncrementWrap => StencilOperation::IncrementWrap,
        Keyword::DecrementWrap => StencilOperation::DecrementWrap,
        Keyword::Invert => StencilOperation::Invert,
        other => return Err(unmapped(other, "stencil operation", line)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::compositor::grammar::language;
    use crate::script::engine::run_passes;
    use crate::script::registry::CompositorRegistry;

    fn compile(text: &str) -> (CompositorRegistry, Vec<Diagnostic>) {
        let mut registry = CompositorRegistry::new();
        let mut diagnostics = Vec::new();
        {
            let mut actions = CompositorActions::new(&mut registry, &mut diagnostics, "General");
            let source = ScriptSource::new("test.compositor", text);
            run_passes(language(false).unwrap(), &source, &mut actions).unwrap();
        }
        (registry, diagnostics)
    }

    #[test]
    fn texture_sizes_default_to_the_target() {
        let (registry, diagnostics) = compile(
            "compositor C {\n technique {\n  texture rt0 target_width 256 PF_A8R8G8B8\n  target_output { }\n }\n}\n",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let texture = &registry.compositors()[0].techniques[0].textures[0];
        assert_eq!((texture.width, texture.height), (0, 256));
        assert_eq!(texture.format, PixelFormat::A8R8G8B8);
    }

    #[test]
    fn input_depends_on_the_section() {
        let (registry, diagnostics) = compile(
            "compositor C {\n technique {\n  texture rt0 target_width target_height PF_R8G8B8\n  target rt0 {\n   input previous\n  }\n  target_output {\n   input none\n   pass render_quad {\n    input 0 rt0\n   }\n  }\n }\n}\n",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let technique = &registry.compositors()[0].techniques[0];
        assert_eq!(technique.targets[0].input_mode, InputMode::Previous);
        assert_eq!(technique.targets[0].output_name.as_deref(), Some("rt0"));
        let pass = &technique.output.passes[0];
        assert_eq!(pass.inputs.get(&0).map(String::as_str), Some("rt0"));
    }

    #[test]
    fn misplaced_opener_discards_its_block() {
        let (registry, diagnostics) = compile(
            "compositor C {\n pass clear {\n  identifier 3\n }\n technique {\n }\n}\n",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Misplaced);
        assert_eq!(
            diagnostics[0].to_string(),
            "Error in compositor C at line 2 of test.compositor: 'pass' is not allowed in a compositor block"
        );
        assert_eq!(registry.compositors()[0].techniques.len(), 1);
    }

    #[test]
    fn duplicate_compositor_is_logged_and_skipped() {
        let (registry, diagnostics) = compile(
            "compositor C {\n}\ncompositor C {\n technique {\n }\n}\n",
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.compositors()[0].techniques.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DomainValue);
        assert_eq!(
            diagnostics[0].message,
            "compositor 'C' already exists"
        );
    }

    #[test]
    fn output_target_takes_only_an_input_mode() {
        let (registry, diagnostics) = compile(
            "compositor C {\n technique {\n  target_output {\n   input previous\n   only_initial on\n   lod_bias 2\n  }\n }\n}\n",
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics[0].message,
            "'only_initial' is not allowed in a target_output block"
        );
        assert_eq!(diagnostics[1].line, 6);
        let output = &registry.compositors()[0].techniques[0].output;
        assert_eq!(output.input_mode, InputMode::Previous);
        assert!(!output.only_initial);
        assert_eq!(output.lod_bias, 1.0);
    }

    #[test]
    fn misplaced_option_block_is_reported_once() {
        let (registry, diagnostics) = compile(
            "compositor C {\n technique {\n  target_output {\n   clear { buffers colour colour_value 1 1 1 1 depth_value 0.5 }\n  }\n }\n}\n",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 4);
        assert_eq!(
            diagnostics[0].message,
            "'buffers' is not allowed in a target_output block"
        );
        assert!(registry.compositors()[0].techniques[0].output.passes.is_empty());
    }

    #[test]
    fn unclosed_blocks_are_reported_at_the_end() {
        let (registry, diagnostics) = compile(
            "compositor W {\n technique {\n  target_output {\n   pass render_quad {\n    material M\n",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::SyntaxMismatch);
        assert_eq!(
            diagnostics[0].to_string(),
            "Error in compositor W at line 5 of test.compositor: Unexpected end of script: 4 block(s) still open."
        );
        let pass = &registry.compositors()[0].techniques[0].output.passes[0];
        assert_eq!(pass.material.as_deref(), Some("M"));
    }

    #[test]
    fn stray_close_brace() {
        let (_, diagnostics) = compile("}\n");
        assert_eq!(
            diagnostics[0].to_string(),
            "Error at line 1 of test.compositor: Unexpected terminating brace."
        );
    }
}
