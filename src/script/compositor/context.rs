//! Parse context for one compositor document

use crate::script::builder::ObjectHandle;
use crate::script::error::CompileError;
use serde::Serialize;
use std::fmt;

/// Innermost open block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[default]
    None,
    Compositor,
    Technique,
    Target,
    Pass,
}

impl Section {
    /// The section a `}` returns to.
    pub fn parent(self) -> Section {
        match self {
            Section::None | Section::Compositor => Section::None,
            Section::Technique => Section::Compositor,
            Section::Target => Section::Technique,
            Section::Pass => Section::Target,
        }
    }

    /// Blocks open while this section is current.
    pub fn depth(self) -> usize {
        match self {
            Section::None => 0,
            Section::Compositor => 1,
            Section::Technique => 2,
            Section::Target => 3,
            Section::Pass => 4,
        }
    }

    /// Where a statement was found, for error messages.
    pub fn location(self) -> &'static str {
        match self {
            Section::None => "at top level",
            Section::Compositor => "in a compositor block",
            Section::Technique => "in a technique block",
            Section::Target => "in a target block",
            Section::Pass => "in a pass block",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::None => "none",
            Section::Compositor => "compositor",
            Section::Technique => "technique",
            Section::Target => "target",
            Section::Pass => "pass",
        };
        f.write_str(name)
    }
}

/// State carried between actions of one document.
///
/// A handle is set exactly while its block is open. `skip_depth` counts the blocks
/// still to be closed after an opener was refused; while it is non-zero every
/// statement is ignored. `output_target` marks the open target as the technique's
/// `target_output`, which takes only an input mode and passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContext {
    pub group: String,
    pub section: Section,
    pub compositor: Option<(ObjectHandle, String)>,
    pub technique: Option<ObjectHandle>,
    pub target: Option<ObjectHandle>,
    pub pass: Option<ObjectHandle>,
    pub output_target: bool,
    pub skip_depth: usize,
}

impl ScriptContext {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            section: Section::None,
            compositor: None,
            technique: None,
            target: None,
            pass: None,
            output_target: false,
            skip_depth: 0,
        }
    }

    pub fn compositor_name(&self) -> Option<&str> {
        self.compositor.as_ref().map(|(_, name)| name.as_str())
    }

    /// Where the current statement sits, for error messages.
    pub fn location(&self) -> &'static str {
        if self.section == Section::Target && self.output_target {
            "in a target_output block"
        } else {
            self.section.location()
        }
    }

    /// Blocks opened and not yet closed, refused ones included.
    pub fn open_blocks(&self) -> usize {
        self.section.depth() + self.skip_depth
    }

    pub fn compositor_handle(&self, line: usize) -> Result<ObjectHandle, CompileError> {
        self.compositor
            .as_ref()
            .map(|(handle, _)| *handle)
            .ok_or_else(|| missing(line, Section::Compositor))
    }

    pub fn technique_handle(&self, line: usize) -> Result<ObjectHandle, CompileError> {
        self.technique.ok_or_else(|| missing(line, Section::Technique))
    }

    pub fn target_handle(&self, line: usize) -> Result<ObjectHandle, CompileError> {
        self.target.ok_or_else(|| missing(line, Section::Target))
    }

    pub fn pass_handle(&self, line: usize) -> Result<ObjectHandle, CompileError> {
        self.pass.ok_or_else(|| missing(line, Section::Pass))
    }

    /// Close the innermost block, dropping its handle.
    pub fn close_section(&mut self) {
        match self.section {
            Section::None => {}
            Section::Compositor => self.compositor = None,
            Section::Technique => self.technique = None,
            Section::Target => {
                self.target = None;
                self.output_target = false;
            }
            Section::Pass => self.pass = None,
        }
        self.section = self.section.parent();
    }
}

fn missing(line: usize, section: Section) -> CompileError {
    CompileError::invariant(line, format!("{} section without an open {}", section, section))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_pass() -> ScriptContext {
        let mut context = ScriptContext::new("General");
        context.compositor = Some((ObjectHandle(0), "Bloom".into()));
        context.technique = Some(ObjectHandle(1));
        context.target = Some(ObjectHandle(2));
        context.pass = Some(ObjectHandle(3));
        context.section = Section::Pass;
        context
    }

    #[test]
    fn closing_walks_back_to_top_level() {
        let mut context = open_pass();
        context.close_section();
        assert_eq!(context.section, Section::Target);
        assert_eq!(context.pass, None);
        assert_eq!(context.target, Some(ObjectHandle(2)));
        context.close_section();
        context.close_section();
        assert_eq!(context.compositor_name(), Some("Bloom"));
        context.close_section();
        assert_eq!(context, ScriptContext::new("General"));
    }

    #[test]
    fn output_target_has_its_own_location() {
        let mut context = open_pass();
        context.output_target = true;
        assert_eq!(context.location(), "in a pass block");
        context.close_section();
        assert_eq!(context.location(), "in a target_output block");
        context.close_section();
        assert!(!context.output_target);
        assert_eq!(context.location(), "in a technique block");
    }

    #[test]
    fn open_blocks_include_refused_ones() {
        let mut context = open_pass();
        assert_eq!(context.open_blocks(), 4);
        context.skip_depth = 2;
        assert_eq!(context.open_blocks(), 6);
        assert_eq!(ScriptContext::new("General").open_blocks(), 0);
    }

    #[test]
    fn missing_handle_is_an_invariant_error() {
        let context = ScriptContext::new("General");
        let err = context.pass_handle(4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "internal consistency error at line 4: pass section without an open pass"
        );
    }
}
