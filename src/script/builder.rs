//! Builder collaborator
//!
//! The compiler never owns the objects it describes. It asks a [ScriptBuilder] to
//! create compositors and their children and to set attributes on them, addressing
//! everything through opaque [ObjectHandle]s. [CompositorRegistry] is the in-memory
//! implementation; an engine would implement the trait over its own resource types.
//!
//! [CompositorRegistry]: super::registry::CompositorRegistry

use super::error::BuilderError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to an object created by a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectHandle(pub usize);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChildKind {
    Technique,
    /// A named render target pass of a technique.
    TargetPass,
    /// The technique's implicit output target. Asking for it again returns the
    /// same object.
    OutputTarget,
    Pass,
}

impl ChildKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChildKind::Technique => "technique",
            ChildKind::TargetPass => "target",
            ChildKind::OutputTarget => "output target",
            ChildKind::Pass => "pass",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    A8R8G8B8,
    R8G8B8A8,
    R8G8B8,
    Float16R,
    Float16Rgb,
    Float16Rgba,
    Float32R,
    Float32Rgb,
    Float32Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputMode {
    #[default]
    None,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PassType {
    Clear,
    Stencil,
    RenderScene,
    #[default]
    RenderQuad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareFunction {
    AlwaysFail,
    #[default]
    AlwaysPass,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StencilOperation {
    #[default]
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    IncrementWrap,
    DecrementWrap,
    Invert,
}

bitflags! {
    /// Frame buffers cleared by a clear pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FrameBufferFlags: u32 {
        const COLOUR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

impl Default for FrameBufferFlags {
    fn default() -> Self {
        FrameBufferFlags::COLOUR | FrameBufferFlags::DEPTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colour {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Size 0 means "same as the render target".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDefinition {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// A value set on a technique, target or pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    // technique
    Texture(TextureDefinition),
    // target
    OutputName(String),
    InputMode(InputMode),
    OnlyInitial(bool),
    VisibilityMask(u32),
    LodBias(f32),
    MaterialScheme(String),
    // pass
    PassType(PassType),
    Material(String),
    Input { id: u32, texture: String },
    Identifier(u32),
    FirstRenderQueue(u8),
    LastRenderQueue(u8),
    ClearBuffers(FrameBufferFlags),
    ClearColour(Colour),
    ClearDepth(f32),
    ClearStencil(u32),
    StencilCheck(bool),
    StencilFunc(CompareFunction),
    StencilRefValue(u32),
    StencilMask(u32),
    StencilFailOp(StencilOperation),
    StencilDepthFailOp(StencilOperation),
    StencilPassOp(StencilOperation),
    StencilTwoSided(bool),
}

impl Attribute {
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Texture(_) => "texture",
            Attribute::OutputName(_) => "output_name",
            Attribute::InputMode(_) => "input",
            Attribute::OnlyInitial(_) => "only_initial",
            Attribute::VisibilityMask(_) => "visibility_mask",
            Attribute::LodBias(_) => "lod_bias",
            Attribute::MaterialScheme(_) => "material_scheme",
            Attribute::PassType(_) => "pass_type",
            Attribute::Material(_) => "material",
            Attribute::Input { .. } => "input",
            Attribute::Identifier(_) => "identifier",
            Attribute::FirstRenderQueue(_) => "first_render_queue",
            Attribute::LastRenderQueue(_) => "last_render_queue",
            Attribute::ClearBuffers(_) => "buffers",
            Attribute::ClearColour(_) => "colour_value",
            Attribute::ClearDepth(_) => "depth_value",
            Attribute::ClearStencil(_) => "stencil_value",
            Attribute::StencilCheck(_) => "check",
            Attribute::StencilFunc(_) => "comp_func",
            Attribute::StencilRefValue(_) => "ref_value",
            Attribute::StencilMask(_) => "mask",
            Attribute::StencilFailOp(_) => "fail_op",
            Attribute::StencilDepthFailOp(_) => "depth_fail_op",
            Attribute::StencilPassOp(_) => "pass_op",
            Attribute::StencilTwoSided(_) => "two_sided",
        }
    }
}

/// Object factory driven by the compiler.
pub trait ScriptBuilder {
    fn create_compositor(&mut self, name: &str, group: &str)
        -> Result<ObjectHandle, BuilderError>;

    fn create_child(
        &mut self,
        parent: ObjectHandle,
        kind: ChildKind,
    ) -> Result<ObjectHandle, BuilderError>;

    fn set_attribute(
        &mut self,
        handle: ObjectHandle,
        attribute: Attribute,
    ) -> Result<(), BuilderError>;
}

impl<B: ScriptBuilder + ?Sized> ScriptBuilder for &mut B {
    fn create_compositor(
        &mut self,
        name: &str,
        group: &str,
    ) -> Result<ObjectHandle, BuilderError> {
        (**self).create_compositor(name, group)
    }

    fn create_child(
        &mut self,
        parent: ObjectHandle,
        kind: ChildKind,
    ) -> Result<ObjectHandle, BuilderError> {
        (**self).create_child(parent, kind)
    }

    fn set_attribute(
        &mut self,
        handle: ObjectHandle,
        attribute: Attribute,
    ) -> Result<(), BuilderError> {
        (**self).set_attribute(handle, attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clear_buffers_are_colour_and_depth() {
        assert_eq!(FrameBufferFlags::default().bits(), 3);
    }

    #[test]
    fn flags_combine_in_any_order() {
        let a = FrameBufferFlags::STENCIL | FrameBufferFlags::COLOUR | FrameBufferFlags::DEPTH;
        let b = FrameBufferFlags::DEPTH | FrameBufferFlags::STENCIL | FrameBufferFlags::COLOUR;
        assert_eq!(a, b);
        assert_eq!(a, FrameBufferFlags::all());
    }

    #[test]
    fn enum_defaults() {
        assert_eq!(PassType::default(), PassType::RenderQuad);
        assert_eq!(CompareFunction::default(), CompareFunction::AlwaysPass);
        assert_eq!(StencilOperation::default(), StencilOperation::Keep);
        assert_eq!(InputMode::default(), InputMode::None);
    }
}
