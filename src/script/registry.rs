//! In-memory compositor registry
//!
//! Owns the compositor tree outright and hands out small integer handles that map to
//! a path into the tree (compositor, technique, target, pass indices). The parse
//! context only ever holds handles, so an object dropped on an error path cannot
//! leave a dangling reference behind.

use super::builder::{
    Attribute, ChildKind, Colour, CompareFunction, FrameBufferFlags, InputMode, ObjectHandle,
    PassType, ScriptBuilder, StencilOperation, TextureDefinition,
};
use super::config::ObjectDefaults;
use super::error::BuilderError;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositorDef {
    pub name: String,
    pub group: String,
    pub techniques: Vec<TechniqueDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechniqueDef {
    pub textures: Vec<TextureDefinition>,
    pub targets: Vec<TargetPassDef>,
    pub output: TargetPassDef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetPassDef {
    /// Render texture this target writes to; `None` for the output target.
    pub output_name: Option<String>,
    pub input_mode: InputMode,
    pub only_initial: bool,
    pub visibility_mask: u32,
    pub lod_bias: f32,
    pub material_scheme: String,
    pub passes: Vec<PassDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassDef {
    pub pass_type: PassType,
    pub identifier: u32,
    pub material: Option<String>,
    /// Texture bound to each input slot.
    pub inputs: BTreeMap<u32, String>,
    pub first_render_queue: u8,
    pub last_render_queue: u8,
    pub clear_buffers: FrameBufferFlags,
    pub clear_colour: Colour,
    pub clear_depth: f32,
    pub clear_stencil: u32,
    pub stencil_check: bool,
    pub stencil_func: CompareFunction,
    pub stencil_ref_value: u32,
    pub stencil_mask: u32,
    pub stencil_fail_op: StencilOperation,
    pub stencil_depth_fail_op: StencilOperation,
    pub stencil_pass_op: StencilOperation,
    pub stencil_two_sided: bool,
}

impl TargetPassDef {
    fn new(defaults: &ObjectDefaults) -> Self {
        Self {
            output_name: None,
            input_mode: InputMode::None,
            only_initial: false,
            visibility_mask: defaults.visibility_mask,
            lod_bias: defaults.lod_bias,
            material_scheme: defaults.material_scheme.clone(),
            passes: Vec::new(),
        }
    }
}

impl PassDef {
    fn new(defaults: &ObjectDefaults) -> Self {
        Self {
            pass_type: PassType::RenderQuad,
            identifier: 0,
            material: None,
            inputs: BTreeMap::new(),
            first_render_queue: defaults.first_render_queue,
            last_render_queue: defaults.last_render_queue,
            clear_buffers: FrameBufferFlags::default(),
            clear_colour: Colour::default(),
            clear_depth: 1.0,
            clear_stencil: 0,
            stencil_check: false,
            stencil_func: CompareFunction::AlwaysPass,
            stencil_ref_value: 0,
            stencil_mask: u32::MAX,
            stencil_fail_op: StencilOperation::Keep,
            stencil_depth_fail_op: StencilOperation::Keep,
            stencil_pass_op: StencilOperation::Keep,
            stencil_two_sided: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetSlot {
    Output,
    Named(usize),
}

/// Path from a handle into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Compositor(usize),
    Technique(usize, usize),
    Target(usize, usize, TargetSlot),
    Pass(usize, usize, TargetSlot, usize),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Compositor(..) => "compositor",
            Node::Technique(..) => "technique",
            Node::Target(..) => "target",
            Node::Pass(..) => "pass",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompositorRegistry {
    compositors: Vec<CompositorDef>,
    #[serde(skip)]
    nodes: Vec<Node>,
    #[serde(skip)]
    defaults: ObjectDefaults,
}

impl CompositorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose new objects start from the given defaults.
    pub fn with_defaults(defaults: ObjectDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    pub fn compositors(&self) -> &[CompositorDef] {
        &self.compositors
    }

    pub fn get(&self, name: &str) -> Option<&CompositorDef> {
        self.compositors.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.compositors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compositors.is_empty()
    }

    fn node(&self, handle: ObjectHandle) -> Result<Node, BuilderError> {
        self.nodes
            .get(handle.0)
            .copied()
            .ok_or(BuilderError::UnknownHandle(handle.0))
    }

    fn push_node(&mut self, node: Node) -> ObjectHandle {
        self.nodes.push(node);
        ObjectHandle(self.nodes.len() - 1)
    }

    fn technique_mut(&mut self, c: usize, t: usize) -> &mut TechniqueDef {
        &mut self.compositors[c].techniques[t]
    }

    fn target_mut(&mut self, c: usize, t: usize, slot: TargetSlot) -> &mut TargetPassDef {
        let technique = self.technique_mut(c, t);
        match slot {
            TargetSlot::Output => &mut technique.output,
            TargetSlot::Named(i) => &mut technique.targets[i],
        }
    }

    fn set_technique_attribute(
        &mut self,
        c: usize,
        t: usize,
        attribute: Attribute,
    ) -> Result<(), BuilderError> {
        let technique = self.technique_mut(c, t);
        match attribute {
            Attribute::Texture(definition) => {
                if technique.textures.iter().any(|d| d.name == definition.name) {
                    return Err(BuilderError::DuplicateName {
                        kind: "texture",
                        name: definition.name,
                    });
                }
                technique.textures.push(definition);
                Ok(())
            }
            other => Err(BuilderError::InvalidAttribute {
                attribute: other.name(),
                object: "technique",
            }),
        }
    }
}

fn set_target_attribute(
    target: &mut TargetPassDef,
    attribute: Attribute,
) -> Result<(), BuilderError> {
    match attribute {
        Attribute::OutputName(name) => target.output_name = Some(name),
        Attribute::InputMode(mode) => target.input_mode = mode,
        Attribute::OnlyInitial(on) => target.only_initial = on,
        Attribute::VisibilityMask(mask) => target.visibility_mask = mask,
        Attribute::LodBias(bias) => target.lod_bias = bias,
        Attribute::MaterialScheme(scheme) => target.material_scheme = scheme,
        other => {
            return Err(BuilderError::InvalidAttribute {
                attribute: other.name(),
                object: "target",
            })
        }
    }
    Ok(())
}

fn set_pass_attribute(pass: &mut PassDef, attribute: Attribute) -> Result<(), BuilderError> {
    match attribute {
        Attribute::PassType(kind) => pass.pass_type = kind,
        Attribute::Material(name) => pass.material = Some(name),
        Attribute::Input { id, texture } => {
            pass.inputs.insert(id, texture);
        }
        Attribute::Identifier(id) => pass.identifier = id,
        Attribute::FirstRenderQueue(queue) => pass.first_render_queue = queue,
        Attribute::LastRenderQueue(queue) => pass.last_render_queue = queue,
        Attribute::ClearBuffers(flags) => pass.clear_buffers = flags,
        Attribute::ClearColour(colour) => pass.clear_colour = colour,
        Attribute::ClearDepth(depth) => pass.clear_depth = depth,
        Attribute::ClearStencil(value) => pass.clear_stencil = value,
        Attribute::StencilCheck(on) => pass.stencil_check = on,
        Attribute::StencilFunc(func) => pass.stencil_func = func,
        Attribute::StencilRefValue(value) => pass.stencil_ref_value = value,
        Attribute::StencilMask(mask) => pass.stencil_mask = mask,
        Attribute::StencilFailOp(op) => pass.stencil_fail_op = op,
        Attribute::StencilDepthFailOp(op) => pass.stencil_depth_fail_op = op,
        Attribute::StencilPassOp(op) => pass.stencil_pass_op = op,
        Attribute::StencilTwoSided(on) => pass.stencil_two_sided = on,
        other => {
            return Err(BuilderError::InvalidAttribute {
                attribute: other.name(),
                object: "pass",
            })
        }
    }
    Ok(())
}

impl ScriptBuilder for CompositorRegistry {
    fn create_compositor(
        &mut self,
        name: &str,
        group: &str,
    ) -> Result<ObjectHandle, BuilderError> {
        if self.get(name).is_some() {
            return Err(BuilderError::DuplicateName {
                kind: "compositor",
                name: name.to_string(),
            });
        }
        self.compositors.push(CompositorDef {
            name: name.to_string(),
            group: group.to_string(),
            techniques: Vec::new(),
        });
        let index = self.compositors.len() - 1;
        Ok(self.push_node(Node::Compositor(index)))
    }

    fn create_child(
        &mut self,
        parent: ObjectHandle,
        kind: ChildKind,
    ) -> Result<ObjectHandle, BuilderError> {
        let node = match (self.node(parent)?, kind) {
            (Node::Compositor(c), ChildKind::Technique) => {
                let output = TargetPassDef::new(&self.defaults);
                let techniques = &mut self.compositors[c].techniques;
                techniques.push(TechniqueDef {
                    textures: Vec::new(),
                    targets: Vec::new(),
                    output,
                });
                Node::Technique(c, techniques.len() - 1)
            }
            (Node::Technique(c, t), ChildKind::TargetPass) => {
                let target = TargetPassDef::new(&self.defaults);
                let targets = &mut self.technique_mut(c, t).targets;
                targets.push(target);
                Node::Target(c, t, TargetSlot::Named(targets.len() - 1))
            }
            (Node::Technique(c, t), ChildKind::OutputTarget) => {
                Node::Target(c, t, TargetSlot::Output)
            }
            (Node::Target(c, t, slot), ChildKind::Pass) => {
                let pass = PassDef::new(&self.defaults);
                let passes = &mut self.target_mut(c, t, slot).passes;
                passes.push(pass);
                Node::Pass(c, t, slot, passes.len() - 1)
            }
            (parent, kind) => {
                return Err(BuilderError::InvalidChild {
                    parent: parent.kind(),
                    child: kind.name(),
                })
            }
        };
        Ok(self.push_node(node))
    }

    fn set_attribute(
        &mut self,
        handle: ObjectHandle,
        attribute: Attribute,
    ) -> Result<(), BuilderError> {
        match self.node(handle)? {
            Node::Compositor(_) => Err(BuilderError::InvalidAttribute {
                attribute: attribute.name(),
                object: "compositor",
            }),
            Node::Technique(c, t) => self.set_technique_attribute(c, t, attribute),
            Node::Target(c, t, slot) => set_target_attribute(self.target_mut(c, t, slot), attribute),
            Node::Pass(c, t, slot, p) => {
                set_pass_attribute(&mut self.target_mut(c, t, slot).passes[p], attribute)
            }
        }
    }
}
