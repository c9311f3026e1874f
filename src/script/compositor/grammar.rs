//! Compositor grammar and keyword table
//!
//! The grammar is flat at the statement level: a block opener such as
//! `pass render_quad {` is one statement and its closing `}` is another. Nesting is
//! tracked by the parse context, not by the grammar. The `clear { }` and
//! `stencil { }` option blocks inside a pass are the exception: each is matched as a
//! single statement with silent braces.
//!
//! Alternatives are tried in order and a terminal matches as a prefix, so longer
//! keywords come first (`less_equal` before `less`, `target_output` before `target`).
//! A lookahead skips whitespace like any other element, so `(?!<Word_Continues>)`
//! only guards keywords followed by another keyword; one followed by a label would
//! refuse labels that start with `_`.

use crate::script::engine::Language;
use crate::script::error::GrammarError;
use crate::script::lexeme::LexemeRegistry;
use crate::script::token::TokenId;
use once_cell::sync::OnceCell;
use serde::Serialize;

pub const START_RULE: &str = "Script";

pub const COMPOSITOR_BNF: &str = r#"
<Script> ::= {<Statement>}
<Statement> ::= <Compositor> | <Technique> | <Texture> | <TargetOutput> | <Target>
    | <Pass> | <TargetOption> | <PassOption> | <ClearSection> | <StencilSection>
    | <CloseBrace>
<CloseBrace> ::= '}'

<Compositor> ::= 'compositor' <Flex_Label> -'{'
<Technique> ::= 'technique' -'{'
<Texture> ::= 'texture' <Label> <WidthOption> <HeightOption> <PixelFormat>
<WidthOption> ::= 'target_width' | <#width>
<HeightOption> ::= 'target_height' | <#height>
<PixelFormat> ::= 'PF_A8R8G8B8' | 'PF_R8G8B8A8' | 'PF_R8G8B8'
    | 'PF_FLOAT16_RGBA' | 'PF_FLOAT16_RGB' | 'PF_FLOAT16_R'
    | 'PF_FLOAT32_RGBA' | 'PF_FLOAT32_RGB' | 'PF_FLOAT32_R'

<TargetOutput> ::= 'target_output' -'{'
<Target> ::= 'target' <Label> -'{'
<TargetOption> ::= <TargetInput> | <OnlyInitial> | <VisibilityMask> | <LodBias>
    | <MaterialScheme>
<TargetInput> ::= 'input' <InputMode>
<InputMode> ::= 'none' | 'previous'
<OnlyInitial> ::= 'only_initial' <On_Off>
<VisibilityMask> ::= 'visibility_mask' <#mask>
<LodBias> ::= 'lod_bias' <#lodbias>
<MaterialScheme> ::= 'material_scheme' <Label>

<Pass> ::= 'pass' (?!<Word_Continues>) <PassType> -'{'
<PassType> ::= 'render_quad' | 'clear' | 'stencil' | 'render_scene'
<PassOption> ::= <PassFirstRenderQueue> | <PassLastRenderQueue> | <PassIdentifier>
    | <PassMaterial> | <PassInput>
<PassMaterial> ::= 'material' <Label>
<PassInput> ::= 'input' <#id> <Label>
<PassFirstRenderQueue> ::= 'first_render_queue' <#queue>
<PassLastRenderQueue> ::= 'last_render_queue' <#queue>
<PassIdentifier> ::= 'identifier' <#id>

<ClearSection> ::= -'clear' -'{' {<ClearOption>} -'}'
<ClearOption> ::= <Buffers> | <ColourValue> | <DepthValue> | <StencilValue>
<Buffers> ::= 'buffers' {<BufferType>}
<BufferType> ::= <Colour> | <Depth> | <Stencil>
<Colour> ::= 'colour' (?!<Word_Continues>)
<Depth> ::= 'depth' (?!<Word_Continues>)
<Stencil> ::= 'stencil' (?!<Word_Continues>)
<ColourValue> ::= 'colour_value' <#red> <#green> <#blue> <#alpha>
<DepthValue> ::= 'depth_value' <#depth>
<StencilValue> ::= 'stencil_value' <#val>

<StencilSection> ::= -'stencil' -'{' {<StencilOption>} -'}'
<StencilOption> ::= <Check> | <CompareFunction> | <RefVal> | <Mask> | <FailOp>
    | <DepthFailOp> | <PassOp> | <TwoSided>
<Check> ::= 'check' <On_Off>
<CompareFunction> ::= 'comp_func' <CompFunc>
<CompFunc> ::= 'always_fail' | 'always_pass' | 'less_equal' | 'less' | 'equal'
    | 'not_equal' | 'greater_equal' | 'greater'
<RefVal> ::= 'ref_value' <#val>
<Mask> ::= 'mask' <#mask>
<FailOp> ::= 'fail_op' <StencilOperation>
<DepthFailOp> ::= 'depth_fail_op' <StencilOperation>
<PassOp> ::= 'pass_op' <StencilOperation>
<TwoSided> ::= 'two_sided' <On_Off>
<StencilOperation> ::= 'keep' | 'zero' | 'replace' | 'increment_wrap' | 'increment'
    | 'decrement_wrap' | 'decrement' | 'invert'

<On_Off> ::= 'on' | 'off'
<Word_Continues> ::= -'_'
<Label> ::= <@label>
<Flex_Label> ::= <Quoted_Label> | <Spaced_Label>
<Quoted_Label> ::= -'"' <Spaced_Label> -'"'
<Spaced_Label> ::= (!,\n\r\t{}")
"#;

/// Token ids of the compositor lexemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum Keyword {
    CloseBrace = 1,
    Compositor,
    Technique,
    Texture,
    TargetWidth,
    TargetHeight,
    PfA8R8G8B8,
    PfR8G8B8A8,
    PfR8G8B8,
    PfFloat16R,
    PfFloat16Rgb,
    PfFloat16Rgba,
    PfFloat32R,
    PfFloat32Rgb,
    PfFloat32Rgba,
    Target,
    Input,
    None,
    Previous,
    TargetOutput,
    OnlyInitial,
    VisibilityMask,
    LodBias,
    MaterialScheme,
    Pass,
    RenderQuad,
    Clear,
    Stencil,
    RenderScene,
    Material,
    FirstRenderQueue,
    LastRenderQueue,
    Identifier,
    Buffers,
    Colour,
    Depth,
    ColourValue,
    DepthValue,
    StencilValue,
    Check,
    CompFunc,
    RefValue,
    Mask,
    FailOp,
    DepthFailOp,
    PassOp,
    TwoSided,
    AlwaysFail,
    AlwaysPass,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    IncrementWrap,
    DecrementWrap,
    Invert,
    On,
    Off,
}

/// Handlers triggered by action-bearing keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    CloseBrace,
    Compositor,
    Technique,
    Texture,
    Target,
    Input,
    TargetOutput,
    OnlyInitial,
    VisibilityMask,
    LodBias,
    MaterialScheme,
    Pass,
    Material,
    FirstRenderQueue,
    LastRenderQueue,
    Identifier,
    Buffers,
    ColourValue,
    DepthValue,
    StencilValue,
    Check,
    CompFunc,
    RefValue,
    Mask,
    FailOp,
    DepthFailOp,
    PassOp,
    TwoSided,
}

impl Action {
    /// Actions whose statement ends in an opening brace.
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            Action::Compositor
                | Action::Technique
                | Action::Target
                | Action::TargetOutput
                | Action::Pass
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeywordDef {
    pub text: &'static str,
    pub keyword: Keyword,
    pub action: Option<Action>,
}

const fn kw(text: &'static str, keyword: Keyword, action: Option<Action>) -> KeywordDef {
    KeywordDef {
        text,
        keyword,
        action,
    }
}

pub const KEYWORDS: &[KeywordDef] = &[
    kw("}", Keyword::CloseBrace, Some(Action::CloseBrace)),
    kw("compositor", Keyword::Compositor, Some(Action::Compositor)),
    // technique
    kw("technique", Keyword::Technique, Some(Action::Technique)),
    kw("texture", Keyword::Texture, Some(Action::Texture)),
    kw("target_width", Keyword::TargetWidth, None),
    kw("target_height", Keyword::TargetHeight, None),
    kw("PF_A8R8G8B8", Keyword::PfA8R8G8B8, None),
    kw("PF_R8G8B8A8", Keyword::PfR8G8B8A8, None),
    kw("PF_R8G8B8", Keyword::PfR8G8B8, None),
    kw("PF_FLOAT16_R", Keyword::PfFloat16R, None),
    kw("PF_FLOAT16_RGB", Keyword::PfFloat16Rgb, None),
    kw("PF_FLOAT16_RGBA", Keyword::PfFloat16Rgba, None),
    kw("PF_FLOAT32_R", Keyword::PfFloat32R, None),
    kw("PF_FLOAT32_RGB", Keyword::PfFloat32Rgb, None),
    kw("PF_FLOAT32_RGBA", Keyword::PfFloat32Rgba, None),
    // target
    kw("target", Keyword::Target, Some(Action::Target)),
    kw("input", Keyword::Input, Some(Action::Input)),
    kw("none", Keyword::None, None),
    kw("previous", Keyword::Previous, None),
    kw("target_output", Keyword::TargetOutput, Some(Action::TargetOutput)),
    kw("only_initial", Keyword::OnlyInitial, Some(Action::OnlyInitial)),
    kw("visibility_mask", Keyword::VisibilityMask, Some(Action::VisibilityMask)),
    kw("lod_bias", Keyword::LodBias, Some(Action::LodBias)),
    kw("material_scheme", Keyword::MaterialScheme, Some(Action::MaterialScheme)),
    // pass
    kw("pass", Keyword::Pass, Some(Action::Pass)),
    kw("render_quad", Keyword::RenderQuad, None),
    kw("clear", Keyword::Clear, None),
    kw("stencil", Keyword::Stencil, None),
    kw("render_scene", Keyword::RenderScene, None),
    kw("material", Keyword::Material, Some(Action::Material)),
    kw("first_render_queue", Keyword::FirstRenderQueue, Some(Action::FirstRenderQueue)),
    kw("last_render_queue", Keyword::LastRenderQueue, Some(Action::LastRenderQueue)),
    kw("identifier", Keyword::Identifier, Some(Action::Identifier)),
    // clear
    kw("buffers", Keyword::Buffers, Some(Action::Buffers)),
    kw("colour", Keyword::Colour, None),
    kw("depth", Keyword::Depth, None),
    kw("colour_value", Keyword::ColourValue, Some(Action::ColourValue)),
    kw("depth_value", Keyword::DepthValue, Some(Action::DepthValue)),
    kw("stencil_value", Keyword::StencilValue, Some(Action::StencilValue)),
    // stencil
    kw("check", Keyword::Check, Some(Action::Check)),
    kw("comp_func", Keyword::CompFunc, Some(Action::CompFunc)),
    kw("ref_value", Keyword::RefValue, Some(Action::RefValue)),
    kw("mask", Keyword::Mask, Some(Action::Mask)),
    kw("fail_op", Keyword::FailOp, Some(Action::FailOp)),
    kw("depth_fail_op", Keyword::DepthFailOp, Some(Action::DepthFailOp)),
    kw("pass_op", Keyword::PassOp, Some(Action::PassOp)),
    kw("two_sided", Keyword::TwoSided, Some(Action::TwoSided)),
    kw("always_fail", Keyword::AlwaysFail, None),
    kw("always_pass", Keyword::AlwaysPass, None),
    kw("less", Keyword::Less, None),
    kw("less_equal", Keyword::LessEqual, None),
    kw("equal", Keyword::Equal, None),
    kw("not_equal", Keyword::NotEqual, None),
    kw("greater_equal", Keyword::GreaterEqual, None),
    kw("greater", Keyword::Greater, None),
    kw("keep", Keyword::Keep, None),
    kw("zero", Keyword::Zero, None),
    kw("replace", Keyword::Replace, None),
    kw("increment", Keyword::Increment, None),
    kw("decrement", Keyword::Decrement, None),
    kw("increment_wrap", Keyword::IncrementWrap, None),
    kw("decrement_wrap", Keyword::DecrementWrap, None),
    kw("invert", Keyword::Invert, None),
    // common
    kw("on", Keyword::On, None),
    kw("off", Keyword::Off, None),
];

impl Keyword {
    pub fn id(self) -> TokenId {
        self as TokenId
    }

    pub fn from_id(id: TokenId) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|def| def.keyword.id() == id)
            .map(|def| def.keyword)
    }

    pub fn text(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|def| def.keyword == self)
            .map_or("", |def| def.text)
    }
}

pub fn lexemes(case_sensitive: bool) -> Result<LexemeRegistry<Action>, GrammarError> {
    let mut registry = LexemeRegistry::with_case_sensitivity(case_sensitive);
    for def in KEYWORDS {
        registry.register(def.text, def.keyword.id(), def.action)?;
    }
    Ok(registry)
}

static CASE_INSENSITIVE: OnceCell<Language<Action>> = OnceCell::new();
static CASE_SENSITIVE: OnceCell<Language<Action>> = OnceCell::new();

/// The compositor language, built on first use and shared afterwards.
pub fn language(case_sensitive: bool) -> Result<&'static Language<Action>, GrammarError> {
    let cell = if case_sensitive {
        &CASE_SENSITIVE
    } else {
        &CASE_INSENSITIVE
    };
    cell.get_or_try_init(|| {
        Language::new(
            "compositor",
            COMPOSITOR_BNF,
            START_RULE,
            lexemes(case_sensitive)?,
        )
    })
}
