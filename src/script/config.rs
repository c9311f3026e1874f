//! Compiler configuration
//!
//! `defaults/compositor.default.toml` is embedded into the crate. Callers layer their
//! own files or single-key overrides on top with [Loader] before deserializing into
//! [CompilerConfig].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../../defaults/compositor.default.toml");

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompilerConfig {
    pub compiler: CompilerSettings,
    pub defaults: ObjectDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompilerSettings {
    pub resource_group: String,
    pub case_sensitive: bool,
}

/// Starting values for targets and passes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectDefaults {
    pub material_scheme: String,
    pub first_render_queue: u8,
    pub last_render_queue: u8,
    pub lod_bias: f32,
    pub visibility_mask: u32,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            resource_group: "General".to_string(),
            case_sensitive: false,
        }
    }
}

impl Default for ObjectDefaults {
    fn default() -> Self {
        Self {
            material_scheme: "Default".to_string(),
            first_render_queue: 5,
            last_render_queue: 95,
            lod_bias: 1.0,
            visibility_mask: u32::MAX,
        }
    }
}

/// Layers user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file that must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<CompilerConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<CompilerConfig, ConfigError> {
    Loader::new().build()
}
