//! Script sources
//!
//! The compiler works on a whole document in memory. A [ScriptSource] pairs that text
//! with the display name used in diagnostics; an empty name marks an anonymous
//! document and changes how errors are worded.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    name: String,
    text: String,
}

impl ScriptSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// An anonymous document.
    pub fn from_string(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    /// Read a document from disk, named after its path.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_is_anonymous() {
        let source = ScriptSource::from_string("compositor X {}");
        assert!(source.is_anonymous());
        assert_eq!(source.text(), "compositor X {}");
    }

    #[test]
    fn from_path_reports_missing_files() {
        assert!(ScriptSource::from_path("does/not/exist.compositor").is_err());
    }
}
