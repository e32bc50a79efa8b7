use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::{Document, Element};

pub use error::DocumentError;

pub mod error;

/// The text of a document together with where it came from.
#[derive(Clone, Debug)]
pub struct DocumentSource {
    pub input: String,
    pub path: PathBuf,
}

impl DocumentSource {
    pub fn new(input: impl Into<String>, path: &Path) -> Self {
        Self {
            input: input.into(),
            path: path.to_path_buf(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, DocumentError> {
        let input = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(input, path))
    }
}

/// Parses the element tree of a document.
///
/// Only the shape is checked here; grammar validation happens in the compiler.
pub fn parse_document(source: &DocumentSource) -> Result<Document, DocumentError> {
    let root: Element = serde_json::from_str(&source.input)
        .map_err(|e| DocumentError::from_json(source.path.clone(), e))?;
    debug!(
        "parsed document {:?} with root element {:?}",
        source.path, root.tag
    );

    Ok(Document {
        file_path: Some(source.path.clone()),
        root,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn parse_simple_document() {
        let source = DocumentSource::new(
            r#"{
  "tag": "script",
  "children": [
    { "tag": "header", "attributes": { "name": "demo", "version-number": "1.0" } },
    { "tag": "code", "children": [
      { "tag": "set", "attributes": { "name": "x", "value": "1", "new": "" } }
    ] }
  ]
}"#,
            Path::new("demo.json"),
        );
        let document = parse_document(&source).unwrap();
        assert_eq!(document.root.tag, "script");
        assert_eq!(document.root.children.len(), 2);
        let set = &document.root.children[1].children[0];
        assert_eq!(set.attributes.get("value"), Some("1"));
        assert!(set.attributes.has("new"));
    }

    #[test]
    fn syntax_error_reports_position() {
        let source = DocumentSource::new("{\n  \"tag\": \"script\",,\n}", Path::new("bad.json"));
        let error = parse_document(&source).unwrap_err();
        assert!(
            matches!(error, DocumentError::Syntax { line: 2, .. }),
            "{error:#?}"
        );
        let report = error.render(&source, false);
        assert!(report.contains("Document syntax error."), "{report}");
    }

    #[test]
    fn missing_tag_is_a_shape_error() {
        let source = DocumentSource::new(r#"{ "children": [] }"#, Path::new("shape.json"));
        let error = parse_document(&source).unwrap_err();
        assert!(matches!(error, DocumentError::Shape { .. }), "{error:#?}");
    }
}
