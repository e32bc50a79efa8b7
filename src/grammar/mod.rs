//! Grammars describe which document trees are acceptable input.
//!
//! The compiler never locates grammars on its own: it asks a [`GrammarResolver`]
//! for a logical identifier once, at construction time.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub use validate::validate;

mod validate;

/// Logical id of the grammar shipped with the crate.
pub const STANDARD_GRAMMAR_ID: &str = "script-1.0";

const STANDARD_GRAMMAR: &str = include_str!("../../grammars/script.toml");

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("no grammar registered for {id:?}")]
    UnknownId { id: String },
    #[error("failed to read grammar {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse grammar: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid grammar {id:?}: {message}")]
    Invalid { id: String, message: String },
    #[error("grammar file declares id {found:?} but was registered as {expected:?}")]
    IdMismatch { expected: String, found: String },
}

/// On-disk form of a grammar.
#[derive(Debug, Deserialize)]
struct GrammarFile {
    id: String,
    root: String,
    #[serde(default)]
    groups: BTreeMap<String, Vec<String>>,
    elements: BTreeMap<String, ElementFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ElementFile {
    attributes: Vec<String>,
    required: Vec<String>,
    children: Vec<String>,
    text: bool,
}

/// What a single element may look like.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ElementRule {
    pub attributes: BTreeSet<String>,
    pub required: BTreeSet<String>,
    /// Allowed child tags, with groups already expanded.
    pub children: BTreeSet<String>,
    pub text: bool,
}

/// A loaded, self-consistent grammar. Read-only once built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Grammar {
    pub id: String,
    pub root: String,
    pub elements: HashMap<String, ElementRule>,
}

impl Grammar {
    pub fn from_toml(input: &str) -> Result<Self, GrammarError> {
        let file: GrammarFile = toml::from_str(input)?;
        Self::build(file)
    }

    pub fn standard() -> Result<Self, GrammarError> {
        Self::from_toml(STANDARD_GRAMMAR)
    }

    pub fn rule(&self, tag: &str) -> Option<&ElementRule> {
        self.elements.get(tag)
    }

    fn build(file: GrammarFile) -> Result<Self, GrammarError> {
        let invalid = |message: String| GrammarError::Invalid {
            id: file.id.clone(),
            message,
        };

        if !file.elements.contains_key(&file.root) {
            return Err(invalid(format!(
                "root element {:?} is not declared",
                file.root
            )));
        }

        for (group, members) in &file.groups {
            if let Some(member) = members.iter().find(|m| !file.elements.contains_key(*m)) {
                return Err(invalid(format!(
                    "group {group:?} names undeclared element {member:?}"
                )));
            }
        }

        let mut elements = HashMap::with_capacity(file.elements.len());
        for (tag, element) in &file.elements {
            if let Some(missing) = element
                .required
                .iter()
                .find(|r| !element.attributes.contains(*r))
            {
                return Err(invalid(format!(
                    "element {tag:?} requires attribute {missing:?} it does not accept"
                )));
            }

            let mut children = BTreeSet::new();
            for child in &element.children {
                if let Some(group) = child.strip_prefix('@') {
                    let members = file.groups.get(group).ok_or_else(|| {
                        invalid(format!("element {tag:?} uses unknown group {group:?}"))
                    })?;
                    children.extend(members.iter().cloned());
                } else if file.elements.contains_key(child) {
                    children.insert(child.clone());
                } else {
                    return Err(invalid(format!(
                        "element {tag:?} allows undeclared child {child:?}"
                    )));
                }
            }

            elements.insert(
                tag.clone(),
                ElementRule {
                    attributes: element.attributes.iter().cloned().collect(),
                    required: element.required.iter().cloned().collect(),
                    children,
                    text: element.text,
                },
            );
        }

        debug!("loaded grammar {:?} ({} elements)", file.id, elements.len());

        Ok(Self {
            id: file.id,
            root: file.root,
            elements,
        })
    }
}

/// Supplies grammars by logical id.
pub trait GrammarResolver {
    fn resolve(&self, id: &str) -> Result<Grammar, GrammarError>;
}

/// Resolves only the grammar embedded in the crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinResolver;

impl GrammarResolver for BuiltinResolver {
    fn resolve(&self, id: &str) -> Result<Grammar, GrammarError> {
        if id == STANDARD_GRAMMAR_ID {
            Grammar::standard()
        } else {
            Err(GrammarError::UnknownId { id: id.to_string() })
        }
    }
}

/// Resolves ids through a table of grammar files, falling back to the builtin grammar.
#[derive(Clone, Debug, Default)]
pub struct FileResolver {
    paths: BTreeMap<String, PathBuf>,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, path: impl AsRef<Path>) {
        self.paths.insert(id.into(), path.as_ref().to_path_buf());
    }
}

impl FromIterator<(String, PathBuf)> for FileResolver {
    fn from_iter<T: IntoIterator<Item = (String, PathBuf)>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl GrammarResolver for FileResolver {
    fn resolve(&self, id: &str) -> Result<Grammar, GrammarError> {
        let Some(path) = self.paths.get(id) else {
            return BuiltinResolver.resolve(id);
        };

        debug!("loading grammar {:?} from {:?}", id, path);
        let input = std::fs::read_to_string(path).map_err(|source| GrammarError::Io {
            path: path.clone(),
            source,
        })?;
        let grammar = Grammar::from_toml(&input)?;

        if grammar.id != id {
            return Err(GrammarError::IdMismatch {
                expected: id.to_string(),
                found: grammar.id,
            });
        }

        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ConstructKind;

    #[test]
    fn standard_grammar_loads() {
        let grammar = Grammar::standard().unwrap();
        assert_eq!(grammar.id, STANDARD_GRAMMAR_ID);
        assert_eq!(grammar.root, "script");

        let code = grammar.rule("code").unwrap();
        for kind in ConstructKind::ALL {
            assert!(grammar.rule(kind.tag()).is_some(), "{kind} has no rule");
            assert!(code.children.contains(kind.tag()), "{kind} not a statement");
        }

        let call = grammar.rule("call").unwrap();
        assert_eq!(call.children.iter().collect::<Vec<_>>(), ["set"]);
    }

    #[test]
    fn builtin_resolver_rejects_unknown_ids() {
        assert!(BuiltinResolver.resolve(STANDARD_GRAMMAR_ID).is_ok());
        assert!(matches!(
            BuiltinResolver.resolve("other"),
            Err(GrammarError::UnknownId { .. })
        ));
    }

    #[test]
    fn unknown_group_is_invalid() {
        let error = Grammar::from_toml(
            r#"
id = "broken"
root = "script"
[elements.script]
children = ["@nothing"]
"#,
        )
        .unwrap_err();
        assert!(matches!(error, GrammarError::Invalid { .. }), "{error:#?}");
    }

    #[test]
    fn required_must_be_accepted() {
        let error = Grammar::from_toml(
            r#"
id = "broken"
root = "script"
[elements.script]
required = ["name"]
"#,
        )
        .unwrap_err();
        assert!(matches!(error, GrammarError::Invalid { .. }), "{error:#?}");
    }

    #[test]
    fn file_resolver_loads_registered_grammar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.toml");
        std::fs::write(
            &path,
            r#"
id = "tiny"
root = "script"
[elements.script]
children = ["code"]
[elements.code]
"#,
        )
        .unwrap();

        let mut resolver = FileResolver::new();
        resolver.register("tiny", &path);
        let grammar = resolver.resolve("tiny").unwrap();
        assert_eq!(grammar.elements.len(), 2);

        // Unregistered ids fall through to the builtin grammar.
        assert!(resolver.resolve(STANDARD_GRAMMAR_ID).is_ok());

        resolver.register("renamed", &path);
        assert!(matches!(
            resolver.resolve("renamed"),
            Err(GrammarError::IdMismatch { .. })
        ));
    }
}
