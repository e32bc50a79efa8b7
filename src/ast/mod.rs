use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

pub use common::{Attributes, NodePath};

pub mod common;

/// A raw document element, as read from the input file.
///
/// Nothing about it has been checked yet; the grammar turns it into a [`Node`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub children: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }
}

/// A whole input document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Document {
    /// Where the document was read from, if anywhere.
    pub file_path: Option<PathBuf>,
    pub root: Element,
}

/// A validated element.
///
/// Its kind was decided once by the grammar and is never re-derived from the tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub tag: String,
    pub attributes: Attributes,
    pub children: Vec<Node>,
    pub text: Option<String>,
    pub path: NodePath,
}

impl Node {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attributes.has(key)
    }

    /// Finds the first child of the given structural kind.
    pub fn section(&self, kind: StructuralKind) -> Option<&Node> {
        self.children
            .iter()
            .find(|child| child.kind == NodeKind::Structural(kind))
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    /// A code construct the compiler knows how to lower.
    Construct(ConstructKind),
    /// A document section or header element.
    Structural(StructuralKind),
    /// An element the grammar accepts but the compiler has no lowering for.
    Foreign(String),
}

impl NodeKind {
    pub fn from_tag(tag: &str) -> Self {
        if let Ok(kind) = tag.parse::<ConstructKind>() {
            NodeKind::Construct(kind)
        } else if let Ok(kind) = tag.parse::<StructuralKind>() {
            NodeKind::Structural(kind)
        } else {
            NodeKind::Foreign(tag.to_string())
        }
    }
}

/// The closed set of code constructs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum ConstructKind {
    Block,
    Buffer,
    Call,
    Exec,
    For,
    Goto,
    If,
    Label,
    MemberCall,
    Math,
    Assert,
    Set,
    Input,
    Subroutine,
    While,
    Return,
}

impl ConstructKind {
    pub const ALL: [ConstructKind; 16] = [
        ConstructKind::Block,
        ConstructKind::Buffer,
        ConstructKind::Call,
        ConstructKind::Exec,
        ConstructKind::For,
        ConstructKind::Goto,
        ConstructKind::If,
        ConstructKind::Label,
        ConstructKind::MemberCall,
        ConstructKind::Math,
        ConstructKind::Assert,
        ConstructKind::Set,
        ConstructKind::Input,
        ConstructKind::Subroutine,
        ConstructKind::While,
        ConstructKind::Return,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ConstructKind::Block => "block",
            ConstructKind::Buffer => "buffer",
            ConstructKind::Call => "call",
            ConstructKind::Exec => "exec",
            ConstructKind::For => "for",
            ConstructKind::Goto => "goto",
            ConstructKind::If => "if",
            ConstructKind::Label => "label",
            ConstructKind::MemberCall => "member-call",
            ConstructKind::Math => "math",
            ConstructKind::Assert => "assert",
            ConstructKind::Set => "set",
            ConstructKind::Input => "input",
            ConstructKind::Subroutine => "subroutine",
            ConstructKind::While => "while",
            ConstructKind::Return => "return",
        }
    }
}

impl FromStr for ConstructKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstructKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or(())
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Elements that shape the document rather than the code.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StructuralKind {
    Script,
    Header,
    Code,
    Note,
    Output,
}

impl FromStr for StructuralKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "script" => StructuralKind::Script,
            "header" => StructuralKind::Header,
            "code" => StructuralKind::Code,
            "note" => StructuralKind::Note,
            "output" => StructuralKind::Output,
            _ => return Err(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_tags_round_trip() {
        for kind in ConstructKind::ALL {
            assert_eq!(kind.tag().parse::<ConstructKind>(), Ok(kind));
        }
    }

    #[test]
    fn node_kind_from_tag() {
        assert_eq!(
            NodeKind::from_tag("member-call"),
            NodeKind::Construct(ConstructKind::MemberCall)
        );
        assert_eq!(
            NodeKind::from_tag("header"),
            NodeKind::Structural(StructuralKind::Header)
        );
        assert_eq!(
            NodeKind::from_tag("switch"),
            NodeKind::Foreign("switch".to_string())
        );
    }

    #[test]
    fn element_deserializes_with_defaults() {
        let element: Element = serde_json::from_str(r#"{"tag": "return"}"#).unwrap();
        assert_eq!(element, Element::new("return"));
    }
}
