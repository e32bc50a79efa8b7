use core::fmt;
use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The attributes of an element, keyed by attribute name.
///
/// Values are kept as raw text; what a value means is decided by the
/// construct that reads it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether the attribute is present at all, regardless of its value.
    ///
    /// Flag attributes like `new` and `clear` are tested this way.
    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attrs = self.0.iter().map(|(k, v)| format!("{k}={v:?}")).join(" ");
        f.write_str(&attrs)
    }
}

/// Position of an element inside the document, as the chain of tags from the root.
///
/// Used to point diagnostics at the element that caused them, since the
/// document format carries no source spans.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root(tag: &str) -> Self {
        Self(vec![tag.to_string()])
    }

    pub fn child(&self, tag: &str, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(format!("{tag}[{index}]"));
        Self(path)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}
