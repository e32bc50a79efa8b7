use tracing::{debug, instrument};

use crate::{
    ast::{Document, Element, Node, NodeKind, NodePath},
    diagnostics::Diagnostics,
};

use super::Grammar;

/// Checks a document against the grammar and builds the validated tree.
///
/// Every violation is reported, not only the first. Returns `None` if any
/// were found; a partially valid tree is never handed out.
#[instrument(level = "debug", skip_all, fields(grammar = %grammar.id))]
pub fn validate(
    grammar: &Grammar,
    document: &Document,
    diagnostics: &mut Diagnostics,
) -> Option<Node> {
    let errors_before = diagnostics.error_count();

    if document.root.tag != grammar.root {
        diagnostics.report_error(format!(
            "root element must be {:?}, found {:?}",
            grammar.root, document.root.tag
        ));
    }

    let root = validate_element(
        grammar,
        &document.root,
        NodePath::root(&document.root.tag),
        diagnostics,
    );

    let found = diagnostics.error_count() - errors_before;
    if found > 0 {
        debug!("document failed validation with {} error(s)", found);
        None
    } else {
        Some(root)
    }
}

fn validate_element(
    grammar: &Grammar,
    element: &Element,
    path: NodePath,
    diagnostics: &mut Diagnostics,
) -> Node {
    match grammar.rule(&element.tag) {
        Some(rule) => {
            for key in element.attributes.keys() {
                if !rule.attributes.contains(key) {
                    diagnostics.report_error(format!(
                        "{path}: attribute {key:?} is not allowed on <{}>",
                        element.tag
                    ));
                }
            }
            for required in &rule.required {
                if !element.attributes.has(required) {
                    diagnostics.report_error(format!(
                        "{path}: <{}> is missing required attribute {required:?}",
                        element.tag
                    ));
                }
            }
            if !rule.text && element.text.as_deref().is_some_and(|t| !t.trim().is_empty()) {
                diagnostics.report_error(format!(
                    "{path}: <{}> does not accept text content",
                    element.tag
                ));
            }
            for child in &element.children {
                if grammar.rule(&child.tag).is_some() && !rule.children.contains(&child.tag) {
                    diagnostics.report_error(format!(
                        "{path}: <{}> is not allowed inside <{}>",
                        child.tag, element.tag
                    ));
                }
            }
        }
        None => {
            diagnostics.report_error(format!("{path}: unknown element <{}>", element.tag));
        }
    }

    let children = element
        .children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            validate_element(grammar, child, path.child(&child.tag, index), diagnostics)
        })
        .collect();

    Node {
        kind: NodeKind::from_tag(&element.tag),
        tag: element.tag.clone(),
        attributes: element.attributes.clone(),
        children,
        text: element.text.clone(),
        path,
    }
}
