use tracing::{debug, instrument};

use crate::ast::{ConstructKind, Node, NodeKind};

use super::{
    Lowering, LoweringContext,
    calls::{lower_call, lower_member_call},
    errors::LoweringError,
    statements::{
        lower_assert, lower_block, lower_for, lower_goto, lower_if, lower_label, lower_return,
        lower_while,
    },
    values::{lower_buffer, lower_input, lower_math, lower_set},
};

/// The standard lowering for script documents.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptLowering;

impl Lowering for ScriptLowering {
    #[instrument(level = "debug", skip_all, fields(constructs = code.children.len()))]
    fn lower_code(&self, ctx: &mut LoweringContext<'_>, code: &Node) -> Result<(), LoweringError> {
        debug!("begin lowering code section");
        lower_children(ctx, code)
    }
}

/// Lowers one node by dispatching on its construct kind.
pub fn lower_node(ctx: &mut LoweringContext<'_>, node: &Node) -> Result<(), LoweringError> {
    let kind = match &node.kind {
        NodeKind::Construct(kind) => *kind,
        NodeKind::Structural(_) | NodeKind::Foreign(_) => {
            return Err(LoweringError::UnsupportedConstruct {
                tag: node.tag.clone(),
                path: node.path.clone(),
            });
        }
    };

    match kind {
        ConstructKind::Block => lower_block(ctx, node),
        ConstructKind::Buffer => {
            lower_buffer(ctx, node);
            Ok(())
        }
        ConstructKind::Call | ConstructKind::Exec | ConstructKind::Subroutine => {
            lower_call(ctx, node, kind)
        }
        ConstructKind::For => lower_for(ctx, node),
        ConstructKind::Goto => {
            lower_goto(ctx, node);
            Ok(())
        }
        ConstructKind::If => lower_if(ctx, node),
        ConstructKind::Label => {
            lower_label(ctx, node);
            Ok(())
        }
        ConstructKind::MemberCall => lower_member_call(ctx, node),
        ConstructKind::Math => {
            lower_math(ctx, node);
            Ok(())
        }
        ConstructKind::Assert => lower_assert(ctx, node),
        ConstructKind::Set => {
            lower_set(ctx, node);
            Ok(())
        }
        ConstructKind::Input => {
            lower_input(ctx, node);
            Ok(())
        }
        ConstructKind::While => lower_while(ctx, node),
        ConstructKind::Return => {
            lower_return(ctx);
            Ok(())
        }
    }
}

/// Lowers every child of `node` in document order.
pub fn lower_children(ctx: &mut LoweringContext<'_>, node: &Node) -> Result<(), LoweringError> {
    for child in &node.children {
        lower_node(ctx, child)?;
    }
    Ok(())
}

/// Reads an attribute the grammar should have guaranteed.
///
/// A missing value is reported and replaced by an empty name so the
/// surrounding code still lowers to a well-formed stream.
pub(crate) fn required_attr<'n>(
    ctx: &mut LoweringContext<'_>,
    node: &'n Node,
    key: &str,
) -> &'n str {
    expect_attr(ctx, node, key).unwrap_or_default()
}

/// Like [`required_attr`], for callers that must skip work without the value.
pub(crate) fn expect_attr<'n>(
    ctx: &mut LoweringContext<'_>,
    node: &'n Node,
    key: &str,
) -> Option<&'n str> {
    let value = node.attr(key);
    if value.is_none() {
        ctx.diagnostics.report_error(format!(
            "{}: <{}> has no {key:?} attribute",
            node.path, node.tag
        ));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::Element,
        diagnostics::Diagnostics,
        ir::{Instruction, lowering::test_utils::node},
    };

    #[test]
    fn empty_code_emits_nothing() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LoweringContext::new(&mut diagnostics);
        ScriptLowering
            .lower_code(&mut ctx, &node(&Element::new("code")))
            .unwrap();
        assert!(ctx.instructions().is_empty());
    }

    #[test]
    fn foreign_construct_aborts() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LoweringContext::new(&mut diagnostics);
        let code = node(
            &Element::new("code")
                .child(Element::new("return"))
                .child(Element::new("switch"))
                .child(Element::new("return")),
        );

        let error = ScriptLowering.lower_code(&mut ctx, &code).unwrap_err();
        assert!(
            matches!(&error, LoweringError::UnsupportedConstruct { tag, .. } if tag == "switch"),
            "{error:#?}"
        );
        // Lowering stopped at the faulty construct.
        assert_eq!(ctx.instructions(), [Instruction::Fault]);
    }

    #[test]
    fn structural_elements_are_not_code() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LoweringContext::new(&mut diagnostics);
        let error = lower_node(&mut ctx, &node(&Element::new("header"))).unwrap_err();
        assert!(matches!(error, LoweringError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn missing_required_attribute_is_contained() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = LoweringContext::new(&mut diagnostics);
        lower_node(&mut ctx, &node(&Element::new("goto"))).unwrap();
        assert_eq!(ctx.instructions().len(), 1);
        assert_eq!(ctx.diagnostics.error_count(), 1);
    }
}
