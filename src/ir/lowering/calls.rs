use tracing::{debug, instrument};

use crate::{
    ast::{ConstructKind, Node, NodeKind},
    ir::Instruction,
};

use super::{LoweringContext, errors::LoweringError, lower::required_attr, values::lower_set};

/// Lowers the parameter bindings of a call.
///
/// Only `set` children bind parameters; anything else is reported and left out.
fn lower_parameters(ctx: &mut LoweringContext<'_>, node: &Node) {
    for child in &node.children {
        match child.kind {
            NodeKind::Construct(ConstructKind::Set) => lower_set(ctx, child),
            _ => ctx.diagnostics.report_error(format!(
                "{}: <{}> is not a parameter binding",
                child.path, child.tag
            )),
        }
    }
}

fn store_result(ctx: &mut LoweringContext<'_>, node: &Node) {
    if let Some(result) = node.attr("result") {
        ctx.emit(Instruction::Store(result.to_string()));
    }
}

/// Lowers `call`, `exec` and `subroutine`, which differ only in their
/// dispatch instruction.
#[instrument(level = "debug", skip_all, fields(kind = %kind, name))]
pub(crate) fn lower_call(
    ctx: &mut LoweringContext<'_>,
    node: &Node,
    kind: ConstructKind,
) -> Result<(), LoweringError> {
    debug!("begin lowering call");
    let name = required_attr(ctx, node, "name");
    tracing::Span::current().record("name", name);

    let dispatch = match kind {
        ConstructKind::Exec => Instruction::Exec(name.to_string()),
        ConstructKind::Subroutine => Instruction::Subroutine(name.to_string()),
        _ => Instruction::Call(name.to_string()),
    };

    ctx.scoped(|ctx| {
        lower_parameters(ctx, node);
        ctx.emit(dispatch);
        Ok(())
    })?;

    store_result(ctx, node);
    Ok(())
}

#[instrument(level = "debug", skip_all, fields(name, method))]
pub(crate) fn lower_member_call(
    ctx: &mut LoweringContext<'_>,
    node: &Node,
) -> Result<(), LoweringError> {
    debug!("begin lowering member call");
    let receiver = required_attr(ctx, node, "name");
    let method = required_attr(ctx, node, "method");
    tracing::Span::current().record("name", receiver);
    tracing::Span::current().record("method", method);

    ctx.scoped(|ctx| {
        lower_parameters(ctx, node);
        ctx.emit(Instruction::Eval(receiver.to_string()));
        ctx.emit(Instruction::MemberCall(method.to_string()));
        Ok(())
    })?;

    store_result(ctx, node);
    Ok(())
}
