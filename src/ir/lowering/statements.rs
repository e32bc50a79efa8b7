use tracing::{debug, instrument};

use crate::{
    ast::Node,
    ir::{Condition, Instruction},
};

use super::{
    LoweringContext,
    errors::LoweringError,
    lower::{expect_attr, lower_children, required_attr},
    values::{SourceRule, lower_value_source},
};

/// Operator of the difference `if` compares against its flag.
const SUBTRACT: &str = "-";
/// Operator of the equality test `while` loops on.
const EQUAL: &str = "==";
const ONE: &str = "1";

/// Reads the `type` comparison flag, restricted to `allowed`.
///
/// An absent flag means [`Condition::Equal`]; an unusable one is reported and
/// also falls back to it.
fn condition_flag(ctx: &mut LoweringContext<'_>, node: &Node, allowed: &[Condition]) -> Condition {
    let Some(flag) = node.attr("type") else {
        return Condition::default();
    };

    match Condition::from_flag(flag) {
        Some(condition) if allowed.contains(&condition) => condition,
        _ => {
            ctx.diagnostics.report_error(format!(
                "{}: <{}> does not support the comparison {flag:?}",
                node.path, node.tag
            ));
            Condition::default()
        }
    }
}

#[instrument(level = "debug", skip_all)]
pub(crate) fn lower_block(ctx: &mut LoweringContext<'_>, node: &Node) -> Result<(), LoweringError> {
    debug!("begin lowering block");
    ctx.scoped(|ctx| lower_children(ctx, node))
}

#[instrument(level = "debug", skip_all, fields(item))]
pub(crate) fn lower_if(ctx: &mut LoweringContext<'_>, node: &Node) -> Result<(), LoweringError> {
    debug!("begin lowering if");
    let item = required_attr(ctx, node, "item");
    tracing::Span::current().record("item", item);

    lower_value_source(ctx, node, SourceRule::DEFAULT);
    ctx.emit(Instruction::MoveRight);
    ctx.emit(Instruction::Fetch(item.to_string()));
    ctx.emit(Instruction::Arith(SUBTRACT.to_string()));

    let condition = condition_flag(
        ctx,
        node,
        &[
            Condition::Equal,
            Condition::Less,
            Condition::Greater,
            Condition::Not,
        ],
    );
    let jump = ctx.emit(Instruction::CondJump {
        condition,
        target: None,
    });

    ctx.scoped(|ctx| lower_children(ctx, node))?;

    let landing = ctx.emit(Instruction::Nop);
    ctx.patch(jump, landing)
}

#[instrument(level = "debug", skip_all, fields(name))]
pub(crate) fn lower_while(ctx: &mut LoweringContext<'_>, node: &Node) -> Result<(), LoweringError> {
    debug!("begin lowering while");
    let name = required_attr(ctx, node, "name");
    tracing::Span::current().record("name", name);

    let loop_top = ctx.current_address();

    // The condition is re-evaluated on every pass.
    lower_value_source(ctx, node, SourceRule::DEFAULT);
    ctx.emit(Instruction::MoveRight);
    ctx.emit(Instruction::Fetch(name.to_string()));
    ctx.emit(Instruction::Arith(EQUAL.to_string()));
    let jump = ctx.emit(Instruction::CondJump {
        condition: Condition::Equal,
        target: None,
    });

    ctx.scoped(|ctx| lower_children(ctx, node))?;

    ctx.emit(Instruction::Jump(loop_top));
    let loop_exit = ctx.current_address();
    ctx.patch(jump, loop_exit)
}

/// Counted loop.
///
/// The counter is an ordinary variable, fetched and stored by name on every
/// pass so the interpreter sees it like any other binding.
#[instrument(level = "debug", skip_all, fields(name))]
pub(crate) fn lower_for(ctx: &mut LoweringContext<'_>, node: &Node) -> Result<(), LoweringError> {
    debug!("begin lowering for");
    let name = required_attr(ctx, node, "name");
    tracing::Span::current().record("name", name);

    lower_value_source(ctx, node, SourceRule::COUNT);
    ctx.emit(Instruction::DeclareNew(name.to_string()));

    let loop_top = ctx.current_address();
    let jump = ctx.emit(Instruction::CondJump {
        condition: Condition::Done,
        target: None,
    });

    ctx.scoped(|ctx| lower_children(ctx, node))?;

    ctx.emit(Instruction::LoadLiteral(ONE.to_string()));
    ctx.emit(Instruction::MoveRight);
    ctx.emit(Instruction::Fetch(name.to_string()));
    ctx.emit(Instruction::Arith(SUBTRACT.to_string()));
    ctx.emit(Instruction::Store(name.to_string()));
    ctx.emit(Instruction::Jump(loop_top));

    let loop_exit = ctx.current_address();
    ctx.patch(jump, loop_exit)
}

#[instrument(level = "debug", skip_all, fields(item))]
pub(crate) fn lower_assert(ctx: &mut LoweringContext<'_>, node: &Node) -> Result<(), LoweringError> {
    debug!("begin lowering assert");
    let item = required_attr(ctx, node, "item");
    tracing::Span::current().record("item", item);

    ctx.emit(Instruction::Fetch(item.to_string()));
    let condition = condition_flag(ctx, node, &[Condition::Equal, Condition::Not]);
    let check = ctx.emit(Instruction::Assert {
        condition,
        target: None,
    });

    ctx.scoped(|ctx| lower_children(ctx, node))?;

    let landing = ctx.emit(Instruction::Nop);
    ctx.patch(check, landing)
}

#[instrument(level = "debug", skip_all, fields(label))]
pub(crate) fn lower_goto(ctx: &mut LoweringContext<'_>, node: &Node) {
    let label = expect_attr(ctx, node, "label");
    tracing::Span::current().record("label", label);

    let address = ctx.emit(Instruction::Goto {
        label: label.unwrap_or_default().to_string(),
        target: None,
    });
    // Without a label there is nothing to resolve; the error is already reported.
    if let Some(label) = label {
        debug!("goto {:?} at @{} awaits resolution", label, address);
        ctx.fixups.push(label, address);
    }
}

#[instrument(level = "debug", skip_all, fields(name))]
pub(crate) fn lower_label(ctx: &mut LoweringContext<'_>, node: &Node) {
    let Some(name) = expect_attr(ctx, node, "name") else {
        return;
    };
    tracing::Span::current().record("name", name);

    let address = ctx.current_address();
    match ctx.symbols.define(name, address) {
        Ok(()) => debug!("label {:?} defined at @{}", name, address),
        Err(first) => ctx.diagnostics.report_error(format!(
            "{}: label {name:?} is already defined at @{first}",
            node.path
        )),
    }
}

pub(crate) fn lower_return(ctx: &mut LoweringContext<'_>) {
    debug!("lowering return");
    ctx.emit(Instruction::Fault);
}
