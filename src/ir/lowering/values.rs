use tracing::{debug, instrument};

use crate::{ast::Node, ir::Instruction};

use super::{LoweringContext, lower::required_attr};

/// Literal loaded in place of a missing value source.
pub(crate) const PLACEHOLDER_LITERAL: &str = "0";

/// Where the right-hand value of a construct comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ValueSource<'n> {
    Eval(&'n str),
    Literal(&'n str),
    Reference(&'n str),
    BufferReduce(&'n str),
}

impl ValueSource<'_> {
    pub(crate) fn instruction(self) -> Instruction {
        match self {
            ValueSource::Eval(expr) => Instruction::Eval(expr.to_string()),
            ValueSource::Literal(value) => Instruction::LoadLiteral(value.to_string()),
            ValueSource::Reference(name) => Instruction::Fetch(name.to_string()),
            ValueSource::BufferReduce(buffer) => Instruction::BufferReduce(buffer.to_string()),
        }
    }
}

/// Which attributes a construct may take its value from.
///
/// Precedence is fixed: evaluator, literal, reference, buffer-reduce.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SourceRule {
    /// Attribute holding the literal.
    pub literal: &'static str,
    pub reference: bool,
    pub buffer_reduce: bool,
}

impl SourceRule {
    pub(crate) const DEFAULT: SourceRule = SourceRule {
        literal: "value",
        reference: true,
        buffer_reduce: true,
    };

    /// `for` counts come from `count` instead of `value`.
    pub(crate) const COUNT: SourceRule = SourceRule {
        literal: "count",
        ..SourceRule::DEFAULT
    };

    /// `input` and `buffer` never read a reference.
    pub(crate) const NO_REFERENCE: SourceRule = SourceRule {
        reference: false,
        ..SourceRule::DEFAULT
    };

    fn keys(&self) -> Vec<&'static str> {
        let mut keys = vec!["eval", self.literal];
        if self.reference {
            keys.push("ref");
        }
        if self.buffer_reduce {
            keys.push("buffer");
        }
        keys
    }
}

/// Picks the highest-precedence value source present on the node.
///
/// Lower-precedence sources that are also present are ignored with a warning.
pub(crate) fn select_source<'n>(
    ctx: &mut LoweringContext<'_>,
    node: &'n Node,
    rule: SourceRule,
) -> Option<ValueSource<'n>> {
    let mut present = rule
        .keys()
        .into_iter()
        .filter_map(|key| node.attr(key).map(|value| (key, value)));

    let (key, value) = present.next()?;
    let ignored: Vec<_> = present.map(|(key, _)| key).collect();
    if !ignored.is_empty() {
        ctx.diagnostics.report_warning(format!(
            "{}: <{}> takes its value from {key:?}; ignoring {}",
            node.path,
            node.tag,
            ignored.join(", ")
        ));
    }

    Some(match key {
        "eval" => ValueSource::Eval(value),
        "ref" => ValueSource::Reference(value),
        "buffer" => ValueSource::BufferReduce(value),
        _ => ValueSource::Literal(value),
    })
}

/// Emits the right-hand value of a construct.
///
/// Without any source an error is reported and a zero literal stands in, so
/// the rest of the document keeps lowering.
pub(crate) fn lower_value_source(ctx: &mut LoweringContext<'_>, node: &Node, rule: SourceRule) {
    match select_source(ctx, node, rule) {
        Some(source) => {
            debug!("value source: {:?}", source);
            ctx.emit(source.instruction());
        }
        None => {
            ctx.diagnostics.report_error(format!(
                "{}: <{}> needs one of the attributes {}",
                node.path,
                node.tag,
                rule.keys().join(", ")
            ));
            ctx.emit(Instruction::LoadLiteral(PLACEHOLDER_LITERAL.to_string()));
        }
    }
}

#[instrument(level = "debug", skip_all, fields(name))]
pub(crate) fn lower_set(ctx: &mut LoweringContext<'_>, node: &Node) {
    debug!("begin lowering set");
    let name = required_attr(ctx, node, "name");
    tracing::Span::current().record("name", name);

    lower_value_source(ctx, node, SourceRule::DEFAULT);
    if node.has_attr("new") {
        ctx.emit(Instruction::DeclareNew(name.to_string()));
    } else {
        ctx.emit(Instruction::Store(name.to_string()));
    }
}

#[instrument(level = "debug", skip_all, fields(name))]
pub(crate) fn lower_input(ctx: &mut LoweringContext<'_>, node: &Node) {
    debug!("begin lowering input");
    let name = required_attr(ctx, node, "name");
    tracing::Span::current().record("name", name);

    lower_value_source(ctx, node, SourceRule::NO_REFERENCE);
    ctx.emit(Instruction::DeclareNew(name.to_string()));
}

#[instrument(level = "debug", skip_all, fields(name))]
pub(crate) fn lower_buffer(ctx: &mut LoweringContext<'_>, node: &Node) {
    debug!("begin lowering buffer");
    let name = required_attr(ctx, node, "name");
    tracing::Span::current().record("name", name);

    let mut cleared = false;
    let mut applied = false;

    if node.has_attr("clear") {
        ctx.emit(Instruction::ClearBuffer(name.to_string()));
        cleared = true;
    }

    if let Some(source) = select_source(ctx, node, SourceRule::NO_REFERENCE) {
        ctx.emit(source.instruction());
        ctx.emit(Instruction::Merge(name.to_string()));
        applied = true;
    }

    if let Some(text) = node.text.as_deref().filter(|t| !t.is_empty()) {
        ctx.emit(Instruction::LoadLiteral(text.to_string()));
        ctx.emit(Instruction::Merge(name.to_string()));
        applied = true;
    }

    if !applied && !cleared {
        ctx.diagnostics
            .report_debug(format!("{}: empty buffer {name:?} is cleared", node.path));
        ctx.emit(Instruction::ClearBuffer(name.to_string()));
    }
}

#[instrument(level = "debug", skip_all, fields(left, oper))]
pub(crate) fn lower_math(ctx: &mut LoweringContext<'_>, node: &Node) {
    debug!("begin lowering math");
    let left = required_attr(ctx, node, "left");
    let oper = required_attr(ctx, node, "oper");
    tracing::Span::current().record("left", left);
    tracing::Span::current().record("oper", oper);

    lower_value_source(ctx, node, SourceRule::DEFAULT);
    ctx.emit(Instruction::MoveRight);
    ctx.emit(Instruction::Fetch(left.to_string()));
    ctx.emit(Instruction::Arith(oper.to_string()));

    let output = node.attr("output").unwrap_or(left);
    ctx.emit(Instruction::Store(output.to_string()));
}
