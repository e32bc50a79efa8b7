//! Lowering of validated code trees into flat instructions.
//!
//! All state of one compile lives in a [`LoweringContext`] that is threaded
//! through every lowering routine; nothing is kept between compiles.

use crate::{
    ast::Node,
    diagnostics::Diagnostics,
    ir::{Address, Instruction},
};

mod calls;
mod errors;
mod generator;
mod header;
mod lower;
mod statements;
mod symbols;
mod values;

pub use errors::LoweringError;
pub use generator::CodeGenerator;
pub use header::extract_header;
pub use lower::{ScriptLowering, lower_children, lower_node};
pub use symbols::{FixupRecord, Fixups, SymbolTable};

/// Per-compile lowering state.
#[derive(Debug)]
pub struct LoweringContext<'d> {
    pub generator: CodeGenerator,
    pub symbols: SymbolTable,
    pub fixups: Fixups,
    pub diagnostics: &'d mut Diagnostics,
}

impl<'d> LoweringContext<'d> {
    pub fn new(diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            generator: CodeGenerator::new(),
            symbols: SymbolTable::new(),
            fixups: Fixups::new(),
            diagnostics,
        }
    }

    pub fn emit(&mut self, instruction: Instruction) -> Address {
        self.generator.emit(instruction)
    }

    pub fn current_address(&self) -> Address {
        self.generator.current_address()
    }

    pub fn patch(&mut self, address: Address, target: Address) -> Result<(), LoweringError> {
        self.generator.patch(address, target)
    }

    /// Runs `body` between a scope-enter and a scope-exit.
    ///
    /// The scope-exit is emitted even when `body` fails.
    pub fn scoped<F>(&mut self, body: F) -> Result<(), LoweringError>
    where
        F: FnOnce(&mut Self) -> Result<(), LoweringError>,
    {
        self.emit(Instruction::ScopeEnter);
        let result = body(self);
        self.emit(Instruction::ScopeExit);
        result
    }

    /// Resolves all pending gotos against the symbol table.
    pub fn resolve_fixups(&mut self) -> Result<(), LoweringError> {
        self.fixups
            .resolve(&self.symbols, &mut self.generator, self.diagnostics)
    }

    pub fn instructions(&self) -> &[Instruction] {
        self.generator.instructions()
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.generator.finish()
    }
}

/// A strategy that lowers the code section of a document.
///
/// The compiler driver handles validation, the header, the trailing no-op and
/// fixup resolution; a strategy only turns code constructs into instructions.
/// Plain functions and closures with the right signature are strategies too.
pub trait Lowering: Send + Sync {
    fn lower_code(&self, ctx: &mut LoweringContext<'_>, code: &Node) -> Result<(), LoweringError>;
}

impl<F> Lowering for F
where
    F: Fn(&mut LoweringContext<'_>, &Node) -> Result<(), LoweringError> + Send + Sync,
{
    fn lower_code(&self, ctx: &mut LoweringContext<'_>, code: &Node) -> Result<(), LoweringError> {
        self(ctx, code)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::{
        ast::{Element, Node, NodeKind, NodePath},
        ir::Instruction,
    };

    /// Builds a validated node without going through a grammar.
    pub fn node(element: &Element) -> Node {
        fn build(element: &Element, path: NodePath) -> Node {
            Node {
                kind: NodeKind::from_tag(&element.tag),
                tag: element.tag.clone(),
                attributes: element.attributes.clone(),
                children: element
                    .children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| build(child, path.child(&child.tag, i)))
                    .collect(),
                text: element.text.clone(),
                path,
            }
        }
        build(element, NodePath::root(&element.tag))
    }

    pub fn name(s: &str) -> String {
        s.to_string()
    }

    /// Counts scope-enter and scope-exit instructions in a range.
    pub fn scope_balance(instructions: &[Instruction]) -> (usize, usize) {
        let enters = instructions
            .iter()
            .filter(|i| matches!(i, Instruction::ScopeEnter))
            .count();
        let exits = instructions
            .iter()
            .filter(|i| matches!(i, Instruction::ScopeExit))
            .count();
        (enters, exits)
    }
}
