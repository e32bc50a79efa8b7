//! The compile driver.
//!
//! A [`Compiler`] owns a grammar, resolved once at construction, and a
//! lowering strategy. Each call to [`Compiler::compile`] runs the whole
//! pipeline under a single lock and either hands back an [`Executable`] or
//! reports failure; a partially built artifact never leaves this module.

use educe::Educe;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    ast::{Document, Node, NodeKind, StructuralKind},
    diagnostics::Diagnostics,
    grammar::{
        BuiltinResolver, Grammar, GrammarError, GrammarResolver, STANDARD_GRAMMAR_ID, validate,
    },
    ir::{
        Executable, Instruction,
        lowering::{Lowering, LoweringContext, LoweringError, ScriptLowering, extract_header},
    },
    parser::{DocumentError, DocumentSource, parse_document},
};

/// Where a compile currently is, or where the last one ended.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CompileState {
    #[default]
    Parsing,
    HeaderExtraction,
    CodeLowering,
    FixupResolution,
    Done,
    Failed,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compile failed with {errors} error(s) and {warnings} warning(s)")]
    Failed { errors: usize, warnings: usize },
    #[error("compile aborted: {0}")]
    Fatal(#[from] LoweringError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// State of the compile in progress, or of the last one.
#[derive(Debug, Default)]
struct Session {
    diagnostics: Diagnostics,
    state: CompileState,
}

fn advance(state: &mut CompileState, next: CompileState) {
    debug!("compile state {:?} -> {:?}", state, next);
    *state = next;
}

#[derive(Educe)]
#[educe(Debug)]
pub struct Compiler {
    grammar: Grammar,
    #[educe(Debug(ignore))]
    lowering: Box<dyn Lowering>,
    session: Mutex<Session>,
}

impl Compiler {
    /// Resolves the grammar `id` and sets up the standard lowering.
    pub fn new(resolver: &dyn GrammarResolver, id: &str) -> Result<Self, GrammarError> {
        let grammar = resolver.resolve(id)?;
        debug!("compiler uses grammar {:?}", grammar.id);
        Ok(Self {
            grammar,
            lowering: Box::new(ScriptLowering),
            session: Mutex::new(Session::default()),
        })
    }

    /// A compiler for the grammar embedded in the crate.
    pub fn standard() -> Result<Self, GrammarError> {
        Self::new(&BuiltinResolver, STANDARD_GRAMMAR_ID)
    }

    /// Replaces the lowering strategy for the code section.
    pub fn with_lowering(mut self, lowering: impl Lowering + 'static) -> Self {
        self.lowering = Box::new(lowering);
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Compiles a document.
    ///
    /// Concurrent calls on the same compiler are serialized. Diagnostics of
    /// the previous compile are cleared first.
    #[instrument(level = "debug", skip_all, fields(document = ?document.file_path))]
    pub fn compile(&self, document: &Document) -> Result<Executable, CompileError> {
        let mut session = self.session.lock();
        let session = &mut *session;
        session.diagnostics.reset();
        session.state = CompileState::Parsing;

        let result = self.run(document, session);

        match &result {
            Ok(executable) => {
                advance(&mut session.state, CompileState::Done);
                info!(
                    "compiled {:?} to {} instruction(s), {} warning(s)",
                    executable.header.name,
                    executable.len(),
                    session.diagnostics.warning_count()
                );
            }
            Err(error) => {
                if let CompileError::Fatal(fatal) = error {
                    session.diagnostics.report_error(fatal.to_string());
                }
                advance(&mut session.state, CompileState::Failed);
            }
        }

        result
    }

    /// Parses and compiles a document source.
    pub fn compile_source(&self, source: &DocumentSource) -> Result<Executable, CompileError> {
        match parse_document(source) {
            Ok(document) => self.compile(&document),
            Err(error) => {
                let mut session = self.session.lock();
                session.diagnostics.reset();
                session.diagnostics.report_error(error.to_string());
                session.state = CompileState::Failed;
                Err(error.into())
            }
        }
    }

    fn run(&self, document: &Document, session: &mut Session) -> Result<Executable, CompileError> {
        let Some(root) = validate(&self.grammar, document, &mut session.diagnostics) else {
            return Err(failure(&session.diagnostics));
        };
        if !sections_are_unique(&root, &mut session.diagnostics) {
            return Err(failure(&session.diagnostics));
        }

        let header = root
            .section(StructuralKind::Header)
            .ok_or(LoweringError::MissingSection { section: "header" })?;
        let code = root
            .section(StructuralKind::Code)
            .ok_or(LoweringError::MissingSection { section: "code" })?;

        advance(&mut session.state, CompileState::HeaderExtraction);
        let header = extract_header(header, &mut session.diagnostics);

        advance(&mut session.state, CompileState::CodeLowering);
        let mut ctx = LoweringContext::new(&mut session.diagnostics);
        self.lowering.lower_code(&mut ctx, code)?;
        // Jumps past the last construct land here.
        ctx.emit(Instruction::Nop);

        advance(&mut session.state, CompileState::FixupResolution);
        ctx.resolve_fixups()?;
        let instructions = ctx.finish();
        check_targets(&instructions, &mut session.diagnostics);

        if session.diagnostics.has_errors() {
            return Err(failure(&session.diagnostics));
        }

        Ok(Executable {
            header,
            instructions,
        })
    }

    pub fn error_count(&self) -> usize {
        self.session.lock().diagnostics.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.session.lock().diagnostics.warning_count()
    }

    /// A copy of the diagnostics of the most recent compile.
    pub fn diagnostics(&self) -> Diagnostics {
        self.session.lock().diagnostics.clone()
    }

    pub fn last_state(&self) -> CompileState {
        self.session.lock().state
    }
}

/// Reports every `header` or `code` section after the first.
fn sections_are_unique(root: &Node, diagnostics: &mut Diagnostics) -> bool {
    let mut unique = true;
    for (kind, name) in [
        (StructuralKind::Header, "header"),
        (StructuralKind::Code, "code"),
    ] {
        for extra in root
            .children
            .iter()
            .filter(|child| child.kind == NodeKind::Structural(kind))
            .skip(1)
        {
            diagnostics.report_error(format!("{}: duplicate <{name}> section", extra.path));
            unique = false;
        }
    }
    unique
}

/// Every resolved target must address an instruction of the artifact.
fn check_targets(instructions: &[Instruction], diagnostics: &mut Diagnostics) {
    for (address, instruction) in instructions.iter().enumerate() {
        if let Some(target) = instruction.target().filter(|t| *t >= instructions.len()) {
            diagnostics.report_error(format!(
                "{} at @{address} targets @{target}, past the end of the code",
                instruction.mnemonic()
            ));
        }
    }
}

fn failure(diagnostics: &Diagnostics) -> CompileError {
    CompileError::Failed {
        errors: diagnostics.error_count(),
        warnings: diagnostics.warning_count(),
    }
}
