use crate::{ast::NodePath, ir::Address};
use thiserror::Error;

/// Faults that abort a whole compile.
///
/// Problems a construct can recover from locally are reported through
/// [`crate::diagnostics::Diagnostics`] instead and never show up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoweringError {
    #[error("{path}: no lowering exists for <{tag}>")]
    UnsupportedConstruct { tag: String, path: NodePath },
    #[error("document has no <{section}> section")]
    MissingSection { section: &'static str },
    #[error("instruction at @{address} has no target to patch")]
    NotPatchable { address: Address },
    #[error("target of instruction at @{address} was already patched")]
    AlreadyPatched { address: Address },
    #[error("address @{address} is past the end of the code")]
    AddressOutOfRange { address: Address },
}
