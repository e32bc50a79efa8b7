use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::{diagnostics::Diagnostics, ir::Address};

use super::{errors::LoweringError, generator::CodeGenerator};

/// Label name to address.
///
/// Labels live in a single flat namespace and are write-once: a second
/// definition never overwrites the first.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    labels: HashMap<String, Address>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a label. On a duplicate, returns the address already on record.
    pub fn define(&mut self, name: &str, address: Address) -> Result<(), Address> {
        if let Some(existing) = self.labels.get(name) {
            return Err(*existing);
        }
        self.labels.insert(name.to_string(), address);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Address> {
        self.labels.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.labels.iter().map(|(name, address)| (name.as_str(), *address))
    }
}

/// A goto waiting for its label's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixupRecord {
    pub label: String,
    /// Address of the pending goto instruction.
    pub address: Address,
}

/// Pending fixups, in emission order.
#[derive(Debug, Clone, Default)]
pub struct Fixups {
    pending: Vec<FixupRecord>,
}

impl Fixups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, address: Address) {
        self.pending.push(FixupRecord {
            label: label.into(),
            address,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FixupRecord> {
        self.pending.iter()
    }

    /// Patches every pending goto whose label is known.
    ///
    /// Consumes the pending list. Unknown labels are reported and the pass
    /// carries on with the remaining fixups. Labels that no goto targets
    /// get a warning.
    #[instrument(level = "debug", skip_all, fields(pending = self.pending.len()))]
    pub fn resolve(
        &mut self,
        symbols: &SymbolTable,
        generator: &mut CodeGenerator,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), LoweringError> {
        let mut referenced = HashSet::new();

        for fixup in self.pending.drain(..) {
            match symbols.lookup(&fixup.label) {
                Some(target) => {
                    debug!(
                        "resolved goto at @{} to label {:?} at @{}",
                        fixup.address, fixup.label, target
                    );
                    generator.patch(fixup.address, target)?;
                    referenced.insert(fixup.label);
                }
                None => diagnostics.report_error(format!(
                    "goto at @{} targets undefined label {:?}",
                    fixup.address, fixup.label
                )),
            }
        }

        for (name, address) in symbols
            .iter()
            .filter(|(name, _)| !referenced.contains(*name))
            .sorted_by_key(|(_, address)| *address)
        {
            diagnostics.report_warning(format!(
                "label {name:?} at @{address} is never targeted"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instruction;

    fn goto(label: &str) -> Instruction {
        Instruction::Goto {
            label: label.to_string(),
            target: None,
        }
    }

    #[test]
    fn define_is_write_once() {
        let mut symbols = SymbolTable::new();
        assert_eq!(symbols.define("top", 3), Ok(()));
        assert_eq!(symbols.define("top", 9), Err(3));
        assert_eq!(symbols.lookup("top"), Some(3));
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn resolve_patches_known_labels() {
        let mut generator = CodeGenerator::new();
        let mut symbols = SymbolTable::new();
        let mut fixups = Fixups::new();
        let mut diagnostics = Diagnostics::new();

        let first = generator.emit(goto("end"));
        fixups.push("end", first);
        let second = generator.emit(goto("missing"));
        fixups.push("missing", second);
        let third = generator.emit(goto("end"));
        fixups.push("end", third);
        symbols.define("end", generator.emit(Instruction::Nop)).unwrap();

        fixups
            .resolve(&symbols, &mut generator, &mut diagnostics)
            .unwrap();

        assert!(fixups.is_empty());
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(generator.instructions()[first].target(), Some(3));
        assert_eq!(generator.instructions()[second].target(), None);
        assert_eq!(generator.instructions()[third].target(), Some(3));
    }

    #[test]
    fn unused_labels_warn() {
        let mut generator = CodeGenerator::new();
        let mut symbols = SymbolTable::new();
        let mut diagnostics = Diagnostics::new();
        symbols.define("lonely", 0).unwrap();

        Fixups::new()
            .resolve(&symbols, &mut generator, &mut diagnostics)
            .unwrap();

        assert_eq!(diagnostics.error_count(), 0);
        assert_eq!(diagnostics.warning_count(), 1);
    }
}
