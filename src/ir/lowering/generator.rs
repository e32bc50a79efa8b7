use crate::ir::{Address, Instruction};

use super::errors::LoweringError;

/// Append-only instruction buffer.
///
/// Instructions are never removed or reordered, so an address taken at any
/// point stays valid until the compile ends.
#[derive(Clone, Debug, Default)]
pub struct CodeGenerator {
    instructions: Vec<Instruction>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction and returns its address.
    pub fn emit(&mut self, instruction: Instruction) -> Address {
        let address = self.instructions.len();
        self.instructions.push(instruction);
        address
    }

    /// The address the next emitted instruction will get.
    pub fn current_address(&self) -> Address {
        self.instructions.len()
    }

    /// Fills in the pending target of the instruction at `address`.
    pub fn patch(&mut self, address: Address, to: Address) -> Result<(), LoweringError> {
        let instruction = self
            .instructions
            .get_mut(address)
            .ok_or(LoweringError::AddressOutOfRange { address })?;

        match instruction {
            Instruction::CondJump { target, .. }
            | Instruction::Goto { target, .. }
            | Instruction::Assert { target, .. } => {
                if target.is_some() {
                    return Err(LoweringError::AlreadyPatched { address });
                }
                *target = Some(to);
                Ok(())
            }
            _ => Err(LoweringError::NotPatchable { address }),
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.instructions
    }
}
