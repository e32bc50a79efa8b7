use core::fmt;

use serde::{Deserialize, Serialize};

pub mod lowering;

/// Position of an instruction in an [`Executable`].
pub type Address = usize;

/// The comparison a conditional instruction tests.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Equal,
    Less,
    Greater,
    Not,
    /// The loop counter is exhausted.
    Done,
}

impl Condition {
    /// Parses the value of a `type` attribute. Only the four comparison
    /// flags can be written in a document; `Done` is compiler-internal.
    pub fn from_flag(flag: &str) -> Option<Self> {
        Some(match flag {
            "equal" => Condition::Equal,
            "less" => Condition::Less,
            "greater" => Condition::Greater,
            "not" => Condition::Not,
            _ => return None,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Condition::Equal => "equal",
            Condition::Less => "less",
            Condition::Greater => "greater",
            Condition::Not => "not",
            Condition::Done => "done",
        })
    }
}

/// A single flat instruction.
///
/// Instructions are immutable once emitted, except for the pending target of
/// [`Instruction::CondJump`], [`Instruction::Goto`] and [`Instruction::Assert`],
/// which is filled in exactly once.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instruction {
    Nop,
    /// Evaluate a runtime expression string.
    Eval(String),
    /// Store the current value into an existing variable.
    Store(String),
    /// Declare a new variable in the current scope and store the current value.
    DeclareNew(String),
    ScopeEnter,
    ScopeExit,
    /// Produce the reduced contents of a buffer.
    BufferReduce(String),
    Mask(String),
    /// Append the current value to a buffer.
    Merge(String),
    /// Move the current value into the RIGHT register.
    MoveRight,
    /// Combine the fetched value with the RIGHT register.
    Arith(String),
    LoadLiteral(String),
    ClearBuffer(String),
    /// Unconditional unwind signal.
    Fault,
    /// Fetch a variable by name.
    Fetch(String),
    CondJump {
        condition: Condition,
        target: Option<Address>,
    },
    Call(String),
    Exec(String),
    Subroutine(String),
    Jump(Address),
    Goto {
        label: String,
        target: Option<Address>,
    },
    Assert {
        condition: Condition,
        target: Option<Address>,
    },
    MemberCall(String),
}

impl Instruction {
    /// The pending or resolved target of a patchable instruction.
    pub fn target(&self) -> Option<Address> {
        match self {
            Instruction::CondJump { target, .. }
            | Instruction::Goto { target, .. }
            | Instruction::Assert { target, .. } => *target,
            Instruction::Jump(target) => Some(*target),
            _ => None,
        }
    }

    pub fn is_patchable(&self) -> bool {
        matches!(
            self,
            Instruction::CondJump { .. } | Instruction::Goto { .. } | Instruction::Assert { .. }
        )
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Nop => "nop",
            Instruction::Eval(_) => "eval",
            Instruction::Store(_) => "store",
            Instruction::DeclareNew(_) => "new",
            Instruction::ScopeEnter => "enter",
            Instruction::ScopeExit => "exit",
            Instruction::BufferReduce(_) => "reduce",
            Instruction::Mask(_) => "mask",
            Instruction::Merge(_) => "merge",
            Instruction::MoveRight => "mvright",
            Instruction::Arith(_) => "arith",
            Instruction::LoadLiteral(_) => "load",
            Instruction::ClearBuffer(_) => "clear",
            Instruction::Fault => "fault",
            Instruction::Fetch(_) => "fetch",
            Instruction::CondJump { .. } => "jcond",
            Instruction::Call(_) => "call",
            Instruction::Exec(_) => "exec",
            Instruction::Subroutine(_) => "gosub",
            Instruction::Jump(_) => "jump",
            Instruction::Goto { .. } => "goto",
            Instruction::Assert { .. } => "assert",
            Instruction::MemberCall(_) => "mcall",
        }
    }
}

fn fmt_target(target: &Option<Address>) -> String {
    target.map_or_else(|| "?".to_string(), |t| format!("@{t}"))
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.mnemonic();
        match self {
            Instruction::Nop
            | Instruction::ScopeEnter
            | Instruction::ScopeExit
            | Instruction::MoveRight
            | Instruction::Fault => f.write_str(op),
            Instruction::LoadLiteral(text) | Instruction::Eval(text) => {
                write!(f, "{op:<8}{text:?}")
            }
            Instruction::Store(name)
            | Instruction::DeclareNew(name)
            | Instruction::BufferReduce(name)
            | Instruction::Mask(name)
            | Instruction::Merge(name)
            | Instruction::Arith(name)
            | Instruction::ClearBuffer(name)
            | Instruction::Fetch(name)
            | Instruction::Call(name)
            | Instruction::Exec(name)
            | Instruction::Subroutine(name)
            | Instruction::MemberCall(name) => write!(f, "{op:<8}{name}"),
            Instruction::CondJump { condition, target }
            | Instruction::Assert { condition, target } => {
                write!(f, "{op:<8}{condition} {}", fmt_target(target))
            }
            Instruction::Jump(target) => write!(f, "{op:<8}@{target}"),
            Instruction::Goto { label, target } => {
                write!(f, "{op:<8}{label} {}", fmt_target(target))
            }
        }
    }
}

/// Declares the variable a script hands back to its caller.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct OutputVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
}

/// Metadata from the document header.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub major: u32,
    pub minor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputVar>,
}

/// The compiled artifact handed to the interpreter.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Executable {
    pub header: Header,
    pub instructions: Vec<Instruction>,
}

impl Executable {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, address: Address) -> Option<&Instruction> {
        self.instructions.get(address)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        writeln!(f, "; {} v{}.{}", header.name, header.major, header.minor)?;
        if let Some(uid) = &header.uid {
            writeln!(f, "; uid {uid}")?;
        }
        if let Some(note) = &header.note {
            for line in note.lines() {
                writeln!(f, "; {line}")?;
            }
        }
        if let Some(output) = &header.output {
            match &output.type_tag {
                Some(ty) => writeln!(f, "; output {}: {ty}", output.name)?,
                None => writeln!(f, "; output {}", output.name)?,
            }
        }

        let width = self.instructions.len().saturating_sub(1).to_string().len();
        for (address, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{address:>width$}: {instruction}")?;
        }
        Ok(())
    }
}
