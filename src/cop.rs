//! Expansion of the variable-length `COP` pseudo-instruction.
//!
//! Firmware built around a `COP` dispatcher passes its arguments inline after
//! the command byte. A [`CopTable`] describes, per command, the sequence of
//! argument formats; [`expand`] walks that sequence over the bytes following
//! the command and turns each argument into an operand slot.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::address::Ea;
use crate::decoder::{Dtype, Instruction, Operand, OperandKind, MAX_OPERANDS};
use crate::instructions::{Feature, Mnemonic};
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopFormat {
    Byte,
    Word,
    Long,
    CodeOffset,
    LongCodeOffset,
    /// Terminates the sequence early.
    End,
}

impl CopFormat {
    /// Bytes consumed from the instruction stream.
    pub fn width(self) -> Option<u8> {
        match self {
            CopFormat::Byte => Some(1),
            CopFormat::Word | CopFormat::CodeOffset => Some(2),
            CopFormat::Long | CopFormat::LongCodeOffset => Some(3),
            CopFormat::End => None,
        }
    }

    pub fn dtype(self) -> Dtype {
        match self {
            CopFormat::Byte | CopFormat::End => Dtype::Byte,
            CopFormat::Word | CopFormat::CodeOffset => Dtype::Word,
            CopFormat::Long | CopFormat::LongCodeOffset => Dtype::Dword,
        }
    }

    pub fn is_code(self) -> bool {
        matches!(self, CopFormat::CodeOffset | CopFormat::LongCodeOffset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopDef {
    pub id: u8,
    pub formats: Vec<CopFormat>,
    #[serde(default)]
    pub noreturn: bool,
}

/// Command definitions stored positionally: slot `n` is expected to hold the
/// definition whose `id` is `n`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CopTable {
    defs: Vec<CopDef>,
}

impl CopTable {
    pub fn new(defs: Vec<CopDef>) -> Self {
        Self { defs }
    }

    pub fn lookup(&self, id: u8) -> Option<&CopDef> {
        self.defs.get(id as usize).filter(|d| d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Rewrites a `COP` instruction's operands from its command's argument
/// formats. Returns false, leaving `insn` untouched, when the instruction is
/// not a `COP`, the command has no matching definition, or an argument runs
/// off the mapped image.
pub fn expand<M: Memory>(insn: &mut Instruction, mem: &M, table: &CopTable) -> bool {
    if insn.mnem != Mnemonic::Cop {
        return false;
    }
    let Some(cmd) = mem.read_u8(insn.ea.wrapping_add(1)) else {
        return false;
    };
    let Some(def) = table.lookup(cmd) else {
        trace!(ea = insn.ea, cmd, "no definition for cop command");
        return false;
    };

    let mut ops = Vec::with_capacity(def.formats.len());
    let mut features = Feature::empty();
    let mut offb: u8 = 2;
    for &fmt in def.formats.iter().take(MAX_OPERANDS) {
        let Some(len) = fmt.width() else { break };
        let at: Ea = insn.ea.wrapping_add(offb as Ea);
        let raw = match len {
            1 => mem.read_u8(at).map(u32::from),
            2 => mem.read_u16(at).map(u32::from),
            _ => mem.read_u24(at),
        };
        let Some(raw) = raw else { return false };
        let addr = if fmt == CopFormat::Byte { 0 } else { raw };
        let kind = OperandKind::Cop {
            addr,
            value: raw,
            is_code: fmt.is_code(),
        };
        features |= Feature::uses(ops.len());
        ops.push(Operand::new(kind, fmt.dtype(), offb));
        offb += len;
    }

    let flow = insn.features & (Feature::STOP | Feature::CALL | Feature::JUMP);
    insn.features = flow | features;
    if def.noreturn {
        insn.features |= Feature::STOP;
    }
    insn.ops = ops;
    insn.size = offb;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LinearMemory;

    fn table() -> CopTable {
        CopTable::new(vec![
            CopDef { id: 0, formats: vec![CopFormat::Byte], noreturn: false },
            CopDef { id: 1, formats: vec![CopFormat::Word, CopFormat::CodeOffset], noreturn: false },
            CopDef { id: 2, formats: vec![], noreturn: true },
            CopDef { id: 9, formats: vec![CopFormat::Byte], noreturn: false },
        ])
    }

    #[test]
    fn mismatched_slot_is_not_applicable() {
        let mut mem = LinearMemory::new(8);
        mem.store(0, &[0x02, 0x03]);
        let mut insn = Instruction::new(0, 2, Mnemonic::Cop, vec![Operand::imm(3, Dtype::Byte)]);
        assert!(!expand(&mut insn, &mem, &table()));
        assert_eq!(insn.size, 2);
    }

    #[test]
    fn other_instructions_are_not_applicable() {
        let mut mem = LinearMemory::new(8);
        mem.store(0, &[0xEA, 0x00]);
        let mut insn = Instruction::new(0, 1, Mnemonic::Nop, vec![]);
        assert!(!expand(&mut insn, &mem, &table()));
    }
}
