use std::collections::{BTreeMap, BTreeSet};

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::address::Ea;
use crate::decoder::{Dtype, MAX_OPERANDS};
use crate::error::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrefKind {
    CallNear,
    CallFar,
    JumpNear,
    JumpFar,
    Fallthrough,
}

impl CrefKind {
    pub fn transfer(call: bool, far: bool) -> CrefKind {
        match (call, far) {
            (true, false) => CrefKind::CallNear,
            (true, true) => CrefKind::CallFar,
            (false, false) => CrefKind::JumpNear,
            (false, true) => CrefKind::JumpFar,
        }
    }

    pub fn is_call(self) -> bool {
        matches!(self, CrefKind::CallNear | CrefKind::CallFar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrefKind {
    Read,
    Write,
    /// Informational offset reference.
    Offset,
}

impl DrefKind {
    pub fn access(read: bool) -> DrefKind {
        if read {
            DrefKind::Read
        } else {
            DrefKind::Write
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XrefKind {
    Code(CrefKind),
    Data(DrefKind),
}

/// A directed reference between two addresses. `offb` locates the operand
/// bytes inside the source instruction when the reference came from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Xref {
    pub from: Ea,
    pub to: Ea,
    pub kind: XrefKind,
    pub offb: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub start: Ea,
    /// Exclusive end; equal to `start` while the extent is unknown.
    pub end: Ea,
}

impl Function {
    pub fn has_body(&self) -> bool {
        self.end > self.start
    }
}

/// Operand slots of one address that carry offset semantics.
pub type SlotSet = BitArr!(for MAX_OPERANDS, in u8);

pub fn all_slots() -> SlotSet {
    let mut set = SlotSet::ZERO;
    set.fill(true);
    set
}

/// Cross-reference store, function table and item marks of the host.
pub trait Database {
    fn add_cref(&mut self, from: Ea, to: Ea, offb: Option<u8>, kind: CrefKind) -> Result<(), DbError>;
    fn add_dref(&mut self, from: Ea, to: Ea, offb: Option<u8>, kind: DrefKind) -> Result<(), DbError>;
    /// Creates a data item of the operand's width at `ea`.
    fn create_op_data(&mut self, ea: Ea, dtype: Dtype) -> Result<(), DbError>;
    /// Base of the offset marked on slot `n` at `ea`, if the slot is one.
    fn offset_base(&self, ea: Ea, n: usize) -> Option<Ea>;
    fn make_offset(&mut self, ea: Ea, slots: SlotSet, base: Ea) -> Result<(), DbError>;
    fn get_func(&self, ea: Ea) -> Option<Function>;
    fn add_func(&mut self, ea: Ea) -> Option<Function>;
    fn func_does_return(&self, ea: Ea) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetMark {
    pub base: Ea,
    pub slots: SlotSet,
}

/// In-memory [`Database`].
#[derive(Debug, Clone, Default)]
pub struct XrefDb {
    pub xrefs: BTreeSet<Xref>,
    pub functions: BTreeMap<Ea, Function>,
    pub noreturn: BTreeSet<Ea>,
    pub data: BTreeMap<Ea, Dtype>,
    pub offsets: BTreeMap<Ea, OffsetMark>,
    /// Addresses that can not be turned into offsets (known code bytes).
    pub locked: BTreeSet<Ea>,
}

impl XrefDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_func(&mut self, start: Ea, end: Ea) {
        self.functions.insert(start, Function { start, end });
    }

    pub fn set_noreturn(&mut self, ea: Ea) {
        self.noreturn.insert(ea);
    }

    /// Marks `[start, end)` as known code.
    pub fn lock(&mut self, start: Ea, end: Ea) {
        self.locked.extend(start..end);
    }

    pub fn xrefs_from(&self, from: Ea) -> impl Iterator<Item = &Xref> {
        self.xrefs.iter().filter(move |x| x.from == from)
    }

    pub fn crefs_from(&self, from: Ea) -> Vec<(Ea, CrefKind)> {
        self.xrefs_from(from)
            .filter_map(|x| match x.kind {
                XrefKind::Code(k) => Some((x.to, k)),
                XrefKind::Data(_) => None,
            })
            .collect()
    }

    pub fn drefs_from(&self, from: Ea) -> Vec<(Ea, DrefKind)> {
        self.xrefs_from(from)
            .filter_map(|x| match x.kind {
                XrefKind::Data(k) => Some((x.to, k)),
                XrefKind::Code(_) => None,
            })
            .collect()
    }
}

impl Database for XrefDb {
    fn add_cref(&mut self, from: Ea, to: Ea, offb: Option<u8>, kind: CrefKind) -> Result<(), DbError> {
        self.xrefs.insert(Xref { from, to, kind: XrefKind::Code(kind), offb });
        Ok(())
    }

    fn add_dref(&mut self, from: Ea, to: Ea, offb: Option<u8>, kind: DrefKind) -> Result<(), DbError> {
        self.xrefs.insert(Xref { from, to, kind: XrefKind::Data(kind), offb });
        Ok(())
    }

    fn create_op_data(&mut self, ea: Ea, dtype: Dtype) -> Result<(), DbError> {
        if self.locked.contains(&ea) {
            return Err(DbError::DataRef { from: ea, to: ea });
        }
        self.data.insert(ea, dtype);
        Ok(())
    }

    fn offset_base(&self, ea: Ea, n: usize) -> Option<Ea> {
        let mark = self.offsets.get(&ea)?;
        mark.slots.get(n).is_some_and(|b| *b).then_some(mark.base)
    }

    fn make_offset(&mut self, ea: Ea, slots: SlotSet, base: Ea) -> Result<(), DbError> {
        if self.locked.contains(&ea) || self.locked.contains(&ea.wrapping_add(1)) {
            return Err(DbError::Offset { ea });
        }
        self.offsets.insert(ea, OffsetMark { base, slots });
        Ok(())
    }

    fn get_func(&self, ea: Ea) -> Option<Function> {
        self.functions.get(&ea).copied()
    }

    fn add_func(&mut self, ea: Ea) -> Option<Function> {
        Some(*self.functions.entry(ea).or_insert(Function { start: ea, end: ea }))
    }

    fn func_does_return(&self, ea: Ea) -> bool {
        !self.noreturn.contains(&ea)
    }
}
