use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use serde::{Deserialize, Serialize};

use crate::address::Ea;

/// Processor-context facts tracked per address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sreg {
    /// Program bank (K).
    ProgramBank,
    /// Data bank (B).
    DataBank,
    /// Data-bank selector shadow, `B << 12`; data mapping uses `sel << 4`.
    DataSelector,
    /// Direct-page base (D).
    DirectPage,
    /// Accumulator/memory width flag, 1 = 8-bit.
    M,
    /// Index width flag, 1 = 8-bit.
    X,
    /// Emulation flag, 1 = emulation mode.
    E,
    /// Origin shadow of `M`, written with the opposite value at each mode switch.
    OriginM,
    /// Origin shadow of `X`.
    OriginX,
}

impl Sreg {
    pub const ALL: [Sreg; 9] = [
        Sreg::ProgramBank,
        Sreg::DataBank,
        Sreg::DataSelector,
        Sreg::DirectPage,
        Sreg::M,
        Sreg::X,
        Sreg::E,
        Sreg::OriginM,
        Sreg::OriginX,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sreg::ProgramBank => "pb",
            Sreg::DataBank => "b",
            Sreg::DataSelector => "ds",
            Sreg::DirectPage => "d",
            Sreg::M => "m",
            Sreg::X => "x",
            Sreg::E => "e",
            Sreg::OriginM => "om",
            Sreg::OriginX => "ox",
        }
    }
}

/// One validity range of a register. `end` is exclusive; `None` means the
/// range extends to the end of the address space. A `None` value is the
/// distinguished "unknown", which is never the same as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SregRange {
    pub start: Ea,
    pub end: Option<Ea>,
    pub value: Option<u32>,
}

/// Interval map from `(register, address)` to value.
///
/// Each register keeps its ranges keyed by start address. A write at `ea`
/// closes whatever range covered `ea` and opens a new one there which runs
/// until the next existing boundary, so ranges never overlap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextStore {
    regs: BTreeMap<Sreg, BTreeMap<Ea, Option<u32>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `reg` valid at `ea`, `None` when unknown.
    pub fn get(&self, reg: Sreg, ea: Ea) -> Option<u32> {
        self.range(reg, ea).and_then(|r| r.value)
    }

    /// Range of `reg` covering `ea`, if any write precedes `ea`.
    pub fn range(&self, reg: Sreg, ea: Ea) -> Option<SregRange> {
        let map = self.regs.get(&reg)?;
        let (&start, &value) = map.range(..=ea).next_back()?;
        let end = map.range((Excluded(ea), Unbounded)).next().map(|(&s, _)| s);
        Some(SregRange { start, end, value })
    }

    /// Opens a range of `reg` starting at `at`.
    pub fn split(&mut self, reg: Sreg, at: Ea, value: Option<u32>) {
        self.regs.entry(reg).or_default().insert(at, value);
    }

    /// All ranges of `reg` in address order.
    pub fn ranges(&self, reg: Sreg) -> Vec<SregRange> {
        let Some(map) = self.regs.get(&reg) else {
            return Vec::new();
        };
        let starts: Vec<(Ea, Option<u32>)> = map.iter().map(|(&s, &v)| (s, v)).collect();
        starts
            .iter()
            .enumerate()
            .map(|(i, &(start, value))| SregRange {
                start,
                end: starts.get(i + 1).map(|&(s, _)| s),
                value,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.values().all(|m| m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_closes_previous_range() {
        let mut ctx = ContextStore::new();
        assert_eq!(ctx.get(Sreg::M, 0x8000), None);
        ctx.split(Sreg::M, 0x8000, Some(1));
        ctx.split(Sreg::M, 0x8010, Some(0));
        assert_eq!(ctx.get(Sreg::M, 0x7FFF), None);
        assert_eq!(ctx.get(Sreg::M, 0x8000), Some(1));
        assert_eq!(ctx.get(Sreg::M, 0x800F), Some(1));
        assert_eq!(ctx.get(Sreg::M, 0x8010), Some(0));
        assert_eq!(
            ctx.range(Sreg::M, 0x8004),
            Some(SregRange { start: 0x8000, end: Some(0x8010), value: Some(1) })
        );
    }

    #[test]
    fn write_inside_range_extends_to_next_boundary() {
        let mut ctx = ContextStore::new();
        ctx.split(Sreg::X, 0x100, Some(1));
        ctx.split(Sreg::X, 0x200, Some(1));
        ctx.split(Sreg::X, 0x180, Some(0));
        assert_eq!(
            ctx.ranges(Sreg::X),
            vec![
                SregRange { start: 0x100, end: Some(0x180), value: Some(1) },
                SregRange { start: 0x180, end: Some(0x200), value: Some(0) },
                SregRange { start: 0x200, end: None, value: Some(1) },
            ]
        );
    }

    #[test]
    fn unknown_is_not_zero() {
        let mut ctx = ContextStore::new();
        ctx.split(Sreg::DirectPage, 0x10, Some(0));
        ctx.split(Sreg::DirectPage, 0x20, None);
        assert_eq!(ctx.get(Sreg::DirectPage, 0x10), Some(0));
        assert_eq!(ctx.get(Sreg::DirectPage, 0x20), None);
        assert!(ctx.range(Sreg::DirectPage, 0x20).is_some());
    }

    #[test]
    fn rewriting_same_start_does_not_duplicate() {
        let mut ctx = ContextStore::new();
        ctx.split(Sreg::M, 0x10, Some(1));
        ctx.split(Sreg::M, 0x10, Some(1));
        assert_eq!(ctx.ranges(Sreg::M).len(), 1);
    }
}
