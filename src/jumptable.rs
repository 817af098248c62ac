//! Jump tables behind `JMP (abs,X)` / `JSR (abs,X)`.
//!
//! The words following the table base are taken as entries one by one until
//! one fails a sanity check. Every accepted entry becomes a code offset, a
//! control-flow edge from the indexed jump and a context propagation.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::address::{map_code_ea, Ea};
use crate::database::{all_slots, CrefKind, Database};
use crate::decoder::Decoder;
use crate::emu::Pass;
use crate::instructions::{Feature, Mnemonic};
use crate::memory::Memory;
use crate::propagate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JumpTable {
    pub base: Ea,
    /// Accepted `(entry, target)` pairs in table order.
    pub entries: Vec<(Ea, Ea)>,
    /// Exclusive end of the table: the nearest accepted target so far.
    pub boundary: Option<Ea>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    Unreadable,
    Backwards,
    CrossesBoundary,
    TooFar,
    Host,
}

impl<'a, M: Memory, D: Decoder, B: Database> Pass<'a, M, D, B> {
    /// Walks the table for an indexed jump or call. Always true for `JMP`
    /// and `JSR`, including an empty table, so the caller does not fall back
    /// to a plain indirect reference.
    pub(crate) fn handle_jump_table(&mut self, addr: u32) -> bool {
        if !matches!(self.insn.mnem, Mnemonic::Jmp | Mnemonic::Jsr) {
            return false;
        }
        let base = self.xlat.xlat(map_code_ea(self.ctx, self.insn, addr));
        let mut table = JumpTable { base, ..Default::default() };
        let mut cur = base;
        loop {
            match self.table_entry(cur, &table) {
                Ok(target) => {
                    table.entries.push((cur, target));
                    table.boundary = Some(table.boundary.map_or(target, |b| b.min(target)));
                    cur = cur.wrapping_add(2);
                }
                Err(why) => {
                    trace!(entry = cur, ?why, "jump table ends");
                    break;
                }
            }
        }
        debug!(ea = self.insn.ea, base, entries = table.entries.len(), "jump table");
        self.report.jump_table = Some(table);
        true
    }

    fn table_entry(&mut self, cur: Ea, table: &JumpTable) -> Result<Ea, Reject> {
        let word = self.mem.read_u16(cur).ok_or(Reject::Unreadable)?;
        let target = self.xlat.xlat(map_code_ea(self.ctx, self.insn, word as u32));
        if target <= cur {
            return Err(Reject::Backwards);
        }
        if table.boundary.is_some_and(|b| cur.wrapping_add(2) > b) {
            return Err(Reject::CrossesBoundary);
        }
        if target - cur > self.cfg.max_table_span {
            return Err(Reject::TooFar);
        }

        if let Err(e) = self.db.make_offset(cur, all_slots(), cur & !0xFFFF) {
            warn!(entry = cur, "jump table entry not marked: {e}");
            return Err(Reject::Host);
        }
        let call = self.features.contains(Feature::CALL);
        let kind = if call { CrefKind::CallNear } else { CrefKind::JumpNear };
        if let Err(e) = self.db.add_cref(self.insn.ea, target, None, kind) {
            warn!(entry = cur, "jump table edge dropped: {e}");
            return Err(Reject::Host);
        }
        propagate::copy_context(self.ctx, self.insn.ea, target);
        Ok(target)
    }
}
