//! Moving processor context along control-flow edges.

use tracing::debug;

use crate::address::{bank, Ea};
use crate::context::{ContextStore, Sreg};
use crate::database::Function;
use crate::decoder::{Decoder, Instruction};
use crate::stack;

/// Width flags paired with their origin shadows.
pub const WIDTH_FLAGS: [(Sreg, Sreg); 2] = [(Sreg::M, Sreg::OriginM), (Sreg::X, Sreg::OriginX)];

/// Registers copied verbatim along a call or jump edge.
const STRAIGHT: [Sreg; 4] = [Sreg::E, Sreg::DataBank, Sreg::DataSelector, Sreg::DirectPage];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// Direct and shadow agree; the target needs no write.
    Keep,
    Write(Option<u32>),
}

/// Decides what a width flag carries from `from` across an edge by
/// comparing the direct register's range against its origin shadow's.
/// A register with no range at all counts as starting before every address.
pub fn merge_flag(ctx: &ContextStore, from: Ea, direct: Sreg, origin: Sreg) -> Merge {
    let d = ctx.range(direct, from);
    let o = ctx.range(origin, from);
    let d_start = d.map(|r| r.start);
    let o_start = o.map(|r| r.start);
    let d_val = d.and_then(|r| r.value);
    let o_val = o.and_then(|r| r.value);

    if o_start > d_start {
        return Merge::Write(o_val);
    }
    if d_start > o_start {
        return Merge::Write(d_val);
    }
    if d.is_some() && d_val == o_val {
        return Merge::Keep;
    }
    if d.is_some() && o_val == Some(1) {
        return Merge::Write(o_val);
    }
    Merge::Write(d_val)
}

/// Context for the target of a direct call or jump.
pub fn xfer_sregs(ctx: &mut ContextStore, from: Ea, to: Ea) {
    for (direct, origin) in WIDTH_FLAGS {
        if let Merge::Write(v) = merge_flag(ctx, from, direct, origin) {
            ctx.split(direct, to, v);
        }
    }
    ctx.split(Sreg::ProgramBank, to, Some(bank(to) as u32));
    for reg in STRAIGHT {
        let v = ctx.get(reg, from);
        ctx.split(reg, to, v);
    }
    debug!(from, to, "context propagated");
}

/// Plain copy of every register, the program bank following `to`.
pub fn copy_context(ctx: &mut ContextStore, from: Ea, to: Ea) {
    for reg in [Sreg::M, Sreg::X].into_iter().chain(STRAIGHT) {
        let v = ctx.get(reg, from);
        ctx.split(reg, to, v);
    }
    ctx.split(Sreg::ProgramBank, to, Some(bank(to) as u32));
}

/// Copies the width flags and their shadows valid at `from` to `to`.
pub fn copy_flags(ctx: &mut ContextStore, from: Ea, to: Ea) {
    for (direct, origin) in WIDTH_FLAGS {
        let v = ctx.get(direct, from);
        ctx.split(direct, to, v);
        let v = ctx.get(origin, from);
        ctx.split(origin, to, v);
    }
}

/// Carries a width change a routine leaves behind to the instruction after
/// the call. Only the routine's entry and last instructions are consulted,
/// so routines with several exits are approximated by their last one.
/// Returns the flags that were written.
pub fn correct_after_return<D: Decoder>(
    ctx: &mut ContextStore,
    dec: &D,
    call: &Instruction,
    func: &Function,
    bracket_scan: usize,
) -> Vec<(Sreg, u32)> {
    let mut written = Vec::new();
    if !func.has_body() || stack::is_self_restoring(dec, func, bracket_scan) {
        return written;
    }
    let Some(first) = dec.decode(func.start) else {
        return written;
    };
    let Some(last) = dec.decode_prev(func.end) else {
        return written;
    };
    let before_last = dec.decode_prev(last.ea).filter(|i| i.ea >= func.start);

    for (reg, _) in WIDTH_FLAGS {
        let pre = ctx.get(reg, call.ea);
        let near_start = ctx.get(reg, first.end());
        let near_end = ctx
            .get(reg, last.ea)
            .or_else(|| before_last.as_ref().and_then(|i| ctx.get(reg, i.ea)));
        let Some(exit) = near_end else { continue };
        if near_start != near_end && near_end != pre {
            ctx.split(reg, call.end(), Some(exit));
            written.push((reg, exit));
        }
    }
    if !written.is_empty() {
        debug!(call = call.ea, func = func.start, ?written, "return leaves mode changed");
    }
    written
}
