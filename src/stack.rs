//! Recovering context restored through the hardware stack.
//!
//! All searches are bounded linear walks backwards by address through the
//! host decoder. A walk does not check that the push it finds belongs to the
//! same basic block or call frame as the pull it started from, so irregular
//! flow (a pull reached from two paths, two PLPs sharing one PHP) can pick
//! up the wrong push.

use tracing::debug;

use crate::address::{program_bank, Ea};
use crate::context::{ContextStore, Sreg};
use crate::database::Function;
use crate::decoder::{Decoder, Instruction, OperandKind};
use crate::instructions::Mnemonic;
use crate::propagate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtKind {
    /// Value last pushed onto the stack.
    Stack,
    /// Value last moved into the direct-page register.
    DirectPage,
}

fn width_mask(width: u8) -> u32 {
    match width {
        1 => 0xFF,
        2 => 0xFFFF,
        _ => 0xFF_FFFF,
    }
}

fn immediate(insn: &Instruction) -> Option<u32> {
    match insn.op(0).kind {
        OperandKind::Imm { value } => Some(value),
        OperandKind::Mem { addr } => Some(addr),
        _ => None,
    }
}

/// Immediate value loaded into the register `push` stores, when the
/// instruction right before it is an immediate load of that register.
fn loaded_immediate<D: Decoder>(dec: &D, push: &Instruction) -> Option<u32> {
    let load = match push.mnem {
        Mnemonic::Pha | Mnemonic::Tcd => Mnemonic::Lda,
        Mnemonic::Phx => Mnemonic::Ldx,
        Mnemonic::Phy => Mnemonic::Ldy,
        _ => return None,
    };
    let prev = dec.decode_prev(push.ea)?;
    if prev.mnem != load {
        return None;
    }
    match prev.op(0).kind {
        OperandKind::Imm { value } => Some(value),
        _ => None,
    }
}

/// Most recent value of kind `kind` before `ea`, truncated to `width` bytes.
/// Gives up after `limit` instructions, at a control transfer, or at a
/// stack operation it can not account for.
pub fn backtrack_value<D: Decoder>(
    dec: &D,
    ctx: &ContextStore,
    ea: Ea,
    width: u8,
    kind: BtKind,
    limit: usize,
) -> Option<u32> {
    let mask = width_mask(width);
    let mut cur = ea;
    for _ in 0..limit {
        let prev = dec.decode_prev(cur)?;
        let found = match (kind, prev.mnem) {
            (BtKind::Stack, Mnemonic::Phk) => Some(program_bank(ctx, &prev) as u32),
            (BtKind::Stack, Mnemonic::Phb) => ctx.get(Sreg::DataBank, prev.ea),
            (BtKind::Stack, Mnemonic::Phd) => ctx.get(Sreg::DirectPage, prev.ea),
            (BtKind::Stack, Mnemonic::Pea) => immediate(&prev),
            (BtKind::Stack, Mnemonic::Pha | Mnemonic::Phx | Mnemonic::Phy) => {
                loaded_immediate(dec, &prev)
            }
            (BtKind::DirectPage, Mnemonic::Tcd) => loaded_immediate(dec, &prev),
            (BtKind::DirectPage, Mnemonic::Pld) => {
                backtrack_value(dec, ctx, prev.ea, 2, BtKind::Stack, limit)
            }
            (BtKind::Stack, m) if m.touches_stack() => return None,
            (_, m) if m.transfers_control() => return None,
            _ => {
                cur = prev.ea;
                continue;
            }
        };
        return found.map(|v| v & mask);
    }
    None
}

/// Address of the nearest `mnem` before `ea`, within `limit` instructions.
pub fn prev_insn<D: Decoder>(dec: &D, ea: Ea, mnem: Mnemonic, limit: usize) -> Option<Ea> {
    let mut cur = ea;
    for _ in 0..limit {
        let prev = dec.decode_prev(cur)?;
        if prev.mnem == mnem {
            return Some(prev.ea);
        }
        cur = prev.ea;
    }
    None
}

/// A routine that saves the status register within its first `scan`
/// instructions and restores it within its last `scan`.
pub fn is_self_restoring<D: Decoder>(dec: &D, func: &Function, scan: usize) -> bool {
    let mut pushes = false;
    let mut cur = func.start;
    for _ in 0..scan {
        let Some(insn) = dec.decode(cur) else { break };
        if insn.mnem == Mnemonic::Php {
            pushes = true;
            break;
        }
        cur = insn.end();
        if cur >= func.end {
            break;
        }
    }
    if !pushes {
        return false;
    }

    let mut cur = func.end;
    for _ in 0..scan {
        let Some(insn) = dec.decode_prev(cur) else { break };
        if insn.ea < func.start {
            break;
        }
        if insn.mnem == Mnemonic::Plp {
            return true;
        }
        cur = insn.ea;
    }
    false
}

/// `PLB`: the pulled byte becomes the data bank after the instruction.
pub fn pull_bank<D: Decoder>(ctx: &mut ContextStore, dec: &D, insn: &Instruction, limit: usize) -> Option<u32> {
    let val = backtrack_value(dec, ctx, insn.ea, 1, BtKind::Stack, limit)?;
    ctx.split(Sreg::DataBank, insn.end(), Some(val));
    ctx.split(Sreg::DataSelector, insn.end(), Some(val << 12));
    debug!(ea = insn.ea, bank = val, "data bank restored from stack");
    Some(val)
}

/// `PLD`: the pulled word becomes the direct-page base. When the push can
/// not be found the base is unknown from here on.
pub fn pull_direct_page<D: Decoder>(
    ctx: &mut ContextStore,
    dec: &D,
    insn: &Instruction,
    limit: usize,
) -> Option<u32> {
    let val = backtrack_value(dec, ctx, insn.ea, 2, BtKind::Stack, limit);
    ctx.split(Sreg::DirectPage, insn.end(), val);
    debug!(ea = insn.ea, dp = ?val, "direct page restored from stack");
    val
}

/// `TCD`: known only after an immediate load of the accumulator, unknown
/// otherwise.
pub fn transfer_direct_page<D: Decoder>(
    ctx: &mut ContextStore,
    dec: &D,
    insn: &Instruction,
    limit: usize,
) -> Option<u32> {
    let val = backtrack_value(dec, ctx, insn.end(), 2, BtKind::DirectPage, limit);
    ctx.split(Sreg::DirectPage, insn.end(), val);
    debug!(ea = insn.ea, dp = ?val, "direct page set from accumulator");
    val
}

/// `PLP`: width flags come back as they were at the nearest `PHP`.
pub fn pull_status<D: Decoder>(
    ctx: &mut ContextStore,
    dec: &D,
    insn: &Instruction,
    limit: usize,
) -> Option<Ea> {
    let php = prev_insn(dec, insn.ea, Mnemonic::Php, limit)?;
    propagate::copy_flags(ctx, php, insn.end());
    debug!(ea = insn.ea, php, "status restored");
    Some(php)
}
