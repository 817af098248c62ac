use tracing::debug;

use crate::context::{ContextStore, Sreg};
use crate::decoder::Instruction;
use crate::instructions::{Mnemonic, OP_CLC, OP_SEC};
use crate::memory::Memory;

pub const M_BIT: u8 = 0x20;
pub const X_BIT: u8 = 0x10;

/// `REP`/`SEP`: writes the width flags selected by the mask byte after the
/// instruction, with the origin shadows set to the opposite value. Flags
/// outside the mask keep their ranges. Returns the mask that was applied.
pub fn switch_width<M: Memory>(ctx: &mut ContextStore, mem: &M, insn: &Instruction) -> Option<u8> {
    let mask = mem.read_u8(insn.ea.wrapping_add(1))?;
    let val = match insn.mnem {
        Mnemonic::Sep => 1,
        Mnemonic::Rep => 0,
        _ => return None,
    };
    let at = insn.end();
    for (bit, direct, origin) in [(M_BIT, Sreg::M, Sreg::OriginM), (X_BIT, Sreg::X, Sreg::OriginX)] {
        if mask & bit != 0 {
            ctx.split(direct, at, Some(val));
            ctx.split(origin, at, Some(val ^ 1));
        }
    }
    debug!(ea = insn.ea, mask, set = val == 1, "width switch");
    Some(mask)
}

/// `XCE`: only the `CLC; XCE` and `SEC; XCE` idioms are understood, judged
/// by the byte right before the instruction.
pub fn switch_emulation<M: Memory>(ctx: &mut ContextStore, mem: &M, insn: &Instruction) -> Option<u32> {
    let prev = mem.read_u8(insn.ea.checked_sub(1)?)?;
    let e = match prev {
        OP_CLC => 0,
        OP_SEC => 1,
        _ => return None,
    };
    ctx.split(Sreg::E, insn.end(), Some(e));
    debug!(ea = insn.ea, e, "emulation switch");
    Some(e)
}
