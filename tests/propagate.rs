mod common;

use common::{Rig, BANK};
use pretty_assertions::assert_eq;
use w65816_rs::propagate::{merge_flag, xfer_sregs, Merge};
use w65816_rs::{ContextStore, Dtype, Mnemonic, Operand, Sreg};

const FROM: u32 = 0x80_8300;
const TO: u32 = 0x81_9000;

fn flags(m: (u32, u32), origin: (u32, u32)) -> ContextStore {
    let mut ctx = ContextStore::new();
    ctx.split(Sreg::M, BANK | m.0, Some(m.1));
    ctx.split(Sreg::OriginM, BANK | origin.0, Some(origin.1));
    ctx
}

/// Runs the transfer and returns what was recorded for `M` at the target.
fn transfer(mut ctx: ContextStore) -> (Merge, Option<u32>) {
    let merge = merge_flag(&ctx, FROM, Sreg::M, Sreg::OriginM);
    xfer_sregs(&mut ctx, FROM, TO);
    let at_target = ctx.range(Sreg::M, TO).filter(|r| r.start == TO).map(|r| r.value);
    (merge, at_target.flatten())
}

#[test]
fn later_shadow_wins() {
    let (merge, got) = transfer(flags((0x8100, 1), (0x8200, 0)));
    assert_eq!(merge, Merge::Write(Some(0)));
    assert_eq!(got, Some(0));
}

#[test]
fn later_direct_wins() {
    let (merge, got) = transfer(flags((0x8200, 1), (0x8100, 0)));
    assert_eq!(merge, Merge::Write(Some(1)));
    assert_eq!(got, Some(1));
}

#[test]
fn same_start_agreeing_needs_no_write() {
    let ctx = flags((0x8100, 1), (0x8100, 1));
    let (merge, _) = transfer(ctx.clone());
    assert_eq!(merge, Merge::Keep);
    let mut after = ctx.clone();
    xfer_sregs(&mut after, FROM, TO);
    assert_eq!(after.ranges(Sreg::M), ctx.ranges(Sreg::M));
}

#[test]
fn same_start_disagreeing_prefers_set_shadow() {
    let (merge, got) = transfer(flags((0x8100, 0), (0x8100, 1)));
    assert_eq!(merge, Merge::Write(Some(1)));
    assert_eq!(got, Some(1));
}

#[test]
fn same_start_disagreeing_otherwise_takes_direct() {
    let (merge, got) = transfer(flags((0x8100, 1), (0x8100, 0)));
    assert_eq!(merge, Merge::Write(Some(1)));
    assert_eq!(got, Some(1));
}

#[test]
fn neither_known_writes_unknown() {
    let mut ctx = ContextStore::new();
    ctx.split(Sreg::M, TO - 0x10, Some(1));
    xfer_sregs(&mut ctx, FROM, TO);
    assert_eq!(ctx.get(Sreg::M, TO - 1), Some(1));
    assert_eq!(ctx.get(Sreg::M, TO), None);
    assert!(ctx.range(Sreg::M, TO).is_some_and(|r| r.start == TO));
}

#[test]
fn other_registers_copy_straight() {
    let mut ctx = ContextStore::new();
    ctx.split(Sreg::DataBank, BANK, Some(0x7E));
    ctx.split(Sreg::DataSelector, BANK, Some(0x7E << 12));
    ctx.split(Sreg::DirectPage, BANK, Some(0x0200));
    ctx.split(Sreg::E, BANK, Some(0));
    xfer_sregs(&mut ctx, FROM, TO);
    assert_eq!(ctx.get(Sreg::ProgramBank, TO), Some(0x81));
    assert_eq!(ctx.get(Sreg::DataBank, TO), Some(0x7E));
    assert_eq!(ctx.get(Sreg::DataSelector, TO), Some(0x7E << 12));
    assert_eq!(ctx.get(Sreg::DirectPage, TO), Some(0x0200));
    assert_eq!(ctx.get(Sreg::E, TO), Some(0));
}

/// `JSR` at 8000 to a routine at A000 that switches the accumulator to 16 bit
/// after its first instruction, optionally inside a `PHP`/`PLP` pair.
/// Returns the rig, the call and the address right after it.
fn call_rig(bracketed: bool) -> (Rig, u32, u32) {
    let mut rig = Rig::new();
    let call = BANK | 0x8000;
    let ret = rig.put(call, &[0x20, 0x00, 0xA0], Mnemonic::Jsr, vec![Operand::near(0xA000)]);
    rig.put(ret, &[0x60], Mnemonic::Rts, vec![]);

    let start = BANK | 0xA000;
    let first = if bracketed {
        rig.put(start, &[0x08], Mnemonic::Php, vec![])
    } else {
        rig.put(start, &[0xEA], Mnemonic::Nop, vec![])
    };
    let change = rig.put(first, &[0xC2, 0x20], Mnemonic::Rep, vec![Operand::imm(0x20, Dtype::Byte)]);
    let last = if bracketed {
        rig.put(change, &[0x28], Mnemonic::Plp, vec![])
    } else {
        change
    };
    let end = rig.put(last, &[0x60], Mnemonic::Rts, vec![]);
    rig.db.define_func(start, end);
    rig.an.seed_entry(call);
    (rig, call, ret)
}

#[test]
fn unbracketed_routine_corrects_after_return() {
    let (mut rig, call, ret) = call_rig(false);
    rig.run(call);
    rig.run(BANK | 0xA001);
    let report = rig.run(call);
    assert_eq!(report.return_fixups, vec![(Sreg::M, 0)]);
    assert_eq!(rig.an.ctx.get(Sreg::M, ret), Some(0));
    assert_eq!(rig.an.ctx.get(Sreg::X, ret), Some(1));
}

#[test]
fn bracketed_routine_leaves_return_alone() {
    let (mut rig, call, ret) = call_rig(true);
    rig.run(call);
    rig.run(BANK | 0xA001);
    let report = rig.run(call);
    assert_eq!(report.return_fixups, vec![]);
    assert_eq!(rig.an.ctx.get(Sreg::M, ret), Some(1));
}
