mod common;

use common::{Rig, BANK};
use pretty_assertions::assert_eq;
use w65816_rs::{Dtype, Mnemonic, Operand, Sreg, SregRange};

fn sep(rig: &mut Rig, ea: u32, mask: u8) -> u32 {
    rig.put(ea, &[0xE2, mask], Mnemonic::Sep, vec![Operand::imm(mask as u32, Dtype::Byte)])
}

fn rep(rig: &mut Rig, ea: u32, mask: u8) -> u32 {
    rig.put(ea, &[0xC2, mask], Mnemonic::Rep, vec![Operand::imm(mask as u32, Dtype::Byte)])
}

#[test]
fn set_both_then_reset_accumulator() {
    let mut rig = Rig::new();
    let first = BANK | 0x8000;
    let second = sep(&mut rig, first, 0x30);
    let after = rep(&mut rig, second, 0x20);
    rig.run_all();

    assert_eq!(rig.an.ctx.get(Sreg::M, second), Some(1));
    assert_eq!(rig.an.ctx.get(Sreg::X, second), Some(1));
    assert_eq!(rig.an.ctx.get(Sreg::M, after), Some(0));
    assert_eq!(rig.an.ctx.get(Sreg::X, after), Some(1));
    assert_eq!(rig.an.ctx.get(Sreg::OriginM, after), Some(1));
    assert_eq!(rig.an.ctx.get(Sreg::OriginX, after), Some(0));
    assert_eq!(rig.an.ctx.get(Sreg::M, first), None);
}

#[test]
fn rerunning_a_switch_does_not_duplicate_ranges() {
    let mut rig = Rig::new();
    let ea = BANK | 0x8000;
    let next = sep(&mut rig, ea, 0x20);
    rig.run(ea);
    let once = rig.an.ctx.ranges(Sreg::M);
    rig.run(ea);
    assert_eq!(rig.an.ctx.ranges(Sreg::M), once);
    assert_eq!(once, vec![SregRange { start: next, end: None, value: Some(1) }]);
}

#[test]
fn mask_without_width_bits_touches_nothing() {
    let mut rig = Rig::new();
    let ea = BANK | 0x8000;
    rep(&mut rig, ea, 0x01);
    rig.run(ea);
    assert!(rig.an.ctx.ranges(Sreg::M).is_empty());
    assert!(rig.an.ctx.ranges(Sreg::X).is_empty());
}

#[test]
fn clc_xce_enters_native_mode() {
    let mut rig = Rig::new();
    let clc = BANK | 0x8000;
    let xce = rig.put(clc, &[0x18], Mnemonic::Clc, vec![]);
    let after = rig.put(xce, &[0xFB], Mnemonic::Xce, vec![]);
    rig.run_all();
    assert_eq!(rig.an.ctx.get(Sreg::E, after), Some(0));
}

#[test]
fn sec_xce_enters_emulation_mode() {
    let mut rig = Rig::new();
    let sec = BANK | 0x8000;
    let xce = rig.put(sec, &[0x38], Mnemonic::Sec, vec![]);
    let after = rig.put(xce, &[0xFB], Mnemonic::Xce, vec![]);
    rig.run_all();
    assert_eq!(rig.an.ctx.get(Sreg::E, after), Some(1));
}

#[test]
fn xce_after_anything_else_is_unknown_territory() {
    let mut rig = Rig::new();
    let nop = BANK | 0x8000;
    let xce = rig.put(nop, &[0xEA], Mnemonic::Nop, vec![]);
    rig.put(xce, &[0xFB], Mnemonic::Xce, vec![]);
    rig.run_all();
    assert!(rig.an.ctx.ranges(Sreg::E).is_empty());
}
