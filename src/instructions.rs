use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Canonical instruction features: operand usage bitmap plus flow bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Feature: u32 {
        const STOP = 1 << 0; // no fallthrough
        const CALL = 1 << 1;
        const JUMP = 1 << 2; // indirect transfer
        const USE1 = 1 << 8;
        const USE2 = 1 << 9;
        const USE3 = 1 << 10;
        const USE4 = 1 << 11;
        const USE5 = 1 << 12;
        const USE6 = 1 << 13;
        const USE7 = 1 << 14;
        const USE8 = 1 << 15;
        const CHG1 = 1 << 16;
        const CHG2 = 1 << 17;
        const CHG3 = 1 << 18;
        const CHG4 = 1 << 19;
        const CHG5 = 1 << 20;
        const CHG6 = 1 << 21;
        const CHG7 = 1 << 22;
        const CHG8 = 1 << 23;
    }
}

impl Feature {
    /// Slot `n` (0-based) is read.
    pub fn uses(n: usize) -> Feature {
        if n >= 8 {
            return Feature::empty();
        }
        Feature::from_bits_truncate(Feature::USE1.bits() << n)
    }

    /// Slot `n` (0-based) is written.
    pub fn changes(n: usize) -> Feature {
        if n >= 8 {
            return Feature::empty();
        }
        Feature::from_bits_truncate(Feature::CHG1.bits() << n)
    }
}

pub const OP_CLC: u8 = 0x18;
pub const OP_SEC: u8 = 0x38;
pub const OP_COP: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Bra, Brk, Brl, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cop, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny,
    Jml, Jmp, Jsl, Jsr, Lda, Ldx, Ldy, Lsr, Mvn, Mvp, Nop, Ora, Pea, Pei, Per,
    Pha, Phb, Phd, Phk, Php, Phx, Phy, Pla, Plb, Pld, Plp, Plx, Ply, Rep, Rol,
    Ror, Rti, Rtl, Rts, Sbc, Sec, Sed, Sei, Sep, Sta, Stp, Stx, Sty, Stz, Tax,
    Tay, Tcd, Tcs, Tdc, Trb, Tsb, Tsc, Tsx, Txa, Txs, Txy, Tya, Tyx, Wai, Wdm,
    Xba, Xce,
}

impl Mnemonic {
    pub fn features(self) -> Feature {
        use Mnemonic::*;
        let u1 = Feature::USE1;
        let c1 = Feature::CHG1;
        match self {
            Adc | And | Bit | Cmp | Cpx | Cpy | Eor | Lda | Ldx | Ldy | Ora | Sbc => u1,
            Pea | Pei | Per | Rep | Sep | Wdm => u1,
            Asl | Lsr | Rol | Ror | Dec | Inc | Trb | Tsb => u1 | c1,
            Sta | Stx | Sty | Stz => c1,
            Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs => u1,
            Bra | Brl => u1 | Feature::STOP,
            Jmp | Jml => u1 | Feature::STOP,
            Jsr | Jsl => u1 | Feature::CALL,
            Cop | Brk => u1,
            Mvn | Mvp => u1 | Feature::USE2,
            Rti | Rtl | Rts | Stp => Feature::STOP,
            _ => Feature::empty(),
        }
    }

    pub fn is_call(self) -> bool {
        self.features().contains(Feature::CALL)
    }

    /// Long-form transfers whose operand is already a full 24-bit address.
    pub fn is_long_transfer(self) -> bool {
        matches!(self, Mnemonic::Jml | Mnemonic::Jsl)
    }

    /// Instructions that push onto or pull from the hardware stack.
    pub fn touches_stack(self) -> bool {
        use Mnemonic::*;
        matches!(
            self,
            Pea | Pei | Per | Pha | Phb | Phd | Phk | Php | Phx | Phy | Pla | Plb | Pld | Plp
                | Plx | Ply | Jsr | Jsl | Rts | Rtl | Rti | Brk | Cop | Tcs | Txs
        )
    }

    /// Anything that leaves straight-line flow.
    pub fn transfers_control(self) -> bool {
        use Mnemonic::*;
        matches!(
            self,
            Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bra | Brl | Bvc | Bvs | Jmp | Jml | Jsr | Jsl
                | Rts | Rtl | Rti | Brk | Cop | Stp | Wai
        )
    }
}
