use serde::{Deserialize, Serialize};

use crate::address::Ea;
use crate::instructions::{Feature, Mnemonic};

pub const MAX_OPERANDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    #[default]
    Byte,
    Word,
    /// 4-byte tag; on extended operands it marks an already-long address.
    Dword,
}

impl Dtype {
    pub fn size(self) -> u32 {
        match self {
            Dtype::Byte => 1,
            Dtype::Word => 2,
            Dtype::Dword => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reg {
    A,
    X,
    Y,
    S,
    D,
    B,
    K,
    P,
}

/// Addressing sub-mode of a displacement operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplMode {
    /// `dp`
    Dp,
    /// `dp,X`
    DpX,
    /// `dp,Y`
    DpY,
    /// `(dp,X)`
    DpXInd,
    /// `(dp)`
    DpInd,
    /// `[dp]`
    DpIndLong,
    /// `(dp),Y`
    DpIndY,
    /// `[dp],Y`
    DpIndLongY,
    /// `(abs)`
    AbsInd,
    /// `abs,X`
    AbsX,
    /// `abs,Y`
    AbsY,
    /// `[abs]`
    AbsIndLong,
    /// `(abs,X)`
    AbsXInd,
    /// `long,X`
    AbsLongX,
    /// `sr,S`
    StackRel,
    /// `(sr,S),Y`
    StackRelIndY,
}

impl DisplMode {
    pub fn is_direct_page(self) -> bool {
        matches!(
            self,
            DisplMode::Dp
                | DisplMode::DpX
                | DisplMode::DpY
                | DisplMode::DpXInd
                | DisplMode::DpInd
                | DisplMode::DpIndLong
                | DisplMode::DpIndY
                | DisplMode::DpIndLongY
        )
    }

    /// Modes a jump goes through memory for.
    pub fn is_indirect_transfer(self) -> bool {
        matches!(self, DisplMode::AbsInd | DisplMode::AbsIndLong | DisplMode::AbsXInd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    #[default]
    Void,
    Reg(Reg),
    Imm { value: u32 },
    Displ { mode: DisplMode, addr: u32 },
    /// Absolute data operand, bank-relative.
    Mem { addr: u32 },
    /// Long data operand.
    MemFar { addr: u32 },
    /// Code target in the current program bank.
    Near { addr: u32 },
    /// Long code target.
    Far { addr: u32 },
    /// Argument slot produced by COP expansion.
    Cop { addr: u32, value: u32, is_code: bool },
    /// Processor-specific kind the analysis does not know about.
    Special { tag: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    #[serde(default)]
    pub dtype: Dtype,
    /// Byte offset of the encoded value inside the instruction.
    #[serde(default)]
    pub offb: u8,
}

impl Operand {
    pub const VOID: Operand = Operand {
        kind: OperandKind::Void,
        dtype: Dtype::Byte,
        offb: 0,
    };

    pub fn new(kind: OperandKind, dtype: Dtype, offb: u8) -> Self {
        Self { kind, dtype, offb }
    }

    pub fn imm(value: u32, dtype: Dtype) -> Self {
        Self::new(OperandKind::Imm { value }, dtype, 1)
    }

    pub fn displ(mode: DisplMode, addr: u32, dtype: Dtype) -> Self {
        Self::new(OperandKind::Displ { mode, addr }, dtype, 1)
    }

    pub fn mem(addr: u32, dtype: Dtype) -> Self {
        Self::new(OperandKind::Mem { addr }, dtype, 1)
    }

    pub fn near(addr: u32) -> Self {
        Self::new(OperandKind::Near { addr }, Dtype::Word, 1)
    }

    pub fn far(addr: u32) -> Self {
        Self::new(OperandKind::Far { addr }, Dtype::Dword, 1)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, OperandKind::Void)
    }
}

/// A decoded instruction as handed over by the host decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub ea: Ea,
    pub size: u8,
    pub mnem: Mnemonic,
    #[serde(default)]
    pub ops: Vec<Operand>,
    /// Operand usage bitmap and flow bits; empty means "take the mnemonic's".
    #[serde(default)]
    pub features: Feature,
}

impl Instruction {
    pub fn new(ea: Ea, size: u8, mnem: Mnemonic, ops: Vec<Operand>) -> Self {
        Self {
            ea,
            size,
            mnem,
            ops,
            features: mnem.features(),
        }
    }

    /// Operand slot `n`; slots past the end read as void.
    pub fn op(&self, n: usize) -> &Operand {
        self.ops.get(n).unwrap_or(&Operand::VOID)
    }

    /// Address right after the instruction.
    pub fn end(&self) -> Ea {
        self.ea.wrapping_add(self.size as Ea)
    }

    /// Features in effect: the host's, or the mnemonic's canonical set when
    /// the host left them empty.
    pub fn effective_features(&self) -> Feature {
        if self.features.is_empty() {
            self.mnem.features()
        } else {
            self.features
        }
    }

    /// Whether execution continues at `end()` once the instruction completes.
    pub fn falls_through(&self) -> bool {
        !self.effective_features().contains(Feature::STOP)
    }

    /// Fills in the canonical features when the host left them empty.
    pub fn normalize(&mut self) {
        self.features = self.effective_features();
    }

    /// Direct target of a jump or call operand in slot 0.
    pub fn full_target(&self) -> Option<u32> {
        match self.op(0).kind {
            OperandKind::Near { addr } | OperandKind::Far { addr } => Some(addr),
            _ => None,
        }
    }
}

/// Host-side instruction decoder.
pub trait Decoder {
    fn decode(&self, ea: Ea) -> Option<Instruction>;
    /// Instruction ending exactly at `ea`.
    fn decode_prev(&self, ea: Ea) -> Option<Instruction>;
}
