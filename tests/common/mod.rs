#![allow(dead_code)]

use w65816_rs::{
    AnalysisConfig, Analyzer, Decoder, Ea, InsnReport, Instruction, LinearMemory, ListingDecoder, Mnemonic,
    Operand, XrefDb,
};

pub const BANK: Ea = 0x80_0000;

/// A bank of zeroed ROM with a hand-written listing on top.
pub struct Rig {
    pub mem: LinearMemory,
    pub listing: ListingDecoder,
    pub db: XrefDb,
    pub an: Analyzer,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(cfg: AnalysisConfig) -> Self {
        Self {
            mem: LinearMemory::with_bytes(BANK, vec![0; 0x1_0000]),
            listing: ListingDecoder::new(),
            db: XrefDb::new(),
            an: Analyzer::new(cfg),
        }
    }

    /// Stores `bytes` at `ea` and lists them as one instruction. Returns the
    /// address of the next instruction.
    pub fn put(&mut self, ea: Ea, bytes: &[u8], mnem: Mnemonic, ops: Vec<Operand>) -> Ea {
        assert!(self.mem.store(ea, bytes), "{ea:#08x} outside the rig");
        let mut insn = Instruction::new(ea, bytes.len() as u8, mnem, ops);
        self.an.prepare(&self.mem, &mut insn);
        let end = insn.end();
        self.listing.insert(insn);
        end
    }

    pub fn run(&mut self, ea: Ea) -> InsnReport {
        let insn = self.listing.decode(ea).expect("instruction is listed");
        self.an.analyze(&self.mem, &self.listing, &mut self.db, &insn)
    }

    /// Analyzes every listed instruction once, in address order.
    pub fn run_all(&mut self) -> Vec<InsnReport> {
        let eas: Vec<Ea> = self.listing.iter().map(|i| i.ea).collect();
        eas.into_iter().map(|ea| self.run(ea)).collect()
    }
}
