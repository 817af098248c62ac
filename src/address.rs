use crate::context::{ContextStore, Sreg};
use crate::decoder::Instruction;

/// Flat analysis address: `bank << 16 | offset`.
pub type Ea = u32;

pub const ADDR_MASK: Ea = 0x00FF_FFFF;

/// Start of the work-RAM bank that the low 8K of system banks mirrors.
pub const WRAM_BASE: Ea = 0x7E_0000;
const LOW_RAM_SIZE: u16 = 0x2000;

#[inline]
pub fn bank(ea: Ea) -> u8 {
    ((ea >> 16) & 0xFF) as u8
}

#[inline]
pub fn offset(ea: Ea) -> u16 {
    (ea & 0xFFFF) as u16
}

#[inline]
pub fn join(bank: u8, offset: u16) -> Ea {
    ((bank as Ea) << 16) | offset as Ea
}

/// `base + disp` inside bank 0; the sum wraps at the bank edge instead of
/// carrying into the bank byte.
#[inline]
pub fn direct_page_address(base: u32, disp: u32) -> Ea {
    join(0, (base.wrapping_add(disp) & 0xFFFF) as u16)
}

/// Maps raw 24-bit addresses onto the canonical analysis address space.
#[derive(Debug, Clone, Copy)]
pub struct AddressTranslator {
    pub mirror_low_ram: bool,
}

impl Default for AddressTranslator {
    fn default() -> Self {
        Self {
            mirror_low_ram: true,
        }
    }
}

impl AddressTranslator {
    pub fn new(mirror_low_ram: bool) -> Self {
        Self { mirror_low_ram }
    }

    /// Drops anything above bit 23 and folds the low-RAM mirrors of system
    /// banks (`00-3F`, `80-BF`, offsets `0000-1FFF`) onto bank `7E`.
    pub fn xlat(&self, ea: Ea) -> Ea {
        let ea = ea & ADDR_MASK;
        if !self.mirror_low_ram {
            return ea;
        }
        let b = bank(ea);
        let system_bank = b <= 0x3F || (0x80..=0xBF).contains(&b);
        if system_bank && offset(ea) < LOW_RAM_SIZE {
            WRAM_BASE | offset(ea) as Ea
        } else {
            ea
        }
    }
}

/// Bank the instruction executes from: the tracked program bank when known,
/// otherwise the bank of its own address.
pub fn program_bank(ctx: &ContextStore, insn: &Instruction) -> u8 {
    ctx.get(Sreg::ProgramBank, insn.ea)
        .map(|pb| pb as u8)
        .unwrap_or_else(|| bank(insn.ea))
}

/// Resolves a 16-bit code operand in the instruction's program bank.
pub fn map_code_ea(ctx: &ContextStore, insn: &Instruction, addr: u32) -> Ea {
    join(program_bank(ctx, insn), (addr & 0xFFFF) as u16)
}

/// Resolves a data operand against the data bank in effect at the
/// instruction. Long (24-bit) operands pass through untouched.
pub fn map_data_ea(ctx: &ContextStore, insn: &Instruction, addr: u32) -> Ea {
    if addr > 0xFFFF {
        return addr & ADDR_MASK;
    }
    if let Some(sel) = ctx.get(Sreg::DataSelector, insn.ea) {
        return (sel << 4).wrapping_add(addr) & ADDR_MASK;
    }
    let db = ctx
        .get(Sreg::DataBank, insn.ea)
        .map(|b| b as u8)
        .unwrap_or_else(|| program_bank(ctx, insn));
    join(db, addr as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Instruction;
    use crate::instructions::Mnemonic;

    #[test]
    fn low_ram_mirrors_fold_to_wram() {
        let t = AddressTranslator::default();
        assert_eq!(t.xlat(0x00_0010), 0x7E_0010);
        assert_eq!(t.xlat(0x81_1FFF), 0x7E_1FFF);
        assert_eq!(t.xlat(0x80_2000), 0x80_2000);
        assert_eq!(t.xlat(0x40_0010), 0x40_0010);
        assert_eq!(t.xlat(0x0180_8000), 0x80_8000);
        assert_eq!(AddressTranslator::new(false).xlat(0x00_0010), 0x00_0010);
    }

    #[test]
    fn direct_page_wraps_in_bank_zero() {
        assert_eq!(direct_page_address(0xFFF0, 0x20), 0x00_0010);
        assert_eq!(direct_page_address(0x0100, 0x12), 0x00_0112);
    }

    #[test]
    fn data_mapping_prefers_selector_then_bank() {
        let insn = Instruction::new(0x80_8000, 3, Mnemonic::Lda, vec![]);
        let mut ctx = ContextStore::default();
        assert_eq!(map_data_ea(&ctx, &insn, 0x1234), 0x80_1234);
        ctx.split(Sreg::DataBank, 0x80_0000, Some(0x7F));
        assert_eq!(map_data_ea(&ctx, &insn, 0x1234), 0x7F_1234);
        ctx.split(Sreg::DataSelector, 0x80_0000, Some(0x7E << 12));
        assert_eq!(map_data_ea(&ctx, &insn, 0x1234), 0x7E_1234);
        assert_eq!(map_data_ea(&ctx, &insn, 0xC0_1234), 0xC0_1234);
    }
}
