use serde::{Deserialize, Serialize};

use crate::address::Ea;

/// Read access to the host's memory image.
pub trait Memory {
    fn read_u8(&self, addr: Ea) -> Option<u8>;

    fn read_u16(&self, addr: Ea) -> Option<u16> {
        let lo = self.read_u8(addr)?;
        let hi = self.read_u8(addr.wrapping_add(1))?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    fn read_u24(&self, addr: Ea) -> Option<u32> {
        let lo = self.read_u16(addr)? as u32;
        let hi = self.read_u8(addr.wrapping_add(2))? as u32;
        Some(lo | (hi << 16))
    }

    fn is_mapped(&self, addr: Ea) -> bool {
        self.read_u8(addr).is_some()
    }
}

/// Contiguous bytes loaded at `base`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
    pub base: Ea,
}

impl LinearMemory {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0; size],
            base: 0,
        }
    }

    pub fn with_bytes(base: Ea, bytes: Vec<u8>) -> Self {
        Self { mem: bytes, base }
    }

    pub fn end(&self) -> Ea {
        self.base.wrapping_add(self.mem.len() as Ea)
    }

    fn index(&self, addr: Ea) -> Option<usize> {
        let off = addr.checked_sub(self.base)? as usize;
        (off < self.mem.len()).then_some(off)
    }

    /// Copies `bytes` in at `addr`; returns false if any byte falls outside.
    pub fn store(&mut self, addr: Ea, bytes: &[u8]) -> bool {
        let Some(off) = self.index(addr) else {
            return false;
        };
        if off + bytes.len() > self.mem.len() {
            return false;
        }
        self.mem[off..off + bytes.len()].copy_from_slice(bytes);
        true
    }

    pub fn store_u16(&mut self, addr: Ea, v: u16) -> bool {
        self.store(addr, &v.to_le_bytes())
    }
}

impl Memory for LinearMemory {
    fn read_u8(&self, addr: Ea) -> Option<u8> {
        self.index(addr).map(|off| self.mem[off])
    }
}

impl std::fmt::Debug for LinearMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearMemory")
            .field("base", &format_args!("{:#08x}", self.base))
            .field("len", &self.mem.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn based_reads_are_little_endian() {
        let mut mem = LinearMemory::new(8);
        mem.base = 0x80_8000;
        assert!(mem.store(0x80_8000, &[0x34, 0x12, 0x7E]));
        assert_eq!(mem.read_u16(0x80_8000), Some(0x1234));
        assert_eq!(mem.read_u24(0x80_8000), Some(0x7E_1234));
        assert_eq!(mem.read_u8(0x80_7FFF), None);
        assert_eq!(mem.read_u16(0x80_8007), None);
        assert!(!mem.store_u16(0x80_8007, 0));
    }
}
