use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Ea;
use crate::decoder::{Decoder, Instruction};

/// [`Decoder`] over instructions decoded ahead of time, keyed by address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Instruction>", into = "Vec<Instruction>")]
pub struct ListingDecoder {
    insns: BTreeMap<Ea, Instruction>,
}

impl ListingDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut insn: Instruction) {
        insn.normalize();
        self.insns.insert(insn.ea, insn);
    }

    pub fn get(&self, ea: Ea) -> Option<&Instruction> {
        self.insns.get(&ea)
    }

    pub fn get_mut(&mut self, ea: Ea) -> Option<&mut Instruction> {
        self.insns.get_mut(&ea)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.insns.values()
    }

    pub fn first(&self) -> Option<Ea> {
        self.insns.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }
}

impl From<Vec<Instruction>> for ListingDecoder {
    fn from(v: Vec<Instruction>) -> Self {
        let mut dec = Self::new();
        for insn in v {
            dec.insert(insn);
        }
        dec
    }
}

impl From<ListingDecoder> for Vec<Instruction> {
    fn from(dec: ListingDecoder) -> Self {
        dec.insns.into_values().collect()
    }
}

impl FromIterator<Instruction> for ListingDecoder {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        let mut dec = Self::new();
        for insn in iter {
            dec.insert(insn);
        }
        dec
    }
}

impl Decoder for ListingDecoder {
    fn decode(&self, ea: Ea) -> Option<Instruction> {
        self.insns.get(&ea).cloned()
    }

    fn decode_prev(&self, ea: Ea) -> Option<Instruction> {
        let (_, prev) = self.insns.range(..ea).next_back()?;
        (prev.end() == ea).then(|| prev.clone())
    }
}
