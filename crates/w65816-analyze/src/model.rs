use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use w65816_rs::{AnalysisConfig, CopTable, Ea, Instruction, Memory};

#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub base: Ea,
    pub bytes: Vec<u8>,
    pub perms: &'static str,
    pub kind: &'static str,
}

impl Segment {
    pub fn end(&self) -> Ea {
        self.base.wrapping_add(self.bytes.len() as Ea)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Image {
    pub segments: Vec<Segment>,
}

impl Memory for Image {
    fn read_u8(&self, addr: Ea) -> Option<u8> {
        self.segments
            .iter()
            .find(|s| addr >= s.base && addr < s.end())
            .map(|s| s.bytes[(addr - s.base) as usize])
    }
}

pub fn load_raw_bin(path: &Path, base: Ea, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(
        (base as u64) + (payload.len() as u64) <= 0x100_0000,
        "image does not fit the 24-bit address space"
    );
    let seg = Segment {
        name: "rom".into(),
        base,
        bytes: payload.to_vec(),
        perms: "r-x",
        kind: "raw",
    };
    Ok(Image { segments: vec![seg] })
}

/// A routine known up front, with its extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub start: Ea,
    pub end: Ea,
    #[serde(default)]
    pub noreturn: bool,
}

/// Pre-decoded program: what a host disassembler hands over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingFile {
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let txt = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))
}

pub fn load_listing(path: &Path) -> Result<ListingFile> {
    read_json(path)
}

pub fn load_cop_defs(path: &Path) -> Result<CopTable> {
    read_json(path)
}

pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => read_json(p),
        None => Ok(AnalysisConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loader_maps_skip_and_len() {
        let path = std::env::temp_dir().join("_w65816_loader_test.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5]).unwrap();
        let img = load_raw_bin(&path, 0x80_8000, 2, Some(3)).unwrap();
        assert_eq!(img.segments.len(), 1);
        let s = &img.segments[0];
        assert_eq!(s.base, 0x80_8000);
        assert_eq!(s.bytes, vec![2, 3, 4]);
        assert_eq!(img.read_u16(0x80_8000), Some(0x0302));
        assert_eq!(img.read_u16(0x80_8002), None);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn listing_functions_default_to_returning() {
        let json = r#"{
            "instructions": [{ "ea": 32768, "size": 1, "mnem": "rts" }],
            "functions": [{ "start": 32768, "end": 32769 }]
        }"#;
        let listing: ListingFile = serde_json::from_str(json).unwrap();
        assert_eq!(listing.instructions.len(), 1);
        assert!(!listing.functions[0].noreturn);
    }
}
