use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::Sreg;

/// Longest distance, in bytes, between a jump-table entry and its target.
pub const MAX_TABLE_SPAN: u32 = 0x1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_table_span: u32,
    /// Instructions searched backwards for the value a pull restores.
    pub backtrack_limit: usize,
    /// Instructions searched backwards from a PLP for its PHP.
    pub status_scan_limit: usize,
    /// Instructions inspected at each end of a callee for a PHP/PLP bracket.
    pub bracket_scan: usize,
    pub mirror_low_ram: bool,
    /// Register values assumed at every analysis entry point.
    pub entry_context: BTreeMap<Sreg, u32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let entry_context = [
            (Sreg::E, 1),
            (Sreg::M, 1),
            (Sreg::X, 1),
            (Sreg::DirectPage, 0),
            (Sreg::DataBank, 0),
            (Sreg::DataSelector, 0),
        ]
        .into_iter()
        .collect();
        Self {
            max_table_span: MAX_TABLE_SPAN,
            backtrack_limit: 16,
            status_scan_limit: 32,
            bracket_scan: 4,
            mirror_low_ram: true,
            entry_context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str(r#"{ "max_table_span": 256 }"#).unwrap();
        assert_eq!(cfg.max_table_span, 256);
        assert_eq!(cfg.bracket_scan, 4);
        assert_eq!(cfg.entry_context.get(&Sreg::M), Some(&1));
    }
}
