use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;
use tracing::{debug, info};

use w65816_rs::{
    Analyzer, ContextStore, Decoder, Ea, Function, InsnReport, JumpTable, ListingDecoder, Memory, Sreg,
    SregRange, Xref, XrefDb,
};

use crate::model::ListingFile;

/// Result of walking control flow from a set of entry points.
#[derive(Debug, Clone, Default)]
pub struct Walk {
    pub visited: BTreeSet<Ea>,
    pub reports: BTreeMap<Ea, InsnReport>,
    /// Listing addresses reached by an edge but missing from the listing.
    pub missing: BTreeSet<Ea>,
}

/// Builds the host side of an analysis from a listing: decoder plus a
/// database that knows the listed functions and which bytes are code.
/// `COP` expansion runs here so that locked extents cover the arguments.
pub fn prepare<M: Memory>(analyzer: &Analyzer, mem: &M, file: &ListingFile) -> (ListingDecoder, XrefDb) {
    let mut listing = ListingDecoder::new();
    let mut expanded = 0usize;
    for insn in &file.instructions {
        let mut insn = insn.clone();
        if analyzer.prepare(mem, &mut insn) {
            expanded += 1;
        }
        listing.insert(insn);
    }
    let mut db = XrefDb::new();
    for insn in listing.iter() {
        db.lock(insn.ea, insn.end());
    }
    for f in &file.functions {
        db.define_func(f.start, f.end);
        if f.noreturn {
            db.set_noreturn(f.start);
        }
    }
    debug!(insns = listing.len(), expanded, functions = file.functions.len(), "listing prepared");
    (listing, db)
}

/// Breadth-first walk over code references, analyzing each reachable
/// instruction once.
pub fn analyze_entries<M: Memory>(
    analyzer: &mut Analyzer,
    mem: &M,
    listing: &ListingDecoder,
    db: &mut XrefDb,
    entries: &[Ea],
    max_instr: usize,
) -> Walk {
    let mut walk = Walk::default();
    let mut queue: VecDeque<Ea> = VecDeque::new();
    for &e in entries {
        analyzer.seed_entry(e);
        queue.push_back(e);
    }
    while let Some(pc) = queue.pop_front() {
        if walk.visited.len() >= max_instr {
            info!(max_instr, "instruction limit reached");
            break;
        }
        if walk.visited.contains(&pc) {
            continue;
        }
        let Some(insn) = listing.decode(pc) else {
            walk.missing.insert(pc);
            continue;
        };
        walk.visited.insert(pc);
        let report = analyzer.analyze(mem, listing, db, &insn);
        for (to, _) in db.crefs_from(pc) {
            if !walk.visited.contains(&to) {
                queue.push_back(to);
            }
        }
        walk.reports.insert(pc, report);
    }
    walk
}

#[derive(Debug, Clone, Serialize)]
pub struct JumpTableOut {
    pub ea: Ea,
    #[serde(flatten)]
    pub table: JumpTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub entries: Vec<Ea>,
    pub instructions: usize,
    pub missing: Vec<Ea>,
    pub indirect: Vec<Ea>,
    pub xrefs: Vec<Xref>,
    pub functions: Vec<Function>,
    pub jump_tables: Vec<JumpTableOut>,
    pub context: BTreeMap<&'static str, Vec<SregRange>>,
}

impl Report {
    pub fn new(entries: &[Ea], walk: &Walk, db: &XrefDb, ctx: &ContextStore) -> Self {
        let indirect = walk.reports.iter().filter(|(_, r)| r.indirect).map(|(&ea, _)| ea).collect();
        let jump_tables = walk
            .reports
            .iter()
            .filter_map(|(&ea, r)| r.jump_table.clone().map(|table| JumpTableOut { ea, table }))
            .collect();
        let context = Sreg::ALL
            .iter()
            .map(|&reg| (reg.name(), ctx.ranges(reg)))
            .filter(|(_, ranges)| !ranges.is_empty())
            .collect();
        Self {
            entries: entries.to_vec(),
            instructions: walk.visited.len(),
            missing: walk.missing.iter().copied().collect(),
            indirect,
            xrefs: db.xrefs.iter().copied().collect(),
            functions: db.functions.values().copied().collect(),
            jump_tables,
            context,
        }
    }
}
