use serde::Serialize;
use tracing::{debug, warn};

use crate::address::{bank, map_code_ea, AddressTranslator, Ea};
use crate::config::AnalysisConfig;
use crate::context::{ContextStore, Sreg};
use crate::cop::{self, CopTable};
use crate::database::{CrefKind, Database};
use crate::decoder::{Decoder, Instruction, OperandKind, MAX_OPERANDS};
use crate::instructions::{Feature, Mnemonic};
use crate::jumptable::JumpTable;
use crate::memory::Memory;
use crate::{modes, propagate, stack};

/// What one `analyze` call found out about its instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsnReport {
    pub flow: bool,
    /// Transfer through memory the analysis could not follow statically.
    pub indirect: bool,
    pub jump_table: Option<JumpTable>,
    /// Width flags corrected after a call returns.
    pub return_fixups: Vec<(Sreg, u32)>,
}

/// One analysis session: owns the accumulated context knowledge.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    pub ctx: ContextStore,
    pub cfg: AnalysisConfig,
    pub cop: CopTable,
}

/// State of a single `analyze` call.
pub(crate) struct Pass<'a, M, D, B> {
    pub(crate) ctx: &'a mut ContextStore,
    pub(crate) cfg: &'a AnalysisConfig,
    pub(crate) xlat: AddressTranslator,
    pub(crate) mem: &'a M,
    pub(crate) dec: &'a D,
    pub(crate) db: &'a mut B,
    pub(crate) insn: &'a Instruction,
    pub(crate) features: Feature,
    pub(crate) flow: bool,
    pub(crate) report: InsnReport,
}

impl Analyzer {
    pub fn new(cfg: AnalysisConfig) -> Self {
        Self {
            ctx: ContextStore::new(),
            cfg,
            cop: CopTable::default(),
        }
    }

    pub fn with_cop_table(mut self, cop: CopTable) -> Self {
        self.cop = cop;
        self
    }

    pub fn translator(&self) -> AddressTranslator {
        AddressTranslator::new(self.cfg.mirror_low_ram)
    }

    /// Applies the configured entry context at `ea` for every register that
    /// is still unknown there.
    pub fn seed_entry(&mut self, ea: Ea) {
        if self.ctx.get(Sreg::ProgramBank, ea).is_none() {
            self.ctx.split(Sreg::ProgramBank, ea, Some(bank(ea) as u32));
        }
        for (&reg, &val) in &self.cfg.entry_context {
            if self.ctx.get(reg, ea).is_none() {
                self.ctx.split(reg, ea, Some(val));
            }
        }
    }

    /// Decode-time fixups: canonical features and `COP` argument expansion.
    pub fn prepare<M: Memory>(&self, mem: &M, insn: &mut Instruction) -> bool {
        insn.normalize();
        cop::expand(insn, mem, &self.cop)
    }

    /// Resolves every operand of `insn`, records its references in `db` and
    /// updates the context store for whatever the instruction changes.
    pub fn analyze<M: Memory, D: Decoder, B: Database>(
        &mut self,
        mem: &M,
        dec: &D,
        db: &mut B,
        insn: &Instruction,
    ) -> InsnReport {
        let xlat = self.translator();
        let mut pass = Pass {
            ctx: &mut self.ctx,
            cfg: &self.cfg,
            xlat,
            mem,
            dec,
            db,
            insn,
            features: insn.effective_features(),
            flow: insn.falls_through(),
            report: InsnReport::default(),
        };
        pass.run();
        pass.report.flow = pass.flow;
        pass.report
    }
}

impl<'a, M: Memory, D: Decoder, B: Database> Pass<'a, M, D, B> {
    fn run(&mut self) {
        let insn = self.insn;
        let features = self.features;
        debug!(ea = insn.ea, mnem = ?insn.mnem, "analyze");

        for n in 0..MAX_OPERANDS {
            if features.contains(Feature::uses(n)) {
                self.handle_operand(n, true);
            }
        }
        for n in 0..MAX_OPERANDS {
            if features.contains(Feature::changes(n)) {
                self.handle_operand(n, false);
            }
        }

        self.report.indirect = features.contains(Feature::JUMP) || self.transfers_indirectly();
        if self.report.indirect {
            debug!(ea = insn.ea, "indirect transfer");
        }

        if self.flow {
            if let Err(e) = self.db.add_cref(insn.ea, insn.end(), None, CrefKind::Fallthrough) {
                warn!(ea = insn.ea, "fallthrough dropped: {e}");
            }
        }

        self.post_process();
    }

    fn transfers_indirectly(&self) -> bool {
        let jump = matches!(
            self.insn.mnem,
            Mnemonic::Jmp | Mnemonic::Jml | Mnemonic::Jsr | Mnemonic::Jsl
        );
        jump && matches!(self.insn.op(0).kind, OperandKind::Displ { mode, .. } if mode.is_indirect_transfer())
    }

    fn post_process(&mut self) {
        let insn = self.insn;
        let limit = self.cfg.backtrack_limit;
        match insn.mnem {
            Mnemonic::Rep | Mnemonic::Sep => {
                modes::switch_width(self.ctx, self.mem, insn);
            }
            Mnemonic::Xce => {
                modes::switch_emulation(self.ctx, self.mem, insn);
            }
            Mnemonic::Jmp | Mnemonic::Jml | Mnemonic::Jsl | Mnemonic::Jsr => self.follow_transfer(),
            Mnemonic::Plb => {
                stack::pull_bank(self.ctx, self.dec, insn, limit);
            }
            Mnemonic::Pld => {
                stack::pull_direct_page(self.ctx, self.dec, insn, limit);
            }
            Mnemonic::Plp => {
                stack::pull_status(self.ctx, self.dec, insn, self.cfg.status_scan_limit);
            }
            Mnemonic::Tcd => {
                stack::transfer_direct_page(self.ctx, self.dec, insn, limit);
            }
            _ => {}
        }
    }

    fn follow_transfer(&mut self) {
        let insn = self.insn;
        let Some(raw) = insn.full_target() else { return };
        let target = if insn.mnem.is_long_transfer() {
            self.xlat.xlat(raw)
        } else {
            self.xlat.xlat(map_code_ea(self.ctx, insn, raw))
        };
        propagate::xfer_sregs(self.ctx, insn.ea, target);

        if !insn.mnem.is_call() {
            return;
        }
        let func = self.db.get_func(target).or_else(|| self.db.add_func(target));
        if let Some(func) = func {
            self.report.return_fixups = propagate::correct_after_return(
                self.ctx,
                self.dec,
                insn,
                &func,
                self.cfg.bracket_scan,
            );
        }
    }
}
