//! Operand resolution: effective address and reference kind per operand.

use tracing::{trace, warn};

use crate::address::{direct_page_address, map_code_ea, map_data_ea, Ea};
use crate::context::Sreg;
use crate::database::{CrefKind, Database, DrefKind};
use crate::decoder::{Decoder, DisplMode, Dtype, Operand, OperandKind};
use crate::emu::Pass;
use crate::instructions::{Feature, Mnemonic};
use crate::memory::Memory;

/// Result of resolving one operand, consumed by the shared registration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fully handled, nothing left to record.
    Nothing,
    /// A plain value. Only produces a reference when the host marked the
    /// slot as an offset.
    Immediate { value: u32, kind: DrefKind },
    /// A memory access at this address.
    DataRef(Ea),
}

impl<'a, M: Memory, D: Decoder, B: Database> Pass<'a, M, D, B> {
    /// Resolves operand slot `n` and records what it references.
    ///
    /// # Panics
    ///
    /// On an operand kind outside the ones the analysis knows. That means
    /// the decoder and the analysis disagree about the instruction set.
    pub(crate) fn handle_operand(&mut self, n: usize, read: bool) {
        let x = *self.insn.op(n);
        let outcome = match x.kind {
            OperandKind::Void | OperandKind::Reg(_) => Outcome::Nothing,
            OperandKind::Imm { value } => {
                debug_assert!(read, "immediate written at {:#08x}", self.insn.ea);
                Outcome::Immediate { value, kind: DrefKind::Offset }
            }
            OperandKind::Displ { mode, addr } => self.resolve_displ(mode, addr, read),
            OperandKind::Mem { addr } => {
                Outcome::DataRef(self.xlat.xlat(map_data_ea(self.ctx, self.insn, addr)))
            }
            OperandKind::MemFar { addr } => Outcome::DataRef(self.xlat.xlat(addr)),
            OperandKind::Near { addr } => {
                let ea = self.xlat.xlat(map_code_ea(self.ctx, self.insn, addr));
                self.code_target(&x, ea, false);
                Outcome::Nothing
            }
            OperandKind::Far { addr } => {
                let ea = self.xlat.xlat(addr);
                self.code_target(&x, ea, true);
                Outcome::Nothing
            }
            OperandKind::Cop { addr, is_code, .. } => {
                self.cop_argument(&x, addr, is_code, read);
                Outcome::Nothing
            }
            OperandKind::Special { tag } => panic!(
                "internal error: operand kind {tag} in slot {n} of {:#08x} is not handled",
                self.insn.ea
            ),
        };
        trace!(ea = self.insn.ea, n, read, ?outcome, "operand");
        self.register(n, &x, outcome, read);
    }

    fn resolve_displ(&mut self, mode: DisplMode, addr: u32, read: bool) -> Outcome {
        let access = DrefKind::access(read);
        if mode.is_direct_page() {
            // An unknown direct page would only produce a wrong address.
            return match self.ctx.get(Sreg::DirectPage, self.insn.ea) {
                Some(dp) => Outcome::DataRef(self.xlat.xlat(direct_page_address(dp, addr))),
                None => Outcome::Immediate { value: addr, kind: access },
            };
        }
        match mode {
            DisplMode::AbsInd | DisplMode::AbsX | DisplMode::AbsY | DisplMode::AbsIndLong => {
                Outcome::DataRef(self.xlat.xlat(map_data_ea(self.ctx, self.insn, addr)))
            }
            DisplMode::AbsXInd => {
                if self.handle_jump_table(addr) {
                    Outcome::Nothing
                } else {
                    Outcome::DataRef(self.xlat.xlat(map_code_ea(self.ctx, self.insn, addr)))
                }
            }
            DisplMode::AbsLongX => Outcome::DataRef(addr),
            _ => Outcome::Immediate { value: addr, kind: access },
        }
    }

    /// Shared tail of every operand: turns an [`Outcome`] into references.
    fn register(&mut self, n: usize, x: &Operand, outcome: Outcome, read: bool) {
        let from = self.insn.ea;
        match outcome {
            Outcome::Nothing => {}
            Outcome::Immediate { value, kind } => {
                let Some(base) = self.db.offset_base(from, n) else { return };
                let to = base.wrapping_add(value);
                if let Err(e) = self.db.add_dref(from, to, Some(x.offb), kind) {
                    warn!(ea = from, n, "offset reference dropped: {e}");
                }
            }
            Outcome::DataRef(ea) => {
                if let Err(e) = self.db.create_op_data(ea, x.dtype) {
                    trace!(ea, "no data item: {e}");
                }
                if let Err(e) = self.db.add_dref(from, ea, Some(x.offb), DrefKind::access(read)) {
                    warn!(ea = from, n, "data reference dropped: {e}");
                }
            }
        }
    }

    fn code_target(&mut self, x: &Operand, ea: Ea, far: bool) {
        let from = self.insn.ea;
        if self.insn.mnem == Mnemonic::Per {
            if let Err(e) = self.db.add_dref(from, ea, Some(x.offb), DrefKind::Offset) {
                warn!(ea = from, "per reference dropped: {e}");
            }
            return;
        }
        let call = self.features.contains(Feature::CALL);
        if let Err(e) = self.db.add_cref(from, ea, Some(x.offb), CrefKind::transfer(call, far)) {
            warn!(ea = from, "code reference dropped: {e}");
            return;
        }
        if self.flow && call {
            self.flow = self.db.func_does_return(ea);
        }
    }

    fn cop_argument(&mut self, x: &Operand, addr: u32, is_code: bool, read: bool) {
        if addr == 0 {
            return;
        }
        let from = self.insn.ea;
        let ea = if x.dtype == Dtype::Dword {
            self.xlat.xlat(addr)
        } else if is_code {
            self.xlat.xlat(map_code_ea(self.ctx, self.insn, addr))
        } else {
            self.xlat.xlat(map_data_ea(self.ctx, self.insn, addr))
        };
        let res = if is_code {
            self.db.add_cref(from, ea, Some(x.offb), CrefKind::CallNear)
        } else {
            self.db.add_dref(from, ea, Some(x.offb), DrefKind::access(read))
        };
        if let Err(e) = res {
            warn!(ea = from, "cop argument reference dropped: {e}");
        }
    }
}
