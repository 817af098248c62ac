pub mod address;
pub mod config;
pub mod context;
pub mod cop;
pub mod database;
pub mod decoder;
pub mod emu;
pub mod error;
pub mod instructions;
pub mod jumptable;
pub mod listing;
pub mod memory;
pub mod modes;
pub mod propagate;
pub mod resolve;
pub mod stack;

pub use address::{AddressTranslator, Ea};
pub use config::AnalysisConfig;
pub use context::{ContextStore, Sreg, SregRange};
pub use cop::{CopDef, CopFormat, CopTable};
pub use database::{CrefKind, Database, DrefKind, Function, Xref, XrefDb, XrefKind};
pub use decoder::{Decoder, DisplMode, Dtype, Instruction, Operand, OperandKind};
pub use emu::{Analyzer, InsnReport};
pub use error::DbError;
pub use instructions::{Feature, Mnemonic};
pub use jumptable::JumpTable;
pub use listing::ListingDecoder;
pub use memory::{LinearMemory, Memory};
