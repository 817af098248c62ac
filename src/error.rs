use crate::address::Ea;

/// Host database refused an operation. The analyzer drops the step that
/// caused it and moves on to the next operand.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("code reference {from:#08x} -> {to:#08x} rejected")]
    CodeRef { from: Ea, to: Ea },
    #[error("data reference {from:#08x} -> {to:#08x} rejected")]
    DataRef { from: Ea, to: Ea },
    #[error("cannot mark {ea:#08x} as an offset")]
    Offset { ea: Ea },
    #[error("address {ea:#08x} is not mapped")]
    Unmapped { ea: Ea },
}
