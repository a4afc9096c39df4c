//! Error handling for IR construction
//!
//! Every variant corresponds to a structural constraint the builder or
//! module refuses to violate. There is no recovery path: a failed
//! construction creates nothing, so the IR can never be observed in a
//! malformed state.

use thiserror::Error;

/// Construction-time IR errors.
///
/// These are programmer errors in the lowering driver; the expectation is
/// that a type-checked AST never triggers them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Operand type mismatch")]
    OperandTypeMismatch,

    #[error("Binary operation requires integer or float operands")]
    BinaryOperandType,

    #[error("Division requires integer types")]
    DivisionRequiresInt,

    #[error("Bitwise operation requires integer types")]
    BitwiseRequiresInt,

    #[error("Shift requires integer types")]
    ShiftRequiresInt,

    #[error("Unary operation requires integer operand")]
    UnaryRequiresInt,

    #[error("FNeg requires float operand")]
    FNegRequiresFloat,

    #[error("ICmp requires integer operands")]
    ICmpRequiresInt,

    #[error("FCmp requires float operands")]
    FCmpRequiresFloat,

    #[error("Condition must be i1 type")]
    ConditionNotI1,

    #[error("Return type mismatch")]
    ReturnTypeMismatch,

    #[error("Void function cannot return value")]
    VoidFunctionReturnsValue,

    #[error("Phi cannot have void type")]
    PhiVoidType,

    #[error("Phi incoming value type mismatch")]
    PhiIncomingTypeMismatch,

    #[error("Phi incoming must name a basic block")]
    PhiIncomingNotBlock,

    #[error("Cannot allocate zero-sized type")]
    AllocaZeroSized,

    #[error("Cannot load zero-sized type")]
    LoadZeroSized,

    #[error("Load operand must be pointer")]
    LoadOperandNotPointer,

    #[error("Store operand must be pointer")]
    StoreOperandNotPointer,

    #[error("Stored value type mismatch")]
    StoredValueTypeMismatch,

    #[error("GEP base must be pointer")]
    GepBaseNotPointer,

    #[error("GEP indices must be integers")]
    GepIndexNotInteger,

    #[error("GEP struct index must be a constant integer")]
    GepStructIndexNotConstant,

    #[error("Struct index out of bounds")]
    StructIndexOutOfBounds,

    #[error("GEP cannot index into {0}")]
    GepCannotIndex(String),

    #[error("Bitcast types must have same size")]
    BitcastSizeMismatch,

    #[error("{0} must expand to larger type")]
    CastMustWiden(&'static str),

    #[error("{0} must reduce to smaller type")]
    CastMustNarrow(&'static str),

    #[error("{op} source must be {expected}")]
    CastSourceType {
        op: &'static str,
        expected: &'static str,
    },

    #[error("{op} target must be {expected}")]
    CastTargetType {
        op: &'static str,
        expected: &'static str,
    },

    #[error("Invalid cast from {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("Argument count mismatch")]
    ArgumentCountMismatch,

    #[error("Argument type mismatch at index {0}")]
    ArgumentTypeMismatch(usize),

    #[error("Call target must be a function")]
    CalleeNotFunction,

    #[error("Indirect call target must be a function pointer")]
    CalleeNotFunctionPointer,

    #[error("Block already has a terminator")]
    BlockAlreadyTerminated,

    #[error("No insertion point set")]
    NoInsertPoint,

    #[error("Cannot insert non-phi before phi")]
    NonPhiBeforePhi,

    #[error("Insertion position is not in the insert block")]
    PositionNotInBlock,

    #[error("Struct body already set")]
    StructBodyAlreadySet,

    #[error("Cannot query members of opaque struct")]
    OpaqueStructQuery,

    #[error("Constant element type mismatch")]
    ConstantElementTypeMismatch,

    #[error("Constant element count mismatch")]
    ConstantElementCountMismatch,

    #[error("Value still has users")]
    ValueHasUsers,

    #[error("Block still has predecessors")]
    BlockHasPredecessors,

    #[error("Operand index {0} out of range")]
    OperandIndexOutOfRange(usize),
}
