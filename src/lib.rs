//! Cobalt Compiler - Intermediate Representation
//!
//! This crate defines the SSA intermediate representation sitting between
//! the Cobalt frontend and the backends: a hash-consed type universe, a
//! def-use value graph, the instruction set with its containers (basic
//! blocks, functions, modules), and the [`IrBuilder`] facade that constructs
//! well-typed IR.
//!
//! Everything lives in module-owned arenas and is referenced by copyable
//! handles ([`TypeId`], [`ValueId`]); handle equality is identity, so two
//! structurally equal types or canonical constants are always the same
//! handle. The builder refuses ill-typed requests with an [`IrError`] and
//! never leaves the module in a malformed state.

pub mod block;
pub mod builder;
pub mod constant;
pub mod error;
pub mod function;
pub mod instruction;
pub mod module;
pub mod printer;
pub mod types;
pub mod value;

pub use builder::IrBuilder;
pub use constant::ConstKind;
pub use error::IrError;
pub use instruction::{FloatPredicate, IntPredicate, Opcode};
pub use module::Module;
pub use types::{Qualifiers, TypeId, TypeKind, TypeStore};
pub use value::{ValueId, ValueKind};
