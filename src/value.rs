//! The value graph.
//!
//! Every IR entity that can be named or used (arguments, basic blocks,
//! constants, globals, functions, instructions) is a value slot in one
//! module-owned arena, referenced by [`ValueId`]. Def–use edges are kept
//! symmetric by construction: each operand occurrence in a user has exactly
//! one matching entry in the operand's user list, and every mutation goes
//! through the arena so both sides move together.

use crate::block::BlockData;
use crate::constant::ConstKind;
use crate::error::IrError;
use crate::function::FuncData;
use crate::instruction::InstData;
use crate::types::TypeId;

/// Handle to a value slot in the owning module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload of a global variable. As a value, a global has type `Ptr(value_ty)`
/// so memory operations through it type-check like allocas.
#[derive(Debug, Clone)]
pub struct GlobalData {
    pub value_ty: TypeId,
    pub is_constant: bool,
    pub init: Option<ValueId>,
}

/// Payload of a function argument.
#[derive(Debug, Clone, Copy)]
pub struct ArgData {
    pub func: ValueId,
    pub index: usize,
}

/// What a value is.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Argument(ArgData),
    Block(BlockData),
    Constant(ConstKind),
    Global(GlobalData),
    Function(FuncData),
    Inst(InstData),
}

/// One value: its type, optional name, back-edges to users, and payload.
#[derive(Debug, Clone)]
pub struct Value {
    pub ty: TypeId,
    pub name: Option<String>,
    pub users: Vec<ValueId>,
    pub kind: ValueKind,
}

impl Value {
    pub fn new(ty: TypeId, name: Option<String>, kind: ValueKind) -> Self {
        Self {
            ty,
            name,
            users: Vec::new(),
            kind,
        }
    }
}

/// Owning storage for values. Erased slots stay allocated (handles are plain
/// indices); using an erased handle is a caller bug.
#[derive(Debug, Default)]
pub(crate) struct ValueArena {
    slots: Vec<Option<Value>>,
}

impl ValueArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, value: Value) -> ValueId {
        let id = ValueId(self.slots.len() as u32);
        self.slots.push(Some(value));
        id
    }

    #[inline]
    pub fn get(&self, id: ValueId) -> &Value {
        self.slots[id.index()]
            .as_ref()
            .expect("use of erased value")
    }

    #[inline]
    pub fn get_mut(&mut self, id: ValueId) -> &mut Value {
        self.slots[id.index()]
            .as_mut()
            .expect("use of erased value")
    }

    /// Frees a slot. The caller is responsible for having detached every
    /// edge first.
    pub fn erase(&mut self, id: ValueId) {
        self.slots[id.index()] = None;
    }

    pub fn inst(&self, id: ValueId) -> Option<&InstData> {
        match &self.get(id).kind {
            ValueKind::Inst(data) => Some(data),
            _ => None,
        }
    }

    pub fn inst_mut(&mut self, id: ValueId) -> Option<&mut InstData> {
        match &mut self.get_mut(id).kind {
            ValueKind::Inst(data) => Some(data),
            _ => None,
        }
    }

    // ---- def-use bookkeeping -------------------------------------------

    pub fn add_user(&mut self, value: ValueId, user: ValueId) {
        self.get_mut(value).users.push(user);
    }

    /// Removes one back-edge occurrence (occurrences are counted, not
    /// deduplicated: a user appears once per operand slot it fills).
    pub fn remove_user_once(&mut self, value: ValueId, user: ValueId) {
        let users = &mut self.get_mut(value).users;
        if let Some(pos) = users.iter().position(|&u| u == user) {
            users.remove(pos);
        }
    }

    /// Operand list of a user; empty for values that use nothing.
    pub fn operands(&self, user: ValueId) -> &[ValueId] {
        match &self.get(user).kind {
            ValueKind::Inst(data) => &data.operands,
            _ => &[],
        }
    }

    /// Operand at `index`, or `None` with a diagnostic when out of range.
    pub fn operand(&self, user: ValueId, index: usize) -> Option<ValueId> {
        let operands = self.operands(user);
        match operands.get(index) {
            Some(&v) => Some(v),
            None => {
                log::warn!(
                    "operand index {index} out of range ({} operands)",
                    operands.len()
                );
                None
            }
        }
    }

    /// Replaces operand `index` of `user`, keeping both sides of the edge in
    /// step: the old operand loses one back-edge, the new one gains one.
    pub fn set_operand(
        &mut self,
        user: ValueId,
        index: usize,
        new: ValueId,
    ) -> Result<(), IrError> {
        let old = match self.inst(user) {
            Some(data) => match data.operands.get(index) {
                Some(&v) => v,
                None => {
                    log::warn!(
                        "set_operand index {index} out of range ({} operands)",
                        data.operands.len()
                    );
                    return Err(IrError::OperandIndexOutOfRange(index));
                }
            },
            None => return Err(IrError::OperandIndexOutOfRange(index)),
        };
        self.remove_user_once(old, user);
        self.inst_mut(user)
            .expect("checked above")
            .operands[index] = new;
        self.add_user(new, user);
        Ok(())
    }

    /// Appends an operand with its back-edge.
    pub fn push_operand(&mut self, user: ValueId, value: ValueId) {
        match self.inst_mut(user) {
            Some(data) => data.operands.push(value),
            None => return,
        }
        self.add_user(value, user);
    }

    /// Strips every occurrence of `value` from the user's operand list along
    /// with the reciprocal back-edges.
    pub fn remove_use_of(&mut self, user: ValueId, value: ValueId) {
        let count = match self.inst_mut(user) {
            Some(data) => {
                let before = data.operands.len();
                data.operands.retain(|v| *v != value);
                before - data.operands.len()
            }
            None => 0,
        };
        for _ in 0..count {
            self.remove_user_once(value, user);
        }
    }

    /// Drops all operand uses of a user (called before the user dies).
    pub fn drop_all_uses(&mut self, user: ValueId) {
        let operands: Vec<ValueId> = self.operands(user).to_vec();
        for op in operands {
            self.remove_user_once(op, user);
        }
        if let Some(data) = self.inst_mut(user) {
            data.operands.clear();
        }
    }
}
