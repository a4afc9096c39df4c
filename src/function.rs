//! Functions: argument lists, owned basic blocks, and the lowering hooks
//! (hidden return slot, instance-method marker).

use crate::block::BlockData;
use crate::error::IrError;
use crate::module::Module;
use crate::types::TypeId;
use crate::value::{ArgData, Value, ValueId, ValueKind};

/// Payload of a function value. The value's own type is the function type.
#[derive(Debug, Clone)]
pub struct FuncData {
    pub fn_ty: TypeId,
    pub ret: TypeId,
    pub args: Vec<ValueId>,
    pub blocks: Vec<ValueId>,
    /// Set when an aggregate return is lowered to an out-pointer parameter;
    /// the logical return type becomes void.
    pub hidden_retval_ty: Option<TypeId>,
    pub is_instance_method: bool,
}

impl Module {
    pub(crate) fn func_data(&self, func: ValueId) -> &FuncData {
        match &self.values.get(func).kind {
            ValueKind::Function(data) => data,
            _ => panic!("value is not a function"),
        }
    }

    pub(crate) fn func_data_mut(&mut self, func: ValueId) -> &mut FuncData {
        match &mut self.values.get_mut(func).kind {
            ValueKind::Function(data) => data,
            _ => panic!("value is not a function"),
        }
    }

    pub fn is_function(&self, v: ValueId) -> bool {
        matches!(self.values.get(v).kind, ValueKind::Function(_))
    }

    /// Creates a function from a return type and named parameters. Empty
    /// parameter names default to `__arg{i}`.
    pub fn create_function(
        &mut self,
        name: &str,
        return_type: TypeId,
        params: &[(String, TypeId)],
    ) -> ValueId {
        let fn_ty = self.types.function_type(return_type, params);
        self.create_function_value(name, fn_ty)
    }

    /// Creates a function from an existing function type.
    pub fn declare_function(&mut self, name: &str, fn_ty: TypeId) -> ValueId {
        self.create_function_value(name, fn_ty)
    }

    fn create_function_value(&mut self, name: &str, fn_ty: TypeId) -> ValueId {
        let ret = self
            .types
            .function_return_type(fn_ty)
            .expect("function type required");
        let params: Vec<(String, TypeId)> = self
            .types
            .function_params(fn_ty)
            .expect("function type required")
            .to_vec();
        let func = self.values.alloc(Value::new(
            fn_ty,
            Some(name.to_string()),
            ValueKind::Function(FuncData {
                fn_ty,
                ret,
                args: Vec::new(),
                blocks: Vec::new(),
                hidden_retval_ty: None,
                is_instance_method: false,
            }),
        ));
        let args: Vec<ValueId> = params
            .iter()
            .enumerate()
            .map(|(index, (pname, pty))| {
                self.values.alloc(Value::new(
                    *pty,
                    Some(pname.clone()),
                    ValueKind::Argument(ArgData { func, index }),
                ))
            })
            .collect();
        self.func_data_mut(func).args = args;
        self.register_function(func);
        log::debug!("created function @{name}");
        func
    }

    pub fn function_return_type(&self, func: ValueId) -> TypeId {
        self.func_data(func).ret
    }

    pub fn args(&self, func: ValueId) -> &[ValueId] {
        &self.func_data(func).args
    }

    pub fn num_args(&self, func: ValueId) -> usize {
        self.func_data(func).args.len()
    }

    pub fn arg(&self, func: ValueId, index: usize) -> Option<ValueId> {
        self.func_data(func).args.get(index).copied()
    }

    pub fn arg_type(&self, func: ValueId, index: usize) -> Option<TypeId> {
        self.arg(func, index).map(|a| self.values.get(a).ty)
    }

    pub fn blocks(&self, func: ValueId) -> &[ValueId] {
        &self.func_data(func).blocks
    }

    /// First block; it must never acquire predecessors.
    pub fn entry_block(&self, func: ValueId) -> Option<ValueId> {
        self.func_data(func).blocks.first().copied()
    }

    pub fn set_instance_method(&mut self, func: ValueId, is_instance_method: bool) {
        self.func_data_mut(func).is_instance_method = is_instance_method;
    }

    pub fn is_instance_method(&self, func: ValueId) -> bool {
        self.func_data(func).is_instance_method
    }

    /// Marks the function as returning an aggregate through a hidden
    /// out-pointer parameter.
    pub fn set_hidden_retval_type(&mut self, func: ValueId, ty: TypeId) {
        self.func_data_mut(func).hidden_retval_ty = Some(ty);
    }

    pub fn hidden_retval_type(&self, func: ValueId) -> Option<TypeId> {
        self.func_data(func).hidden_retval_ty
    }

    /// Allocates a block owned by `func` and appends it to the block list.
    pub fn create_basic_block(&mut self, func: ValueId, name: &str) -> ValueId {
        let void = self.types.void_type();
        let name = if name.is_empty() { None } else { Some(name.to_string()) };
        let bb = self
            .values
            .alloc(Value::new(void, name, ValueKind::Block(BlockData::new(func))));
        self.func_data_mut(func).blocks.push(bb);
        bb
    }

    /// Unlinks and destroys a block and its instructions. The block must
    /// have no incoming CFG edges, and nothing outside it may still use its
    /// instructions (or the block itself, e.g. from a phi).
    pub fn remove_basic_block(&mut self, bb: ValueId) -> Result<(), IrError> {
        if !self.predecessors(bb).is_empty() {
            return Err(IrError::BlockHasPredecessors);
        }
        // Tail-first, so intra-block defs lose their users before they die.
        let mut cursor = self.last_instruction(bb);
        while let Some(inst) = cursor {
            cursor = self.inst_prev(inst);
            self.erase_instruction(inst)?;
        }
        if !self.values.get(bb).users.is_empty() {
            return Err(IrError::ValueHasUsers);
        }
        let func = self.block_data(bb).func;
        self.func_data_mut(func).blocks.retain(|&b| b != bb);
        self.values.erase(bb);
        Ok(())
    }
}
