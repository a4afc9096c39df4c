//! The IR builder: a typed construction facade over a module.
//!
//! The builder owns the insertion cursor and refuses to construct anything
//! ill-typed: operand shape, type matching, terminator discipline, and the
//! phi prefix are all checked before an instruction value is allocated, so a
//! failed call leaves the module untouched.

use smallvec::SmallVec;

use crate::error::IrError;
use crate::instruction::{FloatPredicate, InstData, IntPredicate, Opcode};
use crate::module::Module;
use crate::types::{TypeId, TypeKind};
use crate::value::{Value, ValueId, ValueKind};

/// Builder over a module, holding the insertion block and optional cursor.
pub struct IrBuilder<'m> {
    module: &'m mut Module,
    insert_block: Option<ValueId>,
    insert_pos: Option<ValueId>,
}

impl<'m> IrBuilder<'m> {
    pub fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            insert_block: None,
            insert_pos: None,
        }
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    /// Mutable module access for type/constant lookups mid-build.
    pub fn module_mut(&mut self) -> &mut Module {
        self.module
    }

    /// Positions at the end of `block`: new instructions append to its tail.
    pub fn set_insert_point(&mut self, block: ValueId) {
        debug_assert!(self.module.is_block(block));
        self.insert_block = Some(block);
        self.insert_pos = None;
    }

    /// Positions before `inst`: new instructions are inserted ahead of it,
    /// and the cursor stays on `inst`.
    pub fn set_insert_point_before(&mut self, inst: ValueId) {
        let block = self
            .module
            .inst_parent(inst)
            .expect("insertion point must be an instruction");
        self.insert_block = Some(block);
        self.insert_pos = Some(inst);
    }

    pub fn insert_block(&self) -> Option<ValueId> {
        self.insert_block
    }

    /// Allocates and links one instruction. All placement checks happen
    /// before allocation. Terminators always land at the block tail.
    fn insert_new(
        &mut self,
        opcode: Opcode,
        ty: TypeId,
        operands: &[ValueId],
        name: &str,
    ) -> Result<ValueId, IrError> {
        let block = self.insert_block.ok_or(IrError::NoInsertPoint)?;
        let pos = if opcode.is_terminator() {
            if self.module.get_terminator(block).is_some() {
                return Err(IrError::BlockAlreadyTerminated);
            }
            None
        } else if let Some(pos) = self.insert_pos {
            if self.module.opcode(pos).is_some_and(|o| o.is_phi()) {
                return Err(IrError::NonPhiBeforePhi);
            }
            Some(pos)
        } else {
            if self.module.get_terminator(block).is_some() {
                return Err(IrError::BlockAlreadyTerminated);
            }
            None
        };
        let name = (!name.is_empty()).then(|| name.to_string());
        let inst = self.module.values.alloc(Value::new(
            ty,
            name,
            ValueKind::Inst(InstData::new(opcode, block, SmallVec::new())),
        ));
        for &op in operands {
            self.module.values.push_operand(inst, op);
        }
        match pos {
            Some(pos) => self.module.insert_before(pos, inst)?,
            None => self.module.append_instruction(block, inst)?,
        }
        log::trace!("inserted {}", opcode.mnemonic());
        Ok(inst)
    }

    // ---- arithmetic and bitwise ----------------------------------------

    /// Generic binary factory. `opc` must be one of the binary opcodes.
    pub fn create_binary(
        &mut self,
        opc: Opcode,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let lty = self.module.value_type(lhs);
        if lty != self.module.value_type(rhs) {
            return Err(IrError::OperandTypeMismatch);
        }
        let types = self.module.types();
        match opc {
            Opcode::Add | Opcode::Sub | Opcode::Mul => {
                if !types.is_integer(lty) && !types.is_float(lty) {
                    return Err(IrError::BinaryOperandType);
                }
            }
            Opcode::UDiv | Opcode::SDiv | Opcode::URem | Opcode::SRem => {
                if !types.is_integer(lty) {
                    return Err(IrError::DivisionRequiresInt);
                }
            }
            Opcode::BitAnd | Opcode::BitOr | Opcode::BitXor => {
                if !types.is_integer(lty) {
                    return Err(IrError::BitwiseRequiresInt);
                }
            }
            Opcode::Shl | Opcode::LShr | Opcode::AShr => {
                if !types.is_integer(lty) {
                    return Err(IrError::ShiftRequiresInt);
                }
            }
            _ => panic!("create_binary: {opc:?} is not a binary opcode"),
        }
        self.insert_new(opc, lty, &[lhs, rhs], name)
    }

    pub fn create_add(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::Add, l, r, name)
    }

    pub fn create_sub(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::Sub, l, r, name)
    }

    pub fn create_mul(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::Mul, l, r, name)
    }

    pub fn create_udiv(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::UDiv, l, r, name)
    }

    pub fn create_sdiv(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::SDiv, l, r, name)
    }

    pub fn create_urem(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::URem, l, r, name)
    }

    pub fn create_srem(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::SRem, l, r, name)
    }

    pub fn create_and(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::BitAnd, l, r, name)
    }

    pub fn create_or(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::BitOr, l, r, name)
    }

    pub fn create_xor(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::BitXor, l, r, name)
    }

    pub fn create_shl(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::Shl, l, r, name)
    }

    pub fn create_lshr(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::LShr, l, r, name)
    }

    pub fn create_ashr(&mut self, l: ValueId, r: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.create_binary(Opcode::AShr, l, r, name)
    }

    pub fn create_neg(&mut self, val: ValueId, name: &str) -> Result<ValueId, IrError> {
        let ty = self.module.value_type(val);
        if !self.module.types().is_integer(ty) {
            return Err(IrError::UnaryRequiresInt);
        }
        self.insert_new(Opcode::Neg, ty, &[val], name)
    }

    pub fn create_not(&mut self, val: ValueId, name: &str) -> Result<ValueId, IrError> {
        let ty = self.module.value_type(val);
        if !self.module.types().is_integer(ty) {
            return Err(IrError::UnaryRequiresInt);
        }
        self.insert_new(Opcode::Not, ty, &[val], name)
    }

    pub fn create_bitnot(&mut self, val: ValueId, name: &str) -> Result<ValueId, IrError> {
        let ty = self.module.value_type(val);
        if !self.module.types().is_integer(ty) {
            return Err(IrError::UnaryRequiresInt);
        }
        self.insert_new(Opcode::BitNot, ty, &[val], name)
    }

    pub fn create_fneg(&mut self, val: ValueId, name: &str) -> Result<ValueId, IrError> {
        let ty = self.module.value_type(val);
        if !self.module.types().is_float(ty) {
            return Err(IrError::FNegRequiresFloat);
        }
        self.insert_new(Opcode::FNeg, ty, &[val], name)
    }

    // ---- comparisons ----------------------------------------------------

    pub fn create_icmp(
        &mut self,
        pred: IntPredicate,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let lty = self.module.value_type(lhs);
        let rty = self.module.value_type(rhs);
        if !self.module.types().is_integer(lty) || !self.module.types().is_integer(rty) {
            return Err(IrError::ICmpRequiresInt);
        }
        if lty != rty {
            return Err(IrError::OperandTypeMismatch);
        }
        let i1 = self.module.int1_type();
        self.insert_new(Opcode::ICmp(pred), i1, &[lhs, rhs], name)
    }

    pub fn create_fcmp(
        &mut self,
        pred: FloatPredicate,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let lty = self.module.value_type(lhs);
        let rty = self.module.value_type(rhs);
        if !self.module.types().is_float(lty) || !self.module.types().is_float(rty) {
            return Err(IrError::FCmpRequiresFloat);
        }
        if lty != rty {
            return Err(IrError::OperandTypeMismatch);
        }
        let i1 = self.module.int1_type();
        self.insert_new(Opcode::FCmp(pred), i1, &[lhs, rhs], name)
    }

    // ---- memory ---------------------------------------------------------

    pub fn create_alloca(&mut self, ty: TypeId, name: &str) -> Result<ValueId, IrError> {
        if self.module.types().size_of(ty) == 0 {
            return Err(IrError::AllocaZeroSized);
        }
        let ptr_ty = self.module.pointer_type(ty);
        self.insert_new(Opcode::Alloca, ptr_ty, &[], name)
    }

    pub fn create_load(&mut self, ptr: ValueId, name: &str) -> Result<ValueId, IrError> {
        let ptr_ty = self.module.value_type(ptr);
        let loaded = self
            .module
            .types()
            .pointee(ptr_ty)
            .ok_or(IrError::LoadOperandNotPointer)?;
        if self.module.types().size_of(loaded) == 0 {
            return Err(IrError::LoadZeroSized);
        }
        self.insert_new(Opcode::Load, loaded, &[ptr], name)
    }

    pub fn create_store(&mut self, value: ValueId, ptr: ValueId) -> Result<ValueId, IrError> {
        let ptr_ty = self.module.value_type(ptr);
        let elem = self
            .module
            .types()
            .pointee(ptr_ty)
            .ok_or(IrError::StoreOperandNotPointer)?;
        if self.module.value_type(value) != elem {
            return Err(IrError::StoredValueTypeMismatch);
        }
        let void = self.module.void_type();
        self.insert_new(Opcode::Store, void, &[value, ptr], "")
    }

    /// Computes the type a GEP walk ends at. The first index stays within
    /// the pointee; each later index steps into the current aggregate.
    fn gep_result_type(&self, base: ValueId, indices: &[ValueId]) -> Result<TypeId, IrError> {
        let types = self.module.types();
        let mut cur = types
            .pointee(self.module.value_type(base))
            .ok_or(IrError::GepBaseNotPointer)?;
        for &idx in indices {
            if !types.is_integer(self.module.value_type(idx)) {
                return Err(IrError::GepIndexNotInteger);
            }
        }
        for &idx in indices.iter().skip(1) {
            cur = types.strip_qualifiers(cur);
            match types.kind(cur) {
                TypeKind::Array { elem, .. } => cur = *elem,
                TypeKind::Struct(body) => {
                    if body.opaque {
                        return Err(IrError::OpaqueStructQuery);
                    }
                    let member = self
                        .module
                        .constant_int_value(idx)
                        .ok_or(IrError::GepStructIndexNotConstant)?;
                    cur = types.struct_member_type(cur, member as usize)?;
                }
                _ => return Err(IrError::GepCannotIndex(types.name_of(cur))),
            }
        }
        Ok(cur)
    }

    pub fn create_gep(
        &mut self,
        ptr: ValueId,
        indices: &[ValueId],
        name: &str,
    ) -> Result<ValueId, IrError> {
        let walked = self.gep_result_type(ptr, indices)?;
        let result_ty = self.module.pointer_type(walked);
        let mut operands = Vec::with_capacity(indices.len() + 1);
        operands.push(ptr);
        operands.extend_from_slice(indices);
        self.insert_new(Opcode::GetElementPtr, result_ty, &operands, name)
    }

    /// `gep ptr, [i32 0, i32 index]` over a struct pointer.
    pub fn create_struct_gep(
        &mut self,
        struct_ptr: ValueId,
        index: usize,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let pointee = self
            .module
            .types()
            .pointee(self.module.value_type(struct_ptr))
            .ok_or(IrError::GepBaseNotPointer)?;
        if !self.module.types().is_struct(pointee) {
            return Err(IrError::GepCannotIndex(self.module.types().name_of(pointee)));
        }
        if index >= self.module.types().struct_member_count(pointee)? {
            return Err(IrError::StructIndexOutOfBounds);
        }
        let i32t = self.module.integer_type(32, true);
        let zero = self.module.get_constant_int(i32t, 0);
        let idx = self.module.get_constant_int(i32t, index as u64);
        self.create_gep(struct_ptr, &[zero, idx], name)
    }

    // ---- control flow ---------------------------------------------------

    pub fn create_br(&mut self, target: ValueId) -> Result<ValueId, IrError> {
        debug_assert!(self.module.is_block(target));
        let void = self.module.void_type();
        let inst = self.insert_new(Opcode::Br, void, &[target], "")?;
        let block = self.insert_block.expect("checked by insert_new");
        self.module.add_successor(block, target);
        Ok(inst)
    }

    pub fn create_cond_br(
        &mut self,
        cond: ValueId,
        true_bb: ValueId,
        false_bb: ValueId,
    ) -> Result<ValueId, IrError> {
        debug_assert!(self.module.is_block(true_bb) && self.module.is_block(false_bb));
        let i1 = self.module.int1_type();
        if self.module.value_type(cond) != i1 {
            return Err(IrError::ConditionNotI1);
        }
        let void = self.module.void_type();
        let inst = self.insert_new(Opcode::CondBr, void, &[cond, true_bb, false_bb], "")?;
        let block = self.insert_block.expect("checked by insert_new");
        self.module.add_successor(block, true_bb);
        self.module.add_successor(block, false_bb);
        Ok(inst)
    }

    pub fn create_ret(&mut self, value: Option<ValueId>) -> Result<ValueId, IrError> {
        let block = self.insert_block.ok_or(IrError::NoInsertPoint)?;
        let func = self.module.block_parent(block);
        let ret_ty = self.module.function_return_type(func);
        let void = self.module.void_type();
        match value {
            Some(v) => {
                if ret_ty == void {
                    return Err(IrError::VoidFunctionReturnsValue);
                }
                if self.module.value_type(v) != ret_ty {
                    return Err(IrError::ReturnTypeMismatch);
                }
                self.insert_new(Opcode::Ret, void, &[v], "")
            }
            None => {
                if ret_ty != void {
                    return Err(IrError::ReturnTypeMismatch);
                }
                self.insert_new(Opcode::Ret, void, &[], "")
            }
        }
    }

    pub fn create_ret_void(&mut self) -> Result<ValueId, IrError> {
        self.create_ret(None)
    }

    pub fn create_unreachable(&mut self) -> Result<ValueId, IrError> {
        let void = self.module.void_type();
        self.insert_new(Opcode::Unreachable, void, &[], "")
    }

    /// Creates a phi at the end of the insert block's phi prefix, so phis
    /// always precede every non-phi.
    pub fn create_phi(&mut self, ty: TypeId, name: &str) -> Result<ValueId, IrError> {
        if self.module.types().is_void(ty) {
            return Err(IrError::PhiVoidType);
        }
        let block = self.insert_block.ok_or(IrError::NoInsertPoint)?;
        let name = (!name.is_empty()).then(|| name.to_string());
        let phi = self.module.values.alloc(Value::new(
            ty,
            name,
            ValueKind::Inst(InstData::new(Opcode::Phi, block, SmallVec::new())),
        ));
        match self.module.first_non_phi(block) {
            Some(pos) => self.module.insert_before(pos, phi)?,
            None => self.module.append_instruction(block, phi)?,
        }
        Ok(phi)
    }

    /// Appends an `[value, block]` incoming pair to a phi.
    pub fn add_incoming(
        &mut self,
        phi: ValueId,
        value: ValueId,
        block: ValueId,
    ) -> Result<(), IrError> {
        debug_assert!(matches!(self.module.opcode(phi), Some(Opcode::Phi)));
        if self.module.value_type(value) != self.module.value_type(phi) {
            return Err(IrError::PhiIncomingTypeMismatch);
        }
        if !self.module.is_block(block) {
            return Err(IrError::PhiIncomingNotBlock);
        }
        self.module.values.push_operand(phi, value);
        self.module.values.push_operand(phi, block);
        Ok(())
    }

    // ---- calls ----------------------------------------------------------

    /// Direct call; the callee must be a function value.
    pub fn create_call(
        &mut self,
        callee: ValueId,
        args: &[ValueId],
        name: &str,
    ) -> Result<ValueId, IrError> {
        if !self.module.is_function(callee) {
            return Err(IrError::CalleeNotFunction);
        }
        if self.module.num_args(callee) != args.len() {
            return Err(IrError::ArgumentCountMismatch);
        }
        for (i, &arg) in args.iter().enumerate() {
            if Some(self.module.value_type(arg)) != self.module.arg_type(callee, i) {
                return Err(IrError::ArgumentTypeMismatch(i));
            }
        }
        let ret = self.module.function_return_type(callee);
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(callee);
        operands.extend_from_slice(args);
        self.insert_new(Opcode::Call, ret, &operands, name)
    }

    /// Indirect call through any value of pointer-to-function type; the
    /// expected return type comes from the pointee's function type.
    pub fn create_raw_call(
        &mut self,
        callee: ValueId,
        args: &[ValueId],
        name: &str,
    ) -> Result<ValueId, IrError> {
        let callee_ty = self.module.value_type(callee);
        let fn_ty = self
            .module
            .types()
            .pointee(callee_ty)
            .filter(|&t| self.module.types().is_function(t))
            .ok_or(IrError::CalleeNotFunctionPointer)?;
        let params: Vec<TypeId> = self
            .module
            .types()
            .function_params(fn_ty)
            .expect("function type")
            .iter()
            .map(|(_, t)| *t)
            .collect();
        if params.len() != args.len() {
            return Err(IrError::ArgumentCountMismatch);
        }
        for (i, &arg) in args.iter().enumerate() {
            if self.module.value_type(arg) != params[i] {
                return Err(IrError::ArgumentTypeMismatch(i));
            }
        }
        let ret = self
            .module
            .types()
            .function_return_type(fn_ty)
            .expect("function type");
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(callee);
        operands.extend_from_slice(args);
        self.insert_new(Opcode::RawCall, ret, &operands, name)
    }

    // ---- conversions ----------------------------------------------------

    fn int_bits(&self, ty: TypeId) -> Option<u32> {
        self.module.types().int_info(ty).map(|(bits, _)| bits)
    }

    pub fn create_zext(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let src = self.int_bits(self.module.value_type(val)).ok_or(
            IrError::CastSourceType {
                op: "ZExt",
                expected: "integer",
            },
        )?;
        let dst = self.int_bits(target).ok_or(IrError::CastTargetType {
            op: "ZExt",
            expected: "integer",
        })?;
        if dst <= src {
            return Err(IrError::CastMustWiden("ZExt"));
        }
        self.insert_new(Opcode::ZExt, target, &[val], name)
    }

    pub fn create_sext(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let src = self.int_bits(self.module.value_type(val)).ok_or(
            IrError::CastSourceType {
                op: "SExt",
                expected: "integer",
            },
        )?;
        let dst = self.int_bits(target).ok_or(IrError::CastTargetType {
            op: "SExt",
            expected: "integer",
        })?;
        if dst <= src {
            return Err(IrError::CastMustWiden("SExt"));
        }
        self.insert_new(Opcode::SExt, target, &[val], name)
    }

    pub fn create_trunc(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let src = self.int_bits(self.module.value_type(val)).ok_or(
            IrError::CastSourceType {
                op: "Trunc",
                expected: "integer",
            },
        )?;
        let dst = self.int_bits(target).ok_or(IrError::CastTargetType {
            op: "Trunc",
            expected: "integer",
        })?;
        if dst >= src {
            return Err(IrError::CastMustNarrow("Trunc"));
        }
        self.insert_new(Opcode::Trunc, target, &[val], name)
    }

    pub fn create_fpext(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let src = self
            .module
            .types()
            .float_bits(self.module.value_type(val))
            .ok_or(IrError::CastSourceType {
                op: "FPExt",
                expected: "float",
            })?;
        let dst = self
            .module
            .types()
            .float_bits(target)
            .ok_or(IrError::CastTargetType {
                op: "FPExt",
                expected: "float",
            })?;
        if dst <= src {
            return Err(IrError::CastMustWiden("FPExt"));
        }
        self.insert_new(Opcode::FPExt, target, &[val], name)
    }

    pub fn create_fptrunc(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let src = self
            .module
            .types()
            .float_bits(self.module.value_type(val))
            .ok_or(IrError::CastSourceType {
                op: "FPTrunc",
                expected: "float",
            })?;
        let dst = self
            .module
            .types()
            .float_bits(target)
            .ok_or(IrError::CastTargetType {
                op: "FPTrunc",
                expected: "float",
            })?;
        if dst >= src {
            return Err(IrError::CastMustNarrow("FPTrunc"));
        }
        self.insert_new(Opcode::FPTrunc, target, &[val], name)
    }

    fn create_int_to_fp(
        &mut self,
        opc: Opcode,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        if !self.module.types().is_integer(self.module.value_type(val)) {
            return Err(IrError::CastSourceType {
                op: "IntToFP",
                expected: "integer",
            });
        }
        if !self.module.types().is_float(target) {
            return Err(IrError::CastTargetType {
                op: "IntToFP",
                expected: "float",
            });
        }
        self.insert_new(opc, target, &[val], name)
    }

    pub fn create_sitofp(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        self.create_int_to_fp(Opcode::SIToFP, val, target, name)
    }

    pub fn create_uitofp(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        self.create_int_to_fp(Opcode::UIToFP, val, target, name)
    }

    fn create_fp_to_int(
        &mut self,
        opc: Opcode,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        if !self.module.types().is_float(self.module.value_type(val)) {
            return Err(IrError::CastSourceType {
                op: "FPToInt",
                expected: "float",
            });
        }
        if !self.module.types().is_integer(target) {
            return Err(IrError::CastTargetType {
                op: "FPToInt",
                expected: "integer",
            });
        }
        self.insert_new(opc, target, &[val], name)
    }

    pub fn create_fptosi(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        self.create_fp_to_int(Opcode::FPToSI, val, target, name)
    }

    pub fn create_fptoui(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        self.create_fp_to_int(Opcode::FPToUI, val, target, name)
    }

    pub fn create_ptrtoint(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        if !self.module.types().is_pointer(self.module.value_type(val)) {
            return Err(IrError::CastSourceType {
                op: "PtrToInt",
                expected: "pointer",
            });
        }
        if !self.module.types().is_integer(target) {
            return Err(IrError::CastTargetType {
                op: "PtrToInt",
                expected: "integer",
            });
        }
        self.insert_new(Opcode::PtrToInt, target, &[val], name)
    }

    pub fn create_inttoptr(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        if !self.module.types().is_integer(self.module.value_type(val)) {
            return Err(IrError::CastSourceType {
                op: "IntToPtr",
                expected: "integer",
            });
        }
        if !self.module.types().is_pointer(target) {
            return Err(IrError::CastTargetType {
                op: "IntToPtr",
                expected: "pointer",
            });
        }
        self.insert_new(Opcode::IntToPtr, target, &[val], name)
    }

    pub fn create_bitcast(
        &mut self,
        val: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let src_ty = self.module.value_type(val);
        if self.module.types().size_of(src_ty) != self.module.types().size_of(target) {
            return Err(IrError::BitcastSizeMismatch);
        }
        self.insert_new(Opcode::BitCast, target, &[val], name)
    }

    /// Emits whichever conversion takes `src` to `target`:
    ///
    /// - int → wider int: `sext`/`zext` by source signedness
    /// - int → narrower int: `trunc`
    /// - int → float: `sitofp`/`uitofp` by source signedness
    /// - float → int: `fptosi`/`fptoui` by destination signedness
    /// - float → float: `fpext`/`fptrunc`
    /// - pointer → pointer, and pointer ↔ same-size int: `bitcast`
    ///
    /// Casting to the identical type returns `src` and emits nothing; any
    /// other pairing is an invalid cast.
    pub fn create_cast(
        &mut self,
        src: ValueId,
        target: TypeId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let src_ty = self.module.value_type(src);
        if src_ty == target {
            return Ok(src);
        }
        let (src_int, tgt_int, src_fp, tgt_fp, src_ptr, tgt_ptr, src_size, tgt_size) = {
            let types = self.module.types();
            (
                types.int_info(src_ty),
                types.int_info(target),
                types.float_bits(src_ty),
                types.float_bits(target),
                types.is_pointer(src_ty),
                types.is_pointer(target),
                types.size_of(src_ty),
                types.size_of(target),
            )
        };
        let invalid = IrError::InvalidCast {
            from: self.module.types().name_of(src_ty),
            to: self.module.types().name_of(target),
        };
        if let (Some((sb, signed)), Some((tb, _))) = (src_int, tgt_int) {
            return if sb < tb {
                if signed {
                    self.create_sext(src, target, name)
                } else {
                    self.create_zext(src, target, name)
                }
            } else if sb > tb {
                self.create_trunc(src, target, name)
            } else {
                Err(invalid)
            };
        }
        if let (Some((_, signed)), Some(_)) = (src_int, tgt_fp) {
            return if signed {
                self.create_sitofp(src, target, name)
            } else {
                self.create_uitofp(src, target, name)
            };
        }
        if let (Some(_), Some((_, signed))) = (src_fp, tgt_int) {
            return if signed {
                self.create_fptosi(src, target, name)
            } else {
                self.create_fptoui(src, target, name)
            };
        }
        if let (Some(sb), Some(tb)) = (src_fp, tgt_fp) {
            return if sb < tb {
                self.create_fpext(src, target, name)
            } else {
                self.create_fptrunc(src, target, name)
            };
        }
        if src_ptr && tgt_ptr {
            return self.create_bitcast(src, target, name);
        }
        if (src_ptr && tgt_int.is_some()) || (src_int.is_some() && tgt_ptr) {
            if src_size != tgt_size {
                return Err(invalid);
            }
            return self.create_bitcast(src, target, name);
        }
        Err(invalid)
    }

    // ---- constant shortcuts ---------------------------------------------

    pub fn get_int1(&mut self, val: bool) -> ValueId {
        let ty = self.module.int1_type();
        self.module.get_constant_int(ty, val as u64)
    }

    pub fn get_int8(&mut self, val: i8) -> ValueId {
        let ty = self.module.integer_type(8, true);
        self.module.get_constant_int(ty, val as u64)
    }

    pub fn get_int16(&mut self, val: i16) -> ValueId {
        let ty = self.module.integer_type(16, true);
        self.module.get_constant_int(ty, val as u64)
    }

    pub fn get_int32(&mut self, val: i32) -> ValueId {
        let ty = self.module.integer_type(32, true);
        self.module.get_constant_int(ty, val as u64)
    }

    pub fn get_int64(&mut self, val: i64) -> ValueId {
        let ty = self.module.integer_type(64, true);
        self.module.get_constant_int(ty, val as u64)
    }

    pub fn get_float32(&mut self, val: f32) -> ValueId {
        let ty = self.module.float_type(32);
        self.module.get_constant_fp(ty, val as f64)
    }

    pub fn get_float64(&mut self, val: f64) -> ValueId {
        let ty = self.module.float_type(64);
        self.module.get_constant_fp(ty, val)
    }
}
