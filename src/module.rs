//! The module: top-level container and sole owner of every type, constant,
//! global, function and (transitively) instruction.
//!
//! All cross-references are arena handles, so handle equality is identity
//! and the module's lifetime bounds everything it hands out.

use rustc_hash::FxHashMap;

use crate::constant::{mask_to_width, ConstKey, ConstKind};
use crate::error::IrError;
use crate::instruction::Opcode;
use crate::types::{Qualifiers, TypeId, TypeKind, TypeStore};
use crate::value::{GlobalData, Value, ValueArena, ValueId, ValueKind};

/// A compilation unit.
#[derive(Debug, Default)]
pub struct Module {
    name: String,
    pub(crate) types: TypeStore,
    pub(crate) values: ValueArena,
    functions: Vec<ValueId>,
    globals: Vec<ValueId>,
    consts: FxHashMap<ConstKey, ValueId>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            types: TypeStore::new(),
            values: ValueArena::new(),
            functions: Vec::new(),
            globals: Vec::new(),
            consts: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read access to the type universe (queries: sizes, names, members).
    pub fn types(&self) -> &TypeStore {
        &self.types
    }

    // ---- type lookup-or-create ----------------------------------------

    pub fn void_type(&mut self) -> TypeId {
        self.types.void_type()
    }

    pub fn integer_type(&mut self, bits: u32, signed: bool) -> TypeId {
        self.types.integer_type(bits, signed)
    }

    /// The canonical `i1` produced by comparisons and consumed by `CondBr`.
    pub fn int1_type(&mut self) -> TypeId {
        self.types.integer_type(1, true)
    }

    pub fn float_type(&mut self, bits: u32) -> TypeId {
        self.types.float_type(bits)
    }

    pub fn pointer_type(&mut self, elem: TypeId) -> TypeId {
        self.types.pointer_type(elem)
    }

    pub fn array_type(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.types.array_type(elem, len)
    }

    pub fn vector_type(&mut self, elem: TypeId, lanes: u64) -> TypeId {
        self.types.vector_type(elem, lanes)
    }

    pub fn function_type(&mut self, ret: TypeId, params: &[(String, TypeId)]) -> TypeId {
        self.types.function_type(ret, params)
    }

    pub fn qualified(&mut self, quals: Qualifiers, base: TypeId) -> TypeId {
        self.types.qualified(quals, base)
    }

    /// Opaque named struct (forward declaration), or the existing handle.
    pub fn create_struct_type(&mut self, name: &str) -> TypeId {
        self.types.create_struct(name)
    }

    pub fn set_struct_body(
        &mut self,
        id: TypeId,
        members: Vec<(String, TypeId)>,
    ) -> Result<(), IrError> {
        self.types.set_struct_body(id, members)
    }

    pub fn struct_type(&mut self, name: &str, members: Vec<(String, TypeId)>) -> TypeId {
        self.types.struct_type(name, members)
    }

    pub fn struct_type_anonymous(&mut self, members: &[TypeId]) -> TypeId {
        self.types.struct_type_anonymous(members)
    }

    pub fn struct_type_by_name(&self, name: &str) -> Option<TypeId> {
        self.types.struct_type_by_name(name)
    }

    // ---- functions and globals ----------------------------------------

    pub(crate) fn register_function(&mut self, func: ValueId) {
        self.functions.push(func);
    }

    pub fn functions(&self) -> &[ValueId] {
        &self.functions
    }

    pub fn get_function(&self, name: &str) -> Option<ValueId> {
        self.functions
            .iter()
            .copied()
            .find(|&f| self.value_name(f) == Some(name))
    }

    pub fn global_variables(&self) -> &[ValueId] {
        &self.globals
    }

    /// Creates a global holding a `value_ty`; the global itself is a
    /// `value_ty*` value, like an alloca that outlives every function.
    pub fn create_global_variable(
        &mut self,
        value_ty: TypeId,
        is_constant: bool,
        init: Option<ValueId>,
        name: &str,
    ) -> ValueId {
        let ptr_ty = self.types.pointer_type(value_ty);
        let global = self.values.alloc(Value::new(
            ptr_ty,
            Some(name.to_string()),
            ValueKind::Global(GlobalData {
                value_ty,
                is_constant,
                init,
            }),
        ));
        self.globals.push(global);
        global
    }

    // ---- constants -----------------------------------------------------

    /// Canonical integer constant: the same `(type, value)` always returns
    /// the same handle. The payload is masked to the type's width.
    pub fn get_constant_int(&mut self, ty: TypeId, value: u64) -> ValueId {
        let (bits, _) = self
            .types
            .int_info(ty)
            .expect("integer constant requires integer type");
        let value = mask_to_width(value, bits);
        let key = ConstKey::Int(ty, value);
        if let Some(&id) = self.consts.get(&key) {
            log::trace!("constant hit: {} {value}", self.types.name_of(ty));
            return id;
        }
        let id = self
            .values
            .alloc(Value::new(ty, None, ValueKind::Constant(ConstKind::Int { value })));
        self.consts.insert(key, id);
        id
    }

    /// Canonical float constant, keyed by bit pattern: `+0.0` and `-0.0`
    /// are distinct handles and NaNs do not collapse.
    pub fn get_constant_fp(&mut self, ty: TypeId, value: f64) -> ValueId {
        debug_assert!(self.types.is_float(ty), "float constant requires float type");
        let bits = value.to_bits();
        let key = ConstKey::Float(ty, bits);
        if let Some(&id) = self.consts.get(&key) {
            return id;
        }
        let id = self
            .values
            .alloc(Value::new(ty, None, ValueKind::Constant(ConstKind::Float { bits })));
        self.consts.insert(key, id);
        id
    }

    /// Canonical null pointer of the given pointer type.
    pub fn get_constant_null(&mut self, ptr_ty: TypeId) -> ValueId {
        debug_assert!(self.types.is_pointer(ptr_ty), "null requires pointer type");
        let key = ConstKey::Null(ptr_ty);
        if let Some(&id) = self.consts.get(&key) {
            return id;
        }
        let id = self
            .values
            .alloc(Value::new(ptr_ty, None, ValueKind::Constant(ConstKind::Null)));
        self.consts.insert(key, id);
        id
    }

    /// Canonical zero of any sized type (`zeroinitializer`).
    pub fn get_constant_zero(&mut self, ty: TypeId) -> ValueId {
        let key = ConstKey::AggregateZero(ty);
        if let Some(&id) = self.consts.get(&key) {
            return id;
        }
        let id = self.values.alloc(Value::new(
            ty,
            None,
            ValueKind::Constant(ConstKind::AggregateZero),
        ));
        self.consts.insert(key, id);
        id
    }

    /// String constant of type `[len + 1 x i8]`, uniqued by content.
    pub fn get_constant_string(&mut self, value: &str) -> ValueId {
        let key = ConstKey::Str(value.to_string());
        if let Some(&id) = self.consts.get(&key) {
            return id;
        }
        let i8t = self.types.integer_type(8, true);
        let ty = self.types.array_type(i8t, value.len() as u64 + 1);
        let id = self.values.alloc(Value::new(
            ty,
            None,
            ValueKind::Constant(ConstKind::Str {
                value: value.to_string(),
            }),
        ));
        self.consts.insert(key, id);
        id
    }

    /// Array constant. Element count and types must match the array type.
    pub fn get_constant_array(
        &mut self,
        array_ty: TypeId,
        elems: &[ValueId],
    ) -> Result<ValueId, IrError> {
        let (elem_ty, len) = match self.types.kind(self.types.strip_qualifiers(array_ty)) {
            TypeKind::Array { elem, len } => (*elem, *len),
            _ => return Err(IrError::ConstantElementTypeMismatch),
        };
        if elems.len() as u64 != len {
            return Err(IrError::ConstantElementCountMismatch);
        }
        for &e in elems {
            if self.value_type(e) != elem_ty {
                return Err(IrError::ConstantElementTypeMismatch);
            }
        }
        Ok(self.values.alloc(Value::new(
            array_ty,
            None,
            ValueKind::Constant(ConstKind::Array {
                elems: elems.to_vec(),
            }),
        )))
    }

    /// Struct constant. Member types must match the struct body.
    pub fn get_constant_struct(
        &mut self,
        struct_ty: TypeId,
        members: &[ValueId],
    ) -> Result<ValueId, IrError> {
        let count = self.types.struct_member_count(struct_ty)?;
        if members.len() != count {
            return Err(IrError::ConstantElementCountMismatch);
        }
        for (i, &m) in members.iter().enumerate() {
            if self.value_type(m) != self.types.struct_member_type(struct_ty, i)? {
                return Err(IrError::ConstantElementTypeMismatch);
            }
        }
        Ok(self.values.alloc(Value::new(
            struct_ty,
            None,
            ValueKind::Constant(ConstKind::Struct {
                members: members.to_vec(),
            }),
        )))
    }

    /// Zero-extends an integer constant into a wider integer type, folding
    /// to the canonical constant of the target type.
    pub fn const_int_zext(&mut self, c: ValueId, to: TypeId) -> Result<ValueId, IrError> {
        let value = self
            .constant_int_value(c)
            .ok_or(IrError::CastSourceType {
                op: "ZExt",
                expected: "integer",
            })?;
        let (from_bits, _) = self.types.int_info(self.value_type(c)).unwrap_or((64, true));
        let (to_bits, _) = self.types.int_info(to).ok_or(IrError::CastTargetType {
            op: "ZExt",
            expected: "integer",
        })?;
        if to_bits <= from_bits {
            return Err(IrError::CastMustWiden("ZExt"));
        }
        // stored payload is already masked to the source width
        Ok(self.get_constant_int(to, value))
    }

    /// Sign-extends an integer constant into a wider integer type.
    pub fn const_int_sext(&mut self, c: ValueId, to: TypeId) -> Result<ValueId, IrError> {
        let value = self
            .constant_int_value(c)
            .ok_or(IrError::CastSourceType {
                op: "SExt",
                expected: "integer",
            })?;
        let (from_bits, _) = self.types.int_info(self.value_type(c)).unwrap_or((64, true));
        let (to_bits, _) = self.types.int_info(to).ok_or(IrError::CastTargetType {
            op: "SExt",
            expected: "integer",
        })?;
        if to_bits <= from_bits {
            return Err(IrError::CastMustWiden("SExt"));
        }
        let shift = 64 - from_bits;
        let extended = (((value << shift) as i64) >> shift) as u64;
        Ok(self.get_constant_int(to, extended))
    }

    // ---- value accessors -----------------------------------------------

    pub fn value_type(&self, v: ValueId) -> TypeId {
        self.values.get(v).ty
    }

    pub fn value_name(&self, v: ValueId) -> Option<&str> {
        self.values.get(v).name.as_deref()
    }

    pub fn set_value_name(&mut self, v: ValueId, name: &str) {
        self.values.get_mut(v).name = Some(name.to_string());
    }

    pub fn value_kind(&self, v: ValueId) -> &ValueKind {
        &self.values.get(v).kind
    }

    /// Users of a value, one entry per operand occurrence.
    pub fn users(&self, v: ValueId) -> &[ValueId] {
        &self.values.get(v).users
    }

    pub fn operands(&self, user: ValueId) -> &[ValueId] {
        self.values.operands(user)
    }

    pub fn operand(&self, user: ValueId, index: usize) -> Option<ValueId> {
        self.values.operand(user, index)
    }

    pub fn set_operand(&mut self, user: ValueId, index: usize, v: ValueId) -> Result<(), IrError> {
        self.values.set_operand(user, index, v)
    }

    pub fn remove_use_of(&mut self, user: ValueId, v: ValueId) {
        self.values.remove_use_of(user, v)
    }

    pub fn opcode(&self, v: ValueId) -> Option<Opcode> {
        self.values.inst(v).map(|data| data.opcode)
    }

    pub fn is_constant(&self, v: ValueId) -> bool {
        matches!(self.values.get(v).kind, ValueKind::Constant(_))
    }

    /// Payload of an integer constant (masked to its width).
    pub fn constant_int_value(&self, v: ValueId) -> Option<u64> {
        match &self.values.get(v).kind {
            ValueKind::Constant(ConstKind::Int { value }) => Some(*value),
            _ => None,
        }
    }
}
