//! Hash-consed type universe.
//!
//! Every structural type is canonicalized: two lookups with equal structure
//! return the same [`TypeId`], so type equality is handle equality. Named
//! struct types are the one exception to pure structural identity: they are
//! keyed by name to support forward declaration (opaque structs completed
//! later via `set_body`).

use rustc_hash::FxHashMap;

use crate::error::IrError;

/// Byte size of a pointer on the target. Layout is target-independent
/// otherwise, so this is the one hardcoded target fact.
pub const POINTER_SIZE: usize = 8;

/// Identity-stable handle to a canonical type.
///
/// Handles are only meaningful for the module that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Qualifier bitset wrapping a base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers(u8);

impl Qualifiers {
    pub const CONST: Qualifiers = Qualifiers(1);
    pub const VOLATILE: Qualifiers = Qualifiers(2);
    pub const RESTRICT: Qualifiers = Qualifiers(4);

    #[inline]
    pub fn contains(self, other: Qualifiers) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Qualifiers {
    type Output = Qualifiers;

    fn bitor(self, rhs: Qualifiers) -> Qualifiers {
        Qualifiers(self.0 | rhs.0)
    }
}

/// Body of a struct type. Offsets and total size are computed once, when the
/// body is set.
#[derive(Debug, Clone)]
pub struct StructBody {
    pub name: String,
    pub members: Vec<(String, TypeId)>,
    pub offsets: Vec<usize>,
    pub size: usize,
    pub align: usize,
    pub opaque: bool,
    pub tuple: bool,
}

/// Tagged type variant.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    Int { bits: u32, signed: bool },
    Float { bits: u32 },
    Ptr { elem: TypeId },
    Func { ret: TypeId, params: Vec<(String, TypeId)> },
    Array { elem: TypeId, len: u64 },
    Struct(StructBody),
    Vector { elem: TypeId, lanes: u64 },
    Qualified { quals: Qualifiers, base: TypeId },
}

/// Structural uniquing key. Child types participate by handle, which is
/// already canonical, so one level of structure is enough.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Void,
    Int(u32, bool),
    Float(u32),
    Ptr(TypeId),
    Func(TypeId, Vec<TypeId>),
    Array(TypeId, u64),
    AnonStruct(Vec<TypeId>),
    Vector(TypeId, u64),
    Qualified(u8, TypeId),
}

/// The type table: owning storage plus the consing maps.
#[derive(Debug, Default)]
pub struct TypeStore {
    kinds: Vec<TypeKind>,
    keyed: FxHashMap<TypeKey, TypeId>,
    named_structs: FxHashMap<String, TypeId>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, key: TypeKey, make: impl FnOnce() -> TypeKind) -> TypeId {
        if let Some(&id) = self.keyed.get(&key) {
            return id;
        }
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(make());
        self.keyed.insert(key, id);
        id
    }

    pub fn void_type(&mut self) -> TypeId {
        self.intern(TypeKey::Void, || TypeKind::Void)
    }

    pub fn integer_type(&mut self, bits: u32, signed: bool) -> TypeId {
        debug_assert!(matches!(bits, 1 | 8 | 16 | 32 | 64), "bad integer width {bits}");
        self.intern(TypeKey::Int(bits, signed), || TypeKind::Int { bits, signed })
    }

    pub fn float_type(&mut self, bits: u32) -> TypeId {
        debug_assert!(matches!(bits, 16 | 32 | 64 | 128), "bad float width {bits}");
        self.intern(TypeKey::Float(bits), || TypeKind::Float { bits })
    }

    pub fn pointer_type(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKey::Ptr(elem), || TypeKind::Ptr { elem })
    }

    pub fn array_type(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.intern(TypeKey::Array(elem, len), || TypeKind::Array { elem, len })
    }

    pub fn vector_type(&mut self, elem: TypeId, lanes: u64) -> TypeId {
        self.intern(TypeKey::Vector(elem, lanes), || TypeKind::Vector { elem, lanes })
    }

    /// Function types are keyed by `(return, param types)`; parameter names
    /// are carried for rendering only. Empty names default to `__arg{i}`.
    pub fn function_type(&mut self, ret: TypeId, params: &[(String, TypeId)]) -> TypeId {
        let key = TypeKey::Func(ret, params.iter().map(|(_, t)| *t).collect());
        self.intern(key, || {
            let params = params
                .iter()
                .enumerate()
                .map(|(i, (name, ty))| {
                    let name = if name.is_empty() {
                        format!("__arg{i}")
                    } else {
                        name.clone()
                    };
                    (name, *ty)
                })
                .collect();
            TypeKind::Func { ret, params }
        })
    }

    pub fn qualified(&mut self, quals: Qualifiers, base: TypeId) -> TypeId {
        if quals.is_empty() {
            return base;
        }
        self.intern(TypeKey::Qualified(quals.0, base), || TypeKind::Qualified {
            quals,
            base,
        })
    }

    /// Creates an opaque named struct, or returns the existing handle: named
    /// structs have identity by name within a module.
    pub fn create_struct(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.named_structs.get(name) {
            return id;
        }
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(TypeKind::Struct(StructBody {
            name: name.to_string(),
            members: Vec::new(),
            offsets: Vec::new(),
            size: 0,
            align: 1,
            opaque: true,
            tuple: false,
        }));
        self.named_structs.insert(name.to_string(), id);
        log::debug!("created opaque struct %{name}");
        id
    }

    /// Completes an opaque struct and computes its layout. A body can be set
    /// exactly once.
    pub fn set_struct_body(
        &mut self,
        id: TypeId,
        members: Vec<(String, TypeId)>,
    ) -> Result<(), IrError> {
        let (offsets, size, align) = self.layout(&members);
        match &mut self.kinds[id.index()] {
            TypeKind::Struct(body) if body.opaque => {
                body.members = members;
                body.offsets = offsets;
                body.size = size;
                body.align = align;
                body.opaque = false;
                log::debug!("completed struct %{} ({} bytes)", body.name, size);
                Ok(())
            }
            _ => Err(IrError::StructBodyAlreadySet),
        }
    }

    /// Named struct with a body, in one step.
    pub fn struct_type(&mut self, name: &str, members: Vec<(String, TypeId)>) -> TypeId {
        let id = self.create_struct(name);
        if self.is_opaque_struct(id) {
            self.set_struct_body(id, members)
                .expect("opaque struct accepts its first body");
        }
        id
    }

    /// Anonymous (tuple) struct, hash-consed by member types.
    pub fn struct_type_anonymous(&mut self, members: &[TypeId]) -> TypeId {
        let key = TypeKey::AnonStruct(members.to_vec());
        if let Some(&id) = self.keyed.get(&key) {
            return id;
        }
        let named: Vec<(String, TypeId)> = members
            .iter()
            .enumerate()
            .map(|(i, ty)| (i.to_string(), *ty))
            .collect();
        let (offsets, size, align) = self.layout(&named);
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(TypeKind::Struct(StructBody {
            name: String::new(),
            members: named,
            offsets,
            size,
            align,
            opaque: false,
            tuple: true,
        }));
        self.keyed.insert(key, id);
        id
    }

    /// Looks up a named struct created earlier.
    pub fn struct_type_by_name(&self, name: &str) -> Option<TypeId> {
        self.named_structs.get(name).copied()
    }

    /// Member offsets under the alignment policy: each member is placed at
    /// the next multiple of its alignment, and the total size is rounded up
    /// to the struct alignment (the max member alignment, at least 1).
    fn layout(&self, members: &[(String, TypeId)]) -> (Vec<usize>, usize, usize) {
        let mut offsets = Vec::with_capacity(members.len());
        let mut cursor = 0usize;
        let mut struct_align = 1usize;
        for (_, ty) in members {
            let align = self.align_of(*ty).max(1);
            struct_align = struct_align.max(align);
            cursor = align_up(cursor, align);
            offsets.push(cursor);
            cursor += self.size_of(*ty);
        }
        (offsets, align_up(cursor, struct_align), struct_align)
    }

    // ---- queries -------------------------------------------------------

    #[inline]
    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.kinds[ty.index()]
    }

    /// Peels `Qualified` wrappers down to the underlying type.
    pub fn strip_qualifiers(&self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Qualified { base, .. } => self.strip_qualifiers(*base),
            _ => ty,
        }
    }

    pub fn is_void(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Void)
    }

    pub fn is_integer(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Int { .. })
    }

    pub fn is_float(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Float { .. })
    }

    pub fn is_pointer(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Ptr { .. })
    }

    pub fn is_function(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Func { .. })
    }

    pub fn is_array(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Array { .. })
    }

    pub fn is_struct(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Struct(_))
    }

    pub fn is_vector(&self, ty: TypeId) -> bool {
        matches!(self.kind(self.strip_qualifiers(ty)), TypeKind::Vector { .. })
    }

    pub fn is_qualified(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Qualified { .. })
    }

    /// Bit width and signedness for integer types.
    pub fn int_info(&self, ty: TypeId) -> Option<(u32, bool)> {
        match self.kind(self.strip_qualifiers(ty)) {
            TypeKind::Int { bits, signed } => Some((*bits, *signed)),
            _ => None,
        }
    }

    /// Bit width for float types.
    pub fn float_bits(&self, ty: TypeId) -> Option<u32> {
        match self.kind(self.strip_qualifiers(ty)) {
            TypeKind::Float { bits } => Some(*bits),
            _ => None,
        }
    }

    /// Element type of a pointer.
    pub fn pointee(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(self.strip_qualifiers(ty)) {
            TypeKind::Ptr { elem } => Some(*elem),
            _ => None,
        }
    }

    /// Element type of an array or vector.
    pub fn element_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(self.strip_qualifiers(ty)) {
            TypeKind::Array { elem, .. } | TypeKind::Vector { elem, .. } => Some(*elem),
            _ => None,
        }
    }

    pub fn function_return_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(self.strip_qualifiers(ty)) {
            TypeKind::Func { ret, .. } => Some(*ret),
            _ => None,
        }
    }

    pub fn function_params(&self, ty: TypeId) -> Option<&[(String, TypeId)]> {
        match self.kind(self.strip_qualifiers(ty)) {
            TypeKind::Func { params, .. } => Some(params),
            _ => None,
        }
    }

    pub fn is_opaque_struct(&self, ty: TypeId) -> bool {
        matches!(
            self.kind(self.strip_qualifiers(ty)),
            TypeKind::Struct(body) if body.opaque
        )
    }

    fn struct_body(&self, ty: TypeId) -> Result<&StructBody, IrError> {
        match self.kind(self.strip_qualifiers(ty)) {
            TypeKind::Struct(body) if !body.opaque => Ok(body),
            TypeKind::Struct(_) => Err(IrError::OpaqueStructQuery),
            _ => Err(IrError::OpaqueStructQuery),
        }
    }

    pub fn struct_member_count(&self, ty: TypeId) -> Result<usize, IrError> {
        Ok(self.struct_body(ty)?.members.len())
    }

    pub fn struct_member_type(&self, ty: TypeId, index: usize) -> Result<TypeId, IrError> {
        let body = self.struct_body(ty)?;
        body.members
            .get(index)
            .map(|(_, t)| *t)
            .ok_or(IrError::StructIndexOutOfBounds)
    }

    pub fn struct_member_offset(&self, ty: TypeId, index: usize) -> Result<usize, IrError> {
        let body = self.struct_body(ty)?;
        body.offsets
            .get(index)
            .copied()
            .ok_or(IrError::StructIndexOutOfBounds)
    }

    pub fn struct_member_index(&self, ty: TypeId, name: &str) -> Result<Option<usize>, IrError> {
        let body = self.struct_body(ty)?;
        Ok(body.members.iter().position(|(n, _)| n == name))
    }

    /// Byte size. Zero for void, functions and opaque structs.
    pub fn size_of(&self, ty: TypeId) -> usize {
        match self.kind(ty) {
            TypeKind::Void | TypeKind::Func { .. } => 0,
            TypeKind::Int { bits, .. } => (*bits as usize + 7) / 8,
            TypeKind::Float { bits } => *bits as usize / 8,
            TypeKind::Ptr { .. } => POINTER_SIZE,
            TypeKind::Array { elem, len } => self.size_of(*elem) * *len as usize,
            TypeKind::Struct(body) => body.size,
            TypeKind::Vector { elem, lanes } => self.size_of(*elem) * *lanes as usize,
            TypeKind::Qualified { base, .. } => self.size_of(*base),
        }
    }

    /// Byte alignment. Scalars align to their size, pointers to the pointer
    /// size, arrays to their element, vectors to the element alignment times
    /// the lane count rounded up to a power of two.
    pub fn align_of(&self, ty: TypeId) -> usize {
        match self.kind(ty) {
            TypeKind::Void | TypeKind::Func { .. } => 1,
            TypeKind::Int { bits, .. } => ((*bits as usize + 7) / 8).max(1),
            TypeKind::Float { bits } => *bits as usize / 8,
            TypeKind::Ptr { .. } => POINTER_SIZE,
            TypeKind::Array { elem, .. } => self.align_of(*elem),
            TypeKind::Struct(body) => body.align,
            TypeKind::Vector { elem, lanes } => {
                (self.align_of(*elem) * *lanes as usize).next_power_of_two()
            }
            TypeKind::Qualified { base, .. } => self.align_of(*base),
        }
    }

    /// Rendered type name: `i32`/`u8`, `f64`, `T*`, `[N x T]`, `<N x T>`,
    /// `%Name` (anonymous structs spell out their member list), `void`,
    /// `ret (params)` for function types.
    pub fn name_of(&self, ty: TypeId) -> String {
        match self.kind(ty) {
            TypeKind::Void => "void".to_string(),
            TypeKind::Int { bits, signed } => {
                format!("{}{bits}", if *signed { "i" } else { "u" })
            }
            TypeKind::Float { bits } => format!("f{bits}"),
            TypeKind::Ptr { elem } => format!("{}*", self.name_of(*elem)),
            TypeKind::Array { elem, len } => format!("[{len} x {}]", self.name_of(*elem)),
            TypeKind::Vector { elem, lanes } => format!("<{lanes} x {}>", self.name_of(*elem)),
            TypeKind::Struct(body) if !body.name.is_empty() => format!("%{}", body.name),
            TypeKind::Struct(body) if body.opaque => "opaque".to_string(),
            TypeKind::Struct(body) => {
                let members: Vec<String> =
                    body.members.iter().map(|(_, t)| self.name_of(*t)).collect();
                format!("{{ {} }}", members.join(", "))
            }
            TypeKind::Func { ret, params } => {
                let params: Vec<String> = params.iter().map(|(_, t)| self.name_of(*t)).collect();
                format!("{} ({})", self.name_of(*ret), params.join(", "))
            }
            TypeKind::Qualified { quals, base } => {
                let mut out = String::new();
                if quals.contains(Qualifiers::CONST) {
                    out.push_str("const ");
                }
                if quals.contains(Qualifiers::VOLATILE) {
                    out.push_str("volatile ");
                }
                if quals.contains(Qualifiers::RESTRICT) {
                    out.push_str("restrict ");
                }
                out.push_str(&self.name_of(*base));
                out
            }
        }
    }
}

#[inline]
fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_uniqueness() {
        let mut ts = TypeStore::new();
        let a = ts.integer_type(32, true);
        let b = ts.integer_type(32, true);
        assert_eq!(a, b);
        assert_ne!(a, ts.integer_type(32, false));
        assert_ne!(a, ts.integer_type(64, true));

        let pa = ts.pointer_type(a);
        let pb = ts.pointer_type(b);
        assert_eq!(pa, pb);

        let f = ts.float_type(64);
        let arr1 = ts.array_type(f, 4);
        let arr2 = ts.array_type(f, 4);
        assert_eq!(arr1, arr2);
        assert_ne!(arr1, ts.array_type(f, 5));
    }

    #[test]
    fn test_function_type_uniqueness() {
        let mut ts = TypeStore::new();
        let i32t = ts.integer_type(32, true);
        let void = ts.void_type();
        let f1 = ts.function_type(void, &[("a".into(), i32t), ("b".into(), i32t)]);
        let f2 = ts.function_type(void, &[("x".into(), i32t), ("y".into(), i32t)]);
        // Keyed by types only; the first creation's names stick.
        assert_eq!(f1, f2);
        assert_eq!(ts.function_params(f1).unwrap()[0].0, "a");
    }

    #[test]
    fn test_default_param_names() {
        let mut ts = TypeStore::new();
        let i32t = ts.integer_type(32, true);
        let f = ts.function_type(i32t, &[(String::new(), i32t), (String::new(), i32t)]);
        let params = ts.function_params(f).unwrap();
        assert_eq!(params[0].0, "__arg0");
        assert_eq!(params[1].0, "__arg1");
    }

    #[test]
    fn test_sizes() {
        let mut ts = TypeStore::new();
        let i1 = ts.integer_type(1, true);
        let i32t = ts.integer_type(32, true);
        let f64t = ts.float_type(64);
        let p = ts.pointer_type(i32t);
        assert_eq!(ts.size_of(i1), 1);
        assert_eq!(ts.size_of(i32t), 4);
        assert_eq!(ts.size_of(f64t), 8);
        assert_eq!(ts.size_of(p), POINTER_SIZE);
        let arr = ts.array_type(i32t, 10);
        assert_eq!(ts.size_of(arr), 40);
        let vec4 = ts.vector_type(f64t, 4);
        assert_eq!(ts.size_of(vec4), 32);
    }

    #[test]
    fn test_struct_layout() {
        let mut ts = TypeStore::new();
        let i8t = ts.integer_type(8, true);
        let i32t = ts.integer_type(32, true);
        let f64t = ts.float_type(64);
        // { i8, i32, f64 } -> offsets 0, 4, 8; size 16, align 8
        let s = ts.struct_type(
            "Mixed",
            vec![
                ("a".into(), i8t),
                ("b".into(), i32t),
                ("c".into(), f64t),
            ],
        );
        assert_eq!(ts.struct_member_offset(s, 0).unwrap(), 0);
        assert_eq!(ts.struct_member_offset(s, 1).unwrap(), 4);
        assert_eq!(ts.struct_member_offset(s, 2).unwrap(), 8);
        assert_eq!(ts.size_of(s), 16);
        assert_eq!(ts.align_of(s), 8);
        // tail padding: { f64, i8 } -> size 16
        let s2 = ts.struct_type("Padded", vec![("x".into(), f64t), ("y".into(), i8t)]);
        assert_eq!(ts.size_of(s2), 16);
    }

    #[test]
    fn test_opaque_struct() {
        let mut ts = TypeStore::new();
        let i32t = ts.integer_type(32, true);
        let s = ts.create_struct("Node");
        assert!(ts.is_opaque_struct(s));
        assert_eq!(ts.struct_member_count(s), Err(IrError::OpaqueStructQuery));
        // forward reference through a pointer works before completion
        let pnode = ts.pointer_type(s);
        ts.set_struct_body(s, vec![("value".into(), i32t), ("next".into(), pnode)])
            .unwrap();
        assert!(!ts.is_opaque_struct(s));
        assert_eq!(ts.struct_member_count(s).unwrap(), 2);
        assert_eq!(
            ts.set_struct_body(s, vec![("value".into(), i32t)]),
            Err(IrError::StructBodyAlreadySet)
        );
        // name identity
        assert_eq!(ts.create_struct("Node"), s);
        assert_eq!(ts.struct_type_by_name("Node"), Some(s));
    }

    #[test]
    fn test_anonymous_struct_consing() {
        let mut ts = TypeStore::new();
        let i32t = ts.integer_type(32, true);
        let f32t = ts.float_type(32);
        let a = ts.struct_type_anonymous(&[i32t, f32t]);
        let b = ts.struct_type_anonymous(&[i32t, f32t]);
        assert_eq!(a, b);
        assert_ne!(a, ts.struct_type_anonymous(&[f32t, i32t]));
    }

    #[test]
    fn test_qualified_transparency() {
        let mut ts = TypeStore::new();
        let i32t = ts.integer_type(32, true);
        let ci32 = ts.qualified(Qualifiers::CONST, i32t);
        assert_ne!(ci32, i32t);
        assert!(ts.is_qualified(ci32));
        assert!(!ts.is_qualified(i32t));
        assert!(ts.is_integer(ci32));
        assert_eq!(ts.size_of(ci32), 4);
        assert_eq!(ts.strip_qualifiers(ci32), i32t);
        assert_eq!(ts.qualified(Qualifiers::CONST, i32t), ci32);
        assert_eq!(ts.qualified(Qualifiers::default(), i32t), i32t);
        assert_eq!(ts.name_of(ci32), "const i32");
    }

    #[test]
    fn test_type_names() {
        let mut ts = TypeStore::new();
        let i32t = ts.integer_type(32, true);
        let u8t = ts.integer_type(8, false);
        let f64t = ts.float_type(64);
        let p = ts.pointer_type(i32t);
        let arr = ts.array_type(u8t, 16);
        let v = ts.vector_type(f64t, 2);
        assert_eq!(ts.name_of(i32t), "i32");
        assert_eq!(ts.name_of(u8t), "u8");
        assert_eq!(ts.name_of(f64t), "f64");
        assert_eq!(ts.name_of(p), "i32*");
        assert_eq!(ts.name_of(arr), "[16 x u8]");
        assert_eq!(ts.name_of(v), "<2 x f64>");
        let s = ts.struct_type("Pair", vec![("a".into(), i32t), ("b".into(), f64t)]);
        assert_eq!(ts.name_of(s), "%Pair");
        let anon = ts.struct_type_anonymous(&[i32t, f64t]);
        assert_eq!(ts.name_of(anon), "{ i32, f64 }");
        let void = ts.void_type();
        let fnty = ts.function_type(void, &[("a".into(), i32t)]);
        assert_eq!(ts.name_of(fnty), "void (i32)");
    }
}
