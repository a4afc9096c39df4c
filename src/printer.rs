//! Textual rendering of IR modules.
//!
//! One canonical form per instruction, LLVM-flavored. The printer is a pure
//! consumer of the module API: it never mutates, and unnamed values get
//! sequential `%N` slots local to their function (arguments first, then
//! blocks and instruction results in order).

use rustc_hash::FxHashMap;

use crate::constant::{escape_string, render_int, ConstKind};
use crate::instruction::Opcode;
use crate::module::Module;
use crate::value::{ValueId, ValueKind};

/// Renders every global variable and function in the module.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for &global in module.global_variables() {
        print_global(module, global, &mut out);
    }
    for (i, &func) in module.functions().iter().enumerate() {
        if i > 0 || !module.global_variables().is_empty() {
            out.push('\n');
        }
        print_function_into(module, func, &mut out);
    }
    out
}

/// Renders one function definition.
pub fn print_function(module: &Module, func: ValueId) -> String {
    let mut out = String::new();
    print_function_into(module, func, &mut out);
    out
}

/// Renders one instruction, without the trailing newline.
pub fn print_instruction(module: &Module, inst: ValueId) -> String {
    let block = module
        .inst_parent(inst)
        .expect("can only print instructions");
    let names = NameMap::build(module, module.block_parent(block));
    let mut out = String::new();
    render_instruction(module, &names, inst, &mut out);
    out
}

fn print_global(module: &Module, global: ValueId, out: &mut String) {
    let name = module.value_name(global).unwrap_or("");
    let data = match module.value_kind(global) {
        ValueKind::Global(data) => data,
        _ => panic!("value is not a global variable"),
    };
    let keyword = if data.is_constant { "constant" } else { "global" };
    let ty = module.types().name_of(data.value_ty);
    let init = match data.init {
        Some(init) => render_constant(module, init),
        None => "zeroinitializer".to_string(),
    };
    out.push_str(&format!("@{name} = {keyword} {ty} {init}\n"));
}

fn print_function_into(module: &Module, func: ValueId, out: &mut String) {
    let names = NameMap::build(module, func);
    let name = module.value_name(func).unwrap_or("");
    let ret = module.types().name_of(module.function_return_type(func));
    let params: Vec<String> = module
        .args(func)
        .iter()
        .map(|&arg| {
            format!(
                "{} {}",
                module.types().name_of(module.value_type(arg)),
                names.of(module, arg)
            )
        })
        .collect();
    if module.blocks(func).is_empty() {
        out.push_str(&format!("declare {ret} @{name}({})\n", params.join(", ")));
        return;
    }
    out.push_str(&format!("define {ret} @{name}({}) {{\n", params.join(", ")));
    for &bb in module.blocks(func) {
        out.push_str(&format!("{}:\n", names.label(module, bb)));
        for inst in module.instructions(bb) {
            render_instruction(module, &names, inst, out);
            out.push('\n');
        }
    }
    out.push_str("}\n");
}

/// Per-function naming: named values print their name, the rest take
/// sequential slots.
struct NameMap {
    slots: FxHashMap<ValueId, usize>,
}

impl NameMap {
    fn build(module: &Module, func: ValueId) -> Self {
        let mut slots = FxHashMap::default();
        let mut next = 0usize;
        let mut claim = |v: ValueId, named: bool| {
            if !named {
                slots.insert(v, next);
                next += 1;
            }
        };
        for &arg in module.args(func) {
            claim(arg, module.value_name(arg).is_some());
        }
        for &bb in module.blocks(func) {
            claim(bb, module.value_name(bb).is_some());
            for inst in module.instructions(bb) {
                let produces = !module.types().is_void(module.value_type(inst));
                if produces {
                    claim(inst, module.value_name(inst).is_some());
                }
            }
        }
        Self { slots }
    }

    fn of(&self, module: &Module, v: ValueId) -> String {
        match module.value_name(v) {
            Some(name) => format!("%{name}"),
            None => format!("%{}", self.slots.get(&v).copied().unwrap_or(0)),
        }
    }

    fn label(&self, module: &Module, bb: ValueId) -> String {
        match module.value_name(bb) {
            Some(name) => name.to_string(),
            None => self.slots.get(&bb).copied().unwrap_or(0).to_string(),
        }
    }
}

/// An operand as it appears in instruction text.
fn format_value(module: &Module, names: &NameMap, v: ValueId) -> String {
    match module.value_kind(v) {
        ValueKind::Constant(_) => render_constant(module, v),
        ValueKind::Global(_) | ValueKind::Function(_) => {
            format!("@{}", module.value_name(v).unwrap_or(""))
        }
        ValueKind::Block(_) => names.of(module, v),
        _ => names.of(module, v),
    }
}

fn render_constant(module: &Module, c: ValueId) -> String {
    let ty = module.value_type(c);
    match module.value_kind(c) {
        ValueKind::Constant(ConstKind::Int { value }) => {
            let (bits, signed) = module.types().int_info(ty).unwrap_or((64, true));
            render_int(*value, bits, signed)
        }
        ValueKind::Constant(ConstKind::Float { bits }) => {
            format!("{:?}", f64::from_bits(*bits))
        }
        ValueKind::Constant(ConstKind::Null) => "null".to_string(),
        ValueKind::Constant(ConstKind::AggregateZero) => "zeroinitializer".to_string(),
        ValueKind::Constant(ConstKind::Str { value }) => {
            format!("c\"{}\"", escape_string(value))
        }
        ValueKind::Constant(ConstKind::Array { elems }) => {
            let parts: Vec<String> = elems
                .iter()
                .map(|&e| {
                    format!(
                        "{} {}",
                        module.types().name_of(module.value_type(e)),
                        render_constant(module, e)
                    )
                })
                .collect();
            format!("[{}]", parts.join(", "))
        }
        ValueKind::Constant(ConstKind::Struct { members }) => {
            let parts: Vec<String> = members
                .iter()
                .map(|&m| {
                    format!(
                        "{} {}",
                        module.types().name_of(module.value_type(m)),
                        render_constant(module, m)
                    )
                })
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        _ => panic!("value is not a constant"),
    }
}

fn render_instruction(module: &Module, names: &NameMap, inst: ValueId, out: &mut String) {
    let opcode = module.opcode(inst).expect("instruction expected");
    let types = module.types();
    let val = |v: ValueId| format_value(module, names, v);
    let ty_of = |v: ValueId| types.name_of(module.value_type(v));
    let result = names.of(module, inst);
    match opcode {
        Opcode::Alloca => {
            let allocated = types
                .pointee(module.value_type(inst))
                .expect("alloca result is a pointer");
            out.push_str(&format!("  {result} = alloca {}", types.name_of(allocated)));
        }
        Opcode::Load => {
            let ptr = module.operands(inst)[0];
            out.push_str(&format!(
                "  {result} = load {}, {} {}",
                ty_of(inst),
                ty_of(ptr),
                val(ptr)
            ));
        }
        Opcode::Store => {
            let ops = module.operands(inst);
            let (value, ptr) = (ops[0], ops[1]);
            out.push_str(&format!(
                "  store {} {}, {} {}",
                ty_of(value),
                val(value),
                ty_of(ptr),
                val(ptr)
            ));
        }
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::UDiv
        | Opcode::SDiv
        | Opcode::URem
        | Opcode::SRem
        | Opcode::BitAnd
        | Opcode::BitOr
        | Opcode::BitXor
        | Opcode::Shl
        | Opcode::LShr
        | Opcode::AShr => {
            let ops = module.operands(inst);
            out.push_str(&format!(
                "  {result} = {} {} {}, {}",
                opcode.mnemonic(),
                ty_of(inst),
                val(ops[0]),
                val(ops[1])
            ));
        }
        Opcode::Neg | Opcode::Not | Opcode::FNeg | Opcode::BitNot => {
            let src = module.operands(inst)[0];
            out.push_str(&format!(
                "  {result} = {} {} {}",
                opcode.mnemonic(),
                ty_of(inst),
                val(src)
            ));
        }
        Opcode::ICmp(pred) => {
            let ops = module.operands(inst);
            out.push_str(&format!(
                "  {result} = icmp {pred} {} {}, {}",
                ty_of(ops[0]),
                val(ops[0]),
                val(ops[1])
            ));
        }
        Opcode::FCmp(pred) => {
            let ops = module.operands(inst);
            out.push_str(&format!(
                "  {result} = fcmp {pred} {} {}, {}",
                ty_of(ops[0]),
                val(ops[0]),
                val(ops[1])
            ));
        }
        Opcode::GetElementPtr => {
            let ops = module.operands(inst);
            let base = ops[0];
            let base_ty = types
                .pointee(module.value_type(base))
                .expect("GEP base is a pointer");
            out.push_str(&format!(
                "  {result} = getelementptr {}, {} {}",
                types.name_of(base_ty),
                ty_of(base),
                val(base)
            ));
            for &idx in &ops[1..] {
                out.push_str(&format!(", {} {}", ty_of(idx), val(idx)));
            }
        }
        Opcode::Br => {
            let target = module.operands(inst)[0];
            out.push_str(&format!("  br label {}", val(target)));
        }
        Opcode::CondBr => {
            let ops = module.operands(inst);
            out.push_str(&format!(
                "  br i1 {}, label {}, label {}",
                val(ops[0]),
                val(ops[1]),
                val(ops[2])
            ));
        }
        Opcode::Ret => match module.operands(inst).first() {
            Some(&v) => out.push_str(&format!("  ret {} {}", ty_of(v), val(v))),
            None => out.push_str("  ret void"),
        },
        Opcode::Unreachable => out.push_str("  unreachable"),
        Opcode::Phi => {
            let ops = module.operands(inst);
            out.push_str(&format!("  {result} = phi {} ", ty_of(inst)));
            for (i, pair) in ops.chunks(2).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format!("[ {}, {} ]", val(pair[0]), val(pair[1])));
            }
        }
        Opcode::Call | Opcode::RawCall => {
            let ops = module.operands(inst);
            let ret = ty_of(inst);
            let args: Vec<String> = ops[1..]
                .iter()
                .map(|&a| format!("{} {}", ty_of(a), val(a)))
                .collect();
            let callee = val(ops[0]);
            if types.is_void(module.value_type(inst)) {
                out.push_str(&format!("  call {ret} {callee}({})", args.join(", ")));
            } else {
                out.push_str(&format!(
                    "  {result} = call {ret} {callee}({})",
                    args.join(", ")
                ));
            }
        }
        Opcode::ZExt
        | Opcode::SExt
        | Opcode::Trunc
        | Opcode::FPExt
        | Opcode::FPTrunc
        | Opcode::SIToFP
        | Opcode::UIToFP
        | Opcode::FPToSI
        | Opcode::FPToUI
        | Opcode::PtrToInt
        | Opcode::IntToPtr
        | Opcode::BitCast => {
            let src = module.operands(inst)[0];
            out.push_str(&format!(
                "  {result} = {} {} {} to {}",
                opcode.mnemonic(),
                ty_of(src),
                val(src),
                ty_of(inst)
            ));
        }
    }
}
