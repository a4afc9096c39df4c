//! End-to-end builder scenarios: construct small functions through the
//! public API and check the def-use graph, CFG and type facts that the
//! rest of the compiler relies on.

use cobalt_ir::{IntPredicate, IrBuilder, Module, Opcode};

#[test]
fn add_then_return() {
    let mut m = Module::new("adder");
    let i32t = m.integer_type(32, true);
    let f = m.create_function("add", i32t, &[("a".into(), i32t), ("b".into(), i32t)]);
    let entry = m.create_basic_block(f, "entry");
    let a = m.arg(f, 0).unwrap();
    let b = m.arg(f, 1).unwrap();

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let r = builder.create_add(a, b, "r").unwrap();
    let ret = builder.create_ret(Some(r)).unwrap();

    assert_eq!(m.users(r), &[ret]);
    assert_eq!(m.users(a), &[r]);
    assert_eq!(m.users(b), &[r]);
    assert_eq!(m.operands(r), &[a, b]);
    assert_eq!(m.get_terminator(entry), Some(ret));
    assert_eq!(m.value_type(r), i32t);
}

#[test]
fn branch_on_equality() {
    // i32 @abs(i32 %x):
    //   entry: %c = icmp slt i32 %x, 0 ; br i1 %c, %neg, %pos
    //   neg:   %n = sub i32 0, %x      ; br %end
    //   pos:   br %end
    //   end:   %r = phi i32 [ %n, %neg ], [ %x, %pos ] ; ret i32 %r
    let mut m = Module::new("abs");
    let i32t = m.integer_type(32, true);
    let f = m.create_function("abs", i32t, &[("x".into(), i32t)]);
    let entry = m.create_basic_block(f, "entry");
    let neg = m.create_basic_block(f, "neg");
    let pos = m.create_basic_block(f, "pos");
    let end = m.create_basic_block(f, "end");
    let x = m.arg(f, 0).unwrap();
    let zero = m.get_constant_int(i32t, 0);

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let c = builder.create_icmp(IntPredicate::Slt, x, zero, "c").unwrap();
    builder.create_cond_br(c, neg, pos).unwrap();

    builder.set_insert_point(neg);
    let n = builder.create_sub(zero, x, "n").unwrap();
    builder.create_br(end).unwrap();

    builder.set_insert_point(pos);
    builder.create_br(end).unwrap();

    builder.set_insert_point(end);
    let r = builder.create_phi(i32t, "r").unwrap();
    builder.add_incoming(r, n, neg).unwrap();
    builder.add_incoming(r, x, pos).unwrap();
    builder.create_ret(Some(r)).unwrap();

    assert_eq!(m.predecessors(end), &[neg, pos]);
    assert_eq!(m.successors(entry), &[neg, pos]);
    assert!(m.predecessors(entry).is_empty());
    assert_eq!(m.entry_block(f), Some(entry));
    // two incoming pairs
    assert_eq!(m.operands(r).len(), 4);
    assert_eq!(m.operands(r), &[n, neg, x, pos]);
    // the phi uses both the values and the blocks
    assert!(m.users(n).contains(&r));
    assert!(m.users(neg).contains(&r));
}

#[test]
fn struct_gep() {
    let mut m = Module::new("s");
    let i32t = m.integer_type(32, true);
    let f32t = m.float_type(32);
    let void = m.void_type();
    let s = m.struct_type("S", vec![("a".into(), i32t), ("b".into(), f32t)]);
    let f = m.create_function("use_s", void, &[]);
    let entry = m.create_basic_block(f, "entry");

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let p = builder.create_alloca(s, "p").unwrap();
    let field = builder.create_struct_gep(p, 1, "f").unwrap();
    builder.create_ret_void().unwrap();

    let ptr_f32 = m.pointer_type(f32t);
    assert_eq!(m.value_type(field), ptr_f32);
    assert_eq!(m.types().struct_member_offset(s, 1).unwrap(), 4);
    assert_eq!(m.types().size_of(s), 8);
}

#[test]
fn cast_dispatch() {
    let mut m = Module::new("c");
    let i32t = m.integer_type(32, true);
    let i64t = m.integer_type(64, true);
    let f64t = m.float_type(64);
    let f = m.create_function("casts", i64t, &[("x".into(), i32t), ("y".into(), f64t)]);
    let entry = m.create_basic_block(f, "entry");
    let x = m.arg(f, 0).unwrap();
    let y = m.arg(f, 1).unwrap();

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);

    // signed i32 -> i64 widens with sext
    let wide = builder.create_cast(x, i64t, "w").unwrap();
    assert_eq!(builder.module().opcode(wide), Some(Opcode::SExt));

    // f64 -> i32 converts with fptosi
    let toint = builder.create_cast(y, i32t, "ti").unwrap();
    assert_eq!(builder.module().opcode(toint), Some(Opcode::FPToSI));

    // i32* -> i64 on a 64-bit target is a bitcast
    let slot = builder.create_alloca(i32t, "slot").unwrap();
    let asint = builder.create_cast(slot, i64t, "pi").unwrap();
    assert_eq!(builder.module().opcode(asint), Some(Opcode::BitCast));

    // identical type: returns the source, emits nothing
    let tail = builder.module().last_instruction(entry);
    let same = builder.create_cast(x, i32t, "").unwrap();
    assert_eq!(same, x);
    assert_eq!(builder.module().last_instruction(entry), tail);
}

#[test]
fn use_symmetry_after_replacement() {
    let mut m = Module::new("u");
    let i32t = m.integer_type(32, true);
    let f = m.create_function(
        "f",
        i32t,
        &[("a".into(), i32t), ("b".into(), i32t), ("c".into(), i32t)],
    );
    let entry = m.create_basic_block(f, "entry");
    let a = m.arg(f, 0).unwrap();
    let b = m.arg(f, 1).unwrap();
    let c = m.arg(f, 2).unwrap();

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let s = builder.create_add(a, b, "s").unwrap();

    m.set_operand(s, 1, c).unwrap();
    assert!(!m.users(b).contains(&s));
    assert!(m.users(c).contains(&s));
    assert_eq!(m.operands(s), &[a, c]);

    // restoring the old operand restores both sides exactly
    m.set_operand(s, 1, b).unwrap();
    assert_eq!(m.operands(s), &[a, b]);
    assert_eq!(m.users(b), &[s]);
    assert!(m.users(c).is_empty());
}

#[test]
fn constant_uniqueness() {
    let mut m = Module::new("k");
    let i32t = m.integer_type(32, true);
    let f64t = m.float_type(64);

    assert_eq!(m.get_constant_int(i32t, 42), m.get_constant_int(i32t, 42));

    let neg_zero = m.get_constant_fp(f64t, -0.0);
    let pos_zero = m.get_constant_fp(f64t, 0.0);
    assert_ne!(neg_zero, pos_zero);
    assert_eq!(neg_zero, m.get_constant_fp(f64t, -0.0));
}

#[test]
fn erase_requires_no_users() {
    let mut m = Module::new("e");
    let i32t = m.integer_type(32, true);
    let f = m.create_function("f", i32t, &[("a".into(), i32t)]);
    let entry = m.create_basic_block(f, "entry");
    let a = m.arg(f, 0).unwrap();

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let s = builder.create_add(a, a, "s").unwrap();
    let ret = builder.create_ret(Some(s)).unwrap();

    // the add is still used by the return
    assert_eq!(m.erase_instruction(s), Err(cobalt_ir::IrError::ValueHasUsers));

    m.erase_instruction(ret).unwrap();
    assert!(m.users(s).is_empty());
    m.erase_instruction(s).unwrap();
    assert!(m.users(a).is_empty());
    assert_eq!(m.first_instruction(entry), None);
}

#[test]
fn remove_basic_block() {
    let mut m = Module::new("rb");
    let void = m.void_type();
    let i32t = m.integer_type(32, true);
    let f = m.create_function("f", void, &[]);
    let entry = m.create_basic_block(f, "entry");
    let dead = m.create_basic_block(f, "dead");

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    builder.create_br(dead).unwrap();

    builder.set_insert_point(dead);
    let x = builder.create_alloca(i32t, "x").unwrap();
    let v = builder.create_load(x, "v").unwrap();
    let slot = builder.create_alloca(i32t, "slot").unwrap();
    builder.create_store(v, slot).unwrap();
    builder.create_ret_void().unwrap();

    // still reachable from entry
    assert_eq!(
        m.remove_basic_block(dead),
        Err(cobalt_ir::IrError::BlockHasPredecessors)
    );

    let br = m.get_terminator(entry).unwrap();
    m.erase_instruction(br).unwrap();
    assert!(m.predecessors(dead).is_empty());
    m.remove_basic_block(dead).unwrap();
    assert_eq!(m.blocks(f), &[entry]);
}

#[test]
fn hidden_retval_and_instance_method() {
    let mut m = Module::new("h");
    let void = m.void_type();
    let i32t = m.integer_type(32, true);
    let f32t = m.float_type(32);
    let pair = m.struct_type("Pair", vec![("a".into(), i32t), ("b".into(), f32t)]);
    let out_ptr = m.pointer_type(pair);
    // aggregate return lowered to an out-pointer: logical return is void
    let f = m.create_function("make_pair", void, &[("out".into(), out_ptr)]);
    m.set_hidden_retval_type(f, pair);
    m.set_instance_method(f, true);

    assert_eq!(m.hidden_retval_type(f), Some(pair));
    assert!(m.is_instance_method(f));
    assert_eq!(m.function_return_type(f), void);
}

#[test]
fn qualified_types_are_transparent() {
    let mut m = Module::new("q");
    let i32t = m.integer_type(32, true);
    let ci32 = m.qualified(cobalt_ir::Qualifiers::CONST, i32t);
    assert!(m.types().is_qualified(ci32));
    assert!(m.types().is_integer(ci32));
    assert_ne!(ci32, i32t);
    // a const i32 slot can still be allocated (size comes from the base)
    let void = m.void_type();
    let f = m.create_function("f", void, &[]);
    let entry = m.create_basic_block(f, "entry");
    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let slot = builder.create_alloca(ci32, "s").unwrap();
    let loaded = builder.create_load(slot, "v").unwrap();
    assert_eq!(builder.module().value_type(loaded), ci32);
}

#[test]
fn entry_block_has_no_predecessors() {
    let mut m = Module::new("entry");
    let void = m.void_type();
    let f = m.create_function("loop", void, &[]);
    let entry = m.create_basic_block(f, "entry");
    let body = m.create_basic_block(f, "body");

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    builder.create_br(body).unwrap();
    builder.set_insert_point(body);
    builder.create_br(body).unwrap();

    assert!(m.predecessors(entry).is_empty());
    assert_eq!(m.predecessors(body), &[entry, body]);
}
