//! Golden tests for the textual rendering: one canonical form per
//! instruction, stable across runs.

use cobalt_ir::printer::{print_function, print_module};
use cobalt_ir::{FloatPredicate, IntPredicate, IrBuilder, Module};

#[test]
fn print_add_function() {
    let mut m = Module::new("adder");
    let i32t = m.integer_type(32, true);
    let f = m.create_function("add", i32t, &[("a".into(), i32t), ("b".into(), i32t)]);
    let entry = m.create_basic_block(f, "entry");
    let a = m.arg(f, 0).unwrap();
    let b = m.arg(f, 1).unwrap();

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let r = builder.create_add(a, b, "r").unwrap();
    builder.create_ret(Some(r)).unwrap();

    assert_eq!(
        print_function(&m, f),
        "define i32 @add(i32 %a, i32 %b) {\n\
         entry:\n\
         \x20 %r = add i32 %a, %b\n\
         \x20 ret i32 %r\n\
         }\n"
    );
}

#[test]
fn print_abs_function() {
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

    assert_eq!(
        print_function(&m, f),
        "define i32 @abs(i32 %x) {\n\
         entry:\n\
         \x20 %c = icmp slt i32 %x, 0\n\
         \x20 br i1 %c, label %neg, label %pos\n\
         neg:\n\
         \x20 %n = sub i32 0, %x\n\
         \x20 br label %end\n\
         pos:\n\
         \x20 br label %end\n\
         end:\n\
         \x20 %r = phi i32 [ %n, %neg ], [ %x, %pos ]\n\
         \x20 ret i32 %r\n\
         }\n"
    );
}

#[test]
fn print_memory_and_gep() {
    let mut m = Module::new("mem");
    let i32t = m.integer_type(32, true);
    let f32t = m.float_type(32);
    let void = m.void_type();
    let s = m.struct_type("S", vec![("a".into(), i32t), ("b".into(), f32t)]);
    let f = m.create_function("touch", void, &[]);
    let entry = m.create_basic_block(f, "entry");

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let p = builder.create_alloca(s, "p").unwrap();
    let field = builder.create_struct_gep(p, 1, "f").unwrap();
    let one = builder.get_float32(1.5);
    builder.create_store(one, field).unwrap();
    builder.create_load(field, "v").unwrap();
    builder.create_ret_void().unwrap();

    let text = print_function(&m, f);
    assert!(text.contains("  %p = alloca %S\n"));
    assert!(text.contains("  %f = getelementptr %S, %S* %p, i32 0, i32 1\n"));
    assert!(text.contains("  store f32 1.5, f32* %f\n"));
    assert!(text.contains("  %v = load f32, f32* %f\n"));
    assert!(text.contains("  ret void\n"));
}

#[test]
fn print_casts() {
    let mut m = Module::new("casts");
    let i32t = m.integer_type(32, true);
    let i64t = m.integer_type(64, true);
    let i16t = m.integer_type(16, true);
    let u32t = m.integer_type(32, false);
    let f64t = m.float_type(64);
    let f = m.create_function("conv", i64t, &[("x".into(), i32t), ("u".into(), u32t)]);
    let entry = m.create_basic_block(f, "entry");
    let x = m.arg(f, 0).unwrap();
    let u = m.arg(f, 1).unwrap();

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let w = builder.create_sext(x, i64t, "w").unwrap();
    builder.create_zext(u, i64t, "zw").unwrap();
    builder.create_trunc(x, i16t, "t").unwrap();
    builder.create_sitofp(x, f64t, "fp").unwrap();
    builder.create_ret(Some(w)).unwrap();

    let text = print_function(&m, f);
    assert!(text.contains("  %w = sext i32 %x to i64\n"));
    assert!(text.contains("  %zw = zext u32 %u to i64\n"));
    assert!(text.contains("  %t = trunc i32 %x to i16\n"));
    assert!(text.contains("  %fp = sitofp i32 %x to f64\n"));
}

#[test]
fn print_fcmp_and_calls() {
    let mut m = Module::new("fc");
    let i32t = m.integer_type(32, true);
    let f64t = m.float_type(64);
    let callee = m.create_function("observe", i32t, &[("v".into(), f64t)]);
    let i1 = m.int1_type();
    let f = m.create_function("check", i1, &[("a".into(), f64t), ("b".into(), f64t)]);
    let entry = m.create_basic_block(f, "entry");
    let a = m.arg(f, 0).unwrap();
    let b = m.arg(f, 1).unwrap();

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    let c = builder
        .create_fcmp(FloatPredicate::Olt, a, b, "c")
        .unwrap();
    builder.create_call(callee, &[a], "obs").unwrap();
    builder.create_ret(Some(c)).unwrap();

    let text = print_function(&m, f);
    assert!(text.contains("  %c = fcmp olt f64 %a, %b\n"));
    assert!(text.contains("  %obs = call i32 @observe(f64 %a)\n"));
    assert!(text.contains("  ret i1 %c\n"));
}

#[test]
fn print_globals_and_strings() {
    let mut m = Module::new("g");
    let i32t = m.integer_type(32, true);
    let forty_two = m.get_constant_int(i32t, 42);
    m.create_global_variable(i32t, true, Some(forty_two), "answer");
    m.create_global_variable(i32t, false, None, "slot");
    let greeting = m.get_constant_string("hi");
    let greeting_ty = m.value_type(greeting);
    m.create_global_variable(greeting_ty, true, Some(greeting), "msg");

    let arr = m.array_type(i32t, 2);
    let one = m.get_constant_int(i32t, 1);
    let two = m.get_constant_int(i32t, 2);
    let pair = m.get_constant_array(arr, &[one, two]).unwrap();
    m.create_global_variable(arr, true, Some(pair), "pair");

    let text = print_module(&m);
    assert!(text.contains("@answer = constant i32 42\n"));
    assert!(text.contains("@slot = global i32 zeroinitializer\n"));
    assert!(text.contains("@msg = constant [3 x i8] c\"hi\\00\"\n"));
    assert!(text.contains("@pair = constant [2 x i32] [i32 1, i32 2]\n"));
}

#[test]
fn print_unreachable_and_void_call() {
    let mut m = Module::new("u");
    let void = m.void_type();
    let panic_fn = m.create_function("panic", void, &[]);
    let f = m.create_function("f", void, &[]);
    let entry = m.create_basic_block(f, "entry");

    let mut builder = IrBuilder::new(&mut m);
    builder.set_insert_point(entry);
    builder.create_call(panic_fn, &[], "").unwrap();
    builder.create_unreachable().unwrap();

    let text = print_function(&m, f);
    assert!(text.contains("  call void @panic()\n"));
    assert!(text.contains("  unreachable\n"));
}
