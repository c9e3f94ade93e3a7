//! End-to-end pipeline tests: source text through lexer, parser,
//! resolver and LLVM lowering, asserting on the printed IR.

use inkwell::context::Context;

use apexc::compiler::Compiler;
use apexc::errors::Diagnostics;
use apexc::lexer::Lexer;
use apexc::parser::Parser;
use apexc::resolver::Resolver;

fn parse_and_resolve(source: &str) -> apexc::ast::Module {
    let tokens = Lexer::new(source, "test.apex").tokenize_all();
    let mut parser = Parser::new(tokens);
    let module = parser.parse_module();
    assert!(!parser.has_errors(), "parse errors: {:?}", parser.diagnostics().errors());

    let mut resolver = Resolver::new();
    let ok = resolver.analyze(&module);
    assert!(ok, "resolve errors: {:?}", resolver.diagnostics().errors());

    module
}

fn lower_with_diags(source: &str) -> (String, Diagnostics) {
    let module = parse_and_resolve(source);

    let context = Context::create();
    let compiler = Compiler::new(&context, "test");
    let diags = compiler.compile(&module);
    (compiler.ir_string(), diags)
}

fn lower(source: &str) -> String {
    let (ir, diags) = lower_with_diags(source);
    assert!(!diags.has_errors(), "lowering errors: {:?}", diags.errors());
    ir
}

// ── the end-to-end scenarios ────────────────────────────────────────

#[test]
fn identity_function_returns_its_parameter() {
    let ir = lower("fn id(x: i32) -> i32 { x }");
    assert!(ir.contains("define i32 @id(i32 %x)"), "{ir}");
    assert!(ir.contains("ret i32 %x"), "{ir}");
}

#[test]
fn if_expression_joins_with_a_phi() {
    let ir = lower("fn sel(c: bool, a: i32, b: i32) -> i32 { if c { a } else { b } }");
    assert!(ir.contains("br i1 %c, label %then, label %else"), "{ir}");
    assert!(ir.contains("phi i32"), "{ir}");
    assert!(ir.contains("ret i32 %iftmp"), "{ir}");
}

#[test]
fn mutable_local_lowers_through_an_alloca() {
    let ir = lower("fn inc(x: i32) -> i32 { let mut y = x; y = y + 1; y }");
    assert!(ir.contains("%y = alloca i32"), "{ir}");
    assert!(ir.contains("store i32 %x, ptr %y"), "{ir}");
    assert!(ir.contains("add i32"), "{ir}");
    assert!(ir.contains("ret i32"), "{ir}");
}

#[test]
fn for_range_loop_builds_the_full_cfg() {
    let ir = lower("fn sum(n: i32) -> i32 { let mut s = 0; for i in 0..n { s = s + i; } s }");
    for label in ["for.cond:", "for.body:", "for.inc:", "for.end:"] {
        assert!(ir.contains(label), "missing {label} in {ir}");
    }
    assert!(ir.contains("%s = alloca i32"), "{ir}");
    assert!(ir.contains("%i = alloca i32"), "{ir}");
    assert!(ir.contains("icmp slt i32"), "{ir}");
}

#[test]
fn undefined_identifier_is_reported_once_by_the_resolver() {
    let tokens = Lexer::new("fn f() -> i32 { missing }", "test.apex").tokenize_all();
    let mut parser = Parser::new(tokens);
    let module = parser.parse_module();
    assert!(!parser.has_errors());

    let mut resolver = Resolver::new();
    assert!(!resolver.analyze(&module));
    let errors = resolver.diagnostics().errors();
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].to_string().contains("error: Undefined identifier 'missing'"),
        "{}",
        errors[0],
    );
}

#[test]
fn duplicate_field_is_reported_at_the_second_field() {
    let tokens = Lexer::new("struct S { a: i32, a: i32 }", "test.apex").tokenize_all();
    let mut parser = Parser::new(tokens);
    let module = parser.parse_module();
    assert!(!parser.has_errors());

    let mut resolver = Resolver::new();
    assert!(!resolver.analyze(&module));
    let errors = resolver.diagnostics().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Duplicate field 'a'"));
    assert_eq!(errors[0].location.column, 20);
}

// ── further lowering coverage ───────────────────────────────────────

#[test]
fn while_loop_builds_cond_body_end() {
    let ir = lower("fn count(n: i32) -> i32 { let mut i = 0; while i < n { i = i + 1; } i }");
    for label in ["while.cond:", "while.body:", "while.end:"] {
        assert!(ir.contains(label), "missing {label} in {ir}");
    }
    assert!(ir.contains("icmp slt i32"), "{ir}");
}

#[test]
fn void_function_returns_void() {
    let ir = lower("fn nop() { }");
    assert!(ir.contains("define void @nop()"), "{ir}");
    assert!(ir.contains("ret void"), "{ir}");
}

#[test]
fn direct_calls_use_the_global_symbol() {
    let ir = lower("fn one() -> i32 { 1 } fn two() -> i32 { one() + one() }");
    assert!(ir.contains("call i32 @one()"), "{ir}");
}

#[test]
fn both_arms_returning_discards_the_merge_block() {
    let ir = lower("fn pick(c: bool) -> i32 { if c { return 1 } else { return 2 } }");
    assert!(!ir.contains("ifcont"), "{ir}");
    assert!(ir.contains("ret i32 1"), "{ir}");
    assert!(ir.contains("ret i32 2"), "{ir}");
}

#[test]
fn struct_literal_and_field_access() {
    let ir = lower(
        "struct Point { x: i32, y: i32 }\n\
         fn get_x(a: i32, b: i32) -> i32 { let p = Point { x: a, y: b }; p.x }",
    );
    assert!(ir.contains("%Point = type { i32, i32 }"), "{ir}");
    assert!(ir.contains("extractvalue"), "{ir}");
}

#[test]
fn field_assignment_through_mutable_slot() {
    let ir = lower(
        "struct Point { x: i32, y: i32 }\n\
         fn set_x(a: i32, b: i32) -> i32 { let mut p = Point { x: a, y: b }; p.x = 5; p.x }",
    );
    assert!(ir.contains("getelementptr"), "{ir}");
}

#[test]
fn string_literal_becomes_a_global() {
    let ir = lower("fn s() { \"hi\"; }");
    assert!(ir.contains("c\"hi\\00\""), "{ir}");
}

#[test]
fn sign_extending_cast() {
    let ir = lower("fn widen(x: i32) -> i64 { x as i64 }");
    assert!(ir.contains("sext i32 %x to i64"), "{ir}");
}

#[test]
fn compound_assignment_loads_applies_stores() {
    let ir = lower("fn f(x: i32) -> i32 { let mut a = x; a += 2; a }");
    assert!(ir.contains("add i32"), "{ir}");
    assert!(ir.contains("store i32"), "{ir}");
}

#[test]
fn float_arithmetic_uses_float_instructions() {
    let ir = lower("fn avg(a: f64, b: f64) -> f64 { (a + b) / 2.0 }");
    assert!(ir.contains("fadd double"), "{ir}");
    assert!(ir.contains("fdiv double"), "{ir}");
}

#[test]
fn decoded_hex_literal_flows_into_the_ir() {
    let ir = lower("fn h() -> i32 { /* /* nested comment */ */ 0x1F_i32 }");
    assert!(ir.contains("ret i32 31"), "{ir}");
}

#[test]
fn oversized_literal_warns_and_truncates() {
    let (_, diags) = lower_with_diags("fn big() -> i32 { 5000000000 }");
    assert!(!diags.has_errors(), "{:?}", diags.errors());
    assert_eq!(diags.warnings().len(), 1);
    assert!(
        diags.warnings()[0].to_string().contains("warning: Integer literal"),
        "{}",
        diags.warnings()[0],
    );
}

#[test]
fn missing_return_value_fails_verification_and_erases_the_function() {
    let (ir, diags) = lower_with_diags("fn f() -> i32 { }");
    assert!(diags.has_errors());
    assert!(
        diags.errors()[0].to_string().contains("Function verification failed for 'f'"),
        "{}",
        diags.errors()[0],
    );
    assert!(!ir.contains("define i32 @f"), "{ir}");
}

#[test]
fn extern_functions_stay_declarations() {
    let ir = lower("extern { fn putchar(c: i32) -> i32; } fn f() -> i32 { putchar(65) }");
    assert!(ir.contains("declare i32 @putchar(i32)"), "{ir}");
    assert!(ir.contains("call i32 @putchar(i32 65)"), "{ir}");
}

#[test]
fn shadowed_loop_variable_is_restored_after_the_loop() {
    let ir = lower(
        "fn f(n: i32) -> i32 { let mut i = 100; for i in 0..n { i; } i }",
    );
    // Two distinct allocas carry the same source name.
    assert!(ir.contains("%i = alloca i32"), "{ir}");
    assert!(ir.contains("%i1 = alloca i32"), "{ir}");
}

#[test]
fn emitted_ir_writes_to_disk() {
    let module = parse_and_resolve("fn id(x: i32) -> i32 { x }");

    let context = Context::create();
    let compiler = Compiler::new(&context, "test");
    let diags = compiler.compile(&module);
    assert!(!diags.has_errors());

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.ll");
    compiler.write_ir_file(&path).expect("write ir");

    let written = std::fs::read_to_string(&path).expect("read ir back");
    assert!(written.contains("define i32 @id"));
}
