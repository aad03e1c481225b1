//! Tests for storage layout: offsets and sizes of variables, parameters,
//! fields and locals, and the frames opened by functions and classes.

use tacgen_compiler::compiler::ast::{BinOp, Stmt, TypeExpr};
use tacgen_compiler::compiler::builders::*;
use tacgen_compiler::compiler::symbols::{DeclaredType, ScopeTable, Symbol, SymbolKind};
use tacgen_compiler::{compile, CompileOptions, CompileOutput, NestedFrameLayout};

fn compiled_with(stmts: Vec<Stmt>, options: &CompileOptions) -> CompileOutput {
    compile(&program(stmts), options).expect("compile failed")
}

fn compiled(stmts: Vec<Stmt>) -> CompileOutput {
    compiled_with(stmts, &CompileOptions::default())
}

fn folded() -> CompileOptions {
    CompileOptions { nested_frames: NestedFrameLayout::Folded, ..Default::default() }
}

fn named<'a>(scopes: &'a ScopeTable, name: &str) -> &'a Symbol {
    scopes.iter().find(|s| s.name == name).unwrap_or_else(|| panic!("no symbol named '{}'", name))
}

fn layout(scopes: &ScopeTable, name: &str) -> (Option<u32>, u32) {
    let s = named(scopes, name);
    (s.offset, s.size)
}

fn int_var(name: &str) -> Stmt {
    let_stmt(name, Some(TypeExpr::Integer), None)
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn globals_are_laid_out_in_declaration_order() {
    let out = compiled(vec![
        let_stmt("a", Some(TypeExpr::Integer), Some(int(1))),
        let_stmt("b", Some(TypeExpr::String), Some(string("hi"))),
        let_stmt("c", Some(TypeExpr::Boolean), Some(boolean(true))),
    ]);
    assert_eq!(layout(&out.scopes, "a"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "b"), (Some(4), 8));
    assert_eq!(layout(&out.scopes, "c"), (Some(12), 1));
    assert_eq!(named(&out.scopes, "c").address.as_deref(), Some("c"));
}

#[test]
fn nested_blocks_keep_advancing_the_cursor() {
    let out = compiled(vec![
        int_var("a"),
        block_stmt(vec![int_var("b"), block_stmt(vec![int_var("c")])]),
        int_var("d"),
    ]);
    let offsets: Vec<_> = ["a", "b", "c", "d"].iter().map(|n| named(&out.scopes, n).offset).collect();
    assert_eq!(offsets, vec![Some(0), Some(4), Some(8), Some(12)]);
}

#[test]
fn inferred_types_size_their_storage() {
    let out = compiled(vec![
        let_stmt("n", None, Some(int(3))),
        let_stmt("s", None, Some(string("x"))),
        let_stmt("f", None, Some(binary(int(1), BinOp::Lt, int(2)))),
        let_stmt("u", None, None),
    ]);
    assert_eq!(layout(&out.scopes, "n"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "s"), (Some(4), 8));
    assert_eq!(layout(&out.scopes, "f"), (Some(12), 1));
    assert_eq!(layout(&out.scopes, "u"), (Some(13), 4));
}

#[test]
fn value_of_a_call_without_result_type_still_takes_storage() {
    let out = compiled(vec![
        function("f", vec![], None, vec![return_stmt(Some(int(1)))]),
        let_stmt("x", None, Some(call("f", vec![]))),
        let_stmt("y", Some(TypeExpr::Integer), Some(int(2))),
    ]);
    assert_eq!(named(&out.scopes, "x").declared_type, DeclaredType::Unknown);
    assert_eq!(layout(&out.scopes, "x"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "y"), (Some(4), 4));
}

#[test]
fn void_annotation_is_sized_like_an_integer() {
    let out = compiled(vec![let_stmt("v", Some(TypeExpr::Void), None), int_var("after")]);
    assert_eq!(layout(&out.scopes, "v"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "after"), (Some(4), 4));
}

#[test]
fn pointer_size_is_configurable() {
    let options = CompileOptions { pointer_size: 4, ..Default::default() };
    let out = compiled_with(
        vec![let_stmt("s", Some(TypeExpr::String), None), int_var("after")],
        &options,
    );
    assert_eq!(layout(&out.scopes, "s"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "after"), (Some(4), 4));
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn function_frame_starts_at_zero() {
    let out = compiled(vec![
        int_var("before"),
        function(
            "f",
            vec![param("p", TypeExpr::Integer), param("q", TypeExpr::String)],
            Some(TypeExpr::Integer),
            vec![let_stmt("local", Some(TypeExpr::Integer), Some(int(0))), return_stmt(Some(ident("local")))],
        ),
        int_var("g"),
    ]);
    assert_eq!(out.tac.lines(), vec!["f:", "t1 = 0", "local = t1", "return local", "end f"]);

    let global = out.scopes.global();
    let f_id = out.scopes.lookup(global, "f").unwrap();
    let f = out.scopes.symbol(f_id);
    assert_eq!(f.kind, SymbolKind::Function);
    assert_eq!(f.param_count, 2);
    assert_eq!(f.local_frame_size, 16);

    let member = |name: &str| {
        let s = out.scopes.member(f_id, name).unwrap();
        (s.offset, s.size)
    };
    assert_eq!(member("p"), (Some(0), 4));
    assert_eq!(member("q"), (Some(4), 8));
    assert_eq!(member("local"), (Some(12), 4));

    assert_eq!(layout(&out.scopes, "before"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "g"), (Some(4), 4));
}

#[test]
fn frame_members_include_nested_block_locals() {
    let out = compiled(vec![function(
        "f",
        vec![param("p", TypeExpr::Boolean)],
        None,
        vec![int_var("a"), if_stmt(ident("p"), vec![int_var("b")], None)],
    )]);
    let f_id = out.scopes.lookup(out.scopes.global(), "f").unwrap();
    let names: Vec<_> = out.scopes.frame_members(f_id).iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["p", "a", "b"]);
    assert_eq!(out.scopes.symbol(f_id).local_frame_size, 9);
}

#[test]
fn return_without_value_returns_null() {
    let out = compiled(vec![function("f", vec![], None, vec![return_stmt(None)])]);
    assert_eq!(out.tac.lines(), vec!["f:", "return null", "end f"]);
}

#[test]
fn recursive_function() {
    let out = compiled(vec![function(
        "fact",
        vec![param("n", TypeExpr::Integer)],
        Some(TypeExpr::Integer),
        vec![
            if_stmt(binary(ident("n"), BinOp::LtEq, int(1)), vec![return_stmt(Some(int(1)))], None),
            return_stmt(Some(binary(
                ident("n"),
                BinOp::Mul,
                call("fact", vec![binary(ident("n"), BinOp::Sub, int(1))]),
            ))),
        ],
    )]);
    assert_eq!(
        out.tac.lines(),
        vec![
            "fact:",
            "t1 = 1",
            "t2 = n <= t1",
            "if t2 == 0 goto L1",
            "t3 = 1",
            "return t3",
            "L1:",
            "t4 = 1",
            "t5 = n - t4",
            "t6 = t5",
            "t7 = call fact(t6)",
            "t8 = n * t7",
            "return t8",
            "end fact",
        ]
    );
}

// ============================================================================
// Nested frames
// ============================================================================

fn block_with_nested_function() -> Vec<Stmt> {
    vec![
        int_var("a"),
        block_stmt(vec![
            int_var("b"),
            function("inner", vec![], None, vec![int_var("z")]),
            int_var("c"),
        ]),
    ]
}

#[test]
fn nested_function_does_not_move_the_outer_cursor() {
    let out = compiled(block_with_nested_function());
    assert_eq!(layout(&out.scopes, "a"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "b"), (Some(4), 4));
    assert_eq!(layout(&out.scopes, "z"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "c"), (Some(8), 4));
}

#[test]
fn folded_layout_adds_nested_frame_size() {
    let out = compiled_with(block_with_nested_function(), &folded());
    assert_eq!(layout(&out.scopes, "z"), (Some(0), 4));
    assert_eq!(layout(&out.scopes, "c"), (Some(12), 4));
    assert_eq!(named(&out.scopes, "inner").local_frame_size, 4);
}

// ============================================================================
// Classes
// ============================================================================

fn animal() -> Stmt {
    class(
        "Animal",
        None,
        vec![
            field("name", Some(TypeExpr::String), None),
            field("age", Some(TypeExpr::Integer), Some(int(0))),
            method("speak", vec![], None, vec![let_stmt("loud", Some(TypeExpr::Boolean), None)]),
        ],
    )
}

#[test]
fn class_fields_share_one_frame() {
    let out = compiled(vec![int_var("g"), animal()]);
    assert_eq!(
        out.tac.lines(),
        vec!["Animal:", "t1 = 0", "age = t1", "Animal.speak:", "end Animal.speak", "end Animal"]
    );
    assert_eq!(layout(&out.scopes, "name"), (Some(0), 8));
    assert_eq!(layout(&out.scopes, "age"), (Some(8), 4));
    assert_eq!(layout(&out.scopes, "loud"), (Some(0), 1));

    let animal = named(&out.scopes, "Animal");
    assert_eq!(animal.kind, SymbolKind::Class);
    assert_eq!(animal.local_frame_size, 12);
    let speak = named(&out.scopes, "speak");
    assert_eq!(speak.enclosing_class.as_deref(), Some("Animal"));
    assert_eq!(speak.local_frame_size, 1);
    assert_eq!(named(&out.scopes, "loud").enclosing_class, None);
}

#[test]
fn subclass_fields_follow_inherited_ones() {
    let out = compiled(vec![
        animal(),
        class("Dog", Some("Animal"), vec![field("breed", Some(TypeExpr::String), None)]),
    ]);
    assert_eq!(layout(&out.scopes, "breed"), (Some(12), 8));
    assert_eq!(named(&out.scopes, "Dog").local_frame_size, 20);
    assert_eq!(&out.tac.lines()[6..], ["Dog:", "end Dog"]);
}
