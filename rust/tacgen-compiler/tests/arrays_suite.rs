//! Tests for array storage, literal shapes, element stores and reads.

use tacgen_compiler::compiler::ast::{Stmt, TypeExpr};
use tacgen_compiler::compiler::builders::*;
use tacgen_compiler::compiler::lower::{lower, LowerError, Lowered};
use tacgen_compiler::compiler::resolve::resolve;
use tacgen_compiler::compiler::symbols::{ScopeTable, Symbol};
use tacgen_compiler::{CompileOptions, RaggedArrayPolicy};

fn lower_with(stmts: Vec<Stmt>, options: &CompileOptions) -> (Lowered, ScopeTable) {
    let prog = program(stmts);
    let mut scopes = resolve(&prog).expect("resolve failed");
    let lowered = lower(&prog, &mut scopes, options);
    (lowered, scopes)
}

fn lower_clean(stmts: Vec<Stmt>) -> (Vec<String>, ScopeTable) {
    let (lowered, scopes) = lower_with(stmts, &CompileOptions::default());
    assert!(lowered.is_clean(), "unexpected diagnostics: {:?}", lowered.diagnostics);
    (lowered.program.lines(), scopes)
}

fn named<'a>(scopes: &'a ScopeTable, name: &str) -> &'a Symbol {
    scopes.iter().find(|s| s.name == name).unwrap_or_else(|| panic!("no symbol named '{}'", name))
}

fn matrix_type() -> Option<TypeExpr> {
    Some(TypeExpr::array_of(TypeExpr::Integer, 2))
}

fn ragged() -> Stmt {
    let_stmt(
        "r",
        matrix_type(),
        Some(array(vec![array(vec![int(1), int(2)]), array(vec![int(3)])])),
    )
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn matrix_literal_store_read_and_write() {
    let (lines, scopes) = lower_clean(vec![
        let_stmt(
            "matrix",
            matrix_type(),
            Some(array(vec![array(vec![int(1), int(2)]), array(vec![int(3), int(4)])])),
        ),
        let_stmt("v", Some(TypeExpr::Integer), Some(index(index(ident("matrix"), int(0)), int(1)))),
        assign_index(ident("matrix"), vec![int(0), int(1)], int(9)),
    ]);
    assert_eq!(
        lines,
        vec![
            "t1 = 1",
            "matrix[0][0] = t1",
            "t2 = 2",
            "matrix[0][1] = t2",
            "t3 = 3",
            "matrix[1][0] = t3",
            "t4 = 4",
            "matrix[1][1] = t4",
            "t5 = 0",
            "t6 = matrix[t5]",
            "t7 = 1",
            "t8 = t6[t7]",
            "v = t8",
            "t9 = 0",
            "t10 = 1",
            "t11 = 9",
            "matrix[t9][t10] = t11",
        ]
    );

    let matrix = named(&scopes, "matrix");
    assert_eq!(matrix.dimensions, vec![2, 2]);
    assert_eq!((matrix.offset, matrix.size), (Some(0), 24));
    assert_eq!(named(&scopes, "v").offset, Some(24));
}

#[test]
fn leaf_size_follows_the_element_type() {
    let (_, scopes) = lower_clean(vec![
        let_stmt(
            "flags",
            Some(TypeExpr::array_of(TypeExpr::Boolean, 1)),
            Some(array(vec![boolean(true), boolean(false), boolean(true)])),
        ),
        let_stmt("names", None, Some(array(vec![string("a"), string("b")]))),
        let_stmt("grid", None, Some(array(vec![array(vec![int(1), int(2), int(3)]), array(vec![int(4), int(5), int(6)])]))),
    ]);
    assert_eq!(named(&scopes, "flags").size, 8 + 3);
    assert_eq!(named(&scopes, "names").size, 8 + 2 * 8);
    let grid = named(&scopes, "grid");
    assert_eq!(grid.size, 8 + 6 * 4);
    assert_eq!(grid.dimensions, vec![2, 3]);
    assert_eq!(grid.offset, Some(11 + 24));
}

#[test]
fn array_without_literal_reserves_a_reference() {
    let (lines, scopes) = lower_clean(vec![
        let_stmt("xs", Some(TypeExpr::array_of(TypeExpr::Integer, 1)), None),
        let_stmt("n", Some(TypeExpr::Integer), None),
    ]);
    assert!(lines.is_empty());
    let xs = named(&scopes, "xs");
    assert_eq!((xs.offset, xs.size), (Some(0), 8));
    assert!(xs.dimensions.is_empty());
    assert_eq!(named(&scopes, "n").offset, Some(8));
}

#[test]
fn identifier_leaves_are_copied() {
    let (lines, _) = lower_clean(vec![
        let_stmt("a", Some(TypeExpr::Integer), Some(int(1))),
        let_stmt("arr", Some(TypeExpr::array_of(TypeExpr::Integer, 1)), Some(array(vec![ident("a"), int(2)]))),
    ]);
    assert_eq!(lines, vec!["t1 = 1", "a = t1", "t2 = a", "arr[0] = t2", "t3 = 2", "arr[1] = t3"]);
}

#[test]
fn literal_reassignment_stores_without_new_storage() {
    let (lines, scopes) = lower_clean(vec![
        let_stmt("xs", Some(TypeExpr::array_of(TypeExpr::Integer, 1)), None),
        assign("xs", array(vec![int(7)])),
    ]);
    assert_eq!(lines, vec!["t1 = 7", "xs[0] = t1"]);
    assert_eq!(named(&scopes, "xs").size, 8);
}

#[test]
fn anonymous_literal_fills_a_temp_base() {
    let (lines, _) = lower_clean(vec![print_stmt(array(vec![int(1), int(2)]))]);
    assert_eq!(lines, vec!["t1 = 1", "t2 = 2", "t3[0] = t1", "t3[1] = t2", "t4 = t3", "call print(t4)"]);
}

// ============================================================================
// Ragged literals
// ============================================================================

#[test]
fn ragged_literal_is_rejected_by_default() {
    let (lowered, scopes) = lower_with(vec![ragged()], &CompileOptions::default());
    assert_eq!(
        lowered.diagnostics,
        vec![LowerError::RaggedArrayLiteral { name: "r".into(), line: lowered.diagnostics[0].line() }]
    );
    assert!(lowered.program.is_empty());
    let r = named(&scopes, "r");
    assert_eq!((r.offset, r.size), (Some(0), 8));
    assert!(r.dimensions.is_empty());
}

#[test]
fn ragged_literal_is_zero_padded_on_request() {
    let options = CompileOptions { ragged_arrays: RaggedArrayPolicy::ZeroPad, ..Default::default() };
    let (lowered, scopes) = lower_with(vec![ragged()], &options);
    assert!(lowered.is_clean(), "{:?}", lowered.diagnostics);
    assert_eq!(
        lowered.program.lines(),
        vec!["t1 = 1", "r[0][0] = t1", "t2 = 2", "r[0][1] = t2", "t3 = 3", "r[1][0] = t3", "t4 = 0", "r[1][1] = t4"]
    );
    let r = named(&scopes, "r");
    assert_eq!(r.dimensions, vec![2, 2]);
    assert_eq!(r.size, 8 + 4 * 4);
}
