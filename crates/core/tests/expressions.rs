//! End-to-end parser coverage over representative expression sources.

use arbiter_core::ast::{ArithOp, CmpOp, Expr, LogicOp, Num};
use arbiter_core::parse;

#[test]
fn eligibility_expression_shape() {
    let expr = parse("age >= 18 and country = \"US\" or vip").unwrap();
    // `or` at the root, `and` on its left.
    match expr {
        Expr::Logical {
            op: LogicOp::Or,
            left,
            right,
        } => {
            assert!(matches!(*left, Expr::Logical { op: LogicOp::And, .. }));
            assert_eq!(
                *right,
                Expr::Field {
                    name: "vip".to_string()
                }
            );
        }
        other => panic!("unexpected root: {:?}", other),
    }
}

#[test]
fn arithmetic_tower() {
    let expr = parse("1 + 2 * 3 ** 2 % 4 - 5 / 2").unwrap();
    // Root is the last additive operator: `-`.
    assert!(matches!(
        expr,
        Expr::Arithmetic {
            op: ArithOp::Sub,
            ..
        }
    ));
}

#[test]
fn nested_structures_round_trip_structurally() {
    let src = "for o in orders[total > 100] return {id: o.id, hot: o.total > 500}";
    let a = parse(src).unwrap();
    let b = parse(src).unwrap();
    assert_eq!(a, b);
}

#[test]
fn numbers_normalize_across_int_and_float() {
    let int_cmp = parse("x = 2").unwrap();
    let float_cmp = parse("x = 2.0").unwrap();
    // Structural equality treats 2 and 2.0 as the same literal.
    assert_eq!(int_cmp, float_cmp);
}

#[test]
fn comparison_operators_all_parse() {
    for (src, op) in [
        ("a = b", CmpOp::Eq),
        ("a != b", CmpOp::Ne),
        ("a < b", CmpOp::Lt),
        ("a <= b", CmpOp::Le),
        ("a > b", CmpOp::Gt),
        ("a >= b", CmpOp::Ge),
    ] {
        match parse(src).unwrap() {
            Expr::Comparison { op: got, .. } => assert_eq!(got, op, "source {:?}", src),
            other => panic!("expected comparison for {:?}, got {:?}", src, other),
        }
    }
}

#[test]
fn negative_literal_in_arithmetic() {
    // `3 - -2` -- the second minus signs the literal.
    let expr = parse("3 - -2").unwrap();
    match expr {
        Expr::Arithmetic {
            op: ArithOp::Sub,
            right,
            ..
        } => assert_eq!(*right, Expr::Number(Num::Int(-2))),
        other => panic!("unexpected root: {:?}", other),
    }
}

#[test]
fn deeply_nested_parentheses() {
    let expr = parse("((((1))))").unwrap();
    assert_eq!(expr, Expr::Number(Num::Int(1)));
}

#[test]
fn parse_errors_report_positions() {
    let cases = [
        ("price > ", 8),
        ("@", 0),
        ("f(1,", 4),
        ("{a 1}", 3),
    ];
    for (src, pos) in cases {
        let err = parse(src).unwrap_err();
        assert_eq!(err.pos, pos, "source {:?}: {}", src, err);
    }
}
