//! Interpreter for FEEL expression trees over a decision context.
//!
//! Evaluation is strict about types: logical operators and predicates
//! demand booleans, arithmetic demands numbers. A type error aborts
//! the expression -- the decision-tree evaluator treats that as "skip
//! this branch", never as a failed decision.

use serde_json::{Map, Number, Value};

use arbiter_core::ast::{ArithOp, CmpOp, Expr, LogicOp, Num, Quantifier};

use crate::context::Context;
use crate::evaluator::loose_eq;

/// Errors raised while interpreting an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("type error: {0}")]
    Type(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0} cannot be used as a value")]
    NotAValue(&'static str),
}

/// Evaluate an expression against a context with no local bindings.
pub fn eval(expr: &Expr, context: &Context) -> Result<Value, EvalError> {
    let mut bindings = Vec::new();
    eval_with(expr, context, &mut bindings)
}

/// Variable bindings introduced by quantifiers, for-expressions, and
/// filters, innermost last.
type Bindings = Vec<(String, Value)>;

fn eval_with(expr: &Expr, context: &Context, bindings: &mut Bindings) -> Result<Value, EvalError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Boolean(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(num_value(*n)),
        Expr::StringLit(s) => Ok(Value::String(s.clone())),

        Expr::Field { name } => Ok(lookup(name, context, bindings)),

        Expr::PropertyAccess { object, property } => {
            match eval_with(object, context, bindings)? {
                Value::Object(map) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
                // Missing paths resolve to null rather than failing.
                Value::Null => Ok(Value::Null),
                other => Err(EvalError::Type(format!(
                    "property '{}' requires a context value, got {}",
                    property,
                    kind_of(&other)
                ))),
            }
        }

        Expr::Comparison { op, left, right } => {
            let lhs = eval_with(left, context, bindings)?;
            let rhs = eval_with(right, context, bindings)?;
            Ok(Value::Bool(compare(*op, &lhs, &rhs)?))
        }

        Expr::Arithmetic { op, left, right } => {
            let lhs = eval_with(left, context, bindings)?;
            let rhs = eval_with(right, context, bindings)?;
            arithmetic(*op, &lhs, &rhs)
        }

        Expr::Negate { operand } => match eval_with(operand, context, bindings)? {
            Value::Number(n) => {
                if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
                    Ok(Value::Number(Number::from(i)))
                } else {
                    float_value(-n.as_f64().unwrap_or(0.0))
                }
            }
            other => Err(EvalError::Type(format!(
                "cannot negate {}",
                kind_of(&other)
            ))),
        },

        Expr::Logical { op, left, right } => {
            let lhs = as_bool(eval_with(left, context, bindings)?)?;
            match (op, lhs) {
                (LogicOp::And, false) => Ok(Value::Bool(false)),
                (LogicOp::Or, true) => Ok(Value::Bool(true)),
                _ => {
                    let rhs = as_bool(eval_with(right, context, bindings)?)?;
                    Ok(Value::Bool(rhs))
                }
            }
        }

        Expr::Not { operand } => {
            let value = as_bool(eval_with(operand, context, bindings)?)?;
            Ok(Value::Bool(!value))
        }

        Expr::Between { value, min, max } => {
            let v = eval_with(value, context, bindings)?;
            let lo = eval_with(min, context, bindings)?;
            let hi = eval_with(max, context, bindings)?;
            Ok(Value::Bool(
                compare(CmpOp::Ge, &v, &lo)? && compare(CmpOp::Le, &v, &hi)?,
            ))
        }

        Expr::In { value, list } => {
            let needle = eval_with(value, context, bindings)?;
            // `x in [a..b]` tests range membership; any other
            // right-hand side must evaluate to a list.
            if let Expr::Range {
                start,
                end,
                start_inclusive,
                end_inclusive,
            } = list.as_ref()
            {
                let lo = eval_with(start, context, bindings)?;
                let hi = eval_with(end, context, bindings)?;
                let above = if *start_inclusive {
                    compare(CmpOp::Ge, &needle, &lo)?
                } else {
                    compare(CmpOp::Gt, &needle, &lo)?
                };
                let below = if *end_inclusive {
                    compare(CmpOp::Le, &needle, &hi)?
                } else {
                    compare(CmpOp::Lt, &needle, &hi)?
                };
                return Ok(Value::Bool(above && below));
            }
            match eval_with(list, context, bindings)? {
                Value::Array(items) => {
                    Ok(Value::Bool(items.iter().any(|item| loose_eq(item, &needle))))
                }
                other => Err(EvalError::Type(format!(
                    "'in' requires a list, got {}",
                    kind_of(&other)
                ))),
            }
        }

        Expr::InstanceOf { value, type_name } => {
            let v = eval_with(value, context, bindings)?;
            Ok(Value::Bool(kind_of(&v) == type_name.as_str()))
        }

        Expr::ListLiteral { elements } => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(eval_with(element, context, bindings)?);
            }
            Ok(Value::Array(items))
        }

        Expr::ContextLiteral { pairs } => {
            let mut map = Map::new();
            for (key, value_expr) in pairs {
                map.insert(key.clone(), eval_with(value_expr, context, bindings)?);
            }
            Ok(Value::Object(map))
        }

        Expr::Range { .. } => Err(EvalError::NotAValue("a range")),

        Expr::FunctionCall { name, arguments } => {
            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(eval_with(argument, context, bindings)?);
            }
            call_builtin(name, &args)
        }

        Expr::Filter { list, condition } => {
            let items = match eval_with(list, context, bindings)? {
                Value::Array(items) => items,
                other => {
                    return Err(EvalError::Type(format!(
                        "filter requires a list, got {}",
                        kind_of(&other)
                    )))
                }
            };
            // An integer literal selects by position, 1-based;
            // negative indexes count from the end.
            if let Expr::Number(Num::Int(idx)) = condition.as_ref() {
                let len = items.len() as i64;
                let position = if *idx > 0 { *idx - 1 } else { len + *idx };
                if (0..len).contains(&position) {
                    return Ok(items[position as usize].clone());
                }
                return Ok(Value::Null);
            }
            let mut kept = Vec::new();
            for item in items {
                let depth = bind_item(&item, bindings);
                let verdict = as_bool(eval_with(condition, context, bindings)?);
                bindings.truncate(bindings.len() - depth);
                if verdict? {
                    kept.push(item);
                }
            }
            Ok(Value::Array(kept))
        }

        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            if as_bool(eval_with(condition, context, bindings)?)? {
                eval_with(then_expr, context, bindings)
            } else {
                eval_with(else_expr, context, bindings)
            }
        }

        Expr::Quantified {
            quantifier,
            variable,
            list,
            condition,
        } => {
            let items = match eval_with(list, context, bindings)? {
                Value::Array(items) => items,
                other => {
                    return Err(EvalError::Type(format!(
                        "quantifier requires a list, got {}",
                        kind_of(&other)
                    )))
                }
            };
            for item in items {
                bindings.push((variable.clone(), item));
                let verdict = as_bool(eval_with(condition, context, bindings)?);
                bindings.pop();
                let verdict = verdict?;
                match quantifier {
                    Quantifier::Some if verdict => return Ok(Value::Bool(true)),
                    Quantifier::Every if !verdict => return Ok(Value::Bool(false)),
                    _ => {}
                }
            }
            Ok(Value::Bool(matches!(quantifier, Quantifier::Every)))
        }

        Expr::For {
            variable,
            list,
            return_expr,
        } => {
            let items = match eval_with(list, context, bindings)? {
                Value::Array(items) => items,
                other => {
                    return Err(EvalError::Type(format!(
                        "for-expression requires a list, got {}",
                        kind_of(&other)
                    )))
                }
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                bindings.push((variable.clone(), item));
                let value = eval_with(return_expr, context, bindings);
                bindings.pop();
                out.push(value?);
            }
            Ok(Value::Array(out))
        }

        Expr::FunctionDef { .. } => Err(EvalError::NotAValue("a function definition")),
    }
}

/// Innermost binding first, then the context; unresolved names are
/// null.
fn lookup(name: &str, context: &Context, bindings: &Bindings) -> Value {
    for (bound, value) in bindings.iter().rev() {
        if bound == name {
            return value.clone();
        }
    }
    context.get(name).cloned().unwrap_or(Value::Null)
}

/// Bind `item` for a filter predicate; the fields of a context item
/// are also exposed directly. Returns how many bindings were pushed.
fn bind_item(item: &Value, bindings: &mut Bindings) -> usize {
    let mut pushed = 0;
    if let Value::Object(map) = item {
        for (key, value) in map {
            bindings.push((key.clone(), value.clone()));
            pushed += 1;
        }
    }
    bindings.push(("item".to_string(), item.clone()));
    pushed + 1
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "context",
    }
}

fn as_bool(value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::Type(format!(
            "expected boolean, got {}",
            kind_of(&other)
        ))),
    }
}

fn num_value(n: Num) -> Value {
    match n {
        Num::Int(i) => Value::Number(Number::from(i)),
        Num::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
    }
}

fn float_value(f: f64) -> Result<Value, EvalError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| EvalError::Type("arithmetic produced a non-finite number".into()))
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    match op {
        CmpOp::Eq => return Ok(loose_eq(lhs, rhs)),
        CmpOp::Ne => return Ok(!loose_eq(lhs, rhs)),
        _ => {}
    }
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b).ok_or_else(|| {
                EvalError::Type("numbers are not comparable".into())
            })?
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (a, b) => {
            return Err(EvalError::Type(format!(
                "cannot order {} against {}",
                kind_of(a),
                kind_of(b)
            )))
        }
    };
    Ok(match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
        CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
    })
}

fn arithmetic(op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let (a, b) = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => (a, b),
        (a, b) => {
            return Err(EvalError::Type(format!(
                "arithmetic requires numbers, got {} and {}",
                kind_of(a),
                kind_of(b)
            )))
        }
    };

    // Integer operands stay integers where the operation allows it;
    // anything else goes through f64.
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        match op {
            ArithOp::Add => {
                if let Some(sum) = x.checked_add(y) {
                    return Ok(Value::Number(Number::from(sum)));
                }
            }
            ArithOp::Sub => {
                if let Some(diff) = x.checked_sub(y) {
                    return Ok(Value::Number(Number::from(diff)));
                }
            }
            ArithOp::Mul => {
                if let Some(product) = x.checked_mul(y) {
                    return Ok(Value::Number(Number::from(product)));
                }
            }
            ArithOp::Mod => {
                if y == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                return Ok(Value::Number(Number::from(x.rem_euclid(y))));
            }
            ArithOp::Pow => {
                if (0..=u32::MAX as i64).contains(&y) {
                    if let Some(power) = x.checked_pow(y as u32) {
                        return Ok(Value::Number(Number::from(power)));
                    }
                }
            }
            ArithOp::Div => {}
        }
    }

    let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
    match op {
        ArithOp::Add => float_value(x + y),
        ArithOp::Sub => float_value(x - y),
        ArithOp::Mul => float_value(x * y),
        ArithOp::Div => {
            if y == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                float_value(x / y)
            }
        }
        ArithOp::Mod => {
            if y == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                float_value(x.rem_euclid(y))
            }
        }
        ArithOp::Pow => float_value(x.powf(y)),
    }
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let arity = |want: usize| -> Result<(), EvalError> {
        if args.len() == want {
            Ok(())
        } else {
            Err(EvalError::Type(format!(
                "{}() takes {} argument(s), got {}",
                name,
                want,
                args.len()
            )))
        }
    };

    match name {
        "not" => {
            arity(1)?;
            Ok(Value::Bool(!as_bool(args[0].clone())?))
        }
        "contains" => {
            arity(2)?;
            match (&args[0], &args[1]) {
                (Value::String(haystack), Value::String(needle)) => {
                    Ok(Value::Bool(haystack.contains(needle.as_str())))
                }
                (Value::Array(items), needle) => {
                    Ok(Value::Bool(items.iter().any(|item| loose_eq(item, needle))))
                }
                (other, _) => Err(EvalError::Type(format!(
                    "contains() requires a string or list, got {}",
                    kind_of(other)
                ))),
            }
        }
        "starts_with" | "ends_with" => {
            arity(2)?;
            match (&args[0], &args[1]) {
                (Value::String(s), Value::String(prefix)) => Ok(Value::Bool(if name == "starts_with" {
                    s.starts_with(prefix.as_str())
                } else {
                    s.ends_with(prefix.as_str())
                })),
                _ => Err(EvalError::Type(format!("{}() requires strings", name))),
            }
        }
        "upper" | "lower" => {
            arity(1)?;
            match &args[0] {
                Value::String(s) => Ok(Value::String(if name == "upper" {
                    s.to_uppercase()
                } else {
                    s.to_lowercase()
                })),
                other => Err(EvalError::Type(format!(
                    "{}() requires a string, got {}",
                    name,
                    kind_of(other)
                ))),
            }
        }
        "count" => {
            arity(1)?;
            match &args[0] {
                Value::Array(items) => Ok(Value::Number(Number::from(items.len()))),
                other => Err(EvalError::Type(format!(
                    "count() requires a list, got {}",
                    kind_of(other)
                ))),
            }
        }
        "sum" | "min" | "max" => {
            arity(1)?;
            let items = match &args[0] {
                Value::Array(items) => items,
                other => {
                    return Err(EvalError::Type(format!(
                        "{}() requires a list, got {}",
                        name,
                        kind_of(other)
                    )))
                }
            };
            let mut nums = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Number(n) => nums.push(n.as_f64().unwrap_or(f64::NAN)),
                    other => {
                        return Err(EvalError::Type(format!(
                            "{}() requires numbers, got {}",
                            name,
                            kind_of(other)
                        )))
                    }
                }
            }
            match name {
                "sum" => float_value(nums.iter().sum()),
                "min" => match nums.iter().cloned().reduce(f64::min) {
                    Some(v) => float_value(v),
                    None => Ok(Value::Null),
                },
                _ => match nums.iter().cloned().reduce(f64::max) {
                    Some(v) => float_value(v),
                    None => Ok(Value::Null),
                },
            }
        }
        "abs" => {
            arity(1)?;
            match &args[0] {
                Value::Number(n) => match n.as_i64() {
                    Some(i) if i != i64::MIN => Ok(Value::Number(Number::from(i.abs()))),
                    _ => float_value(n.as_f64().unwrap_or(f64::NAN).abs()),
                },
                other => Err(EvalError::Type(format!(
                    "abs() requires a number, got {}",
                    kind_of(other)
                ))),
            }
        }
        "floor" | "ceiling" => {
            arity(1)?;
            match &args[0] {
                Value::Number(n) => {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    let v = if name == "floor" { f.floor() } else { f.ceil() };
                    Ok(Value::Number(Number::from(v as i64)))
                }
                other => Err(EvalError::Type(format!(
                    "{}() requires a number, got {}",
                    name,
                    kind_of(other)
                ))),
            }
        }
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::parse;
    use serde_json::json;

    fn run(src: &str, context: Value) -> Result<Value, EvalError> {
        let expr = parse(src).unwrap();
        eval(&expr, &Context::new(context))
    }

    #[test]
    fn literals_and_fields() {
        assert_eq!(run("42", json!({})).unwrap(), json!(42));
        assert_eq!(run("\"hi\"", json!({})).unwrap(), json!("hi"));
        assert_eq!(run("true", json!({})).unwrap(), json!(true));
        assert_eq!(run("null", json!({})).unwrap(), Value::Null);
        assert_eq!(run("amount", json!({"amount": 7})).unwrap(), json!(7));
        assert_eq!(run("missing", json!({})).unwrap(), Value::Null);
    }

    #[test]
    fn arithmetic_keeps_integers() {
        assert_eq!(run("2 + 3 * 4", json!({})).unwrap(), json!(14));
        assert_eq!(run("7 % 3", json!({})).unwrap(), json!(1));
        assert_eq!(run("2 ** 10", json!({})).unwrap(), json!(1024));
    }

    #[test]
    fn division_always_floats() {
        assert_eq!(run("10 / 4", json!({})).unwrap(), json!(2.5));
        assert_eq!(run("10 / 0", json!({})), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(
            run("amount > 100 and status = \"open\"", json!({"amount": 150, "status": "open"}))
                .unwrap(),
            json!(true)
        );
        assert_eq!(
            run("a or b", json!({"a": false, "b": true})).unwrap(),
            json!(true)
        );
        assert_eq!(run("not false", json!({})).unwrap(), json!(true));
    }

    #[test]
    fn logic_short_circuits_past_errors() {
        // The right operand would be a type error; short-circuit
        // means it is never evaluated.
        assert_eq!(
            run("true or (1 + \"x\") = null", json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            run("false and (1 + \"x\") = null", json!({})).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn non_boolean_logic_is_an_error() {
        assert!(matches!(
            run("1 and true", json!({})),
            Err(EvalError::Type(_))
        ));
    }

    #[test]
    fn between_and_ranges() {
        assert_eq!(run("5 between 1 and 10", json!({})).unwrap(), json!(true));
        assert_eq!(run("11 between 1 and 10", json!({})).unwrap(), json!(false));
        assert_eq!(run("10 in [1..10]", json!({})).unwrap(), json!(true));
        assert_eq!(run("10 in (1..10)", json!({})).unwrap(), json!(false));
    }

    #[test]
    fn membership_in_lists() {
        assert_eq!(
            run("role in [\"admin\", \"owner\"]", json!({"role": "admin"})).unwrap(),
            json!(true)
        );
        assert_eq!(
            run("2.0 in [1, 2, 3]", json!({})).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn instance_of_type_names() {
        assert_eq!(run("1 instance of number", json!({})).unwrap(), json!(true));
        assert_eq!(
            run("\"x\" instance of string", json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            run("[1] instance of list", json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            run("{a: 1} instance of context", json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(run("1 instance of string", json!({})).unwrap(), json!(false));
    }

    #[test]
    fn property_access_resolves_or_nulls() {
        let ctx = json!({"user": {"address": {"city": "Oslo"}}});
        assert_eq!(run("user.address.city", ctx.clone()).unwrap(), json!("Oslo"));
        assert_eq!(run("user.address.zip", ctx.clone()).unwrap(), Value::Null);
        assert_eq!(run("user.missing.deeper", ctx).unwrap(), Value::Null);
    }

    #[test]
    fn filters_by_predicate_and_index() {
        let ctx = json!({"orders": [
            {"id": 1, "total": 50},
            {"id": 2, "total": 250},
            {"id": 3, "total": 500}
        ]});
        assert_eq!(
            run("orders[total > 100]", ctx.clone()).unwrap(),
            json!([{"id": 2, "total": 250}, {"id": 3, "total": 500}])
        );
        assert_eq!(
            run("orders[1]", ctx.clone()).unwrap(),
            json!({"id": 1, "total": 50})
        );
        assert_eq!(
            run("orders[-1]", ctx.clone()).unwrap(),
            json!({"id": 3, "total": 500})
        );
        assert_eq!(run("orders[9]", ctx).unwrap(), Value::Null);
    }

    #[test]
    fn quantifiers() {
        let ctx = json!({"scores": [4, 7, 9]});
        assert_eq!(
            run("some s in scores satisfies s > 8", ctx.clone()).unwrap(),
            json!(true)
        );
        assert_eq!(
            run("every s in scores satisfies s > 3", ctx.clone()).unwrap(),
            json!(true)
        );
        assert_eq!(
            run("every s in scores satisfies s > 5", ctx).unwrap(),
            json!(false)
        );
        // Vacuous truth for `every`, vacuous falsity for `some`.
        assert_eq!(
            run("every s in [] satisfies s > 5", json!({})).unwrap(),
            json!(true)
        );
        assert_eq!(
            run("some s in [] satisfies s > 5", json!({})).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn for_expressions_map() {
        assert_eq!(
            run("for x in [1, 2, 3] return x * 2", json!({})).unwrap(),
            json!([2, 4, 6])
        );
    }

    #[test]
    fn conditionals() {
        assert_eq!(
            run("if amount > 100 then \"high\" else \"low\"", json!({"amount": 42})).unwrap(),
            json!("low")
        );
    }

    #[test]
    fn builtins() {
        assert_eq!(
            run("contains(note, \"urgent\")", json!({"note": "very urgent"})).unwrap(),
            json!(true)
        );
        assert_eq!(run("count([1, 2, 3])", json!({})).unwrap(), json!(3));
        assert_eq!(run("sum([1, 2, 3])", json!({})).unwrap(), json!(6.0));
        assert_eq!(run("min([3, 1, 2])", json!({})).unwrap(), json!(1.0));
        assert_eq!(run("abs(-4)", json!({})).unwrap(), json!(4));
        assert_eq!(run("upper(\"ok\")", json!({})).unwrap(), json!("OK"));
        assert_eq!(run("floor(2.7)", json!({})).unwrap(), json!(2));
        assert!(matches!(
            run("bogus(1)", json!({})),
            Err(EvalError::UnknownFunction(_))
        ));
    }

    #[test]
    fn context_literals_build_objects() {
        assert_eq!(
            run("{name: upper(\"a\"), \"n\": 1 + 1}", json!({})).unwrap(),
            json!({"name": "A", "n": 2})
        );
    }

    #[test]
    fn function_definitions_are_not_values() {
        assert!(matches!(
            run("function(a) a + 1", json!({})),
            Err(EvalError::NotAValue(_))
        ));
    }

    #[test]
    fn missing_field_comparison_is_type_error() {
        assert!(matches!(
            run("missing > 5", json!({})),
            Err(EvalError::Type(_))
        ));
    }
}
