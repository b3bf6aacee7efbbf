//! AST types for the FEEL expression subset.
//!
//! These nodes are produced by the parser and consumed by the
//! interpreter. They are plain immutable values: construction happens
//! once inside the parser, after which only shared references
//! circulate. Structural equality depends only on the source text.

use std::fmt;

// ──────────────────────────────────────────────
// Numbers
// ──────────────────────────────────────────────

/// A numeric literal, integer-or-float.
///
/// Integers compare equal to their float value: `Num::Int(2)` equals
/// `Num::Float(2.0)`. Integer literals that fit i64 stay exact.
#[derive(Debug, Clone, Copy)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn as_f64(&self) -> f64 {
        match self {
            Num::Int(n) => *n as f64,
            Num::Float(f) => *f,
        }
    }

    /// Arithmetic negation, preserving integer-ness.
    pub fn neg(&self) -> Num {
        match self {
            Num::Int(n) => Num::Int(-n),
            Num::Float(f) => Num::Float(-f),
        }
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Int(n) => write!(f, "{}", n),
            Num::Float(x) => write!(f, "{}", x),
        }
    }
}

// ──────────────────────────────────────────────
// Operators
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
}

// ──────────────────────────────────────────────
// Expression nodes
// ──────────────────────────────────────────────

/// A FEEL expression node.
///
/// The tree is fully owned: child nodes are boxed, lists are vectors.
/// There are no cycles and no interior mutability.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Boolean(bool),
    Number(Num),
    StringLit(String),
    /// A bare name resolved against the evaluation context.
    Field {
        name: String,
    },
    Comparison {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary arithmetic minus on a non-literal operand. A minus on a
    /// numeric literal folds into a negative `Number` at build time
    /// and never produces this node.
    Negate {
        operand: Box<Expr>,
    },
    Logical {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        operand: Box<Expr>,
    },
    Between {
        value: Box<Expr>,
        min: Box<Expr>,
        max: Box<Expr>,
    },
    In {
        value: Box<Expr>,
        list: Box<Expr>,
    },
    InstanceOf {
        value: Box<Expr>,
        type_name: String,
    },
    ListLiteral {
        elements: Vec<Expr>,
    },
    /// `{key: value, ...}` -- keys are reduced to plain strings whether
    /// written as identifiers or string literals.
    ContextLiteral {
        pairs: Vec<(String, Expr)>,
    },
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        start_inclusive: bool,
        end_inclusive: bool,
    },
    FunctionCall {
        name: String,
        arguments: Vec<Expr>,
    },
    PropertyAccess {
        object: Box<Expr>,
        property: String,
    },
    /// `base[condition]` -- a predicate filter over a list, or list
    /// indexing when the bracket expression is a bare integer.
    Filter {
        list: Box<Expr>,
        condition: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Quantified {
        quantifier: Quantifier,
        variable: String,
        list: Box<Expr>,
        condition: Box<Expr>,
    },
    For {
        variable: String,
        list: Box<Expr>,
        return_expr: Box<Expr>,
    },
    FunctionDef {
        parameters: Vec<String>,
        body: Box<Expr>,
    },
}

impl Expr {
    /// Render a field or property-access chain back to a dotted name.
    /// Used when such a chain is called as a function (`string.length(x)`
    /// resolves the callee name from the chain).
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Field { name } => Some(name.clone()),
            Expr::PropertyAccess { object, property } => {
                object.dotted_name().map(|base| format!("{}.{}", base, property))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_int_equals_float() {
        assert_eq!(Num::Int(2), Num::Float(2.0));
        assert_ne!(Num::Int(2), Num::Float(2.5));
    }

    #[test]
    fn num_neg_preserves_intness() {
        assert_eq!(Num::Int(3).neg(), Num::Int(-3));
        assert_eq!(Num::Float(1.5).neg(), Num::Float(-1.5));
    }

    #[test]
    fn dotted_name_from_chain() {
        let chain = Expr::PropertyAccess {
            object: Box::new(Expr::PropertyAccess {
                object: Box::new(Expr::Field {
                    name: "user".to_string(),
                }),
                property: "address".to_string(),
            }),
            property: "city".to_string(),
        };
        assert_eq!(chain.dotted_name().as_deref(), Some("user.address.city"));
    }
}
