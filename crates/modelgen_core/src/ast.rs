use crate::model::VariableId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operators taking two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    And,
    Or,
    Xor,
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    Rem,
    Min,
    Max,
}

impl BinaryOp {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Geq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Times => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
            BinaryOp::Rem => "rem",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
        }
    }
}

/// Operators and functions taking one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Minus,
    Not,
    Abs,
    Exp,
    Ln,
    Ceiling,
    Floor,
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Asin,
    Acos,
    Atan,
    Asec,
    Acsc,
    Acot,
    Asinh,
    Acosh,
    Atanh,
    Asech,
    Acsch,
    Acoth,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not",
            UnaryOp::Abs => "abs",
            UnaryOp::Exp => "exp",
            UnaryOp::Ln => "ln",
            UnaryOp::Ceiling => "ceiling",
            UnaryOp::Floor => "floor",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Sec => "sec",
            UnaryOp::Csc => "csc",
            UnaryOp::Cot => "cot",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Sech => "sech",
            UnaryOp::Csch => "csch",
            UnaryOp::Coth => "coth",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Asec => "asec",
            UnaryOp::Acsc => "acsc",
            UnaryOp::Acot => "acot",
            UnaryOp::Asinh => "asinh",
            UnaryOp::Acosh => "acosh",
            UnaryOp::Atanh => "atanh",
            UnaryOp::Asech => "asech",
            UnaryOp::Acsch => "acsch",
            UnaryOp::Acoth => "acoth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathConstant {
    True,
    False,
    E,
    Pi,
    Infinity,
    NotANumber,
}

/// Reference to a model variable, as it appears in an equation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ci {
    pub variable: VariableId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub value: Ast,
    pub condition: Ast,
}

/// Expression tree for one equation.
///
/// n-ary operators (plus, times, min, max, and, or) are stored as left-nested
/// binary nodes; see [`Ast::nary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ast {
    Equality {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Unary {
        op: UnaryOp,
        arg: Box<Ast>,
    },
    /// `degree` defaults to 2.
    Root {
        arg: Box<Ast>,
        degree: Option<Box<Ast>>,
    },
    /// `base` defaults to 10.
    Log {
        arg: Box<Ast>,
        base: Option<Box<Ast>>,
    },
    /// Derivative of `variable` with respect to `voi`.
    Diff {
        variable: Ci,
        voi: Ci,
        order: u32,
    },
    Piecewise {
        pieces: Vec<Piece>,
        otherwise: Option<Box<Ast>>,
    },
    Ci(Ci),
    Cn(f64),
    Constant(MathConstant),
}

impl Ast {
    pub fn equality(lhs: Ast, rhs: Ast) -> Self {
        Ast::Equality {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Ast, rhs: Ast) -> Self {
        Ast::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Left-folds `args` with `op`. A single argument is returned as is.
    ///
    /// # Panics
    /// Panics if `args` is empty.
    pub fn nary(op: BinaryOp, args: Vec<Ast>) -> Self {
        let mut iter = args.into_iter();
        let first = iter.next().expect("n-ary operator needs at least one argument");
        iter.fold(first, |acc, next| Ast::binary(op, acc, next))
    }

    pub fn unary(op: UnaryOp, arg: Ast) -> Self {
        Ast::Unary {
            op,
            arg: Box::new(arg),
        }
    }

    pub fn plus(lhs: Ast, rhs: Ast) -> Self {
        Ast::binary(BinaryOp::Plus, lhs, rhs)
    }

    pub fn minus(lhs: Ast, rhs: Ast) -> Self {
        Ast::binary(BinaryOp::Minus, lhs, rhs)
    }

    pub fn times(lhs: Ast, rhs: Ast) -> Self {
        Ast::binary(BinaryOp::Times, lhs, rhs)
    }

    pub fn divide(lhs: Ast, rhs: Ast) -> Self {
        Ast::binary(BinaryOp::Divide, lhs, rhs)
    }

    pub fn power(base: Ast, exponent: Ast) -> Self {
        Ast::binary(BinaryOp::Power, base, exponent)
    }

    pub fn neg(arg: Ast) -> Self {
        Ast::unary(UnaryOp::Minus, arg)
    }

    pub fn sqrt(arg: Ast) -> Self {
        Ast::Root {
            arg: Box::new(arg),
            degree: None,
        }
    }

    pub fn root(arg: Ast, degree: Ast) -> Self {
        Ast::Root {
            arg: Box::new(arg),
            degree: Some(Box::new(degree)),
        }
    }

    pub fn log10(arg: Ast) -> Self {
        Ast::Log {
            arg: Box::new(arg),
            base: None,
        }
    }

    pub fn log(arg: Ast, base: Ast) -> Self {
        Ast::Log {
            arg: Box::new(arg),
            base: Some(Box::new(base)),
        }
    }

    pub fn diff(variable: Ci, voi: Ci) -> Self {
        Ast::Diff {
            variable,
            voi,
            order: 1,
        }
    }

    pub fn cn(value: f64) -> Self {
        Ast::Cn(value)
    }

    pub fn constant(constant: MathConstant) -> Self {
        Ast::Constant(constant)
    }

    pub fn piecewise(pieces: Vec<Piece>, otherwise: Option<Ast>) -> Self {
        Ast::Piecewise {
            pieces,
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn piece(value: Ast, condition: Ast) -> Piece {
        Piece { value, condition }
    }

    /// Left and right hand sides of an equality.
    pub fn sides(&self) -> Option<(&Ast, &Ast)> {
        match self {
            Ast::Equality { lhs, rhs } => Some((lhs, rhs)),
            _ => None,
        }
    }

    /// Calls `f` on this node and all of its descendants, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Ast)) {
        f(self);
        match self {
            Ast::Equality { lhs, rhs } | Ast::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            Ast::Unary { arg, .. } => arg.walk(f),
            Ast::Root { arg, degree } => {
                arg.walk(f);
                if let Some(degree) = degree {
                    degree.walk(f);
                }
            }
            Ast::Log { arg, base } => {
                arg.walk(f);
                if let Some(base) = base {
                    base.walk(f);
                }
            }
            Ast::Piecewise { pieces, otherwise } => {
                for piece in pieces {
                    piece.value.walk(f);
                    piece.condition.walk(f);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.walk(f);
                }
            }
            Ast::Diff { .. } | Ast::Ci(_) | Ast::Cn(_) | Ast::Constant(_) => {}
        }
    }

    /// Every variable referenced by the tree, including derivative operands
    /// and bound variables, in tree order.
    pub fn referenced_variables(&self) -> Vec<&Ci> {
        let mut res = Vec::new();
        self.walk(&mut |node| match node {
            Ast::Ci(ci) => res.push(ci),
            Ast::Diff { variable, voi, .. } => {
                res.push(voi);
                res.push(variable);
            }
            _ => {}
        });
        res
    }

    /// Numeric value of a literal node, used to spot special exponents,
    /// degrees and bases.
    pub fn literal_value(&self) -> Option<f64> {
        match self {
            Ast::Cn(value) => Some(*value),
            Ast::Unary {
                op: UnaryOp::Minus,
                arg,
            } => arg.literal_value().map(|v| -v),
            _ => None,
        }
    }
}

/// Shortest round-trippable rendering that always reads as a floating point
/// literal (`1.0`, `0.5`, `1e-7`).
pub fn format_number(value: f64) -> String {
    format!("{value:?}")
}

fn fmt_operand(ast: &Ast, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ast {
        Ast::Binary { op, .. } if !matches!(op, BinaryOp::Min | BinaryOp::Max | BinaryOp::Rem) => {
            write!(f, "({ast})")
        }
        _ => write!(f, "{ast}"),
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::Equality { lhs, rhs } => write!(f, "{lhs} = {rhs}"),
            Ast::Binary { op, lhs, rhs } => match op {
                BinaryOp::Min | BinaryOp::Max | BinaryOp::Rem => {
                    write!(f, "{}({lhs}, {rhs})", op.symbol())
                }
                _ => {
                    fmt_operand(lhs, f)?;
                    write!(f, " {} ", op.symbol())?;
                    fmt_operand(rhs, f)
                }
            },
            Ast::Unary {
                op: UnaryOp::Minus,
                arg,
            } => {
                write!(f, "-")?;
                fmt_operand(arg, f)
            }
            Ast::Unary { op, arg } => write!(f, "{}({arg})", op.name()),
            Ast::Root { arg, degree: None } => write!(f, "sqrt({arg})"),
            Ast::Root {
                arg,
                degree: Some(degree),
            } => write!(f, "root({arg}, {degree})"),
            Ast::Log { arg, base: None } => write!(f, "log({arg})"),
            Ast::Log {
                arg,
                base: Some(base),
            } => write!(f, "log({arg}, {base})"),
            Ast::Diff { variable, voi, .. } => write!(f, "d({})/d({})", variable.name, voi.name),
            Ast::Piecewise { pieces, otherwise } => {
                write!(f, "piecewise(")?;
                for (i, piece) in pieces.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} if {}", piece.value, piece.condition)?;
                }
                if let Some(otherwise) = otherwise {
                    if !pieces.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "otherwise {otherwise}")?;
                }
                write!(f, ")")
            }
            Ast::Ci(ci) => write!(f, "{}", ci.name),
            Ast::Cn(value) => write!(f, "{}", format_number(*value)),
            Ast::Constant(constant) => {
                let text = match constant {
                    MathConstant::True => "true",
                    MathConstant::False => "false",
                    MathConstant::E => "e",
                    MathConstant::Pi => "pi",
                    MathConstant::Infinity => "inf",
                    MathConstant::NotANumber => "nan",
                };
                write!(f, "{text}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    #[test]
    fn displays_infix_form() {
        let mut model = Model::new("m");
        let c = model.add_component("c").unwrap();
        let x = model.add_variable(c, "x", "dimensionless").unwrap();
        let t = model.add_variable(c, "t", "second").unwrap();

        let eq = Ast::equality(
            Ast::diff(model.ci_ref(x), model.ci_ref(t)),
            Ast::times(Ast::plus(model.ci(x), Ast::cn(1.0)), Ast::unary(UnaryOp::Sin, model.ci(t))),
        );
        assert_eq!(eq.to_string(), "d(x)/d(t) = (x + 1.0) * sin(t)");
    }

    #[test]
    fn nary_folds_to_the_left() {
        let ast = Ast::nary(BinaryOp::Plus, vec![Ast::cn(1.0), Ast::cn(2.0), Ast::cn(3.0)]);
        assert_eq!(
            ast,
            Ast::plus(Ast::plus(Ast::cn(1.0), Ast::cn(2.0)), Ast::cn(3.0))
        );
    }

    #[test]
    fn collects_referenced_variables() {
        let mut model = Model::new("m");
        let c = model.add_component("c").unwrap();
        let x = model.add_variable(c, "x", "dimensionless").unwrap();
        let t = model.add_variable(c, "t", "second").unwrap();
        let eq = Ast::equality(Ast::diff(model.ci_ref(x), model.ci_ref(t)), model.ci(x));

        let names: Vec<_> = eq.referenced_variables().iter().map(|ci| ci.name.as_str()).collect();
        assert_eq!(names, vec!["t", "x", "x"]);
    }

    #[test]
    fn literal_values() {
        assert_eq!(Ast::neg(Ast::cn(2.0)).literal_value(), Some(-2.0));
        assert_eq!(format_number(1.0), "1.0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1e-7), "1e-7");
    }
}
