use crate::analyser::{AnalysedModel, VariableType};
use crate::ast::{format_number, Ast, BinaryOp, Ci, MathConstant, UnaryOp};
use crate::profile::GeneratorProfile;

/// How variable leaves and derivatives are spelled in generated code.
pub(crate) trait VariableNames {
    fn variable(&self, ci: &Ci) -> String;
    fn rate(&self, variable: &Ci, voi: &Ci) -> String;
}

/// Spells variables by their model names, derivatives as `d(x)/d(t)`.
pub(crate) struct PlainNames;

impl VariableNames for PlainNames {
    fn variable(&self, ci: &Ci) -> String {
        ci.name.clone()
    }

    fn rate(&self, variable: &Ci, voi: &Ci) -> String {
        format!("d({})/d({})", variable.name, voi.name)
    }
}

/// Spells variables as elements of the arrays of an analysed model.
pub(crate) struct ArrayNames<'a> {
    pub model: &'a AnalysedModel,
    pub profile: &'a GeneratorProfile,
}

impl ArrayNames<'_> {
    pub fn element(&self, array: &str, index: usize) -> String {
        format!(
            "{array}{}{index}{}",
            self.profile.open_array_string, self.profile.close_array_string
        )
    }

    /// Code for the analysed variable at `position` in the model arena.
    pub fn analysed(&self, position: usize) -> String {
        let var = &self.model.variables()[position];
        let p = self.profile;
        let array = match var.ty {
            VariableType::VariableOfIntegration => return p.voi_string.clone(),
            VariableType::State => &p.states_array_string,
            VariableType::Constant => &p.constants_array_string,
            VariableType::ComputedConstant => &p.computed_constants_array_string,
            VariableType::Algebraic => &p.algebraic_array_string,
            VariableType::External => &p.externals_array_string,
        };
        self.element(array, var.index.unwrap_or_default())
    }

    /// Code for an NLA unknown. A state takes part in an NLA system through
    /// its rate.
    pub fn unknown(&self, position: usize) -> String {
        let var = &self.model.variables()[position];
        match var.ty {
            VariableType::State => {
                self.element(&self.profile.rates_array_string, var.index.unwrap_or_default())
            }
            _ => self.analysed(position),
        }
    }
}

impl VariableNames for ArrayNames<'_> {
    fn variable(&self, ci: &Ci) -> String {
        match self.model.position_of(ci.variable) {
            Some(position) => self.analysed(position),
            None => ci.name.clone(),
        }
    }

    fn rate(&self, variable: &Ci, _voi: &Ci) -> String {
        match self.model.analysed_variable(variable.variable) {
            Some(var) if var.ty == VariableType::State => {
                self.element(&self.profile.rates_array_string, var.index.unwrap_or_default())
            }
            _ => format!("d({})", variable.name),
        }
    }
}

/// Renders expression trees with the strings of a profile.
pub(crate) struct Renderer<'a, N> {
    profile: &'a GeneratorProfile,
    names: &'a N,
}

fn parenthesise(code: String) -> String {
    format!("({code})")
}

fn is_op(ast: &Ast, wanted: BinaryOp) -> bool {
    matches!(ast, Ast::Binary { op, .. } if *op == wanted)
}

fn is_relational(ast: &Ast) -> bool {
    matches!(ast, Ast::Binary { op, .. } if op.is_relational())
}

fn is_logical(ast: &Ast) -> bool {
    matches!(ast, Ast::Binary { op, .. } if op.is_logical())
}

fn is_piecewise(ast: &Ast) -> bool {
    matches!(ast, Ast::Piecewise { .. })
}

/// Binary or unary minus, negative literals included.
fn is_minus(ast: &Ast) -> bool {
    match ast {
        Ast::Binary { op, .. } => *op == BinaryOp::Minus,
        Ast::Unary { op, .. } => *op == UnaryOp::Minus,
        Ast::Cn(value) => value.is_sign_negative() && !value.is_nan(),
        _ => false,
    }
}

fn is_sum(ast: &Ast) -> bool {
    is_op(ast, BinaryOp::Plus) || is_op(ast, BinaryOp::Minus)
}

fn is_power_like(ast: &Ast) -> bool {
    is_op(ast, BinaryOp::Power) || matches!(ast, Ast::Root { .. })
}

/// Leaves never need parentheses when spliced into a larger expression.
fn is_leaf(ast: &Ast) -> bool {
    matches!(ast, Ast::Ci(_) | Ast::Constant(_) | Ast::Diff { .. })
        || matches!(ast, Ast::Cn(value) if !value.is_sign_negative())
}

impl<'a, N: VariableNames> Renderer<'a, N> {
    pub fn new(profile: &'a GeneratorProfile, names: &'a N) -> Self {
        Self { profile, names }
    }

    pub fn code(&self, ast: &Ast) -> String {
        let p = self.profile;
        match ast {
            Ast::Equality { lhs, rhs } => {
                format!("{}{}{}", self.code(lhs), p.equality_string, self.code(rhs))
            }
            Ast::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Ast::Unary { op, arg } => self.unary(*op, arg),
            Ast::Root { arg, degree } => self.root(arg, degree.as_deref()),
            Ast::Log { arg, base } => match base.as_deref() {
                Some(base) if base.literal_value() != Some(10.0) => format!(
                    "{ln}({}){}{ln}({})",
                    self.code(arg),
                    p.divide_string,
                    self.code(base),
                    ln = p.natural_logarithm_string
                ),
                _ => self.call(&p.common_logarithm_string, arg),
            },
            Ast::Diff { variable, voi, .. } => self.names.rate(variable, voi),
            Ast::Piecewise { pieces, otherwise } => self.piecewise(pieces, otherwise.as_deref()),
            Ast::Ci(ci) => self.names.variable(ci),
            Ast::Cn(value) => self.number(*value),
            Ast::Constant(constant) => match constant {
                MathConstant::True => p.true_string.clone(),
                MathConstant::False => p.false_string.clone(),
                MathConstant::E => p.e_string.clone(),
                MathConstant::Pi => p.pi_string.clone(),
                MathConstant::Infinity => p.inf_string.clone(),
                MathConstant::NotANumber => p.nan_string.clone(),
            },
        }
    }

    fn number(&self, value: f64) -> String {
        let p = self.profile;
        if value.is_nan() {
            return p.nan_string.clone();
        }
        let magnitude = if value.is_infinite() {
            p.inf_string.clone()
        } else {
            format_number(value.abs())
        };
        if value.is_sign_negative() {
            format!("{}{magnitude}", p.minus_string)
        } else {
            magnitude
        }
    }

    fn call(&self, function: &str, arg: &Ast) -> String {
        format!("{function}({})", self.code(arg))
    }

    fn call2(&self, function: &str, lhs: &Ast, rhs: &Ast) -> String {
        format!("{function}({}, {})", self.code(lhs), self.code(rhs))
    }

    fn binary(&self, op: BinaryOp, lhs: &Ast, rhs: &Ast) -> String {
        let p = self.profile;
        let (text, has_operator) = match op {
            BinaryOp::Eq => (&p.eq_string, p.has_eq_operator),
            BinaryOp::Neq => (&p.neq_string, p.has_neq_operator),
            BinaryOp::Lt => (&p.lt_string, p.has_lt_operator),
            BinaryOp::Leq => (&p.leq_string, p.has_leq_operator),
            BinaryOp::Gt => (&p.gt_string, p.has_gt_operator),
            BinaryOp::Geq => (&p.geq_string, p.has_geq_operator),
            BinaryOp::And => (&p.and_string, p.has_and_operator),
            BinaryOp::Or => (&p.or_string, p.has_or_operator),
            BinaryOp::Xor => (&p.xor_string, p.has_xor_operator),
            BinaryOp::Plus => (&p.plus_string, true),
            BinaryOp::Minus => (&p.minus_string, true),
            BinaryOp::Times => (&p.times_string, true),
            BinaryOp::Divide => (&p.divide_string, true),
            BinaryOp::Power => return self.power(lhs, rhs),
            BinaryOp::Rem => return self.call2(&p.rem_string, lhs, rhs),
            BinaryOp::Min => return self.call2(&p.min_string, lhs, rhs),
            BinaryOp::Max => return self.call2(&p.max_string, lhs, rhs),
        };
        if has_operator {
            self.operator(text, op, lhs, rhs)
        } else {
            self.call2(text, lhs, rhs)
        }
    }

    /// Infix rendering, parenthesising operands whose operator binds looser
    /// than `op`.
    fn operator(&self, text: &str, op: BinaryOp, lhs: &Ast, rhs: &Ast) -> String {
        let mut left = self.code(lhs);
        let mut right = self.code(rhs);
        if self.wraps(op, lhs, false) {
            left = parenthesise(left);
        }
        if self.wraps(op, rhs, true) {
            right = parenthesise(right);
        }
        format!("{left}{text}{right}")
    }

    fn wraps(&self, op: BinaryOp, child: &Ast, is_rhs: bool) -> bool {
        let common = is_relational(child) || is_piecewise(child);
        let power_operator = self.profile.has_power_operator && is_power_like(child);
        match op {
            BinaryOp::Plus => common || is_logical(child),
            BinaryOp::Minus if is_rhs => {
                common || is_logical(child) || is_minus(child) || is_op(child, BinaryOp::Plus)
            }
            BinaryOp::Minus => common || is_logical(child),
            BinaryOp::Times => common || is_logical(child) || is_sum(child),
            BinaryOp::Divide if is_rhs => {
                common
                    || is_logical(child)
                    || is_sum(child)
                    || is_op(child, BinaryOp::Times)
                    || is_op(child, BinaryOp::Divide)
            }
            BinaryOp::Divide => common || is_logical(child) || is_sum(child),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                let other_logical = is_logical(child) && !is_op(child, op);
                common || other_logical || is_sum(child) || power_operator
            }
            BinaryOp::Power => {
                let base = common
                    || is_logical(child)
                    || is_minus(child)
                    || is_op(child, BinaryOp::Plus)
                    || is_op(child, BinaryOp::Times)
                    || is_op(child, BinaryOp::Divide);
                base || (is_rhs && is_power_like(child))
            }
            _ => false,
        }
    }

    fn power(&self, base: &Ast, exponent: &Ast) -> String {
        let p = self.profile;
        match exponent.literal_value() {
            Some(value) if value == 0.5 => return self.call(&p.square_root_string, base),
            Some(value) if value == 2.0 && !p.square_string.is_empty() => {
                return self.call(&p.square_string, base);
            }
            _ => {}
        }
        if p.has_power_operator {
            self.operator(&p.power_string, BinaryOp::Power, base, exponent)
        } else {
            self.call2(&p.power_string, base, exponent)
        }
    }

    fn root(&self, arg: &Ast, degree: Option<&Ast>) -> String {
        let p = self.profile;
        let degree = match degree {
            Some(degree) if degree.literal_value() != Some(2.0) => degree,
            _ => return self.call(&p.square_root_string, arg),
        };
        let mut degree_code = self.code(degree);
        if !is_leaf(degree) {
            degree_code = parenthesise(degree_code);
        }
        let reciprocal = format!("1.0{}{degree_code}", p.divide_string);
        if p.has_power_operator {
            let mut base = self.code(arg);
            if self.wraps(BinaryOp::Power, arg, false) {
                base = parenthesise(base);
            }
            format!("{base}{}({reciprocal})", p.power_string)
        } else {
            format!("{}({}, {reciprocal})", p.power_string, self.code(arg))
        }
    }

    fn unary(&self, op: UnaryOp, arg: &Ast) -> String {
        let p = self.profile;
        let function = match op {
            UnaryOp::Minus => {
                let mut code = self.code(arg);
                if is_relational(arg) || is_sum(arg) || is_minus(arg) || is_logical(arg) || is_piecewise(arg) {
                    code = parenthesise(code);
                }
                return format!("{}{code}", p.minus_string);
            }
            UnaryOp::Not if p.has_not_operator => {
                let mut code = self.code(arg);
                if !is_leaf(arg) {
                    code = parenthesise(code);
                }
                return format!("{}{code}", p.not_string);
            }
            UnaryOp::Not => &p.not_string,
            UnaryOp::Abs => &p.absolute_value_string,
            UnaryOp::Exp => &p.exponential_string,
            UnaryOp::Ln => &p.natural_logarithm_string,
            UnaryOp::Ceiling => &p.ceiling_string,
            UnaryOp::Floor => &p.floor_string,
            UnaryOp::Sin => &p.sin_string,
            UnaryOp::Cos => &p.cos_string,
            UnaryOp::Tan => &p.tan_string,
            UnaryOp::Sec => &p.sec_string,
            UnaryOp::Csc => &p.csc_string,
            UnaryOp::Cot => &p.cot_string,
            UnaryOp::Sinh => &p.sinh_string,
            UnaryOp::Cosh => &p.cosh_string,
            UnaryOp::Tanh => &p.tanh_string,
            UnaryOp::Sech => &p.sech_string,
            UnaryOp::Csch => &p.csch_string,
            UnaryOp::Coth => &p.coth_string,
            UnaryOp::Asin => &p.asin_string,
            UnaryOp::Acos => &p.acos_string,
            UnaryOp::Atan => &p.atan_string,
            UnaryOp::Asec => &p.asec_string,
            UnaryOp::Acsc => &p.acsc_string,
            UnaryOp::Acot => &p.acot_string,
            UnaryOp::Asinh => &p.asinh_string,
            UnaryOp::Acosh => &p.acosh_string,
            UnaryOp::Atanh => &p.atanh_string,
            UnaryOp::Asech => &p.asech_string,
            UnaryOp::Acsch => &p.acsch_string,
            UnaryOp::Acoth => &p.acoth_string,
        };
        self.call(function, arg)
    }

    fn piecewise(&self, pieces: &[crate::ast::Piece], otherwise: Option<&Ast>) -> String {
        let p = self.profile;
        let Some((first, rest)) = pieces.split_first() else {
            return match otherwise {
                Some(otherwise) => self.code(otherwise),
                None => p.nan_string.clone(),
            };
        };
        let if_code = p
            .piecewise_if()
            .replace("[CONDITION]", &self.code(&first.condition))
            .replace("[IF_STATEMENT]", &self.code(&first.value));
        let else_value = if rest.is_empty() {
            match otherwise {
                Some(otherwise) => self.code(otherwise),
                None => p.nan_string.clone(),
            }
        } else {
            self.piecewise(rest, otherwise)
        };
        format!("{if_code}{}", p.piecewise_else().replace("[ELSE_STATEMENT]", &else_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    struct Vars {
        a: Ast,
        b: Ast,
        c: Ast,
    }

    fn vars() -> Vars {
        let mut model = Model::new("m");
        let comp = model.add_component("c").unwrap();
        let a = model.add_variable(comp, "a", "dimensionless").unwrap();
        let b = model.add_variable(comp, "b", "dimensionless").unwrap();
        let c = model.add_variable(comp, "c", "dimensionless").unwrap();
        Vars {
            a: model.ci(a),
            b: model.ci(b),
            c: model.ci(c),
        }
    }

    fn c_code(ast: &Ast) -> String {
        let profile = GeneratorProfile::c();
        Renderer::new(&profile, &PlainNames).code(ast)
    }

    fn python_code(ast: &Ast) -> String {
        let profile = GeneratorProfile::python();
        Renderer::new(&profile, &PlainNames).code(ast)
    }

    #[test]
    fn arithmetic_precedence() {
        let Vars { a, b, c } = vars();
        assert_eq!(c_code(&Ast::times(Ast::plus(a.clone(), b.clone()), c.clone())), "(a+b)*c");
        assert_eq!(c_code(&Ast::minus(a.clone(), Ast::minus(b.clone(), c.clone()))), "a-(b-c)");
        assert_eq!(c_code(&Ast::minus(a.clone(), Ast::plus(b.clone(), c.clone()))), "a-(b+c)");
        assert_eq!(c_code(&Ast::plus(a.clone(), Ast::minus(b.clone(), c.clone()))), "a+b-c");
        assert_eq!(c_code(&Ast::divide(a.clone(), Ast::times(b.clone(), c.clone()))), "a/(b*c)");
        assert_eq!(c_code(&Ast::times(a.clone(), Ast::neg(b.clone()))), "a*-b");
        assert_eq!(c_code(&Ast::minus(a.clone(), Ast::cn(-2.0))), "a-(-2.0)");
        assert_eq!(c_code(&Ast::neg(Ast::plus(a, b))), "-(a+b)");
    }

    #[test]
    fn powers_roots_and_logarithms() {
        let Vars { a, b, .. } = vars();
        assert_eq!(c_code(&Ast::power(a.clone(), Ast::cn(0.5))), "sqrt(a)");
        assert_eq!(c_code(&Ast::power(a.clone(), Ast::cn(2.0))), "pow(a, 2.0)");
        assert_eq!(c_code(&Ast::root(a.clone(), Ast::cn(3.0))), "pow(a, 1.0/3.0)");
        assert_eq!(c_code(&Ast::root(a.clone(), Ast::plus(b.clone(), Ast::cn(1.0)))), "pow(a, 1.0/(b+1.0))");
        assert_eq!(c_code(&Ast::sqrt(a.clone())), "sqrt(a)");
        assert_eq!(c_code(&Ast::log10(a.clone())), "log10(a)");
        assert_eq!(c_code(&Ast::log(a.clone(), Ast::cn(2.0))), "log(a)/log(2.0)");

        let mut profile = GeneratorProfile::c();
        profile.has_power_operator = true;
        profile.power_string = "^".to_string();
        profile.square_string = "sq".to_string();
        let renderer = Renderer::new(&profile, &PlainNames);
        assert_eq!(renderer.code(&Ast::power(Ast::plus(a.clone(), b.clone()), b.clone())), "(a+b)^b");
        assert_eq!(renderer.code(&Ast::power(a.clone(), Ast::cn(2.0))), "sq(a)");
        assert_eq!(renderer.code(&Ast::root(a, Ast::cn(3.0))), "a^(1.0/3.0)");
    }

    #[test]
    fn relational_and_logical_operators() {
        let Vars { a, b, c } = vars();
        let lt = Ast::binary(BinaryOp::Lt, a.clone(), b.clone());
        let and = Ast::binary(BinaryOp::And, lt.clone(), Ast::binary(BinaryOp::Or, b.clone(), c.clone()));
        assert_eq!(c_code(&and), "(a < b) && (b || c)");
        assert_eq!(python_code(&and), "and_func(lt_func(a, b), or_func(b, c))");
        assert_eq!(c_code(&Ast::binary(BinaryOp::Xor, a.clone(), b.clone())), "xor(a, b)");
        assert_eq!(c_code(&Ast::unary(UnaryOp::Not, lt)), "!(a < b)");
        assert_eq!(python_code(&Ast::unary(UnaryOp::Not, a)), "not_func(a)");
    }

    #[test]
    fn piecewise_statements() {
        let Vars { a, b, c } = vars();
        let pw = Ast::piecewise(
            vec![
                Ast::piece(a.clone(), Ast::binary(BinaryOp::Gt, c.clone(), Ast::cn(0.0))),
                Ast::piece(b.clone(), Ast::binary(BinaryOp::Lt, c.clone(), Ast::cn(0.0))),
            ],
            Some(Ast::cn(0.0)),
        );
        assert_eq!(c_code(&pw), "(c > 0.0)?a:(c < 0.0)?b:0.0");
        assert_eq!(python_code(&pw), "a if gt_func(c, 0.0) else b if lt_func(c, 0.0) else 0.0");

        let single = Ast::piecewise(vec![Ast::piece(a, Ast::constant(MathConstant::True))], None);
        let mut profile = GeneratorProfile::c();
        profile.has_conditional_operator = false;
        assert_eq!(
            Renderer::new(&profile, &PlainNames).code(&single),
            "piecewise(1.0, a, NAN)"
        );
        assert_eq!(c_code(&Ast::plus(b, single)), "b+((1.0)?a:NAN)");
    }

    #[test]
    fn functions_and_constants() {
        let Vars { a, b, c } = vars();
        let min = Ast::nary(BinaryOp::Min, vec![a.clone(), b.clone(), c]);
        assert_eq!(c_code(&min), "min(min(a, b), c)");
        assert_eq!(c_code(&Ast::binary(BinaryOp::Rem, a.clone(), b)), "fmod(a, b)");
        assert_eq!(c_code(&Ast::unary(UnaryOp::Abs, a.clone())), "fabs(a)");
        assert_eq!(c_code(&Ast::unary(UnaryOp::Acoth, a)), "acoth(a)");
        assert_eq!(c_code(&Ast::constant(MathConstant::Infinity)), "INFINITY");
        assert_eq!(python_code(&Ast::constant(MathConstant::NotANumber)), "nan");
        assert_eq!(c_code(&Ast::cn(f64::NEG_INFINITY)), "-INFINITY");
    }
}
