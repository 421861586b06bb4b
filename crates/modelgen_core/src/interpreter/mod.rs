//! Direct evaluation of analysed models.
//!
//! The interpreter walks the expression trees of an [`AnalysedModel`] against
//! in-memory buffers laid out exactly as the generated code lays out its
//! arrays, so interpreted and generated runs can be compared element by
//! element.

mod nla;

pub use nla::{NewtonSettings, NewtonSolver, NlaOutcome, NlaSolver};

use crate::analyser::{AnalysedModel, EquationType, Initialiser, VariableType};
use crate::ast::{Ast, BinaryOp, MathConstant, UnaryOp};
use std::f64::consts;
use std::fmt;
use std::sync::Arc;

/// What an external variable provider is asked for.
#[derive(Debug, Clone, Copy)]
pub struct ExternalContext<'a> {
    pub voi: f64,
    pub states: &'a [f64],
    pub rates: &'a [f64],
    /// Every non-state variable, laid out as [`Interpreter::variables`].
    pub variables: &'a [f64],
    /// Index of the requested external variable.
    pub index: usize,
}

type ExternalProvider = Box<dyn Fn(ExternalContext<'_>) -> f64>;

/// Numeric buffers of one model run.
#[derive(Debug, Clone, Default)]
struct Buffers {
    voi: f64,
    states: Vec<f64>,
    rates: Vec<f64>,
    variables: Vec<f64>,
}

/// Offsets of each non-state bucket in the variables buffer.
#[derive(Debug, Clone, Copy, Default)]
struct Layout {
    computed_constants: usize,
    algebraic: usize,
    externals: usize,
}

impl Layout {
    fn new(model: &AnalysedModel) -> Self {
        let computed_constants = model.constant_count();
        let algebraic = computed_constants + model.computed_constant_count();
        let externals = algebraic + model.algebraic_count();
        Self {
            computed_constants,
            algebraic,
            externals,
        }
    }
}

pub struct Interpreter {
    model: Option<Arc<AnalysedModel>>,
    layout: Layout,
    buffers: Buffers,
    external_provider: Option<ExternalProvider>,
    nla_solver: Box<dyn NlaSolver>,
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("model", &self.model)
            .field("layout", &self.layout)
            .field("buffers", &self.buffers)
            .field("has_external_provider", &self.external_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            model: None,
            layout: Layout::default(),
            buffers: Buffers::default(),
            external_provider: None,
            nla_solver: Box::new(NewtonSolver::default()),
        }
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds `model` and resizes every buffer for it, filled with NaN.
    pub fn set_model(&mut self, model: Arc<AnalysedModel>) {
        self.layout = Layout::new(&model);
        self.buffers = Buffers {
            voi: 0.0,
            states: vec![f64::NAN; model.state_count()],
            rates: vec![f64::NAN; model.state_count()],
            variables: vec![f64::NAN; model.non_state_count()],
        };
        self.model = Some(model);
    }

    pub fn model(&self) -> Option<&Arc<AnalysedModel>> {
        self.model.as_ref()
    }

    pub fn set_external_provider(&mut self, provider: impl Fn(ExternalContext<'_>) -> f64 + 'static) {
        self.external_provider = Some(Box::new(provider));
    }

    pub fn clear_external_provider(&mut self) {
        self.external_provider = None;
    }

    pub fn set_nla_solver(&mut self, solver: Box<dyn NlaSolver>) {
        self.nla_solver = solver;
    }

    pub fn voi(&self) -> f64 {
        self.buffers.voi
    }

    pub fn states(&self) -> &[f64] {
        &self.buffers.states
    }

    /// States, writable so a caller can integrate between calls.
    pub fn states_mut(&mut self) -> &mut [f64] {
        &mut self.buffers.states
    }

    pub fn rates(&self) -> &[f64] {
        &self.buffers.rates
    }

    /// Non-state variables: constants, computed constants, algebraic
    /// variables and external variables, in that order.
    pub fn variables(&self) -> &[f64] {
        &self.buffers.variables
    }

    pub fn constants(&self) -> &[f64] {
        &self.buffers.variables[..self.layout.computed_constants]
    }

    pub fn computed_constants(&self) -> &[f64] {
        &self.buffers.variables[self.layout.computed_constants..self.layout.algebraic]
    }

    pub fn algebraic(&self) -> &[f64] {
        &self.buffers.variables[self.layout.algebraic..self.layout.externals]
    }

    pub fn externals(&self) -> &[f64] {
        &self.buffers.variables[self.layout.externals..]
    }

    /// External values, writable for callers that set them directly rather
    /// than through a provider.
    pub fn externals_mut(&mut self) -> &mut [f64] {
        &mut self.buffers.variables[self.layout.externals..]
    }

    /// Seeds constants, states and NLA initial guesses from their initial
    /// values.
    pub fn initialise_variables(&mut self) {
        let Some(model) = self.model.clone() else {
            return;
        };
        tracing::debug!("initialising variables");
        for position in model.initialisation_order() {
            let value = match model.variables()[position].initialiser {
                Some(Initialiser::Value(value)) => value,
                Some(Initialiser::Constant(source)) => self.read(&model, source),
                None => continue,
            };
            self.write(&model, position, value);
        }
    }

    pub fn compute_computed_constants(&mut self) {
        let Some(model) = self.model.clone() else {
            return;
        };
        tracing::debug!("computing computed constants");
        self.evaluate(&model, &model.constant_equations());
    }

    pub fn compute_rates(&mut self, voi: f64) {
        let Some(model) = self.model.clone() else {
            return;
        };
        if !model.is_differential() {
            return;
        }
        tracing::debug!(voi, "computing rates");
        self.buffers.voi = voi;
        self.evaluate(&model, &model.rate_equations());
    }

    pub fn compute_variables(&mut self, voi: f64) {
        let Some(model) = self.model.clone() else {
            return;
        };
        tracing::debug!(voi, "computing variables");
        self.buffers.voi = voi;
        self.evaluate(&model, &model.variable_equations());
    }

    fn evaluate(&mut self, model: &AnalysedModel, selected: &[usize]) {
        let mut solved_systems = Vec::new();
        for &e in selected {
            let equation = &model.equations()[e];
            match equation.ty {
                EquationType::Nla => {
                    let Some(system) = equation.nla_system_index else {
                        continue;
                    };
                    if !solved_systems.contains(&system) {
                        solved_systems.push(system);
                        self.solve_nla_system(model, system);
                    }
                }
                EquationType::External => {
                    for &position in &equation.variables {
                        self.fetch_external(model, position);
                    }
                }
                _ => {
                    let Some(Ast::Equality { lhs, rhs }) = &equation.ast else {
                        continue;
                    };
                    let value = self.eval(model, rhs);
                    match lhs.as_ref() {
                        Ast::Diff { variable, .. } => {
                            if let Some(index) = model.analysed_variable(variable.variable).and_then(|v| v.index) {
                                self.buffers.rates[index] = value;
                            }
                        }
                        Ast::Ci(ci) => {
                            if let Some(position) = model.position_of(ci.variable) {
                                self.write(model, position, value);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn fetch_external(&mut self, model: &AnalysedModel, position: usize) {
        let Some(provider) = &self.external_provider else {
            return;
        };
        let Some(index) = model.variables()[position].index else {
            return;
        };
        let value = provider(ExternalContext {
            voi: self.buffers.voi,
            states: &self.buffers.states,
            rates: &self.buffers.rates,
            variables: &self.buffers.variables,
            index,
        });
        self.write(model, position, value);
    }

    fn solve_nla_system(&mut self, model: &AnalysedModel, system: usize) {
        let equations: Vec<&Ast> = model
            .equations()
            .iter()
            .filter(|e| e.nla_system_index == Some(system))
            .filter_map(|e| e.ast.as_ref())
            .collect();
        let mut unknowns = Vec::new();
        for equation in model.equations().iter().filter(|e| e.nla_system_index == Some(system)) {
            for &v in &equation.variables {
                if !unknowns.contains(&v) {
                    unknowns.push(v);
                }
            }
        }

        let slots: Vec<Slot> = unknowns
            .iter()
            .map(|&v| unknown_slot(self.layout, model, v))
            .collect();
        let mut u: Vec<f64> = slots
            .iter()
            .map(|&slot| self.buffers.get(slot))
            .map(|value| if value.is_nan() { 0.0 } else { value })
            .collect();

        let layout = self.layout;
        let buffers = &mut self.buffers;
        let mut objective = |u: &[f64], f: &mut [f64]| {
            for (&slot, &value) in slots.iter().zip(u) {
                buffers.set(slot, value);
            }
            for (residual, ast) in f.iter_mut().zip(&equations) {
                *residual = eval(buffers, layout, model, ast);
            }
        };
        let outcome = self.nla_solver.solve(&mut objective, &mut u);

        match outcome {
            Ok(outcome) => tracing::debug!(
                system,
                iterations = outcome.iterations,
                residual_norm = outcome.residual_norm,
                "solved NLA system"
            ),
            Err(err) => tracing::warn!(system, error = %format!("{err:#}"), "failed to solve NLA system"),
        }
        for (&slot, &value) in slots.iter().zip(&u) {
            self.buffers.set(slot, value);
        }
    }

    fn read(&self, model: &AnalysedModel, position: usize) -> f64 {
        read_slot(&self.buffers, self.layout, model, position)
    }

    fn write(&mut self, model: &AnalysedModel, position: usize, value: f64) {
        write_slot(&mut self.buffers, self.layout, model, position, value);
    }

    fn eval(&self, model: &AnalysedModel, ast: &Ast) -> f64 {
        eval(&self.buffers, self.layout, model, ast)
    }
}

/// Where an analysed variable lives in the buffers.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Voi,
    State(usize),
    Rate(usize),
    Variable(usize),
}

impl Buffers {
    fn get(&self, slot: Slot) -> f64 {
        let value = match slot {
            Slot::Voi => Some(&self.voi),
            Slot::State(i) => self.states.get(i),
            Slot::Rate(i) => self.rates.get(i),
            Slot::Variable(i) => self.variables.get(i),
        };
        value.copied().unwrap_or(f64::NAN)
    }

    fn set(&mut self, slot: Slot, value: f64) {
        let target = match slot {
            Slot::Voi => Some(&mut self.voi),
            Slot::State(i) => self.states.get_mut(i),
            Slot::Rate(i) => self.rates.get_mut(i),
            Slot::Variable(i) => self.variables.get_mut(i),
        };
        if let Some(target) = target {
            *target = value;
        }
    }
}

fn slot(layout: Layout, model: &AnalysedModel, position: usize) -> Slot {
    let var = &model.variables()[position];
    let index = var.index.unwrap_or_default();
    match var.ty {
        VariableType::VariableOfIntegration => Slot::Voi,
        VariableType::State => Slot::State(index),
        VariableType::Constant => Slot::Variable(index),
        VariableType::ComputedConstant => Slot::Variable(layout.computed_constants + index),
        VariableType::Algebraic => Slot::Variable(layout.algebraic + index),
        VariableType::External => Slot::Variable(layout.externals + index),
    }
}

/// Where an NLA unknown lives. A state is solved for through its rate.
fn unknown_slot(layout: Layout, model: &AnalysedModel, position: usize) -> Slot {
    match slot(layout, model, position) {
        Slot::State(i) => Slot::Rate(i),
        other => other,
    }
}

fn read_slot(buffers: &Buffers, layout: Layout, model: &AnalysedModel, position: usize) -> f64 {
    buffers.get(slot(layout, model, position))
}

fn write_slot(buffers: &mut Buffers, layout: Layout, model: &AnalysedModel, position: usize, value: f64) {
    buffers.set(slot(layout, model, position), value);
}

fn truth(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn eval(buffers: &Buffers, layout: Layout, model: &AnalysedModel, ast: &Ast) -> f64 {
    let eval = |ast: &Ast| eval(buffers, layout, model, ast);
    match ast {
        Ast::Equality { lhs, rhs } => truth(eval(lhs) == eval(rhs)),
        Ast::Binary { op, lhs, rhs } => {
            let (a, b) = (eval(lhs), eval(rhs));
            match op {
                BinaryOp::Eq => truth(a == b),
                BinaryOp::Neq => truth(a != b),
                BinaryOp::Lt => truth(a < b),
                BinaryOp::Leq => truth(a <= b),
                BinaryOp::Gt => truth(a > b),
                BinaryOp::Geq => truth(a >= b),
                BinaryOp::And => truth(a != 0.0 && b != 0.0),
                BinaryOp::Or => truth(a != 0.0 || b != 0.0),
                BinaryOp::Xor => truth((a != 0.0) ^ (b != 0.0)),
                BinaryOp::Plus => a + b,
                BinaryOp::Minus => a - b,
                BinaryOp::Times => a * b,
                BinaryOp::Divide => a / b,
                BinaryOp::Power => a.powf(b),
                BinaryOp::Rem => a % b,
                BinaryOp::Min => a.min(b),
                BinaryOp::Max => a.max(b),
            }
        }
        Ast::Unary { op, arg } => unary(*op, eval(arg)),
        Ast::Root { arg, degree } => match degree {
            Some(degree) => eval(arg).powf(1.0 / eval(degree)),
            None => eval(arg).sqrt(),
        },
        Ast::Log { arg, base } => match base {
            Some(base) => eval(arg).ln() / eval(base).ln(),
            None => eval(arg).log10(),
        },
        Ast::Diff { variable, .. } => match model.analysed_variable(variable.variable) {
            Some(var) if var.ty == VariableType::State => var
                .index
                .and_then(|i| buffers.rates.get(i).copied())
                .unwrap_or(f64::NAN),
            _ => f64::NAN,
        },
        Ast::Piecewise { pieces, otherwise } => pieces
            .iter()
            .find(|piece| eval(&piece.condition) != 0.0)
            .map(|piece| eval(&piece.value))
            .or_else(|| otherwise.as_deref().map(eval))
            .unwrap_or(f64::NAN),
        Ast::Ci(ci) => match model.position_of(ci.variable) {
            Some(position) => read_slot(buffers, layout, model, position),
            None => f64::NAN,
        },
        Ast::Cn(value) => *value,
        Ast::Constant(constant) => match constant {
            MathConstant::True => 1.0,
            MathConstant::False => 0.0,
            MathConstant::E => consts::E,
            MathConstant::Pi => consts::PI,
            MathConstant::Infinity => f64::INFINITY,
            MathConstant::NotANumber => f64::NAN,
        },
    }
}

fn unary(op: UnaryOp, x: f64) -> f64 {
    match op {
        UnaryOp::Minus => -x,
        UnaryOp::Not => truth(x == 0.0),
        UnaryOp::Abs => x.abs(),
        UnaryOp::Exp => x.exp(),
        UnaryOp::Ln => x.ln(),
        UnaryOp::Ceiling => x.ceil(),
        UnaryOp::Floor => x.floor(),
        UnaryOp::Sin => x.sin(),
        UnaryOp::Cos => x.cos(),
        UnaryOp::Tan => x.tan(),
        UnaryOp::Sec => 1.0 / x.cos(),
        UnaryOp::Csc => 1.0 / x.sin(),
        UnaryOp::Cot => 1.0 / x.tan(),
        UnaryOp::Sinh => x.sinh(),
        UnaryOp::Cosh => x.cosh(),
        UnaryOp::Tanh => x.tanh(),
        UnaryOp::Sech => 1.0 / x.cosh(),
        UnaryOp::Csch => 1.0 / x.sinh(),
        UnaryOp::Coth => 1.0 / x.tanh(),
        UnaryOp::Asin => x.asin(),
        UnaryOp::Acos => x.acos(),
        UnaryOp::Atan => x.atan(),
        UnaryOp::Asec => (1.0 / x).acos(),
        UnaryOp::Acsc => (1.0 / x).asin(),
        UnaryOp::Acot => (1.0 / x).atan(),
        UnaryOp::Asinh => x.asinh(),
        UnaryOp::Acosh => x.acosh(),
        UnaryOp::Atanh => x.atanh(),
        UnaryOp::Asech => (1.0 / x).acosh(),
        UnaryOp::Acsch => (1.0 / x).asinh(),
        UnaryOp::Acoth => (1.0 / x).atanh(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::{analyse, Analyser, ExternalVariable, ModelType};
    use crate::model::{ComponentId, InitialValue, Model, VariableId};
    use anyhow::{bail, Result};
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixture {
        model: Model,
        c: ComponentId,
    }

    impl Fixture {
        fn new() -> Self {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
            let mut model = Model::new("interpreted");
            let c = model.add_component("main").unwrap();
            Self { model, c }
        }

        fn var(&mut self, name: &str, initial: Option<f64>) -> VariableId {
            let v = self.model.add_variable(self.c, name, "dimensionless").unwrap();
            if let Some(value) = initial {
                self.model.set_initial_value(v, InitialValue::Number(value)).unwrap();
            }
            v
        }

        fn eq(&mut self, lhs: Ast, rhs: Ast) {
            self.model.add_equation(self.c, Ast::equality(lhs, rhs)).unwrap();
        }

        fn rate(&self, x: VariableId, t: VariableId) -> Ast {
            Ast::diff(self.model.ci_ref(x), self.model.ci_ref(t))
        }

        fn interpreter(&self) -> Interpreter {
            let (issues, model) = analyse(&self.model, &[]);
            assert!(issues.is_empty(), "{:?}", issues);
            let mut interpreter = Interpreter::new();
            interpreter.set_model(model);
            interpreter
        }
    }

    fn run(interpreter: &mut Interpreter, voi: f64) {
        interpreter.initialise_variables();
        interpreter.compute_computed_constants();
        interpreter.compute_rates(voi);
        interpreter.compute_variables(voi);
    }

    #[test]
    fn unit_rate_ode() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(0.0));
        let rate = f.rate(x, t);
        f.eq(rate, Ast::cn(1.0));

        let mut interpreter = f.interpreter();
        assert_eq!(interpreter.states().len(), 1);
        assert!(interpreter.states()[0].is_nan());
        assert!(interpreter.rates()[0].is_nan());
        assert!(interpreter.variables().is_empty());

        run(&mut interpreter, 0.0);
        assert_eq!(interpreter.voi(), 0.0);
        assert_eq!(interpreter.states(), &[0.0]);
        assert_eq!(interpreter.rates(), &[1.0]);
    }

    #[test]
    fn buckets_follow_the_analysed_layout() {
        // d(x)/d(t) = -c*x, c = 2*a, y = c + x
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(3.0));
        let a = f.var("a", Some(0.25));
        let c = f.var("c", None);
        let y = f.var("y", None);
        let rate = f.rate(x, t);
        let rhs = Ast::times(Ast::neg(f.model.ci(c)), f.model.ci(x));
        f.eq(rate, rhs);
        let rhs = Ast::times(Ast::cn(2.0), f.model.ci(a));
        f.eq(f.model.ci(c), rhs);
        let rhs = Ast::plus(f.model.ci(c), f.model.ci(x));
        f.eq(f.model.ci(y), rhs);

        let mut interpreter = f.interpreter();
        interpreter.initialise_variables();
        assert_eq!(interpreter.constants(), &[0.25]);
        assert!(interpreter.computed_constants()[0].is_nan());
        assert!(interpreter.algebraic()[0].is_nan());

        interpreter.compute_computed_constants();
        assert_eq!(interpreter.computed_constants(), &[0.5]);

        interpreter.compute_rates(1.0);
        assert_eq!(interpreter.rates(), &[-1.5]);
        assert!(interpreter.algebraic()[0].is_nan());

        interpreter.compute_variables(1.0);
        assert_eq!(interpreter.algebraic(), &[3.5]);
        assert_eq!(interpreter.variables(), &[0.25, 0.5, 3.5]);
        assert!(interpreter.externals().is_empty());
    }

    #[test]
    fn computation_is_idempotent() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(2.0));
        let k = f.var("k", Some(0.5));
        let rate = f.rate(x, t);
        let rhs = Ast::times(f.model.ci(k), Ast::unary(UnaryOp::Sin, f.model.ci(t)));
        f.eq(rate, rhs);

        let mut interpreter = f.interpreter();
        run(&mut interpreter, 1.0);
        let first = (interpreter.states().to_vec(), interpreter.rates().to_vec());
        run(&mut interpreter, 1.0);
        assert_eq!((interpreter.states().to_vec(), interpreter.rates().to_vec()), first);
        assert_relative_eq!(interpreter.rates()[0], 0.5 * 1f64.sin());
    }

    #[test]
    fn states_can_be_advanced_between_calls() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(1.0));
        let rate = f.rate(x, t);
        let rhs = Ast::neg(f.model.ci(x));
        f.eq(rate, rhs);

        let mut interpreter = f.interpreter();
        interpreter.initialise_variables();
        let dt = 1e-3;
        let mut voi = 0.0;
        for _ in 0..1000 {
            interpreter.compute_rates(voi);
            let rate = interpreter.rates()[0];
            interpreter.states_mut()[0] += dt * rate;
            voi += dt;
        }
        assert_relative_eq!(interpreter.states()[0], (-1.0f64).exp(), epsilon = 1e-3);
    }

    #[test]
    fn nla_systems_are_solved() {
        // x + y = 3, x - y = 1
        let mut f = Fixture::new();
        let x = f.var("x", Some(0.0));
        let y = f.var("y", Some(0.0));
        let lhs = Ast::plus(f.model.ci(x), f.model.ci(y));
        f.eq(lhs, Ast::cn(3.0));
        let lhs = Ast::minus(f.model.ci(x), f.model.ci(y));
        f.eq(lhs, Ast::cn(1.0));

        let mut interpreter = f.interpreter();
        run(&mut interpreter, 0.0);
        assert_relative_eq!(interpreter.algebraic()[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(interpreter.algebraic()[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn rates_are_solved_by_root_finding() {
        // sin(dx/dt) = 0.5
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(1.0));
        let rate = f.rate(x, t);
        f.eq(Ast::unary(UnaryOp::Sin, rate), Ast::cn(0.5));

        let mut interpreter = f.interpreter();
        assert_eq!(interpreter.model().unwrap().model_type(), ModelType::Dae);
        interpreter.initialise_variables();
        interpreter.compute_computed_constants();
        interpreter.compute_rates(0.0);
        assert_eq!(interpreter.states(), &[1.0]);
        assert_relative_eq!(interpreter.rates()[0], 0.5f64.asin(), epsilon = 1e-9);

        interpreter.buffers.rates[0] = f64::NAN;
        interpreter.compute_variables(0.0);
        assert_relative_eq!(interpreter.rates()[0], 0.5f64.asin(), epsilon = 1e-9);
        assert_eq!(interpreter.states(), &[1.0]);
    }

    struct FailingSolver;

    impl NlaSolver for FailingSolver {
        fn solve(&self, _: &mut dyn FnMut(&[f64], &mut [f64]), _: &mut [f64]) -> Result<NlaOutcome> {
            bail!("no root")
        }
    }

    #[test]
    fn solver_failures_leave_the_last_iterate() {
        let mut f = Fixture::new();
        let x = f.var("x", Some(4.0));
        let lhs = Ast::times(f.model.ci(x), f.model.ci(x));
        f.eq(lhs, Ast::cn(2.0));

        let mut interpreter = f.interpreter();
        interpreter.set_nla_solver(Box::new(FailingSolver));
        run(&mut interpreter, 0.0);
        assert_eq!(interpreter.algebraic(), &[4.0]);
    }

    #[test]
    fn externals_come_from_the_provider() {
        // d(x)/d(t) = -k*x with k external
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(2.0));
        let k = f.var("k", None);
        let rate = f.rate(x, t);
        let rhs = Ast::times(Ast::neg(f.model.ci(k)), f.model.ci(x));
        f.eq(rate, rhs);

        let mut analyser = Analyser::new();
        analyser.add_external_variable(ExternalVariable::new(&f.model, k));
        let model = analyser.analyse_model(&f.model);
        let mut interpreter = Interpreter::new();
        interpreter.set_model(model);

        interpreter.initialise_variables();
        interpreter.compute_rates(0.0);
        assert!(interpreter.rates()[0].is_nan());

        interpreter.externals_mut()[0] = 1.0;
        interpreter.compute_rates(0.0);
        assert_eq!(interpreter.rates(), &[-2.0]);

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        interpreter.set_external_provider(move |context| {
            seen.set(seen.get() + 1);
            assert_eq!(context.index, 0);
            context.voi + 3.0
        });
        interpreter.compute_rates(1.0);
        assert_eq!(interpreter.externals(), &[4.0]);
        assert_eq!(interpreter.rates(), &[-8.0]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn expressions_evaluate_like_the_generated_code() {
        let mut f = Fixture::new();
        let a = f.var("a", Some(-2.0));
        let b = f.var("b", None);
        let rhs = Ast::piecewise(
            vec![Ast::piece(
                Ast::root(Ast::cn(27.0), Ast::cn(3.0)),
                Ast::binary(BinaryOp::Lt, f.model.ci(a), Ast::cn(0.0)),
            )],
            Some(Ast::constant(MathConstant::NotANumber)),
        );
        let rhs = Ast::plus(
            rhs,
            Ast::plus(
                Ast::log(Ast::cn(8.0), Ast::cn(2.0)),
                Ast::binary(BinaryOp::Max, Ast::unary(UnaryOp::Abs, f.model.ci(a)), Ast::cn(1.0)),
            ),
        );
        f.eq(f.model.ci(b), rhs);

        let mut interpreter = f.interpreter();
        run(&mut interpreter, 0.0);
        assert_relative_eq!(interpreter.computed_constants()[0], 3.0 + 3.0 + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn debug_output_skips_the_callbacks() {
        let mut interpreter = Interpreter::new();
        let text = format!("{interpreter:?}");
        assert!(text.starts_with("Interpreter {"));
        assert!(text.contains("has_external_provider: false"));

        interpreter.set_external_provider(|context| context.voi);
        assert!(format!("{interpreter:?}").contains("has_external_provider: true"));
    }

    #[test]
    fn nothing_happens_without_a_model() {
        let mut interpreter = Interpreter::new();
        run(&mut interpreter, 1.0);
        assert_eq!(interpreter.voi(), 0.0);
        assert!(interpreter.states().is_empty());
        assert!(interpreter.variables().is_empty());
    }
}
