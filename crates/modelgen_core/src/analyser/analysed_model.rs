use crate::ast::Ast;
use crate::model::VariableId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelType {
    Unknown,
    Invalid,
    Algebraic,
    Dae,
    Nla,
    Ode,
    Underconstrained,
    Overconstrained,
    UnsuitablyConstrained,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Unknown => "unknown",
            ModelType::Invalid => "invalid",
            ModelType::Algebraic => "algebraic",
            ModelType::Dae => "dae",
            ModelType::Nla => "nla",
            ModelType::Ode => "ode",
            ModelType::Underconstrained => "underconstrained",
            ModelType::Overconstrained => "overconstrained",
            ModelType::UnsuitablyConstrained => "unsuitably_constrained",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VariableType {
    VariableOfIntegration,
    State,
    Constant,
    ComputedConstant,
    Algebraic,
    External,
}

impl VariableType {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::VariableOfIntegration => "variable_of_integration",
            VariableType::State => "state",
            VariableType::Constant => "constant",
            VariableType::ComputedConstant => "computed_constant",
            VariableType::Algebraic => "algebraic",
            VariableType::External => "external",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EquationType {
    TrueConstant,
    VariableBasedConstant,
    Ode,
    Nla,
    Algebraic,
    External,
}

impl EquationType {
    pub fn as_str(self) -> &'static str {
        match self {
            EquationType::TrueConstant => "true_constant",
            EquationType::VariableBasedConstant => "variable_based_constant",
            EquationType::Ode => "ode",
            EquationType::Nla => "nla",
            EquationType::Algebraic => "algebraic",
            EquationType::External => "external",
        }
    }

    /// Whether the equation computes a computed constant.
    pub fn is_constant(self) -> bool {
        matches!(self, EquationType::TrueConstant | EquationType::VariableBasedConstant)
    }
}

impl fmt::Display for EquationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the initial value of a state, constant or NLA unknown comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Initialiser {
    Value(f64),
    /// A constant, referenced through its analysed variable.
    Constant(usize),
}

/// A classified variable. `index` is its position within its type bucket
/// and is `None` only for the variable of integration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysedVariable {
    pub ty: VariableType,
    pub index: Option<usize>,
    pub variable: VariableId,
    pub name: String,
    pub units: String,
    pub component: String,
    pub initialising_variable: Option<VariableId>,
    pub initialiser: Option<Initialiser>,
    /// Equations computing this variable, as positions in
    /// [`AnalysedModel::equations`].
    pub equations: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysedEquation {
    pub ty: EquationType,
    /// `None` for external equations. NLA equations hold their residual
    /// `lhs - rhs`; other equations hold `computed = expression`.
    pub ast: Option<Ast>,
    pub component: String,
    /// Variables computed by the equation, as positions in
    /// [`AnalysedModel::variables`].
    pub variables: Vec<usize>,
    /// Equations to evaluate first.
    pub dependencies: Vec<usize>,
    pub nla_system_index: Option<usize>,
    pub nla_siblings: Vec<usize>,
    /// For external equations, the variables the external value is computed
    /// from, as positions in [`AnalysedModel::variables`].
    pub external_dependencies: Vec<usize>,
    pub is_state_rate_based: bool,
}

/// Primitives that target languages may need helper definitions for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NeededFunctions {
    pub eq: bool,
    pub neq: bool,
    pub lt: bool,
    pub leq: bool,
    pub gt: bool,
    pub geq: bool,
    pub and: bool,
    pub or: bool,
    pub xor: bool,
    pub not: bool,
    pub min: bool,
    pub max: bool,
    pub sec: bool,
    pub csc: bool,
    pub cot: bool,
    pub sech: bool,
    pub csch: bool,
    pub coth: bool,
    pub asec: bool,
    pub acsc: bool,
    pub acot: bool,
    pub asech: bool,
    pub acsch: bool,
    pub acoth: bool,
}

/// Output of an analysis. Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysedModel {
    pub(crate) ty: ModelType,
    pub(crate) model_key: u64,
    pub(crate) voi: Option<usize>,
    pub(crate) variables: Vec<AnalysedVariable>,
    pub(crate) states: Vec<usize>,
    pub(crate) constants: Vec<usize>,
    pub(crate) computed_constants: Vec<usize>,
    pub(crate) algebraic: Vec<usize>,
    pub(crate) externals: Vec<usize>,
    pub(crate) equations: Vec<AnalysedEquation>,
    /// Equivalence class of every model variable, by variable index.
    pub(crate) classes: Vec<usize>,
    /// Analysed variable of every equivalence class.
    pub(crate) class_variables: Vec<Option<usize>>,
    pub(crate) needs: NeededFunctions,
    pub(crate) has_external_variables: bool,
}

impl Default for AnalysedModel {
    fn default() -> Self {
        Self::empty(ModelType::Unknown, 0)
    }
}

impl AnalysedModel {
    pub(crate) fn empty(ty: ModelType, model_key: u64) -> Self {
        Self {
            ty,
            model_key,
            voi: None,
            variables: Vec::new(),
            states: Vec::new(),
            constants: Vec::new(),
            computed_constants: Vec::new(),
            algebraic: Vec::new(),
            externals: Vec::new(),
            equations: Vec::new(),
            classes: Vec::new(),
            class_variables: Vec::new(),
            needs: NeededFunctions::default(),
            has_external_variables: false,
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.ty
    }

    pub fn is_valid(&self) -> bool {
        matches!(
            self.ty,
            ModelType::Algebraic | ModelType::Dae | ModelType::Nla | ModelType::Ode
        )
    }

    /// Whether the model has a variable of integration.
    pub fn is_differential(&self) -> bool {
        self.voi.is_some()
    }

    pub fn has_external_variables(&self) -> bool {
        self.has_external_variables
    }

    pub fn needs(&self) -> &NeededFunctions {
        &self.needs
    }

    pub fn voi(&self) -> Option<&AnalysedVariable> {
        self.voi.map(|i| &self.variables[i])
    }

    /// Every analysed variable, the variable of integration included.
    pub fn variables(&self) -> &[AnalysedVariable] {
        &self.variables
    }

    pub fn variable(&self, position: usize) -> Option<&AnalysedVariable> {
        self.variables.get(position)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    pub fn computed_constant_count(&self) -> usize {
        self.computed_constants.len()
    }

    pub fn algebraic_count(&self) -> usize {
        self.algebraic.len()
    }

    pub fn external_count(&self) -> usize {
        self.externals.len()
    }

    /// Constants, computed constants, algebraic and external variables.
    pub fn non_state_count(&self) -> usize {
        self.constant_count() + self.computed_constant_count() + self.algebraic_count() + self.external_count()
    }

    pub fn states(&self) -> impl Iterator<Item = &AnalysedVariable> + '_ {
        self.states.iter().map(move |&i| &self.variables[i])
    }

    pub fn constants(&self) -> impl Iterator<Item = &AnalysedVariable> + '_ {
        self.constants.iter().map(move |&i| &self.variables[i])
    }

    pub fn computed_constants(&self) -> impl Iterator<Item = &AnalysedVariable> + '_ {
        self.computed_constants.iter().map(move |&i| &self.variables[i])
    }

    pub fn algebraic(&self) -> impl Iterator<Item = &AnalysedVariable> + '_ {
        self.algebraic.iter().map(move |&i| &self.variables[i])
    }

    pub fn externals(&self) -> impl Iterator<Item = &AnalysedVariable> + '_ {
        self.externals.iter().map(move |&i| &self.variables[i])
    }

    pub fn state(&self, index: usize) -> Option<&AnalysedVariable> {
        self.states.get(index).map(|&i| &self.variables[i])
    }

    pub fn constant(&self, index: usize) -> Option<&AnalysedVariable> {
        self.constants.get(index).map(|&i| &self.variables[i])
    }

    pub fn computed_constant(&self, index: usize) -> Option<&AnalysedVariable> {
        self.computed_constants.get(index).map(|&i| &self.variables[i])
    }

    pub fn algebraic_variable(&self, index: usize) -> Option<&AnalysedVariable> {
        self.algebraic.get(index).map(|&i| &self.variables[i])
    }

    pub fn external(&self, index: usize) -> Option<&AnalysedVariable> {
        self.externals.get(index).map(|&i| &self.variables[i])
    }

    /// Analysed variables of one type, in index order.
    pub fn variables_of_type(&self, ty: VariableType) -> Vec<&AnalysedVariable> {
        let positions: &[usize] = match ty {
            VariableType::VariableOfIntegration => {
                return self.voi().into_iter().collect();
            }
            VariableType::State => &self.states,
            VariableType::Constant => &self.constants,
            VariableType::ComputedConstant => &self.computed_constants,
            VariableType::Algebraic => &self.algebraic,
            VariableType::External => &self.externals,
        };
        positions.iter().map(|&i| &self.variables[i]).collect()
    }

    pub fn equation_count(&self) -> usize {
        self.equations.len()
    }

    /// Equations in evaluation order.
    pub fn equations(&self) -> &[AnalysedEquation] {
        &self.equations
    }

    pub fn equation(&self, index: usize) -> Option<&AnalysedEquation> {
        self.equations.get(index)
    }

    /// Number of distinct NLA systems.
    pub fn nla_system_count(&self) -> usize {
        self.equations
            .iter()
            .filter_map(|e| e.nla_system_index)
            .max()
            .map_or(0, |i| i + 1)
    }

    /// Whether the equation at `index` computes the rate of a state: an ODE,
    /// or an NLA equation with a state among its unknowns.
    pub fn computes_rate(&self, index: usize) -> bool {
        let equation = &self.equations[index];
        equation.ty == EquationType::Ode
            || (equation.ty == EquationType::Nla
                && equation
                    .variables
                    .iter()
                    .any(|&v| self.variables[v].ty == VariableType::State))
    }

    /// Equations evaluated when computing rates: the equations that compute
    /// a rate and the non-constant equations they depend on, in evaluation
    /// order.
    pub fn rate_equations(&self) -> Vec<usize> {
        let mut needed = vec![false; self.equations.len()];
        let mut stack: Vec<usize> = (0..self.equations.len())
            .filter(|&e| self.computes_rate(e))
            .collect();
        while let Some(e) = stack.pop() {
            let equation = &self.equations[e];
            if needed[e] || equation.ty.is_constant() {
                continue;
            }
            needed[e] = true;
            stack.extend(&equation.dependencies);
            stack.extend(&equation.nla_siblings);
        }
        (0..self.equations.len()).filter(|&e| needed[e]).collect()
    }

    /// Algebraic, NLA and external equations, in evaluation order.
    pub fn variable_equations(&self) -> Vec<usize> {
        (0..self.equations.len())
            .filter(|&e| {
                matches!(
                    self.equations[e].ty,
                    EquationType::Algebraic | EquationType::Nla | EquationType::External
                )
            })
            .collect()
    }

    /// Computed constant equations, in evaluation order.
    pub fn constant_equations(&self) -> Vec<usize> {
        (0..self.equations.len())
            .filter(|&e| self.equations[e].ty.is_constant())
            .collect()
    }

    /// Positions of the variables with an initialiser, in an order where every
    /// constant used as an initialiser comes before the variables it
    /// initialises. Constants come first, then states, then the algebraic
    /// variables whose initial value seeds an NLA system.
    pub fn initialisation_order(&self) -> Vec<usize> {
        let mut pending: Vec<usize> = self
            .constants
            .iter()
            .chain(&self.states)
            .chain(&self.algebraic)
            .copied()
            .filter(|&i| self.variables[i].initialiser.is_some())
            .collect();
        let mut order = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|&i| {
                let ready = match self.variables[i].initialiser {
                    Some(Initialiser::Constant(source)) => {
                        order.contains(&source) || self.variables[source].initialiser.is_none()
                    }
                    _ => true,
                };
                if ready {
                    order.push(i);
                }
                !ready
            });
            if pending.len() == before {
                // Cyclic initialisation, kept in declaration order.
                order.append(&mut pending);
            }
        }
        order
    }

    /// Position in [`AnalysedModel::variables`] of the analysed variable that
    /// stands for `variable` or any of its equivalent variables.
    pub fn position_of(&self, variable: VariableId) -> Option<usize> {
        if variable.index() >= self.classes.len() || !self.owns(variable) {
            return None;
        }
        self.class_variables[self.classes[variable.index()]]
    }

    pub fn analysed_variable(&self, variable: VariableId) -> Option<&AnalysedVariable> {
        self.position_of(variable).map(|i| &self.variables[i])
    }

    pub fn are_equivalent_variables(&self, a: VariableId, b: VariableId) -> bool {
        if a == b {
            return true;
        }
        if !self.owns(a) || !self.owns(b) {
            return false;
        }
        match (self.classes.get(a.index()), self.classes.get(b.index())) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn owns(&self, variable: VariableId) -> bool {
        variable.model_key() == self.model_key
    }
}
