use crate::ast::Ast;
use crate::model::{ComponentId, VariableId};

/// Working classification of an equivalence class while the analysis runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InternalVariableType {
    Unknown,
    ShouldBeState,
    Initialised,
    VariableOfIntegration,
    State,
    Constant,
    ComputedTrueConstant,
    ComputedVariableBasedConstant,
    InitialisedAlgebraic,
    Algebraic,
    Overconstrained,
}

#[derive(Debug, Clone)]
pub(crate) struct InternalVariable {
    pub ty: InternalVariableType,
    /// Primary variable of the class.
    pub variable: VariableId,
    pub initialising_variable: Option<VariableId>,
    /// Set once the variable has been resolved, in resolution order.
    pub order: Option<usize>,
    pub is_external: bool,
    /// Classes the external value depends on.
    pub external_dependencies: Vec<usize>,
}

impl InternalVariable {
    pub fn new(variable: VariableId) -> Self {
        Self {
            ty: InternalVariableType::Unknown,
            variable,
            initialising_variable: None,
            order: None,
            is_external: false,
            external_dependencies: Vec::new(),
        }
    }

    pub fn initialise_with(&mut self, variable: VariableId) {
        self.variable = variable;
        self.initialising_variable = Some(variable);
        if self.ty == InternalVariableType::Unknown {
            self.ty = InternalVariableType::Initialised;
        }
    }

    pub fn make_voi(&mut self) {
        self.ty = InternalVariableType::VariableOfIntegration;
    }

    pub fn make_state(&mut self) {
        match self.ty {
            InternalVariableType::Unknown => self.ty = InternalVariableType::ShouldBeState,
            InternalVariableType::Initialised => self.ty = InternalVariableType::State,
            _ => {}
        }
    }

    pub fn make_constant(&mut self, order: usize) {
        self.ty = InternalVariableType::Constant;
        self.order = Some(order);
    }

    pub fn is_known(&self) -> bool {
        self.ty != InternalVariableType::Unknown
    }

    /// Whether the value can change once the computed constants are known.
    pub fn is_non_constant(&self) -> bool {
        self.is_external
            || !matches!(
                self.ty,
                InternalVariableType::Unknown
                    | InternalVariableType::Initialised
                    | InternalVariableType::ComputedTrueConstant
                    | InternalVariableType::ComputedVariableBasedConstant
            )
    }

    pub fn is_constant_like(&self) -> bool {
        !self.is_external
            && matches!(
                self.ty,
                InternalVariableType::Constant
                    | InternalVariableType::ComputedTrueConstant
                    | InternalVariableType::ComputedVariableBasedConstant
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InternalEquationType {
    Unknown,
    TrueConstant,
    VariableBasedConstant,
    Ode,
    Nla,
    Algebraic,
    External,
}

/// An equation and the variables it still has to resolve. Variables are
/// referenced by equivalence class.
#[derive(Debug, Clone)]
pub(crate) struct InternalEquation {
    pub ty: InternalEquationType,
    pub ast: Option<Ast>,
    pub component: ComponentId,
    /// Plain variables not yet known.
    pub variables: Vec<usize>,
    /// Variables whose rate appears in the equation and is not yet known.
    pub ode_variables: Vec<usize>,
    pub all_variables: Vec<usize>,
    /// Variables computed by this equation.
    pub unknown_variables: Vec<usize>,
    /// Known plain variables read by the equation.
    pub dependencies: Vec<usize>,
    /// States whose rate is read by the equation.
    pub rate_dependencies: Vec<usize>,
    pub nla_system_index: Option<usize>,
    pub computed_true_constant: bool,
    pub computed_variable_based_constant: bool,
}

impl InternalEquation {
    pub fn new(ast: Option<Ast>, component: ComponentId) -> Self {
        Self {
            ty: InternalEquationType::Unknown,
            ast,
            component,
            variables: Vec::new(),
            ode_variables: Vec::new(),
            all_variables: Vec::new(),
            unknown_variables: Vec::new(),
            dependencies: Vec::new(),
            rate_dependencies: Vec::new(),
            nla_system_index: None,
            computed_true_constant: true,
            computed_variable_based_constant: true,
        }
    }

    /// Equation standing for the value of an external variable.
    pub fn external(class: usize, component: ComponentId) -> Self {
        let mut res = Self::new(None, component);
        res.ty = InternalEquationType::External;
        res.unknown_variables.push(class);
        res.all_variables.push(class);
        res
    }

    pub fn add_variable(&mut self, class: usize) {
        if !self.variables.contains(&class) {
            self.variables.push(class);
        }
        if !self.all_variables.contains(&class) {
            self.all_variables.push(class);
        }
    }

    pub fn add_ode_variable(&mut self, class: usize) {
        if !self.ode_variables.contains(&class) {
            self.ode_variables.push(class);
        }
        if !self.all_variables.contains(&class) {
            self.all_variables.push(class);
        }
    }

    /// Whether `class` (as a value, or as a rate when `rate` is set) makes up
    /// a whole side of the equation.
    pub fn isolates(&self, class: usize, rate: bool, classes: &[usize]) -> bool {
        let Some((lhs, rhs)) = self.ast.as_ref().and_then(Ast::sides) else {
            return false;
        };
        side_is(lhs, class, rate, classes) || side_is(rhs, class, rate, classes)
    }

    /// Whether the right hand side holds the variable computed by the equation.
    pub fn computes_on_rhs(&self, class: usize, rate: bool, classes: &[usize]) -> bool {
        match self.ast.as_ref().and_then(Ast::sides) {
            Some((lhs, rhs)) => !side_is(lhs, class, rate, classes) && side_is(rhs, class, rate, classes),
            None => false,
        }
    }
}

fn side_is(side: &Ast, class: usize, rate: bool, classes: &[usize]) -> bool {
    match side {
        Ast::Ci(ci) if !rate => classes[ci.variable.index()] == class,
        Ast::Diff { variable, .. } if rate => classes[variable.variable.index()] == class,
        _ => false,
    }
}

pub(crate) fn push_unique(list: &mut Vec<usize>, value: usize) {
    if !list.contains(&value) {
        list.push(value);
    }
}
