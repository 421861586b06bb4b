//! Classification of model variables and ordering of model equations.
//!
//! The analysis repeatedly looks for equations left with a single unknown
//! until nothing changes, first for explicit equations only and then allowing
//! non-linear (NLA) equations. The result is an [`AnalysedModel`] that both
//! the generator and the interpreter read.

mod analysed_model;
mod external;
mod internal;

pub use analysed_model::{
    AnalysedEquation, AnalysedModel, AnalysedVariable, EquationType, Initialiser, ModelType,
    NeededFunctions, VariableType,
};
pub use external::ExternalVariable;

use crate::ast::{Ast, BinaryOp, Ci, UnaryOp};
use crate::issue::{Issue, IssueKind, Issues};
use crate::model::{ComponentId, InitialValue, Model, VariableId};
use internal::{
    push_unique, InternalEquation, InternalEquationType, InternalVariable, InternalVariableType,
};
use std::sync::Arc;

/// Analyses models, remembering the external variables to honour and the
/// outcome of the last analysis.
#[derive(Debug, Default)]
pub struct Analyser {
    external_variables: Vec<ExternalVariable>,
    issues: Issues,
    model: Arc<AnalysedModel>,
}

impl Analyser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the previous outcome with the analysis of `model`.
    pub fn analyse_model(&mut self, model: &Model) -> Arc<AnalysedModel> {
        let (issues, analysed) = analyse(model, &self.external_variables);
        self.issues = issues;
        self.model = analysed;
        Arc::clone(&self.model)
    }

    pub fn model(&self) -> Arc<AnalysedModel> {
        Arc::clone(&self.model)
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    /// Returns `false`, leaving the registrations untouched, if the same
    /// variable is already registered.
    pub fn add_external_variable(&mut self, external: ExternalVariable) -> bool {
        if self.contains_external_variable(external.variable()) {
            return false;
        }
        self.external_variables.push(external);
        true
    }

    pub fn remove_external_variable(&mut self, variable: VariableId) -> bool {
        match self
            .external_variables
            .iter()
            .position(|e| e.variable() == variable)
        {
            Some(index) => {
                self.external_variables.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_external_variable_at(&mut self, index: usize) -> bool {
        if index < self.external_variables.len() {
            self.external_variables.remove(index);
            true
        } else {
            false
        }
    }

    pub fn remove_all_external_variables(&mut self) {
        self.external_variables.clear();
    }

    pub fn contains_external_variable(&self, variable: VariableId) -> bool {
        self.external_variables
            .iter()
            .any(|e| e.variable() == variable)
    }

    pub fn external_variable(&self, index: usize) -> Option<&ExternalVariable> {
        self.external_variables.get(index)
    }

    /// Looks a registration up by the names of its component and variable in
    /// `model`.
    pub fn external_variable_by_name(
        &self,
        model: &Model,
        component: &str,
        variable: &str,
    ) -> Option<&ExternalVariable> {
        let id = model.find_variable(component, variable)?;
        self.external_variables.iter().find(|e| e.variable() == id)
    }

    pub fn external_variables(&self) -> &[ExternalVariable] {
        &self.external_variables
    }

    pub fn external_variable_count(&self) -> usize {
        self.external_variables.len()
    }
}

/// Analyses `model`, treating `external_variables` as supplied by the caller.
pub fn analyse(
    model: &Model,
    external_variables: &[ExternalVariable],
) -> (Issues, Arc<AnalysedModel>) {
    let mut analysis = Analysis::new(model);
    let analysed = analysis.run(external_variables);
    tracing::info!(
        model = %model.name,
        model_type = %analysed.model_type(),
        states = analysed.state_count(),
        variables = analysed.non_state_count(),
        equations = analysed.equation_count(),
        issues = analysis.issues.len(),
        "analysed model"
    );
    (analysis.issues, Arc::new(analysed))
}

struct Analysis<'a> {
    model: &'a Model,
    issues: Issues,
    /// Equivalence class of every model variable.
    classes: Vec<usize>,
    /// One record per equivalence class.
    variables: Vec<InternalVariable>,
    equations: Vec<InternalEquation>,
    voi: Option<usize>,
    next_order: usize,
}

impl<'a> Analysis<'a> {
    fn new(model: &'a Model) -> Self {
        Self {
            model,
            issues: Issues::default(),
            classes: Vec::new(),
            variables: Vec::new(),
            equations: Vec::new(),
            voi: None,
            next_order: 0,
        }
    }

    fn run(&mut self, external_variables: &[ExternalVariable]) -> AnalysedModel {
        let key = self.model.key();

        self.number_classes();
        self.collect_equations();
        self.check_initialisations();
        if self.issues.error_count() > 0 {
            return AnalysedModel::empty(ModelType::Invalid, key);
        }

        self.find_voi_and_states();
        if self.issues.error_count() > 0 {
            return AnalysedModel::empty(ModelType::Invalid, key);
        }

        let external_groups = self.mark_external_variables(external_variables);
        self.classify();
        self.report_external_variables(&external_groups);
        if let Some(ty) = self.check_classification() {
            return AnalysedModel::empty(ty, key);
        }

        self.process_nla_equations();
        if self.issues.error_count() > 0 {
            return AnalysedModel::empty(ModelType::Overconstrained, key);
        }

        let has_nla = self
            .equations
            .iter()
            .any(|e| e.ty == InternalEquationType::Nla);
        let ty = match (self.voi.is_some(), has_nla) {
            (true, true) => ModelType::Dae,
            (true, false) => ModelType::Ode,
            (false, _) if self.variables.is_empty() => ModelType::Unknown,
            (false, true) => ModelType::Nla,
            (false, false) => ModelType::Algebraic,
        };
        self.build(ty)
    }

    fn describe(&self, variable: VariableId) -> (&'a str, &'a str) {
        let model: &'a Model = self.model;
        (model.variable_name(variable), model.component_name(variable))
    }

    fn declared_in(&self, variable: VariableId, component: ComponentId) -> bool {
        self.model
            .variable(variable)
            .is_some_and(|v| v.component == component)
    }

    /// Groups variables into equivalence classes, numbered in the order the
    /// components' equations and then variables mention them.
    fn number_classes(&mut self) {
        let model = self.model;
        let mut classes: Vec<Option<usize>> = vec![None; model.variable_count()];
        let mut discover = |variable: VariableId, variables: &mut Vec<InternalVariable>| {
            if !model.owns_variable(variable) || classes[variable.index()].is_some() {
                return;
            }
            let class = variables.len();
            for equivalent in model.equivalent_variables(variable) {
                classes[equivalent.index()] = Some(class);
            }
            variables.push(InternalVariable::new(variable));
        };

        let mut variables = Vec::new();
        for id in model.components_in_order() {
            let Some(component) = model.component(id) else {
                continue;
            };
            for equation in component.equations() {
                for ci in equation.referenced_variables() {
                    discover(ci.variable, &mut variables);
                }
            }
            for &variable in component.variables() {
                discover(variable, &mut variables);
            }
        }
        for variable in model.variable_ids() {
            discover(variable, &mut variables);
        }

        self.classes = classes.into_iter().flatten().collect();
        self.variables = variables;
    }

    fn collect_equations(&mut self) {
        tracing::debug!("collecting equations");
        let model = self.model;
        for id in model.components_in_order() {
            let Some(component) = model.component(id) else {
                continue;
            };

            'equations: for ast in component.equations() {
                if ast.sides().is_none() {
                    self.issues.push(Issue::error(
                        IssueKind::EquationNotEquality,
                        format!("Equation {ast} is not an equality statement (i.e. LHS = RHS)."),
                    ));
                    continue;
                }
                for ci in ast.referenced_variables() {
                    if !self.declared_in(ci.variable, id) {
                        self.issues.push(Issue::error(
                            IssueKind::UndeclaredVariable,
                            format!(
                                "Equation {ast} in component '{}' references variable '{}' which is not declared in that component.",
                                component.name, ci.name
                            ),
                        ));
                        continue 'equations;
                    }
                }

                let mut equation = InternalEquation::new(Some(ast.clone()), id);
                let classes = &self.classes;
                ast.walk(&mut |node| match node {
                    Ast::Ci(ci) => equation.add_variable(classes[ci.variable.index()]),
                    Ast::Diff { variable, .. } => {
                        equation.add_ode_variable(classes[variable.variable.index()])
                    }
                    _ => {}
                });
                self.equations.push(equation);
            }

            for &variable in component.variables() {
                let has_initial_value = self
                    .model
                    .variable(variable)
                    .is_some_and(|v| v.initial_value.is_some());
                if !has_initial_value {
                    continue;
                }
                let class = self.classes[variable.index()];
                match self.variables[class].initialising_variable {
                    Some(other) if other != variable => {
                        let (other_name, other_component) = self.describe(other);
                        let (name, component_name) = self.describe(variable);
                        let description = format!(
                            "Variable '{other_name}' in component '{other_component}' and variable '{name}' in component '{component_name}' are equivalent and cannot therefore both be initialised."
                        );
                        self.issues.push(
                            Issue::error(IssueKind::VariableInitialisedMoreThanOnce, description)
                                .with_variable(variable),
                        );
                    }
                    _ => self.variables[class].initialise_with(variable),
                }
            }
        }
    }

    /// Initial values naming another variable must name an initialised one.
    fn check_initialisations(&mut self) {
        for class in 0..self.variables.len() {
            let Some(initialising) = self.variables[class].initialising_variable else {
                continue;
            };
            let Some(variable) = self.model.variable(initialising) else {
                continue;
            };
            let Some(InitialValue::Variable(other)) = &variable.initial_value else {
                continue;
            };
            let (name, component) = self.describe(initialising);
            match self.model.variable_in_component(variable.component, other) {
                None => {
                    let description = format!(
                        "Variable '{name}' in component '{component}' is initialised using variable '{other}', which is not declared in that component."
                    );
                    self.issues.push(
                        Issue::error(IssueKind::UndeclaredVariable, description)
                            .with_variable(initialising),
                    );
                }
                Some(source)
                    if self.variables[self.classes[source.index()]].ty
                        != InternalVariableType::Initialised =>
                {
                    let description = format!(
                        "Variable '{name}' in component '{component}' is initialised using variable '{other}', which is not a constant."
                    );
                    self.issues.push(
                        Issue::error(IssueKind::NonConstantInitialisation, description)
                            .with_variable(initialising),
                    );
                }
                Some(_) => {}
            }
        }
    }

    fn first_occurrence(&self, class: usize) -> VariableId {
        self.model
            .components_in_order()
            .into_iter()
            .filter_map(|id| self.model.component(id))
            .flat_map(|c| c.variables().iter().copied())
            .find(|v| self.classes[v.index()] == class)
            .unwrap_or(self.variables[class].variable)
    }

    fn find_voi_and_states(&mut self) {
        tracing::debug!("looking for the variable of integration");
        let mut derivatives: Vec<(Ci, Ci, u32)> = Vec::new();
        for equation in &self.equations {
            if let Some(ast) = &equation.ast {
                ast.walk(&mut |node| {
                    if let Ast::Diff {
                        variable,
                        voi,
                        order,
                    } = node
                    {
                        derivatives.push((variable.clone(), voi.clone(), *order));
                    }
                });
            }
        }

        for (variable, voi, order) in derivatives {
            let voi_class = self.classes[voi.variable.index()];
            self.variables[voi_class].make_voi();
            match self.voi {
                None => {
                    self.voi = Some(voi_class);
                    let first = self.first_occurrence(voi_class);
                    self.variables[voi_class].variable = first;
                    for equivalent in self.model.equivalent_variables(first) {
                        let initialised = self
                            .model
                            .variable(equivalent)
                            .is_some_and(|v| v.initial_value.is_some());
                        if initialised {
                            let (name, component) = self.describe(equivalent);
                            let description = format!(
                                "Variable '{name}' in component '{component}' cannot be both a variable of integration and initialised."
                            );
                            self.issues.push(
                                Issue::error(IssueKind::VoiInitialised, description)
                                    .with_variable(equivalent),
                            );
                        }
                    }
                }
                Some(current) if current != voi_class => {
                    let (current_name, current_component) =
                        self.describe(self.variables[current].variable);
                    let (name, component) = self.describe(voi.variable);
                    let description = format!(
                        "Variable '{current_name}' in component '{current_component}' and variable '{name}' in component '{component}' cannot both be the variable of integration."
                    );
                    self.issues.push(
                        Issue::error(IssueKind::VoiSeveral, description).with_variable(voi.variable),
                    );
                }
                Some(_) => {}
            }

            if order != 1 {
                let (name, component) = self.describe(variable.variable);
                let description = format!(
                    "The differential equation for variable '{name}' in component '{component}' must be of the first order."
                );
                self.issues.push(
                    Issue::error(IssueKind::OdeNotFirstOrder, description)
                        .with_variable(variable.variable),
                );
            }

            self.variables[self.classes[variable.variable.index()]].make_state();
        }
    }

    /// Flags the classes of `external_variables` as external and returns the
    /// registrations grouped by class, for [`Self::report_external_variables`].
    fn mark_external_variables<'e>(
        &mut self,
        external_variables: &'e [ExternalVariable],
    ) -> Vec<(usize, Vec<&'e ExternalVariable>)> {
        let mut groups: Vec<(usize, Vec<&ExternalVariable>)> = Vec::new();
        for external in external_variables {
            if !self.model.owns_variable(external.variable()) {
                let description = format!(
                    "Variable '{}' in component '{}' is marked as an external variable, but it belongs to a different model and will therefore be ignored.",
                    external.name(),
                    external.component()
                );
                self.issues.push(Issue::message(
                    IssueKind::ExternalVariableDifferentModel,
                    description,
                ));
                continue;
            }
            let class = self.classes[external.variable().index()];
            match groups.iter_mut().find(|(c, _)| *c == class) {
                Some((_, members)) => members.push(external),
                None => groups.push((class, vec![external])),
            }
        }

        for (class, members) in &groups {
            let class = *class;
            if self.voi == Some(class) {
                continue;
            }

            let mut dependencies = Vec::new();
            for external in members {
                for &dependency in external.dependencies() {
                    if self.model.owns_variable(dependency) {
                        let dependency_class = self.classes[dependency.index()];
                        if dependency_class != class {
                            push_unique(&mut dependencies, dependency_class);
                        }
                    }
                }
            }
            let internal = &mut self.variables[class];
            internal.is_external = true;
            internal.external_dependencies = dependencies;
        }
        groups
    }

    /// Reports registrations that cannot be used as they are, naming the
    /// primary variable the classification settled on.
    fn report_external_variables(&mut self, groups: &[(usize, Vec<&ExternalVariable>)]) {
        for (class, members) in groups {
            let primary = self.variables[*class].variable;
            let is_voi = self.voi == Some(*class);
            let has_primary = members.iter().any(|e| e.variable() == primary);
            if !is_voi && members.len() == 1 && has_primary {
                continue;
            }
            let description =
                self.external_variable_description(primary, members, is_voi, has_primary);
            let kind = if is_voi {
                IssueKind::ExternalVariableVoi
            } else {
                IssueKind::ExternalVariableUsePrimaryVariable
            };
            self.issues
                .push(Issue::message(kind, description).with_variable(primary));
        }
    }

    fn external_variable_description(
        &self,
        primary: VariableId,
        members: &[&ExternalVariable],
        is_voi: bool,
        has_primary: bool,
    ) -> String {
        let count = members.len();
        let mut res = String::from(if count == 2 { "Both " } else { "" });
        for (i, external) in members.iter().enumerate() {
            if i != 0 {
                res.push_str(if i != count - 1 { ", " } else { " and " });
            }
            let variable = if i == 0 && count != 2 { "Variable" } else { "variable" };
            res.push_str(&format!(
                "{variable} '{}' in component '{}'",
                external.name(),
                external.component()
            ));
        }

        let (primary_name, primary_component) = self.describe(primary);
        if is_voi {
            res.push_str(if count == 1 {
                " is marked as an external variable, but it is"
            } else {
                " are marked as external variables, but they are"
            });
            if count == 1 && has_primary {
                res.push_str(" the");
            } else {
                res.push_str(&format!(
                    " equivalent to variable '{primary_name}' in component '{primary_component}', the primary"
                ));
            }
            res.push_str(" variable of integration which cannot be used as an external variable.");
        } else {
            if count == 1 {
                res.push_str(" is marked as an external variable, but it is not a primary variable.");
            } else {
                res.push_str(" are marked as external variables, but they are");
                if count > 2 {
                    res.push_str(" all");
                }
                res.push_str(" equivalent.");
            }
            res.push_str(&format!(
                " Variable '{primary_name}' in component '{primary_component}' is"
            ));
            res.push_str(if has_primary {
                " the"
            } else if count == 1 {
                " its corresponding"
            } else {
                " their corresponding"
            });
            res.push_str(" primary variable and will therefore be the one used as an external variable.");
        }
        res
    }

    /// Resolves the unknowns of equations until no equation makes progress.
    /// External variables that are still unknown afterwards are then treated
    /// as initialised and the process is repeated.
    fn classify(&mut self) {
        tracing::debug!(equations = self.equations.len(), "classifying variables");
        let has_externals = self.variables.iter().any(|v| v.is_external);
        let mut pass = 1;
        let mut check_nla = false;
        loop {
            let mut progress = false;
            for index in 0..self.equations.len() {
                if self.equations[index].ty == InternalEquationType::Unknown
                    && self.check_equation(index, check_nla)
                {
                    progress = true;
                }
            }
            if progress {
                continue;
            }
            match pass {
                1 | 3 => {
                    pass += 1;
                    check_nla = true;
                }
                2 if has_externals => {
                    pass = 3;
                    check_nla = false;
                    for variable in &mut self.variables {
                        if variable.is_external && variable.ty == InternalVariableType::Unknown {
                            variable.ty = InternalVariableType::Initialised;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Tries to resolve one equation. Returns whether it did.
    fn check_equation(&mut self, index: usize, check_nla: bool) -> bool {
        let Self {
            model,
            classes,
            variables,
            equations,
            next_order,
            ..
        } = self;
        let equation = &mut equations[index];

        let mut known_rates = Vec::new();
        equation.ode_variables.retain(|&v| {
            let known = variables[v].order.is_some();
            if known {
                known_rates.push(v);
            }
            !known
        });
        for &v in &known_rates {
            push_unique(&mut equation.rate_dependencies, v);
        }

        let has_known = equation.variables.iter().any(|&v| variables[v].is_known());
        let has_non_constant = equation
            .variables
            .iter()
            .any(|&v| variables[v].is_non_constant());
        equation.computed_true_constant &= !has_known && equation.rate_dependencies.is_empty();
        equation.computed_variable_based_constant &=
            !has_non_constant && equation.rate_dependencies.is_empty();

        let mut known = Vec::new();
        equation.variables.retain(|&v| {
            let is_known = variables[v].is_known();
            if is_known {
                known.push(v);
            }
            !is_known
        });
        for v in known {
            push_unique(&mut equation.dependencies, v);
        }

        let left = equation.variables.len() + equation.ode_variables.len();
        let mut initialised = Vec::new();
        if check_nla && left == 0 {
            for &v in &equation.all_variables {
                if matches!(
                    variables[v].ty,
                    InternalVariableType::Initialised | InternalVariableType::InitialisedAlgebraic
                ) {
                    variables[v].ty = InternalVariableType::InitialisedAlgebraic;
                    initialised.push(v);
                }
            }
            if initialised.is_empty() {
                for &v in &equation.all_variables {
                    variables[v].ty = InternalVariableType::Overconstrained;
                }
                return false;
            }
        }

        let unknown_left = if left == 1 {
            equation
                .variables
                .first()
                .map(|&v| (v, false))
                .or_else(|| equation.ode_variables.first().map(|&v| (v, true)))
        } else {
            None
        };
        let isolated =
            unknown_left.is_some_and(|(v, rate)| equation.isolates(v, rate, classes));
        let resolvable = unknown_left.is_some() && (check_nla || isolated);
        if !resolvable && initialised.is_empty() {
            return false;
        }

        let resolved = match unknown_left {
            Some((v, _)) => vec![v],
            None => initialised,
        };
        for &v in &resolved {
            let local = model.component(equation.component).and_then(|c| {
                c.variables()
                    .iter()
                    .copied()
                    .find(|w| classes[w.index()] == v)
            });
            let variable = &mut variables[v];
            if let Some(local) = local {
                variable.variable = local;
            }
            match variable.ty {
                InternalVariableType::Unknown => {
                    variable.ty = if equation.computed_true_constant {
                        InternalVariableType::ComputedTrueConstant
                    } else if equation.computed_variable_based_constant {
                        InternalVariableType::ComputedVariableBasedConstant
                    } else {
                        InternalVariableType::Algebraic
                    };
                }
                InternalVariableType::State | InternalVariableType::InitialisedAlgebraic => {}
                _ => return false,
            }
            if variable.order.is_none() {
                variable.order = Some(*next_order);
                *next_order += 1;
            }
            push_unique(&mut equation.unknown_variables, v);
        }

        equation.ty = match unknown_left {
            Some((v, _)) if isolated => match variables[v].ty {
                InternalVariableType::State => InternalEquationType::Ode,
                InternalVariableType::ComputedTrueConstant => InternalEquationType::TrueConstant,
                InternalVariableType::ComputedVariableBasedConstant => {
                    InternalEquationType::VariableBasedConstant
                }
                _ => InternalEquationType::Algebraic,
            },
            _ => InternalEquationType::Nla,
        };

        let unknowns = equation.unknown_variables.clone();
        equation.dependencies.retain(|d| !unknowns.contains(d));
        true
    }

    /// Reports variables the classification could not settle. Returns the
    /// model type to give up with, if any.
    fn check_classification(&mut self) -> Option<ModelType> {
        let mut underconstrained = false;
        let mut overconstrained = false;
        for class in 0..self.variables.len() {
            let variable = self.variables[class].variable;
            let (name, component) = self.describe(variable);
            let issue = match self.variables[class].ty {
                InternalVariableType::Unknown => {
                    underconstrained = true;
                    Issue::error(
                        IssueKind::VariableUnused,
                        format!("The type of variable '{name}' in component '{component}' is unknown."),
                    )
                }
                InternalVariableType::ShouldBeState => {
                    underconstrained = true;
                    Issue::error(
                        IssueKind::StateNotInitialised,
                        format!(
                            "Variable '{name}' in component '{component}' is used in an ODE, but it is not initialised."
                        ),
                    )
                }
                InternalVariableType::Overconstrained => {
                    overconstrained = true;
                    Issue::error(
                        IssueKind::VariableComputedMoreThanOnce,
                        format!("Variable '{name}' in component '{component}' is computed more than once."),
                    )
                }
                InternalVariableType::Initialised => {
                    let order = self.next_order;
                    self.next_order += 1;
                    self.variables[class].make_constant(order);
                    continue;
                }
                _ => continue,
            };
            self.issues.push(issue.with_variable(variable));
        }

        match (underconstrained, overconstrained) {
            (true, true) => Some(ModelType::UnsuitablyConstrained),
            (true, false) => Some(ModelType::Underconstrained),
            (false, true) => Some(ModelType::Overconstrained),
            (false, false) => None,
        }
    }

    fn process_nla_equations(&mut self) {
        tracing::debug!("processing NLA equations");

        // External variables are never solved for.
        let mut extra = Vec::new();
        for equation in &mut self.equations {
            if equation.ty != InternalEquationType::Nla {
                continue;
            }
            let variables = &self.variables;
            let (externals, unknowns): (Vec<usize>, Vec<usize>) = equation
                .unknown_variables
                .iter()
                .copied()
                .partition(|&v| variables[v].is_external);
            equation.unknown_variables = unknowns;
            for v in externals {
                extra.push(InternalEquation::external(v, equation.component));
            }
        }
        self.equations.extend(extra);

        for class in 0..self.variables.len() {
            let variable = &self.variables[class];
            if variable.is_external && variable.ty == InternalVariableType::Constant {
                if let Some(v) = self.model.variable(variable.variable) {
                    self.equations
                        .push(InternalEquation::external(class, v.component));
                }
            }
        }

        self.equations.retain(|e| !e.unknown_variables.is_empty());

        self.group_nla_systems();

        // A variable-based constant must only depend on constants.
        loop {
            let mut changed = false;
            for equation in &mut self.equations {
                if equation.ty != InternalEquationType::VariableBasedConstant {
                    continue;
                }
                let variables = &self.variables;
                let non_constant = !equation.rate_dependencies.is_empty()
                    || equation
                        .dependencies
                        .iter()
                        .any(|&d| !variables[d].is_constant_like());
                if non_constant {
                    equation.ty = InternalEquationType::Algebraic;
                    for &v in &equation.unknown_variables {
                        self.variables[v].ty = InternalVariableType::Algebraic;
                    }
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let system_count = self
            .equations
            .iter()
            .filter_map(|e| e.nla_system_index)
            .max()
            .map_or(0, |i| i + 1);
        for system in 0..system_count {
            let members: Vec<usize> = (0..self.equations.len())
                .filter(|&e| self.equations[e].nla_system_index == Some(system))
                .collect();
            let mut unknowns = Vec::new();
            for &e in &members {
                for &v in &self.equations[e].unknown_variables {
                    push_unique(&mut unknowns, v);
                }
            }
            if members.len() <= unknowns.len() {
                continue;
            }
            for v in unknowns {
                self.variables[v].ty = InternalVariableType::Overconstrained;
                let variable = self.variables[v].variable;
                let (name, component) = self.describe(variable);
                let description =
                    format!("Variable '{name}' in component '{component}' is computed more than once.");
                self.issues.push(
                    Issue::error(IssueKind::VariableComputedMoreThanOnce, description)
                        .with_variable(variable),
                );
            }
        }
    }

    /// NLA equations sharing an unknown belong to the same system.
    fn group_nla_systems(&mut self) {
        let count = self.equations.len();
        let mut parent: Vec<usize> = (0..count).collect();
        fn root(parent: &mut [usize], mut e: usize) -> usize {
            while parent[e] != e {
                parent[e] = parent[parent[e]];
                e = parent[e];
            }
            e
        }

        let mut owner: Vec<Option<usize>> = vec![None; self.variables.len()];
        for e in 0..count {
            if self.equations[e].ty != InternalEquationType::Nla {
                continue;
            }
            for &v in &self.equations[e].unknown_variables {
                match owner[v] {
                    Some(other) => {
                        let a = root(&mut parent, other);
                        let b = root(&mut parent, e);
                        parent[a.max(b)] = a.min(b);
                    }
                    None => owner[v] = Some(e),
                }
            }
        }

        let mut system_of_root: Vec<Option<usize>> = vec![None; count];
        let mut next = 0;
        for e in 0..count {
            if self.equations[e].ty != InternalEquationType::Nla {
                continue;
            }
            let r = root(&mut parent, e);
            let system = *system_of_root[r].get_or_insert_with(|| {
                next += 1;
                next - 1
            });
            self.equations[e].nla_system_index = Some(system);
        }
    }

    fn build(&self, ty: ModelType) -> AnalysedModel {
        tracing::debug!(model_type = %ty, "building analysed model");
        let mut res = AnalysedModel::empty(ty, self.model.key());
        res.classes = self.classes.clone();
        res.class_variables = vec![None; self.variables.len()];

        for (class, internal) in self.variables.iter().enumerate() {
            let variable_type = match (internal.ty, internal.is_external) {
                (InternalVariableType::VariableOfIntegration, _) => VariableType::VariableOfIntegration,
                (_, true) => VariableType::External,
                (InternalVariableType::State, _) => VariableType::State,
                (InternalVariableType::Constant, _) => VariableType::Constant,
                (
                    InternalVariableType::ComputedTrueConstant
                    | InternalVariableType::ComputedVariableBasedConstant,
                    _,
                ) => VariableType::ComputedConstant,
                (
                    InternalVariableType::InitialisedAlgebraic | InternalVariableType::Algebraic,
                    _,
                ) => VariableType::Algebraic,
                _ => continue,
            };
            let Some(variable) = self.model.variable(internal.variable) else {
                continue;
            };
            let position = res.variables.len();
            res.class_variables[class] = Some(position);
            if variable_type == VariableType::VariableOfIntegration {
                res.voi = Some(position);
            }
            let initialising_variable = match variable_type {
                VariableType::State | VariableType::Constant | VariableType::Algebraic => {
                    internal.initialising_variable
                }
                _ => None,
            };
            res.variables.push(AnalysedVariable {
                ty: variable_type,
                index: None,
                variable: internal.variable,
                name: variable.name.clone(),
                units: variable.units.clone(),
                component: self.model.component_name(internal.variable).to_string(),
                initialising_variable,
                initialiser: None,
                equations: Vec::new(),
            });
        }

        for position in 0..res.variables.len() {
            let Some(initialising) = res.variables[position].initialising_variable else {
                continue;
            };
            let Some(variable) = self.model.variable(initialising) else {
                continue;
            };
            let initialiser = match &variable.initial_value {
                Some(InitialValue::Number(value)) => Some(Initialiser::Value(*value)),
                Some(InitialValue::Variable(name)) => self
                    .model
                    .variable_in_component(variable.component, name)
                    .and_then(|source| res.class_variables[self.classes[source.index()]])
                    .map(Initialiser::Constant),
                None => None,
            };
            res.variables[position].initialiser = initialiser;
        }

        let mut sources = Vec::new();
        for (e, internal) in self.equations.iter().enumerate() {
            let all_external = internal
                .unknown_variables
                .iter()
                .all(|&v| self.variables[v].is_external);
            let equation_type = if all_external {
                EquationType::External
            } else {
                match internal.ty {
                    InternalEquationType::TrueConstant => EquationType::TrueConstant,
                    InternalEquationType::VariableBasedConstant => EquationType::VariableBasedConstant,
                    InternalEquationType::Ode => EquationType::Ode,
                    InternalEquationType::Nla => EquationType::Nla,
                    InternalEquationType::Algebraic => EquationType::Algebraic,
                    InternalEquationType::External => EquationType::External,
                    InternalEquationType::Unknown => continue,
                }
            };
            let ast = match equation_type {
                EquationType::External => None,
                EquationType::Nla => internal
                    .ast
                    .as_ref()
                    .and_then(Ast::sides)
                    .map(|(lhs, rhs)| Ast::minus(lhs.clone(), rhs.clone())),
                _ => internal.ast.as_ref().map(|ast| self.orient(internal, ast)),
            };
            let variables = internal
                .unknown_variables
                .iter()
                .filter_map(|&v| res.class_variables[v])
                .collect();
            res.equations.push(AnalysedEquation {
                ty: equation_type,
                ast,
                component: self
                    .model
                    .component(internal.component)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                variables,
                dependencies: Vec::new(),
                nla_system_index: if equation_type == EquationType::Nla {
                    internal.nla_system_index
                } else {
                    None
                },
                nla_siblings: Vec::new(),
                external_dependencies: Vec::new(),
                is_state_rate_based: false,
            });
            sources.push(e);
        }

        for (position, equation) in res.equations.iter().enumerate() {
            for &v in &equation.variables {
                res.variables[v].equations.push(position);
            }
        }

        for position in 0..res.equations.len() {
            let internal = &self.equations[sources[position]];
            let mut dependencies = Vec::new();
            if res.equations[position].ty == EquationType::External {
                let mut inputs = Vec::new();
                for &v in &internal.unknown_variables {
                    for &class in &self.variables[v].external_dependencies {
                        if let Some(input) = res.class_variables[class] {
                            push_unique(&mut inputs, input);
                        }
                        for &d in computed_by(&res, class, false) {
                            push_unique(&mut dependencies, d);
                        }
                    }
                }
                res.equations[position].external_dependencies = inputs;
            } else {
                for &class in &internal.dependencies {
                    for &d in computed_by(&res, class, false) {
                        push_unique(&mut dependencies, d);
                    }
                }
                for &class in &internal.rate_dependencies {
                    for &d in computed_by(&res, class, true) {
                        push_unique(&mut dependencies, d);
                    }
                }
            }
            dependencies.retain(|&d| d != position);
            res.equations[position].dependencies = dependencies;
        }

        order_equations(&mut res);
        assign_indices(&mut res);
        mark_state_rate_based(&mut res);
        res.needs = needed_functions(&res.equations);
        res.has_external_variables = !res.externals.is_empty();
        res
    }

    /// Puts the computed variable of an explicit equation on the left.
    fn orient(&self, equation: &InternalEquation, ast: &Ast) -> Ast {
        let [v] = equation.unknown_variables[..] else {
            return ast.clone();
        };
        let rate = self.variables[v].ty == InternalVariableType::State;
        match ast.sides() {
            Some((lhs, rhs)) if equation.computes_on_rhs(v, rate, &self.classes) => {
                Ast::equality(rhs.clone(), lhs.clone())
            }
            _ => ast.clone(),
        }
    }
}

/// Equations that must run before the value (or the rate, for states) of
/// `class` is available.
fn computed_by(model: &AnalysedModel, class: usize, rate: bool) -> &[usize] {
    let Some(position) = model.class_variables[class] else {
        return &[];
    };
    let variable = &model.variables[position];
    match variable.ty {
        VariableType::VariableOfIntegration => &[],
        VariableType::State if !rate => &[],
        _ => &variable.equations,
    }
}

/// Sorts equations so that every equation follows its dependencies. Constant
/// equations come first, NLA systems are kept together and ties are broken
/// by the original position.
fn order_equations(model: &mut AnalysedModel) {
    let count = model.equations.len();

    let mut node_of = vec![0; count];
    let mut nodes: Vec<Vec<usize>> = Vec::new();
    let mut system_nodes: Vec<(usize, usize)> = Vec::new();
    for (e, equation) in model.equations.iter().enumerate() {
        let existing = equation.nla_system_index.and_then(|system| {
            system_nodes
                .iter()
                .find(|(s, _)| *s == system)
                .map(|&(_, node)| node)
        });
        match existing {
            Some(node) => {
                nodes[node].push(e);
                node_of[e] = node;
            }
            None => {
                if let Some(system) = equation.nla_system_index {
                    system_nodes.push((system, nodes.len()));
                }
                node_of[e] = nodes.len();
                nodes.push(vec![e]);
            }
        }
    }

    let rank: Vec<usize> = nodes
        .iter()
        .map(|members| {
            let constant = members.iter().all(|&e| model.equations[e].ty.is_constant());
            usize::from(!constant)
        })
        .collect();
    let requirements: Vec<Vec<usize>> = nodes
        .iter()
        .enumerate()
        .map(|(node, members)| {
            let mut res = Vec::new();
            for &e in members {
                for &d in &model.equations[e].dependencies {
                    if node_of[d] != node {
                        push_unique(&mut res, node_of[d]);
                    }
                }
            }
            res
        })
        .collect();

    let mut done = vec![false; nodes.len()];
    let mut sequence = Vec::with_capacity(count);
    while sequence.len() < count {
        let next = (0..nodes.len())
            .filter(|&n| !done[n] && requirements[n].iter().all(|&r| done[r]))
            .min_by_key(|&n| (rank[n], nodes[n][0]));
        match next {
            Some(node) => {
                done[node] = true;
                sequence.extend(nodes[node].iter().copied());
            }
            // Classification only lets an equation depend on equations
            // classified before it, so analysed models never get here. A
            // dependency graph built any other way still ends up with every
            // equation placed.
            None => {
                tracing::warn!("cyclic equation dependencies, keeping declaration order");
                for node in 0..nodes.len() {
                    if !done[node] {
                        done[node] = true;
                        sequence.extend(nodes[node].iter().copied());
                    }
                }
            }
        }
    }

    let mut new_position = vec![0; count];
    for (position, &e) in sequence.iter().enumerate() {
        new_position[e] = position;
    }

    let mut keyed: Vec<(usize, AnalysedEquation)> = std::mem::take(&mut model.equations)
        .into_iter()
        .enumerate()
        .map(|(e, equation)| (new_position[e], equation))
        .collect();
    keyed.sort_by_key(|(position, _)| *position);
    model.equations = keyed.into_iter().map(|(_, equation)| equation).collect();

    for equation in &mut model.equations {
        for d in &mut equation.dependencies {
            *d = new_position[*d];
        }
    }
    for variable in &mut model.variables {
        for e in &mut variable.equations {
            *e = new_position[*e];
        }
    }

    // System indices and siblings follow the final order.
    let mut systems: Vec<usize> = Vec::new();
    for equation in &mut model.equations {
        if let Some(system) = equation.nla_system_index {
            let index = match systems.iter().position(|&s| s == system) {
                Some(index) => index,
                None => {
                    systems.push(system);
                    systems.len() - 1
                }
            };
            equation.nla_system_index = Some(index);
        }
    }
    for e in 0..count {
        let Some(system) = model.equations[e].nla_system_index else {
            continue;
        };
        let siblings = (0..count)
            .filter(|&other| other != e && model.equations[other].nla_system_index == Some(system))
            .collect();
        model.equations[e].nla_siblings = siblings;
    }
}

/// Numbers the variables of each type in equation order, then the constants
/// in discovery order.
fn assign_indices(model: &mut AnalysedModel) {
    let mut counts = [0usize; 6];
    let bucket_of = |ty: VariableType| match ty {
        VariableType::VariableOfIntegration => None,
        VariableType::State => Some(0),
        VariableType::Constant => Some(1),
        VariableType::ComputedConstant => Some(2),
        VariableType::Algebraic => Some(3),
        VariableType::External => Some(4),
    };

    let by_equation = model
        .equations
        .iter()
        .flat_map(|e| e.variables.iter().copied());
    let mut order: Vec<usize> = Vec::new();
    for v in by_equation.chain(0..model.variables.len()) {
        push_unique(&mut order, v);
    }

    for v in order {
        let variable = &mut model.variables[v];
        if let Some(slot) = bucket_of(variable.ty) {
            variable.index = Some(counts[slot]);
            counts[slot] += 1;
            let bucket = match slot {
                0 => &mut model.states,
                1 => &mut model.constants,
                2 => &mut model.computed_constants,
                3 => &mut model.algebraic,
                _ => &mut model.externals,
            };
            bucket.push(v);
        }
    }
}

fn mark_state_rate_based(model: &mut AnalysedModel) {
    fn visit(model: &AnalysedModel, e: usize, memo: &mut [Option<bool>]) -> bool {
        if let Some(known) = memo[e] {
            return known;
        }
        memo[e] = Some(false);
        let res = model.equations[e]
            .dependencies
            .iter()
            .any(|&d| model.computes_rate(d) || visit(model, d, memo));
        memo[e] = Some(res);
        res
    }

    let mut memo = vec![None; model.equations.len()];
    let flags: Vec<bool> = (0..model.equations.len())
        .map(|e| visit(model, e, &mut memo))
        .collect();
    for (equation, flag) in model.equations.iter_mut().zip(flags) {
        equation.is_state_rate_based = flag;
    }
}

fn needed_functions(equations: &[AnalysedEquation]) -> NeededFunctions {
    let mut needs = NeededFunctions::default();
    for ast in equations.iter().filter_map(|e| e.ast.as_ref()) {
        ast.walk(&mut |node| match node {
            Ast::Binary { op, .. } => match op {
                BinaryOp::Eq => needs.eq = true,
                BinaryOp::Neq => needs.neq = true,
                BinaryOp::Lt => needs.lt = true,
                BinaryOp::Leq => needs.leq = true,
                BinaryOp::Gt => needs.gt = true,
                BinaryOp::Geq => needs.geq = true,
                BinaryOp::And => needs.and = true,
                BinaryOp::Or => needs.or = true,
                BinaryOp::Xor => needs.xor = true,
                BinaryOp::Min => needs.min = true,
                BinaryOp::Max => needs.max = true,
                _ => {}
            },
            Ast::Unary { op, .. } => match op {
                UnaryOp::Not => needs.not = true,
                UnaryOp::Sec => needs.sec = true,
                UnaryOp::Csc => needs.csc = true,
                UnaryOp::Cot => needs.cot = true,
                UnaryOp::Sech => needs.sech = true,
                UnaryOp::Csch => needs.csch = true,
                UnaryOp::Coth => needs.coth = true,
                UnaryOp::Asec => needs.asec = true,
                UnaryOp::Acsc => needs.acsc = true,
                UnaryOp::Acot => needs.acot = true,
                UnaryOp::Asech => needs.asech = true,
                UnaryOp::Acsch => needs.acsch = true,
                UnaryOp::Acoth => needs.acoth = true,
                _ => {}
            },
            _ => {}
        });
    }
    needs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Level;

    struct Fixture {
        model: Model,
        c: ComponentId,
    }

    impl Fixture {
        fn new() -> Self {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
            let mut model = Model::new("fixture");
            let c = model.add_component("main").unwrap();
            Self { model, c }
        }

        fn var(&mut self, name: &str, initial: Option<f64>) -> VariableId {
            let v = self.model.add_variable(self.c, name, "dimensionless").unwrap();
            if let Some(value) = initial {
                self.model
                    .set_initial_value(v, InitialValue::Number(value))
                    .unwrap();
            }
            v
        }

        fn eq(&mut self, lhs: Ast, rhs: Ast) {
            self.model.add_equation(self.c, Ast::equality(lhs, rhs)).unwrap();
        }

        fn rate(&self, x: VariableId, t: VariableId) -> Ast {
            Ast::diff(self.model.ci_ref(x), self.model.ci_ref(t))
        }
    }

    fn descriptions(issues: &Issues) -> Vec<String> {
        issues.iter().map(|i| i.description.clone()).collect()
    }

    #[test]
    fn single_ode() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(0.0));
        let rate = f.rate(x, t);
        f.eq(rate, Ast::cn(1.0));

        let (issues, model) = analyse(&f.model, &[]);
        assert!(issues.is_empty());
        assert!(model.is_valid());
        assert_eq!(model.model_type(), ModelType::Ode);
        assert_eq!(model.voi().map(|v| v.name.as_str()), Some("time"));
        assert_eq!(model.state_count(), 1);
        assert_eq!(model.equation_count(), 1);
        let equation = &model.equations()[0];
        assert_eq!(equation.ty, EquationType::Ode);
        assert!(equation.dependencies.is_empty());
        assert_eq!(model.analysed_variable(x).and_then(|v| v.index), Some(0));
        assert_eq!(
            model.analysed_variable(x).and_then(|v| v.initialiser),
            Some(Initialiser::Value(0.0))
        );
    }

    #[test]
    fn initialised_voi_is_reported_once() {
        let mut f = Fixture::new();
        let t = f.var("time", Some(0.0));
        let x = f.var("x", Some(0.0));
        let y = f.var("y", Some(0.0));
        let rate_x = f.rate(x, t);
        let rate_y = f.rate(y, t);
        f.eq(rate_x, Ast::cn(1.0));
        f.eq(rate_y, Ast::cn(2.0));

        let (issues, model) = analyse(&f.model, &[]);
        assert_eq!(
            descriptions(&issues),
            vec!["Variable 'time' in component 'main' cannot be both a variable of integration and initialised."]
        );
        assert_eq!(model.model_type(), ModelType::Invalid);
        assert!(!model.is_valid());
    }

    #[test]
    fn only_one_variable_of_integration() {
        let mut f = Fixture::new();
        let t = f.var("t", None);
        let s = f.var("s", None);
        let x = f.var("x", Some(0.0));
        let y = f.var("y", Some(0.0));
        let rate_x = f.rate(x, t);
        let rate_y = f.rate(y, s);
        f.eq(rate_x, Ast::cn(1.0));
        f.eq(rate_y, Ast::cn(2.0));

        let (issues, model) = analyse(&f.model, &[]);
        assert_eq!(
            descriptions(&issues),
            vec!["Variable 't' in component 'main' and variable 's' in component 'main' cannot both be the variable of integration."]
        );
        assert!(issues.iter().all(|i| i.level == Level::Error));
        assert_eq!(model.model_type(), ModelType::Invalid);
        assert!(!model.is_valid());
    }

    #[test]
    fn higher_order_derivatives_are_rejected() {
        let mut f = Fixture::new();
        let t = f.var("t", None);
        let x = f.var("x", Some(0.0));
        let second = Ast::Diff {
            variable: f.model.ci_ref(x),
            voi: f.model.ci_ref(t),
            order: 2,
        };
        f.eq(second, Ast::cn(1.0));

        let (issues, model) = analyse(&f.model, &[]);
        let expected = "The differential equation for variable 'x' in component 'main' must be of the first order.";
        let issue = issues.iter().find(|i| i.description == expected);
        assert!(issue.is_some(), "{:?}", descriptions(&issues));
        assert_eq!(issue.map(|i| i.level), Some(Level::Error));
        assert_eq!(model.model_type(), ModelType::Invalid);
    }

    #[test]
    fn constants_come_first_and_indices_are_contiguous() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(1.0));
        let y = f.var("y", None);
        let b = f.var("b", None);
        let a = f.var("a", Some(2.0));
        let c = f.var("c", None);

        // y = b + x, d(x)/d(t) = -c * x, b = 2 * a, c = 3
        let rhs = Ast::plus(f.model.ci(b), f.model.ci(x));
        f.eq(f.model.ci(y), rhs);
        let rate = f.rate(x, t);
        let rhs = Ast::times(Ast::neg(f.model.ci(c)), f.model.ci(x));
        f.eq(rate, rhs);
        let rhs = Ast::times(Ast::cn(2.0), f.model.ci(a));
        f.eq(f.model.ci(b), rhs);
        f.eq(f.model.ci(c), Ast::cn(3.0));

        let (issues, model) = analyse(&f.model, &[]);
        assert!(issues.is_empty(), "{:?}", descriptions(&issues));
        assert_eq!(model.model_type(), ModelType::Ode);

        let types: Vec<EquationType> = model.equations().iter().map(|e| e.ty).collect();
        assert_eq!(
            types,
            vec![
                EquationType::VariableBasedConstant,
                EquationType::TrueConstant,
                EquationType::Algebraic,
                EquationType::Ode,
            ]
        );
        assert_eq!(model.constant_count(), 1);
        assert_eq!(model.computed_constant_count(), 2);
        assert_eq!(model.algebraic_count(), 1);
        let computed: Vec<_> = model.computed_constants().map(|v| v.name.as_str()).collect();
        assert_eq!(computed, vec!["b", "c"]);
        for (i, v) in model.computed_constants().enumerate() {
            assert_eq!(v.index, Some(i));
        }
        assert_eq!(model.analysed_variable(a).map(|v| v.ty), Some(VariableType::Constant));
        assert!(!model.equations()[2].is_state_rate_based);
    }

    #[test]
    fn explicit_equation_is_oriented() {
        let mut f = Fixture::new();
        let a = f.var("a", None);
        let b = f.var("b", Some(1.0));
        let rhs = f.model.ci(a);
        f.eq(Ast::plus(f.model.ci(b), Ast::cn(1.0)), rhs);

        let (_, model) = analyse(&f.model, &[]);
        assert_eq!(model.model_type(), ModelType::Algebraic);
        let ast = model.equations()[0].ast.as_ref().map(ToString::to_string);
        assert_eq!(ast.as_deref(), Some("a = b + 1.0"));
    }

    #[test]
    fn coupled_equations_form_one_nla_system() {
        let mut f = Fixture::new();
        let x = f.var("x", Some(1.0));
        let y = f.var("y", Some(1.0));
        let lhs = Ast::plus(f.model.ci(x), f.model.ci(y));
        f.eq(lhs, Ast::cn(3.0));
        let lhs = Ast::minus(f.model.ci(x), f.model.ci(y));
        f.eq(lhs, Ast::cn(1.0));

        let (issues, model) = analyse(&f.model, &[]);
        assert!(issues.is_empty(), "{:?}", descriptions(&issues));
        assert_eq!(model.model_type(), ModelType::Nla);
        assert_eq!(model.nla_system_count(), 1);
        let equations = model.equations();
        assert!(equations.iter().all(|e| e.ty == EquationType::Nla));
        assert_eq!(equations[0].nla_siblings, vec![1]);
        assert_eq!(equations[1].nla_siblings, vec![0]);
        assert_eq!(
            equations[0].ast.as_ref().map(ToString::to_string).as_deref(),
            Some("(x + y) - 3.0")
        );
        assert_eq!(model.algebraic_count(), 2);
    }

    #[test]
    fn unused_variable_makes_the_model_underconstrained() {
        let mut f = Fixture::new();
        let a = f.var("a", None);
        let z = f.var("z", None);
        let w = f.var("w", None);
        f.eq(f.model.ci(a), Ast::cn(1.0));
        let rhs = Ast::plus(f.model.ci(z), f.model.ci(w));
        f.eq(Ast::cn(0.0), rhs);

        let (issues, model) = analyse(&f.model, &[]);
        assert_eq!(model.model_type(), ModelType::Underconstrained);
        assert_eq!(
            descriptions(&issues),
            vec![
                "The type of variable 'z' in component 'main' is unknown.",
                "The type of variable 'w' in component 'main' is unknown.",
            ]
        );
    }

    #[test]
    fn variable_computed_twice() {
        let mut f = Fixture::new();
        let a = f.var("a", None);
        f.eq(f.model.ci(a), Ast::cn(1.0));
        f.eq(f.model.ci(a), Ast::cn(2.0));

        let (issues, model) = analyse(&f.model, &[]);
        assert_eq!(model.model_type(), ModelType::Overconstrained);
        assert_eq!(
            descriptions(&issues),
            vec!["Variable 'a' in component 'main' is computed more than once."]
        );
    }

    #[test]
    fn state_without_initial_value() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", None);
        let rate = f.rate(x, t);
        f.eq(rate, Ast::cn(1.0));

        let (issues, model) = analyse(&f.model, &[]);
        assert_eq!(model.model_type(), ModelType::Underconstrained);
        assert_eq!(
            descriptions(&issues),
            vec!["Variable 'x' in component 'main' is used in an ODE, but it is not initialised."]
        );
    }

    #[test]
    fn non_equality_is_reported() {
        let mut f = Fixture::new();
        let a = f.var("a", None);
        let ast = Ast::plus(f.model.ci(a), Ast::cn(1.0));
        f.model.add_equation(f.c, ast).unwrap();

        let (issues, model) = analyse(&f.model, &[]);
        assert_eq!(model.model_type(), ModelType::Invalid);
        assert_eq!(
            descriptions(&issues),
            vec!["Equation a + 1.0 is not an equality statement (i.e. LHS = RHS)."]
        );
    }

    #[test]
    fn external_variable_gets_an_external_equation() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(1.0));
        let k = f.var("k", None);
        let rate = f.rate(x, t);
        let rhs = Ast::times(Ast::neg(f.model.ci(k)), f.model.ci(x));
        f.eq(rate, rhs);

        let mut analyser = Analyser::new();
        assert!(analyser.add_external_variable(ExternalVariable::new(&f.model, k)));
        assert!(!analyser.add_external_variable(ExternalVariable::new(&f.model, k)));
        assert_eq!(analyser.external_variable_count(), 1);
        assert!(analyser
            .external_variable_by_name(&f.model, "main", "k")
            .is_some());

        let model = analyser.analyse_model(&f.model);
        assert!(analyser.issues().is_empty());
        assert_eq!(model.model_type(), ModelType::Ode);
        assert!(model.has_external_variables());
        assert_eq!(model.analysed_variable(k).map(|v| v.ty), Some(VariableType::External));

        let types: Vec<EquationType> = model.equations().iter().map(|e| e.ty).collect();
        assert_eq!(types, vec![EquationType::External, EquationType::Ode]);
        assert_eq!(model.equations()[1].dependencies, vec![0]);
        assert!(model.equations()[0].ast.is_none());
    }

    #[test]
    fn external_messages_name_the_settled_primary_variable() {
        let mut model = Model::new("m");
        let env = model.add_component("environment").unwrap();
        let calc = model.add_component("calc").unwrap();
        let a = model.add_variable(env, "a", "dimensionless").unwrap();
        let b = model.add_variable(calc, "b", "dimensionless").unwrap();
        model.add_equivalence(a, b).unwrap();
        model
            .add_equation(
                calc,
                Ast::equality(Ast::unary(UnaryOp::Sin, model.ci(b)), Ast::cn(0.5)),
            )
            .unwrap();

        let mut analyser = Analyser::new();
        analyser.add_external_variable(ExternalVariable::new(&model, a));
        let analysed = analyser.analyse_model(&model);

        let expected = "Variable 'a' in component 'environment' is marked as an external variable, but it is not a primary variable. Variable 'b' in component 'calc' is its corresponding primary variable and will therefore be the one used as an external variable.";
        let issue = analyser.issues().iter().find(|i| i.description == expected);
        assert!(issue.is_some(), "{:?}", descriptions(analyser.issues()));
        assert_eq!(issue.and_then(|i| i.variable), Some(b));
        assert_eq!(issue.map(|i| i.level), Some(Level::Message));
        assert_eq!(analysed.analysed_variable(a).map(|v| v.ty), Some(VariableType::External));
    }

    #[test]
    fn external_voi_is_ignored_with_a_message() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", Some(1.0));
        let rate = f.rate(x, t);
        f.eq(rate, Ast::cn(1.0));

        let mut analyser = Analyser::new();
        analyser.add_external_variable(ExternalVariable::new(&f.model, t));
        let model = analyser.analyse_model(&f.model);

        assert_eq!(model.model_type(), ModelType::Ode);
        assert_eq!(analyser.issues().count(Level::Message), 1);
        assert_eq!(
            analyser.issues().get(0).map(|i| i.description.as_str()),
            Some("Variable 'time' in component 'main' is marked as an external variable, but it is the variable of integration which cannot be used as an external variable.")
        );
    }

    #[test]
    fn equivalent_variables_share_one_analysed_variable() {
        let mut model = Model::new("m");
        let env = model.add_component("environment").unwrap();
        let cell = model.add_component("cell").unwrap();
        let t_env = model.add_variable(env, "time", "second").unwrap();
        let t_cell = model.add_variable(cell, "t", "second").unwrap();
        let v = model.add_variable(cell, "V", "volt").unwrap();
        model.set_initial_value(v, InitialValue::Number(-80.0)).unwrap();
        model.add_equivalence(t_env, t_cell).unwrap();
        model
            .add_equation(
                cell,
                Ast::equality(Ast::diff(model.ci_ref(v), model.ci_ref(t_cell)), Ast::cn(1.0)),
            )
            .unwrap();

        let (issues, analysed) = analyse(&model, &[]);
        assert!(issues.is_empty());
        assert!(analysed.are_equivalent_variables(t_env, t_cell));
        assert_eq!(analysed.position_of(t_env), analysed.position_of(t_cell));
        assert_eq!(analysed.voi().map(|v| v.component.as_str()), Some("environment"));
    }

    #[test]
    fn non_constant_initialisation() {
        let mut f = Fixture::new();
        let t = f.var("time", None);
        let x = f.var("x", None);
        let k = f.var("k", None);
        f.model
            .set_initial_value(x, InitialValue::Variable("k".into()))
            .unwrap();
        let rate = f.rate(x, t);
        f.eq(rate, Ast::cn(1.0));
        let rhs = Ast::times(Ast::cn(2.0), f.model.ci(t));
        f.eq(f.model.ci(k), rhs);

        let (issues, model) = analyse(&f.model, &[]);
        assert_eq!(model.model_type(), ModelType::Invalid);
        assert_eq!(
            descriptions(&issues),
            vec!["Variable 'x' in component 'main' is initialised using variable 'k', which is not a constant."]
        );
    }

    #[test]
    fn initialising_constants_come_first() {
        let mut f = Fixture::new();
        let c = f.var("c", None);
        let k = f.var("k", Some(2.0));
        let y = f.var("y", None);
        f.model
            .set_initial_value(c, InitialValue::Variable("k".into()))
            .unwrap();
        let rhs = Ast::plus(f.model.ci(c), f.model.ci(k));
        f.eq(f.model.ci(y), rhs);

        let (issues, model) = analyse(&f.model, &[]);
        assert!(issues.is_empty(), "{:?}", descriptions(&issues));
        let k_position = model.position_of(k).unwrap();
        let c_position = model.position_of(c).unwrap();
        assert_eq!(
            model.variables()[c_position].initialiser,
            Some(Initialiser::Constant(k_position))
        );
        assert_eq!(model.initialisation_order(), vec![k_position, c_position]);
    }

    #[test]
    fn needed_functions_are_flagged() {
        let mut f = Fixture::new();
        let a = f.var("a", None);
        let b = f.var("b", Some(1.0));
        let rhs = Ast::binary(
            BinaryOp::Max,
            Ast::unary(UnaryOp::Sec, f.model.ci(b)),
            Ast::cn(0.0),
        );
        f.eq(f.model.ci(a), rhs);

        let (_, model) = analyse(&f.model, &[]);
        assert!(model.needs().max);
        assert!(model.needs().sec);
        assert!(!model.needs().min);
    }
}
