//! Rendering of analysed models into source code.
//!
//! The generator is a pure function of the analysed model it holds, its
//! [`GeneratorProfile`] and its [`VariableTracker`]: every call to
//! [`Generator::interface_code`] or [`Generator::implementation_code`]
//! rebuilds the text from scratch.

mod render;
mod tracker;

pub use tracker::VariableTracker;

use crate::analyser::{AnalysedEquation, AnalysedModel, EquationType, Initialiser, VariableType};
use crate::ast::Ast;
use crate::issue::Issues;
use crate::profile::GeneratorProfile;
use render::{ArrayNames, PlainNames, Renderer};
use std::sync::Arc;

/// Version substituted for `[GENERATOR_VERSION]`.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Default)]
pub struct Generator {
    model: Option<Arc<AnalysedModel>>,
    profile: GeneratorProfile,
    tracker: VariableTracker,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_model(&mut self, model: Arc<AnalysedModel>) {
        self.model = Some(model);
    }

    pub fn model(&self) -> Option<&Arc<AnalysedModel>> {
        self.model.as_ref()
    }

    pub fn set_profile(&mut self, profile: GeneratorProfile) {
        self.profile = profile;
    }

    pub fn profile(&self) -> &GeneratorProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut GeneratorProfile {
        &mut self.profile
    }

    pub fn tracker(&self) -> &VariableTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut VariableTracker {
        &mut self.tracker
    }

    /// Issues raised by the last tracking request.
    pub fn issues(&self) -> &Issues {
        self.tracker.issues()
    }

    /// Code of a single expression, with variables spelled by name.
    pub fn equation_code(ast: &Ast, profile: &GeneratorProfile) -> String {
        Renderer::new(profile, &PlainNames).code(ast)
    }

    /// Header-style declarations. Empty when the profile has no interface or
    /// no valid model is held.
    pub fn interface_code(&self) -> String {
        match self.valid_model() {
            Some(model) if self.profile.has_interface => {
                Emitter::new(model, &self.profile, &self.tracker).interface()
            }
            _ => String::new(),
        }
    }

    /// Definitions of the model's arrays and methods. Empty when no valid
    /// model is held.
    pub fn implementation_code(&self) -> String {
        match self.valid_model() {
            Some(model) => Emitter::new(model, &self.profile, &self.tracker).implementation(),
            None => String::new(),
        }
    }

    fn valid_model(&self) -> Option<&AnalysedModel> {
        let model = self.model.as_deref()?;
        if !model.is_valid() {
            tracing::debug!(model_type = %model.model_type(), "not generating code for an invalid model");
            return None;
        }
        Some(model)
    }
}

/// Builds one text artifact.
struct Emitter<'a> {
    model: &'a AnalysedModel,
    profile: &'a GeneratorProfile,
    tracker: &'a VariableTracker,
    names: ArrayNames<'a>,
    code: String,
}

impl<'a> Emitter<'a> {
    fn new(model: &'a AnalysedModel, profile: &'a GeneratorProfile, tracker: &'a VariableTracker) -> Self {
        Self {
            model,
            profile,
            tracker,
            names: ArrayNames { model, profile },
            code: String::new(),
        }
    }

    fn render(&self, ast: &Ast) -> String {
        Renderer::new(self.profile, &self.names).code(ast)
    }

    fn is_differential(&self) -> bool {
        self.model.is_differential()
    }

    fn has_externals(&self) -> bool {
        self.model.has_external_variables()
    }

    /// Appends a section, separated from the previous one by a blank line.
    fn section(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.code.is_empty() {
            self.code.push('\n');
        }
        self.code.push_str(text);
    }

    fn interface(mut self) -> String {
        tracing::debug!("generating interface code");
        let p = self.profile;
        self.origin_comment();
        self.section(&p.interface_header_string);
        let versions = format!(
            "{}{}",
            p.interface_version_string, p.interface_generator_version_string
        );
        self.section(&versions);

        let mut counts = String::new();
        if self.is_differential() {
            counts.push_str(&p.interface_state_count_string);
        }
        counts.push_str(&p.interface_constant_count_string);
        counts.push_str(&p.interface_computed_constant_count_string);
        counts.push_str(&p.interface_algebraic_count_string);
        if self.has_externals() {
            counts.push_str(&p.interface_external_count_string);
        }
        self.section(&counts);

        self.variable_info_object();

        let mut tables = String::new();
        for (ty, interface, _) in self.info_tables() {
            if ty == VariableType::VariableOfIntegration || !self.model.variables_of_type(ty).is_empty() {
                tables.push_str(interface);
            }
        }
        self.section(&tables);

        self.external_typedef();

        let mut arrays = String::new();
        if self.is_differential() {
            arrays.push_str(&p.interface_create_states_array_method_string);
        }
        arrays.push_str(&p.interface_create_constants_array_method_string);
        arrays.push_str(&p.interface_create_computed_constants_array_method_string);
        arrays.push_str(&p.interface_create_algebraic_array_method_string);
        if self.has_externals() {
            arrays.push_str(&p.interface_create_externals_array_method_string);
        }
        arrays.push_str(&p.interface_delete_array_method_string);
        self.section(&arrays);

        let mut methods = String::new();
        methods.push_str(if self.is_differential() {
            &p.interface_initialise_variables_method_fdm_string
        } else {
            &p.interface_initialise_variables_method_fam_string
        });
        methods.push_str(&p.interface_compute_computed_constants_method_string);
        if self.is_differential() {
            methods.push_str(if self.has_externals() {
                &p.interface_compute_rates_method_wev_string
            } else {
                &p.interface_compute_rates_method_woev_string
            });
        }
        methods.push_str(self.compute_variables_template(true));
        self.section(&methods);

        self.code
    }

    fn implementation(mut self) -> String {
        tracing::debug!("generating implementation code");
        let p = self.profile;
        self.origin_comment();
        let header = p
            .implementation_header_string
            .replace("[INTERFACE_FILE_NAME]", &p.interface_file_name_string);
        self.section(&header);

        let versions = format!(
            "{}{}",
            p.implementation_version_string,
            p.implementation_generator_version_string
                .replace("[GENERATOR_VERSION]", GENERATOR_VERSION)
        );
        self.section(&versions);
        self.implementation_counts();

        if !p.has_interface {
            self.variable_info_object();
        }
        self.implementation_info_tables();
        self.helper_functions();
        if !p.has_interface {
            self.external_typedef();
        }
        self.root_finding();
        self.array_methods();

        let body = self.initialise_body();
        let template = if self.is_differential() {
            &p.implementation_initialise_variables_method_fdm_string
        } else {
            &p.implementation_initialise_variables_method_fam_string
        };
        self.method(template, body);

        let body = self.equations_code(&self.model.constant_equations());
        self.method(&p.implementation_compute_computed_constants_method_string, body);

        if self.is_differential() {
            let body = self.equations_code(&self.model.rate_equations());
            let template = if self.has_externals() {
                &p.implementation_compute_rates_method_wev_string
            } else {
                &p.implementation_compute_rates_method_woev_string
            };
            self.method(template, body);
        }

        let body = self.equations_code(&self.model.variable_equations());
        let template = self.compute_variables_template(false);
        self.method(template, body);

        self.code
    }

    fn origin_comment(&mut self) {
        let p = self.profile;
        let information = format!(
            "{} {} profile of",
            if p.is_modified() { "a modified" } else { "the" },
            p.profile.display_name()
        );
        let origin = p
            .origin_comment_string
            .replace("[PROFILE_INFORMATION]", &information)
            .replace("[GENERATOR_VERSION]", GENERATOR_VERSION);
        let comment = p.comment_string.replace("[CODE]", &origin);
        self.section(&comment);
    }

    fn implementation_counts(&mut self) {
        let p = self.profile;
        let m = self.model;
        let mut counts = String::new();
        if self.is_differential() {
            counts.push_str(
                &p.implementation_state_count_string
                    .replace("[STATE_COUNT]", &m.state_count().to_string()),
            );
        }
        counts.push_str(
            &p.implementation_constant_count_string
                .replace("[CONSTANT_COUNT]", &m.constant_count().to_string()),
        );
        counts.push_str(
            &p.implementation_computed_constant_count_string
                .replace("[COMPUTED_CONSTANT_COUNT]", &m.computed_constant_count().to_string()),
        );
        counts.push_str(
            &p.implementation_algebraic_count_string
                .replace("[ALGEBRAIC_COUNT]", &m.algebraic_count().to_string()),
        );
        if self.has_externals() {
            counts.push_str(
                &p.implementation_external_count_string
                    .replace("[EXTERNAL_COUNT]", &m.external_count().to_string()),
            );
        }
        self.section(&counts);
    }

    fn variable_info_object(&mut self) {
        let size = |field: fn(&crate::analyser::AnalysedVariable) -> usize| {
            self.model.variables().iter().map(field).max().unwrap_or(0) + 1
        };
        let object = self
            .profile
            .variable_info_object_string
            .replace("[NAME_SIZE]", &size(|v| v.name.len()).to_string())
            .replace("[UNITS_SIZE]", &size(|v| v.units.len()).to_string())
            .replace("[COMPONENT_SIZE]", &size(|v| v.component.len()).to_string());
        self.section(&object);
    }

    /// Tables to emit as (type, interface template, implementation template).
    fn info_tables(&self) -> Vec<(VariableType, &'a str, &'a str)> {
        let p = self.profile;
        let mut res = Vec::new();
        if self.is_differential() {
            res.push((
                VariableType::VariableOfIntegration,
                p.interface_voi_info_string.as_str(),
                p.implementation_voi_info_string.as_str(),
            ));
            res.push((
                VariableType::State,
                p.interface_state_info_string.as_str(),
                p.implementation_state_info_string.as_str(),
            ));
        }
        res.push((
            VariableType::Constant,
            p.interface_constant_info_string.as_str(),
            p.implementation_constant_info_string.as_str(),
        ));
        res.push((
            VariableType::ComputedConstant,
            p.interface_computed_constant_info_string.as_str(),
            p.implementation_computed_constant_info_string.as_str(),
        ));
        res.push((
            VariableType::Algebraic,
            p.interface_algebraic_info_string.as_str(),
            p.implementation_algebraic_info_string.as_str(),
        ));
        if self.has_externals() {
            res.push((
                VariableType::External,
                p.interface_external_info_string.as_str(),
                p.implementation_external_info_string.as_str(),
            ));
        }
        res
    }

    fn info_entry(&self, var: &crate::analyser::AnalysedVariable) -> String {
        self.profile
            .variable_info_entry_string
            .replace("[NAME]", &var.name)
            .replace("[UNITS]", &var.units)
            .replace("[COMPONENT]", &var.component)
    }

    fn implementation_info_tables(&mut self) {
        let p = self.profile;
        for (ty, _, template) in self.info_tables() {
            let variables = self.model.variables_of_type(ty);
            if variables.is_empty() {
                continue;
            }
            let code = if ty == VariableType::VariableOfIntegration {
                self.info_entry(variables[0])
            } else {
                let last = variables.len() - 1;
                variables
                    .iter()
                    .enumerate()
                    .map(|(i, var)| {
                        let separator = if i == last { "" } else { &p.array_element_separator_string };
                        format!("{}{}{separator}\n", p.indent_string, self.info_entry(var))
                    })
                    .collect()
            };
            self.section(&template.replace("[CODE]", &code));
        }
    }

    fn helper_functions(&mut self) {
        let p = self.profile;
        let n = self.model.needs();
        let candidates = [
            (n.eq && !p.has_eq_operator, &p.eq_function_string),
            (n.neq && !p.has_neq_operator, &p.neq_function_string),
            (n.lt && !p.has_lt_operator, &p.lt_function_string),
            (n.leq && !p.has_leq_operator, &p.leq_function_string),
            (n.gt && !p.has_gt_operator, &p.gt_function_string),
            (n.geq && !p.has_geq_operator, &p.geq_function_string),
            (n.and && !p.has_and_operator, &p.and_function_string),
            (n.or && !p.has_or_operator, &p.or_function_string),
            (n.xor && !p.has_xor_operator, &p.xor_function_string),
            (n.not && !p.has_not_operator, &p.not_function_string),
            (n.min, &p.min_function_string),
            (n.max, &p.max_function_string),
            (n.sec, &p.sec_function_string),
            (n.csc, &p.csc_function_string),
            (n.cot, &p.cot_function_string),
            (n.sech, &p.sech_function_string),
            (n.csch, &p.csch_function_string),
            (n.coth, &p.coth_function_string),
            (n.asec, &p.asec_function_string),
            (n.acsc, &p.acsc_function_string),
            (n.acot, &p.acot_function_string),
            (n.asech, &p.asech_function_string),
            (n.acsch, &p.acsch_function_string),
            (n.acoth, &p.acoth_function_string),
        ];
        for (needed, function) in candidates {
            if needed {
                self.section(function);
            }
        }
    }

    fn external_typedef(&mut self) {
        if !self.has_externals() {
            return;
        }
        let p = self.profile;
        self.section(if self.is_differential() {
            &p.external_variable_method_type_definition_fdm_string
        } else {
            &p.external_variable_method_type_definition_fam_string
        });
    }

    /// Equations of NLA system `system`, and the analysed variables they
    /// solve for.
    fn nla_system(&self, system: usize) -> (Vec<&'a AnalysedEquation>, Vec<usize>) {
        let equations: Vec<&AnalysedEquation> = self
            .model
            .equations()
            .iter()
            .filter(|e| e.nla_system_index == Some(system))
            .collect();
        let mut unknowns = Vec::new();
        for equation in &equations {
            for &v in &equation.variables {
                if !unknowns.contains(&v) {
                    unknowns.push(v);
                }
            }
        }
        (equations, unknowns)
    }

    fn root_finding(&mut self) {
        let count = self.model.nla_system_count();
        if count == 0 {
            return;
        }
        let p = self.profile;
        let differential = self.is_differential();
        self.section(if differential {
            &p.root_finding_info_object_fdm_string
        } else {
            &p.root_finding_info_object_fam_string
        });
        self.section(&p.extern_nla_solve_method_string);

        for system in 0..count {
            let (objective, find_root) = self.nla_system_code(system);
            self.section(&objective);
            self.section(&find_root);
        }
    }

    /// Objective function and root finding method of one NLA system.
    fn nla_system_code(&self, system: usize) -> (String, String) {
        let p = self.profile;
        let differential = self.is_differential();
        let (equations, unknowns) = self.nla_system(system);
        let index = system.to_string();
        let size = unknowns.len().to_string();
        let u = |i: usize| self.names.element(&p.u_array_string, i);
        let f = |i: usize| self.names.element(&p.f_array_string, i);
        let line = |lhs: &str, rhs: &str| {
            format!(
                "{}{lhs}{}{rhs}{}\n",
                p.indent_string, p.equality_string, p.command_separator_string
            )
        };

        let mut objective = String::new();
        for (i, &v) in unknowns.iter().enumerate() {
            objective.push_str(&line(&self.names.unknown(v), &u(i)));
        }
        objective.push('\n');
        for (i, equation) in equations.iter().enumerate() {
            let residual = equation.ast.as_ref().map(|ast| self.render(ast)).unwrap_or_default();
            objective.push_str(&line(&f(i), &residual));
        }
        let template = if differential {
            &p.objective_function_method_fdm_string
        } else {
            &p.objective_function_method_fam_string
        };
        let objective = template
            .replace("[INDEX]", &index)
            .replace("[CODE]", &objective);

        let mut body = String::new();
        for (i, &v) in unknowns.iter().enumerate() {
            body.push_str(&line(&u(i), &self.names.unknown(v)));
        }
        let solve = if differential {
            &p.nla_solve_call_fdm_string
        } else {
            &p.nla_solve_call_fam_string
        };
        body.push('\n');
        body.push_str(&p.indent_string);
        body.push_str(&solve.replace("[INDEX]", &index).replace("[SIZE]", &size));
        body.push('\n');
        for (i, &v) in unknowns.iter().enumerate() {
            body.push_str(&line(&self.names.unknown(v), &u(i)));
        }
        let template = if differential {
            &p.find_root_method_fdm_string
        } else {
            &p.find_root_method_fam_string
        };
        let find_root = template
            .replace("[INDEX]", &index)
            .replace("[SIZE]", &size)
            .replace("[CODE]", &body);
        (objective, find_root)
    }

    fn array_methods(&mut self) {
        let p = self.profile;
        if self.is_differential() {
            self.section(&p.implementation_create_states_array_method_string);
        }
        self.section(&p.implementation_create_constants_array_method_string);
        self.section(&p.implementation_create_computed_constants_array_method_string);
        self.section(&p.implementation_create_algebraic_array_method_string);
        if self.has_externals() {
            self.section(&p.implementation_create_externals_array_method_string);
        }
        self.section(&p.implementation_delete_array_method_string);
    }

    fn method(&mut self, template: &str, body: String) {
        let p = self.profile;
        let body = if body.is_empty() && !p.empty_method_string.is_empty() {
            format!("{}{}", p.indent_string, p.empty_method_string)
        } else {
            body
        };
        self.section(&template.replace("[CODE]", &body));
    }

    fn statement(&self, code: &str) -> String {
        format!("{}{code}{}\n", self.profile.indent_string, self.profile.command_separator_string)
    }

    fn initialise_body(&self) -> String {
        let mut body = String::new();
        for position in self.model.initialisation_order() {
            if !self.tracker.tracks(self.model, position) {
                continue;
            }
            let value = match self.model.variables()[position].initialiser {
                Some(Initialiser::Value(value)) => self.render(&Ast::cn(value)),
                Some(Initialiser::Constant(source)) => self.names.analysed(source),
                None => continue,
            };
            let lhs = self.names.analysed(position);
            body.push_str(&self.statement(&format!("{lhs}{}{value}", self.profile.equality_string)));
        }
        body
    }

    fn equations_code(&self, selected: &[usize]) -> String {
        let p = self.profile;
        let differential = self.is_differential();
        let mut body = String::new();
        let mut solved_systems = Vec::new();
        for &e in selected {
            let equation = &self.model.equations()[e];
            match equation.ty {
                EquationType::Nla => {
                    let Some(system) = equation.nla_system_index else {
                        continue;
                    };
                    if solved_systems.contains(&system) {
                        continue;
                    }
                    solved_systems.push(system);
                    let call = if differential {
                        &p.find_root_call_fdm_string
                    } else {
                        &p.find_root_call_fam_string
                    };
                    body.push_str(&p.indent_string);
                    body.push_str(&call.replace("[INDEX]", &system.to_string()));
                }
                EquationType::External => {
                    for &v in &equation.variables {
                        let index = self.model.variables()[v].index.unwrap_or_default();
                        let call = if differential {
                            &p.external_variable_method_call_fdm_string
                        } else {
                            &p.external_variable_method_call_fam_string
                        };
                        let call = call.replace("[INDEX]", &index.to_string());
                        let lhs = self.names.analysed(v);
                        body.push_str(&self.statement(&format!("{lhs}{}{call}", p.equality_string)));
                    }
                }
                _ => {
                    let tracked = equation
                        .variables
                        .iter()
                        .all(|&v| self.tracker.tracks(self.model, v));
                    if let (true, Some(ast)) = (tracked, &equation.ast) {
                        body.push_str(&self.statement(&self.render(ast)));
                    }
                }
            }
        }
        body
    }

    fn compute_variables_template(&self, interface: bool) -> &'a str {
        let p = self.profile;
        match (self.is_differential(), self.has_externals(), interface) {
            (false, false, true) => &p.interface_compute_variables_method_fam_woev_string,
            (false, true, true) => &p.interface_compute_variables_method_fam_wev_string,
            (true, false, true) => &p.interface_compute_variables_method_fdm_woev_string,
            (true, true, true) => &p.interface_compute_variables_method_fdm_wev_string,
            (false, false, false) => &p.implementation_compute_variables_method_fam_woev_string,
            (false, true, false) => &p.implementation_compute_variables_method_fam_wev_string,
            (true, false, false) => &p.implementation_compute_variables_method_fdm_woev_string,
            (true, true, false) => &p.implementation_compute_variables_method_fdm_wev_string,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::{analyse, Analyser, ExternalVariable, ModelType};
    use crate::ast::{BinaryOp, UnaryOp};
    use crate::model::{ComponentId, InitialValue, Model, VariableId};
    use crate::profile::Profile;

    struct Fixture {
        model: Model,
        c: ComponentId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut model = Model::new("generated");
            let c = model.add_component("main").unwrap();
            Self { model, c }
        }

        fn var(&mut self, name: &str, units: &str, initial: Option<f64>) -> VariableId {
            let v = self.model.add_variable(self.c, name, units).unwrap();
            if let Some(value) = initial {
                self.model.set_initial_value(v, InitialValue::Number(value)).unwrap();
            }
            v
        }

        fn eq(&mut self, lhs: Ast, rhs: Ast) {
            self.model.add_equation(self.c, Ast::equality(lhs, rhs)).unwrap();
        }

        fn generator(&self) -> Generator {
            let (issues, model) = analyse(&self.model, &[]);
            assert!(issues.is_empty(), "{:?}", issues);
            let mut generator = Generator::new();
            generator.set_model(model);
            generator
        }
    }

    // dx/dt = k, y = 2*x
    fn ode() -> (Fixture, VariableId) {
        let mut f = Fixture::new();
        let t = f.var("t", "second", None);
        let x = f.var("x", "dimensionless", Some(0.0));
        let k = f.var("k", "per_second", Some(2.0));
        let y = f.var("y", "dimensionless", None);
        let rate = Ast::diff(f.model.ci_ref(x), f.model.ci_ref(t));
        let k_ci = f.model.ci(k);
        f.eq(rate, k_ci);
        let rhs = Ast::times(Ast::cn(2.0), f.model.ci(x));
        let y_ci = f.model.ci(y);
        f.eq(y_ci, rhs);
        (f, y)
    }

    #[test]
    fn equation_code_uses_variable_names() {
        let mut model = Model::new("m");
        let c = model.add_component("c").unwrap();
        let x = model.add_variable(c, "x", "dimensionless").unwrap();
        let t = model.add_variable(c, "t", "second").unwrap();
        let ast = Ast::equality(
            Ast::diff(model.ci_ref(x), model.ci_ref(t)),
            Ast::binary(BinaryOp::Leq, model.ci(x), Ast::unary(UnaryOp::Sin, model.ci(t))),
        );
        assert_eq!(
            Generator::equation_code(&ast, &GeneratorProfile::c()),
            "d(x)/d(t) = x <= sin(t)"
        );
        assert_eq!(
            Generator::equation_code(&ast, &GeneratorProfile::python()),
            "d(x)/d(t) = leq_func(x, sin(t))"
        );
    }

    #[test]
    fn nothing_is_generated_without_a_valid_model() {
        let mut generator = Generator::new();
        assert_eq!(generator.implementation_code(), "");

        let mut f = Fixture::new();
        let a = f.var("a", "dimensionless", None);
        let b = f.var("b", "dimensionless", None);
        let (a_ci, b_ci) = (f.model.ci(a), f.model.ci(b));
        f.eq(a_ci, b_ci);
        let (_, model) = analyse(&f.model, &[]);
        generator.set_model(model);
        assert_eq!(generator.interface_code(), "");
        assert_eq!(generator.implementation_code(), "");
    }

    #[test]
    fn c_implementation() {
        let (f, _) = ode();
        let code = f.generator().implementation_code();

        assert!(code.starts_with(&format!(
            "/* The content of this file was generated using the C profile of modelgen {GENERATOR_VERSION}. */\n\n\
             #include \"model.h\"\n"
        )));
        assert!(code.contains(
            "const size_t STATE_COUNT = 1;\nconst size_t CONSTANT_COUNT = 1;\n\
             const size_t COMPUTED_CONSTANT_COUNT = 0;\nconst size_t ALGEBRAIC_COUNT = 1;\n"
        ));
        assert!(code.contains("const VariableInfo VOI_INFO = {\"t\", \"second\", \"main\"};\n"));
        assert!(code.contains("const VariableInfo STATE_INFO[] = {\n    {\"x\", \"dimensionless\", \"main\"}\n};\n"));
        assert!(!code.contains("COMPUTED_CONSTANT_INFO"));
        assert!(code.contains(
            "void initialiseVariables(double *states, double *constants, double *algebraic)\n{\n    \
             constants[0] = 2.0;\n    states[0] = 0.0;\n}\n"
        ));
        assert!(code.contains(
            "void computeComputedConstants(double *constants, double *computedConstants)\n{\n}\n"
        ));
        assert!(code.contains("double *externals)\n{\n    rates[0] = constants[0];\n}\n"));
        assert!(code.contains("double *externals)\n{\n    algebraic[0] = 2.0*states[0];\n}\n"));
        assert!(!code.contains("ExternalVariable"));
    }

    #[test]
    fn c_interface() {
        let (f, _) = ode();
        let code = f.generator().interface_code();
        assert!(code.contains("#pragma once\n"));
        assert!(code.contains("extern const char GENERATOR_VERSION[];\n"));
        assert!(code.contains("typedef struct {\n    char name[2];\n    char units[14];\n    char component[5];\n} VariableInfo;\n"));
        assert!(code.contains("extern const VariableInfo STATE_INFO[];\n"));
        assert!(code.contains("void computeRates(double voi, "));
        assert!(!code.contains("extern const VariableInfo EXTERNAL_INFO[];"));
    }

    #[test]
    fn python_implementation() {
        let (f, _) = ode();
        let mut generator = f.generator();
        generator.set_profile(GeneratorProfile::new(Profile::Python));
        assert_eq!(generator.interface_code(), "");

        let code = generator.implementation_code();
        assert!(code.starts_with("# The content of this file was generated using the Python profile of modelgen"));
        assert!(code.contains("STATE_INFO = [\n    {\"name\": \"x\", \"units\": \"dimensionless\", \"component\": \"main\"}\n]\n"));
        assert!(code.contains(
            "\ndef initialise_variables(states, constants, algebraic):\n    constants[0] = 2.0\n    states[0] = 0.0\n"
        ));
        assert!(code.contains("\ndef compute_computed_constants(constants, computed_constants):\n    pass\n"));
        assert!(code.contains("algebraic, externals):\n    algebraic[0] = 2.0*states[0]\n"));
    }

    #[test]
    fn modified_profiles_are_announced() {
        let (f, _) = ode();
        let mut generator = f.generator();
        generator.profile_mut().indent_string = "\t".to_string();
        let code = generator.implementation_code();
        assert!(code.contains("generated using a modified C profile of"));
        assert!(code.contains("\trates[0] = constants[0];\n"));
    }

    #[test]
    fn untracked_variables_are_not_computed() {
        let (f, y) = ode();
        let mut generator = f.generator();
        let model = Arc::clone(generator.model().unwrap());
        generator.tracker_mut().untrack_variable(&model, y);
        assert!(generator.issues().is_empty());

        let code = generator.implementation_code();
        assert!(!code.contains("algebraic[0] = 2.0*states[0];"));
        assert!(code.contains("const size_t ALGEBRAIC_COUNT = 1;"));
    }

    #[test]
    fn helper_functions_follow_needs() {
        let mut f = Fixture::new();
        let a = f.var("a", "dimensionless", Some(1.0));
        let b = f.var("b", "dimensionless", None);
        let rhs = Ast::binary(BinaryOp::Min, Ast::unary(UnaryOp::Sec, f.model.ci(a)), Ast::cn(3.0));
        let b_ci = f.model.ci(b);
        f.eq(b_ci, rhs);
        let code = f.generator().implementation_code();

        assert!(code.contains("double min(double x, double y)\n"));
        assert!(code.contains("double sec(double x)\n"));
        assert!(!code.contains("double max(double x, double y)"));
        assert!(code.contains("computedConstants[0] = min(sec(constants[0]), 3.0);"));
        assert!(code.contains("void initialiseVariables(double *constants, double *algebraic)\n"));
    }

    #[test]
    fn nla_systems_get_root_finding_code() {
        // x + y = 3, x - y = 1
        let mut f = Fixture::new();
        let x = f.var("x", "dimensionless", Some(1.0));
        let y = f.var("y", "dimensionless", Some(1.0));
        let lhs = Ast::plus(f.model.ci(x), f.model.ci(y));
        f.eq(lhs, Ast::cn(3.0));
        let lhs = Ast::minus(f.model.ci(x), f.model.ci(y));
        f.eq(lhs, Ast::cn(1.0));
        let code = f.generator().implementation_code();

        assert!(code.contains("typedef struct {\n    double *constants;\n"));
        assert!(code.contains("extern void nlaSolve("));
        assert!(code.contains(
            "void objectiveFunction0(double *u, double *f, void *data)\n{\n    \
             double *constants = ((RootFindingInfo *) data)->constants;\n"
        ));
        assert!(code.contains(
            "    algebraic[0] = u[0];\n    algebraic[1] = u[1];\n\n    \
             f[0] = algebraic[0]+algebraic[1]-3.0;\n    f[1] = algebraic[0]-algebraic[1]-1.0;\n}\n"
        ));
        assert!(code.contains(
            "    double u[2];\n\n    u[0] = algebraic[0];\n    u[1] = algebraic[1];\n\n    \
             nlaSolve(objectiveFunction0, u, 2, &rfi);\n\n    algebraic[0] = u[0];\n    algebraic[1] = u[1];\n}\n"
        ));
        assert!(code.contains("double *externals)\n{\n    findRoot0(constants, computedConstants, algebraic, externals);\n}\n"));
    }

    #[test]
    fn rates_solved_by_root_finding() {
        // sin(dx/dt) = 0.5
        let mut f = Fixture::new();
        let t = f.var("t", "second", None);
        let x = f.var("x", "dimensionless", Some(1.0));
        let rate = Ast::diff(f.model.ci_ref(x), f.model.ci_ref(t));
        f.eq(Ast::unary(UnaryOp::Sin, rate), Ast::cn(0.5));
        let generator = f.generator();
        assert_eq!(generator.model().unwrap().model_type(), ModelType::Dae);
        let code = generator.implementation_code();

        assert!(code.contains("    rates[0] = u[0];\n\n    f[0] = sin(rates[0])-0.5;\n}\n"));
        assert!(code.contains("    u[0] = rates[0];\n"));
        assert!(!code.contains("states[0] = u[0];"));

        let body = |method: &str| {
            let start = code.find(method).unwrap();
            let end = start + code[start..].find("\n}\n").unwrap();
            code[start..end].to_string()
        };
        assert!(body("void computeRates(").contains("findRoot0(voi, states, rates,"));
        assert!(body("void computeVariables(").contains("findRoot0(voi, states, rates,"));
    }

    #[test]
    fn external_variables_are_fetched() {
        // dx/dt = -k*x with k external
        let mut f = Fixture::new();
        let t = f.var("t", "second", None);
        let x = f.var("x", "dimensionless", Some(1.0));
        let k = f.var("k", "per_second", None);
        let rate = Ast::diff(f.model.ci_ref(x), f.model.ci_ref(t));
        let rhs = Ast::times(Ast::neg(f.model.ci(k)), f.model.ci(x));
        f.eq(rate, rhs);

        let mut analyser = Analyser::new();
        analyser.add_external_variable(ExternalVariable::new(&f.model, k));
        let model = analyser.analyse_model(&f.model);
        let mut generator = Generator::new();
        generator.set_model(model);

        let interface = generator.interface_code();
        assert!(interface.contains("typedef double (* ExternalVariable)(double voi, "));
        assert!(interface.contains("extern const VariableInfo EXTERNAL_INFO[];\n"));
        assert!(interface.contains("double * createExternalsArray();\n"));

        let code = generator.implementation_code();
        assert!(code.contains("const size_t EXTERNAL_COUNT = 1;\n"));
        assert!(code.contains(
            "ExternalVariable externalVariable)\n{\n    \
             externals[0] = externalVariable(voi, states, rates, constants, computedConstants, algebraic, externals, 0);\n    \
             rates[0] = -externals[0]*states[0];\n}\n"
        ));
    }
}
