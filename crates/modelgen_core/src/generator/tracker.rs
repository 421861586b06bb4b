use crate::analyser::{AnalysedModel, AnalysedVariable, EquationType, VariableType};
use crate::issue::{Issue, IssueKind, Issues};
use crate::model::VariableId;
use std::collections::BTreeSet;

/// Which computed variables get code generated for them.
///
/// Every variable starts tracked. Untracking a constant, computed constant
/// or algebraic variable keeps its slot in the generated arrays but drops the
/// code assigning it, leaving the caller to provide the value.
#[derive(Debug, Clone, Default)]
pub struct VariableTracker {
    untracked: BTreeSet<VariableId>,
    issues: Issues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Constants,
    ComputedConstants,
    Algebraic,
    All,
}

impl VariableTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues recorded by the last `track_variable`/`untrack_variable` call.
    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    pub fn is_tracked_variable(&self, model: &AnalysedModel, variable: VariableId) -> bool {
        model
            .analysed_variable(variable)
            .is_some_and(|var| !self.untracked.contains(&var.variable))
    }

    pub fn is_untracked_variable(&self, model: &AnalysedModel, variable: VariableId) -> bool {
        model
            .analysed_variable(variable)
            .is_some_and(|var| self.untracked.contains(&var.variable))
    }

    /// Whether code should be generated for the analysed variable at `position`.
    pub(crate) fn tracks(&self, model: &AnalysedModel, position: usize) -> bool {
        !self.untracked.contains(&model.variables()[position].variable)
    }

    pub fn track_variable(&mut self, model: &AnalysedModel, variable: VariableId) {
        self.set_tracked(model, variable, true);
    }

    pub fn untrack_variable(&mut self, model: &AnalysedModel, variable: VariableId) {
        self.set_tracked(model, variable, false);
    }

    pub fn track_all_constants(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::Constants, true);
    }

    pub fn untrack_all_constants(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::Constants, false);
    }

    pub fn track_all_computed_constants(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::ComputedConstants, true);
    }

    pub fn untrack_all_computed_constants(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::ComputedConstants, false);
    }

    pub fn track_all_algebraic_variables(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::Algebraic, true);
    }

    pub fn untrack_all_algebraic_variables(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::Algebraic, false);
    }

    pub fn track_all_variables(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::All, true);
    }

    pub fn untrack_all_variables(&mut self, model: &AnalysedModel) {
        self.set_all(model, Bucket::All, false);
    }

    pub fn tracked_constant_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::Constants, true)
    }

    pub fn untracked_constant_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::Constants, false)
    }

    pub fn tracked_computed_constant_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::ComputedConstants, true)
    }

    pub fn untracked_computed_constant_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::ComputedConstants, false)
    }

    pub fn tracked_algebraic_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::Algebraic, true)
    }

    pub fn untracked_algebraic_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::Algebraic, false)
    }

    /// Constants, computed constants and algebraic variables that are tracked.
    pub fn tracked_variable_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::All, true)
    }

    pub fn untracked_variable_count(&self, model: &AnalysedModel) -> usize {
        self.count(model, Bucket::All, false)
    }

    fn set_tracked(&mut self, model: &AnalysedModel, variable: VariableId, tracked: bool) {
        self.issues.clear();
        let Some(position) = model.position_of(variable) else {
            tracing::debug!(?variable, "ignoring a variable the analysed model does not know");
            return;
        };
        match untrackable_reason(model, position) {
            Some(reason) => {
                let var = &model.variables()[position];
                let outcome = if tracked {
                    "is therefore always tracked"
                } else {
                    "cannot therefore be untracked"
                };
                self.issues.push(
                    Issue::message(
                        IssueKind::UntrackableVariable,
                        format!(
                            "Variable '{}' in component '{}' is {reason} and {outcome}.",
                            var.name, var.component
                        ),
                    )
                    .with_variable(var.variable),
                );
            }
            None => self.store(model.variables()[position].variable, tracked),
        }
    }

    fn set_all(&mut self, model: &AnalysedModel, bucket: Bucket, tracked: bool) {
        self.issues.clear();
        for position in positions(model, bucket) {
            if untrackable_reason(model, position).is_none() {
                self.store(model.variables()[position].variable, tracked);
            }
        }
    }

    fn store(&mut self, variable: VariableId, tracked: bool) {
        if tracked {
            self.untracked.remove(&variable);
        } else {
            self.untracked.insert(variable);
        }
    }

    /// Variables that cannot be untracked always count as tracked.
    fn count(&self, model: &AnalysedModel, bucket: Bucket, tracked: bool) -> usize {
        positions(model, bucket)
            .filter(|&position| {
                let untracked = untrackable_reason(model, position).is_none()
                    && self.untracked.contains(&model.variables()[position].variable);
                untracked != tracked
            })
            .count()
    }
}

fn positions(model: &AnalysedModel, bucket: Bucket) -> impl Iterator<Item = usize> + '_ {
    let wanted = move |var: &AnalysedVariable| match bucket {
        Bucket::Constants => var.ty == VariableType::Constant,
        Bucket::ComputedConstants => var.ty == VariableType::ComputedConstant,
        Bucket::Algebraic => var.ty == VariableType::Algebraic,
        Bucket::All => matches!(
            var.ty,
            VariableType::Constant | VariableType::ComputedConstant | VariableType::Algebraic
        ),
    };
    let mut res: Vec<(VariableType, usize, usize)> = model
        .variables()
        .iter()
        .enumerate()
        .filter(|(_, var)| wanted(var))
        .map(|(position, var)| (var.ty, var.index.unwrap_or_default(), position))
        .collect();
    res.sort_by_key(|&(ty, index, _)| (ty as u8, index));
    res.into_iter().map(|(_, _, position)| position)
}

fn untrackable_reason(model: &AnalysedModel, position: usize) -> Option<&'static str> {
    let var = &model.variables()[position];
    match var.ty {
        VariableType::VariableOfIntegration => return Some("the variable of integration"),
        VariableType::State => return Some("a state variable"),
        VariableType::External => return Some("an external variable"),
        _ => {}
    }
    let equations = model.equations();
    if var
        .equations
        .iter()
        .any(|&e| equations[e].ty == EquationType::Nla)
    {
        return Some("computed using an NLA system");
    }
    let needed_externally = equations
        .iter()
        .filter(|e| e.ty == EquationType::External)
        .any(|e| e.external_dependencies.contains(&position));
    needed_externally.then_some("needed to compute an external variable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::{analyse, ExternalVariable};
    use crate::ast::Ast;
    use crate::issue::Level;
    use crate::model::{InitialValue, Model};

    struct Fixture {
        model: Model,
        t: VariableId,
        x: VariableId,
        k: VariableId,
        a: VariableId,
        b: VariableId,
    }

    // dx/dt = -k*x, a = 2*k, b = a + x
    fn fixture() -> Fixture {
        let mut model = Model::new("tracking");
        let c = model.add_component("main").unwrap();
        let t = model.add_variable(c, "t", "second").unwrap();
        let x = model.add_variable(c, "x", "dimensionless").unwrap();
        let k = model.add_variable(c, "k", "per_second").unwrap();
        let a = model.add_variable(c, "a", "per_second").unwrap();
        let b = model.add_variable(c, "b", "dimensionless").unwrap();
        model.set_initial_value(x, InitialValue::Number(1.0)).unwrap();
        model.set_initial_value(k, InitialValue::Number(0.5)).unwrap();
        let rhs = Ast::times(Ast::neg(model.ci(k)), model.ci(x));
        model
            .add_equation(c, Ast::equality(Ast::diff(model.ci_ref(x), model.ci_ref(t)), rhs))
            .unwrap();
        let rhs = Ast::times(Ast::cn(2.0), model.ci(k));
        model.add_equation(c, Ast::equality(model.ci(a), rhs)).unwrap();
        let rhs = Ast::plus(model.ci(a), model.ci(x));
        model.add_equation(c, Ast::equality(model.ci(b), rhs)).unwrap();
        Fixture { model, t, x, k, a, b }
    }

    #[test]
    fn variables_start_tracked() {
        let f = fixture();
        let (_, model) = analyse(&f.model, &[]);
        let tracker = VariableTracker::new();

        assert!(tracker.is_tracked_variable(&model, f.k));
        assert!(!tracker.is_untracked_variable(&model, f.b));
        assert_eq!(tracker.tracked_variable_count(&model), 3);
        assert_eq!(tracker.untracked_variable_count(&model), 0);
    }

    #[test]
    fn untracking_and_retracking() {
        let f = fixture();
        let (_, model) = analyse(&f.model, &[]);
        let mut tracker = VariableTracker::new();

        tracker.untrack_variable(&model, f.a);
        assert!(tracker.issues().is_empty());
        assert!(tracker.is_untracked_variable(&model, f.a));
        assert_eq!(tracker.untracked_computed_constant_count(&model), 1);
        assert_eq!(tracker.tracked_computed_constant_count(&model), 0);

        tracker.track_variable(&model, f.a);
        assert!(tracker.is_tracked_variable(&model, f.a));

        tracker.untrack_all_variables(&model);
        assert_eq!(tracker.untracked_variable_count(&model), 3);
        tracker.track_all_constants(&model);
        assert_eq!(tracker.tracked_constant_count(&model), 1);
        assert_eq!(tracker.untracked_algebraic_count(&model), 1);
    }

    #[test]
    fn special_variables_cannot_be_untracked() {
        let f = fixture();
        let (_, model) = analyse(&f.model, &[]);
        let mut tracker = VariableTracker::new();

        tracker.untrack_variable(&model, f.x);
        assert_eq!(tracker.issues().len(), 1);
        let issue = &tracker.issues().as_slice()[0];
        assert_eq!(issue.level, Level::Message);
        assert_eq!(issue.kind, IssueKind::UntrackableVariable);
        assert_eq!(
            issue.description,
            "Variable 'x' in component 'main' is a state variable and cannot therefore be untracked."
        );

        tracker.track_variable(&model, f.t);
        assert_eq!(
            tracker.issues().as_slice()[0].description,
            "Variable 't' in component 'main' is the variable of integration and is therefore always tracked."
        );
        assert!(tracker.is_tracked_variable(&model, f.x));
    }

    #[test]
    fn external_inputs_stay_tracked() {
        let f = fixture();
        let mut external = ExternalVariable::new(&f.model, f.b);
        external.add_dependency(f.k);
        let (_, model) = analyse(&f.model, &[external]);
        let mut tracker = VariableTracker::new();

        tracker.untrack_variable(&model, f.k);
        assert_eq!(
            tracker.issues().as_slice()[0].description,
            "Variable 'k' in component 'main' is needed to compute an external variable and cannot therefore be untracked."
        );

        tracker.untrack_variable(&model, f.b);
        assert_eq!(
            tracker.issues().as_slice()[0].description,
            "Variable 'b' in component 'main' is an external variable and cannot therefore be untracked."
        );

        tracker.untrack_all_constants(&model);
        assert!(tracker.issues().is_empty());
        assert_eq!(tracker.untracked_constant_count(&model), 0);
    }
}
