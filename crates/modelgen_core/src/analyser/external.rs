use crate::model::{Model, VariableId};

/// A variable whose value is supplied by the caller instead of being
/// computed, together with the variables that value depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalVariable {
    variable: VariableId,
    name: String,
    component: String,
    dependencies: Vec<VariableId>,
}

impl ExternalVariable {
    pub fn new(model: &Model, variable: VariableId) -> Self {
        Self {
            variable,
            name: model.variable_name(variable).to_string(),
            component: model.component_name(variable).to_string(),
            dependencies: Vec::new(),
        }
    }

    pub fn variable(&self) -> VariableId {
        self.variable
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Returns `false` if `variable` is already a dependency.
    pub fn add_dependency(&mut self, variable: VariableId) -> bool {
        if self.dependencies.contains(&variable) {
            return false;
        }
        self.dependencies.push(variable);
        true
    }

    pub fn remove_dependency(&mut self, variable: VariableId) -> bool {
        let before = self.dependencies.len();
        self.dependencies.retain(|&v| v != variable);
        before != self.dependencies.len()
    }

    pub fn remove_all_dependencies(&mut self) {
        self.dependencies.clear();
    }

    pub fn contains_dependency(&self, variable: VariableId) -> bool {
        self.dependencies.contains(&variable)
    }

    pub fn dependencies(&self) -> &[VariableId] {
        &self.dependencies
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_are_unique() {
        let mut model = Model::new("m");
        let c = model.add_component("membrane").unwrap();
        let v = model.add_variable(c, "V", "millivolt").unwrap();
        let i = model.add_variable(c, "i_Na", "microA_per_cm2").unwrap();

        let mut external = ExternalVariable::new(&model, v);
        assert_eq!(external.name(), "V");
        assert_eq!(external.component(), "membrane");
        assert!(external.add_dependency(i));
        assert!(!external.add_dependency(i));
        assert_eq!(external.dependency_count(), 1);
        assert!(external.remove_dependency(i));
        assert!(!external.remove_dependency(i));
    }
}
