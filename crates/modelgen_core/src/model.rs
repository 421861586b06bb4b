use crate::ast::{Ast, Ci};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MODEL_KEY: AtomicU64 = AtomicU64::new(1);

/// Handle to a component of a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
    model: u64,
    index: usize,
}

impl ComponentId {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Handle to a variable of a [`Model`].
///
/// Ids carry the key of the model that created them, so an id coming from
/// another model is never mistaken for a local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId {
    model: u64,
    index: usize,
}

impl VariableId {
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn model_key(&self) -> u64 {
        self.model
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitialValue {
    Number(f64),
    /// Name of another variable of the same component.
    Variable(String),
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub units: String,
    pub component: ComponentId,
    pub initial_value: Option<InitialValue>,
    equivalences: Vec<VariableId>,
}

impl Variable {
    pub fn equivalences(&self) -> &[VariableId] {
        &self.equivalences
    }
}

#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    variables: Vec<VariableId>,
    equations: Vec<Ast>,
}

impl Component {
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn variables(&self) -> &[VariableId] {
        &self.variables
    }

    pub fn equations(&self) -> &[Ast] {
        &self.equations
    }
}

/// Declarative model: components holding variables and equations, plus the
/// equivalences connecting variables across components.
#[derive(Debug, Clone)]
pub struct Model {
    key: u64,
    pub name: String,
    components: Vec<Component>,
    variables: Vec<Variable>,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Self {
            key: NEXT_MODEL_KEY.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            components: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn add_component(&mut self, name: &str) -> Result<ComponentId, ModelError> {
        self.insert_component(name, None)
    }

    /// Adds a component encapsulated by `parent`.
    pub fn add_child_component(
        &mut self,
        parent: ComponentId,
        name: &str,
    ) -> Result<ComponentId, ModelError> {
        self.check_component(parent)?;
        let id = self.insert_component(name, Some(parent))?;
        self.components[parent.index].children.push(id);
        Ok(id)
    }

    fn insert_component(
        &mut self,
        name: &str,
        parent: Option<ComponentId>,
    ) -> Result<ComponentId, ModelError> {
        if self.components.iter().any(|c| c.name == name) {
            return Err(ModelError::DuplicateComponent(name.to_string()));
        }
        let id = ComponentId {
            model: self.key,
            index: self.components.len(),
        };
        self.components.push(Component {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            variables: Vec::new(),
            equations: Vec::new(),
        });
        Ok(id)
    }

    pub fn add_variable(
        &mut self,
        component: ComponentId,
        name: &str,
        units: &str,
    ) -> Result<VariableId, ModelError> {
        self.check_component(component)?;
        let owner = &self.components[component.index];
        if owner
            .variables
            .iter()
            .any(|v| self.variables[v.index].name == name)
        {
            return Err(ModelError::DuplicateVariable {
                component: owner.name.clone(),
                variable: name.to_string(),
            });
        }
        let id = VariableId {
            model: self.key,
            index: self.variables.len(),
        };
        self.variables.push(Variable {
            name: name.to_string(),
            units: units.to_string(),
            component,
            initial_value: None,
            equivalences: Vec::new(),
        });
        self.components[component.index].variables.push(id);
        Ok(id)
    }

    pub fn set_initial_value(
        &mut self,
        variable: VariableId,
        value: InitialValue,
    ) -> Result<(), ModelError> {
        self.check_variable(variable)?;
        self.variables[variable.index].initial_value = Some(value);
        Ok(())
    }

    pub fn clear_initial_value(&mut self, variable: VariableId) -> Result<(), ModelError> {
        self.check_variable(variable)?;
        self.variables[variable.index].initial_value = None;
        Ok(())
    }

    /// Connects two variables. Equivalence is symmetric and, through
    /// [`Model::equivalent_variables`], transitive.
    pub fn add_equivalence(&mut self, a: VariableId, b: VariableId) -> Result<(), ModelError> {
        self.check_variable(a)?;
        self.check_variable(b)?;
        if a == b {
            return Err(ModelError::SelfEquivalence(self.variables[a.index].name.clone()));
        }
        if !self.variables[a.index].equivalences.contains(&b) {
            self.variables[a.index].equivalences.push(b);
            self.variables[b.index].equivalences.push(a);
        }
        Ok(())
    }

    pub fn add_equation(&mut self, component: ComponentId, equation: Ast) -> Result<(), ModelError> {
        self.check_component(component)?;
        self.components[component.index].equations.push(equation);
        Ok(())
    }

    /// Variable leaf for use in equations.
    pub fn ci(&self, variable: VariableId) -> Ast {
        Ast::Ci(self.ci_ref(variable))
    }

    pub fn ci_ref(&self, variable: VariableId) -> Ci {
        let name = self
            .variable(variable)
            .map(|v| v.name.clone())
            .unwrap_or_default();
        Ci { variable, name }
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn owns_variable(&self, variable: VariableId) -> bool {
        variable.model == self.key && variable.index < self.variables.len()
    }

    pub fn owns_component(&self, component: ComponentId) -> bool {
        component.model == self.key && component.index < self.components.len()
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        if self.owns_component(id) {
            Some(&self.components[id.index])
        } else {
            None
        }
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        if self.owns_variable(id) {
            Some(&self.variables[id.index])
        } else {
            None
        }
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..self.components.len()).map(move |index| ComponentId {
            model: self.key,
            index,
        })
    }

    pub fn variable_ids(&self) -> impl Iterator<Item = VariableId> + '_ {
        (0..self.variables.len()).map(move |index| VariableId {
            model: self.key,
            index,
        })
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Components in encapsulation order: every top-level component followed
    /// by its descendants, depth first.
    pub fn components_in_order(&self) -> Vec<ComponentId> {
        fn visit(model: &Model, id: ComponentId, out: &mut Vec<ComponentId>) {
            out.push(id);
            for &child in &model.components[id.index].children {
                visit(model, child, out);
            }
        }

        let mut res = Vec::with_capacity(self.components.len());
        for id in self.component_ids() {
            if self.components[id.index].parent.is_none() {
                visit(self, id, &mut res);
            }
        }
        res
    }

    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.component_ids()
            .find(|id| self.components[id.index].name == name)
    }

    pub fn find_variable(&self, component: &str, variable: &str) -> Option<VariableId> {
        let component = self.find_component(component)?;
        self.variable_in_component(component, variable)
    }

    pub fn variable_in_component(&self, component: ComponentId, name: &str) -> Option<VariableId> {
        self.component(component)?
            .variables
            .iter()
            .copied()
            .find(|v| self.variables[v.index].name == name)
    }

    pub fn component_name(&self, variable: VariableId) -> &str {
        self.variable(variable)
            .map(|v| self.components[v.component.index].name.as_str())
            .unwrap_or("")
    }

    pub fn variable_name(&self, variable: VariableId) -> &str {
        self.variable(variable).map(|v| v.name.as_str()).unwrap_or("")
    }

    /// `variable` followed by every variable reachable through equivalences,
    /// in discovery order.
    pub fn equivalent_variables(&self, variable: VariableId) -> Vec<VariableId> {
        if !self.owns_variable(variable) {
            return Vec::new();
        }

        let mut res = vec![variable];
        let mut queue = VecDeque::from([variable]);
        while let Some(current) = queue.pop_front() {
            for &other in &self.variables[current.index].equivalences {
                if !res.contains(&other) {
                    res.push(other);
                    queue.push_back(other);
                }
            }
        }
        res
    }

    pub fn are_equivalent_variables(&self, a: VariableId, b: VariableId) -> bool {
        a == b || self.equivalent_variables(a).contains(&b)
    }

    fn check_component(&self, id: ComponentId) -> Result<(), ModelError> {
        if self.owns_component(id) {
            Ok(())
        } else {
            Err(ModelError::ForeignId(format!("component #{}", id.index)))
        }
    }

    fn check_variable(&self, id: VariableId) -> Result<(), ModelError> {
        if self.owns_variable(id) {
            Ok(())
        } else {
            Err(ModelError::ForeignId(format!("variable #{}", id.index)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_names() {
        let mut model = Model::new("m");
        let c = model.add_component("c").unwrap();
        assert_eq!(
            model.add_component("c"),
            Err(ModelError::DuplicateComponent("c".into()))
        );
        model.add_variable(c, "x", "dimensionless").unwrap();
        assert!(matches!(
            model.add_variable(c, "x", "second"),
            Err(ModelError::DuplicateVariable { .. })
        ));
    }

    #[test]
    fn equivalence_is_transitive() {
        let mut model = Model::new("m");
        let c1 = model.add_component("c1").unwrap();
        let c2 = model.add_component("c2").unwrap();
        let c3 = model.add_component("c3").unwrap();
        let a = model.add_variable(c1, "a", "second").unwrap();
        let b = model.add_variable(c2, "b", "second").unwrap();
        let c = model.add_variable(c3, "c", "second").unwrap();
        model.add_equivalence(a, b).unwrap();
        model.add_equivalence(b, c).unwrap();

        assert!(model.are_equivalent_variables(a, c));
        assert_eq!(model.equivalent_variables(c), vec![c, b, a]);
        assert_eq!(
            model.add_equivalence(a, a),
            Err(ModelError::SelfEquivalence("a".into()))
        );
    }

    #[test]
    fn ids_from_another_model_are_rejected() {
        let mut first = Model::new("first");
        let mut second = Model::new("second");
        let c = first.add_component("c").unwrap();
        let x = first.add_variable(c, "x", "dimensionless").unwrap();
        second.add_component("c").unwrap();

        assert!(!second.owns_variable(x));
        assert!(matches!(
            second.set_initial_value(x, InitialValue::Number(1.0)),
            Err(ModelError::ForeignId(_))
        ));
    }

    #[test]
    fn components_are_ordered_depth_first() {
        let mut model = Model::new("m");
        let root = model.add_component("root").unwrap();
        let other = model.add_component("other").unwrap();
        let child = model.add_child_component(root, "child").unwrap();

        assert_eq!(model.components_in_order(), vec![root, child, other]);
        assert_eq!(model.find_variable("child", "nope"), None);
    }
}
