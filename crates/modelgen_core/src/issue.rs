use crate::model::VariableId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Error,
    Warning,
    Message,
}

/// What an [`Issue`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    EquationNotEquality,
    UndeclaredVariable,
    VariableInitialisedMoreThanOnce,
    NonConstantInitialisation,
    VoiInitialised,
    VoiSeveral,
    OdeNotFirstOrder,
    VariableUnused,
    StateNotInitialised,
    VariableComputedMoreThanOnce,
    ExternalVariableDifferentModel,
    ExternalVariableVoi,
    ExternalVariableUsePrimaryVariable,
    UntrackableVariable,
}

/// A problem found while analysing a model or tracking its variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub level: Level,
    pub kind: IssueKind,
    pub description: String,
    pub variable: Option<VariableId>,
}

impl Issue {
    pub fn error(kind: IssueKind, description: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            kind,
            description: description.into(),
            variable: None,
        }
    }

    pub fn message(kind: IssueKind, description: impl Into<String>) -> Self {
        Self {
            level: Level::Message,
            ..Self::error(kind, description)
        }
    }

    pub fn with_variable(mut self, variable: VariableId) -> Self {
        self.variable = Some(variable);
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Issues collected during one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Issues {
    items: Vec<Issue>,
}

impl Issues {
    pub fn push(&mut self, issue: Issue) {
        tracing::debug!(level = ?issue.level, kind = ?issue.kind, "{}", issue.description);
        self.items.push(issue);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Issue> {
        self.items.get(index)
    }

    pub fn count(&self, level: Level) -> usize {
        self.items.iter().filter(|i| i.level == level).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Level::Error)
    }

    pub fn message_count(&self) -> usize {
        self.count(Level::Message)
    }

    pub fn as_slice(&self) -> &[Issue] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a Issues {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
