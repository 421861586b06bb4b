use thiserror::Error;

/// Errors raised while building a [`crate::model::Model`].
///
/// Analysis, generation and interpretation never fail through `Result`; they
/// report problems as issues or propagate NaN instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("component '{0}' already exists")]
    DuplicateComponent(String),

    #[error("variable '{variable}' already exists in component '{component}'")]
    DuplicateVariable { component: String, variable: String },

    #[error("no component named '{0}'")]
    UnknownComponent(String),

    #[error("no variable named '{variable}' in component '{component}'")]
    UnknownVariable { component: String, variable: String },

    #[error("{0} does not belong to this model")]
    ForeignId(String),

    #[error("variable '{0}' cannot be made equivalent to itself")]
    SelfEquivalence(String),
}
