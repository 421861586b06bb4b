//! The `modelgen_core` crate turns declarative equation-based models into
//! something executable.
//!
//! Key components:
//! - **Model**: components, variables, equivalences and equation trees (`Ast`).
//! - **Analyser**: classifies variables, orders equations and groups coupled
//!   non-linear equations into NLA systems, producing an `AnalysedModel`.
//! - **Generator**: renders an analysed model as source code through a
//!   substitutable `GeneratorProfile` (C and Python presets).
//! - **Interpreter**: evaluates an analysed model directly against numeric
//!   buffers, solving NLA systems with a pluggable `NlaSolver`.
pub mod analyser;
pub mod ast;
pub mod error;
pub mod generator;
pub mod interpreter;
pub mod issue;
pub mod model;
pub mod profile;

pub use analyser::{analyse, AnalysedModel, Analyser, ExternalVariable};
pub use generator::{Generator, VariableTracker};
pub use interpreter::Interpreter;
pub use profile::{GeneratorProfile, Profile};
