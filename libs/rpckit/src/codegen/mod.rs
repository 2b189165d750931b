//! Client generation from an introspection [`Document`].

mod python;

pub use python::{python_type, PythonClientGenerator};

use thiserror::Error;

use crate::introspection::Document;

/// Generation failed; fatal to that one generation request only.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("Type {kind} not supported")]
    UnsupportedType { kind: String },

    #[error("Name {name} is not a valid Python identifier")]
    InvalidName { name: String },

    #[error("failed to render client source")]
    Format(#[from] std::fmt::Error),
}

/// A target language for generated clients.
pub trait ClientGenerator: Send + Sync {
    /// Short language tag, used in routes and logs.
    fn language(&self) -> &'static str;

    /// Media type of the generated source.
    fn content_type(&self) -> &'static str;

    fn generate(&self, document: &Document) -> Result<String, CodegenError>;
}
