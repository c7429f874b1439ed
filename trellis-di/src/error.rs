use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

/// Type-erased error returned by user-supplied constructors, factory methods and hooks.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Strategy used to build an element instance, reported in assembly errors.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AssemblyStrategy {
    Constructor,
    FactoryMethod,
}

impl Display for AssemblyStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AssemblyStrategy::Constructor => write!(f, "constructor"),
            AssemblyStrategy::FactoryMethod => write!(f, "factory method"),
        }
    }
}

/// Errors related to creating and managing element instances.
#[derive(Error, Clone, Debug)]
pub enum ElementInstanceProviderError {
    #[error("Circular dependency detected between elements: {0:?}")]
    DependencyCycle(BTreeSet<String>),
    #[error("Cannot find any element of type {required} required by {owner}")]
    UnresolvedDependency { required: String, owner: String },
    #[error("Found multiple candidates of type {required} without disambiguation: {candidates:?}")]
    AmbiguousType {
        required: String,
        candidates: Vec<String>,
    },
    #[error("Cannot find named element: {0}")]
    NoNamedInstance(String),
    #[error("Element '{name}' is not assignable to type {required}")]
    IncompatibleElement { name: String, required: String },
    #[error("Cannot assemble element '{name}' of type {produced_type} using {strategy}: {source}")]
    Assembly {
        name: String,
        produced_type: String,
        strategy: AssemblyStrategy,
        #[source]
        source: Box<ElementInstanceProviderError>,
    },
    #[error("Cannot resolve {dependency} of {owner}: {source}")]
    Dependency {
        owner: String,
        dependency: String,
        #[source]
        source: Box<ElementInstanceProviderError>,
    },
    #[error("Invalid definition of '{member}' in element '{name}': {reason}")]
    Definition {
        name: String,
        member: String,
        reason: String,
    },
    #[error("Expected argument of {expected}, but got {actual}")]
    ArgumentMismatch { expected: String, actual: String },
    #[error("Error raised by element code: {0}")]
    ConstructorError(#[from] ErrorPtr),
}

impl ElementInstanceProviderError {
    /// Returns the innermost error, skipping [Assembly](Self::Assembly) and
    /// [Dependency](Self::Dependency) context wrappers.
    pub fn root_cause(&self) -> &ElementInstanceProviderError {
        let mut current = self;
        loop {
            match current {
                ElementInstanceProviderError::Assembly { source, .. }
                | ElementInstanceProviderError::Dependency { source, .. } => current = source,
                _ => return current,
            }
        }
    }
}

/// Error related to element registries.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ElementDefinitionRegistryError {
    #[error("Attempted to register a duplicated element with name: {0}")]
    DuplicateElementName(String),
}
