//! Element resolution and assembly engine for dependency injection.
//!
//! Applications hand their building blocks to the engine as [elements](element) - named units
//! described by metadata and a way to construct them. Elements which survive
//! [filtering](filter) are registered in an [ElementRegistry](registry::ElementRegistry), which
//! then resolves dependencies between them, builds instances on demand and keeps them according
//! to their [scope]. Circular dependencies are detected while resolving and reported with all
//! participating elements.
//!
//! Dependencies can be injected as:
//!
//! * a single instance - `ElementInstancePtr<T>`
//! * all matching instances ordered by priority - `Vec<ElementInstancePtr<T>>`
//! * an instance which might not exist - `Option<ElementInstancePtr<T>>`
//! * all matching instances keyed by element name - `HashMap<String, ElementInstancePtr<T>>`
//!
//! where `T` is either a concrete element type or an alias type, usually `dyn Trait + Send + Sync`.

mod assembler;
mod construction;
pub mod context;
pub mod dependency;
pub mod element;
mod error;
pub mod filter;
pub mod graph;
pub mod instance_provider;
pub mod post_processor;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod type_descriptor;

pub use error::{
    AssemblyStrategy, ElementDefinitionRegistryError, ElementInstanceProviderError, ErrorPtr,
};
