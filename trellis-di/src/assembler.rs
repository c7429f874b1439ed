//! Builds new element instances by invoking constructors or factory methods with resolved
//! dependencies.

use crate::context::ElementContext;
use crate::dependency::{Arguments, DependencyDefinition, ResolvedDependency};
use crate::element::ConstructionSource;
use crate::error::ElementInstanceProviderError;
use crate::graph::DependencyGraph;
use crate::instance_provider::ElementInstanceAnyPtr;
use crate::registry::ElementRegistry;
use itertools::Itertools;
use tracing::trace;

/// Assembles a new instance of the element owned by `context`. For factory methods, the parent
/// element is resolved first. Construction parameters are then resolved in declaration order and
/// passed positionally. Any failure is reported as
/// [Assembly](ElementInstanceProviderError::Assembly) with the original cause preserved.
pub(crate) fn assemble(
    context: &ElementContext,
    registry: &ElementRegistry,
    graph: &mut DependencyGraph,
) -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError> {
    let descriptor = context.descriptor();
    build(context, registry, graph).map_err(|error| ElementInstanceProviderError::Assembly {
        name: descriptor.name.clone(),
        produced_type: descriptor.produced_type.name().to_string(),
        strategy: descriptor.strategy(),
        source: Box::new(error),
    })
}

fn build(
    context: &ElementContext,
    registry: &ElementRegistry,
    graph: &mut DependencyGraph,
) -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError> {
    match &context.descriptor().construction {
        ConstructionSource::Constructor(constructor) => {
            let mut arguments = resolve_arguments(context, registry, graph)?;
            constructor(&mut arguments)
        }
        ConstructionSource::FactoryMethod {
            method_name,
            parent,
            method,
        } => {
            trace!(
                name = context.name(),
                method_name = method_name.as_str(),
                "Resolving factory method parent."
            );

            let parent = match resolve(parent, context, registry, graph)? {
                ResolvedDependency::Single(parent) => parent,
                resolved => {
                    return Err(ElementInstanceProviderError::ArgumentMismatch {
                        expected: format!("single parent instance of {}", parent.required_type),
                        actual: resolved.shape().to_string(),
                    })
                }
            };

            let mut arguments = resolve_arguments(context, registry, graph)?;
            method(parent, &mut arguments)
        }
    }
}

fn resolve_arguments(
    context: &ElementContext,
    registry: &ElementRegistry,
    graph: &mut DependencyGraph,
) -> Result<Arguments, ElementInstanceProviderError> {
    context
        .descriptor()
        .parameters
        .iter()
        .map(|definition| resolve(definition, context, registry, graph))
        .try_collect()
        .map(Arguments::new)
}

fn resolve(
    definition: &DependencyDefinition,
    context: &ElementContext,
    registry: &ElementRegistry,
    graph: &mut DependencyGraph,
) -> Result<ResolvedDependency, ElementInstanceProviderError> {
    registry
        .resolve_dependency(definition, context, graph)
        .map_err(|error| ElementInstanceProviderError::Dependency {
            owner: context.name().to_string(),
            dependency: format!("{} ({})", definition.owner_description, definition),
            source: Box::new(error),
        })
}
