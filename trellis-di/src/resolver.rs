//! Strategies for turning a [DependencyDefinition] into a [ResolvedDependency].
//!
//! Resolvers form an ordered chain and the first one which applies to a given definition wins.
//! The built-in order is:
//!
//! 1. [NamedResolver] - definitions with an explicit element name
//! 2. custom resolvers registered on the
//! [ElementRegistryBuilder](crate::registry::ElementRegistryBuilder)
//! 3. [CollectionResolver], [OptionalResolver] and [MapResolver] - special shapes
//! 4. [TypeResolver] - a single instance looked up by type
//!
//! Before requesting an instance of another element, resolvers register the dependency in the
//! [DependencyGraph] of the current resolution, which detects cycles before they recurse.

use crate::context::ElementContext;
use crate::dependency::{DependencyDefinition, DependencyShape, ResolvedDependency};
use crate::error::ElementInstanceProviderError;
use crate::graph::DependencyGraph;
use crate::instance_provider::InjectedInstance;
use crate::registry::ElementRegistry;
use crate::type_descriptor::TypeDescriptor;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::cmp::Reverse;
use tracing::trace;

pub type DependencyResolverPtr = Box<dyn DependencyResolver + Send + Sync>;

/// Single strategy of resolving dependencies.
#[cfg_attr(test, automock)]
pub trait DependencyResolver {
    /// Resolves `definition` required by `requesting`. Returns `None` if this resolver doesn't
    /// handle the given definition, so the next one in the chain can be tried.
    fn resolve(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Option<Result<ResolvedDependency, ElementInstanceProviderError>>;
}

/// Requests an instance of `found` on behalf of `requesting` and casts it to `required`.
pub fn request_dependency(
    requesting: &ElementContext,
    found: &ElementContext,
    required: TypeDescriptor,
    registry: &ElementRegistry,
    graph: &mut DependencyGraph,
) -> Result<InjectedInstance, ElementInstanceProviderError> {
    let cast = found.descriptor().cast_for(required).ok_or_else(|| {
        ElementInstanceProviderError::IncompatibleElement {
            name: found.name().to_string(),
            required: required.name().to_string(),
        }
    })?;

    graph.add_dependency(requesting.name(), found.name())?;

    let instance = found.request_instance(registry, graph)?;
    InjectedInstance::new(found.name(), required, instance, cast)
}

fn request_all(
    requesting: &ElementContext,
    found: &[&ElementContext],
    required: TypeDescriptor,
    registry: &ElementRegistry,
    graph: &mut DependencyGraph,
) -> Result<Vec<InjectedInstance>, ElementInstanceProviderError> {
    found
        .iter()
        .map(|context| request_dependency(requesting, context, required, registry, graph))
        .try_collect()
}

/// Resolves definitions with an explicit element name. The instance is wrapped in whatever shape
/// was requested.
#[derive(Clone, Copy, Default, Debug)]
pub struct NamedResolver;

impl DependencyResolver for NamedResolver {
    fn resolve(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Option<Result<ResolvedDependency, ElementInstanceProviderError>> {
        let name = definition.explicit_name.as_deref()?;

        trace!(name, requesting = requesting.name(), "Resolving named dependency.");

        Some(
            registry
                .context_by_name(name)
                .ok_or_else(|| ElementInstanceProviderError::NoNamedInstance(name.to_string()))
                .and_then(|found| {
                    request_dependency(
                        requesting,
                        found,
                        definition.required_type,
                        registry,
                        graph,
                    )
                })
                .map(|instance| ResolvedDependency::shaped(instance, definition.shape)),
        )
    }
}

/// Resolves collections of all elements assignable to the required type, ordered by priority
/// descending. Elements with the same priority keep registration order.
#[derive(Clone, Copy, Default, Debug)]
pub struct CollectionResolver;

impl DependencyResolver for CollectionResolver {
    fn resolve(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Option<Result<ResolvedDependency, ElementInstanceProviderError>> {
        if definition.shape != DependencyShape::Collection {
            return None;
        }

        let found = registry
            .contexts_by_type(definition.required_type)
            .into_iter()
            .sorted_by_key(|context| Reverse(context.descriptor().priority))
            .collect_vec();

        Some(
            request_all(
                requesting,
                &found,
                definition.required_type,
                registry,
                graph,
            )
            .map(ResolvedDependency::Collection),
        )
    }
}

/// Resolves optional instances. Missing elements resolve to `None`, but ambiguity is still an
/// error.
#[derive(Clone, Copy, Default, Debug)]
pub struct OptionalResolver;

impl DependencyResolver for OptionalResolver {
    fn resolve(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Option<Result<ResolvedDependency, ElementInstanceProviderError>> {
        if definition.shape != DependencyShape::Optional {
            return None;
        }

        let resolved = registry
            .primary_context(definition.required_type)
            .and_then(|found| {
                found
                    .map(|found| {
                        request_dependency(
                            requesting,
                            found,
                            definition.required_type,
                            registry,
                            graph,
                        )
                    })
                    .transpose()
            })
            .map(ResolvedDependency::Optional);

        Some(resolved)
    }
}

/// Resolves maps of element name to instance for all elements assignable to the required type.
#[derive(Clone, Copy, Default, Debug)]
pub struct MapResolver;

impl DependencyResolver for MapResolver {
    fn resolve(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Option<Result<ResolvedDependency, ElementInstanceProviderError>> {
        if definition.shape != DependencyShape::Map {
            return None;
        }

        let found = registry.contexts_by_type(definition.required_type);
        Some(
            request_all(
                requesting,
                &found,
                definition.required_type,
                registry,
                graph,
            )
            .map(|instances| {
                ResolvedDependency::Map(
                    instances
                        .into_iter()
                        .map(|instance| (instance.name().to_string(), instance))
                        .collect(),
                )
            }),
        )
    }
}

/// Resolves a single instance by type: either the only assignable element or the single primary
/// one among several.
#[derive(Clone, Copy, Default, Debug)]
pub struct TypeResolver;

impl DependencyResolver for TypeResolver {
    fn resolve(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Option<Result<ResolvedDependency, ElementInstanceProviderError>> {
        let resolved = registry
            .primary_context(definition.required_type)
            .and_then(|found| {
                found.ok_or_else(|| ElementInstanceProviderError::UnresolvedDependency {
                    required: definition.required_type.name().to_string(),
                    owner: requesting.name().to_string(),
                })
            })
            .and_then(|found| {
                request_dependency(
                    requesting,
                    found,
                    definition.required_type,
                    registry,
                    graph,
                )
            })
            .map(|instance| ResolvedDependency::shaped(instance, definition.shape));

        Some(resolved)
    }
}

/// Ordered chain of [DependencyResolver]s.
pub struct ResolverChain {
    resolvers: Vec<DependencyResolverPtr>,
}

impl ResolverChain {
    /// Creates the built-in chain with `custom` resolvers placed after named lookup.
    pub fn new(custom: Vec<DependencyResolverPtr>) -> Self {
        let mut resolvers = vec![Box::new(NamedResolver) as DependencyResolverPtr];
        resolvers.extend(custom);
        resolvers.extend([
            Box::new(CollectionResolver) as DependencyResolverPtr,
            Box::new(OptionalResolver) as DependencyResolverPtr,
            Box::new(MapResolver) as DependencyResolverPtr,
            Box::new(TypeResolver) as DependencyResolverPtr,
        ]);

        Self { resolvers }
    }

    /// Resolves `definition` with the first applicable resolver.
    pub fn resolve(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Result<ResolvedDependency, ElementInstanceProviderError> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.resolve(definition, requesting, registry, graph))
            .unwrap_or_else(|| {
                Err(ElementInstanceProviderError::UnresolvedDependency {
                    required: definition.required_type.name().to_string(),
                    owner: requesting.name().to_string(),
                })
            })
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new(vec![])
    }
}
