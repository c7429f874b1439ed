//! Post-processing of newly created element instances.
//!
//! Every new instance, before being returned or cached, goes through a pipeline of
//! [ElementPostProcessor]s sorted by priority. The first failure aborts instance creation. Two
//! post-processors are always registered by
//! [ElementRegistryBuilder](crate::registry::ElementRegistryBuilder):
//!
//! * [FieldInjectionPostProcessor] - resolves and sets
//!   [injected fields](crate::element::FieldDescriptor)
//! * [LifecycleHookPostProcessor] - invokes [lifecycle hooks](crate::element::LifecycleHook)

use crate::context::ElementContext;
use crate::error::ElementInstanceProviderError;
use crate::graph::DependencyGraph;
use crate::instance_provider::ElementInstanceAnyPtr;
use crate::registry::ElementRegistry;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::cmp::Reverse;
use tracing::trace;

pub type ElementPostProcessorPtr = Box<dyn ElementPostProcessor + Send + Sync>;

pub const FIELD_INJECTION_PRIORITY: i8 = 64;
pub const LIFECYCLE_HOOK_PRIORITY: i8 = -64;

/// Processes new element instances.
#[cfg_attr(test, automock)]
pub trait ElementPostProcessor {
    /// Post-processors with higher priority run first. Default 0.
    fn priority(&self) -> i8 {
        0
    }

    /// Processes a new `instance` of the element owned by `context`. Dependencies should be
    /// resolved with [ElementRegistry::resolve_dependency] and the given `graph`, which belongs
    /// to the resolution in progress. Top-level requests like [ElementRegistry::get] start a new
    /// graph, so requesting the element under construction that way fails with
    /// [DependencyCycle](ElementInstanceProviderError::DependencyCycle).
    fn post_process(
        &self,
        context: &ElementContext,
        instance: &ElementInstanceAnyPtr,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Result<(), ElementInstanceProviderError>;
}

/// Ordered set of [ElementPostProcessor]s.
pub struct PostProcessorPipeline {
    post_processors: Vec<ElementPostProcessorPtr>,
}

impl PostProcessorPipeline {
    pub fn new(post_processors: Vec<ElementPostProcessorPtr>) -> Self {
        Self {
            post_processors: post_processors
                .into_iter()
                .sorted_by_key(|post_processor| Reverse(post_processor.priority()))
                .collect(),
        }
    }

    /// Runs all post-processors in order, stopping at the first error.
    pub fn post_process(
        &self,
        context: &ElementContext,
        instance: &ElementInstanceAnyPtr,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Result<(), ElementInstanceProviderError> {
        self.post_processors
            .iter()
            .try_for_each(|post_processor| {
                post_processor.post_process(context, instance, registry, graph)
            })
    }
}

/// Sets injected fields declared by the element. Static fields cannot be injected.
#[derive(Clone, Copy, Default, Debug)]
pub struct FieldInjectionPostProcessor;

impl ElementPostProcessor for FieldInjectionPostProcessor {
    fn priority(&self) -> i8 {
        FIELD_INJECTION_PRIORITY
    }

    fn post_process(
        &self,
        context: &ElementContext,
        instance: &ElementInstanceAnyPtr,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Result<(), ElementInstanceProviderError> {
        for field in &context.descriptor().fields {
            if field.modifiers.is_static {
                return Err(ElementInstanceProviderError::Definition {
                    name: context.name().to_string(),
                    member: field.name.clone(),
                    reason: "static fields cannot be injected".to_string(),
                });
            }

            trace!(name = context.name(), field = field.name.as_str(), "Injecting field.");

            let resolved = registry
                .resolve_dependency(&field.definition, context, graph)
                .map_err(|error| ElementInstanceProviderError::Dependency {
                    owner: context.name().to_string(),
                    dependency: format!(
                        "{} ({})",
                        field.definition.owner_description, field.definition
                    ),
                    source: Box::new(error),
                })?;

            field.inject(instance, resolved)?;
        }

        Ok(())
    }
}

/// Invokes lifecycle hooks in declaration order. Only parameterless, non-static and non-abstract
/// hooks can be invoked.
#[derive(Clone, Copy, Default, Debug)]
pub struct LifecycleHookPostProcessor;

impl ElementPostProcessor for LifecycleHookPostProcessor {
    fn priority(&self) -> i8 {
        LIFECYCLE_HOOK_PRIORITY
    }

    fn post_process(
        &self,
        context: &ElementContext,
        instance: &ElementInstanceAnyPtr,
        _registry: &ElementRegistry,
        _graph: &mut DependencyGraph,
    ) -> Result<(), ElementInstanceProviderError> {
        for hook in &context.descriptor().hooks {
            let reason = if hook.parameter_count > 0 {
                Some("lifecycle hooks cannot have parameters")
            } else if hook.modifiers.is_static {
                Some("lifecycle hooks cannot be static")
            } else if hook.modifiers.is_abstract {
                Some("lifecycle hooks cannot be abstract")
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(ElementInstanceProviderError::Definition {
                    name: context.name().to_string(),
                    member: hook.name.clone(),
                    reason: reason.to_string(),
                });
            }

            trace!(name = context.name(), hook = hook.name.as_str(), "Invoking lifecycle hook.");

            hook.invoke(instance)?;
        }

        Ok(())
    }
}
