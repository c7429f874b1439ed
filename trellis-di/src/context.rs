//! Stateful wrapper around a single element.

use crate::assembler;
use crate::element::ElementDescriptor;
use crate::error::ElementInstanceProviderError;
use crate::graph::DependencyGraph;
use crate::instance_provider::ElementInstanceAnyPtr;
use crate::registry::ElementRegistry;
use crate::scope::{Scope, ScopedInstance};
use tracing::debug;

/// Owns an [ElementDescriptor] and the instance storage required by its scope. All instance
/// requests for the element go through its context.
#[derive(Debug)]
pub struct ElementContext {
    descriptor: ElementDescriptor,
    instance: ScopedInstance,
}

impl ElementContext {
    pub fn new(descriptor: ElementDescriptor) -> Self {
        let instance = ScopedInstance::new(descriptor.scope);
        Self {
            descriptor,
            instance,
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &ElementDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Checks if a singleton instance has already been created.
    #[inline]
    pub fn has_instance(&self) -> bool {
        self.instance.cached().is_some()
    }

    /// Returns an instance of this element. An existing singleton instance is returned without
    /// any resolution work. Otherwise, a new instance is assembled using `graph`, which should be
    /// the graph of the resolution in progress, then post-processed and stored if it's a
    /// singleton. Nothing is stored on failure.
    pub fn request_instance(
        &self,
        registry: &ElementRegistry,
        graph: &mut DependencyGraph,
    ) -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError> {
        if let Some(instance) = self.instance.cached() {
            return Ok(instance);
        }

        let tracker = registry.construction_tracker();
        self.instance.get_or_create(tracker, self.name(), || {
            debug!(
                name = self.name(),
                scope = %self.descriptor.scope,
                "Creating new element instance."
            );

            let instance = assembler::assemble(self, registry, graph)?;
            registry
                .post_processors()
                .post_process(self, &instance, registry, graph)?;

            Ok(instance)
        })
    }

    /// Eagerly creates a singleton instance, if not created yet. Does nothing for prototypes.
    pub fn initialize(
        &self,
        registry: &ElementRegistry,
    ) -> Result<(), ElementInstanceProviderError> {
        if self.descriptor.scope != Scope::Singleton || self.has_instance() {
            return Ok(());
        }

        debug!(name = self.name(), "Initializing singleton element.");

        self.request_instance(registry, &mut DependencyGraph::empty())
            .map(|_| ())
    }
}
