//! The element registry - container of all [element contexts](ElementContext) of an application
//! and the query surface for element instances.
//!
//! Registries are created with an [ElementRegistryBuilder], which passes discovered elements
//! through the [context filters](crate::filter) and sets up the
//! [resolver chain](crate::resolver) and [post-processors](crate::post_processor):
//!
//! ```
//! use trellis_di::element::{ElementSeed, ElementSource};
//! use trellis_di::instance_provider::{ElementInstancePtr, TypedElementInstanceProvider};
//! use trellis_di::registry::ElementRegistryBuilder;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Client {
//!     config: ElementInstancePtr<Config>,
//! }
//!
//! let registry = ElementRegistryBuilder::default()
//!     .with_element(
//!         ElementSeed::new("config"),
//!         ElementSource::constructor(|_| {
//!             Ok(Config {
//!                 url: "localhost".to_string(),
//!             })
//!         }),
//!     )
//!     .with_element(
//!         ElementSeed::new("client"),
//!         ElementSource::constructor(|arguments| {
//!             Ok(Client {
//!                 config: arguments.take()?,
//!             })
//!         })
//!         .with_parameter::<ElementInstancePtr<Config>>(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let client = registry.primary_instance_typed::<Client>().unwrap();
//! assert_eq!(client.config.url, "localhost");
//! ```

use crate::construction::ConstructionTracker;
use crate::context::ElementContext;
use crate::dependency::{DependencyDefinition, ResolvedDependency};
use crate::element::{ElementDescriptor, ElementSeed, ElementSource};
use crate::error::{ElementDefinitionRegistryError, ElementInstanceProviderError};
use crate::filter::{ActivationState, ContextFilterPipeline, ContextFilterPtr, ProfileFilter};
use crate::graph::DependencyGraph;
use crate::instance_provider::{ElementInstanceAnyPtr, ElementInstanceProvider, InjectedInstance};
use crate::post_processor::{
    ElementPostProcessorPtr, FieldInjectionPostProcessor, LifecycleHookPostProcessor,
    PostProcessorPipeline,
};
use crate::resolver::{DependencyResolverPtr, ResolverChain};
use crate::type_descriptor::TypeDescriptor;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::cmp::Reverse;
use tracing::debug;

const REGISTRY_OWNER: &str = "registry";

/// Builder for [ElementRegistry] with sensible defaults: [ProfileFilter] with no active
/// profiles, field injection and lifecycle hook post-processors, and built-in resolvers.
pub struct ElementRegistryBuilder {
    activation: ActivationState,
    filters: Vec<ContextFilterPtr>,
    post_processors: Vec<ElementPostProcessorPtr>,
    resolvers: Vec<DependencyResolverPtr>,
    descriptors: Vec<ElementDescriptor>,
}

impl ElementRegistryBuilder {
    /// Sets the activation state used by context filters.
    pub fn with_activation_state(mut self, activation: ActivationState) -> Self {
        self.activation = activation;
        self
    }

    /// Shorthand for setting active profiles in the activation state.
    pub fn with_active_profiles<I, T>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.activation = ActivationState::new(profiles);
        self
    }

    /// Adds a new context filter.
    pub fn with_filter(mut self, filter: ContextFilterPtr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds a new post-processor.
    pub fn with_post_processor(mut self, post_processor: ElementPostProcessorPtr) -> Self {
        self.post_processors.push(post_processor);
        self
    }

    /// Adds a custom resolver, consulted after named lookup and before built-in resolvers.
    pub fn with_resolver(mut self, resolver: DependencyResolverPtr) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Adds an element built from its metadata and source.
    pub fn with_element(self, seed: ElementSeed, source: ElementSource) -> Self {
        self.with_descriptor(ElementDescriptor::new(seed, source))
    }

    pub fn with_descriptor(mut self, descriptor: ElementDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Adds multiple elements, keeping their order.
    pub fn with_elements<I>(self, elements: I) -> Self
    where
        I: IntoIterator<Item = (ElementSeed, ElementSource)>,
    {
        elements
            .into_iter()
            .fold(self, |builder, (seed, source)| builder.with_element(seed, source))
    }

    /// Builds resulting [ElementRegistry]. Elements discarded by filters are skipped, and names of
    /// the remaining ones need to be unique.
    pub fn build(self) -> Result<ElementRegistry, ElementDefinitionRegistryError> {
        let filters = ContextFilterPipeline::new(self.filters);

        let mut contexts = Vec::with_capacity(self.descriptors.len());
        let mut names = FxHashMap::default();
        let mut types: FxHashMap<TypeDescriptor, Vec<usize>> = FxHashMap::default();

        for descriptor in self.descriptors {
            if filters.discard(&descriptor, &self.activation) {
                debug!(name = descriptor.name.as_str(), "Discarding filtered element.");
                continue;
            }

            if names.contains_key(&descriptor.name) {
                return Err(ElementDefinitionRegistryError::DuplicateElementName(
                    descriptor.name,
                ));
            }

            debug!(
                name = descriptor.name.as_str(),
                produced_type = %descriptor.produced_type,
                scope = %descriptor.scope,
                "Registering element."
            );

            let index = contexts.len();
            names.insert(descriptor.name.clone(), index);

            for alias_type in descriptor
                .aliases
                .iter()
                .map(|alias| alias.alias_type)
                .unique()
            {
                types.entry(alias_type).or_default().push(index);
            }

            contexts.push(ElementContext::new(descriptor));
        }

        Ok(ElementRegistry {
            contexts,
            names,
            types,
            resolvers: ResolverChain::new(self.resolvers),
            post_processors: PostProcessorPipeline::new(self.post_processors),
            construction: ConstructionTracker::default(),
        })
    }
}

impl Default for ElementRegistryBuilder {
    fn default() -> Self {
        Self {
            activation: ActivationState::default(),
            filters: vec![Box::new(ProfileFilter) as ContextFilterPtr],
            post_processors: vec![
                Box::new(FieldInjectionPostProcessor) as ElementPostProcessorPtr,
                Box::new(LifecycleHookPostProcessor) as ElementPostProcessorPtr,
            ],
            resolvers: vec![],
            descriptors: vec![],
        }
    }
}

/// Name-keyed collection of [ElementContext]s. Immutable after construction, apart from singleton
/// instances stored by the contexts, so it can be freely shared between threads.
pub struct ElementRegistry {
    contexts: Vec<ElementContext>,
    names: FxHashMap<String, usize>,
    types: FxHashMap<TypeDescriptor, Vec<usize>>,
    resolvers: ResolverChain,
    post_processors: PostProcessorPipeline,
    construction: ConstructionTracker,
}

impl ElementRegistry {
    /// Returns an instance of the element with given name.
    pub fn get(&self, name: &str) -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError> {
        self.context_by_name(name)
            .ok_or_else(|| ElementInstanceProviderError::NoNamedInstance(name.to_string()))?
            .request_instance(self, &mut DependencyGraph::empty())
    }

    /// Returns an instance of the primary element assignable to `required`.
    #[inline]
    pub fn get_by_type(
        &self,
        required: TypeDescriptor,
    ) -> Result<InjectedInstance, ElementInstanceProviderError> {
        self.primary_instance(required)
    }

    /// Number of registered elements.
    #[inline]
    pub fn count(&self) -> usize {
        self.contexts.len()
    }

    /// All contexts in registration order.
    #[inline]
    pub fn contexts(&self) -> &[ElementContext] {
        &self.contexts
    }

    pub fn context_by_name(&self, name: &str) -> Option<&ElementContext> {
        self.names.get(name).map(|index| &self.contexts[*index])
    }

    /// Returns contexts of all elements assignable to `required`, in registration order.
    pub fn contexts_by_type(&self, required: TypeDescriptor) -> Vec<&ElementContext> {
        self.types
            .get(&required)
            .map(|indices| indices.iter().map(|index| &self.contexts[*index]).collect())
            .unwrap_or_default()
    }

    /// Returns the primary context for `required`: the only assignable one, or the single one
    /// marked as primary among many. Returns `None` if no element is assignable.
    pub fn primary_context(
        &self,
        required: TypeDescriptor,
    ) -> Result<Option<&ElementContext>, ElementInstanceProviderError> {
        let candidates = self.contexts_by_type(required);
        match candidates.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            _ => {
                let primary = candidates
                    .iter()
                    .filter(|context| context.descriptor().primary)
                    .collect_vec();

                if let [primary] = primary.as_slice() {
                    Ok(Some(**primary))
                } else {
                    Err(ElementInstanceProviderError::AmbiguousType {
                        required: required.name().to_string(),
                        candidates: candidates
                            .iter()
                            .map(|context| context.name().to_string())
                            .collect(),
                    })
                }
            }
        }
    }

    /// Resolves a dependency of `requesting` through the resolver chain.
    pub fn resolve_dependency(
        &self,
        definition: &DependencyDefinition,
        requesting: &ElementContext,
        graph: &mut DependencyGraph,
    ) -> Result<ResolvedDependency, ElementInstanceProviderError> {
        self.resolvers.resolve(definition, requesting, self, graph)
    }

    #[inline]
    pub fn post_processors(&self) -> &PostProcessorPipeline {
        &self.post_processors
    }

    #[inline]
    pub(crate) fn construction_tracker(&self) -> &ConstructionTracker {
        &self.construction
    }

    /// Eagerly creates all singleton instances, in registration order.
    pub fn initialize(&self) -> Result<(), ElementInstanceProviderError> {
        debug!(count = self.count(), "Initializing singleton elements.");

        self.contexts
            .iter()
            .try_for_each(|context| context.initialize(self))
    }

    /// Releases all contexts and their instances. No ordering of instance destruction is
    /// guaranteed, and instances still referenced elsewhere outlive the registry.
    pub fn shutdown(self) {
        debug!(count = self.count(), "Shutting down element registry.");
    }

    fn request_typed(
        &self,
        context: &ElementContext,
        required: TypeDescriptor,
        graph: &mut DependencyGraph,
    ) -> Result<InjectedInstance, ElementInstanceProviderError> {
        let cast = context.descriptor().cast_for(required).ok_or_else(|| {
            ElementInstanceProviderError::IncompatibleElement {
                name: context.name().to_string(),
                required: required.name().to_string(),
            }
        })?;

        let instance = context.request_instance(self, graph)?;
        InjectedInstance::new(context.name(), required, instance, cast)
    }
}

impl ElementInstanceProvider for ElementRegistry {
    fn primary_instance(
        &self,
        required: TypeDescriptor,
    ) -> Result<InjectedInstance, ElementInstanceProviderError> {
        let context = self.primary_context(required)?.ok_or_else(|| {
            ElementInstanceProviderError::UnresolvedDependency {
                required: required.name().to_string(),
                owner: REGISTRY_OWNER.to_string(),
            }
        })?;

        self.request_typed(context, required, &mut DependencyGraph::empty())
    }

    fn instances(
        &self,
        required: TypeDescriptor,
    ) -> Result<Vec<InjectedInstance>, ElementInstanceProviderError> {
        let mut graph = DependencyGraph::empty();
        self.contexts_by_type(required)
            .into_iter()
            .sorted_by_key(|context| Reverse(context.descriptor().priority))
            .map(|context| self.request_typed(context, required, &mut graph))
            .try_collect()
    }

    fn instance_by_name(
        &self,
        name: &str,
        required: TypeDescriptor,
    ) -> Result<InjectedInstance, ElementInstanceProviderError> {
        let context = self
            .context_by_name(name)
            .ok_or_else(|| ElementInstanceProviderError::NoNamedInstance(name.to_string()))?;

        self.request_typed(context, required, &mut DependencyGraph::empty())
    }
}

#[cfg(test)]
mod tests {
    use crate::element::{ElementSeed, ElementSource};
    use crate::error::{ElementDefinitionRegistryError, ElementInstanceProviderError};
    use crate::filter::{ActivationState, ContextFilterPtr, MockContextFilter};
    use crate::instance_provider::{ElementInstanceProvider, TypedElementInstanceProvider};
    use crate::registry::ElementRegistryBuilder;
    use crate::scope::Scope;
    use crate::type_descriptor::TypeDescriptor;

    trait Named: Send + Sync {
        fn label(&self) -> &'static str;
    }

    struct First;

    impl Named for First {
        fn label(&self) -> &'static str {
            "first"
        }
    }

    struct Second;

    impl Named for Second {
        fn label(&self) -> &'static str {
            "second"
        }
    }

    fn first() -> ElementSource {
        ElementSource::constructor(|_| Ok(First))
            .with_alias::<dyn Named>(crate::alias_cast!(First => dyn Named))
    }

    fn second() -> ElementSource {
        ElementSource::constructor(|_| Ok(Second))
            .with_alias::<dyn Named>(crate::alias_cast!(Second => dyn Named))
    }

    #[test]
    fn should_register_elements() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("first"), first())
            .with_element(ElementSeed::new("second"), second())
            .build()
            .unwrap();

        assert_eq!(registry.count(), 2);
        assert!(registry.context_by_name("first").is_some());
        assert!(registry.context_by_name("third").is_none());
        assert_eq!(
            registry
                .contexts_by_type(TypeDescriptor::of::<dyn Named>())
                .iter()
                .map(|context| context.name())
                .collect::<Vec<_>>(),
            vec!["first", "second"]
        );
        assert_eq!(
            registry.contexts_by_type(TypeDescriptor::of::<First>()).len(),
            1
        );
    }

    #[test]
    fn should_reject_duplicate_names() {
        let result = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("a"), first())
            .with_element(ElementSeed::new("a"), second())
            .build();

        assert_eq!(
            result.err(),
            Some(ElementDefinitionRegistryError::DuplicateElementName(
                "a".to_string()
            ))
        );
    }

    #[test]
    fn should_allow_duplicate_names_of_discarded_elements() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("a").with_required_profile("dev"), first())
            .with_element(ElementSeed::new("a").with_forbidden_profile("dev"), second())
            .with_active_profiles(["dev"])
            .build()
            .unwrap();

        assert_eq!(registry.count(), 1);
        assert_eq!(
            registry
                .instance_by_name_typed::<dyn Named>("a")
                .unwrap()
                .label(),
            "first"
        );
    }

    #[test]
    fn should_apply_custom_filters() {
        let mut filter = MockContextFilter::new();
        filter.expect_priority().return_const(0i8);
        filter
            .expect_discard()
            .returning(|descriptor, _| descriptor.name == "second");

        let registry = ElementRegistryBuilder::default()
            .with_filter(Box::new(filter) as ContextFilterPtr)
            .with_element(ElementSeed::new("first"), first())
            .with_element(ElementSeed::new("second"), second())
            .build()
            .unwrap();

        assert_eq!(registry.count(), 1);
        assert!(registry.context_by_name("second").is_none());
    }

    #[test]
    fn should_get_by_name() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("first"), first())
            .build()
            .unwrap();

        assert!(registry.get("first").unwrap().downcast::<First>().is_ok());
        assert!(matches!(
            registry.get("missing").unwrap_err(),
            ElementInstanceProviderError::NoNamedInstance(name) if name == "missing"
        ));
    }

    #[test]
    fn should_get_by_type() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("first"), first())
            .with_element(ElementSeed::new("second").primary(), second())
            .build()
            .unwrap();

        let instance = registry
            .get_by_type(TypeDescriptor::of::<dyn Named>())
            .unwrap();
        assert_eq!(instance.name(), "second");
        assert_eq!(registry.primary_instance_typed::<First>().unwrap().label(), "first");
    }

    #[test]
    fn should_report_ambiguous_type() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("first"), first())
            .with_element(ElementSeed::new("second"), second())
            .build()
            .unwrap();

        assert!(matches!(
            registry
                .get_by_type(TypeDescriptor::of::<dyn Named>())
                .unwrap_err(),
            ElementInstanceProviderError::AmbiguousType { candidates, .. }
                if candidates == ["first", "second"]
        ));
    }

    #[test]
    fn should_report_missing_type() {
        let registry = ElementRegistryBuilder::default().build().unwrap();

        assert!(matches!(
            registry
                .get_by_type(TypeDescriptor::of::<dyn Named>())
                .unwrap_err(),
            ElementInstanceProviderError::UnresolvedDependency { .. }
        ));
        assert!(registry
            .primary_instance_option::<dyn Named>()
            .unwrap()
            .is_none());
    }

    #[test]
    fn should_return_instances_by_priority() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("first"), first())
            .with_element(ElementSeed::new("second").with_priority(1), second())
            .build()
            .unwrap();

        let labels: Vec<_> = registry
            .instances_typed::<dyn Named>()
            .unwrap()
            .iter()
            .map(|instance| instance.label())
            .collect();
        assert_eq!(labels, vec!["second", "first"]);
    }

    #[test]
    fn should_reject_incompatible_named_instance() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("first"), first())
            .build()
            .unwrap();

        assert!(matches!(
            registry
                .instance_by_name("first", TypeDescriptor::of::<Second>())
                .unwrap_err(),
            ElementInstanceProviderError::IncompatibleElement { .. }
        ));
    }

    #[test]
    fn should_initialize_singletons_only() {
        let registry = ElementRegistryBuilder::default()
            .with_element(ElementSeed::new("first"), first())
            .with_element(
                ElementSeed::new("second").with_scope(Scope::Prototype),
                second(),
            )
            .with_activation_state(ActivationState::default())
            .build()
            .unwrap();

        registry.initialize().unwrap();
        registry.initialize().unwrap();

        assert!(registry.contexts()[0].has_instance());
        assert!(!registry.contexts()[1].has_instance());

        registry.shutdown();
    }
}
