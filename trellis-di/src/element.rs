//! The basic block of dependency injection is an element - an injectable object, which itself can
//! depend on other elements. Every element is described by an immutable [ElementDescriptor],
//! which is assembled from two parts handed over by whatever discovers elements:
//!
//! * [ElementSeed] - raw metadata: name, [Scope], priority, primary marker and activation
//! constraints
//! * [ElementSource] - how to build the element: produced type, alias types, construction
//! parameters and either a constructor or a factory method on a parent element, plus injected
//! fields and lifecycle hooks run after construction
//!
//! ```
//! use trellis_di::alias_cast;
//! use trellis_di::element::{ElementDescriptor, ElementSeed, ElementSource};
//! use trellis_di::instance_provider::ElementInstancePtr;
//! use trellis_di::scope::Scope;
//!
//! trait Repository {}
//!
//! struct MemoryRepository;
//!
//! impl Repository for MemoryRepository {}
//!
//! struct Service {
//!     repository: ElementInstancePtr<dyn Repository + Send + Sync>,
//! }
//!
//! let repository = ElementDescriptor::new(
//!     ElementSeed::new("memory_repository"),
//!     ElementSource::constructor(|_| Ok(MemoryRepository))
//!         .with_alias::<dyn Repository + Send + Sync>(
//!             alias_cast!(MemoryRepository => dyn Repository + Send + Sync),
//!         ),
//! );
//!
//! let service = ElementDescriptor::new(
//!     ElementSeed::new("service").with_scope(Scope::Prototype),
//!     ElementSource::constructor(|arguments| {
//!         Ok(Service {
//!             repository: arguments.take()?,
//!         })
//!     })
//!     .with_parameter::<ElementInstancePtr<dyn Repository + Send + Sync>>(),
//! );
//! ```

use crate::dependency::{Arguments, DependencyDefinition, Injected, ResolvedDependency};
use crate::error::{AssemblyStrategy, ElementInstanceProviderError, ErrorPtr};
use crate::instance_provider::{
    cast_concrete, CastFunction, ElementInstanceAnyPtr, ElementInstancePtr, InjectedInstance,
};
use crate::scope::Scope;
use crate::type_descriptor::TypeDescriptor;
use derivative::Derivative;
use fxhash::FxHashSet;
use std::any::type_name;
use std::sync::Arc;

pub type ConstructorFunction = Arc<
    dyn Fn(&mut Arguments) -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError>
        + Send
        + Sync,
>;

pub type FactoryMethodFunction = Arc<
    dyn Fn(
            InjectedInstance,
            &mut Arguments,
        ) -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError>
        + Send
        + Sync,
>;

pub type FieldSetter = Arc<
    dyn Fn(&ElementInstanceAnyPtr, ResolvedDependency) -> Result<(), ElementInstanceProviderError>
        + Send
        + Sync,
>;

pub type HookFunction =
    Arc<dyn Fn(&ElementInstanceAnyPtr) -> Result<(), ElementInstanceProviderError> + Send + Sync>;

fn downcast_target<C: 'static>(
    instance: &ElementInstanceAnyPtr,
) -> Result<&C, ElementInstanceProviderError> {
    instance
        .downcast_ref::<C>()
        .ok_or_else(|| ElementInstanceProviderError::ArgumentMismatch {
            expected: type_name::<C>().to_string(),
            actual: "instance of another type".to_string(),
        })
}

/// Profiles which need to be active or inactive for an element to be registered.
#[derive(Clone, Default, Debug)]
pub struct ActivationConstraints {
    pub required_profiles: FxHashSet<String>,
    pub forbidden_profiles: FxHashSet<String>,
}

impl ActivationConstraints {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.required_profiles.is_empty() && self.forbidden_profiles.is_empty()
    }
}

/// Structural modifiers of an injected field or a lifecycle hook, as reported by element
/// discovery.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Debug)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_abstract: bool,
}

/// Raw element metadata.
#[derive(Clone, Debug)]
pub struct ElementSeed {
    /// Unique name of the element in a registry.
    pub name: String,
    pub scope: Scope,
    /// Higher priority elements come first in collections. Default is 0.
    pub priority: i8,
    /// With multiple elements assignable to a requested type, the one marked as primary is
    /// selected when requesting a single instance.
    pub primary: bool,
    pub activation: ActivationConstraints,
}

impl ElementSeed {
    pub fn new<T: ToString>(name: T) -> Self {
        Self {
            name: name.to_string(),
            scope: Scope::default(),
            priority: 0,
            primary: false,
            activation: ActivationConstraints::default(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_priority(mut self, priority: i8) -> Self {
        self.priority = priority;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn with_required_profile<T: ToString>(mut self, profile: T) -> Self {
        self.activation.required_profiles.insert(profile.to_string());
        self
    }

    pub fn with_forbidden_profile<T: ToString>(mut self, profile: T) -> Self {
        self.activation
            .forbidden_profiles
            .insert(profile.to_string());
        self
    }
}

/// How an element instance is built.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub enum ConstructionSource {
    /// Build the produced type directly from resolved parameters.
    Constructor(#[derivative(Debug = "ignore")] ConstructorFunction),
    /// Invoke a method on a parent element instance with resolved parameters.
    FactoryMethod {
        method_name: String,
        parent: DependencyDefinition,
        #[derivative(Debug = "ignore")]
        method: FactoryMethodFunction,
    },
}

impl ConstructionSource {
    #[inline]
    pub fn strategy(&self) -> AssemblyStrategy {
        match self {
            ConstructionSource::Constructor(_) => AssemblyStrategy::Constructor,
            ConstructionSource::FactoryMethod { .. } => AssemblyStrategy::FactoryMethod,
        }
    }
}

/// Additional type an element can be injected as, usually a `dyn Trait`.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct AliasDefinition {
    pub alias_type: TypeDescriptor,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

/// A field set on an instance after construction.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub definition: DependencyDefinition,
    pub modifiers: Modifiers,
    #[derivative(Debug = "ignore")]
    setter: FieldSetter,
}

impl FieldDescriptor {
    /// Creates an injected field of an element of type `C`. The dependency is described by the
    /// injected type `V`, and `setter` is expected to store it, typically in a
    /// `once_cell::sync::OnceCell`.
    pub fn new<C, V, F>(name: &str, setter: F) -> Self
    where
        C: Send + Sync + 'static,
        V: Injected,
        F: Fn(&C, V) -> Result<(), ElementInstanceProviderError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            definition: V::definition().owned_by(format!("field '{name}'")),
            modifiers: Modifiers::default(),
            setter: Arc::new(
                move |instance: &ElementInstanceAnyPtr, resolved: ResolvedDependency| {
                    setter(downcast_target::<C>(instance)?, V::from_resolved(resolved)?)
                },
            ),
        }
    }

    /// Injects an element with the given name, instead of looking it up by type.
    pub fn named<T: ToString>(mut self, name: T) -> Self {
        self.definition = self.definition.named(name);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[inline]
    pub fn inject(
        &self,
        instance: &ElementInstanceAnyPtr,
        resolved: ResolvedDependency,
    ) -> Result<(), ElementInstanceProviderError> {
        (self.setter)(instance, resolved)
    }
}

/// A method invoked on a newly created instance, after field injection.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct LifecycleHook {
    pub name: String,
    /// Number of parameters declared by the hook. Only parameterless hooks can be invoked.
    pub parameter_count: usize,
    pub modifiers: Modifiers,
    #[derivative(Debug = "ignore")]
    invoke: HookFunction,
}

impl LifecycleHook {
    pub fn new<C, F>(name: &str, hook: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(&C) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            parameter_count: 0,
            modifiers: Modifiers::default(),
            invoke: Arc::new(move |instance: &ElementInstanceAnyPtr| {
                hook(downcast_target::<C>(instance)?)
                    .map_err(ElementInstanceProviderError::ConstructorError)
            }),
        }
    }

    pub fn with_parameter_count(mut self, parameter_count: usize) -> Self {
        self.parameter_count = parameter_count;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[inline]
    pub fn invoke(
        &self,
        instance: &ElementInstanceAnyPtr,
    ) -> Result<(), ElementInstanceProviderError> {
        (self.invoke)(instance)
    }
}

/// Describes how to build an element.
#[derive(Clone, Debug)]
pub struct ElementSource {
    pub produced_type: TypeDescriptor,
    pub construction: ConstructionSource,
    pub parameters: Vec<DependencyDefinition>,
    /// Types the element can be injected as. Always starts with the produced type.
    pub aliases: Vec<AliasDefinition>,
    pub fields: Vec<FieldDescriptor>,
    pub hooks: Vec<LifecycleHook>,
}

impl ElementSource {
    /// Builds elements of type `T` by calling `constructor` with resolved parameters.
    pub fn constructor<T, F>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Arguments) -> Result<T, ElementInstanceProviderError> + Send + Sync + 'static,
    {
        Self::new::<T>(ConstructionSource::Constructor(Arc::new(
            move |arguments: &mut Arguments| {
                constructor(arguments)
                    .map(|instance| ElementInstancePtr::new(instance) as ElementInstanceAnyPtr)
            },
        )))
    }

    /// Builds elements of type `T` by calling `method` on the primary instance of the parent type
    /// `P` with resolved parameters.
    pub fn factory_method<P, T, F>(method_name: &str, method: F) -> Self
    where
        P: ?Sized + 'static,
        T: Send + Sync + 'static,
        F: Fn(ElementInstancePtr<P>, &mut Arguments) -> Result<T, ElementInstanceProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<T>(ConstructionSource::FactoryMethod {
            method_name: method_name.to_string(),
            parent: DependencyDefinition::of::<ElementInstancePtr<P>>()
                .owned_by(format!("factory method '{method_name}'")),
            method: Arc::new(move |parent: InjectedInstance, arguments: &mut Arguments| {
                let parent = parent.into_typed::<P>()?;
                method(parent, arguments)
                    .map(|instance| ElementInstancePtr::new(instance) as ElementInstanceAnyPtr)
            }),
        })
    }

    fn new<T: Send + Sync + 'static>(construction: ConstructionSource) -> Self {
        let produced_type = TypeDescriptor::of::<T>();
        Self {
            produced_type,
            construction,
            parameters: vec![],
            aliases: vec![AliasDefinition {
                alias_type: produced_type,
                cast: cast_concrete::<T>,
            }],
            fields: vec![],
            hooks: vec![],
        }
    }

    /// Uses the parent element with given name for a factory method, instead of the primary one.
    /// Has no effect for constructors.
    pub fn with_parent_name<T: ToString>(mut self, name: T) -> Self {
        if let ConstructionSource::FactoryMethod { parent, .. } = &mut self.construction {
            *parent = parent.clone().named(name);
        }

        self
    }

    /// Adds a construction parameter described by the injected type `V`.
    pub fn with_parameter<V: Injected>(self) -> Self {
        self.with_dependency(V::definition())
    }

    /// Adds a construction parameter described by the injected type `V`, resolved by element
    /// name.
    pub fn with_named_parameter<V: Injected, N: ToString>(self, name: N) -> Self {
        self.with_dependency(V::definition().named(name))
    }

    /// Adds a construction parameter with an explicit definition.
    pub fn with_dependency(mut self, definition: DependencyDefinition) -> Self {
        let definition = if definition.owner_description.is_empty() {
            let owner = format!("parameter #{}", self.parameters.len());
            definition.owned_by(owner)
        } else {
            definition
        };

        self.parameters.push(definition);
        self
    }

    /// Makes the element injectable as `A`. The cast is usually created with
    /// [alias_cast](crate::alias_cast).
    pub fn with_alias<A: ?Sized + 'static>(mut self, cast: CastFunction) -> Self {
        self.aliases.push(AliasDefinition {
            alias_type: TypeDescriptor::of::<A>(),
            cast,
        });
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_hook(mut self, hook: LifecycleHook) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// Immutable description of a single element registered in a registry.
#[derive(Clone, Debug)]
pub struct ElementDescriptor {
    pub name: String,
    pub produced_type: TypeDescriptor,
    pub scope: Scope,
    pub priority: i8,
    pub primary: bool,
    pub activation: ActivationConstraints,
    pub construction: ConstructionSource,
    pub parameters: Vec<DependencyDefinition>,
    pub aliases: Vec<AliasDefinition>,
    pub fields: Vec<FieldDescriptor>,
    pub hooks: Vec<LifecycleHook>,
}

impl ElementDescriptor {
    pub fn new(seed: ElementSeed, source: ElementSource) -> Self {
        Self {
            name: seed.name,
            produced_type: source.produced_type,
            scope: seed.scope,
            priority: seed.priority,
            primary: seed.primary,
            activation: seed.activation,
            construction: source.construction,
            parameters: source.parameters,
            aliases: source.aliases,
            fields: source.fields,
            hooks: source.hooks,
        }
    }

    /// Checks if instances of this element can be injected as `required`.
    #[inline]
    pub fn is_assignable_to(&self, required: TypeDescriptor) -> bool {
        self.cast_for(required).is_some()
    }

    /// Returns the cast function for `required`, if this element is assignable to it.
    pub fn cast_for(&self, required: TypeDescriptor) -> Option<CastFunction> {
        self.aliases
            .iter()
            .find(|alias| alias.alias_type == required)
            .map(|alias| alias.cast)
    }

    #[inline]
    pub fn strategy(&self) -> AssemblyStrategy {
        self.construction.strategy()
    }
}
