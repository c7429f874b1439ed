//! Pointer types for element instances and the generic provider interface used to request them.

use crate::error::ElementInstanceProviderError;
use crate::type_descriptor::TypeDescriptor;
use std::any::{type_name, Any};
use std::sync::Arc;

pub type ElementInstancePtr<T> = Arc<T>;

pub type ElementInstanceAnyPtr = ElementInstancePtr<dyn Any + Send + Sync + 'static>;

/// Casts a type-erased instance to a boxed `ElementInstancePtr<T>`, where `T` is either the
/// concrete element type or one of its aliases (usually `dyn Trait + Send + Sync`). Returns the
/// original instance on failure.
pub type CastFunction =
    fn(ElementInstanceAnyPtr) -> Result<Box<dyn Any + Send + Sync>, ElementInstanceAnyPtr>;

/// [CastFunction] for the concrete type of an element.
pub fn cast_concrete<T: Send + Sync + 'static>(
    instance: ElementInstanceAnyPtr,
) -> Result<Box<dyn Any + Send + Sync>, ElementInstanceAnyPtr> {
    instance
        .downcast::<T>()
        .map(|instance| Box::new(instance) as Box<dyn Any + Send + Sync>)
}

/// Creates a [CastFunction] from a concrete element type to an alias type:
///
/// ```
/// use trellis_di::alias_cast;
/// use trellis_di::instance_provider::CastFunction;
///
/// trait Greeter {}
///
/// struct EnglishGreeter;
///
/// impl Greeter for EnglishGreeter {}
///
/// let cast: CastFunction = alias_cast!(EnglishGreeter => dyn Greeter + Send + Sync);
/// ```
#[macro_export]
macro_rules! alias_cast {
    ($concrete:ty => $alias:ty) => {
        |instance: $crate::instance_provider::ElementInstanceAnyPtr| {
            instance.downcast::<$concrete>().map(|instance| {
                Box::new(instance as $crate::instance_provider::ElementInstancePtr<$alias>)
                    as Box<dyn ::std::any::Any + Send + Sync>
            })
        }
    };
}

/// An element instance already cast to the type requested by a dependency.
#[derive(Debug)]
pub struct InjectedInstance {
    name: String,
    required: TypeDescriptor,
    value: Box<dyn Any + Send + Sync>,
}

impl InjectedInstance {
    /// Casts `instance` of the element `name` to `required` using `cast`.
    pub fn new(
        name: &str,
        required: TypeDescriptor,
        instance: ElementInstanceAnyPtr,
        cast: CastFunction,
    ) -> Result<Self, ElementInstanceProviderError> {
        let value = cast(instance).map_err(|_| ElementInstanceProviderError::IncompatibleElement {
            name: name.to_string(),
            required: required.name().to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            required,
            value,
        })
    }

    /// Name of the element this instance comes from.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn required_type(&self) -> TypeDescriptor {
        self.required
    }

    /// Extracts the strongly-typed pointer. `T` must be the type this instance was resolved for.
    pub fn into_typed<T: ?Sized + 'static>(
        self,
    ) -> Result<ElementInstancePtr<T>, ElementInstanceProviderError> {
        let required = self.required;
        self.value
            .downcast::<ElementInstancePtr<T>>()
            .map(|instance| *instance)
            .map_err(|_| ElementInstanceProviderError::ArgumentMismatch {
                expected: type_name::<T>().to_string(),
                actual: required.name().to_string(),
            })
    }
}

/// Generic provider for element instances.
pub trait ElementInstanceProvider {
    /// Tries to return a primary instance of a given type. A primary element is either the only
    /// one assignable to the type or the single one marked as primary.
    fn primary_instance(
        &self,
        required: TypeDescriptor,
    ) -> Result<InjectedInstance, ElementInstanceProviderError>;

    /// Returns instances of all elements assignable to the given type, ordered by priority.
    fn instances(
        &self,
        required: TypeDescriptor,
    ) -> Result<Vec<InjectedInstance>, ElementInstanceProviderError>;

    /// Returns an instance of an element with the given name, cast to the given type.
    fn instance_by_name(
        &self,
        name: &str,
        required: TypeDescriptor,
    ) -> Result<InjectedInstance, ElementInstanceProviderError>;
}

/// Helper trait for [ElementInstanceProvider] providing strongly-typed access.
pub trait TypedElementInstanceProvider {
    /// Typesafe version of [ElementInstanceProvider::primary_instance].
    fn primary_instance_typed<T: ?Sized + 'static>(
        &self,
    ) -> Result<ElementInstancePtr<T>, ElementInstanceProviderError>;

    /// Tries to get an instance like [TypedElementInstanceProvider::primary_instance_typed] does,
    /// but returns `None` when no element is assignable to `T`.
    fn primary_instance_option<T: ?Sized + 'static>(
        &self,
    ) -> Result<Option<ElementInstancePtr<T>>, ElementInstanceProviderError>;

    /// Typesafe version of [ElementInstanceProvider::instances].
    fn instances_typed<T: ?Sized + 'static>(
        &self,
    ) -> Result<Vec<ElementInstancePtr<T>>, ElementInstanceProviderError>;

    /// Typesafe version of [ElementInstanceProvider::instance_by_name].
    fn instance_by_name_typed<T: ?Sized + 'static>(
        &self,
        name: &str,
    ) -> Result<ElementInstancePtr<T>, ElementInstanceProviderError>;
}

impl<P: ElementInstanceProvider + ?Sized> TypedElementInstanceProvider for P {
    fn primary_instance_typed<T: ?Sized + 'static>(
        &self,
    ) -> Result<ElementInstancePtr<T>, ElementInstanceProviderError> {
        self.primary_instance(TypeDescriptor::of::<T>())
            .and_then(InjectedInstance::into_typed::<T>)
    }

    fn primary_instance_option<T: ?Sized + 'static>(
        &self,
    ) -> Result<Option<ElementInstancePtr<T>>, ElementInstanceProviderError> {
        match self.primary_instance_typed::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(ElementInstanceProviderError::UnresolvedDependency { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn instances_typed<T: ?Sized + 'static>(
        &self,
    ) -> Result<Vec<ElementInstancePtr<T>>, ElementInstanceProviderError> {
        self.instances(TypeDescriptor::of::<T>())?
            .into_iter()
            .map(InjectedInstance::into_typed::<T>)
            .collect()
    }

    fn instance_by_name_typed<T: ?Sized + 'static>(
        &self,
        name: &str,
    ) -> Result<ElementInstancePtr<T>, ElementInstanceProviderError> {
        self.instance_by_name(name, TypeDescriptor::of::<T>())
            .and_then(InjectedInstance::into_typed::<T>)
    }
}
