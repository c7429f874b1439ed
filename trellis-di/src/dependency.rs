//! Descriptions of dependencies required by elements and the values they resolve to.
//!
//! A dependency is described by a [DependencyDefinition]: the required type, the shape of the
//! requested value and an optional explicit element name. Since the shape of a Rust type cannot
//! be inspected at runtime, it's derived statically from the injected Rust type via [Injected]:
//!
//! * `ElementInstancePtr<T>` - a single instance of `T`
//! * `Vec<ElementInstancePtr<T>>` - all instances assignable to `T`, ordered by priority
//! * `Option<ElementInstancePtr<T>>` - an instance of `T`, if one exists
//! * `HashMap<String, ElementInstancePtr<T>>` - all instances assignable to `T` keyed by element
//! name

use crate::error::ElementInstanceProviderError;
use crate::instance_provider::{ElementInstancePtr, InjectedInstance};
use crate::type_descriptor::TypeDescriptor;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::vec::IntoIter;

/// Shape of the value requested by a dependency.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum DependencyShape {
    Single,
    Collection,
    Optional,
    Map,
}

impl Display for DependencyShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyShape::Single => write!(f, "single instance"),
            DependencyShape::Collection => write!(f, "collection"),
            DependencyShape::Optional => write!(f, "optional instance"),
            DependencyShape::Map => write!(f, "named map"),
        }
    }
}

/// Describes one required constructor parameter, injected field or factory method parent.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DependencyDefinition {
    pub required_type: TypeDescriptor,
    pub shape: DependencyShape,
    pub explicit_name: Option<String>,
    /// Human-readable description of what requires this dependency, used in diagnostics.
    pub owner_description: String,
}

impl DependencyDefinition {
    pub fn new(required_type: TypeDescriptor, shape: DependencyShape) -> Self {
        Self {
            required_type,
            shape,
            explicit_name: None,
            owner_description: String::new(),
        }
    }

    /// Creates a definition derived from the injected Rust type `V`.
    #[inline]
    pub fn of<V: Injected>() -> Self {
        V::definition()
    }

    /// Requests an element with the given name instead of looking it up by type.
    pub fn named<T: ToString>(mut self, name: T) -> Self {
        self.explicit_name = Some(name.to_string());
        self
    }

    pub fn owned_by<T: ToString>(mut self, owner_description: T) -> Self {
        self.owner_description = owner_description.to_string();
        self
    }
}

impl Display for DependencyDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {}", self.shape, self.required_type)?;
        if let Some(name) = &self.explicit_name {
            write!(f, " named '{name}'")?;
        }

        Ok(())
    }
}

/// Value produced by resolving a [DependencyDefinition].
#[derive(Debug)]
pub enum ResolvedDependency {
    Single(InjectedInstance),
    Collection(Vec<InjectedInstance>),
    Optional(Option<InjectedInstance>),
    Map(Vec<(String, InjectedInstance)>),
}

impl ResolvedDependency {
    pub fn shape(&self) -> DependencyShape {
        match self {
            ResolvedDependency::Single(_) => DependencyShape::Single,
            ResolvedDependency::Collection(_) => DependencyShape::Collection,
            ResolvedDependency::Optional(_) => DependencyShape::Optional,
            ResolvedDependency::Map(_) => DependencyShape::Map,
        }
    }

    /// Wraps a single instance in the requested shape.
    pub fn shaped(instance: InjectedInstance, shape: DependencyShape) -> Self {
        match shape {
            DependencyShape::Single => ResolvedDependency::Single(instance),
            DependencyShape::Collection => ResolvedDependency::Collection(vec![instance]),
            DependencyShape::Optional => ResolvedDependency::Optional(Some(instance)),
            DependencyShape::Map => {
                ResolvedDependency::Map(vec![(instance.name().to_string(), instance)])
            }
        }
    }

    fn mismatch<T: ?Sized>(&self, expected: DependencyShape) -> ElementInstanceProviderError {
        ElementInstanceProviderError::ArgumentMismatch {
            expected: format!("{} of {}", expected, type_name::<T>()),
            actual: self.shape().to_string(),
        }
    }
}

/// Rust types which can be injected as element dependencies.
pub trait Injected: Sized {
    /// Returns the definition of the dependency represented by this type.
    fn definition() -> DependencyDefinition;

    /// Converts a resolved dependency into this type.
    fn from_resolved(resolved: ResolvedDependency) -> Result<Self, ElementInstanceProviderError>;
}

impl<T: ?Sized + 'static> Injected for ElementInstancePtr<T> {
    fn definition() -> DependencyDefinition {
        DependencyDefinition::new(TypeDescriptor::of::<T>(), DependencyShape::Single)
    }

    fn from_resolved(resolved: ResolvedDependency) -> Result<Self, ElementInstanceProviderError> {
        match resolved {
            ResolvedDependency::Single(instance) => instance.into_typed::<T>(),
            resolved => Err(resolved.mismatch::<T>(DependencyShape::Single)),
        }
    }
}

impl<T: ?Sized + 'static> Injected for Vec<ElementInstancePtr<T>> {
    fn definition() -> DependencyDefinition {
        DependencyDefinition::new(TypeDescriptor::of::<T>(), DependencyShape::Collection)
    }

    fn from_resolved(resolved: ResolvedDependency) -> Result<Self, ElementInstanceProviderError> {
        match resolved {
            ResolvedDependency::Collection(instances) => instances
                .into_iter()
                .map(InjectedInstance::into_typed::<T>)
                .collect(),
            resolved => Err(resolved.mismatch::<T>(DependencyShape::Collection)),
        }
    }
}

impl<T: ?Sized + 'static> Injected for Option<ElementInstancePtr<T>> {
    fn definition() -> DependencyDefinition {
        DependencyDefinition::new(TypeDescriptor::of::<T>(), DependencyShape::Optional)
    }

    fn from_resolved(resolved: ResolvedDependency) -> Result<Self, ElementInstanceProviderError> {
        match resolved {
            ResolvedDependency::Optional(instance) => {
                instance.map(InjectedInstance::into_typed::<T>).transpose()
            }
            resolved => Err(resolved.mismatch::<T>(DependencyShape::Optional)),
        }
    }
}

impl<T: ?Sized + 'static> Injected for HashMap<String, ElementInstancePtr<T>> {
    fn definition() -> DependencyDefinition {
        DependencyDefinition::new(TypeDescriptor::of::<T>(), DependencyShape::Map)
    }

    fn from_resolved(resolved: ResolvedDependency) -> Result<Self, ElementInstanceProviderError> {
        match resolved {
            ResolvedDependency::Map(entries) => entries
                .into_iter()
                .map(|(name, instance)| instance.into_typed::<T>().map(|instance| (name, instance)))
                .collect(),
            resolved => Err(resolved.mismatch::<T>(DependencyShape::Map)),
        }
    }
}

/// Positional arguments resolved for a constructor or a factory method, in declaration order.
#[derive(Debug)]
pub struct Arguments {
    values: IntoIter<ResolvedDependency>,
    consumed: usize,
}

impl Arguments {
    pub fn new(values: Vec<ResolvedDependency>) -> Self {
        Self {
            values: values.into_iter(),
            consumed: 0,
        }
    }

    /// Takes the next argument, converting it to the requested type.
    pub fn take<V: Injected>(&mut self) -> Result<V, ElementInstanceProviderError> {
        let value = self.values.next().ok_or_else(|| {
            ElementInstanceProviderError::ArgumentMismatch {
                expected: format!("argument #{} of {}", self.consumed, type_name::<V>()),
                actual: "no more arguments".to_string(),
            }
        })?;

        self.consumed += 1;
        V::from_resolved(value)
    }

    /// Number of arguments not taken yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::dependency::{
        Arguments, DependencyDefinition, DependencyShape, Injected, ResolvedDependency,
    };
    use crate::error::ElementInstanceProviderError;
    use crate::instance_provider::{
        cast_concrete, ElementInstanceAnyPtr, ElementInstancePtr, InjectedInstance,
    };
    use crate::type_descriptor::TypeDescriptor;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct TestElement(i8);

    fn injected(name: &str, value: i8) -> InjectedInstance {
        InjectedInstance::new(
            name,
            TypeDescriptor::of::<TestElement>(),
            ElementInstancePtr::new(TestElement(value)) as ElementInstanceAnyPtr,
            cast_concrete::<TestElement>,
        )
        .unwrap()
    }

    #[test]
    fn should_derive_definitions_from_types() {
        let definition = DependencyDefinition::of::<ElementInstancePtr<TestElement>>();
        assert_eq!(definition.shape, DependencyShape::Single);
        assert_eq!(definition.required_type, TypeDescriptor::of::<TestElement>());

        assert_eq!(
            <Vec<ElementInstancePtr<TestElement>>>::definition().shape,
            DependencyShape::Collection
        );
        assert_eq!(
            <Option<ElementInstancePtr<TestElement>>>::definition().shape,
            DependencyShape::Optional
        );
        assert_eq!(
            <HashMap<String, ElementInstancePtr<TestElement>>>::definition().shape,
            DependencyShape::Map
        );
    }

    #[test]
    fn should_take_arguments_in_order() {
        let mut arguments = Arguments::new(vec![
            ResolvedDependency::Single(injected("a", 1)),
            ResolvedDependency::Optional(None),
            ResolvedDependency::Map(vec![("b".to_string(), injected("b", 2))]),
        ]);

        let single: ElementInstancePtr<TestElement> = arguments.take().unwrap();
        assert_eq!(single.0, 1);

        let optional: Option<ElementInstancePtr<TestElement>> = arguments.take().unwrap();
        assert!(optional.is_none());

        let map: HashMap<String, ElementInstancePtr<TestElement>> = arguments.take().unwrap();
        assert_eq!(map["b"].0, 2);

        assert_eq!(arguments.remaining(), 0);
    }

    #[test]
    fn should_reject_shape_mismatch() {
        let mut arguments =
            Arguments::new(vec![ResolvedDependency::Collection(vec![injected("a", 1)])]);

        assert!(matches!(
            arguments
                .take::<ElementInstancePtr<TestElement>>()
                .unwrap_err(),
            ElementInstanceProviderError::ArgumentMismatch { .. }
        ));
    }

    #[test]
    fn should_reject_missing_argument() {
        let mut arguments = Arguments::new(vec![]);

        assert!(matches!(
            arguments
                .take::<ElementInstancePtr<TestElement>>()
                .unwrap_err(),
            ElementInstanceProviderError::ArgumentMismatch { .. }
        ));
    }

    #[test]
    fn should_shape_single_instance() {
        assert_eq!(
            ResolvedDependency::shaped(injected("a", 1), DependencyShape::Map).shape(),
            DependencyShape::Map
        );
        assert_eq!(
            ResolvedDependency::shaped(injected("a", 1), DependencyShape::Collection).shape(),
            DependencyShape::Collection
        );
    }
}
