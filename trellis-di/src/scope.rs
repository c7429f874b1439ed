//! Element instances are kept according to their [Scope]. A [singleton](Scope::Singleton) element
//! is created at most once per registry and then shared, while a [prototype](Scope::Prototype)
//! element is created anew on every request.
//!
//! Note: scope resolution happens at element instantiation time, which can lead to unexpected
//! consequences if scopes are mixed together, e.g. a singleton element can depend on a prototype
//! one. In such case when creating the singleton, a new instance of the dependency will be
//! created, since it's a prototype, but then that single instance will live as long as the
//! singleton lives.

use crate::construction::ConstructionTracker;
use crate::error::ElementInstanceProviderError;
use crate::instance_provider::ElementInstanceAnyPtr;
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Default)]
pub enum Scope {
    /// Scope for instances shared between elements. Stateless elements are good candidates to be
    /// singletons.
    #[default]
    Singleton,
    /// Creates a new instance on each request. Stateful elements usually should be prototypes.
    Prototype,
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Singleton => write!(f, "SINGLETON"),
            Scope::Prototype => write!(f, "PROTOTYPE"),
        }
    }
}

/// Instance storage for a single element, according to its scope.
#[derive(Debug)]
pub(crate) enum ScopedInstance {
    Singleton(OnceCell<ElementInstanceAnyPtr>),
    Prototype,
}

impl ScopedInstance {
    pub(crate) fn new(scope: Scope) -> Self {
        match scope {
            Scope::Singleton => ScopedInstance::Singleton(OnceCell::new()),
            Scope::Prototype => ScopedInstance::Prototype,
        }
    }

    /// Returns the stored instance, if this scope stores instances and one was created.
    #[inline]
    pub(crate) fn cached(&self) -> Option<ElementInstanceAnyPtr> {
        match self {
            ScopedInstance::Singleton(cell) => cell.get().cloned(),
            ScopedInstance::Prototype => None,
        }
    }

    /// Returns the stored instance or creates a new one. Singletons are created at most once:
    /// the creating thread claims the element in `tracker`, while concurrent callers wait for
    /// the claim to be released and then observe the stored instance. Failed creations don't
    /// store anything.
    pub(crate) fn get_or_create<F>(
        &self,
        tracker: &ConstructionTracker,
        name: &str,
        create: F,
    ) -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError>
    where
        F: FnOnce() -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError>,
    {
        match self {
            ScopedInstance::Singleton(cell) => {
                if let Some(instance) = cell.get() {
                    return Ok(instance.clone());
                }

                let _guard = tracker.acquire(name)?;

                // created by the previous claim holder
                if let Some(instance) = cell.get() {
                    return Ok(instance.clone());
                }

                let instance = create()?;
                Ok(cell.get_or_init(|| instance).clone())
            }
            ScopedInstance::Prototype => create(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::construction::ConstructionTracker;
    use crate::error::ElementInstanceProviderError;
    use crate::instance_provider::{ElementInstanceAnyPtr, ElementInstancePtr};
    use crate::scope::{Scope, ScopedInstance};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn create() -> Result<ElementInstanceAnyPtr, ElementInstanceProviderError> {
        Ok(ElementInstancePtr::new(0) as ElementInstanceAnyPtr)
    }

    #[test]
    fn should_support_singletons() {
        let tracker = ConstructionTracker::default();
        let scope = ScopedInstance::new(Scope::Singleton);
        assert!(scope.cached().is_none());

        let instance = scope.get_or_create(&tracker, "a", create).unwrap();
        assert!(ElementInstancePtr::ptr_eq(
            &instance,
            &scope.cached().unwrap()
        ));
        assert!(ElementInstancePtr::ptr_eq(
            &instance,
            &scope.get_or_create(&tracker, "a", create).unwrap()
        ));
    }

    #[test]
    fn should_support_prototypes() {
        let tracker = ConstructionTracker::default();
        let scope = ScopedInstance::new(Scope::Prototype);

        let instance = scope.get_or_create(&tracker, "a", create).unwrap();
        assert!(scope.cached().is_none());
        assert!(!ElementInstancePtr::ptr_eq(
            &instance,
            &scope.get_or_create(&tracker, "a", create).unwrap()
        ));
    }

    #[test]
    fn should_not_store_failed_singletons() {
        let tracker = ConstructionTracker::default();
        let scope = ScopedInstance::new(Scope::Singleton);

        assert!(scope
            .get_or_create(&tracker, "a", || Err(
                ElementInstanceProviderError::NoNamedInstance("a".to_string())
            ))
            .is_err());
        assert!(scope.cached().is_none());
        assert!(scope.get_or_create(&tracker, "a", create).is_ok());
    }

    #[test]
    fn should_create_singleton_once_across_threads() {
        let scope = ScopedInstance::new(Scope::Singleton);
        let tracker = ConstructionTracker::default();
        let created = AtomicUsize::new(0);

        let instances = thread::scope(|threads| {
            let handles = (0..8)
                .map(|_| {
                    threads.spawn(|| {
                        scope
                            .get_or_create(&tracker, "a", || {
                                created.fetch_add(1, Ordering::SeqCst);
                                create()
                            })
                            .unwrap()
                    })
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(instances
            .iter()
            .all(|instance| ElementInstancePtr::ptr_eq(instance, &instances[0])));
    }
}
