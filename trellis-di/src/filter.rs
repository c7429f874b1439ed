//! Registration-time filtering of element descriptors.
//!
//! Before an element is registered, its descriptor is passed through a pipeline of
//! [ContextFilter]s. The element is discarded if any filter decides so. The built-in
//! [ProfileFilter] evaluates [activation constraints](crate::element::ActivationConstraints)
//! against the currently active profiles.

use crate::element::ElementDescriptor;
use fxhash::FxHashSet;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::cmp::Reverse;

pub type ContextFilterPtr = Box<dyn ContextFilter + Send + Sync>;

/// Read-only snapshot of external activation state, e.g. active profiles.
#[derive(Clone, Default, Debug)]
pub struct ActivationState {
    pub active_profiles: FxHashSet<String>,
}

impl ActivationState {
    pub fn new<I, T>(active_profiles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Self {
            active_profiles: active_profiles
                .into_iter()
                .map(|profile| profile.to_string())
                .collect(),
        }
    }

    #[inline]
    pub fn is_profile_active(&self, profile: &str) -> bool {
        self.active_profiles.contains(profile)
    }
}

/// Decides if a discovered element should be registered.
#[cfg_attr(test, automock)]
pub trait ContextFilter {
    /// Filters with higher priority are evaluated first. Default 0.
    fn priority(&self) -> i8 {
        0
    }

    /// Returns true if the element should not be registered.
    fn discard(&self, descriptor: &ElementDescriptor, activation: &ActivationState) -> bool;
}

/// Discards elements whose required profiles are not all active, or which have any forbidden
/// profile active.
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq)]
pub struct ProfileFilter;

impl ContextFilter for ProfileFilter {
    fn discard(&self, descriptor: &ElementDescriptor, activation: &ActivationState) -> bool {
        let constraints = &descriptor.activation;
        constraints
            .required_profiles
            .iter()
            .any(|profile| !activation.is_profile_active(profile))
            || constraints
                .forbidden_profiles
                .iter()
                .any(|profile| activation.is_profile_active(profile))
    }
}

/// Ordered set of [ContextFilter]s.
pub struct ContextFilterPipeline {
    filters: Vec<ContextFilterPtr>,
}

impl ContextFilterPipeline {
    pub fn new(filters: Vec<ContextFilterPtr>) -> Self {
        Self {
            filters: filters
                .into_iter()
                .sorted_by_key(|filter| Reverse(filter.priority()))
                .collect(),
        }
    }

    /// Returns true if any filter discards the element.
    pub fn discard(&self, descriptor: &ElementDescriptor, activation: &ActivationState) -> bool {
        self.filters
            .iter()
            .any(|filter| filter.discard(descriptor, activation))
    }
}

#[cfg(test)]
mod tests {
    use crate::element::{ElementDescriptor, ElementSeed, ElementSource};
    use crate::filter::{
        ActivationState, ContextFilter, ContextFilterPipeline, ContextFilterPtr,
        MockContextFilter, ProfileFilter,
    };
    use mockall::Sequence;

    struct TestElement;

    fn descriptor(seed: ElementSeed) -> ElementDescriptor {
        ElementDescriptor::new(seed, ElementSource::constructor(|_| Ok(TestElement)))
    }

    #[test]
    fn should_keep_unconstrained_elements() {
        let filter = ProfileFilter;
        let descriptor = descriptor(ElementSeed::new("a"));

        assert!(!filter.discard(&descriptor, &ActivationState::default()));
        assert!(!filter.discard(&descriptor, &ActivationState::new(["dev"])));
    }

    #[test]
    fn should_discard_on_missing_required_profile() {
        let filter = ProfileFilter;
        let descriptor = descriptor(
            ElementSeed::new("a")
                .with_required_profile("x")
                .with_required_profile("y"),
        );

        assert!(filter.discard(&descriptor, &ActivationState::default()));
        assert!(filter.discard(&descriptor, &ActivationState::new(["x"])));
        assert!(!filter.discard(&descriptor, &ActivationState::new(["x", "y", "z"])));
    }

    #[test]
    fn should_discard_on_forbidden_profile() {
        let filter = ProfileFilter;
        let descriptor = descriptor(ElementSeed::new("a").with_forbidden_profile("prod"));

        assert!(!filter.discard(&descriptor, &ActivationState::new(["dev"])));
        assert!(filter.discard(&descriptor, &ActivationState::new(["dev", "prod"])));
    }

    #[test]
    fn should_evaluate_filters_by_priority() {
        let mut seq = Sequence::new();

        let mut low = MockContextFilter::new();
        low.expect_priority().return_const(-1i8);
        let mut high = MockContextFilter::new();
        high.expect_priority().return_const(10i8);

        high.expect_discard()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(false);
        low.expect_discard()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);

        let pipeline = ContextFilterPipeline::new(vec![
            Box::new(low) as ContextFilterPtr,
            Box::new(high) as ContextFilterPtr,
        ]);

        assert!(pipeline.discard(
            &descriptor(ElementSeed::new("a")),
            &ActivationState::default()
        ));
    }

    #[test]
    fn should_keep_when_no_filter_discards() {
        let pipeline =
            ContextFilterPipeline::new(vec![Box::new(ProfileFilter) as ContextFilterPtr]);

        assert!(!pipeline.discard(
            &descriptor(ElementSeed::new("a")),
            &ActivationState::default()
        ));
    }
}
