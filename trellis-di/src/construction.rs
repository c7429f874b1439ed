//! Registry-wide bookkeeping of singletons under construction.
//!
//! A [DependencyGraph](crate::graph::DependencyGraph) only sees the call path of a single
//! request, so it can't notice two threads building the opposite ends of a cycle, or a thread
//! starting a fresh request for an element it is already building. Both would block forever on
//! the element's instance cell. The tracker records which thread builds which singleton and which
//! singleton each thread waits for, and refuses to wait when waiting would close a cycle.

use crate::error::ElementInstanceProviderError;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::thread::{self, ThreadId};
use tracing::trace;

#[derive(Default, Debug)]
struct TrackerState {
    // element -> thread building it
    builders: FxHashMap<String, ThreadId>,
    // thread -> elements it builds, outermost first
    stacks: FxHashMap<ThreadId, Vec<String>>,
    // thread -> element it waits for
    waiting: FxHashMap<ThreadId, String>,
}

impl TrackerState {
    fn stack_from(&self, thread: ThreadId, element: &str) -> impl Iterator<Item = &String> {
        self.stacks
            .get(&thread)
            .map(|stack| {
                let start = stack
                    .iter()
                    .position(|name| name == element)
                    .unwrap_or(0);
                &stack[start..]
            })
            .unwrap_or_default()
            .iter()
    }

    /// Follows the wait-for chain starting at `element`. Returns elements on the cycle if the
    /// chain leads back to `current`.
    fn find_cycle(&self, current: ThreadId, element: &str) -> Option<BTreeSet<String>> {
        let mut members = BTreeSet::new();
        let mut visited = FxHashSet::default();
        let mut waited = element;

        loop {
            let builder = *self.builders.get(waited)?;
            members.extend(self.stack_from(builder, waited).cloned());

            if builder == current {
                return Some(members);
            }

            if !visited.insert(builder) {
                return None;
            }

            waited = self.waiting.get(&builder).map(String::as_str)?;
        }
    }
}

#[derive(Default, Debug)]
pub(crate) struct ConstructionTracker {
    state: Mutex<TrackerState>,
    released: Condvar,
}

impl ConstructionTracker {
    /// Claims the right to build `element` for the current thread, waiting while another thread
    /// builds it. Fails with a dependency cycle instead of waiting when the builder, directly or
    /// through other waiting threads, waits for the current thread, or when the current thread
    /// already builds `element`.
    pub(crate) fn acquire(
        &self,
        element: &str,
    ) -> Result<ConstructionGuard<'_>, ElementInstanceProviderError> {
        let current = thread::current().id();
        let mut state = self.state.lock();

        while state.builders.contains_key(element) {
            if let Some(members) = state.find_cycle(current, element) {
                return Err(ElementInstanceProviderError::DependencyCycle(members));
            }

            trace!(element, "Waiting for element under construction.");

            state.waiting.insert(current, element.to_string());
            self.released.wait(&mut state);
            state.waiting.remove(&current);
        }

        state.builders.insert(element.to_string(), current);
        state
            .stacks
            .entry(current)
            .or_default()
            .push(element.to_string());

        Ok(ConstructionGuard {
            tracker: self,
            element: element.to_string(),
            thread: current,
        })
    }
}

/// Releases the claim on an element when dropped, waking up waiting threads.
#[derive(Debug)]
pub(crate) struct ConstructionGuard<'a> {
    tracker: &'a ConstructionTracker,
    element: String,
    thread: ThreadId,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.tracker.state.lock();
        state.builders.remove(&self.element);

        let empty = state
            .stacks
            .get_mut(&self.thread)
            .map(|stack| {
                stack.retain(|name| name != &self.element);
                stack.is_empty()
            })
            .unwrap_or(false);
        if empty {
            state.stacks.remove(&self.thread);
        }

        drop(state);
        self.tracker.released.notify_all();
    }
}
