//! Refresh callbacks for views of the rule lists

use rulesync_core::Scope;
use std::fmt;
use std::sync::Arc;

/// Notified after an operation changed the stored state of a scope
pub trait RefreshObserver: Send + Sync {
    /// State of `scope` changed
    fn refresh(&self, scope: Scope);
}

impl<F> RefreshObserver for F
where
    F: Fn(Scope) + Send + Sync,
{
    fn refresh(&self, scope: Scope) {
        self(scope);
    }
}

/// Registered observers
#[derive(Clone, Default)]
pub struct Observers {
    inner: Vec<Arc<dyn RefreshObserver>>,
}

impl Observers {
    /// Create an empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn register(&mut self, observer: Arc<dyn RefreshObserver>) {
        self.inner.push(observer);
    }

    /// Number of registered observers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether none are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Notify every observer
    pub fn refresh(&self, scope: Scope) {
        for observer in &self.inner {
            observer.refresh(scope);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn closures_are_observers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut observers = Observers::new();
        observers.register(Arc::new(move |scope: Scope| sink.lock().push(scope)));
        assert_eq!(observers.len(), 1);

        observers.refresh(Scope::Workspace);
        assert_eq!(*seen.lock(), vec![Scope::Workspace]);
    }
}
