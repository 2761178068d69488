//! Viewport primitives provided by the host.

use super::model::{VisibilityEntry, VisibilityOptions};
use crate::scheduler::Disposer;

/// Callback receiving the new scroll position.
pub type ScrollListener = Box<dyn Fn(f64) + Send + Sync>;

/// Callback receiving visibility changes for one region.
pub type VisibilityListener = Box<dyn Fn(VisibilityEntry) + Send + Sync>;

/// Viewport geometry and change notifications.
///
/// Listeners are invoked on the host's thread in delivery order. Every
/// subscription returns a [`Disposer`] that the tracker releases exactly once.
pub trait ViewportHost: Send + Sync + 'static {
    /// Current vertical scroll position.
    fn scroll_position(&self) -> f64;

    /// Top offset of a region in document coordinates, or `None` if the
    /// region is not mounted.
    fn region_top(&self, reference: &str) -> Option<f64>;

    /// Listen for scroll events.
    fn subscribe_scroll(&self, listener: ScrollListener) -> Disposer;

    /// Whether [`observe_visibility`](Self::observe_visibility) is backed by
    /// a real notification primitive.
    fn supports_visibility(&self) -> bool {
        false
    }

    /// Listen for visibility changes of one region.
    ///
    /// Returns `None` if the host cannot observe visibility or the region is
    /// not mounted.
    fn observe_visibility(
        &self,
        _reference: &str,
        _options: &VisibilityOptions,
        _listener: VisibilityListener,
    ) -> Option<Disposer> {
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    type SharedScroll = Arc<dyn Fn(f64) + Send + Sync>;
    type SharedVisibility = Arc<dyn Fn(VisibilityEntry) + Send + Sync>;

    /// Scriptable in-memory host.
    #[derive(Default)]
    pub(crate) struct FakeViewport {
        supports_visibility: bool,
        position: Mutex<f64>,
        tops: Mutex<HashMap<String, f64>>,
        scroll: Arc<Mutex<HashMap<u64, SharedScroll>>>,
        visibility: Arc<Mutex<HashMap<u64, (String, SharedVisibility)>>>,
        next_id: AtomicU64,
        releases: Arc<AtomicUsize>,
    }

    impl FakeViewport {
        pub(crate) fn new(tops: &[(&str, f64)], supports_visibility: bool) -> Arc<Self> {
            let viewport = Self {
                supports_visibility,
                ..Self::default()
            };
            *viewport.tops.lock() = tops
                .iter()
                .map(|(reference, top)| (reference.to_string(), *top))
                .collect();
            Arc::new(viewport)
        }

        pub(crate) fn scroll_to(&self, position: f64) {
            *self.position.lock() = position;
            let listeners: Vec<SharedScroll> = self.scroll.lock().values().cloned().collect();
            for listener in listeners {
                listener(position);
            }
        }

        pub(crate) fn emit(&self, reference: &str, entry: VisibilityEntry) {
            let listeners: Vec<SharedVisibility> = self
                .visibility
                .lock()
                .values()
                .filter(|(r, _)| r == reference)
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            for listener in listeners {
                listener(entry);
            }
        }

        pub(crate) fn unmount(&self, reference: &str) {
            self.tops.lock().remove(reference);
        }

        pub(crate) fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }

        pub(crate) fn active_subscriptions(&self) -> usize {
            self.scroll.lock().len() + self.visibility.lock().len()
        }

        fn release<T: Send + 'static>(
            &self,
            registry: &Arc<Mutex<HashMap<u64, T>>>,
            id: u64,
        ) -> Disposer {
            let registry = Arc::clone(registry);
            let releases = Arc::clone(&self.releases);
            Disposer::new(move || {
                registry.lock().remove(&id);
                releases.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    impl ViewportHost for FakeViewport {
        fn scroll_position(&self) -> f64 {
            *self.position.lock()
        }

        fn region_top(&self, reference: &str) -> Option<f64> {
            self.tops.lock().get(reference).copied()
        }

        fn subscribe_scroll(&self, listener: ScrollListener) -> Disposer {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.scroll.lock().insert(id, Arc::from(listener));
            self.release(&self.scroll, id)
        }

        fn supports_visibility(&self) -> bool {
            self.supports_visibility
        }

        fn observe_visibility(
            &self,
            reference: &str,
            _options: &VisibilityOptions,
            listener: VisibilityListener,
        ) -> Option<Disposer> {
            if !self.supports_visibility || !self.tops.lock().contains_key(reference) {
                return None;
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.visibility
                .lock()
                .insert(id, (reference.to_string(), Arc::from(listener)));
            Some(self.release(&self.visibility, id))
        }
    }
}
