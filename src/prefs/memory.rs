use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use super::{PrefError, PrefResult, PreferenceSet, PreferenceStore};

#[derive(Debug, Default)]
struct Inner {
    prefs: PreferenceSet,
    saves: usize,
    failing: bool,
}

/// Shared in-memory [`PreferenceStore`]. Clones observe the same contents,
/// which lets a host keep a handle on a store moved into a runtime.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryPreferenceStore {
    /// Store seeded with `prefs`.
    pub fn new(prefs: PreferenceSet) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                prefs,
                ..Inner::default()
            })),
        }
    }

    /// Current persisted contents.
    pub fn snapshot(&self) -> PreferenceSet {
        self.lock().prefs.clone()
    }

    /// Successful saves so far.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    /// Makes subsequent saves fail with [`PrefError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("memory preference store lock poisoned; recovered inner value");
                poisoned.into_inner()
            }
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&mut self) -> PrefResult<PreferenceSet> {
        Ok(self.snapshot())
    }

    fn save(&mut self, prefs: &PreferenceSet) -> PrefResult<()> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(PrefError::Unavailable("memory store set to fail".to_string()));
        }
        inner.prefs = prefs.clone();
        inner.saves += 1;
        Ok(())
    }
}
