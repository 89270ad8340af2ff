use std::sync::Arc;

use dashmap::DashSet;

/// Named run locks. At most one run per name at a time; different names
/// don't block each other. Acquisition never waits.
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    running: Arc<DashSet<&'static str>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a run holding `name` is already in progress.
    pub fn try_acquire(&self, name: &'static str) -> Option<RunGuard> {
        if self.running.insert(name) {
            Some(RunGuard { running: Arc::clone(&self.running), name })
        } else {
            None
        }
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.running.contains(name)
    }
}

/// Releases its lock on drop.
#[derive(Debug)]
pub struct RunGuard {
    running: Arc<DashSet<&'static str>>,
    name: &'static str,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.remove(self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let locks = RunLocks::new();
        let guard = locks.try_acquire("ladder-update").unwrap();
        assert!(locks.is_held("ladder-update"));
        assert!(locks.try_acquire("ladder-update").is_none());

        drop(guard);
        assert!(!locks.is_held("ladder-update"));
        assert!(locks.try_acquire("ladder-update").is_some());
    }

    #[test]
    fn names_are_independent() {
        let locks = RunLocks::new();
        let _ladder = locks.try_acquire("ladder-update").unwrap();
        assert!(locks.try_acquire("fixtures-update").is_some());
    }

    #[test]
    fn clones_share_state() {
        let locks = RunLocks::new();
        let other = locks.clone();
        let _g = locks.try_acquire("fixtures-update").unwrap();
        assert!(other.try_acquire("fixtures-update").is_none());
    }
}
