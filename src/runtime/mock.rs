//! Mock spawner for testing
//!
//! Runs tasks inline, drops them, or parks them until the test drives them
//! with [`MockSpawner::run_pending`].

use super::{AsyncSpawner, BoxFuture, JoinHandle};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

/// What MockSpawner does with a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpawnBehavior {
    /// Drop tasks without running them
    Drop,
    /// Run tasks to completion inside `spawn`
    BlockSync,
    /// Keep tasks until `run_pending` is called
    Deferred,
}

/// Mock spawner for testing
///
/// Clones share the deferred task list.
#[derive(Clone)]
pub struct MockSpawner {
    behavior: MockSpawnBehavior,
    parked: Arc<Mutex<VecDeque<BoxFuture<'static, ()>>>>,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSpawner")
            .field("behavior", &self.behavior)
            .field("parked", &self.parked.lock().len())
            .finish()
    }
}

impl MockSpawner {
    /// Create a mock spawner that drops tasks
    pub fn new() -> Self {
        Self::with_behavior(MockSpawnBehavior::Drop)
    }

    /// Create a mock spawner with specific behavior
    pub fn with_behavior(behavior: MockSpawnBehavior) -> Self {
        Self {
            behavior,
            parked: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a mock spawner that runs tasks synchronously
    pub fn blocking() -> Self {
        Self::with_behavior(MockSpawnBehavior::BlockSync)
    }

    /// Create a mock spawner that parks tasks
    pub fn deferred() -> Self {
        Self::with_behavior(MockSpawnBehavior::Deferred)
    }

    /// Number of parked tasks
    pub fn pending(&self) -> usize {
        self.parked.lock().len()
    }

    /// Run every parked task to completion, in spawn order
    ///
    /// Returns how many tasks ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // released before the task runs; tasks may spawn more
            let next = self.parked.lock().pop_front();
            let Some(task) = next else {
                return ran;
            };
            futures::executor::block_on(task);
            ran += 1;
        }
    }
}

impl AsyncSpawner for MockSpawner {
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.behavior {
            MockSpawnBehavior::Drop => drop(task),
            MockSpawnBehavior::BlockSync => futures::executor::block_on(task),
            MockSpawnBehavior::Deferred => self.parked.lock().push_back(Box::pin(task)),
        }
        JoinHandle::new(())
    }

    fn runtime_name(&self) -> &'static str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_mock_spawner_drop() {
        let spawner = MockSpawner::new();
        spawner.spawn(async {
            panic!("Should not run");
        });
        assert_eq!(spawner.pending(), 0);
    }

    #[test]
    fn test_mock_spawner_blocking() {
        let spawner = MockSpawner::blocking();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();

        spawner.spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mock_spawner_deferred_runs_in_order() {
        let spawner = MockSpawner::deferred();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            spawner.spawn(async move { order.lock().push(i) });
        }
        assert!(order.lock().is_empty());
        assert_eq!(spawner.pending(), 3);

        assert_eq!(spawner.run_pending(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }
}
