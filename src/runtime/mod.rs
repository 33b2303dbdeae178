//! Async runtime abstraction for the callback entry points
//!
//! Loads are plain futures. Callers who prefer callbacks hand
//! [`AssetLoader::load_with`](crate::AssetLoader::load_with) a spawner for
//! whatever runtime they run (Tokio, or the mock in tests).

pub mod mock;
#[cfg(feature = "runtime-tokio")]
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

/// A boxed future that can be sent across threads
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handle to a spawned task
///
/// Type-erased; downcast to the runtime's own handle to await it.
#[derive(Debug)]
pub struct JoinHandle {
    inner: Box<dyn std::any::Any + Send>,
}

impl JoinHandle {
    /// Wrap a runtime-specific handle
    pub fn new<T: Send + 'static>(handle: T) -> Self {
        Self {
            inner: Box::new(handle),
        }
    }

    /// Try to downcast to a specific handle type
    pub fn downcast<T: 'static>(self) -> Option<T> {
        self.inner.downcast::<T>().ok().map(|b| *b)
    }
}

/// Async task spawner trait
///
/// # Example
/// ```ignore
/// let spawner = TokioSpawner::new();
/// loader.load_with(&spawner, "models/chair.obj", |result| {
///     let chair = result.expect("chair loads");
/// });
/// ```
pub trait AsyncSpawner: Send + Sync + Clone + Debug {
    /// Run `task` in the background
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static;

    /// Get the name of this runtime (for debugging)
    fn runtime_name(&self) -> &'static str;
}

// Re-export implementations
pub use mock::MockSpawner;

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioSpawner;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_handle_downcast() {
        let handle = JoinHandle::new(7usize);
        assert_eq!(handle.downcast::<usize>(), Some(7));
    }

    #[test]
    fn test_join_handle_wrong_type() {
        let handle = JoinHandle::new(7usize);
        assert!(handle.downcast::<String>().is_none());
    }
}
