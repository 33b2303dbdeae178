//! Tokio spawner

use super::{AsyncSpawner, JoinHandle};
use std::future::Future;

/// Spawns tasks on the current Tokio runtime
///
/// The [`JoinHandle`] wraps a `tokio::task::JoinHandle<()>`.
#[derive(Clone, Debug, Default, Copy)]
pub struct TokioSpawner;

impl TokioSpawner {
    /// Create a new Tokio spawner
    pub fn new() -> Self {
        Self
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        JoinHandle::new(tokio::spawn(task))
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawned_task_can_be_awaited() {
        let (sender, receiver) = futures::channel::oneshot::channel();
        let handle = TokioSpawner::new().spawn(async move {
            let _ = sender.send(5u8);
        });

        let inner = handle
            .downcast::<tokio::task::JoinHandle<()>>()
            .expect("tokio handle");
        inner.await.unwrap();
        assert_eq!(receiver.await, Ok(5));
    }

    #[test]
    fn test_tokio_runtime_name() {
        assert_eq!(TokioSpawner::new().runtime_name(), "Tokio");
    }
}
