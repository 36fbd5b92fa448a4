use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("cancelled while waiting for a conversion slot")]
    Cancelled,
    #[error("conversion pool is closed")]
    Closed,
}

/// Bounded set of conversion tasks.
///
/// At most `bound` submitted tasks run at once. `submit` waits for a free slot,
/// which throttles the producer instead of queueing without limit. Each task
/// holds its permit until it returns.
pub struct ConversionPool<T> {
    permits: Arc<Semaphore>,
    bound: usize,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> ConversionPool<T> {
    pub fn new(bound: usize) -> Self {
        let bound = bound.max(1);
        Self {
            permits: Arc::new(Semaphore::new(bound)),
            bound,
            tasks: JoinSet::new(),
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.bound - self.permits.available_permits()
    }

    /// Tasks spawned and not yet collected, running or finished.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub async fn submit<F>(&mut self, task: F, cancel: &CancellationToken) -> Result<(), PoolError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PoolError::Cancelled),
            permit = self.permits.clone().acquire_owned() => permit.map_err(|_| PoolError::Closed)?,
        };
        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
        Ok(())
    }

    /// Results of tasks that already finished, without waiting.
    pub fn try_collect(&mut self) -> Vec<Result<T, JoinError>> {
        let mut done = Vec::new();
        while let Some(result) = self.tasks.try_join_next() {
            done.push(result);
        }
        done
    }

    /// Wait for every submitted task and return their results in completion order.
    pub async fn drain(&mut self) -> Vec<Result<T, JoinError>> {
        let mut done = Vec::with_capacity(self.tasks.len());
        while let Some(result) = self.tasks.join_next().await {
            done.push(result);
        }
        done
    }
}
