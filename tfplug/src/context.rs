//! Request-scoped cancellation, deadlines and values
//!
//! Every trait method receives a Context. The gRPC server hands out clones of
//! one root context per provider process, so `StopProvider` cancels all
//! in-flight operations at once.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::time;

/// Context carries request-scoped values like cancellation signals, timeouts, and metadata
/// Pass this as first parameter to async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    values: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    cancel: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                values: RwLock::new(HashMap::new()),
                cancel,
            }),
        }
    }

    /// Derives a child context that is cancelled when the timeout elapses or
    /// when this context is cancelled, whichever comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };

        let (cancel, _) = watch::channel(*self.inner.cancel.borrow());
        let values = self
            .inner
            .values
            .try_read()
            .map(|values| (*values).clone())
            .unwrap_or_default();

        let child = Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                values: RwLock::new(values),
                cancel,
            }),
        };

        let parent = self.clone();
        let weak = Arc::downgrade(&child.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent.cancelled() => {}
            }
            if let Some(inner) = weak.upgrade() {
                inner.cancel.send_replace(true);
            }
        });

        child
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        let mut values = self.inner.values.write().await;
        values.insert(key.to_string(), Arc::new(value));
        drop(values);
        self
    }

    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.inner.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.inner.cancel.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn cancel(&self) {
        self.inner.cancel.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_stores_and_retrieves_values() {
        let ctx = Context::new();
        let ctx = ctx.with_value("endpoint", "ovh-eu".to_string()).await;

        let value: Option<String> = ctx.get_value("endpoint").await;
        assert_eq!(value, Some("ovh-eu".to_string()));
    }

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn parent_cancel_reaches_child() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();

        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("child should observe parent cancellation");
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn child_keeps_parent_values() {
        let parent = Context::new().with_value("attempt", 3u32).await;
        let child = parent.with_timeout(Duration::from_secs(5));

        assert_eq!(child.get_value::<u32>("attempt").await, Some(3));
        assert!(child.deadline().is_some());
        assert!(parent.deadline().is_none());
    }

    #[test]
    fn cancelled_wakes_waiter_on_cancel() {
        let ctx = Context::new();
        let mut waiting = tokio_test::task::spawn(ctx.cancelled());
        tokio_test::assert_pending!(waiting.poll());

        ctx.cancel();

        assert!(waiting.is_woken());
        tokio_test::assert_ready!(waiting.poll());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
    }
}
