//! Marshaling of completion callbacks onto a caller-designated context.

use tokio::sync::mpsc;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where listener callbacks run.
///
/// [`inline`](DeliveryContext::inline) invokes listeners directly on the I/O
/// task that completed the call. [`queue`](DeliveryContext::queue) instead
/// sends completions to a [`DeliveryLoop`] the caller drives on whatever
/// task should observe callbacks — the analog of hopping from a worker
/// context back to the originating one before invoking the listener.
#[derive(Clone)]
pub struct DeliveryContext {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Inline,
    Queue(mpsc::UnboundedSender<Job>),
}

impl DeliveryContext {
    /// Deliver on the completing I/O task.
    pub fn inline() -> Self {
        Self { inner: Inner::Inline }
    }

    /// Deliver through a queue drained by the returned loop.
    pub fn queue() -> (Self, DeliveryLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Inner::Queue(tx),
            },
            DeliveryLoop { jobs: rx },
        )
    }

    pub(crate) fn dispatch(&self, job: Job) {
        match &self.inner {
            Inner::Inline => job(),
            Inner::Queue(tx) => {
                if tx.send(job).is_err() {
                    tracing::warn!("delivery loop dropped; completion discarded");
                }
            }
        }
    }
}

impl Default for DeliveryContext {
    fn default() -> Self {
        Self::inline()
    }
}

/// Drains queued completions on the task that runs it.
pub struct DeliveryLoop {
    jobs: mpsc::UnboundedReceiver<Job>,
}

impl DeliveryLoop {
    /// Run callbacks until every paired [`DeliveryContext`] is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            job();
        }
    }

    /// Wait for and run a single callback. Returns `false` once every paired
    /// [`DeliveryContext`] is dropped.
    pub async fn run_one(&mut self) -> bool {
        match self.jobs.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inline_runs_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let context = DeliveryContext::inline();

        let seen = Arc::clone(&count);
        context.dispatch(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_queue_defers_until_loop_runs() {
        let count = Arc::new(AtomicUsize::new(0));
        let (context, mut delivery) = DeliveryContext::queue();

        let seen = Arc::clone(&count);
        context.dispatch(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(delivery.run_one().await);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_drains_until_senders_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let (context, delivery) = DeliveryContext::queue();

        for _ in 0..3 {
            let seen = Arc::clone(&count);
            context.dispatch(Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        }
        drop(context);

        delivery.run().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_dispatch_after_loop_dropped_is_discarded() {
        let (context, delivery) = DeliveryContext::queue();
        drop(delivery);
        // must not panic
        context.dispatch(Box::new(|| {}));
    }
}
