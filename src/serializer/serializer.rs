// ABOUTME: Deadline-aware mutual exclusion for in-flight requests.
// ABOUTME: Waiters give up as soon as their cancellation future completes.

use tokio::sync::{Mutex, MutexGuard};

/// Gate that admits at most one request at a time.
///
/// Unlike a plain lock, [`acquire`](Self::acquire) races the wait against a
/// cancellation future, so a slow holder can never stall a caller past its
/// own deadline.
///
/// # State
///
/// - **Free:** no permit outstanding; the next `acquire` succeeds at once.
/// - **Held:** one [`SerializerPermit`] is alive; other callers wait.
///
/// Releasing the permit (explicitly or by dropping it) returns the gate to
/// Free. The gate is reusable for its whole lifetime. Waiters are not
/// guaranteed to be admitted in arrival order.
#[derive(Debug, Default)]
pub struct RequestSerializer {
    gate: Mutex<()>,
}

/// Exclusive access to a [`RequestSerializer`].
///
/// Access is relinquished when the permit is dropped, which also covers
/// early returns and unwinding.
#[derive(Debug)]
#[must_use = "access is released as soon as the permit is dropped"]
pub struct SerializerPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl RequestSerializer {
    /// Create a serializer in the Free state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access.
    ///
    /// Returns `Some(permit)` once access is granted, or `None` if `cancel`
    /// completes first. When both are ready, cancellation wins, so a caller
    /// whose deadline has already passed is never admitted.
    ///
    /// # Arguments
    ///
    /// * `cancel` - A future that, when completed, abandons the wait.
    pub async fn acquire<F>(&self, cancel: F) -> Option<SerializerPermit<'_>>
    where
        F: std::future::Future,
    {
        tokio::pin!(cancel);

        tokio::select! {
            biased;
            _ = &mut cancel => {
                tracing::debug!("gave up waiting for request serializer");
                None
            }
            guard = self.gate.lock() => {
                tracing::trace!("request serializer acquired");
                Some(SerializerPermit { _guard: guard })
            }
        }
    }

    /// Take access only if it is free right now.
    pub fn try_acquire(&self) -> Option<SerializerPermit<'_>> {
        self.gate
            .try_lock()
            .ok()
            .map(|guard| SerializerPermit { _guard: guard })
    }

    /// Whether a permit is currently outstanding.
    pub fn is_held(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

impl SerializerPermit<'_> {
    /// Relinquish access, handing it to the next waiter.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SerializerPermit<'_> {
    fn drop(&mut self) {
        tracing::trace!("request serializer released");
    }
}
