//! Asynchronous transform requests.
//!
//! [`TransformFuture`] is the caller's handle on a lookup that could not be
//! answered yet.  It wraps a shared cell (state + [`Condvar`]) that the core
//! resolves from whichever thread commits the satisfying sample, so the
//! handle works without any executor or event loop.
//!
//! Waiting with a timeout never changes the request: a timed-out wait
//! leaves it pending, and it may still resolve or be cancelled later.
//!
//! [`PendingRequests`] is the registry of unresolved requests the core
//! re-evaluates after every accepted sample.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rct_types::{Timestamp, TransformSample};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Lifecycle of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Resolved,
    Cancelled,
}

/// Why a value could not be retrieved from a [`TransformFuture`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// The wait elapsed; the request itself is still pending.
    #[error("transform request timed out while waiting")]
    Timeout,
    /// The request was cancelled before it resolved.
    #[error("transform request was cancelled")]
    Cancelled,
}

#[derive(Debug)]
enum CellState {
    Pending,
    Resolved(TransformSample),
    Cancelled,
}

#[derive(Debug)]
struct RequestCell {
    state: Mutex<CellState>,
    changed: Condvar,
}

impl RequestCell {
    fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle on the result of [`TransformerCore::request_transform`].
///
/// Clones share the same underlying request.
///
/// [`TransformerCore::request_transform`]: crate::TransformerCore::request_transform
#[derive(Debug, Clone)]
pub struct TransformFuture {
    id: Uuid,
    frame_from: String,
    frame_to: String,
    time: Timestamp,
    cell: Arc<RequestCell>,
}

impl TransformFuture {
    fn with_state(frame_from: &str, frame_to: &str, time: Timestamp, state: CellState) -> Self {
        Self {
            id: Uuid::new_v4(),
            frame_from: frame_from.to_string(),
            frame_to: frame_to.to_string(),
            time,
            cell: Arc::new(RequestCell {
                state: Mutex::new(state),
                changed: Condvar::new(),
            }),
        }
    }

    pub(crate) fn pending(frame_from: &str, frame_to: &str, time: Timestamp) -> Self {
        Self::with_state(frame_from, frame_to, time, CellState::Pending)
    }

    pub(crate) fn resolved(sample: TransformSample) -> Self {
        let (from, to, time) = (
            sample.frame_parent.clone(),
            sample.frame_child.clone(),
            sample.time,
        );
        Self::with_state(&from, &to, time, CellState::Resolved(sample))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Source frame of the requested lookup.
    pub fn frame_from(&self) -> &str {
        &self.frame_from
    }

    /// Target frame of the requested lookup.
    pub fn frame_to(&self) -> &str {
        &self.frame_to
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn status(&self) -> RequestStatus {
        match *self.cell.lock() {
            CellState::Pending => RequestStatus::Pending,
            CellState::Resolved(_) => RequestStatus::Resolved,
            CellState::Cancelled => RequestStatus::Cancelled,
        }
    }

    /// `true` once the request is resolved or cancelled.
    pub fn is_done(&self) -> bool {
        self.status() != RequestStatus::Pending
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == RequestStatus::Cancelled
    }

    /// Cancel the request and wake every waiter.
    ///
    /// Returns `true` if this call moved the request from pending to
    /// cancelled; cancelling a resolved or already cancelled request is a
    /// no-op returning `false`.
    pub fn cancel(&self) -> bool {
        let mut state = self.cell.lock();
        if !matches!(*state, CellState::Pending) {
            return false;
        }
        *state = CellState::Cancelled;
        drop(state);
        self.cell.changed.notify_all();
        debug!(request = %self.id, from = %self.frame_from, to = %self.frame_to, "transform request cancelled");
        true
    }

    /// Non-blocking retrieval: `None` while the request is pending.
    pub fn try_get(&self) -> Option<Result<TransformSample, RequestError>> {
        Self::outcome(&self.cell.lock())
    }

    /// Block until the request resolves or is cancelled.
    pub fn wait(&self) -> Result<TransformSample, RequestError> {
        let mut state = self.cell.lock();
        loop {
            if let Some(outcome) = Self::outcome(&state) {
                return outcome;
            }
            state = self
                .cell
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Cancelled`] as soon as the request is cancelled,
    ///   including while this call is blocked.
    /// - [`RequestError::Timeout`] when `timeout` elapses first; the request
    ///   stays pending.
    ///
    /// A timeout too large to represent as a deadline waits like [`Self::wait`].
    pub fn wait_timeout(&self, timeout: Duration) -> Result<TransformSample, RequestError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };
        let mut state = self.cell.lock();
        loop {
            if let Some(outcome) = Self::outcome(&state) {
                return outcome;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(RequestError::Timeout);
            }
            state = self
                .cell
                .changed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Resolve with `sample` unless already done.  Returns whether the
    /// request was still pending.
    pub(crate) fn resolve(&self, sample: TransformSample) -> bool {
        let mut state = self.cell.lock();
        if !matches!(*state, CellState::Pending) {
            return false;
        }
        *state = CellState::Resolved(sample);
        drop(state);
        self.cell.changed.notify_all();
        true
    }

    /// No handle outside the registry is left, so nobody can observe the
    /// outcome.
    fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.cell) == 1
    }

    fn outcome(state: &CellState) -> Option<Result<TransformSample, RequestError>> {
        match state {
            CellState::Pending => None,
            CellState::Resolved(sample) => Some(Ok(sample.clone())),
            CellState::Cancelled => Some(Err(RequestError::Cancelled)),
        }
    }
}

/// Registry of requests still waiting for data.
#[derive(Debug, Default)]
pub struct PendingRequests {
    requests: Vec<TransformFuture>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: TransformFuture) {
        self.requests.push(request);
    }

    /// Number of requests that are still pending and held by a caller.
    pub fn len(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| !r.is_abandoned() && r.status() == RequestStatus::Pending)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Try every pending request with `attempt`; resolve those that succeed
    /// and drop them, together with any cancelled or abandoned by their
    /// callers.
    ///
    /// Returns the number of requests resolved by this sweep.
    pub fn resolve_with<F>(&mut self, mut attempt: F) -> usize
    where
        F: FnMut(&TransformFuture) -> Option<TransformSample>,
    {
        let mut resolved = 0;
        self.requests.retain(|request| {
            if request.is_done() || request.is_abandoned() {
                return false;
            }
            match attempt(request) {
                Some(sample) => {
                    if request.resolve(sample) {
                        resolved += 1;
                        debug!(request = %request.id, from = %request.frame_from, to = %request.frame_to, time = request.time, "transform request resolved");
                    }
                    false
                }
                None => true,
            }
        });
        resolved
    }

    /// Cancel and drop every outstanding request.  Returns how many were
    /// still pending.
    pub fn cancel_all(&mut self) -> usize {
        self.requests.drain(..).filter(|r| r.cancel()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rct_types::Transform3D;
    use std::thread;

    fn result(from: &str, to: &str) -> TransformSample {
        TransformSample::new(from, to, 5, Transform3D::identity())
    }

    #[test]
    fn new_request_is_pending() {
        let f = TransformFuture::pending("foo", "bar", 5);
        assert_eq!(f.status(), RequestStatus::Pending);
        assert!(!f.is_done());
        assert!(!f.is_cancelled());
        assert!(f.try_get().is_none());
    }

    #[test]
    fn already_resolved_handle() {
        let f = TransformFuture::resolved(result("foo", "bar"));
        assert!(f.is_done());
        assert_eq!(f.frame_from(), "foo");
        assert_eq!(f.wait().unwrap(), result("foo", "bar"));
    }

    #[test]
    fn wait_timeout_reports_timeout_and_stays_pending() {
        let f = TransformFuture::pending("foo", "bar", 5);
        let started = Instant::now();
        assert_eq!(
            f.wait_timeout(Duration::from_millis(30)),
            Err(RequestError::Timeout)
        );
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(f.status(), RequestStatus::Pending);

        // Still resolvable after the timed-out wait.
        assert!(f.resolve(result("foo", "bar")));
        assert!(f.wait_timeout(Duration::from_millis(30)).is_ok());
    }

    #[test]
    fn wait_timeout_with_unbounded_duration() {
        let f = TransformFuture::pending("foo", "bar", 5);
        f.cancel();
        assert_eq!(f.wait_timeout(Duration::MAX), Err(RequestError::Cancelled));

        let f = TransformFuture::pending("foo", "bar", 5);
        let waiter = {
            let f = f.clone();
            thread::spawn(move || f.wait_timeout(Duration::MAX))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(f.resolve(result("foo", "bar")));
        assert_eq!(waiter.join().unwrap().unwrap(), result("foo", "bar"));
    }

    #[test]
    fn cancel_is_terminal_and_idempotent() {
        let f = TransformFuture::pending("foo", "bar", 5);
        assert!(f.cancel());
        assert!(!f.cancel());
        assert!(f.is_done());
        assert!(f.is_cancelled());
        assert_eq!(f.wait(), Err(RequestError::Cancelled));
        assert!(!f.resolve(result("foo", "bar")));
        assert_eq!(f.status(), RequestStatus::Cancelled);
    }

    #[test]
    fn cancel_after_resolution_is_noop() {
        let f = TransformFuture::pending("foo", "bar", 5);
        f.resolve(result("foo", "bar"));
        assert!(!f.cancel());
        assert!(!f.is_cancelled());
        assert!(f.try_get().unwrap().is_ok());
    }

    #[test]
    fn cancel_wakes_blocked_waiter() {
        let f = TransformFuture::pending("foo", "bar", 5);
        let waiter = {
            let f = f.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let outcome = f.wait_timeout(Duration::from_secs(10));
                (outcome, started.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        f.cancel();
        let (outcome, elapsed) = waiter.join().unwrap();
        assert_eq!(outcome, Err(RequestError::Cancelled));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn resolve_wakes_blocked_waiter() {
        let f = TransformFuture::pending("foo", "bar", 5);
        let waiter = {
            let f = f.clone();
            thread::spawn(move || f.wait())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(f.resolve(result("foo", "bar")));
        assert_eq!(waiter.join().unwrap().unwrap(), result("foo", "bar"));
    }

    #[test]
    fn registry_resolves_and_prunes() {
        let mut reg = PendingRequests::new();
        let ready = TransformFuture::pending("foo", "bar", 5);
        let waiting = TransformFuture::pending("foo", "baz", 5);
        let cancelled = TransformFuture::pending("foo", "qux", 5);
        reg.push(ready.clone());
        reg.push(waiting.clone());
        reg.push(cancelled.clone());
        cancelled.cancel();
        assert_eq!(reg.len(), 2);

        let resolved = reg.resolve_with(|r| {
            (r.frame_to() == "bar").then(|| result(r.frame_from(), r.frame_to()))
        });
        assert_eq!(resolved, 1);
        assert_eq!(ready.status(), RequestStatus::Resolved);
        assert_eq!(waiting.status(), RequestStatus::Pending);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn registry_drops_abandoned_requests() {
        let mut reg = PendingRequests::new();
        let kept = TransformFuture::pending("foo", "bar", 5);
        reg.push(kept.clone());
        for _ in 0..100 {
            reg.push(TransformFuture::pending("foo", "ghost", 5));
        }
        assert_eq!(reg.len(), 1);

        let mut attempts = 0;
        assert_eq!(
            reg.resolve_with(|_| {
                attempts += 1;
                None
            }),
            0
        );
        assert_eq!(attempts, 1);
        assert_eq!(reg.requests.len(), 1);
        assert_eq!(kept.status(), RequestStatus::Pending);
    }

    #[test]
    fn cancel_all_cancels_outstanding() {
        let mut reg = PendingRequests::new();
        let a = TransformFuture::pending("foo", "bar", 5);
        let b = TransformFuture::pending("foo", "baz", 5);
        reg.push(a.clone());
        reg.push(b.clone());
        b.resolve(result("foo", "baz"));
        assert_eq!(reg.cancel_all(), 1);
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(reg.is_empty());
    }
}
