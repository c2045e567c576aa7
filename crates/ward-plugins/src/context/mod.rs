//! Cancellation and deadline propagation for plugin calls.
//!
//! Every validate, describe, and execute operation receives a
//! [`RequestContext`]. The host may cancel the shared [`CancellationToken`] or
//! bound the call with a deadline; plugins poll [`RequestContext::check`] at
//! convenient points and use [`RequestContext::sleep`] instead of
//! `std::thread::sleep` so long-running work returns promptly.


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Granularity of interruptible sleeps.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reason an in-flight request stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Interrupted {
    /// The cancellation token was triggered.
    #[error("request cancelled")]
    Cancelled,
    /// The request deadline elapsed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Shared cancellation flag.
///
/// Clones observe the same flag, so cancelling any clone cancels every
/// request context built from it.
///
/// # Example
///
/// ```
/// use ward_plugins::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing flag, for example one registered with a signal
    /// handler.
    #[must_use]
    pub const fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Returns the underlying flag.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Cancellable request scope passed to plugin operations.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ward_plugins::{Interrupted, RequestContext};
///
/// let ctx = RequestContext::background().with_timeout(Duration::from_secs(5));
/// assert!(ctx.check().is_ok());
///
/// ctx.token().cancel();
/// assert_eq!(ctx.check(), Err(Interrupted::Cancelled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context with a fresh token and no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a context observing the given token.
    #[must_use]
    pub const fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Bounds the context so it expires `timeout` from now. An earlier
    /// existing deadline is kept.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Bounds the context by an absolute deadline. An earlier existing
    /// deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(
            self.deadline
                .map_or(deadline, |current| current.min(deadline)),
        );
        self
    }

    /// Derives a context sharing this token with an additional timeout.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.clone().with_timeout(timeout)
    }

    /// Returns the cancellation token observed by this context.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the deadline, if one is set.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Reports whether the request should stop.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted::Cancelled`] once the token is cancelled and
    /// [`Interrupted::DeadlineExceeded`] once the deadline has passed.
    /// Cancellation takes precedence.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Sleeps for `duration`, waking early when the request is interrupted.
    ///
    /// # Errors
    ///
    /// Returns the interruption observed while sleeping.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let started = Instant::now();
        loop {
            self.check()?;
            let elapsed = started.elapsed();
            if elapsed >= duration {
                return Ok(());
            }
            let mut slice = duration.saturating_sub(elapsed).min(POLL_INTERVAL);
            if let Some(remaining) = self.remaining() {
                slice = slice.min(remaining);
            }
            std::thread::sleep(slice);
        }
    }
}
