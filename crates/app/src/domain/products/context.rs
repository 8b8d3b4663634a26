//! Request Context

use std::{future::Future, time::Duration};

use jiff::{Timestamp, civil::Date, tz::TimeZone};
use tokio_util::sync::CancellationToken;

/// Why a guarded collaborator call did not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    TimedOut,
}

/// Per-request state threaded through validation, persistence and caching.
///
/// `now` is read from the clock once per request so every rule and resolver
/// agrees on the current instant.
#[derive(Debug, Clone)]
pub struct RequestContext {
    now: Timestamp,
    cancel: CancellationToken,
    timeout: Duration,
}

impl RequestContext {
    #[must_use]
    pub fn new(now: Timestamp, cancel: CancellationToken, timeout: Duration) -> Self {
        Self {
            now,
            cancel,
            timeout,
        }
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// The current UTC calendar date.
    #[must_use]
    pub fn today(&self) -> Date {
        self.now.to_zoned(TimeZone::UTC).date()
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run a collaborator call, giving up when the caller cancels or the
    /// per-call timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or `E::from(Interrupted)` when it was cut short.
    pub async fn guard<T, E, F>(&self, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Interrupted>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Interrupted::Cancelled.into()),
            result = tokio::time::timeout(self.timeout, call) => {
                result.unwrap_or_else(|_elapsed| Err(Interrupted::TimedOut.into()))
            }
        }
    }
}
