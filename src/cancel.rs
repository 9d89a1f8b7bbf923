//! Cooperative cancellation for workflow runs.

use crate::error::{Result, WorkflowError};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type StopPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Stop request shared by everything in one run.
///
/// Stopping is observed by polling [`Cancellation::should_stop`] between work
/// units. The [`signal`](Cancellation::signal) token is forwarded to calls that
/// can be aborted mid-flight (HTTP requests).
#[derive(Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    predicate: Option<StopPredicate>,
}

impl Cancellation {
    /// A cancellation that only stops when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            predicate: None,
        }
    }

    /// Also stop whenever `predicate` returns true.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Request a stop.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the run has been asked to stop.
    pub fn should_stop(&self) -> bool {
        self.token.is_cancelled() || self.predicate.as_ref().is_some_and(|stop| stop())
    }

    /// `Err(Cancelled)` once a stop has been requested.
    pub fn check(&self) -> Result<()> {
        if self.should_stop() {
            tracing::info!("Cancellation observed");
            return Err(WorkflowError::Cancelled);
        }
        Ok(())
    }

    /// Abort signal for in-flight calls.
    pub fn signal(&self) -> &CancellationToken {
        &self.token
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancelled", &self.token.is_cancelled())
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}
