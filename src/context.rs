use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Per-call context handed down by the host runtime
///
/// Carries the host's cancellation signal. Outbound calls are raced against it
/// so a host abort drops in-flight requests instead of leaking them.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
}

/// Returned by [`Context::run`] when the host cancelled the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Token the host triggers to abort the current call
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` to completion unless the context is cancelled first
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Cancelled>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}
