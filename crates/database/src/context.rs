use crate::error::Fault;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// The deadline and cancellation signal for one database call.
///
/// The deadline is fixed when the context is created, so every step of a
/// call (waiting for a pooled connection, preparing, executing, fetching)
/// draws from the same budget. Cancelling the token aborts whichever step is
/// running; other calls sharing the session are unaffected.
#[derive(Debug, Clone)]
pub struct CallContext {
    timeout: Duration,
    deadline: Instant,
    token: CancellationToken,
}

impl CallContext {
    pub fn new(timeout: Duration) -> Self {
        Self::with_token(timeout, CancellationToken::new())
    }

    /// A `timeout` too large to represent (`Duration::MAX`, say) means the
    /// call has no practical deadline.
    pub fn with_token(timeout: Duration, token: CancellationToken) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self {
            timeout,
            deadline,
            token,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Runs one step of a call, giving up at the deadline or on cancellation.
    pub async fn run<T, F>(&self, step: F) -> Result<T, Fault>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Fault::Cancelled),
            outcome = tokio::time::timeout_at(self.deadline, step) => match outcome {
                Ok(result) => result.map_err(Fault::Sql),
                Err(_) => Err(Fault::TimedOut(self.timeout)),
            },
        }
    }
}
