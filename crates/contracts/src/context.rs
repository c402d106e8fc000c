//! DeliveryContext - cancellation and deadline carried through every delivery
//!
//! Composers hand the same context to every child unchanged. Handlers wrap each
//! blocking network call in [`DeliveryContext::guard`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::DeliveryError;

/// Cancellation + optional deadline for one delivery call
///
/// Clones share cancellation state: cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct DeliveryContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl DeliveryContext {
    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Context expiring `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Context expiring at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Context cancelled together with `token`
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast if the context is already done
    pub fn check(&self, handler: &str) -> Result<(), DeliveryError> {
        if self.is_cancelled() {
            return Err(DeliveryError::Cancelled {
                handler: handler.to_string(),
            });
        }
        if self.is_expired() {
            return Err(DeliveryError::DeadlineExceeded {
                handler: handler.to_string(),
            });
        }
        Ok(())
    }

    /// Run `fut` until it completes, the context is cancelled, or the deadline passes
    pub async fn guard<F, T>(&self, handler: &str, fut: F) -> Result<T, DeliveryError>
    where
        F: Future<Output = Result<T, DeliveryError>>,
    {
        self.check(handler)?;

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            res = fut => res,
            _ = self.token.cancelled() => Err(DeliveryError::Cancelled {
                handler: handler.to_string(),
            }),
            _ = deadline => Err(DeliveryError::DeadlineExceeded {
                handler: handler.to_string(),
            }),
        }
    }
}
