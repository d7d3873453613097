//! Cooperative cancellation and per-operation deadlines.
//!
//! Raster operations call [`OpBudget::check`] between strips or rows; GDAL
//! calls themselves are never interrupted mid-flight.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation exceeded its {0:?} time limit")]
    TimedOut(Duration),
}

/// Shared flag flipped once to stop every operation holding a clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation token plus an optional deadline, scoped to one operation.
#[derive(Debug, Clone)]
pub struct OpBudget {
    token: CancelToken,
    started: Instant,
    limit: Option<Duration>,
}

impl OpBudget {
    pub fn new(token: CancelToken, limit: Option<Duration>) -> Self {
        Self {
            token,
            started: Instant::now(),
            limit,
        }
    }

    /// Budget that never expires and cannot be cancelled from outside.
    pub fn unbounded() -> Self {
        Self::new(CancelToken::new(), None)
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if let Some(limit) = self.limit {
            if self.started.elapsed() > limit {
                return Err(Interrupted::TimedOut(limit));
            }
        }
        Ok(())
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}
