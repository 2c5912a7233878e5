//! Pluggable recovery policies.
//!
//! Strategies are tried in registration order and only the first whose
//! predicate matches is run, so registration order is the priority.
//! `can_recover` is called for every admitted error and must stay cheap and
//! side-effect free.

use std::future::Future;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::errors::AppError;
use crate::logging::LogValue;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecoveryError {
    #[error("recovery failed: {0}")]
    Failed(String),

    #[error("recovery panicked: {0}")]
    Panicked(String),
}

pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn can_recover(&self, error: &AppError) -> bool;

    fn recover<'a>(&'a self, error: &'a AppError) -> BoxFuture<'a, Result<LogValue, RecoveryError>>;

    /// Attempts of `recover` before giving up.
    fn max_retries(&self) -> u32 {
        1
    }

    /// Pause between attempts.
    fn retry_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// Strategy assembled from a predicate and an async recovery closure.
pub struct FnStrategy<P, R> {
    name: String,
    predicate: P,
    recover: R,
    max_retries: u32,
    retry_delay: Duration,
}

impl<P, R, Fut> FnStrategy<P, R>
where
    P: Fn(&AppError) -> bool + Send + Sync,
    R: Fn(AppError) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LogValue, RecoveryError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, predicate: P, recover: R) -> Self {
        Self {
            name: name.into(),
            predicate,
            recover,
            max_retries: 1,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

impl<P, R, Fut> RecoveryStrategy for FnStrategy<P, R>
where
    P: Fn(&AppError) -> bool + Send + Sync,
    R: Fn(AppError) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LogValue, RecoveryError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn can_recover(&self, error: &AppError) -> bool {
        (self.predicate)(error)
    }

    fn recover<'a>(&'a self, error: &'a AppError) -> BoxFuture<'a, Result<LogValue, RecoveryError>> {
        Box::pin((self.recover)(error.clone()))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}
