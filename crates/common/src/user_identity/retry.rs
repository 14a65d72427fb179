//! Bounded retry on collision
//!
//! [`with_retry`] runs an attempt until it succeeds, fails hard, or the
//! attempt budget is spent. [`with_budget`] does the same against a
//! caller-owned [`RetryBudget`], so several retry loops belonging to one
//! operation can draw from a single ceiling.

use std::future::Future;

/// Attempt counter shared across every retry loop of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    used: u32,
}

impl RetryBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            used: 0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max_attempts
    }

    /// Take one attempt; returns its 1-based number, or `None` when spent
    fn take(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }
}

/// Why a single attempt did not produce a value
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Retryable: the candidate was already taken
    Collision,
    /// Not retryable; aborts the loop immediately
    Fatal(E),
}

/// Why the retry loop gave up
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} colliding attempts")]
    Exhausted { attempts: u32 },
    #[error(transparent)]
    Fatal(E),
}

/// Retry `attempt` up to `max_attempts` times
pub async fn with_retry<T, E, F, Fut>(max_attempts: u32, attempt: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    let mut budget = RetryBudget::new(max_attempts);
    with_budget(&mut budget, attempt).await
}

/// Retry `attempt` until it succeeds or `budget` is spent
///
/// The closure receives the 1-based attempt number counted across the whole
/// budget, not just this call.
pub async fn with_budget<T, E, F, Fut>(
    budget: &mut RetryBudget,
    mut attempt: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    while let Some(number) = budget.take() {
        match attempt(number).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Collision) => continue,
            Err(AttemptError::Fatal(e)) => return Err(RetryError::Fatal(e)),
        }
    }

    Err(RetryError::Exhausted {
        attempts: budget.max_attempts(),
    })
}
