//! Retry state machine for a single batch download.
//!
//! ```text
//! Idle ──▶ Attempting ──ok──▶ Succeeded
//!              │  ▲
//!             err │ (after fixed delay)
//!              ▼  │
//!           Retrying ──attempts spent──▶ Exhausted
//! ```

use std::time::Duration;
use tracing::warn;

use super::provider::DataError;

/// Attempt budget and fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

#[derive(Debug)]
pub enum RetryState<T> {
    Idle,
    Attempting { attempt: u32 },
    Retrying { attempt: u32, last_error: DataError },
    Succeeded { attempts: u32, value: T },
    Exhausted { attempts: u32, last_error: DataError },
}

impl<T> RetryState<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. } | RetryState::Exhausted { .. }
        )
    }
}

/// Drives one operation through `RetryState` transitions.
#[derive(Debug)]
pub struct RetryMachine<T> {
    policy: RetryPolicy,
    state: RetryState<T>,
}

impl<T> RetryMachine<T> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> &RetryState<T> {
        &self.state
    }

    /// Advance one transition. Terminal states are absorbing.
    ///
    /// `Retrying → Attempting` blocks for the policy delay.
    pub fn step<F>(&mut self, op: &mut F)
    where
        F: FnMut(u32) -> Result<T, DataError>,
    {
        let current = std::mem::replace(&mut self.state, RetryState::Idle);
        self.state = match current {
            RetryState::Idle => RetryState::Attempting { attempt: 1 },
            RetryState::Attempting { attempt } => match op(attempt) {
                Ok(value) => RetryState::Succeeded {
                    attempts: attempt,
                    value,
                },
                Err(e) if attempt < self.policy.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "download attempt failed"
                    );
                    RetryState::Retrying {
                        attempt,
                        last_error: e,
                    }
                }
                Err(e) => RetryState::Exhausted {
                    attempts: attempt,
                    last_error: e,
                },
            },
            RetryState::Retrying { attempt, .. } => {
                if !self.policy.delay.is_zero() {
                    std::thread::sleep(self.policy.delay);
                }
                RetryState::Attempting {
                    attempt: attempt + 1,
                }
            }
            terminal => terminal,
        };
    }

    /// Step until a terminal state is reached.
    pub fn run<F>(mut self, mut op: F) -> RetryState<T>
    where
        F: FnMut(u32) -> Result<T, DataError>,
    {
        while !self.state.is_terminal() {
            self.step(&mut op);
        }
        self.state
    }
}
