// This file is part of the terraform-provider-juju project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{future::Future, time::Duration};

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::debug;

use super::ClientError;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

const RANDOMIZATION_FACTOR: f64 = 0.25;
const MULTIPLIER: f64 = 2.0;

impl RetryPolicy {
    /// Delays between attempts, bounded by the number of attempts rather than by time
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(MULTIPLIER)
            .with_randomization_factor(RANDOMIZATION_FACTOR)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Run `op` until it succeeds, fails with an error rejected by `should_retry`,
/// or the attempts of `policy` are exhausted
pub async fn retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
    P: Fn(&ClientError) -> bool,
{
    let attempts = policy.attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && should_retry(&err) => {
                let Some(delay) = backoff.next_backoff() else {
                    return Err(err);
                };
                debug!(attempt, ?delay, error = %err, "retrying controller call");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Poll `read` until the controller reports the object as gone
pub async fn wait_for_deletion<T, F, Fut>(policy: &RetryPolicy, mut read: F) -> Result<(), ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let attempts = policy.attempts.max(1);
    let mut backoff = policy.backoff();
    for attempt in 1..=attempts {
        match read().await {
            Err(ClientError::NotFound(_)) => return Ok(()),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => debug!(attempt, error = %err, "controller unreachable while waiting for deletion"),
            Ok(_) => debug!(attempt, "object still present, waiting for deletion"),
        }
        if attempt == attempts {
            break;
        }
        match backoff.next_backoff() {
            Some(delay) => tokio::time::sleep(delay).await,
            None => break,
        }
    }
    Err(ClientError::Api(format!(
        "object still present after {} attempts",
        attempts
    )))
}
