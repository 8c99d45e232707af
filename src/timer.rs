// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fixed-period trigger for a [`Scheduler`].
//!
//! Ticks come from a tokio [`interval`](tokio::time::interval). Every tick
//! starts a drain cycle on the blocking pool and does not wait for it, so a
//! tick that fires while a slow cycle is still running reaches the
//! scheduler's guard and is dropped there.

use crate::error::{ConfigError, CycleError};
use crate::scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

/// Handle to a running ticker.
pub struct SchedulerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops ticking and waits for any cycle already started to finish.
    pub async fn shutdown(self) {
        // The ticker only exits after the signal or a panic; either way join.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!("scheduler ticker terminated abnormally: {}", e);
        }
    }
}

/// Starts triggering `scheduler` every `period` on the current tokio runtime.
///
/// The first cycle starts immediately. Ticks missed while the runtime was
/// busy are skipped rather than replayed.
///
/// # Errors
///
/// [`ConfigError::Invalid`] if `period` is zero; nothing is spawned.
pub fn spawn(
    scheduler: Arc<Scheduler>,
    period: Duration,
) -> Result<SchedulerHandle, ConfigError> {
    if period.is_zero() {
        return Err(ConfigError::Invalid("period must be greater than 0".into()));
    }
    let (shutdown, mut shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        tracing::info!(period_ms = period.as_millis() as u64, "scheduler started");
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    let scheduler = Arc::clone(&scheduler);
                    cycles.spawn_blocking(move || run_cycle(&scheduler));
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("drain cycle panicked: {}", e);
                    }
                }
            }
        }

        // Cycles are never cancelled midway.
        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                tracing::error!("drain cycle panicked: {}", e);
            }
        }
        tracing::info!("scheduler stopped");
    });

    Ok(SchedulerHandle { shutdown, task })
}

fn run_cycle(scheduler: &Scheduler) {
    match scheduler.process_queue() {
        Ok(_) => {}
        Err(CycleError::AlreadyDraining) => {
            tracing::debug!("tick skipped, previous cycle still draining");
        }
        Err(e @ CycleError::SourceUnavailable(_)) => {
            tracing::warn!("drain cycle aborted: {}", e);
        }
    }
}
