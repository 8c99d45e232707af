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

//! Scheduler configuration.
//!
//! Values come from defaults, optionally a JSON document, then environment
//! variables, in that order of precedence (later wins).

use crate::account::OverdraftPolicy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const PERIOD_ENV: &str = "LEDGER_SCHEDULER_PERIOD_SECS";
pub const ALLOW_OVERDRAFT_ENV: &str = "LEDGER_SCHEDULER_ALLOW_OVERDRAFT";

/// Runtime settings for the scheduler and the in-memory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between two drain triggers.
    pub period_secs: u64,
    /// Whether debits may drive a balance negative.
    pub overdraft: OverdraftPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_secs: 5,
            overdraft: OverdraftPolicy::Reject,
        }
    }
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the period is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_secs == 0 {
            return Err(ConfigError::Invalid(
                "period_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed JSON, [`ConfigError::Invalid`] on
    /// out-of-range values.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: SchedulerConfig =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlays values read from the process environment.
    ///
    /// # Errors
    ///
    /// See [`SchedulerConfig::with_lookup`].
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Overlays values returned by `lookup` for [`PERIOD_ENV`] and
    /// [`ALLOW_OVERDRAFT_ENV`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if a variable is set but malformed,
    /// [`ConfigError::Invalid`] if the result does not validate.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(PERIOD_ENV) {
            self.period_secs = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::Parse(format!("{PERIOD_ENV}: {e}")))?;
        }
        if let Some(raw) = lookup(ALLOW_OVERDRAFT_ENV) {
            let allow: bool = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::Parse(format!("{ALLOW_OVERDRAFT_ENV}: {e}")))?;
            self.overdraft = if allow {
                OverdraftPolicy::Allow
            } else {
                OverdraftPolicy::Reject
            };
        }
        self.validate()?;
        Ok(self)
    }
}
