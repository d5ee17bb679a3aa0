use std::{num::NonZeroUsize, time::Duration};

use crate::constants::{DEFAULT_RUN_FREQUENCY, MIN_RUN_FREQUENCY};

/// An error parsing the run frequency startup argument.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RunFrequencyError {
    /// The argument was not a whole number of milliseconds.
    #[error("Run frequency {0:?} is not a number of milliseconds.")]
    NotANumber(String),
    /// The argument was below [`MIN_RUN_FREQUENCY`].
    #[error("Run frequency must be at least {min:?}, got {got:?}.")]
    TooSmall {
        /// The minimum allowed value.
        min: Duration,
        /// The value given.
        got: Duration,
    },
}

/// The config for the [`TxnPropagator`](crate::TxnPropagator).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields, default))]
pub struct TxnPropagatorConfig {
    /// The [`Duration`] the propagation thread waits between runs.
    ///
    /// Transactions submitted between runs are coalesced into a single batch.
    pub run_frequency: Duration,
    /// The number of threads used to hand batches out to peers.
    ///
    /// If this is [`None`] the global rayon thread-pool is used.
    pub fan_out_threads: Option<NonZeroUsize>,
}

impl Default for TxnPropagatorConfig {
    fn default() -> Self {
        Self {
            run_frequency: DEFAULT_RUN_FREQUENCY,
            fan_out_threads: None,
        }
    }
}

impl TxnPropagatorConfig {
    /// Parses a run frequency, given in milliseconds.
    pub fn parse_run_frequency(arg: &str) -> Result<Duration, RunFrequencyError> {
        let millis = arg
            .trim()
            .parse::<u64>()
            .map_err(|_| RunFrequencyError::NotANumber(arg.to_string()))?;

        let run_frequency = Duration::from_millis(millis);
        if run_frequency < MIN_RUN_FREQUENCY {
            return Err(RunFrequencyError::TooSmall {
                min: MIN_RUN_FREQUENCY,
                got: run_frequency,
            });
        }

        Ok(run_frequency)
    }

    /// Sets the run frequency from the startup argument, in milliseconds.
    ///
    /// A missing argument leaves the current value alone, an invalid one resets it to [`DEFAULT_RUN_FREQUENCY`].
    #[must_use]
    pub fn with_run_frequency_arg(mut self, arg: Option<&str>) -> Self {
        let Some(arg) = arg else {
            return self;
        };

        self.run_frequency = Self::parse_run_frequency(arg).unwrap_or_else(|e| {
            tracing::warn!("{e} Falling back to the default of {DEFAULT_RUN_FREQUENCY:?}.");
            DEFAULT_RUN_FREQUENCY
        });

        self
    }

    /// Returns the run frequency to start with, falling back to the default if the configured one is too small.
    pub(crate) fn initial_run_frequency(&self) -> Duration {
        if self.run_frequency < MIN_RUN_FREQUENCY {
            tracing::warn!(
                "Configured run frequency {:?} is below the minimum of {MIN_RUN_FREQUENCY:?}, using the default of {DEFAULT_RUN_FREQUENCY:?}.",
                self.run_frequency
            );
            return DEFAULT_RUN_FREQUENCY;
        }

        self.run_frequency
    }
}
