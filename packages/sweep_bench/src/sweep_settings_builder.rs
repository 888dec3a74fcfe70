use std::num::NonZero;
use std::time::Duration;

use crate::{MpmcPair, ParamTuple, SweepSettings, UNBOUNDED_ITERATIONS};

const DEFAULT_ATTEMPTS: NonZero<u32> = NonZero::new(5).expect("5 is not zero");
const DEFAULT_THREADS: NonZero<usize> = NonZero::new(1).expect("1 is not zero");
const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(1);

/// Builds a [`SweepSettings`] instance.
///
/// Defaults: 5 attempts, 1 thread, no parameter tuples and no MPMC pairs (both normalized to a
/// single entry at launch time).
///
/// The two budgets depend on each other. If neither is set, the loop is bounded by a time budget
/// of one second only. If only the iteration budget is set, there is no time budget. If only the
/// time budget is set, there is no iteration budget. If both are set, the loop continues until
/// both are used up.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct SweepSettingsBuilder {
    attempts: Option<NonZero<u32>>,
    iterations: Option<i64>,
    time_budget: Option<Duration>,
    params: Vec<ParamTuple>,
    mpmc_pairs: Vec<MpmcPair>,
    threads: Option<NonZero<usize>>,
}

impl SweepSettingsBuilder {
    /// Sets the number of times every sweep point is executed.
    pub fn attempts(self, attempts: NonZero<u32>) -> Self {
        Self {
            attempts: Some(attempts),
            ..self
        }
    }

    /// Sets the iteration budget. [`UNBOUNDED_ITERATIONS`] (or any other value below one) means
    /// unbounded.
    pub fn iterations(self, iterations: i64) -> Self {
        Self {
            iterations: Some(iterations),
            ..self
        }
    }

    /// Sets the time budget. Zero means unbounded.
    pub fn time_budget(self, time_budget: Duration) -> Self {
        Self {
            time_budget: Some(time_budget),
            ..self
        }
    }

    /// Appends one parameter tuple to sweep.
    pub fn param(mut self, param: ParamTuple) -> Self {
        self.params.push(param);
        self
    }

    /// Appends parameter tuples to sweep.
    pub fn params(mut self, params: impl IntoIterator<Item = ParamTuple>) -> Self {
        self.params.extend(params);
        self
    }

    /// Appends one producer/consumer layout to sweep.
    pub fn mpmc_pair(mut self, pair: MpmcPair) -> Self {
        self.mpmc_pairs.push(pair);
        self
    }

    /// Appends producer/consumer layouts to sweep.
    pub fn mpmc_pairs(mut self, pairs: impl IntoIterator<Item = MpmcPair>) -> Self {
        self.mpmc_pairs.extend(pairs);
        self
    }

    /// Sets the number of worker threads for symmetric multithreaded benchmarks.
    pub fn threads(self, threads: NonZero<usize>) -> Self {
        Self {
            threads: Some(threads),
            ..self
        }
    }

    /// Completes the settings.
    #[must_use]
    pub fn build(self) -> SweepSettings {
        let (iterations, time_budget) = match (self.iterations, self.time_budget) {
            (None, None) => (UNBOUNDED_ITERATIONS, DEFAULT_TIME_BUDGET),
            (Some(iterations), None) => (iterations, Duration::ZERO),
            (None, Some(time_budget)) => (UNBOUNDED_ITERATIONS, time_budget),
            (Some(iterations), Some(time_budget)) => (iterations, time_budget),
        };

        SweepSettings::new(
            self.attempts.unwrap_or(DEFAULT_ATTEMPTS),
            iterations,
            time_budget,
            self.params,
            self.mpmc_pairs,
            self.threads.unwrap_or(DEFAULT_THREADS),
        )
    }
}
