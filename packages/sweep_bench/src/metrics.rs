use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Counters collected for one [`Phase`][crate::Phase].
///
/// A `Metrics` value has exactly one writer at any point in time. Worker threads collect into
/// their own [`Context`][crate::Context] buffer and only publish the finished window into the
/// phase tree after they stop collecting, so none of the methods here need synchronization.
///
/// Collection happens in windows. Every [`start_collecting()`][Self::start_collecting] /
/// [`stop_collecting()`][Self::stop_collecting] pair adds the window to the accumulated elapsed
/// time; repeating the pair accumulates rather than resets.
///
/// # Examples
///
/// ```
/// use sweep_bench::Metrics;
///
/// let mut metrics = Metrics::default();
///
/// metrics.start_collecting();
/// metrics.add_iterations(10);
/// metrics.add_bytes(4096);
/// metrics.stop_collecting();
///
/// assert_eq!(metrics.iterations(), 10);
/// assert_eq!(metrics.bytes(), 4096);
/// assert!(metrics.avg_time().is_some());
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Metrics {
    iterations: u64,
    elapsed: Duration,
    items: u64,
    bytes: u64,

    // Shortest and longest single collection window seen so far.
    min_time: Option<Duration>,
    max_time: Option<Duration>,

    custom: BTreeMap<String, i64>,

    collecting_since: Option<Instant>,
}

impl Metrics {
    /// Starts a collection window. Does nothing if a window is already open.
    pub fn start_collecting(&mut self) {
        if self.collecting_since.is_none() {
            self.collecting_since = Some(Instant::now());
        }
    }

    /// Closes the current collection window, adding its duration to the elapsed time.
    ///
    /// Does nothing if no window is open.
    pub fn stop_collecting(&mut self) {
        if let Some(since) = self.collecting_since.take() {
            self.record_window(since.elapsed());
        }
    }

    /// Whether a collection window is currently open.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.collecting_since.is_some()
    }

    fn record_window(&mut self, window: Duration) {
        self.elapsed = self.elapsed.saturating_add(window);
        self.min_time = Some(self.min_time.map_or(window, |min| min.min(window)));
        self.max_time = Some(self.max_time.map_or(window, |max| max.max(window)));
    }

    /// Adds `n` completed iterations.
    pub fn add_iterations(&mut self, n: u64) {
        self.iterations = self.iterations.saturating_add(n);
    }

    /// Adds `n` processed items, used for items-per-second throughput.
    pub fn add_items(&mut self, n: u64) {
        self.items = self.items.saturating_add(n);
    }

    /// Adds `n` processed bytes, used for bytes-per-second throughput.
    pub fn add_bytes(&mut self, n: u64) {
        self.bytes = self.bytes.saturating_add(n);
    }

    /// Adds `delta` to the named custom counter, creating it at zero if it does not exist.
    pub fn add_custom(&mut self, name: &str, delta: i64) {
        if let Some(value) = self.custom.get_mut(name) {
            *value = value.saturating_add(delta);
        } else {
            self.custom.insert(name.to_string(), delta);
        }
    }

    /// Overwrites the named custom counter.
    pub fn set_custom(&mut self, name: &str, value: i64) {
        self.custom.insert(name.to_string(), value);
    }

    /// Number of completed iterations.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Total time spent in closed collection windows.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of processed items.
    #[must_use]
    pub fn items(&self) -> u64 {
        self.items
    }

    /// Number of processed bytes.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Duration of the shortest collection window, if any window was closed.
    #[must_use]
    pub fn min_time(&self) -> Option<Duration> {
        self.min_time
    }

    /// Duration of the longest collection window, if any window was closed.
    #[must_use]
    pub fn max_time(&self) -> Option<Duration> {
        self.max_time
    }

    /// Value of the named custom counter.
    #[must_use]
    pub fn custom(&self, name: &str) -> Option<i64> {
        self.custom.get(name).copied()
    }

    /// All custom counters, ordered by name.
    pub fn custom_counters(&self) -> impl Iterator<Item = (&str, i64)> {
        self.custom.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Whether any iteration was recorded. Metrics without data take no part in best/worst
    /// selection.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.iterations != 0
    }

    /// Average time per iteration, or `None` if no iterations were recorded.
    #[must_use]
    pub fn avg_time(&self) -> Option<Duration> {
        let nanos = self
            .elapsed
            .as_nanos()
            .checked_div(u128::from(self.iterations))?;

        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Iterations completed per second of elapsed time.
    #[must_use]
    pub fn iterations_per_second(&self) -> Option<f64> {
        self.per_second(self.iterations)
    }

    /// Items processed per second of elapsed time.
    #[must_use]
    pub fn items_per_second(&self) -> Option<f64> {
        self.per_second(self.items)
    }

    /// Bytes processed per second of elapsed time.
    #[must_use]
    pub fn bytes_per_second(&self) -> Option<f64> {
        self.per_second(self.bytes)
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "throughput is a floating point estimate, precision loss at 2^53 is acceptable"
    )]
    fn per_second(&self, count: u64) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();

        if seconds > 0.0 {
            Some(count as f64 / seconds)
        } else {
            None
        }
    }

    /// Whether these metrics have a strictly lower average time per iteration than `other`.
    ///
    /// Metrics without data are neither better nor worse than anything.
    #[must_use]
    pub fn is_better_than(&self, other: &Self) -> bool {
        match (self.avg_time(), other.avg_time()) {
            (Some(ours), Some(theirs)) => ours < theirs,
            _ => false,
        }
    }

    /// Whether these metrics have a strictly higher average time per iteration than `other`.
    ///
    /// Metrics without data are neither better nor worse than anything.
    #[must_use]
    pub fn is_worse_than(&self, other: &Self) -> bool {
        match (self.avg_time(), other.avg_time()) {
            (Some(ours), Some(theirs)) => ours > theirs,
            _ => false,
        }
    }

    /// Folds the closed windows and counters of `other` into `self`.
    ///
    /// An open window in `other` is ignored; only closed windows carry elapsed time.
    pub fn merge(&mut self, other: &Self) {
        self.iterations = self.iterations.saturating_add(other.iterations);
        self.elapsed = self.elapsed.saturating_add(other.elapsed);
        self.items = self.items.saturating_add(other.items);
        self.bytes = self.bytes.saturating_add(other.bytes);

        self.min_time = match (self.min_time, other.min_time) {
            (Some(ours), Some(theirs)) => Some(ours.min(theirs)),
            (ours, theirs) => ours.or(theirs),
        };
        self.max_time = match (self.max_time, other.max_time) {
            (Some(ours), Some(theirs)) => Some(ours.max(theirs)),
            (ours, theirs) => ours.or(theirs),
        };

        for (name, value) in &other.custom {
            self.add_custom(name, *value);
        }
    }

    /// Creates metrics as if one collection window of `elapsed` covered `iterations` iterations.
    #[cfg(test)]
    pub(crate) fn from_sample(iterations: u64, elapsed: Duration) -> Self {
        let mut metrics = Self::default();
        metrics.add_iterations(iterations);
        metrics.record_window(elapsed);
        metrics
    }
}
