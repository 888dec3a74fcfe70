use tracing::debug;

use crate::{Benchmark, Error, LaunchHandler, Result};

/// An ordered collection of benchmarks with unique names.
///
/// The registry is an ordinary value. A benchmark binary typically creates one at startup, adds
/// every benchmark it knows about and then launches all of them, or those selected on the
/// command line.
///
/// # Examples
///
/// ```
/// use sweep_bench::{Benchmark, Context, Registry, SweepSettings, TracingHandler};
///
/// let settings = SweepSettings::builder().iterations(10).build();
///
/// let mut registry = Registry::new();
/// registry
///     .add_benchmark(Benchmark::from_fn("vec_push", settings.clone(), |_: &mut Context| {
///         let mut v = Vec::new();
///         v.push(1_u8);
///     }))
///     .unwrap();
/// registry
///     .add_benchmark(Benchmark::from_fn("string_push", settings, |_: &mut Context| {
///         let mut s = String::new();
///         s.push('a');
///     }))
///     .unwrap();
///
/// let launched = registry.launch_matching("vec", &mut TracingHandler).unwrap();
/// assert_eq!(launched, 1);
/// assert!(registry.get("vec_push").unwrap().is_launched());
/// assert!(!registry.get("string_push").unwrap().is_launched());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    benchmarks: Vec<Benchmark>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a benchmark to the end of the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateBenchmark`] if a benchmark with the same name is already
    /// registered. The registry is not modified in that case.
    pub fn add_benchmark(&mut self, benchmark: Benchmark) -> Result<()> {
        if self.get(benchmark.name()).is_some() {
            return Err(Error::DuplicateBenchmark {
                name: benchmark.name().to_string(),
            });
        }

        debug!(benchmark = benchmark.name(), "benchmark registered");

        self.benchmarks.push(benchmark);
        Ok(())
    }

    /// Launches every benchmark that has not been launched yet, in registration order.
    ///
    /// Returns the number of benchmarks launched.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error raised by [`Benchmark::launch()`]. Benchmarks after
    /// the failing one are not launched.
    pub fn launch_all(&mut self, handler: &mut dyn LaunchHandler) -> Result<usize> {
        self.launch_matching("", handler)
    }

    /// Launches every benchmark whose name contains `filter` and that has not been launched
    /// yet, in registration order. An empty filter matches every benchmark.
    ///
    /// Returns the number of benchmarks launched.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error raised by [`Benchmark::launch()`]. Benchmarks after
    /// the failing one are not launched.
    pub fn launch_matching(
        &mut self,
        filter: &str,
        handler: &mut dyn LaunchHandler,
    ) -> Result<usize> {
        let mut launched: usize = 0;

        for benchmark in &mut self.benchmarks {
            if benchmark.is_launched() || !benchmark.name().contains(filter) {
                continue;
            }

            benchmark.launch(handler)?;
            launched = launched.saturating_add(1);
        }

        Ok(launched)
    }

    /// All registered benchmarks, in registration order.
    #[must_use]
    pub fn benchmarks(&self) -> &[Benchmark] {
        &self.benchmarks
    }

    /// The benchmark with the given name, if one is registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Benchmark> {
        self.benchmarks
            .iter()
            .find(|benchmark| benchmark.name() == name)
    }

    /// Number of registered benchmarks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.benchmarks.len()
    }

    /// Whether no benchmarks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty()
    }
}
