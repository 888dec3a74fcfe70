use std::num::NonZero;
use std::sync::Arc;

use tracing::{debug, info};

use crate::execution::{run_concurrent, run_single};
use crate::{
    Bench, BenchmarkMeta, Context, Error, FixtureBench, FnBench, LaunchHandler, MpmcBench,
    PointRecord, Result, Role, SweepSettings, ThreadsBench, Topology,
};

#[derive(derive_more::Debug)]
enum Variant {
    Single(#[debug(ignore)] Box<dyn Bench>),
    Threads(#[debug(ignore)] Box<dyn ThreadsBench>),
    Mpmc(#[debug(ignore)] Box<dyn MpmcBench>),
}

/// A named unit of measured work together with the configuration space it sweeps.
///
/// A benchmark is one of three variants, chosen by the constructor:
///
/// * [`Benchmark::single()`] runs a [`Bench`] on the launching thread.
/// * [`Benchmark::threads()`] runs a [`ThreadsBench`] on a number of identical worker threads.
/// * [`Benchmark::mpmc()`] runs a [`MpmcBench`] on producer and consumer worker threads.
///
/// [`launch()`][Self::launch] executes the whole sweep exactly once. Sweep points are executed
/// one after another in a fixed order (attempts, then MPMC pairs, then parameter tuples) and
/// never overlap in time. For every sweep point, the given [`LaunchHandler`] is notified before
/// and after the point runs.
///
/// After a launch, [`points()`][Self::points] exposes the phase tree and the per-role totals of
/// every sweep point.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
/// use std::sync::Mutex;
/// use std::sync::mpsc::{Receiver, Sender, channel};
///
/// use sweep_bench::{Benchmark, Context, MpmcBench, MpmcPair, SweepSettings};
///
/// struct Channel {
///     sender: Mutex<Sender<u64>>,
///     receiver: Mutex<Receiver<u64>>,
/// }
///
/// impl MpmcBench for Channel {
///     fn run_producer(&self, _context: &mut Context) {
///         let sender = self.sender.lock().unwrap().clone();
///         sender.send(1).unwrap();
///     }
///
///     fn run_consumer(&self, context: &mut Context) {
///         if self.receiver.lock().unwrap().try_recv().is_ok() {
///             context.metrics_mut().add_items(1);
///         }
///     }
/// }
///
/// let (sender, receiver) = channel();
/// let bench = Channel {
///     sender: Mutex::new(sender),
///     receiver: Mutex::new(receiver),
/// };
///
/// let two = NonZero::new(2).unwrap();
/// let settings = SweepSettings::builder()
///     .attempts(NonZero::new(1).unwrap())
///     .iterations(100)
///     .mpmc_pair(MpmcPair::new(two, two))
///     .build();
///
/// let mut benchmark = Benchmark::mpmc("channel", settings, bench);
/// benchmark.launch(&mut ()).unwrap();
///
/// let point = &benchmark.points()[0];
/// assert_eq!(point.phase().children().len(), 4);
/// assert_eq!(point.role_total("producer").unwrap().iterations(), 200);
/// assert!(benchmark.is_launched());
/// ```
#[derive(Debug)]
pub struct Benchmark {
    meta: BenchmarkMeta,
    variant: Variant,

    points: Vec<PointRecord>,

    launched: bool,
}

impl Benchmark {
    /// Creates a single-threaded benchmark.
    #[must_use]
    pub fn single(
        name: impl Into<String>,
        settings: SweepSettings,
        bench: impl Bench + 'static,
    ) -> Self {
        Self::new(name, settings, Variant::Single(Box::new(bench)))
    }

    /// Creates a benchmark that runs on [`SweepSettings::threads()`] identical worker threads.
    #[must_use]
    pub fn threads(
        name: impl Into<String>,
        settings: SweepSettings,
        bench: impl ThreadsBench + 'static,
    ) -> Self {
        Self::new(name, settings, Variant::Threads(Box::new(bench)))
    }

    /// Creates a benchmark that runs producer and consumer worker threads for every
    /// [`MpmcPair`][crate::MpmcPair] in the settings.
    #[must_use]
    pub fn mpmc(
        name: impl Into<String>,
        settings: SweepSettings,
        bench: impl MpmcBench + 'static,
    ) -> Self {
        Self::new(name, settings, Variant::Mpmc(Box::new(bench)))
    }

    /// Creates a single-threaded benchmark whose measured body is a closure.
    #[must_use]
    pub fn from_fn(
        name: impl Into<String>,
        settings: SweepSettings,
        body: impl FnMut(&mut Context) + Send + 'static,
    ) -> Self {
        Self::single(name, settings, FnBench::new(body))
    }

    /// Creates a single-threaded benchmark that measures `body` against a fixture.
    ///
    /// The fixture is created by `factory` before every sweep point and dropped after it.
    #[must_use]
    pub fn with_fixture<T, Factory, Body>(
        name: impl Into<String>,
        settings: SweepSettings,
        factory: Factory,
        body: Body,
    ) -> Self
    where
        T: Send + 'static,
        Factory: FnMut(&Context) -> T + Send + 'static,
        Body: FnMut(&mut T, &mut Context) + Send + 'static,
    {
        Self::single(name, settings, FixtureBench::new(factory, body))
    }

    fn new(name: impl Into<String>, settings: SweepSettings, variant: Variant) -> Self {
        Self {
            meta: BenchmarkMeta::new(name, settings),
            variant,
            points: Vec::new(),
            launched: false,
        }
    }

    /// The name of the benchmark.
    #[must_use]
    pub fn name(&self) -> &str {
        self.meta.name()
    }

    /// The normalized sweep settings of the benchmark.
    #[must_use]
    pub fn settings(&self) -> &SweepSettings {
        self.meta.settings()
    }

    /// The name and settings of the benchmark.
    #[must_use]
    pub fn meta(&self) -> &BenchmarkMeta {
        &self.meta
    }

    /// Whether the full sweep has completed.
    #[must_use]
    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// The sweep points of the most recent launch, in sweep order.
    ///
    /// Empty before the first launch.
    #[must_use]
    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    /// Executes the full sweep.
    ///
    /// Every sweep point is executed once per attempt. The handler is notified synchronously
    /// before and after each one, on the calling thread.
    ///
    /// A panic in a single-threaded benchmark body, or in any root hook, propagates to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyLaunched`] if a previous launch completed.
    ///
    /// Returns [`Error::WorkerPanicked`] if a worker thread panicked. All other workers of the
    /// same sweep point still run to completion, and root cleanup and the handler still run for
    /// that point, before the sweep stops.
    ///
    /// Returns [`Error::SpawnFailed`] if a worker thread could not be started. Workers already
    /// started for the same sweep point are cancelled and joined first.
    ///
    /// If an error is returned, the benchmark is not marked as launched.
    pub fn launch(&mut self, handler: &mut dyn LaunchHandler) -> Result<()> {
        if self.launched {
            return Err(Error::AlreadyLaunched {
                benchmark: self.meta.name().to_string(),
            });
        }

        self.points = self.plan_points();

        let attempts = self.meta.settings().attempts().get();

        debug!(
            benchmark = self.meta.name(),
            attempts,
            points = self.points.len(),
            "launching benchmark"
        );

        for attempt_index in 0..attempts {
            let attempt = NonZero::<u32>::MIN.saturating_add(attempt_index);

            for point in &self.points {
                execute_point(&self.meta, &mut self.variant, point, attempt, handler)?;
            }
        }

        let point_count = self.points.len();
        for point in &mut self.points {
            point.refresh_summary(self.meta.name(), point_count);
        }

        self.launched = true;

        info!(
            benchmark = self.meta.name(),
            points = point_count,
            attempts,
            "benchmark launched"
        );

        Ok(())
    }

    fn plan_points(&self) -> Vec<PointRecord> {
        let settings = self.meta.settings();

        let topologies = match &self.variant {
            Variant::Single(_) => vec![Topology::Single],
            Variant::Threads(_) => vec![Topology::Threads(settings.threads())],
            Variant::Mpmc(_) => settings
                .mpmc_pairs()
                .iter()
                .copied()
                .map(Topology::Mpmc)
                .collect(),
        };

        topologies
            .into_iter()
            .flat_map(|topology| {
                settings
                    .params()
                    .iter()
                    .map(move |&params| PointRecord::new(self.meta.name(), topology, params))
            })
            .collect()
    }
}

fn execute_point(
    meta: &BenchmarkMeta,
    variant: &mut Variant,
    point: &PointRecord,
    attempt: NonZero<u32>,
    handler: &mut dyn LaunchHandler,
) -> Result<()> {
    let mut context = Context::new(Arc::clone(point.phase()), point.params(), point.topology());

    debug!(
        benchmark = meta.name(),
        point = %point.description(),
        attempt = attempt.get(),
        "sweep point starting"
    );

    handler.on_launching(meta, &context, attempt);

    let budget = meta.settings().budget();

    let outcome = match variant {
        Variant::Single(bench) => {
            run_single(&mut **bench, &mut context, budget);
            Ok(())
        }
        Variant::Threads(bench) => {
            let roles = (0..context.threads()).map(Role::Thread).collect::<Vec<_>>();

            bench.initialize(&mut context);
            let outcome = run_concurrent(
                meta.name(),
                &mut context,
                point,
                budget,
                &roles,
                &**bench,
            );
            bench.cleanup(&mut context);

            outcome
        }
        Variant::Mpmc(bench) => {
            let roles = (0..context.producers())
                .map(Role::Producer)
                .chain((0..context.consumers()).map(Role::Consumer))
                .collect::<Vec<_>>();

            bench.initialize(&mut context);
            let outcome = run_concurrent(
                meta.name(),
                &mut context,
                point,
                budget,
                &roles,
                &**bench,
            );
            bench.cleanup(&mut context);

            outcome
        }
    };

    // Publishes counters recorded by the root cleanup hook.
    context.stop_collecting();

    handler.on_launched(meta, &context, attempt);

    point.phase().choose_best_worst_metrics();

    debug!(
        benchmark = meta.name(),
        point = %point.description(),
        attempt = attempt.get(),
        success = outcome.is_ok(),
        "sweep point finished"
    );

    outcome
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "test code with known array bounds")]

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use mockall::Sequence;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::launch_handler::MockLaunchHandler;
    use crate::{MpmcPair, ParamTuple};

    assert_impl_all!(Benchmark: Send);

    fn nz(n: usize) -> NonZero<usize> {
        NonZero::new(n).unwrap()
    }

    fn attempts(n: u32) -> NonZero<u32> {
        NonZero::new(n).unwrap()
    }

    struct NoopMpmc;

    impl MpmcBench for NoopMpmc {
        fn run_producer(&self, _context: &mut Context) {}

        fn run_consumer(&self, _context: &mut Context) {}
    }

    #[test]
    fn handler_is_called_for_every_sweep_point_in_order() {
        let settings = SweepSettings::builder()
            .attempts(attempts(2))
            .iterations(1)
            .mpmc_pair(MpmcPair::new(nz(1), nz(1)))
            .mpmc_pair(MpmcPair::new(nz(2), nz(1)))
            .param(ParamTuple::single(1))
            .param(ParamTuple::single(2))
            .build();

        let log = Arc::new(Mutex::new(Vec::new()));

        let mut handler = MockLaunchHandler::new();
        handler.expect_on_launching().times(8).returning({
            let log = Arc::clone(&log);
            move |_, context, attempt| {
                log.lock()
                    .unwrap()
                    .push(format!("{} {}", attempt, context.description()));
            }
        });
        handler.expect_on_launched().times(8).return_const(());

        let mut benchmark = Benchmark::mpmc("order", settings, NoopMpmc);
        benchmark.launch(&mut handler).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            [
                "1 producers=1 consumers=1 (1)",
                "1 producers=1 consumers=1 (2)",
                "1 producers=2 consumers=1 (1)",
                "1 producers=2 consumers=1 (2)",
                "2 producers=1 consumers=1 (1)",
                "2 producers=1 consumers=1 (2)",
                "2 producers=2 consumers=1 (1)",
                "2 producers=2 consumers=1 (2)",
            ]
        );
    }

    #[test]
    fn launching_and_launched_alternate() {
        let mut seq = Sequence::new();
        let mut handler = MockLaunchHandler::new();

        for expected in 1..=3_u32 {
            handler
                .expect_on_launching()
                .withf(move |meta, _, attempt| meta.name() == "alternate" && attempt.get() == expected)
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
            handler
                .expect_on_launched()
                .withf(move |_, _, attempt| attempt.get() == expected)
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }

        let settings = SweepSettings::builder()
            .attempts(attempts(3))
            .iterations(1)
            .build();

        let mut benchmark = Benchmark::from_fn("alternate", settings, |_: &mut Context| {});
        benchmark.launch(&mut handler).unwrap();
    }

    #[test]
    fn producers_and_consumers_get_own_phases() {
        let settings = SweepSettings::builder()
            .attempts(attempts(1))
            .iterations(100)
            .mpmc_pair(MpmcPair::new(nz(2), nz(3)))
            .param(ParamTuple::single(100))
            .build();

        let mut benchmark = Benchmark::mpmc("roles", settings, NoopMpmc);
        benchmark.launch(&mut ()).unwrap();

        let point = &benchmark.points()[0];
        let root = point.phase();

        assert_eq!(root.samples().len(), 1);
        assert_eq!(root.samples()[0].iterations(), 1);

        let children = root.children();
        let producers = children
            .iter()
            .filter(|child| child.name() == "producer")
            .collect::<Vec<_>>();
        let consumers = children
            .iter()
            .filter(|child| child.name() == "consumer")
            .collect::<Vec<_>>();

        assert_eq!(producers.len(), 2);
        assert_eq!(consumers.len(), 3);

        for worker in producers.iter().chain(consumers.iter()) {
            assert_eq!(worker.samples()[0].iterations(), 100);
        }

        assert_eq!(point.role_total("producer").unwrap().iterations(), 200);
        assert_eq!(point.role_total("consumer").unwrap().iterations(), 300);
        assert_eq!(point.threads(), 5);
        assert_eq!(point.display_name(), "roles");
    }

    #[test]
    fn empty_dimensions_normalize_to_one_point() {
        let settings = SweepSettings::builder()
            .attempts(attempts(2))
            .iterations(3)
            .build();

        let mut handler = MockLaunchHandler::new();
        handler.expect_on_launching().times(2).return_const(());
        handler.expect_on_launched().times(2).return_const(());

        let mut benchmark = Benchmark::mpmc("defaults", settings, NoopMpmc);
        assert!(!benchmark.is_launched());

        benchmark.launch(&mut handler).unwrap();

        assert!(benchmark.is_launched());
        assert_eq!(benchmark.points().len(), 1);
        assert_eq!(
            benchmark.points()[0].topology(),
            Topology::Mpmc(MpmcPair::default())
        );
        assert_eq!(benchmark.points()[0].phase().samples().len(), 2);
    }

    #[test]
    fn second_launch_is_rejected() {
        let settings = SweepSettings::builder().iterations(1).build();
        let mut benchmark = Benchmark::from_fn("once", settings, |_: &mut Context| {});

        benchmark.launch(&mut ()).unwrap();
        let error = benchmark.launch(&mut ()).unwrap_err();

        assert!(matches!(error, Error::AlreadyLaunched { benchmark } if benchmark == "once"));
    }

    #[test]
    fn single_variant_measures_on_root_phase() {
        let calls = Arc::new(AtomicUsize::new(0));

        let settings = SweepSettings::builder()
            .attempts(attempts(2))
            .iterations(50)
            .params([1, 2, 3].map(ParamTuple::single))
            .build();

        let mut benchmark = Benchmark::from_fn("single", settings, {
            let calls = Arc::clone(&calls);
            move |context: &mut Context| {
                calls.fetch_add(1, Ordering::Relaxed);
                context.metrics_mut().add_items(2);
            }
        });
        benchmark.launch(&mut ()).unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 2 * 3 * 50);

        let names = benchmark
            .points()
            .iter()
            .map(|point| point.display_name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["single (1)", "single (2)", "single (3)"]);

        for point in benchmark.points() {
            let samples = point.phase().samples();
            assert_eq!(samples.len(), 2);
            assert!(samples.iter().all(|sample| sample.iterations() == 50));
            assert!(samples.iter().all(|sample| sample.items() == 100));
            assert!(point.phase().children().is_empty());
            assert!(point.role_totals().is_empty());
            assert_eq!(point.threads(), 1);
        }
    }

    struct PanickyThreads;

    impl ThreadsBench for PanickyThreads {
        fn run_thread(&self, context: &mut Context) {
            assert!(context.role() != Role::Thread(1), "thread 1 gives up");
        }
    }

    #[test]
    fn worker_panic_stops_sweep_after_point_completes() {
        let settings = SweepSettings::builder()
            .attempts(attempts(3))
            .iterations(5)
            .threads(nz(3))
            .build();

        let mut handler = MockLaunchHandler::new();
        handler.expect_on_launching().times(1).return_const(());
        handler.expect_on_launched().times(1).return_const(());

        let mut benchmark = Benchmark::threads("panicky", settings, PanickyThreads);
        let error = benchmark.launch(&mut handler).unwrap_err();

        assert!(matches!(error, Error::WorkerPanicked { ref role, .. } if role == "thread-1"));
        assert!(!benchmark.is_launched());

        let children = benchmark.points()[0].phase().children();
        let names = children.iter().map(|child| child.name()).collect::<Vec<_>>();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"thread-0"));
        assert!(names.contains(&"thread-2"));
    }

    #[test]
    fn threads_variant_creates_phases_per_attempt() {
        struct Counting;

        impl ThreadsBench for Counting {
            fn run_thread(&self, context: &mut Context) {
                context.metrics_mut().add_bytes(8);
            }
        }

        let settings = SweepSettings::builder()
            .attempts(attempts(2))
            .iterations(10)
            .threads(nz(3))
            .build();

        let mut benchmark = Benchmark::threads("threads", settings, Counting);
        benchmark.launch(&mut ()).unwrap();

        let point = &benchmark.points()[0];
        assert_eq!(point.phase().children().len(), 6);
        assert_eq!(point.threads(), 3);

        let total = point.role_total("thread").unwrap();
        assert_eq!(total.iterations(), 2 * 3 * 10);
        assert_eq!(total.bytes(), 2 * 3 * 10 * 8);
    }

    #[test]
    fn counters_from_cleanup_hooks_are_kept() {
        struct Tally;

        impl ThreadsBench for Tally {
            fn run_thread(&self, _context: &mut Context) {}

            fn cleanup_thread(&self, context: &mut Context) {
                context.metrics_mut().add_custom("thread_cleanups", 1);
            }

            fn cleanup(&mut self, context: &mut Context) {
                context.metrics_mut().add_custom("root_cleanups", 1);
            }
        }

        let settings = SweepSettings::builder()
            .attempts(attempts(1))
            .iterations(3)
            .threads(nz(2))
            .build();

        let mut benchmark = Benchmark::threads("tally", settings, Tally);
        benchmark.launch(&mut ()).unwrap();

        let point = &benchmark.points()[0];
        let root_sample = &point.phase().samples()[0];
        assert_eq!(root_sample.iterations(), 1);
        assert_eq!(root_sample.custom("root_cleanups"), Some(1));

        let total = point.role_total("thread").unwrap();
        assert_eq!(total.iterations(), 6);
        assert_eq!(total.custom("thread_cleanups"), Some(2));
    }

    struct CancellingProducer;

    impl MpmcBench for CancellingProducer {
        fn run_producer(&self, context: &mut Context) {
            if context.metrics().iterations() == 10 {
                context.cancel();
            }
        }

        fn run_consumer(&self, _context: &mut Context) {
            thread::yield_now();
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Real time is too slow under Miri.
    fn cancellation_reaches_every_worker() {
        let settings = SweepSettings::builder()
            .attempts(attempts(1))
            .time_budget(Duration::from_secs(3600))
            .build();

        let mut benchmark = Benchmark::mpmc("cancel", settings, CancellingProducer);
        benchmark.launch(&mut ()).unwrap();

        let point = &benchmark.points()[0];
        assert_eq!(point.role_total("producer").unwrap().iterations(), 10);
        assert!(point.role_total("consumer").is_some());
    }

    #[test]
    fn fixture_benchmark_rebuilds_fixture_per_point() {
        let built = Arc::new(AtomicUsize::new(0));

        let settings = SweepSettings::builder()
            .attempts(attempts(2))
            .iterations(4)
            .params([8, 16].map(ParamTuple::single))
            .build();

        let mut benchmark = Benchmark::with_fixture(
            "fixture",
            settings,
            {
                let built = Arc::clone(&built);
                move |context: &Context| {
                    built.fetch_add(1, Ordering::Relaxed);
                    Vec::<i64>::with_capacity(usize::try_from(context.x().unwrap()).unwrap())
                }
            },
            |fixture: &mut Vec<i64>, context: &mut Context| {
                fixture.push(context.x().unwrap());
                context.metrics_mut().add_custom("len", 1);
            },
        );
        benchmark.launch(&mut ()).unwrap();

        assert_eq!(built.load(Ordering::Relaxed), 4);
        assert_eq!(
            benchmark.points()[1].phase().samples()[0].custom("len"),
            Some(4)
        );
    }
}
