use crate::Context;

/// The body of a single-threaded benchmark.
///
/// All hooks run on the thread that launches the benchmark. For every sweep point,
/// [`initialize()`][Self::initialize] is called once, [`run()`][Self::run] is called repeatedly
/// inside the measured loop and [`cleanup()`][Self::cleanup] is called once. Only the calls to
/// `run()` are timed.
///
/// Because the hooks take `&mut self`, the implementing type itself can serve as the fixture
/// that `initialize()` prepares and `cleanup()` tears down.
///
/// # Examples
///
/// ```
/// use sweep_bench::{Bench, Benchmark, Context, SweepSettings};
///
/// #[derive(Default)]
/// struct SortBench {
///     data: Vec<u64>,
/// }
///
/// impl Bench for SortBench {
///     fn initialize(&mut self, context: &mut Context) {
///         let len = context.x().unwrap_or(1000) as u64;
///         self.data = (0..len).rev().collect();
///     }
///
///     fn run(&mut self, context: &mut Context) {
///         let mut copy = self.data.clone();
///         copy.sort_unstable();
///         context.metrics_mut().add_items(copy.len() as u64);
///     }
/// }
///
/// let mut benchmark = Benchmark::single(
///     "sort",
///     SweepSettings::builder().iterations(5).build(),
///     SortBench::default(),
/// );
/// benchmark.launch(&mut ()).unwrap();
/// ```
pub trait Bench: Send {
    /// Prepares the sweep point. Not timed.
    fn initialize(&mut self, context: &mut Context) {
        _ = context;
    }

    /// Executes one measured iteration.
    fn run(&mut self, context: &mut Context);

    /// Tears down the sweep point. Not timed.
    fn cleanup(&mut self, context: &mut Context) {
        _ = context;
    }
}

/// The body of a benchmark that runs on a number of identical worker threads.
///
/// The root hooks run on the thread that launches the benchmark, before the workers are started
/// and after all of them have finished. The thread hooks run concurrently on every worker and
/// therefore only receive `&self`; any state they share must synchronize itself.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// use sweep_bench::{Benchmark, Context, SweepSettings, ThreadsBench};
///
/// #[derive(Default)]
/// struct SharedCounter {
///     value: AtomicU64,
/// }
///
/// impl ThreadsBench for SharedCounter {
///     fn run_thread(&self, _context: &mut Context) {
///         self.value.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let settings = SweepSettings::builder()
///     .iterations(100)
///     .threads(NonZero::new(4).unwrap())
///     .build();
///
/// let mut benchmark = Benchmark::threads("shared_counter", settings, SharedCounter::default());
/// benchmark.launch(&mut ()).unwrap();
/// ```
pub trait ThreadsBench: Send + Sync {
    /// Prepares the sweep point before any worker starts. Not timed.
    fn initialize(&mut self, context: &mut Context) {
        _ = context;
    }

    /// Prepares one worker thread. Not timed.
    fn initialize_thread(&self, context: &mut Context) {
        _ = context;
    }

    /// Executes one measured iteration on a worker thread.
    fn run_thread(&self, context: &mut Context);

    /// Tears down one worker thread. Not timed.
    fn cleanup_thread(&self, context: &mut Context) {
        _ = context;
    }

    /// Tears down the sweep point after every worker has finished. Not timed.
    fn cleanup(&mut self, context: &mut Context) {
        _ = context;
    }
}

/// The body of a multiple-producer/multiple-consumer benchmark.
///
/// For every sweep point, the root hooks run on the thread that launches the benchmark while the
/// producer and consumer hooks run concurrently on their own worker threads. The number of each
/// comes from the [`MpmcPair`][crate::MpmcPair] of the sweep point.
///
/// Producers and consumers run their measured loops independently of each other and each is
/// bounded by the same budget. A consumer that waits for data must therefore be able to give up,
/// for example by checking [`Context::is_cancelled()`] or by using a non-blocking receive.
pub trait MpmcBench: Send + Sync {
    /// Prepares the sweep point before any worker starts. Not timed.
    fn initialize(&mut self, context: &mut Context) {
        _ = context;
    }

    /// Prepares one producer thread. Not timed.
    fn initialize_producer(&self, context: &mut Context) {
        _ = context;
    }

    /// Executes one measured iteration on a producer thread.
    fn run_producer(&self, context: &mut Context);

    /// Tears down one producer thread. Not timed.
    fn cleanup_producer(&self, context: &mut Context) {
        _ = context;
    }

    /// Prepares one consumer thread. Not timed.
    fn initialize_consumer(&self, context: &mut Context) {
        _ = context;
    }

    /// Executes one measured iteration on a consumer thread.
    fn run_consumer(&self, context: &mut Context);

    /// Tears down one consumer thread. Not timed.
    fn cleanup_consumer(&self, context: &mut Context) {
        _ = context;
    }

    /// Tears down the sweep point after every worker has finished. Not timed.
    fn cleanup(&mut self, context: &mut Context) {
        _ = context;
    }
}

/// A single-threaded benchmark whose body is a closure.
#[derive(derive_more::Debug)]
pub struct FnBench<F> {
    #[debug(ignore)]
    body: F,
}

impl<F> FnBench<F>
where
    F: FnMut(&mut Context) + Send,
{
    /// Wraps the closure that executes one measured iteration.
    pub fn new(body: F) -> Self {
        Self { body }
    }
}

impl<F> Bench for FnBench<F>
where
    F: FnMut(&mut Context) + Send,
{
    fn run(&mut self, context: &mut Context) {
        (self.body)(context);
    }
}

/// A single-threaded benchmark that measures a closure against a fixture.
///
/// The fixture is created by `factory` when a sweep point is initialized and dropped when it
/// is cleaned up, so every sweep point and every attempt starts from a fresh fixture. Neither
/// the creation nor the drop is timed.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use sweep_bench::{Benchmark, Context, ParamTuple, SweepSettings};
///
/// let settings = SweepSettings::builder()
///     .iterations(100)
///     .param(ParamTuple::single(10))
///     .param(ParamTuple::single(10_000))
///     .build();
///
/// let mut benchmark = Benchmark::with_fixture(
///     "map_lookup",
///     settings,
///     |context: &Context| {
///         (0..context.x().unwrap_or(1)).map(|k| (k, k)).collect::<HashMap<i64, i64>>()
///     },
///     |map: &mut HashMap<i64, i64>, context: &mut Context| {
///         assert!(map.contains_key(&0));
///         context.metrics_mut().add_items(1);
///     },
/// );
///
/// benchmark.launch(&mut ()).unwrap();
/// assert_eq!(benchmark.points().len(), 2);
/// ```
#[derive(derive_more::Debug)]
pub struct FixtureBench<T, Factory, Body> {
    #[debug(ignore)]
    factory: Factory,

    #[debug(ignore)]
    body: Body,

    #[debug(ignore)]
    fixture: Option<T>,
}

impl<T, Factory, Body> FixtureBench<T, Factory, Body>
where
    T: Send,
    Factory: FnMut(&Context) -> T + Send,
    Body: FnMut(&mut T, &mut Context) + Send,
{
    /// Combines the fixture factory with the closure that executes one measured iteration.
    pub fn new(factory: Factory, body: Body) -> Self {
        Self {
            factory,
            body,
            fixture: None,
        }
    }
}

impl<T, Factory, Body> Bench for FixtureBench<T, Factory, Body>
where
    T: Send,
    Factory: FnMut(&Context) -> T + Send,
    Body: FnMut(&mut T, &mut Context) + Send,
{
    fn initialize(&mut self, context: &mut Context) {
        self.fixture = Some((self.factory)(context));
    }

    fn run(&mut self, context: &mut Context) {
        let fixture = self
            .fixture
            .get_or_insert_with(|| (self.factory)(context));

        (self.body)(fixture, context);
    }

    fn cleanup(&mut self, _context: &mut Context) {
        self.fixture = None;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{ParamTuple, Phase, Topology};

    fn context() -> Context {
        Context::new(Phase::root("hooks"), ParamTuple::single(3), Topology::Single)
    }

    #[test]
    fn fn_bench_calls_closure() {
        let mut calls = 0;

        {
            let mut bench = FnBench::new(|context: &mut Context| {
                calls += 1;
                context.metrics_mut().add_items(2);
            });

            let mut context = context();
            bench.run(&mut context);
            bench.run(&mut context);

            assert_eq!(context.metrics().items(), 4);
        }

        assert_eq!(calls, 2);
    }

    #[test]
    fn fixture_lives_from_initialize_to_cleanup() {
        let created = Arc::new(AtomicUsize::new(0));

        let mut bench = FixtureBench::new(
            {
                let created = Arc::clone(&created);
                move |context: &Context| {
                    created.fetch_add(1, Ordering::Relaxed);
                    vec![0_u8; usize::try_from(context.x().unwrap()).unwrap()]
                }
            },
            |fixture: &mut Vec<u8>, _: &mut Context| fixture.push(1),
        );

        let mut context = context();

        bench.initialize(&mut context);
        bench.run(&mut context);
        bench.run(&mut context);
        assert_eq!(bench.fixture.as_ref().unwrap().len(), 5);

        bench.cleanup(&mut context);
        assert!(bench.fixture.is_none());

        bench.initialize(&mut context);
        assert_eq!(bench.fixture.as_ref().unwrap().len(), 3);
        assert_eq!(created.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn fixture_is_created_on_demand_without_initialize() {
        let mut bench = FixtureBench::new(
            |_: &Context| 10_u32,
            |fixture: &mut u32, _: &mut Context| *fixture += 1,
        );

        bench.run(&mut context());

        assert_eq!(bench.fixture, Some(11));
    }

    #[test]
    fn default_hooks_do_nothing() {
        struct OnlyRun;

        impl MpmcBench for OnlyRun {
            fn run_producer(&self, context: &mut Context) {
                context.metrics_mut().add_items(1);
            }

            fn run_consumer(&self, context: &mut Context) {
                context.metrics_mut().add_bytes(1);
            }
        }

        let mut bench = OnlyRun;
        let mut context = context();

        bench.initialize(&mut context);
        bench.initialize_producer(&mut context);
        bench.cleanup_consumer(&mut context);
        bench.cleanup(&mut context);

        assert!(!context.metrics().has_data());
    }

    assert_impl_all!(FnBench<fn(&mut Context)>: Bench, Send);
}
