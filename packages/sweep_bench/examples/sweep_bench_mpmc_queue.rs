//! Compares a mutex-guarded queue under different producer/consumer layouts and queue depths.
//!
//! Sweep point progress is logged through `TracingHandler` at the `info` level.

use std::collections::VecDeque;
use std::num::NonZero;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use sweep_bench::{
    Benchmark, Context, MpmcBench, MpmcPair, ParamTuple, SweepSettings, TracingHandler,
};

/// A bounded queue: producers drop their value when the queue is full, consumers skip the
/// iteration when it is empty.
#[derive(Default)]
struct BoundedQueue {
    items: Mutex<VecDeque<u64>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl MpmcBench for BoundedQueue {
    fn initialize(&mut self, context: &mut Context) {
        self.capacity = context
            .x()
            .and_then(|capacity| usize::try_from(capacity).ok())
            .unwrap_or(64);
        self.items.get_mut().clear();
        self.dropped.store(0, Ordering::Relaxed);
    }

    fn run_producer(&self, context: &mut Context) {
        let mut items = self.items.lock();

        if items.len() < self.capacity {
            items.push_back(1);
            context.metrics_mut().add_items(1);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn run_consumer(&self, context: &mut Context) {
        if self.items.lock().pop_front().is_some() {
            context.metrics_mut().add_items(1);
        }
    }

    fn cleanup(&mut self, context: &mut Context) {
        let dropped = self.dropped.load(Ordering::Relaxed);

        context
            .metrics_mut()
            .set_custom("dropped", i64::try_from(dropped).unwrap_or(i64::MAX));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let one = NonZero::new(1).unwrap();
    let four = NonZero::new(4).unwrap();

    let settings = SweepSettings::builder()
        .attempts(NonZero::new(3).unwrap())
        .iterations(10_000)
        .time_budget(Duration::from_millis(20))
        .params([16, 1024].map(ParamTuple::single))
        .mpmc_pair(MpmcPair::new(one, one))
        .mpmc_pair(MpmcPair::new(four, one))
        .mpmc_pair(MpmcPair::new(one, four))
        .build();

    let mut benchmark = Benchmark::mpmc("bounded_queue", settings, BoundedQueue::default());

    if let Err(error) = benchmark.launch(&mut TracingHandler) {
        eprintln!("benchmark failed: {error}");
        return;
    }

    println!();
    println!(
        "{:<45} {:>14} {:>14} {:>14}",
        "sweep point", "best point", "worst point", "items/s"
    );

    for point in benchmark.points() {
        let root = point.phase();
        let best = root.best_metrics().unwrap_or_default();
        let worst = root.worst_metrics().unwrap_or_default();

        let items = point
            .role_totals()
            .values()
            .map(|total| total.items_per_second().unwrap_or_default())
            .sum::<f64>();

        println!(
            "{:<45} {:>14?} {:>14?} {:>14.0}",
            point.display_name(),
            best.elapsed(),
            worst.elapsed(),
            items
        );
    }
}
