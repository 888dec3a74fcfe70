#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Micro-benchmark execution harness that sweeps a configuration space and records timing in a
//! tree of phases.
//!
//! A [`Benchmark`] combines a user-supplied body with [`SweepSettings`] that describe the
//! configuration space to explore: a number of repeated attempts, an iteration and/or time
//! budget, a list of parameter tuples and, for multithreaded benchmarks, the thread layout.
//! Launching the benchmark executes every combination (a *sweep point*) one after another and
//! records the results in a [`Phase`] tree.
//!
//! The core types are:
//! - [`Benchmark`] - A named body plus its settings; executes the sweep via `launch()`
//! - [`SweepSettings`] - The configuration space, built in code or loaded from TOML
//! - [`Context`] - The handle a body receives on every call: parameters, metrics, cancellation
//! - [`Phase`] and [`Metrics`] - The timing tree and the counters stored in it
//! - [`LaunchHandler`] - Notified before and after every sweep point
//! - [`Registry`] - An ordered set of uniquely named benchmarks
//!
//! This package is meant as a development tool for performance analysis, not for use in
//! production code paths.
//!
//! # Operating Principles
//!
//! ## Execution variants
//!
//! Three kinds of benchmark bodies are supported:
//! - [`Bench`] runs on the launching thread.
//! - [`ThreadsBench`] runs on a number of identical worker threads.
//! - [`MpmcBench`] runs separate producer and consumer bodies on their own worker threads, for
//!   every producer/consumer pair in the settings.
//!
//! ## Sweep order
//!
//! Sweep points are executed in the fixed order attempts, then producer/consumer pairs, then
//! parameter tuples. Sweep points never overlap in time: every worker of a sweep point is joined
//! before the next one starts.
//!
//! ## Measurement
//!
//! Every worker runs its body in a measured loop that keeps going while either the iteration
//! budget or the time budget is not yet used up, or until the sweep point is cancelled. Metrics
//! are collected into a buffer owned by the worker's [`Context`], so the measured loop never
//! takes a lock. The buffer is published into the worker's own phase when the loop ends.
//!
//! Each sweep point has a root phase that is reused by every attempt. After each attempt, the
//! best and worst attempt so far are selected by average time per iteration.
//!
//! # Example
//!
//! ```
//! use std::num::NonZero;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use sweep_bench::{Benchmark, Context, ParamTuple, SweepSettings, ThreadsBench};
//!
//! #[derive(Default)]
//! struct Contended {
//!     counter: AtomicU64,
//! }
//!
//! impl ThreadsBench for Contended {
//!     fn run_thread(&self, context: &mut Context) {
//!         let step = context.x().unwrap_or(1) as u64;
//!         self.counter.fetch_add(step, Ordering::Relaxed);
//!     }
//! }
//!
//! let settings = SweepSettings::builder()
//!     .attempts(NonZero::new(3).unwrap())
//!     .iterations(1000)
//!     .threads(NonZero::new(2).unwrap())
//!     .params([1, 8].map(ParamTuple::single))
//!     .build();
//!
//! let mut benchmark = Benchmark::threads("contended_add", settings, Contended::default());
//! benchmark.launch(&mut ()).unwrap();
//!
//! for point in benchmark.points() {
//!     let best = point.phase().best_metrics().unwrap();
//!     println!("{}: {:?} per sweep point", point.display_name(), best.avg_time());
//! }
//! ```
//!
//! # Configuration
//!
//! ```
//! use sweep_bench::SweepSettings;
//!
//! let settings: SweepSettings = r"
//!     attempts = 2
//!     iterations = 500
//!     params = [[64], [4096]]
//!     mpmc = [[1, 1], [4, 1]]
//! "
//! .parse()
//! .unwrap();
//!
//! assert_eq!(settings.mpmc_pairs().len(), 2);
//! ```

mod benchmark;
mod benchmark_meta;
mod context;
mod error;
mod execution;
mod hooks;
mod launch_handler;
mod metrics;
mod mpmc_pair;
mod param_tuple;
mod phase;
mod point_record;
mod registry;
mod sweep_settings;
mod sweep_settings_builder;

pub use benchmark::*;
pub use benchmark_meta::*;
pub use context::*;
pub use error::Error;
pub(crate) use error::Result;
pub use hooks::*;
pub use launch_handler::*;
pub use metrics::*;
pub use mpmc_pair::*;
pub use param_tuple::*;
pub use phase::*;
pub use point_record::*;
pub use registry::*;
pub use sweep_settings::{SweepSettings, UNBOUNDED_ITERATIONS};
pub use sweep_settings_builder::*;
