use std::num::NonZero;

use tracing::info;

use crate::{BenchmarkMeta, Context};

/// Receives notifications around every sweep point that a benchmark executes.
///
/// Both callbacks run synchronously on the thread that launched the benchmark, outside the
/// measured window. A handler should return promptly: the next sweep point does not start until
/// [`on_launched()`][Self::on_launched] returns.
///
/// Both callbacks are called for every sweep point, including one whose workers panicked. The
/// `attempt` argument is 1-based.
///
/// A handler that wants to stop a long-running sweep point can keep the
/// [`CancelToken`][crate::CancelToken] obtained from the context in `on_launching()` and cancel
/// it from another thread.
#[cfg_attr(test, mockall::automock)]
pub trait LaunchHandler {
    /// Called after the root context of a sweep point was created, before anything else runs.
    fn on_launching(&mut self, meta: &BenchmarkMeta, context: &Context, attempt: NonZero<u32>) {
        _ = (meta, context, attempt);
    }

    /// Called after every worker of a sweep point finished and root cleanup ran, before the
    /// best and worst attempts are selected.
    fn on_launched(&mut self, meta: &BenchmarkMeta, context: &Context, attempt: NonZero<u32>) {
        _ = (meta, context, attempt);
    }
}

/// Ignores all notifications.
impl LaunchHandler for () {}

/// Emits one `tracing` event at the `info` level for each notification.
///
/// The event that follows a sweep point carries the metrics of the sweep point's root phase for
/// the attempt that just completed and the number of threads that ran the point.
#[derive(Clone, Copy, Debug, Default)]
#[expect(clippy::exhaustive_structs, reason = "intentionally an empty struct")]
pub struct TracingHandler;

impl LaunchHandler for TracingHandler {
    #[cfg_attr(test, mutants::skip)] // Only produces log output.
    fn on_launching(&mut self, meta: &BenchmarkMeta, context: &Context, attempt: NonZero<u32>) {
        info!(
            benchmark = meta.name(),
            point = %context.description(),
            attempt = attempt.get(),
            "launching sweep point"
        );
    }

    #[cfg_attr(test, mutants::skip)] // Only produces log output.
    fn on_launched(&mut self, meta: &BenchmarkMeta, context: &Context, attempt: NonZero<u32>) {
        let metrics = context.phase().metrics();

        info!(
            benchmark = meta.name(),
            point = %context.description(),
            attempt = attempt.get(),
            iterations = metrics.iterations(),
            elapsed = ?metrics.elapsed(),
            workers = context.threads(),
            "sweep point completed"
        );
    }
}
