//! The measured loop and the worker threads that run it concurrently.

use std::any::Any;
use std::io;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::sweep_settings::Budget;
use crate::{Bench, Context, Error, Metrics, MpmcBench, PointRecord, Result, Role, ThreadsBench};

/// Runs `body` repeatedly within one collection window of `context`.
///
/// The loop continues while the context is not cancelled and either budget dimension is still
/// positive. Time is only sampled while the time budget is positive, so an iteration-bounded loop
/// does not pay for reading the clock on every pass.
///
/// Returns the metrics of the window, which have also been published into the context's phase.
pub(crate) fn measured_loop(
    context: &mut Context,
    budget: Budget,
    mut body: impl FnMut(&mut Context),
) -> Metrics {
    let Budget {
        mut iterations,
        mut nanoseconds,
    } = budget;

    context.start_collecting();

    while !context.is_cancelled() && (iterations > 0 || nanoseconds > 0) {
        context.metrics_mut().add_iterations(1);

        let started = (nanoseconds > 0).then(Instant::now);

        body(context);

        if let Some(started) = started {
            let elapsed = i64::try_from(started.elapsed().as_nanos()).unwrap_or(i64::MAX);
            nanoseconds = nanoseconds.saturating_sub(elapsed);
        }

        iterations = iterations.saturating_sub(1);
    }

    context.stop_collecting()
}

/// Runs the hooks of a single-threaded benchmark for one sweep point on the current thread.
pub(crate) fn run_single(bench: &mut dyn Bench, context: &mut Context, budget: Budget) {
    bench.initialize(context);
    measured_loop(context, budget, |context| bench.run(context));
    bench.cleanup(context);
}

/// The per-worker hooks of a multithreaded benchmark, dispatched by role.
pub(crate) trait WorkerHooks: Sync {
    fn initialize_worker(&self, role: Role, context: &mut Context);

    fn run_iteration(&self, role: Role, context: &mut Context);

    fn cleanup_worker(&self, role: Role, context: &mut Context);
}

impl WorkerHooks for dyn ThreadsBench + '_ {
    fn initialize_worker(&self, _role: Role, context: &mut Context) {
        self.initialize_thread(context);
    }

    fn run_iteration(&self, _role: Role, context: &mut Context) {
        self.run_thread(context);
    }

    fn cleanup_worker(&self, _role: Role, context: &mut Context) {
        self.cleanup_thread(context);
    }
}

impl WorkerHooks for dyn MpmcBench + '_ {
    fn initialize_worker(&self, role: Role, context: &mut Context) {
        match role {
            Role::Producer(_) => self.initialize_producer(context),
            Role::Consumer(_) => self.initialize_consumer(context),
            Role::Root | Role::Thread(_) => {}
        }
    }

    fn run_iteration(&self, role: Role, context: &mut Context) {
        match role {
            Role::Producer(_) => self.run_producer(context),
            Role::Consumer(_) => self.run_consumer(context),
            Role::Root | Role::Thread(_) => {}
        }
    }

    fn cleanup_worker(&self, role: Role, context: &mut Context) {
        match role {
            Role::Producer(_) => self.cleanup_producer(context),
            Role::Consumer(_) => self.cleanup_consumer(context),
            Role::Root | Role::Thread(_) => {}
        }
    }
}

/// Executes one sweep point of a multithreaded benchmark.
///
/// The root context collects for the whole duration of the point and records it as a single
/// iteration. One worker thread is started per entry in `roles` and all of them are joined
/// before this returns.
pub(crate) fn run_concurrent<H>(
    benchmark: &str,
    root: &mut Context,
    point: &PointRecord,
    budget: Budget,
    roles: &[Role],
    hooks: &H,
) -> Result<()>
where
    H: WorkerHooks + ?Sized,
{
    root.start_collecting();
    root.metrics_mut().add_iterations(1);

    let outcome = run_workers(benchmark, root, point, budget, roles, hooks);

    root.stop_collecting();

    outcome
}

fn run_workers<H>(
    benchmark: &str,
    root: &Context,
    point: &PointRecord,
    budget: Budget,
    roles: &[Role],
    hooks: &H,
) -> Result<()>
where
    H: WorkerHooks + ?Sized,
{
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(roles.len());

        for &role in roles {
            let spawned = thread::Builder::new()
                .name(format!("{benchmark}-{role}"))
                .spawn_scoped(scope, move || run_worker(hooks, root, point, budget, role));

            match spawned {
                Ok(handle) => handles.push((role, handle)),
                Err(source) => return Err(abandon_point(benchmark, root, handles, role, source)),
            }
        }

        join_workers(benchmark, handles)
    })
}

/// Stops the workers of a sweep point that could not be fully started.
///
/// The workers that did start are cancelled and stop at their next iteration. Any panic among
/// them is logged by the join but the spawn failure is what gets reported.
fn abandon_point(
    benchmark: &str,
    root: &Context,
    handles: Vec<(Role, ScopedJoinHandle<'_, ()>)>,
    role: Role,
    source: io::Error,
) -> Error {
    root.cancel();

    if let Err(fault) = join_workers(benchmark, handles) {
        debug!(benchmark, %fault, "worker fault superseded by spawn failure");
    }

    Error::SpawnFailed {
        benchmark: benchmark.to_string(),
        role: role.to_string(),
        source,
    }
}

fn run_worker<H>(hooks: &H, root: &Context, point: &PointRecord, budget: Budget, role: Role)
where
    H: WorkerHooks + ?Sized,
{
    let mut context = root.for_worker(role);

    trace!(%role, "worker started");

    hooks.initialize_worker(role, &mut context);
    let mut window = measured_loop(&mut context, budget, |context| {
        hooks.run_iteration(role, context);
    });
    hooks.cleanup_worker(role, &mut context);

    // Publishes counters recorded by the cleanup hook.
    window.merge(&context.stop_collecting());

    point.add_role_total(role, &window);

    trace!(%role, iterations = window.iterations(), "worker exiting");
}

/// Waits for every worker, then reports the first panic in spawn order, if any.
fn join_workers(benchmark: &str, handles: Vec<(Role, ScopedJoinHandle<'_, ()>)>) -> Result<()> {
    let mut first_fault = None;

    for (role, handle) in handles {
        if let Err(payload) = handle.join() {
            let message = format_panic_payload(payload.as_ref());

            warn!(
                benchmark,
                %role,
                panic_message = %message,
                "benchmark worker panicked"
            );

            if first_fault.is_none() {
                first_fault = Some(Error::WorkerPanicked {
                    benchmark: benchmark.to_string(),
                    role: role.to_string(),
                    message,
                });
            }
        }
    }

    first_fault.map_or(Ok(()), Err)
}

fn format_panic_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
