use std::any::type_name;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Metrics, MpmcPair, ParamTuple, Phase};

/// Cooperative cancellation flag shared by a root context and all of its clones.
///
/// Cancellation is observed by the measured loop once per iteration; a worker always finishes
/// the body invocation it is in before stopping. The token may be cloned and cancelled from any
/// thread, for example from a [`LaunchHandler`][crate::LaunchHandler] that enforces a deadline.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every loop that observes this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The thread layout of the sweep point a context belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Topology {
    /// The body runs on the orchestrating thread.
    Single,

    /// The body runs on the given number of symmetric worker threads.
    Threads(NonZero<usize>),

    /// Producer and consumer bodies run on their own worker threads.
    Mpmc(MpmcPair),
}

impl Topology {
    /// Number of threads that execute benchmark bodies.
    #[must_use]
    pub fn threads(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Threads(threads) => threads.get(),
            Self::Mpmc(pair) => pair.total().get(),
        }
    }

    /// Describes a sweep point with this layout, e.g. `producers=2 consumers=3 (100)`.
    ///
    /// Empty for a single-threaded sweep point without parameters.
    #[must_use]
    pub fn describe(&self, params: ParamTuple) -> String {
        let layout = match self {
            Self::Single => String::new(),
            Self::Threads(threads) => format!("threads={threads}"),
            Self::Mpmc(pair) => pair.to_string(),
        };

        let params = params.to_string();

        match (layout.is_empty(), params.is_empty()) {
            (_, true) => layout,
            (true, false) => params,
            (false, false) => format!("{layout} {params}"),
        }
    }
}

/// What a context is used for within its sweep point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Role {
    /// The context of the sweep point itself, owned by the orchestrating thread.
    Root,

    /// A symmetric worker thread with the given index.
    Thread(usize),

    /// A producer worker thread with the given index.
    Producer(usize),

    /// A consumer worker thread with the given index.
    Consumer(usize),
}

impl Role {
    /// The role without its index, e.g. `"producer"`. Worker metrics are rolled up per kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Thread(_) => "thread",
            Self::Producer(_) => "producer",
            Self::Consumer(_) => "consumer",
        }
    }

    // Symmetric workers get one phase per index; producers and consumers share a name and are
    // told apart by their position among the siblings.
    pub(crate) fn phase_name(&self) -> String {
        match self {
            Self::Thread(_) => self.to_string(),
            Self::Root | Self::Producer(_) | Self::Consumer(_) => self.kind().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Thread(index) | Self::Producer(index) | Self::Consumer(index) => {
                write!(f, "{}-{index}", self.kind())
            }
        }
    }
}

/// The handle that benchmark bodies receive on every call.
///
/// A context bundles the phase that is currently being measured, the metrics being collected
/// for it, the parameter values of the sweep point and the cancellation flag.
///
/// Metrics are collected into a buffer owned by the context. Writing to it through
/// [`metrics_mut()`][Self::metrics_mut] never takes a lock; the buffer is published into the
/// phase tree when collection stops.
///
/// Cloning a context creates a handle for another thread: the clone shares the phase,
/// parameters and cancellation flag but starts with an empty metrics buffer.
///
/// # Examples
///
/// ```
/// use sweep_bench::{Benchmark, Context, SweepSettings};
///
/// let mut benchmark = Benchmark::from_fn(
///     "copy",
///     SweepSettings::builder().iterations(10).build(),
///     |context: &mut Context| {
///         let len = context.x().unwrap_or(64);
///         let source = vec![0_u8; len as usize];
///         let copy = source.clone();
///         context.metrics_mut().add_bytes(copy.len() as u64);
///     },
/// );
///
/// benchmark.launch(&mut ()).unwrap();
/// ```
pub struct Context {
    phase: Arc<Phase>,
    metrics: Metrics,

    params: ParamTuple,
    topology: Topology,
    role: Role,

    cancel: CancelToken,
}

impl Context {
    pub(crate) fn new(phase: Arc<Phase>, params: ParamTuple, topology: Topology) -> Self {
        Self {
            phase,
            metrics: Metrics::default(),
            params,
            topology,
            role: Role::Root,
            cancel: CancelToken::new(),
        }
    }

    /// Creates the context of a worker: a clone that collects into its own, new child phase.
    pub(crate) fn for_worker(&self, role: Role) -> Self {
        let mut worker = self.clone();
        worker.role = role;
        worker.enter_thread_safe_phase(&role.phase_name());
        worker
    }

    /// The phase that is currently being measured.
    #[must_use]
    pub fn phase(&self) -> &Arc<Phase> {
        &self.phase
    }

    /// The metrics collected by this context that have not yet been published to the phase.
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Mutable access to the metrics buffer, e.g. to count processed items or bytes.
    pub fn metrics_mut(&mut self) -> &mut Metrics {
        &mut self.metrics
    }

    /// Opens a collection window.
    pub fn start_collecting(&mut self) {
        self.metrics.start_collecting();
    }

    /// Closes the collection window and publishes the buffered metrics into the current phase.
    ///
    /// Returns the published metrics. The buffer is empty afterwards.
    pub fn stop_collecting(&mut self) -> Metrics {
        self.metrics.stop_collecting();
        self.phase.merge_metrics(&self.metrics);
        mem::take(&mut self.metrics)
    }

    /// Switches this context to a new child of its current phase, created with
    /// [`Phase::create_child_thread_safe()`].
    ///
    /// Any unpublished metrics are discarded.
    pub fn enter_thread_safe_phase(&mut self, name: &str) {
        self.phase = self.phase.create_child_thread_safe(name);
        self.metrics = Metrics::default();
    }

    /// Measures `f` as one iteration of the nested phase `name`.
    ///
    /// The nested phase is found or created by name under the current phase, so calling this
    /// repeatedly with the same name accumulates into the same node. Metrics recorded by `f`
    /// through the nested context are attributed to the nested phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use sweep_bench::{Benchmark, Context, SweepSettings};
    ///
    /// let mut benchmark = Benchmark::from_fn(
    ///     "parse",
    ///     SweepSettings::builder().iterations(3).build(),
    ///     |context: &mut Context| {
    ///         let text = context.in_phase("render", |_| "1,2,3".to_string());
    ///         context.in_phase("split", |_| text.split(',').count());
    ///     },
    /// );
    ///
    /// benchmark.launch(&mut ()).unwrap();
    ///
    /// let root = benchmark.points()[0].phase();
    /// assert_eq!(root.child("render").samples()[0].iterations(), 3);
    /// ```
    pub fn in_phase<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut nested = self.clone();
        nested.role = self.role;
        nested.phase = self.phase.child(name);

        nested.start_collecting();
        nested.metrics.add_iterations(1);
        let result = f(&mut nested);
        nested.stop_collecting();

        result
    }

    /// The parameter tuple of the sweep point.
    #[must_use]
    pub fn params(&self) -> ParamTuple {
        self.params
    }

    /// The first parameter of the sweep point.
    #[must_use]
    pub fn x(&self) -> Option<i64> {
        self.params.x()
    }

    /// The second parameter of the sweep point.
    #[must_use]
    pub fn y(&self) -> Option<i64> {
        self.params.y()
    }

    /// The third parameter of the sweep point.
    #[must_use]
    pub fn z(&self) -> Option<i64> {
        self.params.z()
    }

    /// The thread layout of the sweep point.
    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// What this context is used for.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Number of producer threads of the sweep point; zero unless this is an MPMC benchmark.
    #[must_use]
    pub fn producers(&self) -> usize {
        match self.topology {
            Topology::Mpmc(pair) => pair.producers().get(),
            Topology::Single | Topology::Threads(_) => 0,
        }
    }

    /// Number of consumer threads of the sweep point; zero unless this is an MPMC benchmark.
    #[must_use]
    pub fn consumers(&self) -> usize {
        match self.topology {
            Topology::Mpmc(pair) => pair.consumers().get(),
            Topology::Single | Topology::Threads(_) => 0,
        }
    }

    /// Number of threads that execute benchmark bodies in the sweep point.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.topology.threads()
    }

    /// Describes the sweep point, e.g. `producers=2 consumers=3 (100)`.
    ///
    /// Empty for a single-threaded sweep point without parameters.
    #[must_use]
    pub fn description(&self) -> String {
        self.topology.describe(self.params)
    }

    /// Requests cancellation of every loop in the sweep point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation of the sweep point has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle to the cancellation flag that can be moved to other threads.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            phase: Arc::clone(&self.phase),
            metrics: Metrics::default(),
            params: self.params,
            topology: self.topology,
            role: Role::Root,
            cancel: self.cancel.clone(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("phase", &self.phase.path())
            .field("metrics", &self.metrics)
            .field("params", &self.params)
            .field("topology", &self.topology)
            .field("role", &self.role)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
