use std::mem;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::Metrics;

/// A named node in the timing tree of a benchmark.
///
/// Every phase owns its own [`Metrics`] and an ordered list of child phases. Phases are shared
/// via [`Arc`] so that worker threads can hold on to the phase they collect for while the
/// orchestrating thread holds on to the root.
///
/// Two ways exist to obtain a child phase:
///
/// * [`child()`][Self::child] finds the child with the given name or creates it if there is
///   none yet. This is used for nested user phases that are revisited on every iteration.
/// * [`create_child_thread_safe()`][Self::create_child_thread_safe] always creates a new,
///   distinct child, even if a sibling with the same name already exists. Worker threads use
///   this to obtain a node nobody else writes to.
///
/// The child list is the only state of a phase that multiple threads mutate concurrently. The
/// metrics of a worker's phase are written by that worker alone, from a buffer it owns, so the
/// measured loop never touches a lock.
///
/// # Best and worst attempts
///
/// Each call to [`choose_best_worst_metrics()`][Self::choose_best_worst_metrics] closes one
/// attempt: the current metrics are archived as a sample and the best and worst samples are
/// re-selected by ascending average time per iteration.
///
/// # Examples
///
/// ```
/// use sweep_bench::Phase;
///
/// let root = Phase::root("parse");
///
/// let tokenize = root.child("tokenize");
/// tokenize.start_collecting();
/// tokenize.stop_collecting();
///
/// // The same name resolves to the same node.
/// assert!(std::sync::Arc::ptr_eq(&tokenize, &root.child("tokenize")));
/// assert_eq!(tokenize.path(), "parse/tokenize");
/// ```
#[derive(Debug)]
pub struct Phase {
    name: String,
    parent: Weak<Self>,

    record: Mutex<PhaseRecord>,
    children: Mutex<Vec<Arc<Self>>>,
}

#[derive(Debug, Default)]
struct PhaseRecord {
    current: Metrics,

    // One entry per attempt that recorded any data.
    samples: Vec<Metrics>,

    best: Option<Metrics>,
    worst: Option<Metrics>,
}

impl Phase {
    /// Creates a new phase that has no parent.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name.into(), Weak::new()))
    }

    fn new(name: String, parent: Weak<Self>) -> Self {
        Self {
            name,
            parent,
            record: Mutex::new(PhaseRecord::default()),
            children: Mutex::new(Vec::new()),
        }
    }

    /// The name of the phase.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent of the phase, if it has one and the parent is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.upgrade()
    }

    /// The names of all phases from the root down to this one, joined with `/`.
    #[must_use]
    pub fn path(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{}/{}", parent.path(), self.name),
            None => self.name.clone(),
        }
    }

    /// Returns the child with the given name, creating it if it does not exist yet.
    ///
    /// If multiple children share the name (see
    /// [`create_child_thread_safe()`][Self::create_child_thread_safe]), the first one is returned.
    pub fn child(self: &Arc<Self>, name: &str) -> Arc<Self> {
        let mut children = self.children.lock();

        if let Some(existing) = children.iter().find(|child| child.name == name) {
            return Arc::clone(existing);
        }

        let child = Arc::new(Self::new(name.to_string(), Arc::downgrade(self)));
        children.push(Arc::clone(&child));
        child
    }

    /// Appends a new child with the given name and returns it.
    ///
    /// This may be called concurrently from any number of threads. Every call creates a new,
    /// distinct node; same-named siblings are never merged. Callers tell instances apart by their
    /// position in [`children()`][Self::children], not by name.
    pub fn create_child_thread_safe(self: &Arc<Self>, name: &str) -> Arc<Self> {
        let child = Arc::new(Self::new(name.to_string(), Arc::downgrade(self)));
        self.children.lock().push(Arc::clone(&child));
        child
    }

    /// A snapshot of the current list of children, in creation order.
    #[must_use]
    pub fn children(&self) -> Vec<Arc<Self>> {
        self.children.lock().clone()
    }

    /// Opens a collection window on the phase's own metrics.
    pub fn start_collecting(&self) {
        self.record.lock().current.start_collecting();
    }

    /// Closes the collection window on the phase's own metrics.
    pub fn stop_collecting(&self) {
        self.record.lock().current.stop_collecting();
    }

    /// Folds metrics collected elsewhere into the current metrics of the phase.
    pub fn merge_metrics(&self, metrics: &Metrics) {
        self.record.lock().current.merge(metrics);
    }

    /// A snapshot of the metrics collected since the last attempt was closed.
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        self.record.lock().current.clone()
    }

    /// Snapshots of all closed attempts that recorded data, in the order they were closed.
    #[must_use]
    pub fn samples(&self) -> Vec<Metrics> {
        self.record.lock().samples.clone()
    }

    /// The attempt with the lowest average time per iteration, once any attempt was closed.
    #[must_use]
    pub fn best_metrics(&self) -> Option<Metrics> {
        self.record.lock().best.clone()
    }

    /// The attempt with the highest average time per iteration, once any attempt was closed.
    #[must_use]
    pub fn worst_metrics(&self) -> Option<Metrics> {
        self.record.lock().worst.clone()
    }

    /// The metrics that reporting should use: the best attempt if one was chosen, otherwise the
    /// raw current metrics.
    #[must_use]
    pub fn reported_metrics(&self) -> Metrics {
        let record = self.record.lock();
        record.best.as_ref().unwrap_or(&record.current).clone()
    }

    /// Closes the current attempt of this phase and of all its descendants.
    ///
    /// The current metrics are archived as a sample (unless they recorded no iterations, in
    /// which case they are discarded) and reset. The best and worst samples are then selected
    /// by average time per iteration. On ties, the earlier sample is kept.
    pub fn choose_best_worst_metrics(&self) {
        {
            let mut record = self.record.lock();

            let current = mem::take(&mut record.current);
            if current.has_data() {
                record.samples.push(current);
            }

            let (best, worst) = select_best_worst(&record.samples);
            record.best = best;
            record.worst = worst;
        }

        for child in self.children() {
            child.choose_best_worst_metrics();
        }
    }
}

fn select_best_worst(samples: &[Metrics]) -> (Option<Metrics>, Option<Metrics>) {
    let mut best: Option<&Metrics> = None;
    let mut worst: Option<&Metrics> = None;

    for sample in samples {
        if best.is_none_or(|best| sample.is_better_than(best)) {
            best = Some(sample);
        }

        if worst.is_none_or(|worst| sample.is_worse_than(worst)) {
            worst = Some(sample);
        }
    }

    (best.cloned(), worst.cloned())
}
