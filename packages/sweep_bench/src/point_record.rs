use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Metrics, ParamTuple, Phase, Role, Topology};

/// One sweep point of a benchmark: a thread layout combined with a parameter tuple.
///
/// The record owns the root [`Phase`] of the sweep point. The same root phase is reused by every
/// attempt, so after a launch it holds one sample per attempt and the best and worst of them.
///
/// Worker threads additionally fold their metrics into per-role totals (see
/// [`role_totals()`][Self::role_totals]). These sum up all workers of the same kind across all
/// attempts and are meant for throughput reporting, while the individual worker phases keep
/// their own, non-aggregated metrics.
#[derive(Debug)]
pub struct PointRecord {
    phase: Arc<Phase>,

    topology: Topology,
    params: ParamTuple,

    threads: usize,
    display_name: String,

    role_totals: Mutex<BTreeMap<&'static str, Metrics>>,
}

impl PointRecord {
    pub(crate) fn new(benchmark: &str, topology: Topology, params: ParamTuple) -> Self {
        let description = topology.describe(params);

        let phase_name = if description.is_empty() {
            benchmark.to_string()
        } else {
            description
        };

        Self {
            phase: Phase::root(phase_name),
            topology,
            params,
            threads: topology.threads(),
            display_name: benchmark.to_string(),
            role_totals: Mutex::new(BTreeMap::new()),
        }
    }

    /// The root phase of the sweep point.
    #[must_use]
    pub fn phase(&self) -> &Arc<Phase> {
        &self.phase
    }

    /// The thread layout of the sweep point.
    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// The parameter tuple of the sweep point.
    #[must_use]
    pub fn params(&self) -> ParamTuple {
        self.params
    }

    /// Describes the sweep point, e.g. `threads=4 (100)`.
    #[must_use]
    pub fn description(&self) -> String {
        self.topology.describe(self.params)
    }

    /// Number of threads that executed benchmark bodies in this sweep point.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// The name to report this sweep point under.
    ///
    /// This is the benchmark name if the benchmark has a single sweep point and the benchmark
    /// name followed by the description otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Totals of all worker metrics per role kind (`"thread"`, `"producer"` or `"consumer"`).
    ///
    /// Single-threaded benchmarks have no workers and report an empty map.
    #[must_use]
    pub fn role_totals(&self) -> BTreeMap<&'static str, Metrics> {
        self.role_totals.lock().clone()
    }

    /// The total of all worker metrics of the given role kind, if any worker of that kind ran.
    #[must_use]
    pub fn role_total(&self, kind: &str) -> Option<Metrics> {
        self.role_totals.lock().get(kind).cloned()
    }

    pub(crate) fn add_role_total(&self, role: Role, metrics: &Metrics) {
        self.role_totals
            .lock()
            .entry(role.kind())
            .or_default()
            .merge(metrics);
    }

    pub(crate) fn refresh_summary(&mut self, benchmark: &str, point_count: usize) {
        self.threads = self.topology.threads();

        let description = self.description();

        self.display_name = if point_count == 1 || description.is_empty() {
            benchmark.to_string()
        } else {
            format!("{benchmark} {description}")
        };
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::num::NonZero;
    use std::thread;
    use std::time::Duration;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::MpmcPair;

    assert_impl_all!(PointRecord: Send, Sync);

    fn mpmc(producers: usize, consumers: usize) -> Topology {
        Topology::Mpmc(MpmcPair::new(
            NonZero::new(producers).unwrap(),
            NonZero::new(consumers).unwrap(),
        ))
    }

    #[test]
    fn root_phase_is_named_after_description() {
        let point = PointRecord::new("queue", mpmc(2, 3), ParamTuple::single(100));
        assert_eq!(point.phase().name(), "producers=2 consumers=3 (100)");
        assert_eq!(point.threads(), 5);

        let bare = PointRecord::new("plain", Topology::Single, ParamTuple::none());
        assert_eq!(bare.phase().name(), "plain");
    }

    #[test]
    fn display_name_depends_on_point_count() {
        let mut point = PointRecord::new("queue", mpmc(1, 1), ParamTuple::single(8));

        point.refresh_summary("queue", 1);
        assert_eq!(point.display_name(), "queue");

        point.refresh_summary("queue", 4);
        assert_eq!(point.display_name(), "queue producers=1 consumers=1 (8)");
    }

    #[test]
    fn role_totals_sum_same_kind_workers() {
        let point = PointRecord::new("queue", mpmc(2, 1), ParamTuple::none());

        thread::scope(|s| {
            for index in 0..2 {
                let point = &point;
                s.spawn(move || {
                    point.add_role_total(
                        Role::Producer(index),
                        &Metrics::from_sample(100, Duration::from_micros(10)),
                    );
                });
            }
        });
        point.add_role_total(
            Role::Consumer(0),
            &Metrics::from_sample(50, Duration::from_micros(10)),
        );

        assert_eq!(point.role_total("producer").unwrap().iterations(), 200);
        assert_eq!(point.role_total("consumer").unwrap().iterations(), 50);
        assert!(point.role_total("thread").is_none());
        assert_eq!(point.role_totals().len(), 2);
    }
}
