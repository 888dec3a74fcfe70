use crate::SweepSettings;

/// The identity of a benchmark: its name and its normalized sweep settings.
///
/// This is what a [`LaunchHandler`] receives to tell benchmarks apart.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BenchmarkMeta {
    name: String,
    settings: SweepSettings,
}

impl BenchmarkMeta {
    pub(crate) fn new(name: impl Into<String>, settings: SweepSettings) -> Self {
        Self {
            name: name.into(),
            settings: settings.normalized(),
        }
    }

    /// The name of the benchmark.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized sweep settings of the benchmark.
    #[must_use]
    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::num::NonZero;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::ParamTuple;

    assert_impl_all!(BenchmarkMeta: Send, Sync, Clone);

    #[test]
    fn settings_are_normalized() {
        let meta = BenchmarkMeta::new(
            "meta",
            SweepSettings::builder()
                .attempts(NonZero::new(2).unwrap())
                .build(),
        );

        assert_eq!(meta.name(), "meta");
        assert_eq!(meta.settings().attempts().get(), 2);
        assert_eq!(meta.settings().params(), [ParamTuple::none()]);
        assert_eq!(meta.settings().mpmc_pairs().len(), 1);
    }
}
