//! Integration tests for sweeps configured from TOML documents.

use std::num::NonZero;
use std::time::Duration;

use sweep_bench::{
    Benchmark, Context, Error, MpmcBench, MpmcPair, ParamTuple, SweepSettings, Topology,
};
use testing::with_watchdog;

struct Noop;

impl MpmcBench for Noop {
    fn run_producer(&self, _context: &mut Context) {}

    fn run_consumer(&self, _context: &mut Context) {}
}

#[cfg_attr(miri, ignore)]
#[test]
fn configured_sweep_covers_every_point() {
    with_watchdog(|| {
        let settings = SweepSettings::from_toml_str(
            r"
            attempts = 2
            iterations = 10
            params = [[1], [2, -1], [3, 4, 5]]
            mpmc = [[1, 2], [3, 1]]
            ",
        )
        .unwrap();

        assert_eq!(settings.time_budget(), Duration::ZERO);
        assert_eq!(settings.params()[2], ParamTuple::triple(3, 4, 5));
        assert_eq!(
            settings.mpmc_pairs()[1],
            MpmcPair::new(NonZero::new(3).unwrap(), NonZero::new(1).unwrap())
        );

        let mut benchmark = Benchmark::mpmc("configured", settings, Noop);
        benchmark.launch(&mut ()).unwrap();

        let names = benchmark
            .points()
            .iter()
            .map(|point| point.display_name())
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            [
                "configured producers=1 consumers=2 (1)",
                "configured producers=1 consumers=2 (2)",
                "configured producers=1 consumers=2 (3,4,5)",
                "configured producers=3 consumers=1 (1)",
                "configured producers=3 consumers=1 (2)",
                "configured producers=3 consumers=1 (3,4,5)",
            ]
        );

        for point in benchmark.points() {
            let Topology::Mpmc(pair) = point.topology() else {
                panic!("unexpected topology {:?}", point.topology());
            };

            let producers = u64::try_from(pair.producers().get()).unwrap();
            let consumers = u64::try_from(pair.consumers().get()).unwrap();

            assert_eq!(point.phase().samples().len(), 2);
            assert_eq!(
                point.role_total("producer").unwrap().iterations(),
                2 * 10 * producers
            );
            assert_eq!(
                point.role_total("consumer").unwrap().iterations(),
                2 * 10 * consumers
            );
        }
    });
}

#[test]
fn invalid_documents_are_rejected() {
    assert!(matches!(
        SweepSettings::from_toml_str("attempts = ["),
        Err(Error::Toml(_))
    ));
    assert!(matches!(
        SweepSettings::from_toml_str("mpmc = [[0, 1]]"),
        Err(Error::InvalidSettings { .. })
    ));
    assert!(matches!(
        "warmup = 3".parse::<SweepSettings>(),
        Err(Error::InvalidSettings { .. })
    ));
}

#[test]
fn empty_document_uses_defaults() {
    let settings = SweepSettings::from_toml_str("").unwrap();

    assert_eq!(settings, SweepSettings::default());
    assert_eq!(settings.attempts().get(), 5);
    assert_eq!(settings.iterations(), -1);
    assert_eq!(settings.time_budget(), Duration::from_secs(1));
}
