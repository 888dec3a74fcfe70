//! A small benchmark binary: registers a few benchmarks, loads their settings from TOML and
//! launches those whose name contains the first command line argument.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::hint::black_box;

use sweep_bench::{Benchmark, Context, Registry, SweepSettings, TracingHandler};

const SETTINGS: &str = r"
attempts = 3
iterations = 2000
params = [[16], [256], [4096]]
";

fn main() {
    tracing_subscriber::fmt().init();

    let settings = match SweepSettings::from_toml_str(SETTINGS) {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("{error}");
            return;
        }
    };

    let mut registry = Registry::new();

    let benchmarks = [
        Benchmark::with_fixture(
            "hash_map_get",
            settings.clone(),
            |context: &Context| {
                (0..context.x().unwrap_or(1))
                    .map(|k| (k, k))
                    .collect::<HashMap<_, _>>()
            },
            |map: &mut HashMap<i64, i64>, context: &mut Context| {
                black_box(map.get(&black_box(7)));
                context.metrics_mut().add_items(1);
            },
        ),
        Benchmark::with_fixture(
            "btree_map_get",
            settings.clone(),
            |context: &Context| {
                (0..context.x().unwrap_or(1))
                    .map(|k| (k, k))
                    .collect::<BTreeMap<_, _>>()
            },
            |map: &mut BTreeMap<i64, i64>, context: &mut Context| {
                black_box(map.get(&black_box(7)));
                context.metrics_mut().add_items(1);
            },
        ),
        Benchmark::from_fn("vec_collect", settings, |context: &mut Context| {
            let len = context.x().unwrap_or(1);
            let collected = (0..len).collect::<Vec<_>>();
            let bytes = collected.len().saturating_mul(size_of::<i64>());
            context
                .metrics_mut()
                .add_bytes(u64::try_from(bytes).unwrap_or(u64::MAX));
            black_box(collected);
        }),
    ];

    for benchmark in benchmarks {
        if let Err(error) = registry.add_benchmark(benchmark) {
            eprintln!("{error}");
            return;
        }
    }

    let filter = env::args().nth(1).unwrap_or_default();

    match registry.launch_matching(&filter, &mut TracingHandler) {
        Ok(count) => println!("launched {count} of {} benchmarks", registry.len()),
        Err(error) => {
            eprintln!("{error}");
            return;
        }
    }

    for benchmark in registry.benchmarks().iter().filter(|b| b.is_launched()) {
        for point in benchmark.points() {
            if let Some(best) = point.phase().best_metrics() {
                println!(
                    "{:<28} avg {:>10?} per iteration",
                    point.display_name(),
                    best.avg_time().unwrap_or_default()
                );
            }
        }
    }
}
