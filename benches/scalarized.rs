use blade_mdo::{DesignBounds, ScalarizedSearcher, StartPoint};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn scalarized_benchmark(c: &mut Criterion) {
    for (name, start) in [
        ("scalarized-midpoint", StartPoint::Midpoint),
        ("scalarized-random", StartPoint::Random),
    ] {
        let searcher = ScalarizedSearcher::builder(DesignBounds::default())
            .num_points(20)
            .start(start)
            .build()
            .expect("valid scalarized configuration");
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(99);
                searcher.run(&mut rng).expect("search to succeed")
            });
        });
    }
}

criterion_group!(benches, scalarized_benchmark);
criterion_main!(benches);
