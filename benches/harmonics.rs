use criterion::Criterion;
use std::hint::black_box;
use variational_bias::basis::harmonics::Harmonics;

fn plain(n: usize, x: f64) {
    for k in 0..n {
        black_box(f64::sin_cos(x * (k as f64)));
    }
}

fn recurrent(n: usize, x: f64) {
    for sin_cos in Harmonics::new(x).take(n) {
        black_box(sin_cos);
    }
}

pub fn bench_harmonics(c: &mut Criterion) {
    const COUNTS: [usize; 4] = [1, 10, 100, 1000];

    for &n in COUNTS.iter() {
        c.bench_function(format!("Plain sin_cos {n}").as_str(), |b| {
            b.iter(|| plain(black_box(n), 0.01))
        });
        c.bench_function(format!("Recurrent harmonics {n}").as_str(), |b| {
            b.iter(|| recurrent(black_box(n), 0.01))
        });
    }
}
