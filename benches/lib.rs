use criterion::{criterion_group, criterion_main};

use expansion::bench_expansion;

mod harmonics;
use harmonics::bench_harmonics;

criterion_group!(benches, bench_expansion, bench_harmonics);
criterion_main!(benches);
