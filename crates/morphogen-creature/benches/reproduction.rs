use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use morphogen_creature::{Creature, Dna, PrimordialSoup, Reproduction};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

fn bench_reproduce(c: &mut Criterion) {
    let mut rng = Xoshiro256StarStar::seed_from_u64(1);
    let a = PrimordialSoup::spark_life(&mut rng, 10);
    let b = PrimordialSoup::spark_life(&mut rng, 10);
    let reproduction = Reproduction::default();

    c.bench_function("reproduce_10_genes", |bench| {
        bench.iter(|| {
            reproduction
                .reproduce(black_box(&a), black_box(&b), &mut rng)
                .map(|child| child.len())
        })
    });
}

fn bench_develop(c: &mut Criterion) {
    let mut rng = Xoshiro256StarStar::seed_from_u64(2);
    let dna = Dna::parse(PrimordialSoup::spark_life_biased(&mut rng, 20, 0.8)).unwrap();

    c.bench_function("develop_20_genes", |bench| {
        bench.iter(|| Creature::develop_from(black_box(dna.clone()), 0.5).map(|creature| creature.body().len()))
    });
}

criterion_group!(benches, bench_reproduce, bench_develop);
criterion_main!(benches);
