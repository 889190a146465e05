//! Performance benchmarks for the time integrators
//!
//! These benchmarks compare explicit and implicit stepping on an identical
//! diffusion problem, and measure how the incremental-recomputation layer
//! behaves when a functional hierarchy sits on top of the flux.
//!
//! # What We're Measuring
//!
//! 1. **Explicit Euler**:
//!    - 1 flux evaluation per step
//!    - Cheap per step, but the stable timestep shrinks as h^2
//!
//! 2. **Implicit Euler** (damped fixed point):
//!    - Many flux evaluations per step (one per inner iteration)
//!    - Stable at any timestep; cost is dominated by the iteration count
//!
//! 3. **Picard equilibrium iteration**:
//!    - One excess/external evaluation per sweep
//!    - Cost scales with cells x iterations to tolerance
//!
//! # Expected Results
//!
//! - Explicit stepping scales linearly with cells x steps.
//! - Implicit stepping costs roughly (inner iterations) x explicit; with
//!   damping `mix` the iteration count to tolerance eps grows like
//!   `ln(eps) / ln(1 - mix)`.
//! - The caching layer makes a second `compute` on an unchanged state
//!   near-free regardless of mesh size.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run everything
//! cargo bench --bench integrator_performance
//!
//! # Only the explicit/implicit comparison
//! cargo bench --bench integrator_performance comparison
//!
//! # Only the cache-hit measurement
//! cargo bench --bench integrator_performance cache
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use cdft_rs::prelude::*;
use cdft_rs::state::Mesh;

// =================================================================================================
// Problem Setup
// =================================================================================================

/// Cosine perturbation on a uniform background, the standard relaxation
/// problem: smooth, periodic, and cheap to build at any resolution.
fn perturbed_state(shape: usize) -> State {
    let length = 10.0;
    let mut state = State::new(Mesh::new(length, shape).unwrap(), &["a"]);
    let coordinates: Vec<f64> = (0..shape).map(|idx| state.mesh().coordinate(idx)).collect();
    let rho = state.field_mut("a").unwrap();
    for (idx, x) in coordinates.iter().enumerate() {
        let angle = 2.0 * std::f64::consts::PI * x / length;
        rho.set(idx as isize, 0.5 + 0.2 * angle.cos());
    }
    state
}

fn diffusion() -> DiffusiveFlux {
    let mut flux = DiffusiveFlux::new();
    flux.set_diffusivity("a", 1.0);
    flux
}

// =================================================================================================
// Benchmark Functions
// =================================================================================================

/// Explicit Euler stepping across mesh resolutions.
///
/// Fixed step count so the measured time isolates per-step cost; expect
/// linear scaling with the number of cells.
fn benchmark_explicit_euler(c: &mut Criterion) {
    let mut group = c.benchmark_group("Explicit Euler");

    for &shape in &[100usize, 500, 1000, 5000] {
        group.throughput(criterion::Throughput::Elements(shape as u64 * 100));
        group.bench_with_input(BenchmarkId::from_parameter(shape), &shape, |b, &shape| {
            // setup outside the measured closure
            let template = perturbed_state(shape);
            let dt = 1e-4;

            b.iter(|| {
                let mut state = template.clone();
                let mut grand = GrandPotential::new();
                let mut flux = diffusion();
                let mut integrator = ExplicitEulerIntegrator::new(dt).unwrap();
                integrator
                    .advance(
                        black_box(&mut grand),
                        black_box(&mut flux),
                        black_box(&mut state),
                        100.0 * dt,
                    )
                    .unwrap();
                state.integrate_density("a").unwrap()
            });
        });
    }

    group.finish();
}

/// Implicit Euler stepping across mesh resolutions.
///
/// Same problem and step count as the explicit benchmark; the ratio
/// between the two is the average inner-iteration count.
fn benchmark_implicit_euler(c: &mut Criterion) {
    let mut group = c.benchmark_group("Implicit Euler");

    for &shape in &[100usize, 500, 1000] {
        group.throughput(criterion::Throughput::Elements(shape as u64 * 10));
        group.bench_with_input(BenchmarkId::from_parameter(shape), &shape, |b, &shape| {
            let template = perturbed_state(shape);
            let dt = 1e-4;
            let params = FixedPointParams::new(0.1, 500, 1e-8).unwrap();

            b.iter(|| {
                let mut state = template.clone();
                let mut grand = GrandPotential::new();
                let mut flux = diffusion();
                let mut integrator = ImplicitEulerIntegrator::new(dt, params).unwrap();
                integrator
                    .advance(
                        black_box(&mut grand),
                        black_box(&mut flux),
                        black_box(&mut state),
                        10.0 * dt,
                    )
                    .unwrap();
                state.integrate_density("a").unwrap()
            });
        });
    }

    group.finish();
}

/// Picard equilibrium solve at increasing resolution.
fn benchmark_picard(c: &mut Criterion) {
    let mut group = c.benchmark_group("Picard Iteration");

    for &shape in &[100usize, 1000, 10000] {
        group.throughput(criterion::Throughput::Elements(shape as u64));
        group.bench_with_input(BenchmarkId::from_parameter(shape), &shape, |b, &shape| {
            let template = perturbed_state(shape);
            let count = template.integrate_density("a").unwrap();
            let solver = PicardIteration::new(FixedPointParams::new(0.5, 10000, 1e-10).unwrap());

            b.iter(|| {
                let mut state = template.clone();
                let mut grand = GrandPotential::new();
                grand.set_constraint("a", Constraint::FixedCount(count));
                let converged = solver
                    .solve(black_box(&mut grand), black_box(&mut state))
                    .unwrap();
                assert!(converged);
                state.field("a").unwrap().get(0)
            });
        });
    }

    group.finish();
}

/// Cost of a `compute` that is a pure cache hit.
///
/// The first compute in each iteration pays for the evaluation; the
/// repeated computes only check tokens. This should be flat in mesh size
/// up to the token comparisons themselves.
fn benchmark_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cache Hit");

    for &shape in &[100usize, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(shape), &shape, |b, &shape| {
            let mut state = perturbed_state(shape);
            let mut grand = GrandPotential::new();
            grand.compute(&mut state, true).unwrap();

            b.iter(|| grand.compute(black_box(&mut state), true).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_explicit_euler,
    benchmark_implicit_euler,
    benchmark_picard,
    benchmark_cache_hit,
);
criterion_main!(benches);
