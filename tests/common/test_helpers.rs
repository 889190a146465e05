//! Helper functions for integration tests

use cdft_rs::state::{Mesh, State};

/// State with a uniform density for one species.
pub fn uniform_state(length: f64, shape: usize, species: &str, rho: f64) -> State {
    let mut state = State::new(Mesh::new(length, shape).unwrap(), &[species]);
    state.field_mut(species).unwrap().owned_mut().fill(rho);
    state
}

/// State carrying a single cosine mode on top of a mean density,
/// `rho(x) = mean + amplitude * cos(2 pi x / L)`.
///
/// On the periodic mesh this is an eigenvector of the discrete diffusion
/// operator, so its exact decay rate is known:
/// `D * (2 - 2 cos(2 pi h / L)) / h^2`.
pub fn cosine_mode_state(
    length: f64,
    shape: usize,
    species: &str,
    mean: f64,
    amplitude: f64,
) -> State {
    let mut state = State::new(Mesh::new(length, shape).unwrap(), &[species]);
    let coordinates: Vec<f64> = (0..shape).map(|idx| state.mesh().coordinate(idx)).collect();
    let rho = state.field_mut(species).unwrap();
    for (idx, x) in coordinates.iter().enumerate() {
        let angle = 2.0 * std::f64::consts::PI * x / length;
        rho.set(idx as isize, mean + amplitude * angle.cos());
    }
    state
}

/// Largest per-cell difference between a species profile and a reference
/// function of the cell-center coordinate.
pub fn max_profile_error(state: &State, species: &str, reference: impl Fn(f64) -> f64) -> f64 {
    let field = state.field(species).unwrap();
    let mut worst: f64 = 0.0;
    for idx in 0..field.shape() {
        let x = state.mesh().coordinate(idx);
        worst = worst.max((field.get(idx as isize) - reference(x)).abs());
    }
    worst
}

/// Assert a species profile matches a reference function cell by cell.
pub fn assert_profile_close(
    state: &State,
    species: &str,
    reference: impl Fn(f64) -> f64,
    tolerance: f64,
) {
    let error = max_profile_error(state, species, &reference);
    assert!(
        error <= tolerance,
        "profile of '{}' deviates from reference by {} (tolerance {})",
        species,
        error,
        tolerance
    );
}
