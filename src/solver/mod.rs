//! Numerical solvers
//!
//! This module provides the numerical methods that drive a simulation: time
//! integrators that evolve the density fields under a flux, and the Picard
//! iteration that relaxes them to equilibrium. The physics lives in the
//! functionals and fluxes; the solvers only decide how to step.
//!
//! # Core Concepts
//!
//! ## The Architecture (WHAT vs HOW)
//!
//! The solver architecture separates concerns into three layers:
//!
//! 1. **Grand potential** ([`GrandPotential`](crate::functional::GrandPotential))
//!    - WHAT drives the system: free energies and constraints
//!
//! 2. **Flux** ([`Flux`](crate::flux::Flux)) - WHAT moves
//!    - Face-centered currents derived from the grand potential
//!
//! 3. **Integrator** ([`Integrator`]) - HOW to step
//!    - Applies a time-stepping scheme to the conservation law
//!    - Independent of the specific functionals and fluxes
//!
//! This separation allows the same integrator to drive different physics,
//! and different integrators to be compared on the same physics.
//!
//! # Module Organization
//!
//! - [`integrator`]: the [`Integrator`] trait, shared stepping loop, and
//!   adaptive timestep control
//! - [`explicit_euler`]: forward Euler
//! - [`implicit_euler`]: backward Euler via damped fixed-point iteration
//! - [`crank_nicolson`]: trapezoidal rule via damped fixed-point iteration
//! - [`picard`]: equilibrium solve by damped Picard iteration
//!
//! # Choosing an Integrator
//!
//! - **Forward Euler**: cheapest per step, conditionally stable; use with
//!   small timesteps or adaptive control.
//! - **Backward Euler**: one inner fixed-point solve per step, stable at
//!   larger timesteps; first order.
//! - **Crank-Nicolson**: same cost as backward Euler, second order.
//!
//! # Error Handling
//!
//! Solver constructors validate their parameters eagerly and return
//! [`Error`](crate::error::Error) values; stepping reports physical
//! inconsistencies (occupied hard walls, potential sinks, timestep
//! underflow) through the same enum. Inner fixed-point solves that run out
//! of iterations are a soft failure: the step completes and the integrator
//! records it, since a later step may still converge.

// =================================================================================================
// Module Declarations
// =================================================================================================
pub mod crank_nicolson;
pub mod explicit_euler;
pub mod implicit_euler;
pub mod integrator;
pub mod picard;

// =================================================================================================
// Parallel Execution Threshold
// =================================================================================================
//
// Deciding *when* to hand work off to Rayon is a numerical-execution
// concern, not a physics concern, so it lives here rather than in
// state/field.rs.
//
// The threshold is stored in an AtomicUsize so that it can be changed at
// runtime (useful in benchmarks and tests) without requiring a mutex on
// every `apply()` call. Relaxed ordering is sufficient: the value is a
// performance hint, not a synchronisation point.
// =================================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

/// Default number of cells above which [`Field::apply()`](crate::state::Field::apply)
/// switches to parallel iteration.
///
/// Below this point the overhead of Rayon's thread-pool dispatch outweighs
/// the per-cell work of the arithmetic closures the integrators use.
const DEFAULT_PARALLEL_THRESHOLD: usize = 999;

/// Runtime-configurable parallel-execution threshold.
///
/// Read via [`parallel_threshold()`], written via [`set_parallel_threshold()`].
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

/// Return the current parallel-execution threshold.
///
/// `Field::apply()` uses sequential iteration when a field contains fewer
/// cells than this value, and switches to Rayon when it contains more, but
/// only when the crate is compiled with the `parallel` feature.
///
/// # Example
///
/// ```rust
/// use cdft_rs::solver::parallel_threshold;
///
/// assert!(parallel_threshold() > 0);
/// ```
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Set the parallel-execution threshold to a new value.
///
/// # Panics
///
/// Panics when `threshold == 0`. A zero-cell threshold would force parallel
/// dispatch on every single-cell `apply()`, which is never the intended
/// behaviour.
///
/// # Example
///
/// ```rust
/// use cdft_rs::solver::{parallel_threshold, set_parallel_threshold};
///
/// let previous = parallel_threshold();
/// set_parallel_threshold(2048);
/// assert_eq!(parallel_threshold(), 2048);
///
/// // Restore so other tests are not affected.
/// set_parallel_threshold(previous);
/// ```
pub fn set_parallel_threshold(threshold: usize) {
    assert!(threshold > 0, "parallel threshold must be at least 1");
    PARALLEL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

/// RAII guard that saves the current threshold on construction and restores
/// it on drop.
///
/// Only compiled in test builds. Prevents one test from leaking a modified
/// threshold value into the next.
///
/// ```rust,ignore
/// let _guard = crate::solver::ThresholdGuard::save(50);
/// // threshold is now 50 …
/// // … and is automatically restored when _guard is dropped.
/// ```
#[cfg(test)]
pub(crate) struct ThresholdGuard {
    previous: usize,
}

#[cfg(test)]
impl ThresholdGuard {
    /// Set the threshold to `new_value` and return a guard that will
    /// restore the previous value on drop.
    pub(crate) fn save(new_value: usize) -> Self {
        let previous = parallel_threshold();
        set_parallel_threshold(new_value);
        Self { previous }
    }
}

#[cfg(test)]
impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        // Bypass the public setter so that restoring to any value (including
        // the original default) never panics.
        PARALLEL_THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

// =================================================================================================
// Fixed-point iteration parameters
// =================================================================================================

/// Parameters of a damped fixed-point iteration, shared by the implicit
/// integrators and the Picard equilibrium solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointParams {
    mix: f64,
    max_iterations: usize,
    tolerance: f64,
}

impl FixedPointParams {
    /// Create validated parameters.
    ///
    /// `mix` is the damping factor applied to each update and must lie in
    /// `(0, 1]`; `max_iterations` must be at least 1; `tolerance` bounds the
    /// largest damped per-cell update of a converged iteration and must be
    /// positive.
    pub fn new(mix: f64, max_iterations: usize, tolerance: f64) -> Result<Self> {
        if !(mix > 0.0 && mix <= 1.0) {
            return Err(Error::InvalidMixParameter(mix));
        }
        if max_iterations == 0 {
            return Err(Error::InvalidMaxIterations(max_iterations));
        }
        if !(tolerance > 0.0) {
            return Err(Error::InvalidTolerance(tolerance));
        }
        Ok(Self {
            mix,
            max_iterations,
            tolerance,
        })
    }

    pub fn mix(&self) -> f64 {
        self.mix
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use crank_nicolson::CrankNicolsonIntegrator;
pub use explicit_euler::{ExplicitEulerIntegrator, NegativeDensityPolicy};
pub use implicit_euler::ImplicitEulerIntegrator;
pub use integrator::{AdaptiveTimestep, Integrator, IntegratorCore};
pub use picard::PicardIteration;

// =================================================================================================
// Tests
// =================================================================================================
