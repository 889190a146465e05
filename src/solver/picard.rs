//! Picard equilibrium iteration
//!
//! At equilibrium the density of species `i` satisfies the implicit
//! Euler-Lagrange condition
//!
//! ```text
//! rho_i(x) proportional to exp(-(mu_ex,i(x) + V_i(x)))
//! ```
//!
//! with the proportionality fixed by the species constraint: a fixed
//! particle count normalizes the profile to that count, a fixed chemical
//! potential scales it by `exp(mu) / v_i`. The iteration evaluates the
//! right-hand side at the current densities and mixes a damped fraction of
//! it into the fields until the update falls below tolerance.
//!
//! Non-convergence is an `Ok(false)` outcome, not an error: the caller can
//! tighten the damping and resume from the partial result.

use crate::error::{Error, Result};
use crate::functional::{Constraint, Functional, GrandPotential};
use crate::solver::FixedPointParams;
use crate::state::State;

/// Damped Picard solver for equilibrium density profiles.
#[derive(Debug, Clone, Copy)]
pub struct PicardIteration {
    params: FixedPointParams,
}

impl PicardIteration {
    pub fn new(params: FixedPointParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> FixedPointParams {
        self.params
    }

    /// Relax the state toward the equilibrium of the grand potential.
    /// Returns whether the iteration converged within its budget.
    ///
    /// Every species must carry an explicit constraint; a fixed count is
    /// needed as a number here, not just as a default conservation rule.
    pub fn solve(&self, grand: &mut GrandPotential, state: &mut State) -> Result<bool> {
        let species: Vec<String> = state.species().to_vec();
        let shape = state.mesh().shape();
        let mix = self.params.mix();
        let tolerance = self.params.tolerance();

        let mut converged = false;
        for _ in 0..self.params.max_iterations() {
            // the ideal part is handled analytically by the exponential;
            // only the interaction and external terms are evaluated
            if let Some(excess) = grand.excess_mut() {
                excess.compute(state, false)?;
            }
            if let Some(external) = grand.external_mut() {
                external.compute(state, false)?;
            }

            converged = true;
            for s in &species {
                let mut trial = vec![0.0; shape];
                {
                    let excess = grand.excess().map(|f| f.derivative(s)).transpose()?;
                    let external = grand.external().map(|f| f.derivative(s)).transpose()?;
                    for (idx, t) in trial.iter_mut().enumerate() {
                        let mut field = 0.0;
                        if let Some(d) = excess {
                            field += d.get(idx as isize);
                        }
                        if let Some(v) = external {
                            field += v.get(idx as isize);
                        }
                        // exp(-inf) = 0 empties hard-wall cells exactly
                        *t = (-field).exp();
                    }
                }

                let norm = match grand.constraint(s) {
                    Some(Constraint::FixedCount(count)) => {
                        let local: f64 =
                            trial.iter().map(|&t| state.mesh().integrate(t)).sum();
                        let total = state.communicator().sum(local);
                        count / total
                    }
                    Some(Constraint::FixedPotential(mu)) => mu.exp() / state.volume(s)?,
                    None => return Err(Error::MissingConstraint(s.clone())),
                };

                let rho = state.field_mut(s)?;
                for (idx, t) in trial.iter().enumerate() {
                    let target = norm * t;
                    let current = rho.get(idx as isize);
                    let delta = mix * (target - current);
                    if delta.abs() > tolerance {
                        converged = false;
                    }
                    rho.set(idx as isize, current + delta);
                }
            }
            converged = state.communicator().all(converged);
            if converged {
                break;
            }
        }
        Ok(converged)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
