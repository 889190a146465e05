//! Backward Euler
//!
//! The flux is evaluated at the end-of-step densities,
//!
//! ```text
//! rho(t + dt) = rho(t) + dt * div j[rho(t + dt)]
//! ```
//!
//! which is solved per step by a damped fixed-point iteration: repeatedly
//! recompute the flux at the current iterate and move each cell a fraction
//! `mix` toward its implicit target. First order, but stable at timesteps
//! far beyond the explicit limit.
//!
//! Running out of inner iterations is a soft failure: the step keeps the
//! last iterate and [`converged`](ImplicitEulerIntegrator::converged)
//! reports it, since a later step may still pull the solve back in.

use crate::error::Result;
use crate::flux::Flux;
use crate::functional::GrandPotential;
use crate::solver::integrator::{face_divergence, Integrator, IntegratorCore};
use crate::solver::FixedPointParams;
use crate::state::{Field, SpeciesMap, State};

/// Backward-Euler integrator with an inner damped fixed-point solve.
#[derive(Debug)]
pub struct ImplicitEulerIntegrator {
    core: IntegratorCore,
    params: FixedPointParams,
    start_fields: SpeciesMap<Field>,
    converged: bool,
}

impl ImplicitEulerIntegrator {
    pub fn new(timestep: f64, params: FixedPointParams) -> Result<Self> {
        Ok(Self {
            core: IntegratorCore::new(timestep)?,
            params,
            start_fields: SpeciesMap::new(),
            converged: true,
        })
    }

    pub fn params(&self) -> FixedPointParams {
        self.params
    }

    /// Whether the inner solve of the most recent step converged.
    pub fn converged(&self) -> bool {
        self.converged
    }
}

impl Integrator for ImplicitEulerIntegrator {
    fn core(&self) -> &IntegratorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IntegratorCore {
        &mut self.core
    }

    fn order(&self) -> usize {
        1
    }

    fn prepare(&mut self, _grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        state.match_fields(&mut self.start_fields, &SpeciesMap::new());
        Ok(())
    }

    fn step(
        &mut self,
        grand: &mut GrandPotential,
        flux: &mut dyn Flux,
        state: &mut State,
        timestep: f64,
    ) -> Result<()> {
        // the step may run on a scratch state the prepare never saw
        state.match_fields(&mut self.start_fields, &SpeciesMap::new());
        let species: Vec<String> = state.species().to_vec();
        for s in &species {
            let start = self.start_fields.get_mut(s)?;
            start.owned_mut().copy_from_slice(state.field(s)?.owned());
        }
        state.advance_time(timestep);

        let mix = self.params.mix();
        let tolerance = self.params.tolerance();
        let mut converged = false;
        for _ in 0..self.params.max_iterations() {
            flux.compute(grand, state)?;
            converged = true;
            for s in &species {
                let rates = face_divergence(flux.flux(s)?, state.mesh());
                let start: Vec<f64> = self.start_fields.get(s)?.owned().to_vec();
                let rho = state.field_mut(s)?;
                for (idx, rate) in rates.iter().enumerate() {
                    let target = start[idx] + timestep * rate;
                    let current = rho.get(idx as isize);
                    let delta = mix * (target - current);
                    if delta.abs() > tolerance {
                        converged = false;
                    }
                    rho.set(idx as isize, (current + delta).max(0.0));
                }
            }
            converged = state.communicator().all(converged);
            if converged {
                break;
            }
        }
        self.converged = converged;
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
