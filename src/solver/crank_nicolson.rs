//! Crank-Nicolson
//!
//! The trapezoidal rule: the step averages the flux divergence at the start
//! and end of the interval,
//!
//! ```text
//! rho(t + dt) = rho(t) + dt/2 * (div j[rho(t)] + div j[rho(t + dt)])
//! ```
//!
//! and resolves the implicit half with the same damped fixed-point
//! iteration as backward Euler. Second order at essentially the same cost
//! per step.

use crate::error::Result;
use crate::flux::Flux;
use crate::functional::GrandPotential;
use crate::solver::integrator::{face_divergence, Integrator, IntegratorCore};
use crate::solver::FixedPointParams;
use crate::state::{Field, SpeciesMap, State};

/// Crank-Nicolson integrator with an inner damped fixed-point solve.
#[derive(Debug)]
pub struct CrankNicolsonIntegrator {
    core: IntegratorCore,
    params: FixedPointParams,
    start_fields: SpeciesMap<Field>,
    start_rates: SpeciesMap<Field>,
    converged: bool,
}

impl CrankNicolsonIntegrator {
    pub fn new(timestep: f64, params: FixedPointParams) -> Result<Self> {
        Ok(Self {
            core: IntegratorCore::new(timestep)?,
            params,
            start_fields: SpeciesMap::new(),
            start_rates: SpeciesMap::new(),
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

impl Integrator for CrankNicolsonIntegrator {
    fn core(&self) -> &IntegratorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IntegratorCore {
        &mut self.core
    }

    fn order(&self) -> usize {
        2
    }

    fn prepare(&mut self, _grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        state.match_fields(&mut self.start_fields, &SpeciesMap::new());
        state.match_fields(&mut self.start_rates, &SpeciesMap::new());
        Ok(())
    }

    fn step(
        &mut self,
        grand: &mut GrandPotential,
        flux: &mut dyn Flux,
        state: &mut State,
        timestep: f64,
    ) -> Result<()> {
        state.match_fields(&mut self.start_fields, &SpeciesMap::new());
        state.match_fields(&mut self.start_rates, &SpeciesMap::new());

        // explicit half: densities and rates at the start of the step
        flux.compute(grand, state)?;
        let species: Vec<String> = state.species().to_vec();
        for s in &species {
            let start = self.start_fields.get_mut(s)?;
            start.owned_mut().copy_from_slice(state.field(s)?.owned());

            let rates = face_divergence(flux.flux(s)?, state.mesh());
            self.start_rates
                .get_mut(s)?
                .owned_mut()
                .copy_from_slice(&rates);
        }
        state.advance_time(timestep);

        let mix = self.params.mix();
        let tolerance = self.params.tolerance();
        let half = 0.5 * timestep;
        let mut converged = false;
        for _ in 0..self.params.max_iterations() {
            flux.compute(grand, state)?;
            converged = true;
            for s in &species {
                let rates = face_divergence(flux.flux(s)?, state.mesh());
                let start: Vec<f64> = self.start_fields.get(s)?.owned().to_vec();
                let start_rates: Vec<f64> = self.start_rates.get(s)?.owned().to_vec();
                let rho = state.field_mut(s)?;
                for (idx, rate) in rates.iter().enumerate() {
                    let target = start[idx] + half * (start_rates[idx] + rate);
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
