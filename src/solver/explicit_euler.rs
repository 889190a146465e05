//! Forward Euler
//!
//! The cheapest scheme: evaluate the flux once at the current densities and
//! apply its divergence for the whole step,
//!
//! ```text
//! rho(t + dt) = rho(t) + dt * (j(idx) - j(idx+1)) / step
//! ```
//!
//! with periodic wraparound at the last face. First order, conditionally
//! stable; pair it with small timesteps or adaptive control.
//!
//! A too-large step can push a cell below zero density. What happens then
//! is a policy choice: clamping to zero keeps the run alive at the cost of
//! an artificial mass change, rejecting turns overshoots beyond a threshold
//! into hard errors.

use crate::error::{Error, Result};
use crate::flux::Flux;
use crate::functional::GrandPotential;
use crate::solver::integrator::{face_divergence, Integrator, IntegratorCore};
use crate::state::State;

/// Treatment of cells a step pushed below zero density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NegativeDensityPolicy {
    /// Clamp the cell to zero and continue.
    Clamp,
    /// Clamp small overshoots, fail the step beyond `threshold`.
    Reject { threshold: f64 },
}

impl Default for NegativeDensityPolicy {
    fn default() -> Self {
        Self::Clamp
    }
}

/// Forward-Euler integrator.
#[derive(Debug)]
pub struct ExplicitEulerIntegrator {
    core: IntegratorCore,
    policy: NegativeDensityPolicy,
}

impl ExplicitEulerIntegrator {
    pub fn new(timestep: f64) -> Result<Self> {
        Ok(Self {
            core: IntegratorCore::new(timestep)?,
            policy: NegativeDensityPolicy::default(),
        })
    }

    pub fn policy(&self) -> NegativeDensityPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: NegativeDensityPolicy) {
        self.policy = policy;
    }
}

impl Integrator for ExplicitEulerIntegrator {
    fn core(&self) -> &IntegratorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IntegratorCore {
        &mut self.core
    }

    fn order(&self) -> usize {
        1
    }

    fn step(
        &mut self,
        grand: &mut GrandPotential,
        flux: &mut dyn Flux,
        state: &mut State,
        timestep: f64,
    ) -> Result<()> {
        flux.compute(grand, state)?;

        let species: Vec<String> = state.species().to_vec();
        let policy = self.policy;
        for s in &species {
            let rates = face_divergence(flux.flux(s)?, state.mesh());
            let rho = state.field_mut(s)?;
            for (idx, rate) in rates.iter().enumerate() {
                let mut value = rho.get(idx as isize) + timestep * rate;
                if value < 0.0 {
                    if let NegativeDensityPolicy::Reject { threshold } = policy {
                        if -value > threshold {
                            return Err(Error::NegativeDensity {
                                species: s.clone(),
                                cell: idx,
                                value,
                            });
                        }
                    }
                    value = 0.0;
                }
                rho.set(idx as isize, value);
            }
        }
        state.advance_time(timestep);
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux::{DiffusiveFlux, FluxCore};
    use crate::state::Mesh;

    fn striped_state() -> State {
        let mut state = State::new(Mesh::new(4.0, 4).unwrap(), &["a"]);
        state
            .field_mut("a")
            .unwrap()
            .owned_mut()
            .copy_from_slice(&[1.0, 0.2, 1.0, 0.2]);
        state
    }

    #[test]
    fn test_diffusion_conserves_mass() {
        let mut state = striped_state();
        let mut grand = GrandPotential::new();
        let mut flux = DiffusiveFlux::new();
        flux.set_diffusivity("a", 1.0);
        let before = state.integrate_density("a").unwrap();

        let mut integrator = ExplicitEulerIntegrator::new(0.05).unwrap();
        integrator
            .advance(&mut grand, &mut flux, &mut state, 1.0)
            .unwrap();

        let after = state.integrate_density("a").unwrap();
        assert!((after - before).abs() < 1e-10);
    }

    #[test]
    fn test_diffusion_relaxes_to_uniform() {
        let mut state = striped_state();
        let mut grand = GrandPotential::new();
        let mut flux = DiffusiveFlux::new();
        flux.set_diffusivity("a", 1.0);

        let mut integrator = ExplicitEulerIntegrator::new(0.05).unwrap();
        integrator
            .advance(&mut grand, &mut flux, &mut state, 20.0)
            .unwrap();

        for idx in 0..4 {
            assert!((state.field("a").unwrap().get(idx) - 0.6).abs() < 1e-6);
        }
        assert!((state.time() - 20.0).abs() < 1e-9);
    }

    /// Flux with a single loaded face, to force a negative overshoot.
    struct SpikeFlux {
        core: FluxCore,
        magnitude: f64,
    }

    impl SpikeFlux {
        fn new(magnitude: f64) -> Self {
            Self {
                core: FluxCore::new(),
                magnitude,
            }
        }
    }

    impl Flux for SpikeFlux {
        fn core(&self) -> &FluxCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut FluxCore {
            &mut self.core
        }
        fn evaluate(&mut self, _grand: &mut GrandPotential, state: &mut State) -> Result<()> {
            let species: Vec<String> = state.species().to_vec();
            for s in &species {
                let j = self.core.flux_mut(s)?;
                j.fill(0.0);
                j.set(1, self.magnitude);
            }
            Ok(())
        }
    }

    #[test]
    fn test_clamp_policy_zeroes_overshoot() {
        let mut state = State::new(Mesh::new(4.0, 4).unwrap(), &["a"]);
        state.field_mut("a").unwrap().owned_mut().fill(0.2);
        let mut grand = GrandPotential::new();
        let mut flux = SpikeFlux::new(1.0);

        let mut integrator = ExplicitEulerIntegrator::new(0.5).unwrap();
        integrator
            .step(&mut grand, &mut flux, &mut state, 0.5)
            .unwrap();

        // cell 0 lost 0.5 from a reserve of 0.2 and was clamped
        assert_eq!(state.field("a").unwrap().get(0), 0.0);
        assert!((state.field("a").unwrap().get(1) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_reject_policy_fails_beyond_threshold() {
        let mut state = State::new(Mesh::new(4.0, 4).unwrap(), &["a"]);
        state.field_mut("a").unwrap().owned_mut().fill(0.2);
        let mut grand = GrandPotential::new();
        let mut flux = SpikeFlux::new(1.0);

        let mut integrator = ExplicitEulerIntegrator::new(0.5).unwrap();
        integrator.set_policy(NegativeDensityPolicy::Reject { threshold: 0.1 });

        assert_eq!(
            integrator
                .step(&mut grand, &mut flux, &mut state, 0.5)
                .unwrap_err(),
            Error::NegativeDensity {
                species: "a".to_string(),
                cell: 0,
                value: -0.3,
            }
        );
    }

    #[test]
    fn test_reject_policy_tolerates_small_overshoot() {
        let mut state = State::new(Mesh::new(4.0, 4).unwrap(), &["a"]);
        state.field_mut("a").unwrap().owned_mut().fill(0.2);
        let mut grand = GrandPotential::new();
        let mut flux = SpikeFlux::new(1.0);

        let mut integrator = ExplicitEulerIntegrator::new(0.5).unwrap();
        integrator.set_policy(NegativeDensityPolicy::Reject { threshold: 0.5 });

        integrator
            .step(&mut grand, &mut flux, &mut state, 0.5)
            .unwrap();
        assert_eq!(state.field("a").unwrap().get(0), 0.0);
    }
}
