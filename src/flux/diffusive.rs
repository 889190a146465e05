//! Brownian diffusive flux
//!
//! Overdamped diffusion down the gradient of the full chemical potential,
//!
//! ```text
//! j_i = -D_i * (grad rho_i + rho_i * grad(mu_ex,i + V_i))
//! ```
//!
//! evaluated at cell faces with centered differences; the density entering
//! the drift term is interpolated onto the face. The split form (instead of
//! `-D rho grad(delta Omega / delta rho)`) stays finite where the density
//! vanishes.
//!
//! Hard walls are expressed as infinite external potentials. A cell at
//! `+inf` must be empty and exchanges no flux with its neighbors; a cell at
//! `-inf` would swallow particles at an infinite rate and is rejected.

use crate::error::{Error, Result};
use crate::flux::{Flux, FluxCore};
use crate::functional::{Functional, GrandPotential};
use crate::state::{SpeciesMap, State};
use crate::tracking::Token;

/// Brownian diffusion with a per-species diffusivity.
#[derive(Debug, Default)]
pub struct DiffusiveFlux {
    core: FluxCore,
    diffusivities: SpeciesMap<f64>,
}

impl DiffusiveFlux {
    pub fn new() -> Self {
        Self {
            core: FluxCore::new(),
            diffusivities: SpeciesMap::new(),
        }
    }

    /// Diffusivity of one species; must have been set.
    pub fn diffusivity(&self, species: &str) -> Result<f64> {
        self.diffusivities.get(species).copied()
    }

    pub fn set_diffusivity(&mut self, species: impl Into<String>, diffusivity: f64) {
        self.diffusivities.insert(species, diffusivity);
    }
}

impl Flux for DiffusiveFlux {
    fn core(&self) -> &FluxCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FluxCore {
        &mut self.core
    }

    fn buffer_shape(&self) -> usize {
        1
    }

    fn dependency_tokens(&mut self) -> Vec<Token> {
        vec![self.diffusivities.token()]
    }

    fn evaluate(&mut self, grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        let species: Vec<String> = state.species().to_vec();

        // infinite potentials must be consistent with the density for every
        // species before any flux is written, so an error leaves the
        // previously cached fields untouched
        for s in &species {
            self.diffusivity(s)?;
            let rho = state.field(s)?;
            if let Some(v) = grand.external().map(|f| f.derivative(s)).transpose()? {
                for idx in 0..rho.shape() as isize {
                    let value = v.get(idx);
                    if value == f64::NEG_INFINITY {
                        return Err(Error::PotentialSink {
                            species: s.clone(),
                            cell: idx as usize,
                        });
                    }
                    if value == f64::INFINITY && rho.get(idx) > 0.0 {
                        return Err(Error::InfinitePotentialFlux {
                            species: s.clone(),
                            cell: idx as usize,
                        });
                    }
                }
            }
        }

        for s in &species {
            let diffusivity = self.diffusivity(s)?;
            let rho = state.field(s)?;
            let mesh = state.mesh();
            let shape = rho.shape() as isize;

            let excess = grand.excess().map(|f| f.derivative(s)).transpose()?;
            let external = grand.external().map(|f| f.derivative(s)).transpose()?;

            let flux = self.core.flux_mut(s)?;
            for idx in 0..shape {
                let blocked = external
                    .map(|v| v.get(idx) == f64::INFINITY || v.get(idx - 1) == f64::INFINITY)
                    .unwrap_or(false);
                let j = if blocked {
                    0.0
                } else {
                    let mut drift = 0.0;
                    if let Some(ex) = excess {
                        drift += mesh.gradient(ex, idx);
                    }
                    if let Some(v) = external {
                        drift += mesh.gradient(v, idx);
                    }
                    let rho_face = mesh.interpolate(rho, idx);
                    -diffusivity * (mesh.gradient(rho, idx) + rho_face * drift)
                };
                flux.set(idx, j);
            }
        }
        Ok(())
    }
}
