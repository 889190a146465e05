//! Mock functionals for testing
//!
//! These functionals have known analytical behaviour, making them ideal for
//! validating solver accuracy and cache bookkeeping.

use cdft_rs::error::Result;
use cdft_rs::functional::{Functional, FunctionalCore};
use cdft_rs::state::State;

// =================================================================================================
// Quadratic (local) excess: F_ex = (c/2) * integral rho^2
// =================================================================================================

/// Local quadratic excess free energy, `F_ex = (c/2) * integral rho^2`.
///
/// Its derivative is simply `c * rho`, so uniform profiles stay uniform
/// and the free energy of a uniform state is `(c/2) * rho^2 * L`. The
/// struct counts its evaluations for cache tests.
pub struct QuadraticExcess {
    core: FunctionalCore,
    pub strength: f64,
    pub evaluations: usize,
}

impl QuadraticExcess {
    pub fn new(strength: f64) -> Self {
        Self {
            core: FunctionalCore::new(),
            strength,
            evaluations: 0,
        }
    }

    /// Free energy of a uniform profile at density `rho` on a domain of
    /// length `length`.
    pub fn analytical_uniform_value(&self, rho: f64, length: f64) -> f64 {
        0.5 * self.strength * rho * rho * length
    }
}

impl Functional for QuadraticExcess {
    fn core(&self) -> &FunctionalCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FunctionalCore {
        &mut self.core
    }

    fn evaluate(&mut self, state: &mut State, compute_value: bool) -> Result<()> {
        self.evaluations += 1;
        let species: Vec<String> = state.species().to_vec();
        let mut value = 0.0;
        for s in &species {
            let strength = self.strength;
            let field = state.field(s)?;
            let shape = field.shape();
            let derivative = self.core.derivative_mut(s)?;
            for idx in 0..shape {
                let rho = field.get(idx as isize);
                derivative.set(idx as isize, strength * rho);
                if compute_value {
                    value += state.mesh().integrate(0.5 * strength * rho * rho);
                }
            }
        }
        self.core.set_value(value);
        Ok(())
    }
}

// =================================================================================================
// External potential from a coordinate profile
// =================================================================================================

/// External potential `V(x)` sampled from a closure at cell centers,
/// applied identically to every species.
///
/// The free energy is `sum_i integral rho_i V` and the derivative is `V`
/// itself, so the equilibrium of an ideal gas under this potential is the
/// Boltzmann profile `rho(x) ~ exp(-V(x))`.
pub struct ExternalPotential {
    core: FunctionalCore,
    potential: Box<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl ExternalPotential {
    pub fn new(potential: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            core: FunctionalCore::new(),
            potential: Box::new(potential),
        }
    }
}

impl Functional for ExternalPotential {
    fn core(&self) -> &FunctionalCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FunctionalCore {
        &mut self.core
    }

    fn evaluate(&mut self, state: &mut State, compute_value: bool) -> Result<()> {
        let species: Vec<String> = state.species().to_vec();
        let mut value = 0.0;
        for s in &species {
            let field = state.field(s)?;
            let shape = field.shape();
            let potentials: Vec<f64> = (0..shape)
                .map(|idx| (self.potential)(state.mesh().coordinate(idx)))
                .collect();
            if compute_value {
                for (idx, v) in potentials.iter().enumerate() {
                    let rho = field.get(idx as isize);
                    if rho > 0.0 {
                        value += state.mesh().integrate(rho * v);
                    }
                }
            }
            let derivative = self.core.derivative_mut(s)?;
            for (idx, v) in potentials.iter().enumerate() {
                derivative.set(idx as isize, *v);
            }
        }
        self.core.set_value(value);
        Ok(())
    }
}
