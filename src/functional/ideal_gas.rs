//! Ideal-gas free energy
//!
//! The exact intrinsic free energy of a mixture of non-interacting
//! particles,
//!
//! ```text
//! beta F_id = sum_i  integral dx rho_i(x) * (ln(v_i rho_i(x)) - 1)
//! ```
//!
//! with `v_i` the ideal volume of species `i`. The derivative with respect
//! to the density is `ln(v_i rho_i(x))`. Cells at zero density contribute
//! nothing to the value (the `x ln x` limit) and a negatively infinite
//! derivative.

use crate::error::Result;
use crate::functional::{Functional, FunctionalCore};
use crate::state::State;

/// Exact ideal-gas functional.
#[derive(Debug, Default)]
pub struct IdealGasFunctional {
    core: FunctionalCore,
}

impl IdealGasFunctional {
    pub fn new() -> Self {
        Self {
            core: FunctionalCore::new(),
        }
    }
}

impl Functional for IdealGasFunctional {
    fn core(&self) -> &FunctionalCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FunctionalCore {
        &mut self.core
    }

    fn evaluate(&mut self, state: &mut State, compute_value: bool) -> Result<()> {
        let mut value = 0.0;
        let species: Vec<String> = state.species().to_vec();
        for s in &species {
            let volume = state.volume(s)?;
            let field = state.field(s)?;
            let shape = field.shape();
            let derivative = self.core.derivative_mut(s)?;
            for idx in 0..shape {
                let rho = field.get(idx as isize);
                if rho > 0.0 {
                    let d = (volume * rho).ln();
                    derivative.set(idx as isize, d);
                    if compute_value {
                        value += state.mesh().integrate(rho * (d - 1.0));
                    }
                } else {
                    derivative.set(idx as isize, f64::NEG_INFINITY);
                }
            }
        }
        self.core.set_value(value);
        Ok(())
    }
}
