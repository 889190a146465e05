//! Sum of member fluxes
//!
//! Different transport mechanisms superpose: the total current through a
//! face is the sum of the member currents. A [`CompositeFlux`] owns its
//! members, brings them up to date during setup so their tokens drive the
//! composite's staleness decision, and accumulates their cached fields.

use crate::error::Result;
use crate::flux::{Flux, FluxCore};
use crate::functional::GrandPotential;
use crate::state::State;
use crate::tracking::Token;

/// Flux that is the sum of its members.
#[derive(Default)]
pub struct CompositeFlux {
    core: FluxCore,
    members: Vec<Box<dyn Flux>>,
}

impl CompositeFlux {
    pub fn new() -> Self {
        Self {
            core: FluxCore::new(),
            members: Vec::new(),
        }
    }

    /// Append a member. The composite owns it exclusively.
    pub fn push(&mut self, member: Box<dyn Flux>) {
        self.members.push(member);
        self.core.stage();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Flux for CompositeFlux {
    fn core(&self) -> &FluxCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FluxCore {
        &mut self.core
    }

    fn buffer_shape(&self) -> usize {
        self.members
            .iter()
            .map(|m| m.buffer_shape())
            .max()
            .unwrap_or(0)
    }

    fn dependency_tokens(&mut self) -> Vec<Token> {
        self.members.iter_mut().map(|m| m.token()).collect()
    }

    fn setup(&mut self, grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        for member in &mut self.members {
            member.compute(grand, state)?;
        }
        self.base_setup(grand, state)
    }

    fn evaluate(&mut self, _grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        let species: Vec<String> = state.species().to_vec();
        for s in &species {
            self.core.flux_mut(s)?.fill(0.0);
        }
        for member in &self.members {
            for s in &species {
                let contribution = member.flux(s)?;
                let total = self.core.flux_mut(s)?;
                for idx in 0..total.shape() {
                    let sum = total.get(idx as isize) + contribution.get(idx as isize);
                    total.set(idx as isize, sum);
                }
            }
        }
        Ok(())
    }
}
