//! Grand potential
//!
//! The generating functional of the dynamics and of the equilibrium
//! condition,
//!
//! ```text
//! Omega = F_id + F_ex + F_ext - sum_i mu_i * N_i
//! ```
//!
//! assembled from an always-present ideal-gas term, an optional excess
//! (interaction) term, and an optional external-potential term. Each
//! species carries a constraint: either its particle count is held fixed
//! (the default, the canonical case) or its chemical potential is held
//! fixed (grand canonical), in which case the `mu` terms above apply to it.

use crate::error::Result;
use crate::functional::{Functional, FunctionalCore, IdealGasFunctional};
use crate::state::{SpeciesMap, State};
use crate::tracking::Token;

/// Thermodynamic constraint applied to one species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Hold the particle count at the given value.
    FixedCount(f64),
    /// Hold the chemical potential at the given value.
    FixedPotential(f64),
}

impl Constraint {
    pub fn is_fixed_count(&self) -> bool {
        matches!(self, Constraint::FixedCount(_))
    }
}

/// Grand potential functional with per-species constraints.
///
/// Species without an explicit constraint behave as fixed count.
#[derive(Default)]
pub struct GrandPotential {
    core: FunctionalCore,
    ideal: IdealGasFunctional,
    excess: Option<Box<dyn Functional>>,
    external: Option<Box<dyn Functional>>,
    constraints: SpeciesMap<Constraint>,
}

impl GrandPotential {
    pub fn new() -> Self {
        Self {
            core: FunctionalCore::new(),
            ideal: IdealGasFunctional::new(),
            excess: None,
            external: None,
            constraints: SpeciesMap::new(),
        }
    }

    pub fn ideal(&self) -> &IdealGasFunctional {
        &self.ideal
    }

    pub fn excess(&self) -> Option<&dyn Functional> {
        self.excess.as_deref()
    }

    pub fn excess_mut(&mut self) -> Option<&mut Box<dyn Functional>> {
        self.excess.as_mut()
    }

    pub fn set_excess(&mut self, excess: Box<dyn Functional>) {
        self.excess = Some(excess);
        self.core.stage();
    }

    pub fn external(&self) -> Option<&dyn Functional> {
        self.external.as_deref()
    }

    pub fn external_mut(&mut self) -> Option<&mut Box<dyn Functional>> {
        self.external.as_mut()
    }

    pub fn set_external(&mut self, external: Box<dyn Functional>) {
        self.external = Some(external);
        self.core.stage();
    }

    /// Constraint on one species, if one was set explicitly.
    pub fn constraint(&self, species: &str) -> Option<Constraint> {
        self.constraints.try_get(species).copied()
    }

    pub fn set_constraint(&mut self, species: impl Into<String>, constraint: Constraint) {
        self.constraints.insert(species, constraint);
    }

    /// Whether a species conserves its particle count. Unconstrained
    /// species do.
    pub fn conserves(&self, species: &str) -> bool {
        self.constraints
            .try_get(species)
            .map(Constraint::is_fixed_count)
            .unwrap_or(true)
    }

    fn members_mut(&mut self) -> impl Iterator<Item = &mut dyn Functional> + '_ {
        std::iter::once(&mut self.ideal as &mut dyn Functional)
            .chain(self.excess.as_mut().map(|f| f.as_mut() as &mut dyn Functional))
            .chain(self.external.as_mut().map(|f| f.as_mut() as &mut dyn Functional))
    }

    fn members(&self) -> impl Iterator<Item = &dyn Functional> + '_ {
        std::iter::once(&self.ideal as &dyn Functional)
            .chain(self.excess.as_deref())
            .chain(self.external.as_deref())
    }
}

impl Functional for GrandPotential {
    fn core(&self) -> &FunctionalCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FunctionalCore {
        &mut self.core
    }

    fn buffer_shape(&self) -> usize {
        self.members()
            .map(|m| m.buffer_shape())
            .max()
            .unwrap_or(0)
    }

    fn dependency_tokens(&mut self) -> Vec<Token> {
        let constraints = self.constraints.token();
        let mut tokens: Vec<Token> = self.members_mut().map(|m| m.token()).collect();
        tokens.push(constraints);
        tokens
    }

    fn setup(&mut self, state: &mut State, compute_value: bool) -> Result<()> {
        let requests: Vec<(String, usize)> = self
            .core
            .buffer_requests
            .iter()
            .map(|(s, w)| (s.clone(), *w))
            .collect();
        for member in self.members_mut() {
            for (s, w) in &requests {
                member.request_derivative_buffer(s, *w);
            }
            member.compute(state, compute_value)?;
        }
        self.base_setup(state)
    }

    fn evaluate(&mut self, state: &mut State, compute_value: bool) -> Result<()> {
        let species: Vec<String> = state.species().to_vec();
        let mut value = 0.0;
        for s in &species {
            self.core.derivative_mut(s)?.fill(0.0);
        }
        for member in std::iter::once(&self.ideal as &dyn Functional)
            .chain(self.excess.as_deref())
            .chain(self.external.as_deref())
        {
            if compute_value {
                value += member.value()?;
            }
            for s in &species {
                let contribution = member.derivative(s)?;
                let derivative = self.core.derivative_mut(s)?;
                for idx in 0..derivative.shape() {
                    let sum = derivative.get(idx as isize) + contribution.get(idx as isize);
                    derivative.set(idx as isize, sum);
                }
            }
        }
        // the Legendre term for grand-canonical species
        for s in &species {
            if let Some(Constraint::FixedPotential(mu)) = self.constraint(s) {
                self.core.derivative_mut(s)?.apply(|d| d - mu);
                if compute_value {
                    value -= mu * state.integrate_density(s)?;
                }
            }
        }
        self.core.set_value(value);
        Ok(())
    }
}
