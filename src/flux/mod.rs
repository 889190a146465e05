//! Density fluxes
//!
//! A [`Flux`] maps a [`GrandPotential`] and a [`State`] to one
//! face-centered flux field per species: entry `idx` is the flux through
//! the left face of cell `idx`, positive toward increasing coordinate. The
//! divergence of these fields drives the density evolution inside the
//! integrators.
//!
//! Fluxes only exist for species whose particle count is conserved; a
//! fixed-potential constraint has no local conservation law, and setup
//! rejects it.
//!
//! # Module Organization
//!
//! - [`composite`]: sum of member fluxes
//! - [`diffusive`]: Brownian diffusion driven by the chemical-potential
//!   gradient

pub mod composite;
pub mod diffusive;

pub use composite::CompositeFlux;
pub use diffusive::DiffusiveFlux;

use crate::error::{Error, Result};
use crate::functional::{Functional, GrandPotential};
use crate::state::{Field, SpeciesMap, State};
use crate::tracking::{DependencySet, ObjectId, Token, Tracker};

// =================================================================================================
// Core
// =================================================================================================

/// Cached flux fields and recomputation bookkeeping shared by every flux.
#[derive(Debug)]
pub struct FluxCore {
    tracker: Tracker,
    fluxes: SpeciesMap<Field>,
    depends: DependencySet,
    compute_token: Option<Token>,
    compute_state_token: Option<Token>,
}

impl FluxCore {
    pub fn new() -> Self {
        Self {
            tracker: Tracker::new(),
            fluxes: SpeciesMap::new(),
            depends: DependencySet::new(),
            compute_token: None,
            compute_state_token: None,
        }
    }

    /// Record a mutation of the flux's parameters so the next compute sees
    /// it as stale.
    pub fn stage(&mut self) {
        self.tracker.stage();
    }

    /// Mutable flux storage for one species. For [`Flux::evaluate`]
    /// implementations.
    pub fn flux_mut(&mut self, species: &str) -> Result<&mut Field> {
        self.fluxes.get_mut(species)
    }
}

impl Default for FluxCore {
    fn default() -> Self {
        Self::new()
    }
}

// =================================================================================================
// Trait
// =================================================================================================

/// A face-centered flux with cached fields per species.
pub trait Flux {
    fn core(&self) -> &FluxCore;

    fn core_mut(&mut self) -> &mut FluxCore;

    /// Halo cells this flux needs on the density and derivative fields.
    fn buffer_shape(&self) -> usize {
        0
    }

    /// Version tokens of dependencies other than the grand potential and
    /// the state.
    fn dependency_tokens(&mut self) -> Vec<Token> {
        Vec::new()
    }

    /// Reject constraints the flux cannot honor. The default requires every
    /// species to conserve its particle count.
    fn validate_constraints(&self, grand: &GrandPotential, state: &State) -> Result<()> {
        for s in state.species() {
            if !grand.conserves(s) {
                return Err(Error::UnsupportedConstraint(s.clone()));
            }
        }
        Ok(())
    }

    /// Prepare storage and bring the grand potential up to date. Overrides
    /// must end by calling [`base_setup`](Flux::base_setup).
    fn setup(&mut self, grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        self.base_setup(grand, state)
    }

    fn base_setup(&mut self, grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        self.validate_constraints(grand, state)?;
        let width = self.buffer_shape();
        if width > 0 {
            let species: Vec<String> = state.species().to_vec();
            for s in &species {
                state.request_field_buffer(s, width)?;
                grand.request_derivative_buffer(s, width);
            }
        }
        grand.compute(state, false)?;
        state.match_fields(&mut self.core_mut().fluxes, &SpeciesMap::new());
        Ok(())
    }

    /// Unconditionally recompute the flux fields.
    fn evaluate(&mut self, grand: &mut GrandPotential, state: &mut State) -> Result<()>;

    /// Bring the cached flux fields up to date, re-evaluating only when the
    /// grand potential, the state, or a declared dependency changed.
    /// Returns whether an evaluation ran.
    fn compute(&mut self, grand: &mut GrandPotential, state: &mut State) -> Result<bool> {
        self.setup(grand, state)?;

        let state_token = state.token();
        let mut current = self.dependency_tokens();
        current.push(grand.token());
        current.push(state_token);

        let own = self.core_mut().tracker.token();
        let stale = {
            let core = self.core();
            core.compute_token != Some(own)
                || core.compute_state_token != Some(state_token)
                || core.depends.changed(&current)
        };
        if stale {
            state.sync_fields();
            self.evaluate(grand, state)?;

            let comm = state.communicator();
            let core = self.core_mut();
            for flux in core.fluxes.sync_iter_mut() {
                comm.sync(flux);
            }
            core.tracker.stage_and_commit();
            core.compute_token = Some(core.tracker.token());
            core.compute_state_token = Some(state_token);
            core.depends.capture(&current);
        }
        Ok(stale)
    }

    fn id(&self) -> ObjectId {
        self.core().tracker.id()
    }

    /// Commit any staged parameter change and return the stable token.
    fn token(&mut self) -> Token {
        self.core_mut().tracker.token()
    }

    /// Last computed flux field for one species. Entry `idx` is the flux
    /// through the left face of cell `idx`.
    fn flux(&self, species: &str) -> Result<&Field> {
        if self.core().compute_token.is_none() {
            return Err(Error::NotComputed);
        }
        self.core().fluxes.get(species)
    }
}
