//! Free-energy functionals
//!
//! A [`Functional`] maps the density fields of a [`State`] to a scalar
//! free-energy value and one derivative field per species. Implementations
//! share a [`FunctionalCore`] that carries the cached outputs and the
//! bookkeeping for incremental recomputation: a compute runs only when the
//! functional's own parameters, the state, or a declared dependency changed
//! since the last one, or when the value is requested but was skipped
//! before.
//!
//! # Module Organization
//!
//! - [`composite`]: sum of member functionals
//! - [`ideal_gas`]: exact ideal-gas free energy
//! - [`grand_potential`]: ideal + excess + external with per-species
//!   constraints

pub mod composite;
pub mod grand_potential;
pub mod ideal_gas;

pub use composite::CompositeFunctional;
pub use grand_potential::{Constraint, GrandPotential};
pub use ideal_gas::IdealGasFunctional;

use crate::error::{Error, Result};
use crate::state::{Field, SpeciesMap, State};
use crate::tracking::{DependencySet, ObjectId, Token, Tracker};

// =================================================================================================
// Core
// =================================================================================================

/// Cached outputs and recomputation bookkeeping shared by every functional.
#[derive(Debug)]
pub struct FunctionalCore {
    tracker: Tracker,
    /// Last computed value; NaN when the value was not requested.
    value: f64,
    derivatives: SpeciesMap<Field>,
    buffer_requests: SpeciesMap<usize>,
    depends: DependencySet,
    compute_token: Option<Token>,
    compute_state_token: Option<Token>,
}

impl FunctionalCore {
    pub fn new() -> Self {
        Self {
            tracker: Tracker::new(),
            value: f64::NAN,
            derivatives: SpeciesMap::new(),
            buffer_requests: SpeciesMap::new(),
            depends: DependencySet::new(),
            compute_token: None,
            compute_state_token: None,
        }
    }

    /// Record a mutation of the functional's parameters so the next compute
    /// sees it as stale.
    pub fn stage(&mut self) {
        self.tracker.stage();
    }

    /// Write the cached value. For [`Functional::evaluate`] implementations.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Mutable derivative storage for one species. For
    /// [`Functional::evaluate`] implementations.
    pub fn derivative_mut(&mut self, species: &str) -> Result<&mut Field> {
        self.derivatives.get_mut(species)
    }
}

impl Default for FunctionalCore {
    fn default() -> Self {
        Self::new()
    }
}

// =================================================================================================
// Trait
// =================================================================================================

/// A free-energy contribution with cached value and derivative fields.
///
/// Implementors provide [`evaluate`](Functional::evaluate) and storage
/// access; the provided [`compute`](Functional::compute) wraps it with the
/// staleness protocol. Composed functionals additionally override
/// [`setup`](Functional::setup) to bring their members up to date first and
/// report member tokens from
/// [`dependency_tokens`](Functional::dependency_tokens).
pub trait Functional {
    fn core(&self) -> &FunctionalCore;

    fn core_mut(&mut self) -> &mut FunctionalCore;

    /// Halo cells this functional needs on the state's density fields.
    fn buffer_shape(&self) -> usize {
        0
    }

    /// Version tokens of dependencies other than the state itself.
    fn dependency_tokens(&mut self) -> Vec<Token> {
        Vec::new()
    }

    /// Prepare storage before a compute. The default requests density halos
    /// and matches the derivative fields to the state; overrides must end by
    /// calling [`base_setup`](Functional::base_setup).
    fn setup(&mut self, state: &mut State, compute_value: bool) -> Result<()> {
        let _ = compute_value;
        self.base_setup(state)
    }

    /// Storage preparation shared by all functionals.
    fn base_setup(&mut self, state: &mut State) -> Result<()> {
        let width = self.buffer_shape();
        if width > 0 {
            let species: Vec<String> = state.species().to_vec();
            for s in &species {
                state.request_field_buffer(s, width)?;
            }
        }
        let core = self.core_mut();
        state.match_fields(&mut core.derivatives, &core.buffer_requests);
        Ok(())
    }

    /// Unconditionally recompute the value (when requested) and the
    /// derivative fields from the state.
    fn evaluate(&mut self, state: &mut State, compute_value: bool) -> Result<()>;

    /// Bring the cached outputs up to date, re-evaluating only when stale.
    /// Returns whether an evaluation ran.
    fn compute(&mut self, state: &mut State, compute_value: bool) -> Result<bool> {
        self.setup(state, compute_value)?;

        let state_token = state.token();
        let mut current = self.dependency_tokens();
        current.push(state_token);

        let own = self.core_mut().tracker.token();
        let stale = {
            let core = self.core();
            core.compute_token != Some(own)
                || core.compute_state_token != Some(state_token)
                || core.depends.changed(&current)
                || (compute_value && core.value.is_nan())
        };
        if stale {
            state.sync_fields();
            self.evaluate(state, compute_value)?;

            let comm = state.communicator();
            let core = self.core_mut();
            for derivative in core.derivatives.sync_iter_mut() {
                comm.sync(derivative);
            }
            if !compute_value {
                core.value = f64::NAN;
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

    /// Last computed value.
    ///
    /// Fails with [`Error::NotComputed`] before the first compute or when
    /// the last compute skipped the value.
    fn value(&self) -> Result<f64> {
        let core = self.core();
        if core.compute_token.is_none() || core.value.is_nan() {
            return Err(Error::NotComputed);
        }
        Ok(core.value)
    }

    /// Last computed derivative field for one species.
    fn derivative(&self, species: &str) -> Result<&Field> {
        if self.core().compute_token.is_none() {
            return Err(Error::NotComputed);
        }
        self.core().derivatives.get(species)
    }

    /// Ask for halo cells on one species' derivative field. Requests merge
    /// by maximum and take effect at the next compute.
    fn request_derivative_buffer(&mut self, species: &str, width: usize) {
        let core = self.core_mut();
        let current = core.buffer_requests.try_get(species).copied().unwrap_or(0);
        if width > current {
            core.buffer_requests.insert(species, width);
        }
    }
}
