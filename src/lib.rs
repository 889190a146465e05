//! cdft-rs: Classical Density Functional Theory Engine
//!
//! An incremental-computation engine for classical density functional
//! theory on a 1D periodic mesh: free-energy functionals with cached
//! values and derivatives, fluxes derived from them, time integrators for
//! the density conservation law, and a Picard solver for equilibrium
//! profiles.
//!
//! # Architecture
//!
//! cdft-rs is built on two core principles:
//!
//! 1. **Separation of Physics and Numerics**
//!    - Functionals and fluxes define the driving forces (what to solve)
//!    - Integrators and the Picard iteration provide methods (how to solve)
//!
//! 2. **Incremental Recomputation**
//!    - Every mutable object carries a version token
//!    - Computes compare tokens instead of data and skip work that is
//!      already up to date
//!
//! # Quick Start
//!
//! ```rust
//! use cdft_rs::prelude::*;
//!
//! # fn main() -> cdft_rs::error::Result<()> {
//! // 1. Discretize the domain and set the initial densities
//! let mesh = Mesh::new(10.0, 100)?;
//! let mut state = State::new(mesh, &["colloid"]);
//! state.field_mut("colloid")?.owned_mut().fill(0.3);
//!
//! // 2. Assemble the grand potential (pure ideal gas here)
//! let mut grand = GrandPotential::new();
//!
//! // 3. Diffusive dynamics under forward Euler
//! let mut flux = DiffusiveFlux::new();
//! flux.set_diffusivity("colloid", 1.0);
//! let mut integrator = ExplicitEulerIntegrator::new(1e-3)?;
//! integrator.advance(&mut grand, &mut flux, &mut state, 1.0)?;
//!
//! // 4. Inspect the result
//! println!("count = {}", state.integrate_density("colloid")?);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`tracking`]: version tokens and dependency snapshots
//! - [`state`]: mesh, fields, species data, and simulation time
//! - [`functional`]: free-energy functionals and the grand potential
//! - [`flux`]: face-centered density currents
//! - [`solver`]: time integrators and the Picard equilibrium solve
//! - [`error`]: the crate-wide error type

// Core modules
pub mod error;
pub mod tracking;

pub mod flux;
pub mod functional;
pub mod solver;
pub mod state;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //!
    //! use cdft_rs::prelude::*;
    //! ```
    pub use crate::error::{Error, Result};
    pub use crate::flux::{CompositeFlux, DiffusiveFlux, Flux};
    pub use crate::functional::{
        CompositeFunctional, Constraint, Functional, GrandPotential, IdealGasFunctional,
    };
    pub use crate::solver::{
        AdaptiveTimestep, CrankNicolsonIntegrator, ExplicitEulerIntegrator, FixedPointParams,
        ImplicitEulerIntegrator, Integrator, NegativeDensityPolicy, PicardIteration,
    };
    pub use crate::state::{
        Communicator, Field, Mesh, SpeciesMap, SpeciesProperties, State,
    };
}
