//! Error types
//!
//! All fallible operations in the crate return [`Result`] with a single
//! [`Error`] enum, so callers can distinguish the failure classes the
//! simulation produces:
//!
//! - **Configuration errors** (`InvalidTimestep`, `InvalidMixParameter`,
//!   `InvalidMaxIterations`, `InvalidTolerance`, `InvalidMesh`,
//!   `UnknownSpecies`) are raised at the point of setting the invalid value,
//!   before any computation uses it.
//! - **Numerical domain errors** (`InfinitePotentialFlux`, `PotentialSink`,
//!   `NegativeDensity`) surface conditions that would otherwise propagate
//!   silently as `NaN`/`Inf`.
//! - **Usage errors** (`NotComputed`, `MissingConstraint`,
//!   `UnsupportedConstraint`) mark calls made out of order or with an
//!   incompatible setup.
//! - **Fatal numerical failures** (`TimestepUnderflow`) mean the run cannot
//!   proceed.
//!
//! Convergence of the iterative solvers is NOT an error: the Picard solver
//! and the implicit schemes report convergence through boolean status, since
//! non-convergence is an expected, recoverable outcome.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Simulation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A species name was looked up that the map does not contain.
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),

    /// A non-positive timestep was configured.
    #[error("timestep must be positive, got {0}")]
    InvalidTimestep(f64),

    /// A mix parameter outside (0, 1] was configured.
    #[error("mix parameter must be in (0, 1], got {0}")]
    InvalidMixParameter(f64),

    /// Fewer than one iteration was configured.
    #[error("max iterations must be at least 1, got {0}")]
    InvalidMaxIterations(usize),

    /// A non-positive tolerance was configured.
    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(f64),

    /// A mesh with non-positive length or no cells was requested.
    #[error("mesh must have positive length and at least one cell (length {length}, shape {shape})")]
    InvalidMesh { length: f64, shape: usize },

    /// A value or derivative was requested before `compute` produced one.
    #[error("no computed result available; call compute first")]
    NotComputed,

    /// A solver needed a thermodynamic constraint that was never assigned.
    #[error("species '{0}' has no thermodynamic constraint assigned")]
    MissingConstraint(String),

    /// A flux was used with a constraint kind it cannot conserve.
    #[error("flux requires a fixed-count constraint for species '{0}'")]
    UnsupportedConstraint(String),

    /// Transport was requested across an impenetrable boundary that still
    /// holds density.
    #[error("species '{species}' has positive density in cell {cell} where the external potential is +inf")]
    InfinitePotentialFlux { species: String, cell: usize },

    /// An external potential of -inf is a mass sink and is never valid.
    #[error("species '{species}' has an external potential of -inf in cell {cell}")]
    PotentialSink { species: String, cell: usize },

    /// A density excursion below zero exceeded the configured threshold.
    #[error("species '{species}' density {value} in cell {cell} fell below the negative-density threshold")]
    NegativeDensity {
        species: String,
        cell: usize,
        value: f64,
    },

    /// The adaptive controller shrank the trial step below the floor; the
    /// run cannot proceed.
    #[error("adaptive timestep {timestep:e} fell below the configured minimum {minimum:e}")]
    TimestepUnderflow { timestep: f64, minimum: f64 },
}
