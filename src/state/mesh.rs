//! 1D Cartesian mesh
//!
//! The minimal concrete discretization the core needs to be executable:
//! a uniform 1D line of `shape` cells spanning `length`, cell centers at
//! `(idx + 1/2) * step`. Densities live at cell centers; fluxes live on the
//! left face of each cell. Richer geometries (spherical meshes, domain
//! decomposition) stay outside the core behind the same accessors.

use crate::error::{Error, Result};
use crate::state::Field;

/// Uniform 1D Cartesian mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    length: f64,
    shape: usize,
    step: f64,
}

impl Mesh {
    /// Create a mesh of `shape` cells spanning `length`.
    pub fn new(length: f64, shape: usize) -> Result<Self> {
        if length <= 0.0 || shape == 0 {
            return Err(Error::InvalidMesh { length, shape });
        }
        Ok(Self {
            length,
            shape,
            step: length / shape as f64,
        })
    }

    /// Total length of the domain.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Number of cells.
    pub fn shape(&self) -> usize {
        self.shape
    }

    /// Cell spacing.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Center coordinate of a cell.
    pub fn coordinate(&self, idx: usize) -> f64 {
        (idx as f64 + 0.5) * self.step
    }

    /// Volume-weighted contribution of one cell value to an integral.
    pub fn integrate(&self, value: f64) -> f64 {
        self.step * value
    }

    /// Finite-difference gradient at the left face of cell `idx`.
    ///
    /// Reads `idx - 1`, so the field needs at least one halo cell when
    /// `idx == 0`.
    #[inline]
    pub fn gradient(&self, field: &Field, idx: isize) -> f64 {
        (field.get(idx) - field.get(idx - 1)) / self.step
    }

    /// Linear interpolation of a cell-centered field onto the left face of
    /// cell `idx`.
    #[inline]
    pub fn interpolate(&self, field: &Field, idx: isize) -> f64 {
        0.5 * (field.get(idx - 1) + field.get(idx))
    }
}
