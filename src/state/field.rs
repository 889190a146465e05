//! Per-species cell array with halo buffer
//!
//! A [`Field`] stores one real value per mesh cell for a single species,
//! padded on both sides by `buffer` halo cells so stencil computations can
//! read neighbor values that (in a distributed run) another process owns.
//! Signed indices address the full range `-buffer .. shape + buffer`; the
//! owned cells are `0 .. shape`.
//!
//! Mutating accessors stage the field's version token; read-only accessors
//! do not. Every field is exclusively owned by the State, Functional, or
//! Flux that allocated it: composition copies into the parent's own
//! buffers, it never aliases.

use nalgebra::DVector;

use crate::tracking::{ObjectId, Token, Tracker};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Real-valued field over mesh cells plus halo padding.
#[derive(Debug)]
pub struct Field {
    data: DVector<f64>,
    shape: usize,
    buffer: usize,
    tracker: Tracker,
}

impl Field {
    /// Create a zero-filled field with no halo.
    pub fn new(shape: usize) -> Self {
        Self::with_buffer(shape, 0)
    }

    /// Create a zero-filled field with `buffer` halo cells on each side.
    pub fn with_buffer(shape: usize, buffer: usize) -> Self {
        Self {
            data: DVector::zeros(shape + 2 * buffer),
            shape,
            buffer,
            tracker: Tracker::new(),
        }
    }

    /// Number of owned (non-halo) cells.
    pub fn shape(&self) -> usize {
        self.shape
    }

    /// Halo width on each side.
    pub fn buffer_shape(&self) -> usize {
        self.buffer
    }

    /// Total storage length including halos.
    pub fn full_shape(&self) -> usize {
        self.shape + 2 * self.buffer
    }

    pub fn id(&self) -> ObjectId {
        self.tracker.id()
    }

    /// Commit any staged mutation and return the stable token.
    pub fn token(&mut self) -> Token {
        self.tracker.token()
    }

    /// Grow the halo to at least `buffer` cells, preserving owned data.
    /// A smaller request leaves the field unchanged.
    pub fn request_buffer(&mut self, buffer: usize) {
        if buffer > self.buffer {
            self.reshape(self.shape, buffer);
        }
    }

    /// Resize to `shape` owned cells and exactly `buffer` halo cells.
    ///
    /// Owned data is preserved when the shape is unchanged; a shape change
    /// zero-fills. Halo contents are always zeroed and must be refreshed by
    /// a sync before the next stencil read.
    pub fn reshape(&mut self, shape: usize, buffer: usize) {
        if shape == self.shape && buffer == self.buffer {
            return;
        }
        let mut data = DVector::zeros(shape + 2 * buffer);
        if shape == self.shape {
            for idx in 0..shape {
                data[buffer + idx] = self.data[self.buffer + idx];
            }
        }
        self.data = data;
        self.shape = shape;
        self.buffer = buffer;
        self.tracker.stage_and_commit();
    }

    #[inline]
    fn offset(&self, idx: isize) -> usize {
        let full = idx + self.buffer as isize;
        debug_assert!(
            full >= 0 && (full as usize) < self.full_shape(),
            "field index {} out of range for shape {} with buffer {}",
            idx,
            self.shape,
            self.buffer
        );
        full as usize
    }

    /// Read a cell. Signed indices reach into the halo.
    #[inline]
    pub fn get(&self, idx: isize) -> f64 {
        self.data[self.offset(idx)]
    }

    /// Write a cell, staging the token. Signed indices reach into the halo.
    #[inline]
    pub fn set(&mut self, idx: isize, value: f64) {
        let at = self.offset(idx);
        self.tracker.stage();
        self.data[at] = value;
    }

    /// Write a halo cell without staging the token.
    ///
    /// Halo contents are derived data refreshed by a sync; rewriting them
    /// does not change the observable owned state, so equal tokens keep
    /// implying byte-identical owned cells.
    ///
    /// # Panics
    ///
    /// Panics in debug builds when `idx` addresses an owned cell.
    #[inline]
    pub(crate) fn write_halo(&mut self, idx: isize, value: f64) {
        debug_assert!(
            idx < 0 || idx >= self.shape as isize,
            "write_halo used on owned cell {}",
            idx
        );
        let at = self.offset(idx);
        self.data[at] = value;
    }

    /// Owned cells as a slice.
    pub fn owned(&self) -> &[f64] {
        &self.data.as_slice()[self.buffer..self.buffer + self.shape]
    }

    /// Owned cells as a mutable slice, staging the token.
    pub fn owned_mut(&mut self) -> &mut [f64] {
        self.tracker.stage();
        let (buffer, shape) = (self.buffer, self.shape);
        &mut self.data.as_mut_slice()[buffer..buffer + shape]
    }

    /// Fill every cell, halos included, staging the token.
    pub fn fill(&mut self, value: f64) {
        self.tracker.stage();
        self.data.fill(value);
    }

    /// Sum of the owned cells.
    pub fn sum(&self) -> f64 {
        self.owned().iter().sum()
    }

    /// Apply `f` to every owned cell in place, staging the token.
    ///
    /// Switches to Rayon above the crate parallel threshold when the
    /// `parallel` feature is enabled (see [`crate::solver::parallel_threshold`]).
    pub fn apply<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        let owned = self.owned_mut();
        #[cfg(feature = "parallel")]
        {
            if owned.len() >= crate::solver::parallel_threshold() {
                owned.par_iter_mut().for_each(|x| *x = f(*x));
                return;
            }
        }
        owned.iter_mut().for_each(|x| *x = f(*x));
    }

    /// Copy all cells, halos included, from a field of identical layout.
    ///
    /// # Panics
    ///
    /// Panics when the layouts differ; callers are expected to have matched
    /// the fields first.
    pub fn copy_from(&mut self, other: &Field) {
        assert_eq!(
            (self.shape, self.buffer),
            (other.shape, other.buffer),
            "cannot copy between fields with different layouts"
        );
        self.tracker.stage();
        self.data.copy_from(&other.data);
    }
}

impl Clone for Field {
    /// A cloned field copies the data but is a new object with fresh
    /// identity.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            shape: self.shape,
            buffer: self.buffer,
            tracker: Tracker::new(),
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
