//! Time integration
//!
//! The [`Integrator`] trait factors a time-stepping scheme into the one
//! piece that differs between methods, [`step`](Integrator::step), which
//! advances the densities by a single signed timestep, and a shared
//! [`advance`](Integrator::advance) loop that covers an arbitrary interval
//! in capped steps and optionally adapts the timestep.
//!
//! # Adaptive control
//!
//! Adaptive control estimates the local error by step doubling: one step of
//! `2*dt` on a scratch copy is compared against two steps of `dt` on the
//! real state. When the largest per-cell difference is within tolerance the
//! doubled interval is kept and the timestep grows by the usual power-law
//! factor `safety * (tol/err)^(1/p)` (capped at 2x); otherwise the state is
//! rolled back, the timestep shrinks by the same law (floored at 0.1x), and
//! the interval is retried. A timestep driven below the configured minimum
//! is a hard error. Trials only run once `delay` plain steps have passed
//! since the last one, and never on the tail of the interval where a
//! doubled step would not fit.

use crate::error::{Error, Result};
use crate::flux::Flux;
use crate::functional::GrandPotential;
use crate::state::{Field, Mesh, State};

/// Step-size factor applied on top of the power-law estimate.
const SAFETY: f64 = 0.9;
/// Largest single-trial shrink of the timestep.
const MIN_SHRINK: f64 = 0.1;
/// Largest single-trial growth of the timestep.
const MAX_GROWTH: f64 = 2.0;

/// Rate of change of each cell under a face-centered flux,
/// `(j(idx) - j(idx+1)) / step`, wrapping the last face periodically.
pub(crate) fn face_divergence(flux: &Field, mesh: &Mesh) -> Vec<f64> {
    let shape = mesh.shape();
    (0..shape)
        .map(|idx| {
            let right = if idx + 1 == shape {
                flux.get(0)
            } else {
                flux.get(idx as isize + 1)
            };
            (flux.get(idx as isize) - right) / mesh.step()
        })
        .collect()
}

// =================================================================================================
// Adaptive control parameters
// =================================================================================================

/// Parameters of adaptive timestep control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveTimestep {
    /// Largest acceptable per-cell step-doubling error.
    pub tolerance: f64,
    /// Plain steps between consecutive trials.
    pub delay: usize,
    /// Timestep below which control gives up with
    /// [`Error::TimestepUnderflow`].
    pub minimum: f64,
}

// =================================================================================================
// Core
// =================================================================================================

/// Timestep state shared by every integrator.
#[derive(Debug, Clone)]
pub struct IntegratorCore {
    timestep: f64,
    adaptive: Option<AdaptiveTimestep>,
    steps_since_trial: usize,
}

impl IntegratorCore {
    /// Create a core with a validated positive timestep.
    pub fn new(timestep: f64) -> Result<Self> {
        if !(timestep > 0.0 && timestep.is_finite()) {
            return Err(Error::InvalidTimestep(timestep));
        }
        Ok(Self {
            timestep,
            adaptive: None,
            steps_since_trial: 0,
        })
    }
}

// =================================================================================================
// Trait
// =================================================================================================

/// A time-stepping scheme for the density conservation law.
pub trait Integrator {
    fn core(&self) -> &IntegratorCore;

    fn core_mut(&mut self) -> &mut IntegratorCore;

    /// Convergence order of the scheme, used by the adaptive power law.
    fn order(&self) -> usize;

    /// Hook run once at the start of [`advance`](Integrator::advance);
    /// implicit schemes match their history buffers to the state here.
    fn prepare(&mut self, grand: &mut GrandPotential, state: &mut State) -> Result<()> {
        let _ = (grand, state);
        Ok(())
    }

    /// Advance the state by exactly one signed `timestep`. Must be
    /// self-contained: a step on a scratch state must not disturb a later
    /// step on another state.
    fn step(
        &mut self,
        grand: &mut GrandPotential,
        flux: &mut dyn Flux,
        state: &mut State,
        timestep: f64,
    ) -> Result<()>;

    /// Current timestep magnitude. Adaptive control updates this.
    fn timestep(&self) -> f64 {
        self.core().timestep
    }

    /// Replace the timestep; must be positive and finite.
    fn set_timestep(&mut self, timestep: f64) -> Result<()> {
        if !(timestep > 0.0 && timestep.is_finite()) {
            return Err(Error::InvalidTimestep(timestep));
        }
        self.core_mut().timestep = timestep;
        Ok(())
    }

    fn adaptive(&self) -> Option<AdaptiveTimestep> {
        self.core().adaptive
    }

    /// Enable or disable adaptive timestep control.
    fn set_adaptive(&mut self, control: Option<AdaptiveTimestep>) {
        let core = self.core_mut();
        core.adaptive = control;
        core.steps_since_trial = 0;
    }

    /// Advance the state over a signed interval `time`, stepping by at most
    /// the current timestep and landing exactly on the far end.
    fn advance(
        &mut self,
        grand: &mut GrandPotential,
        flux: &mut dyn Flux,
        state: &mut State,
        time: f64,
    ) -> Result<()> {
        if time == 0.0 {
            return Ok(());
        }
        let sign = if time > 0.0 { 1.0 } else { -1.0 };
        let mut remaining = time.abs();

        self.prepare(grand, state)?;
        while remaining > 0.0 {
            let dt = self.core().timestep.min(remaining);
            if let Some(control) = self.core().adaptive {
                let due = self.core().steps_since_trial >= control.delay;
                if due && 2.0 * dt <= remaining && dt >= self.core().timestep {
                    // step-doubling trial: one 2*dt step on a copy against
                    // two dt steps in place
                    let snapshot = state.clone();
                    let mut coarse = state.clone();
                    self.step(grand, flux, &mut coarse, sign * 2.0 * dt)?;
                    self.step(grand, flux, state, sign * dt)?;
                    self.step(grand, flux, state, sign * dt)?;

                    let mut error: f64 = 0.0;
                    let species: Vec<String> = state.species().to_vec();
                    for s in &species {
                        let fine = state.field(s)?;
                        let big = coarse.field(s)?;
                        for idx in 0..fine.shape() {
                            let diff = (fine.get(idx as isize) - big.get(idx as isize)).abs();
                            error = error.max(diff);
                        }
                    }
                    let error = state.communicator().max(error);

                    self.core_mut().steps_since_trial = 0;
                    let exponent = 1.0 / self.order() as f64;
                    if error <= control.tolerance {
                        remaining -= 2.0 * dt;
                        let growth = if error > 0.0 {
                            (SAFETY * (control.tolerance / error).powf(exponent))
                                .clamp(1.0, MAX_GROWTH)
                        } else {
                            MAX_GROWTH
                        };
                        self.core_mut().timestep = dt * growth;
                    } else {
                        state.assign(&snapshot);
                        let shrink =
                            (SAFETY * (control.tolerance / error).powf(exponent)).max(MIN_SHRINK);
                        let timestep = dt * shrink;
                        if timestep < control.minimum {
                            return Err(Error::TimestepUnderflow {
                                timestep,
                                minimum: control.minimum,
                            });
                        }
                        self.core_mut().timestep = timestep;
                    }
                    continue;
                }
            }
            self.step(grand, flux, state, sign * dt)?;
            remaining -= dt;
            self.core_mut().steps_since_trial += 1;
        }
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
