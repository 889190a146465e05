//! Sum of member functionals
//!
//! A [`CompositeFunctional`] owns a list of member functionals and exposes
//! their sum through the same interface. Members are brought up to date
//! during setup so that their tokens participate in the composite's
//! staleness decision; the evaluation itself only accumulates cached member
//! outputs into the composite's own storage.

use crate::error::Result;
use crate::functional::{Functional, FunctionalCore};
use crate::state::State;
use crate::tracking::Token;

/// Functional that is the sum of its members.
#[derive(Default)]
pub struct CompositeFunctional {
    core: FunctionalCore,
    members: Vec<Box<dyn Functional>>,
}

impl CompositeFunctional {
    pub fn new() -> Self {
        Self {
            core: FunctionalCore::new(),
            members: Vec::new(),
        }
    }

    /// Append a member. The composite owns it exclusively.
    pub fn push(&mut self, member: Box<dyn Functional>) {
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

impl Functional for CompositeFunctional {
    fn core(&self) -> &FunctionalCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FunctionalCore {
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

    fn setup(&mut self, state: &mut State, compute_value: bool) -> Result<()> {
        // forward halo requests before members allocate their storage
        let requests: Vec<(String, usize)> = self
            .core
            .buffer_requests
            .iter()
            .map(|(s, w)| (s.clone(), *w))
            .collect();
        for member in &mut self.members {
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
        for member in &self.members {
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
        self.core.set_value(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functional::IdealGasFunctional;
    use crate::state::{Mesh, State};

    #[test]
    fn test_empty_composite_is_zero() {
        let mut state = State::new(Mesh::new(1.0, 2).unwrap(), &["a"]);
        let mut composite = CompositeFunctional::new();
        composite.compute(&mut state, true).unwrap();
        assert_eq!(composite.value().unwrap(), 0.0);
        assert!(composite
            .derivative("a")
            .unwrap()
            .owned()
            .iter()
            .all(|&d| d == 0.0));
    }

    #[test]
    fn test_sum_of_two_ideal_gases() {
        let mut state = State::new(Mesh::new(2.0, 4).unwrap(), &["a"]);
        state.field_mut("a").unwrap().owned_mut().fill(0.5);

        let mut single = IdealGasFunctional::new();
        single.compute(&mut state, true).unwrap();
        let one = single.value().unwrap();

        let mut composite = CompositeFunctional::new();
        composite.push(Box::new(IdealGasFunctional::new()));
        composite.push(Box::new(IdealGasFunctional::new()));
        composite.compute(&mut state, true).unwrap();

        assert!((composite.value().unwrap() - 2.0 * one).abs() < 1e-12);
        assert!(
            (composite.derivative("a").unwrap().get(0)
                - 2.0 * single.derivative("a").unwrap().get(0))
            .abs()
                < 1e-12
        );
    }

    #[test]
    fn test_member_change_invalidates_composite() {
        let mut state = State::new(Mesh::new(2.0, 4).unwrap(), &["a"]);
        state.field_mut("a").unwrap().owned_mut().fill(0.5);

        let mut composite = CompositeFunctional::new();
        composite.push(Box::new(IdealGasFunctional::new()));
        assert!(composite.compute(&mut state, true).unwrap());
        assert!(!composite.compute(&mut state, true).unwrap());

        state.field_mut("a").unwrap().set(0, 0.25);
        assert!(composite.compute(&mut state, true).unwrap());
    }

    #[test]
    fn test_derivative_halo_request_reaches_members() {
        let mut state = State::new(Mesh::new(2.0, 4).unwrap(), &["a"]);
        state.field_mut("a").unwrap().owned_mut().fill(0.5);

        let mut composite = CompositeFunctional::new();
        composite.push(Box::new(IdealGasFunctional::new()));
        composite.request_derivative_buffer("a", 1);
        composite.compute(&mut state, true).unwrap();

        let derivative = composite.derivative("a").unwrap();
        assert_eq!(derivative.buffer_shape(), 1);
        // periodic halo carries the wrapped value
        assert_eq!(derivative.get(-1), derivative.get(3));
    }
}
