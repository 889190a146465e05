//! Communicator: halo exchange and collective reductions
//!
//! The distributed-memory model fixes this interface: the only
//! synchronization points a simulation needs are (a) a halo exchange before
//! a stencil computation reads neighbor-owned cells and (b) a global
//! reduction when accumulating a scalar value or convergence flag across
//! processes. This is the single-process implementation: reductions are the
//! identity and the halo exchange wraps the domain periodically, so a
//! serial run behaves exactly like a one-rank distributed run on a periodic
//! domain.

use crate::state::Field;

/// Single-process communicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Communicator;

impl Communicator {
    pub fn new() -> Self {
        Self
    }

    /// Number of participating processes.
    pub fn size(&self) -> usize {
        1
    }

    /// Rank of this process.
    pub fn rank(&self) -> usize {
        0
    }

    /// Global sum reduction.
    pub fn sum(&self, value: f64) -> f64 {
        value
    }

    /// Global minimum reduction.
    pub fn min(&self, value: f64) -> f64 {
        value
    }

    /// Global maximum reduction.
    pub fn max(&self, value: f64) -> f64 {
        value
    }

    /// Global logical-and reduction, used for convergence flags.
    pub fn all(&self, value: bool) -> bool {
        value
    }

    /// Fill a field's halo cells from the periodic images of its owned
    /// cells: the left halo mirrors the right edge and vice versa. Halo
    /// writes do not advance the field's version token.
    pub fn sync(&self, field: &mut Field) {
        let shape = field.shape() as isize;
        let buffer = field.buffer_shape() as isize;
        for k in 0..buffer {
            let left = field.get(shape - 1 - k);
            let right = field.get(k);
            field.write_halo(-1 - k, left);
            field.write_halo(shape + k, right);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_reductions_are_identity() {
        let comm = Communicator::new();
        assert_eq!(comm.size(), 1);
        assert_eq!(comm.sum(3.5), 3.5);
        assert_eq!(comm.min(-1.0), -1.0);
        assert_eq!(comm.max(2.0), 2.0);
        assert!(comm.all(true));
        assert!(!comm.all(false));
    }

    #[test]
    fn test_sync_fills_periodic_halos() {
        let comm = Communicator::new();
        let mut f = Field::with_buffer(4, 2);
        f.owned_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        comm.sync(&mut f);

        assert_eq!(f.get(-1), 4.0);
        assert_eq!(f.get(-2), 3.0);
        assert_eq!(f.get(4), 1.0);
        assert_eq!(f.get(5), 2.0);
    }

    #[test]
    fn test_sync_does_not_advance_token() {
        let comm = Communicator::new();
        let mut f = Field::with_buffer(3, 1);
        f.owned_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        let before = f.token();
        comm.sync(&mut f);
        assert_eq!(before, f.token());
    }
}
