//! Common utilities for integration tests

pub mod mock_functionals;
pub mod test_helpers;

// Re-export commonly used items
#[allow(unused_imports)]
pub use mock_functionals::{ExternalPotential, QuadraticExcess};
#[allow(unused_imports)]
pub use test_helpers::{assert_profile_close, cosine_mode_state, max_profile_error, uniform_state};
