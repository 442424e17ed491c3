//! Ising model of the arbitrage problem.
//!
//! - `coupling`: incremental coupling matrix with constraint and price parts
//! - `energy`: energy evaluation, exact reference solver and scale helpers

mod coupling;
mod energy;

pub use coupling::{signed_dot, CouplingModel, Encoding, Penalty};
pub use energy::{
    exact_ground_state, ising_energy, theoretical_c0, GroundState, DEFAULT_C0, MAX_EXACT_EDGES,
};
