//! Annealing solvers over a [`CouplingModel`].
//!
//! Both variants take the same model and return the same spin vector:
//! - `sbm`: simulated bifurcation (continuous position/momentum dynamics)
//! - `sqa`: simulated quantum annealing (Trotter-replica Monte Carlo)
//! - `rng`: the minimal-standard generator the replica sampler draws from

mod rng;
mod sbm;
mod sqa;

pub use rng::MinStdRng;
pub use sbm::SbmAnnealer;
pub use sqa::SqaAnnealer;

use crate::config::{Config, ConfigError, SolverKind};
use crate::model::{CouplingModel, Encoding};
use serde::Serialize;
use thiserror::Error;

/// Annealer construction failures.
#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("invalid annealer settings: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    /// One entry per physical bit; the last is the ancilla
    pub spins: Vec<bool>,
    /// Ising energy of `spins`
    pub energy: f32,
    /// Step or iteration at which `spins` was reached
    pub step: usize,
    /// Whether the ancilla came out down and the edge spins were complemented
    pub ancilla_flipped: bool,
}

impl Solution {
    /// Edge spins only.
    pub fn edge_spins(&self) -> &[bool] {
        &self.spins[..self.spins.len().saturating_sub(1)]
    }

    pub fn active_edges(&self) -> Vec<usize> {
        self.edge_spins()
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }
}

/// A solver that turns the current model into a spin assignment.
///
/// Implementations run a fixed budget of work and never suspend.
#[cfg_attr(test, mockall::automock)]
pub trait Annealer: Send {
    /// Run one full anneal on the model as it stands.
    fn solve(&mut self, model: &CouplingModel) -> Solution;

    /// Price encoding this solver reads from the model.
    fn encoding(&self) -> Encoding;

    fn name(&self) -> &'static str;
}

/// Build the annealer selected by configuration.
pub fn build_annealer(config: &Config) -> Result<Box<dyn Annealer>, SolverError> {
    let annealer: Box<dyn Annealer> = match config.solver.kind {
        SolverKind::Sbm => Box::new(SbmAnnealer::new(config.sbm.clone())?),
        SolverKind::Sqa => Box::new(SqaAnnealer::new(config.sqa.clone())?),
    };
    Ok(annealer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_annealer_by_kind() {
        let mut config = Config::default();
        let sbm = build_annealer(&config).unwrap();
        assert_eq!(sbm.name(), "sbm");
        assert_eq!(sbm.encoding(), Encoding::Ancilla);

        config.solver.kind = SolverKind::Sqa;
        let sqa = build_annealer(&config).unwrap();
        assert_eq!(sqa.name(), "sqa");
        assert_eq!(sqa.encoding(), Encoding::Field);
    }

    #[test]
    fn test_build_annealer_checks_selected_section() {
        let mut config = Config::default();
        config.solver.kind = SolverKind::Sqa;
        config.sqa.output_replica = 9;
        assert_eq!(
            build_annealer(&config).err(),
            Some(SolverError::InvalidConfig(ConfigError::OutputReplicaOutOfRange {
                replica: 9,
                trotters: 4
            }))
        );

        // the other section is not consulted
        config.solver.kind = SolverKind::Sbm;
        assert!(build_annealer(&config).is_ok());
    }

    #[test]
    fn test_active_edges_skip_ancilla() {
        let solution = Solution {
            spins: vec![true, false, true, true],
            energy: 0.0,
            step: 0,
            ancilla_flipped: false,
        };
        assert_eq!(solution.active_edges(), vec![0, 2]);
    }
}
