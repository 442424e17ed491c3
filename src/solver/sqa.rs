//! Simulated quantum annealing over a ring of Trotter replicas.
//!
//! Each replica is a classical copy of the spin system; neighbouring
//! replicas are coupled through `Jperp`, which grows as the transverse field
//! `gamma` decays, pulling the ring toward a common classical state.

use super::{Annealer, MinStdRng, Solution, SolverError};
use crate::config::SqaConfig;
use crate::model::{ising_energy, signed_dot, CouplingModel, Encoding};
use tracing::trace;

pub struct SqaAnnealer {
    config: SqaConfig,
    trotters: Vec<Vec<bool>>,
    rngs: Vec<MinStdRng>,
}

impl SqaAnnealer {
    pub fn new(config: SqaConfig) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(Self {
            config,
            trotters: Vec::new(),
            rngs: Vec::new(),
        })
    }

    pub fn config(&self) -> &SqaConfig {
        &self.config
    }

    /// Replica coupling for the current transverse field.
    pub fn replica_coupling(&self, gamma: f32) -> f32 {
        let t = self.config.temperature;
        let nt = self.config.num_trotters as f32;
        let tanh = (gamma / nt / t).tanh().max(f32::MIN_POSITIVE);
        -0.5 * t * tanh.ln()
    }

    fn reset(&mut self, n: usize) {
        self.trotters = vec![vec![true; n]; self.config.num_trotters];
        self.reseed();
    }

    fn reseed(&mut self) {
        self.rngs = self
            .config
            .replica_seeds()
            .into_iter()
            .map(MinStdRng::new)
            .collect();
    }

    /// Run the schedule, calling `observer(iteration, replicas)` after every
    /// sweep.
    pub fn anneal_with<F>(&mut self, model: &CouplingModel, mut observer: F) -> Solution
    where
        F: FnMut(usize, &[Vec<bool>]),
    {
        let n = model.physical_bits();
        self.reset(n);

        let mut gamma = self.config.gamma_start;
        for iteration in 0..self.config.iterations as usize {
            let jperp = self.replica_coupling(gamma);
            if self.config.reseed_each_sweep && iteration > 0 {
                self.reseed();
            }
            self.sweep(model, jperp);
            observer(iteration, &self.trotters);
            gamma *= self.config.gamma_decay;
        }

        let spins = self.trotters[self.config.output_replica].clone();
        let energy = ising_energy(model, &spins);
        trace!(energy, final_gamma = gamma, "SQA finished");

        Solution {
            spins,
            energy,
            step: self.config.iterations.saturating_sub(1) as usize,
            ancilla_flipped: false,
        }
    }

    /// One Metropolis pass over every (edge spin, replica) pair. The ancilla
    /// stays up.
    fn sweep(&mut self, model: &CouplingModel, jperp: f32) {
        let nt = self.config.num_trotters;
        let beta = 1.0 / self.config.temperature;
        let ring = jperp * nt as f32;
        let field = model.field();
        let edges = model.table().edge_count();

        for i in 0..edges {
            let row = model.row(i);
            for m in 0..nt {
                let mut de = signed_dot(row, &self.trotters[m]);

                let up = self.trotters[(m + nt - 1) % nt][i];
                let down = self.trotters[(m + 1) % nt][i];
                if up == down {
                    de += if up { -ring } else { ring };
                }

                let de2 = 2.0 * de + field[i];
                let u = self.rngs[m].next_uniform();
                let s = if self.trotters[m][i] { 1.0 } else { -1.0 };
                if s * de2 > u.ln() / beta * 0.5 {
                    self.trotters[m][i] = !self.trotters[m][i];
                }
            }
        }
    }
}

impl Annealer for SqaAnnealer {
    fn solve(&mut self, model: &CouplingModel) -> Solution {
        self.anneal_with(model, |_, _| {})
    }

    fn encoding(&self) -> Encoding {
        Encoding::Field
    }

    fn name(&self) -> &'static str {
        "sqa"
    }
}
