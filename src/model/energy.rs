//! Energy evaluation and reference solutions for a coupling model.

use super::coupling::CouplingModel;
use serde::Serialize;

/// Default bifurcation scale used when the model norm is degenerate.
pub const DEFAULT_C0: f32 = 0.033_613;

/// Largest edge count the exhaustive search will enumerate.
pub const MAX_EXACT_EDGES: usize = 24;

/// `sᵀ J s + h·s` with spins mapped to ±1.
pub fn ising_energy(model: &CouplingModel, spins: &[bool]) -> f32 {
    let n = model.physical_bits();
    let field = model.field();
    let mut energy = 0.0f32;
    for i in 0..n {
        let si = if spins[i] { 1.0 } else { -1.0 };
        let mut row_sum = 0.0f32;
        for (j, &w) in model.row(i).iter().enumerate() {
            row_sum += if spins[j] { w } else { -w };
        }
        energy += si * row_sum + field[i] * si;
    }
    energy
}

/// `0.5 * sqrt(n / Σ J²)`, the scale that keeps bifurcation dynamics
/// normalized to the coupling magnitude.
pub fn theoretical_c0(model: &CouplingModel) -> f32 {
    let norm = model.frobenius_sq();
    if norm <= 0.0 || !norm.is_finite() {
        return DEFAULT_C0;
    }
    0.5 * (model.physical_bits() as f32 / norm).sqrt()
}

#[derive(Debug, Clone, Serialize)]
pub struct GroundState {
    pub spins: Vec<bool>,
    pub energy: f32,
}

/// Exhaustive minimum over all edge-spin assignments with the ancilla held
/// up, visited in Gray-code order so each step is a single flip.
///
/// Returns `None` when the table is too large to enumerate.
pub fn exact_ground_state(model: &CouplingModel) -> Option<GroundState> {
    let n = model.physical_bits();
    let edges = model.table().edge_count();
    if edges > MAX_EXACT_EDGES {
        return None;
    }

    let field = model.field();
    let mut spins = vec![-1.0f64; n];
    spins[edges] = 1.0;

    // local[i] = Σ_j J[i][j] s_j
    let mut local: Vec<f64> = (0..n)
        .map(|i| {
            model
                .row(i)
                .iter()
                .zip(&spins)
                .map(|(&w, &s)| w as f64 * s)
                .sum()
        })
        .collect();
    let mut energy: f64 = (0..n)
        .map(|i| spins[i] * local[i] + field[i] as f64 * spins[i])
        .sum();

    let mut best_energy = energy;
    let mut best_code: u64 = 0;

    for step in 1u64..(1u64 << edges) {
        let k = step.trailing_zeros() as usize;
        let s_old = spins[k];
        energy += -4.0 * s_old * local[k] - 2.0 * field[k] as f64 * s_old;
        spins[k] = -s_old;
        for (i, l) in local.iter_mut().enumerate() {
            *l -= 2.0 * model.at(i, k) as f64 * s_old;
        }

        if energy < best_energy {
            best_energy = energy;
            best_code = step ^ (step >> 1);
        }
    }

    let mut best = vec![false; n];
    for (i, slot) in best.iter_mut().enumerate().take(edges) {
        *slot = (best_code >> i) & 1 == 1;
    }
    best[edges] = true;

    Some(GroundState {
        spins: best,
        energy: best_energy as f32,
    })
}
