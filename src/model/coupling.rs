//! Incremental Ising model builder.
//!
//! The coupling matrix has two additive parts:
//! - a constraint part, built once, that penalizes edge sets which are not
//!   simple cycles (flow conservation plus at most one outgoing edge per
//!   currency);
//! - a price part, moved by O(1) deltas whenever an edge's log-price changes.
//!
//! Two encodings of the linear price term are supported. `Ancilla` folds it
//! into the row/column of an extra reference spin so the whole model is one
//! quadratic form (used by the bifurcation annealer). `Field` keeps it in an
//! explicit vector `h` (used by the replica annealer).

use crate::market::EdgeTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Ancilla,
    Field,
}

impl Encoding {
    /// Divisor applied to a log-price change.
    fn price_divisor(&self) -> f32 {
        match self {
            Encoding::Ancilla => 4.0,
            Encoding::Field => 2.0,
        }
    }
}

/// Constraint penalty weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    /// Flow conservation weight
    pub m1: f32,
    /// At-most-one-source weight
    pub m2: f32,
}

impl Default for Penalty {
    fn default() -> Self {
        Self { m1: 10.0, m2: 10.0 }
    }
}

/// Signed dot product `Σ_j row[j] * (spins[j] ? 1 : -1)`.
#[inline]
pub fn signed_dot(row: &[f32], spins: &[bool]) -> f32 {
    row.iter()
        .zip(spins)
        .map(|(&w, &s)| if s { w } else { -w })
        .sum()
}

/// Coupling matrix, optional field vector and per-edge log-price cache.
#[derive(Debug, Clone)]
pub struct CouplingModel {
    table: EdgeTable,
    encoding: Encoding,
    penalty: Penalty,
    n: usize,
    coupling: Vec<f32>,
    field: Vec<f32>,
    logged: Vec<f32>,
    populated: Vec<bool>,
    populated_count: usize,
    initialized: bool,
}

impl CouplingModel {
    /// Build a model with its constraint part in place and no prices yet.
    pub fn new(table: EdgeTable, encoding: Encoding, penalty: Penalty) -> Self {
        let n = table.physical_bits();
        let edges = table.edge_count();
        let mut model = Self {
            table,
            encoding,
            penalty,
            n,
            coupling: vec![0.0; n * n],
            field: vec![0.0; n],
            logged: vec![0.0; edges],
            populated: vec![false; edges],
            populated_count: 0,
            initialized: false,
        };
        model.init_constraints();
        model
    }

    /// Add the structural penalty terms. Runs once per model; later calls
    /// are no-ops.
    pub fn init_constraints(&mut self) {
        if self.initialized {
            return;
        }

        let edges = self.table.edge_count();
        let anc = self.table.ancilla();
        let Penalty { m1, m2 } = self.penalty;

        for k in 0..self.table.currency_count() {
            let v1: Vec<f32> = self
                .table
                .edges()
                .iter()
                .map(|e| (e.from == k) as i32 as f32 - (e.to == k) as i32 as f32)
                .collect();
            let v2: Vec<f32> = self
                .table
                .edges()
                .iter()
                .map(|e| (e.from == k) as i32 as f32)
                .collect();

            for i in 0..edges {
                for j in (i + 1)..edges {
                    let pen = v1[i] * v1[j] * m1 / 4.0 + v2[i] * v2[j] * m2 / 4.0;
                    if pen == 0.0 {
                        continue;
                    }
                    self.add_symmetric(i, j, pen);
                    match self.encoding {
                        Encoding::Ancilla => {
                            self.add_symmetric(i, anc, pen);
                            self.add_symmetric(j, anc, pen);
                        }
                        Encoding::Field => {
                            self.field[i] += 2.0 * pen;
                            self.field[j] += 2.0 * pen;
                        }
                    }
                }

                match self.encoding {
                    Encoding::Ancilla => {
                        if v1[i] != 0.0 {
                            self.add_symmetric(i, anc, m1 / 4.0);
                        }
                    }
                    Encoding::Field => {
                        self.field[i] += v1[i] * v1[i] * m1 / 2.0;
                    }
                }
            }
        }

        self.initialized = true;
        debug!(
            encoding = ?self.encoding,
            physical_bits = self.n,
            "Constraint couplings initialized"
        );
    }

    /// Move the price part of `edge` to a new log-price.
    pub fn update_price(&mut self, edge: usize, logged_price: f32) {
        let delta = (self.logged[edge] - logged_price) / self.encoding.price_divisor();
        match self.encoding {
            Encoding::Ancilla => {
                let anc = self.table.ancilla();
                self.add_symmetric(edge, anc, delta);
            }
            Encoding::Field => self.field[edge] += delta,
        }
        self.logged[edge] = logged_price;
        if !self.populated[edge] {
            self.populated[edge] = true;
            self.populated_count += 1;
        }
    }

    fn add_symmetric(&mut self, i: usize, j: usize, value: f32) {
        self.coupling[i * self.n + j] += value;
        self.coupling[j * self.n + i] += value;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// True once every edge has received at least one price.
    pub fn is_fully_populated(&self) -> bool {
        self.populated_count == self.populated.len()
    }

    pub fn populated_count(&self) -> usize {
        self.populated_count
    }

    pub fn logged_price(&self, edge: usize) -> f32 {
        self.logged[edge]
    }

    pub fn logged_prices(&self) -> &[f32] {
        &self.logged
    }

    /// Row-major `physical_bits x physical_bits` matrix.
    pub fn coupling(&self) -> &[f32] {
        &self.coupling
    }

    pub fn at(&self, i: usize, j: usize) -> f32 {
        self.coupling[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.coupling[i * self.n..(i + 1) * self.n]
    }

    /// Linear field. All zeros under the ancilla encoding.
    pub fn field(&self) -> &[f32] {
        &self.field
    }

    pub fn physical_bits(&self) -> usize {
        self.n
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    pub fn table(&self) -> &EdgeTable {
        &self.table
    }

    /// Squared Frobenius norm of the coupling matrix.
    pub fn frobenius_sq(&self) -> f32 {
        self.coupling.iter().map(|w| w * w).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ising_energy;

    fn assert_symmetric_zero_diagonal(model: &CouplingModel) {
        let n = model.physical_bits();
        for i in 0..n {
            assert_eq!(model.at(i, i), 0.0, "diagonal {i}");
            for j in 0..n {
                assert_eq!(model.at(i, j), model.at(j, i), "J[{i}][{j}]");
            }
        }
    }

    fn three_currency_table() -> EdgeTable {
        EdgeTable::new(&["USD", "EUR", "JPY"], &["EUR/USD", "USD/JPY", "EUR/JPY"]).unwrap()
    }

    fn spins(model: &CouplingModel, active: &[usize]) -> Vec<bool> {
        let mut s = vec![false; model.physical_bits()];
        for &i in active {
            s[i] = true;
        }
        s[model.table().ancilla()] = true;
        s
    }

    #[test]
    fn test_constraints_symmetric_with_zero_diagonal() {
        for encoding in [Encoding::Ancilla, Encoding::Field] {
            let model = CouplingModel::new(EdgeTable::default_fx(), encoding, Penalty::default());
            assert_symmetric_zero_diagonal(&model);

            let model = CouplingModel::new(three_currency_table(), encoding, Penalty::default());
            assert_symmetric_zero_diagonal(&model);
        }
    }

    #[test]
    fn test_init_constraints_idempotent() {
        let mut model =
            CouplingModel::new(EdgeTable::default_fx(), Encoding::Ancilla, Penalty::default());
        let before = model.coupling().to_vec();
        model.init_constraints();
        assert_eq!(model.coupling(), &before[..]);
        assert!(model.is_initialized());
    }

    #[test]
    fn test_field_encoding_leaves_ancilla_row_empty() {
        let model = CouplingModel::new(EdgeTable::default_fx(), Encoding::Field, Penalty::default());
        assert!(model.row(18).iter().all(|&w| w == 0.0));
        assert!(model.field().iter().take(18).all(|&h| h > 0.0));
    }

    #[test]
    fn test_simple_cycles_cost_nothing_at_zero_prices() {
        for encoding in [Encoding::Ancilla, Encoding::Field] {
            let model = CouplingModel::new(EdgeTable::default_fx(), encoding, Penalty::default());
            let empty = ising_energy(&model, &spins(&model, &[]));
            let cycle = ising_energy(&model, &spins(&model, &[5, 8, 10]));
            let two_cycle = ising_energy(&model, &spins(&model, &[8, 9]));
            let dangling = ising_energy(&model, &spins(&model, &[8]));
            let fork = ising_energy(&model, &spins(&model, &[5, 8, 10, 11]));

            assert!((empty - cycle).abs() < 1e-3, "{encoding:?}");
            assert!((empty - two_cycle).abs() < 1e-3, "{encoding:?}");
            assert!(dangling > empty + 1.0, "{encoding:?}");
            assert!(fork > empty + 1.0, "{encoding:?}");
        }
    }

    #[test]
    fn test_update_price_applies_delta_ancilla() {
        let mut model =
            CouplingModel::new(EdgeTable::default_fx(), Encoding::Ancilla, Penalty::default());
        let base = model.at(3, 18);

        model.update_price(3, 2.0);
        assert!((model.at(3, 18) - (base - 0.5)).abs() < 1e-6);
        assert_eq!(model.at(3, 18), model.at(18, 3));

        model.update_price(3, 1.0);
        assert!((model.at(3, 18) - (base - 0.25)).abs() < 1e-6);
        assert_eq!(model.logged_price(3), 1.0);
    }

    #[test]
    fn test_update_price_applies_delta_field() {
        let mut model = CouplingModel::new(EdgeTable::default_fx(), Encoding::Field, Penalty::default());
        let base = model.field()[7];
        model.update_price(7, -3.0);
        assert!((model.field()[7] - (base + 1.5)).abs() < 1e-6);
    }

    #[test]
    fn test_population_tracking() {
        let mut model =
            CouplingModel::new(three_currency_table(), Encoding::Ancilla, Penalty::default());
        assert_eq!(model.populated_count(), 0);

        for edge in 0..5 {
            model.update_price(edge, 0.1);
        }
        model.update_price(0, 0.2);
        assert_eq!(model.populated_count(), 5);
        assert!(!model.is_fully_populated());

        model.update_price(5, 0.3);
        assert!(model.is_fully_populated());
    }
}
