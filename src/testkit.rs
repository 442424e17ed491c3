//! Shared fixtures for unit tests.
//!
//! Both books make USD->JPY->GBP->USD (edges 8, 10, 5) the only profitable
//! cycle on the default five-currency table:
//! - planted: cycle edges at ln 3, every other edge near ln -30;
//! - moderate: cycle edges at ln 1, every other edge at ln -3. Plain
//!   bifurcation settles in a worse basin here.

use crate::market::{EdgeTable, Tick};
use crate::model::{CouplingModel, Encoding, Penalty};

pub const PLANTED_CYCLE: [usize; 3] = [5, 8, 10];

const CYCLE_PRICE: f32 = 20.0;
const OTHER_PRICE: f32 = 1.0e-13;

const MODERATE_CYCLE_LN: f32 = 1.0;
const MODERATE_OTHER_LN: f32 = -3.0;

fn book(cycle: f32, other: f32) -> Vec<f32> {
    (0..18)
        .map(|edge| {
            if PLANTED_CYCLE.contains(&edge) {
                cycle
            } else {
                other
            }
        })
        .collect()
}

fn ticks_for(prices: &[f32]) -> Vec<Tick> {
    (0..9u16)
        .map(|s| {
            let bid = prices[EdgeTable::bid_edge(s as usize)];
            let ask = prices[EdgeTable::ask_edge(s as usize)];
            Tick::new(s, bid, ask, 1_000 + s as u64)
        })
        .collect()
}

fn model_for(encoding: Encoding, logged: Vec<f32>) -> CouplingModel {
    let mut model = CouplingModel::new(EdgeTable::default_fx(), encoding, Penalty::default());
    for (edge, p) in logged.into_iter().enumerate() {
        model.update_price(edge, p);
    }
    model
}

pub fn planted_edge_prices() -> Vec<f32> {
    book(CYCLE_PRICE, OTHER_PRICE)
}

pub fn planted_logged_prices() -> Vec<f32> {
    planted_edge_prices().iter().map(|p| p.ln()).collect()
}

/// One tick per symbol, in symbol order.
pub fn planted_ticks() -> Vec<Tick> {
    ticks_for(&planted_edge_prices())
}

pub fn planted_model(encoding: Encoding) -> CouplingModel {
    model_for(encoding, planted_logged_prices())
}

pub fn moderate_logged_prices() -> Vec<f32> {
    book(MODERATE_CYCLE_LN, MODERATE_OTHER_LN)
}

pub fn moderate_ticks() -> Vec<Tick> {
    let prices: Vec<f32> = moderate_logged_prices().iter().map(|lp| lp.exp()).collect();
    ticks_for(&prices)
}

pub fn moderate_model(encoding: Encoding) -> CouplingModel {
    model_for(encoding, moderate_logged_prices())
}

/// Spin vector with the given edges up and the ancilla up.
pub fn spins_with(active: &[usize], physical_bits: usize) -> Vec<bool> {
    let mut spins = vec![false; physical_bits];
    for &i in active {
        spins[i] = true;
    }
    spins[physical_bits - 1] = true;
    spins
}

/// Indices of active edge spins, ancilla excluded.
pub fn active_edges(spins: &[bool]) -> Vec<usize> {
    spins[..spins.len() - 1]
        .iter()
        .enumerate()
        .filter_map(|(i, &s)| s.then_some(i))
        .collect()
}
