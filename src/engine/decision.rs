//! Spin vector decoding and order emission.

use crate::market::{Direction, EdgeTable, OpCode, Order, Tick};
use crate::model::CouplingModel;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Quantity attached to every annealer-sourced order.
pub const ORDER_QUANTITY: u32 = 1;

/// Order decoding failures.
#[derive(Debug, Error, PartialEq)]
pub enum DecisionError {
    /// The 32-bit wire id space has no room for the whole batch.
    #[error("order id sequence exhausted: {needed} ids needed after #{last_id}")]
    IdsExhausted { last_id: u32, needed: u32 },
}

/// Turns resolved spins into orders, numbering them from a shared sequence.
///
/// Clones share the sequence, so ids stay unique across every emitter built
/// from the same root.
#[derive(Debug, Clone, Default)]
pub struct OrderEmitter {
    last_id: Arc<AtomicU32>,
}

impl OrderEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after `last_id` (e.g. the highest id already
    /// journaled).
    pub fn starting_after(last_id: u32) -> Self {
        Self {
            last_id: Arc::new(AtomicU32::new(last_id)),
        }
    }

    pub fn last_id(&self) -> u32 {
        self.last_id.load(Ordering::SeqCst)
    }

    /// Claim `count` consecutive ids and return the first. Ids never wrap;
    /// a batch that would pass `u32::MAX` claims nothing.
    fn reserve(&self, count: u32) -> Result<u32, DecisionError> {
        self.last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(count))
            .map(|last| last + 1)
            .map_err(|last_id| DecisionError::IdsExhausted {
                last_id,
                needed: count,
            })
    }

    /// One order per active edge spin; nothing while any edge is unpriced.
    pub fn decide(
        &self,
        model: &CouplingModel,
        spins: &[bool],
        tick: &Tick,
    ) -> Result<Vec<Order>, DecisionError> {
        if !model.is_fully_populated() {
            return Ok(Vec::new());
        }

        let active: Vec<usize> = spins
            .iter()
            .take(model.table().edge_count())
            .enumerate()
            .filter_map(|(edge, &s)| s.then_some(edge))
            .collect();
        if active.is_empty() {
            return Ok(Vec::new());
        }

        let first = self.reserve(active.len() as u32)?;
        Ok(active
            .into_iter()
            .enumerate()
            .map(|(k, edge)| {
                let direction = Direction::for_edge(edge);
                Order {
                    order_id: first + k as u32,
                    op_code: OpCode::Add,
                    symbol: EdgeTable::symbol_of_edge(edge) as u16,
                    quantity: ORDER_QUANTITY,
                    price: tick.price(direction),
                    direction,
                    timestamp: tick.timestamp,
                }
            })
            .collect())
    }
}

/// Every currency has as many active incoming as outgoing edges.
pub fn check_cycle(spins: &[bool], table: &EdgeTable) -> bool {
    let mut balance = vec![0i32; table.currency_count()];
    for (edge, _) in spins
        .iter()
        .take(table.edge_count())
        .enumerate()
        .filter(|(_, &s)| s)
    {
        let e = table.edge(edge);
        balance[e.from] += 1;
        balance[e.to] -= 1;
    }
    balance.iter().all(|&b| b == 0)
}

/// Summed log-price of active edges is positive.
pub fn check_profitable(spins: &[bool], model: &CouplingModel) -> bool {
    let total: f32 = spins
        .iter()
        .zip(model.logged_prices())
        .filter(|(&s, _)| s)
        .map(|(_, &p)| p)
        .sum();
    total > 0.0
}

/// No edge spin is active.
pub fn check_all_zero(spins: &[bool]) -> bool {
    spins[..spins.len().saturating_sub(1)].iter().all(|&s| !s)
}

/// `USD->JPY JPY->GBP GBP->USD` style listing of active edges.
pub fn describe_edges(spins: &[bool], table: &EdgeTable) -> String {
    spins
        .iter()
        .take(table.edge_count())
        .enumerate()
        .filter(|(_, &s)| s)
        .map(|(edge, _)| table.describe_edge(edge))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Encoding, Penalty};
    use crate::testkit;

    fn tick() -> Tick {
        Tick::new(2, 1.5, 1.6, 99)
    }

    #[test]
    fn test_decide_maps_parity_to_direction() {
        let model = testkit::planted_model(Encoding::Ancilla);
        let emitter = OrderEmitter::new();
        let spins = testkit::spins_with(&[5, 8, 10], 19);

        let orders = emitter.decide(&model, &spins, &tick()).unwrap();
        assert_eq!(orders.len(), 3);

        assert_eq!(orders[0].order_id, 1);
        assert_eq!(orders[0].symbol, 2);
        assert_eq!(orders[0].direction, Direction::Ask);
        assert_eq!(orders[0].price, 1.6);

        assert_eq!(orders[1].symbol, 4);
        assert_eq!(orders[1].direction, Direction::Bid);
        assert_eq!(orders[1].price, 1.5);

        assert_eq!(orders[2].order_id, 3);
        assert_eq!(orders[2].symbol, 5);
        assert!(orders.iter().all(|o| o.quantity == 1 && o.timestamp == 99));
        assert!(orders.iter().all(|o| o.op_code == OpCode::Add));
    }

    #[test]
    fn test_ancilla_never_emits() {
        let model = testkit::planted_model(Encoding::Ancilla);
        let emitter = OrderEmitter::new();
        let orders = emitter
            .decide(&model, &testkit::spins_with(&[], 19), &tick())
            .unwrap();
        assert!(orders.is_empty());
    }

    #[test]
    fn test_no_orders_until_every_edge_priced() {
        let mut model =
            CouplingModel::new(EdgeTable::default_fx(), Encoding::Ancilla, Penalty::default());
        for edge in 0..17 {
            model.update_price(edge, 0.5);
        }
        let emitter = OrderEmitter::new();
        let all_up = vec![true; 19];

        assert!(emitter.decide(&model, &all_up, &tick()).unwrap().is_empty());
        assert_eq!(emitter.last_id(), 0);

        model.update_price(17, 0.5);
        assert_eq!(emitter.decide(&model, &all_up, &tick()).unwrap().len(), 18);
    }

    #[test]
    fn test_ids_shared_between_clones_and_never_reset() {
        let model = testkit::planted_model(Encoding::Field);
        let emitter = OrderEmitter::starting_after(41);
        let clone = emitter.clone();
        let spins = testkit::spins_with(&[0], 19);

        assert_eq!(emitter.decide(&model, &spins, &tick()).unwrap()[0].order_id, 42);
        assert_eq!(clone.decide(&model, &spins, &tick()).unwrap()[0].order_id, 43);
        assert_eq!(emitter.last_id(), 43);
    }

    #[test]
    fn test_ids_never_wrap() {
        let model = testkit::planted_model(Encoding::Field);
        let emitter = OrderEmitter::starting_after(u32::MAX - 2);

        // a batch that does not fit claims nothing
        let cycle = testkit::spins_with(&[5, 8, 10], 19);
        assert_eq!(
            emitter.decide(&model, &cycle, &tick()),
            Err(DecisionError::IdsExhausted {
                last_id: u32::MAX - 2,
                needed: 3
            })
        );
        assert_eq!(emitter.last_id(), u32::MAX - 2);

        let pair = testkit::spins_with(&[8, 9], 19);
        let ids: Vec<u32> = emitter
            .decide(&model, &pair, &tick())
            .unwrap()
            .iter()
            .map(|o| o.order_id)
            .collect();
        assert_eq!(ids, vec![u32::MAX - 1, u32::MAX]);

        assert!(emitter.decide(&model, &testkit::spins_with(&[0], 19), &tick()).is_err());
        assert!(emitter.decide(&model, &testkit::spins_with(&[], 19), &tick()).unwrap().is_empty());
    }

    #[test]
    fn test_check_cycle() {
        let table = EdgeTable::default_fx();
        assert!(check_cycle(&testkit::spins_with(&[5, 8, 10], 19), &table));
        assert!(check_cycle(&testkit::spins_with(&[8, 9], 19), &table));
        assert!(check_cycle(&testkit::spins_with(&[], 19), &table));
        assert!(!check_cycle(&testkit::spins_with(&[5, 8], 19), &table));
    }

    #[test]
    fn test_check_profitable() {
        let model = testkit::planted_model(Encoding::Ancilla);
        assert!(check_profitable(&testkit::spins_with(&[5, 8, 10], 19), &model));
        assert!(!check_profitable(&testkit::spins_with(&[8, 9], 19), &model));
        assert!(!check_profitable(&testkit::spins_with(&[], 19), &model));
    }

    #[test]
    fn test_check_all_zero_ignores_ancilla() {
        assert!(check_all_zero(&testkit::spins_with(&[], 19)));
        assert!(!check_all_zero(&testkit::spins_with(&[3], 19)));
    }

    #[test]
    fn test_describe_edges() {
        let table = EdgeTable::default_fx();
        assert_eq!(
            describe_edges(&testkit::spins_with(&[5, 8, 10], 19), &table),
            "JPY->GBP USD->JPY GBP->USD"
        );
    }
}
