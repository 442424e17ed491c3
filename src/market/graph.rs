//! Classical negative-cycle search over the exchange graph.
//!
//! Edge weight is `-ln(rate)`, so a cycle whose rates multiply above one has
//! negative total weight. Used as a reference answer when replaying ticks.

use super::types::EdgeTable;

/// Relaxations smaller than this are rounding noise.
const RELAX_EPSILON: f64 = 1e-9;

/// Bellman-Ford from a virtual source joined to every currency.
///
/// Returns the edges of one negative cycle in traversal order, or `None`.
/// `logged` holds `ln(rate)` per edge and must cover every edge of `table`.
pub fn find_negative_cycle(table: &EdgeTable, logged: &[f32]) -> Option<Vec<usize>> {
    let vertices = table.currency_count();
    let edges = table.edges();
    if logged.len() < edges.len() {
        return None;
    }

    let mut dist = vec![0.0f64; vertices];
    let mut pred: Vec<Option<usize>> = vec![None; vertices];
    let mut last_relaxed = None;

    for _ in 0..vertices {
        last_relaxed = None;
        for (index, edge) in edges.iter().enumerate() {
            let weight = -(logged[index] as f64);
            if dist[edge.from] + weight < dist[edge.to] - RELAX_EPSILON {
                dist[edge.to] = dist[edge.from] + weight;
                pred[edge.to] = Some(index);
                last_relaxed = Some(edge.to);
            }
        }
        if last_relaxed.is_none() {
            return None;
        }
    }

    // Walking back V predecessors lands inside the cycle.
    let mut vertex = last_relaxed?;
    for _ in 0..vertices {
        vertex = edges[pred[vertex]?].from;
    }

    let start = vertex;
    let mut cycle = Vec::new();
    loop {
        let index = pred[vertex]?;
        cycle.push(index);
        vertex = edges[index].from;
        if vertex == start || cycle.len() > vertices {
            break;
        }
    }
    cycle.reverse();
    Some(cycle)
}

pub fn has_arbitrage(table: &EdgeTable, logged: &[f32]) -> bool {
    find_negative_cycle(table, logged).is_some()
}

/// Sum of `ln(rate)` along `cycle`.
pub fn cycle_log_return(logged: &[f32], cycle: &[usize]) -> f64 {
    cycle.iter().map(|&e| logged[e] as f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    fn consistent_logged(table: &EdgeTable, values: &[f64], spread: f64) -> Vec<f32> {
        table
            .edges()
            .iter()
            .map(|e| ((values[e.from] / values[e.to]) * (1.0 - spread)).ln() as f32)
            .collect()
    }

    #[test]
    fn test_finds_planted_cycle() {
        let table = EdgeTable::default_fx();
        let logged = testkit::planted_logged_prices();

        let cycle = find_negative_cycle(&table, &logged).unwrap();
        let mut sorted = cycle.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, testkit::PLANTED_CYCLE.to_vec());
        assert!(cycle_log_return(&logged, &cycle) > 0.0);

        // consecutive edges chain head to tail
        for pair in cycle.windows(2) {
            assert_eq!(table.edge(pair[0]).to, table.edge(pair[1]).from);
        }
        let first = table.edge(cycle[0]);
        let last = table.edge(cycle[cycle.len() - 1]);
        assert_eq!(last.to, first.from);
    }

    #[test]
    fn test_consistent_rates_have_no_cycle() {
        let table = EdgeTable::default_fx();
        let values = [1.0, 1.08, 0.0067, 1.27, 1.12];
        assert!(!has_arbitrage(&table, &consistent_logged(&table, &values, 1e-4)));
    }

    #[test]
    fn test_single_mispriced_edge_is_found() {
        let table = EdgeTable::default_fx();
        let mut logged = vec![0.0f32; table.edge_count()];
        // USD/JPY bid 2.0 against otherwise flat rates
        logged[8] = 2.0f32.ln();

        let cycle = find_negative_cycle(&table, &logged).unwrap();
        assert!(cycle.contains(&8));
        assert!((cycle_log_return(&logged, &cycle) - 2.0f64.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_short_price_vector_is_ignored() {
        let table = EdgeTable::default_fx();
        assert!(find_negative_cycle(&table, &[1.0; 3]).is_none());
    }
}
