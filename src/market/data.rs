//! Tick data loading and synthetic generation for replay.
//!
//! CSV format (header optional, timestamp as epoch millis or RFC 3339):
//! ```csv
//! timestamp,symbol,bid,ask
//! 1700000000000,4,151.25,0.006611
//! 2023-11-14T22:13:20.050Z,6,1.0712,0.9334
//! ```
//! `ask` is the rate for the symbol's reverse (quote to base) edge.

use super::types::{EdgeTable, Tick};
use crate::solver::MinStdRng;
use anyhow::{Context, Result};
use chrono::DateTime;
use std::path::Path;

/// Source of historical ticks.
pub trait TickSource: Send + Sync {
    /// Ticks with `start <= timestamp <= end`, in file order.
    fn load_range(&self, start: u64, end: u64) -> Vec<Tick>;

    /// First and last timestamp available.
    fn available_range(&self) -> Option<(u64, u64)>;

    fn all(&self) -> &[Tick];
}

/// In-memory tick tape loaded from CSV.
#[derive(Debug, Clone, Default)]
pub struct CsvTickLoader {
    ticks: Vec<Tick>,
}

impl CsvTickLoader {
    /// Load ticks from a CSV file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;

        Self::from_csv_content(&content)
    }

    /// Load ticks from CSV content string.
    pub fn from_csv_content(content: &str) -> Result<Self> {
        let mut ticks = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            // Skip header
            if line_num == 0 && line.starts_with("timestamp") {
                continue;
            }

            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let tick = parse_row(line)
                .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
            ticks.push(tick);
        }

        if ticks.is_empty() {
            anyhow::bail!("CSV file contains no data rows");
        }

        Ok(Self { ticks })
    }

    /// Create a loader from in-memory ticks.
    pub fn from_ticks(ticks: Vec<Tick>) -> Self {
        Self { ticks }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl TickSource for CsvTickLoader {
    fn load_range(&self, start: u64, end: u64) -> Vec<Tick> {
        self.ticks
            .iter()
            .filter(|t| t.timestamp >= start && t.timestamp <= end)
            .copied()
            .collect()
    }

    fn available_range(&self) -> Option<(u64, u64)> {
        let first = self.ticks.iter().map(|t| t.timestamp).min()?;
        let last = self.ticks.iter().map(|t| t.timestamp).max()?;
        Some((first, last))
    }

    fn all(&self) -> &[Tick] {
        &self.ticks
    }
}

fn parse_row(line: &str) -> Result<Tick> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        anyhow::bail!(
            "Expected 4 columns (timestamp,symbol,bid,ask), got {}",
            parts.len()
        );
    }

    Ok(Tick {
        timestamp: parse_timestamp(parts[0])?,
        symbol: parts[1]
            .parse()
            .with_context(|| format!("Invalid symbol index: {}", parts[1]))?,
        bid: parts[2]
            .parse()
            .with_context(|| format!("Invalid bid: {}", parts[2]))?,
        ask: parts[3]
            .parse()
            .with_context(|| format!("Invalid ask: {}", parts[3]))?,
    })
}

fn parse_timestamp(raw: &str) -> Result<u64> {
    if let Ok(millis) = raw.parse::<u64>() {
        return Ok(millis);
    }
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp: {}", raw))?;
    u64::try_from(parsed.timestamp_millis())
        .with_context(|| format!("Timestamp before epoch: {}", raw))
}

/// Render ticks in the loader's CSV format.
pub fn ticks_to_csv(ticks: &[Tick]) -> String {
    let mut out = String::from("timestamp,symbol,bid,ask\n");
    for t in ticks {
        out.push_str(&format!("{},{},{},{}\n", t.timestamp, t.symbol, t.bid, t.ask));
    }
    out
}

pub fn write_csv<P: AsRef<Path>>(path: P, ticks: &[Tick]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, ticks_to_csv(ticks))
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))
}

/// Synthetic order-book generator.
///
/// Each currency carries a value `10^U(-magnitude, magnitude)`; the fair rate
/// from `a` to `b` is `value[a] / value[b]`, so any cycle of fair rates
/// multiplies to one. Both sides of every symbol are shaded by `spread`,
/// which makes every cycle lose money. Planted edges are boosted by
/// `(1 - spread)^-1.5`: enough for the planted cycle to pay, not enough for
/// any cycle that only borrows some of its edges. A planted return replaces
/// that boost with an explicit log return over the fair rate.
#[derive(Debug, Clone)]
pub struct TickGenerator {
    table: EdgeTable,
    rng: MinStdRng,
    values: Vec<f64>,
    spread: f64,
    volatility: f64,
    planted: Vec<usize>,
    planted_return: Option<f64>,
    clock: u64,
    interval_ms: u64,
}

impl TickGenerator {
    pub fn new(table: EdgeTable, seed: i32, magnitude: f64) -> Self {
        let mut rng = MinStdRng::new(seed);
        let values = (0..table.currency_count())
            .map(|_| 10f64.powf(rng.next_range(-magnitude, magnitude)))
            .collect();
        Self {
            table,
            rng,
            values,
            spread: 1e-3,
            volatility: 1e-3,
            planted: Vec::new(),
            planted_return: None,
            clock: 0,
            interval_ms: 100,
        }
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }

    /// Per-book random-walk step applied to every currency value.
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// Make the simple cycle through `edges` (and nothing else) profitable.
    pub fn with_planted_cycle(mut self, edges: Vec<usize>) -> Self {
        self.planted = edges;
        self
    }

    /// Quote planted edges at `fair * e^log_return`, spread ignored.
    pub fn with_planted_return(mut self, log_return: f64) -> Self {
        self.planted_return = Some(log_return);
        self
    }

    pub fn starting_at(mut self, clock: u64, interval_ms: u64) -> Self {
        self.clock = clock;
        self.interval_ms = interval_ms;
        self
    }

    /// Quoted rate along `edge` under the current values.
    pub fn edge_rate(&self, edge: usize) -> f64 {
        let e = self.table.edge(edge);
        let fair = self.values[e.from] / self.values[e.to];
        if !self.planted.contains(&edge) {
            return fair * (1.0 - self.spread);
        }
        match self.planted_return {
            Some(log_return) => fair * log_return.exp(),
            None => fair * (1.0 - self.spread) * (1.0 - self.spread).powf(-1.5),
        }
    }

    /// One tick per symbol, then advance the clock and walk the values.
    pub fn next_book(&mut self) -> Vec<Tick> {
        let book = (0..self.table.symbol_count())
            .map(|s| {
                self.clock += self.interval_ms;
                Tick::new(
                    s as u16,
                    self.edge_rate(EdgeTable::bid_edge(s)) as f32,
                    self.edge_rate(EdgeTable::ask_edge(s)) as f32,
                    self.clock,
                )
            })
            .collect();

        for v in self.values.iter_mut() {
            let step = self.rng.next_range(-self.volatility, self.volatility);
            *v *= 1.0 + step;
        }
        book
    }

    /// `books` consecutive books, flattened.
    pub fn generate(&mut self, books: usize) -> Vec<Tick> {
        (0..books).flat_map(|_| self.next_book()).collect()
    }
}
