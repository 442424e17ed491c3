//! Currencies, symbols, the directed exchange-edge table and the tick/order
//! records that cross the pricing engine boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default currency universe, indexed 0..4.
pub const DEFAULT_CURRENCIES: [&str; 5] = ["USD", "EUR", "JPY", "GBP", "CHF"];

/// Default traded symbols. Symbol `s` owns edges `2s` and `2s + 1`.
pub const DEFAULT_SYMBOLS: [&str; 9] = [
    "EUR/GBP", "USD/CHF", "GBP/JPY", "EUR/JPY", "USD/JPY", "GBP/USD", "EUR/USD", "EUR/CHF",
    "CHF/JPY",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    #[error("symbol '{0}' is not of the form BASE/QUOTE")]
    MalformedSymbol(String),
    #[error("symbol '{symbol}' references unknown currency '{currency}'")]
    UnknownCurrency { symbol: String, currency: String },
    #[error("symbol '{0}' trades a currency against itself")]
    SelfPair(String),
    #[error("currency '{0}' listed more than once")]
    DuplicateCurrency(String),
    #[error("symbol '{0}' listed more than once")]
    DuplicateSymbol(String),
    #[error("at least two currencies and one symbol are required")]
    Empty,
    #[error("unknown order field value '{0}'")]
    UnknownLabel(String),
}

/// "Sell `from`, buy `to`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeEdge {
    pub from: usize,
    pub to: usize,
}

/// A traded pair, resolved to currency indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolPair {
    pub name: String,
    pub base: usize,
    pub quote: usize,
}

/// Order side. Even edges trade at the bid, odd edges at the ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Bid,
    Ask,
}

impl Direction {
    pub fn for_edge(edge: usize) -> Self {
        if edge % 2 == 1 {
            Direction::Ask
        } else {
            Direction::Bid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bid => "BID",
            Direction::Ask => "ASK",
        }
    }
}

impl FromStr for Direction {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BID" => Ok(Direction::Bid),
            "ASK" => Ok(Direction::Ask),
            _ => Err(MarketError::UnknownLabel(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order operation code. Annealer-sourced orders are always `Add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpCode {
    Add,
}

impl OpCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpCode::Add => "ADD",
        }
    }
}

impl FromStr for OpCode {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADD" => Ok(OpCode::Add),
            _ => Err(MarketError::UnknownLabel(s.to_string())),
        }
    }
}

/// Normalized top-of-book quote for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: u16,
    pub bid: f32,
    pub ask: f32,
    pub timestamp: u64,
}

impl Tick {
    pub fn new(symbol: u16, bid: f32, ask: f32, timestamp: u64) -> Self {
        Self {
            symbol,
            bid,
            ask,
            timestamp,
        }
    }

    pub fn price(&self, direction: Direction) -> f32 {
        match direction {
            Direction::Bid => self.bid,
            Direction::Ask => self.ask,
        }
    }
}

/// Outbound order record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u32,
    pub op_code: OpCode,
    pub symbol: u16,
    pub quantity: u32,
    pub price: f32,
    pub direction: Direction,
    pub timestamp: u64,
}

/// Static mapping between symbols and directed edges.
///
/// Built once from configuration. Edge count is `2 * symbols`; the spin
/// vector carries one extra ancilla slot after the last edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTable {
    currencies: Vec<String>,
    symbols: Vec<SymbolPair>,
    edges: Vec<ExchangeEdge>,
}

impl EdgeTable {
    /// Resolve `BASE/QUOTE` symbol names against the currency list.
    pub fn new<C, S>(currencies: &[C], symbols: &[S]) -> Result<Self, MarketError>
    where
        C: AsRef<str>,
        S: AsRef<str>,
    {
        if currencies.len() < 2 || symbols.is_empty() {
            return Err(MarketError::Empty);
        }

        let mut names: Vec<String> = Vec::with_capacity(currencies.len());
        for currency in currencies {
            let currency = currency.as_ref().trim().to_uppercase();
            if names.contains(&currency) {
                return Err(MarketError::DuplicateCurrency(currency));
            }
            names.push(currency);
        }

        let mut pairs: Vec<SymbolPair> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_uppercase();
            let (base, quote) = symbol
                .split_once('/')
                .ok_or_else(|| MarketError::MalformedSymbol(symbol.clone()))?;
            let lookup = |currency: &str| {
                names
                    .iter()
                    .position(|n| n == currency)
                    .ok_or_else(|| MarketError::UnknownCurrency {
                        symbol: symbol.clone(),
                        currency: currency.to_string(),
                    })
            };
            let base = lookup(base)?;
            let quote = lookup(quote)?;
            if base == quote {
                return Err(MarketError::SelfPair(symbol));
            }
            if pairs.iter().any(|p| p.name == symbol) {
                return Err(MarketError::DuplicateSymbol(symbol));
            }
            pairs.push(SymbolPair {
                name: symbol,
                base,
                quote,
            });
        }

        let edges = pairs
            .iter()
            .flat_map(|p| {
                [
                    ExchangeEdge {
                        from: p.base,
                        to: p.quote,
                    },
                    ExchangeEdge {
                        from: p.quote,
                        to: p.base,
                    },
                ]
            })
            .collect();

        Ok(Self {
            currencies: names,
            symbols: pairs,
            edges,
        })
    }

    /// Five currencies, nine symbols, eighteen edges plus the ancilla.
    pub fn default_fx() -> Self {
        match Self::new(&DEFAULT_CURRENCIES, &DEFAULT_SYMBOLS) {
            Ok(table) => table,
            Err(e) => unreachable!("default edge table is well-formed: {e}"),
        }
    }

    pub fn edges(&self) -> &[ExchangeEdge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> ExchangeEdge {
        self.edges[index]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge spins plus the ancilla.
    pub fn physical_bits(&self) -> usize {
        self.edges.len() + 1
    }

    pub fn ancilla(&self) -> usize {
        self.edges.len()
    }

    pub fn currency_count(&self) -> usize {
        self.currencies.len()
    }

    pub fn currency_name(&self, index: usize) -> &str {
        &self.currencies[index]
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    pub fn symbols(&self) -> &[SymbolPair] {
        &self.symbols
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol(&self, index: usize) -> Option<&SymbolPair> {
        self.symbols.get(index)
    }

    pub fn bid_edge(symbol: usize) -> usize {
        symbol * 2
    }

    pub fn ask_edge(symbol: usize) -> usize {
        symbol * 2 + 1
    }

    pub fn symbol_of_edge(edge: usize) -> usize {
        edge / 2
    }

    /// Human-readable edge label, e.g. `USD->JPY`.
    pub fn describe_edge(&self, index: usize) -> String {
        let e = self.edges[index];
        format!("{}->{}", self.currencies[e.from], self.currencies[e.to])
    }
}

impl Default for EdgeTable {
    fn default() -> Self {
        Self::default_fx()
    }
}
