//! Configuration management for the arbitrage annealer.
//!
//! Loads settings from an optional `config` file and `FXA__`-prefixed
//! environment variables, then validates them before anything is built.

use crate::market::{EdgeTable, MarketError, DEFAULT_CURRENCIES, DEFAULT_SYMBOLS};
use crate::model::Penalty;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Currency universe and constraint weights
    #[serde(default)]
    pub model: ModelConfig,
    /// Which annealer runs per tick
    #[serde(default)]
    pub solver: SolverConfig,
    /// Bifurcation annealer schedule
    #[serde(default)]
    pub sbm: SbmConfig,
    /// Replica annealer schedule
    #[serde(default)]
    pub sqa: SqaConfig,
    /// Queue sizing
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Order journal
    #[serde(default)]
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Currency codes, indexed in order
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    /// Traded symbols as `BASE/QUOTE`; symbol `s` owns edges `2s` and `2s+1`
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Flow conservation penalty
    #[serde(default = "default_penalty")]
    pub m1: f32,
    /// At-most-one-source penalty
    #[serde(default = "default_penalty")]
    pub m2: f32,
}

/// Annealer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Sbm,
    Sqa,
}

impl std::str::FromStr for SolverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sbm" => Ok(SolverKind::Sbm),
            "sqa" => Ok(SolverKind::Sqa),
            other => Err(ConfigError::UnknownSolver(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub kind: SolverKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbmConfig {
    /// Integration steps per solve
    #[serde(default = "default_sbm_steps")]
    pub steps: u32,
    /// Integration step size
    #[serde(default = "default_sbm_dt")]
    pub dt: f32,
    /// Coupling scale; derived from the matrix norm on every solve when unset
    #[serde(default)]
    pub c0: Option<f32>,
    /// Momentum every oscillator starts with
    #[serde(default = "default_initial_momentum")]
    pub initial_momentum: f32,
    /// Keep the lowest-energy spin vector seen across steps
    #[serde(default)]
    pub track_best: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqaConfig {
    /// Outer iterations (one sweep each)
    #[serde(default = "default_sqa_iterations")]
    pub iterations: u32,
    /// Initial transverse field strength
    #[serde(default = "default_gamma_start")]
    pub gamma_start: f32,
    /// Multiplier applied to gamma after each iteration
    #[serde(default = "default_gamma_decay")]
    pub gamma_decay: f32,
    /// Monte Carlo temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Replica count in the Trotter ring
    #[serde(default = "default_num_trotters")]
    pub num_trotters: usize,
    /// One seed per replica; defaults to `m + 1`
    #[serde(default)]
    pub seeds: Option<Vec<i32>>,
    /// Replica whose spins are reported
    #[serde(default = "default_output_replica")]
    pub output_replica: usize,
    /// Restart every replica generator from its seed before each sweep
    /// instead of once per solve
    #[serde(default)]
    pub reseed_each_sweep: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bounded inbound tick queue
    #[serde(default = "default_queue_capacity")]
    pub tick_queue_capacity: usize,
    /// Bounded outbound order queue; a full queue blocks emission
    #[serde(default = "default_queue_capacity")]
    pub order_queue_capacity: usize,
    /// Log a status line every N processed ticks (0 = never)
    #[serde(default = "default_status_interval")]
    pub status_interval_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// SQLite file for emitted orders and run summaries
    #[serde(default = "default_journal_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Configuration rejected at load time.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("temperature must be positive and finite, got {0}")]
    InvalidTemperature(f32),
    #[error("sbm.steps must be at least 1")]
    ZeroSteps,
    #[error("sbm.dt must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("sbm.c0 must be positive and finite, got {0}")]
    InvalidC0(f32),
    #[error("sqa.iterations must be at least 1")]
    ZeroIterations,
    #[error("sqa.gamma_start must be positive and finite, got {0}")]
    InvalidGamma(f32),
    #[error("sqa.gamma_decay must be in (0, 1], got {0}")]
    InvalidGammaDecay(f32),
    #[error("sqa.num_trotters must be at least 1")]
    ZeroTrotters,
    #[error("sqa.output_replica {replica} out of range for {trotters} replicas")]
    OutputReplicaOutOfRange { replica: usize, trotters: usize },
    #[error("sqa.seeds has {actual} entries, expected one per replica ({expected})")]
    SeedCount { expected: usize, actual: usize },
    #[error("sqa.seeds[{0}] must be non-zero")]
    ZeroSeed(usize),
    #[error("penalty {name} must be positive and finite, got {value}")]
    InvalidPenalty { name: &'static str, value: f32 },
    #[error("{0} must be at least 1")]
    ZeroQueueCapacity(&'static str),
    #[error("unknown solver '{0}' (expected sbm or sqa)")]
    UnknownSolver(String),
    #[error(transparent)]
    Market(#[from] MarketError),
}

// Default value functions
fn default_currencies() -> Vec<String> {
    DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect()
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_penalty() -> f32 {
    10.0
}

fn default_sbm_steps() -> u32 {
    10
}

fn default_sbm_dt() -> f32 {
    0.5
}

fn default_initial_momentum() -> f32 {
    0.1
}

fn default_sqa_iterations() -> u32 {
    10
}

fn default_gamma_start() -> f32 {
    5.0
}

fn default_gamma_decay() -> f32 {
    0.25
}

fn default_temperature() -> f32 {
    0.05
}

fn default_num_trotters() -> usize {
    4
}

fn default_output_replica() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_status_interval() -> u64 {
    1000
}

fn default_journal_path() -> String {
    "data/orders.db".to_string()
}

fn default_true() -> bool {
    true
}

fn positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .prefix("FXA")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("model.currencies")
                    .with_list_parse_key("model.symbols")
                    .with_list_parse_key("sqa.seeds"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.edge_table()?;

        for (name, value) in [("m1", self.model.m1), ("m2", self.model.m2)] {
            if !positive_finite(value) {
                return Err(ConfigError::InvalidPenalty { name, value });
            }
        }

        self.sbm.validate()?;
        self.sqa.validate()?;

        if self.pipeline.tick_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity("pipeline.tick_queue_capacity"));
        }
        if self.pipeline.order_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity("pipeline.order_queue_capacity"));
        }

        Ok(())
    }

    /// Resolve the configured symbols into the static edge table.
    pub fn edge_table(&self) -> std::result::Result<EdgeTable, ConfigError> {
        Ok(EdgeTable::new(&self.model.currencies, &self.model.symbols)?)
    }

    pub fn penalty(&self) -> Penalty {
        Penalty {
            m1: self.model.m1,
            m2: self.model.m2,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            solver: SolverConfig::default(),
            sbm: SbmConfig::default(),
            sqa: SqaConfig::default(),
            pipeline: PipelineConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            currencies: default_currencies(),
            symbols: default_symbols(),
            m1: default_penalty(),
            m2: default_penalty(),
        }
    }
}

impl Default for SbmConfig {
    fn default() -> Self {
        Self {
            steps: default_sbm_steps(),
            dt: default_sbm_dt(),
            c0: None,
            initial_momentum: default_initial_momentum(),
            track_best: false,
        }
    }
}

impl Default for SqaConfig {
    fn default() -> Self {
        Self {
            iterations: default_sqa_iterations(),
            gamma_start: default_gamma_start(),
            gamma_decay: default_gamma_decay(),
            temperature: default_temperature(),
            num_trotters: default_num_trotters(),
            seeds: None,
            output_replica: default_output_replica(),
            reseed_each_sweep: false,
        }
    }
}

impl SbmConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.steps == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        if !positive_finite(self.dt) {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }
        if let Some(c0) = self.c0 {
            if !positive_finite(c0) {
                return Err(ConfigError::InvalidC0(c0));
            }
        }
        Ok(())
    }
}

impl SqaConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !positive_finite(self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if !positive_finite(self.gamma_start) {
            return Err(ConfigError::InvalidGamma(self.gamma_start));
        }
        if !(self.gamma_decay > 0.0 && self.gamma_decay <= 1.0) {
            return Err(ConfigError::InvalidGammaDecay(self.gamma_decay));
        }
        if self.num_trotters == 0 {
            return Err(ConfigError::ZeroTrotters);
        }
        if self.output_replica >= self.num_trotters {
            return Err(ConfigError::OutputReplicaOutOfRange {
                replica: self.output_replica,
                trotters: self.num_trotters,
            });
        }
        if let Some(seeds) = &self.seeds {
            if seeds.len() != self.num_trotters {
                return Err(ConfigError::SeedCount {
                    expected: self.num_trotters,
                    actual: seeds.len(),
                });
            }
            if let Some(index) = seeds.iter().position(|&s| s == 0) {
                return Err(ConfigError::ZeroSeed(index));
            }
        }
        Ok(())
    }

    /// Per-replica seeds, filling in `m + 1` when none are configured.
    pub fn replica_seeds(&self) -> Vec<i32> {
        match &self.seeds {
            Some(seeds) => seeds.clone(),
            None => (1..=self.num_trotters as i32).collect(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_queue_capacity: default_queue_capacity(),
            order_queue_capacity: default_queue_capacity(),
            status_interval_ticks: default_status_interval(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_journal_path(),
            enabled: default_true(),
        }
    }
}
