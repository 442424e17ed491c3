//! FX Arb Annealer - Main Entry Point
//!
//! Streams ticks through the annealing pipeline, replays tick files against a
//! Bellman-Ford reference, generates synthetic ticks and reports the journal.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fx_arb_annealer::config::{Config, SolverKind};
use fx_arb_annealer::engine::{
    LogSink, OrderEmitter, OrderSink, Pipeline, PipelineReport, PricingEngine, WireSink,
};
use fx_arb_annealer::market::codec::decode_tick;
use fx_arb_annealer::market::data::write_csv;
use fx_arb_annealer::market::{CsvTickLoader, Tick, TickGenerator, TickSource, TICK_WIRE_LEN};
use fx_arb_annealer::persistence::{JournalSink, OrderJournal, RunRecord};
use fx_arb_annealer::replay::ReplayEngine;
use std::io::ErrorKind;
use tokio::io::AsyncReadExt;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// FX Arb Annealer CLI
#[derive(Parser)]
#[command(name = "fx-arb-annealer")]
#[command(version, about = "Ising-model FX arbitrage detection")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream ticks through the pricing pipeline
    Run {
        /// CSV tick file; binary tick records are read from stdin when absent
        #[arg(short, long)]
        data: Option<String>,

        /// Override the configured solver (sbm or sqa)
        #[arg(short, long)]
        solver: Option<String>,

        /// Where orders go
        #[arg(long, value_enum, default_value = "journal")]
        sink: SinkKind,
    },

    /// Replay a tick file and compare against Bellman-Ford
    Replay {
        /// Path to CSV tick file
        #[arg(short, long)]
        data: String,

        /// Override the configured solver (sbm or sqa)
        #[arg(short, long)]
        solver: Option<String>,

        /// First timestamp to replay (epoch millis)
        #[arg(long)]
        start: Option<u64>,

        /// Last timestamp to replay (epoch millis)
        #[arg(long)]
        end: Option<u64>,

        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Generate a synthetic tick file
    Generate {
        /// Output CSV path
        #[arg(short, long)]
        output: String,

        /// Number of full books (one tick per symbol each)
        #[arg(short, long, default_value = "100")]
        books: usize,

        #[arg(long, default_value = "1")]
        seed: i32,

        /// Currency values span 10^-m .. 10^m
        #[arg(long, default_value = "1.0")]
        magnitude: f64,

        #[arg(long, default_value = "0.001")]
        spread: f64,

        #[arg(long, default_value = "0.001")]
        volatility: f64,

        /// Comma-separated edge indices to make profitable, e.g. 5,8,10
        #[arg(long, value_delimiter = ',')]
        plant: Vec<usize>,

        /// Log return of each planted edge over its fair rate (default: a
        /// boost just large enough to beat the spread)
        #[arg(long, allow_hyphen_values = true)]
        plant_return: Option<f64>,

        /// First tick timestamp (epoch millis)
        #[arg(long, default_value = "0")]
        start_ms: u64,
    },

    /// Show journaled orders and recent runs
    Status {
        /// Path to SQLite database (default: journal.path from config)
        #[arg(short, long)]
        db: Option<String>,

        /// List the most recent orders
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum SinkKind {
    /// SQLite journal (falls back to log when the journal is disabled)
    Journal,
    /// Log lines only
    Log,
    /// Binary order records on stdout
    Wire,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    match cli.command {
        Some(Commands::Run { data, solver, sink }) => run(data.as_deref(), solver, sink).await,
        Some(Commands::Replay {
            data,
            solver,
            start,
            end,
            output,
        }) => replay(&data, solver, start, end, output.as_deref()),
        Some(Commands::Generate {
            output,
            books,
            seed,
            magnitude,
            spread,
            volatility,
            plant,
            plant_return,
            start_ms,
        }) => generate(
            &output,
            books,
            seed,
            (magnitude, spread, volatility),
            plant,
            plant_return,
            start_ms,
        ),
        Some(Commands::Status { db, verbose }) => show_status(db, verbose),
        None => run(None, None, SinkKind::Journal).await,
    }
}

/// Initialize logging with file and console output.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    // Hourly rolling file for detailed logs
    let file_appender = tracing_appender::rolling::hourly("logs", "fx-arb-annealer.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(guard));

    // stdout carries order records in wire mode, so console logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fx_arb_annealer=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stderr.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

fn load_config(solver: Option<String>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(kind) = solver {
        config.solver.kind = kind.parse::<SolverKind>()?;
        config.validate().context("Invalid configuration")?;
    }
    Ok(config)
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("📋 [INIT] Configuration:");
    info!(
        "   Currencies: {} | Symbols: {}",
        config.model.currencies.join(","),
        config.model.symbols.len()
    );
    info!("   Penalties: M1={} M2={}", config.model.m1, config.model.m2);
    match config.solver.kind {
        SolverKind::Sbm => info!(
            "   Solver: SBM steps={} dt={} c0={} track_best={}",
            config.sbm.steps,
            config.sbm.dt,
            config
                .sbm
                .c0
                .map_or_else(|| "auto".to_string(), |c| c.to_string()),
            config.sbm.track_best
        ),
        SolverKind::Sqa => info!(
            "   Solver: SQA iterations={} gamma={}x{} T={} trotters={}",
            config.sqa.iterations,
            config.sqa.gamma_start,
            config.sqa.gamma_decay,
            config.sqa.temperature,
            config.sqa.num_trotters
        ),
    }
    info!(
        "   Queues: ticks={} orders={}",
        config.pipeline.tick_queue_capacity, config.pipeline.order_queue_capacity
    );
    if config.journal.enabled {
        info!("   Journal: {}", config.journal.path);
    }
}

/// Run the streaming pipeline until the input is exhausted.
async fn run(data: Option<&str>, solver: Option<String>, sink: SinkKind) -> Result<()> {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!(
        "║       FX Arb Annealer v{} - Streaming Mode               ║",
        env!("CARGO_PKG_VERSION")
    );
    info!("╚════════════════════════════════════════════════════════════╝");

    let config = load_config(solver)?;
    log_config(&config);
    let started_at = Utc::now();

    match sink {
        SinkKind::Journal if config.journal.enabled => {
            let journal = OrderJournal::new(&config.journal.path)?;
            let last_id = journal.last_order_id()?;
            info!("📒 [JOURNAL] Continuing order ids after #{}", last_id);
            let engine = PricingEngine::from_config(&config)?
                .with_emitter(OrderEmitter::starting_after(last_id));

            let report = drive(engine, JournalSink::new(journal), &config, data).await?;
            log_report(&report);
            let status = report.engine.status().snapshot();
            let solver = report.engine.solver_name().to_string();
            report.sink.into_inner()?.record_run(&RunRecord {
                started_at,
                finished_at: Utc::now(),
                mode: "run".to_string(),
                solver,
                status,
            })?;
        }
        SinkKind::Journal | SinkKind::Log => {
            let engine = PricingEngine::from_config(&config)?;
            let report = drive(engine, LogSink::default(), &config, data).await?;
            log_report(&report);
        }
        SinkKind::Wire => {
            let engine = PricingEngine::from_config(&config)?;
            let report = drive(engine, WireSink::new(tokio::io::stdout()), &config, data).await?;
            log_report(&report);
        }
    }

    Ok(())
}

/// Feed every tick into a fresh pipeline and drain it.
async fn drive<S: OrderSink + 'static>(
    engine: PricingEngine,
    sink: S,
    config: &Config,
    data: Option<&str>,
) -> Result<PipelineReport<S>> {
    let pipeline = Pipeline::spawn(engine, sink, &config.pipeline);
    info!("🚀 [INIT] Pipeline started");

    match data {
        Some(path) => {
            let loader = CsvTickLoader::new(path)?;
            info!("📊 [TICK] Streaming {} ticks from {}", loader.len(), path);
            for tick in loader.all() {
                pipeline.send(*tick).await?;
            }
        }
        None => {
            info!("📊 [TICK] Reading binary tick records from stdin");
            let mut stdin = tokio::io::stdin();
            let mut buf = [0u8; TICK_WIRE_LEN];
            loop {
                let read = tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        warn!("🛑 [TICK] Interrupted, draining pipeline");
                        break;
                    }
                    read = stdin.read_exact(&mut buf) => read,
                };
                match read {
                    Ok(_) => pipeline.send(read_tick(&buf)?).await?,
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(e).context("Failed to read tick record"),
                }
            }
        }
    }

    pipeline.shutdown().await
}

fn read_tick(buf: &[u8]) -> Result<Tick> {
    decode_tick(buf).context("Malformed tick record")
}

fn log_report<S>(report: &PipelineReport<S>) {
    let snap = report.engine.status().snapshot();
    info!("📊 [STATUS] Final:");
    info!("   ├─ Ticks:    {} received, {} rejected", snap.ticks_received, snap.ticks_rejected);
    info!("   ├─ Solves:   {} ({} skipped)", snap.solver_runs, snap.solves_skipped);
    info!(
        "   ├─ Cycles:   {} valid, {} profitable",
        snap.valid_cycles, snap.profitable_cycles
    );
    info!("   └─ Orders:   {} forwarded", report.orders_forwarded);
}

/// Replay a tick file synchronously and print the summary.
fn replay(
    data_path: &str,
    solver: Option<String>,
    start: Option<u64>,
    end: Option<u64>,
    output: Option<&str>,
) -> Result<()> {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║              REPLAY MODE                                   ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    let config = load_config(solver)?;
    log_config(&config);

    info!("📊 [REPLAY] Loading data from: {}", data_path);
    let loader = CsvTickLoader::new(data_path)?;
    let Some((data_start, data_end)) = loader.available_range() else {
        anyhow::bail!("No ticks in {}", data_path);
    };
    info!("   Data range: {} to {}", data_start, data_end);
    info!("   Ticks: {}", loader.len());

    let started_at = Utc::now();
    let engine = PricingEngine::from_config(&config)?;
    let mut replay = ReplayEngine::new(loader, engine);
    let result = replay.run_range(start.unwrap_or(data_start), end.unwrap_or(data_end))?;

    println!("\n{}", result.summary());

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path))?;
        info!("📁 [REPLAY] Result saved to: {}", path);
    }

    if config.journal.enabled {
        let journal = OrderJournal::new(&config.journal.path)?;
        journal.record_run(&RunRecord {
            started_at,
            finished_at: Utc::now(),
            mode: "replay".to_string(),
            solver: result.solver.clone(),
            status: result.status.clone(),
        })?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn generate(
    output: &str,
    books: usize,
    seed: i32,
    (magnitude, spread, volatility): (f64, f64, f64),
    plant: Vec<usize>,
    plant_return: Option<f64>,
    start_ms: u64,
) -> Result<()> {
    let config = Config::load()?;
    let table = config.edge_table()?;
    if let Some(&bad) = plant.iter().find(|&&e| e >= table.edge_count()) {
        anyhow::bail!("Edge {} out of range ({} edges)", bad, table.edge_count());
    }

    let mut generator = TickGenerator::new(table, seed, magnitude)
        .with_spread(spread)
        .with_volatility(volatility)
        .starting_at(start_ms, 100);
    if !plant.is_empty() {
        info!("🎯 [INIT] Planting cycle on edges {:?}", plant);
        generator = generator.with_planted_cycle(plant);
    }
    if let Some(log_return) = plant_return {
        generator = generator.with_planted_return(log_return);
    }

    let ticks = generator.generate(books);
    write_csv(output, &ticks)?;
    info!("📁 Wrote {} ticks ({} books) to {}", ticks.len(), books, output);
    Ok(())
}

/// Show journal contents.
fn show_status(db: Option<String>, verbose: bool) -> Result<()> {
    use std::path::Path;

    let db_path = match db {
        Some(path) => path,
        None => Config::load()?.journal.path,
    };

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              ORDER JOURNAL STATUS                          ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    if !Path::new(&db_path).exists() {
        println!("\n❌ Database not found: {}", db_path);
        println!("   The pipeline has not been run yet, or the database path is incorrect.");
        return Ok(());
    }

    let journal = OrderJournal::new(&db_path)?;

    println!("\n📈 Orders");
    println!("   ├─ Total Orders:     {}", journal.order_count()?);
    println!("   └─ Last Order Id:    {}", journal.last_order_id()?);

    let runs = journal.recent_runs(5)?;
    if runs.is_empty() {
        println!("\n❌ No runs recorded yet.");
    } else {
        println!("\n🕒 Recent Runs");
        for run in &runs {
            let s = &run.status;
            println!(
                "   ┌─ {} ({}) {}",
                run.mode,
                run.solver,
                run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("   ├─ Ticks:   {} ({} rejected)", s.ticks_received, s.ticks_rejected);
            println!("   ├─ Solves:  {} ({} ancilla flips)", s.solver_runs, s.ancilla_flips);
            println!("   ├─ Cycles:  {} valid, {} profitable", s.valid_cycles, s.profitable_cycles);
            println!("   └─ Orders:  {}", s.orders_emitted);
        }
    }

    if verbose {
        let orders = journal.recent_orders(20)?;
        if !orders.is_empty() {
            println!("\n📤 Recent Orders");
            for o in &orders {
                println!(
                    "   ├─ #{} {} symbol={} qty={} @ {} ts={}",
                    o.order_id, o.direction, o.symbol, o.quantity, o.price, o.timestamp
                );
            }
        }
    }

    Ok(())
}
