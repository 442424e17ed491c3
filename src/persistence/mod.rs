//! SQLite order journal.
//!
//! Persists what the engine emitted so numbering survives restarts:
//! - Every order sent downstream
//! - One summary row per run (mode, solver, final status counters)

use crate::engine::{OrderSink, StatusSnapshot};
use crate::market::{Direction, OpCode, Order};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `run` or `replay`
    pub mode: String,
    pub solver: String,
    pub status: StatusSnapshot,
}

/// SQLite-backed order journal.
pub struct OrderJournal {
    conn: Connection,
}

impl OrderJournal {
    /// Open (or create) the journal at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create journal directory {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        let journal = Self { conn };
        journal.init_schema()?;

        info!("📒 [JOURNAL] Order journal opened at {:?}", path);
        Ok(journal)
    }

    /// Journal that lives only as long as the process.
    pub fn in_memory() -> Result<Self> {
        let journal = Self {
            conn: Connection::open_in_memory().context("Failed to open in-memory database")?,
        };
        journal.init_schema()?;
        Ok(journal)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- Emitted orders
            CREATE TABLE IF NOT EXISTS orders (
                order_id INTEGER PRIMARY KEY,
                op_code TEXT NOT NULL,
                symbol INTEGER NOT NULL,
                quantity INTEGER NOT NULL,
                price REAL NOT NULL,
                direction TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_timestamp ON orders(timestamp);
            CREATE INDEX IF NOT EXISTS idx_orders_symbol ON orders(symbol);

            -- Run summaries
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                mode TEXT NOT NULL,
                solver TEXT NOT NULL,
                status TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Append orders in one transaction. Returns the number written.
    pub fn record_orders(&self, orders: &[Order]) -> Result<usize> {
        if orders.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let recorded_at = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO orders (order_id, op_code, symbol, quantity, price, direction,
                                    timestamp, recorded_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for order in orders {
                stmt.execute(params![
                    order.order_id,
                    order.op_code.as_str(),
                    order.symbol,
                    order.quantity,
                    order.price as f64,
                    order.direction.as_str(),
                    order.timestamp as i64,
                    recorded_at,
                ])
                .with_context(|| format!("Failed to journal order #{}", order.order_id))?;
            }
        }
        tx.commit()?;

        debug!(count = orders.len(), "Orders journaled");
        Ok(orders.len())
    }

    /// Highest journaled order id, 0 when empty.
    pub fn last_order_id(&self) -> Result<u32> {
        let last: Option<u32> = self
            .conn
            .query_row("SELECT MAX(order_id) FROM orders", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(last.unwrap_or(0))
    }

    pub fn order_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Latest `limit` orders, oldest first.
    pub fn recent_orders(&self, limit: usize) -> Result<Vec<Order>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT order_id, op_code, symbol, quantity, price, direction, timestamp
            FROM orders ORDER BY order_id DESC LIMIT ?1
            "#,
        )?;

        let mut orders = stmt
            .query_map([limit as i64], |row| {
                let op: String = row.get(1)?;
                let side: String = row.get(5)?;
                let price: f64 = row.get(4)?;
                let timestamp: i64 = row.get(6)?;
                Ok(Order {
                    order_id: row.get(0)?,
                    op_code: op.parse::<OpCode>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                    })?,
                    symbol: row.get(2)?,
                    quantity: row.get(3)?,
                    price: price as f32,
                    direction: side.parse::<Direction>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                    })?,
                    timestamp: timestamp as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        orders.reverse();
        Ok(orders)
    }

    /// Store a run summary; the status counters go in as JSON.
    pub fn record_run(&self, run: &RunRecord) -> Result<i64> {
        let status = serde_json::to_string(&run.status).context("Failed to encode run status")?;
        self.conn.execute(
            r#"
            INSERT INTO runs (started_at, finished_at, mode, solver, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                run.mode,
                run.solver,
                status,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(
            "📒 [JOURNAL] Run #{} recorded ({} {}, {} orders)",
            id, run.mode, run.solver, run.status.orders_emitted
        );
        Ok(id)
    }

    /// Latest `limit` run summaries, newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT started_at, finished_at, mode, solver, status
            FROM runs ORDER BY id DESC LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(started, finished, mode, solver, status)| {
                Ok(RunRecord {
                    started_at: parse_time(&started)?,
                    finished_at: parse_time(&finished)?,
                    mode,
                    solver,
                    status: serde_json::from_str(&status)
                        .context("Failed to decode run status")?,
                })
            })
            .collect()
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid journal timestamp: {}", raw))?
        .with_timezone(&Utc))
}

/// Order sink that writes each batch to the journal on the blocking pool.
pub struct JournalSink {
    journal: Arc<Mutex<OrderJournal>>,
}

impl JournalSink {
    pub fn new(journal: OrderJournal) -> Self {
        Self {
            journal: Arc::new(Mutex::new(journal)),
        }
    }

    /// Take the journal back once no write is in flight.
    pub fn into_inner(self) -> Result<OrderJournal> {
        Arc::try_unwrap(self.journal)
            .map_err(|_| anyhow!("Order journal still has a pending write"))?
            .into_inner()
            .map_err(|_| anyhow!("Order journal lock poisoned"))
    }
}

#[async_trait]
impl OrderSink for JournalSink {
    async fn submit(&mut self, orders: &[Order]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }

        let journal = Arc::clone(&self.journal);
        let batch = orders.to_vec();
        tokio::task::spawn_blocking(move || {
            let journal = journal
                .lock()
                .map_err(|_| anyhow!("Order journal lock poisoned"))?;
            journal.record_orders(&batch)
        })
        .await
        .context("Journal write task failed")??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u32, direction: Direction) -> Order {
        Order {
            order_id: id,
            op_code: OpCode::Add,
            symbol: 4,
            quantity: 1,
            price: 151.25,
            direction,
            timestamp: 1_700_000_000_000 + id as u64,
        }
    }

    #[test]
    fn test_orders_round_trip() {
        let journal = OrderJournal::in_memory().unwrap();
        assert_eq!(journal.last_order_id().unwrap(), 0);

        let orders = vec![order(1, Direction::Bid), order(2, Direction::Ask), order(3, Direction::Bid)];
        assert_eq!(journal.record_orders(&orders).unwrap(), 3);
        assert_eq!(journal.record_orders(&[]).unwrap(), 0);

        assert_eq!(journal.order_count().unwrap(), 3);
        assert_eq!(journal.last_order_id().unwrap(), 3);
        assert_eq!(journal.recent_orders(10).unwrap(), orders);
        assert_eq!(journal.recent_orders(2).unwrap(), orders[1..].to_vec());
    }

    #[test]
    fn test_duplicate_id_rolls_back_batch() {
        let journal = OrderJournal::in_memory().unwrap();
        journal.record_orders(&[order(1, Direction::Bid)]).unwrap();

        let err = journal.record_orders(&[order(2, Direction::Bid), order(1, Direction::Ask)]);
        assert!(err.is_err());
        assert_eq!(journal.order_count().unwrap(), 1);
    }

    #[test]
    fn test_runs_round_trip() {
        let journal = OrderJournal::in_memory().unwrap();
        let status = StatusSnapshot {
            ticks_received: 90,
            orders_emitted: 6,
            last_energy: -212.5,
            ..Default::default()
        };
        let started = DateTime::parse_from_rfc3339("2026-01-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let run = RunRecord {
            started_at: started,
            finished_at: started + chrono::Duration::seconds(3),
            mode: "replay".to_string(),
            solver: "sqa".to_string(),
            status,
        };

        journal.record_run(&run).unwrap();
        let runs = journal.recent_runs(5).unwrap();
        assert_eq!(runs, vec![run]);
    }

    #[test]
    fn test_reopen_keeps_numbering() {
        let path = std::env::temp_dir().join(format!("fxa-journal-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let journal = OrderJournal::new(&path).unwrap();
            journal
                .record_orders(&[order(7, Direction::Ask), order(8, Direction::Bid)])
                .unwrap();
        }
        let journal = OrderJournal::new(&path).unwrap();
        assert_eq!(journal.last_order_id().unwrap(), 8);
        drop(journal);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_journal_sink_writes_off_runtime() {
        let mut sink = JournalSink::new(OrderJournal::in_memory().unwrap());
        sink.submit(&[order(1, Direction::Bid), order(2, Direction::Ask)])
            .await
            .unwrap();
        sink.submit(&[]).await.unwrap();

        let journal = sink.into_inner().unwrap();
        assert_eq!(journal.order_count().unwrap(), 2);
        assert_eq!(journal.last_order_id().unwrap(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_journal_sink_reports_rejected_batch() {
        let mut sink = JournalSink::new(OrderJournal::in_memory().unwrap());
        sink.submit(&[order(1, Direction::Bid)]).await.unwrap();

        let err = sink.submit(&[order(1, Direction::Ask)]).await.unwrap_err();
        assert!(format!("{err:#}").contains("order #1"));
        assert_eq!(sink.into_inner().unwrap().order_count().unwrap(), 1);
    }
}
