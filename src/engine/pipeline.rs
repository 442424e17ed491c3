//! Bounded tick-in / order-out pipeline around a [`PricingEngine`].
//!
//! The engine runs on a blocking worker thread and owns the model for the
//! life of the pipeline. Ticks wait in a bounded queue; orders leave through
//! a second bounded queue, and a full order queue stalls the worker until the
//! sink catches up.

use super::pricing::PricingEngine;
use crate::config::PipelineConfig;
use crate::market::codec::encode_orders;
use crate::market::{Order, Tick};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Downstream consumer of emitted orders.
#[async_trait]
pub trait OrderSink: Send {
    async fn submit(&mut self, orders: &[Order]) -> Result<()>;
}

/// Sink that only logs.
#[derive(Debug, Default)]
pub struct LogSink {
    pub submitted: u64,
}

#[async_trait]
impl OrderSink for LogSink {
    async fn submit(&mut self, orders: &[Order]) -> Result<()> {
        for order in orders {
            info!(
                "📤 [ORDER] #{} {} symbol={} qty={} @ {} ts={}",
                order.order_id,
                order.direction,
                order.symbol,
                order.quantity,
                order.price,
                order.timestamp
            );
        }
        self.submitted += orders.len() as u64;
        Ok(())
    }
}

/// Sink that writes fixed-width order records to a byte stream.
#[derive(Debug)]
pub struct WireSink<W> {
    writer: W,
    pub written: u64,
}

impl<W> WireSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OrderSink for WireSink<W> {
    async fn submit(&mut self, orders: &[Order]) -> Result<()> {
        self.writer
            .write_all(&encode_orders(orders))
            .await
            .context("Failed to write order records")?;
        self.writer.flush().await?;
        self.written += orders.len() as u64;
        Ok(())
    }
}

/// What a drained pipeline hands back.
pub struct PipelineReport<S> {
    pub engine: PricingEngine,
    pub sink: S,
    pub orders_forwarded: u64,
}

/// Running pipeline.
pub struct Pipeline<S> {
    ticks: mpsc::Sender<Tick>,
    worker: JoinHandle<PricingEngine>,
    forwarder: JoinHandle<Result<(S, u64)>>,
}

impl<S: OrderSink + 'static> Pipeline<S> {
    /// Spawn the worker and the order forwarder. Must be called inside a
    /// tokio runtime.
    pub fn spawn(mut engine: PricingEngine, mut sink: S, config: &PipelineConfig) -> Self {
        let (tick_tx, mut tick_rx) = mpsc::channel(config.tick_queue_capacity);
        let (order_tx, mut order_rx) = mpsc::channel::<Order>(config.order_queue_capacity);
        let status_interval = config.status_interval_ticks;

        let worker = tokio::task::spawn_blocking(move || {
            let status = engine.status();
            while let Some(tick) = tick_rx.blocking_recv() {
                match engine.on_tick(&tick) {
                    Ok(outcome) => {
                        for order in outcome.orders {
                            if order_tx.blocking_send(order).is_err() {
                                warn!("⚠️  [ORDER] Order queue closed, stopping worker");
                                return engine;
                            }
                        }
                    }
                    Err(e) => debug!("[TICK] Skipped: {}", e),
                }

                let seen = status.snapshot().ticks_received;
                if status_interval > 0 && seen % status_interval == 0 {
                    let snap = status.snapshot();
                    info!(
                        "📊 [STATUS] ticks={} solves={} cycles={} orders={} rejected={}",
                        snap.ticks_received,
                        snap.solver_runs,
                        snap.valid_cycles,
                        snap.orders_emitted,
                        snap.ticks_rejected
                    );
                }
            }
            engine
        });

        let forwarder = tokio::spawn(async move {
            let mut forwarded = 0u64;
            let mut batch = Vec::new();
            while let Some(order) = order_rx.recv().await {
                batch.push(order);
                while let Ok(more) = order_rx.try_recv() {
                    batch.push(more);
                }
                sink.submit(&batch).await.context("Order sink rejected batch")?;
                forwarded += batch.len() as u64;
                batch.clear();
            }
            Ok((sink, forwarded))
        });

        Self {
            ticks: tick_tx,
            worker,
            forwarder,
        }
    }

    /// Enqueue a tick, waiting while the queue is full.
    pub async fn send(&self, tick: Tick) -> Result<()> {
        self.ticks
            .send(tick)
            .await
            .context("Pricing worker has stopped")
    }

    /// A sender for producers running elsewhere.
    pub fn sender(&self) -> mpsc::Sender<Tick> {
        self.ticks.clone()
    }

    /// Close the tick queue, let queued ticks and orders drain, and return
    /// the engine and sink.
    pub async fn shutdown(self) -> Result<PipelineReport<S>> {
        drop(self.ticks);
        let engine = self.worker.await.context("Pricing worker panicked")?;
        let (sink, orders_forwarded) = self
            .forwarder
            .await
            .context("Order forwarder panicked")??;
        Ok(PipelineReport {
            engine,
            sink,
            orders_forwarded,
        })
    }
}
