//! Decoding session
//!
//! Drives a [`ByteSource`] on a fixed poll interval, feeds whatever bytes are
//! available into a [`PacketDecoder`], and hands completed packets to a single
//! emitter task so slow sinks (disk appends) never stall the next poll.
//! Packets reach the sinks strictly in id order.

use crate::core::decoder::{DecoderStats, PacketDecoder};
use crate::core::packet::Packet;
use crate::core::sink::PacketEmitter;
use crate::core::transport::{ByteSource, TransportError, TransportStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Completed packets allowed to wait for the sinks
    pub emit_queue_depth: usize,
    /// Stop after this many packets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_packets: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            emit_queue_depth: 64,
            max_packets: None,
        }
    }
}

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// The byte source failed; the session does not reconnect
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The emitter task panicked
    #[error("Emitter task failed: {0}")]
    Emitter(#[from] tokio::task::JoinError),
}

/// Why a session ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Cancellation token fired
    Cancelled,
    /// Finite source drained
    SourceExhausted,
    /// Configured packet limit reached
    PacketLimit,
}

/// End-of-session report
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Why the session ended
    pub reason: StopReason,
    /// Packets the sinks received
    pub packets_emitted: u64,
    /// Sink calls that failed
    pub sink_failures: u64,
    /// Decoder counters
    pub decoder: DecoderStats,
    /// Source counters
    pub transport: TransportStats,
}

/// Poll-loop driver
pub struct DecoderSession {
    config: SessionConfig,
    cancel: CancellationToken,
}

impl DecoderSession {
    /// Create a session
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops [`DecoderSession::run`] when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until cancelled, the source drains, the packet limit is hit, or
    /// the source fails
    ///
    /// On every exit the source is disconnected, the partial line is dropped
    /// (the in-flight packet is never emitted), and already-completed packets
    /// are delivered and flushed before returning.
    pub async fn run<S>(
        &self,
        source: &mut S,
        decoder: &mut PacketDecoder,
        emitter: PacketEmitter,
    ) -> Result<SessionSummary, SessionError>
    where
        S: ByteSource + ?Sized,
    {
        let (tx, rx) = mpsc::channel::<Arc<Packet>>(self.config.emit_queue_depth.max(1));
        let emit_task = tokio::task::spawn_blocking(move || drain_to_sinks(rx, emitter));

        if !source.is_connected() {
            if let Err(e) = source.connect().await {
                drop(tx);
                let _ = emit_task.await;
                return Err(e.into());
            }
        }
        info!(
            source_type = %source.source_type(),
            source = %source.connection_info(),
            "Waiting for data"
        );

        let outcome = self.poll_loop(source, decoder, &tx).await;

        if let Err(e) = source.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }
        decoder.discard_partial();
        drop(tx);

        let emitter = emit_task.await?;
        let reason = outcome.map_err(|e| {
            error!(error = %e, "Transport fault, stopping");
            e
        })?;

        let summary = SessionSummary {
            reason,
            packets_emitted: emitter.emitted(),
            sink_failures: emitter.failures(),
            decoder: decoder.stats(),
            transport: source.stats(),
        };
        info!(
            reason = ?summary.reason,
            packets = summary.packets_emitted,
            malformed = summary.decoder.malformed,
            "Session finished"
        );
        Ok(summary)
    }

    async fn poll_loop<S>(
        &self,
        source: &mut S,
        decoder: &mut PacketDecoder,
        tx: &mpsc::Sender<Arc<Packet>>,
    ) -> Result<StopReason, TransportError>
    where
        S: ByteSource + ?Sized,
    {
        let mut ticker = tokio::time::interval(Duration::from_millis(
            self.config.poll_interval_ms.max(1),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut forwarded = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(StopReason::Cancelled),
                _ = ticker.tick() => {}
            }

            let remaining = self
                .config
                .max_packets
                .map(|max| usize::try_from(max.saturating_sub(forwarded)).unwrap_or(usize::MAX));
            for packet in poll_step(source, decoder, remaining).await? {
                if tx.send(packet).await.is_err() {
                    // Emitter gone; nothing left to deliver to
                    return Ok(StopReason::Cancelled);
                }
                forwarded += 1;
                if self.config.max_packets.is_some_and(|max| forwarded >= max) {
                    return Ok(StopReason::PacketLimit);
                }
            }

            if source.is_exhausted() {
                debug!("Source exhausted");
                return Ok(StopReason::SourceExhausted);
            }
        }
    }
}

/// One poll: read what is available and decode at most `max_packets`
pub async fn poll_step<S>(
    source: &mut S,
    decoder: &mut PacketDecoder,
    max_packets: Option<usize>,
) -> Result<Vec<Arc<Packet>>, TransportError>
where
    S: ByteSource + ?Sized,
{
    let chunk = source.receive().await?;
    if chunk.is_empty() {
        return Ok(Vec::new());
    }
    Ok(decoder.feed_packets_until(&chunk, max_packets))
}

fn drain_to_sinks(mut rx: mpsc::Receiver<Arc<Packet>>, mut emitter: PacketEmitter) -> PacketEmitter {
    while let Some(packet) = rx.blocking_recv() {
        emitter.emit(&packet);
    }
    emitter.flush();
    emitter
}
