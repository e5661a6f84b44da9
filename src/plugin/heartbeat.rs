//! Client-side heartbeat loop with the bounded-failure give-up policy.
//!
//! One sender runs per registered identity, driven by a fixed-interval
//! timer. A sampling failure skips the tick without counting against the
//! failure budget; a send failure counts, and three consecutive failures
//! terminate the loop permanently. There is no reconnection: after the loop
//! gives up, the host only notices through `last_heartbeat_time` staleness.

use crate::protocol::{now_ts, HeartbeatMessage};
use crate::rpc::TransportError;
use crate::stats::StatsSampler;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Consecutive send failures tolerated before the loop gives up.
pub const MAX_SEND_FAILURES: u32 = 3;

/// Where heartbeat messages go. The production impl wraps the duplex stream
/// to the host; tests substitute a scripted double.
#[async_trait]
pub trait HeartbeatSink: Send {
    async fn send(&mut self, message: HeartbeatMessage) -> Result<(), TransportError>;
}

/// Why a sender loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderExit {
    /// Stopped through its handle.
    Stopped,
    /// Gave up after `MAX_SEND_FAILURES` consecutive send failures.
    GaveUp,
}

/// Owner's handle to a running sender: an explicit stop signal plus a join
/// point, so shutdown does not require tearing down the whole channel.
pub struct HeartbeatHandle {
    stop_tx: mpsc::Sender<()>,
    join: JoinHandle<SenderExit>,
}

impl HeartbeatHandle {
    /// Signals the loop to stop and waits for it to finish.
    pub async fn stop(self) -> SenderExit {
        let _ = self.stop_tx.send(()).await;
        self.join.await.unwrap_or(SenderExit::Stopped)
    }

    /// Waits for the loop to end on its own (give-up or stop).
    pub async fn join(self) -> SenderExit {
        self.join.await.unwrap_or(SenderExit::Stopped)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

pub struct HeartbeatSender;

impl HeartbeatSender {
    /// Spawns the background loop for one identity. The first heartbeat
    /// fires one full interval after the spawn.
    pub fn spawn<S>(
        cookie_key: String,
        sink: S,
        sampler: Arc<dyn StatsSampler>,
        interval: Duration,
    ) -> HeartbeatHandle
    where
        S: HeartbeatSink + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let join = tokio::spawn(run_loop(cookie_key, sink, sampler, interval, stop_rx));
        HeartbeatHandle { stop_tx, join }
    }
}

async fn run_loop<S>(
    cookie_key: String,
    mut sink: S,
    sampler: Arc<dyn StatsSampler>,
    period: Duration,
    mut stop_rx: mpsc::Receiver<()>,
) -> SenderExit
where
    S: HeartbeatSink,
{
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let sample = match sampler.sample_self() {
                    Ok(sample) => sample,
                    Err(e) => {
                        warn!(error = %e, "stats sampling failed; skipping heartbeat tick");
                        continue;
                    }
                };

                let message = HeartbeatMessage {
                    cookie_key: cookie_key.clone(),
                    message: "ping".to_string(),
                    timestamp: now_ts(),
                    memory_usage: sample.memory_bytes,
                    cpu_usage: sample.cpu_percent,
                };

                match sink.send(message).await {
                    Ok(()) => {
                        consecutive_failures = 0;
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        warn!(
                            error = %e,
                            consecutive_failures,
                            "heartbeat send failed"
                        );
                        if consecutive_failures >= MAX_SEND_FAILURES {
                            warn!(
                                cookie_key = %cookie_key,
                                "heartbeat sender giving up after {} consecutive failures",
                                MAX_SEND_FAILURES
                            );
                            return SenderExit::GaveUp;
                        }
                    }
                }
            }
            _ = stop_rx.recv() => {
                debug!(cookie_key = %cookie_key, "heartbeat sender stopped");
                return SenderExit::Stopped;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/heartbeat_sender_tests.rs"]
mod tests;
