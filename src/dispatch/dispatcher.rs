use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::dispatch::accumulator::{Accumulator, AddOutcome};
use crate::dispatch::entry::LogEntry;
use crate::metrics::MetricsSink;
use crate::sink::{SequenceToken, Sink};

/// Lifecycle of the dispatch task. `Running` accepts all three triggers;
/// `Draining` only consumes what is already queued; `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    /// The dispatcher has been asked to close; the entry was not accepted.
    #[error("dispatcher is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// The configuration violates a service bound.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The destination could not be created or configured.
    #[error("failed to prepare destination: {0}")]
    Destination(#[from] crate::sink::SinkError),
}

/// Producer-facing side of the dispatcher. Cheap to clone; every clone
/// feeds the same dispatch task.
#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<LogEntry>,
    close_token: CancellationToken,
    stopped: CancellationToken,
}

impl DispatcherHandle {
    /// Stamp `message` with the current UTC time and hand it to the
    /// dispatch task. Suspends while the channel is full; fails only
    /// once the dispatcher has been asked to close.
    pub async fn enqueue(&self, message: impl Into<Bytes>) -> Result<(), EnqueueError> {
        let entry = LogEntry::new(message);
        self.tx.send(entry).await.map_err(|_| EnqueueError::Closed)
    }

    /// Ask the dispatch task to drain and stop, then wait until it has.
    /// Every entry enqueued before this call has been flushed, or had its
    /// flush failure logged, by the time this returns.
    pub async fn close(&self) {
        self.close_token.cancel();
        self.stopped.cancelled().await;
    }
}

/// The single coordination task. Owns the accumulator and the sequence
/// token outright; producers reach it only through the entry channel, so
/// no locking is involved anywhere.
pub struct DispatcherService<S: Sink> {
    config: Arc<Config>,
    sink: Arc<S>,
    metrics: Arc<dyn MetricsSink>,
    accumulator: Accumulator,
    sequence_token: Option<SequenceToken>,
    rx: mpsc::Receiver<LogEntry>,
    close_token: CancellationToken,
    stopped: CancellationToken,
    state: State,
}

impl<S: Sink> DispatcherService<S> {
    /// Build the service and its handle. The caller spawns
    /// [`DispatcherService::run`]; [`DispatcherService::start`] does both.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        sink: Arc<S>,
        metrics: Arc<dyn MetricsSink>,
    ) -> (Self, DispatcherHandle) {
        // The channel holds one batch's worth of entries as slack against
        // transient producer/consumer speed mismatch.
        let (tx, rx) = mpsc::channel(config.max_entries_per_batch);
        let close_token = CancellationToken::new();
        let stopped = CancellationToken::new();

        let handle = DispatcherHandle {
            tx,
            close_token: close_token.clone(),
            stopped: stopped.clone(),
        };
        let accumulator =
            Accumulator::new(config.max_entries_per_batch, config.max_batch_size_bytes);
        let service = Self {
            config,
            sink,
            metrics,
            accumulator,
            sequence_token: None,
            rx,
            close_token,
            stopped,
            state: State::Running,
        };

        (service, handle)
    }

    /// Validate the config, create the destination, spawn the dispatch
    /// task and hand back the producer-facing handle.
    pub async fn start(
        config: Config,
        sink: Arc<S>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<DispatcherHandle, StartError>
    where
        S: 'static,
    {
        config.validate()?;
        sink.ensure_destination(&config.log_group, &config.log_stream, config.retention_days)
            .await?;

        let (service, handle) = Self::new(Arc::new(config), sink, metrics);
        tokio::spawn(service.run());
        Ok(handle)
    }

    pub async fn run(mut self) {
        debug!("dispatcher started");
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.config.flush_interval,
            self.config.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.state == State::Running {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await;
                    ticker.reset();
                }
                entry = self.rx.recv() => {
                    match entry {
                        Some(entry) => {
                            if self.accumulate(entry).await {
                                ticker.reset();
                            }
                        }
                        // Every handle dropped without an explicit close.
                        None => self.state = State::Draining,
                    }
                }
                () = self.close_token.cancelled() => {
                    self.state = State::Draining;
                }
            }
        }

        self.drain().await;
        self.state = State::Stopped;
        self.stopped.cancel();
        debug!("dispatcher stopped");
    }

    /// Refuse new sends, consume every entry already queued through the
    /// regular accumulator logic, then flush whatever remains.
    async fn drain(&mut self) {
        debug!("close requested, draining queued entries");
        self.rx.close();
        while let Some(entry) = self.rx.recv().await {
            self.accumulate(entry).await;
        }
        self.flush().await;
    }

    /// Run one entry through the accumulator, flushing around it as the
    /// fit decision requires. Returns whether a flush was attempted.
    async fn accumulate(&mut self, entry: LogEntry) -> bool {
        match self.accumulator.try_add(entry) {
            AddOutcome::Added => {
                self.update_gauges();
                false
            }
            AddOutcome::AddedNowFull => {
                self.update_gauges();
                self.flush().await;
                true
            }
            AddOutcome::WouldOverflow(entry) => {
                self.flush().await;
                self.accumulator.push_unchecked(entry);
                self.update_gauges();
                true
            }
            AddOutcome::TooLarge(entry) => {
                warn!(
                    size = entry.encoded_size(),
                    cap = self.config.max_batch_size_bytes,
                    "dropping entry larger than the batch byte cap"
                );
                false
            }
        }
    }

    /// Ship the current batch. A failed send keeps the batch and the
    /// sequence token untouched; the next trigger retries it.
    async fn flush(&mut self) {
        if self.accumulator.is_empty() {
            debug!("flush skipped, buffer empty");
            return;
        }

        let started = std::time::Instant::now();
        let result = self
            .sink
            .send_batch(
                self.accumulator.entries(),
                &self.config.log_group,
                &self.config.log_stream,
                self.sequence_token.as_ref(),
            )
            .await;
        self.metrics.observe_flush_duration(started.elapsed());

        match result {
            Ok(receipt) => {
                if let Some(rejected) = receipt.rejected {
                    if !rejected.is_empty() {
                        // Accepted data loss; rejected entries are not re-queued.
                        warn!(?rejected, "sink rejected part of the batch");
                    }
                }
                self.sequence_token = receipt.next_sequence_token;
                self.accumulator.clear();
                self.update_gauges();
                debug!("batch shipped");
            }
            Err(e) => {
                error!("failed to ship batch, keeping it for the next attempt: {e}");
            }
        }
    }

    fn update_gauges(&self) {
        self.metrics.set_entries_buffered(self.accumulator.len());
        self.metrics.set_batch_size_bytes(self.accumulator.size_bytes());
    }
}
