//! The scheduler drives one board per view in fixed iteration batches,
//! aggregates finished-pixel records into an outgoing queue, and flushes
//! them to a consumer on size or time thresholds.
//!
//! The model is single-threaded cooperative: a batch is atomic with respect
//! to the emitted change list, and the cancel flag is polled only at batch
//! boundaries.

use crate::board::Board;
use crate::cancellation::CancelFlag;
use crate::error::EngineError;
use deepbrot_core::{ChangeRecord, Progress};
use std::time::{Duration, Instant};

pub const DEFAULT_BATCH_SIZE: u32 = 100;
pub const DEFAULT_FLUSH_THRESHOLD: usize = 64 * 1024;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Consumer of flushed change batches.
pub trait ChangeSink {
    fn publish(&mut self, records: Vec<ChangeRecord>);
}

/// Sink that retains everything, for tests and simple consumers.
#[derive(Default)]
pub struct CollectSink {
    pub records: Vec<ChangeRecord>,
    pub flushes: usize,
}

impl ChangeSink for CollectSink {
    fn publish(&mut self, records: Vec<ChangeRecord>) {
        self.flushes += 1;
        self.records.extend(records);
    }
}

pub struct Scheduler {
    board: Box<dyn Board>,
    batch_size: u32,
    flush_threshold: usize,
    flush_interval: Duration,
    cancel: CancelFlag,
    queue: Vec<ChangeRecord>,
    queued_bytes: usize,
    last_flush: Instant,
    progress: Progress,
    complete: bool,
    last_tag: u32,
}

impl Scheduler {
    pub fn new(board: Box<dyn Board>, batch_size: u32) -> Self {
        let active = board.remaining_active();
        Self {
            board,
            batch_size: batch_size.max(1),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            cancel: CancelFlag::new(),
            queue: Vec::new(),
            queued_bytes: 0,
            last_flush: Instant::now(),
            progress: Progress {
                active,
                ..Progress::default()
            },
            complete: active == 0,
            last_tag: 0,
        }
    }

    pub fn with_flush(mut self, threshold: usize, interval: Duration) -> Self {
        self.flush_threshold = threshold;
        self.flush_interval = interval;
        self
    }

    /// Clone of the cancel flag; setting it stops iteration at the next
    /// batch boundary. Partial results already emitted are not retracted.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn board(&self) -> &dyn Board {
        &*self.board
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Advance by up to `batches` scheduler ticks (or until completion or
    /// cancellation). Returns true when the view is complete.
    pub fn step(&mut self, batches: u32, sink: &mut dyn ChangeSink) -> Result<bool, EngineError> {
        for _ in 0..batches {
            if self.complete || self.cancel.is_cancelled() {
                break;
            }
            let rec = self.board.iterate_batch(self.batch_size)?;
            debug_assert!(rec.iter >= self.last_tag, "iteration tag went backwards");
            self.last_tag = rec.iter;

            self.progress.iter = self.board.iteration();
            self.progress.escaped += rec.escaped.len() as u32;
            self.progress.converged += rec.converged.len() as u32;
            self.progress.active = self.board.remaining_active();
            self.progress.chaotic = self.board.chaotic_spike_count();

            if !rec.is_empty() {
                self.queued_bytes += rec.byte_size();
                self.queue.push(rec);
            }
            if self.queued_bytes >= self.flush_threshold
                || self.last_flush.elapsed() >= self.flush_interval
            {
                self.flush(sink);
            }
            if self.board.remaining_active() == 0 {
                self.complete = true;
                log::debug!(
                    "view complete at iteration {} ({} escaped, {} converged)",
                    self.progress.iter,
                    self.progress.escaped,
                    self.progress.converged
                );
            }
        }
        if self.complete || self.cancel.is_cancelled() {
            self.flush(sink);
        }
        Ok(self.complete)
    }

    fn flush(&mut self, sink: &mut dyn ChangeSink) {
        self.last_flush = Instant::now();
        if self.queue.is_empty() {
            return;
        }
        self.queued_bytes = 0;
        sink.publish(std::mem::take(&mut self.queue));
    }
}

/// Round-robin driver for several views, advancing the view with the most
/// active pixels first. Stream invariants hold per view.
#[derive(Default)]
pub struct SchedulerPool {
    views: Vec<(Scheduler, CollectSink)>,
}

impl SchedulerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_view(&mut self, scheduler: Scheduler) -> usize {
        self.views.push((scheduler, CollectSink::default()));
        self.views.len() - 1
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn scheduler(&self, view: usize) -> &Scheduler {
        &self.views[view].0
    }

    /// One pool tick: advance the incomplete view with the most remaining
    /// work by a single scheduler step.
    pub fn step_round(&mut self) -> Result<(), EngineError> {
        let next = self
            .views
            .iter()
            .enumerate()
            .filter(|(_, (s, _))| !s.is_complete())
            .max_by_key(|(_, (s, _))| s.board().remaining_active())
            .map(|(i, _)| i);
        if let Some(i) = next {
            let (scheduler, sink) = &mut self.views[i];
            scheduler.step(1, sink)?;
        }
        Ok(())
    }

    pub fn all_complete(&self) -> bool {
        self.views.iter().all(|(s, _)| s.is_complete())
    }

    /// Take the records flushed for a view so far.
    pub fn drain(&mut self, view: usize) -> Vec<ChangeRecord> {
        std::mem::take(&mut self.views[view].1.records)
    }
}
