use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::storage::{NoteRecord, StorageHandle};

#[derive(Debug, Clone)]
pub enum WriteJob {
    Save(NoteRecord),
    Delete { id: String },
}

impl WriteJob {
    fn note_id(&self) -> &str {
        match self {
            WriteJob::Save(record) => &record.id,
            WriteJob::Delete { id } => id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            WriteJob::Save(_) => "save",
            WriteJob::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed,
    Failed(String),
    /// The writer went away before reporting back.
    Abandoned,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub committed: u64,
    pub failed: u64,
}

struct Envelope {
    job: WriteJob,
    done: Sender<WriteOutcome>,
}

/// Completion handle for one submitted job. Nobody is required to look at it.
#[derive(Debug)]
pub struct PendingWrite {
    done: Receiver<WriteOutcome>,
}

impl PendingWrite {
    pub fn wait(self) -> WriteOutcome {
        self.done.recv().unwrap_or(WriteOutcome::Abandoned)
    }

    pub fn try_outcome(&self) -> Option<WriteOutcome> {
        match self.done.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(WriteOutcome::Abandoned),
        }
    }
}

/// Runs durable writes on a dedicated thread, one at a time, in submission order.
pub struct BackgroundWriter {
    jobs: Option<Sender<Envelope>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<Mutex<WriterStats>>,
}

impl BackgroundWriter {
    pub fn spawn(storage: StorageHandle) -> Result<Self> {
        let (jobs, queue) = unbounded::<Envelope>();
        let stats = Arc::new(Mutex::new(WriterStats::default()));
        let worker_stats = Arc::clone(&stats);
        let worker = thread::Builder::new()
            .name("note-writer".into())
            .spawn(move || run_worker(storage, queue, worker_stats))
            .context("spawning note writer thread")?;
        Ok(Self {
            jobs: Some(jobs),
            worker: Some(worker),
            stats,
        })
    }

    pub fn submit(&self, job: WriteJob) -> PendingWrite {
        let (done, outcome) = bounded(1);
        match &self.jobs {
            Some(jobs) => {
                if let Err(err) = jobs.send(Envelope { job, done }) {
                    let job = err.into_inner().job;
                    tracing::warn!(
                        note_id = job.note_id(),
                        kind = job.kind(),
                        "note writer stopped, write dropped"
                    );
                }
            }
            None => {
                tracing::warn!(
                    note_id = job.note_id(),
                    kind = job.kind(),
                    "note writer shut down, write dropped"
                );
            }
        }
        PendingWrite { done: outcome }
    }

    pub fn stats(&self) -> WriterStats {
        *self.stats.lock()
    }

    /// Drains queued jobs and joins the worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("note writer thread panicked");
            }
        }
    }
}

impl Drop for BackgroundWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(storage: StorageHandle, queue: Receiver<Envelope>, stats: Arc<Mutex<WriterStats>>) {
    for Envelope { job, done } in queue.iter() {
        let result = match &job {
            WriteJob::Save(record) => storage.upsert_note(record),
            WriteJob::Delete { id } => storage.delete_note(id).map(|_| ()),
        };
        let outcome = match result {
            Ok(()) => {
                stats.lock().committed += 1;
                tracing::debug!(note_id = job.note_id(), kind = job.kind(), "note write committed");
                WriteOutcome::Committed
            }
            Err(err) => {
                stats.lock().failed += 1;
                tracing::warn!(
                    note_id = job.note_id(),
                    kind = job.kind(),
                    error = ?err,
                    "note write failed"
                );
                WriteOutcome::Failed(format!("{err:#}"))
            }
        };
        let _ = done.send(outcome);
    }
    tracing::debug!("note writer drained");
}
