//! Elastic worker pool for dispatching per-unit tick tasks.
//!
//! Jobs are handed to workers over a zero-capacity rendezvous channel:
//! if no worker is blocked waiting for work, the pool spawns one and
//! then completes the handoff. The pool therefore grows to the number
//! of concurrently dispatched units (a small, slowly-changing number)
//! and then reuses those workers. Workers run one job to completion and
//! go back to waiting on the channel; they never block anywhere else in
//! this subsystem.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Elastic worker pool.
///
/// Dropping the pool closes the job channel; workers exit as they
/// finish, and `Drop` joins them all.
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    job_rx: Receiver<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create a pool with one worker already running.
    ///
    /// With one worker guaranteed alive, a later spawn failure can only
    /// slow the pool down; every handed-off job still runs.
    pub fn new() -> io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::bounded(0);
        let mut pool = Self {
            job_tx: Some(job_tx),
            job_rx,
            workers: Vec::new(),
        };
        pool.spawn_worker()?;
        Ok(pool)
    }

    /// Hand `job` to an idle worker, growing the pool if none is
    /// waiting.
    ///
    /// Returns as soon as a worker has accepted the job. No ordering
    /// is guaranteed across submissions.
    pub fn submit(&mut self, job: impl FnOnce() + Send + 'static) {
        let job: Job = Box::new(job);
        let job = {
            let job_tx = self.job_tx.as_ref().expect("job channel open until drop");
            match job_tx.try_send(job) {
                // An idle worker was already blocked in recv().
                Ok(()) => return,
                Err(TrySendError::Full(job)) => job,
                Err(TrySendError::Disconnected(_)) => {
                    unreachable!("receiver held by the pool until drop")
                }
            }
        };
        if let Err(e) = self.spawn_worker() {
            // Degraded mode: the handoff below waits for a busy worker
            // to free up instead.
            log::warn!(
                "worker spawn failed, waiting on one of {} live worker(s): {e}",
                self.workers.len()
            );
        }
        let job_tx = self.job_tx.as_ref().expect("job channel open until drop");
        let _ = job_tx.send(job);
    }

    /// Number of workers spawned over the pool's lifetime.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn spawn_worker(&mut self) -> io::Result<()> {
        let job_rx = self.job_rx.clone();
        let handle = thread::Builder::new()
            .name(format!("tempo-worker-{}", self.workers.len()))
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    job();
                }
            })?;
        self.workers.push(handle);
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel is the shutdown signal.
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
