use tokio::sync::mpsc;

use crate::job::Job;

use super::shutdown::ShutdownToken;
use super::stage::next_job;

/// FIFO stream of completed jobs.
///
/// Once the owning queue begins shutting down the stream ends: jobs still
/// buffered at that moment are dropped rather than delivered.
#[derive(Debug)]
pub struct JobStream {
    rx: mpsc::Receiver<Job>,
    shutdown: ShutdownToken,
}

impl JobStream {
    pub(crate) fn new(rx: mpsc::Receiver<Job>, shutdown: ShutdownToken) -> Self {
        Self { rx, shutdown }
    }

    /// Next completed job, or `None` once the queue is stopping or stopped.
    pub async fn next(&mut self) -> Option<Job> {
        next_job(&mut self.rx, &self.shutdown).await
    }

    /// Number of jobs currently buffered.
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Capacity of the output buffer.
    pub fn capacity(&self) -> usize {
        self.rx.max_capacity()
    }
}
