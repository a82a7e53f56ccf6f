use async_trait::async_trait;
use mm1::consumer::JobConsumer;
use mm1::Job;
use parking_lot::Mutex;
use std::sync::Arc;

/// Consumer that records every job it receives.
#[derive(Clone)]
pub struct RecordingConsumer {
    jobs: Arc<Mutex<Vec<Job>>>,
    finished: Arc<Mutex<bool>>,
    fail_after: Option<usize>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(Mutex::new(false)),
            fail_after: None,
        }
    }

    /// A consumer that returns an error on the job after the first `count`.
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::new()
        }
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().clone()
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock()
    }

    pub fn assert_consumed_eq(&self, expected: usize) {
        assert_eq!(
            self.jobs.lock().len(),
            expected,
            "Expected {} consumed jobs, got {}",
            expected,
            self.jobs.lock().len()
        );
    }
}

impl Default for RecordingConsumer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobConsumer for RecordingConsumer {
    async fn consume(&mut self, job: Job) -> anyhow::Result<()> {
        let mut jobs = self.jobs.lock();
        if self.fail_after.is_some_and(|limit| jobs.len() >= limit) {
            anyhow::bail!("recording consumer rejected job {}", job.sequence);
        }
        jobs.push(job);
        Ok(())
    }

    async fn finish(&mut self) -> anyhow::Result<()> {
        *self.finished.lock() = true;
        Ok(())
    }
}
