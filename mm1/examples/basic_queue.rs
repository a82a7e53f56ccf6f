//! Run an M/M/1 queue for a few seconds and print what came out.
//!
//! ```text
//! cargo run --example basic_queue
//! ```

use std::time::Duration;

use mm1::consumer::{drive, SummaryConsumer};
use mm1::{Mm1Queue, QueueConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = QueueConfig::new(20.0, 25.0).with_seed(42);
    let queue = Mm1Queue::with_config(config)?;
    println!(
        "utilization {:.2}, buffer capacity {}",
        queue.stats().utilization,
        queue.capacity()
    );

    let mut jobs = queue.take_output().expect("output is taken once");
    let started_at = queue.start()?;

    // Print the first few jobs as they complete.
    for _ in 0..5 {
        if let Some(job) = jobs.next().await {
            println!("{}", serde_json::to_string(&job)?);
        }
    }

    // Then summarize the rest of the run.
    let summary = SummaryConsumer::new(started_at);
    let mut consumer = summary.clone();
    let consuming = tokio::spawn(async move { drive(&mut jobs, &mut consumer).await });

    tokio::time::sleep(Duration::from_secs(3)).await;
    queue.stop().await;
    consuming.await??;

    print!("{}", summary.snapshot().report(Some(queue.stats())));
    Ok(())
}
