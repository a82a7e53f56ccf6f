use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mm1::consumer::{drive, JobConsumer, JsonLinesWriter, SummaryConsumer};
use mm1::{Mm1Queue, QueueConfig, QueueStats, ShutdownPolicy, DEFAULT_SAFETY_MULTIPLIER};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputMode {
    /// One JSON object per completed job on stdout.
    Json,
    /// Counts and means printed once the run ends.
    Summary,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Simulate an M/M/1 queue")]
struct Args {
    /// Arrival rate, lambda (jobs per second)
    #[arg(long = "arrival-rate", visible_alias = "arrival.rate")]
    arrival_rate: f64,

    /// Service rate, mu (jobs per second)
    #[arg(long = "service-rate", visible_alias = "service.rate")]
    service_rate: f64,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(long)]
    duration: Option<f64>,

    /// What to write to stdout
    #[arg(long, value_enum, default_value_t = OutputMode::Json)]
    mode: OutputMode,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Standard deviations of queue length added when sizing buffers
    #[arg(long, default_value_t = DEFAULT_SAFETY_MULTIPLIER)]
    safety_multiplier: f64,

    /// Publish jobs without the completion annotator stage
    #[arg(long)]
    no_annotate: bool,

    /// Cut in-progress waits short when stopping
    #[arg(long)]
    interrupt_waits: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn queue_config(&self) -> QueueConfig {
        let policy = if self.interrupt_waits {
            ShutdownPolicy::Interrupt
        } else {
            ShutdownPolicy::CompleteInFlight
        };
        let mut config = QueueConfig::new(self.arrival_rate, self.service_rate)
            .with_safety_multiplier(self.safety_multiplier)
            .with_annotator(!self.no_annotate)
            .with_shutdown_policy(policy);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}={level}", env!("CARGO_CRATE_NAME")).into());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn termination_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            },
            Err(err) => {
                tracing::warn!("cannot install SIGTERM handler: {err}");
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    }
}

/// Parse `--duration` seconds into a run length.
fn run_duration(secs: f64) -> anyhow::Result<Duration> {
    if secs < 0.0 {
        anyhow::bail!("--duration must be a non-negative number of seconds, got {secs}");
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow::anyhow!("--duration of {secs} seconds is out of range"))
}

/// The summary printed at the end of a `--mode summary` run, followed by the
/// Prometheus exposition when built with the `metrics` feature.
fn summary_output(summary: &SummaryConsumer, stats: &QueueStats) -> anyhow::Result<String> {
    #[allow(unused_mut)]
    let mut out = summary.snapshot().report(Some(stats)).to_string();

    #[cfg(feature = "metrics")]
    {
        out.push('\n');
        out.push_str(&mm1::metrics::gather_metrics()?);
    }

    Ok(out)
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let duration = args.duration.map(run_duration).transpose()?;

    let queue = match Mm1Queue::with_config(args.queue_config()) {
        Ok(queue) => queue,
        Err(err) => {
            eprintln!("invalid queue parameters: {err}");
            return Ok(ExitCode::from(1));
        }
    };

    let mut jobs = queue
        .take_output()
        .ok_or_else(|| anyhow::anyhow!("output stream already taken"))?;
    let started_at = queue.start()?;

    let summary = SummaryConsumer::new(started_at);
    let mut consumer: Box<dyn JobConsumer> = match args.mode {
        OutputMode::Json => Box::new(JsonLinesWriter::new(std::io::stdout())),
        OutputMode::Summary => Box::new(summary.clone()),
    };
    let consuming = tokio::spawn(async move { drive(&mut jobs, consumer.as_mut()).await });

    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    tracing::info!("run duration of {duration:?} elapsed");
                }
                signal = termination_signal() => eprintln!("\nQuitting on signal: {signal}"),
            }
        }
        None => {
            let signal = termination_signal().await;
            eprintln!("\nQuitting on signal: {signal}");
        }
    }

    queue.stop().await;
    let consumed = consuming.await??;
    tracing::info!(consumed, "consumer finished");

    if let OutputMode::Summary = args.mode {
        print!("{}", summary_output(&summary, queue.stats())?);
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    #[cfg(feature = "metrics")]
    if let Err(err) = mm1::metrics::init_metrics() {
        tracing::warn!("metrics disabled: {err:#}");
    }

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_run_duration_bounds() {
        assert_eq!(run_duration(1.5).unwrap(), Duration::from_millis(1500));
        assert_eq!(run_duration(0.0).unwrap(), Duration::ZERO);
        assert!(run_duration(-1.0).is_err());
        assert!(run_duration(1e30).is_err());
        assert!(run_duration(f64::NAN).is_err());
        assert!(run_duration(f64::INFINITY).is_err());
    }

    #[test]
    fn test_args_map_onto_config() {
        let args = Args::parse_from([
            "mm1",
            "--arrival.rate",
            "1",
            "--service-rate",
            "2",
            "--seed",
            "9",
            "--no-annotate",
            "--interrupt-waits",
        ]);
        let config = args.queue_config();
        assert_eq!(config.arrival_rate, 1.0);
        assert_eq!(config.service_rate, 2.0);
        assert_eq!(config.seed, Some(9));
        assert!(!config.annotate);
        assert_eq!(config.shutdown_policy, ShutdownPolicy::Interrupt);
        assert_eq!(config.safety_multiplier, DEFAULT_SAFETY_MULTIPLIER);
    }

    #[test]
    fn test_summary_output() {
        let stats = QueueStats::new(1.0, 2.0).unwrap();
        let out = summary_output(&SummaryConsumer::new(Utc::now()), &stats).unwrap();
        assert!(out.contains("jobs:"));
        assert!(out.contains("expected 0.500000"));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_summary_output_includes_metrics() {
        mm1::metrics::init_metrics().unwrap();
        let stats = QueueStats::new(1.0, 2.0).unwrap();
        let out = summary_output(&SummaryConsumer::new(Utc::now()), &stats).unwrap();
        assert!(out.contains("mm1_buffer_capacity"));
        assert!(out.contains("mm1_jobs_arrived_total"));
    }
}
