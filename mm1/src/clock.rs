use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Monotonic clock anchored to a wall-clock origin.
///
/// Readings are `origin + elapsed`, where `elapsed` comes from the tokio
/// monotonic clock, so successive readings never go backwards even if the
/// system clock is adjusted. Under a paused tokio runtime the clock follows
/// virtual time.
#[derive(Clone, Copy, Debug)]
pub struct SimClock {
    origin_wall: DateTime<Utc>,
    origin: Instant,
}

impl SimClock {
    /// Anchor a new clock at the current instant.
    pub fn start() -> Self {
        Self {
            origin_wall: Utc::now(),
            origin: Instant::now(),
        }
    }

    /// Wall-clock time at which the clock was anchored.
    pub fn origin(&self) -> DateTime<Utc> {
        self.origin_wall
    }

    /// Current reading.
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_virtual_time() {
        let clock = SimClock::start();
        let before = clock.now();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let after = clock.now();
        assert_eq!((after - before).num_milliseconds(), 1500);
        assert_eq!(before, clock.origin());
    }

    #[tokio::test]
    async fn test_readings_are_monotonic() {
        let clock = SimClock::start();
        let mut last = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next >= last);
            last = next;
        }
    }
}
