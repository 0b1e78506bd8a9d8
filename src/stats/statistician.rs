//! Throughput reporting.
//!
//! # Responsibilities
//! - Count stats signals since the last report
//! - Every window, log requests processed and requests per second, then reset
//!
//! # Design Decisions
//! - A single task owns the counters; publishers only touch the channel
//! - Rate is computed over the fixed window length

use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::stats::signal::{StatsSignal, STATS_TOPIC};

/// One throughput report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    pub requests: u64,
    pub window: Duration,
    pub requests_per_second: f64,
}

/// Request count since the last report.
#[derive(Debug)]
pub struct RequestCounter {
    count: u64,
    window: Duration,
    last_report: Instant,
}

impl RequestCounter {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            count: 0,
            window,
            last_report: now,
        }
    }

    /// Count one request.
    pub fn record(&mut self) {
        self.count += 1;
    }

    /// Requests counted since the last report.
    pub fn pending(&self) -> u64 {
        self.count
    }

    /// Produce a report and reset if a full window has passed since the last one.
    pub fn poll_report(&mut self, now: Instant) -> Option<ThroughputReport> {
        if now.saturating_duration_since(self.last_report) < self.window {
            return None;
        }

        let report = ThroughputReport {
            requests: self.count,
            window: self.window,
            requests_per_second: self.count as f64 / self.window.as_secs_f64(),
        };
        self.count = 0;
        self.last_report = now;
        Some(report)
    }
}

/// Subscriber task for the stats channel.
pub struct Statistician {
    window: Duration,
    signals: mpsc::Receiver<StatsSignal>,
}

impl Statistician {
    pub fn new(window: Duration, signals: mpsc::Receiver<StatsSignal>) -> Self {
        Self { window, signals }
    }

    /// Consume signals until shutdown or until every publisher is gone.
    ///
    /// Returns the total number of signals processed.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        tracing::info!(topic = STATS_TOPIC, window = ?self.window, "Starting statistician");

        let start = time::Instant::now();
        let mut counter = RequestCounter::new(self.window, start.into_std());
        let mut ticker = time::interval_at(start + self.window, self.window);
        let mut total = 0u64;

        loop {
            tokio::select! {
                signal = self.signals.recv() => match signal {
                    Some(StatsSignal) => {
                        counter.record();
                        total += 1;
                        metrics::counter!("proxy_requests_total").increment(1);
                    }
                    None => {
                        tracing::info!("Stats channel closed, statistician exiting");
                        break;
                    }
                },
                tick = ticker.tick() => {
                    if let Some(report) = counter.poll_report(tick.into_std()) {
                        Self::publish(&report);
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Statistician received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        tracing::info!(
            target: STATS_TOPIC,
            total,
            unreported = counter.pending(),
            "Statistician stopped"
        );
        total
    }

    fn publish(report: &ThroughputReport) {
        metrics::gauge!("proxy_requests_per_second").set(report.requests_per_second);

        if report.requests == 0 {
            tracing::debug!(target: STATS_TOPIC, window = ?report.window, "No requests processed");
            return;
        }

        tracing::info!(
            target: STATS_TOPIC,
            requests = report.requests,
            rps = report.requests_per_second,
            "Requests processed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::stats::signal::stats_channel;

    const WINDOW: Duration = Duration::from_secs(10);

    #[test]
    fn test_no_report_before_window() {
        let start = Instant::now();
        let mut counter = RequestCounter::new(WINDOW, start);
        counter.record();

        assert!(counter.poll_report(start + Duration::from_secs(9)).is_none());
        assert_eq!(counter.pending(), 1);
    }

    #[test]
    fn test_report_and_reset_after_window() {
        let start = Instant::now();
        let mut counter = RequestCounter::new(WINDOW, start);
        for _ in 0..250 {
            counter.record();
        }

        let report = counter.poll_report(start + WINDOW).unwrap();
        assert_eq!(report.requests, 250);
        assert_eq!(report.window, WINDOW);
        assert!((report.requests_per_second - 25.0).abs() < f64::EPSILON);
        assert_eq!(counter.pending(), 0);

        // The next window starts at the report time.
        assert!(counter.poll_report(start + WINDOW + Duration::from_secs(5)).is_none());
        let idle = counter.poll_report(start + WINDOW * 2).unwrap();
        assert_eq!(idle.requests, 0);
    }

    #[tokio::test]
    async fn test_statistician_drains_until_publishers_gone() {
        let (emitter, rx) = stats_channel(16);
        for _ in 0..5 {
            emitter.emit();
        }
        drop(emitter);

        let shutdown = Shutdown::new();
        let total = Statistician::new(WINDOW, rx).run(shutdown.subscribe()).await;
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_statistician_stops_on_shutdown() {
        let (_emitter, rx) = stats_channel(16);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(Statistician::new(WINDOW, rx).run(shutdown.subscribe()));

        shutdown.trigger();
        let total = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("statistician should stop")
            .unwrap();
        assert_eq!(total, 0);
    }
}
