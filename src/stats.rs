//! Per-appid traffic statistics.
//!
//! # Responsibilities
//! - Count requests per appid
//! - Track distinct source IPs and user ids per appid within a period
//! - Publish counters/gauges and log a summary once per period
//!
//! # Design Decisions
//! - Runs as its own task, independent of routing
//! - Events are offered with `try_send`; a full queue drops the event so
//!   statistics never add latency to proxied requests

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::observability::metrics;

/// One accepted request, as seen by the stats collector.
#[derive(Debug, Clone)]
pub struct AppidEvent {
    pub appid: String,
    pub source_ip: Option<String>,
    pub user_id: String,
}

/// Aggregates for one appid over the current period.
#[derive(Debug, Default)]
struct AppidCount {
    sources: HashSet<String>,
    users: HashSet<String>,
    requests: u64,
}

/// Per-appid figures published at the end of a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppidSummary {
    pub appid: String,
    pub requests: u64,
    pub distinct_sources: usize,
    pub distinct_users: usize,
}

pub struct StatsCollector {
    period: Duration,
    counts: HashMap<String, AppidCount>,
}

#[derive(Clone, Debug)]
pub struct StatsHandle {
    events: mpsc::Sender<AppidEvent>,
}

impl StatsCollector {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            counts: HashMap::new(),
        }
    }

    /// Start the collector task with a queue of `capacity` events.
    pub fn spawn(self, capacity: usize) -> StatsHandle {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(self.run(rx));
        StatsHandle { events: tx }
    }

    async fn run(mut self, mut events: mpsc::Receiver<AppidEvent>) {
        let period = self.period.max(Duration::from_secs(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.record(event),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.flush();
                }
            }
        }
        self.flush();
    }

    pub fn record(&mut self, event: AppidEvent) {
        metrics::record_appid_request(&event.appid);

        let count = self.counts.entry(event.appid).or_default();
        count.requests += 1;
        count.users.insert(event.user_id);
        if let Some(ip) = event.source_ip {
            count.sources.insert(ip);
        }
    }

    /// Publish the current period and start a new one.
    pub fn flush(&mut self) -> Vec<AppidSummary> {
        let mut summaries: Vec<AppidSummary> = self
            .counts
            .drain()
            .map(|(appid, count)| AppidSummary {
                appid,
                requests: count.requests,
                distinct_sources: count.sources.len(),
                distinct_users: count.users.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.appid.cmp(&b.appid));

        for s in &summaries {
            metrics::record_appid_sources(&s.appid, s.distinct_sources, s.distinct_users);
            tracing::info!(
                appid = %s.appid,
                requests = s.requests,
                sources = s.distinct_sources,
                users = s.distinct_users,
                "Appid traffic summary"
            );
        }
        summaries
    }
}

impl StatsHandle {
    /// Offer an event; dropped if the collector is behind.
    pub fn record(&self, event: AppidEvent) {
        if let Err(e) = self.events.try_send(event) {
            tracing::debug!(error = %e, "Stats queue unavailable, event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(appid: &str, ip: Option<&str>, user: &str) -> AppidEvent {
        AppidEvent {
            appid: appid.into(),
            source_ip: ip.map(Into::into),
            user_id: user.into(),
        }
    }

    #[test]
    fn test_counts_distinct_sources_and_users() {
        let mut stats = StatsCollector::new(Duration::from_secs(60));
        stats.record(event("app", Some("10.0.0.1"), "u1"));
        stats.record(event("app", Some("10.0.0.1"), "u2"));
        stats.record(event("app", Some("10.0.0.2"), "u2"));
        stats.record(event("other", None, "u9"));

        let summaries = stats.flush();
        assert_eq!(
            summaries,
            vec![
                AppidSummary {
                    appid: "app".into(),
                    requests: 3,
                    distinct_sources: 2,
                    distinct_users: 2,
                },
                AppidSummary {
                    appid: "other".into(),
                    requests: 1,
                    distinct_sources: 0,
                    distinct_users: 1,
                },
            ]
        );
    }

    #[test]
    fn test_flush_starts_new_period() {
        let mut stats = StatsCollector::new(Duration::from_secs(60));
        stats.record(event("app", Some("10.0.0.1"), "u1"));
        assert_eq!(stats.flush().len(), 1);
        assert!(stats.flush().is_empty());
    }

    #[tokio::test]
    async fn test_handle_never_blocks() {
        let handle = StatsCollector::new(Duration::from_secs(60)).spawn(1);
        for i in 0..100 {
            handle.record(event("app", None, &format!("u{i}")));
        }
    }
}
