use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatter_core::ReplySource;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    messages_total: AtomicU64,
    arithmetic_total: AtomicU64,
    rule_total: AtomicU64,
    fallback_total: AtomicU64,
    exits_total: AtomicU64,
    sessions_started_total: AtomicU64,
    sessions_ended_total: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub messages_total: u64,
    pub arithmetic_total: u64,
    pub rule_total: u64,
    pub fallback_total: u64,
    pub exits_total: u64,
    pub sessions_started_total: u64,
    pub sessions_ended_total: u64,
    pub avg_latency_micros: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_reply(&self, source: &ReplySource, should_exit: bool) {
        self.messages_total.fetch_add(1, Ordering::Relaxed);
        let counter = match source {
            ReplySource::Arithmetic => &self.arithmetic_total,
            ReplySource::Rule { .. } => &self.rule_total,
            ReplySource::Fallback => &self.fallback_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if should_exit {
            self.exits_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_session_started(&self) {
        self.sessions_started_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_session_ended(&self) {
        self.sessions_ended_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let messages = self.messages_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);

        MetricsSnapshot {
            messages_total: messages,
            arithmetic_total: self.arithmetic_total.load(Ordering::Relaxed),
            rule_total: self.rule_total.load(Ordering::Relaxed),
            fallback_total: self.fallback_total.load(Ordering::Relaxed),
            exits_total: self.exits_total.load(Ordering::Relaxed),
            sessions_started_total: self.sessions_started_total.load(Ordering::Relaxed),
            sessions_ended_total: self.sessions_ended_total.load(Ordering::Relaxed),
            avg_latency_micros: if messages == 0 {
                0.0
            } else {
                latency as f64 / messages as f64
            },
        }
    }
}

/// Installs the global JSON subscriber once; later calls are no-ops.
///
/// `RUST_LOG` wins over `default_level`. Output goes to stderr so a terminal
/// conversation on stdout stays readable.
pub fn init_tracing(service_name: &str, default_level: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{service_name}={default_level},chatter_session={default_level},chatter_api={default_level},warn"
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_splits_replies_by_source() {
        let metrics = AppMetrics::default();
        metrics.record_reply(&ReplySource::Arithmetic, false);
        metrics.record_reply(
            &ReplySource::Rule {
                name: "farewell".to_string(),
            },
            true,
        );
        metrics.record_reply(&ReplySource::Fallback, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_total, 3);
        assert_eq!(snapshot.arithmetic_total, 1);
        assert_eq!(snapshot.rule_total, 1);
        assert_eq!(snapshot.fallback_total, 1);
        assert_eq!(snapshot.exits_total, 2);
    }

    #[test]
    fn average_latency_is_zero_without_messages() {
        let metrics = AppMetrics::default();
        metrics.observe_latency(Duration::from_millis(3));
        assert_eq!(metrics.snapshot().avg_latency_micros, 0.0);
    }
}
