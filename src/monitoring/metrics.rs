//! Aggregated navigation metrics

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::MonitoringConfig;
use super::logging::NavigationSummary;
use crate::util::lock;

#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsCollectorInner>>,
    config: MonitoringConfig,
}

#[derive(Debug)]
struct MetricsCollectorInner {
    strategies: HashMap<String, StrategyMetrics>,
    global: GlobalMetrics,
    start_time: Instant,
}

/// Metrics for one transition strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub strategy: String,
    pub total_navigations: u64,
    pub completed: u64,
    pub fallbacks: u64,
    pub total_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub total_navigations: u64,
    pub completed: u64,
    pub fallbacks: u64,
    /// Activations refused while another navigation was running
    pub busy_rejections: u64,
    pub average_duration: Duration,
    pub uptime: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub global: GlobalMetrics,
    pub strategies: Vec<StrategyMetrics>,
    pub timestamp: String,
}

impl MetricsCollector {
    pub fn new(config: MonitoringConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsCollectorInner {
                strategies: HashMap::new(),
                global: GlobalMetrics::default(),
                start_time: Instant::now(),
            })),
            config,
        }
    }

    pub fn record_navigation(&self, strategy: &str, summary: &NavigationSummary) {
        if !self.config.performance_metrics {
            return;
        }

        let mut inner = lock(&self.inner);
        inner
            .strategies
            .entry(strategy.to_string())
            .or_insert_with(|| StrategyMetrics::new(strategy))
            .record(summary);

        let global = &mut inner.global;
        let previous_total = global.average_duration * global.total_navigations as u32;
        global.total_navigations += 1;
        if summary.completed {
            global.completed += 1;
        } else {
            global.fallbacks += 1;
        }
        global.average_duration = (previous_total + summary.duration) / global.total_navigations as u32;
    }

    pub fn record_busy(&self) {
        if self.config.performance_metrics {
            lock(&self.inner).global.busy_rejections += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = lock(&self.inner);
        let mut global = inner.global.clone();
        global.uptime = inner.start_time.elapsed();

        let mut strategies: Vec<StrategyMetrics> = inner.strategies.values().cloned().collect();
        strategies.sort_by(|a, b| a.strategy.cmp(&b.strategy));

        MetricsSnapshot {
            global,
            strategies,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn strategy_metrics(&self, strategy: &str) -> Option<StrategyMetrics> {
        lock(&self.inner).strategies.get(strategy).cloned()
    }

    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.strategies.clear();
        inner.global = GlobalMetrics::default();
        inner.start_time = Instant::now();
    }
}

impl StrategyMetrics {
    fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            total_navigations: 0,
            completed: 0,
            fallbacks: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
        }
    }

    fn record(&mut self, summary: &NavigationSummary) {
        self.total_navigations += 1;
        if summary.completed {
            self.completed += 1;
        } else {
            self.fallbacks += 1;
        }
        self.total_duration += summary.duration;
        self.min_duration = self.min_duration.min(summary.duration);
        self.max_duration = self.max_duration.max(summary.duration);
    }

    pub fn average_duration(&self) -> Duration {
        if self.total_navigations == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.total_navigations as u32
        }
    }

    /// Share of navigations that fell back, between 0 and 1
    pub fn fallback_rate(&self) -> f64 {
        if self.total_navigations == 0 {
            0.0
        } else {
            self.fallbacks as f64 / self.total_navigations as f64
        }
    }
}
