//! Navigation observability
//!
//! Structured per-navigation logging with correlation ids and an aggregated
//! metrics collector.

pub mod logging;
pub mod metrics;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use logging::{NavigationContext, NavigationLogger, NavigationSummary};
pub use metrics::{GlobalMetrics, MetricsCollector, MetricsSnapshot, StrategyMetrics};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_true")]
    pub correlation_ids: bool,
    #[serde(default = "default_true")]
    pub navigation_logging: bool,
    #[serde(default = "default_true")]
    pub performance_metrics: bool,
    #[serde(default)]
    pub log_level: LogLevel,
    /// Navigations slower than this are reported
    #[serde(default = "default_slow_threshold")]
    pub slow_threshold_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_true() -> bool {
    true
}

fn default_slow_threshold() -> u64 {
    3000
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            correlation_ids: true,
            navigation_logging: true,
            performance_metrics: true,
            log_level: LogLevel::Info,
            slow_threshold_ms: default_slow_threshold(),
        }
    }
}

impl MonitoringConfig {
    /// Verbose settings for local debugging
    pub fn development() -> Self {
        Self {
            log_level: LogLevel::Debug,
            ..Self::default()
        }
    }

    /// Everything off
    pub fn disabled() -> Self {
        Self {
            correlation_ids: false,
            navigation_logging: false,
            performance_metrics: false,
            log_level: LogLevel::Error,
            slow_threshold_ms: u64::MAX,
        }
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}
