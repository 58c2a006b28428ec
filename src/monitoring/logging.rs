//! Structured navigation logging with correlation tracking

use log::{debug, error, info, warn};
use serde_json::json;
use std::time::{Duration, Instant};

use super::{LogLevel, MonitoringConfig};

#[derive(Debug, Clone)]
pub struct NavigationLogger {
    config: MonitoringConfig,
}

/// One navigation attempt being tracked
#[derive(Debug, Clone)]
pub struct NavigationContext {
    pub correlation_id: String,
    pub strategy: String,
    pub url: String,
    pub start_time: Instant,
}

/// How a navigation attempt ended
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSummary {
    pub duration: Duration,
    pub completed: bool,
    pub fallback_reason: Option<String>,
}

impl NavigationLogger {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    /// Fresh correlation id, or a fixed placeholder when ids are disabled
    pub fn correlation_id(&self) -> String {
        if self.config.correlation_ids {
            uuid::Uuid::new_v4().to_string()
        } else {
            "-".to_string()
        }
    }

    pub fn start_navigation(&self, strategy: &str, url: &str, correlation_id: &str) -> NavigationContext {
        let context = NavigationContext {
            correlation_id: correlation_id.to_string(),
            strategy: strategy.to_string(),
            url: url.to_string(),
            start_time: Instant::now(),
        };

        if self.config.navigation_logging && self.should_log(LogLevel::Info) {
            let log_data = json!({
                "event": "navigation_started",
                "correlation_id": context.correlation_id,
                "strategy": context.strategy,
                "url": context.url,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            info!("Navigation Started: {}", log_data);
        }

        context
    }

    pub fn log_phase(&self, context: &NavigationContext, phase: &str) {
        if !self.config.navigation_logging || !self.should_log(LogLevel::Debug) {
            return;
        }

        let log_data = json!({
            "event": "phase",
            "correlation_id": context.correlation_id,
            "strategy": context.strategy,
            "phase": phase,
            "elapsed_ms": context.elapsed().as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        debug!("Navigation Phase: {}", log_data);
    }

    pub fn log_fetch(&self, context: &NavigationContext, capability_header: &str, bytes: usize) {
        if !self.config.navigation_logging || !self.should_log(LogLevel::Debug) {
            return;
        }

        let log_data = json!({
            "event": "page_fetched",
            "correlation_id": context.correlation_id,
            "url": context.url,
            "accept": capability_header,
            "bytes": bytes,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        debug!("Page Fetched: {}", log_data);
    }

    /// A navigation was refused because another one is running
    pub fn log_busy(&self, url: &str) {
        if !self.should_log(LogLevel::Warn) {
            return;
        }

        let log_data = json!({
            "event": "navigation_busy",
            "url": url,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        warn!("Navigation Refused: {}", log_data);
    }

    pub fn log_fallback(&self, context: &NavigationContext, reason: &str) {
        if !self.should_log(LogLevel::Warn) {
            return;
        }

        let log_data = json!({
            "event": "hard_navigation_fallback",
            "correlation_id": context.correlation_id,
            "strategy": context.strategy,
            "url": context.url,
            "reason": reason,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        warn!("Falling Back To Hard Navigation: {}", log_data);
    }

    pub fn complete_navigation(&self, context: &NavigationContext, summary: &NavigationSummary) {
        if self.config.performance_metrics && self.should_log(LogLevel::Info) {
            let log_data = json!({
                "event": "navigation_completed",
                "correlation_id": context.correlation_id,
                "strategy": context.strategy,
                "url": context.url,
                "duration_ms": summary.duration.as_millis(),
                "completed": summary.completed,
                "fallback_reason": summary.fallback_reason,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });

            if summary.completed {
                info!("Navigation Completed: {}", log_data);
            } else {
                error!("Navigation Failed: {}", log_data);
            }
        }

        if summary.duration > self.config.slow_threshold() {
            self.log_slow_navigation(context, summary.duration);
        }
    }

    fn log_slow_navigation(&self, context: &NavigationContext, duration: Duration) {
        if !self.config.performance_metrics || !self.should_log(LogLevel::Warn) {
            return;
        }

        let log_data = json!({
            "event": "slow_navigation",
            "correlation_id": context.correlation_id,
            "strategy": context.strategy,
            "duration_ms": duration.as_millis(),
            "threshold_ms": self.config.slow_threshold_ms,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        warn!("Slow Navigation Detected: {}", log_data);
    }

    fn should_log(&self, level: LogLevel) -> bool {
        level <= self.config.log_level
    }
}

impl NavigationContext {
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn summary(&self, completed: bool, fallback_reason: Option<String>) -> NavigationSummary {
        NavigationSummary {
            duration: self.elapsed(),
            completed,
            fallback_reason,
        }
    }
}
