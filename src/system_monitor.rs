//! System telemetry: CPU, memory, and battery sampling.

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use sysinfo::System;

/// A single metrics reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub battery_percent: Option<f32>,
    pub sampled_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Spoken summary, e.g. for the status skill.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut text = format!(
            "CPU usage is at {:.0} percent. Memory usage is {:.0} percent.",
            self.cpu_percent, self.ram_percent
        );
        if let Some(battery) = self.battery_percent {
            text.push_str(&format!(" Battery charge stands at {battery:.0} percent."));
        }
        text
    }
}

/// Source of system metrics.
#[async_trait]
pub trait MetricsSampler: Send + Sync {
    /// Take a fresh reading.
    async fn sample(&self) -> Result<MetricsSnapshot>;

    /// The most recent reading, if any has been taken.
    async fn latest(&self) -> Option<MetricsSnapshot>;
}

/// [`MetricsSampler`] backed by `sysinfo`.
///
/// Battery level is not exposed by `sysinfo` and is always `None`.
pub struct SysinfoMonitor {
    system: Arc<Mutex<System>>,
    last: Mutex<Option<MetricsSnapshot>>,
}

impl SysinfoMonitor {
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime the CPU counters; usage is a delta between refreshes.
        system.refresh_cpu();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
            last: Mutex::new(None),
        }
    }
}

impl Default for SysinfoMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSampler for SysinfoMonitor {
    async fn sample(&self) -> Result<MetricsSnapshot> {
        let system = Arc::clone(&self.system);
        let snapshot = tokio::task::spawn_blocking(move || {
            let mut sys = system
                .lock()
                .map_err(|e| AssistantError::Metrics(format!("sampler lock poisoned: {e}")))?;
            sys.refresh_cpu();
            sys.refresh_memory();

            let total = sys.total_memory();
            let ram_percent = if total == 0 {
                0.0
            } else {
                (sys.used_memory() as f64 / total as f64 * 100.0) as f32
            };

            Ok::<_, AssistantError>(MetricsSnapshot {
                cpu_percent: sys.global_cpu_info().cpu_usage(),
                ram_percent,
                battery_percent: None,
                sampled_at: Utc::now(),
            })
        })
        .await
        .map_err(|e| AssistantError::Metrics(format!("sampling task failed: {e}")))??;

        if let Ok(mut last) = self.last.lock() {
            *last = Some(snapshot.clone());
        }
        Ok(snapshot)
    }

    async fn latest(&self) -> Option<MetricsSnapshot> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}
