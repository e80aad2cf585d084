//! Process resource monitoring.
//!
//! A periodic sampler records process and system memory plus CPU usage into
//! a bounded, time-pruned ring buffer, and emits each sample through
//! `tracing`. The buffer is the diagnostic history behind `GET /health/log`;
//! `GET /health` serves a fresh point-in-time sample.
//!
//! The ring buffer lives outside the conversion core. It competes for the
//! same memory budget but never coordinates with it: admission decisions use
//! their own point-in-time probe reading. Appenders synchronize through a
//! mutex rather than assuming a single-threaded runtime.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{get_current_pid, Pid, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::admission::MemoryProbe;

/// Default retention window for log entries, in seconds.
pub const DEFAULT_LOG_WINDOW_SECS: u64 = 60;

/// Default sampling interval, in seconds.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 5;

/// Hard cap on buffered entries, independent of the time window.
const MAX_LOG_ENTRIES: usize = 4096;

const MB: f64 = 1024.0 * 1024.0;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// =============================================================================
// Snapshot Type
// =============================================================================

/// One point-in-time resource usage sample.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsage {
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,

    /// Process resident memory in MB
    pub rss_mb: f64,

    /// System-wide total memory in MB
    pub total_mb: f64,

    /// System-wide available memory in MB
    pub available_mb: f64,

    /// System memory usage as a percentage
    pub usage_percent: f64,

    /// CPU usage of this process as a percentage of one core
    pub process_cpu_percent: f64,
}

// =============================================================================
// System Probe
// =============================================================================

/// Live process/system metrics via `sysinfo`.
///
/// Doubles as the production [`MemoryProbe`] for admission control and as
/// the sample source for the resource log.
pub struct SystemProbe {
    state: Mutex<System>,
    pid: Option<Pid>,
}

impl SystemProbe {
    pub fn new() -> Self {
        let pid = match get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("cannot resolve own pid, admission control will not see process memory: {e}");
                None
            }
        };
        Self {
            state: Mutex::new(System::new()),
            pid,
        }
    }

    fn lock(&self) -> MutexGuard<'_, System> {
        // A poisoned lock only means a panic elsewhere; the System state is
        // still usable for sampling.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take a full resource usage sample.
    pub fn sample(&self) -> ResourceUsage {
        let mut sys = self.lock();
        sys.refresh_memory();

        let (rss, cpu) = match self.pid {
            Some(pid) => {
                sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                sys.process(pid)
                    .map(|p| (p.memory(), p.cpu_usage() as f64))
                    .unwrap_or((0, 0.0))
            }
            None => (0, 0.0),
        };

        let total = sys.total_memory();
        let available = sys.available_memory();
        let used_fraction = if total > 0 {
            1.0 - available as f64 / total as f64
        } else {
            0.0
        };

        ResourceUsage {
            timestamp: Utc::now(),
            rss_mb: round2(rss as f64 / MB),
            total_mb: round2(total as f64 / MB),
            available_mb: round2(available as f64 / MB),
            usage_percent: (used_fraction * 100.0).round(),
            process_cpu_percent: round2(cpu),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemProbe {
    fn process_memory_bytes(&self) -> u64 {
        let mut sys = self.lock();
        match self.pid {
            Some(pid) => {
                sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                sys.process(pid).map(|p| p.memory()).unwrap_or(0)
            }
            None => 0,
        }
    }
}

// =============================================================================
// Resource Log
// =============================================================================

/// Bounded, time-pruned ring buffer of resource samples.
pub struct ResourceLog {
    entries: Mutex<VecDeque<ResourceUsage>>,
    window: Duration,
}

impl ResourceLog {
    /// Create a log that retains entries for `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            window,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ResourceUsage>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a sample, pruning entries older than the retention window.
    pub fn append(&self, usage: ResourceUsage) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::seconds(60));

        let mut entries = self.lock();
        entries.push_back(usage);
        while let Some(front) = entries.front() {
            if front.timestamp < cutoff {
                entries.pop_front();
            } else {
                break;
            }
        }
        while entries.len() > MAX_LOG_ENTRIES {
            entries.pop_front();
        }
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<ResourceUsage> {
        self.lock().iter().cloned().collect()
    }

    /// Write the retained entries to a timestamped file under `dir`.
    ///
    /// Creates the directory if needed and returns the path written.
    pub fn save_to_file(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f");
        let path = dir.join(format!("resource-logs-{timestamp}.json"));

        let entries = self.snapshot();
        let mut file = std::fs::File::create(&path)?;
        for entry in &entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{line}")?;
        }

        info!(path = %path.display(), entries = entries.len(), "resource log saved");
        Ok(path)
    }
}

// =============================================================================
// Sampler Task
// =============================================================================

/// Spawn the periodic sampler.
///
/// Each tick takes a sample, logs it, and appends it to the ring buffer.
/// The task runs for the lifetime of the process.
pub fn spawn_sampler(
    probe: Arc<SystemProbe>,
    log: Arc<ResourceLog>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let usage = probe.sample();
            info!(
                rss_mb = usage.rss_mb,
                available_mb = usage.available_mb,
                usage_percent = usage.usage_percent,
                cpu_percent = usage.process_cpu_percent,
                "resource usage"
            );
            log.append(usage);
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
