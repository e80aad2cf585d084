//! Admission control under memory pressure.
//!
//! Conversions hold decoded rasters and native codec state in memory, so the
//! server refuses new work outright once process memory crosses a configured
//! budget (default 512 MB). The check runs before any file bytes are read or
//! parsed, and the service never retries on the client's behalf; a 503 tells
//! the caller to come back later.
//!
//! The memory reading goes through the [`MemoryProbe`] trait so tests can
//! simulate pressure without allocating anything.

use std::sync::Arc;

use tracing::warn;

use crate::error::AdmissionError;

/// Default memory budget in megabytes.
pub const DEFAULT_MEMORY_BUDGET_MB: u64 = 512;

/// Source of the current process memory usage.
pub trait MemoryProbe: Send + Sync {
    /// Resident memory of this process, in bytes.
    fn process_memory_bytes(&self) -> u64;
}

/// Rejects incoming work when process memory exceeds the budget.
pub struct AdmissionController<P: MemoryProbe> {
    probe: Arc<P>,
    budget_bytes: u64,
}

impl<P: MemoryProbe> AdmissionController<P> {
    /// Create a controller with the given probe and budget in bytes.
    pub fn new(probe: Arc<P>, budget_bytes: u64) -> Self {
        Self { probe, budget_bytes }
    }

    /// The configured budget in bytes.
    pub fn budget_bytes(&self) -> u64 {
        self.budget_bytes
    }

    /// Admit or reject new work based on a point-in-time memory sample.
    pub fn check(&self) -> Result<(), AdmissionError> {
        let used_bytes = self.probe.process_memory_bytes();
        if used_bytes > self.budget_bytes {
            warn!(
                used_mb = used_bytes / (1024 * 1024),
                budget_mb = self.budget_bytes / (1024 * 1024),
                "rejecting request: memory over budget"
            );
            return Err(AdmissionError::OverBudget {
                used_bytes,
                budget_bytes: self.budget_bytes,
            });
        }
        Ok(())
    }
}

impl<P: MemoryProbe> Clone for AdmissionController<P> {
    fn clone(&self) -> Self {
        Self {
            probe: Arc::clone(&self.probe),
            budget_bytes: self.budget_bytes,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
