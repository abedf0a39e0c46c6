//! Service lifecycle state machine
//!
//! `start` and `stop` on the crawler service must be idempotent and safe
//! against concurrent calls. Instead of a bare boolean behind a mutex,
//! the phase is an explicit enum so illegal overlaps (two starts racing,
//! stop during startup) resolve deterministically.

use std::sync::Mutex;

/// Phase of the crawler service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePhase {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Mutex-guarded lifecycle phase with compare-and-advance operations
///
/// Each `begin_*` method atomically checks the current phase and advances
/// it, returning false when the call is a no-op (already started/stopped
/// or a concurrent caller got there first).
#[derive(Debug)]
pub struct Lifecycle {
    phase: Mutex<ServicePhase>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(ServicePhase::Stopped),
        }
    }

    /// Current phase snapshot
    pub fn phase(&self) -> ServicePhase {
        *self.phase.lock().unwrap()
    }

    /// True while the service is starting or running
    pub fn is_running(&self) -> bool {
        matches!(self.phase(), ServicePhase::Starting | ServicePhase::Running)
    }

    /// Attempts `Stopped -> Starting`; false if the service already left Stopped
    pub fn begin_start(&self) -> bool {
        let mut phase = self.phase.lock().unwrap();
        if *phase != ServicePhase::Stopped {
            return false;
        }
        *phase = ServicePhase::Starting;
        true
    }

    /// Marks startup complete (`Starting -> Running`)
    pub fn mark_running(&self) {
        let mut phase = self.phase.lock().unwrap();
        if *phase == ServicePhase::Starting {
            *phase = ServicePhase::Running;
        }
    }

    /// Attempts `Running -> Stopping`; false if not currently running
    pub fn begin_stop(&self) -> bool {
        let mut phase = self.phase.lock().unwrap();
        if *phase != ServicePhase::Running {
            return false;
        }
        *phase = ServicePhase::Stopping;
        true
    }

    /// Marks shutdown complete (`Stopping -> Stopped`)
    pub fn mark_stopped(&self) {
        let mut phase = self.phase.lock().unwrap();
        if *phase == ServicePhase::Stopping {
            *phase = ServicePhase::Stopped;
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
