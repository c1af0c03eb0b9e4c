/// Live metrics for the TUI visualizer.
///
/// `LiveMetricsReporter` writes a JSON snapshot of the scheduler state at the
/// end of every tick. The viz binary polls the file and re-renders.
/// Writes are atomic (write to .tmp then rename) to avoid torn reads.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::events::{ProcessTerminated, Reporter, SimEvent};
use crate::queues::{CpuPriority, QueueKind};
use crate::simulator::Simulator;

pub const METRICS_PATH: &str = "/tmp/procsim_live.json";

/// One row of the live process table.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct ProcessRow {
    pub id: usize,
    /// "NOT ARRIVED" | "TERMINATED" | "RUNNING" | "READY" | "BLOCKED"
    pub state: String,
    /// Kind of the current instruction, empty once terminated
    pub current: String,
    /// Instructions concluded so far
    pub cursor: usize,
    pub program_len: usize,
    /// Ticks spent on the current instruction
    pub elapsed: u64,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct LiveMetrics {
    /// "idle" | "running" | "complete"
    pub status: String,
    pub workload: String,
    pub drain_policy: String,
    /// Last simulated tick
    pub tick: u64,
    pub total_cores: usize,
    pub free_cores: usize,
    pub ssd_busy: bool,
    pub high_queue: Vec<usize>,
    pub low_queue: Vec<usize>,
    pub ssd_queue: Vec<usize>,
    pub processes: Vec<ProcessRow>,
    pub terminated: usize,
    /// Most recent termination (if any)
    #[serde(default)]
    pub last_termination: Option<ProcessTerminated>,
    /// Unix timestamp in ms when this snapshot was written
    pub timestamp_ms: u64,
}

impl LiveMetrics {
    /// Capture the state of `sim` after its most recent tick.
    pub fn capture(sim: &Simulator, workload: &str) -> Self {
        let queues = sim.queues();
        let processes: Vec<ProcessRow> = sim
            .processes()
            .iter()
            .map(|p| ProcessRow {
                id: p.id,
                state: p
                    .display_state()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "NOT ARRIVED".to_string()),
                current: p.current().map(|i| i.kind.to_string()).unwrap_or_default(),
                cursor: p.cursor(),
                program_len: p.program().len(),
                elapsed: p.elapsed(),
            })
            .collect();
        let terminated = sim.processes().iter().filter(|p| p.is_complete()).count();

        LiveMetrics {
            status: (if sim.is_finished() { "complete" } else { "running" }).to_string(),
            workload: workload.to_string(),
            drain_policy: sim.config().drain_policy.name().to_string(),
            tick: sim.clock().saturating_sub(1),
            total_cores: sim.arbiter().total_cores(),
            free_cores: sim.arbiter().free_cores(),
            ssd_busy: sim.arbiter().ssd_busy(),
            high_queue: queues.snapshot(QueueKind::Cpu(CpuPriority::High)),
            low_queue: queues.snapshot(QueueKind::Cpu(CpuPriority::Low)),
            ssd_queue: queues.snapshot(QueueKind::Ssd),
            processes,
            terminated,
            last_termination: None,
            timestamp_ms: now_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Publishes a snapshot to `path` after every tick.
pub struct LiveMetricsReporter {
    path: PathBuf,
    workload: String,
    last_termination: Option<ProcessTerminated>,
}

impl LiveMetricsReporter {
    pub fn new(path: impl Into<PathBuf>, workload: impl Into<String>) -> Self {
        LiveMetricsReporter {
            path: path.into(),
            workload: workload.into(),
            last_termination: None,
        }
    }
}

impl Reporter for LiveMetricsReporter {
    fn on_event(&mut self, event: &SimEvent) {
        if let SimEvent::Terminated(t) = event {
            self.last_termination = Some(*t);
        }
    }

    fn on_tick(&mut self, sim: &Simulator) {
        let mut m = LiveMetrics::capture(sim, &self.workload);
        m.last_termination = self.last_termination;
        write_metrics_to(&self.path, &m);
    }
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

/// Atomically write metrics to `path`.
/// Uses a .tmp intermediate file + rename to avoid torn reads by the viz.
pub fn write_metrics_to(path: &Path, metrics: &LiveMetrics) {
    let json = match serde_json::to_string(metrics) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("cannot serialize live metrics: {}", e);
            return;
        }
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = std::fs::write(&tmp, &json).and_then(|_| std::fs::rename(&tmp, path)) {
        log::debug!("cannot publish live metrics to {}: {}", path.display(), e);
    }
}

/// Read the latest metrics snapshot. Returns None if the file doesn't exist
/// or can't be parsed (e.g. no simulation has run yet).
pub fn read_metrics_from(path: &Path) -> Option<LiveMetrics> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Returns current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
