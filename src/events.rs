/// Events emitted by the simulator, and the reporter seam that consumes them.
///
/// The event stream is the simulation's observable output: a deterministic
/// trace of every transition plus the termination records and process tables
/// a console renderer prints.
use serde::{Deserialize, Serialize};

use crate::instruction::InstructionKind;
use crate::queues::{CpuPriority, QueueKind};
use crate::simulator::Simulator;

/// State shown for a process in a process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayState {
    Terminated,
    Running,
    Ready,
    Blocked,
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayState::Terminated => write!(f, "TERMINATED"),
            DisplayState::Running    => write!(f, "RUNNING"),
            DisplayState::Ready      => write!(f, "READY"),
            DisplayState::Blocked    => write!(f, "BLOCKED"),
        }
    }
}

/// Termination record for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTerminated {
    pub id: usize,
    /// Tick at which the last instruction concluded
    pub completion_tick: u64,
    pub cpu_ticks_used: u64,
    pub ssd_access_count: u32,
    pub user_interaction_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTableEntry {
    pub id: usize,
    /// `None` while the process has not arrived yet
    pub state: Option<DisplayState>,
}

/// Every process's display state, in id order, taken when a process
/// terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTableSnapshot {
    pub tick: u64,
    pub entries: Vec<ProcessTableEntry>,
}

/// How an instruction got its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionSource {
    /// Nothing was waiting; admitted on its own dispatch attempt.
    Direct,
    /// Was the eligible front of a queue on its own dispatch attempt.
    QueueFront(QueueKind),
    /// Pulled from a CPU queue by the end-of-tick drain.
    Drain(CpuPriority),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    Arrived {
        tick: u64,
        id: usize,
    },
    InstructionStarted {
        tick: u64,
        id: usize,
        kind: InstructionKind,
        source: AdmissionSource,
    },
    Enqueued {
        tick: u64,
        id: usize,
        queue: QueueKind,
    },
    InstructionConcluded {
        tick: u64,
        id: usize,
        kind: InstructionKind,
    },
    Terminated(ProcessTerminated),
    Snapshot(ProcessTableSnapshot),
}

/// Consumer of simulation output.
pub trait Reporter {
    /// Called for every event, in emission order.
    fn on_event(&mut self, event: &SimEvent);

    /// Called once at the end of every tick, after the queue drain.
    fn on_tick(&mut self, _sim: &Simulator) {}
}

/// Collects the full trace.
impl Reporter for Vec<SimEvent> {
    fn on_event(&mut self, event: &SimEvent) {
        self.push(event.clone());
    }
}

/// Feeds both reporters, left first.
impl<A: Reporter, B: Reporter> Reporter for (A, B) {
    fn on_event(&mut self, event: &SimEvent) {
        self.0.on_event(event);
        self.1.on_event(event);
    }

    fn on_tick(&mut self, sim: &Simulator) {
        self.0.on_tick(sim);
        self.1.on_tick(sim);
    }
}

/// A disabled reporter ignores everything.
impl<R: Reporter> Reporter for Option<R> {
    fn on_event(&mut self, event: &SimEvent) {
        if let Some(r) = self {
            r.on_event(event);
        }
    }

    fn on_tick(&mut self, sim: &Simulator) {
        if let Some(r) = self {
            r.on_tick(sim);
        }
    }
}
