/// Process lifecycle state machine.
///
///   NotStarted ──arrive──▶ Idle ──dispatch──▶ Running (CPU) / Blocked (SSD, USER)
///                           │                    │
///                           └──no resource──▶ Waiting ──admitted──┘
///
///   Running/Blocked ──conclude──▶ Idle (more instructions) | Completed
///
/// Instructions stay immutable data; whether the current one is in flight is
/// carried by the process state alone.
use serde::{Deserialize, Serialize};

use crate::events::DisplayState;
use crate::instruction::{Instruction, InstructionKind};
use crate::queues::{CpuPriority, QueueKind};
use crate::workload::{ProcessSpec, ProcessStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Arrival tick not reached yet.
    NotStarted,
    /// Arrived or just concluded an instruction; next one not dispatched yet.
    Idle,
    /// Sitting in an admission queue for its current instruction.
    Waiting,
    /// Current CPU instruction holds a core.
    Running,
    /// Current SSD or USER instruction is in flight.
    Blocked,
    /// Every instruction has concluded. Terminal.
    Completed,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::NotStarted => write!(f, "NotStarted"),
            ProcessState::Idle       => write!(f, "Idle"),
            ProcessState::Waiting    => write!(f, "Waiting"),
            ProcessState::Running    => write!(f, "Running"),
            ProcessState::Blocked    => write!(f, "Blocked"),
            ProcessState::Completed  => write!(f, "Completed"),
        }
    }
}

/// Which admission queue, if any, holds the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueMembership {
    #[default]
    None,
    Cpu(CpuPriority),
    Ssd,
}

impl QueueMembership {
    pub fn queue(self) -> Option<QueueKind> {
        match self {
            QueueMembership::None => None,
            QueueMembership::Cpu(p) => Some(QueueKind::Cpu(p)),
            QueueMembership::Ssd => Some(QueueKind::Ssd),
        }
    }
}

impl From<QueueKind> for QueueMembership {
    fn from(kind: QueueKind) -> Self {
        match kind {
            QueueKind::Cpu(p) => QueueMembership::Cpu(p),
            QueueKind::Ssd => QueueMembership::Ssd,
        }
    }
}

/// Simulation-time view of one process.
#[derive(Debug, Clone)]
pub struct Process {
    pub id: usize,
    pub arrival: u64,
    program: Vec<Instruction>,
    stats: ProcessStats,
    /// Index of the instruction executing or about to execute
    cursor: usize,
    /// Ticks spent on the current instruction since it was admitted
    elapsed: u64,
    last_concluded: Option<InstructionKind>,
    state: ProcessState,
    queue: QueueMembership,
}

impl Process {
    pub fn new(id: usize, spec: &ProcessSpec) -> Self {
        Process {
            id,
            arrival: spec.arrival,
            program: spec.instructions().to_vec(),
            stats: spec.stats(),
            cursor: 0,
            elapsed: 0,
            last_concluded: None,
            state: ProcessState::NotStarted,
            queue: QueueMembership::None,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn queue(&self) -> QueueMembership {
        self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn stats(&self) -> ProcessStats {
        self.stats
    }

    pub fn is_started(&self) -> bool {
        self.state != ProcessState::NotStarted
    }

    pub fn is_complete(&self) -> bool {
        self.state == ProcessState::Completed
    }

    /// Whether the current instruction holds its resource.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ProcessState::Running | ProcessState::Blocked)
    }

    /// Started, not complete, and the current instruction not in flight.
    pub fn needs_dispatch(&self) -> bool {
        matches!(self.state, ProcessState::Idle | ProcessState::Waiting)
    }

    pub fn is_queued(&self) -> bool {
        self.queue != QueueMembership::None
    }

    pub fn current(&self) -> Option<&Instruction> {
        self.program.get(self.cursor)
    }

    /// CPU queue this process belongs in if its current request must wait.
    pub fn cpu_priority(&self) -> CpuPriority {
        CpuPriority::after(self.last_concluded)
    }

    pub fn arrive(&mut self) {
        assert_eq!(self.state, ProcessState::NotStarted, "process {} arrived twice", self.id);
        self.state = ProcessState::Idle;
        self.last_concluded = None;
    }

    /// Record that the process now waits in `queue`.
    pub fn enqueue(&mut self, queue: QueueKind) {
        assert!(!self.is_queued(), "process {} queued twice", self.id);
        self.queue = queue.into();
        self.state = ProcessState::Waiting;
    }

    /// Admit the current instruction: CPU runs, SSD and USER block.
    /// Leaves whatever queue the process was in.
    pub fn admit(&mut self) {
        let kind = self
            .current()
            .map(|i| i.kind)
            .unwrap_or_else(|| panic!("process {} admitted past its program", self.id));
        self.state = match kind {
            InstructionKind::Cpu => ProcessState::Running,
            InstructionKind::Ssd | InstructionKind::User => ProcessState::Blocked,
        };
        self.queue = QueueMembership::None;
        self.elapsed = 0;
    }

    /// Count one tick on the active instruction. Returns true once it has run
    /// its full duration.
    pub fn tick(&mut self) -> bool {
        debug_assert!(self.is_active());
        self.elapsed += 1;
        self.current()
            .is_some_and(|i| i.is_finished_after(self.elapsed))
    }

    /// Finish the active instruction and move the cursor on.
    /// Returns the kind of the finished instruction so the caller can release
    /// its resource.
    pub fn conclude(&mut self) -> InstructionKind {
        assert!(self.is_active(), "process {} concluded while {}", self.id, self.state);
        let kind = self.program[self.cursor].kind;
        self.last_concluded = Some(kind);
        self.cursor += 1;
        self.elapsed = 0;
        self.state = if self.cursor == self.program.len() {
            ProcessState::Completed
        } else {
            ProcessState::Idle
        };
        kind
    }

    /// What a process table shows for this process. `None` before arrival.
    pub fn display_state(&self) -> Option<DisplayState> {
        match (self.state, self.queue) {
            (ProcessState::NotStarted, _) => None,
            (ProcessState::Completed, _) => Some(DisplayState::Terminated),
            (ProcessState::Running, _) => Some(DisplayState::Running),
            (ProcessState::Blocked, _) => Some(DisplayState::Blocked),
            (ProcessState::Waiting, QueueMembership::Ssd) => Some(DisplayState::Blocked),
            (ProcessState::Waiting, _) | (ProcessState::Idle, _) => Some(DisplayState::Ready),
        }
    }
}
