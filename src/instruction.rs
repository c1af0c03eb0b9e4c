/// Instructions: the steps of a process's fixed program.
/// Each instruction names the resource it needs and how many ticks it holds it.
use serde::{Deserialize, Serialize};

/// The resource an instruction occupies while it executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstructionKind {
    /// A CPU burst. Holds one core from the shared pool.
    Cpu,
    /// An SSD access. Holds the single device slot.
    Ssd,
    /// A user interaction. No shared resource, never contended.
    User,
}

impl InstructionKind {
    /// Parse a workload keyword (`CPU`, `SSD`, `USER`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "CPU" => Some(InstructionKind::Cpu),
            "SSD" => Some(InstructionKind::Ssd),
            "USER" => Some(InstructionKind::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstructionKind::Cpu  => write!(f, "CPU"),
            InstructionKind::Ssd  => write!(f, "SSD"),
            InstructionKind::User => write!(f, "USER"),
        }
    }
}

/// One step of a process program. Immutable once the workload is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub kind: InstructionKind,
    /// Ticks the instruction holds its resource once admitted
    pub duration: u64,
}

impl Instruction {
    pub fn new(kind: InstructionKind, duration: u64) -> Self {
        Instruction { kind, duration }
    }

    pub fn cpu(duration: u64) -> Self {
        Self::new(InstructionKind::Cpu, duration)
    }

    pub fn ssd(duration: u64) -> Self {
        Self::new(InstructionKind::Ssd, duration)
    }

    pub fn user(duration: u64) -> Self {
        Self::new(InstructionKind::User, duration)
    }

    /// Whether `elapsed` ticks are enough to finish this instruction.
    /// Zero-length instructions still occupy their resource for one tick.
    pub fn is_finished_after(&self, elapsed: u64) -> bool {
        elapsed >= self.duration
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.duration)
    }
}
