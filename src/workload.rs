/// Workload definitions and loaders.
///
/// A workload is the core count plus an ordered list of processes, each with
/// an arrival tick and a fixed program. Two on-disk formats are accepted:
///
///   Token stream (whitespace separated):
///     <header> <cores>
///     NEW <arrival>  CPU <d>  SSD <d>  USER <d> ...
///     NEW <arrival>  ...
///     END
///
///   JSON: `{ "cores": 2, "processes": [{ "arrival": 0, "instructions": [...] }] }`
///
/// Both go through the same validation, so a `Workload` value is always
/// runnable.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkloadError};
use crate::instruction::{Instruction, InstructionKind};

/// Per-process totals reported at termination.
/// Derived from the program once; never touched by the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Sum of all CPU burst durations
    pub cpu_ticks: u64,
    /// Number of SSD instructions
    pub ssd_accesses: u32,
    /// Number of USER instructions
    pub user_interactions: u32,
}

impl ProcessStats {
    /// `None` when a total does not fit its counter.
    fn from_program(instructions: &[Instruction]) -> Option<Self> {
        instructions
            .iter()
            .try_fold(ProcessStats::default(), |mut acc, i| {
                match i.kind {
                    InstructionKind::Cpu => {
                        acc.cpu_ticks = acc.cpu_ticks.checked_add(i.duration)?
                    }
                    InstructionKind::Ssd => {
                        acc.ssd_accesses = acc.ssd_accesses.checked_add(1)?
                    }
                    InstructionKind::User => {
                        acc.user_interactions = acc.user_interactions.checked_add(1)?
                    }
                }
                Some(acc)
            })
    }
}

/// A process as described by the workload: when it arrives and what it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub arrival: u64,
    instructions: Vec<Instruction>,
    stats: ProcessStats,
}

impl ProcessSpec {
    /// Fails when the program's totals overflow, e.g. CPU bursts summing past
    /// `u64::MAX`.
    pub fn new(arrival: u64, instructions: Vec<Instruction>) -> Result<Self> {
        let stats = ProcessStats::from_program(&instructions)
            .ok_or_else(|| WorkloadError::config("total CPU time overflows"))?;
        Ok(ProcessSpec {
            arrival,
            instructions,
            stats,
        })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn stats(&self) -> ProcessStats {
        self.stats
    }
}

/// A validated workload. Process ids are positions in `processes()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WorkloadDef", into = "WorkloadDef")]
pub struct Workload {
    cores: usize,
    processes: Vec<ProcessSpec>,
}

impl Workload {
    /// Build a workload, rejecting configurations the simulator cannot run:
    /// no cores, no processes, or a process with an empty program.
    pub fn new(cores: usize, processes: Vec<ProcessSpec>) -> Result<Self> {
        if cores == 0 {
            return Err(WorkloadError::config("core count must be at least 1"));
        }
        if processes.is_empty() {
            return Err(WorkloadError::config("workload defines no processes"));
        }
        if let Some(id) = processes.iter().position(|p| p.instructions.is_empty()) {
            return Err(WorkloadError::config(format!(
                "process {} has no instructions",
                id
            )));
        }
        Ok(Workload { cores, processes })
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    pub fn processes(&self) -> &[ProcessSpec] {
        &self.processes
    }

    /// Parse the token-stream format.
    pub fn parse(input: &str) -> Result<Self> {
        let mut tokens = input.split_whitespace();

        // The header word carries no information.
        tokens
            .next()
            .ok_or_else(|| WorkloadError::malformed("<eof>", "missing header"))?;
        let cores_tok = tokens
            .next()
            .ok_or_else(|| WorkloadError::malformed("<eof>", "missing core count"))?;
        let cores = cores_tok
            .parse::<usize>()
            .map_err(|_| WorkloadError::malformed(cores_tok, "core count is not an integer"))?;

        let mut processes: Vec<ProcessSpec> = Vec::new();
        // (arrival, program) of the record currently being read
        let mut open: Option<(u64, Vec<Instruction>)> = None;

        loop {
            let tok = tokens
                .next()
                .ok_or_else(|| WorkloadError::malformed("<eof>", "missing END"))?;

            match tok {
                "END" => break,
                "NEW" => {
                    let arrival = parse_number(tokens.next(), "arrival time is not an integer")?;
                    if let Some((arrival, program)) = open.take() {
                        processes.push(ProcessSpec::new(arrival, program)?);
                    }
                    open = Some((arrival, Vec::new()));
                }
                keyword => {
                    let kind = InstructionKind::from_keyword(keyword).ok_or_else(|| {
                        WorkloadError::malformed(keyword, "unknown instruction keyword")
                    })?;
                    let duration = parse_number(tokens.next(), "duration is not an integer")?;
                    let (_, program) = open.as_mut().ok_or_else(|| {
                        WorkloadError::malformed(keyword, "instruction before any NEW")
                    })?;
                    program.push(Instruction::new(kind, duration));
                }
            }
        }

        if let Some((arrival, program)) = open {
            processes.push(ProcessSpec::new(arrival, program)?);
        }

        Workload::new(cores, processes)
    }

    /// Parse the JSON format.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a workload file. `.json` files use the JSON format, anything else
    /// the token stream.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| WorkloadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::parse(&text)
        }
    }
}

fn parse_number(tok: Option<&str>, reason: &'static str) -> Result<u64> {
    let tok = tok.ok_or_else(|| WorkloadError::malformed("<eof>", reason))?;
    tok.parse::<u64>()
        .map_err(|_| WorkloadError::malformed(tok, reason))
}

impl std::fmt::Display for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cores: {}", self.cores)?;
        for (id, p) in self.processes.iter().enumerate() {
            writeln!(f, "Process {}", id)?;
            writeln!(f, "Start Time: {}", p.arrival)?;
            for i in &p.instructions {
                writeln!(f, "{}", i)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Serde mirror
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct WorkloadDef {
    cores: usize,
    processes: Vec<ProcessDef>,
}

#[derive(Serialize, Deserialize)]
struct ProcessDef {
    arrival: u64,
    instructions: Vec<Instruction>,
}

impl TryFrom<WorkloadDef> for Workload {
    type Error = WorkloadError;

    fn try_from(def: WorkloadDef) -> Result<Self> {
        let processes = def
            .processes
            .into_iter()
            .map(|p| ProcessSpec::new(p.arrival, p.instructions))
            .collect::<Result<Vec<_>>>()?;
        Workload::new(def.cores, processes)
    }
}

impl From<Workload> for WorkloadDef {
    fn from(w: Workload) -> Self {
        WorkloadDef {
            cores: w.cores,
            processes: w
                .processes
                .into_iter()
                .map(|p| ProcessDef {
                    arrival: p.arrival,
                    instructions: p.instructions,
                })
                .collect(),
        }
    }
}
