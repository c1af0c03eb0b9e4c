/// Tick-driven simulation engine.
///
/// Each tick visits processes in ascending id order and, for each one:
///   1. arrival: mark it started when its arrival tick comes up
///   2. progress: count a tick on the active instruction, conclude it once
///      its duration is reached
///   3. dispatch: try to start the current instruction if none is in flight
///      (possibly the one after an instruction that concluded in step 2 of
///      the same tick)
/// then drains the CPU admission queues once and advances the clock.
/// The run ends after the tick in which the last process completes.
use log::{debug, info, trace};

use crate::arbiter::ResourceArbiter;
use crate::config::{DrainPolicy, SimConfig};
use crate::events::{
    AdmissionSource, ProcessTableEntry, ProcessTableSnapshot, ProcessTerminated, Reporter,
    SimEvent,
};
use crate::instruction::InstructionKind;
use crate::process::{Process, ProcessState};
use crate::queues::{AdmissionQueues, QueueKind, Turn};
use crate::workload::Workload;

/// Output of a complete run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Tick in which the last process completed
    pub final_tick: u64,
    pub events: Vec<SimEvent>,
}

impl RunSummary {
    pub fn terminations(&self) -> impl Iterator<Item = &ProcessTerminated> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Terminated(t) => Some(t),
            _ => None,
        })
    }
}

pub struct Simulator {
    config: SimConfig,
    processes: Vec<Process>,
    arbiter: ResourceArbiter,
    queues: AdmissionQueues,
    /// The tick the next call to `step` will simulate
    clock: u64,
}

impl Simulator {
    pub fn new(workload: &Workload) -> Self {
        Self::with_config(workload, SimConfig::default())
    }

    pub fn with_config(workload: &Workload, config: SimConfig) -> Self {
        let processes = workload
            .processes()
            .iter()
            .enumerate()
            .map(|(id, spec)| Process::new(id, spec))
            .collect();

        Simulator {
            config,
            processes,
            arbiter: ResourceArbiter::new(workload.cores()),
            queues: AdmissionQueues::new(),
            clock: 0,
        }
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn arbiter(&self) -> &ResourceArbiter {
        &self.arbiter
    }

    pub fn queues(&self) -> &AdmissionQueues {
        &self.queues
    }

    pub fn is_finished(&self) -> bool {
        self.processes.iter().all(Process::is_complete)
    }

    /// Run to completion, collecting every event.
    pub fn run(&mut self) -> RunSummary {
        let mut events: Vec<SimEvent> = Vec::new();
        let final_tick = self.run_with(&mut events);
        RunSummary { final_tick, events }
    }

    /// Run to completion, streaming events into `reporter`.
    /// Returns the tick in which the last process completed.
    pub fn run_with(&mut self, reporter: &mut dyn Reporter) -> u64 {
        info!(
            "[procsim] starting: {} processes, {} cores, drain={}",
            self.processes.len(),
            self.arbiter.total_cores(),
            self.config.drain_policy.name(),
        );

        loop {
            let events = self.step();
            for event in &events {
                reporter.on_event(event);
            }
            reporter.on_tick(self);
            if self.is_finished() {
                break;
            }
        }

        let final_tick = self.clock - 1;
        info!("[procsim] all processes terminated at tick {}", final_tick);
        final_tick
    }

    /// Simulate one tick and return the events it produced.
    pub fn step(&mut self) -> Vec<SimEvent> {
        let tick = self.clock;
        let mut out = Vec::new();

        for id in 0..self.processes.len() {
            let p = &mut self.processes[id];

            if p.state() == ProcessState::NotStarted && p.arrival == tick {
                p.arrive();
                debug!("tick {}: process {} arrived", tick, id);
                out.push(SimEvent::Arrived { tick, id });
            }

            if p.is_active() && p.tick() {
                self.conclude(id, tick, &mut out);
            }

            if self.processes[id].needs_dispatch() {
                self.dispatch(id, tick, &mut out);
            }
        }

        self.drain(tick, &mut out);

        if cfg!(debug_assertions) {
            self.check_invariants();
        }

        self.clock += 1;
        out
    }

    // -----------------------------------------------------------------------
    // Per-process transitions
    // -----------------------------------------------------------------------

    fn conclude(&mut self, id: usize, tick: u64, out: &mut Vec<SimEvent>) {
        let kind = self.processes[id].conclude();
        match kind {
            InstructionKind::Cpu => self.arbiter.release_core(),
            InstructionKind::Ssd => self.arbiter.release_ssd(),
            InstructionKind::User => {}
        }
        debug!("tick {}: process {} finished {}", tick, id, kind);
        out.push(SimEvent::InstructionConcluded { tick, id, kind });

        let p = &self.processes[id];
        if p.is_complete() {
            let stats = p.stats();
            info!("tick {}: process {} terminated", tick, id);
            out.push(SimEvent::Terminated(ProcessTerminated {
                id,
                completion_tick: tick,
                cpu_ticks_used: stats.cpu_ticks,
                ssd_access_count: stats.ssd_accesses,
                user_interaction_count: stats.user_interactions,
            }));
            out.push(SimEvent::Snapshot(self.process_table(tick)));
        }
    }

    fn dispatch(&mut self, id: usize, tick: u64, out: &mut Vec<SimEvent>) {
        let p = &self.processes[id];
        let Some(kind) = p.current().map(|i| i.kind) else {
            unreachable!("process {} dispatched with no instruction left", id);
        };

        match kind {
            InstructionKind::Cpu => {
                let turn = if self.arbiter.has_free_core() {
                    self.queues.cpu_turn(id)
                } else {
                    None
                };
                let wait_in = QueueKind::Cpu(p.cpu_priority());
                self.admit_or_wait(id, tick, turn, wait_in, out);
            }
            InstructionKind::Ssd => {
                let turn = if self.arbiter.ssd_busy() {
                    None
                } else {
                    self.queues.ssd_turn(id)
                };
                self.admit_or_wait(id, tick, turn, QueueKind::Ssd, out);
            }
            InstructionKind::User => self.admit(id, tick, AdmissionSource::Direct, out),
        }
    }

    fn admit_or_wait(
        &mut self,
        id: usize,
        tick: u64,
        turn: Option<Turn>,
        wait_in: QueueKind,
        out: &mut Vec<SimEvent>,
    ) {
        match turn {
            Some(Turn::Open) => self.admit(id, tick, AdmissionSource::Direct, out),
            Some(Turn::Front(queue)) => {
                let popped = self.queues.pop(queue);
                debug_assert_eq!(popped, Some(id));
                self.admit(id, tick, AdmissionSource::QueueFront(queue), out);
            }
            None if !self.processes[id].is_queued() => {
                self.queues.push(wait_in, id);
                self.processes[id].enqueue(wait_in);
                debug!("tick {}: process {} waits in {}", tick, id, wait_in);
                out.push(SimEvent::Enqueued {
                    tick,
                    id,
                    queue: wait_in,
                });
            }
            None => {}
        }
    }

    fn admit(&mut self, id: usize, tick: u64, source: AdmissionSource, out: &mut Vec<SimEvent>) {
        let p = &mut self.processes[id];
        let Some(kind) = p.current().map(|i| i.kind) else {
            unreachable!("process {} admitted with no instruction left", id);
        };
        match kind {
            InstructionKind::Cpu => self.arbiter.acquire_core(),
            InstructionKind::Ssd => self.arbiter.acquire_ssd(),
            InstructionKind::User => {}
        }
        p.admit();
        debug!("tick {}: process {} started {} ({:?})", tick, id, kind, source);
        out.push(SimEvent::InstructionStarted {
            tick,
            id,
            kind,
            source,
        });
    }

    // -----------------------------------------------------------------------
    // Queue drain
    // -----------------------------------------------------------------------

    /// Move waiting CPU requests onto free cores, high queue first.
    fn drain(&mut self, tick: u64, out: &mut Vec<SimEvent>) {
        let limit = match self.config.drain_policy {
            DrainPolicy::SinglePerTick => 1,
            DrainPolicy::AllFreeCores => usize::MAX,
        };

        let mut admitted = 0;
        while admitted < limit && self.arbiter.has_free_core() {
            let Some((priority, id)) = self.queues.drain_candidate() else {
                break;
            };
            let state = self.processes[id].state();
            if matches!(state, ProcessState::Running | ProcessState::Completed) {
                trace!("tick {}: drain skipped process {} ({})", tick, id, state);
                break;
            }
            self.queues.pop(QueueKind::Cpu(priority));
            self.admit(id, tick, AdmissionSource::Drain(priority), out);
            admitted += 1;
        }
        trace!(
            "tick {}: drain admitted {}, {} cores free",
            tick,
            admitted,
            self.arbiter.free_cores()
        );
    }

    // -----------------------------------------------------------------------
    // Reporting & invariants
    // -----------------------------------------------------------------------

    pub fn process_table(&self, tick: u64) -> ProcessTableSnapshot {
        ProcessTableSnapshot {
            tick,
            entries: self
                .processes
                .iter()
                .map(|p| ProcessTableEntry {
                    id: p.id,
                    state: p.display_state(),
                })
                .collect(),
        }
    }

    /// Panic if the shared resource bookkeeping has drifted from the
    /// process states. Runs after every tick in debug builds.
    pub fn check_invariants(&self) {
        let running = self
            .processes
            .iter()
            .filter(|p| p.state() == ProcessState::Running)
            .count();
        assert_eq!(
            self.arbiter.free_cores() + running,
            self.arbiter.total_cores(),
            "core accounting broken at tick {}",
            self.clock
        );

        let ssd_holders = self
            .processes
            .iter()
            .filter(|p| {
                p.state() == ProcessState::Blocked
                    && p.current().is_some_and(|i| i.kind == InstructionKind::Ssd)
            })
            .count();
        assert!(ssd_holders <= 1, "{} processes hold the SSD", ssd_holders);
        assert_eq!(
            self.arbiter.ssd_busy(),
            ssd_holders == 1,
            "SSD flag disagrees with holders at tick {}",
            self.clock
        );

        for p in &self.processes {
            let queues = self.queues.memberships(p.id);
            assert!(
                queues.len() <= 1,
                "process {} is in several queues: {:?}",
                p.id,
                queues
            );
            assert_eq!(
                queues.first().copied(),
                p.queue().queue(),
                "process {} queue membership out of sync",
                p.id
            );
            assert_eq!(
                p.state() == ProcessState::Waiting,
                p.is_queued(),
                "process {} is {} with membership {:?}",
                p.id,
                p.state(),
                p.queue()
            );
            assert!(p.cursor() <= p.program().len());
            assert_eq!(p.is_complete(), p.cursor() == p.program().len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;
    use crate::queues::CpuPriority;
    use crate::workload::ProcessSpec;

    fn workload(cores: usize, procs: Vec<(u64, Vec<Instruction>)>) -> Workload {
        Workload::new(
            cores,
            procs
                .into_iter()
                .map(|(arrival, program)| ProcessSpec::new(arrival, program).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn instruction_chain_has_no_gap() {
        // CPU 2 then USER 3: USER starts in the tick CPU concludes.
        let w = workload(1, vec![(0, vec![Instruction::cpu(2), Instruction::user(3)])]);
        let summary = Simulator::new(&w).run();
        assert!(summary.events.contains(&SimEvent::InstructionStarted {
            tick: 2,
            id: 0,
            kind: InstructionKind::User,
            source: AdmissionSource::Direct,
        }));
        assert_eq!(summary.final_tick, 5);
    }

    #[test]
    fn late_arrival() {
        let w = workload(1, vec![(4, vec![Instruction::cpu(1)])]);
        let summary = Simulator::new(&w).run();
        assert_eq!(summary.events[0], SimEvent::Arrived { tick: 4, id: 0 });
        assert_eq!(summary.final_tick, 5);
    }

    #[test]
    fn ssd_waits_for_slot() {
        let w = workload(
            2,
            vec![
                (0, vec![Instruction::ssd(3)]),
                (0, vec![Instruction::ssd(2)]),
            ],
        );
        let mut sim = Simulator::new(&w);
        let first = sim.step();
        assert!(first.contains(&SimEvent::Enqueued {
            tick: 0,
            id: 1,
            queue: QueueKind::Ssd,
        }));
        assert!(sim.arbiter().ssd_busy());

        let summary = sim.run();
        let done: Vec<(usize, u64)> = summary
            .terminations()
            .map(|t| (t.id, t.completion_tick))
            .collect();
        assert_eq!(done, vec![(0, 3), (1, 5)]);
    }

    #[test]
    fn user_is_never_contended() {
        let w = workload(
            1,
            vec![
                (0, vec![Instruction::user(2)]),
                (0, vec![Instruction::user(2)]),
                (0, vec![Instruction::user(2)]),
            ],
        );
        let summary = Simulator::new(&w).run();
        assert!(summary.terminations().all(|t| t.completion_tick == 2));
    }

    #[test]
    fn free_core_does_not_bypass_queue() {
        // Process 1 waits in the high queue. When process 0 frees a core and
        // immediately asks for another CPU burst, it must queue behind 1.
        let w = workload(
            1,
            vec![
                (0, vec![Instruction::cpu(2), Instruction::cpu(1)]),
                (0, vec![Instruction::cpu(1)]),
            ],
        );
        let mut sim = Simulator::new(&w);
        sim.step();
        sim.step();
        let t2 = sim.step();
        assert!(t2.contains(&SimEvent::Enqueued {
            tick: 2,
            id: 0,
            queue: QueueKind::Cpu(CpuPriority::High),
        }));
        assert!(t2.contains(&SimEvent::InstructionStarted {
            tick: 2,
            id: 1,
            kind: InstructionKind::Cpu,
            source: AdmissionSource::QueueFront(QueueKind::Cpu(CpuPriority::High)),
        }));
    }

    #[test]
    fn free_ssd_slot_still_serves_queue_front() {
        // Process 2 queues for the SSD at tick 1. At tick 2 process 1 finds the
        // slot free but must queue behind it.
        let w = workload(
            1,
            vec![
                (0, vec![Instruction::ssd(2)]),
                (0, vec![Instruction::cpu(2), Instruction::ssd(1)]),
                (1, vec![Instruction::ssd(1)]),
            ],
        );
        let mut sim = Simulator::new(&w);
        sim.step();
        sim.step();
        let t2 = sim.step();
        assert!(!t2.iter().any(|e| matches!(
            e,
            SimEvent::InstructionStarted { id: 1, kind: InstructionKind::Ssd, .. }
        )));
        assert!(t2.contains(&SimEvent::Enqueued {
            tick: 2,
            id: 1,
            queue: QueueKind::Ssd,
        }));
        assert!(t2.contains(&SimEvent::InstructionStarted {
            tick: 2,
            id: 2,
            kind: InstructionKind::Ssd,
            source: AdmissionSource::QueueFront(QueueKind::Ssd),
        }));

        let summary = sim.run();
        assert!(summary.events.contains(&SimEvent::InstructionStarted {
            tick: 4,
            id: 1,
            kind: InstructionKind::Ssd,
            source: AdmissionSource::QueueFront(QueueKind::Ssd),
        }));
        let done: Vec<(usize, u64)> = summary
            .terminations()
            .map(|t| (t.id, t.completion_tick))
            .collect();
        assert_eq!(done, vec![(2, 3), (1, 5)]);
    }

    #[test]
    fn termination_carries_snapshot() {
        let w = workload(
            1,
            vec![
                (0, vec![Instruction::cpu(1)]),
                (0, vec![Instruction::cpu(5)]),
                (9, vec![Instruction::user(1)]),
            ],
        );
        let mut sim = Simulator::new(&w);
        sim.step();
        let events = sim.step();
        let snapshot = events
            .iter()
            .find_map(|e| match e {
                SimEvent::Snapshot(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        use crate::events::DisplayState::*;
        let states: Vec<_> = snapshot.entries.iter().map(|e| e.state).collect();
        // Process 1 is visited after process 0 terminates, so it still shows
        // as waiting in this tick's table.
        assert_eq!(states, vec![Some(Terminated), Some(Ready), None]);
    }
}
