//! End-to-end scheduling scenarios: completion times, contention on a single
//! core, SSD-driven demotion, the one-per-tick queue drain, and determinism.

use pretty_assertions::assert_eq;

use procsim::config::{DrainPolicy, SimConfig};
use procsim::events::{AdmissionSource, SimEvent};
use procsim::instruction::{Instruction, InstructionKind};
use procsim::queues::{CpuPriority, QueueKind};
use procsim::report::ConsoleReporter;
use procsim::simulator::{RunSummary, Simulator};
use procsim::workload::{ProcessSpec, Workload};

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

fn completions(summary: &RunSummary) -> Vec<(usize, u64)> {
    let mut done: Vec<(usize, u64)> = summary
        .terminations()
        .map(|t| (t.id, t.completion_tick))
        .collect();
    done.sort();
    done
}

fn cpu_start_tick(summary: &RunSummary, id: usize) -> u64 {
    summary
        .events
        .iter()
        .find_map(|e| match e {
            SimEvent::InstructionStarted {
                tick,
                id: pid,
                kind: InstructionKind::Cpu,
                ..
            } if *pid == id => Some(*tick),
            _ => None,
        })
        .unwrap()
}

#[test]
fn lone_cpu_burst_completes_after_its_duration() {
    for d in [1, 4, 17] {
        let w = workload(1, vec![(0, vec![Instruction::cpu(d)])]);
        let summary = Simulator::new(&w).run();
        assert_eq!(completions(&summary), vec![(0, d)]);
        assert_eq!(summary.final_tick, d);
    }
}

#[test]
fn single_core_contention() {
    let w = workload(
        1,
        vec![(0, vec![Instruction::cpu(5)]), (0, vec![Instruction::cpu(3)])],
    );
    let summary = Simulator::new(&w).run();

    assert_eq!(completions(&summary), vec![(0, 5), (1, 8)]);
    assert_eq!(cpu_start_tick(&summary, 1), 5);
    assert!(summary.events.contains(&SimEvent::Enqueued {
        tick: 0,
        id: 1,
        queue: QueueKind::Cpu(CpuPriority::High),
    }));
}

#[test]
fn ssd_access_demotes_next_cpu_request() {
    let w = workload(
        1,
        vec![
            (0, vec![Instruction::cpu(10)]),
            (0, vec![Instruction::ssd(2), Instruction::cpu(1)]),
            (1, vec![Instruction::cpu(1)]),
        ],
    );
    let summary = Simulator::new(&w).run();

    assert!(summary.events.contains(&SimEvent::Enqueued {
        tick: 1,
        id: 2,
        queue: QueueKind::Cpu(CpuPriority::High),
    }));
    assert!(summary.events.contains(&SimEvent::Enqueued {
        tick: 2,
        id: 1,
        queue: QueueKind::Cpu(CpuPriority::Low),
    }));
    // Process 2 asked later but overtakes the demoted process 1.
    assert_eq!(completions(&summary), vec![(0, 10), (1, 12), (2, 11)]);
    assert!(summary.events.contains(&SimEvent::InstructionStarted {
        tick: 11,
        id: 1,
        kind: InstructionKind::Cpu,
        source: AdmissionSource::Drain(CpuPriority::Low),
    }));
}

/// Processes 0 and 1 queue behind 2 and 3, which both free their cores in
/// tick 3 after 0 and 1 have already had their turn that tick.
fn drain_cap_workload() -> Workload {
    workload(
        2,
        vec![
            (1, vec![Instruction::cpu(5)]),
            (1, vec![Instruction::cpu(5)]),
            (0, vec![Instruction::cpu(3)]),
            (0, vec![Instruction::cpu(3)]),
        ],
    )
}

#[test]
fn drain_admits_one_process_per_tick() {
    let summary = Simulator::new(&drain_cap_workload()).run();

    assert_eq!(cpu_start_tick(&summary, 0), 3);
    assert_eq!(cpu_start_tick(&summary, 1), 4);
    assert_eq!(completions(&summary), vec![(0, 8), (1, 9), (2, 3), (3, 3)]);

    let drained_in_tick_3 = summary
        .events
        .iter()
        .filter(|e| {
            matches!(
                e,
                SimEvent::InstructionStarted {
                    tick: 3,
                    source: AdmissionSource::Drain(_),
                    ..
                }
            )
        })
        .count();
    assert_eq!(drained_in_tick_3, 1);
}

#[test]
fn draining_all_free_cores_is_opt_in() {
    let config = SimConfig::default().with_drain_policy(DrainPolicy::AllFreeCores);
    let summary = Simulator::with_config(&drain_cap_workload(), config).run();

    assert_eq!(cpu_start_tick(&summary, 0), 3);
    assert_eq!(cpu_start_tick(&summary, 1), 3);
    assert_eq!(completions(&summary), vec![(0, 8), (1, 8), (2, 3), (3, 3)]);
}

const SAMPLE: &str = "\
NCORES 2
NEW 0
CPU 4
SSD 2
CPU 3
USER 5
CPU 1
NEW 1
CPU 6
SSD 1
CPU 2
NEW 2
USER 3
CPU 2
SSD 2
CPU 2
NEW 3
CPU 3
END
";

#[test]
fn reparsing_yields_identical_runs() {
    let a = Simulator::new(&Workload::parse(SAMPLE).unwrap()).run();
    let b = Simulator::new(&Workload::parse(SAMPLE).unwrap()).run();
    assert_eq!(a.events, b.events);
    assert_eq!(a.final_tick, b.final_tick);
}

#[test]
fn json_trace_round_trips() {
    let summary = Simulator::new(&Workload::parse(SAMPLE).unwrap()).run();
    let lines: Vec<String> = summary
        .events
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect();
    let back: Vec<SimEvent> = lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(back, summary.events);
}

#[test]
fn every_process_reports_once_with_its_totals() {
    let w = Workload::parse(SAMPLE).unwrap();
    let summary = Simulator::new(&w).run();

    let mut terms: Vec<_> = summary.terminations().copied().collect();
    terms.sort_by_key(|t| t.id);
    assert_eq!(terms.len(), 4);

    assert_eq!(terms[0].cpu_ticks_used, 8);
    assert_eq!(terms[0].ssd_access_count, 1);
    assert_eq!(terms[0].user_interaction_count, 1);
    assert_eq!(terms[2].cpu_ticks_used, 4);
    assert_eq!(terms[2].ssd_access_count, 1);
    assert_eq!(terms[3].user_interaction_count, 0);

    // Every termination is followed directly by its process table.
    for (i, e) in summary.events.iter().enumerate() {
        if let SimEvent::Terminated(t) = e {
            match &summary.events[i + 1] {
                SimEvent::Snapshot(s) => {
                    assert_eq!(s.tick, t.completion_tick);
                    assert_eq!(s.entries.len(), 4);
                    assert!(s.entries.iter().map(|e| e.id).eq(0..4));
                }
                other => panic!("expected snapshot after termination, got {:?}", other),
            }
        }
    }
}

#[test]
fn console_output_for_contention() {
    let w = workload(
        1,
        vec![(0, vec![Instruction::cpu(5)]), (0, vec![Instruction::cpu(3)])],
    );
    let mut console = ConsoleReporter::new(Vec::new());
    Simulator::new(&w).run_with(&mut console);
    let text = String::from_utf8(console.into_inner()).unwrap();

    assert_eq!(
        text,
        "Process 0 is terminated at 5ms\n\
         It used 5ms of CPU time, performed 0 SSD access(es), and interacted with its USER 0 time(s)\n\
         \n\
         PROCESS TABLE\n\
         Process 0 is TERMINATED\n\
         Process 1 is READY\n\
         \n\
         Process 1 is terminated at 8ms\n\
         It used 3ms of CPU time, performed 0 SSD access(es), and interacted with its USER 0 time(s)\n\
         \n\
         PROCESS TABLE\n\
         Process 0 is TERMINATED\n\
         Process 1 is TERMINATED\n\
         \n"
    );
}
