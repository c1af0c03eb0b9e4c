/// Admission queues.
///
/// Processes that cannot start their current instruction wait here:
///   - high: CPU requests on first start or after a CPU/USER step
///   - low: CPU requests resuming right after an SSD access
///   - ssd: requests for the single SSD slot
///
/// All three are strict FIFOs of process ids. A process sits in at most one
/// queue at a time; the process itself records which one.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::instruction::InstructionKind;

/// Which CPU queue a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuPriority {
    High,
    Low,
}

impl CpuPriority {
    /// Resuming right after an SSD access is deprioritised; everything else
    /// (first start, after CPU, after USER) is high priority.
    pub fn after(last_concluded: Option<InstructionKind>) -> Self {
        match last_concluded {
            Some(InstructionKind::Ssd) => CpuPriority::Low,
            _ => CpuPriority::High,
        }
    }
}

impl std::fmt::Display for CpuPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuPriority::High => write!(f, "high"),
            CpuPriority::Low  => write!(f, "low"),
        }
    }
}

/// One of the three admission queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    Cpu(CpuPriority),
    Ssd,
}

impl std::fmt::Display for QueueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueKind::Cpu(p) => write!(f, "{}-priority CPU queue", p),
            QueueKind::Ssd    => write!(f, "SSD queue"),
        }
    }
}

/// Whether a process may take a free resource ahead of the queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Nobody is waiting; admit without touching the queues.
    Open,
    /// The process is the eligible front of this queue; pop it on admission.
    Front(QueueKind),
}

#[derive(Debug, Default, Clone)]
pub struct AdmissionQueues {
    high: VecDeque<usize>,
    low: VecDeque<usize>,
    ssd: VecDeque<usize>,
}

impl AdmissionQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, kind: QueueKind) -> &VecDeque<usize> {
        match kind {
            QueueKind::Cpu(CpuPriority::High) => &self.high,
            QueueKind::Cpu(CpuPriority::Low) => &self.low,
            QueueKind::Ssd => &self.ssd,
        }
    }

    fn queue_mut(&mut self, kind: QueueKind) -> &mut VecDeque<usize> {
        match kind {
            QueueKind::Cpu(CpuPriority::High) => &mut self.high,
            QueueKind::Cpu(CpuPriority::Low) => &mut self.low,
            QueueKind::Ssd => &mut self.ssd,
        }
    }

    pub fn push(&mut self, kind: QueueKind, id: usize) {
        self.queue_mut(kind).push_back(id);
    }

    pub fn pop(&mut self, kind: QueueKind) -> Option<usize> {
        self.queue_mut(kind).pop_front()
    }

    pub fn cpu_queues_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty()
    }

    /// Decide whether process `id` may take a free core ahead of the queues.
    ///
    /// With both CPU queues empty anyone may. Otherwise only the front of the
    /// high queue, or the front of the low queue when the high queue is empty.
    pub fn cpu_turn(&self, id: usize) -> Option<Turn> {
        if self.cpu_queues_empty() {
            Some(Turn::Open)
        } else if self.high.front() == Some(&id) {
            Some(Turn::Front(QueueKind::Cpu(CpuPriority::High)))
        } else if self.high.is_empty() && self.low.front() == Some(&id) {
            Some(Turn::Front(QueueKind::Cpu(CpuPriority::Low)))
        } else {
            None
        }
    }

    /// Same rule for the SSD slot: open when nobody waits, otherwise only
    /// the front may go.
    pub fn ssd_turn(&self, id: usize) -> Option<Turn> {
        match self.ssd.front() {
            None => Some(Turn::Open),
            Some(&front) if front == id => Some(Turn::Front(QueueKind::Ssd)),
            Some(_) => None,
        }
    }

    /// The CPU queue the drain should serve: high while it has entries,
    /// otherwise low.
    pub fn drain_candidate(&self) -> Option<(CpuPriority, usize)> {
        if let Some(&id) = self.high.front() {
            Some((CpuPriority::High, id))
        } else {
            self.low.front().map(|&id| (CpuPriority::Low, id))
        }
    }

    /// Every queue `id` currently appears in.
    pub fn memberships(&self, id: usize) -> Vec<QueueKind> {
        [
            QueueKind::Cpu(CpuPriority::High),
            QueueKind::Cpu(CpuPriority::Low),
            QueueKind::Ssd,
        ]
        .into_iter()
        .filter(|&k| self.queue(k).contains(&id))
        .collect()
    }

    pub fn snapshot(&self, kind: QueueKind) -> Vec<usize> {
        self.queue(kind).iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGH: QueueKind = QueueKind::Cpu(CpuPriority::High);
    const LOW: QueueKind = QueueKind::Cpu(CpuPriority::Low);

    #[test]
    fn priority_follows_last_instruction() {
        assert_eq!(CpuPriority::after(None), CpuPriority::High);
        assert_eq!(CpuPriority::after(Some(InstructionKind::Cpu)), CpuPriority::High);
        assert_eq!(CpuPriority::after(Some(InstructionKind::User)), CpuPriority::High);
        assert_eq!(CpuPriority::after(Some(InstructionKind::Ssd)), CpuPriority::Low);
    }

    #[test]
    fn fifo_order() {
        let mut q = AdmissionQueues::new();
        q.push(HIGH, 3);
        q.push(HIGH, 1);
        q.push(HIGH, 2);
        assert_eq!(q.pop(HIGH), Some(3));
        assert_eq!(q.pop(HIGH), Some(1));
        assert_eq!(q.snapshot(HIGH), vec![2]);
    }

    #[test]
    fn cpu_turn_rules() {
        let mut q = AdmissionQueues::new();
        assert_eq!(q.cpu_turn(7), Some(Turn::Open));

        q.push(LOW, 4);
        assert_eq!(q.cpu_turn(4), Some(Turn::Front(LOW)));
        assert_eq!(q.cpu_turn(7), None);

        q.push(HIGH, 5);
        // Low front must wait while anyone is in the high queue.
        assert_eq!(q.cpu_turn(4), None);
        assert_eq!(q.cpu_turn(5), Some(Turn::Front(HIGH)));
        assert_eq!(q.drain_candidate(), Some((CpuPriority::High, 5)));

        q.pop(HIGH);
        assert_eq!(q.drain_candidate(), Some((CpuPriority::Low, 4)));
    }

    #[test]
    fn ssd_turn_rules() {
        let mut q = AdmissionQueues::new();
        assert_eq!(q.ssd_turn(0), Some(Turn::Open));
        q.push(QueueKind::Ssd, 2);
        assert_eq!(q.ssd_turn(0), None);
        assert_eq!(q.ssd_turn(2), Some(Turn::Front(QueueKind::Ssd)));
    }

    #[test]
    fn memberships_lists_every_queue() {
        let mut q = AdmissionQueues::new();
        q.push(LOW, 1);
        q.push(QueueKind::Ssd, 2);
        assert_eq!(q.memberships(1), vec![LOW]);
        assert_eq!(q.memberships(2), vec![QueueKind::Ssd]);
        assert!(q.memberships(3).is_empty());
    }
}
