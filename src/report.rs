/// Console rendering of termination records and process tables.
use std::io::Write;

use crate::events::{ProcessTableSnapshot, ProcessTerminated, Reporter, SimEvent};

/// Prints each termination followed by the process table taken with it.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        ConsoleReporter::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        ConsoleReporter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_termination(&mut self, t: &ProcessTerminated) -> std::io::Result<()> {
        writeln!(
            self.out,
            "Process {} is terminated at {}ms",
            t.id, t.completion_tick
        )?;
        writeln!(
            self.out,
            "It used {}ms of CPU time, performed {} SSD access(es), and interacted with its USER {} time(s)",
            t.cpu_ticks_used, t.ssd_access_count, t.user_interaction_count
        )?;
        writeln!(self.out)
    }

    fn write_table(&mut self, s: &ProcessTableSnapshot) -> std::io::Result<()> {
        writeln!(self.out, "PROCESS TABLE")?;
        for entry in &s.entries {
            match entry.state {
                Some(state) => writeln!(self.out, "Process {} is {}", entry.id, state)?,
                None => writeln!(self.out, "Process {} has not arrived", entry.id)?,
            }
        }
        writeln!(self.out)
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_event(&mut self, event: &SimEvent) {
        let res = match event {
            SimEvent::Terminated(t) => self.write_termination(t),
            SimEvent::Snapshot(s) => self.write_table(s),
            _ => Ok(()),
        };
        if let Err(e) = res {
            log::warn!("console report failed: {}", e);
        }
    }
}
