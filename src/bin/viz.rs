/// procsim live visualizer. Attach to a running simulation at any time.
///
/// Run in a separate terminal:
///   cargo run --bin viz [snapshot-path]
///
/// Polls /tmp/procsim_live.json (or the given path) every 200ms and renders:
///
///     ┌ header: workload / drain policy / status / tick ───────────┐
///     │ Process table (one row per process) │ Cores gauge          │
///     │                                     │ SSD slot + queues    │
///     │                                     │ Last termination     │
///     │ q/esc: quit  …footer…                                      │
///
/// Press q or Esc to quit. The simulation keeps running unaffected.
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use procsim::metrics::{read_metrics_from, LiveMetrics, METRICS_PATH};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(METRICS_PATH));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &path);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let metrics = read_metrics_from(path);
        terminal.draw(|f| render(f, metrics.as_ref(), path))?;

        // Non-blocking: poll for 200ms, then redraw regardless
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Top-level layout
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, metrics: Option<&LiveMetrics>, path: &Path) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // table + resources
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, rows[0], metrics);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(rows[1]);

    render_process_table(f, cols[0], metrics);
    render_resources(f, cols[1], metrics);
    render_footer(f, rows[2], path);
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

fn render_header(f: &mut Frame, area: Rect, metrics: Option<&LiveMetrics>) {
    let block = Block::default()
        .title(Span::styled(
            " procsim live monitor ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (name, drain, status, tick) = metrics
        .map(|m| {
            (
                m.workload.as_str(),
                m.drain_policy.as_str(),
                m.status.as_str(),
                m.tick.to_string(),
            )
        })
        .unwrap_or(("—", "—", "idle", "—".to_string()));

    let status_color = match status {
        "running" => Color::Green,
        "complete" => Color::Cyan,
        _ => Color::DarkGray,
    };

    let spans = vec![
        Span::styled("  workload: ", Style::default().fg(Color::DarkGray)),
        Span::styled(name, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::styled("   drain: ", Style::default().fg(Color::DarkGray)),
        Span::styled(drain, Style::default().fg(Color::Cyan)),
        Span::styled("   status: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            status.to_uppercase(),
            Style::default().fg(status_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   tick: ", Style::default().fg(Color::DarkGray)),
        Span::raw(tick),
    ];

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

// ---------------------------------------------------------------------------
// Process table
// ---------------------------------------------------------------------------

fn state_color(state: &str) -> Color {
    match state {
        "RUNNING" => Color::Green,
        "READY" => Color::Yellow,
        "BLOCKED" => Color::Magenta,
        "TERMINATED" => Color::Cyan,
        _ => Color::DarkGray,
    }
}

fn render_process_table(f: &mut Frame, area: Rect, metrics: Option<&LiveMetrics>) {
    let block = Block::default().title(" Processes ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(m) = metrics else {
        let msg = Paragraph::new(vec![
            Line::raw(""),
            Line::from(Span::styled(
                "  No simulation running.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "  Start procsim to see live data.",
                Style::default().fg(Color::DarkGray),
            )),
        ]);
        f.render_widget(msg, inner);
        return;
    };

    let mut lines: Vec<Line> = vec![Line::from(Span::styled(
        "  ID    STATE        STEP     CURRENT",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
    ))];

    for p in &m.processes {
        let current = if p.current.is_empty() {
            "—".to_string()
        } else {
            format!("{} ({} elapsed)", p.current, p.elapsed)
        };
        lines.push(Line::from(vec![
            Span::raw(format!("  {:<5} ", p.id)),
            Span::styled(
                format!("{:<12} ", p.state),
                Style::default().fg(state_color(&p.state)),
            ),
            Span::raw(format!("{:>3}/{:<4} ", p.cursor, p.program_len)),
            Span::raw(current),
        ]));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

// ---------------------------------------------------------------------------
// Resources panel
// ---------------------------------------------------------------------------

fn queue_line<'a>(label: &'a str, ids: &[usize], color: Color) -> Line<'a> {
    let body = if ids.is_empty() {
        "—".to_string()
    } else {
        ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" ← ")
    };
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::DarkGray)),
        Span::styled(body, Style::default().fg(color)),
    ])
}

fn render_resources(f: &mut Frame, area: Rect, metrics: Option<&LiveMetrics>) {
    let block = Block::default().title(" Resources ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(m) = metrics else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // cores gauge
            Constraint::Length(1), // spacer
            Constraint::Length(2), // progress gauge
            Constraint::Length(1), // spacer
            Constraint::Min(0),    // text
        ])
        .split(inner);

    let busy = m.total_cores.saturating_sub(m.free_cores);
    let core_pct = if m.total_cores > 0 {
        ((busy as f32 / m.total_cores as f32) * 100.0) as u16
    } else {
        0
    };
    let core_color = match core_pct {
        0..=33 => Color::DarkGray,
        34..=66 => Color::Yellow,
        _ => Color::Green,
    };
    let cores = Gauge::default()
        .block(Block::default().title("Cores busy"))
        .gauge_style(Style::default().fg(core_color))
        .percent(core_pct.min(100))
        .label(format!("{} / {}", busy, m.total_cores));
    f.render_widget(cores, rows[0]);

    let total = m.processes.len();
    let done_pct = if total > 0 {
        ((m.terminated as f32 / total as f32) * 100.0) as u16
    } else {
        0
    };
    let done = Gauge::default()
        .block(Block::default().title("Terminated"))
        .gauge_style(Style::default().fg(Color::Blue))
        .percent(done_pct.min(100))
        .label(format!("{} / {}", m.terminated, total));
    f.render_widget(done, rows[2]);

    let (ssd_text, ssd_color) = if m.ssd_busy {
        ("BUSY", Color::Magenta)
    } else {
        ("free", Color::DarkGray)
    };

    let mut text = vec![
        Line::from(vec![
            Span::styled("SSD slot:   ", Style::default().fg(Color::DarkGray)),
            Span::styled(ssd_text, Style::default().fg(ssd_color)),
        ]),
        Line::raw(""),
        queue_line("High queue: ", &m.high_queue, Color::Green),
        queue_line("Low queue:  ", &m.low_queue, Color::Yellow),
        queue_line("SSD queue:  ", &m.ssd_queue, Color::Magenta),
        Line::raw(""),
    ];

    match &m.last_termination {
        Some(t) => {
            text.push(Line::from(vec![
                Span::styled("Last done:  ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("process {} at tick {}", t.id, t.completion_tick),
                    Style::default().fg(Color::Cyan),
                ),
            ]));
            text.push(Line::from(Span::styled(
                format!(
                    "            cpu {}  ssd {}  user {}",
                    t.cpu_ticks_used, t.ssd_access_count, t.user_interaction_count
                ),
                Style::default().fg(Color::DarkGray),
            )));
        }
        None => text.push(Line::from(Span::styled(
            "Last done:  —",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    f.render_widget(Paragraph::new(text), rows[4]);
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

fn render_footer(f: &mut Frame, area: Rect, path: &Path) {
    let text = Paragraph::new(Span::styled(
        format!(
            "  q / esc: quit    auto-refreshes every 200ms    reads {}",
            path.display()
        ),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(text, area);
}
