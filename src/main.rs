use std::io::{self, BufRead, Write};

use procsim::config::SimConfig;
use procsim::metrics::LiveMetricsReporter;
use procsim::report::ConsoleReporter;
use procsim::simulator::Simulator;
use procsim::workload::Workload;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    print!("Enter input file name: ");
    io::stdout().flush()?;
    let mut path = String::new();
    io::stdin().lock().read_line(&mut path)?;
    let path = path.trim();

    let workload = Workload::load(path)?;
    log::debug!("loaded workload from {}:\n{}", path, workload);

    let config = SimConfig::from_env();
    let live = config
        .metrics_path
        .clone()
        .map(|p| LiveMetricsReporter::new(p, path));

    let mut sim = Simulator::with_config(&workload, config);
    let mut reporter = (ConsoleReporter::stdout(), live);
    sim.run_with(&mut reporter);

    Ok(())
}
