/// Simulation settings that are not part of the workload itself.
use std::path::PathBuf;

use crate::metrics::METRICS_PATH;

/// How many queued processes the end-of-tick drain may admit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// At most one admission per tick, whatever the number of free cores.
    #[default]
    SinglePerTick,
    /// Keep admitting queue fronts while cores are free. Changes the
    /// resulting schedule; opt-in only.
    AllFreeCores,
}

impl DrainPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            DrainPolicy::SinglePerTick => "single",
            DrainPolicy::AllFreeCores => "all",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "single" => Some(DrainPolicy::SinglePerTick),
            "all" => Some(DrainPolicy::AllFreeCores),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    pub drain_policy: DrainPolicy,
    /// Where the live monitor snapshot is written; `None` disables it.
    pub metrics_path: Option<PathBuf>,
}

impl SimConfig {
    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.drain_policy = policy;
        self
    }

    pub fn with_metrics_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    /// Settings for the interactive binary.
    ///   PROCSIM_DRAIN    single | all              (default single)
    ///   PROCSIM_METRICS  snapshot path | off       (default METRICS_PATH)
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("PROCSIM_DRAIN").ok().as_deref(),
            std::env::var("PROCSIM_METRICS").ok().as_deref(),
        )
    }

    fn from_vars(drain: Option<&str>, metrics: Option<&str>) -> Self {
        let drain_policy = match drain {
            None => DrainPolicy::default(),
            Some(name) => DrainPolicy::from_name(name).unwrap_or_else(|| {
                log::warn!("unknown PROCSIM_DRAIN value {:?}, using single", name);
                DrainPolicy::default()
            }),
        };
        let config = SimConfig::default().with_drain_policy(drain_policy);
        match metrics {
            Some(v) if v.eq_ignore_ascii_case("off") => config,
            Some(v) if !v.is_empty() => config.with_metrics_path(v),
            _ => config.with_metrics_path(METRICS_PATH),
        }
    }
}
