pub mod arbiter;
pub mod config;
pub mod error;
pub mod events;
pub mod instruction;
pub mod metrics;
pub mod process;
pub mod queues;
pub mod report;
pub mod simulator;
pub mod workload;
