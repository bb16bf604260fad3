pub mod config;
pub mod imagorpath;
pub mod processor;
pub mod startup;
pub mod state;
pub mod storage;
pub mod telemetry;
