// src/core/mod.rs — Generation pipeline core

pub mod orchestrator;
pub mod progress;
pub mod schedule;
pub mod similarity;
pub mod types;
