// src/lib.rs — Library root for convogen

pub mod cli;
pub mod core;
pub mod evaluator;
pub mod export;
pub mod generator;
pub mod infra;
pub mod provider;
pub mod store;
pub mod util;
