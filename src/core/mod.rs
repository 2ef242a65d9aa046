// EN: src/core/mod.rs

//! Caller-side logic around the executor: configuration, config paths and the
//! apply/plan conventions of run definitions.

pub mod config_loader;
pub mod paths;
pub mod runner;
