//! Run a shell command exactly once and capture what it prints.
//!
//! The entry point is [`system::executor::run`]; [`core::runner`] layers the
//! apply/plan conventions of a [`models::RunDefinition`] on top of it.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
