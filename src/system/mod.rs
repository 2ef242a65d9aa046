//! # System Interaction Layer
//!
//! This module owns everything that touches the operating system when a command
//! runs: splitting the shell invocation, building the child environment,
//! spawning the process and capturing what it prints.
//!
//! ## Modules
//!
//! - **`shell`**: Splits a shell invocation such as `FOO=1 /bin/bash -c` into
//!   environment assignments and an argument vector.
//! - **`environment`**: An ordered, last-wins environment built from the inherited
//!   process environment plus caller entries. The process environment is only read.
//! - **`capture`**: The `TeeWriter` fan-out and the log files it writes to.
//! - **`executor`**: `run`, which ties the above together and formats failures.

pub mod capture;
pub mod environment;
pub mod executor;
pub mod shell;
