//! Hook module for running external commands on transitions

mod runner;

pub use runner::{HookRunner, HookSpec, ProcessSpawner, Spawner};

#[cfg(test)]
pub use runner::HookError;
