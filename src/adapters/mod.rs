// Concrete implementations of the domain ports for external systems.

pub mod git;
pub mod process;
