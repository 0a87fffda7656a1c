//! Git CLI access for gitmend.

pub mod executor;

pub use executor::{CommandOutput, GitExecutor};
