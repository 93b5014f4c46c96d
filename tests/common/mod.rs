//! Common test utilities for brc-pipeline integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod pipeline;

pub use config::*;
#[allow(unused_imports)]
pub use fixtures::*;
pub use pipeline::*;
