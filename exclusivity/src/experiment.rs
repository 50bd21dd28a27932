//! Benchmarking harness that times the three probability implementations
//! against randomly generated sample-size sequences.

pub mod report;
pub mod runner;
pub mod sequence;
pub mod trial;
