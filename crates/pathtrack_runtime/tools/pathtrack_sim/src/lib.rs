//! Library surface of the simulator, exposed for its integration tests.

pub mod config;
pub mod sim;
