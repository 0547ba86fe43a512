//! EVM chain adapters.

pub mod alloy;
