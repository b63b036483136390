//! Ambient plumbing shared by RealWorld services: tracing setup and
//! environment-driven configuration.

pub mod config;
pub mod tracing;
