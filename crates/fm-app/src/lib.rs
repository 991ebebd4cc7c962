//! Reconstruction job service and the mesh post-processing front ends.

pub mod backend;
pub mod config;
pub mod error;
pub mod intake;
pub mod notifier;
pub mod orchestrator;
pub mod registry;
pub mod runner;
