//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! odds logic.
//!
//! # Submodules
//!
//! - [`config`] - Configuration loading and validation
//! - [`factory`] - Builds adapters and the hub from configuration

pub mod config;
pub mod factory;
