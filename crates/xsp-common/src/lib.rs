//! ---
//! xsp_section: "01-core-functionality"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Shared configuration and logging utilities."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
//! Shared ambient utilities for the x-ray signal pipeline workspace.
//! Configuration loading and tracing bootstrap live here so every service
//! binary wires them the same way.
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub use config::{BusConfig, LoggingConfig, PipelineConfig};
pub use logging::{init_tracing, LogFormat};
