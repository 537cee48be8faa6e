// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Connectias Integrity - runtime environment assessment
//!
//! Detects conditions that break the app's trust assumptions: a rooted
//! device, an attached instrumentation framework, an emulator, an attached
//! debugger, and installed memory-editing tools. Pure observe-and-report:
//! every query re-reads live OS state and never returns an error. What to do
//! about a finding is up to the caller.
//!
//! ```no_run
//! use connectias_integrity::{IntegrityEngine, ThreatCategory};
//!
//! let engine = IntegrityEngine::default();
//! let status = engine.security_status();
//! if status.contains(ThreatCategory::Debugger) {
//!     // restrict sensitive features
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod scan;
pub mod signatures;
pub mod status;

pub use config::EngineConfig;
pub use engine::IntegrityEngine;
pub use error::{ConfigError, ErrorKind, ProbeError};
pub use probe::Probe;
pub use status::{ProbeOutcome, SecurityReport, SecurityStatus, ThreatCategory};
