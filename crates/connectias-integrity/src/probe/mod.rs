// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Independent probes, one per threat category.
//!
//! A probe re-observes the environment on every call, keeps no state between
//! calls and never fails: any sub-check error is logged and counted as
//! "signal absent".

mod debugger;
mod emulator;
mod instrumentation;
mod root;
mod tamper;

pub use debugger::DebuggerProbe;
pub use emulator::EmulatorProbe;
pub use instrumentation::InstrumentationProbe;
pub use root::RootProbe;
pub use tamper::TamperToolProbe;

use async_trait::async_trait;
use log::debug;

use crate::error::ProbeError;
use crate::status::{ProbeOutcome, ThreatCategory};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Probe: Send + Sync {
    fn category(&self) -> ThreatCategory;

    async fn observe(&self) -> ProbeOutcome;
}

/// Collapse a sub-check result to evidence, logging the swallowed error
pub(crate) fn signal(
    category: ThreatCategory,
    check: &str,
    result: Result<Option<String>, ProbeError>,
) -> Option<String> {
    match result {
        Ok(evidence) => evidence,
        Err(e) => {
            debug!("{} probe: {} check absent ({:?}): {}", category, check, e.kind(), e);
            None
        }
    }
}

/// Run blocking filesystem work off the async executor.
///
/// A panicked or cancelled worker counts as "no evidence".
pub(crate) async fn blocking<F>(category: ThreatCategory, work: F) -> Option<String>
where
    F: FnOnce() -> Option<String> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(evidence) => evidence,
        Err(e) => {
            log::warn!("{} probe: blocking scan did not complete: {}", category, e);
            None
        }
    }
}
