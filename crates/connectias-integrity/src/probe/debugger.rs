// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use log::info;

use super::{blocking, signal, Probe};
use crate::error::ProbeError;
use crate::signatures::TRACER_PID_FIELD;
use crate::status::{ProbeOutcome, ThreatCategory};

/// Tracer detection via the `TracerPid` field of the process status file.
/// A non-zero value is the kernel's own report of an attached tracer.
#[derive(Debug, Clone)]
pub struct DebuggerProbe {
    status_path: PathBuf,
}

impl DebuggerProbe {
    pub fn new(status_path: PathBuf) -> Self {
        DebuggerProbe { status_path }
    }

    fn tracer_pid(&self) -> Result<u32, ProbeError> {
        let content = fs::read_to_string(&self.status_path)
            .map_err(|e| ProbeError::unavailable(&self.status_path, e))?;
        parse_tracer_pid(&content)
            .map_err(|detail| ProbeError::unexpected_format(&self.status_path, detail))
    }

    fn check(&self) -> Result<Option<String>, ProbeError> {
        let pid = self.tracer_pid()?;
        Ok((pid != 0).then(|| format!("TracerPid detected: {}", pid)))
    }
}

fn parse_tracer_pid(status: &str) -> Result<u32, String> {
    let line = status
        .lines()
        .find(|line| line.starts_with(TRACER_PID_FIELD))
        .ok_or_else(|| format!("{} field missing", TRACER_PID_FIELD))?;

    let value = line[TRACER_PID_FIELD.len()..].trim();
    value
        .parse::<u32>()
        .map_err(|e| format!("{} value {:?}: {}", TRACER_PID_FIELD, value, e))
}

#[async_trait]
impl Probe for DebuggerProbe {
    fn category(&self) -> ThreatCategory {
        ThreatCategory::Debugger
    }

    async fn observe(&self) -> ProbeOutcome {
        let probe = self.clone();
        let evidence = blocking(self.category(), move || {
            signal(ThreatCategory::Debugger, "tracer", probe.check())
        })
        .await;

        if let Some(found) = &evidence {
            info!("Debugger detected: {}", found);
        }
        ProbeOutcome::from_evidence(self.category(), evidence)
    }
}
