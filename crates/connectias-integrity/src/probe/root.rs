// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use tokio::process::Command;
use tokio::time::timeout;

use super::{blocking, signal, Probe};
use crate::config::RootConfig;
use crate::error::ProbeError;
use crate::scan::first_existing;
use crate::status::{ProbeOutcome, ThreatCategory};

/// Superuser detection.
///
/// Two independent signals: known superuser/root-manager paths on disk, and
/// `su` being resolvable through the command search path. Hiding the binaries
/// by remounting does not hide the search-path hit and vice versa.
#[derive(Debug, Clone)]
pub struct RootProbe {
    config: Arc<RootConfig>,
}

impl RootProbe {
    pub fn new(config: RootConfig) -> Self {
        RootProbe {
            config: Arc::new(config),
        }
    }

    fn check_paths(config: &RootConfig) -> Option<String> {
        first_existing(&config.paths).map(|path| format!("su binary present: {}", path.display()))
    }

    /// Any non-empty output from the resolver counts, without validating it.
    async fn resolve_superuser(&self) -> Result<Option<String>, ProbeError> {
        let Some((program, args)) = self.config.resolve_command.split_first() else {
            return Ok(None);
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::unavailable(program, e))?;

        // On timeout the child is dropped, killed and its pipe closed
        let output = timeout(self.config.command_timeout(), child.wait_with_output())
            .await
            .map_err(|_| {
                ProbeError::Transient(format!(
                    "`{}` did not finish within {} ms",
                    self.config.resolve_command.join(" "),
                    self.config.command_timeout_ms
                ))
            })?
            .map_err(|e| ProbeError::Transient(format!("`{}` output unreadable: {}", program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| format!("su resolvable via search path: {}", line)))
    }
}

#[async_trait]
impl Probe for RootProbe {
    fn category(&self) -> ThreatCategory {
        ThreatCategory::Root
    }

    async fn observe(&self) -> ProbeOutcome {
        let config = Arc::clone(&self.config);
        let mut evidence = blocking(self.category(), move || Self::check_paths(&config)).await;

        if evidence.is_none() {
            evidence = signal(self.category(), "search path", self.resolve_superuser().await);
        }

        if let Some(found) = &evidence {
            info!("Root detected: {}", found);
        }
        ProbeOutcome::from_evidence(self.category(), evidence)
    }
}
