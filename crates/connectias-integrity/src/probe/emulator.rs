// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use super::{blocking, signal, Probe};
use crate::config::EmulatorConfig;
use crate::error::ProbeError;
use crate::scan::{find_marker_in_lines, first_existing};
use crate::status::{ProbeOutcome, ThreatCategory};

/// Emulator / virtualized hardware detection
#[derive(Debug, Clone)]
pub struct EmulatorProbe {
    config: Arc<EmulatorConfig>,
}

impl EmulatorProbe {
    pub fn new(config: EmulatorConfig) -> Self {
        EmulatorProbe {
            config: Arc::new(config),
        }
    }

    fn check_artifacts(config: &EmulatorConfig) -> Result<Option<String>, ProbeError> {
        Ok(first_existing(&config.artifact_paths)
            .map(|path| format!("emulator artifact present: {}", path.display())))
    }

    /// First marker hit across several text sources. A source that cannot be
    /// read only weakens the check; the remaining sources are still scanned.
    fn scan_sources(sources: &[PathBuf], markers: &[String], label: &str) -> Option<String> {
        sources.iter().find_map(|source| {
            let hit = find_marker_in_lines(source, markers)
                .map(|hit| hit.map(|hit| format!("{} {}: {}", label, source.display(), hit.line)));
            signal(ThreatCategory::Emulator, label, hit)
        })
    }

    fn scan(config: &EmulatorConfig) -> Option<String> {
        signal(ThreatCategory::Emulator, "artifacts", Self::check_artifacts(config))
            .or_else(|| {
                Self::scan_sources(&config.hardware_descriptors, &config.board_markers, "virtual board in")
            })
            .or_else(|| {
                Self::scan_sources(&config.property_files, &config.property_markers, "emulator property in")
            })
    }
}

#[async_trait]
impl Probe for EmulatorProbe {
    fn category(&self) -> ThreatCategory {
        ThreatCategory::Emulator
    }

    async fn observe(&self) -> ProbeOutcome {
        let config = Arc::clone(&self.config);
        let evidence = blocking(self.category(), move || Self::scan(&config)).await;

        if let Some(found) = &evidence {
            info!("Emulator detected: {}", found);
        }
        ProbeOutcome::from_evidence(self.category(), evidence)
    }
}
