// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use super::{blocking, Probe};
use crate::config::TamperConfig;
use crate::scan::first_existing;
use crate::status::{ProbeOutcome, ThreatCategory};

/// Installed memory editors and license patchers, found by their data directories
#[derive(Debug, Clone)]
pub struct TamperToolProbe {
    config: Arc<TamperConfig>,
}

impl TamperToolProbe {
    pub fn new(config: TamperConfig) -> Self {
        TamperToolProbe {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl Probe for TamperToolProbe {
    fn category(&self) -> ThreatCategory {
        ThreatCategory::TamperTool
    }

    async fn observe(&self) -> ProbeOutcome {
        let config = Arc::clone(&self.config);
        let evidence = blocking(self.category(), move || {
            first_existing(&config.paths).map(|path| format!("tamper tool data present: {}", path.display()))
        })
        .await;

        if let Some(found) = &evidence {
            info!("Tamper tool detected: {}", found);
        }
        ProbeOutcome::from_evidence(self.category(), evidence)
    }
}
