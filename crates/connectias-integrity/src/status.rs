// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use std::fmt;

use serde::{Deserialize, Serialize};

/// Threat category, one bit each in [`SecurityStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    Root,
    Instrumentation,
    Emulator,
    Debugger,
    TamperTool,
}

impl ThreatCategory {
    pub const ALL: [ThreatCategory; 5] = [
        ThreatCategory::Root,
        ThreatCategory::Instrumentation,
        ThreatCategory::Emulator,
        ThreatCategory::Debugger,
        ThreatCategory::TamperTool,
    ];

    /// Bit index in the status bitmask. Part of the host contract.
    pub const fn bit_index(self) -> u32 {
        match self {
            ThreatCategory::Root => 0,
            ThreatCategory::Instrumentation => 1,
            ThreatCategory::Emulator => 2,
            ThreatCategory::Debugger => 3,
            ThreatCategory::TamperTool => 4,
        }
    }

    pub const fn mask(self) -> u32 {
        1 << self.bit_index()
    }

    pub fn name(self) -> &'static str {
        match self {
            ThreatCategory::Root => "root",
            ThreatCategory::Instrumentation => "instrumentation",
            ThreatCategory::Emulator => "emulator",
            ThreatCategory::Debugger => "debugger",
            ThreatCategory::TamperTool => "tamper_tool",
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compact status value handed to the host.
///
/// Bit 0 root, bit 1 instrumentation, bit 2 emulator, bit 3 debugger,
/// bit 4 tamper tool. Higher bits are always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", from = "u32")]
pub struct SecurityStatus(u32);

impl From<u32> for SecurityStatus {
    fn from(bits: u32) -> Self {
        SecurityStatus::from_bits_truncate(bits)
    }
}

impl From<SecurityStatus> for u32 {
    fn from(status: SecurityStatus) -> Self {
        status.bits()
    }
}

impl SecurityStatus {
    pub const CLEAN: SecurityStatus = SecurityStatus(0);
    const VALID_BITS: u32 = 0b1_1111;

    /// Unknown high bits are dropped
    pub const fn from_bits_truncate(bits: u32) -> Self {
        SecurityStatus(bits & Self::VALID_BITS)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, category: ThreatCategory) -> bool {
        self.0 & category.mask() != 0
    }

    pub fn insert(&mut self, category: ThreatCategory) {
        self.0 |= category.mask();
    }

    pub fn is_clean(self) -> bool {
        self.0 == 0
    }

    pub fn detected(self) -> impl Iterator<Item = ThreatCategory> {
        ThreatCategory::ALL
            .into_iter()
            .filter(move |category| self.contains(*category))
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a ProbeOutcome>) -> Self {
        outcomes
            .into_iter()
            .filter(|outcome| outcome.detected)
            .fold(SecurityStatus::CLEAN, |mut status, outcome| {
                status.insert(outcome.category);
                status
            })
    }
}

/// Result of one probe run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub category: ThreatCategory,
    pub detected: bool,
    /// First signal that fired
    pub evidence: Option<String>,
}

impl ProbeOutcome {
    pub fn clean(category: ThreatCategory) -> Self {
        ProbeOutcome {
            category,
            detected: false,
            evidence: None,
        }
    }

    pub fn detected(category: ThreatCategory, evidence: impl Into<String>) -> Self {
        ProbeOutcome {
            category,
            detected: true,
            evidence: Some(evidence.into()),
        }
    }

    pub fn from_evidence(category: ThreatCategory, evidence: Option<String>) -> Self {
        match evidence {
            Some(evidence) => ProbeOutcome::detected(category, evidence),
            None => ProbeOutcome::clean(category),
        }
    }
}

/// Aggregate evaluation: bitmask plus the per-category outcomes it was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub status: SecurityStatus,
    pub outcomes: Vec<ProbeOutcome>,
}

impl SecurityReport {
    /// Categories without an outcome are reported clean.
    pub fn from_outcomes(mut outcomes: Vec<ProbeOutcome>) -> Self {
        for category in ThreatCategory::ALL {
            if !outcomes.iter().any(|outcome| outcome.category == category) {
                outcomes.push(ProbeOutcome::clean(category));
            }
        }
        outcomes.sort_by_key(|outcome| outcome.category);

        SecurityReport {
            status: SecurityStatus::from_outcomes(&outcomes),
            outcomes,
        }
    }

    pub fn outcome(&self, category: ThreatCategory) -> Option<&ProbeOutcome> {
        self.outcomes.iter().find(|outcome| outcome.category == category)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
