// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Status aggregation.
//!
//! [`IntegrityEngine`] owns one instance of each probe and evaluates them
//! either one at a time or all together. The aggregate query spawns every
//! probe on its own task and waits for all of them before combining bits.

use std::future::Future;
use std::sync::Arc;
use std::thread;

use log::{debug, warn};
use tokio::runtime::{Builder, Handle};
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::probe::{DebuggerProbe, EmulatorProbe, InstrumentationProbe, Probe, RootProbe, TamperToolProbe};
use crate::status::{ProbeOutcome, SecurityReport, SecurityStatus, ThreatCategory};

pub struct IntegrityEngine {
    probes: Vec<Arc<dyn Probe>>,
}

impl Default for IntegrityEngine {
    fn default() -> Self {
        IntegrityEngine::new(EngineConfig::default())
    }
}

impl IntegrityEngine {
    pub fn new(config: EngineConfig) -> Self {
        let probes: Vec<Arc<dyn Probe>> = vec![
            Arc::new(RootProbe::new(config.root.clone())),
            Arc::new(InstrumentationProbe::new(
                config.instrumentation.clone(),
                config.self_entry("maps"),
                config.self_entry("task"),
            )),
            Arc::new(EmulatorProbe::new(config.emulator.clone())),
            Arc::new(DebuggerProbe::new(config.self_entry("status"))),
            Arc::new(TamperToolProbe::new(config.tamper.clone())),
        ];
        IntegrityEngine { probes }
    }

    /// Engine over an arbitrary probe set. Categories without a probe are
    /// always reported clean.
    pub fn with_probes(probes: Vec<Arc<dyn Probe>>) -> Self {
        IntegrityEngine { probes }
    }

    /// Run one category's probe
    pub async fn observe(&self, category: ThreatCategory) -> ProbeOutcome {
        match self.probes.iter().find(|probe| probe.category() == category) {
            Some(probe) => probe.observe().await,
            None => ProbeOutcome::clean(category),
        }
    }

    /// Run all probes concurrently and combine their results
    pub async fn evaluate_all(&self) -> SecurityReport {
        let mut tasks = JoinSet::new();
        for probe in &self.probes {
            let probe = Arc::clone(probe);
            tasks.spawn(async move { probe.observe().await });
        }

        let mut outcomes = Vec::with_capacity(self.probes.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                // The category stays clean in the report
                Err(e) => warn!("Probe task failed: {}", e),
            }
        }

        let report = SecurityReport::from_outcomes(outcomes);
        debug!("Security status: {:#07b}", report.status.bits());
        report
    }

    pub fn is_rooted(&self) -> bool {
        self.detect(ThreatCategory::Root)
    }

    pub fn is_instrumentation_detected(&self) -> bool {
        self.detect(ThreatCategory::Instrumentation)
    }

    pub fn is_emulator(&self) -> bool {
        self.detect(ThreatCategory::Emulator)
    }

    pub fn is_debugger_attached(&self) -> bool {
        self.detect(ThreatCategory::Debugger)
    }

    pub fn is_memory_tampered(&self) -> bool {
        self.detect(ThreatCategory::TamperTool)
    }

    pub fn security_status(&self) -> SecurityStatus {
        self.report().status
    }

    /// Blocking variant of [`IntegrityEngine::evaluate_all`]
    pub fn report(&self) -> SecurityReport {
        block_on(self.evaluate_all()).unwrap_or_else(|| SecurityReport::from_outcomes(Vec::new()))
    }

    /// Blocking variant of [`IntegrityEngine::observe`]
    pub fn check(&self, category: ThreatCategory) -> ProbeOutcome {
        block_on(self.observe(category)).unwrap_or_else(|| ProbeOutcome::clean(category))
    }

    fn detect(&self, category: ThreatCategory) -> bool {
        self.check(category).detected
    }
}

/// Drive `future` on a fresh current-thread runtime that is torn down before
/// returning. Inside an existing runtime the fresh one runs on a scoped
/// worker thread, since nesting `block_on` panics.
fn block_on<F>(future: F) -> Option<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    if Handle::try_current().is_err() {
        return run_isolated(future);
    }

    thread::scope(|scope| match scope.spawn(move || run_isolated(future)).join() {
        Ok(output) => output,
        Err(_) => {
            warn!("Probe worker thread panicked");
            None
        }
    })
}

fn run_isolated<F: Future>(future: F) -> Option<F::Output> {
    match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => Some(runtime.block_on(future)),
        Err(e) => {
            warn!("Failed to build probe runtime: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MockProbe;

    fn mock(category: ThreatCategory, detected: bool) -> Arc<dyn Probe> {
        let mut probe = MockProbe::new();
        probe.expect_category().return_const(category);
        probe.expect_observe().returning(move || {
            if detected {
                ProbeOutcome::detected(category, format!("mock {}", category))
            } else {
                ProbeOutcome::clean(category)
            }
        });
        Arc::new(probe)
    }

    fn engine(flags: [bool; 5]) -> IntegrityEngine {
        IntegrityEngine::with_probes(
            ThreatCategory::ALL
                .into_iter()
                .zip(flags)
                .map(|(category, detected)| mock(category, detected))
                .collect(),
        )
    }

    #[test]
    fn test_status_equals_individual_results() {
        for bits in 0u32..32 {
            let flags: [bool; 5] = std::array::from_fn(|i| bits & (1 << i) != 0);
            let engine = engine(flags);

            let individual = [
                engine.is_rooted(),
                engine.is_instrumentation_detected(),
                engine.is_emulator(),
                engine.is_debugger_attached(),
                engine.is_memory_tampered(),
            ];
            let status = engine.security_status();

            assert_eq!(status.bits(), bits);
            for (category, detected) in ThreatCategory::ALL.into_iter().zip(individual) {
                assert_eq!(status.contains(category), detected, "{} (bits {:#07b})", category, bits);
            }
        }
    }

    #[tokio::test]
    async fn test_report_keeps_evidence() {
        let report = engine([false, true, false, true, false]).evaluate_all().await;

        assert_eq!(report.status.bits(), 0b01010);
        assert_eq!(report.outcomes.len(), 5);
        assert_eq!(
            report.outcome(ThreatCategory::Debugger).unwrap().evidence.as_deref(),
            Some("mock debugger")
        );
    }

    #[tokio::test]
    async fn test_panicking_probe_is_clean() {
        let mut broken = MockProbe::new();
        broken.expect_category().return_const(ThreatCategory::Emulator);
        broken.expect_observe().returning(|| panic!("probe blew up"));
        let broken: Arc<dyn Probe> = Arc::new(broken);

        let engine = IntegrityEngine::with_probes(vec![mock(ThreatCategory::Root, true), broken]);
        let report = engine.evaluate_all().await;

        assert_eq!(report.status.bits(), 0b00001);
        assert!(!report.outcome(ThreatCategory::Emulator).unwrap().detected);
    }

    #[tokio::test]
    async fn test_sync_queries_inside_runtime() {
        let engine = engine([false, false, false, true, false]);

        assert!(engine.is_debugger_attached());
        assert!(!engine.is_rooted());
        assert_eq!(engine.security_status().bits(), 0b01000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sync_check_inside_multi_thread_runtime() {
        let engine = engine([true, false, false, false, true]);

        let outcome = engine.check(ThreatCategory::TamperTool);
        assert!(outcome.detected);
        assert_eq!(outcome.evidence.as_deref(), Some("mock tamper_tool"));
        assert_eq!(engine.report().status.bits(), 0b10001);
    }

    #[tokio::test]
    async fn test_missing_probe_is_clean() {
        let engine = IntegrityEngine::with_probes(vec![mock(ThreatCategory::Debugger, true)]);
        assert!(!engine.observe(ThreatCategory::Root).await.detected);
        assert!(engine.observe(ThreatCategory::Debugger).await.detected);
    }
}
