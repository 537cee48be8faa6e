// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Dynamic instrumentation detection.
//!
//! Each signal alone is easy to defeat (rename the threads, move the
//! listener, hide the library from the map listing), so four independent
//! channels are OR-combined:
//!
//! 1. agent libraries in `/proc/self/maps`
//! 2. agent thread names under `/proc/self/task/*/comm`
//! 3. server binaries on disk
//! 4. a listener in the agent's default loopback port range

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use walkdir::WalkDir;

use super::{blocking, signal, Probe};
use crate::config::InstrumentationConfig;
use crate::error::ProbeError;
use crate::scan::{find_marker_in_lines, first_existing};
use crate::status::{ProbeOutcome, ThreatCategory};

#[derive(Debug, Clone)]
pub struct InstrumentationProbe {
    config: Arc<InstrumentationConfig>,
    maps_path: PathBuf,
    task_dir: PathBuf,
}

impl InstrumentationProbe {
    /// `maps_path` and `task_dir` are the current process's map listing and
    /// thread directory.
    pub fn new(config: InstrumentationConfig, maps_path: PathBuf, task_dir: PathBuf) -> Self {
        InstrumentationProbe {
            config: Arc::new(config),
            maps_path,
            task_dir,
        }
    }

    fn scan_maps(&self) -> Result<Option<String>, ProbeError> {
        Ok(find_marker_in_lines(&self.maps_path, &self.config.map_markers)?
            .map(|hit| format!("agent mapping ({}): {}", hit.marker, hit.line)))
    }

    fn scan_threads(&self) -> Result<Option<String>, ProbeError> {
        fs::metadata(&self.task_dir).map_err(|e| ProbeError::unavailable(&self.task_dir, e))?;

        let entries = WalkDir::new(&self.task_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            // Threads may exit between listing and reading
            .filter_map(Result::ok);

        for entry in entries {
            let Some(name) = read_thread_name(entry.path()) else {
                continue;
            };
            if let Some(marker) = self
                .config
                .thread_markers
                .iter()
                .find(|marker| name.contains(marker.as_str()))
            {
                return Ok(Some(format!(
                    "agent thread {:?} (tid {}, marker {})",
                    name,
                    entry.file_name().to_string_lossy(),
                    marker
                )));
            }
        }

        Ok(None)
    }

    fn scan_files(&self) -> Result<Option<String>, ProbeError> {
        Ok(first_existing(&self.config.server_paths)
            .map(|path| format!("agent server binary present: {}", path.display())))
    }

    fn scan_local(&self) -> Option<String> {
        let category = self.category();
        signal(category, "maps", self.scan_maps())
            .or_else(|| signal(category, "threads", self.scan_threads()))
            .or_else(|| signal(category, "files", self.scan_files()))
    }

    /// Connect to every port in the range concurrently. Each attempt owns
    /// its socket and is bounded by the connect timeout; the first open port
    /// aborts the remaining attempts.
    async fn scan_ports(&self) -> Result<Option<String>, ProbeError> {
        let cfg = &self.config;
        if cfg.port_start > cfg.port_end {
            return Err(ProbeError::unexpected_format(
                "instrumentation.port_range",
                format!("{}..={} is empty", cfg.port_start, cfg.port_end),
            ));
        }

        let mut attempts = JoinSet::new();
        for port in cfg.port_start..=cfg.port_end {
            attempts.spawn(probe_port(cfg.host, port, cfg.connect_timeout()));
        }

        while let Some(joined) = attempts.join_next().await {
            if let Ok(Some(addr)) = joined {
                attempts.abort_all();
                return Ok(Some(format!("agent listener open on {}", addr)));
            }
        }

        Ok(None)
    }
}

/// `comm` of one thread, trailing newline stripped. `None` if the thread is gone.
fn read_thread_name(task: &Path) -> Option<String> {
    fs::read_to_string(task.join("comm"))
        .ok()
        .map(|name| name.trim_end().to_string())
}

async fn probe_port(host: IpAddr, port: u16, connect_timeout: Duration) -> Option<SocketAddr> {
    let addr = SocketAddr::new(host, port);
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Some(addr)
        }
        Ok(Err(_)) => None,
        Err(_) => None, // Timeout
    }
}

#[async_trait]
impl Probe for InstrumentationProbe {
    fn category(&self) -> ThreatCategory {
        ThreatCategory::Instrumentation
    }

    async fn observe(&self) -> ProbeOutcome {
        let local = self.clone();
        let mut evidence = blocking(self.category(), move || local.scan_local()).await;

        if evidence.is_none() {
            evidence = signal(self.category(), "ports", self.scan_ports().await);
        }

        if let Some(found) = &evidence {
            info!("Instrumentation detected: {}", found);
        }
        ProbeOutcome::from_evidence(self.category(), evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::net::{Ipv4Addr, TcpListener};
    use std::time::Instant;
    use tempfile::TempDir;

    /// Fake `/proc/self` with one thread per given name
    fn fake_self(thread_names: &[&str], maps: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("maps"), maps).unwrap();
        for (i, name) in thread_names.iter().enumerate() {
            let task = dir.path().join("task").join((1000 + i).to_string());
            fs::create_dir_all(&task).unwrap();
            fs::write(task.join("comm"), format!("{}\n", name)).unwrap();
        }
        fs::create_dir_all(dir.path().join("task")).unwrap();
        dir
    }

    fn closed_port() -> u16 {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    }

    fn probe(dir: &TempDir, port_start: u16, port_end: u16) -> InstrumentationProbe {
        let config = InstrumentationConfig {
            port_start,
            port_end,
            server_paths: vec![dir.path().join("frida-server")],
            ..InstrumentationConfig::default()
        };
        InstrumentationProbe::new(config, dir.path().join("maps"), dir.path().join("task"))
    }

    const CLEAN_MAPS: &str = "5581d000-5581e000 r-xp 00000000 fd:01 42 /system/bin/app_process64\n";

    #[tokio::test]
    async fn test_clean_environment() {
        let dir = fake_self(&["main", "RenderThread", "OkHttp Dispatch"], CLEAN_MAPS);
        let port = closed_port();

        let outcome = probe(&dir, port, port).observe().await;
        assert_eq!(outcome, ProbeOutcome::clean(ThreatCategory::Instrumentation));
    }

    #[rstest::rstest]
    #[case("gum-js-loop")]
    #[case("gmain")]
    #[case("frida-helper")]
    #[tokio::test]
    async fn test_agent_thread_name(#[case] name: &str) {
        let dir = fake_self(&["main", name], CLEAN_MAPS);
        let probe = probe(&dir, 1, 1);

        let evidence = probe.scan_threads().unwrap().unwrap();
        assert!(evidence.contains(name));
        assert!(probe.observe().await.detected);
    }

    #[test]
    fn test_unrelated_thread_name() {
        let dir = fake_self(&["main", "Binder:1234_2", "HeapTaskDaemon"], CLEAN_MAPS);
        assert_eq!(probe(&dir, 1, 1).scan_threads().unwrap(), None);
    }

    #[test]
    fn test_vanished_thread_is_skipped() {
        let dir = fake_self(&["main"], CLEAN_MAPS);
        // Listed but without a readable comm, as after the thread exited
        fs::create_dir_all(dir.path().join("task").join("4242")).unwrap();
        assert_eq!(probe(&dir, 1, 1).scan_threads().unwrap(), None);
    }

    #[test]
    fn test_missing_task_dir_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let probe = InstrumentationProbe::new(
            InstrumentationConfig::default(),
            dir.path().join("maps"),
            dir.path().join("task"),
        );
        assert_matches!(probe.scan_threads(), Err(ProbeError::Unavailable { .. }));
        assert_matches!(probe.scan_maps(), Err(ProbeError::Unavailable { .. }));
    }

    #[test]
    fn test_agent_mapping() {
        let maps = format!(
            "{}7a00-7b00 r-xp 00000000 fd:01 77 /data/app/~~x/lib/arm64/libgadget.so\n",
            CLEAN_MAPS
        );
        let dir = fake_self(&["main"], &maps);

        let evidence = probe(&dir, 1, 1).scan_maps().unwrap().unwrap();
        assert!(evidence.contains("libgadget.so"));
    }

    #[test]
    fn test_server_binary() {
        let dir = fake_self(&["main"], CLEAN_MAPS);
        fs::write(dir.path().join("frida-server"), b"").unwrap();
        assert!(probe(&dir, 1, 1).scan_files().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_listener_in_range_flips_detection() {
        let dir = fake_self(&["main"], CLEAN_MAPS);
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = probe(&dir, port, port);

        let outcome = probe.observe().await;
        assert!(outcome.detected);
        assert_eq!(
            outcome.evidence,
            Some(format!("agent listener open on 127.0.0.1:{}", port))
        );

        drop(listener);
        assert!(!probe.observe().await.detected);
    }

    #[tokio::test]
    async fn test_port_scan_bounded_by_timeout() {
        let dir = fake_self(&["main"], CLEAN_MAPS);
        let port = closed_port();
        let probe = probe(&dir, port, port.saturating_add(5));

        let started = Instant::now();
        let _ = probe.scan_ports().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_inverted_range_is_absent() {
        let dir = fake_self(&["main"], CLEAN_MAPS);
        let probe = probe(&dir, 27047, 27042);
        assert_matches!(probe.scan_ports().await, Err(ProbeError::UnexpectedFormat { .. }));
    }
}
