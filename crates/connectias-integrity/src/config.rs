// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Engine configuration.
//!
//! Defaults come from [`crate::signatures`]. A JSON document may override any
//! subset of fields; omitted fields keep their defaults.

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::signatures;

fn paths(table: &[&str]) -> Vec<PathBuf> {
    table.iter().map(PathBuf::from).collect()
}

fn strings(table: &[&str]) -> Vec<String> {
    table.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mount point of the process introspection filesystem
    pub proc_root: PathBuf,
    pub root: RootConfig,
    pub instrumentation: InstrumentationConfig,
    pub emulator: EmulatorConfig,
    pub tamper: TamperConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            proc_root: PathBuf::from("/proc"),
            root: RootConfig::default(),
            instrumentation: InstrumentationConfig::default(),
            emulator: EmulatorConfig::default(),
            tamper: TamperConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let instr = &self.instrumentation;
        if instr.port_start > instr.port_end {
            return Err(ConfigError::InvalidPortRange {
                start: instr.port_start,
                end: instr.port_end,
            });
        }
        if instr.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("instrumentation.connect_timeout_ms"));
        }
        if self.root.command_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("root.command_timeout_ms"));
        }
        Ok(())
    }

    /// `<proc_root>/self/<entry>`
    pub fn self_entry(&self, entry: &str) -> PathBuf {
        self.proc_root.join("self").join(entry)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub paths: Vec<PathBuf>,
    /// Program and arguments; empty disables command resolution
    pub resolve_command: Vec<String>,
    pub command_timeout_ms: u64,
}

impl Default for RootConfig {
    fn default() -> Self {
        let mut all = paths(signatures::SU_PATHS);
        all.extend(paths(signatures::ROOT_PACKAGE_PATHS));
        all.extend(paths(signatures::MAGISK_PATHS));

        RootConfig {
            paths: all,
            resolve_command: strings(signatures::SU_RESOLVE_COMMAND),
            command_timeout_ms: 500,
        }
    }
}

impl RootConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    pub host: IpAddr,
    pub port_start: u16,
    pub port_end: u16,
    pub connect_timeout_ms: u64,
    pub map_markers: Vec<String>,
    pub thread_markers: Vec<String>,
    pub server_paths: Vec<PathBuf>,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        InstrumentationConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port_start: signatures::AGENT_PORT_START,
            port_end: signatures::AGENT_PORT_END,
            connect_timeout_ms: 100,
            map_markers: strings(signatures::AGENT_MAP_MARKERS),
            thread_markers: strings(signatures::AGENT_THREAD_MARKERS),
            server_paths: paths(signatures::AGENT_SERVER_PATHS),
        }
    }
}

impl InstrumentationConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub artifact_paths: Vec<PathBuf>,
    pub hardware_descriptors: Vec<PathBuf>,
    pub board_markers: Vec<String>,
    pub property_files: Vec<PathBuf>,
    pub property_markers: Vec<String>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            artifact_paths: paths(signatures::EMULATOR_FILES),
            hardware_descriptors: paths(signatures::HARDWARE_DESCRIPTORS),
            board_markers: strings(signatures::VIRTUAL_BOARD_MARKERS),
            property_files: paths(signatures::PROPERTY_FILES),
            property_markers: strings(signatures::EMULATOR_PROPERTY_MARKERS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TamperConfig {
    pub paths: Vec<PathBuf>,
}

impl Default for TamperConfig {
    fn default() -> Self {
        TamperConfig {
            paths: paths(signatures::TAMPER_TOOL_PATHS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults_from_signature_tables() {
        let config = EngineConfig::default();
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert!(config.root.paths.contains(&PathBuf::from("/system/xbin/su")));
        assert!(config.root.paths.contains(&PathBuf::from("/system/app/Superuser.apk")));
        assert_eq!(config.root.resolve_command, vec!["which", "su"]);
        assert_eq!(config.instrumentation.port_start, 27042);
        assert_eq!(config.instrumentation.port_end, 27047);
        assert_eq!(config.instrumentation.connect_timeout(), Duration::from_millis(100));
        assert_eq!(config.tamper.paths.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"proc_root": "/tmp/fakeproc", "instrumentation": {"port_start": 30000, "port_end": 30001}}"#,
        )
        .unwrap();

        assert_eq!(config.proc_root, PathBuf::from("/tmp/fakeproc"));
        assert_eq!(config.instrumentation.port_start, 30000);
        assert_eq!(config.instrumentation.connect_timeout_ms, 100);
        assert_eq!(config.instrumentation.thread_markers, vec!["gum-js-loop", "gmain", "frida"]);
        assert_eq!(config.self_entry("status"), PathBuf::from("/tmp/fakeproc/self/status"));
    }

    #[test]
    fn test_invalid_port_range_rejected() {
        let err = EngineConfig::from_json_str(
            r#"{"instrumentation": {"port_start": 27047, "port_end": 27042}}"#,
        )
        .unwrap_err();
        assert_matches!(err, ConfigError::InvalidPortRange { start: 27047, end: 27042 });
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = EngineConfig::from_json_str(r#"{"root": {"command_timeout_ms": 0}}"#).unwrap_err();
        assert_matches!(err, ConfigError::ZeroTimeout("root.command_timeout_ms"));
    }

    #[test]
    fn test_malformed_json() {
        assert_matches!(EngineConfig::from_json_str("{"), Err(ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tamper": {{"paths": ["/data/data/example.tool"]}}}}"#).unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.tamper.paths, vec![PathBuf::from("/data/data/example.tool")]);

        assert_matches!(
            EngineConfig::from_json_file("/nonexistent/config.json"),
            Err(ConfigError::Io { .. })
        );
    }
}
