//! Prober configuration
//!
//! The configuration is a static record: it is resolved once at startup and
//! never mutated afterwards. Resolution order is an explicit path, then the
//! `DEPLOYPROBE_CONFIG` variable, then the standard locations, then the
//! built-in defaults. Environment overrides are applied on top.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProbeError, Result};
use crate::types::ContainerRef;

pub const CONFIG_ENV: &str = "DEPLOYPROBE_CONFIG";
pub const HOST_ENV: &str = "DEPLOYPROBE_HOST";
pub const SSH_USER_ENV: &str = "DEPLOYPROBE_SSH_USER";
pub const SSH_PORT_ENV: &str = "DEPLOYPROBE_SSH_PORT";

/// Upper bound on the error lines shown per container
pub const MAX_LOG_EXCERPT_LINES: usize = 5;

const STANDARD_CONFIG_PATHS: [&str; 3] = [
    "~/.deployprobe/config.toml",
    "/etc/deployprobe/config.toml",
    "./deployprobe.toml",
];

/// A container reachable on the application network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: ContainerRef,
    /// Port the service listens on inside the network
    pub port: u16,
}

/// One entry of the reachability matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub source: ContainerRef,
    pub destination: ContainerRef,
    #[serde(default = "default_probe_path")]
    pub path: String,
}

impl ProbeSpec {
    pub fn new(source: &str, destination: &str, path: &str) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            path: path.to_string(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} -> {}", self.source, self.destination)
    }
}

fn default_probe_path() -> String {
    "/".to_string()
}

/// Publicly exposed URL checked from the operator machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default = "default_expect_status")]
    pub expect_status: u16,
}

fn default_expect_status() -> u16 {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProberConfig {
    /// Production server all diagnostics run against
    pub host: String,
    pub ssh_user: String,
    pub ssh_port: u16,
    pub identity_file: Option<String>,
    /// ssh binary; swapped for a stand-in in tests
    pub ssh_program: String,
    /// Extra arguments passed to ssh before the destination
    pub ssh_options: Vec<String>,
    pub connect_timeout_secs: u64,

    pub network_name: String,
    /// Unset means the in-container HTTP client default applies
    pub probe_timeout_secs: Option<u64>,

    pub log_filter: String,
    pub log_excerpt_lines: usize,
    /// Bounds the fetched log history; unset fetches everything
    pub log_scan_lines: Option<usize>,
    pub health_timeout_secs: u64,

    // Array-of-table fields stay last for TOML output
    pub services: Vec<ServiceSpec>,
    pub probes: Vec<ProbeSpec>,
    /// Empty means `https://<host>/` and `https://<host>/api/health`
    pub public_endpoints: Vec<PublicEndpoint>,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            ssh_user: "root".to_string(),
            ssh_port: 22,
            identity_file: None,
            ssh_program: "ssh".to_string(),
            ssh_options: Vec::new(),
            connect_timeout_secs: 10,
            network_name: "app-network".to_string(),
            probe_timeout_secs: None,
            log_filter: "error".to_string(),
            log_excerpt_lines: 5,
            log_scan_lines: None,
            health_timeout_secs: 10,
            services: vec![
                ServiceSpec { name: "edge-proxy".into(), port: 80 },
                ServiceSpec { name: "frontend".into(), port: 3000 },
                ServiceSpec { name: "backend".into(), port: 8000 },
                ServiceSpec { name: "realtime-server".into(), port: 1234 },
            ],
            probes: vec![
                ProbeSpec::new("frontend", "backend", "/health"),
                ProbeSpec::new("frontend", "realtime-server", "/"),
                ProbeSpec::new("edge-proxy", "frontend", "/"),
                ProbeSpec::new("edge-proxy", "backend", "/health"),
                ProbeSpec::new("edge-proxy", "realtime-server", "/"),
            ],
            public_endpoints: Vec::new(),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ProberConfig {
    /// Resolve the configuration from an explicit path, the environment or
    /// the standard locations, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = match explicit {
            Some(path) => (Self::from_file(path)?, ConfigSource::File(path.to_path_buf())),
            None => Self::discover()?,
        };
        config.apply_env_overrides()?;
        info!("Using configuration from {}", source);
        Ok((config, source))
    }

    fn discover() -> Result<(Self, ConfigSource)> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(shellexpand::tilde(&path).as_ref());
            return Ok((Self::from_file(&path)?, ConfigSource::File(path)));
        }

        for candidate in STANDARD_CONFIG_PATHS {
            let path = PathBuf::from(shellexpand::tilde(candidate).as_ref());
            if path.is_file() {
                return Ok((Self::from_file(&path)?, ConfigSource::File(path)));
            }
            debug!("No config at {}", path.display());
        }

        Ok((Self::default(), ConfigSource::Defaults))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|source| ProbeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var(HOST_ENV) {
            self.host = host;
        }
        if let Ok(user) = std::env::var(SSH_USER_ENV) {
            self.ssh_user = user;
        }
        if let Ok(port) = std::env::var(SSH_PORT_ENV) {
            self.ssh_port = port
                .parse()
                .map_err(|_| ProbeError::Config(format!("{} is not a port: {}", SSH_PORT_ENV, port)))?;
        }
        Ok(())
    }

    /// Write the configuration as TOML, refusing to clobber unless `force`.
    pub fn save(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(ProbeError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_toml()?)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// `~/.deployprobe/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ProbeError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(".deployprobe").join("config.toml"))
    }

    pub fn containers(&self) -> impl Iterator<Item = &ContainerRef> {
        self.services.iter().map(|s| &s.name)
    }

    pub fn service(&self, name: &ContainerRef) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| &s.name == name)
    }

    /// Internal address of a probe destination, e.g. `http://backend:8000/health`
    pub fn probe_url(&self, probe: &ProbeSpec) -> Option<String> {
        self.service(&probe.destination)
            .map(|svc| format!("http://{}:{}{}", svc.name, svc.port, probe.path))
    }

    pub fn effective_public_endpoints(&self) -> Vec<PublicEndpoint> {
        if !self.public_endpoints.is_empty() {
            return self.public_endpoints.clone();
        }
        vec![
            PublicEndpoint {
                name: "site".to_string(),
                url: format!("https://{}/", self.host),
                expect_status: 200,
            },
            PublicEndpoint {
                name: "api".to_string(),
                url: format!("https://{}/api/health", self.host),
                expect_status: 200,
            },
        ]
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.host.trim().is_empty() {
            result.errors.push("host must not be empty".to_string());
        }
        if self.ssh_user.trim().is_empty() {
            result.errors.push("ssh_user must not be empty".to_string());
        }
        if self.network_name.trim().is_empty() {
            result.errors.push("network_name must not be empty".to_string());
        }
        if !(1..=MAX_LOG_EXCERPT_LINES).contains(&self.log_excerpt_lines) {
            result.errors.push(format!(
                "log_excerpt_lines must be between 1 and {}, got {}",
                MAX_LOG_EXCERPT_LINES, self.log_excerpt_lines
            ));
        }
        if self.log_filter.is_empty() {
            result.errors.push("log_filter must not be empty".to_string());
        }

        let mut names = HashSet::new();
        for service in &self.services {
            if !names.insert(&service.name) {
                result.errors.push(format!("service {} is declared twice", service.name));
            }
        }

        let mut pairs = HashSet::new();
        for probe in &self.probes {
            if !names.contains(&probe.source) {
                result.errors.push(format!(
                    "probe {}: source {} is not a declared service",
                    probe.label(),
                    probe.source
                ));
            }
            if !names.contains(&probe.destination) {
                result.errors.push(format!(
                    "probe {}: destination {} is not a declared service",
                    probe.label(),
                    probe.destination
                ));
            }
            if !probe.path.starts_with('/') {
                result.errors.push(format!(
                    "probe {}: path must start with '/': {}",
                    probe.label(),
                    probe.path
                ));
            }
            if !pairs.insert((&probe.source, &probe.destination)) {
                result.errors.push(format!("probe {} is declared twice", probe.label()));
            }
        }

        if self.probes.len() != 5 {
            result.warnings.push(format!(
                "reachability matrix has {} probes, the standard matrix has 5",
                self.probes.len()
            ));
        }
        if self.services.is_empty() {
            result.warnings.push("no services declared; log and probe phases will be empty".to_string());
        }
        for endpoint in &self.public_endpoints {
            if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
                result.errors.push(format!(
                    "public endpoint {}: url must be http(s): {}",
                    endpoint.name, endpoint.url
                ));
            }
        }

        result
    }

    /// Fails with every validation error joined into one message
    pub fn ensure_valid(&self) -> Result<()> {
        let result = self.validate();
        if result.is_valid() {
            Ok(())
        } else {
            Err(ProbeError::Config(result.errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProberConfig::default();
        let result = config.validate();
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(config.probes.len(), 5);
        assert_eq!(config.containers().count(), 4);
    }

    #[test]
    fn test_default_probe_labels_are_unique() {
        let config = ProberConfig::default();
        let labels: HashSet<String> = config.probes.iter().map(ProbeSpec::label).collect();
        assert_eq!(labels.len(), 5);
    }

    #[test]
    fn test_probe_url() {
        let config = ProberConfig::default();
        let probe = ProbeSpec::new("frontend", "backend", "/health");
        assert_eq!(
            config.probe_url(&probe).as_deref(),
            Some("http://backend:8000/health")
        );

        let unknown = ProbeSpec::new("frontend", "worker", "/");
        assert!(config.probe_url(&unknown).is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ProberConfig::from_toml(
            r#"
host = "203.0.113.10"
ssh_user = "deploy"
"#,
        )
        .unwrap();
        assert_eq!(config.host, "203.0.113.10");
        assert_eq!(config.ssh_user, "deploy");
        assert_eq!(config.network_name, "app-network");
        assert_eq!(config.log_excerpt_lines, 5);
        assert_eq!(config.probes.len(), 5);
    }

    #[test]
    fn test_validate_reports_unknown_containers() {
        let mut config = ProberConfig::default();
        config.probes.push(ProbeSpec::new("worker", "backend", "health"));
        config.log_excerpt_lines = 0;

        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("source worker")));
        assert!(result.errors.iter().any(|e| e.contains("must start with '/'")));
        assert!(result.errors.iter().any(|e| e.contains("log_excerpt_lines")));
        assert_eq!(result.warnings.len(), 1);
        assert!(config.ensure_valid().is_err());
    }

    #[test]
    fn test_validate_caps_log_excerpt_lines() {
        let config = ProberConfig::from_toml("log_excerpt_lines = 6").unwrap();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("log_excerpt_lines must be between 1 and 5")));

        let config = ProberConfig::from_toml("log_excerpt_lines = 5").unwrap();
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_validate_rejects_duplicate_probe() {
        let mut config = ProberConfig::default();
        config.probes.push(ProbeSpec::new("frontend", "backend", "/other"));
        let result = config.validate();
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("frontend -> backend is declared twice")));
    }

    #[test]
    fn test_public_endpoints_derive_from_host() {
        let mut config = ProberConfig::default();
        config.host = "example.org".to_string();
        let endpoints = config.effective_public_endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].url, "https://example.org/");
        assert_eq!(endpoints[1].url, "https://example.org/api/health");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ProberConfig::default();
        config.host = "198.51.100.7".to_string();
        config.probe_timeout_secs = Some(3);
        config.save(&path, false).unwrap();

        let loaded = ProberConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);

        let err = config.save(&path, false).unwrap_err();
        assert!(matches!(err, ProbeError::AlreadyExists(_)));
        config.save(&path, true).unwrap();
    }

    #[test]
    fn test_from_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "host = [").unwrap();

        let err = ProberConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ProbeError::ConfigParse { .. }));
    }
}
