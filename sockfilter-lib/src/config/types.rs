use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Compiled socket filter to load
    #[serde(default)]
    pub program: ProgramConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Apply command-line overrides on top of the file (or default) values
    pub fn apply_overrides(&mut self, path: Option<PathBuf>, name: Option<String>) {
        if let Some(path) = path {
            self.program.path = path;
        }
        if name.is_some() {
            self.program.name = name;
        }
    }
}

/// Program image configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProgramConfig {
    /// Path to the compiled BPF ELF object
    /// Default: "bpf/socket_filter.o"
    #[serde(default = "default_program_path")]
    pub path: PathBuf,
    /// Name of the socket filter program inside the object
    /// When omitted, the object must contain exactly one socket filter
    /// Default: None
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self { path: default_program_path(), name: None }
    }
}

fn default_program_path() -> PathBuf {
    PathBuf::from("bpf/socket_filter.o")
}

/// Logging configuration
/// Controls application-level structured logging (stderr)
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    /// Default: "info"
    /// Can be overridden at runtime via RUST_LOG environment variable
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
