//! Simulator configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with `QSTATE_` prefix)
//!
//! Precedence (highest to lowest): environment variables, configuration
//! file, default values.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SimError, SimResult};

/// Largest qubit count any configuration may allow.
///
/// `2^32` amplitudes of `Complex64` is 64 GiB.
pub const HARD_MAX_QUBITS: u32 = 32;

/// Complete simulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Largest program the engine accepts.
    #[serde(default = "default_max_qubits")]
    pub max_qubits: u32,

    /// Allowed deviation of the total probability from 1.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Verify the norm after every gate.
    #[serde(default = "default_true")]
    pub check_normalization: bool,

    /// Base seed for reproducible sampling; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Shot execution settings.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shot execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Run independent trajectories on a worker pool.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Dedicated worker count; the global rayon pool is used when absent.
    #[serde(default)]
    pub num_threads: Option<usize>,

    /// Minimum shot count before trajectories are spread over workers.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive, e.g. "info" or "qstate_sim=debug".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_max_qubits() -> u32 {
    qstate_ir::DEFAULT_QUBIT_BUDGET
}

fn default_tolerance() -> f64 {
    1e-9
}

fn default_true() -> bool {
    true
}

fn default_parallel_threshold() -> u32 {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_qubits: default_max_qubits(),
            tolerance: default_tolerance(),
            check_normalization: true,
            seed: None,
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            num_threads: None,
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SimulatorConfig {
    /// Set the qubit ceiling.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: u32) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Set the base sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable parallel trajectories.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.execution.parallel = parallel;
        self
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(contents: &str) -> SimResult<Self> {
        let config: Self = serde_yaml_ng::from_str(contents)
            .map_err(|e| SimError::Configuration(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SimError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Load configuration with the following precedence:
    /// 1. Load from file if provided
    /// 2. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> SimResult<Self> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge `QSTATE_*` environment variables into this configuration.
    pub fn merge_env(self) -> SimResult<Self> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge overrides from an arbitrary variable source.
    ///
    /// Only variables that are present override the current values; a
    /// present but unparsable value is an error.
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> SimResult<Self> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> SimResult<T> {
            raw.trim()
                .parse()
                .map_err(|_| SimError::Configuration(format!("{key}: cannot parse '{raw}'")))
        }

        if let Some(v) = lookup("QSTATE_MAX_QUBITS") {
            self.max_qubits = parse("QSTATE_MAX_QUBITS", &v)?;
        }
        if let Some(v) = lookup("QSTATE_TOLERANCE") {
            self.tolerance = parse("QSTATE_TOLERANCE", &v)?;
        }
        if let Some(v) = lookup("QSTATE_SEED") {
            self.seed = Some(parse("QSTATE_SEED", &v)?);
        }
        if let Some(v) = lookup("QSTATE_THREADS") {
            self.execution.num_threads = Some(parse("QSTATE_THREADS", &v)?);
        }
        if let Some(v) = lookup("QSTATE_PARALLEL") {
            self.execution.parallel = parse("QSTATE_PARALLEL", &v)?;
        }
        if let Some(v) = lookup("QSTATE_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(self)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> SimResult<()> {
        if self.max_qubits > HARD_MAX_QUBITS {
            return Err(SimError::Configuration(format!(
                "max_qubits {} exceeds the hard ceiling of {HARD_MAX_QUBITS}",
                self.max_qubits
            )));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1e-3) {
            return Err(SimError::Configuration(format!(
                "tolerance must lie in (0, 1e-3), got {}",
                self.tolerance
            )));
        }
        if self.execution.num_threads == Some(0) {
            return Err(SimError::Configuration(
                "num_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
