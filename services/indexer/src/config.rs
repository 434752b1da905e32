//! Runner configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Upper bound on transaction groups walked in parallel. Within a
    /// group, transactions stay strictly sequential.
    #[serde(default = "default_max_concurrent_groups")]
    pub max_concurrent_groups: usize,
    /// Process memory usage above which group processing drops to
    /// sequential until pressure subsides.
    #[serde(default = "default_memory_pressure_bytes")]
    pub memory_pressure_bytes: u64,
}

fn default_max_concurrent_groups() -> usize {
    8
}

fn default_memory_pressure_bytes() -> u64 {
    1 << 30
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_groups: default_max_concurrent_groups(),
            memory_pressure_bytes: default_memory_pressure_bytes(),
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg = RunnerConfig::from_toml_str("max_concurrent_groups = 2").unwrap();
        assert_eq!(cfg.max_concurrent_groups, 2);
        assert_eq!(cfg.memory_pressure_bytes, 1 << 30);
    }
}
