// Engine Configuration

use serde::{Deserialize, Serialize};

use crate::application::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_HEAL_RECURSION, DEFAULT_PACING_MAX_MS, DEFAULT_PACING_MIN_MS,
};

/// Tunables for one orchestrator instance.
///
/// All fields default so a bare `EngineConfig::default()` (or an empty
/// config document) yields a working engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Items per batch file; fixed for the life of a run
    pub batch_size: u32,

    /// Inter-batch pacing window (uniform random delay, not backoff).
    /// This paces against the external system's abuse detection.
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,

    /// Healing restarts allowed before the run is declared fatal
    pub max_heal_recursion: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pacing_min_ms: DEFAULT_PACING_MIN_MS,
            pacing_max_ms: DEFAULT_PACING_MAX_MS,
            max_heal_recursion: DEFAULT_MAX_HEAL_RECURSION,
        }
    }
}

impl EngineConfig {
    /// Config with pacing disabled, for tests and dry runs
    pub fn without_pacing() -> Self {
        Self {
            pacing_min_ms: 0,
            pacing_max_ms: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_from_empty_document() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.batch_size > 0);
        assert!(config.pacing_min_ms <= config.pacing_max_ms);
    }

    #[test]
    fn test_partial_document_overrides_single_field() {
        let config: EngineConfig = serde_json::from_str(r#"{"batch_size": 25}"#).unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_heal_recursion, EngineConfig::default().max_heal_recursion);
    }
}
