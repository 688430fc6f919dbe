use crate::error::ScanError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STATE_PATH: &str = ".protscan_jobs.json";

/// One explicit configuration structure passed into every entry point.
///
/// Every field has a documented default so a missing or partial config file
/// still yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Launcher for the external analysis tool in a real deployment.
    pub interpro_path: String,
    /// Requested output format (tsv, xml, json, gff3). Default: tsv.
    pub output_format: String,
    /// Comma-separated database subset. None means all databases.
    pub databases: Option<String>,
    /// Include Gene-Ontology annotations in tool output. Default: true.
    pub include_goterms: bool,
    /// Include pathway annotations in tool output. Default: true.
    pub include_pathways: bool,
    /// Priority assigned to submissions that do not specify one (1-10).
    pub default_priority: u8,
    /// Upper bound for one external analysis run, in seconds.
    pub timeout_secs: u64,
    /// Persisted job store location.
    pub state_path: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interpro_path: "interproscan.sh".to_string(),
            output_format: "tsv".to_string(),
            databases: None,
            include_goterms: true,
            include_pathways: true,
            default_priority: 5,
            timeout_secs: 1800,
            state_path: DEFAULT_STATE_PATH.to_string(),
        }
    }
}

impl ScanConfig {
    pub fn from_json_file(path: &str) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScanError::invalid_input(format!("Could not read config file '{path}': {e}"))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ScanError::invalid_input(format!("Invalid JSON in config file '{path}': {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.output_format, "tsv");
        assert_eq!(config.default_priority, 5);
        assert!(config.databases.is_none());
        assert!(config.include_goterms);
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"output_format": "json", "default_priority": 8}}"#).unwrap();
        let config = ScanConfig::from_json_file(&file.path().to_string_lossy()).unwrap();
        assert_eq!(config.output_format, "json");
        assert_eq!(config.default_priority, 8);
        assert_eq!(config.interpro_path, "interproscan.sh");
        assert_eq!(config.timeout_secs, 1800);
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(ScanConfig::from_json_file(&file.path().to_string_lossy()).is_err());
    }
}
