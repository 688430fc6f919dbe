//! Synchronous analysis path: load the input, obtain tool output, parse and
//! summarize in one call. Suitable for small inputs where the caller waits;
//! larger datasets go through the job queue instead.

use crate::aggregate::{SummaryStats, summary_stats};
use crate::annotation::{ParsedResult, parse_interpro_tsv};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::{fasta, sample_data};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub result: ParsedResult,
    pub stats: SummaryStats,
    pub sequence_count: usize,
    /// Command line a real deployment would have executed.
    pub tool_command: String,
    pub raw_output: String,
    pub tsv_file: Option<String>,
    pub summary_file: Option<String>,
}

/// Build the external tool command line for one scan. The mock backend
/// never executes it, but it is logged and reported so a deployment can
/// verify what the configuration resolves to.
pub fn tool_invocation(input: &Path, config: &ScanConfig) -> String {
    let mut command = format!(
        "{} -i {} -f {}",
        config.interpro_path,
        input.display(),
        config.output_format
    );
    if let Some(databases) = &config.databases {
        command.push_str(&format!(" -appl {databases}"));
    }
    if config.include_goterms {
        command.push_str(" -goterms");
    }
    if config.include_pathways {
        command.push_str(" -pa");
    }
    command
}

fn summary_json_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "analysis".to_string());
    name.push_str(".summary.json");
    output.with_file_name(name)
}

/// Run one synchronous protein domain scan.
///
/// The external tool invocation is stubbed by the mock backend; the input
/// is still loaded and validated so missing files fail the same way they
/// would against a real deployment. When `output` is given, the raw TSV
/// and a parsed `.summary.json` are written next to each other.
pub fn run_protein_scan(
    input: &Path,
    output: Option<&Path>,
    config: &ScanConfig,
) -> Result<ScanReport, ScanError> {
    let sequences = fasta::load_fasta(input)?;
    let tool_command = tool_invocation(input, config);
    info!(
        "Analyzing {} sequences from '{}' ('{tool_command}', timeout {}s)",
        sequences.len(),
        input.display(),
        config.timeout_secs
    );

    let raw_output = sample_data::mock_scan_results(Utc::now());
    let result = parse_interpro_tsv(&raw_output);
    let stats = summary_stats(&result);

    let mut tsv_file = None;
    let mut summary_file = None;
    if let Some(output) = output {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, &raw_output)?;
        tsv_file = Some(output.to_string_lossy().to_string());

        let summary_path = summary_json_path(output);
        let summary_text = serde_json::to_string_pretty(&result)
            .map_err(|e| ScanError::new(crate::error::ErrorCode::Internal, e.to_string()))?;
        std::fs::write(&summary_path, summary_text)?;
        summary_file = Some(summary_path.to_string_lossy().to_string());
    }

    Ok(ScanReport {
        result,
        stats,
        sequence_count: sequences.len(),
        tool_command,
        raw_output,
        tsv_file,
        summary_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_sample_fasta() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.fasta");
        fasta::create_sample_fasta(&input).unwrap();

        let report = run_protein_scan(&input, None, &ScanConfig::default()).unwrap();
        assert_eq!(report.sequence_count, 2);
        assert_eq!(report.stats.total_sequences, 2);
        assert!(report.raw_output.contains("P53_HUMAN"));
        assert!(report.tsv_file.is_none());
    }

    #[test]
    fn test_scan_writes_output_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.fasta");
        fasta::create_sample_fasta(&input).unwrap();
        let output = dir.path().join("results/domains.tsv");

        let report = run_protein_scan(&input, Some(&output), &ScanConfig::default()).unwrap();
        assert!(output.exists());
        let summary = dir.path().join("results/domains.summary.json");
        assert!(summary.exists());
        assert_eq!(report.summary_file.as_deref(), Some(&*summary.to_string_lossy()));

        let parsed: crate::annotation::ParsedResult =
            serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(parsed.sequences.len(), 2);
    }

    #[test]
    fn test_tool_invocation_reflects_config() {
        let input = Path::new("proteins.fasta");
        let default_cmd = tool_invocation(input, &ScanConfig::default());
        assert_eq!(
            default_cmd,
            "interproscan.sh -i proteins.fasta -f tsv -goterms -pa"
        );

        let config = ScanConfig {
            interpro_path: "/opt/interproscan/interproscan.sh".to_string(),
            output_format: "xml".to_string(),
            databases: Some("Pfam,SMART".to_string()),
            include_goterms: false,
            include_pathways: false,
            ..ScanConfig::default()
        };
        assert_eq!(
            tool_invocation(input, &config),
            "/opt/interproscan/interproscan.sh -i proteins.fasta -f xml -appl Pfam,SMART"
        );
    }

    #[test]
    fn test_scan_report_carries_tool_command() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.fasta");
        fasta::create_sample_fasta(&input).unwrap();
        let report = run_protein_scan(&input, None, &ScanConfig::default()).unwrap();
        assert!(report.tool_command.starts_with("interproscan.sh -i "));
        assert!(report.tool_command.ends_with("-goterms -pa"));
    }

    #[test]
    fn test_scan_missing_input_fails() {
        let err = run_protein_scan(
            Path::new("/nonexistent.fasta"),
            None,
            &ScanConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }
}
