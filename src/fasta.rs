//! FASTA input handling, sample-data creation, and processing-time
//! estimation for submitted files.

use crate::error::ScanError;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::io::Write;
use std::path::Path;

const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Two well-characterized sample proteins with known domain content.
const SAMPLE_PROTEINS: [(&str, &str); 2] = [
    (
        ">P53_HUMAN|Tumor suppressor p53|Homo sapiens",
        "MEEPQSDPSVEPPLSQETFSDLWKLLPENNVLSPLPSQAMDDLMLSPDDIEQWFTEDPGP\
         DEAPRMPEAAPPVAPAPAAPTPAAPAPAPSWPLSSSVPSQKTYQGSYGFRLGFLHSGTAK\
         SVTCTYSPALNKMFCQLAKTCPVQLWVDSTPPPGTRVRAMAIYKQSQHMTEVVRRCPHHC\
         SRCRNVSRRRCGQCRLRKCYEVFEFYREGEFVGNLAFYTDKCRRCENKLTKPCRCWRCGK\
         EGHQMKDCTERQANFLGKIWPSYKGRVPLNLHGSESIGMYRERQCQGDGRCSNHGCKRMN\
         HSWCQFCNSLGRHCPLSADHSACDCGCAHCQVCTCACGGCRQCDQHCGCHYCCAAHCTGC\
         PCNCKACTQGFCWHSSLAHQKQKNEQHCGLGHLKRHKKHTG",
    ),
    (
        ">INSULIN_HUMAN|Insulin|Homo sapiens",
        "MALWMRLLPLLALLALWGPDPAAAFVNQHLCGSHLVEALYLVCGERGFFYTPKTRREAED\
         LQVGQVELGGGPGAGSLQPLALEGSLQKRGIVEQCCTSICSLYQLENYCN",
    ),
];

/// Load a FASTA file as (header, sequence) pairs. Headers keep their
/// leading `>`; sequence lines are concatenated verbatim.
pub fn load_fasta(path: &Path) -> Result<Vec<(String, String)>, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ScanError::invalid_input(format!("FASTA file not found: '{}': {e}", path.display()))
    })?;

    let mut sequences = Vec::new();
    let mut header: Option<String> = None;
    let mut sequence = String::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(_rest) = line.strip_prefix('>') {
            if let Some(prev) = header.take() {
                sequences.push((prev, std::mem::take(&mut sequence)));
            }
            header = Some(line.to_string());
        } else {
            sequence.push_str(line);
        }
    }
    if let Some(prev) = header {
        sequences.push((prev, sequence));
    }
    Ok(sequences)
}

fn create_parent_dirs(path: &Path) -> Result<(), ScanError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write the curated two-protein sample FASTA (p53 and insulin).
pub fn create_sample_fasta(path: &Path) -> Result<(), ScanError> {
    create_parent_dirs(path)?;
    let mut file = std::fs::File::create(path)?;
    for (header, sequence) in SAMPLE_PROTEINS {
        writeln!(file, "{header}")?;
        writeln!(file, "{sequence}")?;
    }
    Ok(())
}

/// Generate a random protein dataset for exercising the job queue.
/// Sequences are 100-500 residues of uniformly drawn amino acids.
pub fn generate_protein_dataset(path: &Path, num_sequences: usize) -> Result<(), ScanError> {
    create_parent_dirs(path)?;
    let mut rng = rand::rng();
    let mut file = std::fs::File::create(path)?;
    for i in 0..num_sequences {
        let length = rng.random_range(100..=500);
        let sequence: String = (0..length)
            .map(|_| {
                *AMINO_ACIDS
                    .choose(&mut rng)
                    .unwrap_or(&b'A') as char
            })
            .collect();
        writeln!(
            file,
            ">PROTEIN_{:03}|Generated protein {}|Test organism",
            i + 1,
            i + 1
        )?;
        writeln!(file, "{sequence}")?;
    }
    Ok(())
}

/// Estimate processing time in minutes from file size: 1 minute per KB,
/// clamped to 1-60. Falls back to 5 minutes if the file cannot be read.
pub fn estimate_processing_minutes(path: &Path) -> i64 {
    match std::fs::metadata(path) {
        Ok(meta) => ((meta.len() / 1024) as i64).clamp(1, 60),
        Err(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sample_fasta_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.fasta");
        create_sample_fasta(&path).unwrap();
        let sequences = load_fasta(&path).unwrap();
        assert_eq!(sequences.len(), 2);
        assert!(sequences[0].0.starts_with(">P53_HUMAN"));
        assert!(sequences[1].1.ends_with("ENYCN"));
    }

    #[test]
    fn test_load_fasta_joins_wrapped_sequence_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wrapped.fasta");
        std::fs::write(&path, ">SEQ1|test\nABC\nDEF\n>SEQ2|test\nGHI\n").unwrap();
        let sequences = load_fasta(&path).unwrap();
        assert_eq!(sequences[0].1, "ABCDEF");
        assert_eq!(sequences[1].1, "GHI");
    }

    #[test]
    fn test_load_fasta_missing_file_is_invalid_input() {
        let err = load_fasta(Path::new("/nonexistent/input.fasta")).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_generated_dataset_has_requested_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.fasta");
        generate_protein_dataset(&path, 7).unwrap();
        let sequences = load_fasta(&path).unwrap();
        assert_eq!(sequences.len(), 7);
        for (_, seq) in &sequences {
            assert!((100..=500).contains(&seq.len()));
            assert!(seq.bytes().all(|b| AMINO_ACIDS.contains(&b)));
        }
    }

    #[test]
    fn test_estimate_is_clamped() {
        let dir = tempdir().unwrap();
        let small = dir.path().join("small.fasta");
        std::fs::write(&small, "tiny").unwrap();
        assert_eq!(estimate_processing_minutes(&small), 1);

        let big = dir.path().join("big.fasta");
        std::fs::write(&big, vec![b'A'; 200 * 1024]).unwrap();
        assert_eq!(estimate_processing_minutes(&big), 60);

        assert_eq!(
            estimate_processing_minutes(Path::new("/nonexistent.fasta")),
            5
        );
    }
}
