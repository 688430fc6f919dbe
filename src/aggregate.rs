//! Cross-sequence summary statistics and score/analysis filtering over
//! parsed annotation results.

use crate::annotation::{ParsedResult, SequenceAnnotations, SignatureClass, classify_analysis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_sequences: usize,
    pub domains_found: usize,
    pub families_found: usize,
    pub go_terms_found: usize,
    pub pathways_found: usize,
    pub sequences_with_annotations: usize,
    pub total_annotations: usize,
    /// Rounded to two decimal places.
    pub avg_annotations_per_sequence: f64,
    pub avg_domains_per_sequence: f64,
    pub avg_families_per_sequence: f64,
    /// Percentage of sequences with at least one annotation, one decimal.
    pub annotation_coverage: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute summary statistics. All ratios are 0 for an empty result; there
/// is no division-by-zero path.
pub fn summary_stats(result: &ParsedResult) -> SummaryStats {
    let total_sequences = result.sequences.len();
    if total_sequences == 0 {
        return SummaryStats::default();
    }

    let mut sequences_with_annotations = 0;
    let mut total_annotations = 0;
    let mut total_domains = 0;
    let mut total_families = 0;
    for seq in result.sequences.values() {
        if !seq.annotations.is_empty() {
            sequences_with_annotations += 1;
            total_annotations += seq.annotations.len();
        }
        total_domains += seq.domains.len();
        total_families += seq.families.len();
    }

    let n = total_sequences as f64;
    SummaryStats {
        total_sequences,
        domains_found: result.domains.len(),
        families_found: result.families.len(),
        go_terms_found: result.go_terms.len(),
        pathways_found: result.pathways.len(),
        sequences_with_annotations,
        total_annotations,
        avg_annotations_per_sequence: round2(total_annotations as f64 / n),
        avg_domains_per_sequence: round2(total_domains as f64 / n),
        avg_families_per_sequence: round2(total_families as f64 / n),
        annotation_coverage: round1(sequences_with_annotations as f64 / n * 100.0),
    }
}

/// Rebuild a parsed result keeping only annotations that match the analysis
/// filter and score threshold.
///
/// Lower scores are better (e-value convention), so a numeric score is
/// retained only when it is at or below `min_score`; non-numeric scores are
/// always retained. Sequences left without annotations are dropped, and
/// their domain/family sets are recomputed from the survivors. GO and
/// pathway sets for surviving sequences are carried over from the original
/// unfiltered per-sequence sets; they are deliberately not re-derived from
/// the filtered annotation list.
pub fn filter_by_score(
    result: &ParsedResult,
    min_score: Option<f64>,
    analysis_types: Option<&[String]>,
) -> ParsedResult {
    let mut filtered = ParsedResult::default();

    for (seq_id, seq) in &result.sequences {
        let mut kept = Vec::new();
        let mut domains = BTreeSet::new();
        let mut families = BTreeSet::new();

        for annotation in &seq.annotations {
            if let Some(types) = analysis_types {
                if !types.iter().any(|t| *t == annotation.analysis) {
                    continue;
                }
            }
            if let Some(threshold) = min_score {
                if let Ok(score) = annotation.score.parse::<f64>() {
                    if score > threshold {
                        continue;
                    }
                }
            }

            match classify_analysis(&annotation.analysis) {
                SignatureClass::Domain => {
                    domains.insert(annotation.signature_desc.clone());
                }
                SignatureClass::Family => {
                    families.insert(annotation.signature_desc.clone());
                }
                SignatureClass::Other => {}
            }
            kept.push(annotation.clone());
        }

        if kept.is_empty() {
            continue;
        }

        filtered.domains.extend(domains.iter().cloned());
        filtered.families.extend(families.iter().cloned());
        filtered.go_terms.extend(seq.go_terms.iter().cloned());
        filtered.pathways.extend(seq.pathways.iter().cloned());
        filtered.sequences.insert(
            seq_id.clone(),
            SequenceAnnotations {
                checksum: seq.checksum.clone(),
                length: seq.length,
                domains,
                families,
                go_terms: seq.go_terms.clone(),
                pathways: seq.pathways.clone(),
                annotations: kept,
            },
        );
    }

    filtered
}
