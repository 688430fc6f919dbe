//! Parser for InterProScan tabular (TSV) output.
//!
//! Input rows carry 15 tab-separated columns per match:
//! sequence id, MD5 checksum, sequence length, analysis, signature accession,
//! signature description, start, stop, score, match status, date, InterPro
//! accession, InterPro description, GO annotations, pathways. The sentinel
//! for "no value" is a single hyphen. Comment lines start with `#`.
//!
//! Malformed or short rows are skipped silently. That leniency is part of
//! the contract: real tool output contains partial rows and the parser must
//! degrade to whatever it can read.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const NO_VALUE: &str = "-";

/// One (sequence, analysis, signature) hit from the tabular output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub analysis: String,
    pub signature_acc: String,
    pub signature_desc: String,
    /// 1-based, inclusive, start <= stop.
    pub start: u64,
    pub stop: u64,
    /// Numeric string (often an e-value) or a non-numeric sentinel.
    pub score: String,
    pub interpro_acc: Option<String>,
    pub interpro_desc: Option<String>,
    pub go_terms: Vec<String>,
    pub pathways: Vec<String>,
}

/// Per-sequence annotation index. Sets are de-duplicated; `annotations`
/// preserves raw row order, which score filtering and display rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceAnnotations {
    pub checksum: String,
    pub length: u64,
    pub domains: BTreeSet<String>,
    pub families: BTreeSet<String>,
    pub go_terms: BTreeSet<String>,
    pub pathways: BTreeSet<String>,
    pub annotations: Vec<Annotation>,
}

/// Aggregate over all sequences in one tabular output, with global
/// de-duplicated description and identifier sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResult {
    pub sequences: BTreeMap<String, SequenceAnnotations>,
    pub domains: BTreeSet<String>,
    pub families: BTreeSet<String>,
    pub go_terms: BTreeSet<String>,
    pub pathways: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureClass {
    Domain,
    Family,
    Other,
}

/// Fixed classification of analysis methods into domain vs family
/// signatures. Unrecognized methods contribute to neither set but their
/// annotations are still recorded.
pub fn classify_analysis(analysis: &str) -> SignatureClass {
    match analysis {
        "Pfam" | "SMART" | "GENE3D" | "SUPERFAMILY" => SignatureClass::Domain,
        "PRINTS" | "PANTHER" | "ProSiteProfiles" => SignatureClass::Family,
        _ => SignatureClass::Other,
    }
}

fn optional_field(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == NO_VALUE {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split a `GO:id|description,GO:id|description` field into bare GO ids.
/// The description after `|` is display-only and discarded here.
fn parse_go_field(field: &str) -> Vec<String> {
    field
        .split(',')
        .filter_map(|entry| {
            let (id, _description) = entry.split_once('|')?;
            let id = id.trim();
            if id.is_empty() { None } else { Some(id.to_string()) }
        })
        .collect()
}

fn parse_pathway_field(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && *token != NO_VALUE)
        .map(ToString::to_string)
        .collect()
}

/// Parse raw TSV output into a structured per-sequence annotation index.
///
/// The first row seen for a sequence determines the stored checksum and
/// length. Rows whose positions or length fail to parse are dropped like
/// any other malformed row.
pub fn parse_interpro_tsv(tsv_content: &str) -> ParsedResult {
    let mut result = ParsedResult::default();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .from_reader(tsv_content.as_bytes());

    for row in reader.records() {
        let Ok(row) = row else { continue };
        if row.len() < 15 {
            continue;
        }

        let seq_id = row[0].trim();
        if seq_id.is_empty() {
            continue;
        }
        let Ok(length) = row[2].trim().parse::<u64>() else {
            continue;
        };
        let (Ok(start), Ok(stop)) = (row[6].trim().parse::<u64>(), row[7].trim().parse::<u64>())
        else {
            continue;
        };
        if start > stop {
            continue;
        }

        let analysis = row[3].trim().to_string();
        let signature_desc = row[5].trim().to_string();
        let go_terms = match optional_field(&row[13]) {
            Some(field) => parse_go_field(&field),
            None => vec![],
        };
        let pathways = match optional_field(&row[14]) {
            Some(field) => parse_pathway_field(&field),
            None => vec![],
        };

        let annotation = Annotation {
            analysis: analysis.clone(),
            signature_acc: row[4].trim().to_string(),
            signature_desc: signature_desc.clone(),
            start,
            stop,
            score: row[8].trim().to_string(),
            interpro_acc: optional_field(&row[11]),
            interpro_desc: optional_field(&row[12]),
            go_terms: go_terms.clone(),
            pathways: pathways.clone(),
        };

        let entry = result
            .sequences
            .entry(seq_id.to_string())
            .or_insert_with(|| SequenceAnnotations {
                checksum: row[1].trim().to_string(),
                length,
                ..SequenceAnnotations::default()
            });

        match classify_analysis(&analysis) {
            SignatureClass::Domain => {
                entry.domains.insert(signature_desc.clone());
                result.domains.insert(signature_desc);
            }
            SignatureClass::Family => {
                entry.families.insert(signature_desc.clone());
                result.families.insert(signature_desc);
            }
            SignatureClass::Other => {}
        }
        for go_id in &go_terms {
            entry.go_terms.insert(go_id.clone());
            result.go_terms.insert(go_id.clone());
        }
        for pathway in &pathways {
            entry.pathways.insert(pathway.clone());
            result.pathways.insert(pathway.clone());
        }
        entry.annotations.push(annotation);
    }

    result
}
