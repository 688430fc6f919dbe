//! Stand-in output for the external analysis tool.
//!
//! The real InterProScan run happens outside this system. Until a deployment
//! wires one in, these generators produce tabular output in the exact
//! 15-column TSV shape the parser consumes, so every downstream path
//! (parse, aggregate, filter, persist) is exercised end to end.

use chrono::{DateTime, Utc};

/// Mock TSV for a completed background job. Header comments carry the job
/// id and input path the way the real tool echoes its invocation.
pub fn mock_job_results(input_file: &str, job_id: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y-%m-%d %H:%M:%S");
    let date = now.format("%Y-%m-%d");
    format!(
        "# InterProScan version 5.59-91.0 - Async Results\n\
         # Analysis completed via background queue\n\
         # Job ID: {job_id}\n\
         # Input: {input_file}\n\
         # Completion time: {timestamp}\n\
         #\n\
         # Sequence\tMD5 checksum\tSequence length\tAnalysis\tSignature accession\tSignature description\tStart location\tStop location\tScore\tStatus\tDate\tInterPro accession\tInterPro description\tGO annotations\tPathways\n\
         PROTEIN_001\thash1abc123\t256\tPfam\tPF00001\tTest_Domain_1\t15\t245\t1.2E-15\tT\t{date}\tIPR001001\tTest domain 1\tGO:0003677|DNA binding\tREACTOME:R-HSA-12345\n\
         PROTEIN_001\thash1abc123\t256\tPRINTS\tPR00001\tTest_Family_1\t50\t200\t-\tT\t{date}\tIPR002001\tTest family 1\tGO:0005515|protein binding\t-\n\
         PROTEIN_002\thash2def456\t189\tPfam\tPF00002\tTest_Domain_2\t20\t180\t3.4E-12\tT\t{date}\tIPR001002\tTest domain 2\tGO:0016740|transferase activity\tKEGG:map00010\n\
         PROTEIN_003\thash3ghi789\t342\tSUPERFAMILY\tSSF50001\tTest_Superfamily\t10\t320\t2.1E-18\tT\t{date}\tIPR003001\tTest superfamily\tGO:0003824|catalytic activity\t-\n"
    )
}

/// Mock TSV matching the curated sample FASTA (p53 and insulin), used by
/// the synchronous analysis path.
pub fn mock_scan_results(now: DateTime<Utc>) -> String {
    let date = now.format("%Y-%m-%d");
    format!(
        "# InterProScan version 5.59-91.0\n\
         # Analysis Date: {date}\n\
         #\n\
         # Sequence\tMD5 checksum\tSequence length\tAnalysis\tSignature accession\tSignature description\tStart location\tStop location\tScore\tStatus\tDate\tInterPro accession\tInterPro description\tGO annotations\tPathways\n\
         P53_HUMAN\tabc123def456\t393\tPfam\tPF00870\tP53\t1\t292\t1.2E-23\tT\t{date}\tIPR011615\tP53 DNA-binding domain\tGO:0003677|DNA binding,GO:0003700|DNA-binding transcription factor activity\tREACTOME:R-HSA-69473\n\
         P53_HUMAN\tabc123def456\t393\tPRINTS\tPR00659\tP53\t10\t45\t-\tT\t{date}\tIPR002117\tP53 tumor suppressor\tGO:0006915|apoptotic process,GO:0030330|DNA damage response\t-\n\
         P53_HUMAN\tabc123def456\t393\tProSiteProfiles\tPS50963\tP53_TETRAMER\t325\t355\t8.234\tT\t{date}\tIPR010991\tP53 tetramerisation motif\tGO:0046982|protein heterodimerization activity\t-\n\
         INSULIN_HUMAN\tdef789ghi012\t110\tPfam\tPF00049\tInsulin\t25\t110\t2.1E-15\tT\t{date}\tIPR022353\tInsulin\tGO:0005179|hormone activity,GO:0042593|glucose homeostasis\tREACTOME:R-HSA-264876\n\
         INSULIN_HUMAN\tdef789ghi012\t110\tSUPERFAMILY\tSSF57447\tInsulin-like\t30\t105\t1.5E-12\tT\t{date}\tIPR022353\tInsulin\tGO:0016020|membrane\tKEGG:map04910\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::parse_interpro_tsv;

    #[test]
    fn test_job_results_parse_cleanly() {
        let tsv = mock_job_results("input.fasta", "job_abc12345", Utc::now());
        assert!(tsv.contains("job_abc12345"));
        let parsed = parse_interpro_tsv(&tsv);
        assert_eq!(parsed.sequences.len(), 3);
        assert!(parsed.domains.contains("Test_Domain_1"));
        assert!(parsed.families.contains("Test_Family_1"));
    }

    #[test]
    fn test_scan_results_parse_cleanly() {
        let parsed = parse_interpro_tsv(&mock_scan_results(Utc::now()));
        assert_eq!(parsed.sequences.len(), 2);
        assert_eq!(parsed.sequences["P53_HUMAN"].annotations.len(), 3);
        assert!(parsed.go_terms.contains("GO:0042593"));
        assert!(parsed.pathways.contains("KEGG:map04910"));
    }
}
