//! Protein domain analysis toolkit: InterProScan TSV parsing and
//! aggregation, a persisted background-job tracker with time-derived
//! status, and CLI/MCP front ends.

pub mod about;
pub mod aggregate;
pub mod annotation;
pub mod config;
pub mod error;
pub mod fasta;
pub mod job;
pub mod job_queue;
pub mod job_store;
pub mod mcp_server;
pub mod sample_data;
pub mod scan;
