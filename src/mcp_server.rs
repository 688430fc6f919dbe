//! Minimal MCP stdio server adapter.
//!
//! Speaks Content-Length framed JSON-RPC over stdin/stdout and maps MCP
//! tool calls onto the job queue and the synchronous analysis path.

use crate::{
    about,
    config::ScanConfig,
    error::ScanError,
    fasta,
    job::JobStatus,
    job_queue::{JobQueue, SubmitOptions, error_response, success_response},
    scan,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const MCP_PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "protscan_mcp";
const SERVER_TITLE: &str = "ProtScan MCP";

pub const DEFAULT_MCP_STATE_PATH: &str = ".protscan_jobs.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchOutcome {
    NoResponse,
    Response,
    Exit,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub fn run_stdio_server(state_path: &str) -> Result<(), String> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = BufWriter::new(stdout.lock());
    run_server_loop(state_path, &mut reader, &mut writer)
}

fn run_server_loop<R: BufRead, W: Write>(
    default_state_path: &str,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), String> {
    loop {
        let Some(message) = read_framed_json(reader)? else {
            return Ok(());
        };
        match handle_message(default_state_path, &message, writer)? {
            DispatchOutcome::NoResponse => {}
            DispatchOutcome::Response => {}
            DispatchOutcome::Exit => return Ok(()),
        }
    }
}

fn read_framed_json<R: BufRead>(reader: &mut R) -> Result<Option<Value>, String> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader
            .read_line(&mut line)
            .map_err(|e| format!("Could not read MCP header line: {e}"))?;
        if bytes_read == 0 {
            return if content_length.is_some() {
                Err("Unexpected EOF while reading MCP headers".to_string())
            } else {
                Ok(None)
            };
        }
        let line_trimmed = line.trim_end_matches(['\r', '\n']);
        if line_trimmed.is_empty() {
            if content_length.is_some() {
                break;
            }
            continue;
        }
        if let Some(value) = line_trimmed.strip_prefix("Content-Length:") {
            let len = value
                .trim()
                .parse::<usize>()
                .map_err(|e| format!("Invalid Content-Length header '{line_trimmed}': {e}"))?;
            content_length = Some(len);
        }
    }

    let len = content_length.ok_or_else(|| "Missing Content-Length header".to_string())?;
    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .map_err(|e| format!("Could not read MCP JSON payload body: {e}"))?;
    serde_json::from_slice::<Value>(&body)
        .map(Some)
        .map_err(|e| format!("Could not parse MCP JSON payload: {e}"))
}

fn write_framed_json<W: Write>(writer: &mut W, payload: &Value) -> Result<(), String> {
    let body = serde_json::to_vec(payload)
        .map_err(|e| format!("Could not serialize MCP response JSON: {e}"))?;
    writer
        .write_all(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes())
        .map_err(|e| format!("Could not write MCP response header: {e}"))?;
    writer
        .write_all(&body)
        .map_err(|e| format!("Could not write MCP response body: {e}"))?;
    writer
        .flush()
        .map_err(|e| format!("Could not flush MCP response stream: {e}"))?;
    Ok(())
}

fn tool_list() -> Value {
    json!([
        {
            "name": "submit_protein_analysis",
            "title": "Submit Protein Analysis",
            "description": "Submit a FASTA file for background domain analysis and return a job id.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "input_file": {
                        "type": "string",
                        "description": "Path to the protein FASTA file to analyze."
                    },
                    "priority": {
                        "type": "integer",
                        "description": "Job priority 1-10 (clamped). Defaults to 5."
                    },
                    "output_format": {
                        "type": "string",
                        "description": "Requested output format. Defaults to tsv."
                    },
                    "databases": {
                        "type": "string",
                        "description": "Comma-separated signature databases to run."
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Free-form labels attached to the job."
                    },
                    "notification_email": {
                        "type": "string",
                        "description": "Address to notify on completion."
                    },
                    "state_path": {
                        "type": "string",
                        "description": "Optional job store path. Defaults to server startup state path."
                    }
                },
                "required": ["input_file"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_job_status",
            "title": "Get Job Status",
            "description": "Return the current status and progress of a submitted job.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": { "type": "string" },
                    "state_path": { "type": "string" }
                },
                "required": ["job_id"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_job_result",
            "title": "Get Job Result",
            "description": "Return the tabular results of a completed job, optionally saving them to a file.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": { "type": "string" },
                    "output_file": {
                        "type": "string",
                        "description": "Optional path to save the raw TSV results."
                    },
                    "state_path": { "type": "string" }
                },
                "required": ["job_id"],
                "additionalProperties": false
            }
        },
        {
            "name": "cancel_job",
            "title": "Cancel Job",
            "description": "Cancel a job that has not completed yet.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": { "type": "string" },
                    "state_path": { "type": "string" }
                },
                "required": ["job_id"],
                "additionalProperties": false
            }
        },
        {
            "name": "list_jobs",
            "title": "List Jobs",
            "description": "List submitted jobs in submission order, optionally filtered by status.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["submitted", "queued", "running", "completed", "cancelled"]
                    },
                    "state_path": { "type": "string" }
                },
                "additionalProperties": false
            }
        },
        {
            "name": "analyze_protein_sequence",
            "title": "Analyze Protein Sequence",
            "description": "Run a synchronous domain analysis on a FASTA file and return parsed results.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "input_file": { "type": "string" },
                    "output_file": {
                        "type": "string",
                        "description": "Optional path for the raw TSV; a .summary.json is written alongside."
                    }
                },
                "required": ["input_file"],
                "additionalProperties": false
            }
        },
        {
            "name": "create_sample_data",
            "title": "Create Sample Data",
            "description": "Write a sample FASTA file: curated proteins, or a random dataset when num_sequences is given.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "num_sequences": {
                        "type": "integer",
                        "description": "Generate this many random protein sequences instead of the curated pair."
                    }
                },
                "required": ["path"],
                "additionalProperties": false
            }
        },
        {
            "name": "server_info",
            "title": "Server Info",
            "description": "Return server version and per-status job counts.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "state_path": { "type": "string" }
                },
                "additionalProperties": false
            }
        }
    ])
}

fn jsonrpc_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn jsonrpc_error(id: Option<Value>, code: i64, message: &str, data: Option<Value>) -> Value {
    let mut error = json!({
        "code": code,
        "message": message
    });
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "error": error
    })
}

fn tool_result_text(text: String, is_error: bool) -> Value {
    json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "structuredContent": {
            "text": text
        },
        "isError": is_error
    })
}

fn tool_result_json(value: Value, is_error: bool) -> Value {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "structuredContent": value,
        "isError": is_error
    })
}

fn state_path_from_args(default_state_path: &str, args: &Map<String, Value>) -> String {
    args.get("state_path")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default_state_path)
        .to_string()
}

fn queue_for(state_path: String) -> JobQueue {
    JobQueue::new(ScanConfig {
        state_path,
        ..ScanConfig::default()
    })
}

fn require_str_arg<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str, String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("Missing required string argument '{name}'"))
}

/// Wrap an envelope from the job API, marking the MCP result as an error
/// when the envelope status says so.
fn envelope_result(envelope: Value) -> Value {
    let is_error = envelope.get("status").and_then(Value::as_str) == Some("error");
    tool_result_json(envelope, is_error)
}

fn outcome_result<T: serde::Serialize>(
    outcome: Result<T, ScanError>,
    message: Option<&str>,
    context: &str,
) -> Value {
    match outcome {
        Ok(payload) => match serde_json::to_value(&payload) {
            Ok(value) => envelope_result(success_response(value, message)),
            Err(e) => envelope_result(error_response(
                &ScanError::new(crate::error::ErrorCode::Internal, e.to_string()),
                Some(context),
            )),
        },
        Err(err) => envelope_result(error_response(&err, Some(context))),
    }
}

fn submit_tool_result(default_state_path: &str, arguments: &Value) -> Value {
    let args = arguments.as_object().cloned().unwrap_or_default();
    let input_file = match require_str_arg(&args, "input_file") {
        Ok(value) => value.to_string(),
        Err(err) => return tool_result_text(err, true),
    };
    let defaults = SubmitOptions::default();
    let tags = args
        .get("tags")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();
    let options = SubmitOptions {
        priority: args
            .get("priority")
            .and_then(Value::as_i64)
            .unwrap_or(defaults.priority),
        output_format: args
            .get("output_format")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or(defaults.output_format),
        databases: args
            .get("databases")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        tags,
        notification_email: args
            .get("notification_email")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    };
    let queue = queue_for(state_path_from_args(default_state_path, &args));
    // Nested under "record" so the envelope's own status field stays distinct
    // from the job's lifecycle status.
    let outcome = queue
        .submit(&input_file, options, Utc::now())
        .map(|record| json!({ "job_id": record.job_id, "record": record }));
    outcome_result(outcome, Some("Job submitted"), "submit_protein_analysis")
}

fn job_tool_result(default_state_path: &str, arguments: &Value, tool: &str) -> Value {
    let args = arguments.as_object().cloned().unwrap_or_default();
    let job_id = match require_str_arg(&args, "job_id") {
        Ok(value) => value.to_string(),
        Err(err) => return tool_result_text(err, true),
    };
    let queue = queue_for(state_path_from_args(default_state_path, &args));
    let now = Utc::now();
    match tool {
        "get_job_status" => outcome_result(
            queue.status(&job_id, now).map(|r| json!({ "record": r })),
            None,
            tool,
        ),
        "get_job_result" => {
            let output_file = args
                .get("output_file")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string);
            outcome_result(
                queue.result(&job_id, output_file.as_deref().map(Path::new), now),
                None,
                tool,
            )
        }
        "cancel_job" => outcome_result(
            queue.cancel(&job_id, now).map(|r| json!({ "record": r })),
            Some("Job cancelled"),
            tool,
        ),
        other => tool_result_text(format!("Unknown MCP tool '{other}'"), true),
    }
}

fn list_tool_result(default_state_path: &str, arguments: &Value) -> Value {
    let args = arguments.as_object().cloned().unwrap_or_default();
    let status_filter = match args.get("status").and_then(Value::as_str) {
        Some(raw) => match JobStatus::parse(raw) {
            Some(status) => Some(status),
            None => return tool_result_text(format!("Unknown job status '{raw}'"), true),
        },
        None => None,
    };
    let queue = queue_for(state_path_from_args(default_state_path, &args));
    let outcome = queue
        .list(status_filter, Utc::now())
        .map(|jobs| json!({ "count": jobs.len(), "jobs": jobs }));
    outcome_result(outcome, None, "list_jobs")
}

fn analyze_tool_result(arguments: &Value) -> Value {
    let args = arguments.as_object().cloned().unwrap_or_default();
    let input_file = match require_str_arg(&args, "input_file") {
        Ok(value) => value.to_string(),
        Err(err) => return tool_result_text(err, true),
    };
    let output_file = args
        .get("output_file")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string);
    let outcome = scan::run_protein_scan(
        Path::new(&input_file),
        output_file.as_deref().map(Path::new),
        &ScanConfig::default(),
    );
    outcome_result(outcome, Some("Analysis complete"), "analyze_protein_sequence")
}

fn sample_data_tool_result(arguments: &Value) -> Value {
    let args = arguments.as_object().cloned().unwrap_or_default();
    let path = match require_str_arg(&args, "path") {
        Ok(value) => value.to_string(),
        Err(err) => return tool_result_text(err, true),
    };
    let num_sequences = args.get("num_sequences").and_then(Value::as_u64);
    let outcome = match num_sequences {
        Some(n) => fasta::generate_protein_dataset(Path::new(&path), n as usize),
        None => fasta::create_sample_fasta(Path::new(&path)),
    };
    outcome_result(
        outcome.map(|()| {
            json!({
                "path": path,
                "num_sequences": num_sequences,
            })
        }),
        Some("Sample data created"),
        "create_sample_data",
    )
}

fn server_info_tool_result(default_state_path: &str, arguments: &Value) -> Value {
    let args = arguments.as_object().cloned().unwrap_or_default();
    let queue = queue_for(state_path_from_args(default_state_path, &args));
    let outcome = queue.server_info(Utc::now()).map(|info| {
        json!({
            "name": SERVER_NAME,
            "version": about::PROTSCAN_VERSION,
            "total_jobs": info.total_jobs,
            "status_counts": info.status_counts,
        })
    });
    outcome_result(outcome, None, "server_info")
}

fn tool_call_result(default_state_path: &str, params: ToolCallParams) -> Value {
    match params.name.trim() {
        "submit_protein_analysis" => submit_tool_result(default_state_path, &params.arguments),
        tool @ ("get_job_status" | "get_job_result" | "cancel_job") => {
            job_tool_result(default_state_path, &params.arguments, tool)
        }
        "list_jobs" => list_tool_result(default_state_path, &params.arguments),
        "analyze_protein_sequence" => analyze_tool_result(&params.arguments),
        "create_sample_data" => sample_data_tool_result(&params.arguments),
        "server_info" => server_info_tool_result(default_state_path, &params.arguments),
        other => tool_result_text(format!("Unknown MCP tool '{other}'"), true),
    }
}

fn write_response<W: Write>(writer: &mut W, value: Value) -> Result<DispatchOutcome, String> {
    write_framed_json(writer, &value)?;
    Ok(DispatchOutcome::Response)
}

fn handle_message<W: Write>(
    default_state_path: &str,
    message: &Value,
    writer: &mut W,
) -> Result<DispatchOutcome, String> {
    let Some(obj) = message.as_object() else {
        return write_response(
            writer,
            jsonrpc_error(None, -32600, "Invalid Request: expected JSON object", None),
        );
    };
    let id = obj.get("id").cloned();
    let Some(method) = obj.get("method").and_then(Value::as_str) else {
        return write_response(
            writer,
            jsonrpc_error(
                id,
                -32600,
                "Invalid Request: missing method field",
                Some(message.clone()),
            ),
        );
    };

    match method {
        "initialize" => {
            let Some(id) = id else {
                return write_response(
                    writer,
                    jsonrpc_error(
                        None,
                        -32600,
                        "Invalid Request: initialize requires id",
                        None,
                    ),
                );
            };
            let result = json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "title": SERVER_TITLE,
                    "version": about::PROTSCAN_VERSION
                }
            });
            write_response(writer, jsonrpc_response(id, result))
        }
        "notifications/initialized" => Ok(DispatchOutcome::NoResponse),
        "ping" => {
            if let Some(id) = id {
                write_response(writer, jsonrpc_response(id, json!({})))
            } else {
                Ok(DispatchOutcome::NoResponse)
            }
        }
        "tools/list" => {
            let Some(id) = id else {
                return Ok(DispatchOutcome::NoResponse);
            };
            write_response(
                writer,
                jsonrpc_response(id, json!({ "tools": tool_list() })),
            )
        }
        "tools/call" => {
            let Some(id) = id else {
                return Ok(DispatchOutcome::NoResponse);
            };
            let params = obj.get("params").cloned().unwrap_or_else(|| json!({}));
            let call = match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => call,
                Err(err) => {
                    return write_response(
                        writer,
                        jsonrpc_error(
                            Some(id),
                            -32602,
                            "Invalid params for tools/call",
                            Some(json!({ "details": err.to_string() })),
                        ),
                    );
                }
            };
            let result = tool_call_result(default_state_path, call);
            write_response(writer, jsonrpc_response(id, result))
        }
        "shutdown" => {
            if let Some(id) = id {
                write_response(writer, jsonrpc_response(id, json!({})))
            } else {
                Ok(DispatchOutcome::NoResponse)
            }
        }
        "exit" => Ok(DispatchOutcome::Exit),
        _ => {
            if id.is_none() {
                return Ok(DispatchOutcome::NoResponse);
            }
            write_response(
                writer,
                jsonrpc_error(id, -32601, &format!("Method '{method}' not found"), None),
            )
        }
    }
}
