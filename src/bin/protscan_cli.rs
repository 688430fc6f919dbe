use protscan::{
    about,
    aggregate::{filter_by_score, summary_stats},
    annotation::parse_interpro_tsv,
    config::ScanConfig,
    fasta,
    job::JobStatus,
    job_queue::{JobQueue, SubmitOptions},
    scan::run_protein_scan,
};
use chrono::Utc;
use serde::Serialize;
use std::{env, fs, path::Path};

fn usage() {
    eprintln!(
        "Usage:\n  \
  protscan_cli --version\n  \
  protscan_cli [--state PATH] [--config PATH] submit INPUT.fasta [--priority N] [--format FMT] [--databases DBS] [--tag TAG]... [--email ADDR]\n  \
  protscan_cli [--state PATH] status JOB_ID\n  \
  protscan_cli [--state PATH] result JOB_ID [--output PATH]\n  \
  protscan_cli [--state PATH] cancel JOB_ID\n  \
  protscan_cli [--state PATH] list [STATUS]\n  \
  protscan_cli [--state PATH] server-info\n  \
  protscan_cli analyze INPUT.fasta [OUTPUT.tsv]\n  \
  protscan_cli summary RESULTS.tsv\n  \
  protscan_cli filter RESULTS.tsv [--min-score X] [--analysis TYPE,TYPE]\n  \
  protscan_cli create-sample PATH [NUM_SEQUENCES]"
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

struct Globals {
    config: ScanConfig,
    cmd_idx: usize,
}

fn parse_globals(args: &[String]) -> Result<Globals, String> {
    let mut state_path: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut idx = 1usize;
    while idx + 1 < args.len() {
        match args[idx].as_str() {
            "--state" => {
                state_path = Some(args[idx + 1].clone());
                idx += 2;
            }
            "--config" => {
                config_path = Some(args[idx + 1].clone());
                idx += 2;
            }
            _ => break,
        }
    }
    let mut config = match config_path {
        Some(path) => ScanConfig::from_json_file(&path).map_err(|e| e.to_string())?,
        None => ScanConfig::default(),
    };
    if let Some(path) = state_path {
        config.state_path = path;
    }
    Ok(Globals {
        config,
        cmd_idx: idx,
    })
}

fn parse_submit_options(args: &[String], config: &ScanConfig) -> Result<SubmitOptions, String> {
    let mut options = SubmitOptions {
        priority: config.default_priority as i64,
        output_format: config.output_format.clone(),
        databases: config.databases.clone(),
        ..SubmitOptions::default()
    };
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        let value = args
            .get(idx + 1)
            .ok_or_else(|| format!("Missing value after {flag}"))?;
        match flag {
            "--priority" => {
                options.priority = value
                    .parse::<i64>()
                    .map_err(|e| format!("Invalid priority '{value}': {e}"))?;
            }
            "--format" => options.output_format = value.clone(),
            "--databases" => options.databases = Some(value.clone()),
            "--tag" => options.tags.push(value.clone()),
            "--email" => options.notification_email = Some(value.clone()),
            other => return Err(format!("Unknown submit option '{other}'")),
        }
        idx += 2;
    }
    Ok(options)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err("Missing command".to_string());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{}", about::version_cli_text());
        return Ok(());
    }

    let globals = parse_globals(&args)?;
    if args.len() <= globals.cmd_idx {
        usage();
        return Err("Missing command".to_string());
    }
    let command = &args[globals.cmd_idx];
    let rest = &args[globals.cmd_idx + 1..];
    let queue = JobQueue::new(globals.config.clone());
    let now = Utc::now();

    match command.as_str() {
        "submit" => {
            let [input, options @ ..] = rest else {
                usage();
                return Err("submit requires an input FASTA path".to_string());
            };
            let options = parse_submit_options(options, &globals.config)?;
            let record = queue.submit(input, options, now).map_err(|e| e.to_string())?;
            print_json(&record)
        }
        "status" => {
            let [job_id] = rest else {
                usage();
                return Err("status requires a job id".to_string());
            };
            let record = queue.status(job_id, now).map_err(|e| e.to_string())?;
            print_json(&record)
        }
        "result" => {
            let (job_id, output_path) = match rest {
                [job_id] => (job_id, None),
                [job_id, flag, path] if flag == "--output" => {
                    (job_id, Some(Path::new(path.as_str())))
                }
                _ => {
                    usage();
                    return Err("result requires: JOB_ID [--output PATH]".to_string());
                }
            };
            let output = queue
                .result(job_id, output_path, now)
                .map_err(|e| e.to_string())?;
            println!("{}", output.results);
            if let Some(output_file) = &output.output_file {
                println!("Results saved to '{output_file}'");
            }
            Ok(())
        }
        "cancel" => {
            let [job_id] = rest else {
                usage();
                return Err("cancel requires a job id".to_string());
            };
            let record = queue.cancel(job_id, now).map_err(|e| e.to_string())?;
            print_json(&record)
        }
        "list" => {
            let status_filter = match rest {
                [] => None,
                [raw] => Some(
                    JobStatus::parse(raw).ok_or_else(|| format!("Unknown job status '{raw}'"))?,
                ),
                _ => {
                    usage();
                    return Err("list takes at most one status filter".to_string());
                }
            };
            let jobs = queue.list(status_filter, now).map_err(|e| e.to_string())?;
            print_json(&jobs)
        }
        "server-info" => {
            let info = queue.server_info(now).map_err(|e| e.to_string())?;
            print_json(&info)
        }
        "analyze" => {
            let (input, output) = match rest {
                [input] => (input, None),
                [input, output] => (input, Some(Path::new(output.as_str()))),
                _ => {
                    usage();
                    return Err("analyze requires: INPUT.fasta [OUTPUT.tsv]".to_string());
                }
            };
            let report = run_protein_scan(Path::new(input), output, &globals.config)
                .map_err(|e| e.to_string())?;
            print_json(&report.stats)?;
            if let Some(tsv_file) = &report.tsv_file {
                println!("Results written to '{tsv_file}'");
            }
            Ok(())
        }
        "summary" => {
            let [results_path] = rest else {
                usage();
                return Err("summary requires a results TSV path".to_string());
            };
            let text = fs::read_to_string(results_path)
                .map_err(|e| format!("Could not read results file '{results_path}': {e}"))?;
            let parsed = parse_interpro_tsv(&text);
            print_json(&summary_stats(&parsed))
        }
        "filter" => {
            let [results_path, options @ ..] = rest else {
                usage();
                return Err("filter requires a results TSV path".to_string());
            };
            let mut min_score: Option<f64> = None;
            let mut analysis_types: Option<Vec<String>> = None;
            let mut idx = 0usize;
            while idx < options.len() {
                let flag = options[idx].as_str();
                let value = options
                    .get(idx + 1)
                    .ok_or_else(|| format!("Missing value after {flag}"))?;
                match flag {
                    "--min-score" => {
                        min_score = Some(
                            value
                                .parse::<f64>()
                                .map_err(|e| format!("Invalid min score '{value}': {e}"))?,
                        );
                    }
                    "--analysis" => {
                        analysis_types = Some(
                            value
                                .split(',')
                                .map(str::trim)
                                .filter(|v| !v.is_empty())
                                .map(ToString::to_string)
                                .collect(),
                        );
                    }
                    other => return Err(format!("Unknown filter option '{other}'")),
                }
                idx += 2;
            }
            let text = fs::read_to_string(results_path)
                .map_err(|e| format!("Could not read results file '{results_path}': {e}"))?;
            let parsed = parse_interpro_tsv(&text);
            let filtered = filter_by_score(&parsed, min_score, analysis_types.as_deref());
            print_json(&filtered)
        }
        "create-sample" => {
            let (path, num_sequences) = match rest {
                [path] => (path, None),
                [path, num] => (
                    path,
                    Some(
                        num.parse::<usize>()
                            .map_err(|e| format!("Invalid sequence count '{num}': {e}"))?,
                    ),
                ),
                _ => {
                    usage();
                    return Err("create-sample requires: PATH [NUM_SEQUENCES]".to_string());
                }
            };
            match num_sequences {
                Some(n) => fasta::generate_protein_dataset(Path::new(path), n)
                    .map_err(|e| e.to_string())?,
                None => fasta::create_sample_fasta(Path::new(path)).map_err(|e| e.to_string())?,
            }
            println!("Sample data written to '{path}'");
            Ok(())
        }
        other => {
            usage();
            Err(format!("Unknown command '{other}'"))
        }
    }
}
