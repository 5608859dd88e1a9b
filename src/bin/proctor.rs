//! Proctor CLI - Command-line interface for the proctoring engine
//!
//! Commands:
//! - replay: Replay recorded frame signals through an engine and emit the session report
//! - validate: Validate frame record schema
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use proctor_engine::config::EngineConfig;
use proctor_engine::replay::Replayer;
use proctor_engine::report::{SessionReport, REPORT_VERSION};
use proctor_engine::schema::{FrameRecord, FrameRecordAdapter, SCHEMA_VERSION};
use proctor_engine::types::Recording;
use proctor_engine::{ProctorError, ENGINE_VERSION};

/// Proctor - integrity monitoring for remote interviews
#[derive(Parser)]
#[command(name = "proctor")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Turn per-frame perception signals into proctoring reports", long_about = None)]
struct Cli {
    /// Log engine activity to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded frame signals and write the session report
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Candidate label for the session
        #[arg(short, long)]
        candidate: String,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds without a face before a face_missing event
        #[arg(long)]
        face_timeout_secs: Option<u64>,

        /// Seconds of looking away before a focus_loss event
        #[arg(long)]
        gaze_timeout_secs: Option<u64>,

        /// Media recording to attach to the report
        #[arg(long)]
        recording: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate frame record schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame record per line)
    Ndjson,
    /// JSON array of frame records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (proctor.frame_signal.v1)
    Input,
    /// Output schema (proctor.session_report.v1)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), ProctorCliError> {
    match cli.command {
        Commands::Replay {
            input,
            candidate,
            input_format,
            config,
            face_timeout_secs,
            gaze_timeout_secs,
            recording,
            output,
            output_format,
        } => {
            let config = load_config(config.as_deref(), face_timeout_secs, gaze_timeout_secs)?;
            cmd_replay(
                &input,
                &candidate,
                input_format,
                config,
                recording.as_deref(),
                &output,
                output_format,
            )
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { schema_type, json_schema } => cmd_schema(schema_type, json_schema),
    }
}

fn load_config(
    path: Option<&Path>,
    face_timeout_secs: Option<u64>,
    gaze_timeout_secs: Option<u64>,
) -> Result<EngineConfig, ProctorCliError> {
    let mut config = match path {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    if let Some(secs) = face_timeout_secs {
        config.face_absence_secs = secs;
    }
    if let Some(secs) = gaze_timeout_secs {
        config.gaze_away_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_replay(
    input: &Path,
    candidate: &str,
    input_format: InputFormat,
    config: EngineConfig,
    recording: Option<&Path>,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), ProctorCliError> {
    let records = read_records(input, input_format)?;
    if records.is_empty() {
        return Err(ProctorCliError::NoRecords);
    }

    let recording = recording.map(read_recording).transpose()?;

    let report = Replayer::new(config)?.run(&records, candidate, recording.as_ref())?;
    info!(
        "session {} scored {} with {} violations",
        report.session_id, report.integrity_score, report.total_violations
    );

    let output_data = format_output(&report, &output_format)?;

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), ProctorCliError> {
    let records = read_records(input, input_format)?;

    let mut errors: Vec<ValidationErrorDetail> = FrameRecordAdapter::validate_records(&records)
        .into_iter()
        .map(|r| ValidationErrorDetail {
            index: r.index,
            timestamp: Some(r.timestamp),
            error: r.error.to_string(),
        })
        .collect();
    let invalid_records = errors.len();

    if let Err(e) = FrameRecordAdapter::check_ordering(&records) {
        errors.push(ValidationErrorDetail {
            index: records.len(),
            timestamp: None,
            error: e.to_string(),
        });
    }

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - invalid_records,
        invalid_records,
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record at {} (index {}): {}",
                    err.timestamp.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(ProctorCliError::ValidationFailed(report.errors.len()))
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), ProctorCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One record per analyzed frame:");
                println!();
                println!("- schema_version: {} (optional)", SCHEMA_VERSION);
                println!("- timestamp: RFC 3339 capture time, non-decreasing across records");
                println!("- face_count: number of faces visible (default 0)");
                println!("- gaze_keypoints: [{{ x, y }}] landmarks of the primary face (optional)");
                println!("- detected_objects: [{{ label, confidence }}] classified objects (optional)");
                println!("- error: set when perception failed for the frame; the frame is skipped");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", REPORT_VERSION);
                println!();
                println!("Session report contains:");
                println!();
                println!("- producer: {{ name, version }}");
                println!("- session_id, candidate, started_at, ended_at");
                println!("- duration_secs, duration_display (MM:SS)");
                println!("- integrity_score (0-100), score_band (excellent, good, poor)");
                println!("- total_violations, violations_by_kind, violations_by_severity");
                println!("- events: [{{ id, kind, timestamp, description, severity, details }}]");
                println!("- score_timeline: [{{ event_id, at, score_after }}]");
                println!("- recording: {{ mime_type, size_bytes, sha256, file_name }} (optional)");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, ProctorCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(input: &Path, input_format: InputFormat) -> Result<Vec<FrameRecord>, ProctorCliError> {
    let input_data = read_input(input)?;
    let records = match input_format {
        InputFormat::Ndjson => FrameRecordAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => FrameRecordAdapter::parse_array(&input_data)?,
    };
    debug!("read {} frame records", records.len());
    Ok(records)
}

fn read_recording(path: &Path) -> Result<Recording, ProctorCliError> {
    let bytes = fs::read(path)?;
    let mime_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    };
    Ok(Recording {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

fn format_output(report: &SessionReport, format: &OutputFormat) -> Result<String, ProctorCliError> {
    match format {
        OutputFormat::Json => Ok(report.to_json()?),
        OutputFormat::JsonPretty => Ok(report.to_json_pretty()?),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Per-frame perception signal",
        "type": "object",
        "required": ["timestamp"],
        "properties": {
            "schema_version": { "type": "string", "const": SCHEMA_VERSION },
            "timestamp": { "type": "string", "format": "date-time" },
            "face_count": { "type": "integer", "minimum": 0 },
            "gaze_keypoints": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["x", "y"],
                    "properties": {
                        "x": { "type": "number" },
                        "y": { "type": "number" }
                    }
                }
            },
            "detected_objects": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["label", "confidence"],
                    "properties": {
                        "label": { "type": "string", "minLength": 1 },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                    }
                }
            },
            "error": { "type": "string" }
        }
    }).to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": REPORT_VERSION,
        "description": "Proctoring session report",
        "type": "object",
        "required": [
            "report_version", "producer", "session_id", "candidate", "started_at", "ended_at",
            "duration_secs", "integrity_score", "total_violations", "violations_by_kind", "events"
        ],
        "properties": {
            "report_version": { "type": "string", "const": REPORT_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" }
                }
            },
            "session_id": { "type": "string", "format": "uuid" },
            "candidate": { "type": "string" },
            "started_at": { "type": "string", "format": "date-time" },
            "ended_at": { "type": "string", "format": "date-time" },
            "duration_secs": { "type": "number", "minimum": 0 },
            "duration_display": { "type": "string" },
            "integrity_score": { "type": "integer", "minimum": 0, "maximum": 100 },
            "score_band": { "type": "string", "enum": ["excellent", "good", "poor"] },
            "total_violations": { "type": "integer", "minimum": 0 },
            "violations_by_kind": { "type": "object" },
            "violations_by_severity": { "type": "object" },
            "events": { "type": "array", "items": { "type": "object" } },
            "score_timeline": { "type": "array", "items": { "type": "object" } },
            "recording": {
                "type": "object",
                "properties": {
                    "mime_type": { "type": "string" },
                    "size_bytes": { "type": "integer" },
                    "sha256": { "type": "string" },
                    "file_name": { "type": "string" }
                }
            }
        }
    }).to_string()
}

// Error types

#[derive(Debug)]
enum ProctorCliError {
    Io(io::Error),
    Engine(ProctorError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
}

impl From<io::Error> for ProctorCliError {
    fn from(e: io::Error) -> Self {
        ProctorCliError::Io(e)
    }
}

impl From<ProctorError> for ProctorCliError {
    fn from(e: ProctorError) -> Self {
        ProctorCliError::Engine(e)
    }
}

impl From<serde_json::Error> for ProctorCliError {
    fn from(e: serde_json::Error) -> Self {
        ProctorCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ProctorCliError> for CliError {
    fn from(e: ProctorCliError) -> Self {
        match e {
            ProctorCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ProctorCliError::Engine(e) => engine_error(e),
            ProctorCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ProctorCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No frame records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ProctorCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} validation errors", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

fn engine_error(e: ProctorError) -> CliError {
    let (code, hint) = match &e {
        ProctorError::ParseError(_) | ProctorError::JsonError(_) => (
            "PARSE_ERROR",
            format!("Ensure input matches {} schema", SCHEMA_VERSION),
        ),
        ProctorError::Validation(_) => ("VALIDATION_ERROR", "Run 'proctor validate' for details".to_string()),
        ProctorError::InvalidConfig(_) => (
            "CONFIG_ERROR",
            "Delays must be between 1 and 86400 seconds".to_string(),
        ),
        ProctorError::InvalidInput(_) => ("INVALID_INPUT", "Pass a non-empty --candidate".to_string()),
        ProctorError::SessionAlreadyActive | ProctorError::NoActiveSession => {
            ("SESSION_ERROR", "Report this as a bug".to_string())
        }
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    timestamp: Option<String>,
    error: String,
}
