//! Process command - extract fields from a single document.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use medex_core::{DocumentType, ExtractionPipeline, ExtractionResult, MedexConfig};

use super::load_config;
use super::output::{format_record, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, image, or already recognized .txt)
    #[arg(required = true)]
    input: PathBuf,

    /// Document type: prescription or patient_details
    #[arg(short = 't', long = "type")]
    document_type: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Show missing fields, warnings and timing
    #[arg(long)]
    details: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    // Reject unknown types before touching the file
    let document_type: DocumentType = args.document_type.parse()?;
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing {} as {}", args.input.display(), document_type);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Extracting {}...", document_type));

    let result = extract_document(&args.input, document_type, config, args.timeout).await;
    pb.finish_and_clear();
    let result = result?;

    let output = format_record(&result.record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output.trim_end());
    }

    if args.details {
        print_details(&result);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Run one document through the pipeline.
///
/// `.txt` inputs are treated as recognized text and skip rasterization and
/// OCR. Everything else runs on a blocking thread, bounded by `timeout`.
pub async fn extract_document(
    input: &Path,
    document_type: DocumentType,
    config: MedexConfig,
    timeout: Option<u64>,
) -> anyhow::Result<ExtractionResult> {
    let pipeline = Arc::new(ExtractionPipeline::new(config)?);
    extract_with(pipeline, input, document_type, timeout).await
}

/// Same as [`extract_document`] with a shared pipeline.
pub async fn extract_with(
    pipeline: Arc<ExtractionPipeline>,
    input: &Path,
    document_type: DocumentType,
    timeout: Option<u64>,
) -> anyhow::Result<ExtractionResult> {
    let is_text = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

    if is_text {
        let text = fs::read_to_string(input)?;
        return Ok(pipeline.extract_text(&text, document_type)?);
    }

    let path = input.to_path_buf();
    let task = tokio::task::spawn_blocking(move || pipeline.extract(&path, document_type.as_str()));

    let joined = match timeout {
        // The blocking task is detached on timeout and finishes in the background
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
            .await
            .map_err(|_| {
                anyhow::anyhow!("Extraction of {} timed out after {}s", input.display(), secs)
            })?,
        None => task.await,
    };

    Ok(joined??)
}

fn print_details(result: &ExtractionResult) {
    eprintln!();
    eprintln!(
        "{} Pages: {}, processing time: {}ms",
        style("ℹ").blue(),
        result.page_count,
        result.processing_time_ms
    );

    if result.missing_fields.is_empty() {
        eprintln!("{} All fields found", style("✓").green());
    } else {
        eprintln!(
            "{} Missing fields: {}",
            style("⚠").yellow(),
            result.missing_fields.join(", ")
        );
    }

    for warning in &result.warnings {
        eprintln!("  - {}", warning);
    }
}
