//! Batch processing command for many documents of one type.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use medex_core::{DocumentType, ExtractionPipeline, ExtractionResult};

use super::load_config;
use super::output::{format_record, OutputFormat};
use super::process::extract_with;

/// Extensions picked up from the glob match.
const SUPPORTED_EXTENSIONS: [&str; 8] = ["pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp", "txt"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Document type shared by every input
    #[arg(short = 't', long = "type")]
    document_type: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of documents processed at once
    #[arg(short = 'j', long, default_value = "2")]
    jobs: usize,

    /// Per-document timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    extraction: Option<ExtractionResult>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let document_type: DocumentType = args.document_type.parse()?;
    let config = load_config(config_path)?;

    if args.jobs == 0 {
        anyhow::bail!("--jobs must be at least 1");
    }

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let pipeline = Arc::new(ExtractionPipeline::new(config)?);
    let semaphore = Arc::new(Semaphore::new(args.jobs));

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let pb = overall_pb.clone();
        let timeout = args.timeout;

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let result = extract_with(pipeline, &path, document_type, timeout).await;
            pb.inc(1);
            anyhow::Ok((path, result))
        }));
    }

    // Handles are awaited in input order, so results keep the glob order
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let (path, result) = handle.await??;

        match result {
            Ok(extraction) => {
                results.push(ProcessResult {
                    path,
                    extraction: Some(extraction),
                    error: None,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        extraction: None,
                        error: Some(error_msg),
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }
    }

    overall_pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.extraction.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        let paths: Vec<&Path> = successful.iter().map(|r| r.path.as_path()).collect();
        let names = output_names(&paths);

        for (result, output_name) in successful.iter().zip(&names) {
            if let Some(extraction) = &result.extraction {
                let output_path =
                    output_dir.join(format!("{}.{}", output_name, args.format.extension()));
                fs::write(&output_path, format_record(&extraction.record, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, document_type, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Output base names for the given inputs, one per path.
///
/// The file stem is used when it is unique; inputs sharing a stem keep their
/// extension ("a.pdf", "a.png"), and any remaining clash gets a numeric suffix.
fn output_names(paths: &[&Path]) -> Vec<String> {
    let stem = |p: &Path| {
        p.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("record")
            .to_string()
    };

    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for &path in paths {
        *stem_counts.entry(stem(path)).or_default() += 1;
    }

    let mut used: HashSet<String> = HashSet::new();
    paths
        .iter()
        .map(|&path| {
            let base = if stem_counts[&stem(path)] > 1 {
                path.file_name()
                    .and_then(|s| s.to_str())
                    .map(String::from)
                    .unwrap_or_else(|| stem(path))
            } else {
                stem(path)
            };

            let mut name = base.clone();
            let mut suffix = 2;
            while !used.insert(name.clone()) {
                name = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

/// One row per document: file, status, every schema field, then diagnostics.
fn write_summary(
    path: &Path,
    document_type: DocumentType,
    results: &[ProcessResult],
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let schema = document_type.schema();

    let mut header = vec!["filename", "status"];
    header.extend_from_slice(schema);
    header.extend(["missing_fields", "processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let mut row = vec![filename];
        match &result.extraction {
            Some(extraction) => {
                row.push("success".to_string());
                row.extend(extraction.record.values().into_iter().map(String::from));
                row.push(extraction.missing_fields.join(";"));
                row.push(extraction.processing_time_ms.to_string());
                row.push(String::new());
            }
            None => {
                row.push("error".to_string());
                row.extend(schema.iter().map(|_| String::new()));
                row.push(String::new());
                row.push(String::new());
                row.push(result.error.clone().unwrap_or_default());
            }
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
