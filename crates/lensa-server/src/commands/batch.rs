//! Batch command - ID card extraction over many images.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use lensa_core::{IdCardScan, IdCardService};
use lensa_server::api::upload::allowed_file;

use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input images
    #[arg(required = true)]
    input: String,

    /// Directory for one JSON result per image
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Stop at the first image that fails
    #[arg(long)]
    fail_fast: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    scan: Option<IdCardScan>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| allowed_file(&p.to_string_lossy()))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching images found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} images to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let service = lensa_core::create_id_card_service(&config)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images")?
            .progress_chars("=>-"),
    );

    let results = process_all(files, args.fail_fast, &pb, |path| process_file(&service, path))?;

    pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            if let Some(scan) = &result.scan {
                let output_path = output_dir.join(output_name(&result.path));
                fs::write(&output_path, serde_json::to_string_pretty(scan)?)?;
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

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.scan.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} images in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
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

/// Process every file in order. Failures are recorded per file unless
/// `fail_fast` is set.
fn process_all<F>(
    files: Vec<PathBuf>,
    fail_fast: bool,
    pb: &ProgressBar,
    mut process: F,
) -> anyhow::Result<Vec<FileResult>>
where
    F: FnMut(&Path) -> anyhow::Result<IdCardScan>,
{
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = process(&path);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(scan) => results.push(FileResult {
                path,
                scan: Some(scan),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if fail_fast {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                results.push(FileResult {
                    path,
                    scan: None,
                    error: Some(error_msg),
                    processing_time_ms,
                });
            }
        }

        pb.inc(1);
    }

    Ok(results)
}

/// JSON output name keeping the full file name, so `a.png` and `a.jpg` differ.
fn output_name(path: &Path) -> String {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("card");
    format!("{}.json", name)
}

fn process_file(service: &IdCardService, path: &Path) -> anyhow::Result<IdCardScan> {
    let image = image::open(path)?;
    Ok(service.process(&image)?)
}

const SUMMARY_HEADER: [&str; 11] = [
    "filename",
    "status",
    "card_detected",
    "id_number",
    "name",
    "date_of_birth",
    "gender",
    "address",
    "avg_confidence",
    "processing_time_ms",
    "error",
];

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    write_summary_rows(&mut wtr, results)?;
    wtr.flush()?;
    Ok(())
}

fn write_summary_rows<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    results: &[FileResult],
) -> anyhow::Result<()> {
    wtr.write_record(SUMMARY_HEADER)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &result.scan {
            Some(scan) => {
                let record = &scan.record;
                wtr.write_record([
                    filename,
                    "success",
                    if scan.card_detected { "true" } else { "false" },
                    &record.id_number,
                    &record.name,
                    &record.date_of_birth,
                    &record.gender,
                    &record.address,
                    &format!("{:.4}", scan.average_confidence),
                    &result.processing_time_ms.to_string(),
                    "",
                ])?;
            }
            None => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &result.processing_time_ms.to_string(),
                    result.error.as_deref().unwrap_or(""),
                ])?;
            }
        }
    }

    debug!("Summary covers {} files", results.len());
    Ok(())
}
