//! Process command - run one service over a single image.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use lensa_core::{CaptionResult, IdCardScan, LensaConfig, NsfwReport};
use lensa_server::api::upload::allowed_file;

use super::{format_record, load_config, write_output, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Service to run
    #[arg(short, long, value_enum, default_value = "id-card")]
    task: Task,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Maximum caption length in tokens
    #[arg(long)]
    max_length: Option<usize>,

    /// Show OCR confidence for ID cards
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Task {
    /// Detect, crop, read and parse an ID card
    IdCard,
    /// Classify the image as safe or NSFW
    Nsfw,
    /// Describe the image in text
    Caption,
}

enum Outcome {
    IdCard(IdCardScan),
    Nsfw(NsfwReport),
    Caption(CaptionResult),
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let name = args.input.to_string_lossy();
    if !allowed_file(&name) {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    }

    info!("Processing {} with {:?}", args.input.display(), args.task);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    pb.set_message("Loading image...");
    let image = image::open(&args.input)?;

    pb.set_message("Loading models...");
    let outcome = run_task(&args, &config, &image, &pb)?;
    pb.finish_and_clear();

    let output = match (&outcome, args.format) {
        (Outcome::IdCard(scan), OutputFormat::Json) => serde_json::to_string_pretty(scan)?,
        (Outcome::Nsfw(report), OutputFormat::Json) => serde_json::to_string_pretty(report)?,
        (Outcome::Caption(result), OutputFormat::Json) => serde_json::to_string_pretty(result)?,
        (Outcome::IdCard(scan), OutputFormat::Text) => format_scan(scan),
        (Outcome::Nsfw(report), OutputFormat::Text) => format_nsfw(report),
        (Outcome::Caption(result), OutputFormat::Text) => result.extracted_text.clone(),
    };

    write_output(args.output.as_deref(), &output)?;

    if let (true, Outcome::IdCard(scan)) = (args.show_confidence, &outcome) {
        println!();
        println!(
            "{} Average OCR confidence: {:.1}% over {} text items",
            style("ℹ").blue(),
            scan.average_confidence * 100.0,
            scan.items.len()
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn run_task(
    args: &ProcessArgs,
    config: &LensaConfig,
    image: &image::DynamicImage,
    pb: &ProgressBar,
) -> anyhow::Result<Outcome> {
    match args.task {
        Task::IdCard => {
            let service = lensa_core::create_id_card_service(config)?;
            pb.set_message("Reading ID card...");
            Ok(Outcome::IdCard(service.process(image)?))
        }
        Task::Nsfw => {
            let detector = lensa_core::create_nsfw_detector(config)?;
            pb.set_message("Classifying...");
            Ok(Outcome::Nsfw(detector.detect(image)?))
        }
        Task::Caption => {
            let captioner = lensa_core::create_captioner(config)?;
            pb.set_message("Generating caption...");
            Ok(Outcome::Caption(captioner.caption(image, args.max_length)?))
        }
    }
}

fn format_scan(scan: &IdCardScan) -> String {
    let mut output = String::new();

    match scan.bbox {
        Some(b) => output.push_str(&format!(
            "Card detected at ({}, {}) - ({}, {})\n\n",
            b.x1, b.y1, b.x2, b.y2
        )),
        None => output.push_str("No card detected, full image read\n\n"),
    }
    output.push_str(&format_record(&scan.record));

    output
}

fn format_nsfw(report: &NsfwReport) -> String {
    let mut output = format!(
        "NSFW: {} (confidence {:.4}, threshold {})\n",
        if report.is_nsfw { "yes" } else { "no" },
        report.confidence,
        report.threshold
    );
    for p in &report.predictions {
        output.push_str(&format!("  {:<10} {:.4}\n", p.label, p.score));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensa_core::Prediction;

    #[test]
    fn test_format_nsfw() {
        let report = NsfwReport {
            is_nsfw: true,
            confidence: 0.9,
            threshold: 0.5,
            predictions: vec![
                Prediction { label: "nsfw".into(), score: 0.9 },
                Prediction { label: "normal".into(), score: 0.1 },
            ],
        };
        let text = format_nsfw(&report);
        assert!(text.starts_with("NSFW: yes"));
        assert!(text.contains("normal"));
    }
}
