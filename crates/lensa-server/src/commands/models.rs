//! Models command - check the model files each service needs.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use super::load_config;

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Report which model files are present
    Check {
        /// Exit with an error if any file is missing
        #[arg(long)]
        strict: bool,
    },
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Check { strict } => check_models(config_path, strict),
    }
}

struct ModelStatus {
    label: &'static str,
    path: PathBuf,
    size: Option<u64>,
}

fn model_status(files: Vec<(&'static str, PathBuf)>) -> Vec<ModelStatus> {
    files
        .into_iter()
        .map(|(label, path)| {
            let size = fs::metadata(&path).ok().filter(|m| m.is_file()).map(|m| m.len());
            ModelStatus { label, path, size }
        })
        .collect()
}

fn check_models(config_path: Option<&str>, strict: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let statuses = model_status(config.model_files());

    println!("{}", style("Model Status").bold());
    println!();

    let mut missing = 0;
    let mut total_size: u64 = 0;

    for status in &statuses {
        let (mark, size_str) = match status.size {
            Some(size) => {
                total_size += size;
                (style("✓").green(), format_size(size))
            }
            None => {
                missing += 1;
                (style("✗").red(), "missing".to_string())
            }
        };

        println!(
            "  {} {:<18} {:>10}  {}",
            mark,
            status.label,
            size_str,
            status.path.display()
        );
    }

    println!();
    if missing == 0 {
        println!(
            "{} All {} model files present ({} total)",
            style("✓").green(),
            statuses.len(),
            format_size(total_size)
        );
    } else {
        println!(
            "{} {} of {} model files missing; the affected services will be unavailable",
            style("⚠").yellow(),
            missing,
            statuses.len()
        );
        if strict {
            anyhow::bail!("{} model files missing", missing);
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2_500), "2.5KB");
        assert_eq!(format_size(96_000_000), "96.0MB");
    }

    #[test]
    fn test_model_status_detects_presence() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("model.onnx");
        fs::write(&present, [0u8; 16]).unwrap();

        let statuses = model_status(vec![
            ("nsfw classifier", present),
            ("caption encoder", dir.path().join("missing.onnx")),
            ("directory", dir.path().to_path_buf()),
        ]);

        assert_eq!(statuses[0].size, Some(16));
        assert_eq!(statuses[1].size, None);
        assert_eq!(statuses[2].size, None);
    }
}
