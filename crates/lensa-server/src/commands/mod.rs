//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod models;
pub mod parse;
pub mod process;
pub mod serve;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

use lensa_core::{ExtractedRecord, Field, LensaConfig};

/// Output format shared by `process` and `parse`.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lensa")
        .join("config.json")
}

/// The file `-c` points at, or the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration, falling back to defaults when no file exists.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<LensaConfig> {
    if let Some(path) = config_path {
        return Ok(LensaConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using config from {}", path.display());
        Ok(LensaConfig::from_file(&path)?)
    } else {
        Ok(LensaConfig::default())
    }
}

/// Write to `output` when given, else print.
pub fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            println!(
                "{} Output written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Human-readable listing of the filled fields and the raw lines.
pub fn format_record(record: &ExtractedRecord) -> String {
    let mut output = String::new();

    output.push_str("Fields:\n");
    let mut any = false;
    for field in Field::ALL {
        let value = record.get(field);
        if !value.is_empty() {
            output.push_str(&format!("  {:<15} {}\n", field.as_str(), value));
            any = true;
        }
    }
    if !any {
        output.push_str("  (none)\n");
    }

    output.push_str("\nRaw text:\n");
    for line in &record.raw_text {
        output.push_str(&format!("  {}\n", line));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensa_core::{Polygon, TextItem};

    fn item(text: &str, y: f32) -> TextItem {
        TextItem::new(text, 0.9, Polygon::from_rect(0.0, y, 100.0, y + 10.0))
    }

    #[test]
    fn test_format_record_lists_filled_fields() {
        let record = lensa_core::extract_fields(&[
            item("NIK 3171234567890123", 0.0),
            item("Jl. Merdeka No 5", 20.0),
        ]);
        let text = format_record(&record);

        assert!(text.contains("id_number"));
        assert!(text.contains("Jl. Merdeka No 5"));
        assert!(!text.contains("religion"));
    }

    #[test]
    fn test_format_record_empty() {
        let text = format_record(&ExtractedRecord::default());
        assert!(text.contains("(none)"));
    }

    #[test]
    fn test_config_file_prefers_explicit_path() {
        assert_eq!(config_file(Some("/tmp/x.json")), PathBuf::from("/tmp/x.json"));
        assert!(config_file(None).ends_with("lensa/config.json"));
    }
}
