//! Parse command - field extraction over saved OCR output.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use lensa_core::{extract_fields, ExtractedRecord, TextItem};

use super::{format_record, write_output, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// JSON array of OCR items (`text`, `confidence`, `bbox`)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    let content = fs::read_to_string(&args.input)?;
    let record = parse_items(&content)?;

    info!(
        "Parsed {} lines, {} fields filled",
        record.raw_text.len(),
        record.filled_count()
    );

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&record)?,
        OutputFormat::Text => format_record(&record),
    };

    write_output(args.output.as_deref(), &output)
}

/// Deserialize OCR items and run the field heuristic over them.
fn parse_items(content: &str) -> anyhow::Result<ExtractedRecord> {
    let items: Vec<TextItem> = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid OCR item list: {}", e))?;
    Ok(extract_fields(&items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_both_polygon_encodings() {
        let content = r#"[
            {"text": "Jl. Merdeka No 5", "confidence": 0.9,
             "bbox": [[0, 40], [100, 40], [100, 50], [0, 50]]},
            {"text": "NIK 3171234567890123", "confidence": 0.95,
             "bbox": {"x": [0, 100, 100, 0], "y": [0, 0, 10, 10]}}
        ]"#;

        let record = parse_items(content).unwrap();
        assert_eq!(record.id_number, "NIK 3171234567890123");
        assert_eq!(record.address, "Jl. Merdeka No 5");
        assert_eq!(record.raw_text, vec!["NIK 3171234567890123", "Jl. Merdeka No 5"]);
    }

    #[test]
    fn test_parse_rejects_malformed_polygon() {
        let content = r#"[{"text": "x", "confidence": 0.5, "bbox": [[0, 0], [1, 1]]}]"#;
        assert!(parse_items(content).is_err());
    }
}
