//! Process command - extract batch data from a single TISS file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use tiss_core::models::batch::FileReport;
use tiss_core::models::config::TissConfig;
use tiss_core::tiss::rules::format_currency;
use tiss_core::TissExtractor;

use super::{build_parser, load_config, read_input, spinner, to_json, write_output};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input TISS XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Ignore unreadable amounts instead of failing
    #[arg(long)]
    lenient: bool,

    /// Show warnings collected during extraction
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let input = read_input(&args.input).await?;

    info!("Processing file: {}", args.input.display());

    let pb = spinner("Reading TISS batch...")?;
    let parser = build_parser(&config, args.lenient);
    let result = parser.extract(&input.text);
    pb.finish_and_clear();

    let report = FileReport::new(input.file_name, result?, config.extraction.check_filename_lote);

    if report.suspicious {
        eprintln!(
            "{} {} guides but total value is zero",
            style("⚠").yellow(),
            report.result.guide_count
        );
    }
    if report.lote_matches == Some(false) {
        eprintln!(
            "{} Batch number in file name ({}) differs from document ({})",
            style("⚠").yellow(),
            report.filename_lote.as_deref().unwrap_or(""),
            report.result.batch_number
        );
    }

    let output = format_report(&report, args.format, &config)?;
    write_output(args.output.as_ref(), &output)?;

    if args.show_warnings && !report.result.warnings.is_empty() {
        eprintln!("{}", style("Warnings:").yellow());
        for warning in &report.result.warnings {
            eprintln!("  - {}", warning);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_report(
    report: &FileReport,
    format: OutputFormat,
    config: &TissConfig,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(report, config),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report, config)),
    }
}

fn format_csv(report: &FileReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    // Write header
    wtr.write_record([
        "file_name",
        "batch_number",
        "document_type",
        "guide_count",
        "total_value",
        "total_source",
        "filename_lote",
        "lote_matches",
        "suspicious",
        "parser_version",
    ])?;

    // Write data
    let result = &report.result;
    wtr.write_record([
        report.file_name.clone(),
        result.batch_number.clone(),
        result.document_type.label().to_string(),
        result.guide_count.to_string(),
        result.total_value.to_string(),
        result.total_source.as_str().to_string(),
        report.filename_lote.clone().unwrap_or_default(),
        report.lote_matches.map(|m| m.to_string()).unwrap_or_default(),
        report.suspicious.to_string(),
        result.parser_version.clone(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &FileReport, config: &TissConfig) -> String {
    let result = &report.result;
    let symbol = &config.output.currency_symbol;
    let mut output = String::new();

    output.push_str(&format!("File: {}\n", report.file_name));
    output.push_str(&format!("Type: {}\n", result.document_type));

    let batch = if result.batch_number.is_empty() { "-" } else { result.batch_number.as_str() };
    output.push_str(&format!("Batch: {}\n", batch));
    output.push_str(&format!("Guides: {}\n", result.guide_count));
    output.push_str(&format!(
        "Total: {} ({})\n",
        format_currency(result.total_value, symbol),
        result.total_source.as_str()
    ));

    if let Some(lote) = &report.filename_lote {
        let status = if report.lote_matches == Some(true) { "matches" } else { "DIFFERS" };
        output.push_str(&format!("File name batch: {} ({})\n", lote, status));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiss_core::{DocumentType, ExtractionResult, TotalSource};

    fn report() -> FileReport {
        let result = ExtractionResult {
            batch_number: "123".to_string(),
            guide_count: 2,
            total_value: "1234.5".parse().unwrap(),
            document_type: DocumentType::SpSadt,
            total_source: TotalSource::ItemSum,
            warnings: Vec::new(),
            parser_version: "0.1.0".to_string(),
        };
        FileReport::new("LOTE_124.xml", result, true)
    }

    #[test]
    fn test_format_text() {
        let text = format_text(&report(), &TissConfig::default());

        assert!(text.contains("Type: SP-SADT"));
        assert!(text.contains("Total: R$ 1.234,50 (item_sum)"));
        assert!(text.contains("File name batch: 124 (DIFFERS)"));
    }

    #[test]
    fn test_format_csv() {
        let csv = format_csv(&report()).unwrap();
        let mut lines = csv.lines();

        assert!(lines.next().unwrap().starts_with("file_name,batch_number"));
        assert_eq!(
            lines.next().unwrap(),
            "LOTE_124.xml,123,SP-SADT,2,1234.5,item_sum,124,false,false,0.1.0"
        );
    }
}
