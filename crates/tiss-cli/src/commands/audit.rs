//! Audit command - compare each guide's declared total with its items.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use tiss_core::models::config::TissConfig;
use tiss_core::models::guide::GuideAudit;
use tiss_core::tiss::rules::format_currency;

use super::process::OutputFormat;
use super::{build_parser, load_config, read_input, spinner, to_json, write_output};

/// Arguments for the audit command.
#[derive(Args)]
pub struct AuditArgs {
    /// Input TISS XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Ignore unreadable amounts instead of failing
    #[arg(long)]
    lenient: bool,

    /// Only list guides whose declared total differs from their items
    #[arg(long)]
    mismatches_only: bool,
}

pub async fn run(args: AuditArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let input = read_input(&args.input).await?;

    info!("Auditing file: {}", args.input.display());

    let pb = spinner("Auditing guides...")?;
    let audits = build_parser(&config, args.lenient).audit(&input.text);
    pb.finish_and_clear();

    let mut audits = audits?;
    let total = audits.len();
    if args.mismatches_only {
        audits.retain(|a| a.matches_declared == Some(false));
    }

    let output = match args.format {
        OutputFormat::Json => to_json(&audits, &config)?,
        OutputFormat::Csv => format_csv(&audits)?,
        OutputFormat::Text => format_text(&audits, &config),
    };
    write_output(args.output.as_ref(), &output)?;

    let mismatched = if args.mismatches_only {
        audits.len()
    } else {
        audits.iter().filter(|a| a.matches_declared == Some(false)).count()
    };
    if mismatched > 0 {
        eprintln!(
            "{} {} of {} guides declare a total different from their items",
            style("⚠").yellow(),
            mismatched,
            total
        );
    }

    Ok(())
}

fn format_csv(audits: &[GuideAudit]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "document_type",
        "guide_provider_number",
        "guide_operator_number",
        "declared_total",
        "procedures_subtotal",
        "other_expenses_subtotal",
        "items_subtotal",
        "matches_declared",
    ])?;

    for audit in audits {
        wtr.write_record([
            audit.document_type.label().to_string(),
            audit.guide_provider_number.clone(),
            audit.guide_operator_number.clone(),
            audit.declared_total.map(|t| t.to_string()).unwrap_or_default(),
            audit.procedures_subtotal.to_string(),
            audit.other_expenses_subtotal.to_string(),
            audit.items_subtotal.to_string(),
            audit.matches_declared.map(|m| m.to_string()).unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(audits: &[GuideAudit], config: &TissConfig) -> String {
    let symbol = &config.output.currency_symbol;
    let mut output = String::new();

    for audit in audits {
        let declared = audit
            .declared_total
            .map(|t| format_currency(t, symbol))
            .unwrap_or_else(|| "-".to_string());
        let status = match audit.matches_declared {
            Some(true) => "ok",
            Some(false) => "MISMATCH",
            None => "no total",
        };

        output.push_str(&format!(
            "{} {} / {}: declared {}, items {} [{}]\n",
            audit.document_type,
            audit.guide_provider_number,
            audit.guide_operator_number,
            declared,
            format_currency(audit.items_subtotal, symbol),
            status
        ));
    }

    output.push_str(&format!("{} guides\n", audits.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiss_core::DocumentType;

    #[test]
    fn test_format_text_marks_mismatch() {
        let audits = vec![GuideAudit::new(
            DocumentType::SpSadt,
            "A1".to_string(),
            "OP1".to_string(),
            Some("100".parse().unwrap()),
            "90".parse().unwrap(),
            "5".parse().unwrap(),
        )
        .unwrap()];

        let text = format_text(&audits, &TissConfig::default());
        assert!(text.contains("SP-SADT A1 / OP1: declared R$ 100,00, items R$ 95,00 [MISMATCH]"));
        assert!(text.ends_with("1 guides\n"));
    }
}
