//! Items command - list every billed item of a TISS file.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use tiss_core::models::config::TissConfig;
use tiss_core::models::guide::LineItem;
use tiss_core::tiss::rules::format_currency;

use super::process::OutputFormat;
use super::{build_parser, load_config, read_input, spinner, to_json, write_output};

/// Arguments for the items command.
#[derive(Args)]
pub struct ItemsArgs {
    /// Input TISS XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Ignore unreadable amounts instead of failing
    #[arg(long)]
    lenient: bool,
}

pub async fn run(args: ItemsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let input = read_input(&args.input).await?;

    info!("Listing items of {}", args.input.display());

    let pb = spinner("Reading items...")?;
    let items = build_parser(&config, args.lenient).items(&input.text);
    pb.finish_and_clear();
    let items = items?;

    let output = match args.format {
        OutputFormat::Json => to_json(&items, &config)?,
        OutputFormat::Csv => format_csv(&items)?,
        OutputFormat::Text => format_text(&items, &config),
    };

    write_output(args.output.as_ref(), &output)
}

fn format_csv(items: &[LineItem]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "kind",
        "guide_provider_number",
        "guide_operator_number",
        "expense_id",
        "table_code",
        "procedure_code",
        "description",
        "quantity",
        "unit_value",
        "total_value",
        "patient",
        "professional",
        "service_date",
    ])?;

    for item in items {
        wtr.write_record([
            item.kind.as_str().to_string(),
            item.guide_provider_number.clone(),
            item.guide_operator_number.clone(),
            item.expense_id.clone(),
            item.table_code.clone(),
            item.procedure_code.clone(),
            item.description.clone(),
            item.quantity.to_string(),
            item.unit_value.to_string(),
            item.total_value.to_string(),
            item.patient.clone(),
            item.professional.clone(),
            item.service_date.map(|d| d.to_string()).unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(items: &[LineItem], config: &TissConfig) -> String {
    let symbol = &config.output.currency_symbol;
    let mut output = String::new();

    for item in items {
        output.push_str(&format!(
            "{} {} {} x {} = {}",
            item.guide_provider_number,
            item.procedure_code,
            item.quantity,
            format_currency(item.unit_value, symbol),
            format_currency(item.total_value, symbol),
        ));
        if !item.description.is_empty() {
            output.push_str(&format!(" ({})", item.description));
        }
        output.push('\n');
    }

    output
}
