//! Subcommands and the input/output plumbing they share.

pub mod audit;
pub mod config;
pub mod items;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use tiss_core::models::config::TissConfig;
use tiss_core::{decode_xml, TissParser};

/// A TISS file read from disk and decoded to text.
pub struct XmlInput {
    /// File name without directories, used for batch number checks.
    pub file_name: String,
    /// Decoded XML text.
    pub text: String,
}

/// Load the config given on the command line, else the default file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TissConfig> {
    if let Some(path) = config_path {
        return Ok(TissConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Loading configuration from {}", default_path.display());
        Ok(TissConfig::from_file(&default_path)?)
    } else {
        Ok(TissConfig::default())
    }
}

/// Parser configured from the config file and the `--lenient` flag.
pub fn build_parser(config: &TissConfig, lenient: bool) -> TissParser {
    TissParser::new().with_strict_amounts(config.extraction.strict_amounts && !lenient)
}

/// Read and decode a TISS XML file.
pub async fn read_input(path: &Path) -> anyhow::Result<XmlInput> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "xml" {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    let data = tokio::fs::read(path).await?;
    debug!("Read {} bytes from {}", data.len(), path.display());

    let text = decode_xml(&data)?.into_owned();
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.xml")
        .to_string();

    Ok(XmlInput { file_name, text })
}

/// Spinner shown while a file is being parsed.
pub fn spinner(message: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    Ok(pb)
}

/// Write to the output file if given, else to stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> anyhow::Result<()> {
    if let Some(output_path) = output {
        fs::write(output_path, content)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", content);
    }

    Ok(())
}

/// Serialize to JSON, pretty-printed when configured.
pub fn to_json<T: serde::Serialize>(value: &T, config: &TissConfig) -> anyhow::Result<String> {
    if config.output.pretty_json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}
