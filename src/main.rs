//! jindex CLI
//!
//! Offline inspection of staged datasets: `analyze` prints the inferred
//! schema, `plan` prints the index configuration an import would create.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jindex::config::EngineConfig;
use jindex::mapping::{IndexConfigGenerator, MappingOptions};
use jindex::schema::SchemaAnalyzer;
use jindex::staging::parse_records;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "jindex", version, about = "Bulk JSON import engine for document-search spaces")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Infer and print the schema of a staged JSON file
    Analyze {
        /// Staged JSON file (array of objects)
        file: PathBuf,
        /// Print the full analysis as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Print the index configuration an import of this file would create
    Plan {
        /// Staged JSON file (array of objects)
        file: PathBuf,
        /// Target space identifier
        #[arg(short, long, default_value = "default")]
        space: String,
        /// Generate vector mappings with this dimensionality
        #[arg(long)]
        vector_dims: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Analyze { file, json } => analyze(&config, &file, json),
        Command::Plan {
            file,
            space,
            vector_dims,
        } => plan(&config, &file, &space, vector_dims),
    }
}

fn read_dataset(path: &PathBuf) -> Result<Vec<jindex::types::Record>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    parse_records(&raw).with_context(|| format!("failed to parse '{}'", path.display()))
}

fn analyze(config: &EngineConfig, file: &PathBuf, json: bool) -> Result<()> {
    let records = read_dataset(file)?;
    let analysis = SchemaAnalyzer::new(config.analysis.clone()).analyze(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!(
        "{} records, {} fields, quality {:.2}",
        analysis.total_records, analysis.total_fields, analysis.overall_quality_score
    );
    if let Some(id) = &analysis.recommended_id_field {
        println!("recommended id field: {}", id);
    }
    if !analysis.recommended_index_fields.is_empty() {
        println!(
            "recommended index fields: {}",
            analysis.recommended_index_fields.join(", ")
        );
    }
    println!();
    for field in analysis.fields.values() {
        let mut notes = Vec::new();
        if field.suggest_as_id {
            notes.push("id".to_string());
        }
        if field.suggest_index {
            notes.push("index".to_string());
        }
        if field.has_chinese_content {
            notes.push(format!("cjk {:.0}%", field.chinese_ratio * 100.0));
        }
        println!(
            "  {:<24} {:?} (confidence {:.2}, null {:.0}%, unique {:.0}%){}",
            field.field_name,
            field.inferred_type,
            field.confidence,
            field.stats.null_ratio * 100.0,
            field.stats.unique_ratio * 100.0,
            if notes.is_empty() {
                String::new()
            } else {
                format!(" [{}]", notes.join(", "))
            }
        );
        for issue in &field.issues {
            println!("      issue: {}", issue);
        }
    }
    for anomaly in &analysis.report.anomalies {
        println!("anomaly: {}", anomaly);
    }
    for recommendation in &analysis.report.recommendations {
        println!("recommendation: {}", recommendation);
    }
    Ok(())
}

fn plan(config: &EngineConfig, file: &PathBuf, space: &str, vector_dims: Option<usize>) -> Result<()> {
    let records = read_dataset(file)?;
    let analysis = SchemaAnalyzer::new(config.analysis.clone()).analyze(&records);
    let options = MappingOptions {
        vector_dims,
        ..MappingOptions::default()
    };
    let index_config = IndexConfigGenerator::new(options).generate(space, &analysis);

    println!("index: {}", index_config.index_name);
    println!(
        "shards: {}, replicas: {}, refresh: {}",
        index_config.settings.shards,
        index_config.settings.replicas,
        index_config.settings.refresh_interval
    );
    println!("{}", serde_json::to_string_pretty(&index_config.to_wire())?);
    Ok(())
}
