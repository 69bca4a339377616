// ABOUTME: Command-line driver for the nutriscan food identification pipeline
// ABOUTME: Identifies a photo, barcode or text query and optionally logs the best match
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nutriscan::config::PipelineConfig;
use nutriscan::logging::{init_logging, LogFormat};
use nutriscan::meal_log::MealType;
use nutriscan::pipeline::FoodPipeline;

#[derive(Parser)]
#[command(
    name = "nutriscan-cli",
    about = "Identify foods and resolve their nutrition",
    version
)]
struct Cli {
    /// Emit logs as JSON (overrides LOG_FORMAT)
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize food in a photo
    Photo {
        /// Path or file:// URI of the image
        path: String,
        #[command(flatten)]
        log: LogArgs,
    },
    /// Look up a product barcode
    Barcode {
        /// Barcode digits
        code: String,
        #[command(flatten)]
        log: LogArgs,
    },
    /// Search foods by description
    Text {
        /// Food description
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[command(flatten)]
        log: LogArgs,
    },
}

#[derive(Args)]
struct LogArgs {
    /// Log the best match as this meal (breakfast, lunch, dinner, snack)
    #[arg(long = "log", value_name = "MEAL_TYPE")]
    meal_type: Option<MealType>,

    /// Category tag stored with the logged entry
    #[arg(long, default_value = "uncategorized")]
    category: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    init_logging(format);

    let config = PipelineConfig::from_env()?;
    let pipeline = FoodPipeline::from_config(&config)?;

    match cli.command {
        Command::Photo { path, log } => {
            commands::identify::photo(&pipeline, path, log.meal_type, log.category).await
        }
        Command::Barcode { code, log } => {
            commands::identify::barcode(&pipeline, code, log.meal_type, log.category).await
        }
        Command::Text { query, log } => {
            commands::identify::text(&pipeline, query.join(" "), log.meal_type, log.category).await
        }
    }
}
