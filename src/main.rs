pub mod types;
pub mod config;
pub mod data;
pub mod ingest;
pub mod scale;
pub mod encoding;
pub mod surface;
pub mod views;
pub mod timeline;
pub mod highlight;
pub mod session;
pub mod pick;
pub mod render;
pub mod server;
pub mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a World Bank databank CSV export into the indicator dataset
    Ingest {
        /// Databank CSV export
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Dataset JSON to write
        #[arg(short, long, value_name = "FILE", default_value = "data.json")]
        output: PathBuf,
        /// Config supplying a custom series mapping
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Render the map and scatter plot for one year to SVG
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Year to show (defaults to timeline.initial_year)
        #[arg(short, long)]
        year: Option<i32>,
        /// Country code to highlight
        #[arg(short, long)]
        focus: Option<String>,
        /// Output file (defaults to output.svg from the config)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Serve the interactive API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { input, output, config } => {
            let app_config = config.as_deref().map(config::AppConfig::load_from_file).transpose()?;
            let series_map = match &app_config {
                Some(app_config) => app_config.ingest.series.clone(),
                None => config::IngestConfig::default().series,
            };
            let result = ingest::ingest_file(&input, &series_map)?;
            if let Some(app_config) = &app_config {
                result.ensure_base_year(app_config.timeline.base_year)?;
            }
            ingest::write_dataset(&output, &result.records)?;
            tracing::info!(
                "Wrote {} countries to {:?}; set timeline.base_year = {} when loading it",
                result.records.len(), output, result.first_year
            );
        }
        Commands::Render { config, year, focus, output } => {
            tracing::info!("Rendering with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            let data = Arc::new(data::load_dataset(&app_config)?);
            let boundaries = data::load_boundaries(&app_config)?;

            let mut session = session::Session::new(&app_config, data, &boundaries, surface::RetainedSurface::new())?;
            if let Some(year) = year {
                session.set_year(year);
            }
            if let Some(code) = focus {
                if !session.hover(&types::CountryCode::new(code.clone())) {
                    tracing::warn!("Country {} not found, rendering without focus", code);
                }
            }

            let path = output.unwrap_or_else(|| app_config.output.svg.clone());
            render::write_svg(&path, &session, &boundaries, &app_config.layout)
                .context("Rendering failed")?;
        }
        Commands::Serve { config } => {
            tracing::info!("Serving with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            // Nothing can be drawn without both documents, so load failures end startup here.
            let data = Arc::new(data::load_dataset(&app_config)?);
            let boundaries = data::load_boundaries(&app_config)?;

            server::start_server(app_config, data, boundaries).await?;
        }
    }

    Ok(())
}
