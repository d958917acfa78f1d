mod app;
mod color;
mod state;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Parser;
use eframe::egui;

use app::DashboardApp;
use influence_dash::config::DashConfig;
use influence_dash::data::filter::FilterSelection;
use influence_dash::data::loader;
use influence_dash::data::model::Table;
use influence_dash::data::schema::{DatasetSchema, Variant};
use influence_dash::{pipeline, report};

/// Influencer campaign dashboard.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// CSV, JSON or Parquet file to open at startup.
    file: Option<PathBuf>,

    /// Fetch the dataset over HTTP instead of reading a file.
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,

    /// Column layout of the dataset.
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a summary to stdout instead of opening a window.
    #[arg(long)]
    report: bool,

    /// With --report, print JSON instead of text.
    #[arg(long, requires = "report")]
    json: bool,

    /// Write the loaded table as CSV and exit.
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = DashConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(variant) = cli.variant {
        config.data.variant = variant;
    }
    if let Some(file) = &cli.file {
        config.data.source = Some(file.display().to_string());
    }
    if let Some(url) = &cli.url {
        config.data.source = Some(url.clone());
    }

    if cli.report || cli.export.is_some() {
        return headless(&cli, &config);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Influence Dash",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(config)))),
    )
    .map_err(|e| anyhow!("window closed with an error: {e}"))
}

fn load_source(source: &str, schema: &DatasetSchema) -> anyhow::Result<Table> {
    if source.starts_with("http://") || source.starts_with("https://") {
        #[cfg(feature = "remote")]
        return loader::load_url(source, schema).with_context(|| format!("fetching {source}"));
        #[cfg(not(feature = "remote"))]
        anyhow::bail!("built without URL support, cannot fetch {source}");
    }
    loader::load_file(Path::new(source), schema).with_context(|| format!("loading {source}"))
}

fn headless(cli: &Cli, config: &DashConfig) -> anyhow::Result<()> {
    let source = config
        .data
        .source
        .as_deref()
        .context("no dataset given: pass a FILE, --url, or set data.source")?;
    let schema = DatasetSchema::for_variant(config.data.variant);
    let table = load_source(source, &schema)?;

    if let Some(path) = &cli.export {
        influence_dash::data::export::write_csv_file(&table, path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if cli.report {
        let selection = FilterSelection::all_observed(&table, &schema.roles.filters);
        let view = pipeline::compute(&table, &schema, &selection, &config.analysis);
        if cli.json {
            let doc = report::to_json(&view, &schema);
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            print!("{}", report::render_text(&view, &schema));
        }
    }
    Ok(())
}
