//! Crime Atlas - command line front end
//!
//! Answers the same lookups the dashboard makes and writes painted GeoJSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crime_atlas::data::{parse_date_arg, CodeTable, ForecastTable};
use crime_atlas::geo::{load_region, ordered_regions};
use crime_atlas::score::{is_missing, ScoreTable};
use crime_atlas::{Atlas, AtlasConfig};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "crime-atlas", version, about = "Crime forecast scores by region and commune")]
struct Cli {
    /// JSON configuration; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List regions and their codes
    Regions,
    /// List communes, optionally for one region
    Communes {
        #[arg(long)]
        region: Option<i64>,
    },
    /// Score of one region or commune
    Score {
        #[arg(long)]
        source: String,
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        code: Option<i64>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Every score with its location
    Scores {
        #[arg(long)]
        source: String,
    },
    /// Write a region's boundaries with scores attached
    Paint {
        #[arg(long)]
        source: String,
        #[arg(long)]
        region: u8,
        /// Feature property holding the code
        #[arg(long)]
        property: String,
        #[arg(long, default_value = "score")]
        target: String,
        #[arg(long)]
        output: PathBuf,
    },
    /// Numeric range of a score dataset column
    Range {
        #[arg(long)]
        source: String,
        #[arg(long)]
        column: String,
    },
    /// Forecast dates
    Dates,
    /// Forecast time series of one commune
    Series {
        #[arg(long)]
        commune: String,
    },
    /// Forecast values of every commune on one date
    Snapshot {
        #[arg(long, value_parser = parse_date_arg)]
        date: chrono::NaiveDate,
    },
    /// Load everything and print an overview
    Summary,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AtlasConfig::load(path)?,
        None => AtlasConfig::default(),
    };

    match cli.command {
        Command::Regions => {
            let codes = CodeTable::load(&config.code_table)?;
            for (name, code) in codes.regions().iter() {
                println!("{code:>3}  {name}");
            }
        }
        Command::Communes { region } => {
            let codes = CodeTable::load(&config.code_table)?;
            let communes = match region {
                Some(region) => codes.communes_in_region(region),
                None => codes.communes().iter().collect(),
            };
            for (name, code) in communes {
                println!("{code:>6}  {name}");
            }
        }
        Command::Score { source, code, name } => {
            let table = score_table(&config, &source)?;
            let (label, score) = match (code, name) {
                (Some(code), _) => (code.to_string(), table.score_by_code(code)),
                (None, Some(name)) => {
                    let score = table.score_by_name(&name)?;
                    (name, score)
                }
                (None, None) => bail!("either --code or --name is required"),
            };
            println!("{label}: {}", format_score(score));
            if let Some(code) = code.or_else(|| table.locations().code_for(&label)) {
                for (column, value) in table.details_for_code(code)? {
                    println!("  {column}: {value}");
                }
            }
        }
        Command::Scores { source } => {
            let table = score_table(&config, &source)?;
            let (scores, names) = table.scores_and_names();
            for (score, name) in scores.iter().zip(&names) {
                println!("{:>10}  {name}", format_score(*score));
            }
        }
        Command::Paint {
            source,
            region,
            property,
            target,
            output,
        } => {
            let table = score_table(&config, &source)?;
            let boundaries = load_region(&config.geo_dir, region)?;
            let painted = table.apply_scores_to_geometry(&boundaries, &property, &target);
            let json = serde_json::to_string(&painted)?;
            fs::write(&output, json)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(output = %output.display(), features = painted.len(), "painted region");
        }
        Command::Range { source, column } => {
            let table = score_table(&config, &source)?;
            let (min, max) = table.column_min_max(&column)?;
            println!("{column}: {min} .. {max}");
        }
        Command::Dates => {
            let forecast = forecast_table(&config)?;
            for date in forecast.dates() {
                println!("{date}");
            }
        }
        Command::Series { commune } => {
            let forecast = forecast_table(&config)?;
            for point in forecast.series(&commune)? {
                println!("{}  {:>10.3}  {:>10.3}", point.date, point.forecast, point.observed);
            }
        }
        Command::Snapshot { date } => {
            let forecast = forecast_table(&config)?;
            for point in forecast.snapshot(date) {
                println!(
                    "{:<24}  {:>10.3}  {:>10.3}",
                    point.commune, point.forecast, point.observed
                );
            }
        }
        Command::Summary => {
            let atlas = Atlas::load(&config)?;
            println!(
                "{} regions, {} communes",
                atlas.codes().regions().len(),
                atlas.codes().communes().len()
            );
            for (code, boundaries) in ordered_regions(atlas.regions()) {
                let focus = boundaries
                    .centroid()
                    .map(|(lon, lat)| format!("{lat:.3}, {lon:.3}"))
                    .unwrap_or_else(|| "-".to_string());
                println!("  region {code:>2}: {} features, centroid {focus}", boundaries.len());
            }
            for table in atlas.scores() {
                let s = table.summary();
                println!(
                    "{} ({:?}): {} scores, {} missing, {:.3} .. {:.3}, mean {:.3}, median {:.3}",
                    table.identifier(),
                    table.mode(),
                    s.count,
                    s.missing,
                    s.min,
                    s.max,
                    s.mean,
                    s.median
                );
            }
            println!(
                "forecast: {} rows over {} dates",
                atlas.forecast().len(),
                atlas.forecast().dates().len()
            );
        }
    }

    Ok(())
}

fn score_table(config: &AtlasConfig, identifier: &str) -> Result<ScoreTable> {
    let source = config
        .score_source(identifier)
        .with_context(|| format!("score `{identifier}` is not configured"))?;
    let codes = CodeTable::load(&config.code_table)?;
    Ok(ScoreTable::load(source, &codes)?)
}

fn forecast_table(config: &AtlasConfig) -> Result<ForecastTable> {
    Ok(ForecastTable::load(
        &config.forecast,
        config.forecast_columns.clone(),
    )?)
}

fn format_score(score: f64) -> String {
    if is_missing(score) {
        "no data".to_string()
    } else {
        format!("{score:.3}")
    }
}
