//! Field Sim - runs a JSON scenario and prints the results as JSON

mod scenario;

use anyhow::Context;
use clap::Parser;
use field_core::{sampling, Field};
use scenario::{ComplexValue, Query, QueryResult, Scenario};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "field-sim")]
#[command(about = "Evaluate sound pressure and self-interference for a source scenario")]
struct Cli {
    /// Path to a scenario JSON file
    scenario: PathBuf,

    /// Write source positions and frequencies here for an external plotter
    #[arg(long)]
    cloud_out: Option<PathBuf>,

    /// Build transfer tables while evaluating point pressures
    #[arg(long)]
    build_cache: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "field_sim=info,field_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    info!("Loading scenario from: {}", cli.scenario.display());
    let scenario = Scenario::load(&cli.scenario)
        .with_context(|| format!("failed to read scenario {}", cli.scenario.display()))?;

    let config = scenario.field_config();
    info!(
        size = ?config.size,
        speed_of_sound = config.speed_of_sound,
        amplitude = config.amplitude,
        "creating field"
    );
    let mut field = Field::new(config)?;
    for (i, descriptor) in scenario.sources.iter().enumerate() {
        let placement = field
            .place(descriptor)
            .with_context(|| format!("source batch {i} could not be placed"))?;
        info!(
            batch = i,
            cells = placement.cells_written,
            overwritten = placement.overwritten.len(),
            "sources placed"
        );
    }
    info!(sources = field.source_count(), frequencies = ?field.frequencies(), "field ready");

    if let Some(path) = &cli.cloud_out {
        let json = serde_json::to_string_pretty(&field.source_cloud())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write source cloud {}", path.display()))?;
        info!("Source cloud written to: {}", path.display());
    }

    let mut results = Vec::with_capacity(scenario.queries.len());
    for query in &scenario.queries {
        results.push(evaluate(&mut field, query, cli.build_cache)?);
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn evaluate(field: &mut Field, query: &Query, build_cache: bool) -> anyhow::Result<QueryResult> {
    let result = match *query {
        Query::Pressure { point, phase } => {
            let p = if build_cache {
                field.total_pressure_building_cache(point, phase)
            } else {
                field.total_pressure(point, phase)
            };
            info!(?point, phase, pressure = %p, magnitude = p.norm(), "pressure");
            QueryResult::Pressure {
                point,
                pressure: p.into(),
            }
        }
        Query::FarField { point, options } => {
            let p = field.far_field_pressure(point, &options)?;
            info!(?point, pressure = %p, magnitude = p.norm(), "far-field pressure");
            QueryResult::FarField {
                point,
                pressure: p.into(),
            }
        }
        Query::Cancellation { center, radius } => {
            let cancellation = field.cancellation(center, radius)?;
            info!(
                ?center,
                radius,
                residual = %cancellation.residual,
                ratio = cancellation.ratio,
                "cancellation"
            );
            QueryResult::Cancellation {
                center,
                radius,
                residual: ComplexValue::from(cancellation.residual),
                ratio: cancellation.ratio,
            }
        }
        Query::ArcProfile { center, radius, mode } => {
            let profile = field.arc_pressure_profile(center, radius, mode)?;
            let peak = profile.iter().map(|&(_, m)| m).fold(0.0, f64::max);
            info!(?center, radius, ?mode, samples = profile.len(), peak, "arc profile");
            let (angles, magnitudes) = profile.into_iter().unzip();
            QueryResult::ArcProfile { angles, magnitudes }
        }
        Query::Hemisphere { center, radius } => {
            let points = sampling::hemisphere(center, radius, field.size());
            let magnitudes = field
                .pressures(&points, 0.0)
                .iter()
                .map(|p| p.norm())
                .collect();
            info!(?center, radius, points = points.len(), "hemisphere");
            QueryResult::Hemisphere { points, magnitudes }
        }
    };
    Ok(result)
}
