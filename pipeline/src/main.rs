use anyhow::Context;
use clap::Parser;
use console::annotator::ConsoleAnnotator;
use infracore::ingest::normalize::StationArchive;
use std::io;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod console;
mod generator;
mod reports;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Infrasound arrival-time pipeline driver")]
struct Args {
    /// Generate synthetic raw recordings before ingestion
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Normalize raw recordings into the station archive
    #[arg(long, default_value_t = false)]
    ingest: bool,
    #[arg(long, default_value_t = false)]
    render_map: bool,
    #[arg(long, default_value_t = false)]
    render_distances: bool,
    #[arg(long, default_value_t = false)]
    render_filters: bool,
    #[arg(long, default_value_t = false)]
    render_spectra: bool,
    /// Convolve every station with the filter bank
    #[arg(long, default_value_t = false)]
    apply_filters: bool,
    #[arg(long, default_value_t = false)]
    render_sections: bool,
    /// Mark arrivals for stations that have none yet
    #[arg(long, default_value_t = false)]
    annotate: bool,
    #[arg(long, default_value_t = false)]
    fit_velocity: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Station whose spectra are rendered
    #[arg(long, default_value_t = 0)]
    station: usize,
}

/// Loads the archive on first use and hands out the cached copy afterwards.
fn archive<'a>(
    runner: &Runner,
    cached: &'a mut Option<StationArchive>,
) -> anyhow::Result<&'a StationArchive> {
    if cached.is_none() {
        *cached = Some(runner.load_archive()?);
    }
    cached.as_ref().context("archive unavailable")
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = match args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    // fail on bad kernels before any stage touches the disk
    workflow_config.filter_bank()?;
    let runner = Runner::new(workflow_config);

    let mut cached: Option<StationArchive> = None;

    if args.synthetic {
        runner.generate_synthetic().context("synthetic stage")?;
    }
    if args.ingest {
        cached = Some(runner.ingest()?);
    }
    if args.render_map {
        runner.render_map(archive(&runner, &mut cached)?)?;
    }
    if args.render_distances {
        runner.render_distances(archive(&runner, &mut cached)?)?;
    }
    if args.render_filters {
        let loaded = if runner.config().sampling_rate.is_none() {
            Some(archive(&runner, &mut cached)?)
        } else {
            None
        };
        runner.render_filters(loaded)?;
    }
    if args.render_spectra {
        runner.render_spectra(archive(&runner, &mut cached)?, args.station)?;
    }
    if args.apply_filters {
        let snapshot = runner.apply_filters(archive(&runner, &mut cached)?)?;
        println!(
            "apply-filters -> {} stations filtered, {} skipped, {} failed",
            snapshot.processed, snapshot.skipped, snapshot.errors
        );
    }
    if args.render_sections {
        runner.render_sections(archive(&runner, &mut cached)?)?;
    }
    if args.annotate {
        let loaded = archive(&runner, &mut cached)?;
        let stdin = io::stdin();
        let mut annotator = ConsoleAnnotator::new(stdin.lock(), io::stdout());
        let summary = runner.annotate(loaded, &mut annotator)?;
        println!(
            "annotate -> {} annotated, {} skipped, {} already done",
            summary.annotated, summary.skipped, summary.already_done
        );
    }
    if args.fit_velocity {
        let estimate = runner.fit_velocity(archive(&runner, &mut cached)?)?;
        println!(
            "fit-velocity -> {:.1} m/s from {} stations (origin {:.3})",
            estimate.velocity, estimate.stations_used, estimate.origin_time
        );
    }

    Ok(())
}
