//! Offline tools for the paired low/high resolution dataset.
//!
//! Creates dummy archives, computes normalization statistics, crops yearly
//! archives to a bounding box and inspects a configured dataset.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stormcast_data::archive::parse_datetime;
use stormcast_data::dummy::{write_dummy_dataset, DummySpec};
use stormcast_data::{
    compute_stats, discover, ArchiveLocation, ArchiveResolver, ArchiveWriter,
    ArchiveWriterConfig, BoundingBox, ChannelSelection, CropWindow, DatasetConfig, MemoryArchive,
    PairedDataset, Split, YearArchive, ZarrArchive,
};

#[derive(Parser, Debug)]
#[command(name = "stormcast-tool")]
#[command(about = "Offline tools for the paired low/high resolution dataset")]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write random yearly archives and statistics for each tier
    CreateDummy {
        /// Dataset root directory
        #[arg(short, long, default_value = ".")]
        location: PathBuf,

        /// Years to generate
        #[arg(long, value_delimiter = ',', default_value = "2025")]
        years: Vec<i32>,

        /// Tier directory names
        #[arg(long, value_delimiter = ',', default_value = "LowRes,HighRes")]
        tiers: Vec<String>,

        /// Channel names
        #[arg(long, value_delimiter = ',', default_value = "a,b,c,d,e")]
        channels: Vec<String>,

        /// Grid height
        #[arg(long, default_value = "32")]
        height: usize,

        /// Grid width
        #[arg(long, default_value = "32")]
        width: usize,

        /// Hours per year (default: the whole year)
        #[arg(long)]
        hours: Option<usize>,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Compute per-channel mean/std of a tier over a time range
    ComputeStats {
        /// Dataset root directory
        #[arg(short, long)]
        location: PathBuf,

        /// Tier directory name
        #[arg(short, long)]
        tier: String,

        /// First timestamp (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last timestamp, inclusive
        #[arg(long)]
        end: String,

        /// Output directory (default: <location>/<tier>/stats)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Upper bound on open archives
        #[arg(long, env = "STORMCAST_MAX_OPEN_ARCHIVES", default_value = "32")]
        max_open_archives: usize,
    },

    /// Crop a yearly archive to a bounding box
    Crop {
        /// Source archive directory (YYYY.zarr)
        #[arg(short, long)]
        input: PathBuf,

        /// Destination archive directory
        #[arg(short, long)]
        output: PathBuf,

        /// Bounding box as lat_min,lat_max,lon_min,lon_max
        #[arg(long)]
        bbox: String,

        /// Archive year (default: from the input directory name)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Open a dataset from its configuration and report its shape
    Inspect {
        /// Dataset configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Split to open
        #[arg(long, default_value = "train")]
        split: Split,

        /// Number of samples to fetch
        #[arg(long, default_value = "0")]
        samples: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if cli.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    match cli.command {
        Commands::CreateDummy {
            location,
            years,
            tiers,
            channels,
            height,
            width,
            hours,
            seed,
        } => {
            let spec = DummySpec {
                channels,
                grid: (height, width),
                hours,
                seed,
                ..Default::default()
            };
            let tiers: Vec<&str> = tiers.iter().map(String::as_str).collect();
            let written = write_dummy_dataset(
                &location,
                &tiers,
                &years,
                &spec,
                ArchiveWriterConfig::from_env(),
            )
            .with_context(|| format!("failed to write dummy data to {}", location.display()))?;

            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }

        Commands::ComputeStats {
            location,
            tier,
            start,
            end,
            output,
            max_open_archives,
        } => {
            let start = parse_datetime(&start).context("invalid --start")?;
            let end = parse_datetime(&end).context("invalid --end")?;

            let locations: Vec<ArchiveLocation> = discover(&location, &tier)?
                .into_iter()
                .filter(|loc| (start.year()..=end.year()).contains(&loc.year))
                .collect();
            if locations.is_empty() {
                bail!(
                    "no {} archives between {} and {} under {}",
                    tier,
                    start,
                    end,
                    location.display()
                );
            }

            let resolver = ArchiveResolver::open_zarr(&tier, &locations, max_open_archives)?;
            let selection = ChannelSelection::all(resolver.channels());
            let archives: Vec<&dyn YearArchive> = resolver.archives().map(|a| a.as_ref()).collect();
            let stats = compute_stats(&archives, &selection, start, end)?;

            let dir = output.unwrap_or_else(|| location.join(&tier).join("stats"));
            stats
                .save(&dir)
                .with_context(|| format!("failed to save statistics to {}", dir.display()))?;
            info!(dir = %dir.display(), "Saved statistics");

            println!("{:<12} {:>14} {:>14}", "channel", "mean", "std");
            for (i, name) in selection.names().iter().enumerate() {
                println!(
                    "{:<12} {:>14.6} {:>14.6}",
                    name,
                    stats.means()[i],
                    stats.stds()[i]
                );
            }
            Ok(())
        }

        Commands::Crop {
            input,
            output,
            bbox,
            year,
        } => {
            let year = match year.or_else(|| ArchiveLocation::year_from_path(&input)) {
                Some(y) => y,
                None => bail!(
                    "cannot infer the year of {}; pass --year",
                    input.display()
                ),
            };
            let bbox = BoundingBox::parse_lat_lon(&bbox)?;

            let archive = ZarrArchive::open(&input, year)?;
            let data = MemoryArchive::load(&archive)
                .with_context(|| format!("failed to read {}", input.display()))?
                .into_data();

            let window = CropWindow::from_grids(&data.latitude, &data.longitude, &bbox)?;
            info!(
                rows = ?window.rows(),
                cols = ?window.cols(),
                shape = ?window.shape(),
                "Cropping archive"
            );

            let cropped = window.crop_archive(&data)?;
            let result = ArchiveWriter::new(ArchiveWriterConfig::from_env())
                .write_to_path(&output, &cropped)
                .with_context(|| format!("failed to write {}", output.display()))?;

            println!(
                "{} -> {} ({} times, grid {:?})",
                input.display(),
                output.display(),
                result.times,
                result.grid_shape
            );
            Ok(())
        }

        Commands::Inspect {
            config,
            split,
            samples,
        } => {
            let config = DatasetConfig::from_yaml(&config)
                .with_context(|| format!("failed to load {}", config.display()))?;
            let dataset = PairedDataset::open(&config, split)?;

            println!("split:               {}", split);
            println!("samples:             {}", dataset.len());
            println!("years:               {:?}", dataset.index().years());
            println!("lead time (hours):   {}", dataset.index().lead_time().num_hours());
            println!("background channels: {:?}", dataset.background_channels());
            println!("state channels:      {:?}", dataset.state_channels());
            println!("image shape:         {:?}", dataset.image_shape());

            if let (Some(first), Some(last)) = (
                dataset.index().valid_timestamps().first(),
                dataset.index().valid_timestamps().last(),
            ) {
                let lead = dataset.index().lead_time();
                println!("first pair:          {} -> {}", first, *first + lead);
                println!("last pair:           {} -> {}", last, *last + lead);
            }

            for idx in 0..samples.min(dataset.len()) {
                let sample = dataset.get(idx)?;
                let (lo, hi) = sample
                    .state_input
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                println!(
                    "sample {:>6}: {} -> {} state range [{:.3}, {:.3}]",
                    idx, sample.input_time, sample.target_time, lo, hi
                );
            }
            Ok(())
        }
    }
}
