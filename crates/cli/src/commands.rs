use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use spotted_core::history::{filter_history, HistoryFilter};
use spotted_core::registration::RegistrationDirectory;
use spotted_core::share_card::ShareCard;
use spotted_core::statistics::CollectionStatistics;
use spotted_core::store::VehicleRecordStore;
use spotted_core::types::RecordId;
use spotted_core::vehicle::MediaItem;
use spotted_db::{SettingsStore, VehicleSnapshotStore};
use spotted_lookup::{CarCheckClient, PlateRecognizerClient, SpotPipeline};

use crate::config::AppConfig;
use crate::output::{detail_text, stats_text, summary_line, RecordSummary};

type Store = VehicleRecordStore<VehicleSnapshotStore>;

#[derive(Parser, Debug)]
#[command(name = "spotted")]
#[command(about = "Collect and browse spotted vehicles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize the plate in a photo, look the vehicle up and save it
    Spot {
        /// Still image sent for plate recognition
        #[arg(long)]
        image: PathBuf,
        /// Video to store instead of the image (the image should be a frame of it)
        #[arg(long)]
        video: Option<PathBuf>,
    },
    /// Save a capture under a plate typed by hand
    #[command(group(clap::ArgGroup::new("media").required(true)))]
    Add {
        plate: String,
        #[arg(long, group = "media")]
        image: Option<PathBuf>,
        #[arg(long, group = "media")]
        video: Option<PathBuf>,
        /// Skip the attribute lookup and save with empty details
        #[arg(long, default_value_t = false)]
        no_lookup: bool,
    },
    /// List saved vehicles
    List {
        /// Case-insensitive match on plate, make or model
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show every detail of one vehicle
    Show { id: RecordId },
    /// Correct a vehicle's plate and refresh its details
    Edit { id: RecordId, plate: String },
    /// Delete a vehicle and all of its media
    Delete { id: RecordId },
    /// Remove one media item from a vehicle
    Prune { id: RecordId, index: usize },
    /// Collection statistics
    Stats {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a shareable card for one vehicle
    Card {
        id: RecordId,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterArg {
    All,
    LastWeek,
    LastMonth,
    ByBrand,
    Rare,
}

impl From<FilterArg> for HistoryFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => Self::All,
            FilterArg::LastWeek => Self::LastWeek,
            FilterArg::LastMonth => Self::LastMonth,
            FilterArg::ByBrand => Self::ByBrand,
            FilterArg::Rare => Self::Rare,
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let mut store = open_store(&config)?;

    match cli.command {
        Commands::Spot { image, video } => {
            let token = config
                .recognizer_token
                .clone()
                .context("PLATE_RECOGNIZER_TOKEN is required for spot")?;
            let pipeline = build_pipeline(&config, token)?;

            let image_bytes = read_media(&image).await?;
            let media = match video {
                Some(path) => MediaItem::video(read_media(&path).await?, Utc::now()),
                None => MediaItem::image(image_bytes.clone(), Utc::now()),
            };

            let outcome = pipeline.spot(&mut store, &image_bytes, media).await?;
            let verb = if outcome.merged { "Added capture to" } else { "Saved" };
            println!(
                "{verb} {} ({}) score {:.2}",
                outcome.plate,
                outcome.attributes.display_name().as_deref().unwrap_or("Unknown vehicle"),
                outcome.score
            );
            println!("{}", outcome.record_id);
        }
        Commands::Add {
            plate,
            image,
            video,
            no_lookup,
        } => {
            // Only `spot` calls the recognizer.
            let token = config.recognizer_token.clone().unwrap_or_default();
            let pipeline = build_pipeline(&config, token)?;

            let media = match (image, video) {
                (_, Some(path)) => MediaItem::video(read_media(&path).await?, Utc::now()),
                (Some(path), None) => MediaItem::image(read_media(&path).await?, Utc::now()),
                (None, None) => bail!("One of --image or --video is required"),
            };

            let id = pipeline.add_manual(&mut store, &plate, media, !no_lookup).await?;
            println!("{id}");
        }
        Commands::List {
            search,
            filter,
            json,
        } => {
            let summaries: Vec<RecordSummary> =
                filter_history(store.snapshot(), &search, filter.into(), Utc::now())
                    .into_iter()
                    .map(RecordSummary::from)
                    .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("No saved vehicles");
            } else {
                for summary in &summaries {
                    println!("{}", summary_line(summary));
                }
            }
        }
        Commands::Show { id } => {
            let record = store.get(id).with_context(|| format!("No vehicle with id {id}"))?;
            println!("{}", detail_text(record));
        }
        Commands::Edit { id, plate } => {
            let token = config.recognizer_token.clone().unwrap_or_default();
            let pipeline = build_pipeline(&config, token)?;
            pipeline.refresh_plate(&mut store, id, &plate).await?;
            let record = store.get(id).with_context(|| format!("No vehicle with id {id}"))?;
            println!("{}", detail_text(record));
        }
        Commands::Delete { id } => {
            if !store.delete(id) {
                bail!("No vehicle with id {id}");
            }
            println!("Deleted {id}");
        }
        Commands::Prune { id, index } => {
            let removed = store.remove_media(id, index)?;
            let kind = if removed.payload.is_video() { "video" } else { "image" };
            println!("Removed {kind} {index} from {id}");
        }
        Commands::Stats { json } => {
            let stats = CollectionStatistics::compute(store.snapshot(), Utc::now());
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats_text(&stats));
            }
        }
        Commands::Card { id, json } => {
            let record = store.get(id).with_context(|| format!("No vehicle with id {id}"))?;
            let card = ShareCard::for_record(record, &RegistrationDirectory::seeded());
            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                println!("{}", card.render_text());
            }
        }
    }

    Ok(())
}

fn open_store(config: &AppConfig) -> Result<Store> {
    let settings = SettingsStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;
    Ok(VehicleRecordStore::open(VehicleSnapshotStore::new(settings)))
}

fn build_pipeline(config: &AppConfig, token: String) -> Result<SpotPipeline> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let recognizer =
        PlateRecognizerClient::with_client(client.clone(), config.recognizer_url.clone(), token);
    let lookup = CarCheckClient::with_client(client, config.carcheck_base_url.clone());
    Ok(SpotPipeline::new(Arc::new(recognizer), Arc::new(lookup)))
}

async fn read_media(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
