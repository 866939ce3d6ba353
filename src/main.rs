use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use trash_scenes::app;
use trash_scenes::error::Result;
use trash_scenes::io::config::Config;

/// Procedural trash scene composer
#[derive(Parser, Debug)]
#[command(name = "trash-scenes")]
#[command(about = "TOML-driven synthetic trash scene generator")]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of camera poses to sample
    #[arg(short = 'n', long, value_name = "N")]
    num_views: Option<usize>,

    /// Enable mesh and material weathering
    #[arg(long)]
    weathering: bool,

    /// Pick a random world background
    #[arg(long)]
    background: bool,

    /// Build a furnished room and drop the trash on its floor
    #[arg(long)]
    room: bool,

    /// Seed for every random choice (drawn at random when omitted)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Output directory for scene.json
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file (or defaults) and applies command-line overrides.
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                Config::load(path)?
            }
            None => {
                info!("No config file given, using defaults");
                Config::default()
            }
        };

        if let Some(n) = self.num_views {
            config.camera.num_views = n;
        }
        if self.weathering {
            config.weathering.enabled = true;
        }
        if self.background {
            config.background.enabled = true;
        }
        if self.room {
            config.room.enabled = true;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(dir) = self.output {
            config.output.dir = dir;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let outcome = Cli::parse().into_config().and_then(|config| app::run(&config));
    match outcome {
        Ok(summary) => info!(
            "Done: {} object(s), {} camera pose(s), seed {} -> {}",
            summary.objects,
            summary.camera_poses,
            summary.seed,
            summary.manifest.display()
        ),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
