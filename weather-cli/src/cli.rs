use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType};
use weather_core::{Config, Coordinate, WeatherCoordinator};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather for where you are, or anywhere you point")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set location consent, positioning and timeouts.
    Configure,

    /// Use the current location.
    Here,

    /// Select a point, as if tapped on a map.
    #[command(allow_negative_numbers = true)]
    At {
        /// Latitude in decimal degrees, -90..90.
        latitude: f64,
        /// Longitude in decimal degrees, -180..180.
        longitude: f64,
    },

    /// Show weather for the last saved location.
    Show,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Here => {
                let coordinator = build_coordinator()?;
                coordinator.resolve_and_load(None).await?;
                report(&coordinator).await
            }
            Command::At { latitude, longitude } => {
                let coordinator = build_coordinator()?;
                coordinator.resolve_and_load(Some(Coordinate::new(latitude, longitude))).await?;
                report(&coordinator).await
            }
            Command::Show => {
                let coordinator = build_coordinator()?;
                coordinator.restore_from_persisted_coordinate().await;
                report(&coordinator).await
            }
        }
    }
}

fn build_coordinator() -> anyhow::Result<WeatherCoordinator> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");
    weather_core::coordinator_from_config(&config)
}

async fn report(coordinator: &WeatherCoordinator) -> anyhow::Result<()> {
    let state = coordinator.state();

    if state.error.is_some() {
        // Recomputed now; the user may have changed settings since.
        let remedy = coordinator.remedy().await;
        anyhow::bail!("{}", render::render_failure(&state, remedy));
    }

    print!("{}", render::render_state(&state));
    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.location.consent = Confirm::new("Allow looking up your position from your IP address?")
        .with_default(config.location.consent)
        .prompt()
        .context("Failed to read location consent")?;

    config.location.enabled = Confirm::new("Enable positioning?")
        .with_default(config.location.enabled)
        .prompt()
        .context("Failed to read positioning switch")?;

    config.timeouts.fetch_secs = CustomType::<u64>::new("Weather request timeout (seconds):")
        .with_default(config.timeouts.fetch_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()
        .context("Failed to read fetch timeout")?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
