use std::future::Future;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, Text};
use nearport_core::{Config, Coordinate, Orchestrator, ProviderId, ResolutionState, Strategy};
use tokio::sync::watch;
use tracing::debug;

use crate::render::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nearport", version, about = "Local weather and nearest airport")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "apininjas" or "openweather".
        provider: String,
    },

    /// Find where you are, the weather there and the nearest airport.
    Resolve {
        /// Airport lookup strategy: "direct" or "city".
        #[arg(long)]
        strategy: Option<String>,

        /// Weather provider to use instead of the configured default.
        #[arg(long)]
        provider: Option<String>,

        /// Use this latitude instead of automatic geolocation (requires --lon).
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Use this longitude instead of automatic geolocation (requires --lat).
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Never prompt; stop at the first settled state.
        #[arg(long)]
        no_interactive: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Resolve {
                strategy,
                provider,
                lat,
                lon,
                no_interactive,
            } => {
                let mut config = Config::load()?;
                apply_overrides(&mut config, strategy.as_deref(), provider.as_deref(), lat, lon)?;
                resolve(&config, !no_interactive).await
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key);
    config.save()?;

    println!("Saved credentials for {id} to {}", Config::config_file_path()?.display());
    if id != ProviderId::ApiNinjas && !config.is_provider_configured(ProviderId::ApiNinjas) {
        println!("Note: airport lookups also need `nearport configure apininjas`.");
    }
    Ok(())
}

fn apply_overrides(
    config: &mut Config,
    strategy: Option<&str>,
    provider: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> anyhow::Result<()> {
    if let Some(s) = strategy {
        config.strategy = Strategy::try_from(s)?;
    }
    if let Some(p) = provider {
        config.set_default_provider(ProviderId::try_from(p)?);
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            let at = Coordinate::new(lat, lon)
                .ok_or_else(|| anyhow!("Coordinate {lat}, {lon} is out of range"))?;
            debug!(location = %at, "Using fixed location");
            config.location = Some(at);
        }
        (None, None) => {}
        _ => bail!("--lat and --lon must be given together"),
    }

    Ok(())
}

async fn resolve(config: &Config, interactive: bool) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    debug!(strategy = %orchestrator.strategy(), interactive, "Resolving");
    let mut rx = orchestrator.subscribe();

    let mut state = drive(&mut rx, orchestrator.retry()).await;

    loop {
        match &state {
            ResolutionState::ManualCityRequired { .. } if interactive => {
                let city = Text::new("City:").prompt().context("Failed to read city")?;
                debug!(%city, "Submitting city");
                state = match drive(&mut rx, orchestrator.submit_city(&city)).await {
                    Ok(next) => next,
                    Err(_) => orchestrator.state(),
                };
            }
            ResolutionState::Failed { .. } if interactive => {
                if !Confirm::new("Try again?").with_default(true).prompt()? {
                    break;
                }
                debug!("Retrying after failure");
                state = drive(&mut rx, orchestrator.retry()).await;
            }
            ResolutionState::Ready { .. } if interactive => {
                if !Confirm::new("Refresh?").with_default(false).prompt()? {
                    break;
                }
                debug!("Refreshing");
                state = drive(&mut rx, orchestrator.retry()).await;
            }
            _ => break,
        }
    }

    match state {
        ResolutionState::Failed { error } => Err(error.into()),
        ResolutionState::ManualCityRequired { .. } => {
            Err(anyhow!("No city could be determined; run without --no-interactive to enter one"))
        }
        _ => Ok(()),
    }
}

/// Run a command while printing every state it publishes.
async fn drive<T>(
    rx: &mut watch::Receiver<ResolutionState>,
    command: impl Future<Output = T>,
) -> T {
    tokio::pin!(command);

    loop {
        tokio::select! {
            out = &mut command => {
                if rx.has_changed().unwrap_or(false) {
                    show(&rx.borrow_and_update());
                }
                return out;
            }
            Ok(()) = rx.changed() => show(&rx.borrow_and_update()),
        }
    }
}

fn show(state: &ResolutionState) {
    let text = render(state);
    if !text.is_empty() {
        println!("{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolve_with_negative_longitude() {
        let cli = Cli::try_parse_from([
            "nearport", "resolve", "--lat", "37.0", "--lon", "-122.0", "--strategy", "city",
        ])
        .unwrap();

        let Command::Resolve {
            lat,
            lon,
            strategy,
            no_interactive,
            ..
        } = cli.command
        else {
            panic!("expected resolve");
        };
        assert_eq!(lat, Some(37.0));
        assert_eq!(lon, Some(-122.0));
        assert_eq!(strategy.as_deref(), Some("city"));
        assert!(!no_interactive);
    }

    #[test]
    fn parses_no_interactive_flag() {
        let cli = Cli::try_parse_from(["nearport", "resolve", "--no-interactive"]).unwrap();
        let Command::Resolve { no_interactive, .. } = cli.command else {
            panic!("expected resolve");
        };
        assert!(no_interactive);

        assert!(Cli::try_parse_from(["nearport", "resolve", "--no-input"]).is_err());
    }

    #[test]
    fn overrides_apply_location_strategy_and_provider() {
        let mut config = Config::default();
        apply_overrides(&mut config, Some("city"), Some("openweather"), Some(37.0), Some(-122.0))
            .unwrap();

        assert_eq!(config.strategy, Strategy::CityMediated);
        assert_eq!(config.default_provider_id().unwrap(), ProviderId::OpenWeather);
        assert_eq!(config.location, Coordinate::new(37.0, -122.0));
    }

    #[test]
    fn half_a_coordinate_is_rejected() {
        let mut config = Config::default();
        let err = apply_overrides(&mut config, None, None, Some(37.0), None).unwrap_err();
        assert!(err.to_string().contains("--lat and --lon"));
    }

    #[test]
    fn out_of_range_coordinate_is_rejected() {
        let mut config = Config::default();
        let err = apply_overrides(&mut config, None, None, Some(137.0), Some(0.0)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn resolve_with_fixed_location_needs_credentials() {
        let mut config = Config::default();
        config.location = Coordinate::new(37.0, -122.0);

        let err = resolve(&config, false).await.unwrap_err();
        assert!(err.to_string().contains("No default provider configured"));
    }
}
