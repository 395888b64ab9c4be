use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use vibesy_core::{
    add_location::AddLocationFlow,
    gateways::device::{Accuracy, LocationServices},
    live::LiveLocationStream,
    map::MapRenderer,
    permission::PermissionGate,
    screen::{MapScreen, ScreenEvent},
    search::GeocodeSearchController,
    store::LocationStore,
    Notice,
};
use vibesy_boundary::UpdateProfile;
use vibesy_entities::{fix::LiveFix, geo::Coordinate, id::Id};
use vibesy_map::{BridgeError, WebViewBridge, WebViewMap};

use crate::{config::Config, device::StaticLocationServices, gateways};

const LIVE_FIX_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "vibesy", version, about = "Collect your favourite places on a map")]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Position of this device, e.g. `48.7755,9.1827`
    #[arg(long, global = true, value_name = "LAT,LNG", value_parser = parse_position)]
    pub position: Option<Coordinate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Look up an address
    Geocode { text: String },
    /// Manage saved locations
    #[command(subcommand)]
    Locations(LocationsCommand),
    /// Render the map with all saved locations as HTML
    MapHtml {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Show or update the profile of the signed in user
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LocationsCommand {
    /// List all saved locations
    List,
    /// Save a new location
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Geocode this address to find the position
        #[arg(long)]
        address: Option<String>,
        /// Index of the geocoding result to use
        #[arg(long, default_value_t = 0)]
        pick: usize,
    },
    /// Delete a saved location
    Delete { id: String },
}

fn parse_position(s: &str) -> Result<Coordinate, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| "Expected LAT,LNG".to_string())?;
    Coordinate::parse_lat_lng_deg(lat.trim(), lng.trim()).map_err(|err| err.to_string())
}

pub async fn run() -> Result<()> {
    let Cli {
        config,
        position,
        command,
    } = Cli::parse();
    let cfg = Config::try_load_from_file_or_default(config)?;
    let services = Arc::new(StaticLocationServices::new(position));
    match command {
        Command::Geocode { text } => geocode(&cfg, &text).await,
        Command::Locations(LocationsCommand::List) => list_locations(&cfg).await,
        Command::Locations(LocationsCommand::Add {
            name,
            description,
            address,
            pick,
        }) => {
            let draft = Draft {
                name,
                description,
                address,
                pick,
            };
            add_location(&cfg, services, draft).await
        }
        Command::Locations(LocationsCommand::Delete { id }) => {
            delete_location(&cfg, &Id::from(id)).await
        }
        Command::MapHtml { output } => map_html(&cfg, services, output).await,
        Command::Profile {
            name,
            bio,
            avatar_url,
        } => {
            let update = UpdateProfile {
                name,
                bio,
                avatar_url,
            };
            profile(&cfg, update).await
        }
    }
}

async fn geocode(cfg: &Config, text: &str) -> Result<()> {
    let mut search = GeocodeSearchController::new(
        gateways::geocoding_gateway(&cfg.geocoding)?,
        cfg.geocoding.debounce,
    );
    search.search(text);
    let state = search.settled().await;
    if let Some(notice) = state.notice {
        return Err(anyhow!("{notice}"));
    }
    if state.candidates.is_empty() {
        println!("Nothing found for '{text}'");
    }
    for (index, candidate) in state.candidates.iter().enumerate() {
        println!("{index}: {} ({})", candidate.display_name, candidate.pos);
    }
    Ok(())
}

async fn list_locations(cfg: &Config) -> Result<()> {
    let store = LocationStore::new(gateways::location_api(&cfg.api));
    let locations = store.refresh(cfg.api.token()?).await?;
    for location in locations.iter() {
        print!(
            "{}\t{}\t{}",
            location.id,
            location.name,
            position_label(location.pos)
        );
        if let Some(address) = &location.address {
            print!("\t{address}");
        }
        println!();
    }
    Ok(())
}

/// Locations saved without a known position are not placed at `0,0`.
fn position_label(pos: Coordinate) -> String {
    if pos.is_unknown() {
        "unknown position".to_string()
    } else {
        pos.to_string()
    }
}

struct Draft {
    name: String,
    description: Option<String>,
    address: Option<String>,
    pick: usize,
}

async fn add_location(
    cfg: &Config,
    services: Arc<StaticLocationServices>,
    draft: Draft,
) -> Result<()> {
    let token = cfg.api.token()?;
    let store = LocationStore::new(gateways::location_api(&cfg.api));
    let Draft {
        name,
        description,
        address,
        pick,
    } = draft;

    let mut flow = AddLocationFlow::new(cfg.locations.unknown_coordinate);
    flow.open();
    flow.set_name(name)?;
    if let Some(description) = description {
        flow.set_description(description)?;
    }
    if let Some(address) = address {
        flow.set_address(address.as_str())?;
        let mut search = GeocodeSearchController::new(
            gateways::geocoding_gateway(&cfg.geocoding)?,
            cfg.geocoding.debounce,
        );
        search.search(&address);
        if let Some(notice) = search.settled().await.notice {
            log::warn!("{notice}");
        }
        match search.select(pick) {
            Some(candidate) => {
                log::info!("Use geocoding result '{}'", candidate.display_name);
                flow.select_candidate(candidate)?;
            }
            None => log::warn!("No geocoding result #{pick} for '{address}'"),
        }
    }
    let live = current_fix(services).await;
    let saved = flow.submit(&store, token, live.as_ref()).await?;
    println!("Saved '{}' at {} with ID {}", saved.name, saved.pos, saved.id);
    Ok(())
}

async fn current_fix(services: Arc<StaticLocationServices>) -> Option<LiveFix> {
    let gate = PermissionGate::new(services.clone());
    if let Err(err) = gate.request_foreground_access().await {
        log::info!("{}", Notice::LocationUnavailable(err));
        return None;
    }
    services
        .current_position(Accuracy::High)
        .await
        .map_err(|err| log::warn!("Unable to get the current position: {err}"))
        .ok()
}

async fn delete_location(cfg: &Config, id: &Id) -> Result<()> {
    let store = LocationStore::new(gateways::location_api(&cfg.api));
    store.delete(cfg.api.token()?, id).await?;
    println!("Deleted location {id}");
    Ok(())
}

async fn profile(cfg: &Config, update: UpdateProfile) -> Result<()> {
    let api = gateways::http_api(&cfg.api);
    let token = cfg.api.token()?;
    let unchanged = update.name.is_none() && update.bio.is_none() && update.avatar_url.is_none();
    let profile = if unchanged {
        api.profile(token).await?
    } else {
        let profile = api.update_profile(token, &update).await?;
        log::info!("Updated profile of {}", profile.email);
        profile
    };
    println!("{} <{}>", profile.name.as_deref().unwrap_or("-"), profile.email);
    if let Some(bio) = &profile.bio {
        println!("{bio}");
    }
    if let Some(url) = &profile.avatar_url {
        println!("{url}");
    }
    Ok(())
}

/// Keeps the most recent document instead of showing it.
#[derive(Debug, Default, Clone)]
struct HtmlExport {
    html: Arc<Mutex<String>>,
}

impl WebViewBridge for HtmlExport {
    fn load_html(&mut self, html: &str) -> Result<(), BridgeError> {
        let mut current = self
            .html
            .lock()
            .map_err(|_| BridgeError::Failed("poisoned".to_string()))?;
        *current = html.to_string();
        Ok(())
    }

    fn inject_javascript(&mut self, _: &str) -> Result<(), BridgeError> {
        Err(BridgeError::NotReady)
    }

    fn supports_scripts(&self) -> bool {
        false
    }
}

async fn map_html(
    cfg: &Config,
    services: Arc<StaticLocationServices>,
    output: Option<PathBuf>,
) -> Result<()> {
    let export = HtmlExport::default();
    let renderer = MapRenderer::new(cfg.map.clone(), Box::new(WebViewMap::new(export.clone())))?;
    let mut screen = MapScreen::new(
        cfg.api.token()?.clone(),
        LocationStore::new(gateways::location_api(&cfg.api)),
        renderer,
        GeocodeSearchController::new(
            gateways::geocoding_gateway(&cfg.geocoding)?,
            cfg.geocoding.debounce,
        ),
        AddLocationFlow::new(cfg.locations.unknown_coordinate),
    );
    let stream = LiveLocationStream::new(PermissionGate::new(services), cfg.live_location);
    screen.mount(stream).await;

    let settle = async {
        while let Some(event) = screen.next_event().await {
            match event {
                ScreenEvent::LiveFix(_) => break,
                ScreenEvent::Notice(notice) => {
                    log::warn!("{notice}");
                    if matches!(notice, Notice::LocationUnavailable(_)) {
                        break;
                    }
                }
                event => log::debug!("{event:?}"),
            }
        }
    };
    if tokio::time::timeout(LIVE_FIX_TIMEOUT, settle).await.is_err() {
        log::warn!("No position received within {LIVE_FIX_TIMEOUT:?}");
    }
    screen.unmount().await;

    let html = export
        .html
        .lock()
        .map_err(|_| anyhow!("Unable to access the map document"))?
        .clone();
    match output {
        Some(path) => {
            fs::write(&path, html)?;
            log::info!("Wrote map to {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_the_command_line_interface() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_positions() {
        assert_eq!(
            parse_position("48.7755, 9.1827"),
            Ok(Coordinate::from_lat_lng_deg(48.7755, 9.1827))
        );
        assert!(parse_position("48.7755").is_err());
        assert!(parse_position("148.0,9.0").is_err());
    }

    #[test]
    fn label_unknown_positions() {
        assert_eq!(position_label(Coordinate::UNKNOWN), "unknown position");
        assert_eq!(
            position_label(Coordinate::from_lat_lng_deg(48.5, 9.25)),
            "48.5,9.25"
        );
    }

    #[test]
    fn parse_subcommands() {
        let cli = Cli::try_parse_from([
            "vibesy",
            "locations",
            "add",
            "--name",
            "Googleplex",
            "--address",
            "1600 Amphitheatre",
            "--pick",
            "1",
            "--position",
            "37.42,-122.08",
        ])
        .unwrap();
        assert!(cli.position.is_some());
        let Command::Locations(LocationsCommand::Add { name, pick, .. }) = cli.command else {
            panic!("unexpected command");
        };
        assert_eq!(name, "Googleplex");
        assert_eq!(pick, 1);
    }

    #[test]
    fn parse_profile_updates() {
        let cli = Cli::try_parse_from(["vibesy", "profile", "--avatar-url", "https://x.y/a.png"])
            .unwrap();
        let Command::Profile {
            name, avatar_url, ..
        } = cli.command
        else {
            panic!("unexpected command");
        };
        assert!(name.is_none());
        assert_eq!(avatar_url.as_deref(), Some("https://x.y/a.png"));
    }
}
