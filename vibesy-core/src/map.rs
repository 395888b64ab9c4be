use thiserror::Error;
use tokio::sync::mpsc;
use vibesy_entities::{
    fix::LiveFix,
    geo::Coordinate,
    id::Id,
    location::SavedLocation,
    view::MapViewState,
};

pub const TILE_LAYER_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const MAP_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

pub const DEFAULT_CENTER: (f64, f64) = (37.78825, -122.4324);
pub const DEFAULT_ZOOM: u8 = 13;

pub const CURRENT_LOCATION_COLOR: &str = "#2563EB";
pub const SAVED_LOCATION_COLOR: &str = "#DC2626";

pub const CURRENT_LOCATION_TITLE: &str = "You are here";

/// Immutable settings of a map view.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub tile_url: String,
    pub attribution: String,
    pub initial_view: MapViewState,
    pub current_location_color: String,
    pub saved_location_color: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        let (lat, lng) = DEFAULT_CENTER;
        Self {
            tile_url: TILE_LAYER_URL.to_string(),
            attribution: MAP_ATTRIBUTION.to_string(),
            initial_view: MapViewState::new(Coordinate::from_lat_lng_deg(lat, lng), DEFAULT_ZOOM),
            current_location_color: CURRENT_LOCATION_COLOR.to_string(),
            saved_location_color: SAVED_LOCATION_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKey {
    CurrentLocation,
    Saved(Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    CurrentLocation,
    SavedLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub key: MarkerKey,
    pub pos: Coordinate,
    pub title: String,
    pub description: Option<String>,
    pub color: String,
}

impl Marker {
    pub const fn role(&self) -> MarkerRole {
        match self.key {
            MarkerKey::CurrentLocation => MarkerRole::CurrentLocation,
            MarkerKey::Saved(_) => MarkerRole::SavedLocation,
        }
    }
}

/// Backend agnostic user interaction with the map.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    MarkerSelected(Id),
    RecenterRequested,
    AddLocationRequested,
    /// The user moved or zoomed the map.
    ViewportChanged(MapViewState),
}

pub type MapEventSink = mpsc::UnboundedSender<MapEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Map backend failed: {0}")]
pub struct BackendError(pub String);

/// A concrete map implementation.
pub trait MapBackend: Send {
    /// Called once before anything is drawn.
    fn attach(&mut self, config: &MapConfig, events: MapEventSink);
    /// Replace all markers on the map.
    fn render_markers(&mut self, markers: &[Marker]) -> Result<(), BackendError>;
    fn set_viewport(&mut self, view: &MapViewState) -> Result<(), BackendError>;
}

/// Draws saved locations and the live position on a [`MapBackend`].
pub struct MapRenderer {
    config: MapConfig,
    backend: Box<dyn MapBackend>,
    events: mpsc::UnboundedReceiver<MapEvent>,
    markers: Vec<Marker>,
    viewport: MapViewState,
}

impl MapRenderer {
    pub fn new(config: MapConfig, mut backend: Box<dyn MapBackend>) -> Result<Self, BackendError> {
        let (tx, events) = mpsc::unbounded_channel();
        backend.attach(&config, tx);
        let viewport = config.initial_view;
        backend.set_viewport(&viewport)?;
        Ok(Self {
            config,
            backend,
            events,
            markers: Vec::new(),
            viewport,
        })
    }

    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub const fn viewport(&self) -> &MapViewState {
        &self.viewport
    }

    /// Redraw the markers if they changed.
    ///
    /// Returns `true` if the backend was updated.
    pub fn render(
        &mut self,
        saved: &[SavedLocation],
        live: Option<&LiveFix>,
    ) -> Result<bool, BackendError> {
        let markers = markers_for(&self.config, saved, live);
        if markers == self.markers {
            return Ok(false);
        }
        log::debug!("Render {} markers", markers.len());
        self.backend.render_markers(&markers)?;
        self.markers = markers;
        Ok(true)
    }

    pub fn set_viewport(&mut self, view: MapViewState) -> Result<(), BackendError> {
        if view == self.viewport {
            return Ok(());
        }
        self.backend.set_viewport(&view)?;
        self.viewport = view;
        Ok(())
    }

    /// Move the map to the live position, keeping the zoom level.
    ///
    /// Without a fix nothing happens and `false` is returned.
    pub fn recenter(&mut self, live: Option<&LiveFix>) -> Result<bool, BackendError> {
        let Some(fix) = live else {
            log::debug!("No live position to center on");
            return Ok(false);
        };
        self.set_viewport(self.viewport.with_center(fix.pos))?;
        Ok(true)
    }

    /// Wait for the next interaction.
    ///
    /// Returns `None` if the backend is gone.
    pub async fn next_event(&mut self) -> Option<MapEvent> {
        let event = self.events.recv().await?;
        self.apply(&event);
        Some(event)
    }

    pub fn try_next_event(&mut self) -> Option<MapEvent> {
        let event = self.events.try_recv().ok()?;
        self.apply(&event);
        Some(event)
    }

    fn apply(&mut self, event: &MapEvent) {
        if let MapEvent::ViewportChanged(view) = event {
            // The backend already shows this view.
            self.viewport = *view;
        }
    }
}

impl std::fmt::Debug for MapRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MapRenderer")
            .field("config", &self.config)
            .field("markers", &self.markers)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

/// Saved locations first, the live position is drawn on top.
pub fn markers_for(
    config: &MapConfig,
    saved: &[SavedLocation],
    live: Option<&LiveFix>,
) -> Vec<Marker> {
    saved
        .iter()
        .map(|l| Marker {
            key: MarkerKey::Saved(l.id.clone()),
            pos: l.pos,
            title: l.name.clone(),
            description: l.description.clone(),
            color: config.saved_location_color.clone(),
        })
        .chain(live.map(|fix| Marker {
            key: MarkerKey::CurrentLocation,
            pos: fix.pos,
            title: CURRENT_LOCATION_TITLE.to_string(),
            description: None,
            color: config.current_location_color.clone(),
        }))
        .collect()
}
