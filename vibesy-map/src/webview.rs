use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use askama::Template;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vibesy_core::map::{
    BackendError, MapBackend, MapConfig, MapEvent, MapEventSink, Marker, MarkerKey, MarkerRole,
};
use vibesy_entities::{
    geo::{Coordinate, CoordinateError},
    view::{MapViewState, MAX_ZOOM},
};

/// Host side of an embedded browser.
pub trait WebViewBridge: Send {
    /// Replace the whole document.
    fn load_html(&mut self, html: &str) -> Result<(), BridgeError>;
    fn inject_javascript(&mut self, script: &str) -> Result<(), BridgeError>;
    /// Without a running script context every change reloads the document.
    fn supports_scripts(&self) -> bool {
        true
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("The web view is not ready")]
    NotReady,
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Template(#[from] askama::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<BridgeError> for BackendError {
    fn from(err: BridgeError) -> Self {
        Self(err.to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentState<'a> {
    tile_url: &'a str,
    attribution: &'a str,
    center: [f64; 2],
    zoom: u8,
    markers: Vec<JsMarker<'a>>,
}

#[derive(Serialize)]
struct JsMarker<'a> {
    id: Option<&'a str>,
    lat: f64,
    lng: f64,
    title: &'a str,
    description: Option<&'a str>,
    color: &'a str,
    current: bool,
}

impl<'a> From<&'a Marker> for JsMarker<'a> {
    fn from(marker: &'a Marker) -> Self {
        let id = match &marker.key {
            MarkerKey::Saved(id) => Some(id.as_str()),
            MarkerKey::CurrentLocation => None,
        };
        Self {
            id,
            lat: marker.pos.lat(),
            lng: marker.pos.lng(),
            title: &marker.title,
            description: marker.description.as_deref(),
            color: &marker.color,
            current: marker.role() == MarkerRole::CurrentLocation,
        }
    }
}

#[derive(Template)]
#[template(path = "leaflet_map.html")]
struct LeafletMapTemplate {
    state_json: String,
}

/// JSON that can be placed inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

/// Message posted by the document via `postMessage`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum BridgeMessage {
    MarkerSelected { id: String },
    MoveEnd { lat: f64, lng: f64, zoom: f64 },
    Locate,
    AddLocation,
}

#[derive(Debug, Error)]
enum MessageError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Position(#[from] CoordinateError),
    #[error("Invalid zoom level {0}")]
    Zoom(f64),
}

// Leaflet reports longitudes beyond ±180° after panning across the antimeridian.
fn wrap_lng(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn zoom_level(zoom: f64) -> Result<u8, MessageError> {
    if !zoom.is_finite() {
        return Err(MessageError::Zoom(zoom));
    }
    Ok(zoom.round().clamp(0.0, f64::from(MAX_ZOOM)) as u8)
}

fn parse_message(raw: &str) -> Result<MapEvent, MessageError> {
    let event = match serde_json::from_str(raw)? {
        BridgeMessage::MarkerSelected { id } => MapEvent::MarkerSelected(id.into()),
        BridgeMessage::MoveEnd { lat, lng, zoom } => {
            let center = Coordinate::try_from_lat_lng_deg(lat, wrap_lng(lng))?;
            MapEvent::ViewportChanged(MapViewState::new(center, zoom_level(zoom)?))
        }
        BridgeMessage::Locate => MapEvent::RecenterRequested,
        BridgeMessage::AddLocation => MapEvent::AddLocationRequested,
    };
    Ok(event)
}

/// Cloneable handle for messages posted by the map document.
#[derive(Debug, Clone, Default)]
pub struct BridgeInbox {
    events: Arc<Mutex<Option<MapEventSink>>>,
}

impl BridgeInbox {
    fn events(&self) -> MutexGuard<'_, Option<MapEventSink>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Malformed messages are logged and dropped.
    pub fn handle_message(&self, raw: &str) {
        let event = match parse_message(raw) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("Ignore map message {raw:?}: {err}");
                return;
            }
        };
        let events = self.events();
        let Some(events) = events.as_ref() else {
            log::warn!("Map is not attached: drop {event:?}");
            return;
        };
        if events.send(event).is_err() {
            log::debug!("Map renderer is gone");
        }
    }
}

/// [`MapBackend`] that runs a Leaflet document inside a web view.
///
/// The document is loaded once. All later changes are applied by
/// injecting scripts into the running page.
#[derive(Debug)]
pub struct WebViewMap<B> {
    bridge: B,
    config: Option<MapConfig>,
    view: Option<MapViewState>,
    markers: Vec<Marker>,
    loaded: bool,
    inbox: BridgeInbox,
}

impl<B> WebViewMap<B>
where
    B: WebViewBridge,
{
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            config: None,
            view: None,
            markers: Vec::new(),
            loaded: false,
            inbox: BridgeInbox::default(),
        }
    }

    pub const fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn inbox(&self) -> BridgeInbox {
        self.inbox.clone()
    }

    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Render the complete document for the current view and markers.
    pub fn document(&self) -> Result<String, BridgeError> {
        let config = self.config.as_ref().ok_or(BridgeError::NotReady)?;
        let view = self.view.unwrap_or(config.initial_view);
        let state = DocumentState {
            tile_url: &config.tile_url,
            attribution: &config.attribution,
            center: [view.center.lat(), view.center.lng()],
            zoom: view.zoom,
            markers: self.markers.iter().map(JsMarker::from).collect(),
        };
        let template = LeafletMapTemplate {
            state_json: script_json(&state)?,
        };
        Ok(template.render()?)
    }

    /// Load the document again, e.g. after the web view has been recreated.
    pub fn reload(&mut self) -> Result<(), BridgeError> {
        self.loaded = false;
        self.load()
    }

    fn load(&mut self) -> Result<(), BridgeError> {
        let html = self.document()?;
        log::debug!("Load map document with {} markers", self.markers.len());
        self.bridge.load_html(&html)?;
        self.loaded = true;
        Ok(())
    }
}

impl<B> MapBackend for WebViewMap<B>
where
    B: WebViewBridge,
{
    fn attach(&mut self, config: &MapConfig, events: MapEventSink) {
        self.config = Some(config.clone());
        self.loaded = false;
        *self.inbox.events() = Some(events);
    }

    fn render_markers(&mut self, markers: &[Marker]) -> Result<(), BackendError> {
        self.markers = markers.to_vec();
        if !self.loaded || !self.bridge.supports_scripts() {
            return Ok(self.load()?);
        }
        let markers: Vec<_> = self.markers.iter().map(JsMarker::from).collect();
        let script = format!(
            "window.vibesy.renderMarkers({});",
            script_json(&markers).map_err(BridgeError::from)?
        );
        Ok(self.bridge.inject_javascript(&script)?)
    }

    fn set_viewport(&mut self, view: &MapViewState) -> Result<(), BackendError> {
        self.view = Some(*view);
        if !self.loaded || !self.bridge.supports_scripts() {
            return Ok(self.load()?);
        }
        let script = format!(
            "window.vibesy.setView({}, {}, {});",
            view.center.lat(),
            view.center.lng(),
            view.zoom
        );
        Ok(self.bridge.inject_javascript(&script)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use vibesy_core::map::MapRenderer;
    use vibesy_entities::{builders::*, fix::LiveFix, location::SavedLocation};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Inject(String),
    }

    #[derive(Debug, Default, Clone)]
    struct RecordingBridge {
        calls: Arc<Mutex<Vec<Call>>>,
        fail: Arc<AtomicBool>,
    }

    impl RecordingBridge {
        fn calls(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
        fn check(&self) -> Result<(), BridgeError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BridgeError::Failed("web view crashed".into()));
            }
            Ok(())
        }
    }

    impl WebViewBridge for RecordingBridge {
        fn load_html(&mut self, html: &str) -> Result<(), BridgeError> {
            self.check()?;
            self.calls.lock().unwrap().push(Call::Load(html.to_string()));
            Ok(())
        }
        fn inject_javascript(&mut self, script: &str) -> Result<(), BridgeError> {
            self.check()?;
            self.calls
                .lock()
                .unwrap()
                .push(Call::Inject(script.to_string()));
            Ok(())
        }
    }

    fn cafe() -> SavedLocation {
        SavedLocation::build()
            .id("1")
            .name("Cool Cafe")
            .description("A trendy cafe")
            .lat_lng(37.78825, -122.4324)
            .finish()
    }

    #[test]
    fn load_the_document_once() {
        let bridge = RecordingBridge::default();
        let mut renderer =
            MapRenderer::new(MapConfig::default(), Box::new(WebViewMap::new(bridge.clone())))
                .unwrap();
        let calls = bridge.calls();
        assert_eq!(calls.len(), 1);
        let Call::Load(html) = &calls[0] else {
            panic!("unexpected call {:?}", calls[0]);
        };
        assert!(html.contains("leaflet@1.9.4"));
        assert!(html.contains("\"center\":[37.78825,-122.4324],\"zoom\":13"));

        let live = LiveFix::build().lat_lng(37.7749, -122.4194).finish();
        renderer.render(&[cafe()], Some(&live)).unwrap();
        let calls = bridge.calls();
        assert_eq!(calls.len(), 1);
        let Call::Inject(script) = &calls[0] else {
            panic!("unexpected call {:?}", calls[0]);
        };
        assert!(script.starts_with("window.vibesy.renderMarkers(["));
        assert!(script.contains("\"id\":\"1\""));
        assert!(script.contains("\"title\":\"Cool Cafe\""));
        assert!(script.contains("\"title\":\"You are here\""));

        let center = Coordinate::from_lat_lng_deg(48.7755, 9.1827);
        renderer
            .set_viewport(MapViewState::new(center, 11))
            .unwrap();
        assert_eq!(
            bridge.calls(),
            vec![Call::Inject(
                "window.vibesy.setView(48.7755, 9.1827, 11);".to_string()
            )]
        );
    }

    #[test]
    fn escape_markup_in_location_names() {
        let mut map = WebViewMap::new(RecordingBridge::default());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        map.attach(&MapConfig::default(), tx);
        let evil = SavedLocation::build()
            .id("2")
            .name("</script><script>alert('pwned')</script>")
            .lat_lng(1.0, 2.0)
            .finish();
        map.render_markers(&vibesy_core::map::markers_for(
            &MapConfig::default(),
            &[evil],
            None,
        ))
        .unwrap();
        let html = map.document().unwrap();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("\\u003c/script\\u003e\\u003cscript\\u003ealert"));
    }

    #[test]
    fn reload_after_a_failed_load() {
        let bridge = RecordingBridge::default();
        let mut map = WebViewMap::new(bridge.clone());
        assert!(matches!(map.document(), Err(BridgeError::NotReady)));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        map.attach(&MapConfig::default(), tx);

        bridge.fail.store(true, Ordering::SeqCst);
        assert!(map.set_viewport(&MapConfig::default().initial_view).is_err());
        assert!(!map.is_loaded());

        bridge.fail.store(false, Ordering::SeqCst);
        map.render_markers(&[]).unwrap();
        assert!(map.is_loaded());
        assert!(matches!(bridge.calls().as_slice(), [Call::Load(_)]));
    }

    #[derive(Debug, Default)]
    struct Snapshot {
        html: Option<String>,
    }

    impl WebViewBridge for Snapshot {
        fn load_html(&mut self, html: &str) -> Result<(), BridgeError> {
            self.html = Some(html.to_string());
            Ok(())
        }
        fn inject_javascript(&mut self, _: &str) -> Result<(), BridgeError> {
            unreachable!()
        }
        fn supports_scripts(&self) -> bool {
            false
        }
    }

    #[test]
    fn reload_static_documents() {
        let mut map = WebViewMap::new(Snapshot::default());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        map.attach(&MapConfig::default(), tx);
        map.set_viewport(&MapConfig::default().initial_view).unwrap();
        assert!(!map.bridge().html.as_ref().unwrap().contains("Cool Cafe"));
        map.render_markers(&vibesy_core::map::markers_for(
            &MapConfig::default(),
            &[cafe()],
            None,
        ))
        .unwrap();
        assert!(map.bridge().html.as_ref().unwrap().contains("Cool Cafe"));
    }

    #[test]
    fn parse_messages_of_the_document() {
        assert_eq!(
            parse_message(r#"{"type":"markerSelected","id":"42"}"#).unwrap(),
            MapEvent::MarkerSelected("42".into())
        );
        assert_eq!(
            parse_message(r#"{"type":"locate"}"#).unwrap(),
            MapEvent::RecenterRequested
        );
        assert_eq!(
            parse_message(r#"{"type":"addLocation"}"#).unwrap(),
            MapEvent::AddLocationRequested
        );
        assert_eq!(
            parse_message(r#"{"type":"moveEnd","lat":48.0,"lng":190.0,"zoom":12.6}"#).unwrap(),
            MapEvent::ViewportChanged(MapViewState::new(
                Coordinate::from_lat_lng_deg(48.0, -170.0),
                13
            ))
        );
        assert_eq!(
            parse_message(r#"{"type":"moveEnd","lat":0.0,"lng":0.0,"zoom":25}"#).unwrap(),
            MapEvent::ViewportChanged(MapViewState::new(Coordinate::from_lat_lng_deg(0.0, 0.0), 19))
        );
        assert!(parse_message(r#"{"type":"moveEnd","lat":95.0,"lng":0.0,"zoom":3}"#).is_err());
        assert!(parse_message(r#"{"type":"explode"}"#).is_err());
        assert!(parse_message("{").is_err());
    }

    #[tokio::test]
    async fn forward_messages_to_the_renderer() {
        let map = WebViewMap::new(RecordingBridge::default());
        let inbox = map.inbox();
        // Not attached yet
        inbox.handle_message(r#"{"type":"locate"}"#);

        let mut renderer = MapRenderer::new(MapConfig::default(), Box::new(map)).unwrap();
        assert!(renderer.try_next_event().is_none());

        inbox.handle_message("not json");
        inbox.handle_message(r#"{"type":"markerSelected","id":"1"}"#);
        assert_eq!(
            renderer.next_event().await,
            Some(MapEvent::MarkerSelected("1".into()))
        );
    }
}
