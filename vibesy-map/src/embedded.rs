use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use vibesy_core::map::{
    BackendError, MapBackend, MapConfig, MapEvent, MapEventSink, Marker, MarkerKey,
};
use vibesy_entities::{geo::Coordinate, view::MapViewState};

/// Handle of a marker placed on a [`MapWidget`].
pub type WidgetMarkerId = u64;

/// A retained mode map control, e.g. a native map view.
pub trait MapWidget: Send {
    fn set_tile_layer(&mut self, url: &str, attribution: &str);
    fn add_marker(&mut self, marker: &Marker) -> Result<WidgetMarkerId, BackendError>;
    fn update_marker(&mut self, id: WidgetMarkerId, marker: &Marker) -> Result<(), BackendError>;
    fn remove_marker(&mut self, id: WidgetMarkerId);
    fn set_view(&mut self, center: Coordinate, zoom: u8) -> Result<(), BackendError>;
}

/// Native interaction reported by a [`MapWidget`].
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    MarkerClicked(WidgetMarkerId),
    MoveEnd { center: Coordinate, zoom: u8 },
    LocateClicked,
    AddClicked,
}

#[derive(Debug)]
struct Placed {
    id: WidgetMarkerId,
    marker: Marker,
}

#[derive(Debug, Default)]
struct Routing {
    keys: HashMap<WidgetMarkerId, MarkerKey>,
    events: Option<MapEventSink>,
}

/// Cloneable handle for feeding [`WidgetEvent`]s back to the renderer.
#[derive(Debug, Clone, Default)]
pub struct WidgetEvents {
    routing: Arc<Mutex<Routing>>,
}

impl WidgetEvents {
    fn routing(&self) -> MutexGuard<'_, Routing> {
        self.routing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forward an interaction of the widget to the renderer.
    pub fn dispatch(&self, event: WidgetEvent) {
        let routing = self.routing();
        let Some(event) = translate(&routing.keys, event) else {
            return;
        };
        let Some(events) = &routing.events else {
            log::warn!("Map is not attached: drop {event:?}");
            return;
        };
        if events.send(event).is_err() {
            log::debug!("Map renderer is gone");
        }
    }
}

fn translate(keys: &HashMap<WidgetMarkerId, MarkerKey>, event: WidgetEvent) -> Option<MapEvent> {
    match event {
        WidgetEvent::MarkerClicked(id) => match keys.get(&id)? {
            MarkerKey::Saved(id) => Some(MapEvent::MarkerSelected(id.clone())),
            // The widget shows the popup by itself.
            MarkerKey::CurrentLocation => None,
        },
        WidgetEvent::MoveEnd { center, zoom } => {
            Some(MapEvent::ViewportChanged(MapViewState::new(center, zoom)))
        }
        WidgetEvent::LocateClicked => Some(MapEvent::RecenterRequested),
        WidgetEvent::AddClicked => Some(MapEvent::AddLocationRequested),
    }
}

/// [`MapBackend`] that keeps the markers of a [`MapWidget`] in sync.
#[derive(Debug)]
pub struct EmbeddedMap<W> {
    widget: W,
    placed: HashMap<MarkerKey, Placed>,
    events: WidgetEvents,
}

impl<W> EmbeddedMap<W>
where
    W: MapWidget,
{
    pub fn new(widget: W) -> Self {
        Self {
            widget,
            placed: HashMap::new(),
            events: WidgetEvents::default(),
        }
    }

    pub const fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    /// The handle stays valid after the map has been moved into a renderer.
    pub fn events(&self) -> WidgetEvents {
        self.events.clone()
    }
}

impl<W> MapBackend for EmbeddedMap<W>
where
    W: MapWidget,
{
    fn attach(&mut self, config: &MapConfig, events: MapEventSink) {
        self.widget
            .set_tile_layer(&config.tile_url, &config.attribution);
        self.events.routing().events = Some(events);
    }

    fn render_markers(&mut self, markers: &[Marker]) -> Result<(), BackendError> {
        let obsolete: Vec<_> = self
            .placed
            .keys()
            .filter(|key| !markers.iter().any(|m| &m.key == *key))
            .cloned()
            .collect();
        for key in obsolete {
            if let Some(placed) = self.placed.remove(&key) {
                self.widget.remove_marker(placed.id);
                self.events.routing().keys.remove(&placed.id);
            }
        }
        for marker in markers {
            match self.placed.get_mut(&marker.key) {
                Some(placed) if placed.marker == *marker => {}
                Some(placed) => {
                    self.widget.update_marker(placed.id, marker)?;
                    placed.marker = marker.clone();
                }
                None => {
                    let id = self.widget.add_marker(marker)?;
                    self.events.routing().keys.insert(id, marker.key.clone());
                    self.placed.insert(
                        marker.key.clone(),
                        Placed {
                            id,
                            marker: marker.clone(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn set_viewport(&mut self, view: &MapViewState) -> Result<(), BackendError> {
        self.widget.set_view(view.center, view.zoom)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use vibesy_core::map::{markers_for, MapRenderer};
    use vibesy_entities::{builders::*, fix::LiveFix, location::SavedLocation};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Add(WidgetMarkerId, MarkerKey),
        Update(WidgetMarkerId),
        Remove(WidgetMarkerId),
        View(Coordinate, u8),
    }

    #[derive(Debug, Default, Clone)]
    struct FakeWidget {
        ops: Arc<Mutex<Vec<Op>>>,
        next_id: Arc<AtomicU64>,
        tile_url: Arc<Mutex<Option<String>>>,
    }

    impl FakeWidget {
        fn ops(&self) -> Vec<Op> {
            std::mem::take(&mut *self.ops.lock().unwrap())
        }
    }

    impl MapWidget for FakeWidget {
        fn set_tile_layer(&mut self, url: &str, _: &str) {
            *self.tile_url.lock().unwrap() = Some(url.to_string());
        }
        fn add_marker(&mut self, marker: &Marker) -> Result<WidgetMarkerId, BackendError> {
            let id = 100 + self.next_id.fetch_add(1, Ordering::SeqCst);
            self.ops.lock().unwrap().push(Op::Add(id, marker.key.clone()));
            Ok(id)
        }
        fn update_marker(&mut self, id: WidgetMarkerId, _: &Marker) -> Result<(), BackendError> {
            self.ops.lock().unwrap().push(Op::Update(id));
            Ok(())
        }
        fn remove_marker(&mut self, id: WidgetMarkerId) {
            self.ops.lock().unwrap().push(Op::Remove(id));
        }
        fn set_view(&mut self, center: Coordinate, zoom: u8) -> Result<(), BackendError> {
            self.ops.lock().unwrap().push(Op::View(center, zoom));
            Ok(())
        }
    }

    fn cafe() -> SavedLocation {
        SavedLocation::build()
            .id("1")
            .name("Cool Cafe")
            .lat_lng(37.78825, -122.4324)
            .finish()
    }

    fn restaurant() -> SavedLocation {
        SavedLocation::build()
            .id("2")
            .name("Amazing Restaurant")
            .lat_lng(37.78525, -122.4354)
            .finish()
    }

    fn live(lat: f64) -> LiveFix {
        LiveFix::build().lat_lng(lat, -122.4194).finish()
    }

    #[test]
    fn only_touch_changed_markers() {
        let widget = FakeWidget::default();
        let mut map = EmbeddedMap::new(widget.clone());
        let config = MapConfig::default();

        map.render_markers(&markers_for(&config, &[cafe(), restaurant()], None))
            .unwrap();
        let ops = widget.ops();
        assert_eq!(ops.len(), 2);
        assert!(ops.contains(&Op::Add(101, MarkerKey::Saved("2".into()))));

        // the live position appears
        map.render_markers(&markers_for(&config, &[cafe(), restaurant()], Some(&live(37.7749))))
            .unwrap();
        assert_eq!(widget.ops(), vec![Op::Add(102, MarkerKey::CurrentLocation)]);

        // the live position moves and one location was deleted
        map.render_markers(&markers_for(&config, &[restaurant()], Some(&live(37.7760))))
            .unwrap();
        assert_eq!(widget.ops(), vec![Op::Remove(100), Op::Update(102)]);
    }

    #[test]
    fn attach_to_the_renderer() {
        let widget = FakeWidget::default();
        let backend = EmbeddedMap::new(widget.clone());
        let mut renderer = MapRenderer::new(MapConfig::default(), Box::new(backend)).unwrap();
        assert_eq!(
            *widget.tile_url.lock().unwrap(),
            Some(MapConfig::default().tile_url)
        );
        renderer.render(&[cafe()], Some(&live(37.7749))).unwrap();
        assert!(renderer.try_next_event().is_none());
    }

    #[test]
    fn clicks_on_the_current_location_are_not_selections() {
        let widget = FakeWidget::default();
        let mut map = EmbeddedMap::new(widget.clone());
        let config = MapConfig::default();
        map.render_markers(&markers_for(&config, &[cafe()], Some(&live(37.7749))))
            .unwrap();
        let keys = map.events().routing().keys.clone();
        assert_eq!(
            translate(&keys, WidgetEvent::MarkerClicked(100)),
            Some(MapEvent::MarkerSelected("1".into()))
        );
        assert_eq!(translate(&keys, WidgetEvent::MarkerClicked(101)), None);
        assert_eq!(translate(&keys, WidgetEvent::MarkerClicked(999)), None);
        assert_eq!(
            translate(&keys, WidgetEvent::LocateClicked),
            Some(MapEvent::RecenterRequested)
        );
        assert_eq!(
            translate(&keys, WidgetEvent::AddClicked),
            Some(MapEvent::AddLocationRequested)
        );
    }

    #[tokio::test]
    async fn dispatch_events_to_the_renderer() {
        let widget = FakeWidget::default();
        let map = EmbeddedMap::new(widget.clone());
        let events = map.events();
        let mut renderer = MapRenderer::new(MapConfig::default(), Box::new(map)).unwrap();
        renderer.render(&[cafe()], None).unwrap();

        events.dispatch(WidgetEvent::MarkerClicked(100));
        assert_eq!(
            renderer.next_event().await,
            Some(MapEvent::MarkerSelected("1".into()))
        );

        let center = Coordinate::from_lat_lng_deg(48.7755, 9.1827);
        events.dispatch(WidgetEvent::MoveEnd { center, zoom: 11 });
        assert_eq!(
            renderer.next_event().await,
            Some(MapEvent::ViewportChanged(MapViewState::new(center, 11)))
        );
        assert_eq!(renderer.viewport(), &MapViewState::new(center, 11));
    }
}
