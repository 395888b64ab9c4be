use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use vibesy_entities::{
    fix::LiveFix, geocode::GeocodeCandidate, id::Id, location::SavedLocation,
    session::AuthToken, view::MapViewState,
};

use crate::{
    add_location::{AddLocationFlow, FlowState},
    error::{Error, NetworkError},
    live::LiveLocationStream,
    map::{MapEvent, MapRenderer},
    notice::Notice,
    search::{GeocodeSearchController, SearchState},
    store::{LocationStore, Snapshot},
};

/// Something the surrounding UI may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenEvent {
    LiveFix(LiveFix),
    LiveFixLost,
    LocationsChanged(Snapshot),
    Selected(SavedLocation),
    Recentered(bool),
    AddLocationOpened,
    ViewportChanged(MapViewState),
    SearchUpdated(SearchState),
    Notice(Notice),
}

/// One mounted map view with its saved locations,
/// the live position and the add location form.
pub struct MapScreen {
    token: AuthToken,
    store: LocationStore,
    renderer: MapRenderer,
    search: GeocodeSearchController,
    flow: AddLocationFlow,
    live: watch::Receiver<Option<LiveFix>>,
    live_open: bool,
    live_task: Option<JoinHandle<()>>,
    /// Survives the end of the stream, only used for new locations.
    last_known: Option<LiveFix>,
    locations: watch::Receiver<Snapshot>,
    search_state: watch::Receiver<SearchState>,
    notices_tx: mpsc::UnboundedSender<Notice>,
    notices: mpsc::UnboundedReceiver<Notice>,
    map_open: bool,
    centered: bool,
    selected: Option<SavedLocation>,
}

impl MapScreen {
    pub fn new(
        token: AuthToken,
        store: LocationStore,
        renderer: MapRenderer,
        search: GeocodeSearchController,
        flow: AddLocationFlow,
    ) -> Self {
        let (_, live) = watch::channel(None);
        let (notices_tx, notices) = mpsc::unbounded_channel();
        let locations = store.subscribe();
        let search_state = search.subscribe();
        Self {
            token,
            store,
            renderer,
            search,
            flow,
            live,
            live_open: false,
            live_task: None,
            last_known: None,
            locations,
            search_state,
            notices_tx,
            notices,
            map_open: true,
            centered: false,
            selected: None,
        }
    }

    pub const fn store(&self) -> &LocationStore {
        &self.store
    }

    pub const fn renderer(&self) -> &MapRenderer {
        &self.renderer
    }

    pub const fn flow(&self) -> &AddLocationFlow {
        &self.flow
    }

    pub const fn search(&self) -> &GeocodeSearchController {
        &self.search
    }

    pub fn live_fix(&self) -> Option<LiveFix> {
        self.live.borrow().clone()
    }

    /// The most recent fix, even if the device stopped reporting.
    pub const fn last_known_fix(&self) -> Option<&LiveFix> {
        self.last_known.as_ref()
    }

    pub const fn selected(&self) -> Option<&SavedLocation> {
        self.selected.as_ref()
    }

    /// Start following the device position and load the saved locations.
    ///
    /// Neither a missing location permission nor an unreachable
    /// backend prevents the map from being shown.
    pub async fn mount(&mut self, mut stream: LiveLocationStream) {
        if self.live_task.is_none() {
            match stream.start().await {
                Ok(()) => {
                    let (tx, rx) = watch::channel(None);
                    self.live = rx;
                    self.live_open = true;
                    self.live_task = Some(tokio::spawn(forward_live_fixes(stream, tx)));
                }
                Err(err) => {
                    log::warn!("Continue without live position: {err}");
                    self.notify(Notice::LocationUnavailable(err));
                }
            }
        }
        if self.store.refresh(&self.token).await.is_err() {
            self.notify(Notice::RefreshFailed);
        }
        self.redraw();
    }

    /// Wait for and handle the next change of any input.
    ///
    /// Returns `None` once no input is left.
    pub async fn next_event(&mut self) -> Option<ScreenEvent> {
        loop {
            tokio::select! {
                biased;
                Some(notice) = self.notices.recv() => {
                    return Some(ScreenEvent::Notice(notice));
                }
                changed = self.live.changed(), if self.live_open => {
                    if changed.is_err() {
                        self.live_open = false;
                        continue;
                    }
                    let fix = self.live.borrow_and_update().clone();
                    return Some(self.on_live_fix(fix));
                }
                changed = self.locations.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    let snapshot = self.locations.borrow_and_update().clone();
                    self.redraw();
                    return Some(ScreenEvent::LocationsChanged(snapshot));
                }
                changed = self.search_state.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    let state = self.search_state.borrow_and_update().clone();
                    return Some(ScreenEvent::SearchUpdated(state));
                }
                event = self.renderer.next_event(), if self.map_open => {
                    let Some(event) = event else {
                        self.map_open = false;
                        continue;
                    };
                    if let Some(event) = self.on_map_event(event) {
                        return Some(event);
                    }
                }
                else => return None,
            }
        }
    }

    fn on_live_fix(&mut self, fix: Option<LiveFix>) -> ScreenEvent {
        self.redraw();
        let Some(fix) = fix else {
            return ScreenEvent::LiveFixLost;
        };
        self.last_known = Some(fix.clone());
        if !self.centered {
            // Only the first fix moves the map.
            self.centered = true;
            if let Err(err) = self.renderer.recenter(Some(&fix)) {
                log::warn!("Unable to center the map: {err}");
            }
        }
        ScreenEvent::LiveFix(fix)
    }

    fn on_map_event(&mut self, event: MapEvent) -> Option<ScreenEvent> {
        match event {
            MapEvent::MarkerSelected(id) => {
                let Some(location) = self.store.get(&id) else {
                    log::debug!("Ignore selection of unknown location {id}");
                    return None;
                };
                self.selected = Some(location.clone());
                Some(ScreenEvent::Selected(location))
            }
            MapEvent::RecenterRequested => {
                let live = self.live_fix();
                let recentered = self.renderer.recenter(live.as_ref()).unwrap_or_else(|err| {
                    log::warn!("Unable to recenter the map: {err}");
                    false
                });
                Some(ScreenEvent::Recentered(recentered))
            }
            MapEvent::AddLocationRequested => {
                self.flow.open();
                Some(ScreenEvent::AddLocationOpened)
            }
            MapEvent::ViewportChanged(view) => Some(ScreenEvent::ViewportChanged(view)),
        }
    }

    pub fn edit_name(&mut self, name: impl Into<String>) -> Result<(), Error> {
        self.flow.set_name(name)
    }

    pub fn edit_description(&mut self, description: impl Into<String>) -> Result<(), Error> {
        self.flow.set_description(description)
    }

    /// Update the address and look it up.
    pub fn edit_address(&mut self, address: impl Into<String>) -> Result<(), Error> {
        let address = address.into();
        self.flow.set_address(address.as_str())?;
        self.search.search(&address);
        Ok(())
    }

    /// Use the geocode candidate at `index` for the draft.
    pub fn pick_candidate(&mut self, index: usize) -> Result<Option<GeocodeCandidate>, Error> {
        let state = self.flow.state();
        if state != FlowState::Editing {
            return Err(Error::InvalidState(state.as_str()));
        }
        let Some(candidate) = self.search.select(index) else {
            return Ok(None);
        };
        self.flow.select_candidate(candidate.clone())?;
        Ok(Some(candidate))
    }

    pub async fn submit(&mut self) -> Result<SavedLocation, Error> {
        let live = self.live_fix().or_else(|| self.last_known.clone());
        let result = self
            .flow
            .submit(&self.store, &self.token, live.as_ref())
            .await;
        match &result {
            Ok(_) => {
                self.search.clear();
                self.redraw();
            }
            Err(Error::Network(err)) => self.notify(Notice::SaveFailed(err.to_string())),
            Err(_) => {}
        }
        result
    }

    pub fn cancel_add(&mut self) {
        self.flow.cancel();
        self.search.clear();
    }

    pub async fn delete(&mut self, id: &Id) -> Result<(), NetworkError> {
        if let Err(err) = self.store.delete(&self.token, id).await {
            self.notify(Notice::DeleteFailed(err.to_string()));
            return Err(err);
        }
        if self.selected.as_ref().is_some_and(|l| &l.id == id) {
            self.selected = None;
        }
        self.redraw();
        Ok(())
    }

    /// Stop following the device and forget pending searches.
    ///
    /// Requests in flight complete in the background, their results are dropped.
    pub async fn unmount(&mut self) {
        self.search.cancel_pending();
        if let Some(task) = self.live_task.take() {
            task.abort();
            // Wait until the stream is dropped and the subscription released.
            let _ = task.await;
            log::debug!("Stopped following the device position");
        }
        self.live_open = false;
    }

    fn redraw(&mut self) {
        let locations = self.store.locations();
        let live = self.live_fix();
        if let Err(err) = self.renderer.render(&locations, live.as_ref()) {
            log::warn!("Unable to render markers: {err}");
        }
    }

    fn notify(&self, notice: Notice) {
        log::info!("{notice}");
        // The receiver lives as long as `self`.
        let _ = self.notices_tx.send(notice);
    }
}

impl Drop for MapScreen {
    fn drop(&mut self) {
        if let Some(task) = self.live_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for MapScreen {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MapScreen")
            .field("renderer", &self.renderer)
            .field("flow", &self.flow)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

async fn forward_live_fixes(mut stream: LiveLocationStream, live: watch::Sender<Option<LiveFix>>) {
    while let Some(fix) = stream.next_fix().await {
        if live.send(Some(fix)).is_err() {
            return;
        }
    }
    live.send_replace(None);
}
