use std::sync::Arc;

use tokio::sync::watch;
use vibesy_entities::{id::Id, location::*, session::AuthToken};

use crate::{error::NetworkError, gateways::api::LocationApi};

pub type Snapshot = Arc<Vec<SavedLocation>>;

/// The saved locations of the signed in user.
///
/// The server is the only source of identity: every change is
/// followed by a full refresh and the held set is replaced wholesale.
#[derive(Clone)]
pub struct LocationStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn LocationApi>,
    snapshot: watch::Sender<Snapshot>,
    session: watch::Sender<Option<AuthToken>>,
}

impl LocationStore {
    pub fn new(api: Arc<dyn LocationApi>) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        let (session, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                api,
                snapshot,
                session,
            }),
        }
    }

    pub fn locations(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn get(&self, id: &Id) -> Option<SavedLocation> {
        self.inner
            .snapshot
            .borrow()
            .iter()
            .find(|l| &l.id == id)
            .cloned()
    }

    /// Load all locations and replace the held set.
    ///
    /// Overlapping refreshes are applied in the order they complete.
    pub async fn refresh(&self, token: &AuthToken) -> Result<Snapshot, NetworkError> {
        self.inner.session.send_if_modified(|session| {
            if session.as_ref() == Some(token) {
                return false;
            }
            *session = Some(token.clone());
            true
        });
        let locations = self.inner.api.locations(token).await.map_err(|err| {
            log::warn!("Unable to load locations: {err}");
            err
        })?;
        if self.inner.session.borrow().as_ref() != Some(token) {
            log::debug!("Discard locations of a previous session");
            return Ok(self.locations());
        }
        log::debug!("Loaded {} locations", locations.len());
        let snapshot = Arc::new(locations);
        self.inner.snapshot.send_replace(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Create a location on the server and reload the set.
    pub async fn save(
        &self,
        token: &AuthToken,
        location: &NewLocation,
    ) -> Result<SavedLocation, NetworkError> {
        let created = self.inner.api.create_location(token, location).await?;
        log::info!("Saved location '{}' ({})", created.name, created.id);
        if let Err(err) = self.refresh(token).await {
            // The location exists remotely, it shows up with the next refresh.
            log::warn!("Unable to reload locations after saving: {err}");
        }
        Ok(created)
    }

    pub async fn delete(&self, token: &AuthToken, id: &Id) -> Result<(), NetworkError> {
        self.inner.api.delete_location(token, id).await?;
        log::info!("Deleted location {id}");
        if let Err(err) = self.refresh(token).await {
            log::warn!("Unable to reload locations after deleting: {err}");
        }
        Ok(())
    }

    /// Forget the session and all locations.
    pub fn clear(&self) {
        self.inner.session.send_replace(None);
        self.inner.snapshot.send_replace(Snapshot::default());
    }
}

impl std::fmt::Debug for LocationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("LocationStore")
            .field("locations", &self.inner.snapshot.borrow().len())
            .finish_non_exhaustive()
    }
}
