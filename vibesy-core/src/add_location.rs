use vibesy_entities::{
    draft::LocationDraft,
    fix::LiveFix,
    geo::Coordinate,
    geocode::GeocodeCandidate,
    location::{NewLocation, SavedLocation},
    session::AuthToken,
};

use crate::{
    error::{Error, ValidationError},
    store::LocationStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Closed,
    Editing,
    Submitting,
}

impl FlowState {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Editing => "editing",
            Self::Submitting => "submitting",
        }
    }
}

/// What to do if neither a geocoded candidate nor a live fix is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCoordinate {
    #[default]
    Reject,
    /// Save the location at `(0,0)`.
    UseSentinel,
}

/// Drafting and saving a new location.
#[derive(Debug)]
pub struct AddLocationFlow {
    state: FlowState,
    draft: LocationDraft,
    unknown_coordinate: UnknownCoordinate,
}

impl Default for AddLocationFlow {
    fn default() -> Self {
        Self::new(UnknownCoordinate::default())
    }
}

impl AddLocationFlow {
    pub fn new(unknown_coordinate: UnknownCoordinate) -> Self {
        Self {
            state: FlowState::Closed,
            draft: LocationDraft::default(),
            unknown_coordinate,
        }
    }

    pub const fn state(&self) -> FlowState {
        self.state
    }

    pub fn draft(&self) -> Option<&LocationDraft> {
        (self.state != FlowState::Closed).then_some(&self.draft)
    }

    pub fn open(&mut self) {
        if self.state == FlowState::Closed {
            self.draft = LocationDraft::default();
            self.state = FlowState::Editing;
        }
    }

    pub fn cancel(&mut self) {
        self.draft = LocationDraft::default();
        self.state = FlowState::Closed;
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), Error> {
        self.editable_draft()?.name = name.into();
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), Error> {
        self.editable_draft()?.description = description.into();
        Ok(())
    }

    /// Changing the address text invalidates a previously selected candidate.
    pub fn set_address(&mut self, address: impl Into<String>) -> Result<(), Error> {
        self.editable_draft()?.set_address(address.into());
        Ok(())
    }

    pub fn select_candidate(&mut self, candidate: GeocodeCandidate) -> Result<(), Error> {
        self.editable_draft()?.select_candidate(candidate);
        Ok(())
    }

    /// The selected candidate wins over the live position.
    pub fn resolve_coordinate(&self, live: Option<&LiveFix>) -> Result<Coordinate, ValidationError> {
        if let Some(pos) = self.draft.coordinate() {
            return Ok(pos);
        }
        if let Some(fix) = live {
            return Ok(fix.pos);
        }
        match self.unknown_coordinate {
            UnknownCoordinate::Reject => Err(ValidationError::UnresolvedCoordinate),
            UnknownCoordinate::UseSentinel => {
                log::warn!("Position of '{}' is unknown, using (0,0)", self.draft.name);
                Ok(Coordinate::UNKNOWN)
            }
        }
    }

    fn validate(&self, live: Option<&LiveFix>) -> Result<NewLocation, ValidationError> {
        let name = self.draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let pos = self.resolve_coordinate(live)?;
        Ok(NewLocation {
            name: name.to_string(),
            pos,
            description: non_empty(&self.draft.description),
            address: non_empty(&self.draft.address),
        })
    }

    /// Save the draft.
    ///
    /// Validation errors are reported before any request is made.
    /// On failure the draft is kept for another attempt.
    pub async fn submit(
        &mut self,
        store: &LocationStore,
        token: &AuthToken,
        live: Option<&LiveFix>,
    ) -> Result<SavedLocation, Error> {
        self.editable_draft()?;
        let location = self.validate(live)?;
        self.state = FlowState::Submitting;
        match store.save(token, &location).await {
            Ok(saved) => {
                self.draft = LocationDraft::default();
                self.state = FlowState::Closed;
                Ok(saved)
            }
            Err(err) => {
                log::warn!("Unable to save location '{}': {err}", location.name);
                self.state = FlowState::Editing;
                Err(err.into())
            }
        }
    }

    fn editable_draft(&mut self) -> Result<&mut LocationDraft, Error> {
        match self.state {
            FlowState::Editing => Ok(&mut self.draft),
            state => Err(Error::InvalidState(state.as_str())),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::NetworkError,
        tests::{candidate, token, FakeLocationApi},
    };
    use vibesy_entities::builders::*;

    fn live() -> LiveFix {
        LiveFix::build().lat_lng(37.78825, -122.4324).finish()
    }

    fn editing() -> AddLocationFlow {
        let mut flow = AddLocationFlow::default();
        flow.open();
        flow
    }

    #[test]
    fn edits_require_an_open_form() {
        let mut flow = AddLocationFlow::default();
        assert_eq!(flow.state(), FlowState::Closed);
        assert!(flow.draft().is_none());
        assert_eq!(flow.set_name("x"), Err(Error::InvalidState("closed")));
        flow.open();
        assert!(flow.set_name("x").is_ok());
        assert_eq!(flow.draft().unwrap().name, "x");
        flow.cancel();
        assert!(flow.draft().is_none());
        flow.open();
        assert_eq!(flow.draft().unwrap().name, "");
    }

    #[test]
    fn prefer_the_selected_candidate() {
        let mut flow = editing();
        let googleplex = candidate("Googleplex", 37.422, -122.084);
        flow.select_candidate(googleplex.clone()).unwrap();
        assert_eq!(flow.resolve_coordinate(Some(&live())), Ok(googleplex.pos));
        assert_eq!(flow.draft().unwrap().address, "Googleplex");
    }

    #[test]
    fn address_edit_falls_back_to_the_live_fix() {
        let mut flow = editing();
        flow.set_address("1600 Amphitheatre").unwrap();
        flow.select_candidate(candidate("Googleplex", 37.422, -122.084))
            .unwrap();
        flow.set_address("1600 Amphitheatre Parkway").unwrap();
        assert_eq!(flow.resolve_coordinate(Some(&live())), Ok(live().pos));
        assert_eq!(
            flow.resolve_coordinate(None),
            Err(ValidationError::UnresolvedCoordinate)
        );
    }

    #[test]
    fn optionally_use_the_unknown_sentinel() {
        let mut flow = AddLocationFlow::new(UnknownCoordinate::UseSentinel);
        flow.open();
        assert_eq!(flow.resolve_coordinate(None), Ok(Coordinate::UNKNOWN));
    }

    #[tokio::test]
    async fn reject_empty_names_without_a_request() {
        let api = FakeLocationApi::new();
        let store = LocationStore::new(api.clone());
        let mut flow = editing();
        flow.set_name("   ").unwrap();
        let err = flow.submit(&store, &token(), Some(&live())).await.unwrap_err();
        assert_eq!(err, Error::Validation(ValidationError::EmptyName));
        assert_eq!(flow.state(), FlowState::Editing);
        assert!(api.created().is_empty());
    }

    #[tokio::test]
    async fn reject_unresolved_coordinates_without_a_request() {
        let api = FakeLocationApi::new();
        let store = LocationStore::new(api.clone());
        let mut flow = editing();
        flow.set_name("Somewhere").unwrap();
        let err = flow.submit(&store, &token(), None).await.unwrap_err();
        assert_eq!(err, Error::Validation(ValidationError::UnresolvedCoordinate));
        assert!(api.created().is_empty());
    }

    #[tokio::test]
    async fn keep_the_draft_if_saving_fails() {
        let api = FakeLocationApi::new();
        api.fail_create(true);
        let store = LocationStore::new(api.clone());
        let mut flow = editing();
        flow.set_name("Cool Cafe").unwrap();
        flow.set_description("A trendy cafe").unwrap();
        let err = flow.submit(&store, &token(), Some(&live())).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::Status { status: 400, .. })
        ));
        assert_eq!(flow.state(), FlowState::Editing);
        let draft = flow.draft().unwrap();
        assert_eq!(draft.name, "Cool Cafe");
        assert_eq!(draft.description, "A trendy cafe");
    }

    #[tokio::test]
    async fn close_after_saving() {
        let api = FakeLocationApi::new();
        let store = LocationStore::new(api.clone());
        let mut flow = editing();
        flow.set_name(" Cool Cafe ").unwrap();
        let saved = flow.submit(&store, &token(), Some(&live())).await.unwrap();
        assert_eq!(saved.name, "Cool Cafe");
        assert_eq!(flow.state(), FlowState::Closed);
        assert!(flow.draft().is_none());

        let created = api.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].pos, live().pos);
        assert!(created[0].description.is_none());
        assert!(created[0].address.is_none());
        assert_eq!(*store.locations(), vec![saved]);
    }
}
