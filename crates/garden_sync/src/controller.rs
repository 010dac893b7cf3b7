//! User-facing placement operations: click-to-place, click-to-clear, and
//! the drag gesture, each applied locally first and synced behind.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use garden_core::{
    validate_drop, CareKind, DragError, DragSession, DragTracker, DropVerdict, GardenGrid,
    PlacementError, PlantId, PlantPlacement, ReconcileReport, SpaceId, SyncId, Tier,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::session::GardenSession;
use crate::store::{SpaceStore, SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Drag(#[from] DragError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub struct PlacementController<S> {
    session: GardenSession<S>,
    drag: Arc<Mutex<DragTracker>>,
}

impl<S> Clone for PlacementController<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            drag: Arc::clone(&self.drag),
        }
    }
}

impl<S: SpaceStore> PlacementController<S> {
    pub fn new(session: GardenSession<S>) -> Self {
        Self {
            session,
            drag: Arc::new(Mutex::new(DragTracker::default())),
        }
    }

    pub fn session(&self) -> &GardenSession<S> {
        &self.session
    }

    pub fn snapshot(&self) -> GardenGrid {
        self.session.snapshot()
    }

    pub fn placements(&self) -> Vec<PlantPlacement> {
        self.session.read(GardenGrid::placement_states)
    }

    pub fn place(
        &self,
        plant_id: &PlantId,
        space_id: &SpaceId,
        planting_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<Vec<SyncId>, ControllerError> {
        let ids = self
            .session
            .apply(|grid| grid.place(plant_id, space_id, planting_date, notes))?;
        info!(%plant_id, %space_id, "plant placed");
        Ok(ids)
    }

    pub fn move_plant(&self, plant_id: &PlantId, space_id: &SpaceId) -> Result<Vec<SyncId>, ControllerError> {
        let ids = self.session.apply(|grid| grid.move_plant(plant_id, space_id))?;
        info!(%plant_id, %space_id, "plant moved");
        Ok(ids)
    }

    pub fn clear(&self, space_id: &SpaceId) -> Result<Vec<SyncId>, ControllerError> {
        let ids = self.session.apply(|grid| grid.clear(space_id))?;
        info!(%space_id, "space cleared");
        Ok(ids)
    }

    /// Stamps `kind` on an occupied space with the current time.
    pub fn record_care(&self, space_id: &SpaceId, kind: CareKind) -> Result<Vec<SyncId>, ControllerError> {
        let at = Utc::now();
        Ok(self.session.apply(|grid| grid.record_care(space_id, kind, at))?)
    }

    pub fn attach_suggestions(
        &self,
        space_id: &SpaceId,
        suggestions: String,
        image_ref: Option<String>,
    ) -> Result<Vec<SyncId>, ControllerError> {
        Ok(self
            .session
            .apply(|grid| grid.attach_suggestions(space_id, suggestions, image_ref))?)
    }

    /// Checks a drop without committing it.
    pub fn validate_drop(&self, plant_id: &PlantId, space_id: &SpaceId) -> Result<DropVerdict, ControllerError> {
        self.session.read(|grid| -> Result<DropVerdict, ControllerError> {
            let plant = grid
                .plant(plant_id)
                .ok_or_else(|| PlacementError::UnknownPlant(plant_id.clone()))?;
            let slot = grid
                .space(space_id)
                .ok_or_else(|| PlacementError::UnknownSpace(space_id.clone()))?;
            Ok(validate_drop(plant, slot.space()))
        })
    }

    pub fn drag_session(&self) -> Option<DragSession> {
        self.drag.lock().active().cloned()
    }

    /// Starts a drag of a known plant. A second drag is rejected until the
    /// first is dropped or cancelled.
    pub fn begin_drag(&self, plant_id: &PlantId) -> Result<DragSession, ControllerError> {
        if self.session.read(|grid| grid.plant(plant_id).is_none()) {
            return Err(PlacementError::UnknownPlant(plant_id.clone()).into());
        }
        let mut drag = self.drag.lock();
        let session = drag.begin(plant_id.clone())?;
        debug!(%plant_id, "drag started");
        Ok(session.clone())
    }

    /// Moves the hover target and returns the verdict a drop there would get.
    pub fn hover(&self, space_id: Option<SpaceId>) -> Result<Option<DropVerdict>, ControllerError> {
        let mut drag = self.drag.lock();
        drag.hover(space_id.clone())?;
        let Some(space_id) = space_id else {
            return Ok(None);
        };
        let plant_id = drag
            .active()
            .map(|session| session.source_plant.clone())
            .ok_or(DragError::NoSession)?;
        drop(drag);
        self.validate_drop(&plant_id, &space_id).map(Some)
    }

    pub fn cancel_drag(&self) -> Option<DragSession> {
        let cancelled = self.drag.lock().cancel();
        if let Some(session) = &cancelled {
            debug!(plant_id = %session.source_plant, "drag cancelled");
        }
        cancelled
    }

    /// Ends the gesture over `space_id` and commits it. The gesture is over
    /// even when the drop is rejected.
    pub fn drop_on(&self, space_id: SpaceId) -> Result<Vec<SyncId>, ControllerError> {
        let session = self.drag.lock().drop_on(space_id)?;
        let ids = self.session.apply(|grid| grid.commit_drop(&session))?;
        info!(
            plant_id = %session.source_plant,
            space_id = ?session.hover_space_id,
            "drop committed"
        );
        Ok(ids)
    }

    /// Local-only tier switch; the grid is reconciled for the new base size.
    pub fn set_tier(&self, tier: Tier) -> ReconcileReport {
        let report = self.session.update(|grid| grid.set_tier(tier));
        info!(tier = tier.label(), ?report, "tier changed");
        report
    }

    pub async fn refresh(&self) -> Result<ReconcileReport, ControllerError> {
        Ok(self.session.refresh().await?)
    }
}
