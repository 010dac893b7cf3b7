use serde::{Deserialize, Serialize};

use crate::{DragError, PlantId, SpaceId};

/// One in-flight move gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragSession {
    pub source_plant: PlantId,
    pub hover_space_id: Option<SpaceId>,
}

/// Holds at most one [`DragSession`]. Starting a second gesture while one is
/// active is rejected; the caller must drop or cancel first.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    session: Option<DragSession>,
}

impl DragTracker {
    pub fn active(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn begin(&mut self, plant_id: PlantId) -> Result<&DragSession, DragError> {
        if let Some(existing) = &self.session {
            return Err(DragError::SessionActive(existing.source_plant.clone()));
        }
        Ok(self.session.insert(DragSession {
            source_plant: plant_id,
            hover_space_id: None,
        }))
    }

    /// Updates the hover target; `None` means the pointer left every space.
    pub fn hover(&mut self, space_id: Option<SpaceId>) -> Result<(), DragError> {
        let session = self.session.as_mut().ok_or(DragError::NoSession)?;
        session.hover_space_id = space_id;
        Ok(())
    }

    /// Discards the session without touching any space.
    pub fn cancel(&mut self) -> Option<DragSession> {
        self.session.take()
    }

    /// Ends the gesture over `space_id`, handing the session to the caller
    /// to commit.
    pub fn drop_on(&mut self, space_id: SpaceId) -> Result<DragSession, DragError> {
        let mut session = self.session.take().ok_or(DragError::NoSession)?;
        session.hover_space_id = Some(space_id);
        Ok(session)
    }
}
