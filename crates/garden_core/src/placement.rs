//! Assigning, clearing, and moving plants between spaces.
//!
//! Per space the only transitions are `Empty -> Occupied` (place) and
//! `Occupied -> Empty` (clear). A move is a clear of every space holding the
//! plant followed by a place, applied before any remote call is described.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CareKind, CareRecord, CareTimestamps, DragSession, GardenGrid, GardenId, GridSpace,
    PlaceRecord, Plant, PlacementError, PlantId, SpaceId, SpaceSlot, SyncRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum DropVerdict {
    Allowed,
    /// The target already holds the dragged plant; committing does nothing.
    AlreadyHere,
    Rejected { reason: DropRejection },
}

impl DropVerdict {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, DropVerdict::Rejected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropRejection {
    Occupied { occupant: PlantId },
    DifferentGarden { plant_garden: GardenId, space_garden: GardenId },
}

/// Checks a drop before it is committed. Reasons are tested in priority
/// order: already here, occupied by another plant, different garden.
pub fn validate_drop(source: &Plant, target: &GridSpace) -> DropVerdict {
    match &target.occupant_id {
        Some(occupant) if occupant == &source.id => return DropVerdict::AlreadyHere,
        Some(occupant) => {
            return DropVerdict::Rejected {
                reason: DropRejection::Occupied {
                    occupant: occupant.clone(),
                },
            }
        }
        None => {}
    }
    if source.garden_id != target.garden_id {
        return DropVerdict::Rejected {
            reason: DropRejection::DifferentGarden {
                plant_garden: source.garden_id.clone(),
                space_garden: target.garden_id.clone(),
            },
        };
    }
    DropVerdict::Allowed
}

/// Occupancy metadata that travels with a plant when it moves.
struct Occupancy {
    planting_date: Option<NaiveDate>,
    notes: Option<String>,
    care: CareTimestamps,
    image_ref: Option<String>,
    care_suggestions: Option<String>,
}

/// Outcome of the shared checks run before any placement.
enum Target {
    /// The target already holds the plant.
    Unchanged,
    Ready(usize),
}

impl GardenGrid {
    /// Puts a plant that is not yet placed into an empty space.
    pub fn place(
        &mut self,
        plant_id: &PlantId,
        target: &SpaceId,
        planting_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<Vec<SyncRequest>, PlacementError> {
        let target_index = match self.check_target(plant_id, target)? {
            Target::Unchanged => return Ok(Vec::new()),
            Target::Ready(i) => i,
        };
        if let Some(current) = self.occupancy().space_of(plant_id) {
            return Err(PlacementError::AlreadyPlaced {
                plant: plant_id.clone(),
                space: current.clone(),
            });
        }

        let planting_date = planting_date.or_else(|| {
            self.plant(plant_id)
                .and_then(|plant| plant.planting_date)
        });
        let occupancy = Occupancy {
            planting_date,
            notes,
            care: CareTimestamps::default(),
            image_ref: None,
            care_suggestions: None,
        };
        Ok(vec![self.occupy(target_index, plant_id, occupancy)])
    }

    /// Relocates a plant to `target`, or places it if it is not placed yet.
    /// Care metadata moves with the plant.
    pub fn move_plant(
        &mut self,
        plant_id: &PlantId,
        target: &SpaceId,
    ) -> Result<Vec<SyncRequest>, PlacementError> {
        let target_index = match self.check_target(plant_id, target)? {
            Target::Unchanged => return Ok(Vec::new()),
            Target::Ready(i) => i,
        };

        let mut requests = Vec::new();
        let mut carried: Option<Occupancy> = None;
        for slot in self.spaces.iter_mut().filter(|s| s.space().holds(plant_id)) {
            let persisted = slot.is_persisted();
            let space = slot.space_mut();
            let occupancy = Occupancy {
                planting_date: space.planting_date,
                notes: space.notes.take(),
                care: std::mem::take(&mut space.care),
                image_ref: space.image_ref.take(),
                care_suggestions: space.care_suggestions.take(),
            };
            carried.get_or_insert(occupancy);
            space.vacate();
            if persisted {
                requests.push(SyncRequest::Remove {
                    space_id: space.id.clone(),
                });
            }
        }

        let occupancy = carried.unwrap_or_else(|| Occupancy {
            planting_date: self.plant(plant_id).and_then(|plant| plant.planting_date),
            notes: None,
            care: CareTimestamps::default(),
            image_ref: None,
            care_suggestions: None,
        });
        requests.push(self.occupy(target_index, plant_id, occupancy));
        Ok(requests)
    }

    /// Empties an occupied space.
    pub fn clear(&mut self, space_id: &SpaceId) -> Result<Vec<SyncRequest>, PlacementError> {
        let i = self
            .index_of(space_id)
            .ok_or_else(|| PlacementError::UnknownSpace(space_id.clone()))?;
        let slot = &mut self.spaces[i];
        if !slot.space().is_occupied() {
            return Err(PlacementError::SpaceEmpty(space_id.clone()));
        }
        slot.space_mut().vacate();
        if slot.is_persisted() {
            Ok(vec![SyncRequest::Remove {
                space_id: space_id.clone(),
            }])
        } else {
            Ok(Vec::new())
        }
    }

    /// Commits a finished drag gesture over its hover target.
    pub fn commit_drop(&mut self, session: &DragSession) -> Result<Vec<SyncRequest>, PlacementError> {
        let Some(target) = &session.hover_space_id else {
            return Ok(Vec::new());
        };
        let plant = self
            .plant(&session.source_plant)
            .ok_or_else(|| PlacementError::UnknownPlant(session.source_plant.clone()))?;
        let slot = self
            .space(target)
            .ok_or_else(|| PlacementError::UnknownSpace(target.clone()))?;
        match validate_drop(plant, slot.space()) {
            DropVerdict::AlreadyHere => Ok(Vec::new()),
            DropVerdict::Rejected {
                reason: DropRejection::Occupied { occupant },
            } => Err(PlacementError::SpaceOccupied {
                space: target.clone(),
                occupant,
            }),
            DropVerdict::Rejected {
                reason: DropRejection::DifferentGarden { plant_garden, .. },
            } => Err(PlacementError::DifferentGarden {
                plant: plant.id.clone(),
                plant_garden,
                garden: self.garden.id.clone(),
            }),
            DropVerdict::Allowed => {
                let plant_id = session.source_plant.clone();
                self.move_plant(&plant_id, target)
            }
        }
    }

    /// Stamps a care action on an occupied space.
    pub fn record_care(
        &mut self,
        space_id: &SpaceId,
        kind: CareKind,
        at: DateTime<Utc>,
    ) -> Result<Vec<SyncRequest>, PlacementError> {
        let slot = self.occupied_slot_mut(space_id)?;
        slot.space_mut().care.record(kind, at);
        Ok(care_request(slot).into_iter().collect())
    }

    /// Stores an image-analysis result on an occupied space.
    pub fn attach_suggestions(
        &mut self,
        space_id: &SpaceId,
        suggestions: String,
        image_ref: Option<String>,
    ) -> Result<Vec<SyncRequest>, PlacementError> {
        let slot = self.occupied_slot_mut(space_id)?;
        let space = slot.space_mut();
        space.care_suggestions = Some(suggestions);
        if image_ref.is_some() {
            space.image_ref = image_ref;
        }
        Ok(care_request(slot).into_iter().collect())
    }

    fn occupied_slot_mut(&mut self, space_id: &SpaceId) -> Result<&mut SpaceSlot, PlacementError> {
        let i = self
            .index_of(space_id)
            .ok_or_else(|| PlacementError::UnknownSpace(space_id.clone()))?;
        let slot = &mut self.spaces[i];
        if slot.space().is_occupied() {
            Ok(slot)
        } else {
            Err(PlacementError::SpaceEmpty(space_id.clone()))
        }
    }

    fn check_target(&self, plant_id: &PlantId, target: &SpaceId) -> Result<Target, PlacementError> {
        let plant = self
            .plant(plant_id)
            .ok_or_else(|| PlacementError::UnknownPlant(plant_id.clone()))?;
        let i = self
            .index_of(target)
            .ok_or_else(|| PlacementError::UnknownSpace(target.clone()))?;
        let space = self.spaces[i].space();
        match &space.occupant_id {
            Some(occupant) if occupant == plant_id => return Ok(Target::Unchanged),
            Some(occupant) => {
                return Err(PlacementError::SpaceOccupied {
                    space: target.clone(),
                    occupant: occupant.clone(),
                })
            }
            None => {}
        }
        if plant.garden_id != space.garden_id {
            return Err(PlacementError::DifferentGarden {
                plant: plant_id.clone(),
                plant_garden: plant.garden_id.clone(),
                garden: space.garden_id.clone(),
            });
        }
        if !space.active {
            return Err(PlacementError::SpaceInactive(target.clone()));
        }
        Ok(Target::Ready(i))
    }

    fn occupy(&mut self, i: usize, plant_id: &PlantId, occupancy: Occupancy) -> SyncRequest {
        let slot = &mut self.spaces[i];
        let persisted = slot.is_persisted();
        let space = slot.space_mut();
        space.occupant_id = Some(plant_id.clone());
        space.planting_date = occupancy.planting_date;
        space.notes = occupancy.notes;
        space.care = occupancy.care;
        space.image_ref = occupancy.image_ref;
        space.care_suggestions = occupancy.care_suggestions;
        SyncRequest::Place(PlaceRecord {
            garden_id: space.garden_id.clone(),
            space_id: space.id.clone(),
            position: space.position.clone(),
            plant_id: plant_id.clone(),
            planting_date: space.planting_date,
            notes: space.notes.clone(),
            persisted,
        })
    }
}

/// Care writes only go out for spaces the store already knows about.
fn care_request(slot: &SpaceSlot) -> Option<SyncRequest> {
    if !slot.is_persisted() {
        return None;
    }
    let space = slot.space();
    Some(SyncRequest::Care(CareRecord {
        space_id: space.id.clone(),
        care: space.care.clone(),
        image_ref: space.image_ref.clone(),
        care_suggestions: space.care_suggestions.clone(),
    }))
}
