use thiserror::Error;

use crate::{GardenId, PlantId, SpaceId};

/// Local validation failures. Returning one of these means nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("space {0} does not exist in this garden")]
    UnknownSpace(SpaceId),
    #[error("plant {0} is not in this garden's directory")]
    UnknownPlant(PlantId),
    #[error("plant {plant} belongs to garden {plant_garden}, not {garden}")]
    DifferentGarden {
        plant: PlantId,
        plant_garden: GardenId,
        garden: GardenId,
    },
    #[error("space {space} is occupied by {occupant}")]
    SpaceOccupied { space: SpaceId, occupant: PlantId },
    #[error("plant {plant} is already placed in space {space}")]
    AlreadyPlaced { plant: PlantId, space: SpaceId },
    #[error("space {0} is empty")]
    SpaceEmpty(SpaceId),
    #[error("space {0} is inactive")]
    SpaceInactive(SpaceId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("a drag of plant {0} is already in progress")]
    SessionActive(PlantId),
    #[error("no drag in progress")]
    NoSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("purchase count must be at least 1")]
    ZeroCount,
    #[error("purchased space count would overflow")]
    Overflow,
}
