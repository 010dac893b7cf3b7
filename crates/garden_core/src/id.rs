use uuid::Uuid;

use crate::{GardenId, Position, SpaceId};

/// Namespace for locally derived placeholder ids.
const PLACEHOLDER_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_8b4d_4f7a_9e21_5d0c_7b3a_1e94);

/// Deterministic id for a placeholder at `position` in `garden_id`.
///
/// The same garden and position always yield the same id, which keeps
/// reconciliation idempotent across repeated runs.
pub fn placeholder_space_id(garden_id: &GardenId, position: &Position) -> SpaceId {
    let name = format!("{garden_id}/{position}");
    SpaceId(Uuid::new_v5(&PLACEHOLDER_NAMESPACE, name.as_bytes()).to_string())
}
