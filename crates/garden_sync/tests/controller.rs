//! Drag gestures, click placement, and tier switches through the controller.

use std::sync::Arc;

use garden_core::test_fixtures::{basic_garden, garden_id, plants, space_at, stored_space};
use garden_core::{
    CareKind, DragError, DropRejection, DropVerdict, PlacementError, PlantId, SpaceId, Tier,
};
use garden_sync::{
    ControllerError, GardenSession, InMemoryStore, PlacementController, SeedFile, SyncConfig,
};

async fn controller() -> (Arc<InMemoryStore>, PlacementController<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::from_seed(SeedFile {
        gardens: vec![basic_garden()],
        plants: plants(&["plant_a", "plant_b"]),
        spaces: vec![
            stored_space("space_0001", "1,1", Some("plant_a")),
            stored_space("space_0002", "1,2", None),
        ],
    }));
    let session = GardenSession::open(Arc::clone(&store), garden_id(), SyncConfig::default())
        .await
        .unwrap();
    (store, PlacementController::new(session))
}

fn plant(id: &str) -> PlantId {
    PlantId::new(id)
}

fn space(id: &str) -> SpaceId {
    SpaceId::new(id)
}

#[tokio::test]
async fn test_drag_and_drop_moves_plant() {
    let (store, controller) = controller().await;

    controller.begin_drag(&plant("plant_a")).unwrap();
    let verdict = controller.hover(Some(space("space_0002"))).unwrap();
    assert_eq!(verdict, Some(DropVerdict::Allowed));

    let ids = controller.drop_on(space("space_0002")).unwrap();
    assert_eq!(ids.len(), 2);
    assert!(controller.drag_session().is_none());

    controller.session().settle().await;
    let stored = store.spaces(&garden_id());
    assert!(stored.iter().any(|s| s.id == space("space_0002") && s.holds(&plant("plant_a"))));
    assert!(stored.iter().all(|s| s.id != space("space_0001") || !s.is_occupied()));
}

#[tokio::test]
async fn test_second_drag_is_rejected() {
    let (_store, controller) = controller().await;

    controller.begin_drag(&plant("plant_a")).unwrap();
    let err = controller.begin_drag(&plant("plant_b")).unwrap_err();

    assert_eq!(err, ControllerError::Drag(DragError::SessionActive(plant("plant_a"))));
    assert_eq!(controller.drag_session().unwrap().source_plant, plant("plant_a"));
}

#[tokio::test]
async fn test_drag_of_unknown_plant_is_rejected() {
    let (_store, controller) = controller().await;
    let err = controller.begin_drag(&plant("ghost")).unwrap_err();
    assert_eq!(
        err,
        ControllerError::Placement(PlacementError::UnknownPlant(plant("ghost")))
    );
    assert!(controller.drag_session().is_none());
}

#[tokio::test]
async fn test_drop_on_occupied_space_ends_gesture_without_change() {
    let (_store, controller) = controller().await;
    let before = controller.snapshot();

    controller.begin_drag(&plant("plant_b")).unwrap();
    let verdict = controller.hover(Some(space("space_0001"))).unwrap();
    assert_eq!(
        verdict,
        Some(DropVerdict::Rejected {
            reason: DropRejection::Occupied {
                occupant: plant("plant_a")
            }
        })
    );
    let err = controller.drop_on(space("space_0001")).unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Placement(PlacementError::SpaceOccupied { .. })
    ));
    assert!(controller.drag_session().is_none());
    assert_eq!(controller.snapshot().spaces(), before.spaces());
}

#[tokio::test]
async fn test_cancelled_drag_changes_nothing() {
    let (_store, controller) = controller().await;
    let before = controller.snapshot();

    controller.begin_drag(&plant("plant_a")).unwrap();
    controller.hover(Some(space("space_0002"))).unwrap();
    let cancelled = controller.cancel_drag().unwrap();

    assert_eq!(cancelled.hover_space_id, Some(space("space_0002")));
    assert_eq!(controller.snapshot().spaces(), before.spaces());
    assert!(controller.drop_on(space("space_0002")).is_err());
}

#[tokio::test]
async fn test_hover_without_drag_fails() {
    let (_store, controller) = controller().await;
    assert_eq!(
        controller.hover(None).unwrap_err(),
        ControllerError::Drag(DragError::NoSession)
    );
}

#[tokio::test]
async fn test_place_of_placed_plant_is_rejected_and_not_synced() {
    let (_store, controller) = controller().await;

    let err = controller
        .place(&plant("plant_a"), &space("space_0002"), None, None)
        .unwrap_err();

    assert_eq!(
        err,
        ControllerError::Placement(PlacementError::AlreadyPlaced {
            plant: plant("plant_a"),
            space: space("space_0001"),
        })
    );
    controller.session().settle().await;
    assert!(controller.session().history().is_empty());
}

#[tokio::test]
async fn test_placements_report_where_plants_are() {
    let (_store, controller) = controller().await;
    let target = controller.session().read(|grid| space_at(grid, "3,1"));
    controller
        .place(&plant("plant_b"), &target, None, Some("by the fence".to_string()))
        .unwrap();

    let placements = controller.placements();
    let b = placements.iter().find(|p| p.plant.id == plant("plant_b")).unwrap();
    assert!(b.placed);
    assert_eq!(b.space_id.as_ref(), Some(&target));
}

#[tokio::test]
async fn test_care_and_suggestions_reach_the_store() {
    let (store, controller) = controller().await;

    controller.record_care(&space("space_0001"), CareKind::Fertilize).unwrap();
    controller
        .attach_suggestions(
            &space("space_0001"),
            r#"{"water":"weekly"}"#.to_string(),
            Some("images/a.jpg".to_string()),
        )
        .unwrap();
    controller.session().settle().await;

    let stored = store
        .spaces(&garden_id())
        .into_iter()
        .find(|s| s.id == space("space_0001"))
        .unwrap();
    assert!(stored.care.last_fertilized.is_some());
    assert_eq!(stored.image_ref.as_deref(), Some("images/a.jpg"));
    assert_eq!(stored.care_suggestions.as_deref(), Some(r#"{"water":"weekly"}"#));
}

#[tokio::test]
async fn test_tier_upgrade_keeps_occupancy() {
    let (_store, controller) = controller().await;

    controller.set_tier(Tier::Premium);

    let grid = controller.snapshot();
    assert_eq!(grid.spaces().len(), 36);
    assert_eq!(
        grid.occupancy().space_of(&plant("plant_a")),
        Some(&space("space_0001"))
    );
}
