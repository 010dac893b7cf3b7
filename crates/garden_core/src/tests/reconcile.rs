use super::*;

#[test]
fn test_empty_basic_yields_nine_unoccupied_cells() {
    let result = reconcile(&garden_id(), basic_garden().context(), Vec::new());

    assert_eq!(
        positions(&result.spaces),
        vec!["1,1", "1,2", "1,3", "2,1", "2,2", "2,3", "3,1", "3,2", "3,3"]
    );
    assert!(result.spaces.iter().all(|s| !s.space().is_occupied()));
    assert!(result.spaces.iter().all(|s| !s.is_persisted()));
    assert_eq!(result.report.synthesized, 9);
}

#[test]
fn test_partial_premium_fetch_is_completed_and_keeps_occupant() {
    let remote = vec![
        stored_space("space_0001", "1,1", None),
        stored_space("space_0002", "1,2", None),
        stored_space("space_0003", "2,3", Some("P7")),
        stored_space("space_0004", "6,6", None),
        stored_space("space_0005", "4,1", None),
    ];
    let result = reconcile(
        &garden_id(),
        premium_garden().context(),
        crate::reconcile::from_remote(remote),
    );

    assert_eq!(result.spaces.len(), 36);
    let cell = result
        .spaces
        .iter()
        .find(|s| s.position() == &Position::grid(2, 3))
        .unwrap();
    assert_eq!(cell.space().occupant_id, Some(PlantId::new("P7")));
    assert_eq!(cell.id(), &SpaceId::new("space_0003"));
    assert!(cell.is_persisted());
    assert_eq!(result.report.reused, 5);
    assert_eq!(result.report.synthesized, 31);
}

#[test]
fn test_custom_positions_are_appended_in_input_order() {
    let remote = vec![
        stored_space("space_0001", "bed-north", None),
        stored_space("space_0002", "2,2", None),
        stored_space("space_0003", "4,4", Some("plant_a")),
        stored_space("space_0004", "additional-3", None),
    ];
    let result = reconcile(
        &garden_id(),
        basic_garden().context(),
        crate::reconcile::from_remote(remote),
    );

    let tail: Vec<String> = positions(&result.spaces)[9..].to_vec();
    assert_eq!(tail, vec!["bed-north", "4,4", "additional-3"]);
    assert_eq!(result.report.carried, 3);
    assert_eq!(result.spaces.len(), 12);
}

#[test]
fn test_extra_slots_follow_base_cells() {
    let ctx = GridContext::new(Tier::Basic, 3);
    let result = reconcile(&garden_id(), ctx, Vec::new());

    assert_eq!(
        positions(&result.spaces)[9..].to_vec(),
        vec!["additional-1", "additional-2", "additional-3"]
    );
}

#[test]
fn test_reconcile_is_idempotent() {
    let remote = vec![
        stored_space("space_0001", "3,3", Some("plant_a")),
        stored_space("space_0002", "legacy", None),
    ];
    let ctx = GridContext::new(Tier::Basic, 2);
    let once = reconcile(&garden_id(), ctx, crate::reconcile::from_remote(remote));
    let twice = reconcile(&garden_id(), ctx, once.spaces.clone());

    assert_eq!(once.spaces, twice.spaces);
    assert_eq!(twice.report.synthesized, 0);
}

#[test]
fn test_occupied_duplicate_wins_position_over_empty_one() {
    let remote = vec![
        stored_space("space_0001", "1,1", None),
        stored_space("space_0002", "1,1", Some("plant_a")),
    ];
    let result = reconcile(
        &garden_id(),
        basic_garden().context(),
        crate::reconcile::from_remote(remote),
    );

    assert_eq!(result.spaces.len(), 9);
    assert_eq!(result.spaces[0].id(), &SpaceId::new("space_0002"));
    assert_eq!(result.report.superseded, 1);
}

#[test]
fn test_second_occupied_duplicate_is_carried_not_dropped() {
    let remote = vec![
        stored_space("space_0001", "1,1", Some("plant_a")),
        stored_space("space_0002", "1,1", Some("plant_b")),
    ];
    let result = reconcile(
        &garden_id(),
        basic_garden().context(),
        crate::reconcile::from_remote(remote),
    );

    assert_eq!(result.spaces.len(), 10);
    assert_eq!(result.spaces[0].id(), &SpaceId::new("space_0001"));
    assert_eq!(result.spaces[9].id(), &SpaceId::new("space_0002"));
    assert_eq!(result.report.duplicate_occupied, 1);
}

#[test]
fn test_soft_deleted_empty_cell_is_replaced_by_placeholder() {
    let mut deleted = stored_space("space_0001", "2,2", None);
    deleted.active = false;
    let result = reconcile(
        &garden_id(),
        basic_garden().context(),
        crate::reconcile::from_remote(vec![deleted]),
    );

    let cell = &result.spaces[4];
    assert_eq!(cell.position(), &Position::grid(2, 2));
    assert!(!cell.is_persisted());
    assert!(cell.space().active);
    assert_eq!(result.report.superseded, 1);
}

#[test]
fn test_foreign_garden_rows_are_ignored() {
    let mut foreign = stored_space("space_0001", "1,1", Some("plant_x"));
    foreign.garden_id = GardenId::new("garden_other");
    let result = reconcile(
        &garden_id(),
        basic_garden().context(),
        crate::reconcile::from_remote(vec![foreign]),
    );

    assert_eq!(result.report.foreign, 1);
    assert!(result.spaces.iter().all(|s| !s.space().is_occupied()));
}

#[test]
fn test_placeholder_ids_are_stable_across_runs() {
    let ctx = basic_garden().context();
    let first = reconcile(&garden_id(), ctx, Vec::new());
    let second = reconcile(&garden_id(), ctx, Vec::new());
    assert_eq!(first.spaces, second.spaces);
    assert_eq!(
        first.spaces[0].id(),
        &placeholder_space_id(&garden_id(), &Position::grid(1, 1))
    );
}

#[test]
fn test_is_complete_detects_short_fetch() {
    let ctx = basic_garden().context();
    let short = crate::reconcile::from_remote(vec![stored_space("space_0001", "1,1", None)]);
    assert!(!crate::reconcile::is_complete(&short, ctx));

    let full = reconcile(&garden_id(), ctx, short).spaces;
    assert!(crate::reconcile::is_complete(&full, ctx));
}

#[test]
fn test_downgrade_keeps_cells_outside_new_grid() {
    let (mut grid, _) = GardenGrid::new(
        premium_garden(),
        plants(&["plant_a"]),
        vec![stored_space("space_0001", "5,5", Some("plant_a"))],
    );
    grid.set_tier(Tier::Basic);

    assert_eq!(grid.spaces().len(), 10);
    assert_eq!(occupant_at(&grid, "5,5"), Some(PlantId::new("plant_a")));
}

#[test]
fn test_position_parse_is_strict() {
    assert_eq!(Position::parse("2,3"), Position::grid(2, 3));
    assert_eq!(Position::parse("additional-4"), Position::Additional(4));
    assert_eq!(Position::parse("01,1"), Position::Custom("01,1".to_string()));
    assert_eq!(Position::parse("0,1"), Position::Custom("0,1".to_string()));
    assert_eq!(
        Position::parse("additional-0"),
        Position::Custom("additional-0".to_string())
    );
    assert_eq!(Position::parse(" 1,1"), Position::Custom(" 1,1".to_string()));
}

#[test]
fn test_position_serializes_as_string() {
    let json = serde_json::to_string(&Position::grid(2, 3)).unwrap();
    assert_eq!(json, "\"2,3\"");
    let parsed: Position = serde_json::from_str("\"additional-2\"").unwrap();
    assert_eq!(parsed, Position::Additional(2));
}

#[test]
fn test_unknown_tier_deserializes_as_basic() {
    let garden: Garden = serde_json::from_str(
        r#"{"id":"g","subscription_tier":"platinum","purchased_extra_spaces":1}"#,
    )
    .unwrap();
    assert_eq!(garden.subscription_tier, Tier::Basic);
}

#[test]
fn test_tier_labels_deserialize_case_insensitively() {
    let tier: Tier = serde_json::from_str("\"PREMIUM\"").unwrap();
    assert_eq!(tier, Tier::Premium);
    let tier: Tier = serde_json::from_str("\"Basic\"").unwrap();
    assert_eq!(tier, Tier::Basic);
    assert_eq!(serde_json::to_string(&Tier::Premium).unwrap(), "\"premium\"");
}

#[test]
fn test_fixture_plant_is_in_fixture_garden() {
    assert_eq!(plant("plant_a").garden_id, garden_id());
}
