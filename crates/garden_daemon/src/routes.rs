use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use garden_core::{
    base_dimensions, CareKind, DragError, DragSession, DropVerdict, PlacementError,
    PlantId, PlantPlacement, ReconcileReport, SpaceId, SpaceSlot, SyncId, Tier,
};
use garden_sync::{ControllerError, PurchaseError, PurchaseReceipt, SyncOutcome};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, HeaderValue::from_static("http://localhost:5173"))
}

pub fn make_router_with_cors(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/garden", get(garden_handler))
        .route("/api/v1/grid", get(grid_handler))
        .route("/api/v1/plants", get(plants_handler))
        .route("/api/v1/place", post(place_handler))
        .route("/api/v1/move", post(move_handler))
        .route("/api/v1/clear", post(clear_handler))
        .route("/api/v1/care", post(care_handler))
        .route("/api/v1/suggestions", post(suggestions_handler))
        .route("/api/v1/validate", post(validate_handler))
        .route("/api/v1/drag/start", post(drag_start_handler))
        .route("/api/v1/drag/hover", post(drag_hover_handler))
        .route("/api/v1/drag/drop", post(drag_drop_handler))
        .route("/api/v1/drag/cancel", post(drag_cancel_handler))
        .route("/api/v1/purchase", post(purchase_handler))
        .route("/api/v1/refresh", post(refresh_handler))
        .route("/api/v1/tier", post(tier_handler))
        .route("/api/v1/sync", get(sync_history_handler))
        .route("/api/v1/stream", get(stream_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub enum ApiError {
    Controller(ControllerError),
    Purchase(PurchaseError),
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        ApiError::Controller(err)
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        ApiError::Purchase(err)
    }
}

fn placement_status(err: &PlacementError) -> StatusCode {
    match err {
        PlacementError::UnknownSpace(_) | PlacementError::UnknownPlant(_) => StatusCode::NOT_FOUND,
        PlacementError::SpaceOccupied { .. } | PlacementError::AlreadyPlaced { .. } => {
            StatusCode::CONFLICT
        }
        PlacementError::DifferentGarden { .. }
        | PlacementError::SpaceEmpty(_)
        | PlacementError::SpaceInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Controller(ControllerError::Placement(err)) => placement_status(err),
            ApiError::Controller(ControllerError::Drag(DragError::SessionActive(_))) => {
                StatusCode::CONFLICT
            }
            ApiError::Controller(ControllerError::Drag(DragError::NoSession))
            | ApiError::Purchase(PurchaseError::Capacity(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Controller(ControllerError::Sync(_)) | ApiError::Purchase(PurchaseError::Gateway(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Purchase(PurchaseError::Declined) => StatusCode::PAYMENT_REQUIRED,
        };
        let message = match &self {
            ApiError::Controller(err) => err.to_string(),
            ApiError::Purchase(err) => err.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%status, "{message}");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PlaceBody {
    pub plant_id: PlantId,
    pub space_id: SpaceId,
    pub planting_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct TargetBody {
    pub plant_id: PlantId,
    pub space_id: SpaceId,
}

#[derive(Deserialize)]
pub struct SpaceBody {
    pub space_id: SpaceId,
}

#[derive(Deserialize)]
pub struct CareBody {
    pub space_id: SpaceId,
    pub kind: CareKind,
}

#[derive(Deserialize)]
pub struct SuggestionsBody {
    pub space_id: SpaceId,
    pub suggestions: String,
    pub image_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct PlantBody {
    pub plant_id: PlantId,
}

#[derive(Deserialize)]
pub struct HoverBody {
    pub space_id: Option<SpaceId>,
}

#[derive(Deserialize)]
pub struct PurchaseBody {
    pub count: u32,
}

#[derive(Deserialize)]
pub struct TierBody {
    pub tier: Tier,
}

#[derive(Serialize)]
pub struct Mutation {
    pub sync_ids: Vec<SyncId>,
}

#[derive(Serialize)]
pub struct GardenSummary {
    pub garden_id: String,
    pub tier: Tier,
    pub purchased_extra_spaces: u32,
    pub base_dimensions: (u32, u32),
    pub total_capacity: u32,
    pub space_count: usize,
    pub occupied: usize,
    pub drag: Option<DragSession>,
}

#[derive(Serialize)]
pub struct HoverResponse {
    pub verdict: Option<DropVerdict>,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: Option<DragSession>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn garden_handler(State(app_state): State<AppState>) -> Json<GardenSummary> {
    let drag = app_state.controller.drag_session();
    let summary = app_state.session().read(|grid| {
        let ctx = grid.context();
        GardenSummary {
            garden_id: grid.garden().id.to_string(),
            tier: ctx.tier,
            purchased_extra_spaces: ctx.purchased_extra,
            base_dimensions: base_dimensions(ctx.tier),
            total_capacity: ctx.total_capacity(),
            space_count: grid.spaces().len(),
            occupied: grid.occupancy().occupied_count(),
            drag,
        }
    });
    Json(summary)
}

pub async fn grid_handler(State(app_state): State<AppState>) -> Json<Vec<SpaceSlot>> {
    Json(app_state.session().read(|grid| grid.spaces().to_vec()))
}

pub async fn plants_handler(State(app_state): State<AppState>) -> Json<Vec<PlantPlacement>> {
    Json(app_state.controller.placements())
}

pub async fn place_handler(
    State(app_state): State<AppState>,
    Json(body): Json<PlaceBody>,
) -> ApiResult<Mutation> {
    let sync_ids = app_state.controller.place(
        &body.plant_id,
        &body.space_id,
        body.planting_date,
        body.notes,
    )?;
    Ok(Json(Mutation { sync_ids }))
}

pub async fn move_handler(
    State(app_state): State<AppState>,
    Json(body): Json<TargetBody>,
) -> ApiResult<Mutation> {
    let sync_ids = app_state
        .controller
        .move_plant(&body.plant_id, &body.space_id)?;
    Ok(Json(Mutation { sync_ids }))
}

pub async fn clear_handler(
    State(app_state): State<AppState>,
    Json(body): Json<SpaceBody>,
) -> ApiResult<Mutation> {
    let sync_ids = app_state.controller.clear(&body.space_id)?;
    Ok(Json(Mutation { sync_ids }))
}

pub async fn care_handler(
    State(app_state): State<AppState>,
    Json(body): Json<CareBody>,
) -> ApiResult<Mutation> {
    let sync_ids = app_state.controller.record_care(&body.space_id, body.kind)?;
    Ok(Json(Mutation { sync_ids }))
}

pub async fn suggestions_handler(
    State(app_state): State<AppState>,
    Json(body): Json<SuggestionsBody>,
) -> ApiResult<Mutation> {
    let sync_ids = app_state.controller.attach_suggestions(
        &body.space_id,
        body.suggestions,
        body.image_ref,
    )?;
    Ok(Json(Mutation { sync_ids }))
}

pub async fn validate_handler(
    State(app_state): State<AppState>,
    Json(body): Json<TargetBody>,
) -> ApiResult<DropVerdict> {
    Ok(Json(
        app_state
            .controller
            .validate_drop(&body.plant_id, &body.space_id)?,
    ))
}

pub async fn drag_start_handler(
    State(app_state): State<AppState>,
    Json(body): Json<PlantBody>,
) -> ApiResult<DragSession> {
    Ok(Json(app_state.controller.begin_drag(&body.plant_id)?))
}

pub async fn drag_hover_handler(
    State(app_state): State<AppState>,
    Json(body): Json<HoverBody>,
) -> ApiResult<HoverResponse> {
    let verdict = app_state.controller.hover(body.space_id)?;
    Ok(Json(HoverResponse { verdict }))
}

pub async fn drag_drop_handler(
    State(app_state): State<AppState>,
    Json(body): Json<SpaceBody>,
) -> ApiResult<Mutation> {
    let sync_ids = app_state.controller.drop_on(body.space_id)?;
    Ok(Json(Mutation { sync_ids }))
}

pub async fn drag_cancel_handler(State(app_state): State<AppState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: app_state.controller.cancel_drag(),
    })
}

pub async fn purchase_handler(
    State(app_state): State<AppState>,
    Json(body): Json<PurchaseBody>,
) -> ApiResult<PurchaseReceipt> {
    Ok(Json(app_state.purchases.purchase(body.count).await?))
}

pub async fn refresh_handler(State(app_state): State<AppState>) -> ApiResult<ReconcileReport> {
    Ok(Json(app_state.controller.refresh().await?))
}

pub async fn tier_handler(
    State(app_state): State<AppState>,
    Json(body): Json<TierBody>,
) -> Json<ReconcileReport> {
    Json(app_state.controller.set_tier(body.tier))
}

pub async fn sync_history_handler(State(app_state): State<AppState>) -> Json<Vec<SyncOutcome>> {
    Json(app_state.session().history())
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.session().subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(outcome) => {
                    let data = serde_json::to_string(&outcome).unwrap_or_default();
                    yield Ok(Event::default().event("sync").data(data));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "sync stream subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use garden_core::test_fixtures::{basic_garden, garden_id, plants, stored_space};
    use garden_sync::{GardenSession, InMemoryStore, SeedFile, SimulatedGateway, SyncConfig};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn make_test_state(gateway: SimulatedGateway) -> AppState {
        let store = Arc::new(InMemoryStore::from_seed(SeedFile {
            gardens: vec![basic_garden()],
            plants: plants(&["plant_a", "plant_b"]),
            spaces: vec![
                stored_space("space_0001", "1,1", Some("plant_a")),
                stored_space("space_0002", "1,2", None),
            ],
        }));
        let session = GardenSession::open(store, garden_id(), SyncConfig::default())
            .await
            .unwrap();
        AppState::new(session, gateway)
    }

    async fn test_app() -> Router {
        make_router(make_test_state(SimulatedGateway::approving()).await)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_garden_reports_capacity() {
        let response = test_app().await.oneshot(get_request("/api/v1/garden")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["total_capacity"], 9);
        assert_eq!(json["space_count"], 9);
        assert_eq!(json["occupied"], 1);
        assert_eq!(json["tier"], "basic");
    }

    #[tokio::test]
    async fn test_grid_lists_every_space() {
        let response = test_app().await.oneshot(get_request("/api/v1/grid")).await.unwrap();
        let json = json_body(response).await;
        let spaces = json.as_array().unwrap();
        assert_eq!(spaces.len(), 9);
        assert_eq!(spaces[0]["state"], "persisted");
        assert_eq!(spaces[0]["space"]["position"], "1,1");
        assert_eq!(spaces[2]["state"], "placeholder");
    }

    #[tokio::test]
    async fn test_plants_show_placement() {
        let response = test_app().await.oneshot(get_request("/api/v1/plants")).await.unwrap();
        let json = json_body(response).await;
        let a = json
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == "plant_a")
            .unwrap()
            .clone();
        assert_eq!(a["placed"], true);
        assert_eq!(a["space_id"], "space_0001");
    }

    #[tokio::test]
    async fn test_place_returns_sync_ids() {
        let response = test_app()
            .await
            .oneshot(post_json(
                "/api/v1/place",
                serde_json::json!({"plant_id": "plant_b", "space_id": "space_0002"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["sync_ids"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_on_occupied_space_is_conflict() {
        let response = test_app()
            .await
            .oneshot(post_json(
                "/api/v1/place",
                serde_json::json!({"plant_id": "plant_b", "space_id": "space_0001"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("occupied"));
    }

    #[tokio::test]
    async fn test_unknown_space_is_not_found() {
        let response = test_app()
            .await
            .oneshot(post_json(
                "/api/v1/clear",
                serde_json::json!({"space_id": "space_nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_drag_session_round_trip() {
        let app = test_app().await;

        let start = app
            .clone()
            .oneshot(post_json("/api/v1/drag/start", serde_json::json!({"plant_id": "plant_a"})))
            .await
            .unwrap();
        assert_eq!(start.status(), StatusCode::OK);

        let again = app
            .clone()
            .oneshot(post_json("/api/v1/drag/start", serde_json::json!({"plant_id": "plant_b"})))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let hover = app
            .clone()
            .oneshot(post_json("/api/v1/drag/hover", serde_json::json!({"space_id": "space_0002"})))
            .await
            .unwrap();
        assert_eq!(json_body(hover).await["verdict"]["verdict"], "allowed");

        let dropped = app
            .clone()
            .oneshot(post_json("/api/v1/drag/drop", serde_json::json!({"space_id": "space_0002"})))
            .await
            .unwrap();
        assert_eq!(dropped.status(), StatusCode::OK);
        assert_eq!(json_body(dropped).await["sync_ids"].as_array().unwrap().len(), 2);

        let plants = app.oneshot(get_request("/api/v1/plants")).await.unwrap();
        let json = json_body(plants).await;
        let a = json
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == "plant_a")
            .unwrap()
            .clone();
        assert_eq!(a["space_id"], "space_0002");
    }

    #[tokio::test]
    async fn test_drop_without_drag_is_unprocessable() {
        let response = test_app()
            .await
            .oneshot(post_json("/api/v1/drag/drop", serde_json::json!({"space_id": "space_0002"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_purchase_extends_capacity() {
        let app = test_app().await;
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/purchase", serde_json::json!({"count": 2})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let receipt = json_body(response).await;
        assert_eq!(receipt["purchased_extra_spaces"], 2);
        assert_eq!(receipt["total_capacity"], 11);

        let grid = app.oneshot(get_request("/api/v1/grid")).await.unwrap();
        assert_eq!(json_body(grid).await.as_array().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_declined_purchase_is_payment_required() {
        let app = make_router(make_test_state(SimulatedGateway::declining()).await);
        let response = app
            .oneshot(post_json("/api/v1/purchase", serde_json::json!({"count": 2})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_zero_purchase_is_unprocessable() {
        let response = test_app()
            .await
            .oneshot(post_json("/api/v1/purchase", serde_json::json!({"count": 0})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_tier_change_regrows_grid() {
        let app = test_app().await;
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/tier", serde_json::json!({"tier": "premium"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let garden = app.oneshot(get_request("/api/v1/garden")).await.unwrap();
        let json = json_body(garden).await;
        assert_eq!(json["space_count"], 36);
        assert_eq!(json["occupied"], 1);
    }

    #[tokio::test]
    async fn test_sync_history_after_refresh() {
        let state = make_test_state(SimulatedGateway::approving()).await;
        let app = make_router(state.clone());
        app.clone()
            .oneshot(post_json("/api/v1/clear", serde_json::json!({"space_id": "space_0001"})))
            .await
            .unwrap();

        let refresh = app
            .clone()
            .oneshot(post_json("/api/v1/refresh", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(refresh.status(), StatusCode::OK);

        let history = app.oneshot(get_request("/api/v1/sync")).await.unwrap();
        let json = json_body(history).await;
        let outcomes = json.as_array().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0]["status"]["status"], "succeeded");
        assert_eq!(outcomes[0]["action"]["request"]["type"], "remove");
        assert_eq!(state.session().read(|grid| grid.occupancy().occupied_count()), 0);
    }
}
