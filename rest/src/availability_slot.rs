use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use rest_types::{GenerateSlotsRequestTO, GenerateSlotsResponseTO, ListSlotsQueryTO, SlotPageTO};
use service::availability_slot::{ListSlotsQuery, QueryFacadeService, SlotGeneratorService};
use time::format_description::well_known::Iso8601;
use tracing::instrument;
use utoipa::OpenApi;

use crate::{error_handler, resolve_active_consultant, RestStateDef};

/// Mounted under `/availability/consultants/{slug}` alongside the pattern
/// routes (§6: authenticated generation triggered against this consultant).
pub fn generate_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new().route("/generate-slots", post(generate_slots::<RestState>))
}

/// Mounted at `/availability/slots/{slug}` (§4.8, §6: public paginated slot
/// listing, no auth boundary).
pub fn public_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new().route("/{slug}", get(list_slots::<RestState>))
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    post,
    path = "/generate-slots",
    tags = ["Availability Slots"],
    params(("slug", description = "Consultant slug")),
    request_body = GenerateSlotsRequestTO,
    responses(
        (status = 200, description = "Slots materialized", body = GenerateSlotsResponseTO),
        (status = 400, description = "Invalid input or horizon exceeds the cap"),
        (status = 404, description = "Unknown or inactive consultant"),
    ),
)]
pub async fn generate_slots<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Path(slug): Path<String>,
    axum::Json(request): axum::Json<GenerateSlotsRequestTO>,
) -> Response {
    error_handler(
        (async {
            let consultant_id = resolve_active_consultant(&rest_state, &slug).await?;
            let start_date = time::Date::parse(&request.start_date, &Iso8601::DATE)
                .map_err(|e| service::ServiceError::BadInput(format!("invalid start_date: {e}")))?;
            let end_date = time::Date::parse(&request.end_date, &Iso8601::DATE)
                .map_err(|e| service::ServiceError::BadInput(format!("invalid end_date: {e}")))?;
            let session_type = request
                .session_type
                .as_deref()
                .map(|s| s.parse::<core_utils::SessionType>())
                .transpose()
                .map_err(|e| service::ServiceError::BadInput(e.to_string()))?;
            let inserted = rest_state
                .slot_generator_service()
                .generate(consultant_id, start_date, end_date, session_type, None)
                .await?;
            let response = GenerateSlotsResponseTO { inserted };
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&response).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    get,
    path = "/{slug}",
    tags = ["Availability Slots"],
    params(ListSlotsQueryTO, ("slug", description = "Consultant slug")),
    responses(
        (status = 200, description = "Page of bookable slots", body = SlotPageTO),
        (status = 400, description = "Invalid query parameters"),
        (status = 404, description = "Unknown or inactive consultant"),
    ),
)]
pub async fn list_slots<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Path(slug): Path<String>,
    Query(params): Query<ListSlotsQueryTO>,
) -> Response {
    error_handler(
        (async {
            let query = ListSlotsQuery::try_from(&params)?;
            let page = SlotPageTO::from(&rest_state.query_facade_service().list_slots(slug.into(), query).await?);
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&page).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(generate_slots),
    components(schemas(GenerateSlotsRequestTO, GenerateSlotsResponseTO))
)]
pub struct GenerateSlotsApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(list_slots),
    components(schemas(SlotPageTO))
)]
pub struct PublicSlotApiDoc;
