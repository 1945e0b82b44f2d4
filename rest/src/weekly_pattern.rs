use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rest_types::{BulkReplacePatternsRequestTO, BulkReplaceOutcomeTO, NewWeeklyPatternTO, WeeklyPatternDeltaTO, WeeklyPatternTO};
use service::weekly_pattern::WeeklyPatternService;
use tracing::instrument;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::{error_handler, resolve_active_consultant, RestStateDef};

pub fn generate_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new()
        .route("/", get(list_patterns::<RestState>))
        .route("/", post(create_pattern::<RestState>))
        .route("/{id}", put(update_pattern::<RestState>))
        .route("/{id}", delete(delete_pattern::<RestState>))
        .route("/bulk", post(bulk_replace_patterns::<RestState>))
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    get,
    path = "/",
    tags = ["Weekly Patterns"],
    params(("slug", description = "Consultant slug")),
    responses(
        (status = 200, description = "Patterns for this consultant", body = [WeeklyPatternTO]),
        (status = 404, description = "Unknown or inactive consultant"),
    ),
)]
pub async fn list_patterns<RestState: RestStateDef>(rest_state: State<RestState>, Path(slug): Path<String>) -> Response {
    error_handler(
        (async {
            let consultant_id = resolve_active_consultant(&rest_state, &slug).await?;
            let patterns: Vec<WeeklyPatternTO> = rest_state
                .weekly_pattern_service()
                .list_patterns(consultant_id, None)
                .await?
                .iter()
                .map(WeeklyPatternTO::from)
                .collect();
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&patterns).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    post,
    path = "/",
    tags = ["Weekly Patterns"],
    params(("slug", description = "Consultant slug")),
    request_body = NewWeeklyPatternTO,
    responses(
        (status = 201, description = "Pattern created", body = WeeklyPatternTO),
        (status = 400, description = "Invalid input or overlapping range"),
        (status = 404, description = "Unknown or inactive consultant"),
    ),
)]
pub async fn create_pattern<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Path(slug): Path<String>,
    Json(new_pattern): Json<NewWeeklyPatternTO>,
) -> Response {
    error_handler(
        (async {
            let consultant_id = resolve_active_consultant(&rest_state, &slug).await?;
            let new_pattern = service::weekly_pattern::NewWeeklyPattern::try_from(&new_pattern)?;
            let pattern = WeeklyPatternTO::from(
                &rest_state
                    .weekly_pattern_service()
                    .create_pattern(consultant_id, slug.into(), new_pattern, None)
                    .await?,
            );
            Ok(Response::builder()
                .status(201)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&pattern).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Weekly Patterns"],
    params(
        ("slug", description = "Consultant slug"),
        ("id", description = "Pattern id"),
    ),
    request_body = WeeklyPatternDeltaTO,
    responses(
        (status = 200, description = "Pattern updated", body = WeeklyPatternTO),
        (status = 400, description = "Invalid input or overlapping range"),
        (status = 404, description = "Unknown consultant or pattern"),
    ),
)]
pub async fn update_pattern<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Path((slug, id)): Path<(String, Uuid)>,
    Json(delta): Json<WeeklyPatternDeltaTO>,
) -> Response {
    error_handler(
        (async {
            let consultant_id = resolve_active_consultant(&rest_state, &slug).await?;
            let delta = service::weekly_pattern::WeeklyPatternDelta::try_from(&delta)?;
            let pattern = WeeklyPatternTO::from(
                &rest_state
                    .weekly_pattern_service()
                    .update_pattern(consultant_id, slug.into(), id, delta, None)
                    .await?,
            );
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&pattern).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Weekly Patterns"],
    params(
        ("slug", description = "Consultant slug"),
        ("id", description = "Pattern id"),
    ),
    responses(
        (status = 204, description = "Pattern deleted and dependent unbooked slots blocked"),
        (status = 404, description = "Unknown consultant or pattern"),
    ),
)]
pub async fn delete_pattern<RestState: RestStateDef>(rest_state: State<RestState>, Path((slug, id)): Path<(String, Uuid)>) -> Response {
    error_handler(
        (async {
            let consultant_id = resolve_active_consultant(&rest_state, &slug).await?;
            rest_state.weekly_pattern_service().delete_pattern(consultant_id, slug.into(), id, None).await?;
            Ok(Response::builder().status(204).body(Body::empty()).unwrap())
        })
        .await,
    )
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    post,
    path = "/bulk",
    tags = ["Weekly Patterns"],
    params(("slug", description = "Consultant slug")),
    request_body = BulkReplacePatternsRequestTO,
    responses(
        (status = 200, description = "Patterns replaced atomically", body = BulkReplaceOutcomeTO),
        (status = 400, description = "Invalid input"),
        (status = 423, description = "Another bulk replace is in progress, retry after backoff"),
        (status = 404, description = "Unknown or inactive consultant"),
    ),
)]
pub async fn bulk_replace_patterns<RestState: RestStateDef>(
    rest_state: State<RestState>,
    Path(slug): Path<String>,
    Json(request): Json<BulkReplacePatternsRequestTO>,
) -> Response {
    error_handler(
        (async {
            let consultant_id = resolve_active_consultant(&rest_state, &slug).await?;
            let new_patterns = request
                .patterns
                .iter()
                .map(service::weekly_pattern::NewWeeklyPattern::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            let outcome = BulkReplaceOutcomeTO::from(
                &rest_state
                    .weekly_pattern_service()
                    .bulk_replace_patterns(consultant_id, slug.into(), new_patterns)
                    .await?,
            );
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&outcome).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(list_patterns, create_pattern, update_pattern, delete_pattern, bulk_replace_patterns),
    components(schemas(WeeklyPatternTO, NewWeeklyPatternTO, WeeklyPatternDeltaTO, BulkReplacePatternsRequestTO, BulkReplaceOutcomeTO))
)]
pub struct WeeklyPatternApiDoc;
