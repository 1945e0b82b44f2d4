use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{delete, post};
use axum::{Json, Router};
use rest_types::{BookingRequestTO, SessionTO};
use service::session::{BookingRequest, BookingService};
use tracing::instrument;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::{error_handler, resolve_active_consultant, RestStateDef};

pub fn generate_route<RestState: RestStateDef>() -> Router<RestState> {
    Router::new()
        .route("/book", post(book_session::<RestState>))
        .route("/", post(create_session::<RestState>))
        .route("/consultants/{slug}/{id}", delete(cancel_session::<RestState>))
}

/// Public booking admission (§4.6). `source` on the wire is ignored and
/// always forced to `public_booking`: only this route is reachable without
/// any form of operator context.
#[instrument(skip(rest_state))]
#[utoipa::path(
    post,
    path = "/book",
    tags = ["Sessions"],
    request_body = BookingRequestTO,
    responses(
        (status = 201, description = "Session booked", body = SessionTO),
        (status = 400, description = "Invalid input, e.g. requested time is not in the future"),
        (status = 404, description = "Unknown or inactive consultant"),
        (status = 409, description = "Slot already taken"),
    ),
)]
pub async fn book_session<RestState: RestStateDef>(rest_state: State<RestState>, Json(request): Json<BookingRequestTO>) -> Response {
    error_handler(
        (async {
            let mut request = BookingRequest::try_from(&request)?;
            request.source = service::session::BookingSource::PublicBooking;
            let session = SessionTO::from(&rest_state.booking_service().book(request).await?);
            Ok(Response::builder()
                .status(201)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&session).unwrap()))
                .unwrap())
        })
        .await,
    )
}

/// Authenticated session creation against an existing slot (§6): same
/// admission path as `book_session`, but the caller supplies `source`
/// (`manually_added` or `naksha_platform`) rather than having it forced.
#[instrument(skip(rest_state))]
#[utoipa::path(
    post,
    path = "/",
    tags = ["Sessions"],
    request_body = BookingRequestTO,
    responses(
        (status = 201, description = "Session created", body = SessionTO),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Unknown or inactive consultant"),
        (status = 409, description = "Slot already taken"),
    ),
)]
pub async fn create_session<RestState: RestStateDef>(rest_state: State<RestState>, Json(request): Json<BookingRequestTO>) -> Response {
    error_handler(
        (async {
            let request = BookingRequest::try_from(&request)?;
            let session = SessionTO::from(&rest_state.booking_service().book(request).await?);
            Ok(Response::builder()
                .status(201)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&session).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[instrument(skip(rest_state))]
#[utoipa::path(
    delete,
    path = "/consultants/{slug}/{id}",
    tags = ["Sessions"],
    params(
        ("slug", description = "Consultant slug"),
        ("id", description = "Session id"),
    ),
    responses(
        (status = 200, description = "Session cancelled and slot released", body = SessionTO),
        (status = 404, description = "Unknown consultant or session"),
    ),
)]
pub async fn cancel_session<RestState: RestStateDef>(rest_state: State<RestState>, Path((slug, id)): Path<(String, Uuid)>) -> Response {
    error_handler(
        (async {
            let consultant_id = resolve_active_consultant(&rest_state, &slug).await?;
            let session = SessionTO::from(&rest_state.booking_service().cancel(consultant_id, slug.into(), id).await?);
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(Body::new(serde_json::to_string(&session).unwrap()))
                .unwrap())
        })
        .await,
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(book_session, create_session, cancel_session),
    components(schemas(BookingRequestTO, SessionTO))
)]
pub struct SessionApiDoc;
