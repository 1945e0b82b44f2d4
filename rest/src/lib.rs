use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use axum::Router;
use thiserror::Error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub mod availability_slot;
pub mod session;
pub mod weekly_pattern;

/// HTTP-facing error taxonomy (§7). Every `ServiceError` variant maps onto
/// exactly one status here; the mapping is the only place that knows the
/// wire-level status codes.
#[derive(Debug, Error)]
pub enum RestError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error("pattern overlap: {0}")]
    Overlap(String),
    #[error("slot already taken")]
    SlotTaken,
    #[error("busy, retry after backoff")]
    Busy,
    #[error("deadline exceeded")]
    Deadline,
    #[error("infrastructure failure: {0}")]
    Infra(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("path id {path} does not match body id {body}")]
    InconsistentId { path: Uuid, body: Uuid },
}

impl From<service::ServiceError> for RestError {
    fn from(err: service::ServiceError) -> Self {
        match err {
            service::ServiceError::BadInput(msg) => RestError::BadRequest(msg),
            service::ServiceError::NotFound => RestError::NotFound,
            service::ServiceError::Overlap(msg) => RestError::Overlap(msg),
            service::ServiceError::SlotTaken => RestError::SlotTaken,
            service::ServiceError::Busy => RestError::Busy,
            service::ServiceError::Deadline => RestError::Deadline,
            service::ServiceError::Infra(msg) => RestError::Infra(msg),
            service::ServiceError::Internal(msg) => RestError::Internal(msg),
        }
    }
}

fn error_handler(result: Result<Response, RestError>) -> Response {
    match result {
        Ok(response) => response,
        Err(err @ RestError::BadRequest(_)) => status_body(400, &err),
        Err(err @ RestError::NotFound) => status_body(404, &err),
        Err(err @ RestError::Overlap(_)) => status_body(400, &err),
        Err(err @ RestError::SlotTaken) => status_body(409, &err),
        Err(err @ RestError::Busy) => status_body(423, &err),
        Err(err @ RestError::Deadline) => status_body(504, &err),
        Err(err @ RestError::Infra(_)) => status_body(503, &err),
        Err(err @ RestError::Internal(_)) => {
            tracing::error!(error = %err, "internal invariant broken");
            status_body(500, &err)
        }
        Err(err @ RestError::InconsistentId { .. }) => status_body(400, &err),
    }
}

fn status_body(status: u16, err: &RestError) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::new(serde_json::to_string(&serde_json::json!({ "error": err.to_string() })).unwrap()))
        .unwrap()
}

/// Dependency accessor surface the router assembly needs from the binary
/// crate. One associated type plus one `Arc`-returning accessor per service,
/// mirroring how the binary crate's `RestStateImpl` wires its DAOs and
/// service impls together.
pub trait RestStateDef: Clone + Send + Sync + 'static {
    type WeeklyPatternService: service::weekly_pattern::WeeklyPatternService + Send + Sync + 'static;
    type SlotGeneratorService: service::availability_slot::SlotGeneratorService + Send + Sync + 'static;
    type QueryFacadeService: service::availability_slot::QueryFacadeService + Send + Sync + 'static;
    type BookingService: service::session::BookingService + Send + Sync + 'static;
    type ConsultantDirectory: service::ConsultantDirectory + Send + Sync + 'static;

    fn backend_version(&self) -> Arc<str>;
    fn weekly_pattern_service(&self) -> Arc<Self::WeeklyPatternService>;
    fn slot_generator_service(&self) -> Arc<Self::SlotGeneratorService>;
    fn query_facade_service(&self) -> Arc<Self::QueryFacadeService>;
    fn booking_service(&self) -> Arc<Self::BookingService>;
    fn consultant_directory(&self) -> Arc<Self::ConsultantDirectory>;
}

/// Resolves a public slug to `(consultant_id, is_active)`, failing
/// `NotFound` for an unknown or inactive consultant. Every router in this
/// crate is slug-addressed; none of them take a raw `consultant_id` from the
/// wire, since consultant identity/ownership lives outside this core (§3).
async fn resolve_active_consultant<RestState: RestStateDef>(
    rest_state: &RestState,
    slug: &str,
) -> Result<Uuid, RestError> {
    let (consultant_id, is_active) = rest_state
        .consultant_directory()
        .resolve_slug(slug)
        .await?
        .ok_or(service::ServiceError::NotFound)?;
    if !is_active {
        return Err(RestError::NotFound);
    }
    Ok(consultant_id)
}

#[derive(OpenApi)]
#[openapi(
    nest(
        (path = "/availability/consultants/{slug}/patterns", api = weekly_pattern::WeeklyPatternApiDoc),
        (path = "/availability/consultants/{slug}", api = availability_slot::GenerateSlotsApiDoc),
        (path = "/availability/slots", api = availability_slot::PublicSlotApiDoc),
        (path = "/sessions", api = session::SessionApiDoc),
    )
)]
struct ApiDoc;

pub async fn start_server<RestState: RestStateDef>(rest_state: RestState) {
    let app = Router::new()
        .nest("/availability/consultants/{slug}/patterns", weekly_pattern::generate_route::<RestState>())
        .nest("/availability/consultants/{slug}", availability_slot::generate_route::<RestState>())
        .nest("/availability/slots", availability_slot::public_route::<RestState>())
        .nest("/sessions", session::generate_route::<RestState>())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(rest_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.expect("could not bind server");
    axum::serve(listener, app).await.expect("could not start server");
}
