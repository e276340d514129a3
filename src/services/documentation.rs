use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Rankwave Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::polls::create_poll,
        crate::routes::polls::join_poll,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::poll::CreatePollRequest,
            crate::dto::poll::JoinPollRequest,
            crate::dto::poll::PollAccessResponse,
            crate::dto::poll::PollSnapshot,
            crate::dto::poll::NominationView,
            crate::dto::poll::ResultEntryView,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "polls", description = "Poll creation and join operations"),
        (name = "realtime", description = "WebSocket operations for poll participants"),
    )
)]
pub struct ApiDoc;
