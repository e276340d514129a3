use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::poll::{CreatePollRequest, JoinPollRequest, PollAccessResponse, PollSnapshot},
    error::AppError,
    services::poll_service,
    state::SharedState,
};

/// Routes handling poll bootstrap operations (creation & joining).
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/polls", post(create_poll))
        .route("/polls/join", post(join_poll))
}

/// Create a fresh poll and hand back the admin's access token.
#[utoipa::path(
    post,
    path = "/polls",
    tag = "polls",
    request_body = CreatePollRequest,
    responses(
        (status = 200, description = "Poll created", body = PollAccessResponse)
    )
)]
pub async fn create_poll(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreatePollRequest>>,
) -> Result<Json<PollAccessResponse>, AppError> {
    let (poll, access_token) = poll_service::create_poll(&state, payload).await?;
    Ok(Json(PollAccessResponse {
        poll: PollSnapshot::from(&poll),
        access_token,
    }))
}

/// Issue an access token for an existing, still-joinable poll.
#[utoipa::path(
    post,
    path = "/polls/join",
    tag = "polls",
    request_body = JoinPollRequest,
    responses(
        (status = 200, description = "Token issued", body = PollAccessResponse)
    )
)]
pub async fn join_poll(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinPollRequest>>,
) -> Result<Json<PollAccessResponse>, AppError> {
    let (poll, access_token) = poll_service::authorize_join(&state, payload).await?;
    Ok(Json(PollAccessResponse {
        poll: PollSnapshot::from(&poll),
        access_token,
    }))
}
