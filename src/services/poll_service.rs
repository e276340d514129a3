use std::{collections::HashSet, future::Future, time::Duration};

use rand::Rng;
use tokio::time::timeout;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        models::{NominationEntity, PollEntity},
        poll::PollRepository,
    },
    dto::{
        poll::{CreatePollRequest, JoinPollRequest},
        validation::POLL_CODE_LENGTH,
    },
    error::ServiceError,
    services::{
        tally,
        token_service::{self, ParticipantClaims},
        ws_events,
    },
    state::{SharedState, phase},
};

/// Hard deadline for one coordinator operation, store awaits included.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_NOMINATION_TEXT_LEN: usize = 100;

/// Identity attached to an authenticated connection.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Poll the connection is bound to.
    pub poll_id: String,
    /// Stable participant identifier.
    pub participant_id: String,
    /// Display name.
    pub name: String,
}

impl From<ParticipantClaims> for SessionContext {
    fn from(claims: ParticipantClaims) -> Self {
        Self {
            poll_id: claims.poll_id,
            participant_id: claims.participant_id,
            name: claims.name,
        }
    }
}

/// Create a fresh poll and issue the creator's admin token.
///
/// The creator only lands in `participants` once their WebSocket joins, so a
/// lost socket right after creation leaves nothing to clean up but the TTL.
pub async fn create_poll(
    state: &SharedState,
    request: CreatePollRequest,
) -> Result<(PollEntity, String), ServiceError> {
    let repository = state.repository().await?;
    let poll_id = generate_poll_code();
    let participant_id = generate_participant_id();

    let poll = repository
        .create_poll(
            &poll_id,
            request.topic.trim(),
            request.votes_per_voter,
            &participant_id,
        )
        .await?;

    let token = token_service::issue(
        state.config().token_secret(),
        &ParticipantClaims {
            poll_id: poll_id.clone(),
            participant_id,
            name: request.name,
        },
    );

    info!(poll_id = %poll.id, "created poll");
    Ok((poll, token))
}

/// Check a poll is joinable and issue a participant token for it.
///
/// The participant entry itself is created by the WebSocket `join`, which is
/// idempotent, so a token can be re-presented after a page refresh.
pub async fn authorize_join(
    state: &SharedState,
    request: JoinPollRequest,
) -> Result<(PollEntity, String), ServiceError> {
    let repository = state.repository().await?;
    let poll = repository.get_poll(&request.poll_id).await?;
    phase::ensure_lobby(&poll)?;

    let token = token_service::issue(
        state.config().token_secret(),
        &ParticipantClaims {
            poll_id: request.poll_id,
            participant_id: generate_participant_id(),
            name: request.name,
        },
    );

    Ok((poll, token))
}

/// Add (or confirm) the caller as a participant and broadcast the snapshot.
///
/// Idempotent for a participant already in the poll, which is how reconnection
/// works; brand-new participants are only admitted while the lobby is open.
pub async fn join(state: &SharedState, ctx: &SessionContext) -> Result<PollEntity, ServiceError> {
    mutate(state, &ctx.poll_id, |repository| async move {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        if !poll.participants.contains_key(&ctx.participant_id)
            && poll.admin_id != ctx.participant_id
        {
            phase::ensure_lobby(&poll)?;
        }
        repository
            .add_participant(&ctx.poll_id, &ctx.participant_id, &ctx.name)
            .await
    })
    .await
}

/// Propose a nomination while the lobby is open.
pub async fn nominate(
    state: &SharedState,
    ctx: &SessionContext,
    text: &str,
) -> Result<PollEntity, ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::InvalidInput(
            "nomination text must not be empty".into(),
        ));
    }
    if text.len() > MAX_NOMINATION_TEXT_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "nomination text must not exceed {MAX_NOMINATION_TEXT_LEN} characters"
        )));
    }

    mutate(state, &ctx.poll_id, |repository| async move {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;
        phase::ensure_lobby(&poll)?;

        let nomination_id = generate_nomination_id();
        repository
            .add_nomination(
                &ctx.poll_id,
                &nomination_id,
                NominationEntity {
                    user_id: ctx.participant_id.clone(),
                    text: text.to_owned(),
                },
            )
            .await
    })
    .await
}

/// Withdraw a nomination; allowed for its author or the admin, lobby only.
pub async fn remove_nomination(
    state: &SharedState,
    ctx: &SessionContext,
    nomination_id: &str,
) -> Result<PollEntity, ServiceError> {
    mutate(state, &ctx.poll_id, |repository| async move {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;
        phase::ensure_lobby(&poll)?;

        let Some(nomination) = poll.nominations.get(nomination_id) else {
            return Err(ServiceError::NotFound(format!(
                "nomination `{nomination_id}` not found"
            )));
        };
        if nomination.user_id != ctx.participant_id && poll.admin_id != ctx.participant_id {
            return Err(ServiceError::Unauthorized(
                "only the author or the admin may remove a nomination".into(),
            ));
        }

        repository
            .remove_nomination(&ctx.poll_id, nomination_id)
            .await
    })
    .await
}

/// Kick a participant (admin only); their stored ballot is left untouched.
pub async fn remove_participant(
    state: &SharedState,
    ctx: &SessionContext,
    target_id: &str,
) -> Result<PollEntity, ServiceError> {
    let poll = mutate(state, &ctx.poll_id, |repository| async move {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;
        phase::ensure_admin(&poll, &ctx.participant_id)?;
        if target_id == poll.admin_id {
            return Err(ServiceError::Unauthorized(
                "the admin cannot be removed from the poll".into(),
            ));
        }
        if !poll.participants.contains_key(target_id) {
            return Err(ServiceError::NotFound(format!(
                "participant `{target_id}` not found"
            )));
        }

        repository.remove_participant(&ctx.poll_id, target_id).await
    })
    .await?;

    // Cut the kicked participant's connections once the final snapshot
    // (without them) has been queued for everyone.
    ws_events::disconnect_participant(state, &ctx.poll_id, target_id);
    Ok(poll)
}

/// Latch the poll into the voting phase (admin only).
pub async fn start_vote(
    state: &SharedState,
    ctx: &SessionContext,
) -> Result<PollEntity, ServiceError> {
    mutate(state, &ctx.poll_id, |repository| async move {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;
        phase::ensure_admin(&poll, &ctx.participant_id)?;
        phase::ensure_lobby(&poll)?;

        if poll.nominations.len() < poll.votes_per_voter {
            return Err(ServiceError::InvalidInput(format!(
                "not enough nominations to start the vote (have {}, need {})",
                poll.nominations.len(),
                poll.votes_per_voter
            )));
        }

        repository.set_has_started(&ctx.poll_id).await
    })
    .await
}

/// Store or overwrite the caller's ballot while voting is open.
pub async fn submit_rankings(
    state: &SharedState,
    ctx: &SessionContext,
    ballot: Vec<String>,
) -> Result<PollEntity, ServiceError> {
    mutate(state, &ctx.poll_id, |repository| async move {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;
        phase::ensure_voting(&poll)?;
        validate_ballot(&poll, &ballot)?;

        repository
            .add_ranking(&ctx.poll_id, &ctx.participant_id, ballot)
            .await
    })
    .await
}

/// Close voting, compute the tally, and publish it (admin only).
pub async fn close_poll(
    state: &SharedState,
    ctx: &SessionContext,
) -> Result<PollEntity, ServiceError> {
    mutate(state, &ctx.poll_id, |repository| async move {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;
        phase::ensure_admin(&poll, &ctx.participant_id)?;
        phase::ensure_voting(&poll)?;

        let results = tally::compute_results(&poll.nominations, &poll.rankings);
        repository.set_results(&ctx.poll_id, results).await
    })
    .await
}

/// Tear the poll down (admin only): delete the record, notify, disconnect.
pub async fn cancel_poll(state: &SharedState, ctx: &SessionContext) -> Result<(), ServiceError> {
    let repository = state.repository().await?;
    let room = state.rooms().room(&ctx.poll_id);
    let gate = room.gate().lock().await;

    let outcome = timeout(OP_TIMEOUT, async {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;
        phase::ensure_admin(&poll, &ctx.participant_id)?;
        repository.delete_poll(&ctx.poll_id).await
    })
    .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            drop(gate);
            return Err(err);
        }
        Err(_) => {
            drop(gate);
            return Err(ServiceError::Timeout);
        }
    }

    info!(poll_id = %ctx.poll_id, "poll cancelled");
    ws_events::broadcast_poll_cancelled(state, &ctx.poll_id);
    drop(gate);
    Ok(())
}

/// Leave the poll. The admin leaving cancels it; the last participant leaving
/// deletes the abandoned record.
pub async fn leave(state: &SharedState, ctx: &SessionContext) -> Result<(), ServiceError> {
    enum Departure {
        Updated(PollEntity),
        Terminated,
    }

    let repository = state.repository().await?;
    let room = state.rooms().room(&ctx.poll_id);
    let gate = room.gate().lock().await;

    let outcome = timeout(OP_TIMEOUT, async {
        let poll = repository.get_poll(&ctx.poll_id).await?;
        phase::ensure_participant(&poll, &ctx.participant_id)?;

        if poll.admin_id == ctx.participant_id {
            repository.delete_poll(&ctx.poll_id).await?;
            return Ok(Departure::Terminated);
        }

        let updated = repository
            .remove_participant(&ctx.poll_id, &ctx.participant_id)
            .await?;
        if updated.participants.is_empty() {
            repository.delete_poll(&ctx.poll_id).await?;
            return Ok(Departure::Terminated);
        }
        Ok(Departure::Updated(updated))
    })
    .await;

    let departure = match outcome {
        Ok(Ok(departure)) => departure,
        Ok(Err(err)) => {
            drop(gate);
            return Err(err);
        }
        Err(_) => {
            drop(gate);
            return Err(ServiceError::Timeout);
        }
    };

    match departure {
        Departure::Updated(poll) => ws_events::broadcast_poll_updated(state, &poll),
        Departure::Terminated => {
            info!(poll_id = %ctx.poll_id, "poll torn down on leave");
            ws_events::broadcast_poll_cancelled(state, &ctx.poll_id);
        }
    }
    drop(gate);
    Ok(())
}

/// Run one mutation under the poll's gate and broadcast the updated snapshot.
///
/// The gate is held across every store await and the broadcast itself, so
/// subscribers observe snapshots in commit order and check-then-act sequences
/// in `work` cannot interleave with another writer of the same poll.
async fn mutate<F, Fut>(
    state: &SharedState,
    poll_id: &str,
    work: F,
) -> Result<PollEntity, ServiceError>
where
    F: FnOnce(PollRepository) -> Fut,
    Fut: Future<Output = Result<PollEntity, ServiceError>>,
{
    let repository = state.repository().await?;
    let room = state.rooms().room(poll_id);
    let gate = room.gate().lock().await;

    let poll = match timeout(OP_TIMEOUT, work(repository)).await {
        Ok(result) => match result {
            Ok(poll) => poll,
            Err(err) => {
                drop(gate);
                return Err(err);
            }
        },
        Err(_) => {
            drop(gate);
            return Err(ServiceError::Timeout);
        }
    };

    ws_events::broadcast_poll_updated(state, &poll);
    drop(gate);
    Ok(poll)
}

fn validate_ballot(poll: &PollEntity, ballot: &[String]) -> Result<(), ServiceError> {
    if ballot.len() > poll.votes_per_voter {
        return Err(ServiceError::InvalidInput(format!(
            "ballot carries {} choices but the cap is {}",
            ballot.len(),
            poll.votes_per_voter
        )));
    }

    let mut seen = HashSet::new();
    for nomination_id in ballot {
        if !poll.nominations.contains_key(nomination_id) {
            return Err(ServiceError::InvalidInput(format!(
                "ballot references unknown nomination `{nomination_id}`"
            )));
        }
        if !seen.insert(nomination_id.as_str()) {
            return Err(ServiceError::InvalidInput(format!(
                "ballot ranks nomination `{nomination_id}` more than once"
            )));
        }
    }
    Ok(())
}

fn generate_poll_code() -> String {
    let mut rng = rand::rng();
    (0..POLL_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..POLL_CODE_CHARSET.len());
            POLL_CODE_CHARSET[idx] as char
        })
        .collect()
}

fn generate_participant_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn generate_nomination_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::poll_store::memory::MemoryPollStore,
        state::{AppState, phase::PollPhase},
    };

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .set_poll_store(Arc::new(MemoryPollStore::default()))
            .await;
        state
    }

    fn ctx(poll_id: &str, participant_id: &str, name: &str) -> SessionContext {
        SessionContext {
            poll_id: poll_id.into(),
            participant_id: participant_id.into(),
            name: name.into(),
        }
    }

    /// Create a poll and join its admin, returning the admin context.
    async fn create_joined(state: &SharedState, votes_per_voter: usize) -> SessionContext {
        let (poll, _token) = create_poll(
            state,
            CreatePollRequest {
                topic: "where to eat".into(),
                votes_per_voter,
                name: "Ana".into(),
            },
        )
        .await
        .unwrap();
        let admin = ctx(&poll.id, &poll.admin_id, "Ana");
        join(state, &admin).await.unwrap();
        admin
    }

    async fn join_participant(
        state: &SharedState,
        poll_id: &str,
        participant_id: &str,
        name: &str,
    ) -> SessionContext {
        let member = ctx(poll_id, participant_id, name);
        join(state, &member).await.unwrap();
        member
    }

    #[tokio::test]
    async fn nominations_get_distinct_ids() {
        let state = test_state().await;
        let admin = create_joined(&state, 2).await;

        for text in ["tacos", "ramen", "pizza"] {
            nominate(&state, &admin, text).await.unwrap();
        }

        let poll = state
            .repository()
            .await
            .unwrap()
            .get_poll(&admin.poll_id)
            .await
            .unwrap();
        assert_eq!(poll.nominations.len(), 3);
        let ids: HashSet<_> = poll.nominations.keys().collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn start_vote_guards_nomination_count_and_latches_once() {
        let state = test_state().await;
        let admin = create_joined(&state, 2).await;

        nominate(&state, &admin, "tacos").await.unwrap();
        let err = start_vote(&state, &admin).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        nominate(&state, &admin, "ramen").await.unwrap();
        let poll = start_vote(&state, &admin).await.unwrap();
        assert!(poll.has_started);
        assert_eq!(PollPhase::of(&poll), PollPhase::Voting);

        let err = start_vote(&state, &admin).await.unwrap_err();
        assert!(matches!(err, ServiceError::PhaseConflict(_)));
    }

    #[tokio::test]
    async fn only_admin_may_start_the_vote() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        let member = join_participant(&state, &admin.poll_id, "u1", "Bo").await;
        nominate(&state, &admin, "tacos").await.unwrap();

        let err = start_vote(&state, &member).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn resubmitted_ballot_overwrites_the_previous_one() {
        let state = test_state().await;
        let admin = create_joined(&state, 2).await;
        let first = nominate(&state, &admin, "tacos").await.unwrap();
        let second = nominate(&state, &admin, "ramen").await.unwrap();
        let tacos = first.nominations.keys().next().unwrap().clone();
        let ramen = second
            .nominations
            .keys()
            .find(|id| **id != tacos)
            .unwrap()
            .clone();
        start_vote(&state, &admin).await.unwrap();

        submit_rankings(&state, &admin, vec![tacos.clone()])
            .await
            .unwrap();
        let poll = submit_rankings(&state, &admin, vec![ramen.clone(), tacos.clone()])
            .await
            .unwrap();

        assert_eq!(poll.rankings.len(), 1);
        assert_eq!(poll.rankings[&admin.participant_id], vec![ramen, tacos]);
    }

    #[tokio::test]
    async fn ballot_validation_rejects_bad_submissions() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        let poll = nominate(&state, &admin, "tacos").await.unwrap();
        let tacos = poll.nominations.keys().next().unwrap().clone();
        start_vote(&state, &admin).await.unwrap();

        // Oversized ballot (cap is 1).
        let err = submit_rankings(&state, &admin, vec![tacos.clone(), tacos.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        // Unknown nomination id.
        let err = submit_rankings(&state, &admin, vec!["ghost".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        // Before the vote starts, submissions are a phase conflict.
        let late = create_joined(&state, 1).await;
        let err = submit_rankings(&state, &late, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PhaseConflict(_)));
    }

    #[tokio::test]
    async fn duplicate_ballot_entries_are_rejected() {
        let state = test_state().await;
        let admin = create_joined(&state, 2).await;
        let poll = nominate(&state, &admin, "tacos").await.unwrap();
        let tacos = poll.nominations.keys().next().unwrap().clone();
        nominate(&state, &admin, "ramen").await.unwrap();
        start_vote(&state, &admin).await.unwrap();

        let err = submit_rankings(&state, &admin, vec![tacos.clone(), tacos])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn close_poll_publishes_once_and_rejects_repeats() {
        let state = test_state().await;
        let admin = create_joined(&state, 2).await;
        let member = join_participant(&state, &admin.poll_id, "u1", "Bo").await;
        let poll = nominate(&state, &admin, "tacos").await.unwrap();
        let tacos = poll.nominations.keys().next().unwrap().clone();
        let poll = nominate(&state, &admin, "ramen").await.unwrap();
        let ramen = poll
            .nominations
            .keys()
            .find(|id| **id != tacos)
            .unwrap()
            .clone();
        start_vote(&state, &admin).await.unwrap();

        submit_rankings(&state, &admin, vec![tacos.clone(), ramen.clone()])
            .await
            .unwrap();
        submit_rankings(&state, &member, vec![tacos.clone()])
            .await
            .unwrap();

        let closed = close_poll(&state, &admin).await.unwrap();
        assert_eq!(closed.results[0].nomination_id, tacos);
        assert_eq!(closed.results[0].score, 3);

        let err = close_poll(&state, &admin).await.unwrap_err();
        assert!(matches!(err, ServiceError::PhaseConflict(_)));
        let unchanged = state
            .repository()
            .await
            .unwrap()
            .get_poll(&admin.poll_id)
            .await
            .unwrap();
        assert_eq!(unchanged.results, closed.results);
    }

    #[tokio::test]
    async fn remove_participant_authorization_matrix() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        let member = join_participant(&state, &admin.poll_id, "u1", "Bo").await;
        join_participant(&state, &admin.poll_id, "u2", "Cy").await;

        // The admin can never be removed, not even by themselves.
        let err = remove_participant(&state, &admin, &admin.participant_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        // A non-admin cannot remove anyone.
        let err = remove_participant(&state, &member, "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        // The admin can remove a participant.
        let poll = remove_participant(&state, &admin, "u1").await.unwrap();
        assert!(!poll.participants.contains_key("u1"));
        assert!(poll.participants.contains_key("u2"));
    }

    #[tokio::test]
    async fn concurrent_ballots_from_two_participants_both_land() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        let member = join_participant(&state, &admin.poll_id, "u1", "Bo").await;
        let poll = nominate(&state, &admin, "tacos").await.unwrap();
        let tacos = poll.nominations.keys().next().unwrap().clone();
        start_vote(&state, &admin).await.unwrap();

        let (a, b) = tokio::join!(
            submit_rankings(&state, &admin, vec![tacos.clone()]),
            submit_rankings(&state, &member, vec![tacos.clone()]),
        );
        a.unwrap();
        b.unwrap();

        let poll = state
            .repository()
            .await
            .unwrap()
            .get_poll(&admin.poll_id)
            .await
            .unwrap();
        assert_eq!(poll.rankings.len(), 2);
        assert!(poll.rankings.contains_key(&admin.participant_id));
        assert!(poll.rankings.contains_key(&member.participant_id));
    }

    #[tokio::test]
    async fn new_participants_cannot_join_after_start() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        let member = join_participant(&state, &admin.poll_id, "u1", "Bo").await;
        nominate(&state, &admin, "tacos").await.unwrap();
        start_vote(&state, &admin).await.unwrap();

        let err = join(&state, &ctx(&admin.poll_id, "late", "Dee"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PhaseConflict(_)));

        // An existing participant reconnecting is always fine.
        join(&state, &member).await.unwrap();
    }

    #[tokio::test]
    async fn admin_leave_tears_the_poll_down() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        join_participant(&state, &admin.poll_id, "u1", "Bo").await;

        leave(&state, &admin).await.unwrap();

        let err = state
            .repository()
            .await
            .unwrap()
            .get_poll(&admin.poll_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn member_leave_keeps_the_poll_alive() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        let member = join_participant(&state, &admin.poll_id, "u1", "Bo").await;

        leave(&state, &member).await.unwrap();

        let poll = state
            .repository()
            .await
            .unwrap()
            .get_poll(&admin.poll_id)
            .await
            .unwrap();
        assert!(!poll.participants.contains_key(&member.participant_id));
        assert!(poll.participants.contains_key(&admin.participant_id));
    }

    #[tokio::test]
    async fn last_participant_leaving_deletes_the_poll() {
        let state = test_state().await;
        // The creator never connects; a lone member joins and walks away.
        let (poll, _token) = create_poll(
            &state,
            CreatePollRequest {
                topic: "where to eat".into(),
                votes_per_voter: 1,
                name: "Ana".into(),
            },
        )
        .await
        .unwrap();
        let member = join_participant(&state, &poll.id, "u1", "Bo").await;

        leave(&state, &member).await.unwrap();

        let err = state
            .repository()
            .await
            .unwrap()
            .get_poll(&poll.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn nomination_removal_requires_author_or_admin() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        let author = join_participant(&state, &admin.poll_id, "u1", "Bo").await;
        let other = join_participant(&state, &admin.poll_id, "u2", "Cy").await;

        let poll = nominate(&state, &author, "tacos").await.unwrap();
        let tacos = poll.nominations.keys().next().unwrap().clone();

        let err = remove_nomination(&state, &other, &tacos).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let poll = remove_nomination(&state, &admin, &tacos).await.unwrap();
        assert!(poll.nominations.is_empty());

        let err = remove_nomination(&state, &admin, &tacos).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn nominations_are_rejected_once_voting_started() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        nominate(&state, &admin, "tacos").await.unwrap();
        start_vote(&state, &admin).await.unwrap();

        let err = nominate(&state, &admin, "ramen").await.unwrap_err();
        assert!(matches!(err, ServiceError::PhaseConflict(_)));
    }

    #[tokio::test]
    async fn authorize_join_rejects_started_polls() {
        let state = test_state().await;
        let admin = create_joined(&state, 1).await;
        nominate(&state, &admin, "tacos").await.unwrap();
        start_vote(&state, &admin).await.unwrap();

        let err = authorize_join(
            &state,
            JoinPollRequest {
                poll_id: admin.poll_id.clone(),
                name: "Dee".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::PhaseConflict(_)));
    }
}
